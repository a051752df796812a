//! 颜色值、类型契约与颜色集匹配。
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A single typed value carried inside a token color. Closed variant so
/// type checks stay exhaustive and statically matchable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColorValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    List(Vec<ColorValue>),
}

impl PartialEq for ColorValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColorValue::Integer(l), ColorValue::Integer(r)) => l == r,
            // bitwise so colors stay Eq/Hash-consistent, NaN included
            (ColorValue::Float(l), ColorValue::Float(r)) => l.to_bits() == r.to_bits(),
            (ColorValue::Text(l), ColorValue::Text(r)) => l == r,
            (ColorValue::Bool(l), ColorValue::Bool(r)) => l == r,
            (ColorValue::List(l), ColorValue::List(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for ColorValue {}

impl Hash for ColorValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ColorValue::Integer(v) => v.hash(state),
            ColorValue::Float(v) => v.to_bits().hash(state),
            ColorValue::Text(v) => v.hash(state),
            ColorValue::Bool(v) => v.hash(state),
            ColorValue::List(v) => v.hash(state),
        }
    }
}

impl From<i64> for ColorValue {
    fn from(value: i64) -> Self {
        ColorValue::Integer(value)
    }
}

impl From<f64> for ColorValue {
    fn from(value: f64) -> Self {
        ColorValue::Float(value)
    }
}

impl From<&str> for ColorValue {
    fn from(value: &str) -> Self {
        ColorValue::Text(value.to_owned())
    }
}

impl From<String> for ColorValue {
    fn from(value: String) -> Self {
        ColorValue::Text(value)
    }
}

impl From<bool> for ColorValue {
    fn from(value: bool) -> Self {
        ColorValue::Bool(value)
    }
}

/// Value-type contract consumed from plugins.
///
/// `check` must be total and pure: any value it does not understand is
/// `false`, never a panic. `test` returns one canonical inhabitant and is
/// used by schema self-checks only, never on the firing path.
pub trait ValueType: Send + Sync {
    fn check(&self, value: &ColorValue) -> bool;
    fn test(&self) -> ColorValue;
}

/// Shared handle to one color-set slot.
pub type TypeSlot = Arc<dyn ValueType>;

/// Built-in checkers, one per [`ColorValue`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Integer,
    Float,
    Text,
    Bool,
    List,
}

impl ValueType for PrimitiveType {
    fn check(&self, value: &ColorValue) -> bool {
        matches!(
            (self, value),
            (PrimitiveType::Integer, ColorValue::Integer(_))
                | (PrimitiveType::Float, ColorValue::Float(_))
                | (PrimitiveType::Text, ColorValue::Text(_))
                | (PrimitiveType::Bool, ColorValue::Bool(_))
                | (PrimitiveType::List, ColorValue::List(_))
        )
    }

    fn test(&self) -> ColorValue {
        match self {
            PrimitiveType::Integer => ColorValue::Integer(1),
            PrimitiveType::Float => ColorValue::Float(1.0),
            PrimitiveType::Text => ColorValue::Text(String::from("test")),
            PrimitiveType::Bool => ColorValue::Bool(true),
            PrimitiveType::List => ColorValue::List(Vec::new()),
        }
    }
}

/// An ordered, fixed-arity tuple of values: one token's payload.
/// Immutable once constructed; arity 0 means a plain, uncolored token.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color(SmallVec<[ColorValue; 4]>);

impl Color {
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = ColorValue>,
    {
        Self(values.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(SmallVec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ColorValue> {
        self.0.get(idx)
    }

    pub fn values(&self) -> &[ColorValue] {
        &self.0
    }
}

impl From<Vec<ColorValue>> for Color {
    fn from(values: Vec<ColorValue>) -> Self {
        Self(values.into_iter().collect())
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// The type schema a place's tokens must satisfy: one [`ValueType`] per
/// tuple position. Arity 0 denotes an uncolored place schema.
#[derive(Clone, Default)]
pub struct ColorSet {
    slots: SmallVec<[TypeSlot; 4]>,
}

impl ColorSet {
    pub fn new<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = TypeSlot>,
    {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    /// Schema over built-in checkers only.
    pub fn of(primitives: &[PrimitiveType]) -> Self {
        Self {
            slots: primitives
                .iter()
                .map(|p| Arc::new(*p) as TypeSlot)
                .collect(),
        }
    }

    pub fn uncolored() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Positional type match. Arity mismatch is a rejection (`false`),
    /// never an error.
    pub fn matches(&self, color: &Color) -> bool {
        if color.len() != self.slots.len() {
            return false;
        }
        self.slots
            .iter()
            .zip(color.values())
            .all(|(slot, value)| slot.check(value))
    }

    /// One color this schema accepts, built from each slot's `test` value.
    /// Used by schema self-checks and test data generation.
    pub fn test_color(&self) -> Color {
        Color::new(self.slots.iter().map(|slot| slot.test()))
    }
}

impl fmt::Debug for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorSet")
            .field("arity", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// User-defined checker: even integers only.
    struct EvenInteger;

    impl ValueType for EvenInteger {
        fn check(&self, value: &ColorValue) -> bool {
            matches!(value, ColorValue::Integer(v) if v % 2 == 0)
        }

        fn test(&self) -> ColorValue {
            ColorValue::Integer(2)
        }
    }

    #[test]
    fn primitive_checks_accept_own_test_value() {
        for primitive in [
            PrimitiveType::Integer,
            PrimitiveType::Float,
            PrimitiveType::Text,
            PrimitiveType::Bool,
            PrimitiveType::List,
        ] {
            assert!(primitive.check(&primitive.test()));
        }
    }

    #[test]
    fn primitive_checks_reject_other_kinds() {
        assert!(!PrimitiveType::Integer.check(&ColorValue::Float(1.0)));
        assert!(!PrimitiveType::Text.check(&ColorValue::Bool(false)));
        assert!(!PrimitiveType::List.check(&ColorValue::Integer(0)));
    }

    #[test]
    fn matches_is_positional_conjunction() {
        let schema = ColorSet::of(&[PrimitiveType::Integer, PrimitiveType::Text]);
        let ok = Color::new([ColorValue::Integer(7), ColorValue::from("seven")]);
        let wrong_kind = Color::new([ColorValue::from("seven"), ColorValue::Integer(7)]);
        assert!(schema.matches(&ok));
        assert!(!schema.matches(&wrong_kind));
    }

    #[test]
    fn arity_mismatch_is_rejection_not_error() {
        let schema = ColorSet::of(&[PrimitiveType::Integer]);
        assert!(!schema.matches(&Color::empty()));
        assert!(!schema.matches(&Color::new([
            ColorValue::Integer(1),
            ColorValue::Integer(2)
        ])));
    }

    #[test]
    fn uncolored_schema_matches_only_empty_color() {
        let schema = ColorSet::uncolored();
        assert!(schema.matches(&Color::empty()));
        assert!(!schema.matches(&Color::new([ColorValue::Bool(true)])));
    }

    #[test]
    fn custom_value_type_participates_in_matching() {
        let schema = ColorSet::new([std::sync::Arc::new(EvenInteger) as TypeSlot]);
        assert!(schema.matches(&Color::new([ColorValue::Integer(4)])));
        assert!(!schema.matches(&Color::new([ColorValue::Integer(3)])));
        assert!(!schema.matches(&Color::new([ColorValue::from("four")])));
        // schema self-check: every slot accepts its own witness
        assert!(schema.matches(&schema.test_color()));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(ColorValue::Float(f64::NAN), ColorValue::Float(f64::NAN));
        assert_ne!(ColorValue::Float(0.0), ColorValue::Float(-0.0));
    }
}
