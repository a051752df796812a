//! 网静态结构元素：库所、变迁与弧。
use std::fmt;
use std::sync::Mutex;

use smallvec::SmallVec;

use crate::net::binding::Binding;
use crate::net::color::{ColorSet, ColorValue};
use crate::net::core::PetriNet;
use crate::net::ids::{ArcId, PlaceId, TokenId, TransitionId};
use crate::net::token::{Token, TokenSet, TokenStore};

pub type Weight = u64;

/// Incident-arc list kept on each endpoint. The arcs themselves are owned
/// by the net; endpoints hold ids only.
pub(crate) type ArcList = SmallVec<[ArcId; 4]>;

/// Guard predicate over the candidate binding of one firing.
pub type GuardFn = dyn Fn(&Binding) -> bool + Send + Sync;

/// A node holding tokens, gated by an optional color schema.
///
/// The token store is an explicit member: default-constructed as a
/// [`TokenSet`] but swappable via [`Place::with_store`] or
/// [`Place::set_store`]. It sits behind a mutex; that lock is the
/// single-writer-per-consumption discipline the firing engine relies on.
pub struct Place {
    pub name: String,
    color_set: Option<ColorSet>,
    store: Mutex<Box<dyn TokenStore>>,
    pub(crate) inputs: ArcList,
    pub(crate) outputs: ArcList,
}

impl Place {
    pub fn new(name: impl Into<String>, color_set: Option<ColorSet>) -> Self {
        Self::with_store(name, color_set, Box::new(TokenSet::new()))
    }

    pub fn with_store(
        name: impl Into<String>,
        color_set: Option<ColorSet>,
        store: Box<dyn TokenStore>,
    ) -> Self {
        Self {
            name: name.into(),
            color_set,
            store: Mutex::new(store),
            inputs: ArcList::new(),
            outputs: ArcList::new(),
        }
    }

    /// Replace the token store, discarding current contents.
    pub fn set_store(&mut self, store: Box<dyn TokenStore>) {
        *self.store.lock().unwrap() = store;
    }

    pub fn color_set(&self) -> Option<&ColorSet> {
        self.color_set.as_ref()
    }

    /// Whether this place accepts the token: uncolored places take only
    /// plain tokens, colored places delegate to schema matching. Always a
    /// boolean rejection, never an error.
    pub fn is_allowed(&self, token: &Token) -> bool {
        match &self.color_set {
            None => token.is_plain(),
            Some(schema) => schema.matches(token.color()),
        }
    }

    /// The only externally safe insertion path: `false` without mutation
    /// when the token is not allowed.
    pub fn add_token(&self, token: Token) -> bool {
        if !self.is_allowed(&token) {
            return false;
        }
        self.store.lock().unwrap().add(token);
        true
    }

    /// Unconditional insertion. Callers must have proven allowance
    /// already; the firing engine uses this after enabling validated the
    /// output inscription against this place's schema.
    pub fn add_token_unchecked(&self, token: Token) {
        self.store.lock().unwrap().add(token);
    }

    /// Per-element [`Place::add_token`]; rejected tokens are skipped
    /// silently, the rest are inserted (partial success).
    pub fn add_tokens<I>(&self, tokens: I)
    where
        I: IntoIterator<Item = Token>,
    {
        for token in tokens {
            self.add_token(token);
        }
    }

    pub fn remove_token(&self, token: &Token) -> bool {
        self.store.lock().unwrap().remove(token.id()).is_some()
    }

    pub fn clear_tokens(&self) {
        self.store.lock().unwrap().clear();
    }

    /// Ordered snapshot of the current tokens.
    pub fn tokens(&self) -> Vec<Token> {
        self.store.lock().unwrap().tokens()
    }

    pub fn token_count(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Atomic compare-and-remove by identity, used during firing.
    pub(crate) fn take_token(&self, id: TokenId) -> Option<Token> {
        self.store.lock().unwrap().remove(id)
    }

    pub fn input_arcs(&self) -> &[ArcId] {
        &self.inputs
    }

    pub fn output_arcs(&self) -> &[ArcId] {
        &self.outputs
    }

    pub fn is_start(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn is_end(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Topology participation: at least one incident arc. Independent of
    /// the current token count.
    pub fn is_loaded(&self) -> bool {
        !self.inputs.is_empty() || !self.outputs.is_empty()
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("name", &self.name)
            .field("color_set", &self.color_set)
            .field("tokens", &self.token_count())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A node consuming and producing tokens when fired. May carry a guard
/// and may be refined into a nested subnet for hierarchical models.
pub struct Transition {
    pub name: String,
    /// Ordering key for the `priority` conflict policy; higher fires first.
    pub priority: u32,
    pub(crate) inputs: ArcList,
    pub(crate) outputs: ArcList,
    guard: Option<std::sync::Arc<GuardFn>>,
    subnet: Option<Box<PetriNet>>,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            inputs: ArcList::new(),
            outputs: ArcList::new(),
            guard: None,
            subnet: None,
        }
    }

    pub fn with_priority(name: impl Into<String>, priority: u32) -> Self {
        let mut transition = Self::new(name);
        transition.priority = priority;
        transition
    }

    pub fn set_guard<F>(&mut self, guard: F)
    where
        F: Fn(&Binding) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(std::sync::Arc::new(guard));
    }

    pub(crate) fn guard_accepts(&self, binding: &Binding) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(binding))
    }

    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// Refine this transition into a nested subnet. Refined transitions
    /// are structural containers; the engine fires leaf transitions only.
    pub fn refine(&mut self, subnet: PetriNet) {
        self.subnet = Some(Box::new(subnet));
    }

    pub fn subnet(&self) -> Option<&PetriNet> {
        self.subnet.as_deref()
    }

    pub fn is_refined(&self) -> bool {
        self.subnet.is_some()
    }

    pub fn input_arcs(&self) -> &[ArcId] {
        &self.inputs
    }

    pub fn output_arcs(&self) -> &[ArcId] {
        &self.outputs
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("guard", &self.guard.is_some())
            .field("refined", &self.subnet.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

/// One position of an input-arc pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Bind or check a variable of the firing's binding.
    Var(String),
    Const(ColorValue),
    /// Match any value without binding.
    Any,
}

/// One position of an output-arc production term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Const(ColorValue),
}

/// Color inscription of an arc. Input arcs match patterns, output arcs
/// evaluate production terms; an uninscribed arc moves plain tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inscription {
    Pattern(Vec<Pattern>),
    Produce(Vec<Term>),
}

/// A directed, typed edge between a place and a transition. Owned by the
/// net; endpoints reference it by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
    pub weight: Weight,
    pub inscription: Option<Inscription>,
}

impl Arc {
    /// Input arc: place -> transition.
    pub fn input(place: PlaceId, transition: TransitionId, weight: Weight) -> Self {
        Self {
            place,
            transition,
            direction: ArcDirection::PlaceToTransition,
            weight,
            inscription: None,
        }
    }

    /// Output arc: transition -> place.
    pub fn output(transition: TransitionId, place: PlaceId, weight: Weight) -> Self {
        Self {
            place,
            transition,
            direction: ArcDirection::TransitionToPlace,
            weight,
            inscription: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Vec<Pattern>) -> Self {
        self.inscription = Some(Inscription::Pattern(pattern));
        self
    }

    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.inscription = Some(Inscription::Produce(terms));
        self
    }

    pub fn pattern(&self) -> Option<&[Pattern]> {
        match &self.inscription {
            Some(Inscription::Pattern(pattern)) => Some(pattern),
            _ => None,
        }
    }

    pub fn terms(&self) -> Option<&[Term]> {
        match &self.inscription {
            Some(Inscription::Produce(terms)) => Some(terms),
            _ => None,
        }
    }
}
