//! Token 身份与库所多重集存储。
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::net::color::Color;
use crate::net::ids::TokenId;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// An identity-bearing unit of state with an optional color payload.
/// Two tokens with identical colors are still distinct (multiset
/// semantics); identity comes from the minted [`TokenId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    id: TokenId,
    color: Color,
}

impl Token {
    pub fn new(color: Color) -> Self {
        Self {
            id: TokenId(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed)),
            color,
        }
    }

    /// A plain token without payload.
    pub fn plain() -> Self {
        Self::new(Color::empty())
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn is_plain(&self) -> bool {
        self.color.is_empty()
    }
}

/// Token multiset collaborator owned by one place.
///
/// An explicit trait so the storage can be swapped at construction time
/// (reference implementation, instrumented test double). `take_first` is
/// the engine's compare-and-remove primitive: it removes and returns the
/// first token the predicate accepts, atomically with respect to the
/// owning place's lock.
pub trait TokenStore: Send {
    fn add(&mut self, token: Token);
    /// Remove one token matching the given identity.
    fn remove(&mut self, id: TokenId) -> Option<Token>;
    fn take_first(&mut self, pred: &dyn Fn(&Token) -> bool) -> Option<Token>;
    fn clear(&mut self);
    /// Ordered snapshot of the current contents.
    fn tokens(&self) -> Vec<Token>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory reference implementation: insertion-ordered `Vec`.
/// Order is deterministic for iteration but carries no firing priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    items: Vec<Token>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.items.iter()
    }
}

impl From<Vec<Token>> for TokenSet {
    fn from(items: Vec<Token>) -> Self {
        Self { items }
    }
}

impl TokenStore for TokenSet {
    fn add(&mut self, token: Token) {
        self.items.push(token);
    }

    fn remove(&mut self, id: TokenId) -> Option<Token> {
        let idx = self.items.iter().position(|t| t.id() == id)?;
        Some(self.items.remove(idx))
    }

    fn take_first(&mut self, pred: &dyn Fn(&Token) -> bool) -> Option<Token> {
        let idx = self.items.iter().position(|t| pred(t))?;
        Some(self.items.remove(idx))
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn tokens(&self) -> Vec<Token> {
        self.items.clone()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::color::ColorValue;

    #[test]
    fn minted_ids_are_unique() {
        let a = Token::plain();
        let b = Token::plain();
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn equal_colors_still_distinct_tokens() {
        let color = Color::new([ColorValue::Integer(1)]);
        let a = Token::new(color.clone());
        let b = Token::new(color);
        assert_eq!(a.color(), b.color());
        assert_ne!(a, b);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut set = TokenSet::new();
        let a = Token::plain();
        let b = Token::plain();
        set.add(a.clone());
        set.add(b.clone());
        assert_eq!(set.tokens(), vec![a, b]);
    }

    #[test]
    fn remove_takes_one_matching_identity() {
        let mut set = TokenSet::new();
        let a = Token::plain();
        let clone = a.clone();
        set.add(a.clone());
        set.add(clone);
        set.add(Token::plain());

        assert_eq!(set.remove(a.id()).map(|t| t.id()), Some(a.id()));
        // the second copy with the same identity is still there
        assert_eq!(set.len(), 2);
        assert!(set.remove(a.id()).is_some());
        assert!(set.remove(a.id()).is_none());
    }

    #[test]
    fn take_first_respects_order_and_predicate() {
        let mut set = TokenSet::new();
        let plain = Token::plain();
        let colored = Token::new(Color::new([ColorValue::Integer(3)]));
        set.add(plain.clone());
        set.add(colored.clone());

        let taken = set.take_first(&|t| !t.is_plain()).unwrap();
        assert_eq!(taken.id(), colored.id());
        assert_eq!(set.tokens(), vec![plain]);
        assert!(set.take_first(&|t| !t.is_plain()).is_none());
    }

    #[test]
    fn clear_empties_the_store() {
        let mut set = TokenSet::new();
        set.add(Token::plain());
        set.clear();
        assert!(set.is_empty());
    }
}
