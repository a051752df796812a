//! 绑定求解：对所有输入弧同时一致的变量赋值搜索。
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::net::color::{Color, ColorValue};
use crate::net::core::PetriNet;
use crate::net::ids::{ArcId, PlaceId, TokenId, TransitionId};
use crate::net::structure::{Arc, Pattern, Transition};
use crate::net::token::Token;

/// The variable assignment of one firing, built up while matching input
/// patterns and read by guards and output terms. Insertion-ordered so
/// rollback during the backtracking search is a truncation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    vars: IndexMap<String, ColorValue>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ColorValue> {
        self.vars.get(name)
    }

    /// Bind a variable, or check consistency against an existing binding.
    pub fn bind(&mut self, name: &str, value: &ColorValue) -> bool {
        match self.vars.get(name) {
            Some(existing) => existing == value,
            None => {
                self.vars.insert(name.to_owned(), value.clone());
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColorValue)> {
        self.vars.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.vars.len()
    }

    pub(crate) fn rollback(&mut self, mark: usize) {
        self.vars.truncate(mark);
    }
}

/// The outcome of a successful enabling test: the binding plus the exact
/// tokens (by identity) the firing will consume. Valid until one of the
/// consumed tokens is removed by somebody else.
#[derive(Debug, Clone)]
pub struct FiringPlan {
    pub transition: TransitionId,
    pub binding: Binding,
    pub consumes: Vec<(PlaceId, TokenId)>,
}

impl FiringPlan {
    /// Input places this plan consumes from, deduplicated.
    pub fn input_places(&self) -> Vec<PlaceId> {
        let mut places: Vec<PlaceId> = self.consumes.iter().map(|(place, _)| *place).collect();
        places.sort();
        places.dedup();
        places
    }
}

/// Match one color against an input pattern, extending the binding.
/// Leaves partially added bindings behind on failure; callers roll back
/// to their checkpoint.
pub(crate) fn unify(binding: &mut Binding, pattern: &[Pattern], color: &Color) -> bool {
    if pattern.len() != color.len() {
        return false;
    }
    for (pat, value) in pattern.iter().zip(color.values()) {
        match pat {
            Pattern::Any => {}
            Pattern::Const(expected) => {
                if expected != value {
                    return false;
                }
            }
            Pattern::Var(name) => {
                if !binding.bind(name, value) {
                    return false;
                }
            }
        }
    }
    true
}

/// Solve the enabling problem for one transition: find a consistent
/// variable assignment and a disjoint token choice satisfying every
/// input arc, then the guard. Deterministic: arcs in wiring order,
/// candidate tokens in store insertion order, first solution wins.
pub(crate) fn solve(net: &PetriNet, id: TransitionId) -> Option<FiringPlan> {
    let transition = net.get_transition(id)?;
    if transition.is_refined() {
        // refined transitions are structural containers, never fired
        return None;
    }

    let arcs: Vec<(ArcId, &Arc)> = transition
        .input_arcs()
        .iter()
        .filter_map(|&aid| net.get_arc(aid).map(|arc| (aid, arc)))
        .collect();

    // cheap per-place count precheck before the combinatorial search
    let mut demand: HashMap<PlaceId, u64> = HashMap::new();
    for (_, arc) in &arcs {
        *demand.entry(arc.place).or_insert(0) += arc.weight;
    }
    let mut pools: HashMap<PlaceId, Vec<Token>> = HashMap::new();
    for (&place_id, &need) in &demand {
        let place = net.get_place(place_id)?;
        let tokens = place.tokens();
        if (tokens.len() as u64) < need {
            return None;
        }
        pools.insert(place_id, tokens);
    }

    let mut search = Search {
        transition,
        arcs: &arcs,
        pools: &pools,
        binding: Binding::new(),
        used: Vec::new(),
    };
    if search.solve_from(0) {
        Some(FiringPlan {
            transition: id,
            binding: search.binding,
            consumes: search.used,
        })
    } else {
        None
    }
}

struct Search<'a> {
    transition: &'a Transition,
    arcs: &'a [(ArcId, &'a Arc)],
    pools: &'a HashMap<PlaceId, Vec<Token>>,
    binding: Binding,
    used: Vec<(PlaceId, TokenId)>,
}

impl<'a> Search<'a> {
    fn solve_from(&mut self, arc_idx: usize) -> bool {
        if arc_idx == self.arcs.len() {
            return self.transition.guard_accepts(&self.binding);
        }
        let (_, arc) = self.arcs[arc_idx];
        self.pick(arc_idx, arc, 0, arc.weight)
    }

    /// Choose `remaining` tokens for `arc` from ascending pool position
    /// `from`, then continue with the next arc. Tokens already claimed by
    /// an earlier arc of the same place are skipped.
    fn pick(&mut self, arc_idx: usize, arc: &'a Arc, from: usize, remaining: u64) -> bool {
        if remaining == 0 {
            return self.solve_from(arc_idx + 1);
        }
        let pools = self.pools;
        let pool = pools.get(&arc.place).map_or(&[][..], |p| p.as_slice());
        for idx in from..pool.len() {
            let token = &pool[idx];
            if self
                .used
                .iter()
                .any(|&(place, id)| place == arc.place && id == token.id())
            {
                continue;
            }
            let mark = self.binding.checkpoint();
            let matched = match arc.pattern() {
                None => true,
                Some(pattern) => unify(&mut self.binding, pattern, token.color()),
            };
            if matched {
                self.used.push((arc.place, token.id()));
                if self.pick(arc_idx, arc, idx + 1, remaining - 1) {
                    return true;
                }
                self.used.pop();
            }
            self.binding.rollback(mark);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> ColorValue {
        ColorValue::Integer(value)
    }

    #[test]
    fn bind_checks_consistency() {
        let mut binding = Binding::new();
        assert!(binding.bind("x", &int(1)));
        assert!(binding.bind("x", &int(1)));
        assert!(!binding.bind("x", &int(2)));
        assert_eq!(binding.get("x"), Some(&int(1)));
    }

    #[test]
    fn rollback_drops_later_bindings_only() {
        let mut binding = Binding::new();
        binding.bind("x", &int(1));
        let mark = binding.checkpoint();
        binding.bind("y", &int(2));
        binding.bind("z", &int(3));
        binding.rollback(mark);
        assert_eq!(binding.len(), 1);
        assert_eq!(binding.get("x"), Some(&int(1)));
        assert_eq!(binding.get("y"), None);
    }

    #[test]
    fn unify_binds_checks_and_wildcards() {
        let pattern = vec![
            Pattern::Var("x".into()),
            Pattern::Const(int(7)),
            Pattern::Any,
        ];
        let color = Color::new([int(1), int(7), int(9)]);
        let mut binding = Binding::new();
        assert!(unify(&mut binding, &pattern, &color));
        assert_eq!(binding.get("x"), Some(&int(1)));

        let wrong_const = Color::new([int(1), int(8), int(9)]);
        let mut binding = Binding::new();
        assert!(!unify(&mut binding, &pattern, &wrong_const));
    }

    #[test]
    fn unify_rejects_arity_mismatch() {
        let pattern = vec![Pattern::Any];
        let mut binding = Binding::new();
        assert!(!unify(&mut binding, &pattern, &Color::empty()));
    }

    #[test]
    fn unify_enforces_repeated_variable() {
        let pattern = vec![Pattern::Var("x".into()), Pattern::Var("x".into())];
        let mut binding = Binding::new();
        assert!(unify(&mut binding, &pattern, &Color::new([int(4), int(4)])));

        let mut binding = Binding::new();
        assert!(!unify(&mut binding, &pattern, &Color::new([int(4), int(5)])));
    }
}
