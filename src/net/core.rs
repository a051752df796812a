//! 网容器：装配操作、可激发检测与原子发射。
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::arena::Arena;
use crate::net::binding::{self, FiringPlan};
use crate::net::color::Color;
use crate::net::ids::{ArcId, PlaceId, TokenId, TransitionId};
use crate::net::structure::{Arc, ArcDirection, Place, Term, Transition};
use crate::net::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the current marking")]
    NotEnabled(TransitionId),
    #[error("transition {0:?} is refined into a subnet and cannot fire directly")]
    Refined(TransitionId),
    #[error("token {token:?} vanished from place {place:?} while firing {transition:?}")]
    TokenMissing {
        transition: TransitionId,
        place: PlaceId,
        token: TokenId,
    },
    #[error("output term of transition {transition:?} references unbound variable `{variable}`")]
    UnboundVariable {
        transition: TransitionId,
        variable: String,
    },
}

/// The owning container of all places, transitions, and arcs. Topology is
/// assembled once through the `add_*`/wiring operations and stays fixed;
/// only the places' token stores mutate afterwards, which is why firing
/// works on `&self`.
#[derive(Debug, Default)]
pub struct PetriNet {
    places: Arena<PlaceId, Place>,
    transitions: Arena<TransitionId, Transition>,
    arcs: Arena<ArcId, Arc>,
}

impl PetriNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        self.places.alloc(place)
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.alloc(transition)
    }

    /// Add an arc and wire it into both endpoints' incident lists. An
    /// endpoint id that does not resolve is left unwired; the validation
    /// pass reports it as dangling.
    pub fn add_arc(&mut self, arc: Arc) -> ArcId {
        let place = arc.place;
        let transition = arc.transition;
        let direction = arc.direction;
        let id = self.arcs.alloc(arc);
        match direction {
            ArcDirection::PlaceToTransition => {
                if let Some(p) = self.places.get_mut(place) {
                    p.outputs.push(id);
                }
                if let Some(t) = self.transitions.get_mut(transition) {
                    t.inputs.push(id);
                }
            }
            ArcDirection::TransitionToPlace => {
                if let Some(t) = self.transitions.get_mut(transition) {
                    t.outputs.push(id);
                }
                if let Some(p) = self.places.get_mut(place) {
                    p.inputs.push(id);
                }
            }
        }
        id
    }

    pub fn get_place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn get_place_mut(&mut self, place: PlaceId) -> Option<&mut Place> {
        self.places.get_mut(place)
    }

    pub fn get_transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn get_transition_mut(&mut self, transition: TransitionId) -> Option<&mut Transition> {
        self.transitions.get_mut(transition)
    }

    pub fn get_arc(&self, arc: ArcId) -> Option<&Arc> {
        self.arcs.get(arc)
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn iter_places(&self) -> impl Iterator<Item = (PlaceId, &Place)> {
        self.places.enumerated()
    }

    pub fn iter_transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> {
        self.transitions.enumerated()
    }

    pub fn iter_arcs(&self) -> impl Iterator<Item = (ArcId, &Arc)> {
        self.arcs.enumerated()
    }

    /// All transitions currently enabled, in id order.
    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .keys()
            .filter(|&id| binding::solve(self, id).is_some())
            .collect()
    }

    /// Enabling test with the witness thrown in: one firing plan per
    /// enabled transition, in id order.
    pub fn enabled_plans(&self) -> Vec<FiringPlan> {
        self.transitions
            .keys()
            .filter_map(|id| binding::solve(self, id))
            .collect()
    }

    pub fn is_enabled(&self, transition: TransitionId) -> bool {
        binding::solve(self, transition).is_some()
    }

    /// Solve for a consistent binding across all input arcs of the
    /// transition. `None` when no binding exists, even if naive per-arc
    /// counts are satisfied.
    pub fn find_binding(&self, transition: TransitionId) -> Option<FiringPlan> {
        binding::solve(self, transition)
    }

    /// Fire one transition under the first binding found.
    pub fn fire(&self, transition: TransitionId) -> Result<(), FireError> {
        if !self.transitions.contains(transition) {
            return Err(FireError::OutOfBounds(transition));
        }
        if self.transitions[transition].is_refined() {
            return Err(FireError::Refined(transition));
        }
        let plan = binding::solve(self, transition).ok_or(FireError::NotEnabled(transition))?;
        self.fire_plan(&plan)
    }

    /// Fire a previously computed plan: remove the bound tokens by
    /// identity, evaluate the output inscriptions against the binding,
    /// insert the produced tokens. The removal is rolled back if a bound
    /// token has vanished, so a failed firing leaves the marking intact.
    pub fn fire_plan(&self, plan: &FiringPlan) -> Result<(), FireError> {
        let transition = self
            .get_transition(plan.transition)
            .ok_or(FireError::OutOfBounds(plan.transition))?;

        // evaluate productions first so nothing mutates on an unbound term
        let mut produced: Vec<(PlaceId, Color)> = Vec::new();
        for &arc_id in transition.output_arcs() {
            let Some(arc) = self.get_arc(arc_id) else {
                continue;
            };
            let color = match arc.terms() {
                None => Color::empty(),
                Some(terms) => eval_terms(plan.transition, terms, plan)?,
            };
            for _ in 0..arc.weight {
                produced.push((arc.place, color.clone()));
            }
        }

        // 按身份移除所有绑定 token; 失败时整体回滚
        let mut removed: Vec<(PlaceId, Token)> = Vec::with_capacity(plan.consumes.len());
        for &(place_id, token_id) in &plan.consumes {
            let taken = self
                .get_place(place_id)
                .and_then(|place| place.take_token(token_id));
            match taken {
                Some(token) => removed.push((place_id, token)),
                None => {
                    for (undo_place, token) in removed {
                        if let Some(place) = self.get_place(undo_place) {
                            place.add_token_unchecked(token);
                        }
                    }
                    return Err(FireError::TokenMissing {
                        transition: plan.transition,
                        place: place_id,
                        token: token_id,
                    });
                }
            }
        }

        // insertion is unchecked: output inscriptions were validated
        // against the target schemas before execution started
        for (place_id, color) in produced {
            if let Some(place) = self.get_place(place_id) {
                place.add_token_unchecked(Token::new(color));
            }
        }
        Ok(())
    }

    /// Snapshot of every place's token colors, in place order.
    pub fn marking(&self) -> Marking {
        Marking(
            self.places
                .iter()
                .map(|place| {
                    place
                        .tokens()
                        .into_iter()
                        .map(|token| token.color().clone())
                        .collect()
                })
                .collect(),
        )
    }

    /// Replay a snapshot taken from a net of the same shape. Tokens are
    /// minted fresh; `false` (and no mutation) if the place counts do not
    /// line up.
    pub fn restore(&self, marking: &Marking) -> bool {
        if marking.0.len() != self.places.len() {
            return false;
        }
        for (place_id, colors) in marking.0.enumerated() {
            let place = &self.places[place_id];
            place.clear_tokens();
            for color in colors {
                place.add_token_unchecked(Token::new(color.clone()));
            }
        }
        true
    }
}

fn eval_terms(
    transition: TransitionId,
    terms: &[Term],
    plan: &FiringPlan,
) -> Result<Color, FireError> {
    let mut values = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Term::Const(value) => values.push(value.clone()),
            Term::Var(name) => match plan.binding.get(name) {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(FireError::UnboundVariable {
                        transition,
                        variable: name.clone(),
                    });
                }
            },
        }
    }
    Ok(Color::new(values))
}

/// The global state of a net: each place's token colors at one instant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marking(Arena<PlaceId, Vec<Color>>);

impl Marking {
    pub fn places(&self) -> usize {
        self.0.len()
    }

    pub fn tokens(&self, place: PlaceId) -> usize {
        self.0.get(place).map_or(0, Vec::len)
    }

    pub fn colors(&self, place: PlaceId) -> &[Color] {
        self.0.get(place).map_or(&[], Vec::as_slice)
    }

    /// Total token count over all places.
    pub fn total(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Vec<Color>)> {
        self.0.enumerated()
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, colors) in self.iter() {
            map.entry(&place, colors);
        }
        map.finish()
    }
}
