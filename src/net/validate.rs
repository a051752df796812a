//! 结构校验：以访问者遍历收集违规与警告。
use std::fmt;

use thiserror::Error;

use crate::net::core::PetriNet;
use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::structure::{Arc, ArcDirection, Inscription, Pattern, Place, Term, Transition};
use crate::net::visit::NetVisitor;

/// A fatal structural defect. Execution must not start while any of
/// these are present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("arc {arc:?} references a missing endpoint")]
    DanglingArc { arc: ArcId },
    #[error("arc {arc:?} has weight 0")]
    ZeroWeight { arc: ArcId },
    #[error("arc {arc:?} carries an inscription of the wrong direction")]
    MisdirectedInscription { arc: ArcId },
    #[error(
        "arc {arc:?} disagrees with the schema of place {place:?}: expected arity {expected}, found {found}"
    )]
    ArityMismatch {
        arc: ArcId,
        place: PlaceId,
        expected: usize,
        found: usize,
    },
    #[error("transition {transition:?} has no input arcs")]
    NoInput { transition: TransitionId },
    #[error("transition {transition:?} has no output arcs")]
    NoOutput { transition: TransitionId },
    #[error("transition {transition:?} produces from unbound variable `{variable}`")]
    UnboundOutputVariable {
        transition: TransitionId,
        variable: String,
    },
}

/// Outcome of a validation pass over a net and its subnets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
    pub total_arcs: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_issues(&self) -> bool {
        !self.violations.is_empty() || !self.warnings.is_empty()
    }

    /// Mirror the report into the log.
    pub fn log_report(&self) {
        if !self.has_issues() {
            log::info!(
                "net validation passed: {} places, {} transitions, {} arcs",
                self.total_places,
                self.total_transitions,
                self.total_arcs
            );
            return;
        }
        log::warn!(
            "net validation: {} violation(s), {} warning(s)",
            self.violations.len(),
            self.warnings.len()
        );
        for violation in &self.violations {
            log::warn!("  violation: {violation}");
        }
        for warning in &self.warnings {
            log::warn!("  warning: {warning}");
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} violation(s), {} warning(s)",
            self.violations.len(),
            self.warnings.len()
        )
    }
}

/// Run the structural validation pass: dangling arcs, inscription and
/// schema mismatches, degenerate transitions. Advisory findings
/// (isolated places, start places that can never activate) land in the
/// warning list and do not block execution.
pub fn check_net(net: &PetriNet) -> ValidationReport {
    let mut visitor = ValidationVisitor {
        report: ValidationReport::default(),
    };
    net.accept_all(&mut visitor);
    visitor.report
}

struct ValidationVisitor {
    report: ValidationReport,
}

impl ValidationVisitor {
    fn place_arity(net: &PetriNet, place: PlaceId) -> Option<usize> {
        net.get_place(place)
            .map(|p| p.color_set().map_or(0, |schema| schema.len()))
    }
}

impl NetVisitor for ValidationVisitor {
    fn visit_place(&mut self, _net: &PetriNet, id: PlaceId, place: &Place) -> bool {
        self.report.total_places += 1;
        if !place.is_loaded() {
            self.report
                .warnings
                .push(format!("place '{}' ({id:?}) has no incident arcs", place.name));
        } else if place.is_start() && place.token_count() == 0 {
            self.report.warnings.push(format!(
                "start place '{}' ({id:?}) holds no tokens and can never activate",
                place.name
            ));
        }
        true
    }

    fn visit_transition(
        &mut self,
        net: &PetriNet,
        id: TransitionId,
        transition: &Transition,
    ) -> bool {
        self.report.total_transitions += 1;
        if transition.input_arcs().is_empty() {
            self.report.violations.push(Violation::NoInput { transition: id });
        }
        if transition.output_arcs().is_empty() {
            self.report.violations.push(Violation::NoOutput { transition: id });
        }

        // every output variable must be bound by some input pattern
        let mut bound: Vec<&str> = Vec::new();
        for &arc_id in transition.input_arcs() {
            if let Some(pattern) = net.get_arc(arc_id).and_then(Arc::pattern) {
                for pat in pattern {
                    if let Pattern::Var(name) = pat {
                        bound.push(name);
                    }
                }
            }
        }
        for &arc_id in transition.output_arcs() {
            if let Some(terms) = net.get_arc(arc_id).and_then(Arc::terms) {
                for term in terms {
                    if let Term::Var(name) = term {
                        if !bound.contains(&name.as_str()) {
                            self.report.violations.push(Violation::UnboundOutputVariable {
                                transition: id,
                                variable: name.clone(),
                            });
                        }
                    }
                }
            }
        }
        true
    }

    fn visit_arc(&mut self, net: &PetriNet, id: ArcId, arc: &Arc) {
        self.report.total_arcs += 1;
        if net.get_place(arc.place).is_none() || net.get_transition(arc.transition).is_none() {
            self.report.violations.push(Violation::DanglingArc { arc: id });
            return;
        }
        if arc.weight == 0 {
            self.report.violations.push(Violation::ZeroWeight { arc: id });
        }

        let misdirected = match (&arc.direction, &arc.inscription) {
            (ArcDirection::PlaceToTransition, Some(Inscription::Produce(_)))
            | (ArcDirection::TransitionToPlace, Some(Inscription::Pattern(_))) => true,
            _ => false,
        };
        if misdirected {
            self.report
                .violations
                .push(Violation::MisdirectedInscription { arc: id });
            return;
        }

        let expected = match Self::place_arity(net, arc.place) {
            Some(arity) => arity,
            None => return,
        };
        match &arc.direction {
            // a pattern-less input arc consumes any token; with a pattern
            // the arity must line up with the source schema
            ArcDirection::PlaceToTransition => {
                if let Some(pattern) = arc.pattern() {
                    if pattern.len() != expected {
                        self.report.violations.push(Violation::ArityMismatch {
                            arc: id,
                            place: arc.place,
                            expected,
                            found: pattern.len(),
                        });
                    }
                }
            }
            // production is concrete: a missing inscription produces
            // plain tokens, so the target schema must have arity 0
            ArcDirection::TransitionToPlace => {
                let found = arc.terms().map_or(0, |terms| terms.len());
                if found != expected {
                    self.report.violations.push(Violation::ArityMismatch {
                        arc: id,
                        place: arc.place,
                        expected,
                        found,
                    });
                }
            }
        }
    }
}
