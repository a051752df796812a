//! Conflict resolution: policy ordering and conflict-free batch selection.
use std::cmp::Reverse;

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::engine::ConflictPolicy;
use crate::net::binding::FiringPlan;
use crate::net::core::PetriNet;
use crate::net::ids::PlaceId;

/// Order the enabled plans according to the conflict policy. The scan
/// produces plans in transition id order, which already is `fifo`.
pub(crate) fn order_plans(
    net: &PetriNet,
    plans: &mut [FiringPlan],
    policy: ConflictPolicy,
    rng: &mut StdRng,
) {
    match policy {
        ConflictPolicy::Fifo => {}
        ConflictPolicy::Priority => {
            plans.sort_by_key(|plan| {
                let priority = net
                    .get_transition(plan.transition)
                    .map_or(0, |transition| transition.priority);
                (Reverse(priority), plan.transition)
            });
        }
        ConflictPolicy::Random => plans.shuffle(rng),
    }
}

/// Greedy maximal conflict-free subset in the given order: a plan joins
/// the batch unless it shares a consumed input place with a plan already
/// selected. Never empty for a non-empty input.
pub(crate) fn select_batch(plans: Vec<FiringPlan>) -> Vec<FiringPlan> {
    let places: Vec<Vec<PlaceId>> = plans.iter().map(FiringPlan::input_places).collect();

    let mut conflicts: UnGraph<usize, ()> = UnGraph::new_undirected();
    let nodes: Vec<NodeIndex> = (0..plans.len()).map(|idx| conflicts.add_node(idx)).collect();
    for (i, j) in (0..plans.len()).tuple_combinations() {
        if places[i].iter().any(|place| places[j].contains(place)) {
            conflicts.add_edge(nodes[i], nodes[j], ());
        }
    }

    let mut selected = vec![false; plans.len()];
    for idx in 0..plans.len() {
        let blocked = conflicts
            .neighbors(nodes[idx])
            .any(|neighbor| selected[conflicts[neighbor]]);
        if !blocked {
            selected[idx] = true;
        }
    }

    plans
        .into_iter()
        .zip(selected)
        .filter_map(|(plan, keep)| keep.then_some(plan))
        .collect()
}
