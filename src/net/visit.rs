//! 访问者双分派遍历。
use crate::net::core::PetriNet;
use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::structure::{Arc, ArcDirection, Place, Transition};

/// Double-dispatch capability set over net elements.
///
/// Every method has a no-op default so a pass only overrides what it
/// needs. The place/transition/subnet hooks return a continuation flag:
/// `false` cuts off forwarding from that element, which is also how a
/// pass terminates on cyclic nets — a traversal that revisits an element
/// must return `false` for it.
pub trait NetVisitor {
    fn visit_place(&mut self, _net: &PetriNet, _id: PlaceId, _place: &Place) -> bool {
        true
    }

    fn visit_transition(
        &mut self,
        _net: &PetriNet,
        _id: TransitionId,
        _transition: &Transition,
    ) -> bool {
        true
    }

    fn visit_arc(&mut self, _net: &PetriNet, _id: ArcId, _arc: &Arc) {}

    fn visit_subnet(&mut self, _net: &PetriNet, _owner: TransitionId, _subnet: &PetriNet) -> bool {
        true
    }
}

impl Place {
    /// Visit this place, then forward outward through every output arc.
    /// Input arcs are not traversed; a walk from the start places reaches
    /// every connected element exactly once via output edges.
    pub fn accept(&self, net: &PetriNet, id: PlaceId, visitor: &mut dyn NetVisitor) {
        if visitor.visit_place(net, id, self) {
            for &arc_id in self.output_arcs() {
                if let Some(arc) = net.get_arc(arc_id) {
                    arc.accept(net, arc_id, visitor);
                }
            }
        }
    }
}

impl Arc {
    /// Visit this arc, then forward to its destination element.
    pub fn accept(&self, net: &PetriNet, id: ArcId, visitor: &mut dyn NetVisitor) {
        visitor.visit_arc(net, id, self);
        match self.direction {
            ArcDirection::PlaceToTransition => {
                if let Some(transition) = net.get_transition(self.transition) {
                    transition.accept(net, self.transition, visitor);
                }
            }
            ArcDirection::TransitionToPlace => {
                if let Some(place) = net.get_place(self.place) {
                    place.accept(net, self.place, visitor);
                }
            }
        }
    }
}

impl Transition {
    /// Visit this transition, descend into its subnet if refined, then
    /// forward through every output arc.
    pub fn accept(&self, net: &PetriNet, id: TransitionId, visitor: &mut dyn NetVisitor) {
        if visitor.visit_transition(net, id, self) {
            if let Some(subnet) = self.subnet() {
                if visitor.visit_subnet(net, id, subnet) {
                    subnet.accept_all(visitor);
                }
            }
            for &arc_id in self.output_arcs() {
                if let Some(arc) = net.get_arc(arc_id) {
                    arc.accept(net, arc_id, visitor);
                }
            }
        }
    }
}

impl PetriNet {
    /// Token-flow walk: start every traversal at the start places and
    /// follow output edges. Elements unreachable from a start place are
    /// not visited; use [`PetriNet::accept_all`] for full coverage.
    pub fn accept(&self, visitor: &mut dyn NetVisitor) {
        for (id, place) in self.iter_places() {
            if place.is_start() {
                place.accept(self, id, visitor);
            }
        }
    }

    /// Arena walk: every place, transition (descending into subnets), and
    /// arc exactly once, independent of connectivity. Validation and
    /// other exhaustive passes are driven by this.
    pub fn accept_all(&self, visitor: &mut dyn NetVisitor) {
        for (id, place) in self.iter_places() {
            visitor.visit_place(self, id, place);
        }
        for (id, transition) in self.iter_transitions() {
            if visitor.visit_transition(self, id, transition) {
                if let Some(subnet) = transition.subnet() {
                    if visitor.visit_subnet(self, id, subnet) {
                        subnet.accept_all(visitor);
                    }
                }
            }
        }
        for (id, arc) in self.iter_arcs() {
            visitor.visit_arc(self, id, arc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::token::Token;
    use std::collections::HashSet;

    /// Call-counting double for interaction assertions.
    #[derive(Default)]
    struct Recorder {
        places: Vec<PlaceId>,
        transitions: Vec<TransitionId>,
        arcs: Vec<ArcId>,
        subnets: usize,
    }

    impl NetVisitor for Recorder {
        fn visit_place(&mut self, _net: &PetriNet, id: PlaceId, _place: &Place) -> bool {
            self.places.push(id);
            true
        }

        fn visit_transition(
            &mut self,
            _net: &PetriNet,
            id: TransitionId,
            _transition: &Transition,
        ) -> bool {
            self.transitions.push(id);
            true
        }

        fn visit_arc(&mut self, _net: &PetriNet, id: ArcId, _arc: &Arc) {
            self.arcs.push(id);
        }

        fn visit_subnet(
            &mut self,
            _net: &PetriNet,
            _owner: TransitionId,
            _subnet: &PetriNet,
        ) -> bool {
            self.subnets += 1;
            true
        }
    }

    /// Recorder that additionally cuts off repeats, for cyclic nets.
    #[derive(Default)]
    struct GuardedRecorder {
        inner: Recorder,
        seen_places: HashSet<PlaceId>,
        seen_transitions: HashSet<TransitionId>,
    }

    impl NetVisitor for GuardedRecorder {
        fn visit_place(&mut self, net: &PetriNet, id: PlaceId, place: &Place) -> bool {
            if !self.seen_places.insert(id) {
                return false;
            }
            self.inner.visit_place(net, id, place)
        }

        fn visit_transition(
            &mut self,
            net: &PetriNet,
            id: TransitionId,
            transition: &Transition,
        ) -> bool {
            if !self.seen_transitions.insert(id) {
                return false;
            }
            self.inner.visit_transition(net, id, transition)
        }

        fn visit_arc(&mut self, net: &PetriNet, id: ArcId, arc: &Arc) {
            self.inner.visit_arc(net, id, arc);
        }
    }

    fn place_with_outputs(outputs: usize) -> (PetriNet, PlaceId) {
        let mut net = PetriNet::new();
        let p = net.add_place(Place::new("p", None));
        for i in 0..outputs {
            let t = net.add_transition(Transition::new(format!("t{i}")));
            net.add_arc(Arc::input(p, t, 1));
        }
        (net, p)
    }

    #[test]
    fn place_accept_visits_once_then_each_output_arc() {
        for outputs in [0usize, 1, 2] {
            let (net, p) = place_with_outputs(outputs);
            let mut recorder = Recorder::default();
            net.get_place(p).unwrap().accept(&net, p, &mut recorder);

            assert_eq!(recorder.places, vec![p]);
            assert_eq!(recorder.arcs.len(), outputs);
            assert_eq!(recorder.transitions.len(), outputs);
        }
    }

    #[test]
    fn continuation_flag_stops_forwarding() {
        struct Refuser {
            arcs: usize,
        }
        impl NetVisitor for Refuser {
            fn visit_place(&mut self, _net: &PetriNet, _id: PlaceId, _place: &Place) -> bool {
                false
            }
            fn visit_arc(&mut self, _net: &PetriNet, _id: ArcId, _arc: &Arc) {
                self.arcs += 1;
            }
        }

        let (net, p) = place_with_outputs(2);
        let mut refuser = Refuser { arcs: 0 };
        net.get_place(p).unwrap().accept(&net, p, &mut refuser);
        assert_eq!(refuser.arcs, 0);
    }

    #[test]
    fn walk_from_start_covers_a_chain() {
        let mut net = PetriNet::new();
        let p0 = net.add_place(Place::new("p0", None));
        let p1 = net.add_place(Place::new("p1", None));
        let t0 = net.add_transition(Transition::new("t0"));
        net.add_arc(Arc::input(p0, t0, 1));
        net.add_arc(Arc::output(t0, p1, 1));
        net.get_place(p0).unwrap().add_token(Token::plain());

        let mut recorder = Recorder::default();
        net.accept(&mut recorder);
        assert_eq!(recorder.places, vec![p0, p1]);
        assert_eq!(recorder.transitions, vec![t0]);
        assert_eq!(recorder.arcs.len(), 2);
    }

    #[test]
    fn guarded_walk_terminates_on_cycles() {
        // p0 -> t0 -> p1 -> t1 -> p0, entered through a start place
        let mut net = PetriNet::new();
        let entry = net.add_place(Place::new("entry", None));
        let p0 = net.add_place(Place::new("p0", None));
        let p1 = net.add_place(Place::new("p1", None));
        let t_in = net.add_transition(Transition::new("in"));
        let t0 = net.add_transition(Transition::new("t0"));
        let t1 = net.add_transition(Transition::new("t1"));
        net.add_arc(Arc::input(entry, t_in, 1));
        net.add_arc(Arc::output(t_in, p0, 1));
        net.add_arc(Arc::input(p0, t0, 1));
        net.add_arc(Arc::output(t0, p1, 1));
        net.add_arc(Arc::input(p1, t1, 1));
        net.add_arc(Arc::output(t1, p0, 1));

        let mut recorder = GuardedRecorder::default();
        net.accept(&mut recorder);
        assert_eq!(recorder.inner.places.len(), 3);
        assert_eq!(recorder.inner.transitions.len(), 3);
        assert_eq!(recorder.inner.arcs.len(), 6);
    }

    #[test]
    fn accept_all_covers_disconnected_elements_and_subnets() {
        let mut net = PetriNet::new();
        net.add_place(Place::new("isolated", None));
        let mut refined = Transition::new("macro");
        let mut inner = PetriNet::new();
        inner.add_place(Place::new("inner", None));
        refined.refine(inner);
        net.add_transition(refined);

        let mut recorder = Recorder::default();
        net.accept_all(&mut recorder);
        // outer place + inner place, one transition, one subnet descent
        assert_eq!(recorder.places.len(), 2);
        assert_eq!(recorder.transitions.len(), 1);
        assert_eq!(recorder.subnets, 1);
    }
}
