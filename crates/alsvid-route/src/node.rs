//! Search-node state: partial schedule, qubit maps, readiness.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use alsvid_ir::{GateId, LogicalQubit, PhysicalQubit};
use rustc_hash::FxHashMap;

use crate::env::Environment;
use crate::error::{RouteError, RouteResult};
use crate::stack::SharedStack;

/// Name SWAP gates carry in the latency table.
pub const SWAP_GATE: &str = "swap";

/// What a schedule entry executes: a program gate or an inserted SWAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutedOp {
    /// A gate from the input program.
    Gate(GateId),
    /// A SWAP inserted by the router.
    Swap,
}

/// A gate placed at a start cycle on specific physical qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGate {
    /// What executes.
    pub op: RoutedOp,
    /// Start cycle.
    pub cycle: i32,
    /// Duration in cycles, at least 1.
    pub latency: u32,
    /// Physical target qubit.
    pub target: PhysicalQubit,
    /// Physical control qubit, for two-qubit operations.
    pub control: Option<PhysicalQubit>,
}

impl ScheduledGate {
    /// Check if this entry is an inserted SWAP.
    #[inline]
    pub fn is_swap(&self) -> bool {
        matches!(self.op, RoutedOp::Swap)
    }

    /// First cycle after the gate finishes.
    #[inline]
    pub fn end_cycle(&self) -> i32 {
        self.cycle + self.latency as i32
    }
}

/// Which stage of the search a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pre-execution: the qubit assignment may still be permuted for free
    /// and no gate may execute. Each expansion generation consumes one
    /// round.
    Mapping {
        /// Free permutation rounds remaining.
        rounds_left: u32,
    },
    /// Gates execute; each expansion generation advances the clock by one
    /// cycle.
    Executing,
}

/// One state of the search: a partial schedule plus everything needed to
/// extend it.
///
/// A node is mutable only while its expander is building it; once costed
/// and pushed it is shared behind `Rc` and read-only apart from the
/// `expanded`/`dead` bookkeeping flags. The scheduled-gate history is a
/// [`SharedStack`] whose tail is shared with the parent node, so a child
/// costs O(qubits) to create regardless of how much has been scheduled.
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<Rc<Node>>,
    pub(crate) phase: Phase,
    pub(crate) cycle: i32,
    /// Estimated total cycles; set by the cost strategy before pushing.
    pub cost: u32,
    /// Tiebreaker between equal-cost nodes; node modifiers may adjust it.
    pub cost2: u32,
    pub(crate) num_unscheduled: u32,
    /// Logical occupant of each physical qubit.
    pub(crate) qal: Vec<Option<LogicalQubit>>,
    /// Physical position of each logical qubit.
    pub(crate) laq: Vec<Option<PhysicalQubit>>,
    /// Last scheduled gate per physical qubit.
    pub(crate) last_gate: Vec<Option<Rc<ScheduledGate>>>,
    /// Last scheduled non-SWAP gate per logical qubit.
    pub(crate) last_non_swap: Vec<Option<GateId>>,
    /// Gates whose predecessors have all been scheduled.
    pub(crate) ready: BTreeSet<GateId>,
    /// Satisfied-predecessor counts for gates not yet ready.
    pub(crate) satisfied: FxHashMap<GateId, usize>,
    /// Scheduled gates, most recent first; tail shared with the parent.
    pub(crate) scheduled: SharedStack<Rc<ScheduledGate>>,
    pub(crate) expanded: Cell<bool>,
    pub(crate) dead: Cell<bool>,
}

impl Node {
    /// Build the root node from an initial layout.
    ///
    /// Every logical qubit the program touches must appear in `layout`.
    /// With `mapping_rounds > 0` the search starts in the mapping phase and
    /// may permute the layout for free that many generations before
    /// execution begins.
    pub fn root(
        env: &Environment,
        layout: impl IntoIterator<Item = (LogicalQubit, PhysicalQubit)>,
        mapping_rounds: u32,
    ) -> RouteResult<Self> {
        let num_physical = env.num_physical_qubits();
        let num_logical = env.dag().num_qubits();
        let mut qal = vec![None; num_physical as usize];
        let mut laq = vec![None; num_logical as usize];

        for (logical, physical) in layout {
            if logical.index() >= laq.len() {
                return Err(RouteError::LogicalOutOfRange {
                    qubit: logical,
                    num_qubits: num_logical,
                });
            }
            if physical.index() >= qal.len() {
                return Err(RouteError::PhysicalOutOfRange {
                    qubit: physical,
                    num_qubits: num_physical,
                });
            }
            if qal[physical.index()].is_some() {
                return Err(RouteError::LayoutConflict(physical));
            }
            qal[physical.index()] = Some(logical);
            laq[logical.index()] = Some(physical);
        }

        for qubit in 0..num_logical {
            let qubit = LogicalQubit(qubit);
            if env.dag().is_qubit_used(qubit) && laq[qubit.index()].is_none() {
                return Err(RouteError::UnmappedQubit(qubit));
            }
        }

        let phase = if mapping_rounds > 0 {
            Phase::Mapping {
                rounds_left: mapping_rounds,
            }
        } else {
            Phase::Executing
        };

        Ok(Self {
            parent: None,
            phase,
            cycle: -1,
            cost: 0,
            cost2: 0,
            num_unscheduled: env.dag().num_gates() as u32,
            qal,
            laq,
            last_gate: vec![None; num_physical as usize],
            last_non_swap: vec![None; num_logical as usize],
            ready: env.dag().sources().collect(),
            satisfied: FxHashMap::default(),
            scheduled: SharedStack::new(),
            expanded: Cell::new(false),
            dead: Cell::new(false),
        })
    }

    /// Build a root with the trivial layout: logical `i` on physical `i`.
    pub fn trivial_root(env: &Environment, mapping_rounds: u32) -> RouteResult<Self> {
        let layout = (0..env.dag().num_qubits()).map(|q| (LogicalQubit(q), PhysicalQubit(q)));
        Self::root(env, layout, mapping_rounds)
    }

    /// The node this one expanded from.
    #[inline]
    pub fn parent(&self) -> Option<&Rc<Node>> {
        self.parent.as_ref()
    }

    /// Which stage of the search this node belongs to.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if this node is still in the free-permutation stage.
    #[inline]
    pub fn is_mapping(&self) -> bool {
        matches!(self.phase, Phase::Mapping { .. })
    }

    /// Current virtual time. −1 until the first execution generation.
    #[inline]
    pub fn cycle(&self) -> i32 {
        self.cycle
    }

    /// Program gates not yet in this node's schedule.
    #[inline]
    pub fn num_unscheduled(&self) -> u32 {
        self.num_unscheduled
    }

    /// Check if every program gate has been scheduled.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.num_unscheduled == 0
    }

    /// Logical occupant of a physical qubit.
    #[inline]
    pub fn qubit_at(&self, physical: PhysicalQubit) -> Option<LogicalQubit> {
        self.qal[physical.index()]
    }

    /// Physical position of a logical qubit.
    #[inline]
    pub fn position_of(&self, logical: LogicalQubit) -> Option<PhysicalQubit> {
        self.laq[logical.index()]
    }

    /// Gates whose predecessors have all been scheduled, in id order.
    pub fn ready_gates(&self) -> impl Iterator<Item = GateId> + '_ {
        self.ready.iter().copied()
    }

    /// Last scheduled gate on a physical qubit.
    #[inline]
    pub fn last_gate(&self, physical: PhysicalQubit) -> Option<&Rc<ScheduledGate>> {
        self.last_gate[physical.index()].as_ref()
    }

    /// Last scheduled non-SWAP gate on a logical qubit.
    #[inline]
    pub fn last_non_swap(&self, logical: LogicalQubit) -> Option<GateId> {
        self.last_non_swap[logical.index()]
    }

    /// Iterate over this node's schedule, most recent entry first.
    pub fn schedule_iter(&self) -> crate::stack::Iter<'_, Rc<ScheduledGate>> {
        self.scheduled.iter()
    }

    /// Entries in this node's schedule, SWAPs included.
    #[inline]
    pub fn num_scheduled(&self) -> usize {
        self.scheduled.len()
    }

    /// Cycles until a physical qubit is free, measured from this node's
    /// cycle. 0 means free now.
    pub fn busy_cycles(&self, physical: PhysicalQubit) -> u32 {
        match &self.last_gate[physical.index()] {
            Some(gate) => (gate.end_cycle() - self.cycle).max(0) as u32,
            None => 0,
        }
    }

    /// Mark this node dead; the driver will discard it unexpanded.
    pub fn mark_dead(&self) {
        self.dead.set(true);
    }

    /// Exchange the logical occupants of two physical qubits without
    /// scheduling anything. Returns false iff both slots are empty.
    pub fn swap_qubits(&mut self, a: PhysicalQubit, b: PhysicalQubit) -> bool {
        let occupant_a = self.qal[a.index()];
        let occupant_b = self.qal[b.index()];
        if occupant_a.is_none() && occupant_b.is_none() {
            return false;
        }
        if let Some(logical) = occupant_a {
            self.laq[logical.index()] = Some(b);
        }
        if let Some(logical) = occupant_b {
            self.laq[logical.index()] = Some(a);
        }
        self.qal.swap(a.index(), b.index());
        true
    }

    /// Schedule a program gate `time_offset` cycles into the future,
    /// resolving physical operands through the current mapping.
    ///
    /// Returns `Ok(false)` when the gate cannot run: its physical pair is
    /// not coupled, or an operand qubit is still busy past the allowed
    /// one-cycle slack.
    pub fn schedule_gate(
        &mut self,
        env: &Environment,
        gate: GateId,
        time_offset: u32,
    ) -> RouteResult<bool> {
        let g = env.dag().gate(gate);
        let target = self
            .position_of(g.target())
            .ok_or(RouteError::UnmappedQubit(g.target()))?;
        let control = match g.control() {
            Some(c) => Some(self.position_of(c).ok_or(RouteError::UnmappedQubit(c))?),
            None => None,
        };

        if let Some(control) = control {
            if !env.coupling().is_coupled_either(target, control) {
                return Ok(false);
            }
        }

        let latency = env
            .latency()
            .latency(g.name(), g.num_qubits(), Some(target), control)?;
        let Some(start) = self.feasible_start(target, control, time_offset) else {
            return Ok(false);
        };

        let scheduled = Rc::new(ScheduledGate {
            op: RoutedOp::Gate(gate),
            cycle: start,
            latency,
            target,
            control,
        });
        self.place(scheduled, target, control);

        self.last_non_swap[g.target().index()] = Some(gate);
        if let Some(c) = g.control() {
            self.last_non_swap[c.index()] = Some(gate);
        }

        let was_ready = self.ready.remove(&gate);
        debug_assert!(was_ready, "scheduled a gate that was not ready");
        self.num_unscheduled -= 1;
        for child in env.dag().children(gate) {
            let credits = self.satisfied.entry(child).or_insert(0);
            *credits += 1;
            if *credits == env.dag().num_parents(child) {
                self.satisfied.remove(&child);
                self.ready.insert(child);
            }
        }

        Ok(true)
    }

    /// Schedule a SWAP on a coupled physical pair and apply the resulting
    /// permutation. Returns `Ok(false)` when both slots are empty or an
    /// endpoint is busy past the allowed slack.
    pub fn schedule_swap(
        &mut self,
        env: &Environment,
        a: PhysicalQubit,
        b: PhysicalQubit,
        time_offset: u32,
    ) -> RouteResult<bool> {
        debug_assert!(
            env.coupling().is_coupled_either(a, b),
            "SWAP candidates come from the coupling set"
        );
        let latency = env.latency().latency(SWAP_GATE, 2, Some(a), Some(b))?;
        let Some(start) = self.feasible_start(a, Some(b), time_offset) else {
            return Ok(false);
        };
        if !self.swap_qubits(a, b) {
            return Ok(false);
        }
        let scheduled = Rc::new(ScheduledGate {
            op: RoutedOp::Swap,
            cycle: start,
            latency,
            target: a,
            control: Some(b),
        });
        self.place(scheduled, a, Some(b));
        Ok(true)
    }

    /// Earliest start for a gate on the given qubits, or `None` when it
    /// would slip more than one cycle past the requested offset.
    fn feasible_start(
        &self,
        target: PhysicalQubit,
        control: Option<PhysicalQubit>,
        time_offset: u32,
    ) -> Option<i32> {
        let base = self.cycle + time_offset as i32;
        let mut start = base;
        for qubit in [Some(target), control].into_iter().flatten() {
            if let Some(gate) = &self.last_gate[qubit.index()] {
                start = start.max(gate.end_cycle());
            }
        }
        (start <= base + 1).then_some(start)
    }

    fn place(
        &mut self,
        gate: Rc<ScheduledGate>,
        target: PhysicalQubit,
        control: Option<PhysicalQubit>,
    ) {
        self.last_gate[target.index()] = Some(gate.clone());
        if let Some(control) = control {
            self.last_gate[control.index()] = Some(gate.clone());
        }
        self.scheduled.push(gate);
    }

    /// Prepare a child node: same state one generation later, sharing the
    /// scheduled history with this node.
    pub fn prep_child(self: &Rc<Self>) -> Node {
        let (phase, cycle) = match self.phase {
            Phase::Mapping { rounds_left } if rounds_left > 1 => (
                Phase::Mapping {
                    rounds_left: rounds_left - 1,
                },
                self.cycle,
            ),
            Phase::Mapping { .. } => (Phase::Executing, self.cycle),
            Phase::Executing => (Phase::Executing, self.cycle + 1),
        };
        Node {
            parent: Some(Rc::clone(self)),
            phase,
            cycle,
            cost: 0,
            cost2: 0,
            num_unscheduled: self.num_unscheduled,
            qal: self.qal.clone(),
            laq: self.laq.clone(),
            last_gate: self.last_gate.clone(),
            last_non_swap: self.last_non_swap.clone(),
            ready: self.ready.clone(),
            satisfied: self.satisfied.clone(),
            scheduled: self.scheduled.clone(),
            expanded: Cell::new(false),
            dead: Cell::new(false),
        }
    }

    /// The schedule in execution order, earliest entry first.
    pub fn schedule(&self) -> Vec<Rc<ScheduledGate>> {
        let mut out: Vec<_> = self.scheduled.iter().cloned().collect();
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::CouplingMap;
    use crate::cost::CycleCost;
    use crate::latency::UniformLatency;
    use alsvid_ir::GateDag;

    fn l(q: u32) -> LogicalQubit {
        LogicalQubit(q)
    }

    fn p(q: u32) -> PhysicalQubit {
        PhysicalQubit(q)
    }

    fn line_env(dag: GateDag, num_physical: u32) -> Environment {
        Environment::new(
            dag,
            CouplingMap::linear(num_physical),
            Box::new(UniformLatency::default()),
            Box::new(CycleCost),
        )
        .unwrap()
    }

    fn bell_env() -> Environment {
        let mut dag = GateDag::new(2);
        dag.add_one_qubit_gate("h", l(0)).unwrap();
        dag.add_two_qubit_gate("cx", l(0), l(1)).unwrap();
        line_env(dag, 3)
    }

    fn check_bijection(node: &Node) {
        for (physical, &occupant) in node.qal.iter().enumerate() {
            if let Some(logical) = occupant {
                assert_eq!(node.position_of(logical), Some(PhysicalQubit(physical as u32)));
            }
        }
        for (logical, &position) in node.laq.iter().enumerate() {
            if let Some(physical) = position {
                assert_eq!(node.qubit_at(physical), Some(LogicalQubit(logical as u32)));
            }
        }
    }

    #[test]
    fn test_root_layout() {
        let env = bell_env();
        let root = Node::trivial_root(&env, 0).unwrap();
        assert_eq!(root.qubit_at(p(0)), Some(l(0)));
        assert_eq!(root.qubit_at(p(2)), None);
        assert_eq!(root.num_unscheduled(), 2);
        assert_eq!(root.ready_gates().count(), 1);
        assert!(!root.is_mapping());
        assert_eq!(root.cycle(), -1);
        check_bijection(&root);
    }

    #[test]
    fn test_root_rejects_missing_placement() {
        let env = bell_env();
        let err = Node::root(&env, [(l(0), p(0))], 0);
        assert!(matches!(err, Err(RouteError::UnmappedQubit(q)) if q == l(1)));
    }

    #[test]
    fn test_root_rejects_conflicting_layout() {
        let env = bell_env();
        let err = Node::root(&env, [(l(0), p(0)), (l(1), p(0))], 0);
        assert!(matches!(err, Err(RouteError::LayoutConflict(q)) if q == p(0)));
    }

    #[test]
    fn test_swap_qubits_roundtrip() {
        let env = bell_env();
        let mut node = Node::trivial_root(&env, 0).unwrap();

        assert!(node.swap_qubits(p(0), p(2)));
        assert_eq!(node.qubit_at(p(2)), Some(l(0)));
        assert_eq!(node.qubit_at(p(0)), None);
        assert_eq!(node.position_of(l(0)), Some(p(2)));
        check_bijection(&node);

        // A second identical swap restores the original mapping.
        assert!(node.swap_qubits(p(0), p(2)));
        assert_eq!(node.qubit_at(p(0)), Some(l(0)));
        assert_eq!(node.qubit_at(p(2)), None);
        check_bijection(&node);
    }

    #[test]
    fn test_swap_empty_slots() {
        let mut dag = GateDag::new(2);
        dag.add_one_qubit_gate("h", l(0)).unwrap();
        dag.add_two_qubit_gate("cx", l(0), l(1)).unwrap();
        let env = line_env(dag, 4);
        let mut node = Node::trivial_root(&env, 0).unwrap();

        // One occupied slot still permutes.
        assert!(node.swap_qubits(p(1), p(3)));
        assert_eq!(node.qubit_at(p(3)), Some(l(1)));
        assert_eq!(node.qubit_at(p(1)), None);
        check_bijection(&node);

        // Two empty slots: nothing to exchange.
        assert!(!node.swap_qubits(p(1), p(2)));
    }

    #[test]
    fn test_schedule_gate_updates_readiness() {
        let env = bell_env();
        let root = Rc::new(Node::trivial_root(&env, 0).unwrap());
        let mut child = root.prep_child();
        assert_eq!(child.cycle(), 0);

        let h = child.ready_gates().next().unwrap();
        assert!(child.schedule_gate(&env, h, 0).unwrap());
        assert_eq!(child.num_unscheduled(), 1);
        assert_eq!(child.num_scheduled(), 1);

        // The CX became ready; the parent saw none of this.
        let cx = child.ready_gates().next().unwrap();
        assert_ne!(cx, h);
        assert_eq!(root.num_scheduled(), 0);
        assert_eq!(root.num_unscheduled(), 2);

        let scheduled = child.last_gate(p(0)).unwrap();
        assert_eq!(scheduled.cycle, 0);
        assert_eq!(scheduled.latency, 1);
        assert_eq!(child.last_non_swap(l(0)), Some(h));
    }

    #[test]
    fn test_schedule_gate_rejects_uncoupled_pair() {
        let mut dag = GateDag::new(2);
        dag.add_two_qubit_gate("cx", l(0), l(1)).unwrap();
        let env = line_env(dag, 3);

        // Map the operands two hops apart.
        let root = Rc::new(Node::root(&env, [(l(0), p(0)), (l(1), p(2))], 0).unwrap());
        let mut child = root.prep_child();
        let cx = child.ready_gates().next().unwrap();
        assert!(!child.schedule_gate(&env, cx, 0).unwrap());
        assert_eq!(child.num_unscheduled(), 1);
    }

    #[test]
    fn test_busy_conflict_rejected() {
        let env = bell_env();
        let root = Rc::new(Node::trivial_root(&env, 0).unwrap());
        let mut child = root.prep_child();

        // A SWAP holds both qubits for 6 cycles; the H gate on the same
        // qubit cannot start within the one-cycle slack.
        assert!(child.schedule_swap(&env, p(0), p(1), 0).unwrap());
        assert_eq!(child.busy_cycles(p(0)), 6);
        let h = child.ready_gates().next().unwrap();
        // H now resolves to physical 1 (the swap moved logical 0 there).
        assert_eq!(child.position_of(l(0)), Some(p(1)));
        assert!(!child.schedule_gate(&env, h, 0).unwrap());
    }

    #[test]
    fn test_swap_schedules_and_permutes() {
        let env = bell_env();
        let root = Rc::new(Node::trivial_root(&env, 0).unwrap());
        let mut child = root.prep_child();

        assert!(child.schedule_swap(&env, p(1), p(2), 0).unwrap());
        let swap = child.last_gate(p(1)).unwrap();
        assert!(swap.is_swap());
        assert_eq!(swap.latency, 6);
        assert_eq!(child.qubit_at(p(2)), Some(l(1)));
        // SWAPs never count as the last non-swap use of a qubit.
        assert_eq!(child.last_non_swap(l(1)), None);
        check_bijection(&child);
    }

    #[test]
    fn test_prep_child_shares_history() {
        let env = bell_env();
        let root = Rc::new(Node::trivial_root(&env, 0).unwrap());
        let mut child = root.prep_child();
        let h = child.ready_gates().next().unwrap();
        assert!(child.schedule_gate(&env, h, 0).unwrap());

        let child = Rc::new(child);
        let mut grandchild = child.prep_child();
        assert_eq!(grandchild.cycle(), 1);
        let cx = grandchild.ready_gates().next().unwrap();
        assert!(grandchild.schedule_gate(&env, cx, 0).unwrap());

        let schedule = grandchild.schedule();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].op, RoutedOp::Gate(h));
        assert_eq!(schedule[1].op, RoutedOp::Gate(cx));
        assert!(schedule[0].cycle <= schedule[1].cycle);
        // The intermediate node still sees only its own prefix.
        assert_eq!(child.schedule().len(), 1);
    }

    #[test]
    fn test_mapping_phase_transitions() {
        let env = bell_env();
        let root = Rc::new(Node::trivial_root(&env, 2).unwrap());
        assert!(root.is_mapping());

        let second = Rc::new(root.prep_child());
        assert_eq!(second.phase(), Phase::Mapping { rounds_left: 1 });
        assert_eq!(second.cycle(), -1);

        let third = Rc::new(second.prep_child());
        assert_eq!(third.phase(), Phase::Executing);
        assert_eq!(third.cycle(), -1);

        let fourth = third.prep_child();
        assert_eq!(fourth.cycle(), 0);
    }
}
