//! Frontier analysis shared by the expanders.

use std::rc::Rc;

use alsvid_ir::{GateId, LogicalQubit, PhysicalQubit};

use crate::env::Environment;
use crate::error::{RouteError, RouteResult};
use crate::node::Node;

/// Per-expansion view of a node: which ready gates can run in every child
/// and which SWAPs are worth branching on.
pub(super) struct Frontier {
    /// Ready gates executable now; scheduled in every child.
    pub guaranteed: Vec<GateId>,
    /// SWAP candidates, each doubling the subset space.
    pub candidates: Vec<(PhysicalQubit, PhysicalQubit)>,
    /// True if any physical qubit is still running a gate.
    pub has_busy_qubits: bool,
}

/// Knobs the expanders vary on top of the common analysis.
pub(super) struct AnalysisOptions {
    /// Consider SWAP candidates at all.
    pub allow_swaps: bool,
    /// Drop candidates that would immediately reverse a SWAP scheduled in
    /// the previous generation.
    pub forbid_swap_undo: bool,
}

pub(super) fn analyze(
    env: &Environment,
    node: &Node,
    opts: &AnalysisOptions,
) -> RouteResult<Frontier> {
    let num_physical = env.num_physical_qubits() as usize;
    let num_logical = env.dag().num_qubits() as usize;
    let executing = !node.is_mapping();

    let mut has_busy_qubits = false;
    for qubit in 0..num_physical {
        if node.busy_cycles(PhysicalQubit(qubit as u32)) > 0 {
            has_busy_qubits = true;
            break;
        }
    }

    let cx_frontier = build_cx_frontier(env, node, num_logical);

    // Ready gates executable now get scheduled in every child; their
    // physical qubits are off-limits to candidate SWAPs.
    let mut occupied = vec![false; num_physical];
    let mut guaranteed = vec![];
    for gate in node.ready_gates() {
        let g = env.dag().gate(gate);
        let mut good = executing;

        let target = node
            .position_of(g.target())
            .ok_or(RouteError::UnmappedQubit(g.target()))?;
        if node.busy_cycles(target) > 1 {
            good = false;
        }

        let mut control = None;
        if let Some(c) = g.control() {
            let position = node.position_of(c).ok_or(RouteError::UnmappedQubit(c))?;
            control = Some(position);
            if node.busy_cycles(position) > 1 {
                good = false;
            }
            if good && !env.coupling().is_coupled_either(target, position) {
                good = false;
            }
        }

        if good {
            guaranteed.push(gate);
            occupied[target.index()] = true;
            if let Some(control) = control {
                occupied[control.index()] = true;
            }
        }
    }

    let mut candidates = vec![];
    if opts.allow_swaps {
        let forbidden = if opts.forbid_swap_undo {
            recent_swaps(node)
        } else {
            vec![]
        };

        for &(a, b) in env.possible_swaps() {
            if forbidden
                .iter()
                .any(|&(fa, fb)| (fa == a && fb == b) || (fa == b && fb == a))
            {
                continue;
            }

            // Helpfulness: the swap must strictly shorten a frontier CX.
            let mut helps = false;
            for logical in [node.qubit_at(a), node.qubit_at(b)].into_iter().flatten() {
                let Some(cx) = cx_frontier[logical.index()] else {
                    continue;
                };
                let g = env.dag().gate(cx);
                let c = g.control().expect("CX frontier only holds two-qubit gates");
                let control = node.position_of(c).ok_or(RouteError::UnmappedQubit(c))?;
                let target = node
                    .position_of(g.target())
                    .ok_or(RouteError::UnmappedQubit(g.target()))?;
                let current = env
                    .coupling()
                    .distance(control, target)
                    .ok_or(RouteError::Disconnected(control, target))?;
                let (hc, ht) = (swapped_position(control, a, b), swapped_position(target, a, b));
                let hypothetical = env
                    .coupling()
                    .distance(hc, ht)
                    .ok_or(RouteError::Disconnected(hc, ht))?;
                if hypothetical < current {
                    helps = true;
                    break;
                }
            }
            if !helps {
                continue;
            }

            // Occupancy is bypassed while the mapping is still free.
            if executing && (occupied[a.index()] || occupied[b.index()]) {
                continue;
            }

            // At least one moved qubit must be used again downstream.
            let used_again = [node.qubit_at(a), node.qubit_at(b)]
                .into_iter()
                .flatten()
                .any(|logical| qubit_used_again(env, node, logical));
            if !used_again {
                continue;
            }

            if node.busy_cycles(a) > 1 || node.busy_cycles(b) > 1 {
                continue;
            }

            candidates.push((a, b));
        }
    }
    assert!(
        candidates.len() < 64,
        "subset enumeration supports at most 63 candidate SWAPs"
    );

    Ok(Frontier {
        guaranteed,
        candidates,
        has_busy_qubits,
    })
}

/// For each logical qubit, the two-qubit gate that currently stands to use
/// it: ready two-qubit gates first, then — through each ready one-qubit
/// gate — the next two-qubit gate downstream on its wire, higher
/// criticality displacing lower.
fn build_cx_frontier(env: &Environment, node: &Node, num_logical: usize) -> Vec<Option<GateId>> {
    let mut frontier: Vec<Option<GateId>> = vec![None; num_logical];

    for gate in node.ready_gates() {
        let g = env.dag().gate(gate);
        if let Some(c) = g.control() {
            frontier[g.target().index()] = Some(gate);
            frontier[c.index()] = Some(gate);
        }
    }

    for gate in node.ready_gates() {
        let g = env.dag().gate(gate);
        if g.control().is_some() {
            continue;
        }
        let Some(next) = g.next_target_two_qubit() else {
            continue;
        };
        let h = env.dag().gate(next);
        let hc = h.control().expect("next_target_two_qubit links to a two-qubit gate");

        let target_slot = frontier[h.target().index()];
        let control_slot = frontier[hc.index()];
        if target_slot.is_none() && control_slot.is_none() {
            frontier[h.target().index()] = Some(next);
            frontier[hc.index()] = Some(next);
            continue;
        }

        let beats_all = [target_slot, control_slot]
            .into_iter()
            .flatten()
            .all(|occupant| env.dag().gate(occupant).criticality() < h.criticality());
        if beats_all {
            for occupant in [target_slot, control_slot].into_iter().flatten() {
                clear_frontier(&mut frontier, env, occupant);
            }
            frontier[h.target().index()] = Some(next);
            frontier[hc.index()] = Some(next);
        }
    }

    frontier
}

/// Remove a gate from both of its frontier slots.
fn clear_frontier(frontier: &mut [Option<GateId>], env: &Environment, gate: GateId) {
    let g = env.dag().gate(gate);
    if frontier[g.target().index()] == Some(gate) {
        frontier[g.target().index()] = None;
    }
    if let Some(c) = g.control() {
        if frontier[c.index()] == Some(gate) {
            frontier[c.index()] = None;
        }
    }
}

/// SWAP pairs scheduled in this node's most recent generation.
fn recent_swaps(node: &Node) -> Vec<(PhysicalQubit, PhysicalQubit)> {
    let mut swaps = vec![];
    for gate in node
        .schedule_iter()
        .take_while(|gate| gate.cycle >= node.cycle())
    {
        if let (true, Some(control)) = (gate.is_swap(), gate.control) {
            swaps.push((gate.target, control));
        }
    }
    swaps
}

/// Where a qubit ends up if the occupants of `a` and `b` are exchanged.
fn swapped_position(p: PhysicalQubit, a: PhysicalQubit, b: PhysicalQubit) -> PhysicalQubit {
    if p == a {
        b
    } else if p == b {
        a
    } else {
        p
    }
}

/// A qubit with no scheduled non-SWAP gate is conservatively assumed to be
/// used again; otherwise its last use must have a successor on that wire.
fn qubit_used_again(env: &Environment, node: &Node, logical: LogicalQubit) -> bool {
    match node.last_non_swap(logical) {
        None => true,
        Some(gate) => env.dag().gate(gate).child_on(logical).is_some(),
    }
}

/// Build one child of `node` for a subset of the candidate SWAPs, then
/// schedule every guaranteed gate. Returns `None` when the subset is
/// infeasible (SWAPs colliding on a qubit).
pub(super) fn build_child(
    env: &Environment,
    node: &Rc<Node>,
    frontier: &Frontier,
    subset: u64,
) -> RouteResult<Option<Node>> {
    let executing = !node.is_mapping();
    let mut child = node.prep_child();

    for (bit, &(a, b)) in frontier.candidates.iter().enumerate() {
        if subset & (1 << bit) == 0 {
            continue;
        }
        let ok = if executing {
            child.schedule_swap(env, a, b, 0)?
        } else {
            child.swap_qubits(a, b)
        };
        if !ok {
            return Ok(None);
        }
    }

    for &gate in &frontier.guaranteed {
        let ok = child.schedule_gate(env, gate, 0)?;
        assert!(ok, "guaranteed gate failed to schedule");
    }

    child.cost = env.evaluate(&mut child)?;
    Ok(Some(child))
}

/// True when the empty subset would add nothing: no gates to schedule, no
/// running gate to wait out, and no mapping round to consume.
pub(super) fn skip_empty_subset(node: &Node, frontier: &Frontier) -> bool {
    frontier.guaranteed.is_empty() && !frontier.has_busy_qubits && !node.is_mapping()
}
