//! Device coupling map.

use std::collections::VecDeque;

use alsvid_ir::PhysicalQubit;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Directed hardware connectivity.
///
/// An edge `(a, b)` means a two-qubit gate may execute with target `a` and
/// control `b` on the device. Gate placement accepts either direction of a
/// coupled pair; distance queries and SWAP candidacy use the symmetric
/// closure.
///
/// ## Performance
///
/// Factory constructors precompute an all-pairs distance matrix with one
/// BFS per qubit, giving O(1) `distance()` lookups during the search.
/// Manually built maps fall back to per-query BFS until
/// [`rebuild_caches()`](Self::rebuild_caches) is called.
///
/// ## Deserialization
///
/// The adjacency list and distance matrix are skipped during
/// serialization; call [`rebuild_caches()`](Self::rebuild_caches) after
/// deserializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// Directed coupled pairs, in registration order.
    edges: Vec<(PhysicalQubit, PhysicalQubit)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Directed membership for O(1) coupling checks.
    #[serde(skip)]
    directed: FxHashSet<(u32, u32)>,
    /// Symmetric-closure adjacency, indexed by qubit.
    #[serde(skip)]
    adjacency: Vec<Vec<u32>>,
    /// All-pairs shortest-path distances over the symmetric closure.
    /// `u32::MAX` marks an unreachable pair.
    #[serde(skip)]
    dist: Vec<Vec<u32>>,
}

impl CouplingMap {
    /// Create an empty coupling map over `num_qubits` physical qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            directed: FxHashSet::default(),
            adjacency: vec![vec![]; num_qubits as usize],
            dist: vec![],
        }
    }

    /// Add a directed edge. Duplicates of the same direction are ignored.
    pub fn add_edge(&mut self, target: PhysicalQubit, control: PhysicalQubit) {
        if !self.directed.insert((target.0, control.0)) {
            return;
        }
        self.edges.push((target, control));
        let adj = &mut self.adjacency;
        if !adj[target.index()].contains(&control.0) {
            adj[target.index()].push(control.0);
            adj[control.index()].push(target.0);
        }
    }

    /// Number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// The directed coupled pairs, in registration order.
    pub fn edges(&self) -> &[(PhysicalQubit, PhysicalQubit)] {
        &self.edges
    }

    /// Check directed coupling membership.
    #[inline]
    pub fn is_coupled(&self, target: PhysicalQubit, control: PhysicalQubit) -> bool {
        self.directed.contains(&(target.0, control.0))
    }

    /// Check coupling membership in either direction.
    #[inline]
    pub fn is_coupled_either(&self, a: PhysicalQubit, b: PhysicalQubit) -> bool {
        self.is_coupled(a, b) || self.is_coupled(b, a)
    }

    /// Neighbors of a qubit in the symmetric closure.
    pub fn neighbors(&self, qubit: PhysicalQubit) -> impl Iterator<Item = PhysicalQubit> + '_ {
        self.adjacency
            .get(qubit.index())
            .into_iter()
            .flatten()
            .map(|&q| PhysicalQubit(q))
    }

    /// Shortest-path distance over the symmetric closure, or `None` if the
    /// pair is unreachable.
    ///
    /// O(1) once the distance matrix is built; falls back to BFS otherwise.
    pub fn distance(&self, from: PhysicalQubit, to: PhysicalQubit) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let (f, t) = (from.index(), to.index());
        if f < self.dist.len() && t < self.dist[f].len() {
            let d = self.dist[f][t];
            return if d == u32::MAX { None } else { Some(d) };
        }
        self.distance_bfs(from, to)
    }

    /// Rebuild the adjacency caches and distance matrix from the edge list.
    /// Must be called after deserialization to restore O(1) lookups.
    pub fn rebuild_caches(&mut self) {
        self.directed.clear();
        self.adjacency = vec![vec![]; self.num_qubits as usize];
        for &(a, b) in &self.edges {
            self.directed.insert((a.0, b.0));
            if !self.adjacency[a.index()].contains(&b.0) {
                self.adjacency[a.index()].push(b.0);
                self.adjacency[b.index()].push(a.0);
            }
        }
        self.precompute_distances();
    }

    /// Precompute all-pairs shortest paths with one BFS per qubit.
    fn precompute_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist = vec![vec![u32::MAX; n]; n];
        for src in 0..n {
            self.dist[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src);
            while let Some(current) = queue.pop_front() {
                for &nb in &self.adjacency[current] {
                    let nb = nb as usize;
                    if self.dist[src][nb] == u32::MAX {
                        self.dist[src][nb] = self.dist[src][current] + 1;
                        queue.push_back(nb);
                    }
                }
            }
        }
    }

    /// BFS fallback for maps without a precomputed matrix.
    fn distance_bfs(&self, from: PhysicalQubit, to: PhysicalQubit) -> Option<u32> {
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(from.0);
        queue.push_back((from.0, 0u32));
        while let Some((current, d)) = queue.pop_front() {
            for &nb in self.adjacency.get(current as usize).into_iter().flatten() {
                if nb == to.0 {
                    return Some(d + 1);
                }
                if visited.insert(nb) {
                    queue.push_back((nb, d + 1));
                }
            }
        }
        None
    }

    /// Create a linear chain 0-1-2-...
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(PhysicalQubit(i), PhysicalQubit(i + 1));
        }
        map.precompute_distances();
        map
    }

    /// Create a ring 0-1-...-(n-1)-0.
    pub fn ring(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(PhysicalQubit(i), PhysicalQubit(i + 1));
        }
        if n > 2 {
            map.add_edge(PhysicalQubit(n - 1), PhysicalQubit(0));
        }
        map.precompute_distances();
        map
    }

    /// Create a fully connected map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                map.add_edge(PhysicalQubit(i), PhysicalQubit(j));
            }
        }
        map.precompute_distances();
        map
    }
}
