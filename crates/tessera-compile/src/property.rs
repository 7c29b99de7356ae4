//! `PropertySet` and the target description types passes share.
//!
//! The compile driver fills a [`PropertySet`] per circuit (coupling map,
//! basis gates, initial layout, routing settings); passes read it and write
//! back what later stages need, most importantly the final [`Layout`] and
//! the [`RoutingStats`] of the selected routing trial.
//!
//! # Examples
//!
//! ```
//! use tessera_compile::{BasisGates, CouplingMap, PropertySet};
//!
//! let props = PropertySet::new()
//!     .with_target(CouplingMap::from_edges([(0, 1), (1, 2)]), BasisGates::default());
//!
//! let cm = props.coupling_map.as_ref().unwrap();
//! assert!(cm.has_edge(0, 1));
//! assert!(!cm.has_edge(1, 0));
//! assert!(cm.is_connected(1, 0));
//! assert!(props.basis_gates.as_ref().unwrap().contains("u2"));
//! ```
//!
//! Custom properties are keyed by type:
//!
//! ```
//! use tessera_compile::PropertySet;
//!
//! #[derive(Debug, PartialEq)]
//! struct GatesRemoved(usize);
//!
//! let mut props = PropertySet::new();
//! props.insert(GatesRemoved(4));
//! assert_eq!(props.get::<GatesRemoved>(), Some(&GatesRemoved(4)));
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tessera_ir::QubitId;

/// A bijection between virtual (program) qubits and physical qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    logical_to_physical: FxHashMap<QubitId, u32>,
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity layout: virtual qubit `i` on physical qubit `i`.
    pub fn trivial(num_qubits: u32) -> Self {
        (0..num_qubits).map(|i| (QubitId(i), i)).collect()
    }

    /// Map `logical` onto `physical`, dropping whatever either side was
    /// mapped to before so the two directions stay consistent.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        if let Some(old_logical) = self.physical_to_logical.insert(physical, logical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(old_physical) = self.logical_to_physical.insert(logical, physical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
    }

    /// Physical position of a virtual qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Virtual qubit held by a physical qubit.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the contents of two physical qubits. Either side may be
    /// empty.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);
        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// `(virtual, physical)` pairs sorted by virtual qubit.
    pub fn pairs(&self) -> Vec<(QubitId, u32)> {
        let mut pairs: Vec<_> = self
            .logical_to_physical
            .iter()
            .map(|(&l, &p)| (l, p))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

impl FromIterator<(QubitId, u32)> for Layout {
    fn from_iter<I: IntoIterator<Item = (QubitId, u32)>>(iter: I) -> Self {
        let mut layout = Self::new();
        for (logical, physical) in iter {
            layout.add(logical, physical);
        }
        layout
    }
}

/// Device connectivity: directed `control -> target` edges over physical
/// qubits `0..num_qubits`.
///
/// Routing only cares about adjacency (an edge in either direction); the
/// direction corrector cares about the exact direction.
///
/// ## Performance
///
/// All-pairs BFS distances and predecessors are precomputed on
/// construction, so `distance()` is O(1) and `shortest_path()` is
/// O(distance). After deserialization call
/// [`rebuild_caches()`](Self::rebuild_caches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// Directed edges in insertion order.
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Undirected adjacency, neighbours in insertion order.
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
    /// `dist_matrix[from][to]`, `u32::MAX` when unreachable.
    #[serde(skip)]
    dist_matrix: Vec<Vec<u32>>,
    /// `pred_matrix[from][to]` is the hop before `to` on the path from `from`.
    #[serde(skip)]
    pred_matrix: Vec<Vec<u32>>,
}

impl PartialEq for CouplingMap {
    fn eq(&self, other: &Self) -> bool {
        self.num_qubits == other.num_qubits && self.edges == other.edges
    }
}

impl CouplingMap {
    /// Create a coupling map with `num_qubits` isolated qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
            dist_matrix: vec![],
            pred_matrix: vec![],
        }
    }

    /// Build from a directed edge list. The qubit count is one past the
    /// largest index mentioned.
    pub fn from_edges(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut map = Self::new(0);
        for (control, target) in edges {
            map.add_edge(control, target);
        }
        map.precompute_distances();
        map
    }

    /// Build from the legacy `{control: [targets...]}` mapping.
    pub fn from_legacy(map: &BTreeMap<u32, Vec<u32>>) -> Self {
        warn!("coupling map given as a mapping is deprecated; use an edge list");
        Self::from_edges(
            map.iter()
                .flat_map(|(&control, targets)| targets.iter().map(move |&t| (control, t))),
        )
    }

    /// Add a directed edge. Exact duplicates are ignored; the qubit count
    /// grows to cover both endpoints. Path caches are dropped until the
    /// next [`rebuild_caches()`](Self::rebuild_caches).
    pub fn add_edge(&mut self, control: u32, target: u32) {
        if self.edges.contains(&(control, target)) {
            return;
        }
        self.num_qubits = self.num_qubits.max(control.max(target) + 1);
        self.edges.push((control, target));
        for (a, b) in [(control, target), (target, control)] {
            let neighbors = self.adjacency.entry(a).or_default();
            if !neighbors.contains(&b) {
                neighbors.push(b);
            }
        }
        self.dist_matrix.clear();
        self.pred_matrix.clear();
    }

    fn precompute_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist_matrix = vec![vec![u32::MAX; n]; n];
        self.pred_matrix = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::new();
            #[allow(clippy::cast_possible_truncation)]
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    let nb = neighbor as usize;
                    if self.dist_matrix[src][nb] == u32::MAX {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        self.pred_matrix[src][nb] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Recompute adjacency and path caches from the edge list.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        for &(a, b) in &self.edges {
            for (x, y) in [(a, b), (b, a)] {
                let neighbors = self.adjacency.entry(x).or_default();
                if !neighbors.contains(&y) {
                    neighbors.push(y);
                }
            }
        }
        self.precompute_distances();
    }

    /// Whether the device natively supports `control -> target`.
    #[inline]
    pub fn has_edge(&self, control: u32, target: u32) -> bool {
        self.edges.contains(&(control, target))
    }

    /// Whether two physical qubits share an edge in either direction.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Directed edges in insertion order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Neighbours of a physical qubit, in either direction.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency.get(&qubit).into_iter().flatten().copied()
    }

    /// Whether every pair of qubits is adjacent.
    pub fn is_all_to_all(&self) -> bool {
        let n = self.num_qubits;
        (0..n).all(|a| (a + 1..n).all(|b| self.is_connected(a, b)))
    }

    /// Whether every qubit can reach every other.
    pub fn is_connected_graph(&self) -> bool {
        let n = self.num_qubits;
        n == 0 || (1..n).all(|q| self.distance(0, q).is_some())
    }

    /// Chain `0 -> 1 -> ... -> n-1`.
    pub fn linear(n: u32) -> Self {
        Self::from_edges((1..n).map(|i| (i - 1, i)))
    }

    /// Every ordered pair of distinct qubits.
    pub fn full(n: u32) -> Self {
        Self::from_edges((0..n).flat_map(|a| (0..n).filter(move |&b| b != a).map(move |b| (a, b))))
    }

    /// Hop count between two physical qubits, ignoring direction.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let d = *self
            .dist_matrix
            .get(from as usize)?
            .get(to as usize)?;
        (d != u32::MAX).then_some(d)
    }

    /// A shortest path `from ..= to`, ignoring direction.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }
        self.distance(from, to)?;

        let preds = self.pred_matrix.get(from as usize)?;
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let pred = *preds.get(current as usize)?;
            if pred == u32::MAX {
                return None;
            }
            path.push(pred);
            current = pred;
        }
        path.reverse();
        Some(path)
    }
}

/// Token a basis used to be given as before comma lists.
const LEGACY_BASIS: &str = "SU2+CNOT";

/// Gate names the target accepts as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BasisSpec", into = "Vec<String>")]
pub struct BasisGates {
    gates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BasisSpec {
    List(Vec<String>),
    Text(String),
}

impl From<BasisSpec> for BasisGates {
    fn from(spec: BasisSpec) -> Self {
        match spec {
            BasisSpec::List(gates) => Self::new(gates),
            BasisSpec::Text(text) => Self::parse(&text),
        }
    }
}

impl From<BasisGates> for Vec<String> {
    fn from(basis: BasisGates) -> Self {
        basis.gates
    }
}

impl Default for BasisGates {
    /// `u1,u2,u3,cx,id`.
    fn default() -> Self {
        Self::new(["u1", "u2", "u3", "cx", "id"])
    }
}

impl BasisGates {
    /// Create a basis from gate names, keeping first occurrences.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut out: Vec<String> = vec![];
        for g in gates {
            let g = g.into();
            if !g.is_empty() && !out.contains(&g) {
                out.push(g);
            }
        }
        Self { gates: out }
    }

    /// Parse a comma-separated basis.
    ///
    /// A single token such as `SU2+CNOT` is the deprecated way of naming
    /// the default basis and is replaced by it with a warning.
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() < 2 {
            warn!(
                basis = text,
                "deprecated basis specification (e.g. '{LEGACY_BASIS}'), substituting u1,u2,u3,cx,id"
            );
            return Self::default();
        }
        Self::new(tokens)
    }

    /// `rz`, `sx`, `x`, `cx`, `id`.
    pub fn rz_sx() -> Self {
        Self::new(["rz", "sx", "x", "cx", "id"])
    }

    /// Check whether a gate name is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Gate names in the basis.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }
}

impl std::fmt::Display for BasisGates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.gates.join(","))
    }
}

/// Outcome of the routing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingStats {
    /// SWAPs inserted by the selected trial.
    pub swaps: usize,
    /// Index of the selected trial.
    pub selected_trial: usize,
    /// Number of trials evaluated.
    pub trials: usize,
}

/// Settings of the randomized routing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingSettings {
    /// Independent trials to run.
    pub trials: usize,
    /// Base seed every trial generator derives from.
    pub seed: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self { trials: 20, seed: 13 }
    }
}

/// Per-circuit state shared by the passes.
///
/// ```
/// use tessera_compile::{Layout, PropertySet};
///
/// let props = PropertySet::new().with_layout(Layout::trivial(3));
/// assert_eq!(props.layout.as_ref().map(Layout::len), Some(3));
/// ```
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Current layout. Before routing it is the requested initial layout;
    /// after routing it is the final one.
    pub layout: Option<Layout>,

    /// Target coupling graph. Routing and later passes only run when set.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis for the unroller and the fusion pass.
    pub basis_gates: Option<BasisGates>,

    /// Routing search settings.
    pub routing: RoutingSettings,

    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.coupling_map = Some(coupling_map);
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set only the basis gates.
    #[must_use]
    pub fn with_basis(mut self, basis_gates: BasisGates) -> Self {
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the routing search settings.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingSettings) -> Self {
        self.routing = routing;
        self
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_trivial() {
        let layout = Layout::trivial(5);
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(4)), Some(4));
        assert_eq!(layout.get_logical(2), Some(QubitId(2)));
    }

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);

        assert_eq!(layout.get_physical(QubitId(0)), Some(2));
        assert_eq!(layout.get_physical(QubitId(2)), Some(0));
        assert_eq!(layout.get_logical(0), Some(QubitId(2)));
        assert_eq!(layout.get_logical(2), Some(QubitId(0)));
    }

    #[test]
    fn test_layout_swap_with_empty_slot() {
        let mut layout = Layout::trivial(2);
        layout.swap(1, 4);
        assert_eq!(layout.get_physical(QubitId(1)), Some(4));
        assert_eq!(layout.get_logical(1), None);
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_layout_add_keeps_bijection() {
        let mut layout = Layout::trivial(2);
        layout.add(QubitId(0), 1);
        assert_eq!(layout.get_logical(1), Some(QubitId(0)));
        assert_eq!(layout.get_physical(QubitId(1)), None);
        assert_eq!(layout.pairs(), vec![(QubitId(0), 1)]);
    }

    #[test]
    fn test_coupling_map_directed() {
        let map = CouplingMap::from_edges([(0, 1), (2, 1)]);
        assert_eq!(map.num_qubits(), 3);
        assert!(map.has_edge(0, 1));
        assert!(!map.has_edge(1, 0));
        assert!(map.is_connected(1, 0));
        assert!(map.is_connected(1, 2));
        assert_eq!(map.distance(0, 2), Some(2));
        assert_eq!(map.shortest_path(0, 2), Some(vec![0, 1, 2]));
    }

    #[test]
    fn test_coupling_map_linear() {
        let map = CouplingMap::linear(5);
        assert!(map.is_connected(0, 1));
        assert!(!map.is_connected(0, 2));
        assert_eq!(map.distance(0, 4), Some(4));
        assert_eq!(map.shortest_path(4, 0), Some(vec![4, 3, 2, 1, 0]));
        assert!(!map.is_all_to_all());
        assert!(CouplingMap::full(4).is_all_to_all());
    }

    #[test]
    fn test_coupling_map_disconnected() {
        let map = CouplingMap::from_edges([(0, 1), (2, 3)]);
        assert_eq!(map.distance(0, 3), None);
        assert_eq!(map.shortest_path(0, 3), None);
        assert!(!map.is_connected_graph());
    }

    #[test]
    fn test_coupling_map_legacy_mapping() {
        let legacy = BTreeMap::from([(0, vec![1, 2]), (1, vec![2])]);
        let map = CouplingMap::from_legacy(&legacy);
        assert_eq!(map.edges(), &[(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_coupling_map_serde_rebuild() {
        let map = CouplingMap::linear(3);
        let json = serde_json::to_string(&map).unwrap();
        let mut back: CouplingMap = serde_json::from_str(&json).unwrap();
        back.rebuild_caches();
        assert_eq!(back, map);
        assert_eq!(back.distance(0, 2), Some(2));
    }

    #[test]
    fn test_basis_parse() {
        let basis = BasisGates::parse("u1, u2,u3,cx,id");
        assert_eq!(basis.gates(), BasisGates::default().gates());
        assert_eq!(BasisGates::parse("SU2+CNOT"), BasisGates::default());
        assert_eq!(basis.to_string(), "u1,u2,u3,cx,id");
    }

    #[test]
    fn test_basis_deserialize_string_or_list() {
        let a: BasisGates = serde_json::from_str("\"rz,sx,cx\"").unwrap();
        let b: BasisGates = serde_json::from_str("[\"rz\",\"sx\",\"cx\"]").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[\"rz\",\"sx\",\"cx\"]");
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));

        let removed = props.remove::<CustomData>();
        assert_eq!(removed, Some(CustomData(42)));
        assert_eq!(props.get::<CustomData>(), None);
        assert_eq!(props.routing, RoutingSettings::default());
    }
}
