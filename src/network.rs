use std::collections::BTreeMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::address::Address;
use crate::transfer::Transfer;

/// Aggregate capacity per token on one directed edge. `BTreeMap` keys give
/// the ascending token order the decomposer's traversal contract requires.
pub type TokenCapacities = BTreeMap<Address, f64>;

/// An aggregated `(from, to, token)` flow edge.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EdgeKey {
    pub from: Address,
    pub to: Address,
    pub token: Address,
}

impl EdgeKey {
    pub fn new(from: Address, to: Address, token: Address) -> Self {
        Self { from, to, token }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.from, self.to, self.token)
    }
}

/// The original transfers behind each aggregated edge, in input order.
#[derive(Clone, Debug, Default)]
pub struct EdgeLedger {
    entries: BTreeMap<EdgeKey, Vec<Transfer>>,
}

impl EdgeLedger {
    pub fn transfers(&self, key: &EdgeKey) -> &[Transfer] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// The ledger transfer whose amount sits closest to `flow`; ties go to
    /// the earliest entry.
    pub fn representative(&self, key: &EdgeKey, flow: f64) -> Option<&Transfer> {
        self.transfers(key)
            .iter()
            .min_by(|a, b| (a.units() - flow).abs().total_cmp(&(b.units() - flow).abs()))
    }

    fn push(&mut self, key: EdgeKey, transfer: Transfer) {
        self.entries.entry(key).or_default().push(transfer);
    }
}

/// The capacity multigraph implied by a transfer list: every `(from, to)`
/// pair is one graph edge carrying a per-token capacity map.
#[derive(Clone, Debug, Default)]
pub struct FlowNetwork {
    graph: DiGraph<Address, TokenCapacities>,
    nodes: BTreeMap<Address, NodeIndex>,
}

impl FlowNetwork {
    /// Aggregates transfers into the capacity multigraph and the edge ledger.
    pub fn build(transfers: &[Transfer]) -> (Self, EdgeLedger) {
        let mut network = Self::default();
        let mut ledger = EdgeLedger::default();

        for t in transfers {
            let u = network.intern(t.from());
            let v = network.intern(t.to());
            let edge = network
                .graph
                .find_edge(u, v)
                .unwrap_or_else(|| network.graph.add_edge(u, v, TokenCapacities::new()));
            *network.graph[edge].entry(t.token_owner()).or_default() += t.units();

            ledger.push(EdgeKey::new(t.from(), t.to(), t.token_owner()), t.clone());
        }

        (network, ledger)
    }

    fn intern(&mut self, address: Address) -> NodeIndex {
        if let Some(&id) = self.nodes.get(&address) {
            id
        } else {
            let id = self.graph.add_node(address);
            self.nodes.insert(address, id);
            id
        }
    }

    pub fn contains(&self, address: Address) -> bool {
        self.nodes.contains_key(&address)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Successors of `u` with their per-token capacities. Self-loops from
    /// self-transfers show up here like any other edge.
    pub fn outgoing(&self, u: Address) -> impl Iterator<Item = (Address, &TokenCapacities)> + '_ {
        self.nodes.get(&u).into_iter().flat_map(move |&id| {
            self.graph
                .edges(id)
                .map(|e| (self.graph[e.target()], e.weight()))
        })
    }

    /// The aggregate capacity of one `(from, to, token)` edge.
    pub fn aggregate(&self, key: &EdgeKey) -> f64 {
        self.nodes
            .get(&key.from)
            .zip(self.nodes.get(&key.to))
            .and_then(|(&u, &v)| self.graph.find_edge(u, v))
            .and_then(|edge| self.graph[edge].get(&key.token))
            .copied()
            .unwrap_or_default()
    }

    /// Every aggregated flow edge with its capacity.
    pub fn flow_edges(&self) -> impl Iterator<Item = (EdgeKey, f64)> + '_ {
        self.graph.edge_references().flat_map(move |e| {
            let from = self.graph[e.source()];
            let to = self.graph[e.target()];
            e.weight()
                .iter()
                .map(move |(&token, &capacity)| (EdgeKey::new(from, to, token), capacity))
        })
    }
}
