use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::address::Address;
use crate::amount::{flow_key, EPSILON};
use crate::network::{EdgeKey, EdgeLedger, FlowNetwork, TokenCapacities};
use crate::transfer::Transfer;

use super::{DecomposedPath, Decomposition};

/// Hard cap on augmenting-path extractions per run. Breaching it is a
/// warning with partial results, not a failure.
pub const MAX_STEPS: usize = 1000;

struct State<'a> {
    network: &'a FlowNetwork,
    ledger: &'a EdgeLedger,
    source: Address,
    sink: Address,
    // flow already assigned to each edge; invariant: used <= aggregate + EPSILON
    used: BTreeMap<EdgeKey, f64>,
}

#[derive(Default)]
struct ResidueBucket {
    flow: f64,
    nodes: BTreeSet<Address>,
    transfers: Vec<Transfer>,
}

impl State<'_> {
    fn residual(&self, key: &EdgeKey) -> f64 {
        self.network.aggregate(key) - self.used.get(key).copied().unwrap_or_default()
    }

    /// The first token with residual capacity on `from → to`, in ascending
    /// token order.
    fn first_traversable(
        &self,
        from: Address,
        to: Address,
        tokens: &TokenCapacities,
    ) -> Option<Address> {
        tokens
            .keys()
            .copied()
            .find(|&token| self.residual(&EdgeKey::new(from, to, token)) > EPSILON)
    }

    /// Breadth-first search for the next augmenting source→sink path,
    /// returned as its ordered edge list.
    ///
    /// The sink is a virtual target: it ends the search the moment an edge
    /// with residual capacity lands on it and is never expanded itself.
    /// When source == sink this means the target is reachable only through
    /// an edge returning into the source after at least one hop, so the
    /// initial dequeue cannot terminate the search.
    fn search(&self) -> Option<Vec<EdgeKey>> {
        let mut parent: BTreeMap<Address, EdgeKey> = BTreeMap::new();
        let mut visited = BTreeSet::from([self.source]);
        let mut queue = VecDeque::from([self.source]);
        let mut closing = None;

        'bfs: while let Some(u) = queue.pop_front() {
            for (v, tokens) in self.network.outgoing(u) {
                if v == self.sink {
                    if let Some(token) = self.first_traversable(u, v, tokens) {
                        closing = Some(EdgeKey::new(u, v, token));
                        break 'bfs;
                    }
                    continue;
                }
                if visited.contains(&v) {
                    continue;
                }
                if let Some(token) = self.first_traversable(u, v, tokens) {
                    parent.insert(v, EdgeKey::new(u, v, token));
                    visited.insert(v);
                    queue.push_back(v);
                }
            }
        }

        let closing = closing?;
        let mut edges = vec![closing];
        let mut node = closing.from;
        while node != self.source {
            let hop = parent[&node];
            edges.push(hop);
            node = hop.from;
        }
        edges.reverse();
        Some(edges)
    }

    /// Extracts one augmenting path and charges its flow to the residual.
    fn extract(&mut self) -> Option<DecomposedPath> {
        let edges = self.search()?;
        let path_flow = edges
            .iter()
            .map(|key| self.residual(key))
            .fold(f64::INFINITY, f64::min);
        if path_flow <= EPSILON {
            return None;
        }

        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(self.source);
        let mut transfers = Vec::with_capacity(edges.len());
        for key in &edges {
            *self.used.entry(*key).or_default() += path_flow;
            nodes.push(key.to);
            if let Some(transfer) = self.ledger.representative(key, path_flow) {
                transfers.push(transfer.clone());
            }
            log::trace!("{key} += {path_flow}");
        }

        Some(DecomposedPath {
            nodes,
            flow: path_flow,
            transfers,
            is_partial: false,
        })
    }

    /// Buckets whatever capacity no simple path claimed (cyclic or
    /// disconnected flow) by 6-decimal-rounded per-edge remainder.
    fn residue(&self) -> Vec<DecomposedPath> {
        let mut buckets: BTreeMap<String, ResidueBucket> = BTreeMap::new();
        for (key, aggregate) in self.network.flow_edges() {
            let remaining = aggregate - self.used.get(&key).copied().unwrap_or_default();
            if remaining <= EPSILON {
                continue;
            }
            let bucket = buckets.entry(flow_key(remaining)).or_default();
            bucket.flow += remaining;
            bucket.nodes.insert(key.from);
            bucket.nodes.insert(key.to);
            if let Some(transfer) = self.ledger.representative(&key, remaining) {
                bucket.transfers.push(transfer.clone());
            }
        }

        buckets
            .into_values()
            .map(|bucket| DecomposedPath {
                nodes: bucket.nodes.into_iter().collect(),
                flow: bucket.flow,
                transfers: bucket.transfers,
                is_partial: true,
            })
            .collect()
    }
}

/// Decomposes an aggregate flow solution into simple source→sink paths
/// plus residue buckets for flow that completes no path.
///
/// Deterministic for a fixed transfer list: token iteration is ascending,
/// adjacency order is fixed by the network build, and there is no
/// randomness or concurrency.
pub fn decompose(
    network: &FlowNetwork,
    ledger: &EdgeLedger,
    source: Address,
    sink: Address,
) -> Decomposition {
    let mut state = State {
        network,
        ledger,
        source,
        sink,
        used: BTreeMap::new(),
    };

    let mut paths = Vec::new();
    let mut limit_exceeded = false;
    while let Some(path) = state.extract() {
        paths.push(path);
        if paths.len() == MAX_STEPS {
            log::warn!("decomposition stopped at the {MAX_STEPS} path cap");
            limit_exceeded = true;
            break;
        }
    }

    let full = paths.len();
    let decomposed: f64 = paths.iter().map(|p| p.flow).sum();
    paths.extend(state.residue());
    let residue: f64 = paths[full..].iter().map(|p| p.flow).sum();

    log::info!("----------------------------------");
    log::info!("     full paths = {full}");
    log::info!("decomposed flow = {decomposed}");
    log::info!("  residual flow = {residue}");

    Decomposition {
        paths,
        limit_exceeded,
    }
}
