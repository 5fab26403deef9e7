use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

use crate::address::Address;
use crate::algo::DecomposedPath;
use crate::amount::flow_key;
use crate::transfer::Transfer;

/// Most groups exposed to presentation. Accounting keeps counting past it;
/// only the returned list is cut.
pub const MAX_VISIBLE_GROUPS: usize = 100;

/// All decomposed paths sharing one 6-decimal-rounded flow amount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowGroup {
    pub flow: f64,
    pub path_count: usize,
    pub total_flow: f64,
    pub paths: Vec<Vec<Address>>,
    pub all_transfers: Vec<Vec<Transfer>>,
}

impl FlowGroup {
    /// The path shown for the group before any cycling.
    pub fn example_path(&self) -> &[Address] {
        self.paths.first().map(Vec::as_slice).unwrap_or_default()
    }
}

/// Grouped presentation view of a decomposition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowGroups {
    /// Descending by flow, truncated to [`MAX_VISIBLE_GROUPS`].
    pub groups: Vec<FlowGroup>,
    /// Group count before truncation.
    pub group_count: usize,
    pub total_path_count: usize,
    pub total_flow: f64,
}

/// Buckets paths by 6-decimal flow amount, descending.
pub fn group(paths: &[DecomposedPath]) -> FlowGroups {
    let buckets = paths.iter().into_group_map_by(|p| flow_key(p.flow));

    let mut groups: Vec<FlowGroup> = buckets
        .into_iter()
        .map(|(key, members)| FlowGroup {
            // the key string is the rounded amount, so parse it back rather
            // than re-rounding a member and risking a key/flow mismatch
            flow: key.parse().unwrap_or_default(),
            path_count: members.len(),
            total_flow: members.iter().map(|p| p.flow).sum(),
            paths: members.iter().map(|p| p.nodes.clone()).collect(),
            all_transfers: members.iter().map(|p| p.transfers.clone()).collect(),
        })
        .collect();
    groups.sort_by(|a, b| b.flow.total_cmp(&a.flow));

    let group_count = groups.len();
    let total_path_count = groups.iter().map(|g| g.path_count).sum();
    let total_flow = groups.iter().map(|g| g.total_flow).sum();
    if group_count > MAX_VISIBLE_GROUPS {
        log::debug!("exposing {MAX_VISIBLE_GROUPS} of {group_count} flow groups");
    }
    groups.truncate(MAX_VISIBLE_GROUPS);

    FlowGroups {
        groups,
        group_count,
        total_path_count,
        total_flow,
    }
}

/// Per-group example-path cursor. Callers own one per session; the crate
/// keeps no global cycling state.
#[derive(Clone, Debug, Default)]
pub struct PathCycler {
    cursors: BTreeMap<String, usize>,
}

impl PathCycler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected path of `group`.
    pub fn current<'a>(&self, group: &'a FlowGroup) -> &'a [Address] {
        let cursor = self
            .cursors
            .get(&flow_key(group.flow))
            .copied()
            .unwrap_or_default();
        group.paths.get(cursor).map(Vec::as_slice).unwrap_or_default()
    }

    /// Advances to the next path of `group`, wrapping around.
    pub fn advance<'a>(&mut self, group: &'a FlowGroup) -> &'a [Address] {
        if group.paths.is_empty() {
            return &[];
        }
        let cursor = self.cursors.entry(flow_key(group.flow)).or_default();
        *cursor = (*cursor + 1) % group.paths.len();
        group.paths[*cursor].as_slice()
    }
}
