use serde::Serialize;

use crate::address::Address;
use crate::amount::EPSILON;
use crate::transfer::Transfer;

pub mod decompose;

/// One constituent of a decomposed flow solution.
///
/// A full path is a simple source→sink walk with one backing transfer per
/// hop. A partial path bundles residual flow that never completed a walk;
/// its `nodes` are the touched endpoints with no ordering guarantee.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecomposedPath {
    pub nodes: Vec<Address>,
    pub flow: f64,
    pub transfers: Vec<Transfer>,
    pub is_partial: bool,
}

/// The outcome of one decomposition run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Decomposition {
    pub paths: Vec<DecomposedPath>,
    /// Set when the step cap was hit before the residual drained.
    pub limit_exceeded: bool,
}

impl Decomposition {
    pub fn full_paths(&self) -> impl Iterator<Item = &DecomposedPath> {
        self.paths.iter().filter(|p| !p.is_partial)
    }

    pub fn partial_paths(&self) -> impl Iterator<Item = &DecomposedPath> {
        self.paths.iter().filter(|p| p.is_partial)
    }

    /// Flow attributed to complete source→sink paths, in token units.
    pub fn total_full_flow(&self) -> f64 {
        self.full_paths().map(|p| p.flow).sum()
    }

    /// Residual flow left in partial buckets, in token units.
    pub fn total_residue(&self) -> f64 {
        self.partial_paths().map(|p| p.flow).sum()
    }

    /// Warns when the decomposed total drifts from the solver-reported max flow.
    pub fn check_max_flow(&self, expected_units: f64) {
        let total = self.total_full_flow();
        if (total - expected_units).abs() > EPSILON {
            log::warn!(
                "decomposed flow {total} differs from solver-reported max flow {expected_units}"
            );
        }
    }
}
