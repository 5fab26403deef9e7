#![deny(
    warnings,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    rust_2018_idioms
)]
#![forbid(unsafe_code)]

//! Flow-path decomposition and flow-matrix encoding for multi-token trust
//! network payments.
//!
//! The crate consumes a max-flow routing solution, a flat list of
//! elementary transfers produced by an external path-finding service, and
//! turns it into (a) the simple source→sink paths implicit in the
//! aggregated solution, grouped by flow amount for presentation, and
//! (b) the packed parameter block the on-chain settlement entry point
//! (`operateFlowMatrix`) consumes.

mod address;
mod algo;
mod amount;
mod error;
mod group;
mod matrix;
mod network;
mod token;
mod transfer;

pub use address::Address;
pub use algo::decompose::{decompose, MAX_STEPS};
pub use algo::{DecomposedPath, Decomposition};
pub use amount::{flow_key, round6, units_from_base, EPSILON, UNIT};
pub use error::Error;
pub use group::{group, FlowGroup, FlowGroups, PathCycler, MAX_VISIBLE_GROUPS};
pub use matrix::{encode_flow_matrix, encode_with_sink, FlowEdge, FlowMatrixParams, Stream};
pub use network::{EdgeKey, EdgeLedger, FlowNetwork, TokenCapacities};
pub use token::{resolve_owners, TokenClassifier, TokenInfo, TokenKind, TokenRegistry};
pub use transfer::{FlowResponse, RawTransfer, Transfer};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::addr;

    fn transfer(from: u8, to: u8, token: u8, value: &str) -> Transfer {
        Transfer::new(addr(from), addr(to), addr(token), value).unwrap()
    }

    // a forked route A→{B,C}→D, decomposed, grouped and encoded end to end
    #[test]
    fn decompose_group_encode_pipeline() {
        let transfers = vec![
            transfer(1, 2, 1, "500000000000000000"),
            transfer(1, 3, 1, "500000000000000000"),
            transfer(2, 4, 2, "500000000000000000"),
            transfer(3, 4, 3, "500000000000000000"),
        ];

        let (network, ledger) = FlowNetwork::build(&transfers);
        let result = decompose(&network, &ledger, addr(1), addr(4));
        assert_eq!(result.full_paths().count(), 2);
        assert_eq!(result.partial_paths().count(), 0);
        assert!(!result.limit_exceeded);

        let groups = group(&result.paths);
        assert_eq!(groups.group_count, 1);
        assert_eq!(groups.groups[0].path_count, 2);
        assert!((groups.groups[0].total_flow - 1.0).abs() < EPSILON);

        let mut registry = TokenRegistry::new();
        registry.register_avatar(addr(1));
        registry.register_wrapped(addr(2), addr(2));
        registry.register_wrapped(addr(3), addr(3));

        let params = encode_flow_matrix(&transfers, addr(1), &registry)
            .unwrap()
            .unwrap();
        assert_eq!(params.flow_vertices, vec![addr(1), addr(2), addr(3), addr(4)]);
        assert_eq!(params.packed_coordinates.len(), 6 * transfers.len());
        assert!(params.flow.iter().any(|e| e.stream_sink_id == 1));
        assert_eq!(params.streams[0].flow_edge_ids, vec![2, 3]);
    }
}
