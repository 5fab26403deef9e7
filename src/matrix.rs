use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::address::Address;
use crate::error::Error;
use crate::token::{resolve_owners, TokenClassifier};
use crate::transfer::Transfer;

/// One `(streamSinkId, amount)` record of the settlement ABI's `flow` array.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub stream_sink_id: u16,
    /// Base-unit amount in uint192 range, kept as the original decimal string.
    pub amount: String,
}

/// One `(sourceCoordinate, flowEdgeIds, data)` record of `streams`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub source_coordinate: u16,
    pub flow_edge_ids: Vec<u16>,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// The four positional arguments of `operateFlowMatrix`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMatrixParams {
    pub flow_vertices: Vec<Address>,
    pub flow: Vec<FlowEdge>,
    pub streams: Vec<Stream>,
    #[serde(serialize_with = "hex_bytes")]
    pub packed_coordinates: Vec<u8>,
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{}", hex::encode(bytes)))
}

/// Encodes transfers under the contract convention that the last transfer's
/// destination is the global sink.
pub fn encode_flow_matrix(
    transfers: &[Transfer],
    from: Address,
    classifier: &impl TokenClassifier,
) -> Result<Option<FlowMatrixParams>, Error> {
    match transfers.last() {
        Some(last) => encode_with_sink(transfers, from, last.to(), classifier),
        None => Ok(None),
    }
}

/// Encodes transfers against an explicit sink address.
///
/// An empty transfer list is a no-op, not an error. A vertex or edge count
/// beyond what a uint16 coordinate can index fails the whole encode;
/// nothing partial is returned.
pub fn encode_with_sink(
    transfers: &[Transfer],
    from: Address,
    to: Address,
    classifier: &impl TokenClassifier,
) -> Result<Option<FlowMatrixParams>, Error> {
    let Some(last) = transfers.last() else {
        return Ok(None);
    };

    // every owner must be resolved before any vertex work
    let owners = resolve_owners(
        transfers.iter().map(Transfer::token_owner).unique(),
        classifier,
    );

    let mut vertices = BTreeSet::from([from, to]);
    for t in transfers {
        vertices.insert(t.from());
        vertices.insert(t.to());
    }
    vertices.extend(owners.values().copied());

    let slots = usize::from(u16::MAX) + 1;
    if vertices.len() > slots || transfers.len() > slots {
        return Err(Error::EncodingOverflow {
            vertices: vertices.len(),
            edges: transfers.len(),
        });
    }

    // ascending big-unsigned-integer order; ties are impossible in a set
    let flow_vertices: Vec<Address> = vertices.into_iter().collect();
    let index: BTreeMap<Address, u16> = flow_vertices
        .iter()
        .copied()
        .zip(0u16..)
        .collect();

    let mut flow = Vec::with_capacity(transfers.len());
    let mut coordinates: Vec<u16> = Vec::with_capacity(transfers.len() * 3);
    for t in transfers {
        flow.push(FlowEdge {
            stream_sink_id: u16::from(t.to() == to),
            amount: t.value().to_owned(),
        });
        coordinates.push(index[&owners[&t.token_owner()]]);
        coordinates.push(index[&t.from()]);
        coordinates.push(index[&t.to()]);
    }

    // the settlement contract rejects a matrix with no terminal edge
    if !flow.iter().any(|e| e.stream_sink_id == 1) {
        let position = transfers
            .iter()
            .rposition(|t| t.to() == last.to())
            .unwrap_or(transfers.len() - 1);
        log::debug!("no edge reaches the sink {to}, force-marking edge {position}");
        flow[position].stream_sink_id = 1;
    }

    let flow_edge_ids = flow
        .iter()
        .enumerate()
        .filter(|(_, e)| e.stream_sink_id == 1)
        .map(|(id, _)| id as u16)
        .collect();

    let streams = vec![Stream {
        source_coordinate: index[&from],
        flow_edge_ids,
        data: Vec::new(),
    }];

    let packed_coordinates = coordinates.iter().flat_map(|c| c.to_be_bytes()).collect();

    Ok(Some(FlowMatrixParams {
        flow_vertices,
        flow,
        streams,
        packed_coordinates,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::addr;
    use crate::token::TokenRegistry;

    fn transfer(from: u8, to: u8, token: u8, value: &str) -> Transfer {
        Transfer::new(addr(from), addr(to), addr(token), value).unwrap()
    }

    #[test]
    fn empty_transfer_list_is_a_no_op() {
        let params = encode_flow_matrix(&[], addr(1), &TokenRegistry::new()).unwrap();
        assert!(params.is_none());
    }

    #[test]
    fn encodes_a_two_hop_route() {
        let transfers = vec![
            transfer(1, 2, 1, "1000000000000000000"),
            transfer(2, 3, 2, "1000000000000000000"),
        ];
        let params = encode_flow_matrix(&transfers, addr(1), &TokenRegistry::new())
            .unwrap()
            .unwrap();

        assert_eq!(params.flow_vertices, vec![addr(1), addr(2), addr(3)]);
        assert_eq!(params.flow.len(), 2);
        assert_eq!(params.flow[0].stream_sink_id, 0);
        assert_eq!(params.flow[1].stream_sink_id, 1);
        assert_eq!(params.flow[1].amount, "1000000000000000000");

        assert_eq!(params.streams.len(), 1);
        assert_eq!(params.streams[0].source_coordinate, 0);
        assert_eq!(params.streams[0].flow_edge_ids, vec![1]);
        assert!(params.streams[0].data.is_empty());

        // (token, from, to) per transfer, two big-endian bytes each
        assert_eq!(params.packed_coordinates.len(), 6 * transfers.len());
        assert_eq!(
            params.packed_coordinates,
            vec![0, 0, 0, 0, 0, 1, 0, 1, 0, 1, 0, 2]
        );
    }

    #[test]
    fn vertex_index_is_a_bijection_in_numeric_order() {
        let high = "0xff00000000000000000000000000000000000001"
            .parse()
            .unwrap();
        let transfers = vec![
            Transfer::new(high, addr(2), addr(9), "1000000000000000000").unwrap(),
            transfer(2, 5, 9, "1000000000000000000"),
        ];
        let params = encode_flow_matrix(&transfers, high, &TokenRegistry::new())
            .unwrap()
            .unwrap();

        // numerically ascending, so the 0xff… source sorts last
        assert_eq!(params.flow_vertices, vec![addr(2), addr(5), addr(9), high]);
        let unique: BTreeSet<Address> = params.flow_vertices.iter().copied().collect();
        assert_eq!(unique.len(), params.flow_vertices.len());
        assert_eq!(params.streams[0].source_coordinate, 3);
    }

    #[test]
    fn wrapped_tokens_resolve_to_their_avatar_vertex() {
        let mut registry = TokenRegistry::new();
        registry.register_wrapped(addr(10), addr(4));

        let transfers = vec![transfer(1, 2, 10, "1000000000000000000")];
        let params = encode_flow_matrix(&transfers, addr(1), &registry)
            .unwrap()
            .unwrap();

        // the wrapper address itself never becomes a vertex, its owner does
        assert_eq!(params.flow_vertices, vec![addr(1), addr(2), addr(4)]);
        assert_eq!(params.packed_coordinates[..2], [0, 2]);
    }

    #[test]
    fn unresolvable_tokens_are_their_own_vertex() {
        let transfers = vec![transfer(1, 2, 10, "1000000000000000000")];
        let params = encode_flow_matrix(&transfers, addr(1), &TokenRegistry::new())
            .unwrap()
            .unwrap();

        assert_eq!(params.flow_vertices, vec![addr(1), addr(2), addr(10)]);
    }

    #[test]
    fn mismatched_sink_forces_a_terminal_edge() {
        let transfers = vec![
            transfer(1, 2, 1, "1000000000000000000"),
            transfer(2, 3, 2, "1000000000000000000"),
        ];
        // no transfer lands on addr(9), so the last edge gets force-marked
        let params = encode_with_sink(&transfers, addr(1), addr(9), &TokenRegistry::new())
            .unwrap()
            .unwrap();

        assert_eq!(params.flow[0].stream_sink_id, 0);
        assert_eq!(params.flow[1].stream_sink_id, 1);
        assert_eq!(params.streams[0].flow_edge_ids, vec![1]);
    }

    #[test]
    fn marks_every_edge_into_the_sink() {
        let transfers = vec![
            transfer(1, 3, 1, "500000000000000000"),
            transfer(2, 3, 2, "500000000000000000"),
        ];
        let params = encode_flow_matrix(&transfers, addr(1), &TokenRegistry::new())
            .unwrap()
            .unwrap();

        assert_eq!(params.flow[0].stream_sink_id, 1);
        assert_eq!(params.flow[1].stream_sink_id, 1);
        assert_eq!(params.streams[0].flow_edge_ids, vec![0, 1]);
    }

    #[test]
    fn too_many_vertices_overflow_the_coordinate_space() {
        fn wide_addr(n: u32) -> Address {
            let mut bytes = [0u8; 20];
            bytes[16..].copy_from_slice(&n.to_be_bytes());
            Address::new(bytes)
        }

        let transfers: Vec<Transfer> = (0..=u32::from(u16::MAX))
            .map(|n| {
                Transfer::new(wide_addr(n + 1), wide_addr(0), wide_addr(0), "1000").unwrap()
            })
            .collect();

        // 65536 distinct sources + the zero sink makes 65537 vertices
        assert!(matches!(
            encode_flow_matrix(&transfers, wide_addr(0), &TokenRegistry::new()),
            Err(Error::EncodingOverflow { .. })
        ));
    }

    #[test]
    fn serializes_packed_bytes_as_hex() {
        let transfers = vec![transfer(1, 2, 1, "1000000000000000000")];
        let params = encode_flow_matrix(&transfers, addr(1), &TokenRegistry::new())
            .unwrap()
            .unwrap();

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["packedCoordinates"], "0x000000000001");
        assert_eq!(json["streams"][0]["data"], "0x");
        assert_eq!(
            json["flowVertices"][0],
            "0x0000000000000000000000000000000000000001"
        );
    }
}
