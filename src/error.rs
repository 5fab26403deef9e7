use displaydoc::Display;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum Error {
    /// invalid transfer value `{0}`, expected a finite non-negative base-unit amount
    InvalidAmount(String),
    /// invalid account address `{0}`, expected 20-byte hex
    InvalidAddress(String),
    /// flow matrix has {vertices} vertices and {edges} edges, uint16 coordinates cannot index it
    EncodingOverflow { vertices: usize, edges: usize },
}

impl std::error::Error for Error {}
