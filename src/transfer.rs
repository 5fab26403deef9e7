use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::units_from_base;
use crate::error::Error;

/// An elementary transfer from a max-flow solution: `value` base units of
/// `token_owner`'s token moving `from` → `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransfer", into = "RawTransfer")]
pub struct Transfer {
    from: Address,
    to: Address,
    token_owner: Address,
    value: String,
    units: f64,
}

impl Transfer {
    pub fn new(
        from: Address,
        to: Address,
        token_owner: Address,
        value: impl Into<String>,
    ) -> Result<Self, Error> {
        let value = value.into();
        let units = units_from_base(&value)?;
        Ok(Self {
            from,
            to,
            token_owner,
            value,
            units,
        })
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn token_owner(&self) -> Address {
        self.token_owner
    }

    /// The original base-unit decimal string, as the settlement ABI expects it.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The float token amount, `value / 10^18`.
    pub fn units(&self) -> f64 {
        self.units
    }
}

/// The unvalidated wire form of a [`Transfer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransfer {
    pub from: String,
    pub to: String,
    pub token_owner: String,
    pub value: String,
}

impl TryFrom<RawTransfer> for Transfer {
    type Error = Error;

    fn try_from(t: RawTransfer) -> Result<Self, Self::Error> {
        Transfer::new(
            t.from.parse()?,
            t.to.parse()?,
            t.token_owner.parse()?,
            t.value,
        )
    }
}

impl From<Transfer> for RawTransfer {
    fn from(t: Transfer) -> Self {
        Self {
            from: t.from.to_string(),
            to: t.to.to_string(),
            token_owner: t.token_owner.to_string(),
            value: t.value,
        }
    }
}

/// The path-finding service's reply envelope.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResponse {
    pub max_flow: String,
    pub transfers: Vec<Transfer>,
}

impl FlowResponse {
    /// The solver-reported maximum flow, in token units.
    pub fn max_flow_units(&self) -> Result<f64, Error> {
        units_from_base(&self.max_flow)
    }
}
