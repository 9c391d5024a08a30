//! Pool records as loaded from chain
//!
//! Records are replaced wholesale by reloads and never patched locally.
//! Amounts are wei and serialize as decimal strings.

use alloy_primitives::U256;
use serde::{Serialize, Serializer};

use crate::address::{serialize_checksummed, Address};

fn as_decimal_string<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Directory card fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    pub name: String,
    #[serde(serialize_with = "serialize_checksummed")]
    pub creator: Address,
    #[serde(serialize_with = "as_decimal_string")]
    pub goal_amount: U256,
    /// Unix seconds
    pub deadline: u64,
    #[serde(serialize_with = "as_decimal_string")]
    pub balance: U256,
    pub is_ended: bool,
    pub goal_reached: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    #[serde(serialize_with = "as_decimal_string")]
    pub votes: U256,
}

/// Full pool state for the detail page, scoped to one account
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDetail {
    #[serde(flatten)]
    pub summary: PoolSummary,
    /// Nomination order
    pub candidates: Vec<Candidate>,
    /// Zero when no account is connected
    #[serde(serialize_with = "as_decimal_string")]
    pub my_contribution: U256,
    /// Only read once the pool ended successfully
    pub has_voted: bool,
    pub has_withdrawn: bool,
}

impl PoolDetail {
    pub fn address(&self) -> Address {
        self.summary.address
    }

    pub fn candidate_addresses(&self) -> impl Iterator<Item = &Address> {
        self.candidates.iter().map(|c| &c.address)
    }

    pub fn is_candidate(&self, address: &Address) -> bool {
        self.candidate_addresses().any(|c| c == address)
    }
}
