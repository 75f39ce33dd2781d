use std::str::FromStr;

use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize, Serializer};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};

use crate::{quote::QuoteResponse, serde_helpers::field_as_string, ClientError};

/// Priority fee the aggregator should attach to the swap transaction.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrioritizationFee {
    /// Let the aggregator estimate the fee.
    #[default]
    Auto,
    #[serde(untagged)]
    Lamports(u64),
}

impl Serialize for PrioritizationFee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Lamports(lamports) => serializer.serialize_u64(*lamports),
        }
    }
}

impl FromStr for PrioritizationFee {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse()
            .map(Self::Lamports)
            .map_err(|_| anyhow!("{} is not a valid prioritization fee", s))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    #[serde(with = "field_as_string")]
    pub user_public_key: Pubkey,
    pub quote_response: QuoteResponse,
    pub dynamic_compute_unit_limit: bool,
    pub prioritization_fee_lamports: PrioritizationFee,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 encoded, bincode serialized `VersionedTransaction`.
    pub swap_transaction: String,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
    #[serde(default)]
    pub prioritization_fee_lamports: Option<u64>,
    #[serde(default)]
    pub compute_unit_limit: Option<u32>,
}

impl SwapResponse {
    pub fn decode_transaction(&self) -> Result<VersionedTransaction, ClientError> {
        let bytes = BASE64_STANDARD.decode(&self.swap_transaction)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub hash: String,
}
