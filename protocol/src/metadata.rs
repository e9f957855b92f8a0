//! # Asset Metadata
//!
//! Display names for mints, loaded from an external token list (a JSON
//! array of `{address, symbol, name, decimals, logoURI}` objects).
//!
//! The list is for display only. A holding whose mint is not on the list,
//! or whose balance is zero, is simply left out of [`AssetRegistry::annotate`]
//! output. It is never an error and never affects the ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read asset list: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid asset list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry of the asset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

/// A wallet balance joined with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayHolding {
    pub mint: Address,
    pub symbol: String,
    pub name: String,
    /// Raw amount in smallest units.
    pub amount: u64,
    /// `amount` scaled by `decimals`, as a decimal string.
    pub ui_amount: String,
}

/// Mint address → metadata.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: HashMap<Address, AssetMetadata>,
}

impl AssetRegistry {
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let list: Vec<AssetMetadata> = serde_json::from_str(json)?;
        Ok(list.into_iter().collect())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn get(&self, mint: &Address) -> Option<&AssetMetadata> {
        self.assets.get(mint)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Join `(mint, amount)` balances with metadata, dropping unknown
    /// mints and empty balances.
    pub fn annotate<I>(&self, holdings: I) -> Vec<DisplayHolding>
    where
        I: IntoIterator<Item = (Address, u64)>,
    {
        holdings
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .filter_map(|(mint, amount)| {
                let meta = self.assets.get(&mint)?;
                Some(DisplayHolding {
                    mint,
                    symbol: meta.symbol.clone(),
                    name: meta.name.clone(),
                    amount,
                    ui_amount: format_units(amount, meta.decimals),
                })
            })
            .collect()
    }
}

impl FromIterator<AssetMetadata> for AssetRegistry {
    fn from_iter<T: IntoIterator<Item = AssetMetadata>>(iter: T) -> Self {
        Self {
            assets: iter.into_iter().map(|m| (m.address, m)).collect(),
        }
    }
}

/// Render `amount` smallest units with `decimals` places, trimming
/// trailing zeros. Integer arithmetic only.
pub fn format_units(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let digits = format!("{amount:0>width$}", width = decimals as usize + 1);
    let (whole, frac) = digits.split_at(digits.len() - decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}
