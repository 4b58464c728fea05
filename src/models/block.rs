//! Raw block data as returned by `getblockbyheight` with transaction details,
//! and the event produced for each processed block.

use serde::{Deserialize, Serialize};

use super::name_action::NameAction;

/// A block with its transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawBlock {
    /// Block hash.
    #[serde(default)]
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Transactions in the block.
    #[serde(default)]
    pub tx: Vec<RawTransaction>,
}

/// A transaction inside a [`RawBlock`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawTransaction {
    /// Transaction id.
    #[serde(default)]
    pub txid: String,
    /// Transaction outputs.
    #[serde(default)]
    pub vout: Vec<TxOutput>,
}

/// A transaction output with its covenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TxOutput {
    /// Output value in HNS.
    #[serde(default)]
    pub value: f64,
    /// Covenant carried by the output, if any.
    #[serde(default)]
    pub covenant: Option<RawCovenant>,
}

/// The covenant attached to an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawCovenant {
    /// Numeric covenant type.
    #[serde(rename = "type")]
    pub covenant_type: u8,
    /// Covenant action name, e.g. `OPEN`.
    #[serde(default)]
    pub action: String,
    /// Hex encoded covenant items.
    #[serde(default)]
    pub items: Vec<String>,
}

impl RawCovenant {
    /// Builds a covenant from its parts.
    pub fn new(covenant_type: u8, action: impl Into<String>, items: Vec<String>) -> Self {
        Self { covenant_type, action: action.into(), items }
    }
}

/// A new block as seen by the alert engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlockEvent {
    /// Height of the block.
    pub block_height: u64,
    /// Hash of the block.
    pub block_hash: String,
    /// Name actions decoded from the block, with names resolved.
    pub name_actions: Vec<NameAction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_block_with_covenants() {
        let json = r#"{
            "hash": "0000000000000000ab",
            "height": 62517,
            "confirmations": 10,
            "tx": [{
                "txid": "aa",
                "vout": [
                    {"value": 0, "address": {}, "covenant": {"type": 0, "action": "NONE", "items": []}},
                    {"value": 0, "covenant": {"type": 2, "action": "OPEN", "items": ["952f", "00000000", "6f636572"]}}
                ]
            }]
        }"#;

        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.height, 62517);
        assert_eq!(block.tx[0].vout.len(), 2);
        let covenant = block.tx[0].vout[1].covenant.as_ref().unwrap();
        assert_eq!(covenant.covenant_type, 2);
        assert_eq!(covenant.items[2], "6f636572");
    }
}
