//! A builder for creating `RawBlock` instances for testing.

use crate::models::{
    block::{RawBlock, RawCovenant, RawTransaction, TxOutput},
    name_action::NameActionKind,
};

/// A builder for creating `RawBlock` instances for testing.
#[derive(Debug, Clone, Default)]
pub struct BlockBuilder {
    hash: Option<String>,
    height: u64,
    transactions: Vec<RawTransaction>,
}

impl BlockBuilder {
    /// Creates a new `BlockBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block height.
    pub fn height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    /// Sets the block hash. Defaults to a hash derived from the height.
    pub fn hash(mut self, hash: &str) -> Self {
        self.hash = Some(hash.to_string());
        self
    }

    /// Adds a transaction to the block.
    pub fn transaction(mut self, tx: RawTransaction) -> Self {
        self.transactions.push(tx);
        self
    }

    /// Adds a transaction with a single output to the block.
    pub fn output(self, vout: TxOutput) -> Self {
        let txid = format!("{:064x}", self.transactions.len() + 1);
        self.transaction(RawTransaction { txid, vout: vec![vout] })
    }

    /// Builds the `RawBlock` with the provided values.
    pub fn build(self) -> RawBlock {
        RawBlock {
            hash: self.hash.unwrap_or_else(|| format!("{:064x}", self.height)),
            height: self.height,
            tx: self.transactions,
        }
    }
}

/// An output carrying a covenant of the given kind.
///
/// The name, when given, is hex encoded into the name item the way hsd
/// does for covenants that carry it.
pub fn covenant_output(
    kind: NameActionKind,
    value: f64,
    name_hash: &str,
    name: Option<&str>,
) -> TxOutput {
    let mut items = vec![name_hash.to_string(), "00000000".to_string()];
    if let Some(name) = name {
        items.push(hex::encode(name));
    }
    TxOutput {
        value,
        covenant: Some(RawCovenant::new(kind.covenant_type(), kind.as_str(), items)),
    }
}

/// An output without a name covenant.
pub fn plain_output(value: f64) -> TxOutput {
    TxOutput { value, covenant: Some(RawCovenant::new(0, "NONE", Vec::new())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::name_actions_from_block;

    #[test]
    fn test_block_builder() {
        let block = BlockBuilder::new()
            .height(62517)
            .output(covenant_output(NameActionKind::Open, 0.0, "aa", Some("ocer")))
            .output(plain_output(1.5))
            .build();

        assert_eq!(block.height, 62517);
        assert_eq!(block.hash.len(), 64);
        assert_eq!(block.tx.len(), 2);
        assert_ne!(block.tx[0].txid, block.tx[1].txid);

        let actions = name_actions_from_block(&block);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name(), Some("ocer"));
    }
}
