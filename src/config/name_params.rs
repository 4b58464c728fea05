use serde::{Deserialize, Serialize};

/// Network constants that drive the auction schedule of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParams {
    /// Blocks between name tree commits.
    pub tree_interval: u64,
    /// Length of the bidding period in blocks.
    pub bidding_period: u64,
    /// Length of the reveal period in blocks.
    pub reveal_period: u64,
}

impl NameParams {
    /// Mainnet values.
    pub const MAINNET: NameParams =
        NameParams { tree_interval: 36, bidding_period: 720, reveal_period: 1440 };

    /// Regtest values.
    pub const REGTEST: NameParams =
        NameParams { tree_interval: 5, bidding_period: 5, reveal_period: 10 };

    /// Blocks between an OPEN and the start of bidding.
    pub fn open_period(&self) -> u64 {
        self.tree_interval.saturating_add(1)
    }

    /// Looks up the constants for a known network id.
    pub fn for_network(network_id: &str) -> Option<NameParams> {
        match network_id {
            "main" | "mainnet" => Some(Self::MAINNET),
            "regtest" => Some(Self::REGTEST),
            _ => None,
        }
    }
}

impl Default for NameParams {
    fn default() -> Self {
        Self::MAINNET
    }
}
