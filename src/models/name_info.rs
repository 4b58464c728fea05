//! The name state snapshot returned by the `getnameinfo` RPC call.

use serde::{Deserialize, Serialize};

/// Current chain state of a single name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NameInfo {
    /// Rollout information, including whether the name is reserved.
    #[serde(default)]
    pub start: NameStart,

    /// Auction or registration details. `None` if the name was never opened
    /// or claimed.
    #[serde(default)]
    pub info: Option<NameAuctionInfo>,
}

/// Rollout details for a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NameStart {
    /// Whether the name is on the reserved list.
    #[serde(default)]
    pub reserved: bool,
    /// Rollout week.
    #[serde(default)]
    pub week: u32,
    /// Rollout start height.
    #[serde(default)]
    pub start: u64,
}

/// Lifecycle state of a name as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameState {
    /// Auction opened, bids not yet accepted.
    Opening,
    /// Accepting sealed bids.
    Bidding,
    /// Bids are being revealed.
    Reveal,
    /// Auction closed or name claimed.
    Closed,
    /// Revoked by its owner.
    Revoked,
    /// Reserved name in its claim lockup.
    Locked,
    /// Any state this crate does not know about.
    #[serde(other)]
    Other,
}

/// Owner outpoint of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NameOwner {
    /// Transaction hash.
    #[serde(default)]
    pub hash: String,
    /// Output index. `u32::MAX` while nobody owns the name.
    #[serde(default)]
    pub index: u32,
}

/// Auction and registration details of a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAuctionInfo {
    /// Decoded name.
    #[serde(default)]
    pub name: String,
    /// Hex SHA3 hash of the name.
    #[serde(default)]
    pub name_hash: String,
    /// Lifecycle state.
    pub state: NameState,
    /// Height at which the auction was opened or the claim was made.
    pub height: u64,
    /// Height of the last renewal.
    #[serde(default)]
    pub renewal: u64,
    /// Current owner outpoint.
    #[serde(default)]
    pub owner: Option<NameOwner>,
    /// Amount paid by the winner, in dollarydoos.
    #[serde(default)]
    pub value: u64,
    /// Highest bid, in dollarydoos.
    #[serde(default)]
    pub highest: u64,
    /// Height at which a pending transfer started, or 0.
    #[serde(default)]
    pub transfer: u64,
    /// Height of the revocation, or 0.
    #[serde(default)]
    pub revoked: u64,
    /// Height of the claim, or 0.
    #[serde(default)]
    pub claimed: u64,
    /// Number of renewals.
    #[serde(default)]
    pub renewals: u64,
    /// Whether the name has been registered on chain.
    #[serde(default)]
    pub registered: bool,
    /// Whether the registration lapsed.
    #[serde(default)]
    pub expired: bool,
    /// Claimed with a weak DNSSEC proof.
    #[serde(default)]
    pub weak: bool,
    /// Counters attached by the node.
    #[serde(default)]
    pub stats: Option<NameStats>,
}

/// Precomputed counters the node attaches to a name, depending on its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NameStats {
    /// First block of the opening period.
    pub open_period_start: Option<u64>,
    /// Last block of the period.
    pub open_period_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_bidding: Option<i64>,
    /// First block of the bidding period.
    pub bid_period_start: Option<u64>,
    /// Last block of the period.
    pub bid_period_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_reveal: Option<i64>,
    /// First block of the reveal period.
    pub reveal_period_start: Option<u64>,
    /// Last block of the period.
    pub reveal_period_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_close: Option<i64>,
    /// First block of the claim lockup.
    pub lockup_period_start: Option<u64>,
    /// Last block of the period.
    pub lockup_period_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_closed: Option<i64>,
    /// Height of the last renewal.
    pub renewal_period_start: Option<u64>,
    /// Height at which the registration expires.
    pub renewal_period_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_expire: Option<i64>,
    /// Height at which the transfer started.
    pub transfer_lockup_start: Option<u64>,
    /// First height at which the transfer can be finalized.
    pub transfer_lockup_end: Option<u64>,
    /// Blocks left, as counted by the node.
    pub blocks_until_valid_finalize: Option<i64>,
    /// Height of the revocation.
    pub revoke_period_start: Option<u64>,
    /// Last block of the period.
    pub revoke_period_end: Option<u64>,
}

impl NameInfo {
    /// The lifecycle state, if the name has auction info.
    pub fn state(&self) -> Option<&NameState> {
        self.info.as_ref().map(|info| &info.state)
    }

    /// The node's counters, if present.
    pub fn stats(&self) -> Option<&NameStats> {
        self.info.as_ref().and_then(|info| info.stats.as_ref())
    }
}
