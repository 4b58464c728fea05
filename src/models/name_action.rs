//! Name actions: decoded covenant operations found in a block.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fieldless kind of a name action, one per covenant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameActionKind {
    Claim,
    Open,
    Bid,
    Reveal,
    Redeem,
    Register,
    Update,
    Renew,
    Transfer,
    Finalize,
    Revoke,
}

impl NameActionKind {
    /// The covenant type id used on the wire.
    pub fn covenant_type(&self) -> u8 {
        match self {
            NameActionKind::Claim => 1,
            NameActionKind::Open => 2,
            NameActionKind::Bid => 3,
            NameActionKind::Reveal => 4,
            NameActionKind::Redeem => 5,
            NameActionKind::Register => 6,
            NameActionKind::Update => 7,
            NameActionKind::Renew => 8,
            NameActionKind::Transfer => 9,
            NameActionKind::Finalize => 10,
            NameActionKind::Revoke => 11,
        }
    }

    /// The covenant action string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            NameActionKind::Claim => "CLAIM",
            NameActionKind::Open => "OPEN",
            NameActionKind::Bid => "BID",
            NameActionKind::Reveal => "REVEAL",
            NameActionKind::Redeem => "REDEEM",
            NameActionKind::Register => "REGISTER",
            NameActionKind::Update => "UPDATE",
            NameActionKind::Renew => "RENEW",
            NameActionKind::Transfer => "TRANSFER",
            NameActionKind::Finalize => "FINALIZE",
            NameActionKind::Revoke => "REVOKE",
        }
    }
}

impl fmt::Display for NameActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a name action.
///
/// Amounts are the output value in HNS as reported by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDetails {
    Claim {
        /// Amount of HNS reserved for the owner of the name.
        reserved_amount: f64,
    },
    Open,
    Bid {
        /// Amount locked up with the (blinded) bid.
        lockup_amount: f64,
    },
    Reveal {
        /// The revealed bid.
        bid_amount: f64,
    },
    Redeem,
    Register {
        /// Value burned by the registration.
        burned_value: f64,
    },
    Update,
    Renew,
    Transfer,
    Finalize,
    Revoke,
}

impl ActionDetails {
    /// The kind of this action.
    pub fn kind(&self) -> NameActionKind {
        match self {
            ActionDetails::Claim { .. } => NameActionKind::Claim,
            ActionDetails::Open => NameActionKind::Open,
            ActionDetails::Bid { .. } => NameActionKind::Bid,
            ActionDetails::Reveal { .. } => NameActionKind::Reveal,
            ActionDetails::Redeem => NameActionKind::Redeem,
            ActionDetails::Register { .. } => NameActionKind::Register,
            ActionDetails::Update => NameActionKind::Update,
            ActionDetails::Renew => NameActionKind::Renew,
            ActionDetails::Transfer => NameActionKind::Transfer,
            ActionDetails::Finalize => NameActionKind::Finalize,
            ActionDetails::Revoke => NameActionKind::Revoke,
        }
    }
}

/// A covenant operation on a name, extracted from a block.
///
/// Not every covenant carries the name itself. `name` is filled in from the
/// name hash by the block watcher before the action reaches the alert engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAction {
    /// Hash of the name the covenant operates on.
    pub name_hash: String,
    /// The name, if known.
    pub name: Option<String>,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub details: ActionDetails,
}

impl NameAction {
    /// Creates a name action.
    pub fn new(name_hash: impl Into<String>, name: Option<String>, details: ActionDetails) -> Self {
        Self { name_hash: name_hash.into(), name, details }
    }

    /// Shorthand for an OPEN action on a known name.
    pub fn open(name_hash: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(name_hash, Some(name.into()), ActionDetails::Open)
    }

    /// Shorthand for a BID action on a known name.
    pub fn bid(name_hash: impl Into<String>, name: impl Into<String>, lockup_amount: f64) -> Self {
        Self::new(name_hash, Some(name.into()), ActionDetails::Bid { lockup_amount })
    }

    /// The kind of this action.
    pub fn kind(&self) -> NameActionKind {
        self.details.kind()
    }

    /// The name, or `None` if it has not been resolved.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
