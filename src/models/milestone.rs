//! Name lifecycle milestones and their block heights.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named lifecycle event of a Handshake name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneKind {
    /// The auction for the name opens.
    AuctionOpening,
    /// The bidding period begins.
    AuctionBidding,
    /// The reveal period begins.
    AuctionReveal,
    /// The auction closes.
    AuctionClosed,
    /// A reserved name enters its claim lockup.
    NameLocked,
    /// The claim lockup ends.
    NameUnlocked,
    /// The registration expires unless renewed.
    RegistrationExpired,
    /// A transfer of the name has been initiated.
    TransferInProgress,
    /// A pending transfer can be finalized.
    TransferFinalizing,
}

/// Returned when a stored milestone tag is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown milestone kind: {0}")]
pub struct UnknownMilestoneKind(pub String);

impl MilestoneKind {
    /// All milestone kinds.
    pub const ALL: [MilestoneKind; 9] = [
        MilestoneKind::AuctionOpening,
        MilestoneKind::AuctionBidding,
        MilestoneKind::AuctionReveal,
        MilestoneKind::AuctionClosed,
        MilestoneKind::NameLocked,
        MilestoneKind::NameUnlocked,
        MilestoneKind::RegistrationExpired,
        MilestoneKind::TransferInProgress,
        MilestoneKind::TransferFinalizing,
    ];

    /// The tag stored in the database for this milestone.
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneKind::AuctionOpening => "AUCTION_OPENING",
            MilestoneKind::AuctionBidding => "AUCTION_BIDDING",
            MilestoneKind::AuctionReveal => "AUCTION_REVEAL",
            MilestoneKind::AuctionClosed => "AUCTION_CLOSED",
            MilestoneKind::NameLocked => "NAME_LOCKED",
            MilestoneKind::NameUnlocked => "NAME_UNLOCKED",
            MilestoneKind::RegistrationExpired => "REGISTRATION_EXPIRED",
            MilestoneKind::TransferInProgress => "TRANSFER_IN_PROGRESS",
            MilestoneKind::TransferFinalizing => "TRANSFER_FINALIZING",
        }
    }

    /// Short human readable description.
    pub fn label(&self) -> &'static str {
        match self {
            MilestoneKind::AuctionOpening => "Auction opens",
            MilestoneKind::AuctionBidding => "Bidding begins",
            MilestoneKind::AuctionReveal => "Bid reveals begin",
            MilestoneKind::AuctionClosed => "Auction closes",
            MilestoneKind::NameLocked => "Name is locked",
            MilestoneKind::NameUnlocked => "Name is unlocked",
            MilestoneKind::RegistrationExpired => "Name registration expires",
            MilestoneKind::TransferInProgress => "Name transfer initiated",
            MilestoneKind::TransferFinalizing => "Name transfer can be finalized",
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneKind {
    type Err = UnknownMilestoneKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MilestoneKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownMilestoneKind(s.to_string()))
    }
}

/// A milestone paired with the absolute block height it occurs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Milestone {
    /// Which lifecycle event this is.
    pub kind: MilestoneKind,
    /// The block height at which the event happens.
    pub block_height: u64,
}

impl Milestone {
    /// Creates a new milestone.
    pub fn new(kind: MilestoneKind, block_height: u64) -> Self {
        Self { kind, block_height }
    }
}
