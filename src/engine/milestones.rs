//! Computes the lifecycle milestones of a name from its current chain state.
//!
//! Every function here is pure. The rules are independent of each other and a
//! snapshot may satisfy several of them at once, so the full schedule is the
//! union of all of them.

use serde::{Deserialize, Serialize};

use crate::{
    config::NameParams,
    models::{
        milestone::{Milestone, MilestoneKind},
        name_info::{NameInfo, NameState},
    },
};

/// Milestones of a name's auction: opening, bidding, reveal and close.
///
/// Only names in `OPENING`, `BIDDING` or `REVEAL` are considered. A `CLOSED`
/// name may have come from a claim rather than an auction.
pub fn calculate_auction_milestones(name_info: &NameInfo, params: &NameParams) -> Vec<Milestone> {
    let Some(info) = &name_info.info else {
        return Vec::new();
    };
    if !matches!(info.state, NameState::Opening | NameState::Bidding | NameState::Reveal) {
        return Vec::new();
    }

    let opening = info.height;
    let bidding = opening.saturating_add(params.open_period());
    let reveal = bidding.saturating_add(params.bidding_period);
    let closed = reveal.saturating_add(params.reveal_period);

    vec![
        Milestone::new(MilestoneKind::AuctionOpening, opening),
        Milestone::new(MilestoneKind::AuctionBidding, bidding),
        Milestone::new(MilestoneKind::AuctionReveal, reveal),
        Milestone::new(MilestoneKind::AuctionClosed, closed),
    ]
}

/// Milestones of a reserved name going through its claim lockup.
pub fn calculate_lockup_milestones(name_info: &NameInfo) -> Vec<Milestone> {
    if name_info.state() != Some(&NameState::Locked) {
        return Vec::new();
    }
    let Some(stats) = name_info.stats() else {
        return Vec::new();
    };

    [
        (MilestoneKind::NameLocked, stats.lockup_period_start),
        (MilestoneKind::NameUnlocked, stats.lockup_period_end),
    ]
    .into_iter()
    .filter_map(|(kind, height)| height.map(|h| Milestone::new(kind, h)))
    .collect()
}

/// The expiry milestone of an owned, closed name.
pub fn calculate_renewal_milestones(name_info: &NameInfo) -> Vec<Milestone> {
    if !is_owned_and_closed(name_info) {
        return Vec::new();
    }

    name_info
        .stats()
        .and_then(|stats| stats.renewal_period_end)
        .map(|h| vec![Milestone::new(MilestoneKind::RegistrationExpired, h)])
        .unwrap_or_default()
}

/// Milestones of a transfer in progress on an owned, closed name.
pub fn calculate_transfer_milestones(name_info: &NameInfo) -> Vec<Milestone> {
    if !is_owned_and_closed(name_info) {
        return Vec::new();
    }
    let Some(stats) = name_info.stats() else {
        return Vec::new();
    };
    let Some(start) = stats.transfer_lockup_start else {
        return Vec::new();
    };

    let mut milestones = vec![Milestone::new(MilestoneKind::TransferInProgress, start)];
    if let Some(end) = stats.transfer_lockup_end {
        milestones.push(Milestone::new(MilestoneKind::TransferFinalizing, end));
    }
    milestones
}

/// All milestones of the name strictly after `current_height`, in no
/// particular order.
pub fn calculate_all_future_milestones(
    name_info: &NameInfo,
    current_height: u64,
    params: &NameParams,
) -> Vec<Milestone> {
    let mut milestones = calculate_auction_milestones(name_info, params);
    milestones.extend(calculate_lockup_milestones(name_info));
    milestones.extend(calculate_renewal_milestones(name_info));
    milestones.extend(calculate_transfer_milestones(name_info));

    milestones.retain(|m| m.block_height > current_height);
    milestones
}

fn is_owned_and_closed(name_info: &NameInfo) -> bool {
    name_info
        .info
        .as_ref()
        .is_some_and(|info| info.owner.is_some() && info.state == NameState::Closed)
}

/// Whether a name can currently be acquired, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameAvailability {
    /// Reserved and not yet claimed.
    UnavailReserved,
    /// Reserved and currently being claimed.
    UnavailClaiming,
    /// A transfer is in progress.
    UnavailTransferring,
    /// Registered or claimed and not expired.
    UnavailClosed,
    /// Never opened nor claimed.
    AvailNeverRegistered,
    /// The registration expired.
    AvailNotRenewed,
    /// In auction, before bidding.
    AuctionOpening,
    /// In auction, accepting bids.
    AuctionBidding,
    /// In auction, revealing bids.
    AuctionReveal,
    /// None of the above.
    Other,
}

/// Classifies a name snapshot. The first matching rule wins.
pub fn name_availability(name_info: &NameInfo) -> NameAvailability {
    let reserved = name_info.start.reserved;
    let info = name_info.info.as_ref();
    let state = info.map(|info| &info.state);
    let stats = name_info.stats();

    let Some(info) = info else {
        return if reserved {
            NameAvailability::UnavailReserved
        } else {
            NameAvailability::AvailNeverRegistered
        };
    };

    if reserved && info.state == NameState::Locked && info.claimed != 0 {
        return NameAvailability::UnavailClaiming;
    }

    if state == Some(&NameState::Closed) {
        if stats.is_some_and(|s| s.blocks_until_valid_finalize.is_some()) {
            return NameAvailability::UnavailTransferring;
        }
        match stats.and_then(|s| s.blocks_until_expire) {
            Some(blocks) if blocks > 0 => return NameAvailability::UnavailClosed,
            Some(_) => return NameAvailability::AvailNotRenewed,
            None => {}
        }
    }

    match info.state {
        NameState::Opening => NameAvailability::AuctionOpening,
        NameState::Bidding => NameAvailability::AuctionBidding,
        NameState::Reveal => NameAvailability::AuctionReveal,
        _ => NameAvailability::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::name_info::NameStats,
        test_helpers::{NameInfoBuilder, fixtures},
    };

    const PARAMS: NameParams = NameParams::MAINNET;

    fn height_of(milestones: &[Milestone], kind: MilestoneKind) -> Option<u64> {
        milestones.iter().find(|m| m.kind == kind).map(|m| m.block_height)
    }

    #[test]
    fn test_auction_milestones_saturate_on_corrupt_height() {
        let name_info = NameInfoBuilder::new().height(u64::MAX - 10).build();
        let milestones = calculate_auction_milestones(&name_info, &PARAMS);

        assert_eq!(height_of(&milestones, MilestoneKind::AuctionOpening), Some(u64::MAX - 10));
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionBidding), Some(u64::MAX));
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionClosed), Some(u64::MAX));
        assert!(calculate_all_future_milestones(&name_info, u64::MAX, &PARAMS).is_empty());
    }

    #[test]
    fn test_auction_milestones_for_opening_name() {
        let milestones = calculate_auction_milestones(&fixtures::opening(), &PARAMS);

        assert_eq!(milestones.len(), 4);
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionOpening), Some(69583));
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionBidding), Some(69620));
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionReveal), Some(70340));
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionClosed), Some(71780));
    }

    #[test]
    fn test_auction_milestones_use_opening_height_in_any_auction_state() {
        let milestones = calculate_auction_milestones(&fixtures::bidding(), &PARAMS);
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionBidding), Some(68978 + 37));

        let milestones = calculate_auction_milestones(&fixtures::in_reveal(), &PARAMS);
        assert_eq!(height_of(&milestones, MilestoneKind::AuctionClosed), Some(67916 + 37 + 720 + 1440));
    }

    #[test]
    fn test_no_milestones_without_info() {
        let snapshot = fixtures::no_auction();
        assert!(calculate_auction_milestones(&snapshot, &PARAMS).is_empty());
        assert!(calculate_all_future_milestones(&snapshot, 0, &PARAMS).is_empty());
        assert!(calculate_all_future_milestones(&fixtures::reserved(), 0, &PARAMS).is_empty());
    }

    #[test]
    fn test_lockup_milestones() {
        let milestones = calculate_lockup_milestones(&fixtures::locked());

        assert_eq!(milestones.len(), 2);
        assert_eq!(height_of(&milestones, MilestoneKind::NameLocked), Some(68610));
        assert_eq!(height_of(&milestones, MilestoneKind::NameUnlocked), Some(72930));
    }

    #[test]
    fn test_lockup_milestones_skip_missing_counters() {
        let snapshot = NameInfoBuilder::new()
            .state(NameState::Locked)
            .height(100)
            .stats(NameStats { lockup_period_end: Some(500), ..Default::default() })
            .build();

        let milestones = calculate_lockup_milestones(&snapshot);
        assert_eq!(milestones, vec![Milestone::new(MilestoneKind::NameUnlocked, 500)]);
    }

    #[test]
    fn test_renewal_milestones() {
        let milestones = calculate_renewal_milestones(&fixtures::reserved_registered());
        assert_eq!(milestones, vec![Milestone::new(MilestoneKind::RegistrationExpired, 135135)]);
    }

    #[test]
    fn test_renewal_milestones_require_owner_and_stats() {
        let no_owner = NameInfoBuilder::new()
            .state(NameState::Closed)
            .owner(None)
            .stats(NameStats { renewal_period_end: Some(10), ..Default::default() })
            .build();
        assert!(calculate_renewal_milestones(&no_owner).is_empty());

        let no_stats = NameInfoBuilder::new().state(NameState::Closed).build();
        assert!(calculate_renewal_milestones(&no_stats).is_empty());
        assert!(calculate_transfer_milestones(&no_stats).is_empty());
    }

    #[test]
    fn test_transfer_milestones() {
        let milestones = calculate_transfer_milestones(&fixtures::transferring());

        assert_eq!(milestones.len(), 2);
        assert_eq!(height_of(&milestones, MilestoneKind::TransferInProgress), Some(72136));
        assert_eq!(height_of(&milestones, MilestoneKind::TransferFinalizing), Some(72424));
    }

    #[test]
    fn test_all_future_milestones_for_transferring_name() {
        let milestones = calculate_all_future_milestones(&fixtures::transferring(), 72000, &PARAMS);

        let mut kinds: Vec<_> = milestones.iter().map(|m| m.kind).collect();
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                MilestoneKind::RegistrationExpired,
                MilestoneKind::TransferInProgress,
                MilestoneKind::TransferFinalizing,
            ]
        );
        assert_eq!(height_of(&milestones, MilestoneKind::RegistrationExpired), Some(177095));
    }

    #[test]
    fn test_all_future_milestones_exclude_current_height() {
        let snapshot = fixtures::opening();

        let milestones = calculate_all_future_milestones(&snapshot, 71779, &PARAMS);
        assert_eq!(milestones, vec![Milestone::new(MilestoneKind::AuctionClosed, 71780)]);

        assert!(calculate_all_future_milestones(&snapshot, 71780, &PARAMS).is_empty());

        let milestones = calculate_all_future_milestones(&snapshot, 69583, &PARAMS);
        assert_eq!(milestones.len(), 3);
        assert!(milestones.iter().all(|m| m.block_height > 69583));
    }

    #[test]
    fn test_name_availability() {
        let cases = [
            (fixtures::opening(), NameAvailability::AuctionOpening),
            (fixtures::bidding(), NameAvailability::AuctionBidding),
            (fixtures::in_reveal(), NameAvailability::AuctionReveal),
            (fixtures::no_auction(), NameAvailability::AvailNeverRegistered),
            (fixtures::reserved(), NameAvailability::UnavailReserved),
            (fixtures::locked(), NameAvailability::UnavailClaiming),
            (fixtures::reserved_registered(), NameAvailability::UnavailClosed),
            (fixtures::closed(), NameAvailability::UnavailClosed),
            (fixtures::not_renewed(), NameAvailability::AvailNotRenewed),
            (fixtures::transferring(), NameAvailability::UnavailTransferring),
        ];

        for (snapshot, expected) in cases {
            assert_eq!(name_availability(&snapshot), expected);
        }
    }

    #[test]
    fn test_name_availability_falls_back_to_other() {
        let revoked = NameInfoBuilder::new().state(NameState::Revoked).build();
        assert_eq!(name_availability(&revoked), NameAvailability::Other);

        let closed_without_stats = NameInfoBuilder::new().state(NameState::Closed).build();
        assert_eq!(name_availability(&closed_without_stats), NameAvailability::Other);
    }
}
