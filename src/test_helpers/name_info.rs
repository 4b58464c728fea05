//! A builder for creating `NameInfo` snapshots for testing, and snapshots of
//! real names in each lifecycle state.

use crate::models::name_info::{
    NameAuctionInfo, NameInfo, NameOwner, NameStart, NameState, NameStats,
};

/// A builder for creating `NameInfo` instances for testing.
///
/// Starts from a name in `OPENING` at height 0 with an owner and no stats.
#[derive(Debug, Clone)]
pub struct NameInfoBuilder {
    start: NameStart,
    info: Option<NameAuctionInfo>,
}

impl Default for NameInfoBuilder {
    fn default() -> Self {
        Self {
            start: NameStart::default(),
            info: Some(NameAuctionInfo {
                name: String::new(),
                name_hash: String::new(),
                state: NameState::Opening,
                height: 0,
                renewal: 0,
                owner: Some(NameOwner::default()),
                value: 0,
                highest: 0,
                transfer: 0,
                revoked: 0,
                claimed: 0,
                renewals: 0,
                registered: false,
                expired: false,
                weak: false,
                stats: None,
            }),
        }
    }
}

impl NameInfoBuilder {
    /// Creates a new `NameInfoBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the auction info, as for a name that was never opened.
    pub fn no_info(mut self) -> Self {
        self.info = None;
        self
    }

    /// Sets whether the name is reserved.
    pub fn reserved(mut self, reserved: bool) -> Self {
        self.start.reserved = reserved;
        self
    }

    /// Sets the name and its hash.
    pub fn name(mut self, name: &str, name_hash: &str) -> Self {
        self.with_info(|info| {
            info.name = name.to_string();
            info.name_hash = name_hash.to_string();
        });
        self
    }

    /// Sets the lifecycle state.
    pub fn state(mut self, state: NameState) -> Self {
        self.with_info(|info| info.state = state);
        self
    }

    /// Sets the opening or claim height.
    pub fn height(mut self, height: u64) -> Self {
        self.with_info(|info| info.height = height);
        self
    }

    /// Sets the renewal height.
    pub fn renewal(mut self, renewal: u64) -> Self {
        self.with_info(|info| info.renewal = renewal);
        self
    }

    /// Sets the owner.
    pub fn owner(mut self, owner: Option<NameOwner>) -> Self {
        self.with_info(|info| info.owner = owner);
        self
    }

    /// Sets the claim counter.
    pub fn claimed(mut self, claimed: u64) -> Self {
        self.with_info(|info| info.claimed = claimed);
        self
    }

    /// Sets the height of the pending transfer.
    pub fn transfer(mut self, transfer: u64) -> Self {
        self.with_info(|info| info.transfer = transfer);
        self
    }

    /// Sets the winning bid and the highest bid.
    pub fn bids(mut self, value: u64, highest: u64) -> Self {
        self.with_info(|info| {
            info.value = value;
            info.highest = highest;
        });
        self
    }

    /// Marks the name as registered.
    pub fn registered(mut self) -> Self {
        self.with_info(|info| info.registered = true);
        self
    }

    /// Sets the node's precomputed counters.
    pub fn stats(mut self, stats: NameStats) -> Self {
        self.with_info(|info| info.stats = Some(stats));
        self
    }

    /// Builds the `NameInfo` with the provided values.
    pub fn build(self) -> NameInfo {
        NameInfo { start: self.start, info: self.info }
    }

    fn with_info(&mut self, f: impl FnOnce(&mut NameAuctionInfo)) {
        if let Some(info) = self.info.as_mut() {
            f(info);
        }
    }
}

/// Snapshots of mainnet names, one per lifecycle state.
pub mod fixtures {
    use super::*;

    /// Hash of the name `ocer`.
    pub const OCER_HASH: &str = "952f1c3e3ed55ca92e16ccbe806ae59173b8c86a2c4119aab8673c43c3fa1a90";

    /// Height at which the auction of `ocer` opened.
    pub const OCER_OPENED_AT: u64 = 62517;

    fn owned(index: u32) -> Option<NameOwner> {
        Some(NameOwner { hash: String::new(), index })
    }

    /// `ocer` right after its auction opened.
    pub fn ocer() -> NameInfo {
        NameInfoBuilder::new()
            .name("ocer", OCER_HASH)
            .height(OCER_OPENED_AT)
            .renewal(OCER_OPENED_AT)
            .owner(owned(u32::MAX))
            .stats(NameStats {
                open_period_start: Some(OCER_OPENED_AT),
                open_period_end: Some(OCER_OPENED_AT + 37),
                blocks_until_bidding: Some(37),
                ..Default::default()
            })
            .build()
    }

    /// A name in its opening period.
    pub fn opening() -> NameInfo {
        NameInfoBuilder::new()
            .height(69583)
            .renewal(69583)
            .owner(owned(u32::MAX))
            .stats(NameStats {
                open_period_start: Some(69583),
                open_period_end: Some(69620),
                blocks_until_bidding: Some(37),
                ..Default::default()
            })
            .build()
    }

    /// A name accepting bids.
    pub fn bidding() -> NameInfo {
        NameInfoBuilder::new()
            .state(NameState::Bidding)
            .height(68978)
            .renewal(68978)
            .owner(owned(u32::MAX))
            .stats(NameStats {
                bid_period_start: Some(69015),
                bid_period_end: Some(69735),
                blocks_until_reveal: Some(151),
                ..Default::default()
            })
            .build()
    }

    /// A name whose bids are being revealed.
    pub fn in_reveal() -> NameInfo {
        NameInfoBuilder::new()
            .state(NameState::Reveal)
            .height(67916)
            .renewal(67916)
            .owner(owned(25))
            .bids(400000, 10000100)
            .stats(NameStats {
                reveal_period_start: Some(68673),
                reveal_period_end: Some(70113),
                blocks_until_close: Some(530),
                ..Default::default()
            })
            .build()
    }

    /// A name that was never opened.
    pub fn no_auction() -> NameInfo {
        NameInfoBuilder::new().no_info().build()
    }

    /// A reserved name that was never claimed.
    pub fn reserved() -> NameInfo {
        NameInfoBuilder::new().reserved(true).no_info().build()
    }

    /// A reserved name in its claim lockup.
    pub fn locked() -> NameInfo {
        NameInfoBuilder::new()
            .reserved(true)
            .state(NameState::Locked)
            .height(68610)
            .renewal(68610)
            .owner(owned(1))
            .claimed(1)
            .stats(NameStats {
                lockup_period_start: Some(68610),
                lockup_period_end: Some(72930),
                blocks_until_closed: Some(1354),
                ..Default::default()
            })
            .build()
    }

    /// A reserved name that was claimed and registered.
    pub fn reserved_registered() -> NameInfo {
        NameInfoBuilder::new()
            .reserved(true)
            .state(NameState::Closed)
            .height(22913)
            .renewal(30015)
            .owner(owned(0))
            .claimed(1)
            .registered()
            .stats(NameStats {
                renewal_period_start: Some(30015),
                renewal_period_end: Some(135135),
                blocks_until_expire: Some(64553),
                ..Default::default()
            })
            .build()
    }

    /// A registered name whose renewal window has passed.
    pub fn not_renewed() -> NameInfo {
        NameInfoBuilder::new()
            .state(NameState::Closed)
            .height(66734)
            .renewal(68933)
            .owner(owned(37))
            .bids(0, 1000000000)
            .registered()
            .stats(NameStats {
                renewal_period_start: Some(68933),
                renewal_period_end: Some(174053),
                blocks_until_expire: Some(-104485),
                ..Default::default()
            })
            .build()
    }

    /// A claimed name with a transfer in progress.
    pub fn transferring() -> NameInfo {
        NameInfoBuilder::new()
            .reserved(true)
            .name(
                "newmessages",
                "81a8fc0f1d001528a5ec0eeb4bc97d62178ddae985d8699e2930939dd34cf490",
            )
            .state(NameState::Closed)
            .height(67610)
            .renewal(71975)
            .owner(Some(NameOwner {
                hash: "b04a20938377550896760abe4605171f83700f9f9101e86c1b02ae46c87bb7d1".into(),
                index: 0,
            }))
            .transfer(72136)
            .claimed(1)
            .registered()
            .stats(NameStats {
                renewal_period_start: Some(71975),
                renewal_period_end: Some(177095),
                blocks_until_expire: Some(104959),
                transfer_lockup_start: Some(72136),
                transfer_lockup_end: Some(72424),
                blocks_until_valid_finalize: Some(288),
                ..Default::default()
            })
            .build()
    }

    /// A name won at auction and registered.
    pub fn closed() -> NameInfo {
        NameInfoBuilder::new()
            .state(NameState::Closed)
            .height(12104)
            .renewal(14302)
            .owner(owned(0))
            .bids(55000000000, 150000000000)
            .registered()
            .stats(NameStats {
                renewal_period_start: Some(14302),
                renewal_period_end: Some(119422),
                blocks_until_expire: Some(49787),
                ..Default::default()
            })
            .build()
    }
}
