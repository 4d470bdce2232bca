//! Notifications about every state change of the engine.

use crate::domain::{
    auction,
    contract,
    eth::{Address, TokenId, U256},
    preset,
    time::Timestamp,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    AuctionRegistered {
        auction: auction::Id,
        contract: contract::Id,
        token: TokenId,
        kind: auction::TokenKind,
        amount: U256,
        preset: preset::Id,
        owner: Address,
    },
    BidPlaced {
        auction: auction::Id,
        bidder: Address,
        amount: U256,
        /// Incentive paid to the bidder that was displaced.
        incentive_paid: U256,
        end_time: Timestamp,
    },
    /// A bid was outbid and refunded.
    BidRemoved {
        auction: auction::Id,
        bidder: Address,
        amount: U256,
    },
    IncentivePaid {
        auction: auction::Id,
        bidder: Address,
        amount: U256,
    },
    AuctionClaimed {
        auction: auction::Id,
        winner: Address,
        amount: U256,
        caller: Address,
    },
    AuctionCancelled {
        auction: auction::Id,
        owner: Address,
        refunded: Option<(Address, U256)>,
    },
    PresetUpdated {
        preset: preset::Id,
    },
    ContractRegistered {
        contract: contract::Id,
        address: Address,
    },
    BiddingAllowedUpdated {
        contract: contract::Id,
        allowed: bool,
    },
    TrustedSignerUpdated {
        signer: Address,
    },
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::AuctionRegistered { .. } => "auction_registered",
            Event::BidPlaced { .. } => "bid_placed",
            Event::BidRemoved { .. } => "bid_removed",
            Event::IncentivePaid { .. } => "incentive_paid",
            Event::AuctionClaimed { .. } => "auction_claimed",
            Event::AuctionCancelled { .. } => "auction_cancelled",
            Event::PresetUpdated { .. } => "preset_updated",
            Event::ContractRegistered { .. } => "contract_registered",
            Event::BiddingAllowedUpdated { .. } => "bidding_allowed_updated",
            Event::TrustedSignerUpdated { .. } => "trusted_signer_updated",
            Event::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

/// Receives events in the order the engine commits the state changes they
/// describe. Events of a single auction are never reordered.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes every event to the log.
#[derive(Debug, Default)]
pub struct Log;

impl EventSink for Log {
    fn emit(&self, event: Event) {
        tracing::info!(name = event.name(), ?event, "event");
    }
}
