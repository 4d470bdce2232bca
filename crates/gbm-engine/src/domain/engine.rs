//! The single entry point for every auction operation.

use {
    crate::{
        domain::{
            Error,
            auction::{self, Auction, TokenKind},
            contract,
            eth::{Address, Bytes, TokenId, U256},
            event::{Event, EventSink},
            incentive,
            ledger::{Journal, Ledger},
            preset::{self, Preset},
            signature::{BidMessage, TrustedSigner, Verifier},
            time::{Clock, Timestamp},
        },
        infra::observe,
    },
    std::{
        sync::{Arc, RwLock},
        time::Duration,
    },
};

#[derive(Clone, Debug)]
pub struct Config {
    /// The only account allowed to change presets, contracts and the trusted
    /// signer.
    pub admin: Address,
    /// The engine's own ledger account which holds tokens while they are
    /// auctioned.
    pub operator: Address,
    pub trusted_signer: Option<TrustedSigner>,
    /// How long after an auction ends its owner may still cancel it and only
    /// the winner may claim it.
    pub grace_period: Duration,
}

/// A request to put a token up for auction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Registration {
    pub contract: contract::Id,
    pub token: TokenId,
    pub kind: TokenKind,
    pub amount: U256,
    pub preset: preset::Id,
}

/// Many tokens of one contract auctioned with the same parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    pub contract: contract::Id,
    pub tokens: Vec<TokenId>,
    pub kind: TokenKind,
    pub amount: U256,
    pub preset: preset::Id,
}

impl Batch {
    pub fn registrations(&self) -> impl Iterator<Item = Registration> + '_ {
        self.tokens.iter().map(|token| Registration {
            contract: self.contract,
            token: *token,
            kind: self.kind,
            amount: self.amount,
            preset: self.preset,
        })
    }
}

/// A signed bid as submitted by a bidder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bid {
    pub auction: auction::Id,
    pub bidder: Address,
    pub amount: U256,
    /// The highest bid the bidder saw when the bid was signed.
    pub highest_bid: U256,
    pub signature: Bytes,
}

impl Bid {
    fn message(&self) -> BidMessage {
        BidMessage {
            bidder: self.bidder,
            auction: self.auction,
            bid_amount: self.amount,
            highest_bid: self.highest_bid,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BidReceipt {
    pub auction: auction::Id,
    pub bidder: Address,
    pub amount: U256,
    /// The bidder that got outbid, if any.
    pub displaced: Option<Address>,
    /// Incentive paid to the displaced bidder on top of their refund.
    pub incentive_paid: U256,
    /// What the new bidder will be paid once outbid.
    pub due_incentive: U256,
    pub end_time: Timestamp,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settlement {
    pub auction: auction::Id,
    pub winner: Address,
    pub owner: Address,
    /// Winning bid paid to the owner.
    pub amount: U256,
}

pub struct Engine {
    admin: RwLock<Address>,
    operator: Address,
    grace_period: u64,
    presets: preset::Registry,
    contracts: contract::Registry,
    auctions: auction::Registry,
    verifier: Verifier,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl Engine {
    pub fn new(
        config: Config,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            admin: RwLock::new(config.admin),
            operator: config.operator,
            grace_period: config.grace_period.as_secs(),
            presets: Default::default(),
            contracts: Default::default(),
            auctions: Default::default(),
            verifier: Verifier::new(config.trusted_signer),
            ledger,
            clock,
            events,
        }
    }

    pub fn admin(&self) -> Address {
        *self.admin.read().unwrap()
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    fn ensure_admin(&self, caller: Address) -> Result<(), Error> {
        if caller != self.admin() {
            return Err(Error::NotAdmin { caller });
        }
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: Address, new: Address) -> Result<(), Error> {
        let mut admin = self.admin.write().unwrap();
        if caller != *admin {
            return Err(Error::NotAdmin { caller });
        }
        let previous = std::mem::replace(&mut *admin, new);
        self.events
            .emit(Event::OwnershipTransferred { previous, new });
        Ok(())
    }

    pub fn set_preset(&self, caller: Address, id: preset::Id, preset: Preset) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        if let Some(previous) = self.presets.set(id, preset)? {
            tracing::debug!(%id, ?previous, "replaced auction preset");
        }
        self.events.emit(Event::PresetUpdated { preset: id });
        Ok(())
    }

    pub fn preset(&self, id: preset::Id) -> Result<Preset, Error> {
        self.presets.get(id)
    }

    pub fn presets(&self) -> Vec<(preset::Id, Preset)> {
        self.presets.all()
    }

    pub fn register_contract(
        &self,
        caller: Address,
        id: contract::Id,
        address: Address,
    ) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        if self.contracts.register(id, address)? {
            self.events
                .emit(Event::ContractRegistered { contract: id, address });
        }
        Ok(())
    }

    pub fn set_bidding_allowed(
        &self,
        caller: Address,
        id: contract::Id,
        allowed: bool,
    ) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        self.contracts.set_bidding_allowed(id, allowed)?;
        self.events.emit(Event::BiddingAllowedUpdated {
            contract: id,
            allowed,
        });
        Ok(())
    }

    pub fn contract(&self, id: contract::Id) -> Result<contract::Registered, Error> {
        self.contracts.get(id)
    }

    pub fn contracts(&self) -> Vec<(contract::Id, contract::Registered)> {
        self.contracts.all()
    }

    pub fn set_trusted_signer(&self, caller: Address, signer: TrustedSigner) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        self.trust(signer);
        Ok(())
    }

    /// Like [`Engine::set_trusted_signer`] but derives the signer from its
    /// uncompressed public key.
    pub fn set_trusted_signer_public_key(&self, caller: Address, key: &[u8]) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        self.trust(TrustedSigner::from_public_key(key)?);
        Ok(())
    }

    fn trust(&self, signer: TrustedSigner) {
        self.verifier.set(signer);
        self.events.emit(Event::TrustedSignerUpdated {
            signer: signer.address(),
        });
    }

    pub fn trusted_signer(&self) -> Option<TrustedSigner> {
        self.verifier.get()
    }

    /// Puts `owner`'s tokens up for auction and locks them in the operator
    /// account.
    #[tracing::instrument(skip(self))]
    pub fn register(&self, registration: Registration, owner: Address) -> Result<auction::Id, Error> {
        let result = self.try_register(registration, owner);
        observe::registration(&registration, &result);
        result
    }

    /// Registers every token of the batch independently. A token that cannot
    /// be registered does not keep the others from being registered.
    pub fn register_many(&self, batch: &Batch, owner: Address) -> Vec<Result<auction::Id, Error>> {
        batch
            .registrations()
            .map(|registration| self.register(registration, owner))
            .collect()
    }

    fn try_register(&self, registration: Registration, owner: Address) -> Result<auction::Id, Error> {
        let contract = self.contracts.get(registration.contract)?;
        if !contract.bidding_allowed {
            return Err(Error::ContractBiddingDisabled(registration.contract));
        }
        let preset = self.presets.get(registration.preset)?;
        if !registration.kind.accepts(registration.amount) {
            return Err(Error::InvalidTokenAmount {
                kind: registration.kind,
                amount: registration.amount,
            });
        }

        let key = (registration.contract, registration.token);
        let id = self.auctions.insert_with(key, |id| {
            let held =
                self.ledger
                    .token_balance_of(contract.address, registration.token, owner);
            if held < registration.amount {
                return Err(Error::TokenNotOwned {
                    contract: registration.contract,
                    token: registration.token,
                    owner,
                    amount: registration.amount,
                });
            }
            if !self
                .ledger
                .is_approved_for_all(contract.address, owner, self.operator)
            {
                return Err(Error::TokenNotApproved {
                    contract: registration.contract,
                    owner,
                });
            }

            let mut journal = Journal::new(self.ledger.as_ref());
            journal.transfer_token(
                contract.address,
                registration.token,
                registration.amount,
                owner,
                self.operator,
            )?;
            journal.commit();

            Ok(Auction {
                id,
                contract_id: registration.contract,
                token_contract: contract.address,
                token_id: registration.token,
                kind: registration.kind,
                amount: registration.amount,
                preset_id: registration.preset,
                preset,
                owner,
                highest_bidder: None,
                highest_bid: U256::ZERO,
                due_incentive: U256::ZERO,
                end_time: preset.end_time,
                bid_count: 0,
                claimed: false,
                cancelled: false,
            })
        })?;

        self.events.emit(Event::AuctionRegistered {
            auction: id,
            contract: registration.contract,
            token: registration.token,
            kind: registration.kind,
            amount: registration.amount,
            preset: registration.preset,
            owner,
        });
        Ok(id)
    }

    pub fn auction(&self, id: auction::Id) -> Result<Auction, Error> {
        self.auctions.snapshot(id)
    }

    /// The auction currently selling the token, if it is neither claimed nor
    /// cancelled.
    pub fn auction_id(&self, contract: contract::Id, token: TokenId) -> Option<auction::Id> {
        self.auctions.open_auction((contract, token))
    }

    pub fn auction_state(&self, id: auction::Id) -> Result<auction::State, Error> {
        Ok(self.auction(id)?.state(self.clock.now()))
    }

    /// The incentive the current highest bidder will be paid once outbid.
    pub fn due_incentive(&self, id: auction::Id) -> Result<U256, Error> {
        Ok(self.auction(id)?.due_incentive)
    }

    /// The smallest bid the auction currently accepts.
    pub fn minimum_bid(&self, id: auction::Id) -> Result<U256, Error> {
        Ok(self.auction(id)?.minimum_bid())
    }

    /// Validates a signed bid and, if it outbids the current highest bid,
    /// escrows it and refunds the displaced bidder with their incentive.
    #[tracing::instrument(skip_all, fields(auction = %bid.auction, bidder = %bid.bidder, amount = %bid.amount))]
    pub fn commit_bid(&self, bid: &Bid) -> Result<BidReceipt, Error> {
        let result = self.try_commit_bid(bid);
        observe::bid(bid, &result);
        result
    }

    fn try_commit_bid(&self, bid: &Bid) -> Result<BidReceipt, Error> {
        let now = self.clock.now();
        let auction = self.auctions.get(bid.auction)?;
        let mut auction = auction.lock().unwrap();

        auction.ensure_unsettled()?;
        if now < auction.preset.start_time {
            return Err(Error::AuctionNotStarted(auction.id));
        }
        if now >= auction.end_time {
            return Err(Error::AuctionEnded(auction.id));
        }
        if !self.contracts.get(auction.contract_id)?.bidding_allowed {
            return Err(Error::ContractBiddingDisabled(auction.contract_id));
        }
        if bid.amount.is_zero() {
            return Err(Error::BidAmountZero);
        }
        if !self.verifier.verify(&bid.message(), &bid.signature) {
            return Err(Error::SignatureInvalid);
        }
        if bid.highest_bid != auction.highest_bid {
            return Err(Error::StaleHighestBid {
                current: auction.highest_bid,
                submitted: bid.highest_bid,
            });
        }
        let minimum = auction.minimum_bid();
        if bid.amount <= auction.highest_bid || bid.amount < minimum {
            return Err(Error::BidTooLow {
                minimum,
                submitted: bid.amount,
            });
        }

        let due_incentive = incentive::due_incentive(&auction.preset, auction.highest_bid, bid.amount);
        let displaced = auction
            .highest_bidder
            .map(|bidder| (bidder, auction.highest_bid, auction.due_incentive));

        let mut journal = Journal::new(self.ledger.as_ref());
        journal.debit(bid.bidder, bid.amount)?;
        if let Some((bidder, refund, incentive)) = displaced {
            journal.credit(bidder, refund.saturating_add(incentive))?;
        }
        journal.commit();

        let hammer = auction.preset.hammer_time_duration;
        if now >= auction.end_time.saturating_sub(hammer) {
            auction.end_time = auction.end_time.max(now.saturating_add(hammer));
        }
        auction.highest_bidder = Some(bid.bidder);
        auction.highest_bid = bid.amount;
        auction.due_incentive = due_incentive;
        auction.bid_count += 1;

        let incentive_paid = displaced.map(|(_, _, paid)| paid).unwrap_or_default();
        if let Some((bidder, refund, paid)) = displaced {
            self.events.emit(Event::BidRemoved {
                auction: auction.id,
                bidder,
                amount: refund,
            });
            if !paid.is_zero() {
                self.events.emit(Event::IncentivePaid {
                    auction: auction.id,
                    bidder,
                    amount: paid,
                });
            }
        }
        self.events.emit(Event::BidPlaced {
            auction: auction.id,
            bidder: bid.bidder,
            amount: bid.amount,
            incentive_paid,
            end_time: auction.end_time,
        });

        Ok(BidReceipt {
            auction: auction.id,
            bidder: bid.bidder,
            amount: bid.amount,
            displaced: displaced.map(|(bidder, _, _)| bidder),
            incentive_paid,
            due_incentive,
            end_time: auction.end_time,
        })
    }

    /// Settles an ended auction: the token goes to the highest bidder and the
    /// winning bid to the owner.
    #[tracing::instrument(skip(self))]
    pub fn claim(&self, id: auction::Id, caller: Address) -> Result<Settlement, Error> {
        let result = self.try_claim(id, caller);
        observe::claim(id, &result);
        result
    }

    fn try_claim(&self, id: auction::Id, caller: Address) -> Result<Settlement, Error> {
        let now = self.clock.now();
        let auction = self.auctions.get(id)?;
        let mut auction = auction.lock().unwrap();

        auction.ensure_unsettled()?;
        if now < auction.end_time {
            return Err(Error::AuctionNotEnded(id));
        }
        let Some(winner) = auction.highest_bidder else {
            return Err(Error::NoWinner(id));
        };
        // Past the grace period anyone may settle on the winner's behalf.
        if caller != winner && now < auction.end_time.saturating_add(self.grace_period) {
            return Err(Error::NotWinner {
                auction: id,
                caller,
            });
        }

        let mut journal = Journal::new(self.ledger.as_ref());
        journal.transfer_token(
            auction.token_contract,
            auction.token_id,
            auction.amount,
            self.operator,
            winner,
        )?;
        journal.credit(auction.owner, auction.highest_bid)?;
        journal.commit();

        auction.claimed = true;
        self.auctions.release(auction.key(), id);
        self.events.emit(Event::AuctionClaimed {
            auction: id,
            winner,
            amount: auction.highest_bid,
            caller,
        });

        Ok(Settlement {
            auction: id,
            winner,
            owner: auction.owner,
            amount: auction.highest_bid,
        })
    }

    /// Returns the token to its owner and refunds the highest bid. Auctions
    /// with bids can only be cancelled during the grace period after they
    /// ended.
    #[tracing::instrument(skip(self))]
    pub fn cancel_auction(&self, id: auction::Id, caller: Address) -> Result<(), Error> {
        let result = self.try_cancel_auction(id, caller);
        observe::cancellation(id, &result);
        result
    }

    fn try_cancel_auction(&self, id: auction::Id, caller: Address) -> Result<(), Error> {
        let now = self.clock.now();
        let auction = self.auctions.get(id)?;
        let mut auction = auction.lock().unwrap();

        if caller != auction.owner {
            return Err(Error::NotAuctionOwner {
                auction: id,
                caller,
            });
        }
        auction.ensure_unsettled()?;
        let refund = auction
            .highest_bidder
            .map(|bidder| (bidder, auction.highest_bid));
        if refund.is_some() {
            let grace = auction.end_time..auction.end_time.saturating_add(self.grace_period);
            if !grace.contains(&now) {
                return Err(Error::CancellationNotAllowed(id));
            }
        }

        let mut journal = Journal::new(self.ledger.as_ref());
        journal.transfer_token(
            auction.token_contract,
            auction.token_id,
            auction.amount,
            self.operator,
            auction.owner,
        )?;
        if let Some((bidder, amount)) = refund {
            journal.credit(bidder, amount)?;
        }
        journal.commit();

        auction.cancelled = true;
        self.auctions.release(auction.key(), id);
        self.events.emit(Event::AuctionCancelled {
            auction: id,
            owner: auction.owner,
            refunded: refund,
        });
        Ok(())
    }
}
