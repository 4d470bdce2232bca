//! Replays scripted auction operations against an engine backed by the
//! in-memory ledger and a manual clock.

use {
    crate::{
        domain::{
            Engine,
            auction::{self, TokenKind},
            contract,
            engine::{Batch, Bid, Registration},
            eth::{Address, Bytes, TokenId, U256},
            event,
            ledger::Ledger,
            preset::{self, Preset},
            signature::{BidMessage, TrustedSigner},
            time::{Clock, ManualClock, Timestamp},
        },
        infra::{config, ledger::InMemoryLedger},
    },
    alloy::signers::{SignerSync, local::PrivateKeySigner},
    anyhow::{Context, Result, anyhow},
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::{
        collections::BTreeSet,
        fmt::{self, Display, Formatter},
        sync::Arc,
    },
};

/// One scripted operation. Callers of admin operations default to the
/// configured admin.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(
    tag = "step",
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case",
    deny_unknown_fields
)]
pub enum Step {
    Advance {
        seconds: u64,
    },
    SetPreset {
        caller: Option<Address>,
        id: preset::Id,
        preset: Preset,
    },
    RegisterContract {
        caller: Option<Address>,
        id: contract::Id,
        address: Address,
    },
    SetBiddingAllowed {
        caller: Option<Address>,
        id: contract::Id,
        allowed: bool,
    },
    Register {
        owner: Address,
        contract: contract::Id,
        #[serde_as(as = "DisplayFromStr")]
        token: TokenId,
        kind: TokenKind,
        #[serde_as(as = "Option<DisplayFromStr>")]
        amount: Option<U256>,
        preset: preset::Id,
    },
    RegisterMany {
        owner: Address,
        contract: contract::Id,
        #[serde_as(as = "Vec<DisplayFromStr>")]
        tokens: Vec<TokenId>,
        kind: TokenKind,
        #[serde_as(as = "Option<DisplayFromStr>")]
        amount: Option<U256>,
        preset: preset::Id,
    },
    Bid {
        auction: auction::Id,
        bidder: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: U256,
        /// Defaults to the auction's current highest bid.
        #[serde_as(as = "Option<DisplayFromStr>")]
        highest_bid: Option<U256>,
        /// Signed with the configured signer key when missing.
        signature: Option<Bytes>,
    },
    Claim {
        auction: auction::Id,
        caller: Address,
    },
    Cancel {
        auction: auction::Id,
        caller: Address,
    },
}

/// Lots default to a single token.
fn default_amount(amount: Option<U256>) -> U256 {
    amount.unwrap_or(U256::from(1))
}

pub struct Simulator {
    engine: Engine,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    signer: Option<PrivateKeySigner>,
    /// Accounts whose balances end up in the report.
    accounts: BTreeSet<Address>,
}

impl Simulator {
    /// Builds the engine and ledger described by `config` and applies its
    /// presets and contracts through the admin.
    pub fn new(config: config::Config) -> Result<Self> {
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.fund_escrow(config.ledger.escrow);
        let mut accounts = BTreeSet::new();
        for (account, amount) in &config.ledger.balances {
            ledger.deposit(*account, *amount);
            accounts.insert(*account);
        }
        for holding in &config.ledger.tokens {
            ledger.mint_token(holding.contract, holding.token, holding.owner, holding.amount);
            accounts.insert(holding.owner);
        }
        for (contract, owner) in &config.ledger.approvals {
            ledger.set_approval_for_all(*contract, *owner, config.engine.operator, true);
        }

        let signer = config
            .signer_key
            .map(|key| PrivateKeySigner::from_bytes(&key))
            .transpose()
            .context("invalid signer key")?;
        let mut engine_config = config.engine;
        if let Some(signer) = &signer {
            tracing::debug!(address = %signer.address(), "signing unsigned bids");
            // Without an explicit signer the simulation key is trusted.
            engine_config
                .trusted_signer
                .get_or_insert(TrustedSigner::from_address(signer.address()));
        }

        let clock = Arc::new(ManualClock::new(config.start_time));
        let admin = engine_config.admin;
        let engine = Engine::new(
            engine_config,
            ledger.clone(),
            clock.clone(),
            Arc::new(event::Log),
        );

        for (id, preset) in config.presets {
            engine
                .set_preset(admin, id, preset)
                .with_context(|| format!("invalid preset {id}"))?;
        }
        for contract in config.contracts {
            engine
                .register_contract(admin, contract.id, contract.address)
                .with_context(|| format!("failed to register contract {}", contract.id))?;
            if contract.bidding_allowed {
                engine.set_bidding_allowed(admin, contract.id, true)?;
            }
        }

        Ok(Self {
            engine,
            ledger,
            clock,
            signer,
            accounts,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    /// Applies every step in order. Rejected steps are logged and counted
    /// but do not stop the run.
    pub fn run(&mut self, steps: Vec<Step>) -> Report {
        let mut report = Report::default();
        for (index, step) in steps.into_iter().enumerate() {
            match self.step(step) {
                Ok(outcome) => {
                    tracing::info!(index, %outcome, "step succeeded");
                    report.accepted += 1;
                }
                Err(err) => {
                    tracing::warn!(index, ?err, "step rejected");
                    report.rejected += 1;
                }
            }
        }
        report.time = self.clock.now();
        report.escrow = self.ledger.escrow_balance();
        report.balances = self
            .accounts
            .iter()
            .map(|account| (*account, self.ledger.balance_of(*account)))
            .collect();
        report
    }

    /// Applies a single step and describes what happened.
    pub fn step(&mut self, step: Step) -> Result<String> {
        let admin = self.engine.admin();
        match step {
            Step::Advance { seconds } => {
                let now = self.clock.advance(seconds);
                Ok(format!("time is {now}"))
            }
            Step::SetPreset { caller, id, preset } => {
                self.engine
                    .set_preset(caller.unwrap_or(admin), id, preset)?;
                Ok(format!("set preset {id}"))
            }
            Step::RegisterContract {
                caller,
                id,
                address,
            } => {
                self.engine
                    .register_contract(caller.unwrap_or(admin), id, address)?;
                Ok(format!("registered contract {id} at {address}"))
            }
            Step::SetBiddingAllowed {
                caller,
                id,
                allowed,
            } => {
                self.engine
                    .set_bidding_allowed(caller.unwrap_or(admin), id, allowed)?;
                Ok(format!("bidding on contract {id} allowed: {allowed}"))
            }
            Step::Register {
                owner,
                contract,
                token,
                kind,
                amount,
                preset,
            } => {
                self.accounts.insert(owner);
                let id = self.engine.register(
                    Registration {
                        contract,
                        token,
                        kind,
                        amount: default_amount(amount),
                        preset,
                    },
                    owner,
                )?;
                Ok(format!("registered auction {id}"))
            }
            Step::RegisterMany {
                owner,
                contract,
                tokens,
                kind,
                amount,
                preset,
            } => {
                self.accounts.insert(owner);
                let batch = Batch {
                    contract,
                    tokens,
                    kind,
                    amount: default_amount(amount),
                    preset,
                };
                let results = self.engine.register_many(&batch, owner);
                let registered = results
                    .iter()
                    .filter_map(|result| result.as_ref().ok())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                if registered.is_empty() {
                    return Err(anyhow!("no token of the batch could be registered"));
                }
                Ok(format!(
                    "registered {} of {} auctions: {}",
                    registered.len(),
                    results.len(),
                    registered.join(", ")
                ))
            }
            Step::Bid {
                auction,
                bidder,
                amount,
                highest_bid,
                signature,
            } => {
                self.accounts.insert(bidder);
                let highest_bid = match highest_bid {
                    Some(highest_bid) => highest_bid,
                    None => self.engine.auction(auction)?.highest_bid,
                };
                let signature = match signature {
                    Some(signature) => signature,
                    None => self.sign(&BidMessage {
                        bidder,
                        auction,
                        bid_amount: amount,
                        highest_bid,
                    })?,
                };
                let receipt = self.engine.commit_bid(&Bid {
                    auction,
                    bidder,
                    amount,
                    highest_bid,
                    signature,
                })?;
                Ok(format!(
                    "{bidder} bid {amount} on auction {auction}, incentive paid {}, ends at {}",
                    receipt.incentive_paid, receipt.end_time
                ))
            }
            Step::Claim { auction, caller } => {
                let settlement = self.engine.claim(auction, caller)?;
                self.accounts.insert(settlement.winner);
                self.accounts.insert(settlement.owner);
                Ok(format!(
                    "auction {auction} won by {} for {}",
                    settlement.winner, settlement.amount
                ))
            }
            Step::Cancel { auction, caller } => {
                self.engine.cancel_auction(auction, caller)?;
                Ok(format!("cancelled auction {auction}"))
            }
        }
    }

    fn sign(&self, message: &BidMessage) -> Result<Bytes> {
        let signer = self
            .signer
            .as_ref()
            .context("bid has no signature and no signer key is configured")?;
        let signature = signer.sign_message_sync(message.hash().as_slice())?;
        Ok(signature.as_bytes().to_vec().into())
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Default)]
pub struct Report {
    pub accepted: usize,
    pub rejected: usize,
    pub time: Timestamp,
    pub escrow: U256,
    pub balances: Vec<(Address, U256)>,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} steps accepted, {} rejected, final time {}",
            self.accepted, self.rejected, self.time
        )?;
        writeln!(f, "escrow: {}", self.escrow)?;
        for (account, balance) in &self.balances {
            writeln!(f, "{account}: {balance}")?;
        }
        Ok(())
    }
}
