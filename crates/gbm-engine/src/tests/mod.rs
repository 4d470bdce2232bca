//! End-to-end auction scenarios over the in-memory ledger.

use {
    crate::{
        domain::{
            Engine,
            Error,
            auction::{self, TokenKind},
            contract,
            engine::{self, Bid, BidReceipt, Registration},
            eth::{Address, TokenId, U256},
            event::{Event, EventSink},
            ledger::{self, Ledger},
            preset::{self, tests::medium},
            signature::{self, BidMessage, TrustedSigner},
            time::ManualClock,
        },
        infra::ledger::InMemoryLedger,
    },
    alloy::signers::local::PrivateKeySigner,
    std::{
        collections::HashSet,
        ops::Deref,
        sync::{
            Arc,
            Mutex,
            mpsc::{self, Receiver, Sender},
        },
        time::Duration,
    },
};

mod registration;

pub const ADMIN: Address = Address::repeat_byte(0xad);
pub const OPERATOR: Address = Address::repeat_byte(0x0e);
pub const OWNER: Address = Address::repeat_byte(0x01);
pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const CAROL: Address = Address::repeat_byte(0xc0);

pub const REALMS: Address = Address::repeat_byte(0x72);
pub const WEARABLES: Address = Address::repeat_byte(0x7e);
pub const ERC721: contract::Id = contract::Id(1111);
pub const ERC1155: contract::Id = contract::Id(1010);
pub const MEDIUM: preset::Id = preset::Id(1);

/// Seconds after the end of an auction during which the owner may cancel.
pub const GRACE: u64 = 3_600;
/// The clock starts inside the bidding window of the medium preset.
pub const START: u64 = 2_000;

pub fn ghst(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18))
}

/// Collects every emitted event.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl EventSink for Recorder {
    fn emit(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}

/// In-memory ledger whose credits to selected accounts can be made to fail
/// and whose token lookups can be held up.
#[derive(Debug, Default)]
pub struct TestLedger {
    inner: InMemoryLedger,
    failing: Mutex<HashSet<Address>>,
    stalled: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

/// Handle to a token lookup that waits for [`Stall::release`].
pub struct Stall {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl TestLedger {
    pub fn fail_credits_to(&self, account: Address) {
        self.failing.lock().unwrap().insert(account);
    }

    /// Makes the next token balance lookup block until released. A lookup
    /// that is not released within a few seconds reports no tokens.
    pub fn stall_next_token_lookup(&self) -> Stall {
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel();
        *self.stalled.lock().unwrap() = Some((entered_tx, release_rx));
        Stall { entered, release }
    }
}

impl Deref for TestLedger {
    type Target = InMemoryLedger;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Ledger for TestLedger {
    fn balance_of(&self, account: Address) -> U256 {
        self.inner.balance_of(account)
    }

    fn debit(&self, account: Address, amount: U256) -> Result<(), ledger::Error> {
        self.inner.debit(account, amount)
    }

    fn credit(&self, account: Address, amount: U256) -> Result<(), ledger::Error> {
        if self.failing.lock().unwrap().contains(&account) {
            return Err(ledger::Error::Unavailable(format!("{account} is frozen")));
        }
        self.inner.credit(account, amount)
    }

    fn token_balance_of(&self, contract: Address, token: TokenId, account: Address) -> U256 {
        let stalled = self.stalled.lock().unwrap().take();
        if let Some((entered, release)) = stalled {
            entered.send(()).unwrap();
            if release.recv_timeout(Duration::from_secs(5)).is_err() {
                return U256::ZERO;
            }
        }
        self.inner.token_balance_of(contract, token, account)
    }

    fn transfer_token(
        &self,
        contract: Address,
        token: TokenId,
        amount: U256,
        from: Address,
        to: Address,
    ) -> Result<(), ledger::Error> {
        self.inner.transfer_token(contract, token, amount, from, to)
    }

    fn is_approved_for_all(&self, contract: Address, owner: Address, operator: Address) -> bool {
        self.inner.is_approved_for_all(contract, owner, operator)
    }
}

pub struct Setup {
    pub engine: Engine,
    pub ledger: Arc<TestLedger>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<Recorder>,
    pub signer: PrivateKeySigner,
}

impl Setup {
    /// An engine with the medium preset, one ERC-721 and one ERC-1155
    /// contract open for bidding, realm tokens 1 to 9 and 10 wearables of
    /// type 1 held by the owner, and well funded bidders.
    pub fn new() -> Self {
        observe::tracing::initialize_reentrant("gbm_engine=debug");

        let signer = PrivateKeySigner::from_slice(&[0x11; 32]).unwrap();
        let ledger = Arc::new(TestLedger::default());
        let clock = Arc::new(ManualClock::new(START));
        let events = Arc::new(Recorder::default());
        let engine = Engine::new(
            engine::Config {
                admin: ADMIN,
                operator: OPERATOR,
                trusted_signer: Some(TrustedSigner::from_address(signer.address())),
                grace_period: Duration::from_secs(GRACE),
            },
            ledger.clone(),
            clock.clone(),
            events.clone(),
        );

        engine.set_preset(ADMIN, MEDIUM, medium()).unwrap();
        for (id, address) in [(ERC721, REALMS), (ERC1155, WEARABLES)] {
            engine.register_contract(ADMIN, id, address).unwrap();
            engine.set_bidding_allowed(ADMIN, id, true).unwrap();
            ledger.set_approval_for_all(address, OWNER, OPERATOR, true);
        }
        for token in 1..10 {
            ledger.mint_token(REALMS, TokenId::from(token), OWNER, U256::from(1));
        }
        ledger.mint_token(WEARABLES, TokenId::from(1), OWNER, U256::from(10));
        for bidder in [ALICE, BOB, CAROL] {
            ledger.deposit(bidder, ghst(10_000));
        }
        ledger.fund_escrow(ghst(1_000_000));
        events.take();

        Self {
            engine,
            ledger,
            clock,
            events,
            signer,
        }
    }

    /// Auctions realm `token` with the medium preset.
    pub fn register(&self, token: u64) -> auction::Id {
        self.engine
            .register(
                Registration {
                    contract: ERC721,
                    token: TokenId::from(token),
                    kind: TokenKind::Erc721,
                    amount: U256::from(1),
                    preset: MEDIUM,
                },
                OWNER,
            )
            .unwrap()
    }

    /// A bid signed by the trusted signer against `highest_bid`.
    pub fn signed(
        &self,
        auction: auction::Id,
        bidder: Address,
        amount: U256,
        highest_bid: U256,
    ) -> Bid {
        let message = BidMessage {
            bidder,
            auction,
            bid_amount: amount,
            highest_bid,
        };
        Bid {
            auction,
            bidder,
            amount,
            highest_bid,
            signature: signature::tests::sign(&self.signer, &message).into(),
        }
    }

    /// Bids against the auction's current highest bid.
    pub fn bid(
        &self,
        auction: auction::Id,
        bidder: Address,
        amount: U256,
    ) -> Result<BidReceipt, Error> {
        let highest_bid = self.engine.auction(auction)?.highest_bid;
        self.engine
            .commit_bid(&self.signed(auction, bidder, amount, highest_bid))
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.ledger.balance_of(account)
    }

    pub fn realm_holder(&self, token: u64) -> Option<Address> {
        [OWNER, OPERATOR, ALICE, BOB, CAROL]
            .into_iter()
            .find(|account| {
                !self
                    .ledger
                    .token_balance_of(REALMS, TokenId::from(token), *account)
                    .is_zero()
            })
    }
}
