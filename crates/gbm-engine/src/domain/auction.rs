//! Auction records and the index guaranteeing one open auction per token.

use {
    crate::domain::{
        Error,
        contract,
        eth::{Address, TokenId, U256},
        incentive,
        preset::{self, Preset},
        time::Timestamp,
    },
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fmt::{self, Display, Formatter},
        sync::{Arc, Mutex},
    },
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The token standard an auctioned token follows.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Non-fungible, always auctioned one at a time.
    Erc721,
    /// Semi-fungible, auctioned in lots of one or more.
    Erc1155,
}

impl TokenKind {
    /// The 4 byte identifier used by registration requests to name the
    /// token kind.
    pub fn selector(self) -> [u8; 4] {
        match self {
            TokenKind::Erc721 => [0x73, 0xad, 0x21, 0x46],
            TokenKind::Erc1155 => [0x97, 0x3b, 0xb6, 0x40],
        }
    }

    /// Whether `amount` tokens can be put up in a single auction.
    pub fn accepts(self, amount: U256) -> bool {
        match self {
            TokenKind::Erc721 => amount == U256::from(1),
            TokenKind::Erc1155 => !amount.is_zero(),
        }
    }
}

impl TryFrom<[u8; 4]> for TokenKind {
    type Error = UnknownSelector;

    fn try_from(selector: [u8; 4]) -> Result<Self, Self::Error> {
        [TokenKind::Erc721, TokenKind::Erc1155]
            .into_iter()
            .find(|kind| kind.selector() == selector)
            .ok_or(UnknownSelector(selector))
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            TokenKind::Erc721 => "ERC-721",
            TokenKind::Erc1155 => "ERC-1155",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown token kind selector 0x{}", alloy::primitives::hex::encode(.0))]
pub struct UnknownSelector(pub [u8; 4]);

/// Where an auction is in its lifecycle at a given point in time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Registered but not accepting bids yet.
    Pending,
    Open,
    /// Past its end time and waiting for a claim or cancellation.
    Ended,
    Claimed,
    Cancelled,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Auction {
    pub id: Id,
    pub contract_id: contract::Id,
    /// Address of the token contract at registration time.
    pub token_contract: Address,
    pub token_id: TokenId,
    pub kind: TokenKind,
    pub amount: U256,
    pub preset_id: preset::Id,
    /// Snapshot of the preset at registration time.
    pub preset: Preset,
    pub owner: Address,
    pub highest_bidder: Option<Address>,
    /// Zero until the first bid.
    pub highest_bid: U256,
    /// What the highest bidder is paid on top of their refund when outbid.
    pub due_incentive: U256,
    /// Starts at the preset end time and only ever moves forward.
    pub end_time: Timestamp,
    pub bid_count: u64,
    pub claimed: bool,
    pub cancelled: bool,
}

impl Auction {
    pub fn state(&self, now: Timestamp) -> State {
        if self.claimed {
            State::Claimed
        } else if self.cancelled {
            State::Cancelled
        } else if now < self.preset.start_time {
            State::Pending
        } else if now < self.end_time {
            State::Open
        } else {
            State::Ended
        }
    }

    /// The smallest acceptable next bid.
    pub fn minimum_bid(&self) -> U256 {
        incentive::minimum_bid(&self.preset, self.highest_bid)
    }

    pub fn key(&self) -> Key {
        (self.contract_id, self.token_id)
    }

    /// Fails unless the auction is neither claimed nor cancelled.
    pub fn ensure_unsettled(&self) -> Result<(), Error> {
        if self.claimed {
            return Err(Error::AlreadyClaimed(self.id));
        }
        if self.cancelled {
            return Err(Error::AlreadyCancelled(self.id));
        }
        Ok(())
    }
}

/// Identifies the token an auction sells.
pub type Key = (contract::Id, TokenId);

#[derive(Debug)]
struct Inner {
    next_id: u64,
    auctions: HashMap<Id, Arc<Mutex<Auction>>>,
    open: HashMap<Key, Id>,
}

/// Owns all auctions. Each auction sits behind its own mutex so transitions
/// on different auctions never wait on each other.
///
/// Lock order is registration, then auction, then the index. The index lock
/// is only ever held for map lookups.
#[derive(Debug)]
pub struct Registry {
    registration: Mutex<()>,
    inner: Mutex<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            registration: Mutex::new(()),
            inner: Mutex::new(Inner {
                next_id: 1,
                auctions: HashMap::new(),
                open: HashMap::new(),
            }),
        }
    }
}

impl Registry {
    /// Creates an auction for `key` unless one is already open for it.
    ///
    /// Registrations are serialized among themselves. `create` receives the
    /// ID the auction will get and runs without the index lock, so lookups
    /// and transitions of other auctions proceed meanwhile. The ID is only
    /// consumed if `create` succeeds.
    pub fn insert_with(
        &self,
        key: Key,
        create: impl FnOnce(Id) -> Result<Auction, Error>,
    ) -> Result<Id, Error> {
        let _registration = self.registration.lock().unwrap();
        let id = {
            let inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.open.get(&key) {
                return Err(Error::DuplicateAuction {
                    contract: key.0,
                    token: key.1,
                    existing: *existing,
                });
            }
            Id(inner.next_id)
        };

        let auction = create(id)?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        inner.open.insert(key, id);
        inner.auctions.insert(id, Arc::new(Mutex::new(auction)));
        Ok(id)
    }

    pub fn get(&self, id: Id) -> Result<Arc<Mutex<Auction>>, Error> {
        self.inner
            .lock()
            .unwrap()
            .auctions
            .get(&id)
            .cloned()
            .ok_or(Error::AuctionNotFound(id))
    }

    /// A copy of the auction's current state.
    pub fn snapshot(&self, id: Id) -> Result<Auction, Error> {
        let auction = self.get(id)?;
        let auction = auction.lock().unwrap().clone();
        Ok(auction)
    }

    /// The unsettled auction selling `key`, if any.
    pub fn open_auction(&self, key: Key) -> Option<Id> {
        self.inner.lock().unwrap().open.get(&key).copied()
    }

    /// Frees the token of a settled auction for re-registration. Must be
    /// called while holding the auction's lock.
    pub fn release(&self, key: Key, id: Id) {
        let mut inner = self.inner.lock().unwrap();
        if inner.open.get(&key) == Some(&id) {
            inner.open.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
