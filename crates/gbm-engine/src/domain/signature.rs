//! Verification of bid authorizations issued by the trusted off-engine
//! signer.

use {
    crate::domain::{
        auction,
        eth::{Address, B256, U256},
    },
    alloy::primitives::{Signature, eip191_hash_message, keccak256},
    arc_swap::ArcSwapOption,
    std::sync::Arc,
};

/// Version of the bid message encoding.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Version {
    /// `bidder (20 bytes) || auction ID || bid amount || highest bid` with
    /// each integer as a 32 byte big-endian word, hashed with keccak256 and
    /// signed as an EIP-191 `personal_sign` message.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    #[default]
    V1,
}

/// The exact tuple a bid signature authorizes. Signing the previous highest
/// bid ties the signature to one state of the auction so it cannot be
/// replayed later.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BidMessage {
    pub bidder: Address,
    pub auction: auction::Id,
    pub bid_amount: U256,
    pub highest_bid: U256,
}

impl BidMessage {
    pub const ENCODED_LEN: usize = 20 + 3 * 32;

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buffer = [0u8; Self::ENCODED_LEN];
        buffer[..20].copy_from_slice(self.bidder.as_slice());
        buffer[20..52].copy_from_slice(&U256::from(self.auction.0).to_be_bytes::<32>());
        buffer[52..84].copy_from_slice(&self.bid_amount.to_be_bytes::<32>());
        buffer[84..].copy_from_slice(&self.highest_bid.to_be_bytes::<32>());
        buffer
    }

    /// The message hash the signer signs.
    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }

    /// The digest the signature is recovered from for the given encoding
    /// version.
    pub fn signing_hash(&self, version: Version) -> B256 {
        match version {
            Version::V1 => eip191_hash_message(self.hash()),
        }
    }
}

/// The account whose signatures authorize bids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrustedSigner(Address);

impl TrustedSigner {
    pub fn from_address(address: Address) -> Self {
        Self(address)
    }

    /// Derives the signer from an uncompressed secp256k1 public key, either
    /// the raw 64 byte `x || y` form or the 65 byte SEC1 form with a leading
    /// `0x04`.
    pub fn from_public_key(key: &[u8]) -> Result<Self, InvalidPublicKey> {
        let raw = match key {
            [0x04, raw @ ..] if raw.len() == 64 => raw,
            raw if raw.len() == 64 => raw,
            _ => return Err(InvalidPublicKey(key.len())),
        };
        Ok(Self(Address::from_raw_public_key(raw)))
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("expected a 64 or 65 byte uncompressed public key but got {0} bytes")]
pub struct InvalidPublicKey(pub usize);

/// Holds the currently trusted signer. Replacing it takes effect for the very
/// next verification.
#[derive(Debug, Default)]
pub struct Verifier {
    signer: ArcSwapOption<TrustedSigner>,
    version: Version,
}

impl Verifier {
    pub fn new(signer: Option<TrustedSigner>) -> Self {
        Self {
            signer: ArcSwapOption::new(signer.map(Arc::new)),
            version: Version::default(),
        }
    }

    pub fn set(&self, signer: TrustedSigner) {
        self.signer.store(Some(Arc::new(signer)));
    }

    pub fn get(&self) -> Option<TrustedSigner> {
        self.signer.load().as_deref().copied()
    }

    /// Returns whether `signature` is a valid authorization of `message` by
    /// the trusted signer. Malformed signatures and a missing signer are
    /// treated as invalid.
    pub fn verify(&self, message: &BidMessage, signature: &[u8]) -> bool {
        let Some(signer) = self.get() else {
            tracing::warn!("no trusted signer configured");
            return false;
        };
        let Ok(signature) = Signature::try_from(signature) else {
            tracing::debug!(len = signature.len(), "malformed bid signature");
            return false;
        };
        match signature.recover_address_from_prehash(&message.signing_hash(self.version)) {
            Ok(recovered) => recovered == signer.address(),
            Err(err) => {
                tracing::debug!(?err, "failed to recover bid signer");
                false
            }
        }
    }
}
