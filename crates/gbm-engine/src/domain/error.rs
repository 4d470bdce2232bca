use {
    crate::domain::{
        auction,
        contract,
        eth::{Address, TokenId, U256},
        ledger,
        preset,
        signature,
    },
    thiserror::Error,
};

/// Every way an engine operation can be rejected. A rejected operation never
/// leaves partial state behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error("auction preset {0} not found")]
    PresetNotFound(preset::Id),
    #[error("token contract {0} not found")]
    ContractNotFound(contract::Id),
    #[error("auction {0} not found")]
    AuctionNotFound(auction::Id),

    #[error("{caller} is not the registry admin")]
    NotAdmin { caller: Address },
    #[error("{caller} is not the owner of auction {auction}")]
    NotAuctionOwner {
        auction: auction::Id,
        caller: Address,
    },
    #[error("{caller} is not the winner of auction {auction}")]
    NotWinner {
        auction: auction::Id,
        caller: Address,
    },

    #[error("invalid auction preset: {0}")]
    InvalidPreset(#[from] preset::Invalid),
    #[error(transparent)]
    InvalidPublicKey(#[from] signature::InvalidPublicKey),
    #[error("invalid token amount {amount} for {kind} token")]
    InvalidTokenAmount {
        kind: auction::TokenKind,
        amount: U256,
    },
    #[error("bid signature is not authorized by the trusted signer")]
    SignatureInvalid,
    #[error("highest bid is {current} but the bid was made against {submitted}")]
    StaleHighestBid { current: U256, submitted: U256 },
    #[error("bid of {submitted} is below the minimum bid of {minimum}")]
    BidTooLow { minimum: U256, submitted: U256 },
    #[error("bid amount cannot be 0")]
    BidAmountZero,
    #[error("{owner} does not hold {amount} of token {token} of contract {contract}")]
    TokenNotOwned {
        contract: contract::Id,
        token: TokenId,
        owner: Address,
        amount: U256,
    },
    #[error("{owner} has not approved the engine to transfer tokens of contract {contract}")]
    TokenNotApproved {
        contract: contract::Id,
        owner: Address,
    },

    #[error("an auction already exists for token {token} of contract {contract}: {existing}")]
    DuplicateAuction {
        contract: contract::Id,
        token: TokenId,
        existing: auction::Id,
    },
    #[error("token contract {id} is already registered at {address}")]
    ContractAlreadyRegistered { id: contract::Id, address: Address },
    #[error("bidding is disabled for token contract {0}")]
    ContractBiddingDisabled(contract::Id),
    #[error("auction {0} has already been claimed")]
    AlreadyClaimed(auction::Id),
    #[error("auction {0} has already been cancelled")]
    AlreadyCancelled(auction::Id),
    #[error("auction {0} has not started yet")]
    AuctionNotStarted(auction::Id),
    #[error("auction {0} has ended")]
    AuctionEnded(auction::Id),
    #[error("auction {0} has not ended yet")]
    AuctionNotEnded(auction::Id),
    #[error("auction {0} has no bids")]
    NoWinner(auction::Id),
    #[error("auction {0} has bids and is outside of its cancellation window")]
    CancellationNotAllowed(auction::Id),

    #[error("ledger failure: {0}")]
    Ledger(#[from] ledger::Error),
}

/// Coarse classification of [`Error`]s for callers that only care about the
/// category of a failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    NotFound,
    PermissionDenied,
    ValidationFailure,
    StateConflict,
    ExternalFailure,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::NotFound => "not_found",
            Kind::PermissionDenied => "permission_denied",
            Kind::ValidationFailure => "validation_failure",
            Kind::StateConflict => "state_conflict",
            Kind::ExternalFailure => "external_failure",
        }
    }
}

impl Error {
    pub fn kind(&self) -> Kind {
        match self {
            Error::PresetNotFound(_) | Error::ContractNotFound(_) | Error::AuctionNotFound(_) => {
                Kind::NotFound
            }
            Error::NotAdmin { .. } | Error::NotAuctionOwner { .. } | Error::NotWinner { .. } => {
                Kind::PermissionDenied
            }
            Error::InvalidPreset(_)
            | Error::InvalidPublicKey(_)
            | Error::InvalidTokenAmount { .. }
            | Error::SignatureInvalid
            | Error::StaleHighestBid { .. }
            | Error::BidTooLow { .. }
            | Error::BidAmountZero
            | Error::TokenNotOwned { .. }
            | Error::TokenNotApproved { .. } => Kind::ValidationFailure,
            Error::DuplicateAuction { .. }
            | Error::ContractAlreadyRegistered { .. }
            | Error::ContractBiddingDisabled(_)
            | Error::AlreadyClaimed(_)
            | Error::AlreadyCancelled(_)
            | Error::AuctionNotStarted(_)
            | Error::AuctionEnded(_)
            | Error::AuctionNotEnded(_)
            | Error::NoWinner(_)
            | Error::CancellationNotAllowed(_) => Kind::StateConflict,
            Error::Ledger(_) => Kind::ExternalFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let auction = auction::Id(7);
        assert_eq!(Error::AuctionNotFound(auction).kind(), Kind::NotFound);
        assert_eq!(
            Error::NotAuctionOwner {
                auction,
                caller: Address::ZERO
            }
            .kind(),
            Kind::PermissionDenied
        );
        assert_eq!(
            Error::StaleHighestBid {
                current: U256::from(1),
                submitted: U256::ZERO,
            }
            .kind(),
            Kind::ValidationFailure
        );
        assert_eq!(Error::AlreadyClaimed(auction).kind(), Kind::StateConflict);
        assert_eq!(
            Error::Ledger(ledger::Error::Unavailable("down".into())).kind(),
            Kind::ExternalFailure
        );
    }

    #[test]
    fn already_claimed_message() {
        assert_eq!(
            Error::AlreadyClaimed(auction::Id(3)).to_string(),
            "auction 3 has already been claimed"
        );
    }
}
