//! Boundary to the external ledger that custodies funds and tokens.
//!
//! The engine never moves value itself. Bid amounts are debited into the
//! ledger's escrow and paid out of it with credits; auctioned tokens are
//! locked by transferring them to the engine's operator account.

use crate::domain::eth::{Address, TokenId, U256};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{account} has a balance of {available} but {required} is required")]
    InsufficientBalance {
        account: Address,
        required: U256,
        available: U256,
    },
    #[error("escrow holds {available} but {required} is required")]
    InsufficientEscrow { required: U256, available: U256 },
    #[error("{account} holds {available} of token {token} of {contract} but {required} is required")]
    InsufficientTokens {
        contract: Address,
        token: TokenId,
        account: Address,
        required: U256,
        available: U256,
    },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Operations the engine needs from the ledger. Every call is atomic and
/// synchronous from the engine's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait Ledger: Send + Sync {
    /// Spendable currency balance of `account`.
    fn balance_of(&self, account: Address) -> U256;

    /// Moves `amount` from `account` into escrow.
    fn debit(&self, account: Address, amount: U256) -> Result<(), Error>;

    /// Pays `amount` out of escrow to `account`.
    fn credit(&self, account: Address, amount: U256) -> Result<(), Error>;

    /// How many of `token` of the token contract `contract` `account` holds.
    fn token_balance_of(&self, contract: Address, token: TokenId, account: Address) -> U256;

    fn transfer_token(
        &self,
        contract: Address,
        token: TokenId,
        amount: U256,
        from: Address,
        to: Address,
    ) -> Result<(), Error>;

    /// Whether `operator` may move all tokens of `contract` held by `owner`.
    fn is_approved_for_all(&self, contract: Address, owner: Address, operator: Address) -> bool;
}

#[derive(Clone, Copy, Debug)]
enum Effect {
    Debit {
        account: Address,
        amount: U256,
    },
    Credit {
        account: Address,
        amount: U256,
    },
    Token {
        contract: Address,
        token: TokenId,
        amount: U256,
        from: Address,
        to: Address,
    },
}

/// Groups ledger calls into one all-or-nothing unit.
///
/// Effects are applied immediately. Unless [`Journal::commit`] is called,
/// dropping the journal reverts every applied effect in reverse order, so an
/// operation that fails halfway leaves the ledger as it found it.
pub struct Journal<'a> {
    ledger: &'a dyn Ledger,
    applied: Vec<Effect>,
    committed: bool,
}

impl<'a> Journal<'a> {
    pub fn new(ledger: &'a dyn Ledger) -> Self {
        Self {
            ledger,
            applied: Vec::new(),
            committed: false,
        }
    }

    pub fn debit(&mut self, account: Address, amount: U256) -> Result<(), Error> {
        self.apply(Effect::Debit { account, amount })
    }

    pub fn credit(&mut self, account: Address, amount: U256) -> Result<(), Error> {
        self.apply(Effect::Credit { account, amount })
    }

    pub fn transfer_token(
        &mut self,
        contract: Address,
        token: TokenId,
        amount: U256,
        from: Address,
        to: Address,
    ) -> Result<(), Error> {
        self.apply(Effect::Token {
            contract,
            token,
            amount,
            from,
            to,
        })
    }

    /// Keeps all applied effects.
    pub fn commit(mut self) {
        self.committed = true;
    }

    fn apply(&mut self, effect: Effect) -> Result<(), Error> {
        // Zero amounts are no-ops and are not worth a round trip.
        let amount = match effect {
            Effect::Debit { amount, .. }
            | Effect::Credit { amount, .. }
            | Effect::Token { amount, .. } => amount,
        };
        if amount.is_zero() {
            return Ok(());
        }
        execute(self.ledger, effect)?;
        self.applied.push(effect);
        Ok(())
    }
}

impl Drop for Journal<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some(effect) = self.applied.pop() {
            let inverse = match effect {
                Effect::Debit { account, amount } => Effect::Credit { account, amount },
                Effect::Credit { account, amount } => Effect::Debit { account, amount },
                Effect::Token {
                    contract,
                    token,
                    amount,
                    from,
                    to,
                } => Effect::Token {
                    contract,
                    token,
                    amount,
                    from: to,
                    to: from,
                },
            };
            if let Err(err) = execute(self.ledger, inverse) {
                tracing::error!(?err, ?effect, "failed to revert ledger effect");
            }
        }
    }
}

fn execute(ledger: &dyn Ledger, effect: Effect) -> Result<(), Error> {
    match effect {
        Effect::Debit { account, amount } => ledger.debit(account, amount),
        Effect::Credit { account, amount } => ledger.credit(account, amount),
        Effect::Token {
            contract,
            token,
            amount,
            from,
            to,
        } => ledger.transfer_token(contract, token, amount, from, to),
    }
}
