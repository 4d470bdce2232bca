//! In-process ledger used by the simulator and the tests.

use {
    crate::domain::{
        eth::{Address, TokenId, U256},
        ledger::{self, Ledger},
    },
    std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
    },
};

#[derive(Debug, Default)]
struct State {
    balances: HashMap<Address, U256>,
    escrow: U256,
    /// Keyed by token contract, token ID and holder.
    tokens: HashMap<(Address, TokenId, Address), U256>,
    /// Keyed by token contract, owner and operator.
    approvals: HashSet<(Address, Address, Address)>,
}

/// Keeps currency balances, the escrow pool and token holdings in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    pub fn deposit(&self, account: Address, amount: U256) {
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Adds funds to escrow that are not owed to anyone, which is what
    /// incentives are paid from.
    pub fn fund_escrow(&self, amount: U256) {
        let mut state = self.state.lock().unwrap();
        state.escrow = state.escrow.saturating_add(amount);
    }

    pub fn escrow_balance(&self) -> U256 {
        self.state.lock().unwrap().escrow
    }

    pub fn mint_token(&self, contract: Address, token: TokenId, account: Address, amount: U256) {
        let mut state = self.state.lock().unwrap();
        let held = state.tokens.entry((contract, token, account)).or_default();
        *held = held.saturating_add(amount);
    }

    pub fn set_approval_for_all(
        &self,
        contract: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    ) {
        let mut state = self.state.lock().unwrap();
        if approved {
            state.approvals.insert((contract, owner, operator));
        } else {
            state.approvals.remove(&(contract, owner, operator));
        }
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    fn debit(&self, account: Address, amount: U256) -> Result<(), ledger::Error> {
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(account).or_default();
        if *balance < amount {
            return Err(ledger::Error::InsufficientBalance {
                account,
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        state.escrow = state.escrow.saturating_add(amount);
        tracing::trace!(%account, %amount, "debited");
        Ok(())
    }

    fn credit(&self, account: Address, amount: U256) -> Result<(), ledger::Error> {
        let mut state = self.state.lock().unwrap();
        if state.escrow < amount {
            return Err(ledger::Error::InsufficientEscrow {
                required: amount,
                available: state.escrow,
            });
        }
        state.escrow -= amount;
        let balance = state.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
        tracing::trace!(%account, %amount, "credited");
        Ok(())
    }

    fn token_balance_of(&self, contract: Address, token: TokenId, account: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .tokens
            .get(&(contract, token, account))
            .copied()
            .unwrap_or_default()
    }

    fn transfer_token(
        &self,
        contract: Address,
        token: TokenId,
        amount: U256,
        from: Address,
        to: Address,
    ) -> Result<(), ledger::Error> {
        let mut state = self.state.lock().unwrap();
        let held = state.tokens.entry((contract, token, from)).or_default();
        if *held < amount {
            return Err(ledger::Error::InsufficientTokens {
                contract,
                token,
                account: from,
                required: amount,
                available: *held,
            });
        }
        *held -= amount;
        let received = state.tokens.entry((contract, token, to)).or_default();
        *received = received.saturating_add(amount);
        tracing::trace!(%contract, %token, %amount, %from, %to, "transferred token");
        Ok(())
    }

    fn is_approved_for_all(&self, contract: Address, owner: Address, operator: Address) -> bool {
        self.state
            .lock()
            .unwrap()
            .approvals
            .contains(&(contract, owner, operator))
    }
}
