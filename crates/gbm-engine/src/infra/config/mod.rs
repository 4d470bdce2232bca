use {
    crate::domain::{
        contract,
        engine,
        eth::{Address, B256, TokenId, U256},
        preset::{self, Preset},
        time::Timestamp,
    },
    std::fmt::Debug,
};

pub mod file;

/// Everything needed to stand up an engine over an in-memory ledger.
#[derive(Clone, Debug)]
pub struct Config {
    pub engine: engine::Config,
    /// Unix time the simulation clock starts at.
    pub start_time: Timestamp,
    /// Private key used to sign bids that come without a signature.
    pub signer_key: Option<B256>,
    pub presets: Vec<(preset::Id, Preset)>,
    pub contracts: Vec<Contract>,
    pub ledger: Ledger,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Contract {
    pub id: contract::Id,
    pub address: Address,
    pub bidding_allowed: bool,
}

/// Initial state of the in-memory ledger.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ledger {
    pub escrow: U256,
    pub balances: Vec<(Address, U256)>,
    pub tokens: Vec<Holding>,
    /// Owners that approved the operator for a token contract.
    pub approvals: Vec<(Address, Address)>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Holding {
    pub contract: Address,
    pub token: TokenId,
    pub owner: Address,
    pub amount: U256,
}

/// Unwraps result or logs a `TOML` parsing error.
fn unwrap_or_log<T, E, P>(result: Result<T, E>, path: &P) -> T
where
    E: Debug,
    P: Debug,
{
    result.unwrap_or_else(|err| {
        if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") {
            panic!("invalid engine config at {path:?}: {err:#?}")
        } else {
            panic!(
                "invalid engine config at {path:?}. Set TOML_TRACE_ERROR=1 to print the error \
                 but note that it may contain the signer key."
            )
        }
    })
}
