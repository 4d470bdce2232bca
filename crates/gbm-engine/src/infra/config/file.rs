use {
    crate::{
        domain::{
            contract,
            engine,
            eth::{Address, B256, Bytes, TokenId, U256},
            preset,
            signature::TrustedSigner,
            time::Timestamp,
        },
        infra::config::unwrap_or_log,
    },
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::{path::Path, time::Duration},
    tokio::fs,
};

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// Account allowed to administer presets, contracts and the trusted
    /// signer.
    admin: Address,

    /// The engine's ledger account holding auctioned tokens.
    operator: Address,

    /// Address of the signer authorizing bids.
    trusted_signer: Option<Address>,

    /// Uncompressed secp256k1 public key of the signer authorizing bids. Used
    /// **instead** of `trusted-signer`.
    trusted_signer_public_key: Option<Bytes>,

    /// How long after an auction ends the owner can still cancel it.
    #[serde(with = "humantime_serde", default = "default_grace_period")]
    grace_period: Duration,

    /// Unix time the simulation clock starts at.
    #[serde(default)]
    start_time: Timestamp,

    /// Private key signing bids that are submitted without a signature.
    signer_key: Option<B256>,

    #[serde(default)]
    presets: Vec<Preset>,

    #[serde(default)]
    contracts: Vec<Contract>,

    #[serde(default)]
    ledger: Ledger,
}

fn default_grace_period() -> Duration {
    Duration::from_secs(60 * 60)
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Preset {
    id: preset::Id,
    start_time: Timestamp,
    end_time: Timestamp,
    hammer_time_duration: u64,
    bid_decimals: u64,
    step_min: u64,
    inc_min: u64,
    inc_max: u64,
    bid_multiplier: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Contract {
    id: contract::Id,
    address: Address,
    #[serde(default)]
    bidding_allowed: bool,
}

#[serde_as]
#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Ledger {
    /// Funds in escrow that incentives are paid from.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    escrow: U256,
    #[serde(default)]
    balances: Vec<Balance>,
    #[serde(default)]
    tokens: Vec<Holding>,
    #[serde(default)]
    approvals: Vec<Approval>,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Balance {
    account: Address,
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Holding {
    contract: Address,
    #[serde_as(as = "DisplayFromStr")]
    token: TokenId,
    owner: Address,
    #[serde_as(as = "DisplayFromStr")]
    amount: U256,
}

/// An owner approving the operator for all tokens of a contract.
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Approval {
    contract: Address,
    owner: Address,
}

/// Load the engine configuration from a TOML file.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(path: &Path) -> super::Config {
    let data = fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));
    let config = unwrap_or_log(toml::de::from_str::<Config>(&data), &path);

    let trusted_signer = match (config.trusted_signer, config.trusted_signer_public_key) {
        (Some(address), None) => Some(TrustedSigner::from_address(address)),
        (None, Some(key)) => Some(unwrap_or_log(TrustedSigner::from_public_key(&key), &path)),
        (None, None) => None,
        (Some(_), Some(_)) => panic!(
            "invalid configuration: cannot specify both `trusted-signer` and \
             `trusted-signer-public-key` configuration options",
        ),
    };

    super::Config {
        engine: engine::Config {
            admin: config.admin,
            operator: config.operator,
            trusted_signer,
            grace_period: config.grace_period,
        },
        start_time: config.start_time,
        signer_key: config.signer_key,
        presets: config
            .presets
            .into_iter()
            .map(|preset| {
                (
                    preset.id,
                    preset::Preset {
                        start_time: preset.start_time,
                        end_time: preset.end_time,
                        hammer_time_duration: preset.hammer_time_duration,
                        bid_decimals: preset.bid_decimals,
                        step_min: preset.step_min,
                        inc_min: preset.inc_min,
                        inc_max: preset.inc_max,
                        bid_multiplier: preset.bid_multiplier,
                    },
                )
            })
            .collect(),
        contracts: config
            .contracts
            .into_iter()
            .map(|contract| super::Contract {
                id: contract.id,
                address: contract.address,
                bidding_allowed: contract.bidding_allowed,
            })
            .collect(),
        ledger: super::Ledger {
            escrow: config.ledger.escrow,
            balances: config
                .ledger
                .balances
                .into_iter()
                .map(|balance| (balance.account, balance.amount))
                .collect(),
            tokens: config
                .ledger
                .tokens
                .into_iter()
                .map(|holding| super::Holding {
                    contract: holding.contract,
                    token: holding.token,
                    owner: holding.owner,
                    amount: holding.amount,
                })
                .collect(),
            approvals: config
                .ledger
                .approvals
                .into_iter()
                .map(|approval| (approval.contract, approval.owner))
                .collect(),
        },
    }
}
