pub use alloy::primitives::{Address, B256, Bytes, U256};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// An ERC-721 token index or an ERC-1155 token type ID, depending on the
/// kind of the token contract.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TokenId(pub U256);

impl Display for TokenId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = <U256 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}
