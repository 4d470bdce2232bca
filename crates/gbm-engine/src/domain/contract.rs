//! Token contracts whose tokens can be auctioned.

use {
    crate::domain::{Error, eth::Address},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fmt::{self, Display, Formatter},
        sync::RwLock,
    },
};

/// Identifier under which a token contract is registered with the engine.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Registered {
    pub address: Address,
    /// Contract-wide switch. Auctions can neither be registered nor bid on
    /// while this is off, but existing ones can still be claimed and
    /// cancelled.
    pub bidding_allowed: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
    contracts: RwLock<HashMap<Id, Registered>>,
}

impl Registry {
    /// Registers a token contract with bidding disabled. Registering the same
    /// address again is a no-op and returns `false`; a different address is
    /// rejected so that the token source of open auctions cannot be swapped.
    pub fn register(&self, id: Id, address: Address) -> Result<bool, Error> {
        let mut contracts = self.contracts.write().unwrap();
        match contracts.get(&id) {
            Some(existing) if existing.address == address => Ok(false),
            Some(existing) => Err(Error::ContractAlreadyRegistered {
                id,
                address: existing.address,
            }),
            None => {
                contracts.insert(
                    id,
                    Registered {
                        address,
                        bidding_allowed: false,
                    },
                );
                Ok(true)
            }
        }
    }

    pub fn set_bidding_allowed(&self, id: Id, allowed: bool) -> Result<(), Error> {
        self.contracts
            .write()
            .unwrap()
            .get_mut(&id)
            .map(|contract| contract.bidding_allowed = allowed)
            .ok_or(Error::ContractNotFound(id))
    }

    pub fn get(&self, id: Id) -> Result<Registered, Error> {
        self.contracts
            .read()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or(Error::ContractNotFound(id))
    }

    /// All contracts ordered by ID.
    pub fn all(&self) -> Vec<(Id, Registered)> {
        let mut contracts: Vec<_> = self
            .contracts
            .read()
            .unwrap()
            .iter()
            .map(|(id, contract)| (*id, *contract))
            .collect();
        contracts.sort_by_key(|(id, _)| *id);
        contracts
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address};

    const ERC1155: Address = address!("0x385Eeac5cB85A38A9a07A70c73e0a3271CfB54A7");
    const ERC721: Address = address!("0xa44c8e0eCAEFe668947154eE2b803Bd4e6310EFe");

    #[test]
    fn registration_is_idempotent() {
        let registry = Registry::default();
        assert!(registry.register(Id(1010), ERC1155).unwrap());
        assert!(!registry.register(Id(1010), ERC1155).unwrap());
        assert_eq!(
            registry.get(Id(1010)).unwrap(),
            Registered {
                address: ERC1155,
                bidding_allowed: false,
            }
        );
    }

    #[test]
    fn rejects_redirecting_a_contract() {
        let registry = Registry::default();
        registry.register(Id(1010), ERC1155).unwrap();
        assert!(matches!(
            registry.register(Id(1010), ERC721),
            Err(Error::ContractAlreadyRegistered { id: Id(1010), address }) if address == ERC1155
        ));
        assert_eq!(registry.get(Id(1010)).unwrap().address, ERC1155);
    }

    #[test]
    fn toggles_bidding() {
        let registry = Registry::default();
        assert!(matches!(
            registry.set_bidding_allowed(Id(1111), true),
            Err(Error::ContractNotFound(Id(1111)))
        ));

        registry.register(Id(1111), ERC721).unwrap();
        registry.set_bidding_allowed(Id(1111), true).unwrap();
        assert!(registry.get(Id(1111)).unwrap().bidding_allowed);
        registry.set_bidding_allowed(Id(1111), false).unwrap();
        assert!(!registry.get(Id(1111)).unwrap().bidding_allowed);
    }
}
