pub mod auction;
pub mod contract;
pub mod engine;
pub mod error;
pub mod eth;
pub mod event;
pub mod incentive;
pub mod ledger;
pub mod preset;
pub mod signature;
pub mod time;

pub use {
    engine::Engine,
    error::{Error, Kind},
};
