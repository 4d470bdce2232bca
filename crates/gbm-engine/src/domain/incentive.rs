//! Minimum bid and incentive arithmetic.
//!
//! All computations use 256-bit integers so results are reproducible
//! bit-for-bit. Rates are fixed-point values scaled by the preset's
//! `bid_decimals`.

use crate::domain::{eth::U256, preset::Preset};

/// The smallest bid that may displace `highest_bid`.
///
/// The first bid must be at least `step_min`. Every later bid must exceed
/// the current one by the `step_min / bid_decimals` rate, rounded up.
pub fn minimum_bid(preset: &Preset, highest_bid: U256) -> U256 {
    if highest_bid.is_zero() {
        return U256::from(preset.step_min);
    }
    let decimals = U256::from(preset.bid_decimals);
    let scaled = highest_bid.saturating_mul(decimals + U256::from(preset.step_min));
    let (quotient, remainder) = scaled.div_rem(decimals);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::from(1)
    }
}

/// How much a bid has to exceed `highest_bid` by.
pub fn minimum_increment(preset: &Preset, highest_bid: U256) -> U256 {
    minimum_bid(preset, highest_bid).saturating_sub(highest_bid)
}

/// The incentive owed to the bidder of `new_bid` once they get outbid.
///
/// The incentive rate starts at `inc_min` for a bid of exactly the minimum
/// bid and grows by `bid_multiplier` times the relative excess over it,
/// capped at `inc_max`. The rate is applied to the new bid:
///
/// ```text
/// base   = minimum_bid(previous_bid)
/// rate   = min(decimals * multiplier * (new_bid - base) / base + inc_min * decimals,
///              inc_max * decimals)
/// reward = new_bid * rate / decimals^2
/// ```
///
/// An opening bid is measured against `step_min`, so anything well above the
/// first bid floor earns the capped rate.
pub fn due_incentive(preset: &Preset, previous_bid: U256, new_bid: U256) -> U256 {
    if new_bid <= previous_bid {
        return U256::ZERO;
    }
    let decimals = U256::from(preset.bid_decimals);
    // `base` is positive since `step_min` and `bid_decimals` are.
    let base = minimum_bid(preset, previous_bid);
    let excess = new_bid.saturating_sub(base);

    let growth = decimals
        .saturating_mul(U256::from(preset.bid_multiplier))
        .saturating_mul(excess)
        / base;
    let rate = growth
        .saturating_add(U256::from(preset.inc_min) * decimals)
        .min(U256::from(preset.inc_max) * decimals);

    new_bid.saturating_mul(rate) / (decimals * decimals)
}
