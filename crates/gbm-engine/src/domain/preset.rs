//! Named bundles of auction parameters.

use {
    crate::domain::{Error, time::Timestamp},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fmt::{self, Display, Formatter},
        sync::RwLock,
    },
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timing and increment/incentive parameters applied to a batch of auctions.
///
/// `step_min`, `inc_min`, `inc_max` and `bid_multiplier` are fixed-point
/// values scaled by `bid_decimals`, e.g. with `bid_decimals = 100_000` a
/// `step_min` of `10_000` requires every bid to exceed the previous one by
/// 10%. `step_min` is also the absolute floor of the first bid.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Preset {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Length of the anti-sniping window in seconds.
    pub hammer_time_duration: u64,
    pub bid_decimals: u64,
    pub step_min: u64,
    pub inc_min: u64,
    pub inc_max: u64,
    pub bid_multiplier: u64,
}

impl Preset {
    pub fn validate(&self) -> Result<(), Invalid> {
        if self.start_time >= self.end_time {
            return Err(Invalid::Schedule);
        }
        if self.step_min == 0 {
            return Err(Invalid::ZeroStep);
        }
        if self.bid_decimals == 0 {
            return Err(Invalid::ZeroDecimals);
        }
        if self.inc_min > self.inc_max {
            return Err(Invalid::IncentiveBounds);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Invalid {
    #[error("start time must be before end time")]
    Schedule,
    #[error("minimum step cannot be 0")]
    ZeroStep,
    #[error("bid decimals cannot be 0")]
    ZeroDecimals,
    #[error("minimum incentive exceeds maximum incentive")]
    IncentiveBounds,
}

/// Stores presets by ID. Auctions copy the preset they were registered with,
/// so redefining a preset only affects auctions registered afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    presets: RwLock<HashMap<Id, Preset>>,
}

impl Registry {
    /// Validates and stores a preset, returning the one it replaced.
    pub fn set(&self, id: Id, preset: Preset) -> Result<Option<Preset>, Error> {
        preset.validate()?;
        Ok(self.presets.write().unwrap().insert(id, preset))
    }

    pub fn get(&self, id: Id) -> Result<Preset, Error> {
        self.presets
            .read()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or(Error::PresetNotFound(id))
    }

    /// All presets ordered by ID.
    pub fn all(&self) -> Vec<(Id, Preset)> {
        let mut presets: Vec<_> = self
            .presets
            .read()
            .unwrap()
            .iter()
            .map(|(id, preset)| (*id, *preset))
            .collect();
        presets.sort_by_key(|(id, _)| *id);
        presets
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use {super::*, rstest::rstest};

    /// The "medium" preset used for the realm auctions.
    pub fn medium() -> Preset {
        Preset {
            start_time: 1_000,
            end_time: 100_000,
            hammer_time_duration: 300,
            bid_decimals: 100_000,
            step_min: 10_000,
            inc_min: 1_000,
            inc_max: 10_000,
            bid_multiplier: 11_120,
        }
    }

    #[rstest]
    #[case::inverted_schedule(Preset { start_time: 10, end_time: 10, ..medium() }, Invalid::Schedule)]
    #[case::zero_step(Preset { step_min: 0, ..medium() }, Invalid::ZeroStep)]
    #[case::zero_decimals(Preset { bid_decimals: 0, ..medium() }, Invalid::ZeroDecimals)]
    #[case::incentive_bounds(Preset { inc_min: 20_000, ..medium() }, Invalid::IncentiveBounds)]
    fn rejects_invalid_presets(#[case] preset: Preset, #[case] expected: Invalid) {
        assert_eq!(preset.validate(), Err(expected));
        let registry = Registry::default();
        assert!(matches!(
            registry.set(Id(1), preset),
            Err(Error::InvalidPreset(err)) if err == expected
        ));
        assert!(matches!(registry.get(Id(1)), Err(Error::PresetNotFound(Id(1)))));
    }

    #[test]
    fn zero_incentives_are_valid() {
        let none = Preset {
            inc_min: 0,
            inc_max: 0,
            bid_multiplier: 0,
            ..medium()
        };
        assert_eq!(none.validate(), Ok(()));
    }

    #[test]
    fn overwrites_preset() {
        let registry = Registry::default();
        assert_eq!(registry.set(Id(111), medium()).unwrap(), None);

        let longer = Preset {
            end_time: 200_000,
            ..medium()
        };
        assert_eq!(registry.set(Id(111), longer).unwrap(), Some(medium()));
        assert_eq!(registry.get(Id(111)).unwrap(), longer);
        assert_eq!(registry.all(), vec![(Id(111), longer)]);
    }
}
