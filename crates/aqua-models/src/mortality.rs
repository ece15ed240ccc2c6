//! Daily or weekly population attrition.

use crate::ModelError;
use aqua_core::{validate_mortality_model, MortalityFrequency, MortalityModelConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MortalityModel {
    rate: f64,
    frequency: MortalityFrequency,
}

impl MortalityModel {
    pub fn from_config(config: &MortalityModelConfig) -> Result<Self, ModelError> {
        validate_mortality_model(config)?;
        Ok(Self {
            rate: config.rate,
            frequency: config.frequency,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Apply mortality for one day. Returns `(new_population, deaths)`.
    ///
    /// Deaths are `floor(population * rate)` on application days and never
    /// exceed the population.
    pub fn apply(&self, population: u64, day_index: u32) -> (u64, u64) {
        if population == 0 || !self.frequency.applies_on(day_index) {
            return (population, 0);
        }
        let deaths = ((population as f64) * self.rate).floor();
        let deaths = if deaths <= 0.0 {
            0
        } else {
            (deaths as u64).min(population)
        };
        (population - deaths, deaths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn model(rate: f64, frequency: MortalityFrequency) -> MortalityModel {
        MortalityModel::from_config(&MortalityModelConfig {
            name: "m".to_string(),
            rate,
            frequency,
        })
        .unwrap()
    }

    #[test]
    fn daily_deaths_are_floored() {
        let m = model(0.0005, MortalityFrequency::Daily);
        assert_eq!(m.apply(10_000, 0), (9_995, 5));
        assert_eq!(m.apply(9_995, 1), (9_991, 4));
        assert_eq!(m.apply(1_999, 2), (1_999, 0));
    }

    #[test]
    fn weekly_applies_every_seventh_day() {
        let m = model(0.01, MortalityFrequency::Weekly);
        assert_eq!(m.apply(1_000, 0), (990, 10));
        for day in 1..7 {
            assert_eq!(m.apply(1_000, day), (1_000, 0));
        }
        assert_eq!(m.apply(1_000, 7), (990, 10));
    }

    #[test]
    fn empty_population_stays_empty() {
        let m = model(0.5, MortalityFrequency::Daily);
        assert_eq!(m.apply(0, 3), (0, 0));
        assert_eq!(m.apply(1, 3), (1, 0));
    }

    #[test]
    fn rate_of_one_is_rejected() {
        assert!(MortalityModel::from_config(&MortalityModelConfig {
            name: "m".to_string(),
            rate: 1.0,
            frequency: MortalityFrequency::Daily,
        })
        .is_err());
    }

    proptest! {
        #[test]
        fn population_never_goes_negative(pop in 0u64..10_000_000, rate in 0.0f64..0.999, day in 0u32..365) {
            let m = model(rate, MortalityFrequency::Daily);
            let (next, deaths) = m.apply(pop, day);
            prop_assert!(deaths <= pop);
            prop_assert_eq!(next + deaths, pop);
        }
    }
}
