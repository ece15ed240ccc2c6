//! Thermal growth coefficient (TGC) weight recurrence.
//!
//! Standard form: `W1 = (W0^(1/3) + TGC * T * d / 1000)^3`. The exponents
//! generalise it to `W1 = (W0^(n2/3) + TGC * T^n1 * d / 1000)^(3/n2)`, which
//! reduces to the cube-root form at `n1 = n2 = 1`.

use crate::ModelError;
use aqua_core::{validate_growth_model, GrowthModelConfig, ValidationError};

/// Validated TGC parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TgcModel {
    coefficient: f64,
    n1: f64,
    n2: f64,
}

impl TgcModel {
    /// Build a model from raw parameters. All must be finite and > 0.
    pub fn new(coefficient: f64, n1: f64, n2: f64) -> Result<Self, ModelError> {
        if !coefficient.is_finite() || coefficient <= 0.0 {
            return Err(ValidationError::NonPositiveCoefficient(coefficient).into());
        }
        for (name, value) in [("n1", n1), ("n2", n2)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::InvalidExponent { name, value }.into());
            }
        }
        Ok(Self {
            coefficient,
            n1,
            n2,
        })
    }

    pub fn from_config(config: &GrowthModelConfig) -> Result<Self, ModelError> {
        validate_growth_model(config)?;
        Self::new(config.tgc, config.n1, config.n2)
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Increment in transformed weight space for `days_elapsed` at `temperature_c`.
    /// Zero at or below 0 °C: growth never produces weight loss.
    pub fn increment(&self, temperature_c: f64, days_elapsed: f64) -> f64 {
        if temperature_c <= 0.0 || days_elapsed <= 0.0 {
            return 0.0;
        }
        self.coefficient * temperature_c.powf(self.n1) * days_elapsed / 1000.0
    }

    /// Weight after `days_elapsed` days at a constant temperature.
    pub fn next_weight(
        &self,
        current_weight_g: f64,
        temperature_c: f64,
        days_elapsed: f64,
    ) -> Result<f64, ModelError> {
        if !current_weight_g.is_finite() || current_weight_g <= 0.0 {
            return Err(ModelError::InvalidState(format!(
                "non-positive weight {current_weight_g} g"
            )));
        }
        if !temperature_c.is_finite() || !days_elapsed.is_finite() {
            return Err(ModelError::InvalidState(format!(
                "non-finite growth input: {temperature_c} °C over {days_elapsed} days"
            )));
        }
        let inc = self.increment(temperature_c, days_elapsed);
        if inc == 0.0 {
            return Ok(current_weight_g);
        }
        let b = self.n2 / 3.0;
        let next = (current_weight_g.powf(b) + inc).powf(1.0 / b);
        // Guard the pow round trip against sub-ulp loss.
        Ok(next.max(current_weight_g))
    }
}
