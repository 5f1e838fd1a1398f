//! Proportional duty-cycle regulation.
//!
//! Maps temperature error (+ optional external-temperature error and trend)
//! to a fractional duty cycle in [0, 1]. Heating and cooling share one code
//! path with the sign convention flipped consistently across the internal
//! error, the external error and the trend.
//!
//! The regulator also carries a learning side channel: the host reports the
//! duty that was actually applied (after safety overrides and cycle-timing
//! coercion) through [`DutyCycleRegulator::update_realized_power`], so an
//! external coefficient learner observes the true applied value rather than
//! the raw computation.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use tz_core::{HvacMode, Real, TemperatureSample, clamp_unit};

/// Anticipation (derivative lead-lag) post-processing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnticipationMode {
    /// No anticipation: the proportional output is used as-is.
    #[default]
    None,
    /// Subtract `anticipation_coef * trend` while the temperature is rising
    /// toward the target, to cut the demand before overshoot.
    Derivative,
}

/// Regulator configuration.
///
/// Coefficients may be overwritten between ticks by an external learning
/// feedback source via [`DutyCycleRegulator::set_config`]; each evaluation
/// snapshots the full config once before computing, so a concurrent update
/// never produces a torn read within one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatorConfig {
    /// Gain on the internal (room) temperature error.
    pub coef_internal: Real,
    /// Gain on the external (outdoor) temperature error.
    pub coef_external: Real,
    /// Optional upper clamp on the duty cycle, in (0, 1].
    pub max_duty: Option<Real>,
    /// Overshoot guard threshold while the temperature is falling.
    pub threshold_low: Real,
    /// Overshoot guard threshold while the temperature is rising.
    pub threshold_high: Real,
    /// Anticipation post-processing mode.
    pub anticipation: AnticipationMode,
    /// Gain on the trend term when anticipation is enabled.
    pub anticipation_coef: Real,
}

impl RegulatorConfig {
    /// Create a new regulator configuration.
    ///
    /// # Arguments
    ///
    /// * `coef_internal` - Gain on the room temperature error
    /// * `coef_external` - Gain on the outdoor temperature error
    ///
    /// # Errors
    ///
    /// Returns an error if either coefficient is negative or non-finite.
    pub fn new(coef_internal: Real, coef_external: Real) -> ControlResult<Self> {
        if !coef_internal.is_finite() || coef_internal < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "coef_internal must be finite and non-negative",
            });
        }
        if !coef_external.is_finite() || coef_external < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "coef_external must be finite and non-negative",
            });
        }
        Ok(Self {
            coef_internal,
            coef_external,
            max_duty: None,
            threshold_low: 0.0,
            threshold_high: 0.0,
            anticipation: AnticipationMode::None,
            anticipation_coef: 0.0,
        })
    }

    /// Set the upper duty clamp.
    ///
    /// # Errors
    ///
    /// Returns an error unless `max_duty` lies in (0, 1].
    pub fn with_max_duty(mut self, max_duty: Real) -> ControlResult<Self> {
        if !max_duty.is_finite() || max_duty <= 0.0 || max_duty > 1.0 {
            return Err(ControlError::InvalidArg {
                what: "max_duty must lie in (0, 1]",
            });
        }
        self.max_duty = Some(max_duty);
        Ok(self)
    }

    /// Set the overshoot guard thresholds. Both must be non-zero for the
    /// guard to engage.
    pub fn with_thresholds(mut self, low: Real, high: Real) -> ControlResult<Self> {
        if !low.is_finite() || low < 0.0 || !high.is_finite() || high < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "thresholds must be finite and non-negative",
            });
        }
        self.threshold_low = low;
        self.threshold_high = high;
        Ok(self)
    }

    /// Enable derivative anticipation with the given trend gain.
    pub fn with_anticipation(mut self, coef: Real) -> ControlResult<Self> {
        if !coef.is_finite() || coef < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "anticipation_coef must be finite and non-negative",
            });
        }
        self.anticipation = AnticipationMode::Derivative;
        self.anticipation_coef = coef;
        Ok(self)
    }
}

/// Result of one regulation evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DutyCycleResult {
    /// Computed duty before any external override.
    pub raw_percent: Real,
    /// Duty actually in effect, updated by the realized-power side channel.
    pub effective_percent: Real,
    /// Duty before anticipation post-processing, exposed for external
    /// learners.
    pub base_percent: Real,
}

/// Proportional duty-cycle regulator for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyCycleRegulator {
    config: RegulatorConfig,
    last: DutyCycleResult,
}

impl DutyCycleRegulator {
    /// Create a regulator from a validated configuration.
    pub fn new(config: RegulatorConfig) -> Self {
        Self {
            config,
            last: DutyCycleResult::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RegulatorConfig {
        &self.config
    }

    /// Replace the configuration between ticks (learning feedback).
    pub fn set_config(&mut self, config: RegulatorConfig) {
        self.config = config;
    }

    /// Result of the most recent evaluation.
    pub fn last_result(&self) -> DutyCycleResult {
        self.last
    }

    /// Record the externally observed effective duty.
    ///
    /// Side-channel write: `raw_percent` and `base_percent` are untouched.
    pub fn update_realized_power(&mut self, value: Real) {
        self.last.effective_percent = clamp_unit(value);
    }

    /// Compute the duty cycle for one evaluation tick.
    ///
    /// Any mode without a thermal demand (`Off`, `Sleep`, `FanOnly`) forces
    /// a zero duty unconditionally. A missing target or current temperature
    /// is a degraded input, not a fault: the duty defaults to zero and a
    /// warning is emitted.
    pub fn calculate(&mut self, sample: &TemperatureSample, mode: HvacMode) -> DutyCycleResult {
        // Snapshot: one read of the config per evaluation.
        let cfg = self.config.clone();

        // Off and Sleep force zero unconditionally; fan-only circulates air
        // without any thermal demand.
        if !mode.is_regulated() {
            self.last = DutyCycleResult::default();
            return self.last;
        }

        let (Some(target), Some(current)) = (sample.target, sample.current) else {
            tracing::warn!(
                ?mode,
                target = ?sample.target,
                current = ?sample.current,
                "temperature reading missing, regulation defaults to zero duty"
            );
            self.last = DutyCycleResult::default();
            return self.last;
        };

        let cooling = mode == HvacMode::Cool;

        // Signed so that positive error always means "more demand".
        let error = if cooling {
            current - target
        } else {
            target - current
        };
        let error_ext = sample
            .external
            .map(|ext| if cooling { ext - target } else { target - ext })
            .unwrap_or(0.0);
        let trend = sample
            .trend_per_hour
            .map(|t| if cooling { -t } else { t });

        let mut duty = clamp_unit(cfg.coef_internal * error + cfg.coef_external * error_ext);
        if let Some(max_duty) = cfg.max_duty {
            duty = duty.min(max_duty);
        }

        // Overshoot guard: kill the demand when the temperature has already
        // passed the target by more than the trend-direction threshold.
        if cfg.threshold_low != 0.0 && cfg.threshold_high != 0.0 {
            if let Some(trend) = trend {
                let overshoot = -error;
                if (trend > 0.0 && overshoot > cfg.threshold_high)
                    || (trend < 0.0 && overshoot > cfg.threshold_low)
                {
                    tracing::debug!(overshoot, trend, "overshoot guard engaged, duty forced to 0");
                    duty = 0.0;
                }
            }
        }

        let base = duty;
        if cfg.anticipation == AnticipationMode::Derivative {
            if let Some(trend) = trend {
                if trend > 0.0 && duty > 0.0 {
                    duty = (duty - cfg.anticipation_coef * trend).max(0.0);
                }
            }
        }

        self.last = DutyCycleResult {
            raw_percent: duty,
            effective_percent: duty,
            base_percent: base,
        };
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regulator(coef_internal: Real, coef_external: Real) -> DutyCycleRegulator {
        DutyCycleRegulator::new(RegulatorConfig::new(coef_internal, coef_external).unwrap())
    }

    fn sample(target: Real, current: Real) -> TemperatureSample {
        TemperatureSample {
            target: Some(target),
            current: Some(current),
            ..Default::default()
        }
    }

    #[test]
    fn zero_error_yields_zero_duty() {
        let mut reg = regulator(0.6, 0.01);
        let result = reg.calculate(&sample(20.0, 20.0), HvacMode::Heat);
        assert_eq!(result.effective_percent, 0.0);
        assert_eq!(result.raw_percent, 0.0);
    }

    #[test]
    fn full_demand_saturates_at_one() {
        let mut reg = regulator(0.6, 0.01);
        let s = TemperatureSample {
            target: Some(15.0),
            current: Some(10.0),
            external: Some(7.0),
            trend_per_hour: Some(0.0),
        };
        let result = reg.calculate(&s, HvacMode::Heat);
        assert_eq!(result.raw_percent, 1.0);
        assert_eq!(result.effective_percent, 1.0);
    }

    #[test]
    fn cooling_flips_the_error_sign() {
        let mut reg = regulator(0.2, 0.0);
        // Room above target: demand when cooling, none when heating.
        let s = sample(22.0, 24.0);
        assert!(reg.calculate(&s, HvacMode::Cool).raw_percent > 0.0);
        assert_eq!(reg.calculate(&s, HvacMode::Heat).raw_percent, 0.0);
    }

    #[test]
    fn max_duty_clamps_output() {
        let config = RegulatorConfig::new(0.6, 0.0)
            .unwrap()
            .with_max_duty(0.4)
            .unwrap();
        let mut reg = DutyCycleRegulator::new(config);
        let result = reg.calculate(&sample(25.0, 15.0), HvacMode::Heat);
        assert_eq!(result.raw_percent, 0.4);
    }

    #[test]
    fn off_and_sleep_force_zero() {
        let mut reg = regulator(0.6, 0.01);
        let s = sample(25.0, 10.0);
        assert_eq!(reg.calculate(&s, HvacMode::Off).raw_percent, 0.0);
        assert_eq!(reg.calculate(&s, HvacMode::Sleep).raw_percent, 0.0);
    }

    #[test]
    fn fan_only_carries_no_thermal_demand() {
        let mut reg = regulator(0.6, 0.01);
        assert_eq!(
            reg.calculate(&sample(25.0, 10.0), HvacMode::FanOnly).raw_percent,
            0.0
        );
    }

    #[test]
    fn missing_reading_is_degraded_not_fatal() {
        let mut reg = regulator(0.6, 0.01);
        let s = TemperatureSample {
            target: Some(20.0),
            ..Default::default()
        };
        let result = reg.calculate(&s, HvacMode::Heat);
        assert_eq!(result.effective_percent, 0.0);
    }

    #[test]
    fn overshoot_guard_kills_demand_on_rising_trend() {
        let config = RegulatorConfig::new(0.6, 0.3)
            .unwrap()
            .with_thresholds(0.2, 0.5)
            .unwrap();
        let mut reg = DutyCycleRegulator::new(config);
        // Room 0.8 degrees above target and still rising: external demand
        // would keep the duty positive without the guard.
        let s = TemperatureSample {
            target: Some(20.0),
            current: Some(20.8),
            external: Some(5.0),
            trend_per_hour: Some(0.4),
        };
        let result = reg.calculate(&s, HvacMode::Heat);
        assert_eq!(result.raw_percent, 0.0);
    }

    #[test]
    fn overshoot_guard_needs_both_thresholds() {
        let config = RegulatorConfig::new(0.6, 0.3)
            .unwrap()
            .with_thresholds(0.0, 0.5)
            .unwrap();
        let mut reg = DutyCycleRegulator::new(config);
        let s = TemperatureSample {
            target: Some(20.0),
            current: Some(20.8),
            external: Some(5.0),
            trend_per_hour: Some(0.4),
        };
        assert!(reg.calculate(&s, HvacMode::Heat).raw_percent > 0.0);
    }

    #[test]
    fn anticipation_subtracts_trend_and_keeps_base() {
        let config = RegulatorConfig::new(0.3, 0.0)
            .unwrap()
            .with_anticipation(0.5)
            .unwrap();
        let mut reg = DutyCycleRegulator::new(config);
        let s = TemperatureSample {
            target: Some(21.0),
            current: Some(20.0),
            trend_per_hour: Some(0.4),
            ..Default::default()
        };
        let result = reg.calculate(&s, HvacMode::Heat);
        assert!((result.base_percent - 0.3).abs() < 1e-12);
        assert!((result.raw_percent - 0.1).abs() < 1e-12);
    }

    #[test]
    fn anticipation_floors_at_zero() {
        let config = RegulatorConfig::new(0.1, 0.0)
            .unwrap()
            .with_anticipation(2.0)
            .unwrap();
        let mut reg = DutyCycleRegulator::new(config);
        let s = TemperatureSample {
            target: Some(21.0),
            current: Some(20.5),
            trend_per_hour: Some(1.0),
            ..Default::default()
        };
        let result = reg.calculate(&s, HvacMode::Heat);
        assert_eq!(result.raw_percent, 0.0);
        assert!(result.base_percent > 0.0);
    }

    #[test]
    fn realized_power_overwrites_effective_only() {
        let mut reg = regulator(0.6, 0.01);
        let before = reg.calculate(&sample(22.0, 20.0), HvacMode::Heat);
        reg.update_realized_power(0.25);
        let after = reg.last_result();
        assert_eq!(after.effective_percent, 0.25);
        assert_eq!(after.raw_percent, before.raw_percent);
        assert_eq!(after.base_percent, before.base_percent);
    }

    #[test]
    fn config_swap_applies_next_tick() {
        let mut reg = regulator(0.1, 0.0);
        let s = sample(22.0, 20.0);
        let before = reg.calculate(&s, HvacMode::Heat);
        reg.set_config(RegulatorConfig::new(0.4, 0.0).unwrap());
        let after = reg.calculate(&s, HvacMode::Heat);
        assert!(after.raw_percent > before.raw_percent);
    }

    #[test]
    fn invalid_config_params() {
        assert!(RegulatorConfig::new(-0.1, 0.0).is_err());
        assert!(RegulatorConfig::new(0.1, Real::NAN).is_err());
        assert!(
            RegulatorConfig::new(0.1, 0.0)
                .unwrap()
                .with_max_duty(0.0)
                .is_err()
        );
        assert!(
            RegulatorConfig::new(0.1, 0.0)
                .unwrap()
                .with_max_duty(1.5)
                .is_err()
        );
        assert!(
            RegulatorConfig::new(0.1, 0.0)
                .unwrap()
                .with_thresholds(-0.1, 0.5)
                .is_err()
        );
        assert!(
            RegulatorConfig::new(0.1, 0.0)
                .unwrap()
                .with_anticipation(-1.0)
                .is_err()
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn duty_stays_in_unit_interval(
            target in -10.0_f64..40.0,
            current in -10.0_f64..40.0,
            external in -20.0_f64..40.0,
            trend in -2.0_f64..2.0,
            coef_int in 0.0_f64..2.0,
            coef_ext in 0.0_f64..1.0,
        ) {
            let mut reg = DutyCycleRegulator::new(
                RegulatorConfig::new(coef_int, coef_ext).unwrap(),
            );
            let s = TemperatureSample {
                target: Some(target),
                current: Some(current),
                external: Some(external),
                trend_per_hour: Some(trend),
            };
            for mode in [HvacMode::Heat, HvacMode::Cool] {
                let result = reg.calculate(&s, mode);
                prop_assert!((0.0..=1.0).contains(&result.raw_percent));
                prop_assert!((0.0..=1.0).contains(&result.base_percent));
            }
        }
    }
}
