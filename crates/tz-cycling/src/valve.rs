//! Duty cycle to valve degree mapping.
//!
//! Proportional valves don't get temporal scheduling: the duty cycle is
//! translated directly into an opening degree, with a switch-on threshold
//! below which the valve rests at its configured closed position.

use crate::error::{CycleError, CycleResult};
use serde::{Deserialize, Serialize};
use tz_core::Real;

/// Physical opening profile of a proportional valve, degrees in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveProfile {
    /// Opening degree applied right at the switch-on threshold.
    pub min_opening_degree: u8,
    /// Opening degree at 100% duty.
    pub max_opening_degree: u8,
    /// Resting closing degree: below the threshold the valve opens to
    /// `100 - max_closing_degree`, not necessarily fully closed.
    pub max_closing_degree: u8,
    /// Duty percentage the demand must exceed before the valve opens.
    pub opening_threshold: u8,
}

impl ValveProfile {
    /// Create a valve profile.
    ///
    /// # Errors
    ///
    /// Returns an error if any degree exceeds 100% or the threshold leaves
    /// no room to interpolate.
    pub fn new(
        min_opening_degree: u8,
        max_opening_degree: u8,
        max_closing_degree: u8,
        opening_threshold: u8,
    ) -> CycleResult<Self> {
        if min_opening_degree > 100
            || max_opening_degree > 100
            || max_closing_degree > 100
        {
            return Err(CycleError::InvalidArg {
                what: "valve degrees must lie in [0, 100]",
            });
        }
        if opening_threshold >= 100 {
            return Err(CycleError::InvalidArg {
                what: "opening_threshold must lie in [0, 100)",
            });
        }
        Ok(Self {
            min_opening_degree,
            max_opening_degree,
            max_closing_degree,
            opening_threshold,
        })
    }
}

/// Opening/closing degree pair. Always sums to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveDegreePair {
    pub opening_degree: u8,
    pub closing_degree: u8,
}

/// Map a duty percentage in [0, 100] onto the valve's physical degrees.
///
/// Above the switch-on threshold the opening interpolates linearly from
/// `min_opening_degree` to `max_opening_degree` at full duty. At or below the
/// threshold the valve rests at `100 - max_closing_degree`. A profile with
/// `min_opening_degree >= max_opening_degree` is corrected by substituting
/// the threshold for the minimum, with a logged warning.
pub fn opening_closing_degrees(duty_percent: Real, profile: &ValveProfile) -> ValveDegreePair {
    let mut min_od = profile.min_opening_degree as Real / 100.0;
    let max_od = profile.max_opening_degree as Real / 100.0;
    let max_cd = profile.max_closing_degree as Real / 100.0;
    let threshold = profile.opening_threshold as Real / 100.0;

    if profile.min_opening_degree >= profile.max_opening_degree {
        tracing::warn!(
            min = profile.min_opening_degree,
            max = profile.max_opening_degree,
            "min opening degree not below max, falling back to the threshold"
        );
        min_od = threshold;
    }

    let duty = duty_percent.clamp(0.0, 100.0) / 100.0;
    let opening = if duty > threshold {
        min_od + (max_od - min_od) / (1.0 - threshold) * (duty - threshold)
    } else {
        1.0 - max_cd
    };

    let opening_degree = (opening * 100.0).round().clamp(0.0, 100.0) as u8;
    ValveDegreePair {
        opening_degree,
        closing_degree: 100 - opening_degree,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn degrees_always_sum_to_one_hundred(
            duty in -50.0_f64..150.0,
            min_od in 0_u8..=100,
            max_od in 0_u8..=100,
            max_cd in 0_u8..=100,
            threshold in 0_u8..100,
        ) {
            let profile = ValveProfile::new(min_od, max_od, max_cd, threshold).unwrap();
            let pair = opening_closing_degrees(duty, &profile);
            prop_assert_eq!(pair.opening_degree as u16 + pair.closing_degree as u16, 100);
            prop_assert!(pair.opening_degree <= 100);
        }
    }
}
