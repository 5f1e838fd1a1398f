//! Static zone capabilities and preset temperature tables.

use crate::error::{StateError, StateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tz_core::{Preset, Real, ensure_finite};

/// What an open window does to the zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    /// Stop thermal demand entirely.
    #[default]
    TurnOff,
    /// Keep circulating air without thermal demand.
    FanOnly,
    /// Keep running, but regulate toward the frost preset temperature.
    FrostTemp,
    /// Keep running, but regulate toward the eco preset temperature.
    EcoTemp,
}

/// Per-zone configuration the reconciler resolves against.
///
/// Built by the host from its own configuration surface; the core only ever
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfile {
    pub can_heat: bool,
    pub can_cool: bool,
    /// AC-centric zone: the no-preset fallback target is the configured
    /// maximum instead of the minimum.
    pub is_ac: bool,
    /// The zone pilots an external climate device rather than raw actuators.
    pub over_climate: bool,
    pub supports_fan_only: bool,
    /// Duty applied while a safety condition is active. Zero or less means
    /// the zone cannot run at all under safety.
    pub safety_default_duty: Real,
    pub window_action: WindowAction,
    pub min_temp: Real,
    pub max_temp: Real,
    /// Preset target temperatures while the zone is occupied.
    pub presets: BTreeMap<Preset, Real>,
    /// Preset target temperatures while the zone is unoccupied.
    pub away_presets: BTreeMap<Preset, Real>,
    /// Preset substituted while motion is detected (Activity preset).
    pub motion_preset: Preset,
    /// Preset substituted while no motion is detected (Activity preset).
    pub no_motion_preset: Preset,
}

impl Default for ZoneProfile {
    fn default() -> Self {
        Self {
            can_heat: true,
            can_cool: false,
            is_ac: false,
            over_climate: false,
            supports_fan_only: false,
            safety_default_duty: 0.0,
            window_action: WindowAction::default(),
            min_temp: 7.0,
            max_temp: 35.0,
            presets: BTreeMap::new(),
            away_presets: BTreeMap::new(),
            motion_preset: Preset::Comfort,
            no_motion_preset: Preset::Eco,
        }
    }
}

impl ZoneProfile {
    /// Fail-fast validation at zone assembly time.
    pub fn validate(&self) -> StateResult<()> {
        if !self.min_temp.is_finite() || !self.max_temp.is_finite() {
            return Err(StateError::InvalidArg {
                what: "temperature limits must be finite",
            });
        }
        if self.min_temp >= self.max_temp {
            return Err(StateError::InvalidArg {
                what: "min_temp must be below max_temp",
            });
        }
        if !self.can_heat && !self.can_cool {
            return Err(StateError::InvalidArg {
                what: "a zone must support heating or cooling",
            });
        }
        for temp in self.presets.values().chain(self.away_presets.values()) {
            ensure_finite(*temp, "preset temperature").map_err(|_| StateError::InvalidArg {
                what: "preset temperatures must be finite",
            })?;
        }
        Ok(())
    }

    /// Configured temperature for a preset, if any.
    pub fn preset_temp(&self, preset: Preset) -> Option<Real> {
        self.presets.get(&preset).copied()
    }

    /// Configured away temperature for a preset, if any.
    pub fn away_preset_temp(&self, preset: Preset) -> Option<Real> {
        self.away_presets.get(&preset).copied()
    }

    /// Whether a frost preset temperature is configured.
    pub fn has_frost_preset(&self) -> bool {
        self.presets.contains_key(&Preset::Frost)
    }
}
