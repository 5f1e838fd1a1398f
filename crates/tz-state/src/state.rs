//! Operating state with per-field change tracking.

use serde::{Deserialize, Serialize};
use tz_core::{HvacMode, Preset, Real};

/// Which fields changed since the flags were last consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanges {
    pub hvac_mode: bool,
    pub preset: bool,
    pub target_temperature: bool,
}

impl StateChanges {
    pub fn any(self) -> bool {
        self.hvac_mode || self.preset || self.target_temperature
    }
}

/// One operating state of a zone.
///
/// Two instances exist at all times: `requested` (the last explicit intent,
/// owned by the caller) and `current` (the authoritative override-resolved
/// state, owned by the reconciler). Setters track which fields changed;
/// downstream components consume the flags via [`OperatingState::take_changes`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingState {
    hvac_mode: HvacMode,
    preset: Preset,
    target_temperature: Option<Real>,
    #[serde(skip)]
    changes: StateChanges,
}

impl OperatingState {
    pub fn new(hvac_mode: HvacMode, preset: Preset, target_temperature: Option<Real>) -> Self {
        Self {
            hvac_mode,
            preset,
            target_temperature,
            changes: StateChanges::default(),
        }
    }

    pub fn hvac_mode(&self) -> HvacMode {
        self.hvac_mode
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn target_temperature(&self) -> Option<Real> {
        self.target_temperature
    }

    /// Set the mode; returns whether it changed (and marks the flag).
    pub fn set_hvac_mode(&mut self, mode: HvacMode) -> bool {
        let changed = self.hvac_mode != mode;
        self.hvac_mode = mode;
        self.changes.hvac_mode |= changed;
        changed
    }

    pub fn set_preset(&mut self, preset: Preset) -> bool {
        let changed = self.preset != preset;
        self.preset = preset;
        self.changes.preset |= changed;
        changed
    }

    pub fn set_target_temperature(&mut self, target: Option<Real>) -> bool {
        let changed = self.target_temperature != target;
        self.target_temperature = target;
        self.changes.target_temperature |= changed;
        changed
    }

    /// Consume and reset the change flags.
    pub fn take_changes(&mut self) -> StateChanges {
        std::mem::take(&mut self.changes)
    }

    /// Pending change flags without resetting them.
    pub fn changes(&self) -> StateChanges {
        self.changes
    }
}
