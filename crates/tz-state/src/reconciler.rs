//! Cascading operating-state reconciliation.
//!
//! Re-evaluated every tick over a `{requested, current}` state pair. The
//! hvac mode cascade is a strict priority order, first match wins; target
//! temperature and preset resolve through independent cascades afterwards.
//! The aggregated "anything changed" flag tells the caller whether to
//! re-dispatch regulation and cycling.

use crate::error::StateResult;
use crate::profile::{WindowAction, ZoneProfile};
use crate::signals::OverrideSignals;
use crate::state::OperatingState;
use serde::{Deserialize, Serialize};
use tz_core::{CentralMode, HvacMode, Preset, Real};

/// Why the current mode differs from the requested one (or why the zone is
/// off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    CentralMode,
    Safety,
    Window,
    AutoShutdown,
    /// Off because the caller asked for off, not because of any override.
    Manual,
}

/// Per-zone state reconciliation engine. Exclusive owner of the `current`
/// operating state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReconciler {
    profile: ZoneProfile,
    current: OperatingState,
    override_reason: Option<OverrideReason>,
}

impl StateReconciler {
    /// Create a reconciler over a validated zone profile.
    pub fn new(profile: ZoneProfile) -> StateResult<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            current: OperatingState::default(),
            override_reason: None,
        })
    }

    /// The authoritative, override-resolved state.
    pub fn current(&self) -> &OperatingState {
        &self.current
    }

    /// Consume the current state's change flags.
    pub fn take_changes(&mut self) -> crate::state::StateChanges {
        self.current.take_changes()
    }

    /// Why the mode was overridden, if it was.
    pub fn override_reason(&self) -> Option<OverrideReason> {
        self.override_reason
    }

    pub fn profile(&self) -> &ZoneProfile {
        &self.profile
    }

    /// Resolve `requested` against every override source. Returns whether
    /// any field of the current state changed.
    pub fn reconcile(&mut self, requested: &OperatingState, signals: &OverrideSignals) -> bool {
        let (mode, reason) = self.resolve_hvac_mode(requested, signals);
        let mode_changed = self.current.set_hvac_mode(mode);
        if reason != self.override_reason {
            tracing::debug!(?mode, ?reason, "operating mode override changed");
        }
        self.override_reason = reason;

        let preset = self.resolve_preset(mode, requested.preset(), signals);
        let preset_changed = self.current.set_preset(preset);

        let target = self.resolve_target(preset, requested, signals);
        let target_changed = self.current.set_target_temperature(target);

        mode_changed || preset_changed || target_changed
    }

    /// Ordered mode cascade, first match wins.
    fn resolve_hvac_mode(
        &self,
        requested: &OperatingState,
        signals: &OverrideSignals,
    ) -> (HvacMode, Option<OverrideReason>) {
        let asked = requested.hvac_mode();

        if signals.central_mode == CentralMode::Stopped {
            return (HvacMode::Off, Some(OverrideReason::CentralMode));
        }

        if signals.safety_detected
            && (self.profile.over_climate || self.profile.safety_default_duty <= 0.0)
        {
            return (HvacMode::Off, Some(OverrideReason::Safety));
        }

        if signals.window_detected && asked != HvacMode::Off {
            match self.profile.window_action {
                WindowAction::FanOnly if self.profile.supports_fan_only => {
                    return (HvacMode::FanOnly, Some(OverrideReason::Window));
                }
                // FanOnly without support degrades to Off.
                WindowAction::TurnOff | WindowAction::FanOnly => {
                    return (HvacMode::Off, Some(OverrideReason::Window));
                }
                // Temperature actions leave the mode alone.
                WindowAction::FrostTemp | WindowAction::EcoTemp => {}
            }
        }

        if signals.shutdown_requested && asked != HvacMode::Off {
            return (HvacMode::Off, Some(OverrideReason::AutoShutdown));
        }

        if asked != HvacMode::Off {
            match signals.central_mode {
                CentralMode::CoolOnly => {
                    let mode = if self.profile.can_cool {
                        HvacMode::Cool
                    } else {
                        HvacMode::Off
                    };
                    let reason = (mode != asked).then_some(OverrideReason::CentralMode);
                    return (mode, reason);
                }
                CentralMode::HeatOnly => {
                    let mode = if self.profile.can_heat {
                        HvacMode::Heat
                    } else {
                        HvacMode::Off
                    };
                    let reason = (mode != asked).then_some(OverrideReason::CentralMode);
                    return (mode, reason);
                }
                CentralMode::FrostProtection => {
                    let mode = if self.profile.has_frost_preset() {
                        HvacMode::Heat
                    } else {
                        HvacMode::Off
                    };
                    let reason = (mode != asked).then_some(OverrideReason::CentralMode);
                    return (mode, reason);
                }
                CentralMode::Auto | CentralMode::Stopped => {}
            }
        }

        let reason = (asked == HvacMode::Off).then_some(OverrideReason::Manual);
        (asked, reason)
    }

    /// Preset cascade: power limit beats safety beats central frost
    /// protection beats the request.
    fn resolve_preset(
        &self,
        mode: HvacMode,
        requested: Preset,
        signals: &OverrideSignals,
    ) -> Preset {
        if mode == HvacMode::Off {
            return requested;
        }
        if signals.overpowering_detected {
            return Preset::Power;
        }
        if signals.safety_detected {
            return Preset::Safety;
        }
        if signals.central_mode == CentralMode::FrostProtection && mode == HvacMode::Heat {
            return Preset::Frost;
        }
        requested
    }

    /// Target cascade, independent of the mode cascade.
    fn resolve_target(
        &self,
        preset: Preset,
        requested: &OperatingState,
        signals: &OverrideSignals,
    ) -> Option<Real> {
        if signals.window_detected {
            let override_preset = match self.profile.window_action {
                WindowAction::FrostTemp => Some(Preset::Frost),
                WindowAction::EcoTemp => Some(Preset::Eco),
                _ => None,
            };
            if let Some(p) = override_preset {
                if let Some(temp) = self.profile.preset_temp(p) {
                    return Some(temp);
                }
            }
        }

        if signals.absence_detected && preset != Preset::None {
            if let Some(temp) = self.profile.away_preset_temp(preset) {
                return Some(temp);
            }
        }

        if preset == Preset::Activity {
            if let Some(motion) = signals.motion_detected {
                let p = if motion {
                    self.profile.motion_preset
                } else {
                    self.profile.no_motion_preset
                };
                if let Some(temp) = self.profile.preset_temp(p) {
                    return Some(temp);
                }
            }
        }

        if preset != Preset::None {
            if let Some(temp) = self.profile.preset_temp(preset) {
                return Some(temp);
            }
        }

        // A forced preset without a configured temperature (safety, power
        // limit) keeps regulating toward the requested preset's temperature.
        if requested.preset() != Preset::None {
            if let Some(temp) = self.profile.preset_temp(requested.preset()) {
                return Some(temp);
            }
        }

        if let Some(target) = requested.target_temperature() {
            return Some(target);
        }

        // No preset, no explicit intent: rest at the zone's boundary.
        Some(if self.profile.is_ac {
            self.profile.max_temp
        } else {
            self.profile.min_temp
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile() -> ZoneProfile {
        let mut presets = BTreeMap::new();
        presets.insert(Preset::Frost, 7.0);
        presets.insert(Preset::Eco, 17.0);
        presets.insert(Preset::Comfort, 19.0);
        presets.insert(Preset::Boost, 21.0);
        let mut away_presets = BTreeMap::new();
        away_presets.insert(Preset::Comfort, 16.5);
        away_presets.insert(Preset::Eco, 16.0);
        ZoneProfile {
            can_heat: true,
            can_cool: true,
            supports_fan_only: true,
            window_action: WindowAction::TurnOff,
            presets,
            away_presets,
            ..Default::default()
        }
    }

    fn heat_request(target: Real) -> OperatingState {
        OperatingState::new(HvacMode::Heat, Preset::Comfort, Some(target))
    }

    #[test]
    fn central_stop_always_wins() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            central_mode: CentralMode::Stopped,
            ..Default::default()
        };
        for requested in [
            heat_request(19.0),
            OperatingState::new(HvacMode::Cool, Preset::Eco, None),
            OperatingState::default(),
        ] {
            reconciler.reconcile(&requested, &signals);
            assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
            assert_eq!(
                reconciler.override_reason(),
                Some(OverrideReason::CentralMode)
            );
        }
    }

    #[test]
    fn safety_stops_zone_with_no_safe_duty() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            safety_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
        assert_eq!(reconciler.override_reason(), Some(OverrideReason::Safety));
    }

    #[test]
    fn safety_with_fallback_duty_keeps_running_under_safety_preset() {
        let mut p = profile();
        p.safety_default_duty = 0.1;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            safety_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Heat);
        assert_eq!(reconciler.current().preset(), Preset::Safety);
        // No configured safety temperature: the comfort target survives.
        assert_eq!(reconciler.current().target_temperature(), Some(19.0));
    }

    #[test]
    fn window_prefers_fan_only_when_supported() {
        let mut p = profile();
        p.window_action = WindowAction::FanOnly;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            window_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::FanOnly);
        assert_eq!(reconciler.override_reason(), Some(OverrideReason::Window));
    }

    #[test]
    fn window_fan_only_degrades_to_off_when_unsupported() {
        let mut p = profile();
        p.window_action = WindowAction::FanOnly;
        p.supports_fan_only = false;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            window_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
    }

    #[test]
    fn window_temperature_action_keeps_mode_and_retargets() {
        let mut p = profile();
        p.window_action = WindowAction::EcoTemp;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            window_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Heat);
        assert_eq!(reconciler.current().target_temperature(), Some(17.0));
    }

    #[test]
    fn window_never_restarts_an_off_zone() {
        let mut p = profile();
        p.window_action = WindowAction::FanOnly;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            window_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&OperatingState::default(), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
        assert_eq!(reconciler.override_reason(), Some(OverrideReason::Manual));
    }

    #[test]
    fn auto_shutdown_turns_off_until_requested_off() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            shutdown_requested: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
        assert_eq!(
            reconciler.override_reason(),
            Some(OverrideReason::AutoShutdown)
        );
    }

    #[test]
    fn heat_only_retargets_cooling_zones() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            central_mode: CentralMode::HeatOnly,
            ..Default::default()
        };
        let requested = OperatingState::new(HvacMode::Cool, Preset::Comfort, Some(24.0));
        reconciler.reconcile(&requested, &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Heat);
        assert_eq!(
            reconciler.override_reason(),
            Some(OverrideReason::CentralMode)
        );
    }

    #[test]
    fn cool_only_stops_a_heat_only_zone() {
        let mut p = profile();
        p.can_cool = false;
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            central_mode: CentralMode::CoolOnly,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
    }

    #[test]
    fn frost_protection_heats_with_frost_preset() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            central_mode: CentralMode::FrostProtection,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        let current = reconciler.current();
        assert_eq!(current.hvac_mode(), HvacMode::Heat);
        assert_eq!(current.preset(), Preset::Frost);
        assert_eq!(current.target_temperature(), Some(7.0));
    }

    #[test]
    fn frost_protection_without_frost_preset_stops() {
        let mut p = profile();
        p.presets.remove(&Preset::Frost);
        let mut reconciler = StateReconciler::new(p).unwrap();
        let signals = OverrideSignals {
            central_mode: CentralMode::FrostProtection,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().hvac_mode(), HvacMode::Off);
    }

    #[test]
    fn absence_uses_away_table() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            absence_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().target_temperature(), Some(16.5));
    }

    #[test]
    fn activity_preset_follows_motion() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let requested = OperatingState::new(HvacMode::Heat, Preset::Activity, None);

        let mut signals = OverrideSignals {
            motion_detected: Some(true),
            ..Default::default()
        };
        reconciler.reconcile(&requested, &signals);
        assert_eq!(reconciler.current().target_temperature(), Some(19.0));

        signals.motion_detected = Some(false);
        reconciler.reconcile(&requested, &signals);
        assert_eq!(reconciler.current().target_temperature(), Some(17.0));
    }

    #[test]
    fn overpowering_forces_power_preset() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals {
            overpowering_detected: true,
            ..Default::default()
        };
        reconciler.reconcile(&heat_request(19.0), &signals);
        assert_eq!(reconciler.current().preset(), Preset::Power);
    }

    #[test]
    fn no_preset_falls_back_to_explicit_then_boundary() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals::default();

        let explicit = OperatingState::new(HvacMode::Heat, Preset::None, Some(20.5));
        reconciler.reconcile(&explicit, &signals);
        assert_eq!(reconciler.current().target_temperature(), Some(20.5));

        let bare = OperatingState::new(HvacMode::Heat, Preset::None, None);
        reconciler.reconcile(&bare, &signals);
        assert_eq!(reconciler.current().target_temperature(), Some(7.0));

        let mut ac = profile();
        ac.is_ac = true;
        let mut reconciler = StateReconciler::new(ac).unwrap();
        reconciler.reconcile(
            &OperatingState::new(HvacMode::Cool, Preset::None, None),
            &signals,
        );
        assert_eq!(reconciler.current().target_temperature(), Some(35.0));
    }

    #[test]
    fn change_aggregation_settles_when_inputs_repeat() {
        let mut reconciler = StateReconciler::new(profile()).unwrap();
        let signals = OverrideSignals::default();
        let requested = heat_request(19.0);
        assert!(reconciler.reconcile(&requested, &signals));
        assert!(!reconciler.reconcile(&requested, &signals));
    }

    #[test]
    fn override_reason_serializes_snake_case() {
        let json = serde_json::to_string(&OverrideReason::CentralMode).unwrap();
        assert_eq!(json, "\"central_mode\"");
    }
}
