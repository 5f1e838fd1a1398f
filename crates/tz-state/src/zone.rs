//! Zone composition: one evaluation tick end to end.
//!
//! Wires the override-resolution, regulation and cycling pieces together for
//! a single zone. Each tick runs the shutdown detector, reconciles the
//! requested state, computes the duty under the resolved mode and target,
//! dispatches the cycle and feeds the realized duty back to the regulator.
//! Everything runs synchronously on the caller's tick; the only temporal
//! primitive is the scheduler's timer queue.

use crate::error::StateResult;
use crate::profile::ZoneProfile;
use crate::reconciler::{OverrideReason, StateReconciler};
use crate::signals::OverrideSignals;
use crate::state::OperatingState;
use serde::{Deserialize, Serialize};
use tz_control::{AutoShutdownDetector, DutyCycleRegulator, DutyCycleResult, RegulatorConfig};
use tz_core::{Real, TemperatureSample};
use tz_cycling::{CycleObserver, CycleOutcome, CycleScheduler};

/// What one evaluation tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Whether any field of the resolved state changed this tick.
    pub state_changed: bool,
    /// Regulation result, including the realized effective duty.
    pub duty: DutyCycleResult,
    /// Decision of the auto-shutdown detector (false when disabled).
    pub shutdown_requested: bool,
    /// What the scheduler did with the applied duty.
    pub cycle: CycleOutcome,
}

/// The control core of one thermostat zone.
pub struct ZoneController {
    reconciler: StateReconciler,
    regulator: DutyCycleRegulator,
    detector: Option<AutoShutdownDetector>,
    scheduler: CycleScheduler,
}

impl ZoneController {
    /// Assemble a zone from its validated parts.
    ///
    /// A zone without an auto-shutdown detector passes `None`; "disabled"
    /// is a fact of the type, not a runtime level comparison.
    pub fn new(
        profile: ZoneProfile,
        regulator: DutyCycleRegulator,
        detector: Option<AutoShutdownDetector>,
        scheduler: CycleScheduler,
    ) -> StateResult<Self> {
        Ok(Self {
            reconciler: StateReconciler::new(profile)?,
            regulator,
            detector,
            scheduler,
        })
    }

    /// Register a cycle observer (energy meter, metrics collector).
    pub fn add_cycle_observer(&mut self, observer: Box<dyn CycleObserver>) {
        self.scheduler.add_observer(observer);
    }

    /// The authoritative operating state.
    pub fn current_state(&self) -> &OperatingState {
        self.reconciler.current()
    }

    /// Why the mode was overridden, if it was.
    pub fn override_reason(&self) -> Option<OverrideReason> {
        self.reconciler.override_reason()
    }

    /// Last regulation result.
    pub fn last_duty(&self) -> DutyCycleResult {
        self.regulator.last_result()
    }

    /// Replace the regulator coefficients (external learning feedback).
    pub fn set_regulator_config(&mut self, config: RegulatorConfig) {
        self.regulator.set_config(config);
    }

    /// Run one evaluation tick at time `now` (seconds, monotonic).
    pub fn evaluate_tick(
        &mut self,
        sample: &TemperatureSample,
        requested: &OperatingState,
        signals: &OverrideSignals,
        now: Real,
    ) -> TickOutcome {
        // The detector sees the target the zone actually regulates toward:
        // the previously resolved one, falling back to the sensor's.
        let detector_target = self
            .reconciler
            .current()
            .target_temperature()
            .or(sample.target);
        let shutdown_requested = self
            .detector
            .as_mut()
            .map(|detector| {
                detector.should_be_off(
                    requested.hvac_mode(),
                    detector_target,
                    sample.current,
                    sample.trend_per_min(),
                    now,
                )
            })
            .unwrap_or(false);

        let mut signals = *signals;
        signals.shutdown_requested = shutdown_requested;

        let state_changed = self.reconciler.reconcile(requested, &signals);
        let current = self.reconciler.current();
        let mode = current.hvac_mode();

        // Regulate against the resolved target, not the raw sensor request.
        let resolved_sample = TemperatureSample {
            target: current.target_temperature().or(sample.target),
            ..*sample
        };
        let duty = self.regulator.calculate(&resolved_sample, mode);

        // A zone still running under an active safety condition is capped at
        // its configured safety duty.
        let mut applied = duty.effective_percent;
        if signals.safety_detected && mode.is_active() {
            applied = applied.min(self.reconciler.profile().safety_default_duty);
            self.regulator.update_realized_power(applied);
        }

        // A state change forces a fresh cycle; otherwise a live on-window is
        // left alone and the repeat picks the new duty up.
        let cycle = self.scheduler.start_cycle(mode, applied, state_changed, now);
        if let CycleOutcome::Dispatched(times) = cycle {
            self.regulator
                .update_realized_power(times.realized_duty(self.scheduler.config().cycle_sec()));
        }
        self.scheduler.poll(now);

        TickOutcome {
            state_changed,
            duty: self.regulator.last_result(),
            shutdown_requested,
            cycle,
        }
    }

    /// Advance scheduler time without a full evaluation (between ticks).
    pub fn poll(&mut self, now: Real) {
        self.scheduler.poll(now);
    }

    /// Due time of the zone's next scheduled actuator event.
    pub fn next_due(&self) -> Option<Real> {
        self.scheduler.next_due()
    }

    /// Stop the zone: cancel the cycle and turn every actuator off.
    pub fn shut_down(&mut self) {
        self.scheduler.shut_down();
    }
}
