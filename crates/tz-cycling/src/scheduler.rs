//! The cycle engine.
//!
//! Turns a duty cycle into concrete actuator commands. Switch zones get
//! staggered PWM windows within a self-repeating master cycle; valve zones
//! get the duty mapped to an opening degree and dispatched immediately.
//!
//! Temporal behavior runs entirely over a [`TimerQueue`]: the host advances
//! its monotonic clock and calls [`CycleScheduler::poll`], which fires due
//! per-actuator transitions strictly in order and finally the master
//! cycle-end step, which restarts the cycle with the last stored parameters.
//! Cancellation clears the whole queue in one operation, so a
//! partially-cancelled cycle cannot exist.

use crate::observer::CycleObserver;
use crate::timing::{CycleConfig, CycleTimes, compute_offsets};
use crate::valve::{ValveDegreePair, ValveProfile, opening_closing_degrees};
use serde::{Deserialize, Serialize};
use tz_core::{HvacMode, Real, SwitchPort, TimerQueue, ValvePort};

/// Scheduled event within a master cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEvent {
    ActuatorOn(usize),
    ActuatorOff(usize),
    CycleEnd,
}

/// The actuator set of one zone.
///
/// One branch at the scheduler boundary: switches are cycled temporally,
/// valves receive the duty as an opening command with no scheduling.
pub enum ZoneActuators {
    Switches(Vec<Box<dyn SwitchPort>>),
    Valves {
        ports: Vec<Box<dyn ValvePort>>,
        profile: ValveProfile,
    },
}

impl ZoneActuators {
    fn is_valve(&self) -> bool {
        matches!(self, ZoneActuators::Valves { .. })
    }
}

/// What `start_cycle` did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// An active on-window was left alone; the stored parameters for the
    /// next repeat were updated instead.
    Deferred,
    /// A new cycle was dispatched with the realized timing.
    Dispatched(CycleTimes),
    /// Valve passthrough: the mapped degrees were sent to every valve port.
    ValvesSet(ValveDegreePair),
}

#[derive(Debug, Clone, Copy)]
struct RunningCycle {
    started_at: Real,
    on_sec: u32,
    /// 100% duty: nothing is expected to be off at cycle end.
    full: bool,
}

#[derive(Debug, Clone, Copy)]
struct StoredParams {
    mode: HvacMode,
    duty: Real,
}

/// Per-zone cycle scheduler.
///
/// Owns its timer queue and actuator set exclusively; there is no concurrent
/// cycle execution for a zone. Actuator and observer failures are logged and
/// never abort dispatch, so an error path can only ever leave an actuator
/// off or untouched.
pub struct CycleScheduler {
    config: CycleConfig,
    actuators: ZoneActuators,
    timers: TimerQueue<CycleEvent>,
    running: Option<RunningCycle>,
    stored: StoredParams,
    observers: Vec<Box<dyn CycleObserver>>,
}

impl CycleScheduler {
    pub fn new(config: CycleConfig, actuators: ZoneActuators) -> Self {
        Self {
            config,
            actuators,
            timers: TimerQueue::new(),
            running: None,
            stored: StoredParams {
                mode: HvacMode::Off,
                duty: 0.0,
            },
            observers: Vec::new(),
        }
    }

    /// Register a cycle start/end observer (energy meters, metrics).
    pub fn add_observer(&mut self, observer: Box<dyn CycleObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Whether a master cycle is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Number of pending timer events, for diagnostics.
    pub fn pending_events(&self) -> usize {
        self.timers.len()
    }

    /// Start (or re-parameterize) the zone's cycle.
    ///
    /// With a cycle already running and `force` false, an active on-window
    /// is never interrupted: only the stored parameters for the next repeat
    /// change. An idle running cycle is replaced immediately. `force` always
    /// cancels-then-reschedules.
    pub fn start_cycle(
        &mut self,
        mode: HvacMode,
        duty: Real,
        force: bool,
        now: Real,
    ) -> CycleOutcome {
        if self.actuators.is_valve() {
            return self.set_valves(mode, duty);
        }

        if !force {
            if let Some(running) = &self.running {
                if running.on_sec > 0 {
                    // Interrupting a live on-window causes audible chatter;
                    // the repeat picks the new parameters up.
                    self.stored = StoredParams { mode, duty };
                    tracing::debug!(?mode, duty, "cycle active, parameters stored for next repeat");
                    return CycleOutcome::Deferred;
                }
            }
        }

        self.dispatch(mode, duty, now)
    }

    /// Fire every due timer event. Per-actuator transitions are strictly
    /// ordered by their offsets; the cycle-end step always fires after the
    /// last transition of its cycle and restarts with the stored parameters.
    pub fn poll(&mut self, now: Real) {
        while let Some(event) = self.timers.pop_due(now) {
            match event {
                CycleEvent::ActuatorOn(idx) => self.switch_command(idx, true),
                CycleEvent::ActuatorOff(idx) => self.switch_command(idx, false),
                CycleEvent::CycleEnd => self.finish_cycle(now),
            }
        }
    }

    /// Drive a single switch on or off, logging actuator failures without
    /// aborting the poll loop. Mirrors the error handling used in `dispatch`.
    fn switch_command(&mut self, idx: usize, on: bool) {
        let ZoneActuators::Switches(switches) = &mut self.actuators else {
            return;
        };
        let Some(switch) = switches.get_mut(idx) else {
            return;
        };
        let result = if on { switch.turn_on() } else { switch.turn_off() };
        if let Err(err) = result {
            tracing::warn!(actuator = idx, %err, on, "switch command failed");
        }
    }

    /// Due time of the next scheduled event, if any.
    pub fn next_due(&self) -> Option<Real> {
        self.timers.next_due()
    }

    /// Cancel the running cycle and every pending timer. Idempotent; safe
    /// with no cycle running. Actuator state is left untouched.
    pub fn cancel_cycle(&mut self) {
        self.timers.clear();
        self.running = None;
    }

    /// Turn every switch off and cancel the cycle. Used when a zone leaves
    /// a controllable mode for good.
    pub fn shut_down(&mut self) {
        self.cancel_cycle();
        if let ZoneActuators::Switches(switches) = &mut self.actuators {
            for (idx, switch) in switches.iter_mut().enumerate() {
                if let Err(err) = switch.turn_off() {
                    tracing::warn!(actuator = idx, %err, "turn-off during shutdown failed");
                }
            }
        }
    }

    fn set_valves(&mut self, mode: HvacMode, duty: Real) -> CycleOutcome {
        self.stored = StoredParams { mode, duty };
        let command = if mode.is_active() { duty } else { 0.0 };
        let ZoneActuators::Valves { ports, profile } = &mut self.actuators else {
            unreachable!("set_valves called on a switch zone");
        };
        let pair = opening_closing_degrees(command * 100.0, profile);
        for (idx, port) in ports.iter_mut().enumerate() {
            if let Err(err) = port.set_opening_percent(pair.opening_degree) {
                tracing::warn!(valve = idx, %err, "valve command failed");
            }
        }
        CycleOutcome::ValvesSet(pair)
    }

    fn dispatch(&mut self, mode: HvacMode, duty: Real, now: Real) -> CycleOutcome {
        // Cancel-then-reschedule: dispatch never overlaps a previous cycle.
        self.timers.clear();
        self.stored = StoredParams { mode, duty };

        let cycle_sec = self.config.cycle_sec();
        let times = if mode.is_active() {
            self.config.calculate_cycle_times(duty)
        } else {
            CycleTimes {
                on_sec: 0,
                off_sec: cycle_sec,
                forced: false,
            }
        };
        let realized = times.realized_duty(cycle_sec);
        self.notify_start(&times, realized, mode);

        let ZoneActuators::Switches(switches) = &mut self.actuators else {
            unreachable!("dispatch called on a valve zone");
        };

        if times.on_sec == 0 {
            // Nothing to energize: everything off, re-evaluate at cycle end.
            for (idx, switch) in switches.iter_mut().enumerate() {
                if let Err(err) = switch.turn_off() {
                    tracing::warn!(actuator = idx, %err, "turn-off failed");
                }
            }
            self.timers
                .schedule(now + cycle_sec as Real, CycleEvent::CycleEnd);
            self.running = Some(RunningCycle {
                started_at: now,
                on_sec: 0,
                full: false,
            });
            return CycleOutcome::Dispatched(times);
        }

        let offsets = compute_offsets(times.on_sec, cycle_sec, switches.len());
        for (idx, (switch, offset)) in switches.iter_mut().zip(&offsets).enumerate() {
            if *offset == 0.0 {
                if let Err(err) = switch.turn_on() {
                    tracing::warn!(actuator = idx, %err, "turn-on failed");
                }
            } else {
                // A leftover on-state from a previous 100% cycle must clear
                // so the new offset takes effect cleanly.
                if switch.is_active() {
                    if let Err(err) = switch.turn_off() {
                        tracing::warn!(actuator = idx, %err, "pre-offset turn-off failed");
                    }
                }
                self.timers
                    .schedule(now + offset, CycleEvent::ActuatorOn(idx));
            }
            let window_end = offset + times.on_sec as Real;
            if window_end < cycle_sec as Real {
                self.timers
                    .schedule(now + window_end, CycleEvent::ActuatorOff(idx));
            }
            // A window reaching cycle end stays on; the cycle-end step owns
            // the final transition.
        }
        self.timers
            .schedule(now + cycle_sec as Real, CycleEvent::CycleEnd);
        self.running = Some(RunningCycle {
            started_at: now,
            on_sec: times.on_sec,
            full: times.on_sec >= cycle_sec,
        });
        tracing::debug!(
            on_sec = times.on_sec,
            off_sec = times.off_sec,
            forced = times.forced,
            ?mode,
            "cycle dispatched"
        );
        CycleOutcome::Dispatched(times)
    }

    fn finish_cycle(&mut self, now: Real) {
        // The repeat anchors at the cycle's own end time, so a late poll
        // never stretches the following cycles.
        let (full, restart_at) = match self.running {
            Some(running) => (
                running.full,
                running.started_at + self.config.cycle_sec() as Real,
            ),
            None => (false, now),
        };
        if !full {
            if let ZoneActuators::Switches(switches) = &mut self.actuators {
                for (idx, switch) in switches.iter_mut().enumerate() {
                    if switch.is_active() {
                        if let Err(err) = switch.turn_off() {
                            tracing::warn!(actuator = idx, %err, "cycle-end turn-off failed");
                        }
                    }
                }
            }
        }
        self.notify_end();
        self.running = None;
        let stored = self.stored;
        // Self-perpetuating while the zone stays under cycle control.
        self.dispatch(stored.mode, stored.duty, restart_at);
    }

    fn notify_start(&mut self, times: &CycleTimes, duty: Real, mode: HvacMode) {
        for observer in &mut self.observers {
            if let Err(err) = observer.on_cycle_start(times.on_sec, times.off_sec, duty, mode) {
                tracing::warn!(%err, "cycle-start observer failed");
            }
        }
    }

    fn notify_end(&mut self) {
        for observer in &mut self.observers {
            if let Err(err) = observer.on_cycle_end() {
                tracing::warn!(%err, "cycle-end observer failed");
            }
        }
    }
}
