use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tz_control::{AutoShutdownDetector, DutyCycleRegulator, RegulatorConfig, ShutdownLevel};
use tz_core::{HvacMode, PortError, Preset, SwitchPort, TemperatureSample};
use tz_cycling::{CycleConfig, CycleObserver, CycleScheduler, EnergyMeter, ObserverError, ZoneActuators};
use tz_state::{OperatingState, OverrideSignals, StateResult, ZoneController, ZoneProfile};

#[derive(Parser)]
#[command(name = "tz-cli")]
#[command(about = "Thermozone CLI - adaptive thermostat control core demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic closed-loop zone simulation
    Simulate {
        /// Simulated duration in minutes
        #[arg(long, default_value_t = 180)]
        minutes: u32,
        /// Comfort target temperature (degrees C)
        #[arg(long, default_value_t = 19.5)]
        target: f64,
        /// Initial room temperature (degrees C)
        #[arg(long, default_value_t = 15.0)]
        initial: f64,
        /// Outdoor temperature (degrees C)
        #[arg(long, default_value_t = 5.0)]
        outdoor: f64,
        /// Number of staggered heater switches
        #[arg(long, default_value_t = 2)]
        switches: usize,
        /// Heater rated power per switch, kW
        #[arg(long, default_value_t = 1.5)]
        power_kw: f64,
        /// Auto shutdown aggressiveness (omit to disable)
        #[arg(long, value_enum)]
        shutdown: Option<ShutdownArg>,
        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShutdownArg {
    VerySlow,
    Slow,
    Medium,
    Fast,
}

impl From<ShutdownArg> for ShutdownLevel {
    fn from(level: ShutdownArg) -> Self {
        match level {
            ShutdownArg::VerySlow => ShutdownLevel::VerySlow,
            ShutdownArg::Slow => ShutdownLevel::Slow,
            ShutdownArg::Medium => ShutdownLevel::Medium,
            ShutdownArg::Fast => ShutdownLevel::Fast,
        }
    }
}

/// Switch double backed by a shared flag the room model reads.
#[derive(Clone, Default)]
struct SimSwitch(Rc<Cell<bool>>);

impl SwitchPort for SimSwitch {
    fn turn_on(&mut self) -> Result<(), PortError> {
        self.0.set(true);
        Ok(())
    }

    fn turn_off(&mut self) -> Result<(), PortError> {
        self.0.set(false);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.0.get()
    }
}

/// Energy meter shared between the scheduler and the report.
#[derive(Clone)]
struct SharedMeter(Rc<RefCell<EnergyMeter>>);

impl CycleObserver for SharedMeter {
    fn on_cycle_start(
        &mut self,
        on_sec: u32,
        off_sec: u32,
        duty: f64,
        mode: HvacMode,
    ) -> Result<(), ObserverError> {
        self.0.borrow_mut().on_cycle_start(on_sec, off_sec, duty, mode)
    }

    fn on_cycle_end(&mut self) -> Result<(), ObserverError> {
        self.0.borrow_mut().on_cycle_end()
    }
}

#[derive(Serialize)]
struct SimSummary {
    minutes: u32,
    final_temp: f64,
    min_temp: f64,
    max_temp: f64,
    final_mode: HvacMode,
    final_duty: f64,
    energy_kwh: f64,
    shutdown_ticks: u32,
}

fn main() -> StateResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            minutes,
            target,
            initial,
            outdoor,
            switches,
            power_kw,
            shutdown,
            json,
        } => cmd_simulate(
            minutes,
            target,
            initial,
            outdoor,
            switches.max(1),
            power_kw,
            shutdown.map(ShutdownLevel::from),
            json,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    minutes: u32,
    target: f64,
    initial: f64,
    outdoor: f64,
    switches: usize,
    power_kw: f64,
    shutdown: Option<ShutdownLevel>,
    json: bool,
) -> StateResult<()> {
    let flags: Vec<Rc<Cell<bool>>> = (0..switches).map(|_| Rc::new(Cell::new(false))).collect();
    let mut zone = build_zone(target, shutdown, &flags)?;

    let meter = Rc::new(RefCell::new(EnergyMeter::new(power_kw)));
    zone.add_cycle_observer(Box::new(SharedMeter(Rc::clone(&meter))));

    let requested = OperatingState::new(HvacMode::Heat, Preset::Comfort, None);
    let signals = OverrideSignals::default();

    // First-order room: heat input per energized switch, loss toward the
    // outdoor temperature. Tick resolution bounds how precisely the PWM
    // windows land; 30 s is plenty for a 5-minute cycle.
    const TICK_SEC: f64 = 30.0;
    const HEAT_RATE_C_PER_H: f64 = 4.0;
    const LOSS_PER_H: f64 = 0.25;

    let steps = (minutes as f64 * 60.0 / TICK_SEC) as u64;
    let mut temp = initial;
    let mut prev_temp = initial;
    let mut min_temp = initial;
    let mut max_temp = initial;
    let mut shutdown_ticks = 0_u32;

    for step in 0..=steps {
        let now = step as f64 * TICK_SEC;
        let trend_per_hour = (temp - prev_temp) / TICK_SEC * 3600.0;
        let sample = TemperatureSample {
            target: None,
            current: Some(temp),
            external: Some(outdoor),
            trend_per_hour: Some(trend_per_hour),
        };

        let outcome = zone.evaluate_tick(&sample, &requested, &signals, now);
        if outcome.shutdown_requested {
            shutdown_ticks += 1;
        }

        let active = flags.iter().filter(|f| f.get()).count() as f64 / flags.len() as f64;
        prev_temp = temp;
        temp += (HEAT_RATE_C_PER_H * active - LOSS_PER_H * (temp - outdoor)) * (TICK_SEC / 3600.0);
        min_temp = min_temp.min(temp);
        max_temp = max_temp.max(temp);
    }

    let summary = SimSummary {
        minutes,
        final_temp: temp,
        min_temp,
        max_temp,
        final_mode: zone.current_state().hvac_mode(),
        final_duty: zone.last_duty().effective_percent,
        energy_kwh: meter.borrow().total_kwh(),
        shutdown_ticks,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_else(|e| e.to_string())
        );
    } else {
        println!("Simulated {} minutes", summary.minutes);
        println!(
            "Room temperature: {:.2} C (min {:.2}, max {:.2})",
            summary.final_temp, summary.min_temp, summary.max_temp
        );
        println!(
            "Final mode {:?}, duty {:.0}%",
            summary.final_mode,
            summary.final_duty * 100.0
        );
        println!("Energy used: {:.2} kWh", summary.energy_kwh);
        if summary.shutdown_ticks > 0 {
            println!(
                "Auto shutdown active on {} evaluation ticks",
                summary.shutdown_ticks
            );
        }
    }

    Ok(())
}

fn build_zone(
    target: f64,
    shutdown: Option<ShutdownLevel>,
    flags: &[Rc<Cell<bool>>],
) -> StateResult<ZoneController> {
    let ports: Vec<Box<dyn SwitchPort>> = flags
        .iter()
        .map(|f| Box::new(SimSwitch(Rc::clone(f))) as Box<dyn SwitchPort>)
        .collect();
    ZoneController::new(
        comfort_profile(target),
        DutyCycleRegulator::new(RegulatorConfig::new(0.6, 0.01)?),
        shutdown.map(AutoShutdownDetector::new),
        CycleScheduler::new(CycleConfig::new(5, 30, 0)?, ZoneActuators::Switches(ports)),
    )
}

fn comfort_profile(target: f64) -> ZoneProfile {
    let mut presets = BTreeMap::new();
    presets.insert(Preset::Frost, 7.0);
    presets.insert(Preset::Eco, target - 2.0);
    presets.insert(Preset::Comfort, target);
    ZoneProfile {
        presets,
        ..Default::default()
    }
}
