//! Run the controller against the debug device and synthetic sensors.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Args;
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use haptic_config::load_or_default;
use haptic_control::{
    ControlCore, ControlEvent, ControlService, DebugProviderFactory, DeviceEventKind, EventListener,
    SensorKind, SimpleControlMode, ToyController,
};
use haptic_core::MonotonicClock;

use crate::synthetic::{FlagSensorBackend, SensorFlags, gravity_at, shake_at};

/// Arguments for `haptic simulate`.
#[derive(Args)]
pub struct SimulateArgs {
    /// Configuration file (defaults to the user config, then built-ins)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run time in milliseconds, 0 runs until Ctrl+C
    #[arg(short, long, default_value = "3000")]
    duration_ms: u64,

    /// Bind a motor to a mode (e.g., 0=gravity-z, 1=none)
    #[arg(long = "mode", value_parser = parse_mode_binding, number_of_values = 1)]
    modes: Vec<(usize, Option<SimpleControlMode>)>,

    /// Manual input for a motor (e.g., 0=0.75)
    #[arg(long = "manual", value_parser = parse_manual, number_of_values = 1)]
    manual: Vec<(usize, f32)>,

    /// Synthetic sensor sample rate
    #[arg(long, default_value = "50")]
    rate_hz: u32,

    /// Seconds per full roll of the synthetic gravity vector
    #[arg(long, default_value = "4.0")]
    roll_period: f32,

    /// Peak synthetic shake acceleration in m/s²
    #[arg(long, default_value = "20.0")]
    shake_peak: f32,
}

/// Split `key=value`.
fn parse_key_val(s: &str) -> Result<(&str, &str), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| format!("Invalid format: '{s}' (expected motor=value)"))
}

fn parse_motor(s: &str) -> Result<usize, String> {
    s.parse()
        .map_err(|_| format!("Invalid motor index: '{s}'"))
}

fn parse_mode_binding(s: &str) -> Result<(usize, Option<SimpleControlMode>), String> {
    let (motor, mode) = parse_key_val(s)?;
    let motor = parse_motor(motor)?;
    if mode.eq_ignore_ascii_case("none") {
        return Ok((motor, None));
    }
    let mode = mode.parse::<SimpleControlMode>().map_err(|e| e.to_string())?;
    Ok((motor, Some(mode)))
}

fn parse_manual(s: &str) -> Result<(usize, f32), String> {
    let (motor, value) = parse_key_val(s)?;
    let value: f32 = value
        .parse()
        .map_err(|_| format!("Invalid manual value: '{value}'"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Manual value {value} is outside [0, 1]"));
    }
    Ok((parse_motor(motor)?, value))
}

/// Runs the simulation until the deadline or Ctrl+C.
pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    if args.rate_hz == 0 {
        bail!("--rate-hz must be positive");
    }
    if args.roll_period <= 0.0 {
        bail!("--roll-period must be positive");
    }

    let config = load_or_default(args.config.as_deref())?;
    let flags = Arc::new(SensorFlags::default());
    let core = ControlCore::new(
        config,
        Arc::new(MonotonicClock::new()),
        Box::new(FlagSensorBackend::new(Arc::clone(&flags))),
    )?;
    let controller = ToyController::start(core)?;
    let service = ControlService::new(controller.clone());

    let (tx, rx) = unbounded();
    let listener: Arc<dyn EventListener> = Arc::new(tx);
    service.register_listener(listener)?;

    let provider = service
        .add_provider(&DebugProviderFactory::default())
        .context("failed to create debug provider")?;
    provider.connect().context("failed to connect debug device")?;

    let device = service
        .online_devices()
        .first()
        .copied()
        .context("debug device did not come online")?;

    for &(motor, mode) in &args.modes {
        controller.set_simple_control_mode(device, motor, mode)?;
    }
    for &(motor, value) in &args.manual {
        controller.set_manual_input(device, motor, value)?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let feeder = {
        let running = Arc::clone(&running);
        let flags = Arc::clone(&flags);
        let controller = controller.clone();
        let period = Duration::from_secs_f64(1.0 / f64::from(args.rate_hz));
        let (roll_period, shake_peak) = (args.roll_period, args.shake_peak);
        thread::Builder::new()
            .name("haptic-sensors".into())
            .spawn(move || {
                let start = Instant::now();
                while running.load(Ordering::Relaxed) {
                    let t = start.elapsed().as_secs_f32();
                    if flags.is_enabled(SensorKind::Gravity) {
                        let sample = gravity_at(t, roll_period);
                        if controller.on_sensor_event(SensorKind::Gravity, sample).is_err() {
                            break;
                        }
                    }
                    if flags.is_enabled(SensorKind::LinearAcceleration) {
                        let sample = shake_at(t, shake_peak);
                        if controller
                            .on_sensor_event(SensorKind::LinearAcceleration, sample)
                            .is_err()
                        {
                            break;
                        }
                    }
                    thread::sleep(period);
                }
            })
            .context("failed to spawn sensor thread")?
    };

    if args.duration_ms == 0 {
        println!("Simulating {device}... Press Ctrl+C to stop.");
    } else {
        println!("Simulating {device} for {} ms...", args.duration_ms);
    }
    let deadline = (args.duration_ms > 0)
        .then(|| Instant::now() + Duration::from_millis(args.duration_ms));
    print_events(&rx, &running, deadline);

    running.store(false, Ordering::SeqCst);
    if feeder.join().is_err() {
        tracing::warn!("sensor thread panicked");
    }
    service.shutdown();
    // Events raised while disconnecting.
    while let Ok(event) = rx.try_recv() {
        print_event(&event);
    }
    Ok(())
}

fn print_events(rx: &Receiver<ControlEvent>, running: &AtomicBool, deadline: Option<Instant>) {
    let poll = Duration::from_millis(100);
    while running.load(Ordering::Relaxed) {
        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                poll.min(deadline - now)
            }
            None => poll,
        };
        match rx.recv_timeout(wait) {
            Ok(event) => print_event(&event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn print_event(event: &ControlEvent) {
    match event {
        ControlEvent::Output(output) => {
            let values: Vec<String> = output.motors.iter().map(|v| format!("{v:.2}")).collect();
            println!("output {} [{}]", output.device_id, values.join(", "));
        }
        ControlEvent::Device(device) => {
            let state = match device.kind {
                DeviceEventKind::Online => "online",
                DeviceEventKind::Offline => "offline",
                DeviceEventKind::Deleted => "deleted",
            };
            match device.motors {
                Some(motors) => println!(
                    "device {} {state}: {} ({motors} motors)",
                    device.device_id, device.name
                ),
                None => println!("device {} {state}: {}", device.device_id, device.name),
            }
        }
        ControlEvent::PermissionRequired {
            provider,
            permission,
        } => println!("provider {provider} needs permission {permission}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_binding_parses_names_and_none() {
        assert_eq!(
            parse_mode_binding("0=gravity-z").unwrap(),
            (0, Some(SimpleControlMode::GravityZ))
        );
        assert_eq!(parse_mode_binding("1 = none").unwrap(), (1, None));
        assert!(parse_mode_binding("x=manual").is_err());
        assert!(parse_mode_binding("0=spin").is_err());
        assert!(parse_mode_binding("manual").is_err());
    }

    #[test]
    fn manual_value_must_be_unit_range() {
        assert_eq!(parse_manual("1=0.25").unwrap(), (1, 0.25));
        assert!(parse_manual("0=1.5").is_err());
        assert!(parse_manual("0=-0.1").is_err());
        assert!(parse_manual("0=loud").is_err());
    }
}
