//! Command implementations: backend assembly, run, goto and self-check.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use desk_core::error::{DeskError, Result};
use desk_core::Desk;
use desk_hardware::as5600::MagnetStatus;
use desk_hardware::{ChannelTransport, FilePositionStore, TransportHandle, channel_transport};
use desk_traits::{Actuator, Clock, Encoder, PositionStore};

/// Test hook: when set, the simulated encoder never answers.
#[cfg(not(feature = "hardware"))]
const SIM_DEAD_ENV: &str = "DESK_TEST_ENCODER_DEAD";

/// Encoder, actuator and clock for one invocation.
pub struct Backend {
    pub encoder: Box<dyn Encoder>,
    pub actuator: Box<dyn Actuator>,
    pub clock: Box<dyn Clock + Send + Sync>,
    /// Magnet diagnostics, when the encoder can report them.
    pub magnet: Option<MagnetStatus>,
    /// Raw AGC-corrected field magnitude.
    pub magnitude: Option<u16>,
}

/// Simulated plant. `simulated_time` runs on a manual clock so one-shot
/// commands finish instantly; `run` uses the wall clock.
#[cfg(not(feature = "hardware"))]
pub fn backend(cfg: &desk_config::Config, simulated_time: bool) -> Result<Backend> {
    use desk_hardware::{PlantCfg, SimulatedDesk};
    use desk_traits::{ManualClock, MonotonicClock};

    let clock: Arc<dyn Clock + Send + Sync> = if simulated_time {
        Arc::new(ManualClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    };
    // Start the shaft where the store says the desk is, so repeated runs agree.
    let start = FilePositionStore::new(&cfg.storage.position_file)
        .load_position()
        .ok()
        .flatten()
        .unwrap_or(0)
        .max(0);
    let plant = PlantCfg {
        start_deg: f64::from(start),
        ..PlantCfg::default()
    };
    let sim = SimulatedDesk::new(plant, clock.clone());
    if std::env::var_os(SIM_DEAD_ENV).is_some() {
        sim.set_encoder_dead(true);
    }
    tracing::info!(start, simulated_time, "using simulated desk");
    Ok(Backend {
        encoder: Box::new(sim.encoder()),
        actuator: Box::new(sim.actuator()),
        clock: Box::new(clock),
        magnet: None,
        magnitude: None,
    })
}

/// AS5600 encoder on I2C and PWM motor driver.
#[cfg(feature = "hardware")]
pub fn backend(cfg: &desk_config::Config, _simulated_time: bool) -> Result<Backend> {
    use desk_traits::MonotonicClock;

    let p = &cfg.pins;
    let encoder = desk_hardware::As5600Encoder::new(p.i2c_bus)
        .map_err(|e| eyre::eyre!("open AS5600 on i2c bus {}: {e}", p.i2c_bus))?;
    let magnet = match encoder.magnet_status() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "could not read magnet status");
            None
        }
    };
    let magnitude = match encoder.magnitude() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "could not read magnet magnitude");
            None
        }
    };
    let actuator = desk_hardware::PwmActuator::new(p.up, p.down, p.en)
        .map_err(|e| eyre::eyre!("open motor pins up={} down={} en={}: {e}", p.up, p.down, p.en))?;
    Ok(Backend {
        encoder: Box::new(encoder),
        actuator: Box::new(actuator),
        clock: Box::new(MonotonicClock::new()),
        magnet,
        magnitude,
    })
}

fn start_desk(cfg: &desk_config::Config, b: Backend, transport: ChannelTransport) -> Result<Desk> {
    Desk::builder()
        .with_config(cfg)
        .with_encoder(b.encoder)
        .with_actuator(b.actuator)
        .with_transport(transport)
        .with_store(FilePositionStore::new(&cfg.storage.position_file))
        .with_clock(b.clock)
        .build()
}

/// Run until `shutdown` is raised or `duration_s` elapses.
pub fn run(
    cfg: &desk_config::Config,
    duration_s: Option<u64>,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let b = backend(cfg, false)?;
    let (transport, handle) = channel_transport();
    let printer = spawn_printer(handle.clone(), json);
    spawn_stdin_feeder(handle);
    if let Some(secs) = duration_s {
        let s = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            s.store(true, Ordering::Relaxed);
        });
    }

    let mut desk = start_desk(cfg, b, transport)?;
    desk.run(&shutdown);
    drop(desk);
    // The printer ends once the transport is gone.
    if printer.join().is_err() {
        tracing::warn!("printer thread panicked");
    }
    Ok(())
}

fn spawn_printer(handle: TransportHandle, json: bool) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(msg) = handle.recv() {
            let payload = String::from_utf8_lossy(&msg.payload);
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "topic": msg.topic, "payload": payload })
                );
            } else {
                println!("{} {}", msg.topic, payload);
            }
        }
    })
}

/// Forward `topic payload` lines from stdin as inbound messages.
fn spawn_stdin_feeder(handle: TransportHandle) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (topic, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            if handle.send(topic, payload.trim()).is_err() {
                break;
            }
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotoOutcome {
    pub requested: u8,
    pub percent: u8,
    pub raw: i32,
    /// False when the desk was already at the requested percentage.
    pub moved: bool,
}

/// Drive to `percent` and return where the desk ended up.
pub fn goto(
    cfg: &desk_config::Config,
    percent: u8,
    timeout_s: u64,
    shutdown: &AtomicBool,
) -> Result<GotoOutcome> {
    let b = backend(cfg, true)?;
    let (transport, handle) = channel_transport();
    let mut desk = start_desk(cfg, b, transport)?;

    handle
        .send(desk.topics().set.clone(), percent.to_string())
        .map_err(|e| eyre::eyre!("queue position/set: {e}"))?;
    let moved = desk.run_until(|s| s.driving, Duration::from_secs(1));
    let finished = !moved
        || desk.run_until(
            |s| !s.driving || shutdown.load(Ordering::Relaxed),
            Duration::from_secs(timeout_s),
        );
    let interrupted = desk.is_driving() && shutdown.load(Ordering::Relaxed);
    desk.shutdown();

    if interrupted {
        eyre::bail!("move to {percent}% interrupted");
    }
    if !finished {
        eyre::bail!("move to {percent}% did not finish within {timeout_s}s");
    }
    let outcome = GotoOutcome {
        requested: percent,
        percent: desk.percent(),
        raw: desk.state().position,
        moved,
    };
    tracing::info!(?outcome, "goto complete");
    Ok(outcome)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfCheck {
    pub angle: u16,
    pub stored: Option<i32>,
    pub magnet: Option<MagnetStatus>,
    pub magnitude: Option<u16>,
}

impl SelfCheck {
    /// One-line magnet summary, or `None` when the encoder reports nothing.
    pub fn magnet_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(m) = self.magnet {
            parts.push(format!(
                "detected={} too_weak={} too_strong={}",
                m.detected, m.too_weak, m.too_strong
            ));
        }
        if let Some(mag) = self.magnitude {
            parts.push(format!("magnitude={mag}"));
        }
        (!parts.is_empty()).then(|| format!("magnet: {}", parts.join(" ")))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let magnet = self.magnet.map(|m| {
            serde_json::json!({
                "detected": m.detected,
                "too_weak": m.too_weak,
                "too_strong": m.too_strong,
            })
        });
        serde_json::json!({
            "ok": true,
            "angle": self.angle,
            "stored": self.stored,
            "magnet": magnet,
            "magnitude": self.magnitude,
        })
    }
}

/// Probe the encoder the same way startup does and read the store once.
pub fn self_check(cfg: &desk_config::Config) -> Result<SelfCheck> {
    let mut b = backend(cfg, true)?;
    let attempts = cfg.startup.read_attempts;
    let mut angle = None;
    for attempt in 1..=attempts {
        match b.encoder.read_angle() {
            Ok(a) => {
                angle = Some(a % 360);
                break;
            }
            Err(e) => {
                let err = desk_core::hw_error::map_hw_error(&*e);
                tracing::warn!(error = %err, attempt, "encoder read failed");
                if attempt < attempts {
                    b.clock.sleep(Duration::from_millis(cfg.startup.retry_ms));
                }
            }
        }
    }
    let angle = angle.ok_or_else(|| eyre::Report::new(DeskError::EncoderUnresponsive { attempts }))?;

    let path = &cfg.storage.position_file;
    let stored = FilePositionStore::new(path)
        .load_position()
        .map_err(|e| eyre::eyre!("read position store {path:?}: {e}"))?;
    Ok(SelfCheck {
        angle,
        stored,
        magnet: b.magnet,
        magnitude: b.magnitude,
    })
}
