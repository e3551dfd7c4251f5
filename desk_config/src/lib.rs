#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the desk controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section except `[mqtt]` has defaults matching the stock desk, so a
//!   minimal file only names the broker.
use serde::Deserialize;
use std::path::Path;

/// Travel limits and speed profile. Positions are cumulative encoder degrees,
/// speeds are PWM duty percentages.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Motion {
    pub min_pos: i32,
    /// Position that maps to 100%.
    pub max_pos: i32,
    pub min_speed: u8,
    pub max_speed: u8,
    /// Max duty increase per controller tick.
    pub accel: u8,
    /// Max duty decrease per controller tick.
    pub decel: u8,
    pub crawl_speed: u8,
    /// Percentage driven to by `switch ON`.
    pub on_pos: u8,
    /// Dead-band half-width and overshoot buffer (degrees).
    pub buffer_deg: i32,
    /// Remaining distance above which the planner uses full speed.
    pub coarse_threshold_deg: i32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            min_pos: 0,
            max_pos: 1800,
            min_speed: 30,
            max_speed: 100,
            accel: 10,
            decel: 20,
            crawl_speed: 40,
            on_pos: 100,
            buffer_deg: 20,
            coarse_threshold_deg: 400,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Estimator {
    /// Samples fused into one reading.
    pub window: usize,
    /// Deltas below this (degrees) count as "no motion".
    pub stall_delta_deg: u16,
    /// Consecutive no-motion readings tolerated before declaring a stall.
    pub stall_ticks: u32,
    /// Clear the stall counter whenever real motion is observed.
    pub stall_reset_on_motion: bool,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            window: 5,
            stall_delta_deg: 5,
            stall_ticks: 8,
            stall_reset_on_motion: true,
        }
    }
}

/// Task periods in milliseconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    pub estimator_fast_ms: u64,
    pub estimator_slow_ms: u64,
    pub planner_fast_ms: u64,
    pub planner_slow_ms: u64,
    pub controller_fast_ms: u64,
    pub controller_slow_ms: u64,
    pub inbox_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            estimator_fast_ms: 25,
            estimator_slow_ms: 1000,
            planner_fast_ms: 10,
            planner_slow_ms: 1000,
            controller_fast_ms: 100,
            controller_slow_ms: 1000,
            inbox_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Mqtt {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub base_topic: String,
    #[serde(default = "default_keepalive")]
    pub keepalive_sec: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    10
}

/// Pin and bus identifiers; only the hardware adapters look at these.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    pub up: u8,
    pub down: u8,
    pub en: u8,
    pub i2c_bus: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            up: 5,
            down: 6,
            en: 13,
            i2c_bus: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Status {
    /// Forced status publish interval.
    pub interval_sec: u64,
}

impl Default for Status {
    fn default() -> Self {
        Self { interval_sec: 300 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Storage {
    pub position_file: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            position_file: "position.txt".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Startup {
    /// Encoder reads attempted before giving up on initialization.
    pub read_attempts: u32,
    pub retry_ms: u64,
}

impl Default for Startup {
    fn default() -> Self {
        Self {
            read_attempts: 10,
            retry_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub mqtt: Mqtt,
    #[serde(default)]
    pub motion: Motion,
    #[serde(default)]
    pub estimator: Estimator,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub startup: Startup,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let m = &self.motion;

        // Motion
        if m.max_pos <= m.min_pos {
            eyre::bail!("motion.max_pos must be > motion.min_pos");
        }
        if m.min_speed == 0 {
            eyre::bail!("motion.min_speed must be > 0");
        }
        if m.max_speed > 100 {
            eyre::bail!("motion.max_speed must be <= 100");
        }
        if !(m.min_speed <= m.crawl_speed && m.crawl_speed <= m.max_speed) {
            eyre::bail!("motion speeds must satisfy min_speed <= crawl_speed <= max_speed");
        }
        if m.accel == 0 {
            eyre::bail!("motion.accel must be > 0");
        }
        if m.decel == 0 {
            eyre::bail!("motion.decel must be > 0");
        }
        if m.on_pos > 100 {
            eyre::bail!("motion.on_pos must be a percentage in [0, 100]");
        }
        if m.buffer_deg < 0 {
            eyre::bail!("motion.buffer_deg must be >= 0");
        }
        if m.coarse_threshold_deg < 0 {
            eyre::bail!("motion.coarse_threshold_deg must be >= 0");
        }

        // Estimator
        if self.estimator.window == 0 {
            eyre::bail!("estimator.window must be >= 1");
        }
        if self.estimator.stall_delta_deg >= 180 {
            eyre::bail!("estimator.stall_delta_deg must be < 180");
        }

        // Timing
        let t = &self.timing;
        for (name, v) in [
            ("estimator_fast_ms", t.estimator_fast_ms),
            ("estimator_slow_ms", t.estimator_slow_ms),
            ("planner_fast_ms", t.planner_fast_ms),
            ("planner_slow_ms", t.planner_slow_ms),
            ("controller_fast_ms", t.controller_fast_ms),
            ("controller_slow_ms", t.controller_slow_ms),
            ("inbox_ms", t.inbox_ms),
        ] {
            if v == 0 {
                eyre::bail!("timing.{name} must be >= 1");
            }
        }

        // Transport
        if self.mqtt.server.trim().is_empty() {
            eyre::bail!("mqtt.server must not be empty");
        }
        if self.mqtt.base_topic.trim().is_empty() {
            eyre::bail!("mqtt.base_topic must not be empty");
        }
        if self.mqtt.keepalive_sec == 0 {
            eyre::bail!("mqtt.keepalive_sec must be >= 1");
        }

        // Status / storage / startup
        if self.status.interval_sec == 0 {
            eyre::bail!("status.interval_sec must be >= 1");
        }
        if self.storage.position_file.trim().is_empty() {
            eyre::bail!("storage.position_file must not be empty");
        }
        if self.startup.read_attempts == 0 {
            eyre::bail!("startup.read_attempts must be >= 1");
        }

        Ok(())
    }
}
