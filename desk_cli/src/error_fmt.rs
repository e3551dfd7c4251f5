//! Human-readable error descriptions and structured JSON error formatting.

use desk_core::error::{BuildError, DeskError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => {
                "What happened: No encoder was provided to the desk controller.\nLikely causes: The AS5600 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the encoder is created successfully and passed via with_encoder(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No motor driver was provided to the desk controller.\nLikely causes: Motor pins failed to initialize or were not wired into the builder.\nHow to fix: Ensure the actuator is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingTransport => {
                "What happened: No message transport was provided.\nLikely causes: The broker connection was not set up before building the desk.\nHow to fix: Pass a transport via with_transport(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No position store was provided.\nLikely causes: The builder was not given storage for the last known position.\nHow to fix: Pass a store via with_store(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/desk_config.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DeskError>() {
        return match de {
            DeskError::EncoderUnresponsive { attempts } => format!(
                "What happened: The encoder did not answer after {attempts} attempts; the desk was not started.\nLikely causes: AS5600 not powered, wrong I2C bus, or magnet missing.\nHow to fix: Check wiring and [pins].i2c_bus, run `deskctl self-check`, or raise [startup].read_attempts."
            ),
            DeskError::Config(msg) => format!(
                "What happened: The config could not be loaded.\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nDetails: {msg}\nHow to fix: Edit the config file (see etc/desk_config.toml) and try again."
            ),
            DeskError::Timeout => {
                "What happened: Encoder read timed out.\nLikely causes: Loose I2C wiring or bus contention.\nHow to fix: Verify SDA/SCL and power, then rerun.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open as5600") {
        return format!(
            "What happened: Failed to open the AS5600 encoder.\nLikely causes: I2C disabled, wrong bus number, or insufficient permissions.\nHow to fix: Enable I2C, fix [pins].i2c_bus, and check access to /dev/i2c-*. Original: {msg}"
        );
    }

    if lower.contains("open motor pins") {
        return "What happened: Failed to initialize motor pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("did not finish within") {
        return format!(
            "What happened: {msg}.\nLikely causes: Desk blocked, or timeout too short for the travel.\nHow to fix: Check for obstructions or pass a larger --timeout-s."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 for config problems, 3 for an unresponsive encoder, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some_and(|b| matches!(b, BuildError::InvalidConfig(_))) {
        return 2;
    }
    match err.downcast_ref::<DeskError>() {
        Some(DeskError::Config(_)) => 2,
        Some(DeskError::EncoderUnresponsive { .. }) => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            _ => "Build",
        };
    }
    match err.downcast_ref::<DeskError>() {
        Some(DeskError::Config(_)) => "Config",
        Some(DeskError::EncoderUnresponsive { .. }) => "EncoderUnresponsive",
        Some(DeskError::Timeout) => "Timeout",
        Some(_) => "Hardware",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({ "reason": reason_name(err), "message": humanize(err) });
    if let Some(DeskError::EncoderUnresponsive { attempts }) = err.downcast_ref::<DeskError>() {
        obj["details"] = json!({ "attempts": attempts });
    }
    obj.to_string()
}
