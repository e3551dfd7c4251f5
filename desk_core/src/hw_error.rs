//! Maps `Box<dyn Error>` from trait boundaries to typed `DeskError`.
//!
//! The traits in `desk_traits` use `Box<dyn Error + Send + Sync>` so adapters
//! can return whatever they like; this module converts those to our typed
//! enum, with an optional feature-gated path for `desk_hardware::HwError`.

use crate::error::DeskError;

/// Map a trait-boundary error to a typed `DeskError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DeskError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<desk_hardware::HwError>() {
            return match hw {
                desk_hardware::HwError::Timeout => DeskError::Timeout,
                desk_hardware::HwError::Disconnected => DeskError::Transport(hw.to_string()),
                desk_hardware::HwError::Io(_) => DeskError::Storage(hw.to_string()),
                other => DeskError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        DeskError::Timeout
    } else {
        DeskError::Hardware(s)
    }
}
