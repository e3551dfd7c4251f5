//! Position persistence glue. Storage problems are never fatal.

use desk_traits::PositionStore;

use crate::config::MotionCfg;
use crate::hw_error::map_hw_error;
use crate::state::DriverState;

/// Persisted position, or 0 when absent or unreadable.
pub fn load_position(store: &mut dyn PositionStore) -> i32 {
    match store.load_position() {
        Ok(Some(p)) => {
            tracing::info!(position = p, "restored persisted position");
            p
        }
        Ok(None) => {
            tracing::info!("no persisted position; starting at 0");
            0
        }
        Err(e) => {
            let err = map_hw_error(&*e);
            tracing::warn!(error = %err, "position store unreadable; starting at 0");
            0
        }
    }
}

/// Clamp the position to `min_pos` and write it; returns whether the write landed.
pub fn persist(state: &mut DriverState, motion: &MotionCfg, store: &mut dyn PositionStore) -> bool {
    let value = state.clamp_for_storage(motion);
    match store.store_position(value) {
        Ok(()) => {
            tracing::debug!(position = value, "position persisted");
            true
        }
        Err(e) => {
            let err = map_hw_error(&*e);
            tracing::warn!(error = %err, position = value, "failed to persist position");
            false
        }
    }
}
