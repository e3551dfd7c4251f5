//! Status publisher: reports ON/OFF, percentage and raw position.

use desk_traits::Transport;

use crate::config::MotionCfg;
use crate::hw_error::map_hw_error;
use crate::state::DriverState;
use crate::topics::Topics;

/// What gets published, derived from `DriverState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub percent: u8,
    pub raw: i32,
}

impl StatusSnapshot {
    pub fn of(state: &DriverState, motion: &MotionCfg) -> Self {
        Self {
            percent: state.percent(motion),
            raw: state.position,
        }
    }

    pub fn is_on(&self) -> bool {
        self.percent > 0
    }
}

#[derive(Debug, Clone)]
pub struct StatusPublisher {
    topics: Topics,
}

impl StatusPublisher {
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }

    /// Publish all three topics; returns how many succeeded.
    pub fn publish(&self, transport: &mut dyn Transport, snap: StatusSnapshot) -> usize {
        let status = if snap.is_on() { "ON" } else { "OFF" };
        let percent = snap.percent.to_string();
        let raw = snap.raw.to_string();
        [
            (self.topics.status.as_str(), status),
            (self.topics.position.as_str(), percent.as_str()),
            (self.topics.raw_position.as_str(), raw.as_str()),
        ]
        .into_iter()
        .filter(|(topic, payload)| match transport.publish(topic, payload.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(topic, error = %err, "publish failed");
                false
            }
        })
        .count()
    }
}
