//! Command dispatcher: turns inbound messages into targets.
//!
//! Messages are handled one at a time in delivery order. Anything that does
//! not parse is logged and dropped; valid but pointless requests (out of
//! range, already there) are dropped silently.

use desk_traits::Message;

use crate::config::MotionCfg;
use crate::state::DriverState;
use crate::topics::Topics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing changed.
    Ignored,
    /// A move toward `percent` began (or was retargeted).
    MoveStarted { percent: u8, target_position: i32 },
    /// Position was overwritten; persist and publish.
    Overridden { position: i32 },
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    topics: Topics,
}

impl Dispatcher {
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }

    pub fn handle(&self, state: &mut DriverState, motion: &MotionCfg, msg: &Message) -> Dispatch {
        let Ok(payload) = std::str::from_utf8(&msg.payload) else {
            tracing::warn!(topic = %msg.topic, "dropping non-UTF-8 payload");
            return Dispatch::Ignored;
        };
        let payload = payload.trim();

        if msg.topic == self.topics.set {
            match payload.parse::<i64>() {
                Ok(p) => set_percent(state, motion, p),
                Err(e) => {
                    tracing::warn!(topic = %msg.topic, payload, error = %e, "malformed position/set");
                    Dispatch::Ignored
                }
            }
        } else if msg.topic == self.topics.override_position {
            match payload.parse::<i32>() {
                Ok(raw) => {
                    state.position = raw;
                    state.target_position = raw;
                    state.target_percent = motion.percent_of(raw);
                    tracing::info!(position = raw, "position overridden");
                    Dispatch::Overridden { position: raw }
                }
                Err(e) => {
                    tracing::warn!(topic = %msg.topic, payload, error = %e, "malformed position/override");
                    Dispatch::Ignored
                }
            }
        } else if msg.topic == self.topics.switch {
            let percent = match payload {
                "ON" => motion.on_pos,
                "OFF" => motion.percent_of(motion.min_pos),
                other => {
                    tracing::warn!(topic = %msg.topic, payload = other, "unknown switch payload");
                    return Dispatch::Ignored;
                }
            };
            set_percent(state, motion, i64::from(percent))
        } else {
            tracing::debug!(topic = %msg.topic, "ignoring unknown topic");
            Dispatch::Ignored
        }
    }
}

fn set_percent(state: &mut DriverState, motion: &MotionCfg, requested: i64) -> Dispatch {
    let Ok(percent) = u8::try_from(requested) else {
        tracing::debug!(requested, "position/set out of range");
        return Dispatch::Ignored;
    };
    if percent > 100 {
        tracing::debug!(requested, "position/set out of range");
        return Dispatch::Ignored;
    }
    if percent == state.percent(motion) {
        tracing::debug!(percent, "already at requested position");
        return Dispatch::Ignored;
    }

    let goal = motion.raw_of(percent);
    state.target_percent = percent;
    state.direction = goal > state.position;
    state.target_position = if state.direction {
        goal + motion.buffer_deg
    } else {
        goal - motion.buffer_deg
    };
    state.driving = true;
    tracing::info!(
        percent,
        position = state.position,
        target = state.target_position,
        up = state.direction,
        "move started"
    );
    Dispatch::MoveStarted {
        percent,
        target_position: state.target_position,
    }
}
