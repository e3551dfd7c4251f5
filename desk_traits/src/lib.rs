//! Collaborator interfaces of the desk controller.
//!
//! The core never talks to hardware, the network or the filesystem directly;
//! everything goes through these traits so the control loops can be exercised
//! against simulated parts.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rotary magnetic encoder mounted on the actuator shaft.
pub trait Encoder {
    /// Current shaft angle in whole degrees, `[0, 360)`.
    fn read_angle(&mut self) -> Result<u16, BoxError>;
}

/// Bidirectional DC drive. Speeds are duty percentages in `[0, 100]`.
pub trait Actuator {
    fn drive_up(&mut self, speed: u8) -> Result<(), BoxError>;
    fn drive_down(&mut self, speed: u8) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
}

/// One inbound publish/subscribe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe transport. Connection management lives behind this trait.
pub trait Transport {
    fn subscribe(&mut self, topic: &str) -> Result<(), BoxError>;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BoxError>;
    /// Non-blocking: returns `Ok(None)` when nothing is pending.
    fn poll(&mut self) -> Result<Option<Message>, BoxError>;
    fn ping(&mut self) -> Result<(), BoxError>;
}

/// Durable storage of the single persisted position value.
pub trait PositionStore {
    /// `Ok(None)` when nothing (valid) has been stored yet.
    fn load_position(&mut self) -> Result<Option<i32>, BoxError>;
    fn store_position(&mut self, position: i32) -> Result<(), BoxError>;
}

impl<T: Encoder + ?Sized> Encoder for Box<T> {
    fn read_angle(&mut self) -> Result<u16, BoxError> {
        (**self).read_angle()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn drive_up(&mut self, speed: u8) -> Result<(), BoxError> {
        (**self).drive_up(speed)
    }
    fn drive_down(&mut self, speed: u8) -> Result<(), BoxError> {
        (**self).drive_down(speed)
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn subscribe(&mut self, topic: &str) -> Result<(), BoxError> {
        (**self).subscribe(topic)
    }
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BoxError> {
        (**self).publish(topic, payload)
    }
    fn poll(&mut self) -> Result<Option<Message>, BoxError> {
        (**self).poll()
    }
    fn ping(&mut self) -> Result<(), BoxError> {
        (**self).ping()
    }
}

impl<T: PositionStore + ?Sized> PositionStore for Box<T> {
    fn load_position(&mut self) -> Result<Option<i32>, BoxError> {
        (**self).load_position()
    }
    fn store_position(&mut self, position: i32) -> Result<(), BoxError> {
        (**self).store_position(position)
    }
}
