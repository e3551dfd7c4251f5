//! Adapters behind the `desk_traits` interfaces.
//!
//! - `sim`: simulated desk plant (encoder + actuator) for development and tests
//! - `store`: file and in-memory position stores
//! - `transport`: channel-backed publish/subscribe transport
//! - `as5600` / `pwm`: real encoder and motor drive (`hardware` feature)
pub mod as5600;
pub mod error;
pub mod pwm;
pub mod sim;
pub mod store;
pub mod transport;

pub use error::HwError;
pub use sim::{ActuatorCommand, PlantCfg, SimulatedActuator, SimulatedDesk, SimulatedEncoder};
pub use store::{FilePositionStore, MemoryStore};
pub use transport::{ChannelTransport, TransportHandle, channel_transport};

#[cfg(feature = "hardware")]
pub use as5600::As5600Encoder;
#[cfg(feature = "hardware")]
pub use pwm::PwmActuator;
