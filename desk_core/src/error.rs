use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeskError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for encoder")]
    Timeout,
    #[error("encoder unresponsive after {attempts} attempts")]
    EncoderUnresponsive { attempts: u32 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing encoder")]
    MissingEncoder,
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing transport")]
    MissingTransport,
    #[error("missing position store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
