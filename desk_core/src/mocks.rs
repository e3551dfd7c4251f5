//! Test and helper mocks for desk_core

use desk_traits::{BoxError, Message};

/// An encoder that never answers; startup against it fails fast.
pub struct DeadEncoder;

impl desk_traits::Encoder for DeadEncoder {
    fn read_angle(&mut self) -> Result<u16, BoxError> {
        Err(Box::new(std::io::Error::other("dead encoder")))
    }
}

/// A transport that accepts everything and never delivers a message.
#[derive(Debug, Default)]
pub struct NullTransport;

impl desk_traits::Transport for NullTransport {
    fn subscribe(&mut self, _topic: &str) -> Result<(), BoxError> {
        Ok(())
    }
    fn publish(&mut self, _topic: &str, _payload: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }
    fn poll(&mut self) -> Result<Option<Message>, BoxError> {
        Ok(None)
    }
    fn ping(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}
