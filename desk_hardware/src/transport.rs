//! Channel-backed transport.
//!
//! `ChannelTransport` is the half owned by the control loop; `TransportHandle`
//! is the half held by whatever feeds it (a network client thread, a stdin
//! reader, a test). Both directions are unbounded crossbeam channels so neither
//! side ever blocks the other.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel as xch;
use desk_traits::{BoxError, Message, Transport};

use crate::error::HwError;

pub struct ChannelTransport {
    inbound: xch::Receiver<Message>,
    outbound: xch::Sender<Message>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    pings: Arc<AtomicU64>,
}

#[derive(Clone)]
pub struct TransportHandle {
    inbound: xch::Sender<Message>,
    outbound: xch::Receiver<Message>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    pings: Arc<AtomicU64>,
}

/// Create a connected transport pair.
pub fn channel_transport() -> (ChannelTransport, TransportHandle) {
    let (in_tx, in_rx) = xch::unbounded();
    let (out_tx, out_rx) = xch::unbounded();
    let subscriptions = Arc::new(Mutex::new(Vec::new()));
    let pings = Arc::new(AtomicU64::new(0));
    (
        ChannelTransport {
            inbound: in_rx,
            outbound: out_tx,
            subscriptions: subscriptions.clone(),
            pings: pings.clone(),
        },
        TransportHandle {
            inbound: in_tx,
            outbound: out_rx,
            subscriptions,
            pings,
        },
    )
}

impl Transport for ChannelTransport {
    fn subscribe(&mut self, topic: &str) -> Result<(), BoxError> {
        if let Ok(mut subs) = self.subscriptions.lock() {
            subs.push(topic.to_string());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BoxError> {
        self.outbound
            .send(Message::new(topic, payload))
            .map_err(|_| Box::new(HwError::Disconnected) as BoxError)
    }

    fn poll(&mut self) -> Result<Option<Message>, BoxError> {
        match self.inbound.try_recv() {
            Ok(m) => Ok(Some(m)),
            // A vanished feeder simply means nothing more will arrive.
            Err(xch::TryRecvError::Empty | xch::TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn ping(&mut self) -> Result<(), BoxError> {
        self.pings.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl TransportHandle {
    /// Inject an inbound message as if it arrived from the broker.
    pub fn send(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Result<(), HwError> {
        self.inbound
            .send(Message::new(topic, payload))
            .map_err(|_| HwError::Disconnected)
    }

    /// Drain everything published so far.
    pub fn published(&self) -> Vec<Message> {
        self.outbound.try_iter().collect()
    }

    /// Block until the next published message arrives or the transport is dropped.
    pub fn recv(&self) -> Option<Message> {
        self.outbound.recv().ok()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn pings(&self) -> u64 {
        self.pings.load(Ordering::Relaxed)
    }
}
