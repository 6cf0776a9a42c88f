//! Typed publish/subscribe channels for engine notifications.
//!
//! Each reply kind travels over its own flume channel. The engine keeps the
//! [`EventPublisher`] (it is `Clone` so background pollers can hold a copy)
//! and the console's event correlator owns the [`EventSubscriptions`].
//!
//! Every reply is stamped from one counter shared by all publisher clones,
//! so a consumer draining several channels can restore arrival order.

use flume::{Receiver, Sender};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::reply::{ConnectionStatus, InputStatus, LocalStatus, Nak, OutputStatus, RawCardData};

/// A reply tagged with the address of the device that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<T> {
    pub address: u8,
    pub payload: T,
    /// Publish order across every event kind.
    pub sequence: u64,
}

impl<T> Reply<T> {
    pub fn new(address: u8, payload: T, sequence: u64) -> Self {
        Self {
            address,
            payload,
            sequence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventPublisher {
    pub connection_status: Sender<Reply<ConnectionStatus>>,
    pub nak: Sender<Reply<Nak>>,
    pub local_status: Sender<Reply<LocalStatus>>,
    pub input_status: Sender<Reply<InputStatus>>,
    pub output_status: Sender<Reply<OutputStatus>>,
    pub raw_card_data: Sender<Reply<RawCardData>>,
    sequence: Arc<AtomicU64>,
}

#[derive(Debug)]
pub struct EventSubscriptions {
    pub connection_status: Receiver<Reply<ConnectionStatus>>,
    pub nak: Receiver<Reply<Nak>>,
    pub local_status: Receiver<Reply<LocalStatus>>,
    pub input_status: Receiver<Reply<InputStatus>>,
    pub output_status: Receiver<Reply<OutputStatus>>,
    pub raw_card_data: Receiver<Reply<RawCardData>>,
}

/// Create a connected publisher/subscriptions pair with unbounded channels.
pub fn channel() -> (EventPublisher, EventSubscriptions) {
    let (connection_status_tx, connection_status_rx) = flume::unbounded();
    let (nak_tx, nak_rx) = flume::unbounded();
    let (local_status_tx, local_status_rx) = flume::unbounded();
    let (input_status_tx, input_status_rx) = flume::unbounded();
    let (output_status_tx, output_status_rx) = flume::unbounded();
    let (raw_card_data_tx, raw_card_data_rx) = flume::unbounded();

    (
        EventPublisher {
            connection_status: connection_status_tx,
            nak: nak_tx,
            local_status: local_status_tx,
            input_status: input_status_tx,
            output_status: output_status_tx,
            raw_card_data: raw_card_data_tx,
            sequence: Arc::new(AtomicU64::new(0)),
        },
        EventSubscriptions {
            connection_status: connection_status_rx,
            nak: nak_rx,
            local_status: local_status_rx,
            input_status: input_status_rx,
            output_status: output_status_rx,
            raw_card_data: raw_card_data_rx,
        },
    )
}

impl EventPublisher {
    fn publish<T>(&self, sender: &Sender<Reply<T>>, kind: &str, address: u8, payload: T) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        if sender.send(Reply::new(address, payload, sequence)).is_err() {
            log::trace!("dropping {kind} event for address {address}: no subscriber");
        }
    }

    pub fn connection_status(&self, address: u8, status: ConnectionStatus) {
        self.publish(&self.connection_status, "connection status", address, status);
    }

    pub fn nak(&self, address: u8, nak: Nak) {
        self.publish(&self.nak, "nak", address, nak);
    }

    pub fn local_status(&self, address: u8, status: LocalStatus) {
        self.publish(&self.local_status, "local status", address, status);
    }

    pub fn input_status(&self, address: u8, status: InputStatus) {
        self.publish(&self.input_status, "input status", address, status);
    }

    pub fn output_status(&self, address: u8, status: OutputStatus) {
        self.publish(&self.output_status, "output status", address, status);
    }

    pub fn raw_card_data(&self, address: u8, data: RawCardData) {
        self.publish(&self.raw_card_data, "raw card data", address, data);
    }
}
