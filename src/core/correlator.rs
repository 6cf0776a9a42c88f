//! Correlation of engine reply events into operator notices.
//!
//! The correlator owns the receiving side of every event channel and is
//! drained from the interactive loop, so its NAK filter state is only ever
//! touched from that loop.
//!
//! Status and card-data replies are always shown. NAKs go through a filter
//! holding the single most recent `(address, error code)` pair across all
//! devices: a NAK identical to the one right before it is suppressed, and
//! any NAK (shown or not) replaces the remembered pair.

use crate::{
    core::bus::Notice,
    engine::{
        ConnectionStatus, EventSubscriptions, InputStatus, LocalStatus, Nak, NakErrorCode,
        OutputStatus, RawCardData, Reply,
    },
};

/// What a drained event turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlated {
    Show(Notice),
    /// Device link state changed; recorded but never shown as a dialog.
    ConnectionChanged {
        address: u8,
        status: ConnectionStatus,
    },
}

#[derive(Debug, Default)]
pub struct NakFilter {
    last: Option<(u8, NakErrorCode)>,
}

impl NakFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the NAK and report whether it should be displayed.
    pub fn admit(&mut self, address: u8, error_code: NakErrorCode) -> bool {
        let current = (address, error_code);
        let repeated = self.last == Some(current);
        self.last = Some(current);
        !repeated
    }

    pub fn last(&self) -> Option<(u8, NakErrorCode)> {
        self.last
    }
}

pub struct EventCorrelator {
    subscriptions: EventSubscriptions,
    nak_filter: NakFilter,
}

impl EventCorrelator {
    pub fn new(subscriptions: EventSubscriptions) -> Self {
        Self {
            subscriptions,
            nak_filter: NakFilter::new(),
        }
    }

    pub fn nak_filter(&self) -> &NakFilter {
        &self.nak_filter
    }

    /// Take every event queued so far and correlate it, in publish order
    /// across all event kinds.
    pub fn drain(&mut self) -> Vec<Correlated> {
        let mut out: Vec<(u64, Correlated)> = Vec::new();

        for event in self.subscriptions.connection_status.try_iter() {
            out.push((event.sequence, on_connection_status(event)));
        }
        let naks: Vec<Reply<Nak>> = self.subscriptions.nak.try_iter().collect();
        for event in naks {
            let sequence = event.sequence;
            if let Some(notice) = self.on_nak(event) {
                out.push((sequence, Correlated::Show(notice)));
            }
        }
        for event in self.subscriptions.local_status.try_iter() {
            out.push((event.sequence, Correlated::Show(on_local_status(event))));
        }
        for event in self.subscriptions.input_status.try_iter() {
            out.push((event.sequence, Correlated::Show(on_input_status(event))));
        }
        for event in self.subscriptions.output_status.try_iter() {
            out.push((event.sequence, Correlated::Show(on_output_status(event))));
        }
        for event in self.subscriptions.raw_card_data.try_iter() {
            out.push((event.sequence, Correlated::Show(on_raw_card_data(event))));
        }

        out.sort_by_key(|(sequence, _)| *sequence);
        out.into_iter().map(|(_, item)| item).collect()
    }

    pub fn on_nak(&mut self, event: Reply<Nak>) -> Option<Notice> {
        if !self.nak_filter.admit(event.address, event.payload.error_code) {
            log::debug!(
                "suppressing repeated NAK {:?} from address {}",
                event.payload.error_code,
                event.address
            );
            return None;
        }
        log::warn!(
            "NAK {:?} from address {}",
            event.payload.error_code,
            event.address
        );
        Some(Notice::message(
            format!("!!! Received NAK reply for address {} !!!", event.address),
            event.payload.to_string(),
        ))
    }
}

fn on_connection_status(event: Reply<ConnectionStatus>) -> Correlated {
    log::info!("Device {} is {}", event.address, event.payload);
    Correlated::ConnectionChanged {
        address: event.address,
        status: event.payload,
    }
}

fn on_local_status(event: Reply<LocalStatus>) -> Notice {
    Notice::message(
        format!("Local status updated for address {}", event.address),
        event.payload.to_string(),
    )
}

fn on_input_status(event: Reply<InputStatus>) -> Notice {
    Notice::message(
        format!("Input status updated for address {}", event.address),
        event.payload.to_string(),
    )
}

fn on_output_status(event: Reply<OutputStatus>) -> Notice {
    Notice::message(
        format!("Output status updated for address {}", event.address),
        event.payload.to_string(),
    )
}

fn on_raw_card_data(event: Reply<RawCardData>) -> Notice {
    Notice::message(
        format!("Received raw card data reply for address {}", event.address),
        event.payload.to_string(),
    )
}
