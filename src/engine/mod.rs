//! Protocol engine seam
//!
//! The engine owns everything below the operator console: framing,
//! checksums, polling, the secure-channel handshake and reply timeouts.
//! The console only talks to it through the [`Engine`] trait and the typed
//! event channels in [`events`].

pub mod command;
pub mod events;
pub mod reply;
pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use command::Command;
pub use events::{EventPublisher, EventSubscriptions, Reply};
pub use reply::{
    ConnectionStatus, DeviceCapabilities, DeviceCapability, DeviceIdentification, InputStatus,
    LocalStatus, Nak, NakErrorCode, OutputStatus, RawCardData,
};
pub use simulated::SimulatedEngine;

/// Opaque identifier of one transport session handed out by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical transport used for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Serial { port_name: String, baud_rate: u32 },
    TcpServer { port_number: u16, baud_rate: u32 },
}

impl fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportConfig::Serial {
                port_name,
                baud_rate,
            } => write!(f, "serial {port_name} @ {baud_rate} baud"),
            TransportConfig::TcpServer {
                port_number,
                baud_rate,
            } => write!(f, "tcp server :{port_number} @ {baud_rate} baud"),
        }
    }
}

/// Per-device parameters the engine needs to poll an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub address: u8,
    pub use_crc: bool,
    pub use_secure_channel: bool,
    pub secure_channel_key: Option<Vec<u8>>,
}

/// Operations the console consumes from the protocol engine.
///
/// Session and device registration calls are synchronous and cheap; the
/// engine's poller picks the changes up in the background. Queries go out
/// on the wire and resolve when the device replies or the engine gives up.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a transport and start polling on it.
    fn start_connection(&self, transport: TransportConfig) -> Result<SessionId>;

    /// Tear down every open session. Must be a no-op when nothing is open.
    fn shutdown(&self);

    fn add_device(&self, session: SessionId, device: DeviceSpec) -> Result<()>;

    fn remove_device(&self, session: SessionId, address: u8) -> Result<()>;

    async fn device_capabilities(
        &self,
        session: SessionId,
        address: u8,
    ) -> Result<DeviceCapabilities>;

    async fn id_report(&self, session: SessionId, address: u8) -> Result<DeviceIdentification>;

    async fn input_status(&self, session: SessionId, address: u8) -> Result<InputStatus>;

    async fn local_status(&self, session: SessionId, address: u8) -> Result<LocalStatus>;

    async fn output_status(&self, session: SessionId, address: u8) -> Result<OutputStatus>;

    /// Send a raw command object as-is, including deliberately malformed ones.
    async fn send_custom_command(&self, session: SessionId, command: Command) -> Result<()>;
}
