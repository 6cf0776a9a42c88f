//! In-process stand-in for a real protocol engine.
//!
//! Devices registered on the active session come online on the next poll
//! tick and answer every query with canned reports. Addresses that were
//! never registered behave like silent hardware: queries time out after the
//! configured reply latency. A command with a forced checksum is answered
//! with a NAK, which is what conformant peripherals do.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle};

use super::{
    command::Command,
    events::EventPublisher,
    reply::{
        ConnectionStatus, DeviceCapabilities, DeviceCapability, DeviceIdentification,
        InputStatus, LocalStatus, Nak, NakErrorCode, OutputStatus,
    },
    DeviceSpec, Engine, SessionId, TransportConfig,
};

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Delay before a query resolves (or times out).
    pub reply_latency: Duration,
    /// Interval of the background poller that brings devices online.
    pub poll_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            reply_latency: Duration::from_millis(200),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
struct SimulatedDevice {
    spec: DeviceSpec,
    online: bool,
}

impl SimulatedDevice {
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: self.online,
            is_secure_channel_established: self.online
                && self.spec.use_secure_channel
                && self.spec.secure_channel_key.is_some(),
        }
    }
}

#[derive(Default)]
struct SimulatorState {
    session: Option<(SessionId, TransportConfig)>,
    devices: BTreeMap<u8, SimulatedDevice>,
    poller: Option<JoinHandle<()>>,
}

pub struct SimulatedEngine {
    runtime: Handle,
    publisher: EventPublisher,
    config: SimulatorConfig,
    state: Arc<Mutex<SimulatorState>>,
}

impl SimulatedEngine {
    pub fn new(runtime: Handle, publisher: EventPublisher, config: SimulatorConfig) -> Self {
        Self {
            runtime,
            publisher,
            config,
            state: Arc::new(Mutex::new(SimulatorState::default())),
        }
    }

    /// Transport of the currently open session, if any.
    pub fn active_transport(&self) -> Option<TransportConfig> {
        self.state
            .lock()
            .session
            .as_ref()
            .map(|(_, transport)| transport.clone())
    }

    fn ensure_session(state: &SimulatorState, session: SessionId) -> Result<()> {
        match &state.session {
            Some((active, _)) if *active == session => Ok(()),
            _ => Err(anyhow!("Connection {session} is not open")),
        }
    }

    /// Wait out the reply latency, then check the device is there to answer.
    async fn await_reply(&self, session: SessionId, address: u8) -> Result<DeviceSpec> {
        tokio::time::sleep(self.config.reply_latency).await;
        let state = self.state.lock();
        Self::ensure_session(&state, session)?;
        match state.devices.get(&address) {
            Some(device) => Ok(device.spec.clone()),
            None => bail!("Timeout waiting for reply from address {address}"),
        }
    }

    fn spawn_poller(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let publisher = self.publisher.clone();
        let interval = self.config.poll_interval;

        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let came_online: Vec<(u8, ConnectionStatus)> = {
                    let mut state = state.lock();
                    state
                        .devices
                        .iter_mut()
                        .filter(|(_, device)| !device.online)
                        .map(|(address, device)| {
                            device.online = true;
                            (*address, device.status())
                        })
                        .collect()
                };
                for (address, status) in came_online {
                    publisher.connection_status(address, status);
                }
            }
        })
    }
}

#[async_trait]
impl Engine for SimulatedEngine {
    fn start_connection(&self, transport: TransportConfig) -> Result<SessionId> {
        let session = SessionId::new();
        let poller = self.spawn_poller();

        let mut state = self.state.lock();
        if let Some(previous) = state.poller.replace(poller) {
            previous.abort();
        }
        state.devices.clear();
        state.session = Some((session, transport.clone()));
        log::info!("simulator: opened {transport} as connection {session}");
        Ok(session)
    }

    fn shutdown(&self) {
        let offline: Vec<u8> = {
            let mut state = self.state.lock();
            if let Some(poller) = state.poller.take() {
                poller.abort();
            }
            if let Some((session, _)) = state.session.take() {
                log::info!("simulator: closed connection {session}");
            }
            let offline = state
                .devices
                .iter()
                .filter(|(_, device)| device.online)
                .map(|(address, _)| *address)
                .collect();
            state.devices.clear();
            offline
        };
        for address in offline {
            self.publisher
                .connection_status(address, ConnectionStatus::default());
        }
    }

    fn add_device(&self, session: SessionId, device: DeviceSpec) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_session(&state, session)?;
        log::debug!("simulator: polling address {}", device.address);
        state.devices.insert(
            device.address,
            SimulatedDevice {
                spec: device,
                online: false,
            },
        );
        Ok(())
    }

    fn remove_device(&self, session: SessionId, address: u8) -> Result<()> {
        let removed = {
            let mut state = self.state.lock();
            Self::ensure_session(&state, session)?;
            state.devices.remove(&address)
        };
        if removed.is_some_and(|device| device.online) {
            self.publisher
                .connection_status(address, ConnectionStatus::default());
        }
        Ok(())
    }

    async fn device_capabilities(
        &self,
        session: SessionId,
        address: u8,
    ) -> Result<DeviceCapabilities> {
        let spec = self.await_reply(session, address).await?;
        let capability = |function: &str, compliance: u8, number_of: u8| DeviceCapability {
            function: function.to_string(),
            compliance,
            number_of,
        };
        Ok(DeviceCapabilities {
            capabilities: vec![
                capability("ContactStatusMonitoring", 1, 4),
                capability("OutputControl", 1, 2),
                capability("CardDataFormat", 1, 0),
                capability("CheckCharacterSupport", u8::from(spec.use_crc), 0),
                capability("CommunicationSecurity", u8::from(spec.use_secure_channel), 0),
            ],
        })
    }

    async fn id_report(&self, session: SessionId, address: u8) -> Result<DeviceIdentification> {
        self.await_reply(session, address).await?;
        Ok(DeviceIdentification {
            vendor_code: [0x5C, 0x26, 0x23],
            model_number: 1,
            version: 1,
            serial_number: 0x0100_0000 | u32::from(address),
            firmware: (1, 0, 0),
        })
    }

    async fn input_status(&self, session: SessionId, address: u8) -> Result<InputStatus> {
        self.await_reply(session, address).await?;
        Ok(InputStatus {
            inputs: vec![false; 4],
        })
    }

    async fn local_status(&self, session: SessionId, address: u8) -> Result<LocalStatus> {
        self.await_reply(session, address).await?;
        Ok(LocalStatus::default())
    }

    async fn output_status(&self, session: SessionId, address: u8) -> Result<OutputStatus> {
        self.await_reply(session, address).await?;
        Ok(OutputStatus {
            outputs: vec![false; 2],
        })
    }

    async fn send_custom_command(&self, session: SessionId, command: Command) -> Result<()> {
        self.await_reply(session, command.address).await?;
        if command.has_bad_checksum() {
            self.publisher
                .nak(command.address, Nak::new(NakErrorCode::BadChecksumOrCrc));
        }
        Ok(())
    }
}
