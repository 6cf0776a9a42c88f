#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{runtime::Handle, sync::Notify};

use osdp_console::{
    core::{notice_channel, Controller, DeviceForm, LogBuffer, Notice, Settings, SettingsStore},
    engine::{
        events, Command, DeviceCapabilities, DeviceIdentification, DeviceSpec, Engine,
        EventPublisher, InputStatus, LocalStatus, OutputStatus, SessionId, TransportConfig,
    },
};

/// Every engine call the console made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Shutdown,
    StartConnection(TransportConfig),
    AddDevice(SessionId, DeviceSpec),
    RemoveDevice(SessionId, u8),
    Query(&'static str, u8),
    Custom(Command),
}

/// Engine double that records calls and can be scripted to fail.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    unresponsive: Mutex<HashSet<u8>>,
    rejected: Mutex<HashSet<u8>>,
    faulty: Mutex<HashSet<u8>>,
    held: Mutex<HashSet<u8>>,
    release: Notify,
    fail_start: Mutex<bool>,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queries to `address` time out.
    pub fn set_unresponsive(&self, address: u8) {
        self.unresponsive.lock().insert(address);
    }

    /// `add_device` for `address` is refused.
    pub fn reject_device(&self, address: u8) {
        self.rejected.lock().insert(address);
    }

    /// Queries and commands to `address` panic inside the engine.
    pub fn set_faulty(&self, address: u8) {
        self.faulty.lock().insert(address);
    }

    /// Queries to `address` wait until [`Self::release_one`] is called.
    pub fn hold_replies(&self, address: u8) {
        self.held.lock().insert(address);
    }

    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn fail_next_start(&self) {
        *self.fail_start.lock() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    async fn reply<T: Send>(&self, name: &'static str, address: u8, value: T) -> Result<T> {
        self.record(Call::Query(name, address));
        let held = self.held.lock().contains(&address);
        if held {
            self.release.notified().await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.faulty.lock().contains(&address) {
            panic!("engine fault on address {address}");
        }
        if self.unresponsive.lock().contains(&address) {
            bail!("Timeout waiting for reply from address {address}");
        }
        Ok(value)
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    fn start_connection(&self, transport: TransportConfig) -> Result<SessionId> {
        self.record(Call::StartConnection(transport.clone()));
        let mut fail = self.fail_start.lock();
        if *fail {
            *fail = false;
            bail!("Unable to open {transport}");
        }
        Ok(SessionId::new())
    }

    fn shutdown(&self) {
        self.record(Call::Shutdown);
    }

    fn add_device(&self, session: SessionId, device: DeviceSpec) -> Result<()> {
        let address = device.address;
        self.record(Call::AddDevice(session, device));
        if self.rejected.lock().contains(&address) {
            bail!("Address {address} refused");
        }
        Ok(())
    }

    fn remove_device(&self, session: SessionId, address: u8) -> Result<()> {
        self.record(Call::RemoveDevice(session, address));
        Ok(())
    }

    async fn device_capabilities(
        &self,
        _session: SessionId,
        address: u8,
    ) -> Result<DeviceCapabilities> {
        self.reply("capabilities", address, DeviceCapabilities::default())
            .await
    }

    async fn id_report(&self, _session: SessionId, address: u8) -> Result<DeviceIdentification> {
        let id = DeviceIdentification {
            vendor_code: [0x5C, 0x26, 0x23],
            model_number: 1,
            version: 2,
            serial_number: 0x1234_5678,
            firmware: (1, 0, 7),
        };
        self.reply("id_report", address, id).await
    }

    async fn input_status(&self, _session: SessionId, address: u8) -> Result<InputStatus> {
        let status = InputStatus {
            inputs: vec![true, false],
        };
        self.reply("input_status", address, status).await
    }

    async fn local_status(&self, _session: SessionId, address: u8) -> Result<LocalStatus> {
        self.reply("local_status", address, LocalStatus::default())
            .await
    }

    async fn output_status(&self, _session: SessionId, address: u8) -> Result<OutputStatus> {
        self.reply("output_status", address, OutputStatus::default())
            .await
    }

    async fn send_custom_command(&self, _session: SessionId, command: Command) -> Result<()> {
        let address = command.address;
        self.record(Call::Custom(command));
        if self.faulty.lock().contains(&address) {
            panic!("engine fault on address {address}");
        }
        if self.unresponsive.lock().contains(&address) {
            bail!("Timeout waiting for reply from address {address}");
        }
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<RecordingEngine>,
    pub publisher: EventPublisher,
    pub controller: Controller,
    pub notices: flume::Receiver<Notice>,
}

impl Harness {
    /// Controller over a fresh [`RecordingEngine`], spawning on `runtime`.
    pub fn new(runtime: Handle, settings: Settings) -> Self {
        Self::with_store(runtime, settings, SettingsStore::new("unused-appsettings.config"))
    }

    pub fn with_store(runtime: Handle, settings: Settings, store: SettingsStore) -> Self {
        let engine = RecordingEngine::new();
        let (publisher, subscriptions) = events::channel();
        let (notices, notice_rx) = notice_channel();
        let controller = Controller::new(
            runtime,
            engine.clone(),
            subscriptions,
            store,
            settings,
            LogBuffer::default(),
            notices,
        );
        Self {
            engine,
            publisher,
            controller,
            notices: notice_rx,
        }
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices.try_iter().collect()
    }
}

pub fn device_form(address: &str, name: &str) -> DeviceForm {
    DeviceForm {
        name: name.to_string(),
        address: address.to_string(),
        use_crc: true,
        use_secure_channel: false,
        secure_channel_key: String::new(),
    }
}
