//! Application controller
//!
//! Owns every piece of mutable console state (settings and the device
//! registry inside them, the session, the NAK filter, the log buffer
//! handle) and exposes one method per operator action. It lives on the
//! interactive loop; background work only reaches it through channels.

use anyhow::Result;
use std::{collections::HashMap, sync::Arc};
use tokio::runtime::Handle;

use super::{
    bus::{Notice, NoticeSender},
    correlator::{Correlated, EventCorrelator},
    dispatch::{CustomCommandKind, DispatchHandle, Dispatcher, QueryKind},
    logs::LogBuffer,
    registry::{DeviceRegistry, DeviceSetting, UpsertOutcome},
    session::SessionManager,
    settings::{Settings, SettingsStore},
    validation,
};
use crate::engine::{ConnectionStatus, Engine, EventSubscriptions, SessionId, TransportConfig};

/// Raw text of the add-device dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceForm {
    pub name: String,
    pub address: String,
    pub use_crc: bool,
    pub use_secure_channel: bool,
    pub secure_channel_key: String,
}

impl DeviceForm {
    pub fn parse(&self) -> Result<DeviceSetting, validation::InputError> {
        Ok(DeviceSetting {
            address: validation::parse_address(&self.address)?,
            name: self.name.trim().to_string(),
            use_crc: self.use_crc,
            use_secure_channel: self.use_secure_channel,
            secure_channel_key: validation::parse_secure_channel_key(&self.secure_channel_key)?,
        })
    }
}

pub struct Controller {
    engine: Arc<dyn Engine>,
    store: SettingsStore,
    settings: Settings,
    session: SessionManager,
    correlator: EventCorrelator,
    dispatcher: Dispatcher,
    logs: LogBuffer,
    notices: NoticeSender,
    link_status: HashMap<u8, ConnectionStatus>,
}

impl Controller {
    pub fn new(
        runtime: Handle,
        engine: Arc<dyn Engine>,
        subscriptions: EventSubscriptions,
        store: SettingsStore,
        settings: Settings,
        logs: LogBuffer,
        notices: NoticeSender,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(runtime, Arc::clone(&engine), notices.clone()),
            engine,
            store,
            settings,
            session: SessionManager::new(),
            correlator: EventCorrelator::new(subscriptions),
            logs,
            notices,
            link_status: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.settings.devices
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session.current()
    }

    pub fn link_status(&self, address: u8) -> Option<ConnectionStatus> {
        self.link_status.get(&address).copied()
    }

    pub fn start_serial_connection(&mut self, port_name: &str, baud_rate: &str) -> Result<SessionId> {
        let port_name = validation::parse_port_name(port_name)?;
        let baud_rate = validation::parse_baud_rate(baud_rate)?;

        self.settings.serial_connection_settings.port_name = port_name.clone();
        self.settings.serial_connection_settings.baud_rate = baud_rate;
        self.start_connection(TransportConfig::Serial {
            port_name,
            baud_rate,
        })
    }

    pub fn start_tcp_server_connection(
        &mut self,
        port_number: &str,
        baud_rate: &str,
    ) -> Result<SessionId> {
        let port_number = validation::parse_port_number(port_number)?;
        let baud_rate = validation::parse_baud_rate(baud_rate)?;

        self.settings.tcp_server_connection_settings.port_number = port_number;
        self.settings.tcp_server_connection_settings.baud_rate = baud_rate;
        self.start_connection(TransportConfig::TcpServer {
            port_number,
            baud_rate,
        })
    }

    fn start_connection(&mut self, transport: TransportConfig) -> Result<SessionId> {
        self.link_status.clear();
        self.session
            .start_connection(self.engine.as_ref(), transport, &self.settings.devices)
    }

    pub fn stop_connections(&mut self) {
        self.session.shutdown(self.engine.as_ref());
        self.link_status.clear();
    }

    /// Register the device described by `form`.
    ///
    /// `confirm_overwrite` is only consulted when the address is taken;
    /// refusing aborts before the engine is touched. With no open session the
    /// entry is only stored and will be registered on the next connect. An
    /// engine failure is returned but the registry keeps the new entry.
    pub fn add_device<F>(&mut self, form: &DeviceForm, confirm_overwrite: F) -> Result<UpsertOutcome>
    where
        F: FnOnce(&DeviceSetting) -> bool,
    {
        let entry = form.parse()?;
        let spec = entry.to_spec();
        let address = entry.address;

        let outcome = self.settings.devices.upsert(entry, confirm_overwrite);
        match &outcome {
            UpsertOutcome::Declined => {
                log::info!("Kept existing device at address {address}");
                return Ok(outcome);
            }
            UpsertOutcome::Replaced(previous) => {
                log::info!("Replaced device '{}' at address {address}", previous.name)
            }
            UpsertOutcome::Inserted => log::info!("Added device at address {address}"),
        }

        if let Some(session) = self.session.current() {
            self.engine.add_device(session, spec).map_err(|err| {
                err.context(format!("Registry updated but engine rejected address {address}"))
            })?;
        }
        Ok(outcome)
    }

    /// Forget the device at `address`. Unknown addresses are not an error.
    pub fn remove_device(&mut self, address: u8) -> Result<Option<DeviceSetting>> {
        let removed = self.settings.devices.remove(address);
        self.link_status.remove(&address);
        if let Some(device) = &removed {
            log::info!("Removed device '{}' at address {address}", device.name);
        }

        if let Some(session) = self.session.current() {
            self.engine.remove_device(session, address).map_err(|err| {
                err.context(format!("Registry updated but engine failed to drop address {address}"))
            })?;
        }
        Ok(removed)
    }

    /// Fire `kind` at `address`. Returns `None` (after queuing an error
    /// notice) when no connection is open.
    pub fn send_query(&self, kind: QueryKind, address: u8) -> Option<DispatchHandle> {
        let title = kind.to_string();
        let session = self.require_session(&title, address)?;
        Some(
            self.dispatcher
                .send_command(&title, session, address, move |engine, session, address| {
                    kind.run(engine, session, address)
                }),
        )
    }

    pub fn send_custom_command(
        &self,
        kind: CustomCommandKind,
        address: u8,
    ) -> Option<DispatchHandle> {
        let title = kind.to_string();
        let session = self.require_session(&title, address)?;
        Some(
            self.dispatcher
                .send_custom_command(&title, session, address, move |address| kind.build(address)),
        )
    }

    fn require_session(&self, title: &str, address: u8) -> Option<SessionId> {
        let session = self.session.current();
        if session.is_none() {
            self.notices.send(Notice::error(
                super::dispatch::error_title(title, address),
                "No connection has been started",
            ));
        }
        session
    }

    /// Persist the current settings. Failures are logged and otherwise ignored.
    pub fn save_configuration(&self) -> bool {
        match self.store.save(&self.settings) {
            Ok(()) => {
                log::info!("Saved configuration to {:?}", self.store.path());
                true
            }
            Err(err) => {
                log::warn!("Configuration not saved: {err}");
                false
            }
        }
    }

    /// Drain engine events and queue the resulting notices. Returns how many
    /// notices were queued.
    pub fn pump_events(&mut self) -> usize {
        let mut shown = 0;
        for item in self.correlator.drain() {
            match item {
                Correlated::Show(notice) => {
                    self.notices.send(notice);
                    shown += 1;
                }
                Correlated::ConnectionChanged { address, status } => {
                    self.link_status.insert(address, status);
                }
            }
        }
        shown
    }

    /// Stop the engine. Called once when the console exits.
    pub fn shutdown(&mut self) {
        self.stop_connections();
        log::info!("Controller shut down");
    }
}

