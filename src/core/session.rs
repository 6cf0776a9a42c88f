//! Lifecycle of the single active transport session.

use anyhow::{Context, Result};

use super::registry::DeviceRegistry;
use crate::engine::{Engine, SessionId, TransportConfig};

#[derive(Debug, Default)]
pub struct SessionManager {
    active: Option<SessionId>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<SessionId> {
        self.active
    }

    /// Replace whatever session is open with a new one on `transport`.
    ///
    /// The engine is always shut down first, even with nothing open. Once the
    /// new session exists every registry entry is registered on it, in
    /// registry order. A device the engine refuses is logged and skipped.
    pub fn start_connection(
        &mut self,
        engine: &dyn Engine,
        transport: TransportConfig,
        registry: &DeviceRegistry,
    ) -> Result<SessionId> {
        self.shutdown(engine);

        let session = engine
            .start_connection(transport.clone())
            .with_context(|| format!("Failed to start connection on {transport}"))?;
        self.active = Some(session);
        log::info!("Started connection {session} on {transport}");

        for device in registry.iter() {
            if let Err(err) = engine.add_device(session, device.to_spec()) {
                log::warn!(
                    "Failed to register address {} on connection {session}: {err:#}",
                    device.address
                );
            }
        }

        Ok(session)
    }

    /// Tear down the active session. Safe to call with none open.
    pub fn shutdown(&mut self, engine: &dyn Engine) {
        engine.shutdown();
        if let Some(session) = self.active.take() {
            log::info!("Stopped connection {session}");
        }
    }
}
