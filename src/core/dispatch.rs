//! Asynchronous command dispatch.
//!
//! Each dispatch spawns exactly one tokio task, so the interactive loop
//! never waits on the wire. Whatever the engine returns is turned into a
//! [`Notice`] and marshaled back over the notice channel; engine failures,
//! panics included, stop at this boundary. Dispatches are not queued,
//! retried or cancellable: the returned [`DispatchHandle`] can only be
//! observed or joined.

use anyhow::{anyhow, Result};
use futures::{future::BoxFuture, FutureExt};
use std::{any::Any, fmt::Display, future::Future, panic::AssertUnwindSafe, sync::Arc};
use strum::{EnumIter, IntoEnumIterator};
use tokio::{runtime::Handle, task::JoinHandle};

use super::bus::{Notice, NoticeSender};
use crate::engine::{Command, Engine, SessionId};

/// The typed queries offered in the Commands menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum QueryKind {
    #[strum(to_string = "Device capabilities")]
    DeviceCapabilities,
    #[strum(to_string = "ID report")]
    IdReport,
    #[strum(to_string = "Input status")]
    InputStatus,
    #[strum(to_string = "Local status")]
    LocalStatus,
    #[strum(to_string = "Output status")]
    OutputStatus,
}

impl QueryKind {
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Issue this query and render the report as text.
    pub fn run(
        self,
        engine: Arc<dyn Engine>,
        session: SessionId,
        address: u8,
    ) -> BoxFuture<'static, Result<String>> {
        async move {
            let text = match self {
                QueryKind::DeviceCapabilities => engine
                    .device_capabilities(session, address)
                    .await?
                    .to_string(),
                QueryKind::IdReport => engine.id_report(session, address).await?.to_string(),
                QueryKind::InputStatus => engine.input_status(session, address).await?.to_string(),
                QueryKind::LocalStatus => engine.local_status(session, address).await?.to_string(),
                QueryKind::OutputStatus => {
                    engine.output_status(session, address).await?.to_string()
                }
            };
            Ok(text)
        }
        .boxed()
    }
}

/// Raw commands offered in the Invalid Commands menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum CustomCommandKind {
    #[strum(to_string = "Bad CRC/Checksum")]
    BadChecksum,
}

impl CustomCommandKind {
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    pub fn build(self, address: u8) -> Command {
        match self {
            CustomCommandKind::BadChecksum => Command::invalid_crc_poll(address),
        }
    }
}

/// Handle on one in-flight dispatch. Dropping it detaches the task.
#[derive(Debug)]
pub struct DispatchHandle {
    title: String,
    address: u8,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the dispatch to complete and its notice (if any) to be queued.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|err| anyhow!("dispatch '{}' to {} panicked: {err}", self.title, self.address))
    }
}

pub fn result_title(title: &str, address: u8) -> String {
    format!("{title} for address {address}")
}

pub fn error_title(title: &str, address: u8) -> String {
    format!("Error on address {address}: {title}")
}

/// Error notice for a dispatch whose engine call panicked.
fn engine_fault(title: &str, address: u8, payload: Box<dyn Any + Send>) -> Notice {
    let message = payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    log::error!("'{title}' panicked on address {address}: {message}");
    Notice::error(error_title(title, address), format!("Engine fault: {message}"))
}

#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    engine: Arc<dyn Engine>,
    notices: NoticeSender,
}

impl Dispatcher {
    pub fn new(runtime: Handle, engine: Arc<dyn Engine>, notices: NoticeSender) -> Self {
        Self {
            runtime,
            engine,
            notices,
        }
    }

    /// Run `query` in the background and display its result under `title`.
    pub fn send_command<Q, Fut, T>(
        &self,
        title: &str,
        session: SessionId,
        address: u8,
        query: Q,
    ) -> DispatchHandle
    where
        Q: FnOnce(Arc<dyn Engine>, SessionId, u8) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Display + Send + 'static,
    {
        log::debug!("dispatching '{title}' to address {address}");
        let engine = Arc::clone(&self.engine);
        let notices = self.notices.clone();
        let owned_title = title.to_string();

        let task = self.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(async move { query(engine, session, address).await })
                .catch_unwind()
                .await;
            let notice = match outcome {
                Ok(Ok(result)) => {
                    Notice::message(result_title(&owned_title, address), result.to_string())
                }
                Ok(Err(err)) => {
                    log::warn!("'{owned_title}' failed on address {address}: {err:#}");
                    Notice::error(error_title(&owned_title, address), format!("{err:#}"))
                }
                Err(payload) => engine_fault(&owned_title, address, payload),
            };
            notices.send(notice);
        });

        DispatchHandle {
            title: title.to_string(),
            address,
            task,
        }
    }

    /// Send the command built by `factory`; only failures are displayed.
    pub fn send_custom_command<F>(
        &self,
        title: &str,
        session: SessionId,
        address: u8,
        factory: F,
    ) -> DispatchHandle
    where
        F: FnOnce(u8) -> Command + Send + 'static,
    {
        log::debug!("dispatching custom '{title}' to address {address}");
        let engine = Arc::clone(&self.engine);
        let notices = self.notices.clone();
        let owned_title = title.to_string();

        let task = self.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(async move {
                let command = factory(address);
                log::info!("sending {command}");
                engine.send_custom_command(session, command).await
            })
            .catch_unwind()
            .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::warn!("'{owned_title}' failed on address {address}: {err:#}");
                    notices.send(Notice::error(
                        error_title(&owned_title, address),
                        format!("{err:#}"),
                    ));
                }
                Err(payload) => notices.send(engine_fault(&owned_title, address, payload)),
            }
        });

        DispatchHandle {
            title: title.to_string(),
            address,
            task,
        }
    }
}
