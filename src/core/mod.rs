//! Console core: everything between the operator surface and the engine.
//!
//! - Settings persistence and the device registry
//! - Session lifecycle
//! - Asynchronous command dispatch
//! - Correlation of engine reply events
//! - The recent-log ring buffer
//!
//! None of this depends on the terminal UI, so it is driven directly by the
//! integration tests.

pub mod bus;
pub mod controller;
pub mod correlator;
pub mod dispatch;
pub mod logs;
pub mod registry;
pub mod session;
pub mod settings;
pub mod validation;

pub use bus::{notice_channel, Notice, NoticeSender};
pub use controller::{Controller, DeviceForm};
pub use correlator::{Correlated, EventCorrelator, NakFilter};
pub use dispatch::{CustomCommandKind, DispatchHandle, Dispatcher, QueryKind};
pub use logs::{LogBuffer, LOG_BUFFER_CAPACITY};
pub use registry::{DeviceRegistry, DeviceSetting, UpsertOutcome};
pub use session::SessionManager;
pub use settings::{LoadOutcome, Settings, SettingsError, SettingsStore};
pub use validation::InputError;
