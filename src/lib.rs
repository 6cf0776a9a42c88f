//! OSDP Console: operator console for multi-drop OSDP peripheral buses
//!
//! This crate provides the library behind the `osdp-console` binary: a
//! persisted device registry, single-session lifecycle management,
//! non-blocking command dispatch, and correlation of the engine's reply
//! events (including the repeated-NAK filter). The protocol engine itself is
//! consumed through the [`engine::Engine`] trait; a simulator implementation
//! is bundled so the console runs without hardware.
//!
//! The terminal frontend and the logging bootstrap are kept in hidden
//! modules to keep implementation details out of the generated
//! documentation.

#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod engine;
#[doc(hidden)]
pub mod tui;

pub use crate::core::*;
