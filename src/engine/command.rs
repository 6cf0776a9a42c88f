//! Raw command objects for protocol-conformance testing.
//!
//! Unlike the typed queries on [`super::Engine`], a `Command` is handed to
//! the engine verbatim, so it may deliberately violate the protocol.

use std::fmt;

/// osdp_POLL
pub const POLL_COMMAND_CODE: u8 = 0x60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub address: u8,
    pub code: u8,
    pub data: Vec<u8>,
    /// When set, the engine puts this value on the wire instead of the
    /// computed CRC/checksum.
    pub checksum_override: Option<u16>,
}

impl Command {
    pub fn new(address: u8, code: u8, data: Vec<u8>) -> Self {
        Self {
            address,
            code,
            data,
            checksum_override: None,
        }
    }

    /// A poll whose trailer can never match the frame contents.
    pub fn invalid_crc_poll(address: u8) -> Self {
        Self {
            checksum_override: Some(0x0000),
            ..Self::new(address, POLL_COMMAND_CODE, Vec::new())
        }
    }

    pub fn has_bad_checksum(&self) -> bool {
        self.checksum_override.is_some()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command 0x{:02X} to address {} ({} data bytes)",
            self.code,
            self.address,
            self.data.len()
        )?;
        if let Some(value) = self.checksum_override {
            write!(f, " with forced checksum 0x{value:04X}")?;
        }
        Ok(())
    }
}
