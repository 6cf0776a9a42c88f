//! Parsing of operator-entered form fields.
//!
//! Every field is checked before the controller touches the registry, the
//! session or the engine, so a rejected form leaves all state untouched.

use thiserror::Error;

/// Length of an AES-128 secure channel base key.
pub const SECURE_CHANNEL_KEY_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid port name entered!")]
    PortName,
    #[error("Invalid baud rate entered!")]
    BaudRate,
    #[error("Invalid port number entered!")]
    PortNumber,
    #[error("Invalid address entered!")]
    Address,
    #[error("Invalid secure channel key entered! Expected 16 hex bytes.")]
    SecureChannelKey,
}

pub fn parse_port_name(text: &str) -> Result<String, InputError> {
    let name = text.trim();
    if name.is_empty() {
        return Err(InputError::PortName);
    }
    Ok(name.to_string())
}

pub fn parse_baud_rate(text: &str) -> Result<u32, InputError> {
    match text.trim().parse::<u32>() {
        Ok(rate) if rate > 0 => Ok(rate),
        _ => Err(InputError::BaudRate),
    }
}

pub fn parse_port_number(text: &str) -> Result<u16, InputError> {
    text.trim()
        .parse::<u16>()
        .map_err(|_| InputError::PortNumber)
}

pub fn parse_address(text: &str) -> Result<u8, InputError> {
    text.trim().parse::<u8>().map_err(|_| InputError::Address)
}

/// Empty input means "no key"; anything else must be exactly one key's worth of hex.
pub fn parse_secure_channel_key(text: &str) -> Result<Option<Vec<u8>>, InputError> {
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(None);
    }
    let key = hex::decode(&compact).map_err(|_| InputError::SecureChannelKey)?;
    if key.len() != SECURE_CHANNEL_KEY_LEN {
        return Err(InputError::SecureChannelKey);
    }
    Ok(Some(key))
}
