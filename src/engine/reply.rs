//! Typed reply payloads produced by peripherals.
//!
//! Every payload renders to the multi-line text shown in the console's
//! message dialogs.

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes carried by a NAK reply.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromPrimitive, IntoPrimitive,
)]
pub enum NakErrorCode {
    NoError = 0x00,
    BadChecksumOrCrc = 0x01,
    InvalidCommandLength = 0x02,
    UnknownCommandCode = 0x03,
    UnexpectedSequenceNumber = 0x04,
    DoesNotSupportSecurityBlock = 0x05,
    EncryptedCommunicationRequired = 0x06,
    BioTypeNotSupported = 0x07,
    BioFormatNotSupported = 0x08,
    UnableToProcessCommand = 0x09,
    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nak {
    pub error_code: NakErrorCode,
    pub extra_data: Vec<u8>,
}

impl Nak {
    pub fn new(error_code: NakErrorCode) -> Self {
        Self {
            error_code,
            extra_data: Vec::new(),
        }
    }
}

impl fmt::Display for Nak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code: u8 = self.error_code.into();
        writeln!(f, "Error: {:?} (0x{code:02X})", self.error_code)?;
        write!(f, "Extra Data: {}", hex::encode_upper(&self.extra_data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalStatus {
    pub tamper: bool,
    pub power_failure: bool,
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tamper: {}", self.tamper)?;
        write!(f, "Power Failure: {}", self.power_failure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputStatus {
    pub inputs: Vec<bool>,
}

impl fmt::Display for InputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input Status:")?;
        for (index, active) in self.inputs.iter().enumerate() {
            write!(f, "\n  {index}: {}", if *active { "Active" } else { "Inactive" })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputStatus {
    pub outputs: Vec<bool>,
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output Status:")?;
        for (index, active) in self.outputs.iter().enumerate() {
            write!(f, "\n  {index}: {}", if *active { "On" } else { "Off" })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardFormat {
    NotSpecified,
    Wiegand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCardData {
    pub reader_number: u8,
    pub format: CardFormat,
    pub bit_count: u16,
    pub data: Vec<u8>,
}

impl fmt::Display for RawCardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reader Number: {}", self.reader_number)?;
        writeln!(f, "Format: {:?}", self.format)?;
        writeln!(f, "Bit Count: {}", self.bit_count)?;
        write!(f, "Data: {}", hex::encode_upper(&self.data))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapability {
    pub function: String,
    pub compliance: u8,
    pub number_of: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub capabilities: Vec<DeviceCapability>,
}

impl fmt::Display for DeviceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device Capabilities:")?;
        for capability in &self.capabilities {
            write!(
                f,
                "\n  {}: compliance {}, number of {}",
                capability.function, capability.compliance, capability.number_of
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentification {
    pub vendor_code: [u8; 3],
    pub model_number: u8,
    pub version: u8,
    pub serial_number: u32,
    pub firmware: (u8, u8, u8),
}

impl fmt::Display for DeviceIdentification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, build) = self.firmware;
        writeln!(f, "Vendor Code: {}", hex::encode_upper(self.vendor_code))?;
        writeln!(f, "Model Number: {}", self.model_number)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Serial Number: {:08X}", self.serial_number)?;
        write!(f, "Firmware Version: {major}.{minor}.{build}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_secure_channel_established: bool,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} mode",
            if self.is_connected { "Online" } else { "Offline" },
            if self.is_secure_channel_established {
                "Secure"
            } else {
                "Clear Text"
            }
        )
    }
}
