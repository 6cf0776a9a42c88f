//! In-memory device registry keyed by bus address.
//!
//! Entries keep insertion order (that is the order they are replayed into
//! the engine); [`DeviceRegistry::list`] gives the address-sorted view used
//! by every selection menu. At most one entry exists per address.

use serde::{Deserialize, Serialize};

use crate::engine::DeviceSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceSetting {
    pub address: u8,
    pub name: String,
    pub use_crc: bool,
    pub use_secure_channel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_key")]
    pub secure_channel_key: Option<Vec<u8>>,
}

impl DeviceSetting {
    pub fn new(address: u8, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            use_crc: true,
            use_secure_channel: false,
            secure_channel_key: None,
        }
    }

    pub fn to_spec(&self) -> DeviceSpec {
        DeviceSpec {
            address: self.address,
            use_crc: self.use_crc,
            use_secure_channel: self.use_secure_channel,
            secure_channel_key: self.secure_channel_key.clone(),
        }
    }

    /// Label used in device pickers.
    pub fn label(&self) -> String {
        format!("{} : {}", self.address, self.name)
    }
}

/// Result of an [`DeviceRegistry::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The address was taken; the previous entry is returned.
    Replaced(DeviceSetting),
    /// The operator refused to overwrite; nothing changed.
    Declined,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DeviceSetting>", into = "Vec<DeviceSetting>")]
pub struct DeviceRegistry {
    devices: Vec<DeviceSetting>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry`, asking `confirm_overwrite` first when its address is taken.
    pub fn upsert<F>(&mut self, entry: DeviceSetting, confirm_overwrite: F) -> UpsertOutcome
    where
        F: FnOnce(&DeviceSetting) -> bool,
    {
        let existing = self
            .devices
            .iter()
            .position(|device| device.address == entry.address);

        match existing {
            Some(index) => {
                if !confirm_overwrite(&self.devices[index]) {
                    return UpsertOutcome::Declined;
                }
                let previous = self.devices.remove(index);
                self.devices.push(entry);
                UpsertOutcome::Replaced(previous)
            }
            None => {
                self.devices.push(entry);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Remove the entry at `address`; absent addresses are ignored.
    pub fn remove(&mut self, address: u8) -> Option<DeviceSetting> {
        let index = self
            .devices
            .iter()
            .position(|device| device.address == address)?;
        Some(self.devices.remove(index))
    }

    /// Entries sorted by ascending address.
    pub fn list(&self) -> Vec<&DeviceSetting> {
        let mut devices: Vec<&DeviceSetting> = self.devices.iter().collect();
        devices.sort_by_key(|device| device.address);
        devices
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceSetting> {
        self.devices.iter()
    }

    pub fn get(&self, address: u8) -> Option<&DeviceSetting> {
        self.devices.iter().find(|device| device.address == address)
    }

    pub fn contains(&self, address: u8) -> bool {
        self.get(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl From<Vec<DeviceSetting>> for DeviceRegistry {
    /// Later duplicates win, the same as an accepted overwrite.
    fn from(devices: Vec<DeviceSetting>) -> Self {
        let mut registry = Self::new();
        for device in devices {
            registry.upsert(device, |_| true);
        }
        registry
    }
}

impl From<DeviceRegistry> for Vec<DeviceSetting> {
    fn from(registry: DeviceRegistry) -> Self {
        registry.devices
    }
}

mod hex_key {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::core::validation::SECURE_CHANNEL_KEY_LEN;

    pub fn serialize<S>(key: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(bytes) => serializer.serialize_str(&hex::encode_upper(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        let key = hex::decode(text.trim()).map_err(D::Error::custom)?;
        if key.len() != SECURE_CHANNEL_KEY_LEN {
            return Err(D::Error::custom(format!(
                "secure channel key must be {SECURE_CHANNEL_KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        Ok(Some(key))
    }
}
