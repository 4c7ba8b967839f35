//! In-process device and sensor registry
//!
//! The registry is the only record of which nodes the engine has created.
//! Entries are never removed while the process runs.

use std::collections::HashMap;

use crate::nodespace::StatusCode;

/// Last-update marker of a sensor that has never been updated
pub const NEVER_UPDATED: &str = "0000-00-00 00:00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    Good,
    Bad,
}

impl SensorStatus {
    pub fn from_online(online: bool) -> Self {
        if online {
            SensorStatus::Good
        } else {
            SensorStatus::Bad
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SensorStatus::Good => StatusCode::Good,
            SensorStatus::Bad => StatusCode::Bad,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    pub sensor_id: u32,
    pub sensor_name: String,
    pub last_update_at: String,
    pub status: SensorStatus,
    /// Whether the variable node exists in the host
    pub materialized: bool,
}

impl Sensor {
    pub fn new(sensor_id: u32, sensor_name: &str) -> Self {
        Self {
            sensor_id,
            sensor_name: sensor_name.to_string(),
            last_update_at: NEVER_UPDATED.to_string(),
            status: SensorStatus::Good,
            materialized: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    pub device_id: u32,
    pub device_no: String,
    pub display_name: String,
    pub sensors: HashMap<u32, Sensor>,
    /// Whether the object node exists in the host
    pub materialized: bool,
}

impl Device {
    pub fn new(device_id: u32, device_no: &str, display_name: String) -> Self {
        Self {
            device_id,
            device_no: device_no.to_string(),
            display_name,
            sensors: HashMap::new(),
            materialized: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<u32, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, device_id: u32) -> Option<&Device> {
        self.devices.get(&device_id)
    }

    /// Existing entry, or a freshly registered one built by `create`
    pub fn get_or_register(&mut self, device_id: u32, create: impl FnOnce() -> Device) -> &mut Device {
        self.devices.entry(device_id).or_insert_with(create)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.devices.values().map(|d| d.sensors.len()).sum()
    }
}

/// Generic template names get the device id appended so they stay distinguishable
pub fn display_name(raw_name: &str, device_id: u32, generic_name: &str) -> String {
    if raw_name == generic_name {
        format!("{}({})", raw_name, device_id)
    } else {
        raw_name.to_string()
    }
}
