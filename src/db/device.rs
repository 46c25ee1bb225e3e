//! Device registry models.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// Free-form per-device data, stored as a JSON object.
pub type PrivateData = Map<String, Value>;

/// Reported operating state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    Active,
    /// Registered but not yet reporting.
    #[default]
    Inactive,
    Maintenance,
    Error,
}

impl DeviceStatus {
    /// Convert status to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
            DeviceStatus::Maintenance => "maintenance",
            DeviceStatus::Error => "error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(DeviceStatus::Active),
            "inactive" => Ok(DeviceStatus::Inactive),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            "error" => Ok(DeviceStatus::Error),
            _ => Err(format!("unknown device status: {s}")),
        }
    }
}

/// Category devices are filed under.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DeviceType {
    pub id: i64,
    /// Type name (unique, case-insensitive).
    pub name: String,
    pub description: Option<String>,
    /// Icon key used by clients.
    pub icon: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a device type.
#[derive(Debug, Clone)]
pub struct NewDeviceType {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl NewDeviceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Partial update for a device type.
///
/// `None` leaves the column unchanged; `Some(None)` clears nullable columns.
#[derive(Debug, Clone, Default)]
pub struct DeviceTypeUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
}

impl DeviceTypeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.icon.is_none()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn icon(mut self, icon: Option<String>) -> Self {
        self.icon = Some(icon);
        self
    }
}

/// A registered device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: i64,
    /// Identifier the device reports itself with (unique).
    pub device_uid: String,
    pub name: String,
    pub device_type_id: i64,
    /// The device's type, when it still exists.
    pub device_type: Option<DeviceType>,
    pub status: DeviceStatus,
    pub private_data: PrivateData,
    pub firmware_version: Option<String>,
    /// When the device last reported in.
    pub last_online: Option<String>,
    pub is_online: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for registering a device.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_uid: String,
    pub name: String,
    pub device_type_id: i64,
    pub private_data: PrivateData,
    pub firmware_version: Option<String>,
}

impl NewDevice {
    pub fn new(device_uid: impl Into<String>, name: impl Into<String>, device_type_id: i64) -> Self {
        Self {
            device_uid: device_uid.into(),
            name: name.into(),
            device_type_id,
            private_data: PrivateData::new(),
            firmware_version: None,
        }
    }

    pub fn with_private_data(mut self, private_data: PrivateData) -> Self {
        self.private_data = private_data;
        self
    }

    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }
}

/// Partial update for a device.
///
/// `private_data` replaces the stored object as a whole; use
/// `DeviceRepository::merge_private_data` to add keys instead.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub device_type_id: Option<i64>,
    pub status: Option<DeviceStatus>,
    pub private_data: Option<PrivateData>,
    pub firmware_version: Option<Option<String>>,
}

impl DeviceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.device_type_id.is_none()
            && self.status.is_none()
            && self.private_data.is_none()
            && self.firmware_version.is_none()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn device_type_id(mut self, device_type_id: i64) -> Self {
        self.device_type_id = Some(device_type_id);
        self
    }

    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn private_data(mut self, private_data: PrivateData) -> Self {
        self.private_data = Some(private_data);
        self
    }

    pub fn firmware_version(mut self, version: Option<String>) -> Self {
        self.firmware_version = Some(version);
        self
    }
}

/// Status report sent by or on behalf of a device.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: DeviceStatus,
    pub is_online: bool,
    /// Report time; the current time when absent.
    pub last_online: Option<String>,
}
