pub mod client;

use serde::Serialize;
use uuid::Uuid;

/// API key and device address, loaded fresh for every command.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub device_id: String,
    pub sku: String,
}

impl Credentials {
    /// Both device fields are needed to address the device.
    pub fn is_configured(&self) -> bool {
        !self.device_id.is_empty() && !self.sku.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityType {
    OnOff,
    WorkMode,
    Toggle,
}

impl CapabilityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnOff => "devices.capabilities.on_off",
            Self::WorkMode => "devices.capabilities.work_mode",
            Self::Toggle => "devices.capabilities.toggle",
        }
    }
}

impl Serialize for CapabilityType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Value sent for a capability: a plain integer, or a mode/level pair for
/// `work_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Int(i64),
    #[serde(rename_all = "camelCase")]
    WorkMode { work_mode: i64, mode_value: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    #[serde(rename = "type")]
    pub capability_type: CapabilityType,
    pub instance: String,
    pub value: CapabilityValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicePayload {
    pub sku: String,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
}

/// Body of both the control and the state endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    pub request_id: Uuid,
    pub payload: DevicePayload,
}

impl DeviceRequest {
    pub fn control(credentials: &Credentials, capability: Capability) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            payload: DevicePayload {
                sku: credentials.sku.clone(),
                device: credentials.device_id.clone(),
                capability: Some(capability),
            },
        }
    }

    pub fn state(credentials: &Credentials) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            payload: DevicePayload {
                sku: credentials.sku.clone(),
                device: credentials.device_id.clone(),
                capability: None,
            },
        }
    }
}

/// Classification of a non-200 vendor response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    NotFound,
    RateLimited,
    Unknown,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            _ => Self::Unknown,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request - Check your request parameters.",
            Self::NotFound => "Not Found - Device or instance not found.",
            Self::RateLimited => "Too Many Requests - Rate limit exceeded.",
            Self::Unknown => "An unknown error occurred.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GoveeError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error {status}: {}", .kind.message())]
    Status { status: u16, kind: ApiErrorKind },
}
