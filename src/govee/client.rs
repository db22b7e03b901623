use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::{
    ApiErrorKind, Capability, CapabilityType, CapabilityValue, Credentials, DeviceRequest,
    GoveeError,
};

const CONTROL_PATH: &str = "/router/api/v1/device/control";
const STATE_PATH: &str = "/router/api/v1/device/state";
const API_KEY_HEADER: &str = "Govee-API-Key";

/// Thin client for the two Govee router endpoints the bot uses.
#[derive(Debug, Clone)]
pub struct GoveeClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoveeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GoveeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("govee-fan-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::from_reqwest(base_url, http))
    }

    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send one capability change to the device.
    ///
    /// A non-200 answer is classified, logged, and returned as
    /// [`GoveeError::Status`].
    pub async fn control_device(
        &self,
        credentials: &Credentials,
        capability_type: CapabilityType,
        instance: &str,
        value: CapabilityValue,
    ) -> Result<(), GoveeError> {
        let request = DeviceRequest::control(
            credentials,
            Capability {
                capability_type,
                instance: instance.to_string(),
                value,
            },
        );
        info!(
            "Control {} {}={:?} on {} (request {})",
            capability_type.as_str(),
            instance,
            value,
            credentials.device_id,
            request.request_id
        );

        let response = self.post(CONTROL_PATH, credentials, &request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(classify(status));
        }
        Ok(())
    }

    /// Fetch the device state. `Ok(None)` means the vendor did not answer
    /// with 200; the status has already been logged.
    pub async fn query_device_state(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<serde_json::Value>, GoveeError> {
        let request = DeviceRequest::state(credentials);
        info!(
            "Query state of {} (request {})",
            credentials.device_id, request.request_id
        );

        let response = self.post(STATE_PATH, credentials, &request).await?;
        let status = response.status();
        if status != StatusCode::OK {
            classify(status);
            return Ok(None);
        }

        let state = response.json::<serde_json::Value>().await?;
        debug!("Device state: {}", state);
        Ok(Some(state))
    }

    async fn post(
        &self,
        path: &str,
        credentials: &Credentials,
        body: &DeviceRequest,
    ) -> Result<reqwest::Response, GoveeError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &credentials.api_key)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }
}

fn classify(status: StatusCode) -> GoveeError {
    let status = status.as_u16();
    let err = GoveeError::Status {
        status,
        kind: ApiErrorKind::from_status(status),
    };
    warn!("{}", err);
    err
}
