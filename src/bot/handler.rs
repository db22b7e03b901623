use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ConfigProvider, is_truthy};
use crate::govee::client::GoveeClient;
use crate::govee::{CapabilityType, CapabilityValue, Credentials, GoveeError};

use super::{
    Authorizer, FanCommand, NOT_CONFIGURED_REPLY, Responder, STATE_FAILED_REPLY,
    UNAUTHORIZED_REPLY,
};

/// How a single command resolved.
#[derive(Debug)]
pub enum CommandOutcome {
    Unauthorized,
    InvalidInput,
    /// A required config key is missing. The caller must terminate.
    ConfigMissing(ConfigError),
    NotConfigured,
    Completed,
    Failed,
    /// Unexpected failure; `notified` tells whether the caller got the
    /// failure text.
    Errored { notified: bool },
}

#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Govee(#[from] GoveeError),
}

pub struct CommandHandler {
    config: Arc<dyn ConfigProvider>,
    govee: GoveeClient,
    authorizer: Arc<dyn Authorizer>,
    report_control_failures: bool,
}

impl CommandHandler {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        govee: GoveeClient,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            config,
            govee,
            authorizer,
            report_control_failures: false,
        }
    }

    /// Reply with the failure text instead of the success text when a
    /// control call gets a non-200 status.
    pub fn report_control_failures(mut self, enabled: bool) -> Self {
        self.report_control_failures = enabled;
        self
    }

    /// Run one command: authorize, validate, defer, load credentials,
    /// call the device, follow up.
    pub async fn handle(&self, command: FanCommand, responder: &dyn Responder) -> CommandOutcome {
        let caller = responder.caller_id();
        info!("/{} from user {}", command.name(), caller);

        if !self.authorizer.is_allowed(caller) {
            warn!("Rejected /{} from unauthorized user {}", command.name(), caller);
            if let Err(e) = responder.reply(UNAUTHORIZED_REPLY).await {
                error!("Failed to reply to user {}: {:#}", caller, e);
            }
            return CommandOutcome::Unauthorized;
        }

        if let Some(text) = command.invalid_input_reply() {
            info!("Invalid input for {:?}", command);
            if let Err(e) = responder.reply(text).await {
                error!("Failed to reply to user {}: {:#}", caller, e);
            }
            return CommandOutcome::InvalidInput;
        }

        if let Err(e) = responder.defer().await {
            error!("Failed to acknowledge /{}: {:#}", command.name(), e);
            return CommandOutcome::Errored { notified: false };
        }

        let (outcome, text) = match self.run(command).await {
            Ok(resolved) => resolved,
            Err(CommandError::Config(e)) => return CommandOutcome::ConfigMissing(e),
            Err(CommandError::Govee(e)) => {
                error!("An error occurred during /{}: {}", command.name(), e);
                let notified = self.follow_up(responder, command.failure_reply()).await;
                return CommandOutcome::Errored { notified };
            }
        };

        if self.follow_up(responder, &text).await {
            outcome
        } else {
            CommandOutcome::Errored { notified: false }
        }
    }

    async fn follow_up(&self, responder: &dyn Responder, text: &str) -> bool {
        match responder.follow_up(text).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send follow-up: {:#}", e);
                false
            }
        }
    }

    fn load_credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials {
            api_key: self.config.lookup("api_key")?,
            device_id: self.config.lookup("device_id")?,
            sku: self.config.lookup("sku")?,
        })
    }

    async fn run(&self, command: FanCommand) -> Result<(CommandOutcome, String), CommandError> {
        let credentials = self.load_credentials()?;
        if !credentials.is_configured() {
            return Ok((CommandOutcome::NotConfigured, NOT_CONFIGURED_REPLY.to_string()));
        }

        match command {
            FanCommand::FanOn => {
                self.control(
                    command,
                    &credentials,
                    CapabilityType::OnOff,
                    "powerSwitch",
                    CapabilityValue::Int(1),
                    "Fan turned on.".to_string(),
                )
                .await
            }
            FanCommand::FanOff => {
                self.control(
                    command,
                    &credentials,
                    CapabilityType::OnOff,
                    "powerSwitch",
                    CapabilityValue::Int(0),
                    "Fan turned off.".to_string(),
                )
                .await
            }
            FanCommand::SetSpeed(speed) => {
                self.control(
                    command,
                    &credentials,
                    CapabilityType::WorkMode,
                    "workMode",
                    CapabilityValue::WorkMode {
                        work_mode: 1,
                        mode_value: speed,
                    },
                    format!("Fan speed set to {speed}."),
                )
                .await
            }
            FanCommand::ToggleOscillation(toggle) => {
                let word = if toggle == 1 { "enabled" } else { "disabled" };
                self.control(
                    command,
                    &credentials,
                    CapabilityType::Toggle,
                    "oscillationToggle",
                    CapabilityValue::Int(toggle),
                    format!("Oscillation {word}."),
                )
                .await
            }
            FanCommand::QueryState => match self.govee.query_device_state(&credentials).await? {
                Some(state) if is_truthy(&state) => Ok((
                    CommandOutcome::Completed,
                    format!("Current Device State: {state}"),
                )),
                _ => Ok((CommandOutcome::Failed, STATE_FAILED_REPLY.to_string())),
            },
        }
    }

    async fn control(
        &self,
        command: FanCommand,
        credentials: &Credentials,
        capability_type: CapabilityType,
        instance: &str,
        value: CapabilityValue,
        success: String,
    ) -> Result<(CommandOutcome, String), CommandError> {
        match self
            .govee
            .control_device(credentials, capability_type, instance, value)
            .await
        {
            Ok(()) => Ok((CommandOutcome::Completed, success)),
            Err(GoveeError::Status { .. }) if self.report_control_failures => {
                Ok((CommandOutcome::Failed, command.failure_reply().to_string()))
            }
            // The vendor rejected the call but the caller is still told it
            // worked; GOVEE_REPORT_CONTROL_FAILURES turns this off.
            Err(GoveeError::Status { .. }) => Ok((CommandOutcome::Completed, success)),
            Err(e) => Err(e.into()),
        }
    }
}
