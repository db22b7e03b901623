pub mod discord;
pub mod handler;

use std::collections::HashSet;

use async_trait::async_trait;

pub const UNAUTHORIZED_REPLY: &str = "You are not authorized to use this command.";
pub const NOT_CONFIGURED_REPLY: &str = "Failed to configure the device.";
pub const STATE_FAILED_REPLY: &str = "Failed to retrieve the device state.";
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command.";

/// A parsed slash command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCommand {
    FanOn,
    FanOff,
    SetSpeed(i64),
    ToggleOscillation(i64),
    QueryState,
}

impl FanCommand {
    pub const NAMES: [&'static str; 5] = [
        "fan_on",
        "fan_off",
        "set_speed",
        "toggle_oscillation",
        "query_state",
    ];

    /// Build a command from its name and integer option lookup.
    /// Returns `None` for unknown names or a missing required option.
    pub fn parse(name: &str, option: impl Fn(&str) -> Option<i64>) -> Option<Self> {
        match name {
            "fan_on" => Some(Self::FanOn),
            "fan_off" => Some(Self::FanOff),
            "set_speed" => option("speed").map(Self::SetSpeed),
            "toggle_oscillation" => option("toggle").map(Self::ToggleOscillation),
            "query_state" => Some(Self::QueryState),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FanOn => "fan_on",
            Self::FanOff => "fan_off",
            Self::SetSpeed(_) => "set_speed",
            Self::ToggleOscillation(_) => "toggle_oscillation",
            Self::QueryState => "query_state",
        }
    }

    /// Reply for an out-of-range parameter, if the parameter is invalid.
    pub fn invalid_input_reply(self) -> Option<&'static str> {
        match self {
            Self::SetSpeed(speed) if !(1..=8).contains(&speed) => {
                Some("Invalid speed value. Please enter a number between 1 and 8.")
            }
            Self::ToggleOscillation(toggle) if !matches!(toggle, 0 | 1) => {
                Some("Invalid input. Enter 0 or 1.")
            }
            _ => None,
        }
    }

    /// Follow-up sent when the command fails unexpectedly after deferral.
    pub fn failure_reply(self) -> &'static str {
        match self {
            Self::FanOn => "An error occurred while trying to turn on the fan.",
            Self::FanOff => "An error occurred while trying to turn off the fan.",
            Self::SetSpeed(_) => "An error occurred while trying to set the fan speed.",
            Self::ToggleOscillation(_) => {
                "An error occurred while trying to toggle the oscillation."
            }
            Self::QueryState => "An error occurred while trying to query the device state.",
        }
    }
}

/// The reply side of one interaction.
///
/// `reply` is the immediate response; `defer` sends the provisional
/// acknowledgment after which only `follow_up` may be used.
#[async_trait]
pub trait Responder: Send + Sync {
    fn caller_id(&self) -> u64;

    async fn reply(&self, text: &str) -> anyhow::Result<()>;

    async fn defer(&self) -> anyhow::Result<()>;

    async fn follow_up(&self, text: &str) -> anyhow::Result<()>;
}

/// Decides whether a caller may use the bot.
pub trait Authorizer: Send + Sync {
    fn is_allowed(&self, user_id: u64) -> bool;
}

#[derive(Debug, Clone)]
pub struct AllowList {
    users: HashSet<u64>,
}

impl AllowList {
    pub fn new(users: impl IntoIterator<Item = u64>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

impl Authorizer for AllowList {
    fn is_allowed(&self, user_id: u64) -> bool {
        self.users.contains(&user_id)
    }
}
