use std::sync::Arc;

use serenity::all::{
    ActivityData, Command, CommandDataOptionValue, CommandInteraction, CommandOptionType, Context,
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EventHandler,
    Interaction, OnlineStatus, Ready,
};
use serenity::async_trait;
use tracing::{error, info, warn};

use super::handler::{CommandHandler, CommandOutcome};
use super::{FanCommand, Responder, UNKNOWN_COMMAND_REPLY};

/// Discord rejects message content longer than this.
const MAX_MESSAGE_LEN: usize = 2000;

/// Result of registering the slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationSummary {
    pub registered: usize,
    pub total: usize,
}

pub struct Bot {
    handler: Arc<CommandHandler>,
    activity: String,
}

impl Bot {
    pub fn new(handler: Arc<CommandHandler>, activity: String) -> Self {
        Self { handler, activity }
    }
}

fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("fan_on").description("Turn on the fan"),
        CreateCommand::new("fan_off").description("Turn off the fan"),
        CreateCommand::new("set_speed")
            .description("Set the fan speed")
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "speed", "Speed (1-8)")
                    .required(true),
            ),
        CreateCommand::new("toggle_oscillation")
            .description("Toggle fan oscillation")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "toggle",
                    "1 to turn on, 0 to turn off",
                )
                .required(true),
            ),
        CreateCommand::new("query_state").description("Query the current state of the fan"),
    ]
}

/// Replace the bot's global commands with the fan commands.
pub async fn register_commands(ctx: &Context) -> anyhow::Result<RegistrationSummary> {
    let definitions = command_definitions();
    let total = definitions.len();
    let registered = Command::set_global_commands(&ctx.http, definitions).await?;

    for command in &registered {
        info!("Registered /{}", command.name);
    }

    Ok(RegistrationSummary {
        registered: registered
            .iter()
            .filter(|c| FanCommand::NAMES.contains(&c.name.as_str()))
            .count(),
        total,
    })
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_presence(
            Some(ActivityData::watching(self.activity.as_str())),
            OnlineStatus::Idle,
        );

        match register_commands(&ctx).await {
            Ok(summary) => info!(
                "Registered [{}/{}] slash commands",
                summary.registered, summary.total
            ),
            Err(e) => error!("Failed to register slash commands: {:#}", e),
        }

        info!("Connected as {}", ready.user.name);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let responder = SlashResponder {
            ctx: &ctx,
            interaction: &command,
        };

        let Some(fan_command) = FanCommand::parse(&command.data.name, |name| {
            integer_option(&command, name)
        }) else {
            warn!("Unknown command: /{}", command.data.name);
            if let Err(e) = responder.reply(UNKNOWN_COMMAND_REPLY).await {
                error!("Failed to reply: {:#}", e);
            }
            return;
        };

        match self.handler.handle(fan_command, &responder).await {
            CommandOutcome::ConfigMissing(e) => e.abort(),
            outcome => info!("/{} resolved: {:?}", fan_command.name(), outcome),
        }
    }
}

fn integer_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match o.value {
            CommandDataOptionValue::Integer(v) => Some(v),
            _ => None,
        })
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

struct SlashResponder<'a> {
    ctx: &'a Context,
    interaction: &'a CommandInteraction,
}

#[async_trait]
impl Responder for SlashResponder<'_> {
    fn caller_id(&self) -> u64 {
        self.interaction.user.id.get()
    }

    async fn reply(&self, text: &str) -> anyhow::Result<()> {
        let message = CreateInteractionResponseMessage::new().content(truncate(text));
        self.interaction
            .create_response(&self.ctx.http, CreateInteractionResponse::Message(message))
            .await?;
        Ok(())
    }

    async fn defer(&self) -> anyhow::Result<()> {
        self.interaction.defer(&self.ctx.http).await?;
        Ok(())
    }

    async fn follow_up(&self, text: &str) -> anyhow::Result<()> {
        let followup = CreateInteractionResponseFollowup::new().content(truncate(text));
        self.interaction
            .create_followup(&self.ctx.http, followup)
            .await?;
        Ok(())
    }
}
