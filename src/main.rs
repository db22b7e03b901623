mod bot;
mod config;
mod govee;

use std::sync::Arc;

use serenity::all::GatewayIntents;
use tracing::{error, info};

use config::{ConfigFile, ConfigProvider};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = match config::Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let config_file = Arc::new(ConfigFile::new(&settings.config_file));
    let token = config_file.get("token");

    info!(
        "Starting govee-fan-bot (config={}, api={}, allowed users={})",
        config_file.path().display(),
        settings.govee.api_base,
        settings.discord.allowed_users.len(),
    );
    if !settings.govee.report_control_failures {
        info!("Control failures are logged only; set GOVEE_REPORT_CONTROL_FAILURES=true to report them");
    }

    let govee = match govee::client::GoveeClient::new(&settings.govee.api_base, settings.govee.timeout)
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let handler = bot::handler::CommandHandler::new(
        config_file,
        govee,
        Arc::new(bot::AllowList::new(settings.discord.allowed_users.iter().copied())),
    )
    .report_control_failures(settings.govee.report_control_failures);

    let event_handler = bot::discord::Bot::new(Arc::new(handler), settings.discord.activity.clone());

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
    let mut client = match serenity::Client::builder(&token, intents)
        .event_handler(event_handler)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Discord client: {}", e);
            std::process::exit(1);
        }
    };

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = client.start() => {
            if let Err(e) = result {
                error!("Discord client stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down");
        }
    }

    shard_manager.shutdown_all().await;
    info!("govee-fan-bot stopped");
}

async fn sigterm() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
