//! Anonymous story bot.
//!
//! Collects stories sent to the bot in private chats, stores them in a
//! JSON Lines log and posts them, without any author information, to a
//! public channel. Posting happens right away or on an admin's `/post`.
//!
//! ```bash
//! BOT_TOKEN=... CHANNEL_ID=@my_channel ADMIN_IDS=12345 cargo run -p story-bot
//! cargo run -p story-bot -- --mode manual --stories-file data/stories.jsonl
//! ```

mod bot;
mod channel;
mod outbox;
mod replies;
mod router;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use story_core::{BotConfig, PublishMode, StoryService};
use telegram::{ChatId, Telegram};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bot::Bot;
use channel::ChannelPublisher;
use outbox::Outbox;

/// Anonymous story bot
#[derive(Parser)]
#[command(name = "story-bot")]
#[command(about = "Collects anonymous stories and posts them to a Telegram channel", long_about = None)]
#[command(version)]
struct Cli {
    /// Story log location (overrides STORIES_FILE)
    #[arg(long)]
    stories_file: Option<PathBuf>,

    /// Publication mode: auto or manual (overrides STORY_PUBLISH_MODE)
    #[arg(long)]
    mode: Option<PublishMode>,

    /// Long-polling timeout in seconds
    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value_t = 30)]
    poll_timeout: u64,

    /// Log level
    #[arg(long, env = "STORY_BOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "STORY_BOT_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    let telegram = Telegram::from_env().context("BOT_TOKEN must be set (in .env or the environment)")?;

    let mut config = BotConfig::from_env()?;
    if let Some(path) = cli.stories_file {
        config.stories_path = path;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let channel = ChatId::parse(&config.channel).context("invalid CHANNEL_ID")?;

    tracing::info!(
        admins = ?config.privileged.ids(),
        channel = %channel,
        mode = ?config.mode,
        stories = %config.stories_path.display(),
        "starting story bot"
    );
    if config.privileged.is_empty() {
        tracing::warn!("no admins configured; /list and /post are disabled");
    }

    let outbox: Arc<dyn Outbox> = Arc::new(telegram.clone());
    let publisher = Arc::new(ChannelPublisher::new(outbox.clone(), channel));
    let service = StoryService::new(config, publisher)
        .await
        .context("failed to open story log")?;

    Bot::new(outbox, Arc::new(service))
        .run(telegram.updates(cli.poll_timeout), shutdown_signal())
        .await;

    tracing::info!("story bot stopped");
    Ok(())
}

/// Completes on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing in-flight updates");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, finishing in-flight updates");
        }
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
