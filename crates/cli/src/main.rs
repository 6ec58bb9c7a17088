//! mailgram — forward one inbound email to a Telegram chat.
//!
//! Reads a raw RFC 5322 message from stdin (or a file), renders the body
//! into bounded MarkdownV2 segments, and delivers them as a reply chain
//! followed by the attachments. Designed to sit behind an MTA pipe alias
//! or any other mail source that hands over one complete message.

use {
    anyhow::Context,
    clap::Parser,
    secrecy::Secret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    mailgram_bridge::forward_mail,
    mailgram_telegram::{TelegramApi, TelegramConfig},
};

#[derive(Parser)]
#[command(name = "mailgram", about = "Forward inbound email to a Telegram chat")]
struct Cli {
    /// Bot token from @BotFather.
    #[arg(long, env = "MAILGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Destination chat: numeric ID or @channelname.
    #[arg(long, env = "MAILGRAM_CHAT_ID")]
    chat_id: String,

    /// Read the raw message from this file instead of stdin.
    #[arg(long)]
    input: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let raw = match &cli.input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            use std::io::Read;
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read message from stdin")?;
            buf
        },
    };

    let api = TelegramApi::new(TelegramConfig {
        token: Secret::new(cli.bot_token),
        chat_id: cli.chat_id,
        ..Default::default()
    });

    let report = forward_mail(&api, &raw).await?;
    info!(
        segments = report.segments_sent,
        attachments = report.attachments_sent,
        skipped = report.attachments_skipped,
        fallback = report.fallback,
        "mail forwarded"
    );
    Ok(())
}

fn init_tracing(log_level: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
