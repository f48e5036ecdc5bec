//! Bot initialization and command definitions
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation (proxy-aware)
//! - Command menu registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::{BotCommands, ParseError};

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the help message")]
    Start,
    #[command(description = "show download statistics")]
    Status,
    #[command(description = "remove duplicate files")]
    Cleanup,
    #[command(description = "list available formats for a video link", parse_with = optional_argument)]
    Formats(String),
    #[command(description = "show the yt-dlp version")]
    Version,
}

/// Takes the whole argument string as is, accepting an empty one.
fn optional_argument(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Creates a Bot instance, routing Bot API traffic through `proxy` when given
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid proxy/client settings
pub fn create_bot(proxy: Option<&str>) -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("TELEGRAM_BOT_TOKEN is not set");
    }

    let mut builder = ClientBuilder::new().timeout(config::network::timeout());
    if let Some(proxy) = proxy {
        log::info!("Bot API requests go through proxy {}", proxy);
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(Bot::with_client(config::BOT_TOKEN.as_str(), builder.build()?))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
