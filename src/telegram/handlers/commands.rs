//! Command handlers: /start, /status, /cleanup, /formats, /version

use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError};
use crate::download::library::{cleanup_duplicates, library_stats};
use crate::download::ytdlp::{engine_version, list_formats};
use crate::telegram::messages;

pub(super) async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, messages::welcome()).await?;
    Ok(())
}

pub(super) async fn handle_status_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let dirs = deps.downloads.dirs().clone();
    let stats = tokio::task::spawn_blocking(move || library_stats(&dirs)).await?;
    let active = deps.downloads.registry().active_count();
    bot.send_message(msg.chat.id, messages::status(&stats, active)).await?;
    Ok(())
}

pub(super) async fn handle_cleanup_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let status = bot.send_message(msg.chat.id, "Removing duplicate files...").await?;

    let dirs = deps.downloads.dirs().clone();
    let text = match tokio::task::spawn_blocking(move || cleanup_duplicates(&dirs)).await {
        Ok(removed) => messages::cleanup_done(removed),
        Err(e) => {
            log::error!("Cleanup task failed: {}", e);
            format!("Cleanup failed: {}", e)
        }
    };
    bot.edit_message_text(msg.chat.id, status.id, text).await?;
    Ok(())
}

pub(super) async fn handle_formats_command(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    url: &str,
) -> Result<(), HandlerError> {
    let url = url.trim();
    if url.is_empty() {
        bot.send_message(msg.chat.id, messages::formats_usage()).await?;
        return Ok(());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        bot.send_message(msg.chat.id, "Please provide a valid video link").await?;
        return Ok(());
    }

    let status = bot.send_message(msg.chat.id, "Checking video formats...").await?;
    let text = match list_formats(&deps.engine, url, deps.proxy.as_deref()).await {
        Ok(listing) => messages::formats(&listing),
        Err(e) => {
            log::warn!("Format check for {} failed: {}", url, e);
            format!("Format check failed: {}", e)
        }
    };
    bot.edit_message_text(msg.chat.id, status.id, text).await?;
    Ok(())
}

pub(super) async fn handle_version_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let text = match engine_version(&deps.engine).await {
        Ok(version) => messages::version(&version),
        Err(e) => format!("Cannot get version information: {}", e),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
