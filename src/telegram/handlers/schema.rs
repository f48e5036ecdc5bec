//! Dispatcher schema: commands, photos, documents, then plain text.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_cleanup_command, handle_formats_command, handle_start_command, handle_status_command,
    handle_version_command,
};
use super::types::{route_text, HandlerDeps, HandlerError, TextRoute};
use super::uploads::{handle_document, handle_photo};
use crate::telegram::bot::Command;
use crate::telegram::messages;
use crate::telegram::sink::{NotificationSink, TelegramSink};

/// Creates the main dispatcher schema
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(photo_handler(deps.clone()))
        .branch(document_handler(deps.clone()))
        .branch(text_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                match cmd {
                    Command::Start => handle_start_command(&bot, &msg).await,
                    Command::Status => handle_status_command(&bot, &msg, &deps).await,
                    Command::Cleanup => handle_cleanup_command(&bot, &msg, &deps).await,
                    Command::Formats(url) => handle_formats_command(&bot, &msg, &deps, &url).await,
                    Command::Version => handle_version_command(&bot, &msg, &deps).await,
                }
            }
        },
    ))
}

fn photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.photo().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_photo(&bot, &msg, &deps).await }
        })
}

fn document_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.document().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_document(&bot, &msg, &deps).await }
        })
}

fn text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let text = msg.text().unwrap_or_default();
                match route_text(text) {
                    TextRoute::Torrent(link) => handle_torrent_link(&bot, &msg, &deps, &link).await,
                    TextRoute::Download(url) => {
                        start_download(bot, &msg, &deps, url);
                        Ok(())
                    }
                    TextRoute::Invalid => {
                        bot.send_message(msg.chat.id, messages::invalid_link()).await?;
                        Ok(())
                    }
                }
            }
        })
}

/// Runs the download on its own task so the chat stays responsive while it
/// progresses.
fn start_download(bot: Bot, msg: &Message, deps: &HandlerDeps, url: String) {
    let sink: Arc<dyn NotificationSink> = Arc::new(TelegramSink::new(bot, msg.chat.id));
    let downloads = Arc::clone(&deps.downloads);
    let chat_id = msg.chat.id;
    tokio::spawn(async move {
        if let Err(e) = downloads.handle_url(sink, &url).await {
            log::error!("Download for chat {} could not start: {}", chat_id, e);
        }
    });
}

async fn handle_torrent_link(bot: &Bot, msg: &Message, deps: &HandlerDeps, link: &str) -> Result<(), HandlerError> {
    let Some(torrents) = deps.torrents.as_ref() else {
        bot.send_message(msg.chat.id, messages::torrent_disabled()).await?;
        return Ok(());
    };

    let status = bot.send_message(msg.chat.id, "Adding torrent...").await?;
    let text = match torrents.enqueue_and_summarize(link).await {
        Ok(summary) => messages::torrent_added(&summary),
        Err(e) => {
            log::error!("Adding torrent {} failed: {}", link, e);
            format!("Failed to add torrent: {}", e)
        }
    };
    bot.edit_message_text(msg.chat.id, status.id, text).await?;
    Ok(())
}
