//! Photo and document handlers: files are stored locally, `.torrent`
//! documents go to qBittorrent.

use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, Message};
use tokio::io::AsyncWriteExt;

use super::types::{HandlerDeps, HandlerError};
use crate::core::utils::redact_bot_token;
use crate::download::files::FileKind;
use crate::telegram::messages;
use crate::torrent::is_torrent_file;

/// Streams a Telegram file into `dest`, returning the bytes written.
async fn save_telegram_file(bot: &Bot, file_id: FileId, dest: &Path) -> Result<u64, HandlerError> {
    let file = bot.get_file(file_id).await?;
    log::info!("Saving Telegram file {} ({} bytes) to {}", file.path, file.size, dest.display());

    let mut dst = tokio::fs::File::create(dest).await?;
    bot.download_file(&file.path, &mut dst).await?;
    dst.flush().await?;
    Ok(dst.metadata().await?.len())
}

/// Reads a small Telegram file (a `.torrent`) into memory.
async fn read_telegram_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>, HandlerError> {
    let file = bot.get_file(file_id).await?;
    let mut bytes = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut bytes).await?;
    Ok(bytes)
}

async fn fetch_telegram_file(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    file_id: FileId,
    name: &str,
    kind: FileKind,
) -> Result<(), HandlerError> {
    let status = bot.send_message(msg.chat.id, "Downloading file...").await?;

    let reserved = deps.files.reserve(name, kind);
    let text = match save_telegram_file(bot, file_id, &reserved.path).await {
        Ok(size) => {
            log::info!("Saved {} ({} bytes)", reserved.path.display(), size);
            messages::file_saved(&reserved.into_fetched(size))
        }
        Err(e) => {
            let reason = redact_bot_token(&e.to_string());
            log::error!("Saving {} failed: {}", name, reason);
            reserved.discard().await;
            format!("File download failed: {}", reason)
        }
    };
    bot.edit_message_text(msg.chat.id, status.id, text).await?;
    Ok(())
}

pub(super) async fn handle_photo(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    // Telegram lists sizes smallest first.
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };
    let name = format!("photo_{}.jpg", chrono::Utc::now().timestamp());
    fetch_telegram_file(bot, msg, deps, photo.file.id.clone(), &name, FileKind::Image).await
}

pub(super) async fn handle_document(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(document) = msg.document() else {
        return Ok(());
    };
    let name = document
        .file_name
        .clone()
        .unwrap_or_else(|| format!("file_{}", chrono::Utc::now().timestamp()));

    if !is_torrent_file(&name) {
        return fetch_telegram_file(bot, msg, deps, document.file.id.clone(), &name, FileKind::Document).await;
    }

    let Some(torrents) = deps.torrents.as_ref() else {
        bot.send_message(msg.chat.id, messages::torrent_disabled()).await?;
        return Ok(());
    };

    let status = bot.send_message(msg.chat.id, "Processing torrent file...").await?;
    let text = match read_telegram_file(bot, document.file.id.clone()).await {
        Ok(bytes) => match torrents.enqueue_file_and_summarize(&name, bytes).await {
            Ok(summary) => messages::torrent_added(&summary),
            Err(e) => {
                log::error!("Adding torrent file {} failed: {}", name, e);
                format!("Failed to add torrent: {}", e)
            }
        },
        Err(e) => {
            let reason = redact_bot_token(&e.to_string());
            log::error!("Reading torrent file {} failed: {}", name, reason);
            format!("Failed to add torrent: {}", reason)
        }
    };
    bot.edit_message_text(msg.chat.id, status.id, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123456:SECRETTOKEN";

    fn bot_against(server: &MockServer) -> Bot {
        let api_url = reqwest::Url::parse(&server.uri()).unwrap();
        Bot::new(TOKEN).set_api_url(api_url)
    }

    async fn mount_get_file(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)^/bot123456:SECRETTOKEN/getfile$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {
                    "file_id": "doc-1",
                    "file_unique_id": "u-1",
                    "file_size": 4,
                    "file_path": "documents/file_1.pdf"
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_save_telegram_file_streams_to_disk() {
        let server = MockServer::start().await;
        mount_get_file(&server).await;
        Mock::given(method("GET"))
            .and(path("/file/bot123456:SECRETTOKEN/documents/file_1.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("1700000000_report.pdf");
        let bot = bot_against(&server);

        let size = save_telegram_file(&bot, FileId("doc-1".into()), &dest).await.unwrap();
        assert_eq!(size, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_unreachable_api_error_text_has_no_token() {
        let server = MockServer::start().await;
        let bot = bot_against(&server);
        drop(server);

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("report.pdf");

        let err = save_telegram_file(&bot, FileId("doc-1".into()), &dest).await.unwrap_err();
        let reason = redact_bot_token(&err.to_string());
        assert!(!reason.contains("SECRETTOKEN"), "{}", reason);
        assert!(!dest.exists());
    }
}
