//! Where task notifications go.
//!
//! The download service only needs "send a message, then keep editing it". The
//! production sink is a Telegram chat; tests use a recording sink.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::{ApiError, RequestError};

use crate::core::error::AppResult;

/// Handle to a sent message that can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub i32);

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a new message and returns its handle.
    async fn send(&self, text: &str) -> AppResult<MessageHandle>;

    /// Replaces the text of a previously sent message.
    async fn edit(&self, handle: MessageHandle, text: &str) -> AppResult<()>;
}

/// Sink bound to one Telegram chat.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, text: &str) -> AppResult<MessageHandle> {
        let msg = self.bot.send_message(self.chat_id, text).await?;
        Ok(MessageHandle(msg.id.0))
    }

    async fn edit(&self, handle: MessageHandle, text: &str) -> AppResult<()> {
        match self.bot.edit_message_text(self.chat_id, MessageId(handle.0), text).await {
            Ok(_) => Ok(()),
            // Same text twice in a row (e.g. two identical progress renders)
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
