//! Telegram transport: long polling via teloxide, exposed as a ChatGateway.

use super::gateway::{ChatGateway, FetchedFile};
use crate::error::GatewayError;
use crate::models::{EntityKind, ImageAttachment, ImageVariant, InboundMessage, SessionId, TextEntity};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageEntity, MessageEntityKind, MessageId};
use tokio::sync::{Mutex, mpsc};

pub struct TelegramGateway {
    bot: Bot,
    inbox: Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
}

impl TelegramGateway {
    /// Start long polling in the background. The inbox closes when polling
    /// stops (ctrl-c).
    pub fn start(bot: Bot) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = bot.clone();

        tokio::spawn(async move {
            log::info!("[TELEGRAM] Long polling started");
            teloxide::repl(listener, move |msg: Message| {
                let tx = tx.clone();
                async move {
                    if tx.send(to_inbound(&msg)).is_err() {
                        log::warn!("[TELEGRAM] Inbox closed, dropping message {}", msg.id.0);
                    }
                    respond(())
                }
            })
            .await;
            log::info!("[TELEGRAM] Long polling stopped");
        });

        Self {
            bot,
            inbox: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn receive_message(&self) -> Option<InboundMessage> {
        self.inbox.lock().await.recv().await
    }

    async fn send_text(&self, session: SessionId, text: &str) -> Result<Option<i32>, GatewayError> {
        let sent = self
            .bot
            .send_message(ChatId(session.0), text)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Some(sent.id.0))
    }

    async fn delete_message(&self, session: SessionId, message_id: i32) -> Result<(), GatewayError> {
        self.bot
            .delete_message(ChatId(session.0), MessageId(message_id))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn fetch_file(&self, locator: &str) -> Result<FetchedFile, GatewayError> {
        let file = self
            .bot
            .get_file(locator)
            .await
            .map_err(|e| GatewayError::FileNotFound(format!("{}: {}", locator, e)))?;

        let mut bytes = Vec::with_capacity(file.meta.size as usize);
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        log::debug!("[TELEGRAM] Downloaded {} ({} bytes)", file.path, bytes.len());
        Ok(FetchedFile {
            bytes,
            source_path: Some(file.path),
        })
    }
}

/// Convert a Telegram message into the transport-neutral form
fn to_inbound(msg: &Message) -> InboundMessage {
    let text = msg.text().map(str::to_string);
    let caption = msg.caption().map(str::to_string);

    // Caption entities are addressed over the caption, text entities over the text
    let raw_entities = if text.is_some() {
        msg.entities()
    } else {
        msg.caption_entities()
    };
    let entities = raw_entities
        .map(|list| list.iter().filter_map(convert_entity).collect())
        .unwrap_or_default();

    let image = msg.photo().map(|sizes| ImageAttachment {
        variants: sizes
            .iter()
            .map(|p| ImageVariant {
                locator: p.file.id.clone(),
                width: p.width,
                height: p.height,
                file_size: Some(p.file.size),
            })
            .collect(),
    });

    InboundMessage {
        session_id: SessionId(msg.chat.id.0),
        message_id: msg.id.0,
        text,
        caption,
        entities: Some(entities),
        image,
    }
}

/// Keep the entity kinds the note body cares about
fn convert_entity(entity: &MessageEntity) -> Option<TextEntity> {
    let kind = match &entity.kind {
        MessageEntityKind::Url => EntityKind::Url,
        MessageEntityKind::TextLink { url } => EntityKind::TextLink {
            url: url.to_string(),
        },
        MessageEntityKind::Code => EntityKind::Code,
        MessageEntityKind::Pre { language } => EntityKind::Pre {
            language: language.clone(),
        },
        _ => return None,
    };
    Some(TextEntity::new(kind, entity.offset, entity.length))
}
