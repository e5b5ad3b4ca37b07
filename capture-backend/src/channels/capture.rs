//! CaptureService — drives one inbound message through the capture pipeline.
//!
//! This is the error containment boundary: every stage returns a
//! `CaptureError`, which is logged in full here and turned into a short chat
//! reply. Nothing propagates to the caller, and a failed capture always leaves
//! the sender's session `Idle`.

use super::commands::{self, Command};
use super::gateway::ChatGateway;
use super::session::{CaptureSession, SessionState, SessionTable, parse_tags};
use crate::config::NotesConfig;
use crate::error::CaptureError;
use crate::models::{InboundMessage, MessageContent, SessionId};
use crate::notes::frontmatter;
use crate::notes::{ContentExtractor, ImageCache, NoteStore};
use chrono::{Local, NaiveDateTime};
use std::path::PathBuf;
use std::sync::Arc;

/// Source of the timestamp stamped on notes
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct CaptureService {
    sessions: SessionTable,
    extractor: ContentExtractor,
    store: NoteStore,
    clock: Clock,
}

impl CaptureService {
    pub fn new(config: &NotesConfig) -> Self {
        let image_cache = Arc::new(ImageCache::new(
            config.notes_dir.clone(),
            config.fetch_timeout,
        ));
        Self {
            sessions: SessionTable::new(),
            extractor: ContentExtractor::new(image_cache),
            store: NoteStore::new(config.notes_dir.clone(), config.collision_policy),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Whether `session` currently holds a capture waiting for tags
    pub async fn is_awaiting_tags(&self, session: SessionId) -> bool {
        self.sessions.handle(session).lock().await.is_awaiting_tags()
    }

    /// Handle one inbound message. Messages of one sender are serialized on
    /// the session lock.
    pub async fn handle(&self, gateway: &dyn ChatGateway, message: &InboundMessage) {
        let session_id = message.session_id;
        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;

        match Command::parse(message) {
            Some(Command::Start) | Some(Command::Help) => {
                self.reply(gateway, session_id, commands::WELCOME).await;
                return;
            }
            Some(Command::Cancel) => {
                self.cancel(gateway, &mut session, session_id).await;
                return;
            }
            Some(Command::Unknown) if session.is_awaiting_tags() => {
                self.reply(gateway, session_id, commands::BUSY).await;
                return;
            }
            Some(Command::Unknown) | None => {}
        }

        match session.take() {
            SessionState::Idle => {
                self.begin_capture(gateway, &mut session, message).await;
            }
            SessionState::AwaitingTags {
                content,
                prompt_message_id,
            } => {
                let tag_text = match (&message.text, &message.image) {
                    (Some(text), None) => text,
                    _ => {
                        // A new capture while one is pending: keep the pending one
                        session.restore(SessionState::AwaitingTags {
                            content,
                            prompt_message_id,
                        });
                        log::info!(
                            "[CAPTURE] Session {} rejected new content while awaiting tags",
                            session_id
                        );
                        self.reply(gateway, session_id, commands::BUSY).await;
                        return;
                    }
                };
                self.finish_capture(gateway, session_id, content, prompt_message_id, tag_text)
                    .await;
            }
        }
    }

    /// Idle → AwaitingTags. The prompt is sent only once attachments are resolved.
    async fn begin_capture(
        &self,
        gateway: &dyn ChatGateway,
        session: &mut CaptureSession,
        message: &InboundMessage,
    ) {
        let session_id = message.session_id;
        let content = match self.extractor.extract(message, gateway).await {
            Ok(content) => content,
            Err(e) => {
                self.report(gateway, session_id, &e).await;
                return;
            }
        };

        log::info!(
            "[CAPTURE] Session {} captured \"{}\" ({} image(s)), awaiting tags",
            session_id,
            content.title,
            content.image_refs.len()
        );

        let prompt_message_id = match gateway.send_text(session_id, commands::TAG_PROMPT).await {
            Ok(id) => id,
            Err(e) => {
                log::error!("[CAPTURE] Failed to send tag prompt to {}: {}", session_id, e);
                None
            }
        };
        session.await_tags(content, prompt_message_id);
    }

    /// AwaitingTags → Idle, persisting the note
    async fn finish_capture(
        &self,
        gateway: &dyn ChatGateway,
        session_id: SessionId,
        content: MessageContent,
        prompt_message_id: Option<i32>,
        tag_text: &str,
    ) {
        let tags = parse_tags(tag_text);
        let result = self.persist(content, tags);

        if let Some(prompt_id) = prompt_message_id {
            if let Err(e) = gateway.delete_message(session_id, prompt_id).await {
                log::debug!("[CAPTURE] Could not delete tag prompt {}: {}", prompt_id, e);
            }
        }

        match result {
            Ok((path, tags)) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let mut confirmation = format!("✅ Saved {}", file_name);
                if !tags.is_empty() {
                    confirmation.push_str(&format!("\nTags: {}", tags.join(" ")));
                }
                self.reply(gateway, session_id, &confirmation).await;
            }
            Err(e) => self.report(gateway, session_id, &e).await,
        }
    }

    fn persist(
        &self,
        mut content: MessageContent,
        tags: Vec<String>,
    ) -> Result<(PathBuf, Vec<String>), CaptureError> {
        if content.is_empty() {
            return Err(CaptureError::EmptyContent);
        }
        content.pending_tags = tags;

        let note = frontmatter::render(&content, &content.pending_tags, (self.clock)());
        let path = self.store.persist(&note)?;
        Ok((path, content.pending_tags))
    }

    async fn cancel(&self, gateway: &dyn ChatGateway, session: &mut CaptureSession, session_id: SessionId) {
        match session.take() {
            SessionState::AwaitingTags {
                content,
                prompt_message_id,
            } => {
                log::info!("[CAPTURE] Session {} cancelled \"{}\"", session_id, content.title);
                if let Some(prompt_id) = prompt_message_id {
                    if let Err(e) = gateway.delete_message(session_id, prompt_id).await {
                        log::debug!("[CAPTURE] Could not delete tag prompt {}: {}", prompt_id, e);
                    }
                }
                self.reply(gateway, session_id, commands::CANCELLED).await;
            }
            SessionState::Idle => {
                self.reply(gateway, session_id, commands::NOTHING_TO_CANCEL).await;
            }
        }
    }

    async fn report(&self, gateway: &dyn ChatGateway, session_id: SessionId, err: &CaptureError) {
        match err {
            CaptureError::EmptyContent => {
                log::info!("[CAPTURE] Session {}: {}", session_id, err)
            }
            CaptureError::Fetch(_) | CaptureError::Validation(_) => {
                log::warn!("[CAPTURE] Session {}: {}", session_id, err)
            }
            CaptureError::Persist { .. } => {
                log::error!("[CAPTURE] Session {}: {}", session_id, err)
            }
        }
        self.reply(gateway, session_id, err.user_message()).await;
    }

    async fn reply(&self, gateway: &dyn ChatGateway, session_id: SessionId, text: &str) {
        if let Err(e) = gateway.send_text(session_id, text).await {
            log::error!("[CAPTURE] Failed to reply to {}: {}", session_id, e);
        }
    }
}
