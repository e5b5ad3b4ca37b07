//! Per-sender capture state machine and the table that holds it.
//!
//! A session is `Idle` until a content message arrives, then `AwaitingTags`
//! until the user answers with tags (or cancels). Handlers `take()` the state
//! out before working on it, so any early return leaves the slot `Idle`.

use crate::models::{MessageContent, SessionId};
use crate::notes::frontmatter::wikilink;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Prefix that marks a token as a tag
pub const TAG_MARKER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingTags {
        content: MessageContent,
        /// Id of the "send tags" prompt, deleted once the capture finishes
        prompt_message_id: Option<i32>,
    },
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingTags { .. } => "awaiting_tags",
        }
    }
}

#[derive(Debug, Default)]
pub struct CaptureSession {
    state: SessionState,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_awaiting_tags(&self) -> bool {
        matches!(self.state, SessionState::AwaitingTags { .. })
    }

    /// Move to `AwaitingTags` holding `content`
    pub fn await_tags(&mut self, content: MessageContent, prompt_message_id: Option<i32>) {
        self.state = SessionState::AwaitingTags {
            content,
            prompt_message_id,
        };
    }

    /// Take the current state out, leaving the session `Idle`
    pub fn take(&mut self) -> SessionState {
        std::mem::take(&mut self.state)
    }

    /// Put a state back after a rejected message
    pub fn restore(&mut self, state: SessionState) {
        self.state = state;
    }
}

/// Sessions keyed by sender. Each session sits behind its own lock so work on
/// one sender is serialized while other senders proceed.
#[derive(Default)]
pub struct SessionTable {
    sessions: DashMap<SessionId, Arc<Mutex<CaptureSession>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for `id`, creating an idle one on first use
    pub fn handle(&self, id: SessionId) -> Arc<Mutex<CaptureSession>> {
        self.sessions
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(CaptureSession::new())))
            .clone()
    }

    /// Number of senders seen since startup
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Parse a tag reply into wikilinks.
///
/// Tokens starting with `#` become `[[Capitalized]]`; everything else is
/// dropped. Duplicates keep their first position.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in input.split_whitespace() {
        let Some(raw) = token.strip_prefix(TAG_MARKER) else {
            continue;
        };
        let name: String = raw
            .trim_start_matches(TAG_MARKER)
            .trim_end_matches([',', '.', ';', ':', '!', '?'])
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | '|'))
            .collect();
        if name.is_empty() {
            continue;
        }
        let tag = wikilink(&capitalize(&name));
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Upper-case the first character, lower-case the rest
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
