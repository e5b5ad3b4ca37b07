//! In-memory ChatGateway for tests

use super::gateway::{ChatGateway, FetchedFile};
use crate::error::GatewayError;
use crate::models::{InboundMessage, SessionId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

pub struct MockGateway {
    inbox: Mutex<VecDeque<InboundMessage>>,
    sent: Mutex<Vec<(SessionId, String)>>,
    deleted: Mutex<Vec<(SessionId, i32)>>,
    files: Mutex<HashMap<String, FetchedFile>>,
    fetch_delay: Option<Duration>,
    fetches: AtomicUsize,
    next_message_id: AtomicI32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            inbox: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            fetch_delay: None,
            fetches: AtomicUsize::new(0),
            next_message_id: AtomicI32::new(1000),
        }
    }

    /// Every fetch sleeps this long before answering
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn add_file(&self, locator: &str, bytes: &[u8], source_path: Option<&str>) {
        self.files.lock().unwrap().insert(
            locator.to_string(),
            FetchedFile {
                bytes: bytes.to_vec(),
                source_path: source_path.map(str::to_string),
            },
        );
    }

    pub fn push_inbound(&self, message: InboundMessage) {
        self.inbox.lock().unwrap().push_back(message);
    }

    /// Texts sent to a session, in order
    pub fn sent_to(&self, session: SessionId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == session)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last_sent(&self, session: SessionId) -> Option<String> {
        self.sent_to(session).pop()
    }

    pub fn deleted(&self) -> Vec<(SessionId, i32)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn receive_message(&self) -> Option<InboundMessage> {
        self.inbox.lock().unwrap().pop_front()
    }

    async fn send_text(&self, session: SessionId, text: &str) -> Result<Option<i32>, GatewayError> {
        self.sent.lock().unwrap().push((session, text.to_string()));
        Ok(Some(self.next_message_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete_message(&self, session: SessionId, message_id: i32) -> Result<(), GatewayError> {
        self.deleted.lock().unwrap().push((session, message_id));
        Ok(())
    }

    async fn fetch_file(&self, locator: &str) -> Result<FetchedFile, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.files
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| GatewayError::FileNotFound(locator.to_string()))
    }
}
