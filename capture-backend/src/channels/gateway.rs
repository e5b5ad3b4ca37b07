//! ChatGateway — the transport capability the capture pipeline consumes.
//!
//! The pipeline never sees transport types; a gateway delivers
//! `InboundMessage`s, sends replies and resolves attachment locators to bytes.

use crate::error::GatewayError;
use crate::models::{InboundMessage, SessionId};
use async_trait::async_trait;

/// Bytes of a downloaded attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    /// Transport-side path of the file (e.g. `photos/file_12.jpg`), used for
    /// extension detection
    pub source_path: Option<String>,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Next inbound message, or `None` once the transport is closed
    async fn receive_message(&self) -> Option<InboundMessage>;

    /// Send a text reply. Returns the sent message id when the transport has one.
    async fn send_text(&self, session: SessionId, text: &str) -> Result<Option<i32>, GatewayError>;

    /// Delete a previously sent message
    async fn delete_message(&self, _session: SessionId, _message_id: i32) -> Result<(), GatewayError> {
        Ok(())
    }

    /// Download an attachment by its locator
    async fn fetch_file(&self, locator: &str) -> Result<FetchedFile, GatewayError>;
}
