/// Title used when a capture has no text
pub const UNTITLED: &str = "Untitled";

/// Normalized content of one capture, held by the session until tags arrive
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageContent {
    pub title: String,
    pub body: String,
    /// Paths relative to the notes directory, in capture order
    pub image_refs: Vec<String>,
    /// Wikilink-formatted tags, filled in by the tag phase
    pub pending_tags: Vec<String>,
}

impl MessageContent {
    /// True when there is nothing worth persisting
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty() && self.image_refs.is_empty()
    }
}
