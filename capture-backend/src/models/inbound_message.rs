use std::fmt;

/// Chat identifier a capture session is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of rich-text annotation supplied by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// Bare URL typed in the text
    Url,
    /// Text with an attached hyperlink
    TextLink { url: String },
    /// Inline code span
    Code,
    /// Preformatted block, optionally with a language
    Pre { language: Option<String> },
}

/// A span over the raw message text.
///
/// `offset` and `length` are counted in UTF-16 code units, as Telegram
/// reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl TextEntity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }
}

/// One resolution of an attached image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVariant {
    /// Opaque handle the gateway resolves into bytes (Telegram file id)
    pub locator: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u32>,
}

/// An attached image, available in several resolutions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageAttachment {
    pub variants: Vec<ImageVariant>,
}

impl ImageAttachment {
    /// Highest-resolution variant (largest area, then largest file)
    pub fn largest(&self) -> Option<&ImageVariant> {
        self.variants.iter().max_by_key(|v| {
            (
                u64::from(v.width) * u64::from(v.height),
                v.file_size.unwrap_or(0),
            )
        })
    }
}

/// A message as delivered by the chat transport. Never mutated after receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub session_id: SessionId,
    pub message_id: i32,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// `None` when the transport does not report entities at all
    pub entities: Option<Vec<TextEntity>>,
    pub image: Option<ImageAttachment>,
}

impl InboundMessage {
    /// Plain text message with an empty entity list
    pub fn text(session_id: SessionId, message_id: i32, text: &str) -> Self {
        Self {
            session_id,
            message_id,
            text: Some(text.to_string()),
            caption: None,
            entities: Some(Vec::new()),
            image: None,
        }
    }

    pub fn with_entities(mut self, entities: Vec<TextEntity>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn without_entities(mut self) -> Self {
        self.entities = None;
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Text content by priority: text, then caption. Blank strings count as absent.
    pub fn chosen_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Bot command name if the message is a `/command` (bot mention stripped)
    pub fn command(&self) -> Option<String> {
        let text = self.text.as_deref()?.trim();
        let first = text.split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        Some(name.to_lowercase())
    }
}
