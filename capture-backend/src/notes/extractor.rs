//! ContentExtractor — turns an inbound chat message into `MessageContent`.
//!
//! Rich-text entities are rewritten into Markdown in one pass over sorted,
//! non-overlapping byte spans: untouched runs between spans are copied as is,
//! so offsets never drift after an earlier rewrite. Transports that report no
//! entities at all get a plain-text URL scan instead, appended as a link list.

use crate::channels::gateway::ChatGateway;
use crate::error::CaptureError;
use crate::models::{EntityKind, ImageAttachment, InboundMessage, MessageContent, TextEntity, UNTITLED};
use crate::notes::image_cache::ImageCache;
use regex::Regex;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

static PLAIN_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).unwrap());

const FENCE: &str = "```";

pub struct ContentExtractor {
    image_cache: Arc<ImageCache>,
}

impl ContentExtractor {
    pub fn new(image_cache: Arc<ImageCache>) -> Self {
        Self { image_cache }
    }

    /// Extract title, body and cached image references from a message.
    ///
    /// Attachments are fully resolved before this returns.
    pub async fn extract(
        &self,
        message: &InboundMessage,
        gateway: &dyn ChatGateway,
    ) -> Result<MessageContent, CaptureError> {
        let text = message.chosen_text();
        let image = message.image.as_ref().and_then(ImageAttachment::largest);

        if text.is_none() && image.is_none() {
            return Err(CaptureError::EmptyContent);
        }

        let title = text.map(title_of).unwrap_or_else(|| UNTITLED.to_string());
        let body = match (text, &message.entities) {
            (None, _) => String::new(),
            (Some(text), Some(entities)) => rewrite_entities(text, entities).trim().to_string(),
            (Some(text), None) => append_plain_links(text.trim()),
        };

        let mut image_refs = Vec::new();
        if let Some(variant) = image {
            log::debug!(
                "[CAPTURE] Resolving {}x{} image for session {}",
                variant.width,
                variant.height,
                message.session_id
            );
            let rel = self
                .image_cache
                .fetch_and_store(gateway, &variant.locator)
                .await?;
            image_refs.push(rel);
        }

        Ok(MessageContent {
            title,
            body,
            image_refs,
            pending_tags: Vec::new(),
        })
    }
}

/// First non-empty line, trimmed
pub fn title_of(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}

/// Rewrite url/text_link/code entities into Markdown.
///
/// Entities that fall outside the text or overlap an earlier one are skipped.
pub fn rewrite_entities(text: &str, entities: &[TextEntity]) -> String {
    let mut spans: Vec<(Range<usize>, &TextEntity)> = entities
        .iter()
        .filter_map(|entity| match byte_span(text, entity.offset, entity.length) {
            Some(range) if !range.is_empty() => Some((range, entity)),
            _ => {
                log::warn!(
                    "[CAPTURE] Skipping entity {:?} at {}+{}: outside text",
                    entity.kind,
                    entity.offset,
                    entity.length
                );
                None
            }
        })
        .collect();
    spans.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(text.len() + 64);
    let mut cursor = 0;
    for (range, entity) in spans {
        if range.start < cursor {
            log::warn!("[CAPTURE] Skipping overlapping entity {:?}", entity.kind);
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        let source = &text[range.clone()];

        match &entity.kind {
            EntityKind::Url => out.push_str(&markdown_link(source, &url_target(source))),
            EntityKind::TextLink { url } => {
                if source.trim().is_empty() {
                    out.push_str(&markdown_link(url, url));
                } else {
                    out.push_str(&markdown_link(source, url));
                }
            }
            EntityKind::Code => push_block(&mut out, &fenced(source, None), &text[range.end..]),
            EntityKind::Pre { language } => {
                push_block(&mut out, &fenced(source, language.as_deref()), &text[range.end..])
            }
        }
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Append a `## Links` section listing distinct plain-text URLs, if any
pub fn append_plain_links(text: &str) -> String {
    let mut links: Vec<&str> = Vec::new();
    for m in PLAIN_URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !links.contains(&url) {
            links.push(url);
        }
    }

    if links.is_empty() {
        return text.to_string();
    }

    let list = links
        .iter()
        .map(|url| format!("- {}", url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n## Links\n{}", text, list)
}

/// Convert a UTF-16 offset/length pair into a byte range of `text`
fn byte_span(text: &str, offset: usize, length: usize) -> Option<Range<usize>> {
    let end_units = offset.checked_add(length)?;
    let mut units = 0;
    let mut start = None;
    let mut end = None;

    for (idx, ch) in text.char_indices() {
        if units == offset {
            start = Some(idx);
        }
        if units == end_units {
            end = Some(idx);
            break;
        }
        units += ch.len_utf16();
    }
    if end.is_none() && units == end_units {
        end = Some(text.len());
    }
    if start.is_none() && units == offset {
        start = Some(text.len());
    }

    match (start, end) {
        (Some(start), Some(end)) if start <= end => Some(start..end),
        _ => None,
    }
}

fn markdown_link(label: &str, target: &str) -> String {
    format!("[{}]({})", label, target)
}

fn url_target(source: &str) -> String {
    if source.contains("://") {
        source.to_string()
    } else {
        format!("https://{}", source)
    }
}

fn fenced(source: &str, language: Option<&str>) -> String {
    let trimmed = source.trim();
    if trimmed.len() >= 2 * FENCE.len() && trimmed.starts_with(FENCE) && trimmed.ends_with(FENCE) {
        return trimmed.to_string();
    }
    format!("{}{}\n{}\n{}", FENCE, language.unwrap_or(""), source.trim_matches('\n'), FENCE)
}

/// Push a block so that it sits on lines of its own
fn push_block(out: &mut String, block: &str, following: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(block);
    if !following.is_empty() && !following.starts_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::mock::MockGateway;
    use crate::models::{ImageVariant, SessionId};
    use std::time::Duration;
    use tempfile::tempdir;

    fn entity(kind: EntityKind, offset: usize, length: usize) -> TextEntity {
        TextEntity::new(kind, offset, length)
    }

    fn link(url: &str) -> EntityKind {
        EntityKind::TextLink {
            url: url.to_string(),
        }
    }

    fn extractor_in(dir: &std::path::Path) -> ContentExtractor {
        ContentExtractor::new(Arc::new(ImageCache::new(
            dir.to_path_buf(),
            Duration::from_secs(5),
        )))
    }

    #[test]
    fn test_title_of() {
        assert_eq!(title_of("Buy milk\n#errands"), "Buy milk");
        assert_eq!(title_of("\n\n   Second line  \nthird"), "Second line");
        assert_eq!(title_of("   "), "Untitled");
    }

    #[test]
    fn test_text_link_inline() {
        let text = "Read the docs today";
        let out = rewrite_entities(text, &[entity(link("https://example.com"), 9, 4)]);
        assert_eq!(out, "Read the [docs](https://example.com) today");
    }

    #[test]
    fn test_url_entity() {
        let text = "see example.com and https://rust-lang.org";
        let out = rewrite_entities(
            text,
            &[entity(EntityKind::Url, 4, 11), entity(EntityKind::Url, 20, 21)],
        );
        assert_eq!(
            out,
            "see [example.com](https://example.com) and [https://rust-lang.org](https://rust-lang.org)"
        );
    }

    #[test]
    fn test_text_link_without_label_uses_url() {
        let text = "a   b";
        let out = rewrite_entities(text, &[entity(link("https://x.io"), 1, 3)]);
        assert_eq!(out, "a[https://x.io](https://x.io)b");
    }

    #[test]
    fn test_multiple_entities_do_not_drift() {
        // Supplied out of order; each rewrite lengthens the text
        let text = "one two three";
        let out = rewrite_entities(
            text,
            &[
                entity(link("https://3.example"), 8, 5),
                entity(link("https://1.example"), 0, 3),
                entity(link("https://2.example"), 4, 3),
            ],
        );
        assert_eq!(
            out,
            "[one](https://1.example) [two](https://2.example) [three](https://3.example)"
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // The emoji is two UTF-16 units and four bytes
        let text = "🚀 launch notes";
        let out = rewrite_entities(text, &[entity(link("https://l.example"), 3, 6)]);
        assert_eq!(out, "🚀 [launch](https://l.example) notes");

        let text = "Привет мир";
        let out = rewrite_entities(text, &[entity(link("https://w.example"), 7, 3)]);
        assert_eq!(out, "Привет [мир](https://w.example)");
    }

    #[test]
    fn test_code_entity_is_fenced_on_own_lines() {
        let text = "run cargo test now";
        let out = rewrite_entities(text, &[entity(EntityKind::Code, 4, 10)]);
        assert_eq!(out, "run \n```\ncargo test\n```\n now");
    }

    #[test]
    fn test_pre_entity_keeps_language() {
        let text = "fn main() {}";
        let out = rewrite_entities(
            text,
            &[entity(
                EntityKind::Pre {
                    language: Some("rust".to_string()),
                },
                0,
                12,
            )],
        );
        assert_eq!(out, "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_already_fenced_code_is_not_nested() {
        let text = "```\nls -la\n```";
        let out = rewrite_entities(text, &[entity(EntityKind::Code, 0, text.len())]);
        assert_eq!(out, text);
    }

    #[test]
    fn test_bad_entities_are_skipped() {
        let text = "short";
        let out = rewrite_entities(
            text,
            &[
                entity(link("https://a.example"), 0, 5),
                entity(link("https://b.example"), 2, 2),
                entity(EntityKind::Url, 3, 50),
            ],
        );
        assert_eq!(out, "[short](https://a.example)");
    }

    #[test]
    fn test_plain_links_section() {
        let out = append_plain_links("see https://a.example/x, and http://b.example. again https://a.example/x");
        assert_eq!(
            out,
            "see https://a.example/x, and http://b.example. again https://a.example/x\n\n## Links\n- https://a.example/x\n- http://b.example"
        );
        assert_eq!(append_plain_links("no links here"), "no links here");
    }

    #[tokio::test]
    async fn test_extract_plain_text_passthrough() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        let msg = InboundMessage::text(SessionId(1), 1, "  Buy milk\nhttps://shop.example  ");

        let content = extractor_in(dir.path()).extract(&msg, &gateway).await.unwrap();
        assert_eq!(content.title, "Buy milk");
        assert_eq!(content.body, "Buy milk\nhttps://shop.example");
        assert!(content.image_refs.is_empty());
    }

    #[tokio::test]
    async fn test_extract_without_entities_appends_links() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        let msg = InboundMessage::text(SessionId(1), 1, "Article https://news.example/a").without_entities();

        let content = extractor_in(dir.path()).extract(&msg, &gateway).await.unwrap();
        assert_eq!(
            content.body,
            "Article https://news.example/a\n\n## Links\n- https://news.example/a"
        );
    }

    #[tokio::test]
    async fn test_extract_hyperlink_inline() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        let msg = InboundMessage::text(SessionId(1), 1, "See docs")
            .with_entities(vec![entity(link("https://example.com"), 4, 4)]);

        let content = extractor_in(dir.path()).extract(&msg, &gateway).await.unwrap();
        assert_eq!(content.body, "See [docs](https://example.com)");
        assert!(!content.body.contains("## Links"));
    }

    #[tokio::test]
    async fn test_extract_caption_with_image() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        gateway.add_file("big", b"big image", Some("photos/file_3.jpg"));
        gateway.add_file("thumb", b"thumb", Some("photos/file_2.jpg"));

        let mut msg = InboundMessage::text(SessionId(1), 1, "").with_image(ImageAttachment {
            variants: vec![
                ImageVariant {
                    locator: "thumb".to_string(),
                    width: 90,
                    height: 90,
                    file_size: Some(100),
                },
                ImageVariant {
                    locator: "big".to_string(),
                    width: 1280,
                    height: 960,
                    file_size: Some(9000),
                },
            ],
        });
        msg.text = None;
        msg.caption = Some("Sunset at the pier".to_string());

        let content = extractor_in(dir.path()).extract(&msg, &gateway).await.unwrap();
        assert_eq!(content.title, "Sunset at the pier");
        assert_eq!(content.body, "Sunset at the pier");
        assert_eq!(content.image_refs.len(), 1);
        assert_eq!(gateway.fetch_count(), 1);
        let stored = std::fs::read(dir.path().join(&content.image_refs[0])).unwrap();
        assert_eq!(stored, b"big image");
    }

    #[tokio::test]
    async fn test_extract_empty_message_fails() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        let msg = InboundMessage::text(SessionId(1), 1, "   \n ");

        let err = extractor_in(dir.path()).extract(&msg, &gateway).await.unwrap_err();
        assert!(matches!(err, CaptureError::EmptyContent));
    }
}
