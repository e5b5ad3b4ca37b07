//! Render and parse the note file format.
//!
//! Notes start with a `tags:` line of [[wikilinks]] and a `date:` line, then a
//! blank line, the body, and one `![[path]]` embed per cached image.
//! Rendering is pure: the timestamp is passed in, never read from the clock.

use super::file_ops;
use crate::models::MessageContent;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

/// Date format of the `date:` line
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Filename used when a title sanitizes to nothing
const FALLBACK_NAME_FORMAT: &str = "note-%Y%m%d-%H%M%S";

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]]+\]\]").unwrap());
static EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[\[([^\]]+)\]\]$").unwrap());

/// A note ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    /// Derived filename including the `.md` extension
    pub file_name: String,
    pub content: String,
}

/// A note file split back into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNote {
    /// Tags in wikilink form, e.g. `[[Errands]]`
    pub tags: Vec<String>,
    pub date: Option<String>,
    pub body: String,
    /// Embedded paths, without the `![[`/`]]` wrapper
    pub embeds: Vec<String>,
}

/// Wrap a name as an Obsidian wikilink
pub fn wikilink(name: &str) -> String {
    format!("[[{}]]", name)
}

/// Wrap a vault-relative path as an embed
pub fn embed(path: &str) -> String {
    format!("![[{}]]", path)
}

/// Render a captured message into note text plus its filename
pub fn render(content: &MessageContent, tags: &[String], now: NaiveDateTime) -> RenderedNote {
    let mut lines = Vec::new();

    if tags.is_empty() {
        lines.push("tags:".to_string());
    } else {
        lines.push(format!("tags: {}", tags.join(" ")));
    }
    lines.push(format!("date: {}", now.format(DATE_FORMAT)));
    lines.push(String::new());

    let body = content.body.trim();
    if !body.is_empty() {
        lines.push(body.to_string());
    }
    for image in &content.image_refs {
        lines.push(embed(image));
    }

    let mut text = lines.join("\n");
    text.push('\n');

    RenderedNote {
        file_name: note_file_name(&content.title, now),
        content: text,
    }
}

/// Derive `<sanitized title>.md`, falling back to a timestamp name
pub fn note_file_name(title: &str, now: NaiveDateTime) -> String {
    let stem = file_ops::sanitize_file_stem(title);
    if stem.is_empty() {
        format!("{}.md", now.format(FALLBACK_NAME_FORMAT))
    } else {
        format!("{}.md", stem)
    }
}

/// Parse a rendered note back into tags, date, body and embeds
pub fn parse_note(text: &str) -> ParsedNote {
    let (header, rest) = match text.split_once("\n\n") {
        Some((header, rest)) => (header, rest),
        None => (text, ""),
    };

    let mut parsed = ParsedNote::default();
    for line in header.lines() {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "tags" => parsed.tags = extract_wikilinks(value),
                "date" => parsed.date = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    // Embeds are the trailing run of `![[...]]` lines
    let mut body_lines: Vec<&str> = rest.lines().collect();
    let mut embeds = Vec::new();
    while let Some(last) = body_lines.last() {
        match EMBED_RE.captures(last.trim()) {
            Some(cap) => {
                embeds.push(cap[1].to_string());
                body_lines.pop();
            }
            None => break,
        }
    }
    embeds.reverse();

    parsed.body = body_lines.join("\n").trim().to_string();
    parsed.embeds = embeds;
    parsed
}

/// Extract [[wikilinks]] from text, keeping the brackets
pub fn extract_wikilinks(text: &str) -> Vec<String> {
    WIKILINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
