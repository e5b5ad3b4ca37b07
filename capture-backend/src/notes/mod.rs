//! Notes system — Obsidian-compatible markdown notes captured from chat
//!
//! Produces markdown files with a tags/date header, [[wikilink]] tags and
//! ![[embeds]] of content-addressed images under `Cache/`.

pub mod extractor;
pub mod file_ops;
pub mod frontmatter;
pub mod image_cache;
pub mod store;

pub use extractor::ContentExtractor;
pub use image_cache::ImageCache;
pub use store::NoteStore;
