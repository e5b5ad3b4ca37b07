//! Obsidian capture bot — turns chat messages into Markdown notes.
//!
//! A message (text, caption, photo) is extracted into note content, the bot
//! asks for #tags, and the result is written as an Obsidian-compatible
//! Markdown file with images stored once in a content-addressed `Cache/`.

pub mod channels;
pub mod config;
pub mod error;
pub mod models;
pub mod notes;
