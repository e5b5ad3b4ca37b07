//! File operations for the notes vault
//!
//! Handles filename sanitization, atomic writes and vault-relative paths.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Longest filename stem produced from a title, in characters
const MAX_STEM_CHARS: usize = 120;

/// Sanitize a title into a filename stem (e.g. "Buy milk!" -> "Buy milk").
///
/// Keeps alphanumerics, spaces, hyphens and underscores; runs of whitespace
/// collapse to one space. May return an empty string.
pub fn sanitize_file_stem(title: &str) -> String {
    let stem = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_') || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");

    stem.chars()
        .take(MAX_STEM_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a note file (creates parent directories as needed)
pub fn write_note(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    atomic_write(path, content.as_bytes())
}

/// Get relative path from notes_dir for a file, always `/`-separated
pub fn relative_path(notes_dir: &Path, file_path: &Path) -> Option<String> {
    file_path.strip_prefix(notes_dir).ok().map(|p| {
        p.components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    })
}

/// First free `<stem> (n).md` in `dir`, starting from the bare name
pub fn unique_note_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    let mut n = 2;
    loop {
        let candidate = dir.join(format!("{} ({}).md", stem, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
