//! NoteStore — writes rendered notes into the vault directory

use super::file_ops;
use super::frontmatter::RenderedNote;
use crate::error::CaptureError;
use std::path::{Path, PathBuf};

/// What to do when a derived filename is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Last write wins
    #[default]
    Overwrite,
    /// Append ` (2)`, ` (3)`, ... to the filename stem
    Suffix,
}

impl CollisionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionPolicy::Overwrite => "overwrite",
            CollisionPolicy::Suffix => "suffix",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Some(CollisionPolicy::Overwrite),
            "suffix" => Some(CollisionPolicy::Suffix),
            _ => None,
        }
    }
}

/// Markdown note storage rooted at the notes directory
pub struct NoteStore {
    notes_dir: PathBuf,
    collision_policy: CollisionPolicy,
}

impl NoteStore {
    pub fn new(notes_dir: PathBuf, collision_policy: CollisionPolicy) -> Self {
        Self {
            notes_dir,
            collision_policy,
        }
    }

    /// Get the notes directory path
    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Write a rendered note and return the path it landed at
    pub fn persist(&self, note: &RenderedNote) -> Result<PathBuf, CaptureError> {
        std::fs::create_dir_all(&self.notes_dir)
            .map_err(|e| CaptureError::persist(&self.notes_dir, e))?;

        let path = match self.collision_policy {
            CollisionPolicy::Overwrite => {
                let path = self.notes_dir.join(&note.file_name);
                if path.exists() {
                    log::warn!("[NOTES] Overwriting existing note {}", note.file_name);
                }
                path
            }
            CollisionPolicy::Suffix => file_ops::unique_note_path(&self.notes_dir, &note.file_name),
        };

        file_ops::write_note(&path, &note.content).map_err(|e| CaptureError::persist(&path, e))?;

        log::info!("[NOTES] Saved note {:?} ({} bytes)", path, note.content.len());
        Ok(path)
    }
}
