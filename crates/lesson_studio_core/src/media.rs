//! crates/lesson_studio_core/src/media.rs
//!
//! Upload policy for lesson and section attachments. Checks here run before
//! any bytes reach object storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of attachment the console can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Image,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Document => "document",
        }
    }

    fn accepts(self, content_type: &str) -> bool {
        match self {
            MediaKind::Audio => content_type.starts_with("audio/"),
            MediaKind::Video => content_type.starts_with("video/"),
            MediaKind::Image => content_type.starts_with("image/"),
            MediaKind::Document => matches!(
                content_type,
                "application/pdf"
                    | "application/msword"
                    | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    | "application/vnd.ms-powerpoint"
                    | "application/vnd.openxmlformats-officedocument.presentationml.presentation"
                    | "text/plain"
            ),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            "document" => Ok(MediaKind::Document),
            other => Err(UploadError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("File is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("File is empty")]
    Empty,
    #[error("{content_type} is not an accepted {kind} type")]
    UnsupportedType { kind: MediaKind, content_type: String },
    #[error("Unknown media kind '{0}'")]
    UnknownKind(String),
}

/// Accepts or rejects a file before upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl UploadPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn check(&self, kind: MediaKind, content_type: &str, size: usize) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !kind.accepts(&essence) {
            return Err(UploadError::UnsupportedType {
                kind,
                content_type: essence,
            });
        }
        Ok(())
    }
}

/// File extension to use for a stored object, taken from the original name.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.trim().to_ascii_lowercase();
    let usable = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    usable.then_some(ext)
}
