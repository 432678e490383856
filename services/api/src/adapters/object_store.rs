//! services/api/src/adapters/object_store.rs
//!
//! A filesystem-backed implementation of the `ObjectStorage` port. Objects are
//! written under the configured upload directory and served back by the API
//! binary from the public media URL.

use async_trait::async_trait;
use bytes::Bytes;
use lesson_studio_core::media::MediaKind;
use lesson_studio_core::ports::{ObjectStorage, PortError, PortResult};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStore {
    async fn put_object(
        &self,
        kind: MediaKind,
        object_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> PortResult<String> {
        // Names are generated by the upload handler; anything path-like is refused.
        if object_name.is_empty() || object_name.contains(['/', '\\']) || object_name.starts_with('.') {
            return Err(PortError::Unexpected(format!(
                "Refusing to store object with name '{}'",
                object_name
            )));
        }

        let dir = self.root.join(kind.as_str());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            error!("Failed to create media directory {:?}: {:?}", dir, e);
            PortError::Unexpected(e.to_string())
        })?;

        let path = dir.join(object_name);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            error!("Failed to write media object {:?}: {:?}", path, e);
            PortError::Unexpected(e.to_string())
        })?;

        info!(
            "Stored {} object {} ({} bytes, {})",
            kind,
            object_name,
            data.len(),
            content_type
        );
        Ok(format!("{}/{}/{}", self.public_base_url, kind, object_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_under_the_kind_directory_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000/media/");

        let url = store
            .put_object(
                MediaKind::Audio,
                "clip.mp3",
                "audio/mpeg",
                Bytes::from_static(b"ID3"),
            )
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3000/media/audio/clip.mp3");
        let written = std::fs::read(dir.path().join("audio").join("clip.mp3")).unwrap();
        assert_eq!(written, b"ID3");
    }

    #[tokio::test]
    async fn path_like_names_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://media");

        for name in ["../escape.mp3", "a/b.mp3", ".hidden", ""] {
            let result = store
                .put_object(MediaKind::Audio, name, "audio/mpeg", Bytes::from_static(b"x"))
                .await;
            assert!(matches!(result, Err(PortError::Unexpected(_))), "{name}");
        }
    }
}
