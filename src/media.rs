use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::{RemoteStore, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Audio,
}

impl MediaKind {
    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Audio => "m4a",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Photo => "Photo",
            MediaKind::Audio => "Audio",
        }
    }
}

/// Accepts plain paths and `file://` URIs from the capture layer.
pub fn local_path(uri: &str) -> PathBuf {
    if uri.starts_with("file://") {
        if let Some(path) = Url::parse(uri).ok().and_then(|u| u.to_file_path().ok()) {
            return path;
        }
        return PathBuf::from(uri.trim_start_matches("file://"));
    }
    PathBuf::from(uri)
}

pub fn media_extension(uri: &str, kind: MediaKind) -> String {
    let ext = Path::new(uri)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(ext) if kind == MediaKind::Photo && ext == "jpeg" => "jpg".to_string(),
        Some(ext) => ext,
        None => kind.default_extension().to_string(),
    }
}

pub fn content_type_for(kind: MediaKind, ext: &str) -> String {
    match (kind, ext) {
        (MediaKind::Photo, "jpg") | (MediaKind::Photo, "jpeg") => "image/jpeg".to_string(),
        (MediaKind::Audio, "mp3") => "audio/mpeg".to_string(),
        (MediaKind::Audio, "caf") => "audio/x-caf".to_string(),
        (MediaKind::Photo, other) => format!("image/{}", other),
        (MediaKind::Audio, other) => format!("audio/{}", other),
    }
}

/// `{user}/{question}_{millis}.{ext}`, unique per user and upload.
pub fn storage_path(user_id: &str, question_id: &str, timestamp_ms: i64, ext: &str) -> String {
    format!("{}/{}_{}.{}", user_id, question_id, timestamp_ms, ext)
}

/// Moves captured photo/audio answers into remote storage.
#[derive(Clone)]
pub struct MediaUploader {
    store: Arc<dyn RemoteStore>,
}

impl MediaUploader {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Returns the storage reference, or `None` if anything went wrong.
    /// Callers then submit the answer without its media payload.
    pub async fn upload(
        &self,
        local_uri: &str,
        question_id: &str,
        kind: MediaKind,
        user_id: &str,
    ) -> Option<String> {
        match self.try_upload(local_uri, question_id, kind, user_id).await {
            Ok(reference) => {
                info!("📤 {} uploaded for question {}: {}", kind.label(), question_id, reference);
                Some(reference)
            }
            Err(e) => {
                error!("{} upload failed for question {}: {}", kind.label(), question_id, e);
                None
            }
        }
    }

    async fn try_upload(
        &self,
        local_uri: &str,
        question_id: &str,
        kind: MediaKind,
        user_id: &str,
    ) -> Result<String> {
        let ext = media_extension(local_uri, kind);
        let path = storage_path(user_id, question_id, Utc::now().timestamp_millis(), &ext);
        let content_type = content_type_for(kind, &ext);

        let bytes = tokio::fs::read(local_path(local_uri)).await?;

        self.store.upload_media(&path, bytes, &content_type).await
    }
}
