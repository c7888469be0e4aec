//! Media upload storage
//!
//! Uploaded files land under `<root>/static/uploads/<folder>/` with a random
//! 16-hex-character name plus the original (lower-cased) extension. Stored
//! paths are relative to the static root, e.g. `uploads/posters/1a2b...f0.jpg`,
//! and are served under `/static/`.

use axum::extract::Multipart;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use suzuani_common::config::UPLOAD_FOLDERS;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Extensions accepted for image uploads
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions accepted for song uploads
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

/// What is being uploaded; decides folder and accepted extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Banner,
    SongCover,
    EpisodeThumbnail,
    MangaPage,
    Poster,
    ProfileImage,
    Song,
}

impl UploadKind {
    pub fn folder(&self) -> &'static str {
        match self {
            UploadKind::Banner => "banners",
            UploadKind::SongCover => "covers",
            UploadKind::EpisodeThumbnail => "episodes",
            UploadKind::MangaPage => "manga_pages",
            UploadKind::Poster => "posters",
            UploadKind::ProfileImage => "profiles",
            UploadKind::Song => "songs",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Song => AUDIO_EXTENSIONS,
            _ => IMAGE_EXTENSIONS,
        }
    }
}

/// Upload rejections
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("File is {size} bytes, limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("File '{0}' has no extension")]
    MissingExtension(String),

    #[error("File type '.{extension}' not allowed (allowed: {allowed})")]
    UnsupportedExtension { extension: String, allowed: String },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            UploadError::Io(e) => ApiError::Io(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Writes uploads below the static root
#[derive(Debug, Clone)]
pub struct UploadStore {
    static_root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(static_root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            static_root: static_root.into(),
            max_bytes,
        }
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create every upload folder if missing
    pub fn ensure_folders(&self) -> std::io::Result<()> {
        for folder in UPLOAD_FOLDERS {
            std::fs::create_dir_all(self.static_root.join("uploads").join(folder))?;
        }
        Ok(())
    }

    /// Validate an upload without writing anything; returns the extension
    pub fn check(&self, kind: UploadKind, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }
        validated_extension(kind, original_name)
    }

    /// Validate and store an upload; returns the path relative to the static root
    pub async fn save(&self, kind: UploadKind, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let extension = self.check(kind, original_name, bytes)?;
        let file_name = format!("{:016x}.{}", rand::thread_rng().gen::<u64>(), extension);
        let relative = format!("uploads/{}/{}", kind.folder(), file_name);

        let folder = self.static_root.join("uploads").join(kind.folder());
        tokio::fs::create_dir_all(&folder).await?;
        tokio::fs::write(folder.join(&file_name), bytes).await?;

        info!("Stored {} upload '{}' as {}", kind.folder(), original_name, relative);
        Ok(relative)
    }

    /// Delete a file previously returned by [`save`](Self::save)
    ///
    /// Paths that `save` could not have produced (the `default_*` placeholders,
    /// anything outside `uploads/`) are left alone. Failures are logged only:
    /// the row referencing the file is already gone or replaced.
    pub async fn remove(&self, relative: &str) {
        if !is_stored_upload(relative) {
            return;
        }
        match tokio::fs::remove_file(self.static_root.join(relative)).await {
            Ok(()) => debug!("Removed upload {}", relative),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", relative, e),
        }
    }

    pub async fn remove_all(&self, relatives: &[String]) {
        for relative in relatives {
            self.remove(relative).await;
        }
    }
}

/// `uploads/<known folder>/<16 hex>.<ext>`
fn is_stored_upload(relative: &str) -> bool {
    let mut parts = relative.split('/');
    let (Some("uploads"), Some(folder), Some(name), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Some((stem, extension)) = name.split_once('.') else {
        return false;
    };
    UPLOAD_FOLDERS.contains(&folder)
        && stem.len() == 16
        && stem.chars().all(|c| c.is_ascii_hexdigit())
        && !extension.is_empty()
        && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

fn validated_extension(kind: UploadKind, original_name: &str) -> Result<String, UploadError> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| UploadError::MissingExtension(original_name.to_string()))?;

    if !kind.allowed_extensions().contains(&extension.as_str()) {
        return Err(UploadError::UnsupportedExtension {
            extension,
            allowed: kind.allowed_extensions().join(", "),
        });
    }

    Ok(extension)
}

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A fully read multipart form: text fields and file parts by field name
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drain a multipart body. File parts with an empty file name (no file
    /// chosen in a browser form) are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if file_name.is_empty() {
                        continue;
                    }
                    debug!("Multipart file field '{}': {} ({} bytes)", name, file_name, bytes.len());
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::invalid_field(name, "This field is required."))
    }

    /// Optional integer field; present but unparseable is a validation error
    pub fn int(&self, name: &str) -> Result<Option<i64>, ApiError> {
        match self.text(name) {
            None => Ok(None),
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ApiError::invalid_field(name, "Must be a whole number.")),
        }
    }

    pub fn required_int(&self, name: &str) -> Result<i64, ApiError> {
        self.int(name)?
            .ok_or_else(|| ApiError::invalid_field(name, "This field is required."))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn required_file(&self, name: &str) -> Result<&UploadedFile, ApiError> {
        self.file(name)
            .ok_or_else(|| ApiError::invalid_field(name, "A file is required."))
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
