//! Input acquisition for uploaded files
//!
//! Files whose declared media type starts with `text/` are read as text; any
//! other file is read as a base64 data URL so binary content and its type
//! survive the trip into the QR payload.

use crate::data_url::{DataUrl, OCTET_STREAM};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file selected by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Display name (file name without directories)
    pub name: String,
    /// Declared media type, e.g. `text/plain` or `image/png`
    pub media_type: String,
    /// Where the content lives
    pub path: PathBuf,
}

impl UploadedFile {
    /// Describe `path`, guessing the media type from its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = mime_guess::from_path(&path)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string();
        Self::with_media_type(path, media_type)
    }

    /// Describe `path` with an explicitly declared media type.
    pub fn with_media_type(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            media_type: media_type.into(),
            path,
        }
    }

    /// Whether the content should be read as text
    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }
}

/// Asynchronous access to file content
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Read the file as text; invalid UTF-8 is replaced, not rejected.
    async fn read_text(&self, file: &UploadedFile) -> Result<String>;

    /// Read the file as a base64 data URL tagged with its media type.
    async fn read_data_url(&self, file: &UploadedFile) -> Result<DataUrl>;
}

/// Reads uploads from the local filesystem
#[derive(Debug, Clone)]
pub struct FsFileReader {
    max_bytes: u64,
}

impl FsFileReader {
    /// Reader refusing files larger than `max_bytes`
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(Error::Other(format!("{} is not a regular file", path.display())));
        }
        if metadata.len() > self.max_bytes {
            return Err(Error::Other(format!(
                "file is {} bytes, limit is {}",
                metadata.len(),
                self.max_bytes
            )));
        }
        Ok(tokio::fs::read(path).await?)
    }
}

#[async_trait]
impl FileReader for FsFileReader {
    async fn read_text(&self, file: &UploadedFile) -> Result<String> {
        let bytes = self.read_bytes(&file.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn read_data_url(&self, file: &UploadedFile) -> Result<DataUrl> {
        let bytes = self.read_bytes(&file.path).await?;
        Ok(DataUrl::encode(&file.media_type, &bytes))
    }
}

/// Read `file` the way its media type asks for and return the payload string.
///
/// Any failure comes back as [`Error::FileRead`] naming the file.
pub async fn acquire(reader: &dyn FileReader, file: &UploadedFile) -> Result<String> {
    let content = if file.is_text() {
        reader.read_text(file).await
    } else {
        reader.read_data_url(file).await.map(DataUrl::into_string)
    };

    content.map_err(|e| match e {
        err @ Error::FileRead { .. } => err,
        other => Error::FileRead {
            name: file.name.clone(),
            reason: other.to_string(),
        },
    })
}
