//! Saving generated codes and previewing them on a terminal

use crate::config::{DownloadOptions, RenderOptions};
use crate::data_url::DataUrl;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qrcode::QrCode;
use qrcode::render::unicode::Dense1x2;
use std::path::{Path, PathBuf};

/// File name every download is saved under
pub const DOWNLOAD_FILE_NAME: &str = "qrcode.png";

/// Destination for downloaded images
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Store the image behind `data_url` as `file_name`, returning where it landed.
    async fn save(&self, file_name: &str, data_url: &DataUrl) -> Result<PathBuf>;
}

/// Saves downloads into a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    directory: PathBuf,
    overwrite: bool,
}

impl DirectorySaver {
    /// Saver for `directory`; with `overwrite` off, existing files are kept
    /// and a numbered name is chosen instead.
    pub fn new(directory: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            directory: directory.into(),
            overwrite,
        }
    }

    /// Saver configured from download options
    pub fn from_options(options: &DownloadOptions) -> Self {
        Self::new(options.directory.clone(), options.overwrite)
    }

    /// Directory downloads are written to
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn target_path(&self, file_name: &str) -> PathBuf {
        let first = self.directory.join(file_name);
        if self.overwrite || !first.exists() {
            return first;
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{ext}")),
            None => (file_name, String::new()),
        };
        (1u32..)
            .map(|n| self.directory.join(format!("{stem} ({n}){ext}")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(first)
    }
}

#[async_trait]
impl SaveTarget for DirectorySaver {
    async fn save(&self, file_name: &str, data_url: &DataUrl) -> Result<PathBuf> {
        if file_name.contains(['/', '\\']) || file_name.is_empty() {
            return Err(Error::Other(format!("Invalid download file name '{file_name}'")));
        }
        let bytes = data_url.decode_bytes()?;

        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.target_path(file_name);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved QR code");
        Ok(path)
    }
}

/// Render `data` as unicode half-blocks for a terminal preview.
///
/// Uses the same error correction level as the image so the preview and the
/// PNG carry the same symbol.
pub fn terminal_preview(data: &str, options: &RenderOptions) -> Result<String> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), options.ec_level.into())
        .map_err(|e| Error::Other(format!("Failed to build preview: {e}")))?;

    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}
