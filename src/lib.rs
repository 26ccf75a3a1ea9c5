//! qrwidget - turn text or files into QR code PNGs
//!
//! The crate is built around [`QrWidget`]: it holds a text buffer, accepts
//! uploaded files, runs a single in-flight generation at a time and saves the
//! result as `qrcode.png`. Encoding, file reading, saving and user
//! notifications sit behind traits so each can be swapped out.
//!
//! # Features
//!
//! - **Text or file input**: `text/*` uploads are read as text, anything else
//!   as a base64 data URL
//! - **Explicit state machine**: `Idle`, `Generating`, `Succeeded`, `Failed`
//! - **Configurable rendering**: width, margin, colours and error correction
//! - **Async-first**: built on Tokio, encoding runs off the async workers
//!
//! # Example
//!
//! ```no_run
//! use qrwidget::{QrWidget, WidgetConfig};
//!
//! #[tokio::main]
//! async fn main() -> qrwidget::Result<()> {
//!     let widget = QrWidget::new(&WidgetConfig::default());
//!
//!     widget.set_input_text("Hello");
//!     let image = widget.generate_from_input().await?;
//!     println!("{}x{} px", image.width, image.height);
//!
//!     if let Some(path) = widget.download().await? {
//!         println!("Saved to {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod config;
pub mod data_url;
pub mod error;
pub mod logging;
pub mod notify;
pub mod output;
pub mod qr;
pub mod source;
pub mod widget;

// Re-exports for convenience
pub use error::{Error, GenerationFailure, Result};

pub use config::{
    DownloadOptions, EcLevel, GenerationOptions, HexColor, InputOptions, LogRotation,
    LoggingOptions, RenderOptions, WidgetConfig,
};
pub use data_url::DataUrl;
pub use notify::{Notification, Notifier, Severity};
pub use output::{DOWNLOAD_FILE_NAME, DirectorySaver, SaveTarget};
pub use qr::{Encoder, PngEncoder, QrDecoder, QrImage, QrPayload};
pub use source::{FileReader, FsFileReader, UploadedFile};
pub use widget::{GenerationState, QrWidget, WidgetView};
