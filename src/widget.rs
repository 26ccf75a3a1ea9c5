//! The QR widget: input buffer, generation state machine and download
//!
//! ```text
//! Idle ──generate──▶ Generating ──ok──▶ Succeeded ──generate──▶ Generating
//!                        │                                         ▲
//!                        └──err──▶ Failed ──────generate───────────┘
//! ```
//!
//! Only one generation runs at a time; a request arriving while another is
//! in flight is rejected with [`Error::Busy`]. A failure keeps the last
//! successful image on display.

use crate::config::{RenderOptions, WidgetConfig};
use crate::error::{Error, GenerationFailure, Result};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::output::{DOWNLOAD_FILE_NAME, DirectorySaver, SaveTarget};
use crate::qr::{Encoder, PngEncoder, QrImage};
use crate::source::{self, FileReader, FsFileReader, UploadedFile};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Widest the image is shown, in logical units
pub const MAX_DISPLAY_WIDTH: u32 = 300;

/// Where the widget is in its generate cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    /// Nothing generated yet
    Idle,
    /// Encoder running; `previous` stays on display meanwhile
    Generating {
        /// Last image shown before this request
        previous: Option<QrImage>,
    },
    /// Latest request produced this image
    Succeeded(QrImage),
    /// Latest request failed; `previous` stays on display
    Failed {
        /// What went wrong
        error: GenerationFailure,
        /// Last successful image, if any
        previous: Option<QrImage>,
    },
}

impl GenerationState {
    /// Image that should currently be displayed
    pub fn image(&self) -> Option<&QrImage> {
        match self {
            Self::Idle => None,
            Self::Succeeded(image) => Some(image),
            Self::Generating { previous } | Self::Failed { previous, .. } => previous.as_ref(),
        }
    }

    /// Whether an encode is in flight
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating { .. })
    }

    /// Short lowercase name, for logs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating { .. } => "generating",
            Self::Succeeded(_) => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Everything a renderer needs to draw the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetView {
    /// Image to show, if any
    pub image: Option<QrImage>,
    /// Displayed width, capped at [`MAX_DISPLAY_WIDTH`]
    pub display_width: u32,
    /// Displayed height, aspect preserved
    pub display_height: u32,
    /// The text generate button accepts clicks
    pub generate_enabled: bool,
    /// Caption of the text generate button
    pub generate_label: &'static str,
    /// The file picker accepts clicks
    pub upload_enabled: bool,
    /// The download button is shown
    pub download_enabled: bool,
    /// Name of the last selected file
    pub selected_file: Option<String>,
    /// User-facing message of the last failure, while in `Failed`
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Inputs {
    text: String,
    file: Option<UploadedFile>,
}

/// Text/file to QR code widget
pub struct QrWidget {
    encoder: Arc<dyn Encoder>,
    notifier: Arc<dyn Notifier>,
    reader: Arc<dyn FileReader>,
    saver: Arc<dyn SaveTarget>,
    render: RenderOptions,
    timeout: Option<Duration>,
    inputs: Mutex<Inputs>,
    state: watch::Sender<GenerationState>,
}

impl QrWidget {
    /// Widget wired to the default PNG encoder, filesystem reader and
    /// directory saver, notifying through `tracing`.
    pub fn new(config: &WidgetConfig) -> Self {
        let (state, _) = watch::channel(GenerationState::Idle);
        Self {
            encoder: Arc::new(PngEncoder::new()),
            notifier: Arc::new(TracingNotifier),
            reader: Arc::new(FsFileReader::new(config.input.max_file_bytes)),
            saver: Arc::new(DirectorySaver::from_options(&config.download)),
            render: config.render.clone(),
            timeout: config.generation.timeout(),
            inputs: Mutex::new(Inputs::default()),
            state,
        }
    }

    /// Replace the encoder
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Replace the notification surface
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Replace the file reader
    pub fn with_reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    /// Replace the download target
    pub fn with_saver(mut self, saver: impl SaveTarget + 'static) -> Self {
        self.saver = Arc::new(saver);
        self
    }

    /// Visual parameters passed to the encoder
    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    /// Replace the text buffer. No validation happens here.
    pub fn set_input_text(&self, text: impl Into<String>) {
        self.inputs().text = text.into();
    }

    /// Current text buffer
    pub fn input_text(&self) -> String {
        self.inputs().text.clone()
    }

    /// Last selected file
    pub fn selected_file(&self) -> Option<UploadedFile> {
        self.inputs().file.clone()
    }

    /// Snapshot of the state machine
    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    /// Follow state transitions as they happen
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    /// Image currently on display
    pub fn current_image(&self) -> Option<QrImage> {
        self.state.borrow().image().cloned()
    }

    /// Generate from the text buffer.
    pub async fn generate_from_input(&self) -> Result<QrImage> {
        let text = self.input_text();
        self.generate(&text).await
    }

    /// Record `file` as the selection, read it, and generate from its content.
    ///
    /// A read failure moves the widget to `Failed` (unless another generation
    /// is in flight) and is returned as [`Error::FileRead`].
    pub async fn on_file_selected(&self, file: UploadedFile) -> Result<QrImage> {
        info!(name = %file.name, media_type = %file.media_type, "File selected");
        self.inputs().file = Some(file.clone());

        match source::acquire(self.reader.as_ref(), &file).await {
            Ok(content) => self.generate(&content).await,
            Err(err) => {
                let failure = match err {
                    Error::FileRead { name, reason } => GenerationFailure::FileRead { name, reason },
                    other => GenerationFailure::FileRead {
                        name: file.name.clone(),
                        reason: other.to_string(),
                    },
                };
                let in_flight = self.state.borrow().is_generating();
                if !in_flight {
                    self.state.send_modify(|state| {
                        let previous = state.image().cloned();
                        *state = GenerationState::Failed {
                            error: failure.clone(),
                            previous,
                        };
                    });
                }
                warn!(error = %failure, "Reading uploaded file failed");
                self.notifier
                    .notify(Notification::error(failure.user_message()));
                Err(failure.into())
            }
        }
    }

    /// Encode `payload` into a QR image.
    ///
    /// Blank payloads are refused with [`Error::MissingInput`] before the
    /// encoder is touched and the state is left as it was.
    pub async fn generate(&self, payload: &str) -> Result<QrImage> {
        if payload.trim().is_empty() {
            debug!("Refusing blank payload");
            self.notifier.notify(Notification::error(
                "Please enter some text or upload a file",
            ));
            return Err(Error::MissingInput);
        }

        let mut in_flight = self.begin()?;
        info!(payload_len = payload.len(), "Generating QR code");

        let outcome = self.run_encoder(payload).await;
        in_flight.done = true;

        match outcome {
            Ok(image) => {
                self.state
                    .send_replace(GenerationState::Succeeded(image.clone()));
                info!(
                    version = image.version,
                    width = image.width,
                    "QR code generated"
                );
                self.notifier.notify(Notification::info(
                    "Success",
                    "QR code generated successfully!",
                ));
                Ok(image)
            }
            Err(failure) => {
                self.state.send_modify(|state| {
                    let previous = state.image().cloned();
                    *state = GenerationState::Failed {
                        error: failure.clone(),
                        previous,
                    };
                });
                warn!(error = %failure, "QR code generation failed");
                self.notifier
                    .notify(Notification::error(failure.user_message()));
                Err(failure.into())
            }
        }
    }

    /// Save the displayed image as `qrcode.png`.
    ///
    /// Without an image this does nothing and returns `Ok(None)`.
    pub async fn download(&self) -> Result<Option<PathBuf>> {
        let Some(image) = self.current_image() else {
            debug!("Download requested with no generated image");
            return Ok(None);
        };

        match self.saver.save(DOWNLOAD_FILE_NAME, &image.data_url).await {
            Ok(path) => {
                self.notifier.notify(Notification::info(
                    "Downloaded",
                    "QR code saved to your device",
                ));
                Ok(Some(path))
            }
            Err(err) => {
                warn!(error = %err, "Saving QR code failed");
                self.notifier
                    .notify(Notification::error("Failed to save QR code"));
                Err(err)
            }
        }
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> WidgetView {
        let state = self.state();
        let inputs = self.inputs();
        let generating = state.is_generating();
        let image = state.image().cloned();

        let (display_width, display_height) = image
            .as_ref()
            .map(|img| display_size(img.width, img.height))
            .unwrap_or((0, 0));

        let error = match &state {
            GenerationState::Failed { error, .. } => Some(error.user_message().to_string()),
            _ => None,
        };

        WidgetView {
            download_enabled: image.is_some(),
            image,
            display_width,
            display_height,
            generate_enabled: !generating && !inputs.text.trim().is_empty(),
            generate_label: if generating {
                "Generating..."
            } else {
                "Generate QR Code"
            },
            upload_enabled: !generating,
            selected_file: inputs.file.as_ref().map(|f| f.name.clone()),
            error,
        }
    }

    fn inputs(&self) -> MutexGuard<'_, Inputs> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        let started = self.state.send_if_modified(|state| {
            if state.is_generating() {
                return false;
            }
            let previous = state.image().cloned();
            *state = GenerationState::Generating { previous };
            true
        });

        if !started {
            debug!("Generation already in flight");
            self.notifier
                .notify(Notification::error("A QR code is already being generated"));
            return Err(Error::Busy);
        }

        Ok(InFlight {
            state: &self.state,
            done: false,
        })
    }

    async fn run_encoder(&self, payload: &str) -> std::result::Result<QrImage, GenerationFailure> {
        let encode = self.encoder.encode(payload, &self.render);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, encode)
                .await
                .unwrap_or(Err(GenerationFailure::Timeout {
                    secs: limit.as_secs(),
                })),
            None => encode.await,
        }
    }
}

/// Rolls an abandoned `Generating` state back when a `generate` future is
/// dropped before the encoder answers.
struct InFlight<'a> {
    state: &'a watch::Sender<GenerationState>,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.state.send_if_modified(|state| match state {
            GenerationState::Generating { previous } => {
                *state = match previous.take() {
                    Some(image) => GenerationState::Succeeded(image),
                    None => GenerationState::Idle,
                };
                true
            }
            _ => false,
        });
    }
}

fn display_size(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_DISPLAY_WIDTH || width == 0 {
        return (width, height);
    }
    let scaled = u64::from(height) * u64::from(MAX_DISPLAY_WIDTH) / u64::from(width);
    (MAX_DISPLAY_WIDTH, scaled as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_size_caps_width_and_keeps_aspect() {
        assert_eq!(display_size(300, 300), (300, 300));
        assert_eq!(display_size(120, 120), (120, 120));
        assert_eq!(display_size(600, 600), (300, 300));
        assert_eq!(display_size(900, 450), (300, 150));
    }

    #[test]
    fn idle_widget_view() {
        let widget = QrWidget::new(&WidgetConfig::default());
        let view = widget.view();
        assert!(view.image.is_none());
        assert!(!view.download_enabled);
        assert!(!view.generate_enabled);
        assert!(view.upload_enabled);
        assert_eq!(view.generate_label, "Generate QR Code");

        widget.set_input_text("   ");
        assert!(!widget.view().generate_enabled);
        widget.set_input_text("Hello");
        assert!(widget.view().generate_enabled);
    }

    #[test]
    fn state_image_follows_previous_slot() {
        let state = GenerationState::Failed {
            error: GenerationFailure::Encoding("boom".into()),
            previous: None,
        };
        assert!(state.image().is_none());
        assert_eq!(state.label(), "failed");
        assert!(!state.is_generating());
    }
}
