use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use qrwidget::notify::RecordingNotifier;
use qrwidget::qr::encode_png;
use qrwidget::{
    DataUrl, DirectorySaver, Encoder, Error, FileReader, GenerationFailure, GenerationState,
    QrDecoder, QrImage, QrWidget, RenderOptions, UploadedFile, WidgetConfig,
};

/// Real encoder that counts how often it is asked to encode.
#[derive(Default)]
struct CountingEncoder {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Encoder for CountingEncoder {
    async fn encode(
        &self,
        data: &str,
        options: &RenderOptions,
    ) -> Result<QrImage, GenerationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        encode_png(data, options)
    }
}

/// Encoder that waits for the test to open the gate.
struct GatedEncoder {
    gate: Arc<Notify>,
}

#[async_trait]
impl Encoder for GatedEncoder {
    async fn encode(
        &self,
        data: &str,
        options: &RenderOptions,
    ) -> Result<QrImage, GenerationFailure> {
        self.gate.notified().await;
        encode_png(data, options)
    }
}

/// Encoder that never answers.
struct HangingEncoder;

#[async_trait]
impl Encoder for HangingEncoder {
    async fn encode(&self, _: &str, _: &RenderOptions) -> Result<QrImage, GenerationFailure> {
        std::future::pending::<Result<QrImage, GenerationFailure>>().await
    }
}

struct BrokenReader;

#[async_trait]
impl FileReader for BrokenReader {
    async fn read_text(&self, _: &UploadedFile) -> qrwidget::Result<String> {
        Err(Error::Io(std::io::Error::other("disk unplugged")))
    }

    async fn read_data_url(&self, _: &UploadedFile) -> qrwidget::Result<DataUrl> {
        Err(Error::Io(std::io::Error::other("disk unplugged")))
    }
}

struct Harness {
    widget: QrWidget,
    notifier: Arc<RecordingNotifier>,
    calls: Arc<AtomicUsize>,
    dir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with(WidgetConfig::default())
}

fn harness_with(config: WidgetConfig) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let notifier = Arc::new(RecordingNotifier::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let widget = QrWidget::new(&config)
        .with_encoder(CountingEncoder {
            calls: calls.clone(),
        })
        .with_notifier(notifier.clone())
        .with_saver(DirectorySaver::new(dir.path(), false));

    Harness {
        widget,
        notifier,
        calls,
        dir,
    }
}

fn decode(image: &QrImage) -> String {
    QrDecoder::new()
        .decode_data_url(&image.data_url)
        .expect("decode generated image")
        .text
        .expect("utf-8 payload")
}

#[tokio::test]
async fn hello_generates_and_decodes() {
    let h = harness();
    h.widget.set_input_text("Hello");

    let image = h.widget.generate_from_input().await.expect("generate");

    assert_eq!(decode(&image), "Hello");
    assert_eq!((image.width, image.height), (300, 300));
    assert_eq!(h.widget.state(), GenerationState::Succeeded(image.clone()));

    let last = h.notifier.last().expect("notification");
    assert_eq!(last.title, "Success");
    assert_eq!(last.description, "QR code generated successfully!");
    assert!(!last.is_error());

    let view = h.widget.view();
    assert_eq!(view.image, Some(image));
    assert!(view.download_enabled);
    assert_eq!((view.display_width, view.display_height), (300, 300));
}

#[tokio::test]
async fn blank_payloads_never_reach_the_encoder() {
    let h = harness();

    for payload in ["", "   ", "\n\t "] {
        let err = h.widget.generate(payload).await.unwrap_err();
        assert!(matches!(err, Error::MissingInput));
    }

    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.widget.state(), GenerationState::Idle);

    let seen = h.notifier.notifications();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|n| n.is_error()
        && n.description == "Please enter some text or upload a file"));
}

#[tokio::test]
async fn blank_payload_after_success_keeps_the_result() {
    let h = harness();
    let image = h.widget.generate("Hello").await.unwrap();

    assert!(h.widget.generate("  ").await.is_err());
    assert_eq!(h.widget.state(), GenerationState::Succeeded(image));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn text_file_upload_encodes_its_content() {
    let h = harness();
    let path = h.dir.path().join("report.txt");
    std::fs::write(&path, "Report 2024").unwrap();

    let image = h
        .widget
        .on_file_selected(UploadedFile::with_media_type(&path, "text/plain"))
        .await
        .expect("generate from file");

    assert_eq!(decode(&image), "Report 2024");
    assert_eq!(h.widget.view().selected_file.as_deref(), Some("report.txt"));
}

#[tokio::test]
async fn binary_file_upload_encodes_a_data_url_of_its_bytes() {
    let mut config = WidgetConfig::default();
    // Version 3 symbol (29 modules + 4 margin) lands on a whole 10px per module.
    config.render.width = 330;
    let h = harness_with(config);

    let bytes = [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let path = h.dir.path().join("tiny.png");
    std::fs::write(&path, bytes).unwrap();

    let image = h
        .widget
        .on_file_selected(UploadedFile::from_path(&path))
        .await
        .expect("generate from binary file");

    let decoded = DataUrl::parse(&decode(&image)).expect("payload is a data URL");
    assert_eq!(decoded.media_type(), "image/png");
    assert_eq!(decoded.decode_bytes().unwrap(), bytes);
}

#[tokio::test]
async fn sequential_generations_decode_to_the_same_payload() {
    let h = harness();

    let first = h.widget.generate("Hello").await.unwrap();
    let second = h.widget.generate("Hello").await.unwrap();

    assert_eq!(decode(&first), "Hello");
    assert_eq!(decode(&second), "Hello");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn over_capacity_fails_but_keeps_previous_image() {
    let h = harness();
    let first = h.widget.generate("Hello").await.unwrap();

    let err = h.widget.generate(&"x".repeat(5000)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Generation(GenerationFailure::CapacityExceeded { len: 5000 })
    ));

    match h.widget.state() {
        GenerationState::Failed { error, previous } => {
            assert_eq!(error, GenerationFailure::CapacityExceeded { len: 5000 });
            assert_eq!(previous, Some(first.clone()));
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    let view = h.widget.view();
    assert_eq!(view.image, Some(first));
    assert!(view.download_enabled);
    assert!(view.error.is_some());
    assert!(h.notifier.last().unwrap().is_error());

    let saved = h.widget.download().await.unwrap().expect("prior image saved");
    let payload = QrDecoder::new().decode_file(&saved).unwrap();
    assert_eq!(payload.as_str(), Some("Hello"));
}

#[tokio::test]
async fn download_without_result_does_nothing() {
    let h = harness();

    assert_eq!(h.widget.download().await.unwrap(), None);
    assert_eq!(std::fs::read_dir(h.dir.path()).unwrap().count(), 0);
    assert!(h.notifier.notifications().is_empty());
}

#[tokio::test]
async fn download_saves_qrcode_png() {
    let h = harness();
    h.widget.generate("Hello").await.unwrap();

    let path = h.widget.download().await.unwrap().expect("saved");
    assert_eq!(path, h.dir.path().join("qrcode.png"));
    assert_eq!(
        QrDecoder::new().decode_file(&path).unwrap().as_str(),
        Some("Hello")
    );

    let last = h.notifier.last().unwrap();
    assert_eq!(last.title, "Downloaded");
    assert_eq!(last.description, "QR code saved to your device");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_generation_is_rejected() {
    let gate = Arc::new(Notify::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let widget = Arc::new(
        QrWidget::new(&WidgetConfig::default())
            .with_encoder(GatedEncoder { gate: gate.clone() })
            .with_notifier(notifier.clone()),
    );
    widget.set_input_text("Hello");

    let mut states = widget.subscribe();
    let first = tokio::spawn({
        let widget = widget.clone();
        async move { widget.generate_from_input().await }
    });
    states
        .wait_for(GenerationState::is_generating)
        .await
        .expect("widget alive");

    let view = widget.view();
    assert_eq!(view.generate_label, "Generating...");
    assert!(!view.generate_enabled);
    assert!(!view.upload_enabled);

    let err = widget.generate("World").await.unwrap_err();
    assert!(matches!(err, Error::Busy));
    assert!(widget.state().is_generating());

    gate.notify_one();
    let image = first.await.unwrap().expect("first generation completes");
    assert_eq!(decode(&image), "Hello");
    assert_eq!(widget.state(), GenerationState::Succeeded(image));
}

#[tokio::test]
async fn file_read_failure_moves_to_failed() {
    let h = harness();
    let first = h.widget.generate("Hello").await.unwrap();
    let widget = h.widget.with_reader(BrokenReader);

    let err = widget
        .on_file_selected(UploadedFile::with_media_type("/tmp/notes.txt", "text/plain"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileRead { ref name, .. } if name == "notes.txt"));

    match widget.state() {
        GenerationState::Failed {
            error: GenerationFailure::FileRead { name, reason },
            previous,
        } => {
            assert_eq!(name, "notes.txt");
            assert!(reason.contains("disk unplugged"));
            assert_eq!(previous, Some(first));
        }
        other => panic!("expected file read failure, got {other:?}"),
    }
    assert_eq!(h.notifier.last().unwrap().description, "Failed to read file");
}

#[tokio::test(start_paused = true)]
async fn hung_encoder_times_out() {
    let mut config = WidgetConfig::default();
    config.generation.timeout_secs = Some(5);
    let widget = QrWidget::new(&config)
        .with_encoder(HangingEncoder)
        .with_notifier(RecordingNotifier::new());

    let err = widget.generate("Hello").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Generation(GenerationFailure::Timeout { secs: 5 })
    ));
    assert_eq!(widget.state().label(), "failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_generation_does_not_stay_generating() {
    let widget = Arc::new(
        QrWidget::new(&WidgetConfig::default())
            .with_encoder(HangingEncoder)
            .with_notifier(RecordingNotifier::new()),
    );

    let mut states = widget.subscribe();
    let task = tokio::spawn({
        let widget = widget.clone();
        async move { widget.generate("Hello").await }
    });
    states
        .wait_for(GenerationState::is_generating)
        .await
        .expect("widget alive");

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| !state.is_generating()),
    )
    .await
    .expect("state rolled back")
    .expect("widget alive");
    assert_eq!(widget.state(), GenerationState::Idle);
}
