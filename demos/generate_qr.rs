//! Generate a QR code from text and from a file, then save it
//!
//! Usage: cargo run --example generate_qr

use qrwidget::notify::ConsoleNotifier;
use qrwidget::{QrWidget, UploadedFile, WidgetConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let widget = QrWidget::new(&WidgetConfig::default()).with_notifier(ConsoleNotifier::new());

    widget.set_input_text("Hello from qrwidget!");
    let image = widget.generate_from_input().await?;
    println!("  {}x{} px, version {}", image.width, image.height, image.version);

    if let Some(path) = widget.download().await? {
        println!("  Saved to {}", path.display());
    }

    // Feed this source file through the upload path
    let file = UploadedFile::with_media_type(file!(), "text/plain");
    match widget.on_file_selected(file).await {
        Ok(image) => println!("  File encoded as version {}", image.version),
        Err(err) => println!("  File not encoded: {err}"),
    }

    Ok(())
}
