//! qrwidget command-line entrypoint

use clap::{Parser, Subcommand};
use qrwidget::notify::ConsoleNotifier;
use qrwidget::output::terminal_preview;
use qrwidget::{
    DirectorySaver, EcLevel, Error, HexColor, QrDecoder, QrImage, QrWidget, Result, UploadedFile,
    WidgetConfig, logging,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrwidget",
    version,
    about = "Generate QR code PNGs from text or files"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrwidget.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Output results as formatted JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Override image width in pixels
    #[arg(long, value_name = "PIXELS", global = true)]
    width: Option<u32>,

    /// Override quiet zone width in modules
    #[arg(long, value_name = "MODULES", global = true)]
    margin: Option<u32>,

    /// Override dark module colour (#rrggbb)
    #[arg(long, value_name = "HEX", global = true)]
    dark: Option<HexColor>,

    /// Override light module colour (#rrggbb)
    #[arg(long, value_name = "HEX", global = true)]
    light: Option<HexColor>,

    /// Override error correction level (L, M, Q, H)
    #[arg(long, value_name = "LEVEL", global = true)]
    ec_level: Option<EcLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a QR code from text
    Text {
        /// Text to encode
        text: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate a QR code from a file (text/* as text, anything else as a data URL)
    File {
        /// File to encode
        path: PathBuf,
        /// Declared media type; guessed from the extension when omitted
        #[arg(long, value_name = "TYPE")]
        media_type: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Decode a QR code from a PNG, or from a file holding an image data URL
    Decode {
        /// Image or data URL file
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Save the result as qrcode.png
    #[arg(long)]
    download: bool,

    /// Directory for the download (overrides configuration)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Print a terminal preview of the symbol
    #[arg(long)]
    preview: bool,

    /// Print the PNG data URL
    #[arg(long)]
    data_url: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WidgetConfig::load(cli.config.as_deref())?;

    if let Some(width) = cli.width {
        config.render.width = width;
    }
    if let Some(margin) = cli.margin {
        config.render.margin = margin;
    }
    if let Some(dark) = cli.dark {
        config.render.dark = dark;
    }
    if let Some(light) = cli.light {
        config.render.light = light;
    }
    if let Some(level) = cli.ec_level {
        config.render.ec_level = level;
    }

    logging::init(&config.logging)?;

    match cli.command {
        Command::Text { ref text, ref output } => {
            let widget = build_widget(&config, output, cli.json);
            widget.set_input_text(text.as_str());
            let result = widget.generate_from_input().await;
            finish(&widget, result, output, cli.json).await
        }
        Command::File {
            ref path,
            ref media_type,
            ref output,
        } => {
            let widget = build_widget(&config, output, cli.json);
            let file = match media_type {
                Some(declared) => UploadedFile::with_media_type(path, declared.as_str()),
                None => UploadedFile::from_path(path),
            };
            info!(name = %file.name, media_type = %file.media_type, "Encoding file");
            let result = widget.on_file_selected(file).await;
            finish(&widget, result, output, cli.json).await
        }
        Command::Decode { ref path } => handle_decode(path, cli.json),
    }
}

fn build_widget(config: &WidgetConfig, output: &OutputArgs, json: bool) -> QrWidget {
    let mut download = config.download.clone();
    if let Some(dir) = &output.out {
        download.directory = dir.clone();
    }

    let notifier = if json {
        ConsoleNotifier::errors_only()
    } else {
        ConsoleNotifier::new()
    };

    QrWidget::new(config)
        .with_notifier(notifier)
        .with_saver(DirectorySaver::from_options(&download))
}

async fn finish(
    widget: &QrWidget,
    result: Result<QrImage>,
    output: &OutputArgs,
    json: bool,
) -> Result<()> {
    let image = result?;

    let saved = if output.download {
        widget.download().await?
    } else {
        None
    };

    let preview = if output.preview {
        Some(preview_for(widget, &image)?)
    } else {
        None
    };

    if json {
        let mut root = json!({
            "state": widget.state().label(),
            "width": image.width,
            "height": image.height,
            "version": image.version,
            "payload_len": image.payload_len,
            "saved_to": saved.as_ref().map(|p| p.display().to_string()),
        });
        if output.data_url {
            if let Some(obj) = root.as_object_mut() {
                obj.insert("data_url".to_string(), json!(image.data_url.as_str()));
            }
        }
        println!("{}", serde_json::to_string_pretty(&root)?);
        return Ok(());
    }

    if let Some(preview) = preview {
        println!("{preview}");
    }
    println!(
        "QR code: {}x{} px, version {}, {} payload bytes",
        image.width, image.height, image.version, image.payload_len
    );
    if let Some(path) = saved {
        println!("Saved to {}", path.display());
    }
    if output.data_url {
        println!("{}", image.data_url);
    }

    Ok(())
}

/// File uploads only keep the rendered image, so their preview reads the
/// payload back out of it.
fn preview_for(widget: &QrWidget, image: &QrImage) -> Result<String> {
    let text = match widget.selected_file() {
        None => widget.input_text(),
        Some(_) => QrDecoder::new()
            .decode_data_url(&image.data_url)?
            .text
            .ok_or_else(|| Error::Other("Binary payloads have no preview".to_string()))?,
    };
    terminal_preview(&text, widget.render_options())
}

fn handle_decode(path: &Path, json: bool) -> Result<()> {
    let payload = match QrDecoder::new().decode_file(path) {
        Ok(payload) => payload,
        Err(Error::NoQrCodeFound) if !json => {
            println!("No QR code found in {}", path.display());
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    if json {
        let root = json!({
            "text": payload.as_str(),
            "bytes_hex": hex::encode(payload.as_bytes()),
            "byte_length": payload.as_bytes().len(),
        });
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else if let Some(text) = payload.as_str() {
        println!("{text}");
    } else {
        println!("QR binary payload ({} bytes)", payload.as_bytes().len());
    }

    Ok(())
}
