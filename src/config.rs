//! qrwidget runtime configuration handling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Visual parameters handed to the encoder
    pub render: RenderOptions,
    /// Generation behaviour (timeouts)
    pub generation: GenerationOptions,
    /// Input acquisition limits
    pub input: InputOptions,
    /// Where and how `qrcode.png` is saved
    pub download: DownloadOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl WidgetConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrwidget.toml / qrwidget.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrwidget.toml", "qrwidget.yaml", "qrwidget.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrwidget");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.render.apply_env_overrides()?;
        self.generation.apply_env_overrides();
        self.input.apply_env_overrides();
        self.download.apply_env_overrides();
        self.logging.apply_env_overrides();
        Ok(())
    }
}

/// Visual parameters of the rendered symbol.
///
/// Defaults reproduce the widget's stock look: 300 px wide, two module margin,
/// dark blue modules on white.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output image width in pixels (margin included)
    pub width: u32,
    /// Quiet zone around the symbol, in modules
    pub margin: u32,
    /// Colour of dark modules
    pub dark: HexColor,
    /// Colour of light modules and the margin
    pub light: HexColor,
    /// Error correction level used when building the symbol
    pub ec_level: EcLevel,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 300,
            margin: 2,
            dark: HexColor::rgb(0x1e, 0x40, 0xaf),
            light: HexColor::rgb(0xff, 0xff, 0xff),
            ec_level: EcLevel::M,
        }
    }
}

impl RenderOptions {
    pub(crate) fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(width) = env::var("QRWIDGET_WIDTH") {
            if let Ok(parsed) = width.parse::<u32>() {
                self.width = parsed;
            }
        }
        if let Ok(margin) = env::var("QRWIDGET_MARGIN") {
            if let Ok(parsed) = margin.parse::<u32>() {
                self.margin = parsed;
            }
        }
        if let Ok(dark) = env::var("QRWIDGET_DARK") {
            self.dark = dark.parse().map_err(Error::Config)?;
        }
        if let Ok(light) = env::var("QRWIDGET_LIGHT") {
            self.light = light.parse().map_err(Error::Config)?;
        }
        if let Ok(level) = env::var("QRWIDGET_EC_LEVEL") {
            self.ec_level = level.parse().map_err(Error::Config)?;
        }
        Ok(())
    }
}

/// An RGBA colour written as `#rgb`, `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl HexColor {
    /// Opaque colour from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Channels in RGBA order.
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || format!("Invalid colour '{value}', expected #rgb, #rrggbb or #rrggbbaa");
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).chain("ff".chars()).collect(),
            6 => format!("{hex}ff"),
            8 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: channel(6)?,
        })
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// QR error correction level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EcLevel {
    /// Recovers about 7% of codewords
    L,
    /// Recovers about 15% of codewords
    #[default]
    M,
    /// Recovers about 25% of codewords
    Q,
    /// Recovers about 30% of codewords
    H,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for EcLevel {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(Self::L),
            "M" | "MEDIUM" => Ok(Self::M),
            "Q" | "QUARTILE" => Ok(Self::Q),
            "H" | "HIGH" => Ok(Self::H),
            _ => Err(format!(
                "Unsupported error correction level '{value}', expected L, M, Q or H"
            )),
        }
    }
}

/// Generation behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Abort an encode that runs longer than this many seconds (unbounded when unset)
    pub timeout_secs: Option<u64>,
}

impl GenerationOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = env::var("QRWIDGET_TIMEOUT_SECS") {
            self.timeout_secs = timeout.parse::<u64>().ok().filter(|secs| *secs > 0);
        }
    }

    /// Timeout as a `Duration`, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Input acquisition limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    /// Uploaded files larger than this are rejected before reading
    pub max_file_bytes: u64,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
        }
    }
}

impl InputOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(max) = env::var("QRWIDGET_MAX_FILE_BYTES") {
            if let Ok(parsed) = max.parse::<u64>() {
                self.max_file_bytes = parsed;
            }
        }
    }
}

/// Download destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Directory receiving `qrcode.png`
    pub directory: PathBuf,
    /// Replace an existing `qrcode.png` instead of picking `qrcode (1).png`
    pub overwrite: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

impl DownloadOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("QRWIDGET_DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                self.directory = PathBuf::from(dir);
            }
        }
        if let Ok(overwrite) = env::var("QRWIDGET_DOWNLOAD_OVERWRITE") {
            match overwrite.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => self.overwrite = true,
                "0" | "false" | "off" => self.overwrite = false,
                _ => {}
            }
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRWIDGET_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in console logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRWIDGET_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRWIDGET_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRWIDGET_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("QRWIDGET_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::from_str(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
