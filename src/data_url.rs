//! `data:` URLs carrying base64 payloads
//!
//! Generated images travel as `data:image/png;base64,...` strings, and
//! non-text uploads are turned into the same shape before encoding.

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media type used when a file declares none
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A base64 `data:` URL, e.g. `data:image/png;base64,iVBORw0...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUrl {
    url: String,
    payload_offset: usize,
}

impl DataUrl {
    /// Wrap `bytes` with the given media type.
    pub fn encode(media_type: &str, bytes: &[u8]) -> Self {
        let media_type = match media_type.trim() {
            "" => OCTET_STREAM,
            other => other,
        };
        let prefix = format!("data:{media_type};base64,");
        let payload_offset = prefix.len();
        let mut url = prefix;
        STANDARD.encode_string(bytes, &mut url);
        Self {
            url,
            payload_offset,
        }
    }

    /// Wrap PNG bytes.
    pub fn png(bytes: &[u8]) -> Self {
        Self::encode("image/png", bytes)
    }

    /// Parse and validate a base64 data URL.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let rest = value
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidDataUrl("missing 'data:' scheme".to_string()))?;
        let comma = rest
            .find(',')
            .ok_or_else(|| Error::InvalidDataUrl("missing ',' separator".to_string()))?;
        if !rest[..comma].ends_with(";base64") {
            return Err(Error::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let url = value.to_string();
        let payload_offset = "data:".len() + comma + 1;
        STANDARD.decode(&url[payload_offset..])?;
        Ok(Self {
            url,
            payload_offset,
        })
    }

    /// Declared media type, e.g. `image/png`.
    pub fn media_type(&self) -> &str {
        let header = &self.url["data:".len()..self.payload_offset - 1];
        let media_type = header.split(';').next().unwrap_or_default();
        if media_type.is_empty() {
            OCTET_STREAM
        } else {
            media_type
        }
    }

    /// The base64 portion after the comma.
    pub fn base64_payload(&self) -> &str {
        &self.url[self.payload_offset..]
    }

    /// Decode the payload bytes.
    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.base64_payload())?)
    }

    /// Full URL text.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Consume into the URL text.
    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl FromStr for DataUrl {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for DataUrl {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DataUrl> for String {
    fn from(url: DataUrl) -> Self {
        url.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_exact_bytes() {
        let bytes = [0x89, b'P', b'N', b'G', 0x00, 0xff];
        let url = DataUrl::encode("image/png", &bytes);
        assert!(url.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(url.media_type(), "image/png");
        assert_eq!(url.decode_bytes().unwrap(), bytes);
    }

    #[test]
    fn empty_media_type_becomes_octet_stream() {
        let url = DataUrl::encode("", b"abc");
        assert_eq!(url.as_str(), "data:application/octet-stream;base64,YWJj");
    }

    #[test]
    fn parse_accepts_parameters_before_base64() {
        let url = DataUrl::parse("data:text/plain;charset=utf-8;base64,aGk=").unwrap();
        assert_eq!(url.media_type(), "text/plain");
        assert_eq!(url.decode_bytes().unwrap(), b"hi");
    }

    #[test]
    fn parse_rejects_malformed_urls() {
        assert!(DataUrl::parse("https://example.com").is_err());
        assert!(DataUrl::parse("data:image/png;base64").is_err());
        assert!(DataUrl::parse("data:text/plain,hello").is_err());
        assert!(DataUrl::parse("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn serde_uses_plain_string() {
        let url = DataUrl::png(b"x");
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"data:image/png;base64,eA==\"");
        let back: DataUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
