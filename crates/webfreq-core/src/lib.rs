use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod chart;
pub mod config;
pub mod filter;
pub mod freq;
pub mod segment;
pub mod text;
pub mod view;

pub use chart::{ChartKind, ChartRenderer};
pub use config::AnalysisConfig;
pub use filter::{ScriptBlock, StopwordSet, TokenFilter};
pub use freq::{FrequencyEntry, FrequencyTable};
pub use segment::{Segmenter, Tokens, WhitespaceSegmenter};
pub use text::NormalizedText;
pub use view::RankedView;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for failures that happen before any content was obtained ("bad URL/network"),
    /// as opposed to "bad content" or "bad settings".
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::Fetch(_))
    }

    /// Stable machine-readable code, used by the CLI and MCP payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::Fetch(_) => "fetch_failed",
            Self::Extraction(_) => "extraction_failed",
            Self::InvalidConfig(_) => "invalid_params",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Default per-request timeout for page fetches.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default cap on bytes read from a response body.
pub const DEFAULT_MAX_BYTES: u64 = 5_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    /// Optional headers to add (best-effort; adapter may drop unsafe headers).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            max_bytes: Some(DEFAULT_MAX_BYTES),
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parse `self.url`, accepting only absolute http(s) locators.
    pub fn parsed_url(&self) -> Result<url::Url> {
        parse_http_url(&self.url)
    }
}

pub fn parse_http_url(s: &str) -> Result<url::Url> {
    let u = url::Url::parse(s.trim()).map_err(|e| Error::InvalidUrl(format!("{s}: {e}")))?;
    match u.scheme() {
        "http" | "https" => Ok(u),
        other => Err(Error::InvalidUrl(format!("unsupported scheme: {other}"))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Markup decoded with its resolved character encoding.
///
/// Created by the content fetcher, consumed once by text extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    /// WHATWG encoding name the body was decoded with (e.g. "UTF-8", "GBK").
    pub encoding: String,
    pub markup: String,
    pub truncated: bool,
}

impl RawDocument {
    /// Wrap an already-decoded string (local files, inline input).
    pub fn from_markup(markup: impl Into<String>) -> Self {
        Self {
            url: String::new(),
            final_url: String::new(),
            content_type: Some("text/html".to_string()),
            encoding: "UTF-8".to_string(),
            markup: markup.into(),
            truncated: false,
        }
    }

    /// Lower-cased media type without parameters (`text/html; charset=gbk` -> `text/html`).
    pub fn media_type(&self) -> String {
        media_type(self.content_type.as_deref())
    }
}

pub fn media_type(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
