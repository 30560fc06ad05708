use serde::Serialize;
use webfreq_core::Error as WebfreqError;

pub(crate) const SCHEMA_VERSION: u64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    InvalidUrl,
    FetchFailed,
    ExtractionFailed,
    UnexpectedError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidUrl => "invalid_url",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractionFailed => "extraction_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::FetchFailed => true,
            // Invalid input and non-text pages don't change on retry.
            Self::InvalidParams
            | Self::InvalidUrl
            | Self::ExtractionFailed
            | Self::UnexpectedError => false,
        }
    }

    pub(crate) fn hint(self) -> &'static str {
        match self {
            Self::InvalidParams => {
                "min_freq and top_n must be >= 1; chart must be one of wordcloud, bar, pie, line, scatter, funnel, radar."
            }
            Self::InvalidUrl => "Pass an absolute http:// or https:// URL.",
            Self::FetchFailed => {
                "Check that the URL is reachable and returns 2xx; raise timeout_ms for slow sites."
            }
            Self::ExtractionFailed => {
                "The response is not an HTML or text page (PDF, image or other binary content)."
            }
            Self::UnexpectedError => "",
        }
    }

    pub(crate) fn from_error(e: &WebfreqError) -> Self {
        match e {
            WebfreqError::InvalidUrl(_) => Self::InvalidUrl,
            WebfreqError::Fetch(_) => Self::FetchFailed,
            WebfreqError::Extraction(_) => Self::ExtractionFailed,
            WebfreqError::InvalidConfig(_) => Self::InvalidParams,
        }
    }

    /// Library errors keep their code; anything else (IO on artifacts, ...) is unexpected.
    pub(crate) fn from_anyhow(e: &anyhow::Error) -> Self {
        e.downcast_ref::<WebfreqError>()
            .map(Self::from_error)
            .unwrap_or(Self::UnexpectedError)
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": code.retryable()
        }),
    }
}

/// `{ok:false, error:{...}}` with envelope fields.
pub(crate) fn error_payload(
    kind: &str,
    code: ErrorCode,
    message: impl ToString,
    elapsed_ms: u128,
) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "ok": false,
        "error": error_obj(code, message, code.hint()),
    });
    add_envelope_fields(&mut payload, kind, elapsed_ms);
    payload
}
