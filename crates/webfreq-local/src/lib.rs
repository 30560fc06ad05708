use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use webfreq_core::{Error, FetchBackend, FetchRequest, FetchResponse, RawDocument, Result};

pub mod chart;
pub mod charset;
pub mod export;
pub mod extract;
pub mod pipeline;
pub mod segment;
pub mod stopwords;

pub use pipeline::{Analysis, Analyzer};
pub use segment::JiebaSegmenter;

/// Sent unless the request carries its own `User-Agent`; some sites serve bots a stub page.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) webfreq/0.1";

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
}

impl LocalFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            // Safety defaults: avoid “hang forever” on DNS/TLS/body stalls.
            // Per-request timeouts (FetchRequest.timeout_ms) can still override this.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    fn allow_unsafe_request_headers() -> bool {
        // Opt-in escape hatch for private endpoints only.
        matches!(
            std::env::var("WEBFREQ_ALLOW_UNSAFE_HEADERS")
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
                .as_str(),
            "1" | "true" | "yes" | "on"
        )
    }

    fn is_sensitive_request_header(name: &reqwest::header::HeaderName) -> bool {
        // HeaderName::as_str() is canonical lower-case.
        matches!(
            name.as_str(),
            "authorization" | "cookie" | "proxy-authorization"
        )
    }

    fn apply_headers(
        &self,
        mut rb: reqwest::RequestBuilder,
        headers: &BTreeMap<String, String>,
    ) -> reqwest::RequestBuilder {
        let allow_unsafe = Self::allow_unsafe_request_headers();
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                if !allow_unsafe && Self::is_sensitive_request_header(&name) {
                    log::warn!("dropping sensitive request header {name}");
                    continue;
                }
                rb = rb.header(name, value);
            }
        }
        rb
    }
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let mut timings_ms = BTreeMap::new();
        let t_req = std::time::Instant::now();
        let url = req.parsed_url()?;

        let mut rb = self.client.get(url);
        if let Some(to) = req.timeout() {
            rb = rb.timeout(to);
        }
        rb = self.apply_headers(rb, &req.headers);
        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let max_bytes = req.max_bytes.unwrap_or(u64::MAX) as usize;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        if truncated {
            log::warn!("body of {final_url} truncated at {max_bytes} bytes");
        }

        timings_ms.insert("network_fetch".to_string(), t_req.elapsed().as_millis());
        log::debug!(
            "fetched url={} status={status} bytes={} ms={}",
            req.url,
            bytes.len(),
            t_req.elapsed().as_millis()
        );
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            truncated,
            timings_ms,
        })
    }
}

/// Turn a fetched response into a decoded document.
///
/// Non-2xx statuses are fetch failures; binary payloads are extraction failures.
pub fn document_from_response(resp: FetchResponse) -> Result<RawDocument> {
    if !resp.is_success() {
        return Err(Error::Fetch(format!(
            "http status {} for {}",
            resp.status, resp.final_url
        )));
    }
    extract::ensure_textual(&resp.bytes, resp.content_type.as_deref())?;
    let decoded = charset::decode(
        &resp.bytes,
        resp.content_type.as_deref(),
        Some(&resp.final_url),
    );
    if decoded.had_errors {
        log::warn!(
            "decoding {} as {} replaced malformed sequences",
            resp.final_url,
            decoded.encoding.name()
        );
    }
    Ok(RawDocument {
        url: resp.url,
        final_url: resp.final_url,
        content_type: resp.content_type,
        encoding: decoded.encoding.name().to_string(),
        markup: decoded.text,
        truncated: resp.truncated,
    })
}

/// Read a saved page from disk. `.txt` files are treated as plain text, everything else as
/// HTML; the charset is resolved the same way as for fetched bodies.
pub fn read_document(path: &Path) -> Result<RawDocument> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Fetch(format!("read {}: {e}", path.display())))?;
    let is_text = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    let content_type = if is_text { "text/plain" } else { "text/html" };
    let name = path.display().to_string();
    document_from_response(FetchResponse {
        url: name.clone(),
        final_url: name,
        status: 200,
        content_type: Some(content_type.to_string()),
        bytes,
        truncated: false,
        timings_ms: BTreeMap::new(),
    })
}

/// Fetch `req` and decode it: the content-fetcher stage of a run.
pub async fn fetch_document(
    fetcher: &dyn FetchBackend,
    req: &FetchRequest,
) -> Result<RawDocument> {
    let resp = fetcher.fetch(req).await?;
    document_from_response(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn req(url: String) -> FetchRequest {
        FetchRequest {
            url,
            timeout_ms: Some(2_000),
            max_bytes: Some(1_000_000),
            headers: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn fetch_document_decodes_gbk_declared_in_header() {
        let body = encoding_rs::GBK.encode("<p>中文网页</p>").0.into_owned();
        let app = Router::new().route(
            "/",
            get(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "text/html; charset=gbk")], body) }
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let doc = fetch_document(&fetcher, &req(format!("http://{addr}/")))
            .await
            .unwrap();
        assert_eq!(doc.encoding, "GBK");
        assert!(doc.markup.contains("中文网页"));
        assert!(!doc.truncated);
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let app = Router::new().route("/", get(|| async { (StatusCode::NOT_FOUND, "missing") }));
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let err = fetch_document(&fetcher, &req(format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)), "got {err:?}");
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn binary_body_is_an_extraction_error() {
        let app = Router::new().route(
            "/",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.7") }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let err = fetch_document(&fetcher, &req(format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_server_hits_the_request_timeout() {
        let app = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let mut r = req(format!("http://{addr}/"));
        r.timeout_ms = Some(200);
        let t0 = std::time::Instant::now();
        let err = fetcher.fetch(&r).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(t0.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn body_is_truncated_at_max_bytes() {
        let app = Router::new().route("/", get(|| async { "x".repeat(10_000) }));
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let mut r = req(format!("http://{addr}/"));
        r.max_bytes = Some(100);
        let resp = fetcher.fetch(&r).await.unwrap();
        assert_eq!(resp.bytes.len(), 100);
        assert!(resp.truncated);
    }

    #[test]
    fn read_document_decodes_saved_pages() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("page.html");
        std::fs::write(
            &html,
            encoding_rs::GBK
                .encode("<meta charset=\"gbk\"><p>保存的网页</p>")
                .0,
        )
        .unwrap();
        let doc = read_document(&html).unwrap();
        assert_eq!(doc.encoding, "GBK");
        assert!(doc.markup.contains("保存的网页"));

        let txt = dir.path().join("notes.TXT");
        std::fs::write(&txt, "纯文本").unwrap();
        assert_eq!(
            read_document(&txt).unwrap().content_type.as_deref(),
            Some("text/plain")
        );

        let err = read_document(&dir.path().join("missing.html")).unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_request() {
        let fetcher = LocalFetcher::new().unwrap();
        let err = fetcher
            .fetch(&req("ftp://example.com/".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn local_fetcher_drops_sensitive_request_headers_by_default() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("WEBFREQ_ALLOW_UNSAFE_HEADERS");

        let app = Router::new().route(
            "/",
            get(|headers: axum::http::HeaderMap| async move {
                // Fail closed: if the client forwarded secrets, we error.
                if headers.contains_key(header::AUTHORIZATION)
                    || headers.contains_key(header::COOKIE)
                {
                    return (StatusCode::BAD_REQUEST, "sensitive header was forwarded".to_string());
                }
                let ua = headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                (StatusCode::OK, format!("ok ua={ua}"))
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let mut r = req(format!("http://{addr}/"));
        r.headers
            .insert("Authorization".to_string(), "Bearer secret".to_string());
        r.headers
            .insert("Cookie".to_string(), "session=secret".to_string());

        let resp = fetcher.fetch(&r).await.unwrap();
        let body = resp.text_lossy();
        assert_eq!(resp.status, 200, "unexpected body={body}");
        assert!(body.contains("Mozilla/5.0"), "default UA missing: {body}");
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn local_fetcher_can_forward_sensitive_headers_when_explicitly_allowed() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("WEBFREQ_ALLOW_UNSAFE_HEADERS", "true");

        let app = Router::new().route(
            "/",
            get(|headers: axum::http::HeaderMap| async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                (StatusCode::OK, format!("auth={auth}"))
            }),
        );
        let addr = serve(app).await;

        let fetcher = LocalFetcher::new().unwrap();
        let mut r = req(format!("http://{addr}/"));
        r.headers
            .insert("authorization".to_string(), "Bearer ok".to_string());
        let resp = fetcher.fetch(&r).await;
        std::env::remove_var("WEBFREQ_ALLOW_UNSAFE_HEADERS");

        assert!(resp.unwrap().text_lossy().contains("auth=Bearer ok"));
    }
}
