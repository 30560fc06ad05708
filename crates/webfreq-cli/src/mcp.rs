use crate::envelope::{add_envelope_fields, error_obj, error_payload, ErrorCode};
use crate::report::{analysis_payload, ReportOptions, DEFAULT_PREVIEW_CHARS};
use rmcp::{
    handler::server::router::tool::ToolRouter as RmcpToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use webfreq_core::{AnalysisConfig, ChartKind, Error as WebfreqError, FetchRequest, RawDocument, TokenFilter};
use webfreq_local::{extract, fetch_document, Analyzer, JiebaSegmenter, LocalFetcher};

fn tool_result(payload: serde_json::Value) -> CallToolResult {
    // Structured content for machine consumers, plus a text copy for clients that only read
    // `content[0].text`.
    let mut r = CallToolResult::structured(payload.clone());
    r.content = vec![Content::text(payload.to_string())];
    r
}

/// Where a tool call gets its markup from. Exactly one must be set.
#[derive(Debug, Deserialize, JsonSchema, Default)]
struct SourceArgs {
    /// Page URL (http/https).
    #[serde(default)]
    url: Option<String>,
    /// Raw HTML, analyzed as-is (no fetch).
    #[serde(default)]
    html: Option<String>,
    /// Plain text, analyzed as-is (no fetch).
    #[serde(default)]
    text: Option<String>,
    /// Request timeout for `url` (ms).
    #[serde(default)]
    timeout_ms: Option<u64>,
    /// Body byte cap for `url`.
    #[serde(default)]
    max_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
struct WordFreqArgs {
    #[serde(flatten)]
    source: SourceArgs,
    /// Drop terms seen fewer than this many times (default 1).
    #[serde(default)]
    min_freq: Option<u64>,
    /// Number of ranked terms to return (default 20, max 100).
    #[serde(default)]
    top_n: Option<usize>,
    /// Embed an ECharts option for this chart kind
    /// (wordcloud|bar|pie|line|scatter|funnel|radar).
    #[serde(default)]
    chart: Option<String>,
    /// Words to ignore on top of the built-in stopword list.
    #[serde(default)]
    extra_stopwords: Option<Vec<String>>,
    /// Characters of extracted text to preview (default 1000).
    #[serde(default)]
    preview_chars: Option<usize>,
    /// Include the full normalized text.
    #[serde(default)]
    include_text: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
struct ExtractTextArgs {
    #[serde(flatten)]
    source: SourceArgs,
    /// Truncate the returned text to this many characters.
    #[serde(default)]
    max_chars: Option<usize>,
}

#[derive(Clone)]
pub(crate) struct WebfreqMcp {
    tool_router: RmcpToolRouter<Self>,
    fetcher: Arc<LocalFetcher>,
    analyzer: Analyzer,
}

impl WebfreqMcp {
    async fn load(&self, src: &SourceArgs) -> Result<RawDocument, WebfreqError> {
        let given = [&src.url, &src.html, &src.text]
            .iter()
            .filter(|s| s.is_some())
            .count();
        if given != 1 {
            return Err(WebfreqError::InvalidConfig(
                "pass exactly one of url, html, text".to_string(),
            ));
        }
        if let Some(html) = &src.html {
            return Ok(RawDocument::from_markup(html.clone()));
        }
        if let Some(text) = &src.text {
            let mut doc = RawDocument::from_markup(text.clone());
            doc.content_type = Some("text/plain".to_string());
            return Ok(doc);
        }
        let mut req = FetchRequest::new(src.url.clone().unwrap_or_default());
        if let Some(ms) = src.timeout_ms {
            req.timeout_ms = Some(ms);
        }
        if let Some(mb) = src.max_bytes {
            req.max_bytes = Some(mb);
        }
        fetch_document(self.fetcher.as_ref(), &req).await
    }

    fn analyzer_for(&self, extra: Option<&[String]>) -> Analyzer {
        match extra {
            Some(words) if !words.is_empty() => self
                .analyzer
                .with_filter(self.analyzer.filter().clone().with_extra_stopwords(words)),
            _ => self.analyzer.clone(),
        }
    }

    async fn word_freq_inner(
        &self,
        args: WordFreqArgs,
    ) -> Result<serde_json::Value, WebfreqError> {
        let chart = args
            .chart
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ChartKind>)
            .transpose()?;
        let defaults = AnalysisConfig::default();
        let cfg = AnalysisConfig {
            min_freq: args.min_freq.unwrap_or(defaults.min_freq),
            top_n: args.top_n.unwrap_or(defaults.top_n),
            chart_kind: chart.unwrap_or_default(),
        };
        cfg.validate()?;

        let doc = self.load(&args.source).await?;
        let analyzer = self.analyzer_for(args.extra_stopwords.as_deref());
        let analysis = tokio::task::spawn_blocking(move || analyzer.analyze_document(doc, &cfg))
            .await
            .map_err(|e| WebfreqError::Extraction(format!("analysis task failed: {e}")))??;

        let opts = ReportOptions {
            preview_chars: args.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS),
            chart,
            chart_title: None,
            include_text: args.include_text.unwrap_or(false),
        };
        Ok(analysis_payload(&analysis, &opts))
    }
}

#[tool_router]
impl WebfreqMcp {
    pub(crate) fn new() -> Result<Self, McpError> {
        let fetcher =
            LocalFetcher::new().map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let stopwords = webfreq_local::stopwords::resolve_stopwords(None, &[])
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(Self {
            tool_router: Self::tool_router(),
            fetcher: Arc::new(fetcher),
            analyzer: Analyzer::new(
                Arc::new(JiebaSegmenter::new()),
                Arc::new(TokenFilter::new(stopwords)),
            ),
        })
    }

    #[tool(
        description = "Fetch a page (or take raw html/text), segment its Chinese text, and return ranked term frequencies"
    )]
    async fn word_freq(
        &self,
        params: Parameters<Option<WordFreqArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = std::time::Instant::now();
        let args = params.0.unwrap_or_default();
        let payload = match self.word_freq_inner(args).await {
            Ok(mut payload) => {
                add_envelope_fields(&mut payload, "word_freq", t0.elapsed().as_millis());
                payload
            }
            Err(e) => error_payload(
                "word_freq",
                ErrorCode::from_error(&e),
                e,
                t0.elapsed().as_millis(),
            ),
        };
        Ok(tool_result(payload))
    }

    #[tool(description = "Fetch a page (or take raw html/text) and return its visible text, cleaned")]
    async fn extract_text(
        &self,
        params: Parameters<Option<ExtractTextArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = std::time::Instant::now();
        let args = params.0.unwrap_or_default();
        let doc = match self.load(&args.source).await {
            Ok(d) => d,
            Err(e) => {
                let payload = error_payload(
                    "extract_text",
                    ErrorCode::from_error(&e),
                    e,
                    t0.elapsed().as_millis(),
                );
                return Ok(tool_result(payload));
            }
        };
        let mut payload = match extract::extract_text(&doc) {
            Ok(text) => {
                let max_chars = args.max_chars.unwrap_or(usize::MAX);
                serde_json::json!({
                    "ok": true,
                    "url": doc.url,
                    "final_url": doc.final_url,
                    "encoding": doc.encoding,
                    "truncated": doc.truncated,
                    "text_chars": text.char_count(),
                    "text": text.preview(max_chars),
                })
            }
            Err(e) => serde_json::json!({
                "ok": false,
                "url": doc.url,
                "error": error_obj(ErrorCode::from_error(&e), &e, ErrorCode::from_error(&e).hint()),
            }),
        };
        add_envelope_fields(&mut payload, "extract_text", t0.elapsed().as_millis());
        Ok(tool_result(payload))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for WebfreqMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Chinese web page word frequencies (jieba segmentation). Outputs are JSON and schema-versioned."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub(crate) async fn serve_stdio() -> Result<(), McpError> {
    let svc = WebfreqMcp::new()?;
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Keep the stdio server alive until the client closes.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}
