use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use webfreq_core::filter::DEFAULT_MIN_CHARS;
use webfreq_core::{
    AnalysisConfig, ChartKind, Error as WebfreqError, FetchRequest, Segmenter, TokenFilter,
    WhitespaceSegmenter, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT_MS,
};
use webfreq_local::{export, extract, stopwords, Analysis, Analyzer, JiebaSegmenter, LocalFetcher};

mod envelope;
#[cfg(feature = "stdio")]
mod mcp;
mod report;

use envelope::{add_envelope_fields, error_payload, ErrorCode};
use report::{analysis_payload, render_text, ReportOptions, DEFAULT_PREVIEW_CHARS};

#[derive(Parser, Debug)]
#[command(name = "webfreq")]
#[command(about = "Word frequencies for Chinese web pages", long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a page (or read a file) and rank its terms.
    Analyze(AnalyzeCmd),
    /// Print the page's visible text, cleaned.
    Extract(ExtractCmd),
    /// Print the effective stopword list.
    Stopwords(StopwordsCmd),
    /// Run as an MCP stdio server (tools: word_freq, extract_text).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Page URL (http/https).
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    url: Option<String>,
    /// Read a saved page instead of fetching (`.txt` is plain text, anything else HTML).
    #[arg(long)]
    file: Option<PathBuf>,
    /// Request timeout (ms).
    #[arg(long, env = "WEBFREQ_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Stop reading the body after this many bytes.
    #[arg(long, env = "WEBFREQ_MAX_BYTES", default_value_t = DEFAULT_MAX_BYTES)]
    max_bytes: u64,
    /// Extra request header, `Name: value` (repeatable).
    #[arg(long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct StopwordArgs {
    /// Stopword file (one word per line) replacing the built-in list.
    #[arg(long, env = "WEBFREQ_STOPWORDS_FILE")]
    stopwords: Option<PathBuf>,
    /// Stopword file added on top of the list (repeatable).
    #[arg(long = "extra-stopwords")]
    extra_stopwords: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    #[command(flatten)]
    stopwords: StopwordArgs,
    /// Minimum term length in characters (at least 2).
    #[arg(long, default_value_t = DEFAULT_MIN_CHARS)]
    min_chars: usize,
    /// jieba user dictionary (`word [freq] [tag]` per line).
    #[arg(long)]
    user_dict: Option<PathBuf>,
    /// Disable HMM discovery of out-of-dictionary words.
    #[arg(long)]
    no_hmm: bool,
    /// Split on whitespace instead of jieba (for pre-segmented text).
    #[arg(long, conflicts_with_all = ["user_dict", "no_hmm"])]
    whitespace: bool,
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    filter: FilterArgs,
    /// Drop terms seen fewer than this many times.
    #[arg(long, env = "WEBFREQ_MIN_FREQ", default_value_t = 1)]
    min_freq: u64,
    /// Number of ranked terms to show (1..=100).
    #[arg(long, env = "WEBFREQ_TOP_N", default_value_t = 20)]
    top_n: usize,
    /// Embed an ECharts option: wordcloud|bar|pie|line|scatter|funnel|radar.
    #[arg(long, env = "WEBFREQ_CHART")]
    chart: Option<String>,
    /// Chart title (defaults to the chart kind's title).
    #[arg(long)]
    chart_title: Option<String>,
    /// Write the full table as CSV (UTF-8 with BOM).
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write the extracted text.
    #[arg(long)]
    text_out: Option<PathBuf>,
    /// Characters of extracted text to preview.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_CHARS)]
    preview_chars: usize,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Truncate the printed text to this many characters.
    #[arg(long)]
    max_chars: Option<usize>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct StopwordsCmd {
    #[command(flatten)]
    stopwords: StopwordArgs,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("text")
}

/// Parse `Name: value` (or `Name=value`).
fn parse_header(raw: &str) -> Result<(String, String), WebfreqError> {
    let (k, v) = raw
        .split_once(':')
        .or_else(|| raw.split_once('='))
        .ok_or_else(|| WebfreqError::InvalidConfig(format!("bad header {raw:?}; use `Name: value`")))?;
    let k = k.trim();
    if k.is_empty() {
        return Err(WebfreqError::InvalidConfig(format!("bad header {raw:?}; empty name")));
    }
    Ok((k.to_string(), v.trim().to_string()))
}

impl SourceArgs {
    fn request(&self, url: &str) -> Result<FetchRequest, WebfreqError> {
        let mut req = FetchRequest::new(url);
        req.timeout_ms = Some(self.timeout_ms);
        req.max_bytes = Some(self.max_bytes);
        for h in &self.headers {
            let (k, v) = parse_header(h)?;
            req.headers.insert(k, v);
        }
        Ok(req)
    }

    async fn document(&self) -> Result<webfreq_core::RawDocument> {
        if let Some(path) = &self.file {
            return Ok(webfreq_local::read_document(path)?);
        }
        let url = self.url.as_deref().unwrap_or_default();
        let fetcher = LocalFetcher::new()?;
        Ok(webfreq_local::fetch_document(&fetcher, &self.request(url)?).await?)
    }
}

fn resolve_stopwords(args: &StopwordArgs) -> Result<webfreq_core::StopwordSet, WebfreqError> {
    let extra: Vec<&Path> = args.extra_stopwords.iter().map(PathBuf::as_path).collect();
    stopwords::resolve_stopwords(args.stopwords.as_deref(), &extra)
}

fn build_analyzer(args: &FilterArgs) -> Result<Analyzer, WebfreqError> {
    if args.min_chars < DEFAULT_MIN_CHARS {
        return Err(WebfreqError::InvalidConfig(format!(
            "min_chars must be >= {DEFAULT_MIN_CHARS}"
        )));
    }
    let filter = TokenFilter::new(resolve_stopwords(&args.stopwords)?).with_min_chars(args.min_chars);
    let segmenter: Arc<dyn Segmenter> = if args.whitespace {
        Arc::new(WhitespaceSegmenter)
    } else {
        let jieba = match &args.user_dict {
            Some(p) => JiebaSegmenter::with_user_dict(p)?,
            None => JiebaSegmenter::new(),
        };
        Arc::new(jieba.with_hmm(!args.no_hmm))
    };
    let analyzer = Analyzer::new(segmenter, Arc::new(filter));
    log::debug!(
        "segmenter={} stopwords={} min_chars={}",
        analyzer.segmenter().name(),
        analyzer.filter().stopwords().len(),
        analyzer.filter().min_chars()
    );
    Ok(analyzer)
}

fn parse_chart(raw: Option<&str>) -> Result<Option<ChartKind>, WebfreqError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<ChartKind>)
        .transpose()
}

async fn run_analyze(args: &AnalyzeCmd) -> Result<(Analysis, Option<ChartKind>)> {
    let chart = parse_chart(args.chart.as_deref())?;
    let cfg = AnalysisConfig {
        min_freq: args.min_freq,
        top_n: args.top_n,
        chart_kind: chart.unwrap_or_default(),
    };
    cfg.validate()?;
    let analyzer = build_analyzer(&args.filter)?;

    let analysis = match (&args.source.file, args.source.url.as_deref()) {
        (None, Some(url)) => {
            let fetcher = LocalFetcher::new()?;
            analyzer
                .analyze_url(&fetcher, &args.source.request(url)?, &cfg)
                .await?
        }
        _ => {
            let doc = args.source.document().await?;
            tokio::task::spawn_blocking(move || analyzer.analyze_document(doc, &cfg)).await??
        }
    };

    if let Some(p) = &args.csv {
        export::write_csv(p, &analysis.table)?;
    }
    if let Some(p) = &args.text_out {
        export::write_text(p, &analysis.text)?;
    }
    Ok((analysis, chart))
}

/// Print the error object (JSON mode) and hand the error back so `main` exits non-zero.
fn report_error(kind: &str, json: bool, err: anyhow::Error, t0: Instant) -> anyhow::Error {
    if json {
        let code = ErrorCode::from_anyhow(&err);
        println!(
            "{}",
            error_payload(kind, code, format!("{err:#}"), t0.elapsed().as_millis())
        );
    }
    err
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // stdout carries JSON (and the MCP transport); logs always go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}

/// `KEY=VALUE` lines from `WEBFREQ_ENV_FILE`; never overrides variables already set.
fn load_env_file() {
    let Ok(p) = std::env::var("WEBFREQ_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => {
            let t0 = Instant::now();
            let json = !is_text(&args.output);
            let (analysis, chart) = match run_analyze(&args).await {
                Ok(r) => r,
                Err(e) => return Err(report_error("analyze", json, e, t0)),
            };
            let opts = ReportOptions {
                preview_chars: args.preview_chars,
                chart,
                chart_title: args.chart_title.clone(),
                include_text: false,
            };
            if json {
                let mut payload = analysis_payload(&analysis, &opts);
                if let Some(p) = &args.csv {
                    payload["artifacts"]["csv"] = serde_json::json!(p.display().to_string());
                }
                if let Some(p) = &args.text_out {
                    payload["artifacts"]["text"] = serde_json::json!(p.display().to_string());
                }
                add_envelope_fields(&mut payload, "analyze", t0.elapsed().as_millis());
                println!("{payload}");
            } else {
                print!("{}", render_text(&analysis, &opts));
            }
        }
        Commands::Extract(args) => {
            let t0 = Instant::now();
            let json = !is_text(&args.output);
            let res = async {
                let doc = args.source.document().await?;
                let text = extract::extract_text(&doc)?;
                anyhow::Ok((doc, text))
            }
            .await;
            let (doc, text) = match res {
                Ok(r) => r,
                Err(e) => return Err(report_error("extract", json, e, t0)),
            };
            let shown = text.preview(args.max_chars.unwrap_or(usize::MAX));
            if json {
                let mut payload = serde_json::json!({
                    "ok": true,
                    "url": doc.url,
                    "final_url": doc.final_url,
                    "encoding": doc.encoding,
                    "truncated": doc.truncated,
                    "text_chars": text.char_count(),
                    "text": shown,
                });
                add_envelope_fields(&mut payload, "extract", t0.elapsed().as_millis());
                println!("{payload}");
            } else {
                println!("{shown}");
            }
        }
        Commands::Stopwords(args) => {
            let t0 = Instant::now();
            let json = !is_text(&args.output);
            let set = match resolve_stopwords(&args.stopwords) {
                Ok(s) => s,
                Err(e) => return Err(report_error("stopwords", json, e.into(), t0)),
            };
            if json {
                let mut payload = serde_json::json!({
                    "ok": true,
                    "count": set.len(),
                    "stopwords": set.sorted(),
                });
                add_envelope_fields(&mut payload, "stopwords", t0.elapsed().as_millis());
                println!("{payload}");
            } else {
                for w in set.sorted() {
                    println!("{w}");
                }
            }
        }
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            mcp::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": envelope::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "webfreq",
                "version": env!("CARGO_PKG_VERSION"),
            });
            if is_text(&args.output) {
                println!("webfreq {}", env!("CARGO_PKG_VERSION"));
            } else {
                println!("{v}");
            }
        }
    }
    Ok(())
}
