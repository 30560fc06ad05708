//! JSON payloads and text rendering for analysis results.

use std::fmt::Write as _;
use webfreq_core::{ChartKind, FrequencyTable};
use webfreq_local::chart::render_chart;
use webfreq_local::Analysis;

/// Default length of the extracted-text preview.
pub(crate) const DEFAULT_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub(crate) struct ReportOptions {
    pub preview_chars: usize,
    pub chart: Option<ChartKind>,
    pub chart_title: Option<String>,
    pub include_text: bool,
}

/// Why a table came out empty, phrased as advice.
pub(crate) fn empty_hint(table: &FrequencyTable) -> &'static str {
    if table.all_below_threshold() {
        "No term reached min_freq. Lower min_freq or try a longer page."
    } else {
        "No countable Chinese terms were found. Check the URL or try another page."
    }
}

pub(crate) fn analysis_payload(a: &Analysis, opts: &ReportOptions) -> serde_json::Value {
    let view = a.view();
    let mut payload = serde_json::json!({
        "ok": true,
        "empty": a.is_empty(),
        "url": a.url,
        "final_url": a.final_url,
        "encoding": a.encoding,
        "content_type": a.content_type,
        "truncated": a.truncated,
        "config": a.config,
        "summary": a.summary(),
        "text_chars": a.text.char_count(),
        "preview": a.text.preview(opts.preview_chars),
        "top": view,
        "timings_ms": a.timings_ms,
    });
    if a.is_empty() {
        payload["hint"] = serde_json::json!(empty_hint(&a.table));
    }
    if let Some(kind) = opts.chart {
        payload["chart"] = serde_json::json!({
            "kind": kind,
            "option": render_chart(kind, &view, opts.chart_title.as_deref()),
        });
    }
    if opts.include_text {
        payload["text"] = serde_json::json!(a.text);
    }
    payload
}

pub(crate) fn render_text(a: &Analysis, opts: &ReportOptions) -> String {
    let mut out = String::new();
    let s = a.summary();
    let _ = writeln!(out, "url: {}", a.final_url);
    let _ = writeln!(out, "encoding: {}", a.encoding);
    if a.truncated {
        let _ = writeln!(out, "warning: body was truncated at max_bytes");
    }
    if a.is_empty() {
        let _ = writeln!(out, "no sufficient data: {}", empty_hint(&a.table));
        return out;
    }
    let _ = writeln!(
        out,
        "terms: {}  top: {} ({})",
        s.distinct_terms,
        s.top_term.as_deref().unwrap_or("-"),
        s.top_count
    );
    for (i, e) in a.view().entries().iter().enumerate() {
        let _ = writeln!(out, "{:>4}. {}\t{}", i + 1, e.term, e.count);
    }
    if opts.preview_chars > 0 {
        let _ = writeln!(out, "\n{}", a.text.preview(opts.preview_chars));
    }
    out
}
