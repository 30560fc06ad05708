//! One analysis run: fetch, extract, segment, filter, aggregate.

use crate::extract::extract_text;
use crate::segment::JiebaSegmenter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use webfreq_core::{
    AnalysisConfig, Error, FetchBackend, FetchRequest, FrequencyTable, NormalizedText,
    RankedView, RawDocument, Result, Segmenter, TokenFilter,
};

/// Stateless driver shared across runs; holds only read-only components.
#[derive(Clone)]
pub struct Analyzer {
    segmenter: Arc<dyn Segmenter>,
    filter: Arc<TokenFilter>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("segmenter", &self.segmenter.name())
            .field("filter", &self.filter)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub distinct_terms: usize,
    pub top_term: Option<String>,
    pub top_count: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub url: String,
    pub final_url: String,
    pub encoding: String,
    pub content_type: Option<String>,
    pub truncated: bool,
    pub text: NormalizedText,
    pub table: FrequencyTable,
    pub config: AnalysisConfig,
    pub timings_ms: BTreeMap<String, u128>,
}

impl Analysis {
    pub fn view(&self) -> RankedView<'_> {
        RankedView::new(&self.table, self.config.effective_top_n())
    }

    pub fn summary(&self) -> Summary {
        let top = self.table.top();
        Summary {
            distinct_terms: self.table.len(),
            top_term: top.map(|e| e.term.clone()),
            top_count: top.map(|e| e.count).unwrap_or(0),
            total_tokens: self.table.total_tokens(),
        }
    }

    /// No entry survived filtering and `min_freq`.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Analyzer {
    pub fn new(segmenter: Arc<dyn Segmenter>, filter: Arc<TokenFilter>) -> Self {
        Self { segmenter, filter }
    }

    /// jieba segmentation with the built-in stopword list.
    pub fn jieba_default() -> Self {
        Self::new(
            Arc::new(JiebaSegmenter::new()),
            Arc::new(TokenFilter::default()),
        )
    }

    /// Same segmenter, different filter.
    pub fn with_filter(&self, filter: TokenFilter) -> Self {
        Self::new(self.segmenter.clone(), Arc::new(filter))
    }

    pub fn segmenter(&self) -> &dyn Segmenter {
        self.segmenter.as_ref()
    }

    pub fn filter(&self) -> &TokenFilter {
        &self.filter
    }

    /// Segment, filter and aggregate normalized text.
    pub fn count(&self, text: &NormalizedText, min_freq: u64) -> FrequencyTable {
        let tokens = self.segmenter.segment(text.as_str());
        FrequencyTable::aggregate(self.filter.filter(tokens), min_freq)
    }

    /// The CPU-bound stages over an already decoded document.
    pub fn analyze_document(&self, doc: RawDocument, cfg: &AnalysisConfig) -> Result<Analysis> {
        cfg.validate()?;
        let mut timings_ms = BTreeMap::new();

        let t0 = Instant::now();
        let text = extract_text(&doc)?;
        timings_ms.insert("extract".to_string(), t0.elapsed().as_millis());

        let t1 = Instant::now();
        let table = self.count(&text, cfg.min_freq);
        timings_ms.insert("count".to_string(), t1.elapsed().as_millis());

        log::info!(
            "analyzed {} segmenter={} chars={} terms={}",
            doc.final_url,
            self.segmenter.name(),
            text.char_count(),
            table.len()
        );
        Ok(Analysis {
            url: doc.url,
            final_url: doc.final_url,
            encoding: doc.encoding,
            content_type: doc.content_type,
            truncated: doc.truncated,
            text,
            table,
            config: cfg.clone(),
            timings_ms,
        })
    }

    /// Full run against a URL. The fetch suspends; everything after it runs on the
    /// blocking pool.
    pub async fn analyze_url(
        &self,
        fetcher: &dyn FetchBackend,
        req: &FetchRequest,
        cfg: &AnalysisConfig,
    ) -> Result<Analysis> {
        cfg.validate()?;
        let t0 = Instant::now();
        let doc = crate::fetch_document(fetcher, req).await?;
        let fetch_ms = t0.elapsed().as_millis();

        let this = self.clone();
        let cfg = cfg.clone();
        let mut analysis = tokio::task::spawn_blocking(move || this.analyze_document(doc, &cfg))
            .await
            .map_err(|e| Error::Extraction(format!("analysis task failed: {e}")))??;
        analysis.timings_ms.insert("fetch".to_string(), fetch_ms);
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::get, Router};
    use webfreq_core::{StopwordSet, WhitespaceSegmenter};

    fn whitespace_analyzer() -> Analyzer {
        Analyzer::new(
            Arc::new(WhitespaceSegmenter),
            Arc::new(TokenFilter::new(StopwordSet::empty())),
        )
    }

    const NEWS: &str = r#"<html><head><title>新闻</title>
        <script>var 经济 = "经济经济";</script></head>
        <body><p>经济，科技，经济。</p>
        <p>我们的经济！</p></body></html>"#;

    #[test]
    fn count_ranks_whitespace_tokens() {
        let text = NormalizedText::clean("猫咪 猫咪 猫咪 小狗 小狗 鸟儿 猫");
        let table = whitespace_analyzer().count(&text, 1);
        let got: Vec<(&str, u64)> = table.iter().map(|e| (e.term.as_str(), e.count)).collect();
        // The single-character token never reaches the table.
        assert_eq!(got, vec![("猫咪", 3), ("小狗", 2), ("鸟儿", 1)]);
    }

    #[test]
    fn empty_document_gives_empty_analysis() {
        let a = Analyzer::jieba_default()
            .analyze_document(RawDocument::from_markup("<html></html>"), &AnalysisConfig::default())
            .unwrap();
        assert!(a.is_empty());
        assert!(a.text.is_empty());
        assert_eq!(a.summary().top_term, None);
        assert!(a.view().is_empty());
    }

    #[test]
    fn jieba_pipeline_counts_visible_text_only() {
        let a = Analyzer::jieba_default()
            .analyze_document(RawDocument::from_markup(NEWS), &AnalysisConfig::default())
            .unwrap();
        let top = a.table.top().unwrap();
        assert_eq!(top.term, "经济");
        // Body occurrences only; the script body is gone.
        assert_eq!(top.count, 3);
        assert!(a.table.iter().all(|e| e.term != "我们"));
        assert_eq!(a.summary().top_count, 3);
    }

    #[test]
    fn analysis_is_idempotent() {
        let an = Analyzer::jieba_default();
        let cfg = AnalysisConfig::default();
        let a = an
            .analyze_document(RawDocument::from_markup(NEWS), &cfg)
            .unwrap();
        let b = an
            .analyze_document(RawDocument::from_markup(NEWS), &cfg)
            .unwrap();
        assert_eq!(a.table, b.table);
        assert_eq!(a.text, b.text);
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let cfg = AnalysisConfig {
            min_freq: 0,
            ..Default::default()
        };
        let err = Analyzer::jieba_default()
            .analyze_document(RawDocument::from_markup(NEWS), &cfg)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn view_respects_top_n() {
        let cfg = AnalysisConfig {
            top_n: 1,
            ..Default::default()
        };
        let a = Analyzer::jieba_default()
            .analyze_document(RawDocument::from_markup(NEWS), &cfg)
            .unwrap();
        assert_eq!(a.view().len(), 1);
        assert_eq!(a.view().entries()[0], *a.table.top().unwrap());
    }

    #[tokio::test]
    async fn analyze_url_runs_end_to_end() {
        let app = Router::new().route(
            "/news",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], NEWS) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let fetcher = crate::LocalFetcher::new().unwrap();
        let req = FetchRequest::new(format!("http://{addr}/news"));
        let a = Analyzer::jieba_default()
            .analyze_url(&fetcher, &req, &AnalysisConfig::default())
            .await
            .unwrap();
        assert_eq!(a.encoding, "UTF-8");
        assert_eq!(a.table.top().unwrap().term, "经济");
        assert!(a.timings_ms.contains_key("fetch"));
        assert!(a.timings_ms.contains_key("count"));
    }

    #[tokio::test]
    async fn analyze_url_surfaces_fetch_errors() {
        let fetcher = crate::LocalFetcher::new().unwrap();
        let req = FetchRequest::new("not a url");
        let err = Analyzer::jieba_default()
            .analyze_url(&fetcher, &req, &AnalysisConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }
}
