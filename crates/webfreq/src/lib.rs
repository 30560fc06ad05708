//! Public facade crate for `webfreq`.
//!
//! Re-exports the backend-agnostic types and counting stages from `webfreq-core`. With the
//! `local` feature (on by default) the reqwest/scraper/jieba implementations are available as
//! [`local`], along with [`analyze_url`] for the common one-shot case.

pub use webfreq_core::*;

#[cfg(feature = "local")]
pub use webfreq_local as local;

/// Fetch `url` and rank its terms with jieba and the built-in stopword list.
#[cfg(feature = "local")]
pub async fn analyze_url(url: &str, cfg: &AnalysisConfig) -> Result<local::Analysis> {
    let fetcher = local::LocalFetcher::new()?;
    let req = FetchRequest::new(url);
    let analysis = local::Analyzer::jieba_default()
        .analyze_url(&fetcher, &req, cfg)
        .await?;
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_stages_compose_through_the_facade() {
        let text = NormalizedText::clean("猫猫 狗狗 猫猫\n  的的 猫猫 cat");
        let filter = TokenFilter::new(StopwordSet::from_words(["的的"]));
        let table = FrequencyTable::aggregate(
            filter.filter(WhitespaceSegmenter.segment(text.as_str())),
            1,
        );
        let view = RankedView::new(&table, 1);
        assert_eq!(view.terms().collect::<Vec<_>>(), vec!["猫猫"]);
        assert_eq!(table.total_tokens(), 4);
    }

    #[cfg(feature = "local")]
    #[tokio::test]
    async fn analyze_url_rejects_non_http_urls() {
        let err = analyze_url("file:///etc/passwd", &AnalysisConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
