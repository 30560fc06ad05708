//! Frequency aggregation and the ranked table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub term: String,
    pub count: u64,
}

/// Terms ranked by count, descending; equal counts keep first-occurrence order.
///
/// Built once per run by [`FrequencyTable::aggregate`] and read-only afterwards.
///
/// Serialize-only: a table can only come out of `aggregate`, so terms are unique and ranked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
    /// Number of filtered tokens consumed (sum of counts before `min_freq`).
    total_tokens: u64,
    /// Distinct terms seen before `min_freq`.
    distinct_terms: usize,
    min_freq: u64,
}

impl FrequencyTable {
    /// Count every token, drop terms with `count < min_freq`, and rank.
    ///
    /// Consumes the whole sequence before producing output. A `min_freq` of 0 behaves like 1.
    pub fn aggregate<'t, I>(tokens: I, min_freq: u64) -> Self
    where
        I: IntoIterator<Item = &'t str>,
    {
        // Entries live in first-occurrence order; the map only points into them.
        let mut index: HashMap<&'t str, usize> = HashMap::new();
        let mut entries: Vec<FrequencyEntry> = Vec::new();
        let mut total_tokens = 0u64;
        for tok in tokens {
            total_tokens += 1;
            match index.get(tok) {
                Some(&i) => entries[i].count += 1,
                None => {
                    index.insert(tok, entries.len());
                    entries.push(FrequencyEntry {
                        term: tok.to_string(),
                        count: 1,
                    });
                }
            }
        }
        let distinct_terms = entries.len();

        let min_freq = min_freq.max(1);
        entries.retain(|e| e.count >= min_freq);
        // `sort_by` is stable: ties stay in first-occurrence order.
        entries.sort_by(|a, b| b.count.cmp(&a.count));

        log::debug!(
            "aggregated tokens={total_tokens} distinct={distinct_terms} kept={} min_freq={min_freq}",
            entries.len()
        );

        Self {
            entries,
            total_tokens,
            distinct_terms,
            min_freq,
        }
    }

    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// "No sufficient data": nothing survived filtering and the threshold. Not an error.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn distinct_terms(&self) -> usize {
        self.distinct_terms
    }

    pub fn min_freq(&self) -> u64 {
        self.min_freq
    }

    /// True when tokens were counted but all fell below `min_freq`.
    pub fn all_below_threshold(&self) -> bool {
        self.entries.is_empty() && self.total_tokens > 0
    }

    pub fn top(&self) -> Option<&FrequencyEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrequencyEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a FrequencyTable {
    type Item = &'a FrequencyEntry;
    type IntoIter = std::slice::Iter<'a, FrequencyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
