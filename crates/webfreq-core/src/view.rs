use crate::freq::{FrequencyEntry, FrequencyTable};
use crate::{Error, Result};
use serde::Serialize;

/// Upper bound on how many terms a view exposes.
pub const MAX_TOP_N: usize = 100;

/// Read-only prefix of a [`FrequencyTable`]. The only thing chart renderers see.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct RankedView<'a> {
    entries: &'a [FrequencyEntry],
}

impl<'a> RankedView<'a> {
    /// First `min(top_n, MAX_TOP_N, table.len())` entries, in table order.
    pub fn new(table: &'a FrequencyTable, top_n: usize) -> Self {
        let n = top_n.min(MAX_TOP_N).min(table.len());
        Self {
            entries: &table.entries()[..n],
        }
    }

    /// Like [`RankedView::new`], but rejects `top_n == 0`.
    pub fn checked(table: &'a FrequencyTable, top_n: usize) -> Result<Self> {
        if top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be >= 1".to_string()));
        }
        Ok(Self::new(table, top_n))
    }

    pub fn entries(&self) -> &'a [FrequencyEntry] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.iter().map(|e| e.term.as_str())
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + 'a {
        self.entries.iter().map(|e| e.count)
    }

    /// Highest count in the view (the first entry), or 0 when empty.
    pub fn max_count(&self) -> u64 {
        self.entries.first().map(|e| e.count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn view_truncates_without_reordering() {
        let t = FrequencyTable::aggregate("猫 猫 猫 狗 狗 鸟".split_whitespace(), 1);
        let v = RankedView::new(&t, 2);
        assert_eq!(v.terms().collect::<Vec<_>>(), vec!["猫", "狗"]);
        assert_eq!(v.max_count(), 3);
        assert_eq!(RankedView::new(&t, 50).len(), 3);
    }

    #[test]
    fn checked_rejects_zero() {
        let t = FrequencyTable::default();
        assert!(RankedView::checked(&t, 0).is_err());
        let v = RankedView::checked(&t, 10).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.max_count(), 0);
    }

    #[test]
    fn view_is_capped() {
        let words: Vec<String> = (0..300).map(|i| format!("词{i}")).collect();
        let t = FrequencyTable::aggregate(words.iter().map(String::as_str), 1);
        assert_eq!(RankedView::new(&t, 1_000).len(), MAX_TOP_N);
    }

    proptest! {
        #[test]
        fn view_is_a_prefix_of_the_table(
            toks in prop::collection::vec(0u8..30, 0..200),
            top_n in 1usize..150,
        ) {
            let words: Vec<String> = toks.iter().map(|n| format!("词{n}")).collect();
            let t = FrequencyTable::aggregate(words.iter().map(String::as_str), 1);
            let v = RankedView::new(&t, top_n);
            prop_assert!(v.len() <= top_n.min(t.len()));
            prop_assert_eq!(v.entries(), &t.entries()[..v.len()]);
        }
    }
}
