//! Token validity rules: length, stopword membership, core-script membership.

use std::collections::HashSet;

/// Common Chinese function words and particles excluded from counting.
pub const DEFAULT_STOPWORDS: [&str; 47] = [
    "的", "了", "在", "是", "和", "有", "也", "都", "这", "个", "中", "到", "为", "对", "与", "上",
    "或", "等", "于", "之", "而", "及", "就", "但", "并", "很", "要", "从", "以", "将", "不",
    "我们", "他们", "可以", "一个", "没有", "不是", "这个", "就是", "这样", "因为", "所以", "如果",
    "虽然", "但是", "而且", "然后",
];

/// Minimum token length (in chars) accepted by default.
pub const DEFAULT_MIN_CHARS: usize = 2;

/// Exact-match stopword set. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::from_words(DEFAULT_STOPWORDS)
    }
}

impl StopwordSet {
    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::empty();
        out.extend(words);
        out
    }

    /// Parse a stopword list: one word per line, `#` starts a comment line, blank lines ignored.
    pub fn parse(list: &str) -> Self {
        Self::from_words(parse_lines(list))
    }

    /// Add words (trimmed; empty entries are skipped).
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            let w = w.as_ref().trim();
            if !w.is_empty() {
                self.words.insert(w.to_string());
            }
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Sorted copy, for stable display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.words.iter().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}

fn parse_lines(list: &str) -> impl Iterator<Item = &str> {
    list.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Inclusive Unicode range whose characters count as "real" content for the target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptBlock {
    pub start: char,
    pub end: char,
}

impl ScriptBlock {
    /// CJK Unified Ideographs, basic block as used for Chinese word filtering.
    pub const CJK_UNIFIED: ScriptBlock = ScriptBlock {
        start: '\u{4e00}',
        end: '\u{9fa5}',
    };

    pub fn contains(&self, c: char) -> bool {
        (self.start..=self.end).contains(&c)
    }

    pub fn any_in(&self, s: &str) -> bool {
        s.chars().any(|c| self.contains(c))
    }
}

impl Default for ScriptBlock {
    fn default() -> Self {
        Self::CJK_UNIFIED
    }
}

/// Streaming validity filter.
///
/// A token is kept when its char count is at least `min_chars`, it is not a stopword, and it
/// contains at least one character of the core script block. Everything else is dropped
/// silently.
#[derive(Debug, Clone)]
pub struct TokenFilter {
    stopwords: StopwordSet,
    min_chars: usize,
    script: ScriptBlock,
}

impl Default for TokenFilter {
    fn default() -> Self {
        Self::new(StopwordSet::default())
    }
}

impl TokenFilter {
    pub fn new(stopwords: StopwordSet) -> Self {
        Self {
            stopwords,
            min_chars: DEFAULT_MIN_CHARS,
            script: ScriptBlock::default(),
        }
    }

    /// Raise the minimum token length. Values below [`DEFAULT_MIN_CHARS`] are ignored: single
    /// characters never count as terms.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars.max(DEFAULT_MIN_CHARS);
        self
    }

    pub fn with_script(mut self, script: ScriptBlock) -> Self {
        self.script = script;
        self
    }

    /// Add stopwords on top of the current set.
    pub fn with_extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords.extend(words);
        self
    }

    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    pub fn accepts(&self, token: &str) -> bool {
        // Cheapest check first; `chars().count()` stops being cheap on long junk tokens,
        // so bail as soon as we've seen enough chars.
        if token.chars().take(self.min_chars).count() < self.min_chars {
            return false;
        }
        !self.stopwords.contains(token) && self.script.any_in(token)
    }

    /// Lazily keep only accepted tokens.
    pub fn filter<'f, 't, I>(&'f self, tokens: I) -> impl Iterator<Item = &'t str> + 'f
    where
        I: IntoIterator<Item = &'t str>,
        I::IntoIter: 'f,
    {
        tokens.into_iter().filter(move |t| self.accepts(t))
    }
}
