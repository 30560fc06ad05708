//! Dictionary + HMM segmentation for Chinese text (jieba).

use jieba_rs::Jieba;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use webfreq_core::{Error, Result, Segmenter, Tokens};

/// The built-in dictionary takes a noticeable moment to load; do it once per process.
fn default_jieba() -> Arc<Jieba> {
    static SHARED: OnceLock<Arc<Jieba>> = OnceLock::new();
    SHARED
        .get_or_init(|| {
            let t0 = std::time::Instant::now();
            let j = Jieba::new();
            log::debug!("jieba dictionary loaded in {}ms", t0.elapsed().as_millis());
            Arc::new(j)
        })
        .clone()
}

#[derive(Clone)]
pub struct JiebaSegmenter {
    jieba: Arc<Jieba>,
    hmm: bool,
}

impl std::fmt::Debug for JiebaSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiebaSegmenter")
            .field("hmm", &self.hmm)
            .finish_non_exhaustive()
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl JiebaSegmenter {
    /// Precise mode with HMM discovery of out-of-dictionary words, on the shared default
    /// dictionary.
    pub fn new() -> Self {
        Self {
            jieba: default_jieba(),
            hmm: true,
        }
    }

    pub fn with_hmm(mut self, hmm: bool) -> Self {
        self.hmm = hmm;
        self
    }

    /// Default dictionary plus a user dictionary (`word [freq] [tag]` per line).
    ///
    /// Builds a private dictionary instance; the shared default one is never mutated.
    pub fn with_user_dict(path: &Path) -> Result<Self> {
        let f = std::fs::File::open(path).map_err(|e| {
            Error::InvalidConfig(format!("user dict {}: {e}", path.display()))
        })?;
        let mut jieba = Jieba::new();
        jieba
            .load_dict(&mut BufReader::new(f))
            .map_err(|e| Error::InvalidConfig(format!("user dict {}: {e}", path.display())))?;
        Ok(Self {
            jieba: Arc::new(jieba),
            hmm: true,
        })
    }
}

impl Segmenter for JiebaSegmenter {
    fn name(&self) -> &'static str {
        "jieba"
    }

    fn segment<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        Box::new(self.jieba.cut(text, self.hmm).into_iter())
    }
}
