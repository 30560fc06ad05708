//! Chart selection. Rendering itself lives outside the core; renderers only ever see a
//! [`RankedView`].

use crate::view::RankedView;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Wordcloud,
    Bar,
    Pie,
    Line,
    Scatter,
    Funnel,
    Radar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        Self::Wordcloud,
        Self::Bar,
        Self::Pie,
        Self::Line,
        Self::Scatter,
        Self::Funnel,
        Self::Radar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wordcloud => "wordcloud",
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Funnel => "funnel",
            Self::Radar => "radar",
        }
    }

    /// Default chart title (Chinese, matching the target audience of the tool).
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Wordcloud => "词云图",
            Self::Bar => "词频柱状图",
            Self::Pie => "词频饼图",
            Self::Line => "词频折线图",
            Self::Scatter => "词频散点图",
            Self::Funnel => "词频漏斗图",
            Self::Radar => "词频雷达图",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || (s == "word-cloud" && *k == Self::Wordcloud))
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                Error::InvalidConfig(format!(
                    "unknown chart kind {s:?} (allowed: {})",
                    allowed.join(", ")
                ))
            })
    }
}

/// Maps ranked (term, count) pairs to a chart option object. Pure data-to-data; no IO.
pub trait ChartRenderer: Send + Sync {
    fn kind(&self) -> ChartKind;
    fn render(&self, view: &RankedView<'_>, title: &str) -> serde_json::Value;
}
