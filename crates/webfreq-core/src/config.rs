use crate::chart::ChartKind;
use crate::view::MAX_TOP_N;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-run analysis knobs. Read-only once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Drop terms seen fewer than this many times. Must be >= 1.
    pub min_freq: u64,
    /// How many ranked terms the view (and chart) exposes. Must be >= 1; capped at 100.
    pub top_n: usize,
    /// Only consumed by the rendering layer.
    pub chart_kind: ChartKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_freq: 1,
            top_n: 20,
            chart_kind: ChartKind::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_freq == 0 {
            return Err(Error::InvalidConfig("min_freq must be >= 1".to_string()));
        }
        if self.top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be >= 1".to_string()));
        }
        Ok(())
    }

    /// `top_n` as actually applied by the view.
    pub fn effective_top_n(&self) -> usize {
        self.top_n.clamp(1, MAX_TOP_N)
    }
}
