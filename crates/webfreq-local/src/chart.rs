//! ECharts option objects for each [`ChartKind`].
//!
//! Output is plain JSON that any ECharts 5 front end can `setOption` directly.

use serde_json::{json, Value};
use webfreq_core::{ChartKind, ChartRenderer, RankedView};

/// Radar charts get unreadable past this many axes.
pub const RADAR_MAX_TERMS: usize = 10;

const SERIES_NAME: &str = "词频";
const X_AXIS_NAME: &str = "词汇";
const Y_AXIS_NAME: &str = "频率";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EChartsRenderer {
    kind: ChartKind,
}

impl EChartsRenderer {
    pub fn new(kind: ChartKind) -> Self {
        Self { kind }
    }
}

pub fn renderer(kind: ChartKind) -> Box<dyn ChartRenderer> {
    Box::new(EChartsRenderer::new(kind))
}

/// Render `view` as `kind`, using the kind's default title when `title` is empty.
pub fn render_chart(kind: ChartKind, view: &RankedView<'_>, title: Option<&str>) -> Value {
    let r = renderer(kind);
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(r.kind().default_title());
    r.render(view, title)
}

fn name_value_pairs(view: &RankedView<'_>) -> Vec<Value> {
    view.entries()
        .iter()
        .map(|e| json!({ "name": e.term, "value": e.count }))
        .collect()
}

fn category_axes(view: &RankedView<'_>) -> (Value, Value) {
    let terms: Vec<&str> = view.terms().collect();
    (
        json!({
            "type": "category",
            "name": X_AXIS_NAME,
            "data": terms,
            "axisLabel": { "rotate": 45 },
        }),
        json!({ "type": "value", "name": Y_AXIS_NAME }),
    )
}

fn wordcloud(view: &RankedView<'_>, title: &str) -> Value {
    json!({
        "title": { "text": title, "textStyle": { "fontSize": 20 } },
        "tooltip": { "show": true },
        "series": [{
            "type": "wordCloud",
            "name": title,
            "shape": "circle",
            "sizeRange": [20, 100],
            "rotationRange": [-90, 90],
            "rotationStep": 45,
            "data": name_value_pairs(view),
        }],
    })
}

fn bar(view: &RankedView<'_>, title: &str) -> Value {
    let (x, y) = category_axes(view);
    let counts: Vec<u64> = view.counts().collect();
    json!({
        "title": { "text": title },
        "tooltip": { "trigger": "item" },
        "xAxis": x,
        "yAxis": y,
        "dataZoom": [{ "type": "slider" }],
        "series": [{ "type": "bar", "name": SERIES_NAME, "data": counts }],
    })
}

fn pie(view: &RankedView<'_>, title: &str) -> Value {
    json!({
        "title": { "text": title },
        "tooltip": { "trigger": "item" },
        "legend": { "orient": "vertical", "top": "15%", "left": "2%" },
        "series": [{
            "type": "pie",
            "radius": ["30%", "75%"],
            "center": ["50%", "50%"],
            "label": { "formatter": "{b}: {c} ({d}%)" },
            "data": name_value_pairs(view),
        }],
    })
}

fn line(view: &RankedView<'_>, title: &str) -> Value {
    let (x, y) = category_axes(view);
    let counts: Vec<u64> = view.counts().collect();
    json!({
        "title": { "text": title },
        "tooltip": { "trigger": "axis" },
        "xAxis": x,
        "yAxis": y,
        "series": [{ "type": "line", "name": SERIES_NAME, "data": counts }],
    })
}

fn scatter(view: &RankedView<'_>, title: &str) -> Value {
    let (x, y) = category_axes(view);
    // ECharts can't take a size callback through JSON, so bake the size into each point.
    let points: Vec<Value> = view
        .counts()
        .map(|c| json!({ "value": c, "symbolSize": c.saturating_mul(2) }))
        .collect();
    json!({
        "title": { "text": title },
        "tooltip": { "trigger": "item", "formatter": "{a}: {c}<br/>{b}: {c}" },
        "xAxis": x,
        "yAxis": y,
        "series": [{ "type": "scatter", "name": SERIES_NAME, "data": points }],
    })
}

fn funnel(view: &RankedView<'_>, title: &str) -> Value {
    json!({
        "title": { "text": title },
        "tooltip": { "trigger": "item", "formatter": "{a}<br/>{b}: {c}" },
        "series": [{
            "type": "funnel",
            "gap": 2,
            "label": { "position": "inside" },
            "data": name_value_pairs(view),
        }],
    })
}

fn radar(view: &RankedView<'_>, title: &str) -> Value {
    let entries = &view.entries()[..view.len().min(RADAR_MAX_TERMS)];
    let max = view.max_count();
    let indicators: Vec<Value> = entries
        .iter()
        .map(|e| json!({ "name": e.term, "max": max }))
        .collect();
    let values: Vec<u64> = entries.iter().map(|e| e.count).collect();
    json!({
        "title": { "text": title },
        "legend": { "selectedMode": "single" },
        "radar": { "indicator": indicators },
        "series": [{
            "type": "radar",
            "name": "词频分布",
            "lineStyle": { "width": 2 },
            "areaStyle": { "opacity": 0.1 },
            "data": [{ "value": values, "name": "词频分布" }],
        }],
    })
}

impl ChartRenderer for EChartsRenderer {
    fn kind(&self) -> ChartKind {
        self.kind
    }

    fn render(&self, view: &RankedView<'_>, title: &str) -> Value {
        match self.kind {
            ChartKind::Wordcloud => wordcloud(view, title),
            ChartKind::Bar => bar(view, title),
            ChartKind::Pie => pie(view, title),
            ChartKind::Line => line(view, title),
            ChartKind::Scatter => scatter(view, title),
            ChartKind::Funnel => funnel(view, title),
            ChartKind::Radar => radar(view, title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webfreq_core::FrequencyTable;

    fn table() -> FrequencyTable {
        let mut toks = Vec::new();
        for (i, w) in ["经济", "发展", "科技", "创新", "市场", "政策", "企业", "产业", "技术", "人才", "教育", "文化"]
            .iter()
            .enumerate()
        {
            for _ in 0..(20 - i) {
                toks.push(*w);
            }
        }
        FrequencyTable::aggregate(toks, 1)
    }

    #[test]
    fn every_kind_renders_its_series_type() {
        let t = table();
        let v = RankedView::new(&t, 20);
        for kind in ChartKind::ALL {
            let r = renderer(kind);
            assert_eq!(r.kind(), kind);
            let out = r.render(&v, kind.default_title());
            let ty = out["series"][0]["type"].as_str().unwrap();
            let expected = match kind {
                ChartKind::Wordcloud => "wordCloud",
                other => other.as_str(),
            };
            assert_eq!(ty, expected);
            assert_eq!(out["title"]["text"], kind.default_title());
        }
    }

    #[test]
    fn wordcloud_uses_size_range_and_pairs() {
        let t = table();
        let out = render_chart(ChartKind::Wordcloud, &RankedView::new(&t, 3), None);
        assert_eq!(out["series"][0]["sizeRange"], json!([20, 100]));
        assert_eq!(out["series"][0]["data"][0], json!({"name": "经济", "value": 20}));
        assert_eq!(out["series"][0]["data"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn scatter_symbol_size_is_double_the_count() {
        let t = table();
        let out = renderer(ChartKind::Scatter).render(&RankedView::new(&t, 2), "t");
        assert_eq!(out["series"][0]["data"][1], json!({"value": 19, "symbolSize": 38}));
        assert_eq!(out["xAxis"]["axisLabel"]["rotate"], 45);
    }

    #[test]
    fn radar_caps_indicators_and_uses_view_max() {
        let t = table();
        let out = renderer(ChartKind::Radar).render(&RankedView::new(&t, 20), "t");
        let ind = out["radar"]["indicator"].as_array().unwrap();
        assert_eq!(ind.len(), RADAR_MAX_TERMS);
        assert!(ind.iter().all(|i| i["max"] == 20));
        assert_eq!(
            out["series"][0]["data"][0]["value"].as_array().unwrap().len(),
            RADAR_MAX_TERMS
        );
    }

    #[test]
    fn pie_and_funnel_use_ring_and_gap_layout() {
        let t = table();
        let v = RankedView::new(&t, 5);
        let pie = renderer(ChartKind::Pie).render(&v, "t");
        assert_eq!(pie["series"][0]["radius"], json!(["30%", "75%"]));
        let funnel = renderer(ChartKind::Funnel).render(&v, "t");
        assert_eq!(funnel["series"][0]["gap"], 2);
    }

    #[test]
    fn empty_view_renders_empty_data() {
        let t = FrequencyTable::default();
        let v = RankedView::new(&t, 20);
        for kind in ChartKind::ALL {
            let out = renderer(kind).render(&v, "空");
            assert!(out["series"][0]["data"].as_array().unwrap().is_empty() || kind == ChartKind::Radar);
        }
        let radar = renderer(ChartKind::Radar).render(&v, "空");
        assert!(radar["radar"]["indicator"].as_array().unwrap().is_empty());
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let t = table();
        let out = render_chart(ChartKind::Bar, &RankedView::new(&t, 5), Some("  "));
        assert_eq!(out["title"]["text"], "词频柱状图");
    }
}
