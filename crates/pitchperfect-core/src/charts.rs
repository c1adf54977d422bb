// Rendering-agnostic chart models.
//
// Each model is plain data: a renderer (terminal, web, plotting library) turns
// it into pixels. Models never carry colors or layout, only values, labels and
// the few flags a renderer cannot infer (highlight, diagonal).

use crate::cohort::Cohort;
use crate::derived::ShotFunnel;
use crate::percentile;
use crate::schema::MetricId;
use crate::table::{Dataset, PlayerRow};
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;

/// Most players a grouped bar chart can compare.
pub const MAX_BAR_SERIES: usize = 4;

/// Default number of histogram bins.
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    #[error("cannot compare {requested} players in one chart (max {max})")]
    TooManySeries { requested: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Radar (pizza)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSpoke {
    pub metric: MetricId,
    pub label: String,
    pub raw: Option<f64>,
    pub percentile: Option<f64>,
}

/// Ordered spokes. The renderer closes the polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarChart {
    pub spokes: Vec<RadarSpoke>,
    /// Cohort size the percentiles were computed against.
    pub cohort_size: usize,
}

impl RadarChart {
    pub fn labels(&self) -> Vec<&str> {
        self.spokes.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn spoke(&self, metric: MetricId) -> Option<&RadarSpoke> {
        self.spokes.iter().find(|s| s.metric == metric)
    }
}

/// Build the radar for the cohort's reference. Metrics whose column is absent
/// from the dataset get no spoke at all.
pub fn radar(dataset: &Dataset, cohort: &Cohort<'_>, metrics: &[MetricId], min_size: usize) -> RadarChart {
    let spokes = metrics
        .iter()
        .filter(|m| dataset.has_column(**m))
        .map(|m| {
            let r = percentile::score(cohort, *m, min_size);
            RadarSpoke {
                metric: *m,
                label: m.label().to_string(),
                raw: r.raw,
                percentile: r.percentile,
            }
        })
        .collect();
    RadarChart {
        spokes,
        cohort_size: cohort.len(),
    }
}

// ---------------------------------------------------------------------------
// Scatter with highlight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub name: String,
    pub team: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub x_metric: MetricId,
    pub y_metric: MetricId,
    pub x_label: String,
    pub y_label: String,
    /// Every row with both coordinates known, reference included.
    pub points: Vec<ScatterPoint>,
    /// The reference, drawn on top. `None` when one of its coordinates is unknown.
    pub highlight: Option<ScatterPoint>,
    /// Draw `y = x`.
    pub diagonal: bool,
    /// Names to annotate: the top points by `x + y`.
    pub labels: Vec<String>,
}

fn point(row: &PlayerRow, x: MetricId, y: MetricId) -> Option<ScatterPoint> {
    Some(ScatterPoint {
        name: row.name.clone(),
        team: row.team.clone(),
        x: row.get(x)?,
        y: row.get(y)?,
    })
}

pub fn scatter(
    rows: &[&PlayerRow],
    reference: &PlayerRow,
    x: MetricId,
    y: MetricId,
    label_top: usize,
) -> ScatterChart {
    let points: Vec<ScatterPoint> = rows.iter().filter_map(|r| point(r, x, y)).collect();

    let mut ranked: Vec<&ScatterPoint> = points.iter().collect();
    ranked.sort_by(|a, b| {
        (b.x + b.y)
            .total_cmp(&(a.x + a.y))
            .then_with(|| a.name.cmp(&b.name))
    });
    let labels = ranked
        .into_iter()
        .take(label_top)
        .map(|p| p.name.clone())
        .collect();

    ScatterChart {
        x_metric: x,
        y_metric: y,
        x_label: x.label().to_string(),
        y_label: y.label().to_string(),
        highlight: point(reference, x, y),
        points,
        diagonal: x.shares_units_with(y),
        labels,
    }
}

// ---------------------------------------------------------------------------
// Grouped bar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarChart {
    pub metrics: Vec<MetricId>,
    pub labels: Vec<String>,
    pub series: Vec<BarSeries>,
}

pub fn grouped_bar(players: &[&PlayerRow], metrics: &[MetricId]) -> Result<GroupedBarChart, ChartError> {
    if players.len() > MAX_BAR_SERIES {
        return Err(ChartError::TooManySeries {
            requested: players.len(),
            max: MAX_BAR_SERIES,
        });
    }
    Ok(GroupedBarChart {
        metrics: metrics.to_vec(),
        labels: metrics.iter().map(|m| m.label().to_string()).collect(),
        series: players
            .iter()
            .map(|p| BarSeries {
                name: p.name.clone(),
                values: metrics.iter().map(|m| p.get(*m)).collect(),
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Funnel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub metric: MetricId,
    pub label: String,
    pub value: f64,
    /// Share of the first stage, in percent. Unknown when the first stage is 0.
    pub pct_of_initial: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelChart {
    pub stages: Vec<FunnelStage>,
}

pub fn funnel(f: &ShotFunnel) -> FunnelChart {
    let initial = f.shots;
    let stages = f
        .stages()
        .iter()
        .map(|(metric, value)| FunnelStage {
            metric: *metric,
            label: metric.label().to_string(),
            value: *value,
            pct_of_initial: (initial > 0.0).then(|| 100.0 * value / initial),
        })
        .collect();
    FunnelChart { stages }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// One equal-width bin. Ranges are half-open except the last, which also
/// holds the maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub range: Range<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub metric: MetricId,
    pub label: String,
    pub bins: Vec<HistogramBin>,
    /// Known values counted.
    pub n: usize,
    /// The reference player's value, for a marker line.
    pub reference: Option<f64>,
}

impl Histogram {
    pub fn new(metric: MetricId, values: &[f64], num_bins: usize, reference: Option<f64>) -> Self {
        let known: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        Histogram {
            metric,
            label: metric.label().to_string(),
            bins: equal_width_bins(&known, num_bins),
            n: known.len(),
            reference,
        }
    }

    /// Histogram of a metric over the given rows, unknowns excluded.
    pub fn of_rows(rows: &[&PlayerRow], metric: MetricId, num_bins: usize, reference: Option<f64>) -> Self {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.get(metric)).collect();
        Self::new(metric, &values, num_bins, reference)
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Split `[min, max]` into `num_bins` equal-width bins. A constant sample is
/// widened to `[v - 0.5, v + 0.5]`; an empty sample has no bins.
pub fn equal_width_bins(values: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || num_bins == 0 {
        return Vec::new();
    }
    let (mut min, mut max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if min.partial_cmp(&max) == Some(Ordering::Equal) {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / num_bins as f64;

    let mut counts = vec![0u64; num_bins];
    for v in values {
        let idx = ((v - min) / width).floor();
        let idx = if idx < 0.0 { 0 } else { (idx as usize).min(num_bins - 1) };
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let start = min + width * i as f64;
            let end = if i + 1 == num_bins { max } else { min + width * (i + 1) as f64 };
            HistogramBin { range: start..end, count }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
