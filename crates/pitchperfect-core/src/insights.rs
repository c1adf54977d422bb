// Dashboard insights: grouped player-vs-cohort comparisons, top-N tables,
// two-metric summaries and market value formatting.

use crate::cohort::{mean, Cohort};
use crate::derived::row_per90;
use crate::filter::View;
use crate::percentile;
use crate::schema::MetricId;
use crate::table::PlayerRow;
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Metric groups
// ---------------------------------------------------------------------------

/// A quantity shown in a group: a source value as-is, or a season count
/// rescaled per 90 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "metric")]
pub enum Stat {
    Raw(MetricId),
    Per90(MetricId),
}

impl Stat {
    pub fn metric(self) -> MetricId {
        match self {
            Stat::Raw(m) | Stat::Per90(m) => m,
        }
    }

    pub fn label(self) -> String {
        match self {
            Stat::Raw(m) => m.label().to_string(),
            Stat::Per90(m) => format!("{}/90", m.label()),
        }
    }

    pub fn value(self, row: &PlayerRow, per90_floor: f64) -> Option<f64> {
        match self {
            Stat::Raw(m) => row.get(m),
            Stat::Per90(m) => row_per90(row, m, per90_floor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Offensive,
    Defensive,
    Technical,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 3] = [MetricGroup::Offensive, MetricGroup::Defensive, MetricGroup::Technical];

    pub fn stats(self) -> &'static [Stat] {
        use MetricId::*;
        match self {
            MetricGroup::Offensive => &[
                Stat::Raw(GoalsPer90),
                Stat::Raw(AssistsPer90),
                Stat::Raw(XgPer90),
                Stat::Raw(XagPer90),
                Stat::Raw(ShotsPer90),
                Stat::Per90(KeyPasses),
                Stat::Per90(DribblesSucceeded),
                Stat::Raw(ShotCreatingActionsPer90),
            ],
            MetricGroup::Defensive => &[
                Stat::Per90(TacklesWon),
                Stat::Per90(Interceptions),
                Stat::Per90(Recoveries),
                Stat::Per90(AerialsWon),
                Stat::Per90(Clearances),
                Stat::Raw(DuelWinPct),
                Stat::Raw(AerialWinPct),
                Stat::Per90(BlockedShots),
            ],
            MetricGroup::Technical => &[
                Stat::Per90(PassesAttempted),
                Stat::Per90(ProgressivePasses),
                Stat::Per90(DribblesAttempted),
                Stat::Per90(Touches),
                Stat::Per90(KeyPasses),
                Stat::Raw(PassCompletionPct),
                Stat::Raw(DribbleSuccessPct),
            ],
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricGroup::Offensive => "offensive",
            MetricGroup::Defensive => "defensive",
            MetricGroup::Technical => "technical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub stat: Stat,
    pub label: String,
    pub player: Option<f64>,
    pub cohort_mean: Option<f64>,
    /// `player - cohort_mean`.
    pub delta: Option<f64>,
    pub percentile: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub group: MetricGroup,
    pub entries: Vec<GroupEntry>,
}

impl GroupComparison {
    /// Entries where the player is known to sit above the cohort mean.
    pub fn strengths(&self) -> impl Iterator<Item = &GroupEntry> {
        self.entries.iter().filter(|e| e.delta.is_some_and(|d| d > 0.0))
    }
}

/// Compare the cohort's reference against the cohort mean for every stat in
/// a group.
pub fn compare_group(
    cohort: &Cohort<'_>,
    group: MetricGroup,
    per90_floor: f64,
    min_size: usize,
) -> GroupComparison {
    let reference = cohort.reference();
    let entries = group
        .stats()
        .iter()
        .map(|stat| {
            let population = cohort.values_by(|r| stat.value(r, per90_floor));
            let player = stat.value(reference, per90_floor);
            let cohort_mean = mean(&population);
            let scored = percentile::score_value(stat.metric(), player, &population, min_size);
            GroupEntry {
                stat: *stat,
                label: stat.label(),
                player,
                cohort_mean,
                delta: player.zip(cohort_mean).map(|(p, m)| p - m),
                percentile: scored.percentile,
            }
        })
        .collect();
    GroupComparison { group, entries }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub team: String,
    pub competition: String,
    pub value: f64,
}

/// Top `n` rows of the view by `metric`, highest first. Unknown values are
/// left out; ties are broken by name.
pub fn leaderboard(view: &View<'_>, metric: MetricId, n: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<(&PlayerRow, f64)> = view
        .rows()
        .iter()
        .filter_map(|r| r.get(metric).map(|v| (*r, v)))
        .collect();
    ranked.sort_by(|(ra, a), (rb, b)| b.total_cmp(a).then_with(|| ra.name.cmp(&rb.name)));
    ranked
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (row, value))| LeaderboardEntry {
            rank: i + 1,
            name: row.name.clone(),
            team: row.team.clone(),
            competition: row.competition.clone(),
            value,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: MetricId,
    pub n: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn of(r: f64) -> Self {
        let r = r.abs();
        if r > 0.7 {
            CorrelationStrength::Strong
        } else if r > 0.3 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairSummary {
    pub x: MetricSummary,
    pub y: MetricSummary,
    /// Pearson correlation over rows where both values are known.
    pub correlation: Option<f64>,
    pub strength: Option<CorrelationStrength>,
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Pearson's r. `None` with fewer than two pairs or a constant series.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

pub fn summarize_metric(view: &View<'_>, metric: MetricId) -> MetricSummary {
    let values: Vec<f64> = view.rows().iter().filter_map(|r| r.get(metric)).collect();
    MetricSummary {
        metric,
        n: values.len(),
        mean: mean(&values),
        median: median(&values),
    }
}

pub fn summarize(view: &View<'_>, x: MetricId, y: MetricId) -> PairSummary {
    let pairs: Vec<(f64, f64)> = view
        .rows()
        .iter()
        .filter_map(|r| r.get(x).zip(r.get(y)))
        .collect();
    let correlation = pearson(&pairs);
    PairSummary {
        x: summarize_metric(view, x),
        y: summarize_metric(view, y),
        correlation,
        strength: correlation.map(CorrelationStrength::of),
    }
}

// ---------------------------------------------------------------------------
// Market value
// ---------------------------------------------------------------------------

/// `1.2B€`, `17.0M€`, `500.0K€`, `950€`, or `N/A`.
pub fn format_market_value(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return "N/A".to_string();
    };
    if v >= 1_000_000_000.0 {
        format!("{:.1}B€", v / 1_000_000_000.0)
    } else if v >= 1_000_000.0 {
        format!("{:.1}M€", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("{:.1}K€", v / 1_000.0)
    } else {
        format!("{v:.0}€")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
