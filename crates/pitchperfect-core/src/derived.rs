// Derived metrics computed from a single player row.
//
// Every function here is total: missing inputs give `None` rather than zero,
// and a division is only performed when its denominator clears the relevant
// floor.

use crate::schema::MetricId;
use crate::table::PlayerRow;
use serde::Serialize;
use std::fmt;

/// Minutes a player must have played before per-90 rates are reported.
pub const PER90_MIN_MINUTES: f64 = 270.0;

/// Half-width of the `on_track` band for goals minus xG.
pub const XG_TOLERANCE: f64 = 0.5;

/// Dribble attempts required before a success rate is reported.
pub const DRIBBLE_MIN_ATTEMPTS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DerivedError {
    #[error("metric '{metric}' is unknown for this player")]
    Missing { metric: MetricId },

    #[error("inconsistent row for '{player}': shots >= on target >= goals does not hold")]
    InconsistentRow { player: String },
}

// ---------------------------------------------------------------------------
// Per-90
// ---------------------------------------------------------------------------

/// `90 * value / minutes` when `minutes >= PER90_MIN_MINUTES`.
pub fn per90(value: Option<f64>, minutes: Option<f64>) -> Option<f64> {
    per90_with_floor(value, minutes, PER90_MIN_MINUTES)
}

/// Per-90 rate with an explicit minutes floor. A floor of 0 still refuses
/// zero minutes.
pub fn per90_with_floor(value: Option<f64>, minutes: Option<f64>, floor: f64) -> Option<f64> {
    let (value, minutes) = (value?, minutes?);
    if minutes <= 0.0 || minutes < floor {
        return None;
    }
    Some(90.0 * value / minutes)
}

/// Per-90 rate of one of the row's own counts.
pub fn row_per90(row: &PlayerRow, metric: MetricId, floor: f64) -> Option<f64> {
    per90_with_floor(row.get(metric), row.minutes(), floor)
}

/// One line of the per-90 table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Per90Entry {
    pub metric: MetricId,
    pub total: Option<f64>,
    pub per90: Option<f64>,
}

/// Counts shown in the per-90 table, in display order.
pub const PER90_TABLE_METRICS: &[MetricId] = &[
    MetricId::Goals,
    MetricId::Assists,
    MetricId::Xg,
    MetricId::Xag,
    MetricId::Shots,
    MetricId::ShotCreatingActions,
    MetricId::KeyPasses,
    MetricId::ProgressivePasses,
    MetricId::ProgressiveCarries,
    MetricId::TacklesWon,
    MetricId::Interceptions,
];

pub fn per90_table(row: &PlayerRow, metrics: &[MetricId], floor: f64) -> Vec<Per90Entry> {
    metrics
        .iter()
        .map(|m| Per90Entry {
            metric: *m,
            total: row.get(*m),
            per90: row_per90(row, *m, floor),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// xG overperformance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XgLabel {
    Over,
    Under,
    OnTrack,
}

impl fmt::Display for XgLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            XgLabel::Over => "over",
            XgLabel::Under => "under",
            XgLabel::OnTrack => "on_track",
        };
        f.write_str(s)
    }
}

/// Goals minus xG, rounded to one decimal, with its label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XgDelta {
    pub delta: f64,
    pub label: XgLabel,
}

/// The label is decided on the unrounded difference so that rounding can
/// never move a player across the band edge.
pub fn xg_delta(goals: Option<f64>, xg: Option<f64>, tolerance: f64) -> Option<XgDelta> {
    let raw = goals? - xg?;
    let label = if raw > tolerance {
        XgLabel::Over
    } else if raw < -tolerance {
        XgLabel::Under
    } else {
        XgLabel::OnTrack
    };
    Some(XgDelta {
        delta: round_to(raw, 1),
        label,
    })
}

pub fn row_xg_delta(row: &PlayerRow, tolerance: f64) -> Option<XgDelta> {
    xg_delta(row.get(MetricId::Goals), row.get(MetricId::Xg), tolerance)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Shot funnel
// ---------------------------------------------------------------------------

/// `(shots, shots_on_target, goals)`, guaranteed monotone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotFunnel {
    pub shots: f64,
    pub on_target: f64,
    pub goals: f64,
}

impl ShotFunnel {
    pub fn stages(&self) -> [(MetricId, f64); 3] {
        [
            (MetricId::Shots, self.shots),
            (MetricId::ShotsOnTarget, self.on_target),
            (MetricId::Goals, self.goals),
        ]
    }
}

pub fn shot_funnel(row: &PlayerRow) -> Result<ShotFunnel, DerivedError> {
    let get = |metric| row.get(metric).ok_or(DerivedError::Missing { metric });
    let shots = get(MetricId::Shots)?;
    let on_target = get(MetricId::ShotsOnTarget)?;
    let goals = get(MetricId::Goals)?;
    if shots < on_target || on_target < goals {
        return Err(DerivedError::InconsistentRow {
            player: row.name.clone(),
        });
    }
    Ok(ShotFunnel {
        shots,
        on_target,
        goals,
    })
}

// ---------------------------------------------------------------------------
// Touch distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchZone {
    DefBox,
    DefThird,
    MidThird,
    AttThird,
    AttBox,
}

impl TouchZone {
    pub const ALL: [TouchZone; 5] = [
        TouchZone::DefBox,
        TouchZone::DefThird,
        TouchZone::MidThird,
        TouchZone::AttThird,
        TouchZone::AttBox,
    ];

    pub fn metric(self) -> MetricId {
        match self {
            TouchZone::DefBox => MetricId::TouchesDefBox,
            TouchZone::DefThird => MetricId::TouchesDefThird,
            TouchZone::MidThird => MetricId::TouchesMidThird,
            TouchZone::AttThird => MetricId::TouchesAttThird,
            TouchZone::AttBox => MetricId::TouchesAttBox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneShare {
    pub zone: TouchZone,
    pub count: Option<f64>,
    pub fraction: Option<f64>,
}

/// Touches per zone as fractions of the five-zone total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TouchDistribution {
    pub zones: Vec<ZoneShare>,
    pub total: Option<f64>,
}

impl TouchDistribution {
    /// Whether the fractions are known (and therefore sum to 1).
    pub fn is_known(&self) -> bool {
        self.zones.iter().all(|z| z.fraction.is_some())
    }
}

/// Fractions are only reported when all five zones are known and their sum
/// is positive.
pub fn touch_distribution(row: &PlayerRow) -> TouchDistribution {
    let counts: Vec<(TouchZone, Option<f64>)> = TouchZone::ALL
        .iter()
        .map(|z| (*z, row.get(z.metric())))
        .collect();
    let total: Option<f64> = counts.iter().map(|(_, c)| *c).sum();
    let divisor = total.filter(|t| *t > 0.0);
    let zones = counts
        .into_iter()
        .map(|(zone, count)| ZoneShare {
            zone,
            count,
            fraction: divisor.and_then(|t| count.map(|c| c / t)),
        })
        .collect();
    TouchDistribution { zones, total }
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// `100 * numerator / denominator` when `denominator >= floor` and positive.
fn pct(numerator: Option<f64>, denominator: Option<f64>, floor: f64) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d <= 0.0 || d < floor {
        return None;
    }
    Some(100.0 * n / d)
}

/// Successful dribbles as a percentage of attempts, from `min_attempts` on.
pub fn dribble_success_rate(row: &PlayerRow, min_attempts: f64) -> Option<f64> {
    pct(
        row.get(MetricId::DribblesSucceeded),
        row.get(MetricId::DribblesAttempted),
        min_attempts,
    )
}

/// Goals per shot, as a percentage.
pub fn shot_conversion(row: &PlayerRow) -> Option<f64> {
    pct(row.get(MetricId::Goals), row.get(MetricId::Shots), 0.0)
}

/// Shots on target per shot, as a percentage. Falls back to the source
/// column when the counts are missing.
pub fn shot_accuracy(row: &PlayerRow) -> Option<f64> {
    pct(row.get(MetricId::ShotsOnTarget), row.get(MetricId::Shots), 0.0)
        .or_else(|| row.get(MetricId::ShotOnTargetPct))
}

/// Assists per key pass, as a percentage.
pub fn assist_efficiency(row: &PlayerRow) -> Option<f64> {
    pct(row.get(MetricId::Assists), row.get(MetricId::KeyPasses), 0.0)
}

// ---------------------------------------------------------------------------
// Ball progression
// ---------------------------------------------------------------------------

/// How a player moves the ball forward: by passing or by carrying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressionProfile {
    pub progressive_passes: Option<f64>,
    pub progressive_carries: Option<f64>,
    pub passes_per90: Option<f64>,
    pub carries_per90: Option<f64>,
    /// Progressive passes as a share of all progressive actions, in `[0, 1]`.
    pub pass_share: Option<f64>,
}

pub fn progression_profile(row: &PlayerRow, per90_floor: f64) -> ProgressionProfile {
    let passes = row.get(MetricId::ProgressivePasses);
    let carries = row.get(MetricId::ProgressiveCarries);
    let pass_share = match (passes, carries) {
        (Some(p), Some(c)) if p + c > 0.0 => Some(p / (p + c)),
        _ => None,
    };
    ProgressionProfile {
        progressive_passes: passes,
        progressive_carries: carries,
        passes_per90: row_per90(row, MetricId::ProgressivePasses, per90_floor),
        carries_per90: row_per90(row, MetricId::ProgressiveCarries, per90_floor),
        pass_share,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
