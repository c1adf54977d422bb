// Player profile assembly.
//
// A `Profile` is the single bundle a view layer renders for the selected
// player. Assembly is a pure function of (table, filter state, reference
// name, options): it never fails on data problems. A recoverable problem
// leaves the affected field unknown and records an `Advisory`; only an
// unknown player name is an error.

use crate::charts::{self, ChartError, FunnelChart, GroupedBarChart, Histogram, RadarChart, ScatterChart};
use crate::cohort::{Cohort, CohortScope, MIN_COHORT_SIZE};
use crate::derived::{self, DerivedError, Per90Entry, ProgressionProfile, ShotFunnel, TouchDistribution, XgDelta};
use crate::filter::{Axis, FilterError, FilterState, View, ALL};
use crate::insights::{self, GroupComparison, MetricGroup};
use crate::loader::LoadError;
use crate::percentile::{self, PercentileResult};
use crate::schema::MetricId;
use crate::table::{Dataset, PlayerRow};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Errors and advisories
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown player '{name}'")]
    UnknownPlayer { name: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A non-fatal problem met while assembling a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Advisory {
    /// The source table has no column for a metric the profile shows.
    SchemaMismatch { metric: MetricId },
    /// No row survived the filters at the requested minutes floor.
    /// `recovered` is false when even floor 0 left nothing and the full
    /// table was used instead.
    EmptyCohort { minutes_floor: u32, recovered: bool },
    /// A selection was no longer admissible and was reset.
    StaleSelection { axis: Axis },
    /// The row breaks `shots >= shots_on_target >= goals`.
    InconsistentRow { player: String },
    /// Too few cohort members for percentiles.
    SmallCohort { size: usize, min: usize },
    /// A requested comparison player is not in the table.
    UnknownComparisonPlayer { name: String },
    /// More comparison players than the bar chart holds; no chart is built.
    TooManyComparisons { requested: usize, max: usize },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SchemaMismatch { metric } => {
                write!(f, "column '{}' is missing from the table", metric.column())
            }
            Advisory::EmptyCohort { minutes_floor, recovered: true } => {
                write!(f, "no player reaches {minutes_floor} minutes, floor relaxed to 0")
            }
            Advisory::EmptyCohort { recovered: false, .. } => {
                write!(f, "no player matches the filters, showing the full table")
            }
            Advisory::StaleSelection { axis } => write!(f, "{axis} selection was reset"),
            Advisory::InconsistentRow { player } => {
                write!(f, "shot figures for {player} are inconsistent")
            }
            Advisory::SmallCohort { size, min } => {
                write!(f, "cohort of {size} is below {min}, percentiles unavailable")
            }
            Advisory::UnknownComparisonPlayer { name } => {
                write!(f, "comparison player '{name}' is not in the table")
            }
            Advisory::TooManyComparisons { requested, max } => {
                write!(f, "{requested} players requested for comparison, at most {max} fit")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Radar spokes, in display order.
pub const DEFAULT_RADAR_METRICS: &[MetricId] = &[
    MetricId::Goals,
    MetricId::Xg,
    MetricId::Assists,
    MetricId::Xag,
    MetricId::ShotCreatingActions,
    MetricId::ProgressivePasses,
    MetricId::ProgressiveCarries,
];

/// Headline numbers shown on the player card.
pub const KEY_METRICS: &[MetricId] = &[
    MetricId::MatchesPlayed,
    MetricId::Minutes,
    MetricId::Goals,
    MetricId::Assists,
    MetricId::Xg,
    MetricId::Xag,
];

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOptions {
    pub cohort_scope: CohortScope,
    pub min_cohort_size: usize,
    pub per90_min_minutes: f64,
    pub xg_tolerance: f64,
    pub dribble_min_attempts: f64,
    pub histogram_bins: usize,
    pub histogram_metric: MetricId,
    pub radar_metrics: Vec<MetricId>,
    pub scatter_label_top: usize,
    /// Other players drawn next to the reference in the comparison bars.
    pub compare_with: Vec<String>,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        ProfileOptions {
            cohort_scope: CohortScope::Position,
            min_cohort_size: MIN_COHORT_SIZE,
            per90_min_minutes: derived::PER90_MIN_MINUTES,
            xg_tolerance: derived::XG_TOLERANCE,
            dribble_min_attempts: derived::DRIBBLE_MIN_ATTEMPTS,
            histogram_bins: charts::HISTOGRAM_BINS,
            histogram_metric: MetricId::Goals,
            radar_metrics: DEFAULT_RADAR_METRICS.to_vec(),
            scatter_label_top: 5,
            compare_with: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub name: String,
    pub team: String,
    pub competition: String,
    pub position: String,
    pub nationality: String,
    pub age: Option<f64>,
    pub market_value: Option<f64>,
    pub market_value_display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyMetric {
    pub metric: MetricId,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Efficiency {
    pub shot_conversion: Option<f64>,
    pub shot_accuracy: Option<f64>,
    pub assist_efficiency: Option<f64>,
    pub dribble_success: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub identity: Identity,
    /// Filter state after stale axes were reset.
    pub selection: FilterState,
    pub cohort_scope: CohortScope,
    pub cohort_size: usize,
    pub key_metrics: Vec<KeyMetric>,
    pub per90: Vec<Per90Entry>,
    pub percentiles: Vec<PercentileResult>,
    pub xg_delta: Option<XgDelta>,
    pub shot_funnel: Option<ShotFunnel>,
    pub funnel: Option<FunnelChart>,
    pub efficiency: Efficiency,
    pub touches: TouchDistribution,
    pub progression: ProgressionProfile,
    pub radar: RadarChart,
    pub progression_scatter: ScatterChart,
    pub finishing_scatter: ScatterChart,
    pub histogram: Histogram,
    pub comparison: Option<GroupedBarChart>,
    pub groups: Vec<GroupComparison>,
    pub notes: Vec<Advisory>,
}

impl Profile {
    pub fn percentile(&self, metric: MetricId) -> Option<&PercentileResult> {
        self.percentiles.iter().find(|p| p.metric == metric)
    }

    pub fn has_note(&self, pred: impl Fn(&Advisory) -> bool) -> bool {
        self.notes.iter().any(pred)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Assemble with default options.
pub fn assemble(dataset: &Dataset, state: &FilterState, reference: &str) -> Result<Profile, ProfileError> {
    assemble_with(dataset, state, reference, &ProfileOptions::default())
}

pub fn assemble_with(
    dataset: &Dataset,
    state: &FilterState,
    reference: &str,
    options: &ProfileOptions,
) -> Result<Profile, ProfileError> {
    let mut notes = Vec::new();

    // Resolve the selection. The requested player is the reference itself, so
    // a reference outside the filtered view shows up as a stale player.
    let requested = state.clone().player(reference);
    let (view, selection) = match requested.apply(dataset) {
        Ok(sel) => {
            if sel.relaxed_minutes_floor {
                notes.push(Advisory::EmptyCohort {
                    minutes_floor: state.minutes_floor,
                    recovered: true,
                });
            }
            notes.extend(sel.stale.iter().map(|axis| Advisory::StaleSelection { axis: *axis }));
            (sel.view, sel.resolved)
        }
        Err(FilterError::EmptyCohort { minutes_floor }) => {
            warn!("empty selection for {:?}, using the full table", state);
            notes.push(Advisory::EmptyCohort {
                minutes_floor,
                recovered: false,
            });
            (View::new(dataset), requested.clone())
        }
    };

    let competition = (selection.competition != ALL).then_some(selection.competition.as_str());
    let row = dataset
        .find_player(reference, competition)
        .ok_or_else(|| ProfileError::UnknownPlayer {
            name: reference.to_string(),
        })?;
    debug!("assembling profile for {} ({})", row.name, row.competition);

    // Columns the profile relies on but the table does not carry.
    let wanted: BTreeSet<MetricId> = options
        .radar_metrics
        .iter()
        .chain(KEY_METRICS)
        .copied()
        .collect();
    notes.extend(
        wanted
            .into_iter()
            .filter(|m| !dataset.has_column(*m))
            .map(|metric| Advisory::SchemaMismatch { metric }),
    );

    let cohort = Cohort::select(dataset, row, options.cohort_scope);
    if cohort.len() < options.min_cohort_size {
        notes.push(Advisory::SmallCohort {
            size: cohort.len(),
            min: options.min_cohort_size,
        });
    }

    let eligible: Vec<MetricId> = MetricId::all()
        .filter(|m| m.percentile_eligible() && dataset.has_column(*m))
        .collect();
    let percentiles = percentile::score_all(&cohort, &eligible, options.min_cohort_size);

    let shot_funnel = match derived::shot_funnel(row) {
        Ok(f) => Some(f),
        Err(DerivedError::InconsistentRow { player }) => {
            warn!("inconsistent shot figures for {}", player);
            notes.push(Advisory::InconsistentRow { player });
            None
        }
        Err(DerivedError::Missing { metric }) => {
            debug!("no shot funnel for {}: {} unknown", row.name, metric);
            None
        }
    };

    let comparison = comparison_chart(dataset, row, &options.compare_with, &options.radar_metrics, &mut notes);

    Ok(Profile {
        identity: identity(row),
        selection,
        cohort_scope: options.cohort_scope,
        cohort_size: cohort.len(),
        key_metrics: KEY_METRICS
            .iter()
            .map(|m| KeyMetric {
                metric: *m,
                value: row.get(*m),
            })
            .collect(),
        per90: derived::per90_table(row, derived::PER90_TABLE_METRICS, options.per90_min_minutes),
        percentiles,
        xg_delta: derived::row_xg_delta(row, options.xg_tolerance),
        funnel: shot_funnel.as_ref().map(charts::funnel),
        shot_funnel,
        efficiency: Efficiency {
            shot_conversion: derived::shot_conversion(row),
            shot_accuracy: derived::shot_accuracy(row),
            assist_efficiency: derived::assist_efficiency(row),
            dribble_success: derived::dribble_success_rate(row, options.dribble_min_attempts),
        },
        touches: derived::touch_distribution(row),
        progression: derived::progression_profile(row, options.per90_min_minutes),
        radar: charts::radar(dataset, &cohort, &options.radar_metrics, options.min_cohort_size),
        progression_scatter: charts::scatter(
            cohort.members(),
            row,
            MetricId::ProgressivePasses,
            MetricId::ProgressiveCarries,
            options.scatter_label_top,
        ),
        finishing_scatter: charts::scatter(
            cohort.members(),
            row,
            MetricId::Xg,
            MetricId::Goals,
            options.scatter_label_top,
        ),
        histogram: Histogram::of_rows(
            view.rows(),
            options.histogram_metric,
            options.histogram_bins,
            row.get(options.histogram_metric),
        ),
        comparison,
        groups: MetricGroup::ALL
            .iter()
            .map(|g| insights::compare_group(&cohort, *g, options.per90_min_minutes, options.min_cohort_size))
            .collect(),
        notes,
    })
}

fn identity(row: &PlayerRow) -> Identity {
    let market_value = row.get(MetricId::MarketValue);
    Identity {
        name: row.name.clone(),
        team: row.team.clone(),
        competition: row.competition.clone(),
        position: row.position.clone(),
        nationality: row.nationality.clone(),
        age: row.age,
        market_value,
        market_value_display: insights::format_market_value(market_value),
    }
}

fn comparison_chart(
    dataset: &Dataset,
    reference: &PlayerRow,
    others: &[String],
    metrics: &[MetricId],
    notes: &mut Vec<Advisory>,
) -> Option<GroupedBarChart> {
    if others.is_empty() {
        return None;
    }
    let mut players = vec![reference];
    for name in others {
        match dataset.find_player(name, None) {
            Some(p) => players.push(p),
            None => {
                warn!("comparison player '{}' not found", name);
                notes.push(Advisory::UnknownComparisonPlayer { name: name.clone() });
            }
        }
    }
    match charts::grouped_bar(&players, metrics) {
        Ok(chart) => Some(chart),
        Err(ChartError::TooManySeries { requested, max }) => {
            warn!("comparison chart skipped: {} series requested, max {}", requested, max);
            notes.push(Advisory::TooManyComparisons { requested, max });
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
