// In-memory season table and the per-player row view.
//
// A `Dataset` is created once at load time and never mutated afterwards.
// Every read of a metric goes through `PlayerRow::get`, which answers `None`
// for absent columns and unparseable cells alike.

use crate::schema::MetricId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Player row
// ---------------------------------------------------------------------------

/// One record per (player, competition).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub name: String,
    pub team: String,
    pub competition: String,
    pub position: String,
    pub nationality: String,
    pub age: Option<f64>,
    pub birth_year: Option<f64>,
    metrics: BTreeMap<MetricId, f64>,
}

impl PlayerRow {
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        competition: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        PlayerRow {
            name: name.into(),
            team: team.into(),
            competition: competition.into(),
            position: position.into(),
            nationality: String::new(),
            age: None,
            birth_year: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style setter used by the loader, the demo table and tests.
    pub fn with(mut self, metric: MetricId, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn with_age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }

    /// Store a value. `None` and non-finite numbers leave the metric unknown.
    pub fn set(&mut self, metric: MetricId, value: Option<f64>) {
        match value {
            Some(v) if v.is_finite() => {
                self.metrics.insert(metric, v);
            }
            _ => {
                self.metrics.remove(&metric);
            }
        }
    }

    /// Safe getter: the typed value, or `None` when unknown.
    pub fn get(&self, metric: MetricId) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }

    pub fn minutes(&self) -> Option<f64> {
        self.get(MetricId::Minutes)
    }

    /// Known metrics in canonical order.
    pub fn known_metrics(&self) -> impl Iterator<Item = (MetricId, f64)> + '_ {
        self.metrics.iter().map(|(k, v)| (*k, *v))
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Where a dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum DatasetSource {
    File(PathBuf),
    Demo,
    Inline,
}

/// The loaded season table.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<PlayerRow>,
    columns: BTreeSet<MetricId>,
    source: DatasetSource,
}

impl Dataset {
    /// Build a dataset from rows and the set of metric columns present in the
    /// source header.
    pub fn new(rows: Vec<PlayerRow>, columns: BTreeSet<MetricId>, source: DatasetSource) -> Self {
        Dataset { rows, columns, source }
    }

    /// Build a dataset whose column set is inferred from the rows themselves.
    pub fn from_rows(rows: Vec<PlayerRow>) -> Self {
        let columns = rows
            .iter()
            .flat_map(|r| r.known_metrics().map(|(m, _)| m))
            .collect();
        Dataset {
            rows,
            columns,
            source: DatasetSource::Inline,
        }
    }

    pub fn rows(&self) -> &[PlayerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Whether the source table carried a column for this metric.
    pub fn has_column(&self, metric: MetricId) -> bool {
        self.columns.contains(&metric)
    }

    pub fn columns(&self) -> impl Iterator<Item = MetricId> + '_ {
        self.columns.iter().copied()
    }

    /// First row for a player name. Rows are per (player, competition); when a
    /// player appears in several competitions and `competition` is given, the
    /// row from that competition wins.
    pub fn find_player(&self, name: &str, competition: Option<&str>) -> Option<&PlayerRow> {
        if let Some(comp) = competition {
            if let Some(row) = self
                .rows
                .iter()
                .find(|r| r.name == name && r.competition == comp)
            {
                return Some(row);
            }
        }
        self.rows.iter().find(|r| r.name == name)
    }
}

/// Format an optional value for display: `N/A` when unknown.
pub fn display_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "N/A".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_get_returns_none_for_unknown() {
        let row = PlayerRow::new("Kane", "Bayern", "Bundesliga", "FW").with(MetricId::Goals, 28.0);
        assert_eq!(row.get(MetricId::Goals), Some(28.0));
        assert_eq!(row.get(MetricId::Xg), None);
    }

    #[test]
    fn non_finite_values_stay_unknown() {
        let mut row = PlayerRow::new("Kane", "Bayern", "Bundesliga", "FW");
        row.set(MetricId::Goals, Some(f64::NAN));
        assert_eq!(row.get(MetricId::Goals), None);
        row.set(MetricId::Goals, Some(3.0));
        row.set(MetricId::Goals, None);
        assert_eq!(row.get(MetricId::Goals), None);
    }

    #[test]
    fn from_rows_infers_columns() {
        let ds = Dataset::from_rows(vec![
            PlayerRow::new("A", "T", "C", "FW").with(MetricId::Goals, 1.0),
            PlayerRow::new("B", "T", "C", "FW").with(MetricId::Xg, 1.0),
        ]);
        assert!(ds.has_column(MetricId::Goals));
        assert!(ds.has_column(MetricId::Xg));
        assert!(!ds.has_column(MetricId::Assists));
    }

    #[test]
    fn find_player_prefers_competition() {
        let ds = Dataset::from_rows(vec![
            PlayerRow::new("Dup", "A", "Serie A", "MF"),
            PlayerRow::new("Dup", "B", "Ligue 1", "MF"),
        ]);
        assert_eq!(ds.find_player("Dup", None).map(|r| r.team.as_str()), Some("A"));
        assert_eq!(
            ds.find_player("Dup", Some("Ligue 1")).map(|r| r.team.as_str()),
            Some("B")
        );
        assert!(ds.find_player("Missing", None).is_none());
    }

    #[test]
    fn display_value_uses_na() {
        assert_eq!(display_value(None, 1), "N/A");
        assert_eq!(display_value(Some(0.456), 2), "0.46");
    }
}
