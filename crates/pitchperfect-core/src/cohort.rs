// Cohort selection: the reference population a player is scored against.
//
// The default cohort is drawn from the full table, not the filtered view, so
// that a player's percentiles do not move when the sidebar changes.

use crate::schema::MetricId;
use crate::table::{Dataset, PlayerRow};
use serde::{Deserialize, Serialize};

/// Smallest cohort on which percentiles are reported.
pub const MIN_COHORT_SIZE: usize = 5;

/// Which rows of the full table form the cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortScope {
    /// Every row sharing the reference's position.
    #[default]
    Position,
    /// Same position and same competition.
    PositionAndCompetition,
}

/// A reference player together with its comparison population.
#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    reference: &'a PlayerRow,
    members: Vec<&'a PlayerRow>,
    scope: CohortScope,
}

impl<'a> Cohort<'a> {
    /// Build the cohort for `reference` from the full table.
    ///
    /// The reference is always a member, even when it is not one of the
    /// dataset's own rows.
    pub fn select(dataset: &'a Dataset, reference: &'a PlayerRow, scope: CohortScope) -> Self {
        let mut members: Vec<&PlayerRow> = dataset
            .rows()
            .iter()
            .filter(|r| r.position == reference.position)
            .filter(|r| match scope {
                CohortScope::Position => true,
                CohortScope::PositionAndCompetition => r.competition == reference.competition,
            })
            .collect();
        if !members.iter().any(|m| std::ptr::eq(*m, reference)) {
            members.push(reference);
        }
        Cohort {
            reference,
            members,
            scope,
        }
    }

    pub fn reference(&self) -> &'a PlayerRow {
        self.reference
    }

    pub fn members(&self) -> &[&'a PlayerRow] {
        &self.members
    }

    pub fn scope(&self) -> CohortScope {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Known values of a metric across the cohort, unknowns excluded.
    pub fn values(&self, metric: MetricId) -> Vec<f64> {
        self.members.iter().filter_map(|r| r.get(metric)).collect()
    }

    /// Values of an arbitrary per-row quantity, unknowns excluded.
    pub fn values_by<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&PlayerRow) -> Option<f64>,
    {
        self.members.iter().filter_map(|r| f(*r)).collect()
    }

    /// Mean of a metric across the cohort, or `None` when no member knows it.
    pub fn mean(&self, metric: MetricId) -> Option<f64> {
        mean(&self.values(metric))
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
