// Mid-rank empirical percentiles.
//
//     p(v, C) = 100 * (#{c in C : c < v} + 0.5 * #{c in C : c = v}) / n
//
// Ties get half weight, the reference player is part of C, and unknown values
// are excluded before counting. Below the minimum cohort size the percentile
// is unknown.

use crate::cohort::{Cohort, MIN_COHORT_SIZE};
use crate::schema::MetricId;
use serde::Serialize;

/// Percentile of one metric for one player within one cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileResult {
    pub metric: MetricId,
    /// The player's own value.
    pub raw: Option<f64>,
    /// In `[0, 100]`, or `None` when `raw` is unknown or `n` is too small.
    pub percentile: Option<f64>,
    /// Number of known values in the cohort.
    pub n: usize,
}

/// Mid-rank percentile of `value` within `population`.
///
/// Non-finite entries are ignored. Returns `None` when fewer than `min_size`
/// values remain.
pub fn mid_rank(value: f64, population: &[f64], min_size: usize) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let mut n = 0usize;
    let mut below = 0usize;
    let mut equal = 0usize;
    for &c in population.iter().filter(|c| c.is_finite()) {
        n += 1;
        if c < value {
            below += 1;
        } else if c == value {
            equal += 1;
        }
    }
    if n == 0 || n < min_size {
        return None;
    }
    Some(100.0 * (below as f64 + 0.5 * equal as f64) / n as f64)
}

/// Score a value that was computed outside the row (per-90 rates, success
/// rates) against the same quantity across the cohort.
pub fn score_value(
    metric: MetricId,
    raw: Option<f64>,
    population: &[f64],
    min_size: usize,
) -> PercentileResult {
    let n = population.iter().filter(|c| c.is_finite()).count();
    PercentileResult {
        metric,
        raw,
        percentile: raw.and_then(|v| mid_rank(v, population, min_size)),
        n,
    }
}

/// Score the reference player's own value of `metric`.
pub fn score(cohort: &Cohort<'_>, metric: MetricId, min_size: usize) -> PercentileResult {
    let raw = cohort.reference().get(metric);
    score_value(metric, raw, &cohort.values(metric), min_size)
}

/// Score several metrics, preserving the requested order.
pub fn score_all(cohort: &Cohort<'_>, metrics: &[MetricId], min_size: usize) -> Vec<PercentileResult> {
    metrics.iter().map(|m| score(cohort, *m, min_size)).collect()
}

/// Percentile scoring with the default minimum cohort size.
pub fn score_default(cohort: &Cohort<'_>, metric: MetricId) -> PercentileResult {
    score(cohort, metric, MIN_COHORT_SIZE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortScope;
    use crate::loader::demo_dataset;
    use crate::table::{Dataset, PlayerRow};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn known_values() {
        let pop = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx_eq(mid_rank(5.0, &pop, 5).unwrap(), 90.0, 1e-12));
        assert!(approx_eq(mid_rank(1.0, &pop, 5).unwrap(), 10.0, 1e-12));
        assert!(approx_eq(mid_rank(3.0, &pop, 5).unwrap(), 50.0, 1e-12));
    }

    #[test]
    fn ties_get_half_weight() {
        let pop = [2.0, 2.0, 2.0, 2.0, 2.0];
        assert!(approx_eq(mid_rank(2.0, &pop, 5).unwrap(), 50.0, 1e-12));
        let pop = [1.0, 2.0, 2.0, 3.0, 4.0];
        // one below, two equal: (1 + 1) / 5
        assert!(approx_eq(mid_rank(2.0, &pop, 5).unwrap(), 40.0, 1e-12));
    }

    #[test]
    fn too_small_population_is_unknown() {
        assert_eq!(mid_rank(1.0, &[1.0, 2.0, 3.0, 4.0], 5), None);
        assert_eq!(mid_rank(1.0, &[], 0), None);
        // Non-finite entries do not count towards n.
        assert_eq!(mid_rank(1.0, &[1.0, 2.0, 3.0, 4.0, f64::NAN], 5), None);
    }

    #[test]
    fn bounded_between_zero_and_hundred() {
        let pop: Vec<f64> = (0..50).map(|i| (i * 7 % 13) as f64).collect();
        for &v in &pop {
            let p = mid_rank(v, &pop, 5).unwrap();
            assert!((0.0..=100.0).contains(&p), "{p}");
        }
        // Values outside the population still land in range.
        assert!(approx_eq(mid_rank(-1.0, &pop, 5).unwrap(), 0.0, 1e-12));
        assert!(approx_eq(mid_rank(99.0, &pop, 5).unwrap(), 100.0, 1e-12));
    }

    #[test]
    fn reference_lies_within_its_rank_band() {
        let pop = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        let n = pop.len() as f64;
        for &v in &pop {
            // k: one-based rank of v among the sorted values (first occurrence)
            let below = pop.iter().filter(|c| **c < v).count() as f64;
            let equal = pop.iter().filter(|c| **c == v).count() as f64;
            let p = mid_rank(v, &pop, 5).unwrap();
            let k_low = below + 1.0;
            let k_high = below + equal;
            assert!(p >= (k_low - 0.5) / n * 100.0 - 1e-9);
            assert!(p <= (k_high + 0.5) / n * 100.0 + 1e-9);
        }
    }

    #[test]
    fn strictly_monotone_on_present_values() {
        let pop = [1.0, 1.0, 2.0, 3.0, 3.0, 3.0, 7.0];
        let mut distinct = pop.to_vec();
        distinct.dedup();
        for w in distinct.windows(2) {
            let lo = mid_rank(w[0], &pop, 5).unwrap();
            let hi = mid_rank(w[1], &pop, 5).unwrap();
            assert!(lo < hi, "{} -> {lo}, {} -> {hi}", w[0], w[1]);
        }
    }

    #[test]
    fn percentages_are_scored_like_counts() {
        let ds = Dataset::from_rows(
            [55.0, 60.0, 70.0, 80.0, 90.0]
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    PlayerRow::new(format!("P{i}"), "T", "C", "MF")
                        .with(MetricId::PassCompletionPct, *v)
                })
                .collect(),
        );
        let cohort = Cohort::select(&ds, &ds.rows()[2], CohortScope::Position);
        let r = score(&cohort, MetricId::PassCompletionPct, 5);
        assert_eq!(r.raw, Some(70.0));
        assert!(approx_eq(r.percentile.unwrap(), 50.0, 1e-12));
        assert_eq!(r.n, 5);
    }

    #[test]
    fn haaland_goals_are_the_cohort_maximum() {
        let ds = demo_dataset();
        let haaland = ds.find_player("Haaland", None).unwrap();
        let cohort = Cohort::select(&ds, haaland, CohortScope::Position);
        let r = score_default(&cohort, MetricId::Goals);
        assert_eq!(r.n, 8);
        // 7 forwards below, Haaland himself counts half.
        assert!(approx_eq(r.percentile.unwrap(), 93.75, 1e-12));
        let others: Vec<f64> = cohort
            .members()
            .iter()
            .filter(|m| m.name != "Haaland")
            .map(|m| score_value(MetricId::Goals, m.get(MetricId::Goals), &cohort.values(MetricId::Goals), 5))
            .filter_map(|r| r.percentile)
            .collect();
        assert!(others.iter().all(|p| *p < r.percentile.unwrap()));
    }

    #[test]
    fn unknown_raw_value_has_unknown_percentile() {
        let ds = demo_dataset();
        let haaland = ds.find_player("Haaland", None).unwrap();
        let cohort = Cohort::select(&ds, haaland, CohortScope::Position);
        let r = score_default(&cohort, MetricId::TacklesWon);
        assert_eq!(r.raw, None);
        assert_eq!(r.percentile, None);
        assert_eq!(r.n, 0);
    }
}
