// Cascading filter pipeline: competition -> team -> position -> minutes floor.
//
// Each stage is a pure function from a view to a narrower view. After every
// stage the admissible options for the next axis are recomputed from the
// current view; a selection that is no longer admissible is reported as stale
// and resolved to the first admissible option.

use crate::table::{Dataset, PlayerRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// Sentinel meaning "no filter on this axis".
pub const ALL: &str = "Toutes";

// ---------------------------------------------------------------------------
// Errors and signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("no player matches the current filters (minutes floor {minutes_floor} already relaxed)")]
    EmptyCohort { minutes_floor: u32 },
}

/// One axis of the selection surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Competition,
    Team,
    Position,
    Player,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::Competition => "competition",
            Axis::Team => "team",
            Axis::Position => "position",
            Axis::Player => "player",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// An order-preserving subset of a dataset's rows.
#[derive(Debug, Clone)]
pub struct View<'a> {
    rows: Vec<&'a PlayerRow>,
}

impl<'a> View<'a> {
    /// The unfiltered view over a dataset.
    pub fn new(dataset: &'a Dataset) -> Self {
        View {
            rows: dataset.rows().iter().collect(),
        }
    }

    pub fn from_rows(rows: Vec<&'a PlayerRow>) -> Self {
        View { rows }
    }

    pub fn rows(&self) -> &[&'a PlayerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn retain(&self, pred: impl Fn(&PlayerRow) -> bool) -> View<'a> {
        View {
            rows: self.rows.iter().copied().filter(|r| pred(*r)).collect(),
        }
    }

    pub fn by_competition(&self, competition: &str) -> View<'a> {
        if competition == ALL {
            return self.clone();
        }
        self.retain(|r| r.competition == competition)
    }

    pub fn by_team(&self, team: &str) -> View<'a> {
        if team == ALL {
            return self.clone();
        }
        self.retain(|r| r.team == team)
    }

    pub fn by_position(&self, position: &str) -> View<'a> {
        if position == ALL {
            return self.clone();
        }
        self.retain(|r| r.position == position)
    }

    /// Keep rows with at least `floor` minutes. A floor of 0 keeps everything,
    /// including rows whose minutes are unknown; any other floor drops them.
    pub fn by_minutes_floor(&self, floor: u32) -> View<'a> {
        if floor == 0 {
            return self.clone();
        }
        let floor = f64::from(floor);
        self.retain(|r| r.minutes().is_some_and(|m| m >= floor))
    }

    pub fn competitions(&self) -> Vec<String> {
        sorted_unique(self.rows.iter().map(|r| r.competition.as_str()))
    }

    pub fn teams(&self) -> Vec<String> {
        sorted_unique(self.rows.iter().map(|r| r.team.as_str()))
    }

    pub fn positions(&self) -> Vec<String> {
        sorted_unique(self.rows.iter().map(|r| r.position.as_str()))
    }

    pub fn players(&self) -> Vec<String> {
        sorted_unique(self.rows.iter().map(|r| r.name.as_str()))
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }
}

fn sorted_unique<'s>(values: impl Iterator<Item = &'s str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Prepend the `"Toutes"` sentinel to a sorted option list.
pub fn with_all(options: Vec<String>) -> Vec<String> {
    std::iter::once(ALL.to_string()).chain(options).collect()
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// The user's current sidebar selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub competition: String,
    pub team: String,
    pub position: String,
    pub player: Option<String>,
    pub minutes_floor: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            competition: ALL.to_string(),
            team: ALL.to_string(),
            position: ALL.to_string(),
            player: None,
            minutes_floor: 0,
        }
    }
}

/// Result of running the pipeline for a filter state.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// Rows left after every stage.
    pub view: View<'a>,
    /// State with stale axes reset to their first admissible option.
    pub resolved: FilterState,
    pub competitions: Vec<String>,
    pub teams: Vec<String>,
    pub positions: Vec<String>,
    pub players: Vec<String>,
    /// Axes whose requested value was no longer admissible.
    pub stale: Vec<Axis>,
    /// Whether the minutes floor had to be dropped to 0 to find any rows.
    pub relaxed_minutes_floor: bool,
}

impl FilterState {
    pub fn competition(mut self, competition: impl Into<String>) -> Self {
        self.competition = competition.into();
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn minutes_floor(mut self, floor: u32) -> Self {
        self.minutes_floor = floor;
        self
    }

    /// Run the pipeline. An empty result is retried once with the minutes
    /// floor relaxed to 0.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Result<Selection<'a>, FilterError> {
        let selection = self.run(dataset, self.minutes_floor);
        if !selection.view.is_empty() {
            return Ok(selection);
        }
        if self.minutes_floor == 0 {
            return Err(FilterError::EmptyCohort { minutes_floor: 0 });
        }
        info!(
            "no rows at minutes floor {}, retrying with floor 0",
            self.minutes_floor
        );
        let mut retried = self.run(dataset, 0);
        if retried.view.is_empty() {
            return Err(FilterError::EmptyCohort {
                minutes_floor: self.minutes_floor,
            });
        }
        retried.relaxed_minutes_floor = true;
        retried.resolved.minutes_floor = 0;
        Ok(retried)
    }

    fn run<'a>(&self, dataset: &'a Dataset, minutes_floor: u32) -> Selection<'a> {
        let mut stale = Vec::new();
        let mut resolved = self.clone();
        resolved.minutes_floor = minutes_floor;

        let all = View::new(dataset);

        let competitions = with_all(all.competitions());
        resolved.competition = resolve(&self.competition, &competitions, Axis::Competition, &mut stale);
        let view = all.by_competition(&resolved.competition);

        let teams = with_all(view.teams());
        resolved.team = resolve(&self.team, &teams, Axis::Team, &mut stale);
        let view = view.by_team(&resolved.team);

        let positions = with_all(view.positions());
        resolved.position = resolve(&self.position, &positions, Axis::Position, &mut stale);
        let view = view.by_position(&resolved.position).by_minutes_floor(minutes_floor);

        let players = view.players();
        resolved.player = match &self.player {
            Some(p) if players.contains(p) => Some(p.clone()),
            Some(p) => {
                warn!("stale player selection '{}'", p);
                stale.push(Axis::Player);
                players.first().cloned()
            }
            None => players.first().cloned(),
        };

        Selection {
            view,
            resolved,
            competitions,
            teams,
            positions,
            players,
            stale,
            relaxed_minutes_floor: false,
        }
    }
}

fn resolve(requested: &str, options: &[String], axis: Axis, stale: &mut Vec<Axis>) -> String {
    if options.iter().any(|o| o == requested) {
        return requested.to_string();
    }
    warn!("stale {} selection '{}'", axis, requested);
    stale.push(axis);
    options.first().cloned().unwrap_or_else(|| ALL.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::demo_dataset;
    use crate::schema::MetricId;

    #[test]
    fn all_sentinel_is_a_no_op() {
        let ds = demo_dataset();
        let view = View::new(&ds);
        assert_eq!(view.by_competition(ALL).len(), 10);
        assert_eq!(view.by_team(ALL).len(), 10);
        assert_eq!(view.by_position(ALL).len(), 10);
    }

    #[test]
    fn stages_compose_left_to_right_and_preserve_order() {
        let ds = demo_dataset();
        let view = View::new(&ds).by_competition("Premier League");
        assert_eq!(view.names(), vec!["Haaland", "Salah", "Saka", "Rodri"]);
        let view = view.by_position("FW");
        assert_eq!(view.names(), vec!["Haaland", "Salah", "Saka"]);
    }

    #[test]
    fn filters_are_idempotent() {
        let ds = demo_dataset();
        let once = View::new(&ds).by_team("Real Madrid");
        let twice = once.by_team("Real Madrid");
        assert_eq!(once.names(), twice.names());
        let once = View::new(&ds).by_competition("Serie A");
        assert_eq!(once.names(), once.by_competition("Serie A").names());
    }

    #[test]
    fn minutes_floor_excludes_unknown_minutes() {
        let ds = Dataset::from_rows(vec![
            PlayerRow::new("A", "T", "C", "FW").with(MetricId::Minutes, 900.0),
            PlayerRow::new("B", "T", "C", "FW").with(MetricId::Minutes, 200.0),
            PlayerRow::new("C", "T", "C", "FW"),
        ]);
        let view = View::new(&ds);
        assert_eq!(view.by_minutes_floor(0).len(), 3);
        assert_eq!(view.by_minutes_floor(270).names(), vec!["A"]);
    }

    #[test]
    fn options_are_sorted_and_include_sentinel() {
        let ds = demo_dataset();
        let sel = FilterState::default().apply(&ds).unwrap();
        assert_eq!(
            sel.competitions,
            vec!["Toutes", "Bundesliga", "La Liga", "Premier League", "Serie A"]
        );
        assert_eq!(sel.positions, vec!["Toutes", "FW", "MF"]);
        assert_eq!(sel.players.first().map(String::as_str), Some("Haaland"));
        assert_eq!(sel.resolved.player.as_deref(), Some("Haaland"));
        assert!(sel.stale.is_empty());
    }

    #[test]
    fn team_options_follow_competition() {
        let ds = demo_dataset();
        let sel = FilterState::default()
            .competition("Premier League")
            .apply(&ds)
            .unwrap();
        assert_eq!(sel.teams, vec!["Toutes", "Arsenal", "Liverpool", "Man City"]);
    }

    #[test]
    fn stale_team_is_signalled_and_reset() {
        let ds = demo_dataset();
        let sel = FilterState::default()
            .competition("Premier League")
            .team("Real Madrid")
            .apply(&ds)
            .unwrap();
        assert_eq!(sel.stale, vec![Axis::Team]);
        assert_eq!(sel.resolved.team, ALL);
        assert_eq!(sel.view.len(), 4);
    }

    #[test]
    fn stale_player_falls_back_to_first_sorted() {
        let ds = demo_dataset();
        let sel = FilterState::default()
            .competition("Serie A")
            .player("Haaland")
            .apply(&ds)
            .unwrap();
        assert_eq!(sel.stale, vec![Axis::Player]);
        assert_eq!(sel.resolved.player.as_deref(), Some("Lautaro"));
    }

    #[test]
    fn empty_result_relaxes_minutes_floor_once() {
        let ds = demo_dataset();
        let sel = FilterState::default().minutes_floor(10_000).apply(&ds).unwrap();
        assert!(sel.relaxed_minutes_floor);
        assert_eq!(sel.resolved.minutes_floor, 0);
        assert_eq!(sel.view.len(), 10);
    }

    #[test]
    fn empty_dataset_is_an_empty_cohort() {
        let ds = Dataset::from_rows(Vec::new());
        let err = FilterState::default().minutes_floor(90).apply(&ds).unwrap_err();
        assert_eq!(err, FilterError::EmptyCohort { minutes_floor: 90 });
    }
}
