// Selection surface for a view layer.
//
// A `Session` owns the memoized season table and the profile options. Every
// call recomputes from the cached table; nothing else is kept between calls.

use crate::config::Config;
use crate::filter::{Axis, FilterError, FilterState};
use crate::loader::{DatasetStore, LoadError};
use crate::profile::{self, Profile, ProfileError, ProfileOptions};
use crate::table::Dataset;
use std::path::PathBuf;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Owned result of running the filter pipeline: the admissible options on
/// every axis and what had to be reset to reach them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub resolved: FilterState,
    pub competitions: Vec<String>,
    pub teams: Vec<String>,
    pub positions: Vec<String>,
    pub players: Vec<String>,
    pub stale: Vec<Axis>,
    pub relaxed_minutes_floor: bool,
}

#[derive(Debug)]
pub struct Session {
    store: DatasetStore,
    options: ProfileOptions,
    minutes_floor: u32,
}

impl Session {
    /// Open a session on a season file. The table is read immediately so an
    /// unreadable file surfaces here rather than on the first query.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let store = DatasetStore::new(path);
        let dataset = store.get()?;
        info!("session opened with {} rows", dataset.len());
        Ok(Session {
            store,
            options: ProfileOptions::default(),
            minutes_floor: 0,
        })
    }

    /// Open using the paths and analysis settings of a loaded config.
    pub fn from_config(config: &Config) -> Result<Self, LoadError> {
        let mut session = Session::open(&config.data.path)?;
        session.options = config.analysis.profile_options();
        session.minutes_floor = config.analysis.default_minutes_floor;
        Ok(session)
    }

    /// Session over an in-memory table. `reload` re-reads nothing useful
    /// unless `path` exists.
    pub fn with_dataset(dataset: Dataset) -> Self {
        Session {
            store: DatasetStore::with_dataset(PathBuf::new(), dataset),
            options: ProfileOptions::default(),
            minutes_floor: 0,
        }
    }

    pub fn with_options(mut self, options: ProfileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    pub fn dataset(&self) -> Result<Arc<Dataset>, LoadError> {
        self.store.get()
    }

    /// Filter state the view layer starts from.
    pub fn default_state(&self) -> FilterState {
        FilterState::default().minutes_floor(self.minutes_floor)
    }

    /// Run `state` through the filter pipeline on the session table.
    pub fn select(&self, state: &FilterState) -> Result<Listing, SessionError> {
        let ds = self.dataset()?;
        let sel = state.apply(&ds)?;
        Ok(Listing {
            resolved: sel.resolved,
            competitions: sel.competitions,
            teams: sel.teams,
            positions: sel.positions,
            players: sel.players,
            stale: sel.stale,
            relaxed_minutes_floor: sel.relaxed_minutes_floor,
        })
    }

    /// Sorted competitions, `"Toutes"` first.
    pub fn list_competitions(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.select(&self.default_state())?.competitions)
    }

    /// Sorted teams within a competition, `"Toutes"` first.
    pub fn list_teams(&self, competition: &str) -> Result<Vec<String>, SessionError> {
        let state = self.default_state().competition(competition);
        Ok(self.select(&state)?.teams)
    }

    /// Sorted positions within a competition and team, `"Toutes"` first.
    pub fn list_positions(&self, competition: &str, team: &str) -> Result<Vec<String>, SessionError> {
        let state = self.default_state().competition(competition).team(team);
        Ok(self.select(&state)?.positions)
    }

    /// Sorted player names matching the three axes and the session's
    /// minutes floor.
    pub fn list_players(&self, competition: &str, team: &str, position: &str) -> Result<Vec<String>, SessionError> {
        let state = self
            .default_state()
            .competition(competition)
            .team(team)
            .position(position);
        Ok(self.select(&state)?.players)
    }

    /// Profile with no filters and the session's options.
    pub fn profile(&self, player: &str) -> Result<Profile, ProfileError> {
        self.profile_with(&self.default_state(), player, &self.options)
    }

    pub fn profile_with(
        &self,
        state: &FilterState,
        player: &str,
        options: &ProfileOptions,
    ) -> Result<Profile, ProfileError> {
        let ds = self.dataset()?;
        profile::assemble_with(&ds, state, player, options)
    }

    /// Drop the cached table and read the file again.
    pub fn reload(&self) -> Result<Arc<Dataset>, LoadError> {
        self.store.reload()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ALL;
    use crate::loader::demo_dataset;
    use crate::table::DatasetSource;

    #[test]
    fn selection_surface_on_demo() {
        let s = Session::with_dataset(demo_dataset());
        let comps = s.list_competitions().unwrap();
        assert_eq!(
            comps,
            vec![ALL, "Bundesliga", "La Liga", "Premier League", "Serie A"]
        );
        assert_eq!(
            s.list_teams("Premier League").unwrap(),
            vec![ALL, "Arsenal", "Liverpool", "Man City"]
        );
        assert_eq!(s.list_positions("Premier League", "Man City").unwrap(), vec![ALL, "FW", "MF"]);
        assert_eq!(s.list_players(ALL, "Real Madrid", ALL).unwrap(), vec!["Mbappé", "Vinicius"]);
    }

    #[test]
    fn listings_honour_the_minutes_floor() {
        let ds = crate::loader::load_from_str(
            "Joueur;Équipe;Compétition;Position;Âge;Minutes jouées\nA;T;C;FW;20;2000\nB;T;C;FW;21;100\n",
            DatasetSource::Inline,
        )
        .unwrap();
        let s = Session::with_dataset(ds);
        assert_eq!(s.list_players(ALL, ALL, ALL).unwrap(), vec!["A", "B"]);

        let listing = s.select(&FilterState::default().minutes_floor(900)).unwrap();
        assert_eq!(listing.players, vec!["A"]);
        assert!(!listing.relaxed_minutes_floor);
    }

    #[test]
    fn stale_team_is_reported_and_reset() {
        let s = Session::with_dataset(demo_dataset());
        let listing = s
            .select(&FilterState::default().competition("Premier League").team("Real Madrid"))
            .unwrap();
        assert_eq!(listing.stale, vec![Axis::Team]);
        assert_eq!(listing.resolved.team, ALL);
        assert_eq!(listing.players, vec!["Haaland", "Rodri", "Saka", "Salah"]);
    }

    #[test]
    fn missing_file_opens_demo() {
        let path = std::env::temp_dir().join("pitchperfect-session-missing.csv");
        let _ = std::fs::remove_file(&path);
        let s = Session::open(&path).unwrap();
        assert_eq!(s.dataset().unwrap().source(), &DatasetSource::Demo);
        assert_eq!(s.profile("Kane").unwrap().identity.team, "Bayern");
    }

    #[test]
    fn reload_picks_up_new_file() {
        let path = std::env::temp_dir().join(format!("pitchperfect-session-{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let s = Session::open(&path).unwrap();
        assert_eq!(s.dataset().unwrap().len(), 10);

        std::fs::write(
            &path,
            "Joueur;Équipe;Compétition;Position;Âge;Buts\nDembélé;PSG;Ligue 1;FW;27;21\n",
        )
        .unwrap();
        // Still the memoized demo until reload.
        assert_eq!(s.dataset().unwrap().len(), 10);
        s.reload().unwrap();
        assert_eq!(s.list_players(ALL, ALL, ALL).unwrap(), vec!["Dembélé"]);

        let _ = std::fs::remove_file(&path);
    }
}
