// Schema map: canonical metric identifiers, their source columns and semantics.
//
// Every metric the core consumes is declared here exactly once. Loaders map
// source headers onto `MetricId`s through this table and chart models only ever
// address metrics by `MetricId`, never by free-form column name.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Semantic types
// ---------------------------------------------------------------------------

/// How a metric's raw number should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Season total (goals, tackles, minutes...).
    Count,
    /// Already expressed per 90 minutes in the source.
    Per90,
    /// 0-100 value. Never re-normalized.
    Percentage,
    /// Metres (average shot distance).
    Distance,
    /// Quotient of two counts that is not a percentage (goals per shot).
    Ratio,
    /// Text identity field.
    Categorical,
}

/// Physical unit of a metric. Two metrics sharing a unit and a semantic type
/// can be drawn against a `y = x` reference line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Appearances,
    Minutes,
    Goals,
    Assists,
    Shots,
    Passes,
    Carries,
    Actions,
    Dribbles,
    Touches,
    Defensive,
    Duels,
    Fouls,
    Cards,
    Percent,
    Metres,
    Ratio,
    Euros,
}

// ---------------------------------------------------------------------------
// Metric identifiers
// ---------------------------------------------------------------------------

/// Canonical identifier of every numeric metric known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    // Playing time
    MatchesPlayed,
    Starts,
    Minutes,
    FullMatches,
    SubAppearances,
    // Attack
    Goals,
    NonPenaltyGoals,
    Assists,
    Xg,
    Xag,
    Shots,
    ShotsOnTarget,
    ShotCreatingActions,
    // Passing and progression
    PassesAttempted,
    KeyPasses,
    ProgressivePasses,
    ProgressiveCarries,
    Carries,
    // Dribbling and touches
    DribblesAttempted,
    DribblesSucceeded,
    Touches,
    TouchesDefBox,
    TouchesDefThird,
    TouchesMidThird,
    TouchesAttThird,
    TouchesAttBox,
    // Defence and discipline
    TacklesWon,
    Interceptions,
    Recoveries,
    Clearances,
    AerialsWon,
    DefensiveDuelsWon,
    BlockedShots,
    FoulsCommitted,
    FoulsDrawn,
    YellowCards,
    RedCards,
    // Source-provided rates
    GoalsPer90,
    AssistsPer90,
    XgPer90,
    XagPer90,
    ShotsPer90,
    ShotCreatingActionsPer90,
    // Percentages and shooting profile
    PassCompletionPct,
    LongPassCompletionPct,
    DuelWinPct,
    AerialWinPct,
    ShotOnTargetPct,
    DribbleSuccessPct,
    AvgShotDistance,
    GoalsPerShot,
    // Market
    MarketValue,
}

/// Static declaration of one metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub id: MetricId,
    /// Stable snake_case key used on the command line and in config files.
    pub key: &'static str,
    /// Source column header in the season table.
    pub column: &'static str,
    /// Alternative headers seen in other exports of the same table.
    pub aliases: &'static [&'static str],
    /// Short label used on chart spokes and bars.
    pub label: &'static str,
    pub kind: SemanticType,
    pub unit: Unit,
    /// Whether the metric may be percentile-scored against a cohort.
    pub percentile_eligible: bool,
}

macro_rules! metric {
    ($id:ident, $key:literal, $column:literal, $label:literal, $kind:ident, $unit:ident, $eligible:literal) => {
        metric!($id, $key, $column, [], $label, $kind, $unit, $eligible)
    };
    ($id:ident, $key:literal, $column:literal, [$($alias:literal),*], $label:literal, $kind:ident, $unit:ident, $eligible:literal) => {
        MetricSpec {
            id: MetricId::$id,
            key: $key,
            column: $column,
            aliases: &[$($alias),*],
            label: $label,
            kind: SemanticType::$kind,
            unit: Unit::$unit,
            percentile_eligible: $eligible,
        }
    };
}

/// The schema map. Order is the canonical display order.
pub const SCHEMA: &[MetricSpec] = &[
    metric!(MatchesPlayed, "matches", "Matchs joués", "Matchs", Count, Appearances, false),
    metric!(Starts, "starts", "Titularisations", "Titulaire", Count, Appearances, false),
    metric!(Minutes, "minutes", "Minutes jouées", "Minutes", Count, Minutes, false),
    metric!(FullMatches, "full_matches", "Matchs en 90 min", "Matchs 90'", Count, Appearances, false),
    metric!(SubAppearances, "sub_appearances", "Entrées en jeu", "Entrées", Count, Appearances, false),
    metric!(Goals, "goals", "Buts", "Buts", Count, Goals, true),
    metric!(NonPenaltyGoals, "np_goals", "Buts (sans penalty)", "Buts s.p.", Count, Goals, true),
    metric!(Assists, "assists", "Passes décisives", "Passes D.", Count, Assists, true),
    metric!(Xg, "xg", "Buts attendus (xG)", "xG", Count, Goals, true),
    metric!(Xag, "xag", "Passes décisives attendues (xAG)", "xAG", Count, Assists, true),
    metric!(Shots, "shots", "Tirs", "Tirs", Count, Shots, true),
    metric!(ShotsOnTarget, "shots_on_target", "Tirs cadrés", "Tirs cadrés", Count, Shots, true),
    metric!(ShotCreatingActions, "sca", "Actions menant à un tir", "Tirs Créés", Count, Actions, true),
    metric!(PassesAttempted, "passes_attempted", "Passes tentées", "Passes", Count, Passes, true),
    metric!(KeyPasses, "key_passes", "Passes clés", "Passes clés", Count, Passes, true),
    metric!(ProgressivePasses, "progressive_passes", "Passes progressives", "Passe Prog", Count, Passes, true),
    metric!(ProgressiveCarries, "progressive_carries", "Courses progressives", "Course Prog", Count, Carries, true),
    metric!(Carries, "carries", "Conduites de balle", "Conduites", Count, Carries, true),
    metric!(DribblesAttempted, "dribbles_attempted", "Dribbles tentés", "Dribbles", Count, Dribbles, true),
    metric!(DribblesSucceeded, "dribbles_succeeded", "Dribbles réussis", "Dribbles réussis", Count, Dribbles, true),
    metric!(Touches, "touches", "Touches de balle", "Touches", Count, Touches, true),
    metric!(TouchesDefBox, "touches_def_box", "Touches dans la surface défensive", "Surf. déf.", Count, Touches, false),
    metric!(TouchesDefThird, "touches_def_third", "Touches dans le tiers défensif", "Tiers déf.", Count, Touches, false),
    metric!(TouchesMidThird, "touches_mid_third", "Touches dans le tiers médian", "Tiers médian", Count, Touches, false),
    metric!(TouchesAttThird, "touches_att_third", "Touches dans le tiers offensif", "Tiers off.", Count, Touches, false),
    metric!(TouchesAttBox, "touches_att_box", "Touches dans la surface offensive", "Surf. off.", Count, Touches, false),
    metric!(TacklesWon, "tackles_won", "Tacles gagnants", ["Tacles réussis"], "Tacles", Count, Defensive, true),
    metric!(Interceptions, "interceptions", "Interceptions", "Interceptions", Count, Defensive, true),
    metric!(Recoveries, "recoveries", "Ballons récupérés", "Récupérations", Count, Defensive, true),
    metric!(Clearances, "clearances", "Dégagements", "Dégagements", Count, Defensive, true),
    metric!(AerialsWon, "aerials_won", "Duels aériens gagnés", "Duels aériens", Count, Duels, true),
    metric!(DefensiveDuelsWon, "defensive_duels_won", "Duels défensifs gagnés", "Duels gagnés", Count, Duels, true),
    metric!(BlockedShots, "blocked_shots", "Tirs bloqués", "Tirs bloqués", Count, Defensive, true),
    metric!(FoulsCommitted, "fouls_committed", "Fautes commises", "Fautes", Count, Fouls, true),
    metric!(FoulsDrawn, "fouls_drawn", "Fautes subies", "Fautes subies", Count, Fouls, true),
    metric!(YellowCards, "yellow_cards", "Cartons jaunes", "Jaunes", Count, Cards, true),
    metric!(RedCards, "red_cards", "Cartons rouges", "Rouges", Count, Cards, true),
    metric!(GoalsPer90, "goals_p90", "Buts par 90 minutes", "Buts/90", Per90, Goals, true),
    metric!(AssistsPer90, "assists_p90", "Passes décisives par 90 minutes", "Passes D./90", Per90, Assists, true),
    metric!(XgPer90, "xg_p90", "Buts attendus par 90 minutes", "xG/90", Per90, Goals, true),
    metric!(XagPer90, "xag_p90", "Passes décisives attendues par 90 minutes", "xA/90", Per90, Assists, true),
    metric!(ShotsPer90, "shots_p90", "Tirs par 90 minutes", "Tirs/90", Per90, Shots, true),
    metric!(ShotCreatingActionsPer90, "sca_p90", "Actions menant à un tir par 90 minutes", "Actions → Tir/90", Per90, Actions, true),
    metric!(PassCompletionPct, "pass_pct", "Pourcentage de passes réussies", "% Passes réussies", Percentage, Percent, true),
    metric!(LongPassCompletionPct, "long_pass_pct", "Pourcentage de passes longues réussies", "% Passes longues", Percentage, Percent, true),
    metric!(DuelWinPct, "duel_pct", "Pourcentage de duels gagnés", "% Duels gagnés", Percentage, Percent, true),
    metric!(AerialWinPct, "aerial_pct", "Pourcentage de duels aériens gagnés", "% Duels aériens", Percentage, Percent, true),
    metric!(ShotOnTargetPct, "shot_on_target_pct", "Pourcentage de tirs cadrés", "% Tirs cadrés", Percentage, Percent, true),
    metric!(DribbleSuccessPct, "dribble_pct", "Pourcentage de dribbles réussis", "% Dribbles réussis", Percentage, Percent, true),
    metric!(AvgShotDistance, "shot_distance", "Distance moyenne des tirs", "Dist. tirs", Distance, Metres, true),
    metric!(GoalsPerShot, "goals_per_shot", "Buts par tir", "Buts/tir", Ratio, Ratio, true),
    metric!(MarketValue, "market_value", "Valeur marchande", "Valeur", Count, Euros, false),
];

impl MetricId {
    /// Every metric in canonical order.
    pub fn all() -> impl Iterator<Item = MetricId> {
        SCHEMA.iter().map(|s| s.id)
    }

    /// Static declaration for this metric.
    pub fn spec(self) -> &'static MetricSpec {
        // SCHEMA lists the variants in declaration order, one entry each.
        &SCHEMA[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn column(self) -> &'static str {
        self.spec().column
    }

    pub fn kind(self) -> SemanticType {
        self.spec().kind
    }

    pub fn unit(self) -> Unit {
        self.spec().unit
    }

    pub fn percentile_eligible(self) -> bool {
        self.spec().percentile_eligible
    }

    /// Look up a metric by its snake_case key (`"xg"`, `"progressive_passes"`).
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        SCHEMA
            .iter()
            .find(|s| s.key.eq_ignore_ascii_case(key))
            .map(|s| s.id)
    }

    /// Look up a metric by source column header, honoring aliases.
    pub fn from_column(header: &str) -> Option<Self> {
        let header = header.trim();
        SCHEMA
            .iter()
            .find(|s| s.column == header || s.aliases.contains(&header))
            .map(|s| s.id)
    }

    /// Whether two metrics can share an axis scale.
    pub fn shares_units_with(self, other: MetricId) -> bool {
        self.unit() == other.unit() && self.kind() == other.kind()
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Identity columns
// ---------------------------------------------------------------------------

/// Identity attributes of a player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Name,
    Team,
    Competition,
    Position,
    Nationality,
    Age,
    BirthYear,
}

#[derive(Debug, Clone, Copy)]
pub struct IdentitySpec {
    pub field: IdentityField,
    pub column: &'static str,
    pub required: bool,
    pub kind: SemanticType,
}

pub const IDENTITY_COLUMNS: &[IdentitySpec] = &[
    IdentitySpec { field: IdentityField::Name, column: "Joueur", required: true, kind: SemanticType::Categorical },
    IdentitySpec { field: IdentityField::Team, column: "Équipe", required: true, kind: SemanticType::Categorical },
    IdentitySpec { field: IdentityField::Competition, column: "Compétition", required: true, kind: SemanticType::Categorical },
    IdentitySpec { field: IdentityField::Position, column: "Position", required: true, kind: SemanticType::Categorical },
    IdentitySpec { field: IdentityField::Nationality, column: "Nationalité", required: false, kind: SemanticType::Categorical },
    IdentitySpec { field: IdentityField::Age, column: "Âge", required: true, kind: SemanticType::Count },
    IdentitySpec { field: IdentityField::BirthYear, column: "Année de naissance", required: false, kind: SemanticType::Count },
];

impl IdentityField {
    pub fn from_column(header: &str) -> Option<Self> {
        let header = header.trim();
        IDENTITY_COLUMNS
            .iter()
            .find(|s| s.column == header)
            .map(|s| s.field)
    }

    pub fn column(self) -> &'static str {
        IDENTITY_COLUMNS
            .iter()
            .find(|s| s.field == self)
            .map(|s| s.column)
            .unwrap_or_default()
    }
}

/// Headers that must be present for a table to be usable.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    IDENTITY_COLUMNS.iter().filter(|s| s.required).map(|s| s.column)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
