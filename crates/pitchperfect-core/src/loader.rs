// Season table loading and cell normalization.
//
// Reads the delimited export (`df_BIG2025.csv`): UTF-8, header row, `;` or `,`
// as field separator (sniffed from the header line) and `.` or `,` as decimal
// mark. A missing file falls back to a fixed ten-row demo table so the rest of
// the system stays usable.

use crate::schema::{required_columns, IdentityField, MetricId};
use crate::table::{Dataset, DatasetSource, PlayerRow};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    FileUnreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: String, columns: Vec<String> },
}

// ---------------------------------------------------------------------------
// Cell normalization
// ---------------------------------------------------------------------------

/// Tokens that mean "no value" in the source table.
const UNKNOWN_TOKENS: &[&str] = &["", "-", "na", "nan", "n/a", "none"];

/// Normalize a raw numeric cell to a single textual form: trimmed, inner
/// spaces removed, `.` as decimal mark. Unknown tokens become the empty string.
///
/// Idempotent: `normalize_cell(&normalize_cell(x)) == normalize_cell(x)`.
pub fn normalize_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    if UNKNOWN_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        return String::new();
    }
    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{202f}')
        .collect();
    match (compact.rfind(','), compact.rfind('.')) {
        // Both marks present: the last one is the decimal mark.
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        _ => compact.replace(',', "."),
    }
}

/// Parse a raw cell into a finite number, or `None` when unknown.
pub fn parse_number(raw: &str) -> Option<f64> {
    let normalized = normalize_cell(raw);
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Ages arrive either as plain years (`24`) or in the `years-days` form
/// (`24-123`); only the years are kept.
pub fn parse_age(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    match trimmed.split_once('-') {
        Some((years, days)) if !years.is_empty() && days.chars().all(|c| c.is_ascii_digit()) => {
            parse_number(years)
        }
        _ => parse_number(trimmed),
    }
}

/// Pick the field separator by probing the header line.
pub fn detect_separator(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > 0 && semicolons >= commas {
        b';'
    } else {
        b','
    }
}

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Column {
    Identity(IdentityField),
    Metric(MetricId),
    Ignored,
}

fn map_headers(headers: &csv::StringRecord) -> Vec<Column> {
    let mut seen_identity = BTreeSet::new();
    let mut seen_metric = BTreeSet::new();
    headers
        .iter()
        .map(|h| {
            let h = h.trim_start_matches('\u{feff}').trim();
            if let Some(field) = IdentityField::from_column(h) {
                if seen_identity.insert(field as u8) {
                    return Column::Identity(field);
                }
            } else if let Some(metric) = MetricId::from_column(h) {
                if seen_metric.insert(metric) {
                    return Column::Metric(metric);
                }
            }
            Column::Ignored
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse a whole table held in memory.
pub fn load_from_str(text: &str, source: DatasetSource) -> Result<Dataset, LoadError> {
    let label = source_label(&source);
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text.lines().next().unwrap_or_default();
    let separator = detect_separator(header_line);
    debug!(
        "detected separator {:?} for {}",
        separator as char, label
    );

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Csv {
            path: label.clone(),
            source: e,
        })?
        .clone();
    let columns = map_headers(&headers);

    let missing: Vec<String> = required_columns()
        .filter(|req| {
            !columns
                .iter()
                .any(|c| matches!(c, Column::Identity(f) if f.column() == *req))
        })
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: label,
            columns: missing,
        });
    }

    let present: BTreeSet<MetricId> = columns
        .iter()
        .filter_map(|c| match c {
            Column::Metric(m) => Some(*m),
            _ => None,
        })
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed row {} in {}: {}", line + 2, label, e);
                continue;
            }
        };
        match parse_record(&record, &columns) {
            Some(row) => rows.push(row),
            None => warn!(
                "skipping row {} in {}: missing player name or competition",
                line + 2,
                label
            ),
        }
    }

    info!(
        "loaded {} player rows with {} metric columns from {}",
        rows.len(),
        present.len(),
        label
    );
    Ok(Dataset::new(rows, present, source))
}

fn parse_record(record: &csv::StringRecord, columns: &[Column]) -> Option<PlayerRow> {
    let mut row = PlayerRow::new("", "", "", "");
    for (cell, column) in record.iter().zip(columns) {
        match column {
            Column::Identity(IdentityField::Name) => row.name = cell.trim().to_string(),
            Column::Identity(IdentityField::Team) => row.team = cell.trim().to_string(),
            Column::Identity(IdentityField::Competition) => {
                row.competition = cell.trim().to_string()
            }
            Column::Identity(IdentityField::Position) => row.position = cell.trim().to_string(),
            Column::Identity(IdentityField::Nationality) => {
                row.nationality = cell.trim().to_string()
            }
            Column::Identity(IdentityField::Age) => row.age = parse_age(cell),
            Column::Identity(IdentityField::BirthYear) => row.birth_year = parse_number(cell),
            Column::Metric(metric) => row.set(*metric, parse_number(cell)),
            Column::Ignored => {}
        }
    }
    if row.name.is_empty() || row.competition.is_empty() {
        return None;
    }
    Some(row)
}

/// Load the season table from disk.
///
/// A missing file yields the demo table. Any other I/O failure, a non-UTF-8
/// file or a header without the identity columns is fatal.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "{} not found, falling back to the demo dataset",
                path.display()
            );
            return Ok(demo_dataset());
        }
        Err(e) => {
            return Err(LoadError::FileUnreadable {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    let text = String::from_utf8(bytes).map_err(|e| LoadError::FileUnreadable {
        path: path.display().to_string(),
        source: std::io::Error::new(ErrorKind::InvalidData, e),
    })?;
    load_from_str(&text, DatasetSource::File(path.to_path_buf()))
}

fn source_label(source: &DatasetSource) -> String {
    match source {
        DatasetSource::File(p) => p.display().to_string(),
        DatasetSource::Demo => "<demo>".to_string(),
        DatasetSource::Inline => "<inline>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Demo dataset
// ---------------------------------------------------------------------------

/// The fixed ten-row table used when the season file is missing.
pub fn demo_dataset() -> Dataset {
    // (name, team, competition, position, age,
    //  goals, assists, xG, xAG, prog passes, prog carries, SCA)
    #[rustfmt::skip]
    const DEMO: &[(&str, &str, &str, &str, f64, [f64; 7])] = &[
        ("Haaland", "Man City", "Premier League", "FW", 24.0, [29.0, 5.0, 28.5, 3.2, 12.0, 45.0, 88.0]),
        ("Mbappé", "Real Madrid", "La Liga", "FW", 26.0, [24.0, 7.0, 23.1, 5.4, 35.0, 120.0, 112.0]),
        ("Kane", "Bayern", "Bundesliga", "FW", 31.0, [28.0, 8.0, 26.2, 6.1, 45.0, 30.0, 95.0]),
        ("Salah", "Liverpool", "Premier League", "FW", 32.0, [18.0, 12.0, 19.5, 9.2, 60.0, 85.0, 105.0]),
        ("Saka", "Arsenal", "Premier League", "FW", 23.0, [14.0, 11.0, 13.2, 9.5, 55.0, 110.0, 125.0]),
        ("Vinicius", "Real Madrid", "La Liga", "FW", 24.0, [12.0, 9.0, 11.5, 7.8, 40.0, 145.0, 118.0]),
        ("Rodri", "Man City", "Premier League", "MF", 28.0, [7.0, 6.0, 5.5, 4.2, 210.0, 60.0, 90.0]),
        ("Wirtz", "Leverkusen", "Bundesliga", "MF", 21.0, [11.0, 11.0, 9.5, 10.2, 150.0, 105.0, 125.0]),
        ("Osimhen", "Napoli", "Serie A", "FW", 26.0, [15.0, 3.0, 14.5, 1.8, 15.0, 50.0, 70.0]),
        ("Lautaro", "Inter", "Serie A", "FW", 27.0, [22.0, 4.0, 20.1, 3.0, 25.0, 40.0, 80.0]),
    ];
    const METRICS: [MetricId; 7] = [
        MetricId::Goals,
        MetricId::Assists,
        MetricId::Xg,
        MetricId::Xag,
        MetricId::ProgressivePasses,
        MetricId::ProgressiveCarries,
        MetricId::ShotCreatingActions,
    ];

    let rows = DEMO
        .iter()
        .map(|(name, team, comp, pos, age, values)| {
            METRICS
                .iter()
                .zip(values)
                .fold(
                    PlayerRow::new(*name, *team, *comp, *pos).with_age(*age),
                    |row, (m, v)| row.with(*m, *v),
                )
        })
        .collect();

    Dataset::new(rows, METRICS.into_iter().collect(), DatasetSource::Demo)
}

// ---------------------------------------------------------------------------
// Memoized store
// ---------------------------------------------------------------------------

/// Loads the table on first use and hands out the same snapshot until
/// `reload` is called.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    cached: RwLock<Option<Arc<Dataset>>>,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatasetStore {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Store pre-seeded with an already-loaded table.
    pub fn with_dataset(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        DatasetStore {
            path: path.into(),
            cached: RwLock::new(Some(Arc::new(dataset))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<Dataset>, LoadError> {
        {
            let guard = self.cached.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ds) = guard.as_ref() {
                return Ok(Arc::clone(ds));
            }
        }
        self.reload()
    }

    /// Drop the cached table and read the file again.
    pub fn reload(&self) -> Result<Arc<Dataset>, LoadError> {
        let dataset = Arc::new(load_dataset(&self.path)?);
        let mut guard = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::clone(&dataset));
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn unknown_tokens_become_none() {
        for raw in ["", "  ", "-", "NA", "NaN", "nan", " n/a "] {
            assert_eq!(parse_number(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn both_decimal_marks_parse_identically() {
        assert_eq!(parse_number("28,5"), Some(28.5));
        assert_eq!(parse_number("28.5"), Some(28.5));
        assert_eq!(parse_number(" 1 234,5 "), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn last_mark_is_the_decimal_mark_when_both_appear() {
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("17.000.000,0"), Some(17_000_000.0));
        assert_eq!(normalize_cell("1.234,5"), normalize_cell("1,234.5"));

        let dot = "Joueur;Équipe;Compétition;Position;Âge;Valeur marchande\nA;T;C;FW;20;1,500.5";
        let comma = "Joueur;Équipe;Compétition;Position;Âge;Valeur marchande\nA;T;C;FW;20;1.500,5";
        let a = load_from_str(dot, DatasetSource::Inline).unwrap();
        let b = load_from_str(comma, DatasetSource::Inline).unwrap();
        assert_eq!(a.rows()[0].get(MetricId::MarketValue), Some(1500.5));
        assert_eq!(b.rows()[0].get(MetricId::MarketValue), Some(1500.5));
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["28,5", "28.5", " 12 ", "-", "NaN", "1,234.5", "1.234,5", "0,07"] {
            let once = normalize_cell(raw);
            assert_eq!(normalize_cell(&once), once, "{raw:?}");
        }
    }

    #[test]
    fn age_forms() {
        assert_eq!(parse_age("24"), Some(24.0));
        assert_eq!(parse_age("24-123"), Some(24.0));
        assert_eq!(parse_age("-"), None);
    }

    #[test]
    fn separator_detection() {
        assert_eq!(detect_separator("Joueur;Équipe;Buts"), b';');
        assert_eq!(detect_separator("Joueur,Équipe,Buts"), b',');
        assert_eq!(detect_separator("Joueur"), b',');
    }

    #[test]
    fn semicolon_table_with_comma_decimals() {
        let csv_data = "\
Joueur;Équipe;Compétition;Position;Âge;Buts;Buts attendus (xG);Colonne inconnue
Haaland;Man City;Premier League;FW;24;29;28,5;x
Kane;Bayern;Bundesliga;FW;31-200;28;-;y";

        let ds = load_from_str(csv_data, DatasetSource::Inline).unwrap();
        assert_eq!(ds.len(), 2);
        let haaland = &ds.rows()[0];
        assert_eq!(haaland.name, "Haaland");
        assert_eq!(haaland.team, "Man City");
        assert!(approx_eq(haaland.get(MetricId::Xg).unwrap(), 28.5, 1e-12));
        assert_eq!(ds.rows()[1].get(MetricId::Xg), None);
        assert_eq!(ds.rows()[1].age, Some(31.0));
        assert!(ds.has_column(MetricId::Xg));
        assert!(!ds.has_column(MetricId::Assists));
    }

    #[test]
    fn comma_table_with_quoted_comma_decimals() {
        let csv_data = "\
Joueur,Équipe,Compétition,Position,Âge,Buts attendus (xG)
Haaland,Man City,Premier League,FW,24,\"28,5\"";

        let ds = load_from_str(csv_data, DatasetSource::Inline).unwrap();
        assert_eq!(ds.rows()[0].get(MetricId::Xg), Some(28.5));
    }

    #[test]
    fn bom_and_alias_headers() {
        let csv_data = "\u{feff}Joueur;Équipe;Compétition;Position;Âge;Tacles réussis
Rodri;Man City;Premier League;MF;28;41";

        let ds = load_from_str(csv_data, DatasetSource::Inline).unwrap();
        assert_eq!(ds.rows()[0].get(MetricId::TacklesWon), Some(41.0));
    }

    #[test]
    fn rows_without_name_or_competition_are_skipped() {
        let csv_data = "\
Joueur;Équipe;Compétition;Position;Âge
;Man City;Premier League;MF;28
Rodri;Man City;;MF;28
Saka;Arsenal;Premier League;FW;23";

        let ds = load_from_str(csv_data, DatasetSource::Inline).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0].name, "Saka");
    }

    #[test]
    fn missing_identity_columns_is_an_error() {
        let csv_data = "Joueur;Buts\nHaaland;29";
        let err = load_from_str(csv_data, DatasetSource::Inline).unwrap_err();
        match err {
            LoadError::MissingColumns { columns, .. } => {
                assert!(columns.contains(&"Équipe".to_string()));
                assert!(columns.contains(&"Âge".to_string()));
            }
            other => panic!("expected MissingColumns, got: {other}"),
        }
    }

    #[test]
    fn missing_file_falls_back_to_demo() {
        let path = std::env::temp_dir().join("pitchperfect_loader_missing/df_BIG2025.csv");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.source(), &DatasetSource::Demo);
        assert_eq!(ds.len(), 10);
    }

    #[test]
    fn directory_path_is_unreadable() {
        let dir = std::env::temp_dir().join("pitchperfect_loader_dir");
        std::fs::create_dir_all(&dir).unwrap();
        let err = load_dataset(&dir).unwrap_err();
        assert!(matches!(err, LoadError::FileUnreadable { .. }));
    }

    #[test]
    fn demo_dataset_shape() {
        let ds = demo_dataset();
        assert_eq!(ds.len(), 10);
        let haaland = ds.find_player("Haaland", None).unwrap();
        assert_eq!(haaland.get(MetricId::Goals), Some(29.0));
        assert_eq!(haaland.get(MetricId::Xg), Some(28.5));
        assert_eq!(haaland.minutes(), None);
        assert!(!ds.has_column(MetricId::Minutes));
    }

    #[test]
    fn store_memoizes_until_reload() {
        let dir = std::env::temp_dir().join("pitchperfect_loader_store");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("table.csv");
        std::fs::write(&path, "Joueur;Équipe;Compétition;Position;Âge\nA;T;C;FW;20\n").unwrap();

        let store = DatasetStore::new(&path);
        assert_eq!(store.get().unwrap().len(), 1);

        std::fs::write(
            &path,
            "Joueur;Équipe;Compétition;Position;Âge\nA;T;C;FW;20\nB;T;C;FW;21\n",
        )
        .unwrap();
        assert_eq!(store.get().unwrap().len(), 1);
        assert_eq!(store.reload().unwrap().len(), 2);
        assert_eq!(store.get().unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
