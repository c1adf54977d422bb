// CSV export of a filtered view.

use crate::filter::View;
use crate::schema::{IdentityField, MetricId};
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
}

const IDENTITY: [IdentityField; 6] = [
    IdentityField::Name,
    IdentityField::Team,
    IdentityField::Competition,
    IdentityField::Position,
    IdentityField::Nationality,
    IdentityField::Age,
];

/// Write the view as CSV: identity columns first, then `metrics` under their
/// source headers. Unknown values become empty cells.
pub fn write_view<W: Write>(writer: W, view: &View<'_>, metrics: &[MetricId]) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let header: Vec<&str> = IDENTITY
        .iter()
        .map(|f| f.column())
        .chain(metrics.iter().map(|m| m.column()))
        .collect();
    wtr.write_record(&header)?;

    for row in view.rows() {
        let mut record = vec![
            row.name.clone(),
            row.team.clone(),
            row.competition.clone(),
            row.position.clone(),
            row.nationality.clone(),
            row.age.map(|a| a.to_string()).unwrap_or_default(),
        ];
        record.extend(
            metrics
                .iter()
                .map(|m| row.get(*m).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(view.len())
}

/// Export to a file, creating parent directories as needed.
pub fn export_view(path: &Path, view: &View<'_>, metrics: &[MetricId]) -> Result<usize, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    let written = write_view(file, view, metrics)?;
    info!("exported {} rows to {}", written, path.display());
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{demo_dataset, load_from_str};
    use crate::table::DatasetSource;

    #[test]
    fn unknowns_are_empty_cells() {
        let ds = demo_dataset();
        let view = View::new(&ds).by_team("Arsenal");
        let mut buf = Vec::new();
        let n = write_view(&mut buf, &view, &[MetricId::Goals, MetricId::Shots]).unwrap();
        assert_eq!(n, 1);
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Joueur,Équipe,Compétition,Position,Nationalité,Âge,Buts,Tirs"
        );
        assert_eq!(lines.next().unwrap(), "Saka,Arsenal,Premier League,FW,,23,14,");
        assert!(lines.next().is_none());
    }

    #[test]
    fn export_reloads_through_loader() {
        let ds = demo_dataset();
        let view = View::new(&ds).by_competition("La Liga");
        let dir = std::env::temp_dir().join(format!("pitchperfect-export-{}", std::process::id()));
        let path = dir.join("nested").join("laliga.csv");
        export_view(&path, &view, &[MetricId::Goals, MetricId::Xg]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let reloaded = load_from_str(&text, DatasetSource::Inline).unwrap();
        assert_eq!(reloaded.len(), 2);
        let mbappe = reloaded.find_player("Mbappé", None).unwrap();
        assert_eq!(mbappe.get(MetricId::Xg), Some(23.1));
        assert_eq!(mbappe.age, Some(26.0));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
