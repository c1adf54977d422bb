// Pitchperfect entry point: a terminal view layer over the analytics core.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, stdout is for results)
// 3. Load config
// 4. Open the session (loads and memoizes the season table)
// 5. Run the requested command

use pitchperfect_core::config::{self, Config};
use pitchperfect_core::export;
use pitchperfect_core::filter::{Axis, FilterState, ALL};
use pitchperfect_core::insights::{self, format_market_value};
use pitchperfect_core::profile::Profile;
use pitchperfect_core::schema::MetricId;
use pitchperfect_core::session::Session;
use pitchperfect_core::table::display_value;
use pitchperfect_photo::{HttpPhotoSource, PhotoCache};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pitchperfect")]
#[command(about = "Player profiles, percentiles and charts from a season table", long_about = None)]
struct Cli {
    /// Season CSV; overrides `data.path` from the config
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    #[arg(long, default_value = ALL)]
    competition: String,
    #[arg(long, default_value = ALL)]
    team: String,
    #[arg(long, default_value = ALL)]
    position: String,
    /// Minimum minutes played; the config default when omitted
    #[arg(long)]
    min_minutes: Option<u32>,
}

impl FilterArgs {
    fn state(&self, session: &Session) -> FilterState {
        let base = session.default_state();
        let floor = self.min_minutes.unwrap_or(base.minutes_floor);
        base.competition(self.competition.clone())
            .team(self.team.clone())
            .position(self.position.clone())
            .minutes_floor(floor)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List competitions
    Competitions,
    /// List teams within a competition
    Teams {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List positions within a competition and team
    Positions {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List players matching the filters
    Players {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Full profile of one player
    Profile {
        player: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
        /// Players to compare against on the bar chart (repeatable)
        #[arg(long = "compare")]
        compare: Vec<String>,
    },
    /// Top players of the filtered view by one metric
    Leaderboard {
        #[arg(long, value_parser = parse_metric)]
        metric: MetricId,
        #[arg(long, default_value = "10")]
        top: usize,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Means, medians and correlation of two metrics
    Summary {
        #[arg(long, value_parser = parse_metric)]
        x: MetricId,
        #[arg(long, value_parser = parse_metric)]
        y: MetricId,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Write the filtered view as CSV
    Export {
        /// Output file; `<export.directory>/players.csv` when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Fetch a player photo, or the initials avatar when none is available
    Photo {
        player: String,
        team: String,
        /// Output file; extension follows the resolved image type when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_metric(s: &str) -> Result<MetricId, String> {
    MetricId::from_key(s).ok_or_else(|| {
        let keys: Vec<&str> = MetricId::all().map(|m| m.key()).collect();
        format!("unknown metric '{s}' (expected one of: {})", keys.join(", "))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!("pitchperfect starting up");

    // 3. Load config
    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(path) = &cli.data {
        config.data.path = path.display().to_string();
    }
    info!("Config loaded: data={}", config.data.path);

    // 4. Open the session
    let session = Session::from_config(&config)
        .with_context(|| format!("failed to load season table {}", config.data.path))?;

    // 5. Run the command
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Competitions => {
            write_lines(&mut out, &session.list_competitions()?)?;
        }
        Command::Teams { filter } => {
            let listing = session.select(&filter.state(&session))?;
            report_selection(&listing.stale, listing.relaxed_minutes_floor, &listing.resolved);
            write_lines(&mut out, &listing.teams)?;
        }
        Command::Positions { filter } => {
            let listing = session.select(&filter.state(&session))?;
            report_selection(&listing.stale, listing.relaxed_minutes_floor, &listing.resolved);
            write_lines(&mut out, &listing.positions)?;
        }
        Command::Players { filter } => {
            let listing = session.select(&filter.state(&session))?;
            report_selection(&listing.stale, listing.relaxed_minutes_floor, &listing.resolved);
            write_lines(&mut out, &listing.players)?;
        }
        Command::Profile {
            player,
            filter,
            json,
            compare,
        } => {
            let mut options = session.options().clone();
            options.compare_with = compare;
            let profile = session
                .profile_with(&filter.state(&session), &player, &options)
                .with_context(|| format!("failed to build profile for {player}"))?;
            if json {
                writeln!(out, "{}", profile.to_json()?)?;
            } else {
                render_profile(&mut out, &profile)?;
            }
        }
        Command::Leaderboard { metric, top, filter } => {
            let ds = session.dataset()?;
            let selection = filter.state(&session).apply(&ds)?;
            report_selection(&selection.stale, selection.relaxed_minutes_floor, &selection.resolved);
            writeln!(out, "{} ({} players)", metric.label(), selection.view.len())?;
            for e in insights::leaderboard(&selection.view, metric, top) {
                writeln!(
                    out,
                    "{:>3}. {:<24} {:<20} {:>8}",
                    e.rank,
                    e.name,
                    e.team,
                    display_value(Some(e.value), 2)
                )?;
            }
        }
        Command::Summary { x, y, filter } => {
            let ds = session.dataset()?;
            let selection = filter.state(&session).apply(&ds)?;
            report_selection(&selection.stale, selection.relaxed_minutes_floor, &selection.resolved);
            let s = insights::summarize(&selection.view, x, y);
            for m in [s.x, s.y] {
                writeln!(
                    out,
                    "{:<32} n={:<4} mean={:<8} median={}",
                    m.metric.label(),
                    m.n,
                    display_value(m.mean, 2),
                    display_value(m.median, 2)
                )?;
            }
            let strength = s.strength.map(|st| st.to_string()).unwrap_or_else(|| "N/A".to_string());
            writeln!(out, "correlation: {} ({strength})", display_value(s.correlation, 3))?;
        }
        Command::Export { out: path, filter } => {
            let ds = session.dataset()?;
            let selection = filter.state(&session).apply(&ds)?;
            report_selection(&selection.stale, selection.relaxed_minutes_floor, &selection.resolved);
            let path = path.unwrap_or_else(|| PathBuf::from(&config.export.directory).join("players.csv"));
            let metrics: Vec<MetricId> = ds.columns().collect();
            let n = export::export_view(&path, &selection.view, &metrics)
                .with_context(|| format!("failed to export to {}", path.display()))?;
            writeln!(out, "wrote {n} rows to {}", path.display())?;
        }
        Command::Photo { player, team, out: path } => {
            let path = fetch_photo(&config, &player, &team, path).await?;
            writeln!(out, "wrote {}", path.display())?;
        }
    }

    info!("pitchperfect done");
    Ok(())
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Selection notices, one per line.
fn selection_notices(stale: &[Axis], relaxed_minutes_floor: bool, resolved: &FilterState) -> Vec<String> {
    let mut notices: Vec<String> = stale
        .iter()
        .map(|axis| {
            let value = match axis {
                Axis::Competition => resolved.competition.as_str(),
                Axis::Team => resolved.team.as_str(),
                Axis::Position => resolved.position.as_str(),
                Axis::Player => resolved.player.as_deref().unwrap_or(ALL),
            };
            format!("{axis} selection is no longer available, reset to {value}")
        })
        .collect();
    if relaxed_minutes_floor {
        notices.push("no players at that minutes floor, showing all minutes".to_string());
    }
    notices
}

fn report_selection(stale: &[Axis], relaxed_minutes_floor: bool, resolved: &FilterState) {
    for notice in selection_notices(stale, relaxed_minutes_floor, resolved) {
        eprintln!("! {notice}");
    }
}

async fn fetch_photo(config: &Config, player: &str, team: &str, path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let source = HttpPhotoSource::from_config(&config.photo).context("failed to build HTTP client")?;
    let cache = PhotoCache::new(source, config.photo.min_dimension);
    let photo = cache.get_photo(player, team).await;
    if photo.is_avatar() {
        info!("no usable photo for {} ({}), using avatar", player, team);
    }

    let path = path.unwrap_or_else(|| {
        let stem: String = player
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        PathBuf::from(&config.export.directory).join(format!("{stem}.{}", photo.extension()))
    });
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, photo.bytes()).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1}%"),
        None => "N/A".to_string(),
    }
}

fn render_profile(out: &mut impl Write, p: &Profile) -> std::io::Result<()> {
    let id = &p.identity;
    writeln!(out, "{} | {} | {} | {}", id.name, id.team, id.competition, id.position)?;
    writeln!(
        out,
        "Age: {}  Nationality: {}  Value: {}",
        display_value(id.age, 0),
        if id.nationality.is_empty() { "N/A" } else { id.nationality.as_str() },
        format_market_value(id.market_value)
    )?;
    for note in &p.notes {
        writeln!(out, "! {note}")?;
    }

    writeln!(out, "\nKey metrics")?;
    for k in &p.key_metrics {
        writeln!(out, "  {:<32} {:>8}", k.metric.label(), display_value(k.value, 1))?;
    }

    writeln!(out, "\nPer 90")?;
    for e in &p.per90 {
        writeln!(
            out,
            "  {:<32} {:>8} {:>8}",
            e.metric.label(),
            display_value(e.total, 1),
            display_value(e.per90, 2)
        )?;
    }

    writeln!(out, "\nPercentiles ({} players, {:?} cohort)", p.cohort_size, p.cohort_scope)?;
    for s in &p.radar.spokes {
        writeln!(
            out,
            "  {:<32} {:>8} {:>6}",
            s.label,
            display_value(s.raw, 1),
            display_value(s.percentile, 0)
        )?;
    }

    writeln!(out, "\nFinishing")?;
    match &p.xg_delta {
        Some(d) => writeln!(out, "  Goals - xG: {:+.1} ({})", d.delta, d.label)?,
        None => writeln!(out, "  Goals - xG: N/A")?,
    }
    if let Some(f) = &p.funnel {
        for stage in &f.stages {
            writeln!(
                out,
                "  {:<32} {:>8} {:>7}",
                stage.label,
                display_value(Some(stage.value), 0),
                pct(stage.pct_of_initial)
            )?;
        }
    }
    writeln!(out, "  Conversion {}  Accuracy {}", pct(p.efficiency.shot_conversion), pct(p.efficiency.shot_accuracy))?;
    writeln!(
        out,
        "  Assist efficiency {}  Dribble success {}",
        pct(p.efficiency.assist_efficiency),
        pct(p.efficiency.dribble_success)
    )?;

    if p.touches.is_known() {
        writeln!(out, "\nTouches")?;
        for z in &p.touches.zones {
            writeln!(
                out,
                "  {:<32} {:>8} {:>7}",
                z.zone.metric().label(),
                display_value(z.count, 0),
                pct(z.fraction.map(|f| f * 100.0))
            )?;
        }
    }

    for g in &p.groups {
        let strengths: Vec<&str> = g.strengths().map(|e| e.label.as_str()).collect();
        if !strengths.is_empty() {
            writeln!(out, "\n{} strengths: {}", g.group, strengths.join(", "))?;
        }
    }
    Ok(())
}

/// Initialize tracing to log to a file so stdout only carries results.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pitchperfect.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pitchperfect_core=info,pitchperfect_photo=info,pitchperfect=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
