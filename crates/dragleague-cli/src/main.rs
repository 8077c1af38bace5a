// dragleague command-line entry point.
//
// Every command:
// 1. Initializes tracing (log to file, so stdout carries only command output)
// 2. Loads config (copying defaults on first run)
// 3. Opens the database
// 4. Runs the requested command against the store

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use uuid::Uuid;

use dragleague_core::config::{self, Config};
use dragleague_core::creation::{self, LeagueDraft};
use dragleague_core::db::Database;
use dragleague_core::lifecycle;
use dragleague_core::standings::{standings, Standing, StandingRow};
use dragleague_core::store::{PlayerFilter, RecordStore};

#[derive(Parser)]
#[command(name = "dragleague")]
#[command(about = "Fantasy league scoring and lifecycle for drag competition seasons", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config/ and defaults/.
    #[arg(long, env = "DRAGLEAGUE_HOME", default_value = ".")]
    base_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every not-started league whose ranking deadline has passed.
    CheckDeadlines,
    /// Repeat the deadline check on the configured interval until Ctrl+C.
    Watch,
    /// Create a league from a TOML draft and print its id.
    CreateLeague { file: PathBuf },
    /// Print the league table.
    Standings {
        league_id: Uuid,

        #[arg(long)]
        csv: bool,
    },
    /// Print a league's audit log.
    History { league_id: Uuid },
    /// Close an active league.
    Finish { league_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;
    init_tracing(&cli.base_dir, &config.logging.filter)?;
    info!("dragleague starting up");

    let db_path = cli.base_dir.join(&config.database.path);
    let db = Database::open(&db_path.to_string_lossy()).context("failed to open database")?;
    info!("Database opened at {}", db_path.display());

    match cli.command {
        Commands::CheckDeadlines => check_deadlines(&db, &config),
        Commands::Watch => watch(&db, &config).await,
        Commands::CreateLeague { file } => create_league(&db, &config, &file),
        Commands::Standings { league_id, csv } => print_standings(&db, league_id, csv),
        Commands::History { league_id } => print_history(&db, league_id),
        Commands::Finish { league_id } => {
            let outcome = lifecycle::finish(&db, league_id, &config.lifecycle.system_actor, Utc::now())
                .with_context(|| format!("failed to finish league {league_id}"))?;
            println!("{league_id}: {outcome}");
            Ok(())
        }
    }
}

fn check_deadlines(db: &Database, config: &Config) -> anyhow::Result<()> {
    let checks = lifecycle::check_all_deadlines(db, Utc::now(), &config.lifecycle.system_actor)
        .context("deadline check failed")?;
    if checks.is_empty() {
        println!("no leagues waiting to start");
    }
    for check in checks {
        match check.result {
            Ok(outcome) => println!("{} ({}): {}", check.league_name, check.league_id, outcome),
            Err(e) => println!("{} ({}): error: {}", check.league_name, check.league_id, e),
        }
    }
    Ok(())
}

async fn watch(db: &Database, config: &Config) -> anyhow::Result<()> {
    let period = Duration::from_secs(config.lifecycle.check_interval_secs);
    let mut ticker = tokio::time::interval(period);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("watching deadlines every {}s", period.as_secs());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = check_deadlines(db, config) {
                    error!("deadline check failed: {:#}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn create_league(db: &Database, config: &Config, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let draft: LeagueDraft =
        toml::from_str(&text).with_context(|| format!("failed to parse {}", file.display()))?;

    let (league, admin) = creation::create_league(db, draft, &config.scoring, Utc::now())
        .context("failed to create league")?;
    info!("league {} created by {}", league.id, admin.display_name);
    println!("{}", league.id);
    Ok(())
}

fn print_standings(db: &Database, league_id: Uuid, as_csv: bool) -> anyhow::Result<()> {
    let league = db.get_league(league_id).context("failed to load league")?;
    let players = db
        .list_players(&PlayerFilter::in_league(league_id), None)
        .context("failed to load players")?;
    let table = standings(&league, &players);

    if as_csv {
        write_csv(&table)
    } else {
        println!("{} ({})", league.name, league.status);
        println!(
            "{:<6} {:<24} {:>7} {:>6} {:>8} {:>5} {:>6}",
            "Rank", "Player", "Ranking", "Weekly", "LipSync", "Bonus", "Total"
        );
        for row in table.iter().map(StandingRow::from) {
            println!(
                "{:<6} {:<24} {:>7} {:>6} {:>8} {:>5} {:>6}",
                row.rank, row.player, row.ranking, row.weekly, row.lip_sync, row.bonus, row.total
            );
        }
        Ok(())
    }
}

fn write_csv(table: &[Standing]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for standing in table {
        writer
            .serialize(StandingRow::from(standing))
            .context("failed to write standings row")?;
    }
    writer.flush().context("failed to flush standings")?;
    Ok(())
}

fn print_history(db: &Database, league_id: Uuid) -> anyhow::Result<()> {
    let league = db.get_league(league_id).context("failed to load league")?;
    for entry in &league.history {
        println!("{entry}");
    }
    Ok(())
}

/// Initialize tracing to write to a log file (not stdout, which carries
/// command output).
fn init_tracing(base_dir: &Path, default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("dragleague.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
