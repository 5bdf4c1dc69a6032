//! wastectl - detection record store tooling
//!
//! Store-facing operations the dashboard relies on: list records, aggregate
//! per-label counts, delete one record or everything (artifacts included),
//! and export a record's image.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use wastewatch::{DeleteOutcome, DetectionLog, DirArtifactStore, SqliteRecordStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the detection database.
    #[arg(long, env = "WASTEWATCH_DB_PATH", default_value = "wastewatch.db")]
    db_path: String,
    /// Artifact directory.
    #[arg(long, env = "WASTEWATCH_ARTIFACT_DIR", default_value = "artifacts")]
    artifact_dir: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all detection records, newest first.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show total and per-label detection counts.
    Summary,
    /// Delete one record and its image.
    Delete { id: i64 },
    /// Delete every record and every stored image.
    DeleteAll,
    /// Write a record's image to a local file.
    ExportImage {
        id: i64,
        /// Output file path.
        #[arg(long)]
        output: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let store = SqliteRecordStore::open(&args.db_path)?;
    let artifacts = DirArtifactStore::open(&args.artifact_dir)?;
    let mut log = DetectionLog::new(Box::new(store), Box::new(artifacts));

    match args.command {
        Command::List { json } => {
            let records = log.list_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no detections recorded");
            } else {
                for record in records {
                    println!(
                        "{:>6}  {}  {:<16} {:>6.2}%  {}",
                        record.id,
                        record.captured_at,
                        record.label,
                        record.confidence * 100.0,
                        record.artifact
                    );
                }
            }
        }
        Command::Summary => {
            let summary = log.summary()?;
            println!("total detections: {}", summary.total);
            for (label, count) in &summary.per_label {
                println!("{:<16} {}", label, count);
            }
        }
        Command::Delete { id } => match log.delete(id)? {
            DeleteOutcome::Deleted => println!("deleted record {}", id),
            DeleteOutcome::NotFound => println!("record {} not found", id),
        },
        Command::DeleteAll => {
            let removed = log.delete_all()?;
            println!("deleted {} record(s)", removed);
        }
        Command::ExportImage { id, output } => {
            let record = log
                .get(id)?
                .ok_or_else(|| anyhow!("record {} not found", id))?;
            let bytes = log.artifacts().read(&record.artifact)?;
            std::fs::write(&output, bytes)?;
            println!("wrote {} ({})", output, record.artifact);
        }
    }
    Ok(())
}
