//! pkvault command-line interface
//!
//! ## Usage
//!
//! ```bash
//! # Back up a record file
//! pkvault save ./0025.pk7
//!
//! # List backups
//! pkvault list --json
//!
//! # Restore into a directory box, converting if needed
//! pkvault restore <id> --container ./box1 --format pk7
//!
//! # Integrity and orphan checks
//! pkvault verify
//! pkvault reconcile
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pkvault::record::{BasicCodec, DefaultNamer, StrictConverter};
use pkvault::repository::parse_id;
use pkvault::{
    BackupRepository, Config, DirectoryContainer, Integrity, RecordCodec, RecordFormat,
    Restorer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pkvault")]
#[command(about = "Content-addressed backup vault for creature records")]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = "PKVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory (overrides config file)
    #[arg(long, env = "PKVAULT_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Back up a record file
    Save {
        /// Record file; its extension selects the format
        file: PathBuf,
    },

    /// List all backups
    List {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a backed-up record to a file
    Export {
        id: String,
        out: PathBuf,
    },

    /// Delete a backup
    Delete { id: String },

    /// Restore a backup into a directory container
    Restore {
        id: String,

        /// Container directory
        #[arg(long)]
        container: PathBuf,

        /// Record format of the container (defaults to the backup's own)
        #[arg(long)]
        format: Option<String>,

        /// Slot count of the container (overrides config file)
        #[arg(long)]
        slots: Option<usize>,
    },

    /// Check stored payloads against their fingerprints
    Verify {
        /// Only check this backup
        id: Option<String>,
    },

    /// Remove orphaned payload and metadata rows
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pkvault=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let repo = Arc::new(BackupRepository::open(&config, BasicCodec, DefaultNamer).await?);

    match cli.command {
        Command::Save { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let ext = file
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            let Some(record) = repo.codec().parse(&bytes, &ext, None) else {
                bail!("{} is not a supported record file", file.display());
            };

            let entry = repo.save(Some(record)).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }

        Command::List { json } => {
            let mut entries = repo.list().await?;
            entries.sort_by_key(|e| e.created_utc);

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    println!(
                        "{}  {:<24} {:<16} {}  {}",
                        entry.id,
                        entry.file_name,
                        entry.species_name,
                        entry.created_utc,
                        &entry.sha256[..entry.sha256.len().min(12)]
                    );
                }
                println!("{} backup(s)", entries.len());
            }
        }

        Command::Export { id, out } => {
            let id = parse_id(&id)?;
            let Some(record) = repo.fetch(id).await? else {
                bail!("backup {} not found", id);
            };
            let Some(bytes) = repo.codec().serialize(&record) else {
                bail!("backup {} has no payload", id);
            };
            tokio::fs::write(&out, bytes).await?;
            println!("wrote {}", out.display());
        }

        Command::Delete { id } => {
            let id = parse_id(&id)?;
            repo.delete(id).await?;
            println!("deleted {}", id);
        }

        Command::Restore {
            id,
            container,
            format,
            slots,
        } => {
            let id = parse_id(&id)?;
            let format = match format {
                Some(f) => RecordFormat::from_extension(&f)
                    .with_context(|| format!("unknown record format {}", f))?,
                None => repo
                    .get_entry(id)
                    .await?
                    .and_then(|e| RecordFormat::from_extension(&e.extension))
                    .with_context(|| format!("backup {} not found", id))?,
            };

            let mut target = DirectoryContainer::open(
                &container,
                format,
                slots.unwrap_or(config.container_slots),
                BasicCodec,
            )?;
            let restorer = Restorer::new(repo.clone(), StrictConverter);
            let outcome = restorer.restore(id, Some(&mut target)).await?;
            println!(
                "restored {} to {}",
                id,
                target.slot_path(outcome.slot).display()
            );
        }

        Command::Verify { id } => {
            let ids = match id {
                Some(id) => vec![parse_id(&id)?],
                None => repo.list().await?.into_iter().map(|e| e.id).collect(),
            };

            let mut failures = 0;
            for id in ids {
                let integrity = repo.verify(id).await?;
                if integrity != Integrity::Intact {
                    failures += 1;
                }
                println!("{}  {:?}", id, integrity);
            }
            if failures > 0 {
                bail!("{} backup(s) failed verification", failures);
            }
        }

        Command::Reconcile => {
            let report = repo.reconcile().await?;
            for key in &report.payload_orphans {
                println!("removed payload without descriptor: {}", key);
            }
            for key in &report.metadata_orphans {
                println!("removed descriptor without payload: {}", key);
            }
            println!("{} orphan(s) removed", report.removed());
        }
    }

    Ok(())
}
