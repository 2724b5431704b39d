//! autoschema CLI
//!
//! Reconciles a SQLite database against a JSON declaration manifest.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use autoschema_core::prelude::*;
use autoschema_sqlite::SqliteDriver;

/// Keep SQLite tables in line with declared schemas.
#[derive(Parser)]
#[command(name = "autoschema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Declaration manifest.
    #[arg(short, long, env = "AUTOSCHEMA_MANIFEST", default_value = "autoschema.json")]
    manifest: PathBuf,

    /// Identifier limit for generated index names.
    #[arg(long)]
    max_identifier_length: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every entity, or a single one.
    Upgrade {
        /// Entity to reconcile (all if not specified).
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Show the SQL an upgrade would run, without executing it.
    Plan {
        /// Entity to plan (all if not specified).
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Show the live columns and indexes of a table.
    Inspect {
        /// Table name.
        table: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn load_registry(path: &Path) -> anyhow::Result<SchemaRegistry> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    Ok(Manifest::from_json(&json)?.into_registry()?)
}

/// One entity per table: siblings share the same merged plan.
fn plan_targets(registry: &SchemaRegistry, entity: Option<String>) -> Vec<String> {
    match entity {
        Some(entity) => vec![entity],
        None => registry
            .tables()
            .into_iter()
            .filter_map(|table| registry.group(table).first().map(|e| e.name.clone()))
            .collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut driver = SqliteDriver::connect(&cli.database)
        .await
        .with_context(|| format!("failed to open {}", cli.database))?;
    if let Some(length) = cli.max_identifier_length {
        driver = driver.with_max_identifier_length(length);
    }
    let reconciler = Reconciler::new(driver);

    match cli.command {
        Commands::Upgrade { entity } => {
            let registry = load_registry(&cli.manifest)?;
            let results = match entity {
                Some(entity) => {
                    let result = reconciler.auto_upgrade(&registry, &entity).await;
                    vec![(entity, result)]
                }
                None => reconciler.auto_upgrade_all(&registry).await,
            };

            let mut failed = 0;
            for (entity, result) in results {
                match result {
                    Ok(report) if report.is_noop() => {
                        info!(entity = %entity, table = %report.table, "Up to date");
                    }
                    Ok(report) => {
                        for operation in &report.operations {
                            println!("{}: {operation}", report.entity);
                        }
                    }
                    Err(err) => {
                        error!(entity = %entity, error = %err, "Reconciliation failed");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} entities failed to reconcile");
            }
        }

        Commands::Plan { entity } => {
            let registry = load_registry(&cli.manifest)?;
            let dialect = reconciler.driver().dialect();
            for entity in plan_targets(&registry, entity) {
                let operations = reconciler.plan(&registry, &entity).await?;
                if operations.is_empty() {
                    info!(entity = %entity, "Up to date");
                    continue;
                }
                println!("-- {entity}");
                for operation in &operations {
                    for sql in dialect.generate_sql(operation) {
                        println!("{sql};");
                    }
                }
            }
        }

        Commands::Inspect { table, json } => {
            let Some(live) = reconciler.live_schema(&table).await? else {
                bail!("table '{table}' does not exist");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&live)?);
            } else {
                let dialect = reconciler.driver().dialect();
                println!("\n{table}");
                println!("{:-<60}", "");
                for column in &live.columns {
                    let key = if live.primary_key.as_deref() == Some(column.name.as_str()) {
                        " PRIMARY KEY"
                    } else {
                        ""
                    };
                    println!(" {}{key}", dialect.column_definition(column));
                }
                for index in &live.indexes {
                    println!(
                        " {}INDEX {} ({})",
                        if index.unique { "UNIQUE " } else { "" },
                        index.name.as_deref().unwrap_or_default(),
                        index.columns.join(", ")
                    );
                }
                println!();
            }
        }
    }

    Ok(())
}
