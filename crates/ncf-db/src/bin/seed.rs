//! # Seed Data Generator
//!
//! Populates the database with the standard NCF types, one sequence per
//! type and the ITBIS tax, for development.
//!
//! ## Usage
//! ```bash
//! # Sequences 1..=1000 (default)
//! cargo run -p ncf-db --bin seed
//!
//! # Larger ranges
//! cargo run -p ncf-db --bin seed -- --count 50000
//!
//! # Specify database path
//! cargo run -p ncf-db --bin seed -- --db ./data/ncf.db
//! ```
//!
//! Types that already exist (by code) are skipped, so running the seeder
//! twice is harmless.

use std::env;
use std::path::PathBuf;

use ncf_db::{AppConfig, Database, DbResult};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Standard DGII types: code, name, requires RNC.
const DOCUMENT_TYPES: &[(&str, &str, bool)] = &[
    ("B01", "Crédito Fiscal", true),
    ("B02", "Consumidor Final", false),
    ("B14", "Regímenes Especiales", true),
    ("B15", "Gubernamentales", true),
];

const DEFAULT_COUNT: i64 = 1000;

const ITBIS_TAX_NAME: &str = "ITBIS 18%";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ncf=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("NCF Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Last number of each sequence (default: 1000)");
                println!("  -d, --db <PATH>      Database file path (default: from config)");
                println!("      --config <PATH>  Config file path");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if db_path.is_some() {
        config.database.path = db_path;
    }

    let db = Database::new(config.db_config()?).await?;
    info!("Connected to database, migrations applied");

    let created = seed_types(&db, count).await?;

    let taxes = db.taxes().list().await?;
    if !taxes.iter().any(|t| t.name == ITBIS_TAX_NAME) {
        db.taxes()
            .insert(ITBIS_TAX_NAME, db.settings().itbis_standard_rate_bps)
            .await?;
    }

    info!(types = created, "Seed complete");
    db.close().await;

    Ok(())
}

/// Inserts each missing type with a sequence `1..=count`. Returns how many
/// types were created.
async fn seed_types(db: &Database, count: i64) -> DbResult<usize> {
    let mut created = 0;

    for (code, name, requires_rnc) in DOCUMENT_TYPES {
        if db.document_types().get_by_code(code).await?.is_some() {
            info!(code, "Type already exists, skipping");
            continue;
        }

        let doc_type = db.document_types().insert(code, name, *requires_rnc).await?;
        let sequence = db
            .sequences()
            .insert(
                &doc_type.id,
                &format!("{} 1-{}", code, count),
                1,
                count,
                None,
            )
            .await?;

        info!(code, sequence = %sequence.name, "Seeded type");
        created += 1;
    }

    Ok(created)
}
