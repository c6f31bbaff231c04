//! notebase-setup: provision the database resources the notes service needs.
//!
//! Ensures a database, a database-scoped key, the sample and notes
//! collections and their indexes exist, then seeds and reads back four
//! sample records. Safe to re-run.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notebase_core::defaults;
use notebase_db::provision::{self, KeyOutcome, KeyPolicy, ProvisionConfig};
use notebase_db::{FaunaClient, FaunaConfig};

#[derive(Parser)]
#[command(name = "notebase-setup")]
#[command(author, version, about = "Provision the notebase database")]
struct Cli {
    /// Database to create
    #[arg(long, default_value = defaults::SETUP_DATABASE)]
    database: String,

    /// Collection that receives the sample records
    #[arg(long, default_value = defaults::SAMPLE_COLLECTION)]
    collection: String,

    /// Unique index over the sample records' `id`
    #[arg(long, default_value = defaults::SAMPLE_INDEX)]
    index: String,

    /// Collection used by the notes service
    #[arg(long, default_value = defaults::NOTES_COLLECTION)]
    notes_collection: String,

    /// Listing index used by the notes service
    #[arg(long, default_value = defaults::NOTES_INDEX)]
    notes_index: String,

    /// rotate: revoke keys minted by earlier runs; mint: keep them
    #[arg(long, default_value_t = KeyPolicy::Rotate)]
    key_policy: KeyPolicy,

    /// Existing database-scoped secret to reuse instead of minting a key
    #[arg(long, env = "FAUNA_DB_SECRET", hide_env_values = true)]
    db_secret: Option<String>,

    /// Skip inserting and reading back the sample records
    #[arg(long)]
    skip_samples: bool,
}

impl Cli {
    fn provision_config(self) -> ProvisionConfig {
        ProvisionConfig {
            database: self.database,
            sample_collection: self.collection,
            sample_index: self.index,
            notes_collection: self.notes_collection,
            notes_index: self.notes_index,
            key_policy: self.key_policy,
            reuse_secret: self.db_secret.filter(|s| !s.trim().is_empty()),
            seed_samples: !self.skip_samples,
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notebase_db=info,notebase_setup=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn admin_config() -> notebase_core::Result<FaunaConfig> {
    let secret = std::env::var("FAUNA_ADMIN_SECRET")
        .or_else(|_| std::env::var("FAUNA_SECRET"))
        .map_err(|_| notebase_core::Error::Config("FAUNA_ADMIN_SECRET is not set".to_string()))?;
    FaunaConfig::from_env_with_secret(secret)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Cli::parse().provision_config();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Provisioning aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProvisionConfig) -> anyhow::Result<()> {
    let admin = FaunaClient::new(admin_config()?)?;
    let report = provision::run(&admin, &config).await?;

    for (name, outcome) in report.collections.iter().chain(report.indexes.iter()) {
        info!(resource = %name, reference = %outcome.reference(), created = outcome.created(), "resource ready");
    }
    for sample in &report.read_by_ref {
        info!(id = sample.id, name = %sample.name, "sample stored");
    }
    for sample in &report.read_back {
        info!(id = sample.id, name = %sample.name, "sample available");
    }

    if let KeyOutcome::Minted { key, revoked } = &report.key {
        info!(key = %key, revoked = revoked.len(), "database key issued");
    }
    if let Some(secret) = &report.minted_secret {
        // Shown once: the database never returns a key's secret again.
        println!("FAUNA_SECRET={}", secret);
    }

    Ok(())
}
