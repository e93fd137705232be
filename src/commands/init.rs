//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sources::ImageFolder;
use crate::store::{ContentStore, StoreKind};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub stores: Vec<PathBuf>,
}

/// Write a default config and create the data directories and stores.
///
/// An existing config is only replaced with `force`. Existing stores are
/// kept; their schema is re-applied, which is a no-op.
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<InitReport> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }
    config.save()?;

    std::fs::create_dir_all(&config.paths.log_dir)?;
    std::fs::create_dir_all(config.paths.databases_dir())?;
    ImageFolder::from_config(&config).ensure_dirs()?;

    let mut stores = Vec::with_capacity(StoreKind::ALL.len());
    for kind in StoreKind::ALL {
        let store = ContentStore::open_kind(&config, kind).await?;
        store.close().await;
        let path = config.store_path(kind);
        info!("{} store ready at {:?}", kind, path);
        stores.push(path);
    }

    Ok(InitReport {
        base_dir: config.paths.base_dir.clone(),
        config_file: config.paths.config_file.clone(),
        data_dir: config.paths.data_dir.clone(),
        stores,
    })
}

pub fn print_init(report: &InitReport) {
    println!("✓ Initialized agentparl at {:?}", report.base_dir);
    println!("\nConfiguration: {:?}", report.config_file);
    println!("Data: {:?}", report.data_dir);
    for store in &report.stores {
        println!("  {}", store.display());
    }
    println!("\nNext steps:");
    println!(
        "  Put TELEGRAM_BOT_TOKEN, CHANNEL_ID and GEMINI_API_KEY in {:?}",
        report.base_dir.join(".env")
    );
    println!("  agentparl import quotes quotes.json   # Load quotes");
    println!("  agentparl feed-store                  # Collect tech news");
    println!("  agentparl quote                       # Post a quote");
}
