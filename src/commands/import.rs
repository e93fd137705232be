//! import command: load candidates from a JSON file into a store

use crate::config::Config;
use crate::error::Result;
use crate::logging::add_progress_bar;
use crate::sources::import::parse_import;
use crate::store::{ContentStore, InsertOutcome, ItemStore, NewItem, StoreKind};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ImportStats {
    pub kind: StoreKind,
    pub records: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

pub async fn cmd_import(config: &Config, kind: StoreKind, file: &Path) -> Result<ImportStats> {
    let json = std::fs::read_to_string(file)?;
    let items = parse_import(&json, kind.content_type())?;
    info!("Importing {} records from {:?} into {}", items.len(), file, kind);

    let store = ContentStore::open_kind(config, kind).await?;
    let result = insert_all(&store, kind, &items).await;
    store.close().await;
    result
}

async fn insert_all(
    store: &dyn ItemStore,
    kind: StoreKind,
    items: &[NewItem],
) -> Result<ImportStats> {
    let mut stats = ImportStats {
        kind,
        records: items.len(),
        inserted: 0,
        duplicates: 0,
    };
    let pb = add_progress_bar(items.len() as u64);
    for item in items {
        match store.insert(item).await? {
            InsertOutcome::Inserted(_) => stats.inserted += 1,
            InsertOutcome::Duplicate => stats.duplicates += 1,
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(stats)
}

pub fn print_import_stats(stats: &ImportStats) {
    println!("\n✓ Import into {} complete", stats.kind);
    println!("  Records: {}", stats.records);
    println!("  Inserted: {}", stats.inserted);
    println!("  Duplicates skipped: {}", stats.duplicates);
}
