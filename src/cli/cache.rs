//! `pixfall cache`: inspect and clean the offline stores on disk.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::cli::args::CacheAction;
use crate::cli::serve::build_worker;
use crate::config::PixConfig;
use crate::log;
use crate::logger::status_success;
use crate::offline::{CacheStorage, StoreNames};
use crate::utils::plural_count;

pub fn run_cache(action: CacheAction, config: &PixConfig) -> Result<()> {
    let storage = CacheStorage::new(config.cache_dir());
    let names = config.cache.store_names();

    match action {
        CacheAction::List => list(&storage, &names, config),
        CacheAction::Prune => prune(config),
        CacheAction::Clear => clear(&storage),
    }
}

fn list(storage: &CacheStorage, names: &StoreNames, config: &PixConfig) -> Result<()> {
    let keys = storage.keys().context("Failed to read cache stores")?;
    if keys.is_empty() {
        log!("cache"; "no stores in {}", config.root_relative(storage.root()).display());
        return Ok(());
    }

    for key in keys {
        let entries = storage
            .open(&key)
            .and_then(|store| store.entries())
            .with_context(|| format!("Failed to read store `{key}`"))?;
        let size: u64 = entries.iter().map(|e| e.size).sum();

        let state = if names.contains(&key) {
            "current".green().to_string()
        } else {
            "stale".yellow().to_string()
        };
        println!(
            "{}{}{} {} {}",
            "[".dimmed(),
            key.cyan(),
            "]".dimmed(),
            state,
            format!("({}, {})", plural_count(entries.len(), "response"), format_size(size)).dimmed()
        );
        for entry in &entries {
            println!(
                "  {} {} {}",
                entry.status,
                entry.url,
                format_size(entry.size).dimmed()
            );
        }
    }
    Ok(())
}

fn prune(config: &PixConfig) -> Result<()> {
    let deleted = build_worker(config)
        .activate()
        .context("Failed to prune cache stores")?;
    if deleted.is_empty() {
        status_success("no stale stores");
    } else {
        status_success(&format!(
            "removed {}: {}",
            plural_count(deleted.len(), "store"),
            deleted.join(", ")
        ));
    }
    Ok(())
}

fn clear(storage: &CacheStorage) -> Result<()> {
    let mut removed = 0;
    for key in storage.keys().context("Failed to read cache stores")? {
        if storage.delete(&key)? {
            removed += 1;
        }
    }
    status_success(&format!("removed {}", plural_count(removed, "store")));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
