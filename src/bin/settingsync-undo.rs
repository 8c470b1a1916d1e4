// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! settingsync Undo Utility
//!
//! Writes journaled old values straight back into the store, without
//! binding any properties. Useful when the declared settings no longer
//! match what the journal recorded.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;

use settingsync::config::AppConfig;
use settingsync::journal::{Journal, JournalEntry};
use settingsync::store::{open_store, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "settingsync-undo")]
#[command(version)]
#[command(about = "Undo settingsync changes")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "settingsync.json")]
    config: PathBuf,

    /// Number of changes to undo (default: 1, use 0 for all)
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Dry run - show what would be undone without doing it
    #[arg(long)]
    dry_run: bool,

    /// List all entries in the journal
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading {:?}", args.config))?;
    let journal = Journal::new(PathBuf::from(&config.journal.path));

    if !journal.path().exists() {
        eprintln!("Journal not found: {:?}", journal.path());
        eprintln!("No changes to undo.");
        return Ok(());
    }

    let entries = journal.read_all()?;
    if entries.is_empty() {
        println!("No journal entries found.");
        return Ok(());
    }

    if args.list {
        println!("Change journal ({} entries):", entries.len());
        println!("{:-<80}", "");
        for (i, entry) in entries.iter().rev().enumerate() {
            println!(
                "{:3}. [{}] {}: {} -> {}{}",
                i + 1,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.key,
                entry.old_value,
                entry.new_value,
                if entry.undone { " (undone)" } else { "" }
            );
        }
        return Ok(());
    }

    // Most recent first
    let pending: Vec<_> = entries.into_iter().rev().filter(|e| !e.undone).collect();
    let count = if args.count == 0 {
        pending.len()
    } else {
        args.count.min(pending.len())
    };

    println!(
        "{}Undoing {} change(s)...",
        if args.dry_run { "[DRY RUN] " } else { "" },
        count
    );

    let store = open_store(&config.store)?;
    let mut undone = 0;
    for entry in pending.iter().take(count) {
        if args.dry_run {
            println!("  Would set {} = {}", entry.key, entry.old_value);
            continue;
        }
        restore(&mut *store.borrow_mut(), entry);
        let status = store.borrow().status();
        if !status.is_ok() {
            bail!("store reported {} while restoring \"{}\"", status, entry.key);
        }
        journal.mark_undone(&entry.id)?;
        println!("  Undone: {} = {}", entry.key, entry.old_value);
        undone += 1;
    }

    if !args.dry_run {
        store.borrow_mut().sync()?;
        println!();
        println!("Done. {} undone.", undone);
    }

    Ok(())
}

/// Put the value from before `entry` back into the store
fn restore(store: &mut dyn SettingsStore, entry: &JournalEntry) {
    // Not stored before the change
    if entry.old_value.is_valid() {
        store.set_value(&entry.key, entry.old_value.clone());
    } else {
        store.remove(&entry.key);
    }
}
