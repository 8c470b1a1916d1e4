// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! settingsync: inspect and edit persisted settings from the command line
//!
//! Declared settings (from the configuration file) are bound to the
//! configured store through a settings panel, so every edit made here goes
//! through the same commit, notify and journal path a host application uses.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};

use settingsync::config::{AppConfig, StoreBackend};
use settingsync::journal::Journal;
use settingsync::module_paths::ModulePathBuilder;
use settingsync::session::Session;
use settingsync::store;
use settingsync::watcher::{StoreWatcher, WatchEvent};
use settingsync::{Result, SettingOptions, SettingsError, Value};

/// settingsync CLI - persisted settings bound to live properties
#[derive(Parser, Debug)]
#[command(name = "settingsync")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Inspect and edit persisted settings", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "settingsync.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every declared setting with its current and default value
    List,

    /// Print the current value of a setting
    Get {
        key: String,
    },

    /// Commit a new value for a setting
    Set {
        key: String,
        value: String,
    },

    /// Show settings whose value differs from the declared default
    Changed,

    /// Restore every setting to its declared default
    ResetDefaults {
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Watch the settings file and report external edits
    Watch,

    /// Print the command-line module search paths
    Paths {
        /// Include the directory named by the module load path variable
        #[arg(long)]
        load_path: bool,

        /// Include the home directory
        #[arg(long)]
        home: bool,

        /// Include the current directory
        #[arg(long)]
        cwd: bool,

        /// Include the application directory
        #[arg(long)]
        app: bool,
    },

    /// Export the raw store contents to JSON
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Change journal operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Write a starter configuration
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent changes
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Revert recent changes
    Undo {
        /// Number of changes to revert
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be reverted)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear the journal
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "settingsync.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Some(Commands::List) | None => run_list(config, json),
        Some(Commands::Get { key }) => run_get(config, &key, json),
        Some(Commands::Set { key, value }) => run_set(config, &key, &value, cli.quiet),
        Some(Commands::Changed) => run_changed(config, json),
        Some(Commands::ResetDefaults { force }) => run_reset_defaults(config, force),
        Some(Commands::Watch) => run_watch(config).await,
        Some(Commands::Paths { load_path, home, cwd, app }) => {
            run_paths(config, load_path, home, cwd, app, json)
        }
        Some(Commands::Export { output }) => run_export(config, &output),
        Some(Commands::History { action }) => run_history_command(config, action),
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Init { dir, force }) => run_init(dir, force),
    }
}

fn setting_json(session: &Session, key: &str) -> serde_json::Value {
    serde_json::json!({
        "key": key,
        "label": session.panel.setting_label(key),
        "value": session.panel.property_value(key),
        "default": session.panel.default_property_value(key),
        "require_restart": session
            .panel
            .setting_options(key)
            .contains(SettingOptions::REQUIRE_RESTART),
    })
}

/// List declared settings
fn run_list(config: AppConfig, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    let keys = session.panel.keys();

    if json {
        let output: Vec<_> = keys.iter().map(|k| setting_json(&session, k)).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for key in keys {
        let value = session.panel.property_value(&key);
        let default = session.panel.default_property_value(&key);
        let marker = if value != default { "*" } else { " " };
        let restart = if session
            .panel
            .setting_options(&key)
            .contains(SettingOptions::REQUIRE_RESTART)
        {
            " (restart)"
        } else {
            ""
        };
        println!(
            "{} {:<24} {:<20} default: {}{}",
            marker, key, value, default, restart
        );
        let label = session.panel.setting_label(&key);
        if !label.is_empty() {
            println!("    {}", label);
        }
    }
    Ok(())
}

fn run_get(config: AppConfig, key: &str, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    if !session.panel.contains(key) {
        return Err(SettingsError::UnknownKey(key.to_string()));
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&setting_json(&session, key))?);
    } else {
        println!("{}", session.panel.property_value(key));
    }
    Ok(())
}

fn run_set(config: AppConfig, key: &str, input: &str, quiet: bool) -> Result<()> {
    let session = Session::open(config)?;
    let before = session.panel.property_value(key);
    let value = session.set_from_str(key, input)?;
    session.sync()?;

    let status = session.store.borrow().status();
    if !status.is_ok() {
        warn!("Store reported {} after writing \"{}\"", status, key);
    }
    if !quiet {
        if before == value {
            println!("{} unchanged ({})", key, value);
        } else {
            println!("{}: {} -> {}", key, before, value);
        }
        if session
            .panel
            .setting_options(key)
            .contains(SettingOptions::REQUIRE_RESTART)
        {
            println!("Note: restart required for \"{}\" to take effect", key);
        }
    }
    Ok(())
}

fn run_changed(config: AppConfig, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    let changed: Vec<String> = session
        .panel
        .keys()
        .into_iter()
        .filter(|k| session.panel.property_value(k) != session.panel.default_property_value(k))
        .collect();

    if json {
        let output: Vec<_> = changed.iter().map(|k| setting_json(&session, k)).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if changed.is_empty() {
        println!("All settings at their defaults");
    } else {
        for key in changed {
            println!(
                "{}: {} (default {})",
                key,
                session.panel.property_value(&key),
                session.panel.default_property_value(&key)
            );
        }
    }
    Ok(())
}

fn run_reset_defaults(config: AppConfig, force: bool) -> Result<()> {
    if !force {
        eprintln!("Use --force to confirm restoring all defaults");
        return Ok(());
    }
    let session = Session::open(config)?;
    session.panel.restore_default_settings();
    session.sync()?;
    println!("Restored {} settings to their defaults", session.panel.keys().len());
    Ok(())
}

/// Follow the settings file and push external edits onto the bound
/// properties
async fn run_watch(config: AppConfig) -> Result<()> {
    if config.store.backend != StoreBackend::Json {
        return Err(SettingsError::Config(
            "watch requires the json store backend".to_string(),
        ));
    }
    let path = PathBuf::from(&config.store.path);
    let session = Session::open(config)?;
    let mut watcher = StoreWatcher::new(&path)?;
    info!("Press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = watcher.next_event() => {
                match event {
                    Some(WatchEvent::Modified(_)) => reload_session(&session),
                    Some(WatchEvent::Removed(p)) => warn!("Settings file removed: {:?}", p),
                    Some(WatchEvent::Error(e)) => warn!("Watch error: {}", e),
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn reload_session(session: &Session) {
    let keys = session.panel.keys();
    let before: Vec<Value> = keys.iter().map(|k| session.panel.property_value(k)).collect();

    if let Err(e) = session.store.borrow_mut().reload() {
        warn!("Failed to reload settings: {}", e);
        return;
    }
    let status = session.store.borrow().status();
    if !status.is_ok() {
        warn!("Ignoring unreadable settings file ({})", status);
        return;
    }
    session.panel.update_properties();

    for (key, old) in keys.iter().zip(before) {
        let new = session.panel.property_value(key);
        if new != old {
            println!("{}: {} -> {}", key, old, new);
        }
    }
}

fn run_paths(
    config: AppConfig,
    load_path: bool,
    home: bool,
    cwd: bool,
    app: bool,
    json: bool,
) -> Result<()> {
    let mut builder = ModulePathBuilder::from_config(&config.modules);
    // Flags add to the configured sources
    if load_path {
        builder.set_load_from_module_load_path(true);
    }
    if home {
        builder.set_load_from_home_dir(true);
    }
    if cwd {
        builder.set_load_from_current_dir(true);
    }
    if app {
        builder.set_load_from_application_dir(true);
    }

    let paths = builder.build();
    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else if paths.is_empty() {
        println!("No module search paths (enable sources with --load-path/--home/--cwd/--app)");
    } else {
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn run_export(config: AppConfig, output: &Path) -> Result<()> {
    let store = store::open_store(&config.store)?;
    let snapshot = store::export(&*store.borrow());
    std::fs::write(output, serde_json::to_string_pretty(&snapshot)?)?;
    println!("Exported {} settings to {:?}", snapshot.len(), output);
    Ok(())
}

/// Run journal commands
fn run_history_command(config: AppConfig, action: HistoryCommands) -> Result<()> {
    let journal = Journal::new(PathBuf::from(&config.journal.path));

    match action {
        HistoryCommands::List { count } => {
            let entries = journal.recent(count)?;
            println!("Recent changes ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!(
                    "  {} {}: {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.key,
                    entry.old_value,
                    entry.new_value,
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let entries = journal.undoable()?;
            let to_undo: Vec<_> = entries.into_iter().rev().take(count).collect();

            if to_undo.is_empty() {
                println!("No changes to undo");
                return Ok(());
            }

            // Reverts are not journaled themselves
            let mut config = config;
            config.journal.enabled = false;
            let session = Session::open(config)?;
            let mut touched = BTreeSet::new();

            for entry in to_undo {
                if !session.panel.contains(&entry.key) {
                    warn!("Skipping change of undeclared setting \"{}\"", entry.key);
                    continue;
                }
                if dry_run {
                    println!("Would revert {}: {} -> {}", entry.key, entry.new_value, entry.old_value);
                } else {
                    // Not stored before the change: fall back to the default
                    let target = if entry.old_value.is_valid() {
                        entry.old_value.clone()
                    } else {
                        session.panel.default_property_value(&entry.key)
                    };
                    session.panel.set_setting(&entry.key, target);
                    journal.mark_undone(&entry.id)?;
                    touched.insert(entry.key.clone());
                    println!("Reverted {}: {} -> {}", entry.key, entry.new_value, entry.old_value);
                }
            }
            if !touched.is_empty() {
                session.sync()?;
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            journal.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Store: {:?} at {}", config.store.backend, config.store.path);
            println!("  Settings: {}", config.settings.len());
            println!(
                "  Journal: {}",
                if config.journal.enabled { config.journal.path.as_str() } else { "disabled" }
            );
        }
    }

    Ok(())
}

/// Initialize a starter configuration
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("settingsync.json");

    if config_path.exists() && !force {
        return Err(SettingsError::Config(
            "settingsync.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    std::fs::create_dir_all(&target)?;
    let mut config = AppConfig::default();
    config.store.path = target.join("settings.json").to_string_lossy().to_string();
    config.journal.path = target
        .join("settingsync_journal.jsonl")
        .to_string_lossy()
        .to_string();
    config.save(&config_path)?;

    println!("settingsync initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - settingsync.json");
    println!("\nNext steps:");
    println!("  1. Declare your settings in settingsync.json");
    println!("  2. Inspect them: settingsync list");

    Ok(())
}
