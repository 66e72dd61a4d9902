pub mod calc;
pub mod commands;
pub mod config;
pub mod db;
pub mod display;
pub mod engine;
pub mod equipment;
pub mod error;
pub mod fight;
pub mod fighter;
pub mod history;
pub mod overlay;
pub mod parser;
pub mod roster;
pub mod style;
pub mod tailer;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// `PVP_TRACKER_DIR`, else `<APPDATA or HOME>/pvp-performance-tracker`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PVP_TRACKER_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("APPDATA")
        .or_else(|_| std::env::var("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
        .join("pvp-performance-tracker")
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Tail the combat feed until Ctrl-C or until the feed stops.
pub fn run() -> Result<()> {
    let data_dir = data_dir();
    let cfg = startup(&data_dir)?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(pipeline(cfg, &data_dir));
    // The tailer's blocking thread notices the closed channel within a second.
    rt.shutdown_timeout(Duration::from_secs(2));

    if let Err(e) = &result {
        tracing::error!("Pipeline failed: {:#}", e);
    }
    tracing::info!("PvP Performance Tracker stopped");
    result
}

pub fn import(file: &Path) -> Result<()> {
    let data_dir = data_dir();
    startup(&data_dir)?;
    let added = commands::import_history(&data_dir, file)?;
    println!("Imported {} new fights from {}", added, file.display());
    Ok(())
}

pub fn export(file: &Path) -> Result<()> {
    let data_dir = data_dir();
    let cfg = startup(&data_dir)?;
    let written = commands::export_history(&data_dir, &cfg, file)?;
    println!("Exported {} fights to {}", written, file.display());
    Ok(())
}

pub fn totals() -> Result<()> {
    let data_dir = data_dir();
    let cfg = startup(&data_dir)?;
    match commands::history_totals(&data_dir, &cfg)? {
        Some(totals) => print!("{}", totals.summary()),
        None => println!("No fights recorded yet"),
    }
    Ok(())
}

fn startup(data_dir: &Path) -> Result<config::AppConfig> {
    let log_dir = data_dir.join("logs");
    init_logging(&log_dir)?;
    tracing::info!(
        "PvP Performance Tracker {} (logs in {})",
        env!("CARGO_PKG_VERSION"),
        log_dir.display(),
    );
    load_config(data_dir)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Daily `tracker.log` files in `log_dir`, and panics routed through tracing.
fn init_logging(log_dir: &Path) -> Result<()> {
    let _ = std::fs::create_dir_all(log_dir);

    let appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flush thread must outlive every log call.
    std::mem::forget(guard);

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("pvp_tracker_lib=debug".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map_or_else(|| "?".to_owned(), |l| format!("{}:{}", l.file(), l.line()));
        tracing::error!(%location, "panic: {}", panic_message(info.payload()));
    }));
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// First run writes the defaults so there is a file to edit.
fn load_config(data_dir: &Path) -> Result<config::AppConfig> {
    let mut cfg = config::load_or_default(data_dir)?;
    if !data_dir.join(config::CONFIG_FILE).exists() {
        if let Err(e) = config::save(&cfg, data_dir) {
            tracing::warn!("Could not write default config: {}", e);
        }
    }
    if cfg.feed_path.as_os_str().is_empty() {
        cfg.feed_path = data_dir.join("feed.jsonl");
    }
    Ok(cfg)
}

// ---------------------------------------------------------------------------
// Pipeline: tailer → parser → engine → history / overlay
// ---------------------------------------------------------------------------

async fn pipeline(cfg: config::AppConfig, data_dir: &Path) -> Result<()> {
    let (raw_tx, raw_rx)       = mpsc::channel::<String>(2048);
    let (event_tx, event_rx)   = mpsc::channel::<parser::FeedEvent>(1024);
    let (record_tx, record_rx) = mpsc::channel::<fight::FightRecord>(16);
    let (snap_tx, snap_rx)     = mpsc::channel::<display::FightSnapshot>(128);

    let db_path = data_dir.join(db::DB_FILE);
    let db_writer = db::spawn_db_writer(&db_path)?;

    let limit = cfg.fight_history_limit;
    let past = db::load_recent(&db_path, limit).unwrap_or_else(|e| {
        tracing::warn!("Could not load fight history: {}", e);
        Vec::new()
    });
    tracing::info!("Loaded {} past fights", past.len());
    let history = history::FightHistory::from_records(past, limit);

    let (totals_tx, totals_rx) = watch::channel(history.totals());
    let overlay_path = data_dir.join(overlay::OVERLAY_FILE);

    let mut tailer_task = tokio::spawn(tailer::run(cfg.feed_path.clone(), raw_tx));
    let parser_task     = tokio::spawn(parser::run(raw_rx, event_tx));
    let engine_task     = tokio::spawn(engine::run(event_rx, record_tx, snap_tx, cfg));
    let history_task    = tokio::spawn(history::run(record_rx, db_writer, history, totals_tx));
    let overlay_task    = tokio::spawn(overlay::run(snap_rx, totals_rx, overlay_path));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
        res = &mut tailer_task => {
            match res {
                Ok(Ok(())) => tracing::info!("Tailer finished"),
                Ok(Err(e)) => tracing::warn!("Tailer stopped: {:#}", e),
                Err(e)     => tracing::warn!("Tailer task failed: {}", e),
            }
        }
    }

    // Aborting the parser closes the feed. The engine then flushes any open
    // fight, history stores it, and the overlay writes the final state.
    parser_task.abort();
    engine_task.await??;
    history_task.await??;
    overlay_task.await??;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn panic_payloads_are_readable() {
        let literal: Box<dyn std::any::Any + Send> = Box::new("boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn first_run_writes_config_with_feed_default() {
        let dir = tempdir().unwrap();
        let cfg = load_config(dir.path()).unwrap();
        assert!(dir.path().join(config::CONFIG_FILE).exists());
        assert_eq!(cfg.feed_path, dir.path().join("feed.jsonl"));
        assert_eq!(cfg.fight_timeout_secs, 21);
    }
}
