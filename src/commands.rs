/// One-shot commands over the stored fight history.
///
/// These run without the feed pipeline. They open the database directly,
/// which is safe next to a running tracker because SQLite is in WAL mode.
use crate::{
    config::AppConfig,
    db,
    display::TotalsSnapshot,
    history::FightHistory,
};
use anyhow::Result;
use std::path::Path;

/// Merge fights from a JSON export into the database. Returns how many were new.
pub fn import_history(data_dir: &Path, file: &Path) -> Result<usize> {
    let db_path = data_dir.join(db::DB_FILE);
    let mut history = FightHistory::from_records(db::load_recent(&db_path, 0)?, 0);

    let added = history.import_file(file)?;
    db::insert_fights(&db_path, &added)?;
    tracing::info!("Imported {} fights from {}", added.len(), file.display());
    Ok(added.len())
}

/// Write the most recent fights (bounded by the history limit) to `file`.
pub fn export_history(data_dir: &Path, config: &AppConfig, file: &Path) -> Result<usize> {
    let history = load(data_dir, config)?;
    history.export_file(file)?;
    tracing::info!("Exported {} fights to {}", history.len(), file.display());
    Ok(history.len())
}

pub fn history_totals(data_dir: &Path, config: &AppConfig) -> Result<Option<TotalsSnapshot>> {
    let history = load(data_dir, config)?;
    Ok(history.totals().as_ref().map(TotalsSnapshot::from_totals))
}

fn load(data_dir: &Path, config: &AppConfig) -> Result<FightHistory> {
    let limit = config.fight_history_limit;
    let records = db::load_recent(&data_dir.join(db::DB_FILE), limit)?;
    Ok(FightHistory::from_records(records, limit))
}
