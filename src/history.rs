/// Finished fights: an in-memory, chronologically sorted, bounded list.
///
/// The history task owns one `FightHistory`, appends every record the
/// engine emits, mirrors it into SQLite through `DbWriter`, and publishes
/// the running totals for the overlay. JSON import/export lets users move
/// their history between machines; import skips bad entries instead of
/// failing the whole file.
use crate::{
    db::DbWriter,
    error::{Result, TrackerError},
    fight::FightRecord,
    fighter::Fighter,
};
use serde::Serialize;
use std::path::Path;
use tokio::sync::{mpsc::Receiver, watch};

#[derive(Debug, Clone, Default)]
pub struct FightHistory {
    fights: Vec<FightRecord>,
    /// 0 = unbounded.
    limit:  usize,
}

/// Aggregate of every fight in the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTotals {
    pub fights:     usize,
    pub competitor: Fighter,
    pub opponent:   Fighter,
}

impl FightHistory {
    pub fn new(limit: usize) -> Self {
        Self { fights: Vec::new(), limit }
    }

    pub fn from_records(records: Vec<FightRecord>, limit: usize) -> Self {
        let mut history = Self { fights: records, limit };
        history.fights.sort_by_key(|r| r.ended_at_ms);
        history.trim();
        history
    }

    pub fn fights(&self) -> &[FightRecord] {
        &self.fights
    }

    pub fn len(&self) -> usize {
        self.fights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fights.is_empty()
    }

    pub fn push(&mut self, record: FightRecord) {
        let at = self.fights.partition_point(|r| r.ended_at_ms <= record.ended_at_ms);
        self.fights.insert(at, record);
        self.trim();
    }

    fn trim(&mut self) {
        if self.limit > 0 && self.fights.len() > self.limit {
            let excess = self.fights.len() - self.limit;
            self.fights.drain(..excess);
        }
    }

    /// Same fight already present: matched on opponent and both timestamps.
    pub fn contains(&self, record: &FightRecord) -> bool {
        self.fights.iter().any(|r| {
            r.started_at_ms == record.started_at_ms
                && r.ended_at_ms == record.ended_at_ms
                && r.opponent.name() == record.opponent.name()
        })
    }

    /// Merge a JSON array of records. Returns the records that were added.
    pub fn import_json(&mut self, raw: &str) -> Result<Vec<FightRecord>> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
        let mut added = Vec::new();
        for (i, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<FightRecord>(entry) {
                Ok(record) if !record.is_consistent() => {
                    tracing::warn!("Skipping inconsistent fight at index {}", i)
                }
                Ok(record) if self.contains(&record) => {
                    tracing::debug!("Skipping duplicate fight vs {}", record.opponent.name())
                }
                Ok(record) => {
                    self.push(record.clone());
                    added.push(record);
                }
                Err(e) => tracing::warn!("Skipping malformed fight at index {}: {}", i, e),
            }
        }
        tracing::info!("Imported {} fights", added.len());
        Ok(added)
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.fights)?)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<Vec<FightRecord>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| TrackerError::Read { path: path.to_path_buf(), source })?;
        self.import_json(&raw)
    }

    pub fn export_file(&self, path: &Path) -> Result<()> {
        let raw = self.export_json()?;
        std::fs::write(path, raw)
            .map_err(|source| TrackerError::Write { path: path.to_path_buf(), source })
    }

    /// Totals across all fights, or `None` when empty.
    pub fn totals(&self) -> Option<HistoryTotals> {
        let last = self.fights.last()?;
        let mut competitor = Fighter::detached(last.competitor.name());
        let mut opponent   = Fighter::detached("Opponents");
        for record in &self.fights {
            competitor.add_totals(&record.competitor);
            opponent.add_totals(&record.opponent);
        }
        Some(HistoryTotals { fights: self.fights.len(), competitor, opponent })
    }
}

// ---------------------------------------------------------------------------
// History task
// ---------------------------------------------------------------------------

/// Receive closed fights, persist them, and publish updated totals.
pub async fn run(
    mut record_rx: Receiver<FightRecord>,
    writer:        DbWriter,
    mut history:   FightHistory,
    totals_tx:     watch::Sender<Option<HistoryTotals>>,
) -> anyhow::Result<()> {
    totals_tx.send_replace(history.totals());

    while let Some(record) = record_rx.recv().await {
        match writer.insert_fight(record.clone()).await {
            Ok(id) => tracing::debug!("Fight vs {} stored as row {}", record.opponent.name(), id),
            Err(e) => tracing::warn!("Failed to store fight vs {}: {}", record.opponent.name(), e),
        }
        history.push(record);
        totals_tx.send_replace(history.totals());
    }

    writer.shutdown();
    tracing::info!("History task exiting with {} fights", history.len());
    Ok(())
}
