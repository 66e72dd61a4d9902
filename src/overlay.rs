/// Overlay bridge: publishes the live fight and history totals for the renderer.
///
/// `overlay.json` in the data directory is rewritten via a temp file and
/// rename so the external overlay never reads a half-written file. It holds
/// the latest `FightSnapshot` next to the history `TotalsSnapshot`.
///
/// Disk writes are coalesced: at most one every `WRITE_INTERVAL`, plus a
/// final flush when the engine shuts down.
use crate::{
    display::{FightSnapshot, TotalsSnapshot},
    history::HistoryTotals,
};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc::Receiver, watch};

pub const OVERLAY_FILE: &str = "overlay.json";

const WRITE_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayState {
    pub fight:  Option<FightSnapshot>,
    pub totals: Option<TotalsSnapshot>,
}

pub async fn run(
    mut snap_rx:   Receiver<FightSnapshot>,
    mut totals_rx: watch::Receiver<Option<HistoryTotals>>,
    out_path:      PathBuf,
) -> Result<()> {
    let mut state = OverlayState {
        fight:  None,
        totals: totals_rx.borrow_and_update().as_ref().map(TotalsSnapshot::from_totals),
    };
    let mut dirty = state.totals.is_some();
    let mut totals_open = true;
    let mut last_write: Option<Instant> = None;

    loop {
        tokio::select! {
            snap = snap_rx.recv() => match snap {
                Some(snap) => {
                    state.fight = Some(snap);
                    dirty = true;
                }
                None => break,
            },
            changed = totals_rx.changed(), if totals_open => match changed {
                Ok(()) => {
                    state.totals = totals_rx
                        .borrow_and_update()
                        .as_ref()
                        .map(TotalsSnapshot::from_totals);
                    dirty = true;
                }
                Err(_) => totals_open = false,
            },
            _ = tokio::time::sleep(WRITE_INTERVAL), if dirty => {}
        }

        let due = last_write.map_or(true, |t| t.elapsed() >= WRITE_INTERVAL);
        if dirty && due {
            flush(&state, &out_path);
            last_write = Some(Instant::now());
            dirty = false;
        }
    }

    // History publishes its last totals after the engine's final record.
    if totals_open && totals_rx.changed().await.is_ok() {
        state.totals = totals_rx.borrow_and_update().as_ref().map(TotalsSnapshot::from_totals);
        dirty = true;
    }
    if dirty {
        flush(&state, &out_path);
    }
    Ok(())
}

fn flush(state: &OverlayState, path: &Path) {
    if let Err(e) = write_atomic(path, state) {
        tracing::warn!("Overlay write failed: {}", e);
    }
}

fn write_atomic(path: &Path, state: &OverlayState) -> Result<()> {
    let raw = serde_json::to_vec(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fight::{CloseReason, FightRecord}, fighter::Fighter};
    use tempfile::tempdir;

    fn snapshot(opponent: &str) -> FightSnapshot {
        FightSnapshot::from_record(&FightRecord {
            competitor:    Fighter::detached("A"),
            opponent:      Fighter::detached(opponent),
            started_at_ms: 0,
            ended_at_ms:   1000,
            reason:        CloseReason::Timeout,
        })
    }

    fn totals(fights: usize) -> HistoryTotals {
        HistoryTotals {
            fights,
            competitor: Fighter::detached("A"),
            opponent:   Fighter::detached("Opponents"),
        }
    }

    fn read(path: &Path) -> serde_json::Value {
        let raw = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn writes_latest_snapshot_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(OVERLAY_FILE);

        let (totals_tx, totals_rx) = watch::channel(None);
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let task = tokio::spawn(run(rx, totals_rx, path.clone()));
        tx.send(snapshot("B")).await.unwrap();
        tx.send(snapshot("C")).await.unwrap();
        drop(tx);
        drop(totals_tx);
        task.await.unwrap().unwrap();

        let json = read(&path);
        assert_eq!(json["fight"]["opponent"]["name"], "C");
        assert!(json["totals"].is_null());
    }

    #[tokio::test]
    async fn totals_are_published_next_to_the_fight() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(OVERLAY_FILE);

        let (totals_tx, totals_rx) = watch::channel(Some(totals(4)));
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let task = tokio::spawn(run(rx, totals_rx, path.clone()));

        tx.send(snapshot("B")).await.unwrap();
        totals_tx.send_replace(Some(totals(5)));
        drop(tx);
        drop(totals_tx);
        task.await.unwrap().unwrap();

        let json = read(&path);
        assert_eq!(json["fight"]["opponent"]["name"], "B");
        assert_eq!(json["totals"]["fights"], 5);
        assert_eq!(json["totals"]["opponent"]["name"], "Opponents");
    }
}
