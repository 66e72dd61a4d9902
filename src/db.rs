/// SQLite fight history storage.
///
/// Uses `rusqlite` with the `bundled` feature so SQLite is compiled in,
/// no system installation required.
///
/// The writer runs on a dedicated `std::thread` (rusqlite::Connection is !Send
/// across await points) and receives commands via a bounded sync channel.
/// Callers hold a cheap `DbWriter` handle that is Clone + Send + Sync.
///
/// Each fight is one row: indexed columns for listing, plus the full
/// `FightRecord` as a JSON payload. Reads open their own short-lived
/// connection so the writer thread only ever writes.
use crate::{
    error::{Result, TrackerError},
    fight::FightRecord,
};
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::oneshot;

pub const DB_FILE: &str = "fights.sqlite";

// ---------------------------------------------------------------------------
// Commands sent to the writer thread
// ---------------------------------------------------------------------------

pub enum DbCommand {
    InsertFight {
        reply:  oneshot::Sender<Result<i64>>,
        record: Box<FightRecord>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// DbWriter: cheap handle, Clone + Send + Sync
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DbWriter {
    tx: std::sync::mpsc::SyncSender<DbCommand>,
}

impl DbWriter {
    /// Append a closed fight; returns the auto-generated row id.
    pub async fn insert_fight(&self, record: FightRecord) -> Result<i64> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DbCommand::InsertFight { reply: reply_tx, record: Box::new(record) })
            .map_err(|_| TrackerError::WriterClosed)?;
        reply_rx.await.map_err(|_| TrackerError::WriterClosed)?
    }

    /// Stop the writer thread once queued inserts have drained.
    pub fn shutdown(&self) {
        let _ = self.tx.send(DbCommand::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// spawn_db_writer: initialises SQLite and starts the writer thread
// ---------------------------------------------------------------------------

/// Initialise SQLite at `db_path`, apply the schema, and spawn the writer
/// thread. Returns a `DbWriter` handle that can be cloned freely.
pub fn spawn_db_writer(db_path: &Path) -> Result<DbWriter> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| TrackerError::Write { path: parent.to_path_buf(), source })?;
    }

    let conn = Connection::open(db_path)?;
    apply_schema(&conn)?;

    let (tx, rx) = std::sync::mpsc::sync_channel::<DbCommand>(64);

    std::thread::spawn(move || db_writer_loop(rx, conn));

    tracing::info!("SQLite writer started at {:?}", db_path);
    Ok(DbWriter { tx })
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous  = NORMAL;

        CREATE TABLE IF NOT EXISTS fights (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at  INTEGER NOT NULL,
            ended_at    INTEGER NOT NULL,
            competitor  TEXT    NOT NULL,
            opponent    TEXT    NOT NULL,
            reason      TEXT    NOT NULL,
            payload     TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_fights_ended    ON fights(ended_at);
        CREATE INDEX IF NOT EXISTS idx_fights_opponent ON fights(opponent);
    ")?;
    Ok(())
}

pub fn insert_fight(conn: &Connection, record: &FightRecord) -> Result<i64> {
    let payload = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO fights (started_at, ended_at, competitor, opponent, reason, payload) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.started_at_ms as i64,
            record.ended_at_ms as i64,
            record.competitor.name(),
            record.opponent.name(),
            format!("{:?}", record.reason),
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Store imported fights in one transaction. Used by the `import` command,
/// outside the writer thread.
pub fn insert_fights(db_path: &Path, records: &[FightRecord]) -> Result<usize> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| TrackerError::Write { path: parent.to_path_buf(), source })?;
    }
    let mut conn = Connection::open(db_path)?;
    apply_schema(&conn)?;

    let tx = conn.transaction()?;
    for record in records {
        insert_fight(&tx, record)?;
    }
    tx.commit()?;
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// Writer loop (runs on its own std::thread)
// ---------------------------------------------------------------------------

fn db_writer_loop(rx: std::sync::mpsc::Receiver<DbCommand>, conn: Connection) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            DbCommand::InsertFight { reply, record } => {
                let result = insert_fight(&conn, &record);
                if let Err(e) = &result {
                    tracing::warn!("DB insert_fight error: {}", e);
                }
                let _ = reply.send(result);
            }
            DbCommand::Shutdown => break,
        }
    }
    tracing::debug!("SQLite writer stopped");
}

// ---------------------------------------------------------------------------
// Read-back
// ---------------------------------------------------------------------------

/// The most recent `limit` fights in chronological order (0 = all).
///
/// Rows whose payload does not decode, or decodes to an inconsistent
/// record, are skipped with a warning.
pub fn load_recent(db_path: &Path, limit: usize) -> Result<Vec<FightRecord>> {
    if !db_path.exists() {
        return Ok(Vec::new());
    }
    let conn = Connection::open(db_path)?;
    let sql_limit: i64 = if limit == 0 { -1 } else { limit as i64 };

    let mut stmt = conn.prepare(
        "SELECT id, payload FROM fights ORDER BY ended_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![sql_limit], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, payload) = row?;
        match serde_json::from_str::<FightRecord>(&payload) {
            Ok(record) if record.is_consistent() => records.push(record),
            Ok(_) => tracing::warn!("Skipping inconsistent fight row {}", id),
            Err(e) => tracing::warn!("Skipping undecodable fight row {}: {}", id, e),
        }
    }
    records.reverse();
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calc::AttackOutcome,
        fight::CloseReason,
        fighter::Fighter,
        style::CombatStyle,
    };
    use tempfile::tempdir;

    fn record(opponent: &str, ended_at_ms: u64) -> FightRecord {
        let mut competitor = Fighter::detached("Me");
        competitor.record_attack(&AttackOutcome {
            style:           CombatStyle::Melee,
            success:         true,
            deserved_damage: 12.5,
            accuracy_used:   0.6,
            max_hit:         40.0,
            offensive_pray_success: true,
        });
        FightRecord {
            competitor,
            opponent:      Fighter::detached(opponent),
            started_at_ms: ended_at_ms - 30_000,
            ended_at_ms,
            reason:        CloseReason::Timeout,
        }
    }

    #[tokio::test]
    async fn writer_inserts_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DB_FILE);
        let writer = spawn_db_writer(&path).unwrap();

        let first  = writer.insert_fight(record("B", 100_000)).await.unwrap();
        let second = writer.insert_fight(record("C", 200_000)).await.unwrap();
        assert!(second > first);
        writer.shutdown();

        let loaded = load_recent(&path, 0).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].opponent.name(), "B");
        assert_eq!(loaded[1], record("C", 200_000));
    }

    #[test]
    fn load_recent_respects_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DB_FILE);
        let conn = Connection::open(&path).unwrap();
        apply_schema(&conn).unwrap();
        for (i, name) in ["B", "C", "D"].iter().enumerate() {
            insert_fight(&conn, &record(name, 100_000 * (i as u64 + 1))).unwrap();
        }
        drop(conn);

        let loaded = load_recent(&path, 2).unwrap();
        let names: Vec<_> = loaded.iter().map(|r| r.opponent.name()).collect();
        assert_eq!(names, vec!["C", "D"]);
    }

    #[test]
    fn bad_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DB_FILE);
        let conn = Connection::open(&path).unwrap();
        apply_schema(&conn).unwrap();
        insert_fight(&conn, &record("B", 100_000)).unwrap();
        conn.execute(
            "INSERT INTO fights (started_at, ended_at, competitor, opponent, reason, payload) \
             VALUES (0, 150000, 'Me', 'X', 'Timeout', '{not json')",
            [],
        )
        .unwrap();
        drop(conn);

        let loaded = load_recent(&path, 0).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].opponent.name(), "B");
    }

    #[test]
    fn batch_insert_creates_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(DB_FILE);

        let stored = insert_fights(&path, &[record("B", 100_000), record("C", 200_000)]).unwrap();
        assert_eq!(stored, 2);

        let loaded = load_recent(&path, 0).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].opponent.name(), "C");
    }

    #[test]
    fn missing_database_is_empty_history() {
        let dir = tempdir().unwrap();
        assert!(load_recent(&dir.path().join(DB_FILE), 10).unwrap().is_empty());
    }
}
