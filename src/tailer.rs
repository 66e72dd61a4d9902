/// Tails the host's feed file, emitting complete lines as they are written.
///
/// Uses the `notify` crate to detect modifications, then reads from the last
/// consumed byte offset. Only newline-terminated lines are emitted; a
/// half-written trailing line stays on disk until its newline arrives.
///
/// Rotation handling: the host truncates the feed when the client restarts.
/// If the file shrank below our offset we restart from byte 0.
use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;

pub struct TailerState {
    path:     PathBuf,
    position: u64,
}

impl TailerState {
    pub fn new(path: PathBuf) -> Self {
        Self { path, position: 0 }
    }

    /// Emit every complete line past the current offset. `emit` returns
    /// false once the receiver is gone.
    pub fn read_new_lines(&mut self, mut emit: impl FnMut(String) -> bool) -> Result<()> {
        let file_len = match std::fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(_) => return Ok(()), // not created yet
        };

        if file_len < self.position {
            tracing::info!("Feed rotation detected, restarting from byte 0");
            self.position = 0;
        }
        if file_len == self.position {
            return Ok(());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.position))?;
        let mut buf = Vec::new();
        file.take(file_len - self.position).read_to_end(&mut buf)?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };
        let complete = &buf[..last_newline];
        self.position += last_newline as u64 + 1;

        for raw in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if !emit(line.to_owned()) {
                break;
            }
        }
        Ok(())
    }
}

pub async fn run(feed_path: PathBuf, tx: Sender<String>) -> Result<()> {
    tracing::info!("Tailer starting: {:?}", feed_path);
    tokio::task::spawn_blocking(move || watch(feed_path, tx)).await?
}

fn watch(feed_path: PathBuf, tx: Sender<String>) -> Result<()> {
    let watch_dir = feed_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let mut state = TailerState::new(feed_path.clone());
    let emit = |line: String| tx.blocking_send(line).is_ok();

    // Pick up anything written before we started.
    state.read_new_lines(emit)?;

    let (fs_tx, fs_rx) = std_mpsc::channel::<notify::Result<Event>>();
    let config = notify::Config::default().with_poll_interval(Duration::from_millis(500));

    let mut watcher = RecommendedWatcher::new(fs_tx, config)?;
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    while !tx.is_closed() {
        match fs_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(Ok(Event { kind: EventKind::Modify(_) | EventKind::Create(_), paths, .. })) => {
                if paths.iter().any(|p| p.file_name() == feed_path.file_name()) {
                    if let Err(e) = state.read_new_lines(emit) {
                        tracing::warn!("Tailer read error: {}", e);
                    }
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Watcher error: {}", e),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!("Watcher channel closed, tailer exiting");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn drain(state: &mut TailerState) -> Vec<String> {
        let mut lines = Vec::new();
        state
            .read_new_lines(|l| {
                lines.push(l);
                true
            })
            .unwrap();
        lines
    }

    #[test]
    fn reads_initial_lines() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "line one").unwrap();
        writeln!(f, "line two").unwrap();
        f.flush().unwrap();

        let mut state = TailerState::new(f.path().to_path_buf());
        assert_eq!(drain(&mut state), vec!["line one", "line two"]);
        assert!(drain(&mut state).is_empty());
    }

    #[test]
    fn holds_partial_line_until_complete() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{\"type\":\"GameTick\",").unwrap();
        f.flush().unwrap();

        let mut state = TailerState::new(f.path().to_path_buf());
        assert!(drain(&mut state).is_empty());

        writeln!(f, "\"tick\":1,\"timestamp_ms\":600}}").unwrap();
        f.flush().unwrap();
        assert_eq!(
            drain(&mut state),
            vec![r#"{"type":"GameTick","tick":1,"timestamp_ms":600}"#]
        );
    }

    #[test]
    fn detects_rotation() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "original content").unwrap();
        f.flush().unwrap();

        let mut state = TailerState::new(f.path().to_path_buf());
        assert_eq!(drain(&mut state).len(), 1);

        let mut f2 = std::fs::File::create(f.path()).unwrap();
        writeln!(f2, "new").unwrap();
        f2.flush().unwrap();

        assert_eq!(drain(&mut state), vec!["new"]);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = TailerState::new(dir.path().join("feed.jsonl"));
        assert!(drain(&mut state).is_empty());
    }

    #[tokio::test]
    async fn run_forwards_existing_lines() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "hello").unwrap();
        f.flush().unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let path = f.path().to_path_buf();
        let handle = tokio::spawn(run(path, tx));

        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        drop(rx);
        let _ = handle.await;
    }
}
