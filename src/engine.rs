/// Fight engine: the single consumer of the feed.
///
/// Receives typed `FeedEvent`s, folds them into the `Roster`, drives the
/// `FightTracker`, forwards closed fights to the history task and pushes
/// a `FightSnapshot` to the overlay after every event while a fight is open.
///
/// Events are processed strictly one at a time; nothing in here awaits
/// between the roster update and the tracker call.
use crate::{
    config::AppConfig,
    display::FightSnapshot,
    fight::{CloseReason, FightRecord, FightSettings, FightTracker},
    parser::FeedEvent,
    roster::Roster,
};
use anyhow::Result;
use tokio::sync::mpsc::{Receiver, Sender};

pub async fn run(
    mut event_rx: Receiver<FeedEvent>,
    record_tx:    Sender<FightRecord>,
    snap_tx:      Sender<FightSnapshot>,
    config:       AppConfig,
) -> Result<()> {
    let settings = FightSettings::from(&config);
    tracing::info!(
        "Engine starting (timeout {}ms, grace {}ms, lms only: {})",
        settings.timeout_ms,
        settings.pending_grace_ms,
        settings.restrict_to_lms,
    );

    let mut roster  = Roster::new();
    let mut tracker = FightTracker::new(settings);
    let mut last_ms = 0;

    while let Some(event) = event_rx.recv().await {
        last_ms = last_ms.max(event.timestamp_ms());
        roster.apply(&event);

        if let Some(record) = tracker.handle(&event, &roster) {
            let _ = snap_tx.try_send(FightSnapshot::from_record(&record));
            if record_tx.send(record).await.is_err() {
                return Ok(());
            }
        }

        if let Some(fight) = tracker.fight() {
            let snap = FightSnapshot::from_fight(fight, tracker.state(), last_ms);
            let _ = snap_tx.try_send(snap); // Non-blocking, drop if the overlay is slow
        }
    }

    // Feed closed: a fight in progress is still worth keeping.
    if let Some(record) = tracker.close_current(last_ms, CloseReason::FeedClosed) {
        let _ = record_tx.send(record).await;
    }
    tracing::info!("Engine exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use tokio::sync::mpsc;

    const FEED: &[&str] = &[
        r#"{"type":"PlayerUpdated","tick":0,"timestamp_ms":0,"snapshot":{"actor_id":1,"name":"A","equipment":{"attack_slash":82,"melee_strength":86}}}"#,
        r#"{"type":"PlayerUpdated","tick":0,"timestamp_ms":0,"snapshot":{"actor_id":2,"name":"B","equipment":{"defence_slash":40}}}"#,
        r#"{"type":"LocalPlayer","tick":0,"timestamp_ms":0,"name":"A"}"#,
        r#"{"type":"InteractingChanged","tick":1,"timestamp_ms":600,"source":"A","target":"B"}"#,
        r#"{"type":"AnimationChanged","tick":2,"timestamp_ms":1200,"actor":"A","animation_id":1658}"#,
        r#"{"type":"GameTick","tick":3,"timestamp_ms":1800}"#,
        r#"{"type":"HitsplatApplied","tick":3,"timestamp_ms":1800,"actor":"B","amount":27,"kind":"Damage"}"#,
    ];

    async fn feed_all(lines: &[&str]) -> (Vec<FightRecord>, Vec<FightSnapshot>) {
        let (event_tx, event_rx)   = mpsc::channel(64);
        let (record_tx, mut record_rx) = mpsc::channel(8);
        let (snap_tx, mut snap_rx) = mpsc::channel(64);

        let engine = tokio::spawn(run(event_rx, record_tx, snap_tx, AppConfig::default()));
        for line in lines {
            event_tx.send(parse_line(line).expect("valid line")).await.unwrap();
        }
        drop(event_tx);
        engine.await.unwrap().unwrap();

        let mut records = Vec::new();
        while let Ok(r) = record_rx.try_recv() {
            records.push(r);
        }
        let mut snaps = Vec::new();
        while let Ok(s) = snap_rx.try_recv() {
            snaps.push(s);
        }
        (records, snaps)
    }

    #[tokio::test]
    async fn open_fight_is_flushed_when_feed_closes() {
        let (records, snaps) = feed_all(FEED).await;
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.reason, CloseReason::FeedClosed);
        assert_eq!(record.competitor.attack_count(), 1);
        assert_eq!(record.competitor.damage_dealt(), 27);
        assert_eq!(record.ended_at_ms, 1800);

        let last = snaps.last().expect("snapshots sent");
        assert_eq!(last.competitor.damage_dealt, 27);
    }

    #[tokio::test]
    async fn timeout_emits_record_once() {
        let mut lines = FEED.to_vec();
        lines.push(r#"{"type":"GameTick","tick":50,"timestamp_ms":30000}"#);
        let (records, _) = feed_all(&lines).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, CloseReason::Timeout);
    }

    #[tokio::test]
    async fn interaction_without_attack_leaves_no_record() {
        let (records, _) = feed_all(&FEED[..4]).await;
        assert!(records.is_empty());
    }
}
