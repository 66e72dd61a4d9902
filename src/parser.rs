/// Parses the host's combat feed into typed `FeedEvent` structs.
///
/// The host plugin writes one JSON object per line, one line per event,
/// tagged by `type`:
///
///   {"type":"AnimationChanged","tick":1042,"timestamp_ms":625200,"actor":"Zezima","animation_id":1658}
///   {"type":"HitsplatApplied","tick":1043,"timestamp_ms":625800,"actor":"Woox","amount":23,"kind":"Damage"}
///
/// Every event carries the game tick it was observed on and a millisecond
/// timestamp. Ticks order deferred work; timestamps drive the fight timeout.
/// Lines that do not decode are skipped.
use crate::roster::CombatantSnapshot;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitsplatKind {
    Damage,
    Poison,
    Venom,
    Heal,
    Block,
    #[serde(other)]
    Other,
}

impl HitsplatKind {
    /// Splats that count as damage dealt by the other participant.
    pub fn is_damage(self) -> bool {
        matches!(self, Self::Damage | Self::Poison | Self::Venom)
    }
}

/// Typed feed events the tracker cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    LocalPlayer {
        tick:         u64,
        timestamp_ms: u64,
        name:         String,
    },
    PlayerUpdated {
        tick:         u64,
        timestamp_ms: u64,
        snapshot:     CombatantSnapshot,
    },
    AnimationChanged {
        tick:         u64,
        timestamp_ms: u64,
        actor:        String,
        animation_id: i32,
    },
    GraphicChanged {
        tick:         u64,
        timestamp_ms: u64,
        actor:        String,
        graphic_id:   i32,
    },
    InteractingChanged {
        tick:         u64,
        timestamp_ms: u64,
        source:       String,
        #[serde(default)]
        target:       Option<String>,
    },
    HitsplatApplied {
        tick:         u64,
        timestamp_ms: u64,
        actor:        String,
        amount:       u32,
        kind:         HitsplatKind,
    },
    ActorDespawned {
        tick:         u64,
        timestamp_ms: u64,
        actor:        String,
    },
    RegionChanged {
        tick:         u64,
        timestamp_ms: u64,
        regions:      Vec<u32>,
    },
    GameTick {
        tick:         u64,
        timestamp_ms: u64,
    },
}

impl FeedEvent {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::LocalPlayer        { timestamp_ms, .. } => *timestamp_ms,
            Self::PlayerUpdated      { timestamp_ms, .. } => *timestamp_ms,
            Self::AnimationChanged   { timestamp_ms, .. } => *timestamp_ms,
            Self::GraphicChanged     { timestamp_ms, .. } => *timestamp_ms,
            Self::InteractingChanged { timestamp_ms, .. } => *timestamp_ms,
            Self::HitsplatApplied    { timestamp_ms, .. } => *timestamp_ms,
            Self::ActorDespawned     { timestamp_ms, .. } => *timestamp_ms,
            Self::RegionChanged      { timestamp_ms, .. } => *timestamp_ms,
            Self::GameTick           { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    pub fn tick(&self) -> u64 {
        match self {
            Self::LocalPlayer        { tick, .. } => *tick,
            Self::PlayerUpdated      { tick, .. } => *tick,
            Self::AnimationChanged   { tick, .. } => *tick,
            Self::GraphicChanged     { tick, .. } => *tick,
            Self::InteractingChanged { tick, .. } => *tick,
            Self::HitsplatApplied    { tick, .. } => *tick,
            Self::ActorDespawned     { tick, .. } => *tick,
            Self::RegionChanged      { tick, .. } => *tick,
            Self::GameTick           { tick, .. } => *tick,
        }
    }
}

pub fn parse_line(raw: &str) -> Option<FeedEvent> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!("Skipping undecodable feed line: {}", e);
            None
        }
    }
}

/// Async pipeline task: receive raw lines, parse, forward typed events.
pub async fn run(mut rx: Receiver<String>, tx: Sender<FeedEvent>) -> Result<()> {
    while let Some(line) = rx.recv().await {
        if let Some(event) = parse_line(&line) {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Protection;

    const ANIMATION_LINE: &str =
        r#"{"type":"AnimationChanged","tick":1042,"timestamp_ms":625200,"actor":"Zezima","animation_id":1658}"#;

    const HITSPLAT_LINE: &str =
        r#"{"type":"HitsplatApplied","tick":1043,"timestamp_ms":625800,"actor":"Woox","amount":23,"kind":"Damage"}"#;

    const PLAYER_LINE: &str = r#"{"type":"PlayerUpdated","tick":1,"timestamp_ms":600,"snapshot":{"actor_id":12,"name":"Woox","overhead":"ProtectMagic","equipment":{"attack_slash":82,"melee_strength":86},"weapon_id":4151}}"#;

    #[test]
    fn parses_animation_changed() {
        let e = parse_line(ANIMATION_LINE).expect("should parse");
        match e {
            FeedEvent::AnimationChanged { ref actor, animation_id, .. } => {
                assert_eq!(actor, "Zezima");
                assert_eq!(animation_id, 1658);
            }
            ref other => panic!("Wrong variant: {:?}", other),
        }
        assert_eq!(e.tick(), 1042);
        assert_eq!(e.timestamp_ms(), 625200);
    }

    #[test]
    fn parses_hitsplat() {
        let e = parse_line(HITSPLAT_LINE).expect("should parse");
        match e {
            FeedEvent::HitsplatApplied { actor, amount, kind, .. } => {
                assert_eq!(actor, "Woox");
                assert_eq!(amount, 23);
                assert_eq!(kind, HitsplatKind::Damage);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn parses_player_snapshot_with_defaults() {
        let e = parse_line(PLAYER_LINE).expect("should parse");
        match e {
            FeedEvent::PlayerUpdated { snapshot, .. } => {
                assert_eq!(snapshot.name, "Woox");
                assert_eq!(snapshot.overhead, Protection::ProtectMagic);
                assert_eq!(snapshot.animation, -1);
                assert!(snapshot.levels.is_none());
                assert_eq!(snapshot.equipment.map(|e| e.melee_strength), Some(86));
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_hitsplat_kind_maps_to_other() {
        let line = r#"{"type":"HitsplatApplied","tick":1,"timestamp_ms":1,"actor":"A","amount":0,"kind":"Disease"}"#;
        match parse_line(line) {
            Some(FeedEvent::HitsplatApplied { kind, .. }) => assert_eq!(kind, HitsplatKind::Other),
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn returns_none_for_garbage() {
        assert!(parse_line("not a feed line").is_none());
        assert!(parse_line("").is_none());
        assert!(parse_line(r#"{"type":"Teleported","tick":1}"#).is_none());
    }
}
