/// Live combatant snapshots as reported by the host.
///
/// The host cannot be queried synchronously, so the feed carries full
/// `PlayerUpdated` snapshots and small deltas (animation, graphic). The
/// `Roster` folds both into a per-name cache that the fight lifecycle reads
/// through `CombatantSource`.
use crate::{
    calc::{CombatLevels, EquipmentBonuses, Loadout},
    fighter::ActorId,
    parser::FeedEvent,
    style::{OffensivePrayer, Protection},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn no_animation() -> i32 {
    -1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub actor_id:         ActorId,
    pub name:             String,
    #[serde(default = "no_animation")]
    pub animation:        i32,
    #[serde(default = "no_animation")]
    pub graphic:          i32,
    #[serde(default)]
    pub overhead:         Protection,
    #[serde(default)]
    pub offensive_prayer: Option<OffensivePrayer>,
    /// Absent for other players; the host can only read the local player's stats.
    #[serde(default)]
    pub levels:           Option<CombatLevels>,
    /// Absent until the host has resolved the actor's worn items.
    #[serde(default)]
    pub equipment:        Option<EquipmentBonuses>,
    #[serde(default)]
    pub weapon_id:        Option<u32>,
}

impl CombatantSnapshot {
    pub fn new(actor_id: ActorId, name: impl Into<String>) -> Self {
        Self {
            actor_id,
            name:             name.into(),
            animation:        no_animation(),
            graphic:          no_animation(),
            overhead:         Protection::None,
            offensive_prayer: None,
            levels:           None,
            equipment:        None,
            weapon_id:        None,
        }
    }

    /// Calculator input for this combatant, or `None` while equipment is unresolved.
    pub fn loadout(&self, assumed: CombatLevels) -> Option<Loadout> {
        self.equipment.map(|bonuses| Loadout {
            levels: self.levels.unwrap_or(assumed),
            bonuses,
            weapon_id: self.weapon_id,
        })
    }
}

/// Read access to the host's view of the world.
pub trait CombatantSource {
    fn local_player(&self) -> Option<&CombatantSnapshot>;
    fn snapshot(&self, name: &str) -> Option<&CombatantSnapshot>;
    fn map_regions(&self) -> &[u32];
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Roster {
    local_name: Option<String>,
    players:    HashMap<String, CombatantSnapshot>,
    regions:    Vec<u32>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one feed event into the cache. Fight-level meaning is left to the tracker.
    pub fn apply(&mut self, event: &FeedEvent) {
        match event {
            FeedEvent::LocalPlayer { name, .. } => {
                if self.local_name.as_deref() != Some(name.as_str()) {
                    tracing::info!("Local player → {}", name);
                    self.local_name = Some(name.clone());
                }
            }
            FeedEvent::PlayerUpdated { snapshot, .. } => {
                self.players.insert(snapshot.name.clone(), snapshot.clone());
            }
            FeedEvent::AnimationChanged { actor, animation_id, .. } => {
                if let Some(p) = self.players.get_mut(actor) {
                    p.animation = *animation_id;
                }
            }
            FeedEvent::GraphicChanged { actor, graphic_id, .. } => {
                if let Some(p) = self.players.get_mut(actor) {
                    p.graphic = *graphic_id;
                }
            }
            FeedEvent::ActorDespawned { actor, .. } => {
                self.players.remove(actor);
            }
            FeedEvent::RegionChanged { regions, .. } => {
                self.regions = regions.clone();
            }
            FeedEvent::InteractingChanged { .. }
            | FeedEvent::HitsplatApplied { .. }
            | FeedEvent::GameTick { .. } => {}
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl CombatantSource for Roster {
    fn local_player(&self) -> Option<&CombatantSnapshot> {
        self.local_name.as_deref().and_then(|n| self.players.get(n))
    }

    fn snapshot(&self, name: &str) -> Option<&CombatantSnapshot> {
        self.players.get(name)
    }

    fn map_regions(&self) -> &[u32] {
        &self.regions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn updated(name: &str, id: u32) -> FeedEvent {
        FeedEvent::PlayerUpdated {
            tick:         1,
            timestamp_ms: 600,
            snapshot:     CombatantSnapshot::new(ActorId(id), name),
        }
    }

    #[test]
    fn local_player_requires_snapshot() {
        let mut roster = Roster::new();
        roster.apply(&FeedEvent::LocalPlayer { tick: 1, timestamp_ms: 600, name: "A".into() });
        assert!(roster.local_player().is_none());

        roster.apply(&updated("A", 1));
        assert_eq!(roster.local_player().map(|p| p.actor_id), Some(ActorId(1)));
    }

    #[test]
    fn deltas_patch_known_players_only() {
        let mut roster = Roster::new();
        roster.apply(&updated("B", 2));
        roster.apply(&FeedEvent::AnimationChanged {
            tick: 2, timestamp_ms: 1200, actor: "B".into(), animation_id: 1658,
        });
        roster.apply(&FeedEvent::GraphicChanged {
            tick: 2, timestamp_ms: 1200, actor: "Nobody".into(), graphic_id: 85,
        });
        assert_eq!(roster.snapshot("B").map(|p| p.animation), Some(1658));
        assert!(roster.snapshot("Nobody").is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn despawn_removes_snapshot() {
        let mut roster = Roster::new();
        roster.apply(&updated("B", 2));
        roster.apply(&FeedEvent::ActorDespawned { tick: 3, timestamp_ms: 1800, actor: "B".into() });
        assert!(roster.is_empty());
    }

    #[test]
    fn regions_are_replaced() {
        let mut roster = Roster::new();
        roster.apply(&FeedEvent::RegionChanged { tick: 1, timestamp_ms: 0, regions: vec![1, 2] });
        roster.apply(&FeedEvent::RegionChanged { tick: 2, timestamp_ms: 0, regions: vec![13658] });
        assert_eq!(roster.map_regions(), &[13658]);
    }

    #[test]
    fn loadout_fills_assumed_levels() {
        let mut snap = CombatantSnapshot::new(ActorId(9), "B");
        assert!(snap.loadout(CombatLevels::default()).is_none());

        snap.equipment = Some(EquipmentBonuses::default());
        let assumed = CombatLevels { attack: 99, ..CombatLevels::default() };
        assert_eq!(snap.loadout(assumed).map(|l| l.levels.attack), Some(99));

        snap.levels = Some(CombatLevels { attack: 75, ..CombatLevels::default() });
        assert_eq!(snap.loadout(assumed).map(|l| l.levels.attack), Some(75));
    }
}
