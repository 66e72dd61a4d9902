/// Fight lifecycle: owned by the engine task, fed one event at a time.
///
///   Idle ──interaction──▶ PendingStart ──competitor attack──▶ Active
///     ▲                        │                                │
///     └──── discard (expired) ─┘                death / timeout ┘──▶ FightRecord
///
/// Per event the order is fixed: deferred classifications that have come
/// due are scored, then close conditions are checked, then the event itself
/// is applied. A swing that lands in the same tick as a death is therefore
/// counted before the fight closes.
///
/// Attack animations are scored one tick after they are seen, once the
/// defender's overhead and equipment have settled. Each deferral is keyed by
/// actor and fight generation and is dropped if either no longer matches.
use crate::{
    calc::{CombatLevels, DeservedDamageCalc},
    config::AppConfig,
    equipment::AmmoChoices,
    fighter::{ActorId, FightLogEntry, Fighter},
    parser::{FeedEvent, HitsplatKind},
    roster::CombatantSource,
    style::{self, CombatStyle, DEATH_ANIMATION, SPLASH_GRAPHIC},
};
use serde::{Deserialize, Serialize};

/// Last Man Standing map regions.
pub const LMS_REGIONS: [u32; 7] = [13617, 13658, 13659, 13660, 13914, 13915, 13916];

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FightSettings {
    pub timeout_ms:       u64,
    /// How long an interaction-only fight survives without an attack.
    pub pending_grace_ms: u64,
    pub restrict_to_lms:  bool,
    pub assumed_levels:   CombatLevels,
    pub ammo:             AmmoChoices,
}

impl Default for FightSettings {
    fn default() -> Self {
        Self {
            timeout_ms:       21_000,
            pending_grace_ms: 5_000,
            restrict_to_lms:  false,
            assumed_levels:   CombatLevels::default(),
            ammo:             AmmoChoices::default(),
        }
    }
}

impl From<&AppConfig> for FightSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_ms:       config.fight_timeout_secs.saturating_mul(1000),
            pending_grace_ms: config
                .pending_grace_secs
                .min(config.fight_timeout_secs)
                .saturating_mul(1000),
            restrict_to_lms:  config.restrict_to_lms,
            assumed_levels:   config.assumed_levels,
            ammo: AmmoChoices {
                bolts:        config.bolt_choice,
                strong_bolts: config.strong_bolt_choice,
                darts:        config.dart_choice,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FightState {
    Idle,
    PendingStart,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    CompetitorDied,
    OpponentDied,
    BothDied,
    Timeout,
    FeedClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Competitor,
    Opponent,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::Competitor => Self::Opponent,
            Self::Opponent   => Self::Competitor,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Competitor => 0,
            Self::Opponent   => 1,
        }
    }
}

/// A finished, started fight. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightRecord {
    pub competitor:    Fighter,
    pub opponent:      Fighter,
    pub started_at_ms: u64,
    pub ended_at_ms:   u64,
    pub reason:        CloseReason,
}

impl FightRecord {
    pub fn is_consistent(&self) -> bool {
        self.competitor.is_consistent()
            && self.opponent.is_consistent()
            && self.competitor.name() != self.opponent.name()
            && self.ended_at_ms >= self.started_at_ms
    }
}

#[derive(Debug)]
pub struct Fight {
    competitor:       Fighter,
    opponent:         Fighter,
    started_at_ms:    u64,
    last_activity_ms: u64,
    generation:       u64,
    /// Last tick a splash can still be matched to each side's magic attack.
    splash_until:     [Option<u64>; 2],
}

impl Fight {
    pub fn started(&self) -> bool {
        self.competitor.attack_count() > 0
    }

    pub fn competitor(&self) -> &Fighter { &self.competitor }
    pub fn opponent(&self) -> &Fighter { &self.opponent }
    pub fn started_at_ms(&self) -> u64 { self.started_at_ms }
    pub fn last_activity_ms(&self) -> u64 { self.last_activity_ms }
    pub fn generation(&self) -> u64 { self.generation }

    pub fn fighter(&self, side: Side) -> &Fighter {
        match side {
            Side::Competitor => &self.competitor,
            Side::Opponent   => &self.opponent,
        }
    }

    fn fighter_mut(&mut self, side: Side) -> &mut Fighter {
        match side {
            Side::Competitor => &mut self.competitor,
            Side::Opponent   => &mut self.opponent,
        }
    }

    pub fn side_of(&self, name: &str) -> Option<Side> {
        if self.competitor.name() == name {
            Some(Side::Competitor)
        } else if self.opponent.name() == name {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }
}

/// An attack animation waiting one tick to be scored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingClassification {
    actor:        String,
    actor_id:     ActorId,
    generation:   u64,
    animation_id: i32,
    tick:         u64,
    due_tick:     u64,
    timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FightTracker {
    settings:        FightSettings,
    calc:            DeservedDamageCalc,
    fight:           Option<Fight>,
    next_generation: u64,
    pending:         Vec<PendingClassification>,
}

impl FightTracker {
    pub fn new(settings: FightSettings) -> Self {
        Self {
            calc: DeservedDamageCalc::new(settings.ammo),
            settings,
            fight: None,
            next_generation: 1,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> FightState {
        match &self.fight {
            None                     => FightState::Idle,
            Some(f) if f.started()   => FightState::Active,
            Some(_)                  => FightState::PendingStart,
        }
    }

    pub fn fight(&self) -> Option<&Fight> {
        self.fight.as_ref()
    }

    /// Process one feed event. Returns the record of a fight this event closed.
    pub fn handle(&mut self, event: &FeedEvent, source: &impl CombatantSource) -> Option<FightRecord> {
        let now_ms = event.timestamp_ms();
        let tick   = event.tick();

        self.run_due(tick, now_ms, source);
        let closed = self.evaluate_close(now_ms, source);
        self.apply(event, source);
        closed
    }

    /// Close the open fight, if any. Unstarted fights are discarded.
    pub fn close_current(&mut self, now_ms: u64, reason: CloseReason) -> Option<FightRecord> {
        let fight = self.fight.take()?;
        self.pending.clear();

        if !fight.started() {
            tracing::info!("Discarded fight vs {} (no attacks)", fight.opponent.name());
            return None;
        }

        let Fight { mut competitor, mut opponent, started_at_ms, .. } = fight;
        competitor.detach();
        opponent.detach();

        tracing::info!(
            "Fight vs {} ended ({:?}) after {}s",
            opponent.name(),
            reason,
            now_ms.saturating_sub(started_at_ms) / 1000,
        );

        Some(FightRecord {
            competitor,
            opponent,
            started_at_ms,
            ended_at_ms: now_ms.max(started_at_ms),
            reason,
        })
    }

    // -----------------------------------------------------------------------
    // Close conditions
    // -----------------------------------------------------------------------

    fn evaluate_close(&mut self, now_ms: u64, source: &impl CombatantSource) -> Option<FightRecord> {
        let fight = self.fight.as_mut()?;

        let is_dead = |f: &Fighter| {
            source
                .snapshot(f.name())
                .is_some_and(|s| s.animation == DEATH_ANIMATION)
        };
        let competitor_dead = is_dead(&fight.competitor);
        let opponent_dead   = is_dead(&fight.opponent);

        let reason = match (competitor_dead, opponent_dead) {
            (true, true)  => CloseReason::BothDied,
            (true, false) => CloseReason::CompetitorDied,
            (false, true) => CloseReason::OpponentDied,
            (false, false) => {
                if now_ms.saturating_sub(fight.last_activity_ms) > self.settings.timeout_ms {
                    CloseReason::Timeout
                } else {
                    return None;
                }
            }
        };

        if competitor_dead {
            fight.competitor.mark_dead();
        }
        if opponent_dead {
            fight.opponent.mark_dead();
        }
        self.close_current(now_ms, reason)
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    fn apply(&mut self, event: &FeedEvent, source: &impl CombatantSource) {
        match event {
            FeedEvent::InteractingChanged { source: actor, target, timestamp_ms, .. } => {
                self.on_interaction(actor, target.as_deref(), *timestamp_ms, source);
            }
            FeedEvent::AnimationChanged { actor, animation_id, tick, timestamp_ms } => {
                self.schedule(actor, *animation_id, *tick, *timestamp_ms, source);
            }
            FeedEvent::GraphicChanged { actor, graphic_id, tick, .. } => {
                if *graphic_id == SPLASH_GRAPHIC {
                    self.on_splash(actor, *tick);
                }
            }
            FeedEvent::HitsplatApplied { actor, amount, kind, .. } => {
                self.on_hitsplat(actor, *amount, *kind);
            }
            FeedEvent::ActorDespawned { actor, .. } => {
                let before = self.pending.len();
                self.pending.retain(|p| &p.actor != actor);
                if self.pending.len() != before {
                    tracing::debug!("Dropped pending attack of despawned {}", actor);
                }
            }
            FeedEvent::LocalPlayer { .. }
            | FeedEvent::PlayerUpdated { .. }
            | FeedEvent::RegionChanged { .. }
            | FeedEvent::GameTick { .. } => {}
        }
    }

    fn on_interaction(
        &mut self,
        actor:  &str,
        target: Option<&str>,
        now_ms: u64,
        source: &impl CombatantSource,
    ) {
        let Some(local) = source.local_player() else { return };

        let other = if actor == local.name {
            match target {
                Some(t) if t != local.name => t,
                _ => return,
            }
        } else if target == Some(local.name.as_str()) {
            actor
        } else {
            return;
        };

        // Only players get snapshots; NPC interactions never open a fight.
        let Some(other_snap) = source.snapshot(other) else {
            tracing::trace!("Ignoring interaction with non-player {}", other);
            return;
        };

        if self.settings.restrict_to_lms
            && !source.map_regions().iter().any(|r| LMS_REGIONS.contains(r))
        {
            return;
        }

        match &self.fight {
            Some(f) if f.started() => return,
            Some(f) if f.opponent.name() == other => return,
            _ => {}
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let backdate = self.settings.timeout_ms.saturating_sub(self.settings.pending_grace_ms);
        self.fight = Some(Fight {
            competitor:       Fighter::live(local.name.clone(), local.actor_id),
            opponent:         Fighter::live(other, other_snap.actor_id),
            started_at_ms:    now_ms,
            last_activity_ms: now_ms.saturating_sub(backdate),
            generation,
            splash_until:     [None; 2],
        });
        self.pending.clear();
        tracing::info!("Fight pending vs {} (generation {})", other, generation);
    }

    fn schedule(
        &mut self,
        actor:        &str,
        animation_id: i32,
        tick:         u64,
        timestamp_ms: u64,
        source:       &impl CombatantSource,
    ) {
        let Some(fight) = &self.fight else { return };
        if fight.side_of(actor).is_none() {
            tracing::trace!("Ignoring animation of non-participant {}", actor);
            return;
        }
        if style::classify(animation_id) == CombatStyle::NonCombat {
            return;
        }
        let Some(snap) = source.snapshot(actor) else { return };

        self.pending.push(PendingClassification {
            actor: actor.to_owned(),
            actor_id: snap.actor_id,
            generation: fight.generation,
            animation_id,
            tick,
            due_tick: tick + 1,
            timestamp_ms,
        });
    }

    fn run_due(&mut self, tick: u64, now_ms: u64, source: &impl CombatantSource) {
        if self.pending.is_empty() {
            return;
        }
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due_tick <= tick);
        self.pending = waiting;

        for p in due {
            self.score(p, tick, now_ms, source);
        }
    }

    fn score(
        &mut self,
        p:      PendingClassification,
        tick:   u64,
        now_ms: u64,
        source: &impl CombatantSource,
    ) {
        let Some(fight) = self.fight.as_mut() else { return };
        if fight.generation != p.generation {
            tracing::debug!("Dropped stale attack of {} (generation {})", p.actor, p.generation);
            return;
        }
        let Some(side) = fight.side_of(&p.actor) else { return };
        let Some(attacker) = source.snapshot(&p.actor).filter(|s| s.actor_id == p.actor_id) else {
            tracing::debug!("Dropped attack of {}: actor no longer present", p.actor);
            return;
        };
        let Some(animation) = style::animation_data(p.animation_id) else { return };

        let defender = source.snapshot(fight.fighter(side.other()).name());
        let assumed  = self.settings.assumed_levels;
        let protection = defender.map(|d| d.overhead).unwrap_or_default();

        let mut outcome = self.calc.score(
            attacker.loadout(assumed).as_ref(),
            defender.and_then(|d| d.loadout(assumed)).as_ref(),
            protection,
            animation,
        );
        outcome.offensive_pray_success =
            style::is_offensive_pray_success(outcome.style, attacker.offensive_prayer);

        let was_started = fight.started();
        let fighter = fight.fighter_mut(side);
        fighter.record_attack(&outcome);
        fighter.push_log(FightLogEntry {
            timestamp_ms:    p.timestamp_ms,
            tick:            p.tick,
            attack_type:     animation.attack_type,
            special:         animation.special,
            success:         outcome.success,
            accuracy:        outcome.accuracy_used,
            max_hit:         outcome.max_hit,
            deserved_damage: outcome.deserved_damage,
            splashed:        false,
        });
        fight.touch(now_ms);

        tracing::debug!(
            "{} {} → success={} deserved={:.2} acc={:.3}",
            p.actor,
            animation.name,
            outcome.success,
            outcome.deserved_damage,
            outcome.accuracy_used,
        );

        if !was_started && fight.started() {
            fight.started_at_ms = p.timestamp_ms;
            tracing::info!("Fight started vs {}", fight.opponent.name());
        }

        if outcome.style == CombatStyle::Magic {
            if defender.is_some_and(|d| d.graphic == SPLASH_GRAPHIC) {
                fight.fighter_mut(side).record_magic_splash_correction();
                fight.splash_until[side.index()] = None;
            } else {
                fight.splash_until[side.index()] = Some(tick + 1);
            }
        }
    }

    /// A splash graphic on `actor` belongs to the other side's latest magic attack.
    fn on_splash(&mut self, actor: &str, tick: u64) {
        let Some(fight) = self.fight.as_mut() else { return };
        let Some(defender) = fight.side_of(actor) else { return };
        let attacker = defender.other();

        let Some(until) = fight.splash_until[attacker.index()].take() else { return };
        if tick > until {
            return;
        }
        fight.fighter_mut(attacker).record_magic_splash_correction();
        tracing::debug!("{} splashed", fight.fighter(attacker).name());
    }

    fn on_hitsplat(&mut self, actor: &str, amount: u32, kind: HitsplatKind) {
        let Some(fight) = self.fight.as_mut() else { return };
        let Some(side) = fight.side_of(actor) else {
            tracing::trace!("Ignoring hitsplat on non-participant {}", actor);
            return;
        };
        match kind {
            k if k.is_damage() => fight.fighter_mut(side.other()).record_damage_dealt(amount),
            HitsplatKind::Heal => fight.fighter_mut(side).record_hp_healed(amount),
            _ => {}
        }
    }
}
