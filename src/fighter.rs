/// One combatant's running statistics for a single fight.
///
/// A `Fighter` is either live (bound to an on-screen actor while its fight is
/// open) or detached (reconstructed from history, or an aggregate of many
/// fights). Accumulation is identical for both; only the binding differs.
///
/// Counters only ever grow. The one exception is the magic splash
/// correction, which takes back an optimistic magic hit once the splash
/// graphic shows up a tick later.
use crate::{
    calc::AttackOutcome,
    style::{AttackType, CombatStyle},
};
use serde::{Deserialize, Serialize};

/// Host-side identity of a live actor. Changes if the actor despawns and respawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// One scored attack, kept for after-the-fact analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightLogEntry {
    pub timestamp_ms:    u64,
    pub tick:            u64,
    pub attack_type:     AttackType,
    pub special:         bool,
    pub success:         bool,
    pub accuracy:        f64,
    pub max_hit:         f64,
    pub deserved_damage: f64,
    #[serde(default)]
    pub splashed:        bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fighter {
    name:                         String,
    #[serde(skip)]
    live:                         Option<ActorId>,
    attack_count:                 u32,
    success_count:                u32,
    deserved_damage:              f64,
    damage_dealt:                 u32,
    #[serde(default)]
    magic_attack_count:           u32,
    #[serde(default)]
    magic_hit_count:              u32,
    #[serde(default)]
    magic_hit_count_deserved:     f64,
    #[serde(default)]
    offensive_pray_success_count: u32,
    #[serde(default)]
    hp_healed:                    u32,
    #[serde(default)]
    dead:                         bool,
    #[serde(default)]
    log:                          Vec<FightLogEntry>,
}

impl Fighter {
    /// A fighter bound to a live actor for the duration of a fight.
    pub fn live(name: impl Into<String>, actor: ActorId) -> Self {
        Self {
            live: Some(actor),
            ..Self::detached(name)
        }
    }

    /// A stats-only fighter, not bound to anything on screen.
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name:                         name.into(),
            live:                         None,
            attack_count:                 0,
            success_count:                0,
            deserved_damage:              0.0,
            damage_dealt:                 0,
            magic_attack_count:           0,
            magic_hit_count:              0,
            magic_hit_count_deserved:     0.0,
            offensive_pray_success_count: 0,
            hp_healed:                    0,
            dead:                         false,
            log:                          Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accumulation
    // -----------------------------------------------------------------------

    pub fn record_attack(&mut self, outcome: &AttackOutcome) {
        self.attack_count += 1;
        if outcome.success {
            self.success_count += 1;
        }
        if outcome.offensive_pray_success {
            self.offensive_pray_success_count += 1;
        }
        self.deserved_damage += outcome.deserved_damage.max(0.0);

        if outcome.style == CombatStyle::Magic {
            self.magic_attack_count += 1;
            self.magic_hit_count_deserved += outcome.accuracy_used;
            // Assume a hit until a splash says otherwise.
            self.magic_hit_count += 1;
        }
    }

    pub fn record_damage_dealt(&mut self, amount: u32) {
        self.damage_dealt = self.damage_dealt.saturating_add(amount);
    }

    pub fn record_hp_healed(&mut self, amount: u32) {
        self.hp_healed = self.hp_healed.saturating_add(amount);
    }

    /// Take back the optimistic hit of the last magic attack.
    pub fn record_magic_splash_correction(&mut self) {
        if self.magic_hit_count == 0 {
            return;
        }
        self.magic_hit_count -= 1;
        if let Some(entry) = self
            .log
            .iter_mut()
            .rev()
            .find(|e| e.attack_type == AttackType::Magic)
        {
            entry.splashed = true;
        }
    }

    pub fn push_log(&mut self, entry: FightLogEntry) {
        self.log.push(entry);
    }

    pub fn mark_dead(&mut self) {
        self.dead = true;
    }

    /// Fold another fighter's totals into this one (history aggregates).
    pub fn add_totals(&mut self, other: &Fighter) {
        self.attack_count                 += other.attack_count;
        self.success_count                += other.success_count;
        self.deserved_damage              += other.deserved_damage;
        self.damage_dealt                  = self.damage_dealt.saturating_add(other.damage_dealt);
        self.magic_attack_count           += other.magic_attack_count;
        self.magic_hit_count              += other.magic_hit_count;
        self.magic_hit_count_deserved     += other.magic_hit_count_deserved;
        self.offensive_pray_success_count += other.offensive_pray_success_count;
        self.hp_healed                     = self.hp_healed.saturating_add(other.hp_healed);
    }

    /// Drop the live binding once the fight is archived.
    pub fn detach(&mut self) {
        self.live = None;
    }

    // -----------------------------------------------------------------------
    // Derived stats
    // -----------------------------------------------------------------------

    /// Off-pray successes as a percentage of attacks, 0 with no attacks.
    pub fn off_pray_success_rate(&self) -> f64 {
        percentage(self.success_count, self.attack_count)
    }

    pub fn offensive_pray_success_rate(&self) -> f64 {
        percentage(self.offensive_pray_success_count, self.attack_count)
    }

    pub fn deserved_damage_total(&self) -> f64 {
        self.deserved_damage
    }

    /// Actual magic hits over the hits the attacker deserved given accuracy.
    ///
    /// 1.0 means exactly average luck. This is deliberately not hits over
    /// attempts: a low-accuracy caster who lands half their spells is lucky.
    pub fn magic_luck_ratio(&self) -> f64 {
        if self.magic_hit_count_deserved <= 0.0 {
            return 0.0;
        }
        f64::from(self.magic_hit_count) / self.magic_hit_count_deserved
    }

    /// Counter invariants. Records that fail this are rejected on import.
    pub fn is_consistent(&self) -> bool {
        self.success_count <= self.attack_count
            && self.offensive_pray_success_count <= self.attack_count
            && self.magic_attack_count <= self.attack_count
            && self.magic_hit_count <= self.magic_attack_count
            && self.deserved_damage.is_finite()
            && self.deserved_damage >= 0.0
            && self.magic_hit_count_deserved.is_finite()
            && self.magic_hit_count_deserved >= 0.0
            && !self.name.is_empty()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str { &self.name }
    pub fn live_actor(&self) -> Option<ActorId> { self.live }
    pub fn attack_count(&self) -> u32 { self.attack_count }
    pub fn success_count(&self) -> u32 { self.success_count }
    pub fn damage_dealt(&self) -> u32 { self.damage_dealt }
    pub fn magic_attack_count(&self) -> u32 { self.magic_attack_count }
    pub fn magic_hit_count(&self) -> u32 { self.magic_hit_count }
    pub fn magic_hit_count_deserved(&self) -> f64 { self.magic_hit_count_deserved }
    pub fn offensive_pray_success_count(&self) -> u32 { self.offensive_pray_success_count }
    pub fn hp_healed(&self) -> u32 { self.hp_healed }
    pub fn is_dead(&self) -> bool { self.dead }
    pub fn log(&self) -> &[FightLogEntry] { &self.log }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(whole) * 100.0
}
