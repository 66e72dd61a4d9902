/// Deserved damage: the expected value of one attack.
///
/// Mirrors the game's hidden hit formulas:
///
///   effective level = floor(level * prayer) + 8
///   roll            = effective * (bonus + 64)
///   hit chance      = atk > def ? 1 - (def + 2) / (2 * (atk + 1))
///                               : atk / (2 * (def + 1))
///   max hit         = floor(0.5 + effective_str * (str_bonus + 64) / 640)
///
/// Prayers cannot be read off an opponent, so both sides are assumed to run
/// the strongest offensive and defensive prayers (Piety / Rigour / Augury).
/// Levels come from the loadout; the roster fills opponent levels from the
/// configured assumption.
///
/// Every function here is pure. A missing loadout on either side scores a
/// zero outcome: equipment often resolves a tick after the animation does.
use crate::{
    equipment::{self, AmmoChoices, AmmoData},
    style::{self, AnimationData, AttackType, CombatStyle, Protection},
};
use serde::{Deserialize, Serialize};

const PIETY_ATTACK:    f64 = 1.20;
const PIETY_STRENGTH:  f64 = 1.23;
const PIETY_DEFENCE:   f64 = 1.25;
const RIGOUR_ATTACK:   f64 = 1.20;
const RIGOUR_STRENGTH: f64 = 1.23;
const AUGURY_ATTACK:   f64 = 1.25;
const AUGURY_DEFENCE:  f64 = 1.25;

/// Protection prayers negate 40% of player damage.
pub const UNSUCCESSFUL_PRAY_DMG_MODIFIER: f64 = 0.6;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatLevels {
    pub attack:   u32,
    pub strength: u32,
    pub defence:  u32,
    pub ranged:   u32,
    pub magic:    u32,
}

impl CombatLevels {
    /// Maxed levels with the usual boosting potions.
    pub const fn boosted_max() -> Self {
        Self { attack: 118, strength: 118, defence: 120, ranged: 112, magic: 99 }
    }
}

impl Default for CombatLevels {
    fn default() -> Self {
        Self::boosted_max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentBonuses {
    pub attack_stab:      i32,
    pub attack_slash:     i32,
    pub attack_crush:     i32,
    pub attack_magic:     i32,
    pub attack_ranged:    i32,
    pub defence_stab:     i32,
    pub defence_slash:    i32,
    pub defence_crush:    i32,
    pub defence_magic:    i32,
    pub defence_ranged:   i32,
    pub melee_strength:   i32,
    pub ranged_strength:  i32,
    /// Percentage, e.g. 10 for +10% magic damage.
    pub magic_damage_pct: i32,
}

impl EquipmentBonuses {
    pub fn attack_bonus(&self, attack_type: AttackType) -> i32 {
        match attack_type {
            AttackType::Stab   => self.attack_stab,
            AttackType::Slash  => self.attack_slash,
            AttackType::Crush  => self.attack_crush,
            AttackType::Ranged => self.attack_ranged,
            AttackType::Magic  => self.attack_magic,
        }
    }

    pub fn defence_bonus(&self, attack_type: AttackType) -> i32 {
        match attack_type {
            AttackType::Stab   => self.defence_stab,
            AttackType::Slash  => self.defence_slash,
            AttackType::Crush  => self.defence_crush,
            AttackType::Ranged => self.defence_ranged,
            AttackType::Magic  => self.defence_magic,
        }
    }
}

/// Everything the calculator needs to know about one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Loadout {
    #[serde(default)]
    pub levels:    CombatLevels,
    #[serde(default)]
    pub bonuses:   EquipmentBonuses,
    #[serde(default)]
    pub weapon_id: Option<u32>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The scored result of one attack. Never mutated once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub style:           CombatStyle,
    pub success:         bool,
    pub deserved_damage: f64,
    pub accuracy_used:   f64,
    pub max_hit:         f64,
    /// Attacker had the offensive prayer matching its style active.
    #[serde(default)]
    pub offensive_pray_success: bool,
}

impl AttackOutcome {
    fn neutral(style: CombatStyle, success: bool) -> Self {
        Self {
            style,
            success,
            deserved_damage: 0.0,
            accuracy_used:   0.0,
            max_hit:         0.0,
            offensive_pray_success: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DeservedDamageCalc {
    ammo: AmmoChoices,
}

impl DeservedDamageCalc {
    pub fn new(ammo: AmmoChoices) -> Self {
        Self { ammo }
    }

    pub fn score(
        &self,
        attacker:   Option<&Loadout>,
        defender:   Option<&Loadout>,
        protection: Protection,
        animation:  &AnimationData,
    ) -> AttackOutcome {
        let style = animation.style();
        let success = style::is_off_pray_success(style, protection);

        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            return AttackOutcome::neutral(style, success);
        };

        let accuracy = self.accuracy(attacker, defender, animation);
        let max_hit  = self.max_hit(attacker, animation);
        let average_hit = if max_hit > 0.0 { (max_hit + 1.0) / 2.0 } else { 0.0 };
        let pray_modifier = if success { 1.0 } else { UNSUCCESSFUL_PRAY_DMG_MODIFIER };

        AttackOutcome {
            style,
            success,
            deserved_damage: average_hit * accuracy * pray_modifier,
            accuracy_used:   accuracy,
            max_hit,
            offensive_pray_success: false,
        }
    }

    fn accuracy(&self, attacker: &Loadout, defender: &Loadout, animation: &AnimationData) -> f64 {
        let attack_type = animation.attack_type;
        let atk_level = match attack_type.style() {
            CombatStyle::Ranged => effective_level(attacker.levels.ranged, RIGOUR_ATTACK),
            CombatStyle::Magic  => effective_level(attacker.levels.magic, AUGURY_ATTACK),
            _                   => effective_level(attacker.levels.attack, PIETY_ATTACK),
        };
        let def_level = if attack_type == AttackType::Magic {
            magic_defence_level(&defender.levels)
        } else {
            effective_level(defender.levels.defence, PIETY_DEFENCE)
        };

        let atk_roll = roll(atk_level, attacker.bonuses.attack_bonus(attack_type))
            * animation.accuracy_modifier;
        let def_roll = roll(def_level, defender.bonuses.defence_bonus(attack_type));

        let ammo_modifier = match attack_type.style() {
            CombatStyle::Ranged => self.ammo(attacker).map_or(1.0, |a| a.accuracy_modifier),
            _                   => 1.0,
        };
        (hit_chance(atk_roll, def_roll) * ammo_modifier).min(1.0)
    }

    fn ammo(&self, attacker: &Loadout) -> Option<AmmoData> {
        attacker
            .weapon_id
            .and_then(|id| equipment::ammo_for_weapon(id, &self.ammo))
    }

    fn max_hit(&self, attacker: &Loadout, animation: &AnimationData) -> f64 {
        match animation.attack_type.style() {
            CombatStyle::Magic => {
                let pct = 1.0 + f64::from(attacker.bonuses.magic_damage_pct) / 100.0;
                (f64::from(animation.spell_base_damage) * pct).floor() * animation.damage_modifier
            }
            CombatStyle::Ranged => {
                let ammo = self.ammo(attacker);
                let strength_bonus = attacker.bonuses.ranged_strength
                    + ammo.map_or(0, |a| a.range_strength);
                let base = base_max_hit(
                    effective_level(attacker.levels.ranged, RIGOUR_STRENGTH),
                    strength_bonus,
                );
                let (modifier, flat) = ammo.map_or((1.0, 0.0), |a| (a.damage_modifier, a.bonus_max_hit));
                base * modifier * animation.damage_modifier + flat
            }
            _ => {
                let base = base_max_hit(
                    effective_level(attacker.levels.strength, PIETY_STRENGTH),
                    attacker.bonuses.melee_strength,
                );
                base * animation.damage_modifier
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formula helpers
// ---------------------------------------------------------------------------

fn effective_level(level: u32, prayer: f64) -> f64 {
    (f64::from(level) * prayer).floor() + 8.0
}

/// Players defend magic with 70% magic and 30% defence.
fn magic_defence_level(levels: &CombatLevels) -> f64 {
    let magic   = (f64::from(levels.magic) * AUGURY_DEFENCE).floor();
    let defence = (f64::from(levels.defence) * PIETY_DEFENCE).floor();
    (magic * 0.7 + defence * 0.3).floor() + 8.0
}

fn roll(effective: f64, bonus: i32) -> f64 {
    (effective * f64::from(bonus + 64)).max(0.0)
}

fn base_max_hit(effective_strength: f64, strength_bonus: i32) -> f64 {
    (0.5 + effective_strength * f64::from(strength_bonus + 64) / 640.0).floor().max(0.0)
}

pub fn hit_chance(attack_roll: f64, defence_roll: f64) -> f64 {
    let chance = if attack_roll > defence_roll {
        1.0 - (defence_roll + 2.0) / (2.0 * (attack_roll + 1.0))
    } else {
        attack_roll / (2.0 * (defence_roll + 1.0))
    };
    chance.clamp(0.0, 1.0)
}
