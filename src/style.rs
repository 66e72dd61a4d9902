/// Attack classification: maps raw animation ids to combat styles.
///
/// The table below is hand-curated game content: every animation the tracker
/// counts as an attack is listed with its attack type and any special-attack
/// modifiers. Anything not listed is `CombatStyle::NonCombat` and is never
/// scored.
///
/// Melee animations carry the finer stab/slash/crush split because the
/// defender's defence bonus depends on it; `AttackType::style()` folds them
/// back to `CombatStyle::Melee` for protection checks.
use serde::{Deserialize, Serialize};

/// Animation played by a player on death. Closes the fight immediately.
pub const DEATH_ANIMATION: i32 = 836;

/// Graphic shown on a player hit by a magic attack that splashed.
pub const SPLASH_GRAPHIC: i32 = 85;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatStyle {
    Melee,
    Ranged,
    Magic,
    NonCombat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    Stab,
    Slash,
    Crush,
    Ranged,
    Magic,
}

impl AttackType {
    pub fn style(self) -> CombatStyle {
        match self {
            Self::Stab | Self::Slash | Self::Crush => CombatStyle::Melee,
            Self::Ranged => CombatStyle::Ranged,
            Self::Magic  => CombatStyle::Magic,
        }
    }
}

/// Overhead protection prayer active on a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protection {
    ProtectMelee,
    ProtectRanged,
    ProtectMagic,
    #[default]
    None,
}

/// Offensive prayer active on a combatant when it attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffensivePrayer {
    UltimateStrength,
    IncredibleReflexes,
    Chivalry,
    Piety,
    EagleEye,
    Rigour,
    MysticMight,
    Augury,
}

impl OffensivePrayer {
    /// Style this prayer boosts.
    pub fn style(self) -> CombatStyle {
        match self {
            Self::UltimateStrength
            | Self::IncredibleReflexes
            | Self::Chivalry
            | Self::Piety => CombatStyle::Melee,
            Self::EagleEye | Self::Rigour => CombatStyle::Ranged,
            Self::MysticMight | Self::Augury => CombatStyle::Magic,
        }
    }
}

/// True if the attacker had an offensive prayer up for the style it attacked with.
pub fn is_offensive_pray_success(style: CombatStyle, prayer: Option<OffensivePrayer>) -> bool {
    style != CombatStyle::NonCombat && prayer.is_some_and(|p| p.style() == style)
}

// ---------------------------------------------------------------------------
// Animation table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationData {
    pub animation_id:      i32,
    pub name:              &'static str,
    pub attack_type:       AttackType,
    pub special:           bool,
    /// Multiplier applied to the attack roll (special attacks only).
    pub accuracy_modifier: f64,
    /// Multiplier applied to the max hit; multi-hit specials fold their hit count in.
    pub damage_modifier:   f64,
    /// Base max hit of the spell cast; 0 for non-magic animations.
    pub spell_base_damage: u32,
}

impl AnimationData {
    pub fn style(&self) -> CombatStyle {
        self.attack_type.style()
    }
}

const fn basic(animation_id: i32, name: &'static str, attack_type: AttackType) -> AnimationData {
    AnimationData {
        animation_id,
        name,
        attack_type,
        special: false,
        accuracy_modifier: 1.0,
        damage_modifier: 1.0,
        spell_base_damage: 0,
    }
}

const fn special(
    animation_id: i32,
    name: &'static str,
    attack_type: AttackType,
    accuracy_modifier: f64,
    damage_modifier: f64,
) -> AnimationData {
    AnimationData {
        animation_id,
        name,
        attack_type,
        special: true,
        accuracy_modifier,
        damage_modifier,
        spell_base_damage: 0,
    }
}

const fn spell(animation_id: i32, name: &'static str, spell_base_damage: u32) -> AnimationData {
    AnimationData {
        animation_id,
        name,
        attack_type: AttackType::Magic,
        special: false,
        accuracy_modifier: 1.0,
        damage_modifier: 1.0,
        spell_base_damage,
    }
}

static ANIMATIONS: &[AnimationData] = &[
    // Melee
    basic(376,  "Dragon dagger stab",      AttackType::Stab),
    basic(377,  "Dragon dagger slash",     AttackType::Slash),
    basic(386,  "Sword lunge",             AttackType::Stab),
    basic(390,  "Sword slash",             AttackType::Slash),
    basic(393,  "Claw scratch",            AttackType::Slash),
    basic(395,  "Battleaxe hack",          AttackType::Slash),
    basic(401,  "Warhammer pound",         AttackType::Crush),
    basic(406,  "Two-handed smash",        AttackType::Crush),
    basic(407,  "Two-handed slash",        AttackType::Slash),
    basic(414,  "Staff bash",              AttackType::Crush),
    basic(422,  "Punch",                   AttackType::Crush),
    basic(423,  "Kick",                    AttackType::Crush),
    basic(428,  "Spear jab",               AttackType::Stab),
    basic(440,  "Halberd swipe",           AttackType::Slash),
    basic(1658, "Whip flick",              AttackType::Slash),
    basic(1665, "Granite maul pound",      AttackType::Crush),
    basic(2066, "Dharok's greataxe smash", AttackType::Crush),
    basic(2067, "Dharok's greataxe hack",  AttackType::Slash),
    basic(7045, "Godsword slash",          AttackType::Slash),
    basic(7054, "Godsword smash",          AttackType::Crush),
    basic(7516, "Elder maul pound",        AttackType::Crush),
    basic(8056, "Scythe reap",             AttackType::Slash),
    basic(8145, "Rapier stab",             AttackType::Stab),
    special(1062, "Dragon dagger special",    AttackType::Stab,  1.15, 2.30),
    special(1378, "Dragon warhammer special", AttackType::Crush, 1.00, 1.50),
    special(1667, "Granite maul special",     AttackType::Crush, 1.00, 1.00),
    special(7514, "Dragon claws special",     AttackType::Slash, 1.00, 1.50),
    special(7515, "Vesta's longsword special", AttackType::Slash, 1.00, 1.20),
    special(7638, "Zamorak godsword special", AttackType::Slash, 2.00, 1.10),
    special(7642, "Bandos godsword special",  AttackType::Crush, 2.00, 1.21),
    special(7644, "Armadyl godsword special", AttackType::Slash, 2.00, 1.375),
    // Ranged
    basic(426,  "Bow shot",                AttackType::Ranged),
    basic(929,  "Knife throw",             AttackType::Ranged),
    basic(4230, "Crossbow shot",           AttackType::Ranged),
    basic(5061, "Blowpipe shot",           AttackType::Ranged),
    basic(7218, "Ballista shot",           AttackType::Ranged),
    basic(7552, "Armadyl crossbow shot",   AttackType::Ranged),
    basic(9168, "Zaryte crossbow shot",    AttackType::Ranged),
    special(1074, "Magic shortbow special",   AttackType::Ranged, 1.00, 2.00),
    special(7222, "Ballista special",         AttackType::Ranged, 1.25, 1.25),
    special(7521, "Dragon thrownaxe special", AttackType::Ranged, 1.25, 1.00),
    special(8292, "Dragon knife special",     AttackType::Ranged, 1.00, 2.00),
    // Magic
    spell(811,  "God spell",              30),
    spell(1162, "Standard spell",         20),
    spell(1978, "Ancient single target",  26),
    spell(1979, "Ancient multi target",   30),
    spell(7855, "Surge spell",            24),
    AnimationData {
        animation_id:      8532,
        name:              "Volatile nightmare staff special",
        attack_type:       AttackType::Magic,
        special:           true,
        accuracy_modifier: 1.5,
        damage_modifier:   1.0,
        spell_base_damage: 66,
    },
];

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Full table row for an animation, or `None` when it is not an attack.
pub fn animation_data(animation_id: i32) -> Option<&'static AnimationData> {
    ANIMATIONS.iter().find(|a| a.animation_id == animation_id)
}

pub fn classify(animation_id: i32) -> CombatStyle {
    animation_data(animation_id)
        .map(AnimationData::style)
        .unwrap_or(CombatStyle::NonCombat)
}

/// The overhead that negates `style`.
pub fn protection_for(style: CombatStyle) -> Protection {
    match style {
        CombatStyle::Melee     => Protection::ProtectMelee,
        CombatStyle::Ranged    => Protection::ProtectRanged,
        CombatStyle::Magic     => Protection::ProtectMagic,
        CombatStyle::NonCombat => Protection::None,
    }
}

/// An attack is an off-pray success when the defender is not praying against its style.
pub fn is_off_pray_success(style: CombatStyle, defender: Protection) -> bool {
    style != CombatStyle::NonCombat && protection_for(style) != defender
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn classifies_known_animations() {
        assert_eq!(classify(1658), CombatStyle::Melee);
        assert_eq!(classify(4230), CombatStyle::Ranged);
        assert_eq!(classify(1979), CombatStyle::Magic);
    }

    #[test]
    fn unknown_and_death_are_non_combat() {
        assert_eq!(classify(-1), CombatStyle::NonCombat);
        assert_eq!(classify(808), CombatStyle::NonCombat); // idle stance
        assert_eq!(classify(DEATH_ANIMATION), CombatStyle::NonCombat);
        assert!(animation_data(DEATH_ANIMATION).is_none());
    }

    #[test]
    fn classify_is_idempotent() {
        for id in [376, 426, 1978, 12345] {
            assert_eq!(classify(id), classify(id));
        }
    }

    #[test]
    fn table_has_no_duplicate_ids() {
        let mut seen = HashSet::new();
        for a in ANIMATIONS {
            assert!(seen.insert(a.animation_id), "duplicate id {}", a.animation_id);
        }
    }

    #[test]
    fn magic_rows_carry_spell_damage() {
        for a in ANIMATIONS {
            if a.attack_type == AttackType::Magic {
                assert!(a.spell_base_damage > 0, "{} has no spell damage", a.name);
            } else {
                assert_eq!(a.spell_base_damage, 0, "{} should not carry spell damage", a.name);
            }
        }
    }

    #[test]
    fn protection_mapping() {
        assert_eq!(protection_for(CombatStyle::Melee),  Protection::ProtectMelee);
        assert_eq!(protection_for(CombatStyle::Ranged), Protection::ProtectRanged);
        assert_eq!(protection_for(CombatStyle::Magic),  Protection::ProtectMagic);
        assert_eq!(protection_for(CombatStyle::NonCombat), Protection::None);
    }

    #[test]
    fn off_pray_success() {
        assert!(is_off_pray_success(CombatStyle::Ranged, Protection::ProtectMagic));
        assert!(is_off_pray_success(CombatStyle::Melee, Protection::None));
        assert!(!is_off_pray_success(CombatStyle::Magic, Protection::ProtectMagic));
        assert!(!is_off_pray_success(CombatStyle::NonCombat, Protection::None));
    }

    #[test]
    fn offensive_prayer_matches_style() {
        assert!(is_offensive_pray_success(CombatStyle::Melee, Some(OffensivePrayer::Piety)));
        assert!(is_offensive_pray_success(CombatStyle::Magic, Some(OffensivePrayer::Augury)));
        assert!(!is_offensive_pray_success(CombatStyle::Ranged, Some(OffensivePrayer::Piety)));
        assert!(!is_offensive_pray_success(CombatStyle::Ranged, None));
    }
}
