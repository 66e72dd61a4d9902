/// Ranged ammunition and weapon data: embedded at compile time from `data/weapons.toml`.
///
/// Opponents' ammunition is not observable, so deserved damage for bolt and
/// dart weapons uses the ammo the user picked in `config.toml`. Weapons with a
/// single sensible ammo (bows, ballistae) map to a fixed entry instead.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ranged level assumed for bolt special effects (99 + ranging potion).
pub const RANGE_LEVEL: u32 = 112;

const WEAPON_DATA: &str = include_str!("../data/weapons.toml");

// ---------------------------------------------------------------------------
// Ammo data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmoData {
    pub name:              &'static str,
    pub range_strength:    i32,
    /// Average flat damage added by an enchanted bolt effect.
    pub bonus_max_hit:     f64,
    /// Multiplier applied to the max hit by an enchanted bolt effect.
    pub damage_modifier:   f64,
    /// Multiplier applied to the hit chance by an enchanted bolt effect.
    pub accuracy_modifier: f64,
}

impl AmmoData {
    const fn plain(name: &'static str, range_strength: i32) -> Self {
        Self {
            name,
            range_strength,
            bonus_max_hit:     0.0,
            damage_modifier:   1.0,
            accuracy_modifier: 1.0,
        }
    }
}

/// Diamond (e) armour piercing: 5% proc chance against players, folded into accuracy.
const DIAMOND_ACCURACY_MODIFIER: f64 = 1.05;

fn dragonstone_bonus() -> f64 {
    (RANGE_LEVEL * 20 / 100) as f64 * 0.06
}

fn opal_bonus() -> f64 {
    (RANGE_LEVEL * 10 / 100) as f64 * 0.05
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoltAmmo {
    RuniteBolts,
    DragonstoneBoltsE,
    #[default]
    DiamondBoltsE,
}

impl BoltAmmo {
    pub fn data(self) -> AmmoData {
        match self {
            Self::RuniteBolts => AmmoData::plain("Runite Bolts", 115),
            Self::DragonstoneBoltsE => AmmoData {
                bonus_max_hit: dragonstone_bonus(),
                ..AmmoData::plain("Dstone Bolts (e)", 117)
            },
            Self::DiamondBoltsE => AmmoData {
                damage_modifier:   1.015,
                accuracy_modifier: DIAMOND_ACCURACY_MODIFIER,
                ..AmmoData::plain("Diamond Bolts (e)", 105)
            },
        }
    }
}

/// Bolts usable by the stronger crossbows (armadyl, dragon, zaryte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrongBoltAmmo {
    RuniteBolts,
    DragonstoneBoltsE,
    DiamondBoltsE,
    DragonstoneDragonBoltsE,
    OpalDragonBoltsE,
    #[default]
    DiamondDragonBoltsE,
}

impl StrongBoltAmmo {
    pub fn data(self) -> AmmoData {
        match self {
            Self::RuniteBolts       => BoltAmmo::RuniteBolts.data(),
            Self::DragonstoneBoltsE => BoltAmmo::DragonstoneBoltsE.data(),
            Self::DiamondBoltsE     => BoltAmmo::DiamondBoltsE.data(),
            Self::DragonstoneDragonBoltsE => AmmoData {
                bonus_max_hit: dragonstone_bonus(),
                ..AmmoData::plain("Dstone DBolts (e)", 122)
            },
            Self::OpalDragonBoltsE => AmmoData {
                bonus_max_hit: opal_bonus(),
                ..AmmoData::plain("Opal DBolts (e)", 122)
            },
            Self::DiamondDragonBoltsE => AmmoData {
                damage_modifier:   1.015,
                accuracy_modifier: DIAMOND_ACCURACY_MODIFIER,
                ..AmmoData::plain("Diamond DBolts (e)", 122)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DartAmmo {
    AdamantDarts,
    RuneDarts,
    #[default]
    DragonDarts,
}

impl DartAmmo {
    pub fn data(self) -> AmmoData {
        match self {
            Self::AdamantDarts => AmmoData::plain("Adamant Darts", 10),
            Self::RuneDarts    => AmmoData::plain("Rune Darts", 14),
            Self::DragonDarts  => AmmoData::plain("Dragon Darts", 20),
        }
    }
}

/// User-selected ammunition for weapons whose ammo cannot be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AmmoChoices {
    #[serde(default)]
    pub bolts:        BoltAmmo,
    #[serde(default)]
    pub strong_bolts: StrongBoltAmmo,
    #[serde(default)]
    pub darts:        DartAmmo,
}

// ---------------------------------------------------------------------------
// Weapon table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmoFamily {
    Bolts,
    StrongBolts,
    Darts,
    AmethystArrows,
    DragonArrows,
    DragonJavelins,
}

impl AmmoFamily {
    pub fn resolve(self, choices: &AmmoChoices) -> AmmoData {
        match self {
            Self::Bolts          => choices.bolts.data(),
            Self::StrongBolts    => choices.strong_bolts.data(),
            Self::Darts          => choices.darts.data(),
            Self::AmethystArrows => AmmoData::plain("Amethyst Arrows", 55),
            Self::DragonArrows   => AmmoData::plain("Dragon Arrows", 60),
            Self::DragonJavelins => AmmoData::plain("Dragon Javelins", 150),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeaponInfo {
    pub id:   u32,
    pub name: String,
    pub ammo: AmmoFamily,
}

#[derive(Deserialize)]
struct TomlFile {
    #[serde(default)]
    weapon: Vec<WeaponInfo>,
}

static WEAPONS: Lazy<HashMap<u32, WeaponInfo>> = Lazy::new(|| {
    match toml::from_str::<TomlFile>(WEAPON_DATA) {
        Ok(file) => file.weapon.into_iter().map(|w| (w.id, w)).collect(),
        Err(e) => {
            tracing::warn!("Failed to parse weapon TOML: {}", e);
            HashMap::new()
        }
    }
});

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn weapon(id: u32) -> Option<&'static WeaponInfo> {
    WEAPONS.get(&id)
}

/// Ammunition the deserved damage should assume for `weapon_id`, if it fires any
/// that the equipment bonuses do not already include.
pub fn ammo_for_weapon(weapon_id: u32, choices: &AmmoChoices) -> Option<AmmoData> {
    weapon(weapon_id).map(|w| w.ammo.resolve(choices))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        assert!(weapon(9185).is_some());
        assert_eq!(weapon(12926).map(|w| w.ammo), Some(AmmoFamily::Darts));
        assert!(weapon(4151).is_none()); // whip fires nothing
    }

    #[test]
    fn resolves_configured_bolts() {
        let choices = AmmoChoices {
            bolts: BoltAmmo::RuniteBolts,
            ..AmmoChoices::default()
        };
        let ammo = ammo_for_weapon(9185, &choices).unwrap();
        assert_eq!(ammo.range_strength, 115);

        let strong = ammo_for_weapon(11785, &choices).unwrap();
        assert_eq!(strong.name, "Diamond DBolts (e)");
        assert!((strong.damage_modifier - 1.015).abs() < 1e-9);
        assert!(strong.accuracy_modifier > 1.0);
        assert_eq!(ammo.accuracy_modifier, 1.0);
    }

    #[test]
    fn fixed_ammo_ignores_choices() {
        let ammo = ammo_for_weapon(19481, &AmmoChoices::default()).unwrap();
        assert_eq!(ammo.range_strength, 150);
    }

    #[test]
    fn enchanted_bolt_bonuses() {
        // 22 * 0.06 and 11 * 0.05
        assert!((BoltAmmo::DragonstoneBoltsE.data().bonus_max_hit - 1.32).abs() < 1e-9);
        assert!((StrongBoltAmmo::OpalDragonBoltsE.data().bonus_max_hit - 0.55).abs() < 1e-9);
    }

    #[test]
    fn choices_deserialize_snake_case() {
        let choices: AmmoChoices = toml::from_str(
            "bolts = \"dragonstone_bolts_e\"\ndarts = \"rune_darts\"",
        )
        .unwrap();
        assert_eq!(choices.bolts, BoltAmmo::DragonstoneBoltsE);
        assert_eq!(choices.darts, DartAmmo::RuneDarts);
        assert_eq!(choices.strong_bolts, StrongBoltAmmo::DiamondDragonBoltsE);
    }
}
