/// Overlay-facing view of a fight: numbers plus pre-formatted strings.
///
/// All formatting is a pure function of `Fighter` state. The overlay
/// collaborator receives `FightSnapshot`s over a channel and renders them
/// as-is; `TotalsSnapshot` does the same for the whole history.
use crate::{
    fight::{Fight, FightRecord, FightState},
    fighter::Fighter,
    history::HistoryTotals,
};
use serde::Serialize;

/// `"42/59 (71%)"`
pub fn off_pray_stats(f: &Fighter) -> String {
    ratio(f.success_count(), f.attack_count(), f.off_pray_success_rate())
}

pub fn offensive_pray_stats(f: &Fighter) -> String {
    ratio(f.offensive_pray_success_count(), f.attack_count(), f.offensive_pray_success_rate())
}

/// `"hits/attempts (luck%)"`; luck 100% is exactly the deserved hit count.
pub fn magic_hit_stats(f: &Fighter) -> String {
    ratio(f.magic_hit_count(), f.magic_attack_count(), f.magic_luck_ratio() * 100.0)
}

/// Deserved damage with the differential against the other side, e.g. `"212 (+38)"`.
pub fn deserved_damage_stats(f: &Fighter, other: &Fighter) -> String {
    let own  = f.deserved_damage_total().round() as i64;
    let diff = (f.deserved_damage_total() - other.deserved_damage_total()).round() as i64;
    format!("{} ({:+})", own, diff)
}

pub fn damage_dealt_stats(f: &Fighter, other: &Fighter) -> String {
    let diff = i64::from(f.damage_dealt()) - i64::from(other.damage_dealt());
    format!("{} ({:+})", f.damage_dealt(), diff)
}

fn ratio(part: u32, whole: u32, pct: f64) -> String {
    format!("{}/{} ({}%)", part, whole, pct.round() as i64)
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FighterView {
    pub name:                 String,
    pub attack_count:         u32,
    pub success_count:        u32,
    pub off_pray_rate:        f64,
    pub offensive_pray_rate:  f64,
    pub deserved_damage:      f64,
    pub damage_dealt:         u32,
    pub magic_attack_count:   u32,
    pub magic_hit_count:      u32,
    pub magic_luck_ratio:     f64,
    pub hp_healed:            u32,
    pub dead:                 bool,
    pub off_pray_display:        String,
    pub offensive_pray_display:  String,
    pub magic_hits_display:      String,
    pub deserved_damage_display: String,
    pub damage_dealt_display:    String,
}

impl FighterView {
    pub fn new(f: &Fighter, other: &Fighter) -> Self {
        Self {
            name:                f.name().to_owned(),
            attack_count:        f.attack_count(),
            success_count:       f.success_count(),
            off_pray_rate:       f.off_pray_success_rate(),
            offensive_pray_rate: f.offensive_pray_success_rate(),
            deserved_damage:     f.deserved_damage_total(),
            damage_dealt:        f.damage_dealt(),
            magic_attack_count:  f.magic_attack_count(),
            magic_hit_count:     f.magic_hit_count(),
            magic_luck_ratio:    f.magic_luck_ratio(),
            hp_healed:           f.hp_healed(),
            dead:                f.is_dead(),
            off_pray_display:        off_pray_stats(f),
            offensive_pray_display:  offensive_pray_stats(f),
            magic_hits_display:      magic_hit_stats(f),
            deserved_damage_display: deserved_damage_stats(f, other),
            damage_dealt_display:    damage_dealt_stats(f, other),
        }
    }
}

/// Sent to the overlay after every event that touches an open fight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightSnapshot {
    pub state:      FightState,
    pub elapsed_ms: u64,
    pub competitor: FighterView,
    pub opponent:   FighterView,
}

impl FightSnapshot {
    pub fn from_fight(fight: &Fight, state: FightState, now_ms: u64) -> Self {
        let elapsed_ms = if fight.started() {
            now_ms.saturating_sub(fight.started_at_ms())
        } else {
            0
        };
        Self {
            state,
            elapsed_ms,
            competitor: FighterView::new(fight.competitor(), fight.opponent()),
            opponent:   FighterView::new(fight.opponent(), fight.competitor()),
        }
    }

    /// Final view of a closed fight.
    pub fn from_record(record: &FightRecord) -> Self {
        Self {
            state:      FightState::Idle,
            elapsed_ms: record.ended_at_ms.saturating_sub(record.started_at_ms),
            competitor: FighterView::new(&record.competitor, &record.opponent),
            opponent:   FighterView::new(&record.opponent, &record.competitor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsSnapshot {
    pub fights:     usize,
    pub competitor: FighterView,
    pub opponent:   FighterView,
}

impl TotalsSnapshot {
    pub fn from_totals(totals: &HistoryTotals) -> Self {
        Self {
            fights:     totals.fights,
            competitor: FighterView::new(&totals.competitor, &totals.opponent),
            opponent:   FighterView::new(&totals.opponent, &totals.competitor),
        }
    }

    /// Plain-text table for the terminal.
    pub fn summary(&self) -> String {
        let mut out = format!("Fights: {}\n", self.fights);
        for view in [&self.competitor, &self.opponent] {
            out.push_str(&format!(
                "{:<12} off-pray {:<16} deserved {:<14} dealt {:<14} magic {}\n",
                view.name,
                view.off_pray_display,
                view.deserved_damage_display,
                view.damage_dealt_display,
                view.magic_hits_display,
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{calc::AttackOutcome, fight::CloseReason, style::CombatStyle};

    fn attack(style: CombatStyle, success: bool, deserved: f64) -> AttackOutcome {
        AttackOutcome {
            style,
            success,
            deserved_damage: deserved,
            accuracy_used: 0.5,
            max_hit: 30.0,
            offensive_pray_success: success,
        }
    }

    #[test]
    fn off_pray_format() {
        let mut f = Fighter::detached("A");
        for i in 0..59 {
            f.record_attack(&attack(CombatStyle::Melee, i < 42, 1.0));
        }
        assert_eq!(off_pray_stats(&f), "42/59 (71%)");
        assert_eq!(offensive_pray_stats(&f), "42/59 (71%)");
    }

    #[test]
    fn empty_fighter_formats_zeroes() {
        let f = Fighter::detached("A");
        assert_eq!(off_pray_stats(&f), "0/0 (0%)");
        assert_eq!(magic_hit_stats(&f), "0/0 (0%)");
        assert_eq!(deserved_damage_stats(&f, &f), "0 (+0)");
    }

    #[test]
    fn magic_luck_format() {
        let mut f = Fighter::detached("A");
        f.record_attack(&attack(CombatStyle::Magic, true, 5.0));
        f.record_attack(&attack(CombatStyle::Magic, true, 5.0));
        f.record_magic_splash_correction();
        // 1 hit over 1.0 deserved
        assert_eq!(magic_hit_stats(&f), "1/2 (100%)");
    }

    #[test]
    fn differentials_are_signed() {
        let mut a = Fighter::detached("A");
        let mut b = Fighter::detached("B");
        a.record_attack(&attack(CombatStyle::Ranged, true, 50.4));
        b.record_attack(&attack(CombatStyle::Ranged, true, 62.0));
        a.record_damage_dealt(40);
        b.record_damage_dealt(25);

        assert_eq!(deserved_damage_stats(&a, &b), "50 (-12)");
        assert_eq!(deserved_damage_stats(&b, &a), "62 (+12)");
        assert_eq!(damage_dealt_stats(&a, &b), "40 (+15)");
        assert_eq!(damage_dealt_stats(&b, &a), "25 (-15)");
    }

    #[test]
    fn record_snapshot_mirrors_sides() {
        let mut competitor = Fighter::detached("A");
        competitor.record_attack(&attack(CombatStyle::Melee, true, 10.0));
        let mut opponent = Fighter::detached("B");
        opponent.mark_dead();
        let record = FightRecord {
            competitor,
            opponent,
            started_at_ms: 1_000,
            ended_at_ms:   31_000,
            reason:        CloseReason::OpponentDied,
        };

        let snap = FightSnapshot::from_record(&record);
        assert_eq!(snap.elapsed_ms, 30_000);
        assert_eq!(snap.competitor.name, "A");
        assert!(snap.opponent.dead);
        assert_eq!(snap.competitor.deserved_damage_display, "10 (+10)");
        assert!(serde_json::to_string(&snap).is_ok());
    }

    #[test]
    fn totals_summary_lists_both_sides() {
        let mut competitor = Fighter::detached("A");
        competitor.record_attack(&attack(CombatStyle::Melee, true, 10.0));
        let mut opponent = Fighter::detached("Opponents");
        opponent.record_damage_dealt(7);
        let totals = HistoryTotals { fights: 3, competitor, opponent };

        let snap = TotalsSnapshot::from_totals(&totals);
        assert_eq!(snap.fights, 3);
        assert_eq!(snap.opponent.damage_dealt_display, "7 (+7)");

        let text = snap.summary();
        assert!(text.starts_with("Fights: 3\n"));
        assert!(text.contains("1/1 (100%)"));
        assert!(text.lines().nth(2).is_some_and(|l| l.starts_with("Opponents")));
    }
}
