//! Raw spell entries, the decoded catalog, and its JSON loader.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use combat_core::Magnitude;
use combat_core::env::{SpellDefinition, SpellKind, SpellOracle, StatusRider};
use combat_core::status::StatusKind;

/// Content loading failures. Gameplay never sees these; the server refuses
/// to boot on bad content instead.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse spell catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate spell entry: id {id} level {level}")]
    Duplicate { id: u16, level: u8 },
}

/// Status rider in raw file form.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RiderEntry {
    pub kind: StatusKind,
    /// Threshold-encoded magnitude, decoded on load.
    pub power_raw: i32,
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub pulses: u32,
}

impl RiderEntry {
    fn decode(self) -> StatusRider {
        StatusRider {
            kind: self.kind,
            power: Magnitude::decode(self.power_raw),
            duration_secs: self.duration_secs,
            pulses: self.pulses,
        }
    }
}

/// One spell level in raw file form, mirroring the legacy data layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpellEntry {
    pub id: u16,
    pub level: u8,
    pub kind: SpellKind,
    /// Threshold-encoded magnitude, decoded on load.
    #[serde(default)]
    pub power_raw: i32,
    #[serde(default)]
    pub intone_ms: u32,
    #[serde(default)]
    pub delay_ms: u32,
    #[serde(default)]
    pub cooldown_ms: u32,
    #[serde(default)]
    pub range: u16,
    #[serde(default)]
    pub mana_cost: u32,
    #[serde(default)]
    pub stamina_cost: u32,
    #[serde(default)]
    pub uses_ammo: bool,
    #[serde(default)]
    pub weapon_subtype: Option<u16>,
    #[serde(default)]
    pub auto_active: bool,
    #[serde(default)]
    pub chance_pct: Option<u32>,
    #[serde(default)]
    pub weapon_spell: bool,
    #[serde(default)]
    pub target_corpse: bool,
    #[serde(default)]
    pub auto_repeat: bool,
    #[serde(default)]
    pub rider: Option<RiderEntry>,
    #[serde(default)]
    pub summon_template: Option<u16>,
}

impl SpellEntry {
    /// Converts into the decoded engine form.
    pub fn decode(self) -> SpellDefinition {
        SpellDefinition {
            id: self.id,
            level: self.level,
            kind: self.kind,
            power: Magnitude::decode(self.power_raw),
            intone_ms: self.intone_ms,
            delay_ms: self.delay_ms,
            cooldown_ms: self.cooldown_ms,
            range: self.range,
            mana_cost: self.mana_cost,
            stamina_cost: self.stamina_cost,
            uses_ammo: self.uses_ammo,
            weapon_subtype: self.weapon_subtype,
            auto_active: self.auto_active,
            chance_pct: self.chance_pct,
            weapon_spell: self.weapon_spell,
            target_corpse: self.target_corpse,
            auto_repeat: self.auto_repeat,
            rider: self.rider.map(RiderEntry::decode),
            summon_template: self.summon_template,
        }
    }
}

/// On-disk catalog shape.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    spells: Vec<SpellEntry>,
}

/// Decoded spell catalog, keyed by (id, level).
#[derive(Debug, Default)]
pub struct SpellCatalog {
    spells: BTreeMap<(u16, u8), SpellDefinition>,
}

impl SpellCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = SpellEntry>,
    ) -> Result<Self, ContentError> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry.decode())?;
        }
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_entries(file.spells)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, ContentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, spell: SpellDefinition) -> Result<(), ContentError> {
        let key = (spell.id, spell.level);
        if self.spells.contains_key(&key) {
            return Err(ContentError::Duplicate {
                id: spell.id,
                level: spell.level,
            });
        }
        self.spells.insert(key, spell);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpellDefinition> {
        self.spells.values()
    }
}

impl SpellOracle for SpellCatalog {
    fn spell(&self, id: u16, level: u8) -> Option<&SpellDefinition> {
        self.spells.get(&(id, level))
    }

    fn max_level(&self, id: u16) -> Option<u8> {
        self.spells
            .range((id, 0)..=(id, u8::MAX))
            .map(|((_, level), _)| *level)
            .max()
    }
}
