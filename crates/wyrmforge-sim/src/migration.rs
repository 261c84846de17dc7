//! Snapshot migration pipeline.
//!
//! Snapshots are migrated as raw JSON, one schema version at a time, before
//! they are decoded into a [`GameState`]. Every step only fills in what is
//! missing, so running it against a snapshot that already carries some of the
//! newer fields is safe.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};
use wyrmforge_common::{
    validate_version, IdSequence, SnapshotError, SnapshotResult, VersionError, VersionResult,
    CURRENT_SCHEMA_VERSION, MIN_SUPPORTED_VERSION,
};

use crate::crafting::default_recipes;
use crate::economy::{Currency, CurrencyKey};
use crate::gear::starter_gear;
use crate::materials::MaterialStock;
use crate::progression::level_distance_target;
use crate::sets::default_sets;
use crate::state::{GameState, LevelState, WorldMap};
use crate::travel::TravelState;

/// Trait for snapshot migrations.
pub trait Migration {
    /// Source version this migration applies to.
    fn source_version(&self) -> u32;

    /// Target version after migration.
    fn target_version(&self) -> u32;

    /// Migrates the snapshot object in place.
    fn migrate(&self, data: &mut Map<String, Value>) -> VersionResult<()>;

    /// Description of changes made.
    fn description(&self) -> &str;
}

/// A migration that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Version before the step
    pub from_version: u32,
    /// Version after the step
    pub to_version: u32,
    /// What the step did
    pub description: String,
}

/// Registry of available migrations.
pub struct MigrationRegistry {
    /// Migrations keyed by source version.
    migrations: BTreeMap<u32, Box<dyn Migration + Send + Sync>>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::with_builtin_migrations()
    }
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in migration.
    #[must_use]
    pub fn with_builtin_migrations() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ProgressionFields));
        registry.register(Box::new(ItemizationFields));
        registry.register(Box::new(CurrencyRename));
        registry.register(Box::new(EmbedSocketedRunes));
        registry
    }

    /// Registers a migration.
    pub fn register(&mut self, migration: Box<dyn Migration + Send + Sync>) {
        self.migrations.insert(migration.source_version(), migration);
    }

    /// Gets the migration for a source version.
    #[must_use]
    pub fn get(&self, source_version: u32) -> Option<&(dyn Migration + Send + Sync)> {
        self.migrations.get(&source_version).map(AsRef::as_ref)
    }

    /// Migrates a snapshot object from `from_version` up to `to_version`.
    ///
    /// `schemaVersion` is updated after every step.
    pub fn migrate(
        &self,
        data: &mut Map<String, Value>,
        from_version: u32,
        to_version: u32,
    ) -> VersionResult<Vec<MigrationRecord>> {
        let mut current = from_version;
        let mut records = Vec::new();

        while current < to_version {
            let Some(migration) = self.get(current) else {
                return Err(VersionError::MigrationFailed {
                    from: current,
                    to: current + 1,
                    reason: "no migration registered".to_string(),
                });
            };

            info!(
                "Applying migration: {} ({} -> {})",
                migration.description(),
                current,
                migration.target_version()
            );
            migration.migrate(data)?;

            let next = migration.target_version();
            data.insert("schemaVersion".to_string(), json!(next));
            records.push(MigrationRecord {
                from_version: current,
                to_version: next,
                description: migration.description().to_string(),
            });
            current = next;
        }

        Ok(records)
    }

    /// Lists all migrations as `(source, target, description)`.
    #[must_use]
    pub fn list_migrations(&self) -> Vec<(u32, u32, &str)> {
        self.migrations
            .values()
            .map(|m| (m.source_version(), m.target_version(), m.description()))
            .collect()
    }
}

/// Schema version a snapshot declares. Untagged snapshots are the oldest version.
#[must_use]
pub fn snapshot_version(data: &Value) -> u32 {
    data.get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(MIN_SUPPORTED_VERSION)
        .max(MIN_SUPPORTED_VERSION)
}

/// Migrates a persisted snapshot to the current schema and decodes it.
pub fn load_snapshot(snapshot: Value) -> SnapshotResult<(GameState, Vec<MigrationRecord>)> {
    let version = snapshot_version(&snapshot);
    let Value::Object(mut data) = snapshot else {
        return Err(SnapshotError::InvalidFormat(
            "snapshot is not a JSON object".to_string(),
        ));
    };

    validate_version(version)?;
    let records =
        MigrationRegistry::with_builtin_migrations().migrate(&mut data, version, CURRENT_SCHEMA_VERSION)?;

    let mut state: GameState = serde_json::from_value(Value::Object(data))?;
    state.clamp_progress();
    Ok((state, records))
}

fn to_json<T: Serialize>(value: &T, step: (u32, u32)) -> VersionResult<Value> {
    serde_json::to_value(value).map_err(|e| VersionError::MigrationFailed {
        from: step.0,
        to: step.1,
        reason: e.to_string(),
    })
}

fn is_missing(data: &Map<String, Value>, key: &str) -> bool {
    data.get(key).map_or(true, Value::is_null)
}

/// Inserts `value` under `key` when the key is absent or null.
fn ensure(data: &mut Map<String, Value>, key: &str, value: impl FnOnce() -> Value) {
    if is_missing(data, key) {
        data.insert(key.to_string(), value());
    }
}

fn ensure_with<T: Serialize>(
    data: &mut Map<String, Value>,
    key: &str,
    step: (u32, u32),
    value: impl FnOnce() -> T,
) -> VersionResult<()> {
    if is_missing(data, key) {
        data.insert(key.to_string(), to_json(&value(), step)?);
    }
    Ok(())
}

fn locked_currency(key: &str) -> Value {
    json!({ "key": key, "amount": 0, "unlocked": false })
}

/// 1 -> 2: distance-based progression and the world map.
struct ProgressionFields;

impl Migration for ProgressionFields {
    fn source_version(&self) -> u32 {
        1
    }

    fn target_version(&self) -> u32 {
        2
    }

    fn migrate(&self, data: &mut Map<String, Value>) -> VersionResult<()> {
        let step = (1, 2);
        ensure(data, "currentLevel", || json!(1));
        let level = data
            .get("currentLevel")
            .and_then(Value::as_u64)
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(1)
            .max(1);

        // Fractional level progress becomes meters of the first level's length.
        let progress = data
            .remove("levelProgress")
            .and_then(|p| p.as_f64())
            .unwrap_or(0.0);
        ensure(data, "levelDistance", || json!((progress * 15_000.0).floor()));
        ensure(data, "totalDistance", || json!(0.0));
        ensure(data, "levelDistanceTarget", || json!(level_distance_target(level)));
        ensure(data, "enemiesDefeated", || json!(0));
        ensure(data, "bossesDefeated", || json!(0));
        ensure_with(data, "worldMap", step, WorldMap::default)?;
        ensure_with(data, "currentLevelState", step, LevelState::default)?;
        ensure_with(data, "travelState", step, TravelState::default)?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Add level progression and world map"
    }
}

/// 2 -> 3: gear, materials, crafting, sets, runes and the newer currencies.
struct ItemizationFields;

impl Migration for ItemizationFields {
    fn source_version(&self) -> u32 {
        2
    }

    fn target_version(&self) -> u32 {
        3
    }

    fn migrate(&self, data: &mut Map<String, Value>) -> VersionResult<()> {
        let step = (2, 3);

        ensure(data, "currencies", || {
            json!({ "copper": { "key": "copper", "amount": 0, "unlocked": true } })
        });
        if let Some(currencies) = data.get_mut("currencies").and_then(Value::as_object_mut) {
            for key in ["forgegold", "dragonscales", "gems"] {
                ensure(currencies, key, || locked_currency(key));
            }
        }

        ensure(data, "equippedGear", || json!({}));
        ensure(data, "inventory", || json!([]));
        let has_gear = data
            .get("inventory")
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty())
            || data
                .get("equippedGear")
                .and_then(Value::as_object)
                .is_some_and(|slots| !slots.is_empty());
        if !has_gear {
            let mut ids: IdSequence = data
                .get("idSequence")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            let starter = to_json(&starter_gear(&mut ids), step)?;
            data.insert("inventory".to_string(), starter);
            data.insert("idSequence".to_string(), to_json(&ids, step)?);
        }

        ensure_with(data, "materials", step, MaterialStock::default)?;
        ensure_with(data, "recipes", step, default_recipes)?;
        ensure_with(data, "availableSets", step, default_sets)?;
        ensure(data, "runeInventory", || json!([]));
        Ok(())
    }

    fn description(&self) -> &str {
        "Add gear, materials, crafting, sets and runes"
    }
}

/// 3 -> 4: copper becomes steak and forgegold becomes gold.
struct CurrencyRename;

impl CurrencyRename {
    fn amount_of(entry: Option<&Value>) -> Option<Value> {
        entry.and_then(|c| c.get("amount")).filter(|a| !a.is_null()).cloned()
    }

    fn unlocked_of(entry: Option<&Value>) -> Option<bool> {
        entry.and_then(|c| c.get("unlocked")).and_then(Value::as_bool)
    }
}

impl Migration for CurrencyRename {
    fn source_version(&self) -> u32 {
        3
    }

    fn target_version(&self) -> u32 {
        4
    }

    fn migrate(&self, data: &mut Map<String, Value>) -> VersionResult<()> {
        let step = (3, 4);
        let old = data
            .get("currencies")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let steak_src = old.get("copper").or_else(|| old.get("steak"));
        let gold_src = old.get("forgegold").or_else(|| old.get("gold"));

        // Built in full before it replaces the old map.
        let mut rebuilt = Map::new();
        rebuilt.insert(
            "steak".to_string(),
            json!({
                "key": "steak",
                "amount": Self::amount_of(steak_src).unwrap_or(json!(0)),
                "unlocked": true,
            }),
        );
        rebuilt.insert(
            "gold".to_string(),
            json!({
                "key": "gold",
                "amount": Self::amount_of(gold_src).unwrap_or(json!(0)),
                "unlocked": Self::unlocked_of(gold_src).unwrap_or(false),
            }),
        );
        for (key, name) in [
            (CurrencyKey::Dragonscales, "dragonscales"),
            (CurrencyKey::Gems, "gems"),
        ] {
            let entry = old.get(name);
            let currency = Currency::new(key, 0, Self::unlocked_of(entry).unwrap_or(false));
            let mut value = to_json(&currency, step)?;
            if let Some(amount) = Self::amount_of(entry) {
                value["amount"] = amount;
            }
            rebuilt.insert(name.to_string(), value);
        }

        for dropped in old
            .keys()
            .filter(|k| !matches!(k.as_str(), "copper" | "steak" | "forgegold" | "gold" | "dragonscales" | "gems"))
        {
            warn!("Dropping unknown legacy currency {dropped}");
        }

        data.insert("currencies".to_string(), Value::Object(rebuilt));
        Ok(())
    }

    fn description(&self) -> &str {
        "Rename copper to steak and forgegold to gold"
    }
}

/// 4 -> 5: sockets hold the rune itself instead of a rune id.
struct EmbedSocketedRunes;

impl EmbedSocketedRunes {
    fn embed(piece: &mut Value, runes: &mut Vec<Value>) {
        let Some(sockets) = piece.get_mut("sockets").and_then(Value::as_array_mut) else {
            return;
        };
        for socket in sockets {
            let Some(socket) = socket.as_object_mut() else {
                continue;
            };
            let Some(rune_id) = socket.remove("runeId") else {
                continue;
            };
            let found = runes
                .iter()
                .position(|rune| rune.get("id") == Some(&rune_id));
            match found {
                Some(index) => {
                    socket.insert("rune".to_string(), runes.remove(index));
                },
                None => warn!("Dropping socket reference to missing rune {rune_id}"),
            }
        }
    }
}

impl Migration for EmbedSocketedRunes {
    fn source_version(&self) -> u32 {
        4
    }

    fn target_version(&self) -> u32 {
        5
    }

    fn migrate(&self, data: &mut Map<String, Value>) -> VersionResult<()> {
        let mut runes = data
            .get("runeInventory")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if let Some(equipped) = data.get_mut("equippedGear").and_then(Value::as_object_mut) {
            for piece in equipped.values_mut() {
                Self::embed(piece, &mut runes);
            }
        }
        if let Some(inventory) = data.get_mut("inventory").and_then(Value::as_array_mut) {
            for piece in inventory {
                Self::embed(piece, &mut runes);
            }
        }

        data.insert("runeInventory".to_string(), Value::Array(runes));
        Ok(())
    }

    fn description(&self) -> &str {
        "Store socketed runes inside their sockets"
    }
}
