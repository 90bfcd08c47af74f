//! Durable capability storage using redb.
//!
//! One table keyed by tool name; values are JSON-encoded records carrying a
//! schema version tag. A record with a mismatched schema tag reads as absent
//! (forcing a re-probe) rather than failing deserialization for the caller.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityModel;
use crate::error::{Result, RouterError};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: tool name. Value: JSON-encoded `StoredModel`.
const CAPABILITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("capabilities");

/// Bump when the serialized layout of `CapabilityModel` changes shape.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredModel {
    schema: u32,
    model: CapabilityModel,
}

// ---------------------------------------------------------------------------
// PatternStore
// ---------------------------------------------------------------------------

/// Persistent store for captured `CapabilityModel` records.
pub struct PatternStore {
    db: Database,
}

impl PatternStore {
    /// Open or create the redb database at `path`.
    ///
    /// Creates the `capabilities` table if it doesn't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(|e| RouterError::Store(e.to_string()))?;
        let wt = db
            .begin_write()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        wt.open_table(CAPABILITIES)
            .map_err(|e| RouterError::Store(e.to_string()))?;
        wt.commit()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        Ok(Self { db })
    }

    /// Fetch the stored model for `tool_name`, if present and readable under
    /// the current schema version.
    pub fn get(&self, tool_name: &str) -> Result<Option<CapabilityModel>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        let table = rt
            .open_table(CAPABILITIES)
            .map_err(|e| RouterError::Store(e.to_string()))?;
        let Some(value) = table
            .get(tool_name)
            .map_err(|e| RouterError::Store(e.to_string()))?
        else {
            return Ok(None);
        };
        let stored: StoredModel = match serde_json::from_slice(value.value()) {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };
        if stored.schema != SCHEMA_VERSION {
            return Ok(None);
        }
        Ok(Some(stored.model))
    }

    /// Insert or replace the model for its tool name.
    pub fn put(&self, model: &CapabilityModel) -> Result<()> {
        let stored = StoredModel {
            schema: SCHEMA_VERSION,
            model: model.clone(),
        };
        let value = serde_json::to_vec(&stored)?;
        let wt = self
            .db
            .begin_write()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        {
            let mut table = wt
                .open_table(CAPABILITIES)
                .map_err(|e| RouterError::Store(e.to_string()))?;
            table
                .insert(model.tool_name.as_str(), value.as_slice())
                .map_err(|e| RouterError::Store(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        Ok(())
    }

    /// Delete the entry for `tool_name` (no-op if absent).
    pub fn remove(&self, tool_name: &str) -> Result<()> {
        let wt = self
            .db
            .begin_write()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        {
            let mut table = wt
                .open_table(CAPABILITIES)
                .map_err(|e| RouterError::Store(e.to_string()))?;
            table
                .remove(tool_name)
                .map_err(|e| RouterError::Store(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        Ok(())
    }

    /// All readable models, sorted by tool name (table key order).
    pub fn list(&self) -> Result<Vec<CapabilityModel>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| RouterError::Store(e.to_string()))?;
        let table = rt
            .open_table(CAPABILITIES)
            .map_err(|e| RouterError::Store(e.to_string()))?;

        let mut result = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| RouterError::Store(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| RouterError::Store(e.to_string()))?;
            if let Ok(stored) = serde_json::from_slice::<StoredModel>(value.value()) {
                if stored.schema == SCHEMA_VERSION {
                    result.push(stored.model);
                }
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
