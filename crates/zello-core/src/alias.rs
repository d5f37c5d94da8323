//! Zello alias to radio ID mapping.
//!
//! Operators maintain a YAML list pairing Zello display names with radio
//! IDs. Lookups ignore case and whitespace so `"Foo Bar"` and `"foobar"`
//! resolve identically; a missing alias resolves to 0 and the caller
//! falls back to its configured source ID.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, ZelloError};

#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(rename = "zelloAliases", default)]
    zello_aliases: Vec<AliasEntry>,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    rid: u32,
    alias: String,
}

/// Case- and whitespace-insensitive alias table.
#[derive(Debug, Default, Clone)]
pub struct AliasMap {
    map: HashMap<String, u32>,
}

impl AliasMap {
    /// Load from a YAML file. A missing path yields an empty map.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "alias file not found, aliases disabled");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ZelloError::AliasFile(e.to_string()))?;
        let map = Self::from_yaml(&text)?;
        info!(path = %path.display(), aliases = map.len(), "loaded alias file");
        Ok(map)
    }

    /// Parse from YAML text. Later duplicates overwrite earlier ones.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: AliasFile =
            serde_yaml::from_str(text).map_err(|e| ZelloError::AliasFile(e.to_string()))?;
        let mut map = HashMap::with_capacity(file.zello_aliases.len());
        for entry in file.zello_aliases {
            map.insert(normalize(&entry.alias), entry.rid);
        }
        Ok(Self { map })
    }

    /// Resolve an alias to its radio ID, 0 when absent or empty.
    pub fn lookup(&self, alias: &str) -> u32 {
        let key = normalize(alias);
        if key.is_empty() {
            return 0;
        }
        self.map.get(&key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn normalize(alias: &str) -> String {
    alias
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
