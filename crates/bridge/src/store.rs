//! Boot-time key/value store
//!
//! Plain `KEY=VALUE` lines; blank lines and `#` comments are ignored.

use crate::BridgeError;
use std::path::Path;
use tracing::{info, warn};

/// Key/value lines read once at startup
#[derive(Debug, Clone, Default)]
pub struct KeyValueStore {
    entries: Vec<(String, String)>,
}

impl KeyValueStore {
    /// Read and parse a store file
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::Store {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::parse(&text);
        info!("Loaded {} keys from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parse store text
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    entries.push((key.trim().to_string(), value.trim().to_string()))
                }
                None => warn!("Line {}: no '=' in {:?}", number + 1, line),
            }
        }
        Self { entries }
    }

    /// Value of the first line with `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Lines keyed `<prefix><digits>`, in file order, rewritten as
    /// `key,value` so the key becomes the leading field.
    pub fn read_lines(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(prefix)
                    .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            })
            .map(|(key, value)| format!("{key},{value}"))
            .collect()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
