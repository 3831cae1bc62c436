//! Store configuration from the environment.

use std::path::PathBuf;

/// Where the store lives and which namespace to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub namespace: String,
}

impl StoreConfig {
    pub const DEFAULT_NAMESPACE: &'static str = "flashcards";

    /// Read `RECALL_DB_PATH` and `RECALL_NAMESPACE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("RECALL_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);
        let namespace = lookup("RECALL_NAMESPACE")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_NAMESPACE.to_string());
        Self { db_path, namespace }
    }
}

fn default_db_path() -> PathBuf {
    // Use app data directory for production, fallback to current dir
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recall")
        .join("recall.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[]));
        assert_eq!(config.namespace, "flashcards");
        assert!(config.db_path.ends_with("recall/recall.db"));
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("RECALL_DB_PATH", "/tmp/cards.db"),
            ("RECALL_NAMESPACE", " alice "),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.namespace, "alice");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = StoreConfig::from_lookup(lookup(&[("RECALL_NAMESPACE", "  ")]));
        assert_eq!(config.namespace, StoreConfig::DEFAULT_NAMESPACE);
    }
}
