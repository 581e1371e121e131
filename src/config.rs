use std::path::PathBuf;

use crate::ranking::SortMode;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;

pub const RESOURCES_FILE: &str = "resources.json";
pub const JOURNAL_FILE: &str = "bookings.journal";

/// Settings for the maintenance binary. The library itself never reads the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Stale journal records tolerated before compaction.
    pub compact_threshold: u64,
    pub sort: SortMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            sort: SortMode::Default,
        }
    }
}

impl Config {
    /// `DESKBOOK_DATA_DIR`, `DESKBOOK_COMPACT_THRESHOLD`, `DESKBOOK_SORT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir = lookup("DESKBOOK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let compact_threshold = match lookup("DESKBOOK_COMPACT_THRESHOLD") {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid DESKBOOK_COMPACT_THRESHOLD, using default");
                defaults.compact_threshold
            }),
            None => defaults.compact_threshold,
        };

        let sort = match lookup("DESKBOOK_SORT") {
            Some(raw) => raw.parse::<SortMode>().unwrap_or_else(|e| {
                tracing::warn!("{e}, using default");
                defaults.sort
            }),
            None => defaults.sort,
        };

        Self {
            data_dir,
            compact_threshold,
            sort,
        }
    }

    pub fn resources_path(&self) -> PathBuf {
        self.data_dir.join(RESOURCES_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }
}
