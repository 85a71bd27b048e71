//! Write-once baseline state and its file persistence.
//!
//! Two independent slots make up the baseline:
//!
//! - the total portfolio value at first observation (plain-text number file)
//! - a snapshot of each token's balance, price and decimals (pretty JSON file)
//!
//! Each slot is filled at most once. Absence means "not yet observed";
//! presence is the fixed reference for every later PnL comparison. A file
//! that is missing, empty or unparseable loads as absent.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Mint;

/// Default file name for the initial total value.
pub const VALUE_FILE: &str = "portfolio_value.json";
/// Default file name for the initial per-token snapshot.
pub const SNAPSHOT_FILE: &str = "portfolio_initial_snapshot.json";

/// One token's state at first observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub balance: f64,
    pub price: f64,
    pub decimals: u8,
}

impl TokenSnapshot {
    /// USD value at the snapshot's own price.
    pub fn value(&self) -> f64 {
        self.balance * self.price
    }
}

/// Per-token state captured on the first tick with both prices available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub tokens: BTreeMap<Mint, TokenSnapshot>,
}

impl PortfolioSnapshot {
    pub fn token(&self, mint: &Mint) -> Option<&TokenSnapshot> {
        self.tokens.get(mint)
    }
}

/// In-memory baseline, loaded once at startup and threaded through every tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Baseline {
    pub initial_value: Option<f64>,
    pub snapshot: Option<PortfolioSnapshot>,
}

impl Baseline {
    /// True once both slots are filled.
    pub fn is_complete(&self) -> bool {
        self.initial_value.is_some() && self.snapshot.is_some()
    }
}

/// File locations of the two baseline slots.
#[derive(Clone, Debug)]
pub struct BaselineStore {
    value_path: PathBuf,
    snapshot_path: PathBuf,
}

impl BaselineStore {
    pub fn new(value_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Store using the default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(VALUE_FILE), dir.join(SNAPSHOT_FILE))
    }

    pub fn value_path(&self) -> &Path {
        &self.value_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Load both slots. Never fails: unreadable slots come back absent.
    pub fn load(&self) -> Baseline {
        Baseline {
            initial_value: self.load_initial_value(),
            snapshot: self.load_snapshot(),
        }
    }

    pub fn load_initial_value(&self) -> Option<f64> {
        let raw = read_slot(&self.value_path)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(
                    "{} is not a finite number. Ignoring initial value.",
                    self.value_path.display()
                );
                None
            }
        }
    }

    pub fn load_snapshot(&self) -> Option<PortfolioSnapshot> {
        let raw = read_slot(&self.snapshot_path)?;
        match serde_json::from_str::<PortfolioSnapshot>(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(
                    "{} is invalid JSON ({e}). Ignoring snapshot.",
                    self.snapshot_path.display()
                );
                None
            }
        }
    }

    pub fn save_initial_value(&self, value: f64) -> Result<()> {
        write_slot(&self.value_path, &value.to_string())
    }

    pub fn save_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_slot(&self.snapshot_path, &json)
    }

    /// Delete both files. Returns how many existed.
    pub fn reset(&self) -> Result<usize> {
        let mut removed = 0;
        for path in [&self.value_path, &self.snapshot_path] {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(Error::BaselineRemove {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
        Ok(removed)
    }
}

/// Read a slot's trimmed contents; `None` when missing, unreadable or empty.
fn read_slot(path: &Path) -> Option<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("failed to read {}: {e}", path.display());
            return None;
        }
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn write_slot(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::BaselineWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| Error::BaselineWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> PortfolioSnapshot {
        let mut tokens = BTreeMap::new();
        tokens.insert(
            Mint::new("A"),
            TokenSnapshot {
                balance: 100.0,
                price: 1.0,
                decimals: 6,
            },
        );
        tokens.insert(
            Mint::new("B"),
            TokenSnapshot {
                balance: 50.0,
                price: 3.0,
                decimals: 9,
            },
        );
        PortfolioSnapshot {
            timestamp: "2026-01-01T00:00:00Z".parse().unwrap(),
            tokens,
        }
    }

    #[test]
    fn missing_files_load_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        assert_eq!(store.load(), Baseline::default());
    }

    #[test]
    fn empty_files_load_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        fs::write(store.value_path(), "  \n").unwrap();
        fs::write(store.snapshot_path(), "").unwrap();
        assert_eq!(store.load(), Baseline::default());
    }

    #[test]
    fn garbage_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        fs::write(store.value_path(), "not a number").unwrap();
        fs::write(store.snapshot_path(), "{ broken").unwrap();
        assert_eq!(store.load(), Baseline::default());
    }

    #[test]
    fn non_finite_value_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        fs::write(store.value_path(), "NaN").unwrap();
        assert_eq!(store.load_initial_value(), None);
    }

    #[test]
    fn value_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        store.save_initial_value(250.5).unwrap();
        assert_eq!(fs::read_to_string(store.value_path()).unwrap(), "250.5");
        assert_eq!(store.load_initial_value(), Some(250.5));
    }

    #[test]
    fn snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        let snapshot = sample_snapshot();
        store.save_snapshot(&snapshot).unwrap();

        let reopened = BaselineStore::in_dir(dir.path());
        assert_eq!(reopened.load_snapshot(), Some(snapshot));
    }

    #[test]
    fn snapshot_json_is_keyed_by_mint() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        store.save_snapshot(&sample_snapshot()).unwrap();

        let raw = fs::read_to_string(store.snapshot_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["tokens"]["B"]["price"], 3.0);
        assert_eq!(value["tokens"]["A"]["decimals"], 6);
        assert!(value["timestamp"].as_str().unwrap().starts_with("2026-01-01"));
    }

    #[test]
    fn reads_snapshot_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        fs::write(
            store.snapshot_path(),
            r#"{
              "timestamp": "2025-11-02T08:15:30.123Z",
              "tokens": {
                "A": { "balance": 10, "price": 2.5, "decimals": 6 }
              }
            }"#,
        )
        .unwrap();
        let snapshot = store.load_snapshot().unwrap();
        assert_eq!(snapshot.token(&Mint::new("A")).unwrap().value(), 25.0);
        assert!(snapshot.token(&Mint::new("B")).is_none());
    }

    #[test]
    fn reset_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(dir.path());
        store.save_initial_value(1.0).unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();

        assert_eq!(store.reset().unwrap(), 2);
        assert_eq!(store.reset().unwrap(), 0);
        assert_eq!(store.load(), Baseline::default());
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::in_dir(&dir.path().join("state").join("bot"));
        store.save_initial_value(42.0).unwrap();
        assert!(store.value_path().exists());
    }
}
