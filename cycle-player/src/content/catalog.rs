//! Cycle catalogs and their cache views

use super::resolver::audio_path;
use super::{CycleCache, MasteredPool};
use crate::error::{Error, Result};
use cycle_common::Cycle;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Catalog file layout
///
/// ```toml
/// [[cycles]]
/// id = "S0001L01"
/// pause_duration_ms = 2500
/// known = { audio_id = "k-1", text = "I want" }
/// target = { voice1_audio_id = "t1-1", voice2_audio_id = "t2-1", text = "Quiero" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub cycles: Vec<Cycle>,
}

impl CatalogFile {
    /// Parse and validate catalog TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let catalog: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Common(cycle_common::Error::Toml(e)))?;

        let mut seen = HashSet::new();
        for cycle in &catalog.cycles {
            cycle.validate()?;
            if !seen.insert(cycle.id.as_str()) {
                return Err(Error::InvalidCycle(format!("duplicate cycle id {}", cycle.id)));
            }
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!("Loaded {} cycles from {}", catalog.cycles.len(), path.display());
        Ok(catalog)
    }
}

/// In-memory catalog with an explicit set of cached cycle ids
///
/// Also serves as a [`MasteredPool`] over the ids marked mastered.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    cycles: Vec<Cycle>,
    cached: RwLock<HashSet<String>>,
    mastered: RwLock<HashSet<String>>,
}

impl StaticCatalog {
    /// Catalog where nothing is cached yet
    pub fn new(cycles: Vec<Cycle>) -> Self {
        Self {
            cycles,
            cached: RwLock::new(HashSet::new()),
            mastered: RwLock::new(HashSet::new()),
        }
    }

    /// Catalog where every cycle is cached
    pub fn fully_cached(cycles: Vec<Cycle>) -> Self {
        let ids = cycles.iter().map(|c| c.id.clone()).collect();
        Self {
            cycles,
            cached: RwLock::new(ids),
            mastered: RwLock::new(HashSet::new()),
        }
    }

    pub fn set_cached(&self, cycle_id: &str, cached: bool) {
        let mut set = write(&self.cached);
        if cached {
            set.insert(cycle_id.to_string());
        } else {
            set.remove(cycle_id);
        }
    }

    pub fn set_mastered(&self, cycle_id: &str, mastered: bool) {
        let mut set = write(&self.mastered);
        if mastered {
            set.insert(cycle_id.to_string());
        } else {
            set.remove(cycle_id);
        }
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }
}

impl CycleCache for StaticCatalog {
    fn is_cycle_cached(&self, cycle: &Cycle) -> bool {
        read(&self.cached).contains(&cycle.id)
    }

    fn cached_cycles(&self) -> Vec<Cycle> {
        self.cycles.clone()
    }
}

impl MasteredPool for StaticCatalog {
    fn mastered_cycles(&self) -> Vec<Cycle> {
        let mastered = read(&self.mastered);
        self.cycles
            .iter()
            .filter(|c| mastered.contains(&c.id))
            .cloned()
            .collect()
    }
}

/// Catalog whose cache state is the presence of audio files on disk
///
/// A cycle counts as cached when all three of its audio files exist.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    cycles: Vec<Cycle>,
    cache_dir: PathBuf,
    extension: String,
}

impl DirectoryCatalog {
    pub fn new(cycles: Vec<Cycle>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cycles,
            cache_dir: cache_dir.into(),
            extension: "mp3".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl CycleCache for DirectoryCatalog {
    fn is_cycle_cached(&self, cycle: &Cycle) -> bool {
        cycle
            .audio_ids()
            .iter()
            .all(|id| audio_path(&self.cache_dir, id, &self.extension).is_file())
    }

    fn cached_cycles(&self) -> Vec<Cycle> {
        self.cycles.clone()
    }
}

fn read(lock: &RwLock<HashSet<String>>) -> RwLockReadGuard<'_, HashSet<String>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write(lock: &RwLock<HashSet<String>>) -> RwLockWriteGuard<'_, HashSet<String>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        [[cycles]]
        id = "c1"
        pause_duration_ms = 2000
        known = { audio_id = "k1", text = "I want" }
        target = { voice1_audio_id = "a1", voice2_audio_id = "b1", text = "Quiero" }

        [[cycles]]
        id = "c2"
        known = { audio_id = "k2" }
        target = { voice1_audio_id = "a2", voice2_audio_id = "b2" }
    "#;

    #[test]
    fn test_catalog_file_parses() {
        let catalog = CatalogFile::from_toml_str(CATALOG).unwrap();
        assert_eq!(catalog.cycles.len(), 2);
        assert_eq!(catalog.cycles[0].pause_duration_ms, 2000);
        assert_eq!(catalog.cycles[1].pause_duration_ms, 0);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let doubled = format!("{}\n{}", CATALOG, CATALOG);
        assert!(matches!(
            CatalogFile::from_toml_str(&doubled),
            Err(Error::InvalidCycle(_))
        ));
    }

    #[test]
    fn test_static_catalog_cache_and_mastery() {
        let catalog = StaticCatalog::new(vec![
            Cycle::new("c1", "k1", "a1", "b1", 0),
            Cycle::new("c2", "k2", "a2", "b2", 0),
        ]);
        let c1 = catalog.cycles()[0].clone();

        assert!(!catalog.is_cycle_cached(&c1));
        catalog.set_cached("c1", true);
        assert!(catalog.is_cycle_cached(&c1));
        catalog.set_cached("c1", false);
        assert!(!catalog.is_cycle_cached(&c1));

        catalog.set_mastered("c2", true);
        let mastered = catalog.mastered_cycles();
        assert_eq!(mastered.len(), 1);
        assert_eq!(mastered[0].id, "c2");
        assert_eq!(catalog.cached_cycles().len(), 2);
    }

    #[test]
    fn test_directory_catalog_requires_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let cycle = Cycle::new("c1", "k1", "a1", "b1", 0);
        let catalog = DirectoryCatalog::new(vec![cycle.clone()], dir.path());

        std::fs::write(dir.path().join("k1.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("a1.mp3"), b"x").unwrap();
        assert!(!catalog.is_cycle_cached(&cycle));

        std::fs::write(dir.path().join("b1.mp3"), b"x").unwrap();
        assert!(catalog.is_cycle_cached(&cycle));
    }
}
