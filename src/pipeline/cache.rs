//! Per-photo result cache
//!
//! Cached entries never carry cluster assignments: those depend on the
//! collection and the settings of the run that produced them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use crate::models::PhotoColorInfo;
use crate::Result;

/// Storage for per-photo analysis results
pub trait AnalysisCache: Send + Sync {
    fn get(&self, photo_id: &str) -> Option<PhotoColorInfo>;

    fn contains(&self, photo_id: &str) -> bool {
        self.get(photo_id).is_some()
    }

    fn store(&self, info: &PhotoColorInfo);
}

/// Thread-safe in-memory cache, persistable as JSON
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, PhotoColorInfo>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Load a cache previously written with [`InMemoryCache::to_json_file`]
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, PhotoColorInfo> = serde_json::from_str(&content)?;
        debug!(entries = entries.len(), path = %path.display(), "Loaded analysis cache");
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(&*self.lock())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PhotoColorInfo>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AnalysisCache for InMemoryCache {
    fn get(&self, photo_id: &str) -> Option<PhotoColorInfo> {
        self.lock().get(photo_id).cloned()
    }

    fn contains(&self, photo_id: &str) -> bool {
        self.lock().contains_key(photo_id)
    }

    fn store(&self, info: &PhotoColorInfo) {
        let mut entry = info.clone();
        entry.primary_cluster_index = None;
        entry.cluster_mix.clear();
        self.lock().insert(entry.photo_id.clone(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DominantColor;
    use palette::Srgb;

    fn info(id: &str) -> PhotoColorInfo {
        let mut info = PhotoColorInfo::new(id);
        info.dominant_colors.push(DominantColor::new(Srgb::new(0.2, 0.5, 0.7), 1.0));
        info.brightness_cdf = vec![1.0; 256];
        info.primary_cluster_index = Some(3);
        info.cluster_mix.insert(3, 1.0);
        info
    }

    #[test]
    fn test_store_strips_assignment() {
        let cache = InMemoryCache::new();
        assert!(!cache.contains("a"));
        cache.store(&info("a"));

        let cached = cache.get("a").unwrap();
        assert!(cache.contains("a"));
        assert_eq!(cached.primary_cluster_index, None);
        assert!(cached.cluster_mix.is_empty());
        assert_eq!(cached.dominant_colors.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_json_persistence() {
        let cache = InMemoryCache::new();
        cache.store(&info("a"));
        cache.store(&info("b"));

        let path = std::env::temp_dir().join(format!("colorscan_cache_{}.json", std::process::id()));
        cache.to_json_file(&path).unwrap();
        let loaded = InMemoryCache::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("b"), cache.get("b"));
    }
}
