use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::types::CacheRecord;

/// Per-entity time-series store consulted before historical fetches.
///
/// Records live in memory for the run and, when a directory is configured,
/// as one JSON file per entity. A file is replaced atomically (write to a
/// temp file, then rename) so a reader never sees a half-written record.
pub struct EntityCache {
    dir: Option<PathBuf>,
    memory: DashMap<String, CacheRecord>,
}

impl EntityCache {
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            memory: DashMap::new(),
        }
    }

    pub async fn on_disk(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir: Some(dir),
            memory: DashMap::new(),
        })
    }

    /// `"Connor McDavid"` → `connor_mcdavid`, `"8478402"` → `8478402`.
    pub fn normalize_key(entity_id: &str) -> String {
        entity_id
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{key}.json")))
    }

    pub async fn get(&self, entity_id: &str) -> Option<CacheRecord> {
        let key = Self::normalize_key(entity_id);
        if let Some(rec) = self.memory.get(&key) {
            return Some(rec.clone());
        }

        let path = self.path_for(&key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "cache read failed: {e}");
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), "ignoring malformed cache record: {e}");
                return None;
            }
        };
        if Self::normalize_key(&record.entity_id) != key || record.series.is_empty() {
            warn!(path = %path.display(), "ignoring cache record for a different or empty entity");
            return None;
        }

        debug!(entity_id, points = record.series.len(), "cache hit (disk)");
        self.memory.insert(key, record.clone());
        Some(record)
    }

    /// Store a complete series. Empty series are refused: callers only cache
    /// history they fully obtained.
    pub async fn put(&self, entity_id: &str, record: CacheRecord) -> Result<()> {
        if record.series.is_empty() {
            return Err(AppError::Cache(format!(
                "refusing to cache empty series for {entity_id}"
            )));
        }
        let key = Self::normalize_key(entity_id);

        if let Some(path) = self.path_for(&key) {
            let tmp = path.with_extension("json.tmp");
            let bytes = serde_json::to_vec_pretty(&record)?;
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &path).await?;
        }

        self.memory.insert(key, record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::types::{SeriesPoint, StatType};

    fn record(id: &str, goals: &[i64]) -> CacheRecord {
        CacheRecord {
            entity_id: id.to_string(),
            series: goals
                .iter()
                .enumerate()
                .map(|(i, g)| SeriesPoint {
                    period: format!("2024-10-{:02}", i + 1),
                    values: BTreeMap::from([(StatType::Goals, *g), (StatType::Points, g * 2)]),
                })
                .collect(),
            last_refreshed: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record("8471214", &[1, 0, 2, 1]);

        let cache = EntityCache::on_disk(dir.path()).await.unwrap();
        cache.put("8471214", rec.clone()).await.unwrap();

        // Fresh instance: nothing in memory, must come back from the file.
        let reopened = EntityCache::on_disk(dir.path()).await.unwrap();
        assert!(reopened.is_empty());
        let got = reopened.get("8471214").await.unwrap();
        assert_eq!(got.series, rec.series);
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EntityCache::on_disk(dir.path()).await.unwrap();
        assert!(cache.get("nobody").await.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{ not json").unwrap();
        let cache = EntityCache::on_disk(dir.path()).await.unwrap();
        assert!(cache.get("broken").await.is_none());
    }

    #[tokio::test]
    async fn empty_series_is_not_cached() {
        let cache = EntityCache::in_memory();
        let err = cache.put("x", record("x", &[])).await;
        assert!(err.is_err());
        assert!(cache.get("x").await.is_none());
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EntityCache::on_disk(dir.path()).await.unwrap();
        cache.put("Sidney Crosby", record("Sidney Crosby", &[1])).await.unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sidney_crosby.json".to_string()]);
    }

    #[test]
    fn keys_are_normalized() {
        assert_eq!(EntityCache::normalize_key(" Connor McDavid "), "connor_mcdavid");
        assert_eq!(EntityCache::normalize_key("8478402"), "8478402");
        assert_eq!(EntityCache::normalize_key("J.T. Miller"), "j_t__miller");
    }
}
