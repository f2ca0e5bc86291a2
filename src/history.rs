//! Per-game history behind the entity cache.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::ScanError;
use crate::fetcher::ResilientFetcher;
use crate::league::League;
use crate::state::EntityCache;
use crate::types::{CacheRecord, FetchOutcome, SeriesPoint};

/// A per-game series and whether every requested season made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    /// Oldest first.
    pub series: Vec<SeriesPoint>,
    /// False when a season failed. Running totals over a gapped series are
    /// offset from the real career, so it is only good for recent form.
    pub complete: bool,
}

pub struct HistoryLoader {
    fetcher: Arc<ResilientFetcher>,
    cache: Arc<EntityCache>,
    league: League,
}

impl HistoryLoader {
    pub fn new(
        fetcher: Arc<ResilientFetcher>,
        cache: Arc<EntityCache>,
        league: League,
    ) -> Self {
        Self {
            fetcher,
            cache,
            league,
        }
    }

    /// Per-game series for `entity_id`.
    ///
    /// Served from the cache when present; cached series are always complete.
    /// Otherwise every season is fetched in order and the result is cached
    /// only if all seasons came back. A partial series is still returned for
    /// this run, flagged incomplete.
    pub async fn load(&self, entity_id: &str, seasons: &[String]) -> Result<History, ScanError> {
        if let Some(rec) = self.cache.get(entity_id).await {
            debug!(entity_id, games = rec.series.len(), "history from cache");
            return Ok(History {
                series: rec.series,
                complete: true,
            });
        }
        if seasons.is_empty() {
            return Err(ScanError::Parse(format!(
                "no seasons on record for {entity_id}"
            )));
        }

        let headers = self.league.headers();
        let league = self.league;
        let mut series = Vec::new();
        let mut missing = 0usize;

        for season in seasons {
            let url = league.game_log_url(entity_id, season);
            let outcome = self
                .fetcher
                .fetch(&url, &headers, move |v| league.parse_game_log(v))
                .await;
            match outcome {
                FetchOutcome::Success(mut games) => series.append(&mut games),
                FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
                    warn!(entity_id, season = %season, "season history unavailable: {reason}");
                    missing += 1;
                }
            }
        }

        if series.is_empty() {
            return Err(ScanError::Unreachable(format!(
                "no game history for {entity_id}"
            )));
        }

        if missing == 0 {
            let record = CacheRecord {
                entity_id: entity_id.to_string(),
                series: series.clone(),
                last_refreshed: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0),
            };
            if let Err(e) = self.cache.put(entity_id, record).await {
                warn!(entity_id, "history not cached: {e}");
            }
        } else {
            debug!(entity_id, missing, "partial history, not cached");
        }

        Ok(History {
            series,
            complete: missing == 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::resilient::tests::{ok, routed_fetcher, Scripted};
    use crate::types::StatType;

    fn log(games: &[(&str, i64)]) -> String {
        let entries: Vec<String> = games
            .iter()
            .map(|(d, g)| {
                format!(r#"{{"gameDate":"{d}","goals":{g},"assists":0,"points":{g}}}"#)
            })
            .collect();
        format!(r#"{{"gameLog":[{}]}}"#, entries.join(","))
    }

    fn seasons() -> Vec<String> {
        vec!["20222023".to_string(), "20232024".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn complete_history_is_cached_and_reused() {
        let (fetcher, transport) = routed_fetcher(vec![
            (
                "/game-log/20222023/",
                ok(&log(&[("2023-01-02", 1), ("2023-01-01", 0)])),
            ),
            ("/game-log/20232024/", ok(&log(&[("2024-01-01", 2)]))),
        ]);
        let cache = Arc::new(EntityCache::in_memory());
        let loader = HistoryLoader::new(fetcher, Arc::clone(&cache), League::Nhl);

        let history = loader.load("8471214", &seasons()).await.unwrap();
        assert!(history.complete);
        let goals: Vec<i64> = history.series.iter().map(|p| p.value(StatType::Goals)).collect();
        assert_eq!(goals, vec![0, 1, 2]);
        assert_eq!(transport.calls(), 2);
        assert_eq!(cache.len(), 1);

        let again = loader.load("8471214", &seasons()).await.unwrap();
        assert_eq!(again, history);
        assert_eq!(transport.calls(), 2, "second load must come from cache");
    }

    #[tokio::test(start_paused = true)]
    async fn partial_history_is_returned_but_not_cached() {
        let (fetcher, _) = routed_fetcher(vec![
            ("/game-log/20222023/", Scripted::Respond(503, String::new())),
            ("/game-log/20232024/", ok(&log(&[("2024-01-01", 2)]))),
        ]);
        let cache = Arc::new(EntityCache::in_memory());
        let loader = HistoryLoader::new(fetcher, Arc::clone(&cache), League::Nhl);

        let history = loader.load("8471214", &seasons()).await.unwrap();
        assert_eq!(history.series.len(), 1);
        assert!(!history.complete);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fetched_is_unreachable() {
        let (fetcher, _) = routed_fetcher(Vec::new());
        let loader = HistoryLoader::new(fetcher, Arc::new(EntityCache::in_memory()), League::Nhl);

        let err = loader.load("8471214", &seasons()).await.unwrap_err();
        assert!(matches!(err, ScanError::Unreachable(_)));

        let err = loader.load("8471214", &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::Parse(_)));
    }
}
