//! Entity sources: who gets scanned.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::fetcher::ResilientFetcher;
use crate::league::{nba, nhl, League};
use crate::types::{Entity, FetchOutcome};

/// Roster requests kept in flight at once. The politeness gate still spaces
/// them per host.
const ROSTER_PARALLELISM: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySource {
    /// Every active player the league publishes.
    League(League),
    /// JSON array of `{ "id": .., "display_name": .. }`.
    File(PathBuf),
}

pub async fn load(
    source: &EntitySource,
    fetcher: &ResilientFetcher,
    nba_season: &str,
) -> Result<Vec<Entity>> {
    let entities = match source {
        EntitySource::League(League::Nhl) => nhl_rosters(fetcher).await?,
        EntitySource::League(League::Nba) => nba_index(fetcher, nba_season).await?,
        EntitySource::File(path) => from_file(path).await?,
    };
    info!(count = entities.len(), "entities loaded");
    Ok(entities)
}

/// Current rosters of every NHL team. A team whose roster cannot be fetched
/// is skipped; players appearing on several rosters are kept once.
pub async fn nhl_rosters(fetcher: &ResilientFetcher) -> Result<Vec<Entity>> {
    let results: Vec<(&str, FetchOutcome<Vec<Entity>>)> =
        stream::iter(nhl::TEAM_ABBREVIATIONS.iter().copied())
            .map(|team| async move {
                let outcome = fetcher
                    .fetch(&nhl::roster_url(team), &[], nhl::parse_roster)
                    .await;
                (team, outcome)
            })
            .buffered(ROSTER_PARALLELISM)
            .collect()
            .await;

    let mut batches = Vec::new();
    for (team, outcome) in results {
        match outcome {
            FetchOutcome::Success(players) => batches.push(players),
            FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
                warn!(team, "roster unavailable, skipping team: {reason}");
            }
        }
    }
    if batches.is_empty() {
        return Err(AppError::Source(
            "no NHL roster could be fetched".to_string(),
        ));
    }
    Ok(dedup(batches.into_iter().flatten()))
}

pub async fn nba_index(fetcher: &ResilientFetcher, season: &str) -> Result<Vec<Entity>> {
    let url = nba::player_index_url(season);
    match fetcher.fetch(&url, &nba::headers(), nba::parse_player_index).await {
        FetchOutcome::Success(players) => Ok(dedup(players)),
        FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
            Err(AppError::Source(format!(
                "NBA player index unavailable: {reason}"
            )))
        }
    }
}

pub async fn from_file(path: &Path) -> Result<Vec<Entity>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Source(format!("{}: {e}", path.display())))?;
    let entities: Vec<Entity> = serde_json::from_slice(&bytes)?;

    let (valid, blank): (Vec<Entity>, Vec<Entity>) = entities
        .into_iter()
        .partition(|e| !e.id.trim().is_empty());
    if !blank.is_empty() {
        warn!(count = blank.len(), path = %path.display(), "ignoring entities without an id");
    }
    Ok(dedup(valid))
}

/// First occurrence of each id wins; order is preserved.
fn dedup(entities: impl IntoIterator<Item = Entity>) -> Vec<Entity> {
    let mut seen = HashSet::new();
    entities.into_iter().filter(|e| seen.insert(e.id.clone())).collect()
}
