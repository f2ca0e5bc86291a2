use std::sync::Arc;

use tracing::{debug, warn};

use crate::analysis;
use crate::config::ScanProfile;
use crate::error::ScanError;
use crate::fetcher::ResilientFetcher;
use crate::history::HistoryLoader;
use crate::league::{CareerSnapshot, TeamResolver};
use crate::milestone;
use crate::scan::pool::EntityResult;
use crate::types::{Auxiliary, Entity, FetchOutcome, MilestoneVerdict};

/// Games taken from a history when the career payload carries no recent form.
pub const RECENT_GAMES: usize = 5;

/// Per-entity pipeline: fetch career payload, parse, filter, evaluate, enrich.
pub struct LeagueScanner {
    fetcher: Arc<ResilientFetcher>,
    profile: ScanProfile,
    resolver: TeamResolver,
    headers: Vec<(String, String)>,
    history: Option<(Arc<HistoryLoader>, i64)>,
}

impl LeagueScanner {
    pub fn new(
        fetcher: Arc<ResilientFetcher>,
        profile: ScanProfile,
        resolver: TeamResolver,
    ) -> Self {
        let headers = profile.league.headers();
        Self {
            fetcher,
            profile,
            resolver,
            headers,
            history: None,
        }
    }

    /// Load per-game history for actionable verdicts and compute milestone
    /// lift over `approach`.
    pub fn with_history(mut self, history: Arc<HistoryLoader>, approach: i64) -> Self {
        self.history = Some((history, approach));
        self
    }

    /// `Ok(None)` when the entity is below the career minimum or outside the
    /// proximity window. A negative or unrepresentable total is a per-entity
    /// `ScanError::Parse`.
    pub async fn scan(&self, entity: Entity) -> EntityResult<MilestoneVerdict> {
        let ScanProfile {
            league,
            stat,
            step,
            within,
            min_career,
        } = self.profile;

        let url = league.career_url(&entity.id);
        let id = entity.id.clone();
        let parse = move |v: &serde_json::Value| league.parse_career(v, &id, stat);
        let snapshot = match self.fetcher.fetch(&url, &self.headers, parse).await {
            FetchOutcome::Success(s) => s,
            FetchOutcome::TransientFailure(reason) | FetchOutcome::PermanentFailure(reason) => {
                return Err(ScanError::Unreachable(reason));
            }
        };

        let career = snapshot.career_total(&entity.id, stat);
        if career.cumulative_value < 0 {
            return Err(ScanError::Parse(format!(
                "negative career total {} for {}",
                career.cumulative_value, entity.id
            )));
        }
        if career.cumulative_value < min_career {
            debug!(
                entity_id = %entity.id,
                total = career.cumulative_value,
                min_career,
                "below career minimum"
            );
            return Ok(None);
        }

        let m = milestone::evaluate(career.cumulative_value, step, within)?;
        if !m.actionable {
            return Ok(None);
        }

        let auxiliary = self.enrich(&entity, &snapshot, m.needed).await;

        Ok(Some(MilestoneVerdict {
            entity_id: entity.id,
            display_name: entity.display_name,
            stat_type: stat,
            current_value: m.current_value,
            target_milestone: m.target_milestone,
            needed: m.needed,
            auxiliary: Some(auxiliary),
        }))
    }

    async fn enrich(&self, entity: &Entity, snapshot: &CareerSnapshot, needed: i64) -> Auxiliary {
        let stat = self.profile.stat;
        let mut aux = Auxiliary {
            season_average: snapshot.season_average,
            recent_samples: snapshot.recent_samples.clone(),
            team_tag: self.resolver.resolve(&snapshot.team_records),
            image_ref: snapshot.image_ref.clone(),
            ..Auxiliary::default()
        };

        if let Some((history, approach)) = &self.history {
            match history.load(&entity.id, &snapshot.seasons).await {
                Ok(history) => {
                    let series = &history.series;
                    if aux.recent_samples.is_empty() {
                        let skip = series.len().saturating_sub(RECENT_GAMES);
                        aux.recent_samples = series[skip..].iter().map(|p| p.value(stat)).collect();
                    }
                    if history.complete {
                        aux.milestone_lift =
                            analysis::milestone_lift(series, stat, self.profile.step, *approach);
                    } else {
                        debug!(entity_id = %entity.id, "partial history, lift not computed");
                    }
                }
                Err(e) => warn!(entity_id = %entity.id, "history unavailable: {e}"),
            }
        }

        aux.recent_average = analysis::mean(&aux.recent_samples);
        aux.est_games_season_pace = aux
            .season_average
            .and_then(|a| analysis::games_to_milestone(needed, a));
        aux.est_games_recent_pace = aux
            .recent_average
            .and_then(|a| analysis::games_to_milestone(needed, a));
        aux
    }
}
