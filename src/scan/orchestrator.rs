use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result, ScanError};
use crate::scan::pool::{self, EntityResult};
use crate::sink;
use crate::types::{Entity, MilestoneVerdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Dispatching,
    /// Every entity has been handed to a worker; waiting on in-flight work.
    Draining,
    Done,
}

/// Snapshot published on every completion. `completed` never decreases
/// within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub entity: Entity,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Ranked closest-first.
    pub verdicts: Vec<MilestoneVerdict>,
    pub scanned: usize,
    /// Processed cleanly but not actionable (outside window, below minimum).
    pub omitted: usize,
    pub skipped: Vec<SkippedEntity>,
    /// Skip counts keyed by failure kind.
    pub failures: BTreeMap<&'static str, usize>,
}

/// Drives one scan: fans entities out to a bounded pool, collects every
/// outcome, and ranks the verdicts.
pub struct ScanOrchestrator {
    progress: watch::Sender<ScanProgress>,
}

impl Default for ScanOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOrchestrator {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(ScanProgress {
            phase: ScanPhase::Idle,
            total: 0,
            completed: 0,
        });
        Self { progress }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    pub fn phase(&self) -> ScanPhase {
        self.progress.borrow().phase
    }

    fn publish(&self, p: ScanProgress) {
        // send_replace never waits on receivers and works with none attached.
        self.progress.send_replace(p);
    }

    /// Run `per_entity` over every entity with at most `concurrency` in flight.
    ///
    /// Per-entity errors and panics are logged and recorded in the report;
    /// they never abort the run. A `ScanError::Fatal` stops dispatch, lets
    /// in-flight work finish, and is returned as `AppError::InvalidInput`.
    pub async fn run<F, Fut>(
        &self,
        entities: Vec<Entity>,
        concurrency: usize,
        per_entity: F,
    ) -> Result<ScanReport>
    where
        F: Fn(Entity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EntityResult<MilestoneVerdict>> + Send + 'static,
    {
        if concurrency == 0 {
            return Err(AppError::Config("concurrency must be at least 1".to_string()));
        }

        let total = entities.len();
        let workers = concurrency.min(total).max(1);
        let mut progress = ScanProgress {
            phase: if total == 0 { ScanPhase::Draining } else { ScanPhase::Dispatching },
            total,
            completed: 0,
        };
        self.publish(progress);
        info!(total, concurrency = workers, "scan started");

        let mut fatal: Option<ScanError> = None;
        let run = pool::run(entities, concurrency, per_entity, |entity, result| {
            progress.completed += 1;
            let fatal_now = matches!(result, Err(e) if e.is_fatal());
            // Workers claim a new entity as soon as they finish one, so once
            // completions plus pool width cover the total nothing is queued.
            if fatal_now || progress.completed + workers >= total {
                progress.phase = ScanPhase::Draining;
            }
            self.publish(progress);

            match result {
                Ok(Some(v)) => info!(
                    entity_id = %entity.id,
                    name = %entity.display_name,
                    current = v.current_value,
                    target = v.target_milestone,
                    needed = v.needed,
                    "milestone approaching"
                ),
                Ok(None) => debug!(entity_id = %entity.id, "not actionable"),
                Err(e) if e.is_fatal() => {
                    error!(entity_id = %entity.id, "fatal scan error, stopping dispatch: {e}");
                    fatal.get_or_insert_with(|| e.clone());
                }
                Err(e) => warn!(entity_id = %entity.id, kind = e.kind(), "entity skipped: {e}"),
            }
        })
        .await;

        let mut report = ScanReport::default();
        for (entity, result) in run.completed {
            match result {
                Ok(Some(v)) => {
                    report.scanned += 1;
                    report.verdicts.push(v);
                }
                Ok(None) => {
                    report.scanned += 1;
                    report.omitted += 1;
                }
                Err(e) => {
                    *report.failures.entry(e.kind()).or_default() += 1;
                    report.skipped.push(SkippedEntity {
                        entity,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.verdicts = sink::rank(report.verdicts);

        progress.phase = ScanPhase::Done;
        self.publish(progress);

        if let Some(ScanError::Fatal(e)) = fatal {
            warn!(undispatched = run.undispatched.len(), "scan aborted");
            return Err(AppError::InvalidInput(e));
        }

        info!(
            scanned = report.scanned,
            matched = report.verdicts.len(),
            omitted = report.omitted,
            skipped = report.skipped.len(),
            "scan complete"
        );
        Ok(report)
    }
}
