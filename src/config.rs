use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::fetcher::{BackoffPolicy, FetchPolicy};
use crate::league::{League, TeamResolver};
use crate::politeness::PolitenessConfig;
use crate::types::StatType;

pub const PROXY_ENDPOINT: &str = "http://api.scraperapi.com";
pub const CACHE_DIR: &str = ".milestone_cache";
pub const OUTPUT_PATH: &str = "milestones.json";

/// Season string for the NBA player index (`commonallplayers`).
pub const NBA_SEASON: &str = "2025-26";

/// Default worker pool width. Caps simultaneous load on the upstream host.
pub const SCAN_CONCURRENCY: usize = 5;

/// Games entered within this many units of a milestone count toward lift.
pub const LIFT_APPROACH: i64 = 2;

/// Step, proximity window and rookie filter for one league/stat pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProfile {
    pub league: League,
    pub stat: StatType,
    pub step: i64,
    pub within: i64,
    pub min_career: i64,
}

impl ScanProfile {
    pub fn preset(league: League, stat: StatType) -> Self {
        let (step, within, min_career) = match (league, stat) {
            (League::Nba, StatType::Points) => (1000, 250, 3000),
            (League::Nba, _) => (1000, 100, 1000),
            (League::Nhl, _) => (100, 15, 80),
        };
        Self {
            league,
            stat,
            step,
            within,
            min_career,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.league.supports(self.stat) {
            return Err(AppError::Config(format!(
                "{} does not track {}",
                self.league, self.stat
            )));
        }
        if self.step <= 0 {
            return Err(AppError::Config(format!(
                "step must be > 0, got {}",
                self.step
            )));
        }
        if self.within < 0 {
            return Err(AppError::Config(format!(
                "window must be >= 0, got {}",
                self.within
            )));
        }
        if self.min_career < 0 {
            return Err(AppError::Config(format!(
                "minimum career value must be >= 0, got {}",
                self.min_career
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Proxy credential (SCRAPERAPI_KEY). Absent ⇒ direct transport only.
    pub proxy_api_key: Option<String>,
    pub proxy_endpoint: String,
    pub concurrency: usize,
    pub politeness: PolitenessConfig,
    pub fetch: FetchPolicy,
    pub cache_dir: String,
    pub output_path: String,
    pub nba_season: String,
    pub profile: ScanProfile,
    pub team_resolver: TeamResolver,
    /// Fetch per-game history for actionable verdicts (lift + recent form).
    pub deep_dive: bool,
    pub lift_approach: i64,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| {
                AppError::Config(format!("{key} has an invalid value: {raw}"))
            }),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let league: League = env_parse("SCAN_LEAGUE", League::Nhl)?;
        let stat: StatType = env_parse("SCAN_STAT", StatType::Goals)?;

        let cfg = Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            proxy_api_key: std::env::var("SCRAPERAPI_KEY").ok().filter(|k| !k.trim().is_empty()),
            proxy_endpoint: std::env::var("PROXY_ENDPOINT")
                .unwrap_or_else(|_| PROXY_ENDPOINT.to_string()),
            concurrency: env_parse("SCAN_CONCURRENCY", SCAN_CONCURRENCY)?,
            politeness: PolitenessConfig {
                base_interval: Duration::from_millis(env_parse("POLITENESS_BASE_MS", 300u64)?),
                jitter_range: Duration::from_millis(env_parse("POLITENESS_JITTER_MS", 400u64)?),
            },
            fetch: FetchPolicy {
                max_retries_per_transport: env_parse("FETCH_MAX_RETRIES", 3u32)?,
                attempt_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECS", 30u64)?),
                backoff: BackoffPolicy {
                    base: Duration::from_millis(env_parse("BACKOFF_BASE_MS", 500u64)?),
                    max: Duration::from_millis(env_parse("BACKOFF_MAX_MS", 8_000u64)?),
                    jitter: Duration::from_millis(env_parse("BACKOFF_JITTER_MS", 250u64)?),
                },
            },
            cache_dir: std::env::var("CACHE_DIR").unwrap_or_else(|_| CACHE_DIR.to_string()),
            output_path: std::env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| OUTPUT_PATH.to_string()),
            nba_season: std::env::var("NBA_SEASON").unwrap_or_else(|_| NBA_SEASON.to_string()),
            profile: ScanProfile::preset(league, stat),
            team_resolver: league.team_resolver(env_parse("TEAM_FALLBACK", true)?),
            deep_dive: env_parse("DEEP_DIVE", false)?,
            lift_approach: env_parse("LIFT_APPROACH", LIFT_APPROACH)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AppError::Config(
                "SCAN_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_retries_per_transport == 0 {
            return Err(AppError::Config(
                "FETCH_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        self.profile.validate()
    }
}
