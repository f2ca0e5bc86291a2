use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One athlete to scan. Supplied by an entity source, immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub display_name: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Points,
    Goals,
    Assists,
    Rebounds,
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatType::Points => "points",
            StatType::Goals => "goals",
            StatType::Assists => "assists",
            StatType::Rebounds => "rebounds",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "points" | "pts" => Ok(StatType::Points),
            "goals" => Ok(StatType::Goals),
            "assists" | "ast" => Ok(StatType::Assists),
            "rebounds" | "reb" => Ok(StatType::Rebounds),
            other => Err(format!("unknown stat type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Career total + verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerTotal {
    pub entity_id: String,
    pub stat_type: StatType,
    pub cumulative_value: i64,
}

/// Optional context attached to an actionable verdict for downstream reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auxiliary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_samples: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Games needed at season pace. None for a zero average or a 100+ game projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_games_season_pace: Option<u32>,
    /// Games needed at recent pace, same rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_games_recent_pace: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_lift: Option<LiftSummary>,
}

/// How an athlete historically performs in games entered just short of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiftSummary {
    pub milestone_games: usize,
    pub total_games: usize,
    pub milestone_average: f64,
    pub career_average: f64,
    /// `(milestone_average - career_average) / career_average * 100`, or 0
    /// when the career average is 0.
    pub pct_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneVerdict {
    pub entity_id: String,
    pub display_name: String,
    pub stat_type: StatType,
    pub current_value: i64,
    pub target_milestone: i64,
    pub needed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<Auxiliary>,
}

// ---------------------------------------------------------------------------
// Fetch outcome
// ---------------------------------------------------------------------------

/// Result of one logical fetch. `TransientFailure` describes a single failed
/// attempt; the fetcher only ever returns `Success` or `PermanentFailure` to
/// its callers once every transport is exhausted.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T = serde_json::Value> {
    Success(T),
    TransientFailure(String),
    PermanentFailure(String),
}

// ---------------------------------------------------------------------------
// Cache record
// ---------------------------------------------------------------------------

/// Stat increments recorded for one period (one game).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: String,
    pub values: BTreeMap<StatType, i64>,
}

impl SeriesPoint {
    pub fn value(&self, stat: StatType) -> i64 {
        self.values.get(&stat).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub entity_id: String,
    /// Ordered oldest → newest.
    pub series: Vec<SeriesPoint>,
    /// Unix seconds.
    pub last_refreshed: u64,
}
