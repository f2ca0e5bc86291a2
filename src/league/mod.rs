pub mod nba;
pub mod nhl;
pub mod team;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use team::{TeamRecord, TeamResolver};

use crate::types::{CareerTotal, SeriesPoint, StatType};

/// Upstream a scan runs against. Each league supplies URLs, headers and
/// payload parsers; the pipeline itself is league-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Nhl,
    Nba,
}

impl std::fmt::Display for League {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            League::Nhl => "nhl",
            League::Nba => "nba",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for League {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhl" => Ok(League::Nhl),
            "nba" => Ok(League::Nba),
            other => Err(format!("unknown league '{other}'")),
        }
    }
}

/// Everything the scanner needs from one career payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CareerSnapshot {
    pub total: i64,
    pub season_average: Option<f64>,
    pub recent_samples: Vec<i64>,
    /// Oldest → newest. Fed to a [`TeamResolver`].
    pub team_records: Vec<TeamRecord>,
    pub image_ref: Option<String>,
    /// Season identifiers with regular-season play, ascending.
    pub seasons: Vec<String>,
}

impl CareerSnapshot {
    pub fn career_total(&self, entity_id: &str, stat_type: StatType) -> CareerTotal {
        CareerTotal {
            entity_id: entity_id.to_string(),
            stat_type,
            cumulative_value: self.total,
        }
    }
}

impl League {
    pub fn career_url(&self, entity_id: &str) -> String {
        match self {
            League::Nhl => nhl::career_url(entity_id),
            League::Nba => nba::career_url(entity_id),
        }
    }

    pub fn game_log_url(&self, entity_id: &str, season: &str) -> String {
        match self {
            League::Nhl => nhl::game_log_url(entity_id, season),
            League::Nba => nba::game_log_url(entity_id, season),
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            League::Nhl => Vec::new(),
            League::Nba => nba::headers(),
        }
    }

    pub fn parse_career(
        &self,
        v: &Value,
        entity_id: &str,
        stat: StatType,
    ) -> Result<CareerSnapshot, String> {
        match self {
            League::Nhl => nhl::parse_career(v, entity_id, stat),
            League::Nba => nba::parse_career(v, entity_id, stat),
        }
    }

    pub fn parse_game_log(&self, v: &Value) -> Result<Vec<SeriesPoint>, String> {
        match self {
            League::Nhl => nhl::parse_game_log(v),
            League::Nba => nba::parse_game_log(v),
        }
    }

    /// Team resolution for this league. An NHL athlete with no usable team
    /// is reported under the league tag.
    pub fn team_resolver(&self, fallback_to_previous: bool) -> TeamResolver {
        let default_tag = match self {
            League::Nhl => Some("NHL".to_string()),
            League::Nba => None,
        };
        TeamResolver {
            fallback_to_previous,
            default_tag,
            ..TeamResolver::default()
        }
    }

    pub fn supports(&self, stat: StatType) -> bool {
        match self {
            League::Nhl => !matches!(stat, StatType::Rebounds),
            League::Nba => !matches!(stat, StatType::Goals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_parses_case_insensitively() {
        assert_eq!("NHL".parse::<League>(), Ok(League::Nhl));
        assert_eq!("nba".parse::<League>(), Ok(League::Nba));
        assert!("mlb".parse::<League>().is_err());
    }

    #[test]
    fn stat_support_per_league() {
        assert!(League::Nhl.supports(StatType::Goals));
        assert!(!League::Nhl.supports(StatType::Rebounds));
        assert!(League::Nba.supports(StatType::Rebounds));
        assert!(!League::Nba.supports(StatType::Goals));
    }

    #[test]
    fn nhl_resolver_defaults_to_league_tag() {
        let nhl = League::Nhl.team_resolver(true);
        assert_eq!(nhl.default_tag.as_deref(), Some("NHL"));
        assert_eq!(nhl.resolve(&[TeamRecord::new(None, "")]), Some("NHL".to_string()));
        assert!(!League::Nba.team_resolver(false).fallback_to_previous);
        assert_eq!(League::Nba.team_resolver(true).default_tag, None);
    }

    #[test]
    fn only_nba_sends_browser_headers() {
        assert!(League::Nhl.headers().is_empty());
        assert!(League::Nba.headers().iter().any(|(k, _)| k == "Referer"));
    }
}
