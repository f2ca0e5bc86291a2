//! NHL web API (`api-web.nhle.com`). Unauthenticated; landing payloads carry
//! official career totals, per-season totals and the last five games.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::analysis::per_game;
use crate::league::{CareerSnapshot, TeamRecord};
use crate::types::{Entity, SeriesPoint, StatType};

pub const API_BASE: &str = "https://api-web.nhle.com/v1";
pub const HEADSHOT_CDN: &str = "https://assets.nhle.com/mktg/gs/players/headshots";

/// Regular-season game type in NHL payloads.
const REGULAR_SEASON: i64 = 2;

pub const TEAM_ABBREVIATIONS: &[&str] = &[
    "ANA", "BOS", "BUF", "CGY", "CAR", "CHI", "COL", "CBJ", "DAL", "DET",
    "EDM", "FLA", "LAK", "MIN", "MTL", "NSH", "NJD", "NYI", "NYR", "OTT",
    "PHI", "PIT", "SJS", "SEA", "STL", "TBL", "TOR", "UTA", "VAN", "VGK",
    "WSH", "WPG",
];

const ROSTER_GROUPS: &[&str] = &["forwards", "defensemen", "goalies"];

fn stat_key(stat: StatType) -> Result<&'static str, String> {
    match stat {
        StatType::Goals => Ok("goals"),
        StatType::Assists => Ok("assists"),
        StatType::Points => Ok("points"),
        StatType::Rebounds => Err("rebounds are not tracked by the NHL API".to_string()),
    }
}

fn int(v: &Value, key: &str) -> i64 {
    v.get(key).and_then(|x| x.as_i64()).unwrap_or(0)
}

fn localized<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|n| n.get("default")).and_then(|d| d.as_str())
}

fn is_nhl_regular(season: &Value) -> bool {
    season.get("leagueAbbrev").and_then(|l| l.as_str()) == Some("NHL")
        && season.get("gameTypeId").and_then(|g| g.as_i64()) == Some(REGULAR_SEASON)
}

pub fn career_url(entity_id: &str) -> String {
    format!("{API_BASE}/player/{entity_id}/landing")
}

pub fn game_log_url(entity_id: &str, season: &str) -> String {
    format!("{API_BASE}/player/{entity_id}/game-log/{season}/{REGULAR_SEASON}")
}

pub fn roster_url(team: &str) -> String {
    format!("{API_BASE}/roster/{team}/current")
}

pub fn image_ref(entity_id: &str) -> String {
    format!("{HEADSHOT_CDN}/{entity_id}.png")
}

/// Parse a landing payload.
///
/// Prefers `careerTotals.regularSeason`; falls back to summing NHL
/// regular-season entries of `seasonTotals`. Neither present is an error.
pub fn parse_career(v: &Value, entity_id: &str, stat: StatType) -> Result<CareerSnapshot, String> {
    let key = stat_key(stat)?;

    let season_totals = v.get("seasonTotals").and_then(|s| s.as_array());
    let nhl_seasons: Vec<&Value> = season_totals
        .map(|a| a.iter().filter(|s| is_nhl_regular(s)).collect())
        .unwrap_or_default();

    let official = v
        .get("careerTotals")
        .and_then(|c| c.get("regularSeason"))
        .and_then(|r| r.get(key))
        .and_then(|x| x.as_i64());

    let total = match (official, season_totals) {
        (Some(t), _) => t,
        (None, Some(_)) => nhl_seasons.iter().map(|s| int(s, key)).sum(),
        (None, None) => return Err("neither careerTotals nor seasonTotals present".to_string()),
    };
    if total < 0 {
        return Err(format!("negative career {key} total: {total}"));
    }

    let season_average = nhl_seasons
        .last()
        .and_then(|s| per_game(int(s, key), int(s, "gamesPlayed")));

    let recent_samples: Vec<i64> = v
        .get("last5Games")
        .and_then(|g| g.as_array())
        .map(|games| games.iter().map(|g| int(g, key)).collect())
        .unwrap_or_default();

    // Season rows carry full team names only; the abbreviation is the one tag
    // form the landing payload has, so it is the only record.
    let current_team = v.get("currentTeamAbbrev").and_then(|t| t.as_str()).unwrap_or("");
    let team_records = vec![TeamRecord::new(None, current_team)];

    let image_ref = v
        .get("headshot")
        .and_then(|h| h.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| image_ref(entity_id));

    let seasons: BTreeSet<String> = nhl_seasons
        .iter()
        .filter_map(|s| {
            let season = s.get("season")?;
            season.as_i64().map(|n| n.to_string()).or_else(|| season.as_str().map(str::to_string))
        })
        .collect();

    Ok(CareerSnapshot {
        total,
        season_average,
        recent_samples,
        team_records,
        image_ref: Some(image_ref),
        seasons: seasons.into_iter().collect(),
    })
}

/// Parse one season's game log into per-game increments, oldest first.
pub fn parse_game_log(v: &Value) -> Result<Vec<SeriesPoint>, String> {
    let games = v
        .get("gameLog")
        .and_then(|g| g.as_array())
        .ok_or_else(|| "missing gameLog".to_string())?;

    let mut points: Vec<SeriesPoint> = games
        .iter()
        .map(|g| SeriesPoint {
            period: g.get("gameDate").and_then(|d| d.as_str()).unwrap_or("").to_string(),
            values: BTreeMap::from([
                (StatType::Goals, int(g, "goals")),
                (StatType::Assists, int(g, "assists")),
                (StatType::Points, int(g, "points")),
            ]),
        })
        .collect();
    points.sort_by(|a, b| a.period.cmp(&b.period));
    Ok(points)
}

/// Parse a team roster into entities.
pub fn parse_roster(v: &Value) -> Result<Vec<Entity>, String> {
    if !ROSTER_GROUPS.iter().any(|g| v.get(*g).is_some_and(|a| a.is_array())) {
        return Err("roster payload has no player groups".to_string());
    }

    let mut entities = Vec::new();
    for group in ROSTER_GROUPS {
        let Some(players) = v.get(*group).and_then(|a| a.as_array()) else { continue };
        for p in players {
            let Some(id) = p.get("id").and_then(|i| i.as_i64()) else { continue };
            let first = localized(p, "firstName").unwrap_or("");
            let last = localized(p, "lastName").unwrap_or("");
            let name = format!("{first} {last}").trim().to_string();
            entities.push(Entity::new(id.to_string(), name));
        }
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn season(season: i64, league: &str, game_type: i64, goals: i64, games: i64) -> Value {
        json!({
            "season": season,
            "leagueAbbrev": league,
            "gameTypeId": game_type,
            "goals": goals,
            "gamesPlayed": games
        })
    }

    fn landing() -> Value {
        json!({
            "playerId": 8471214,
            "currentTeamAbbrev": "WSH",
            "headshot": "https://assets.nhle.com/mugs/nhl/20242025/WSH/8471214.png",
            "careerTotals": {
                "regularSeason": { "goals": 895, "assists": 787, "points": 1682 }
            },
            "seasonTotals": [
                season(20222023, "NHL", 2, 42, 73),
                season(20222023, "NHL", 3, 5, 7),
                season(20232024, "KHL", 2, 3, 10),
                season(20232024, "NHL", 2, 31, 62)
            ],
            "last5Games": [
                { "goals": 1 },
                { "goals": 0 },
                { "goals": 2 },
                { "goals": 0 },
                { "goals": 1 }
            ]
        })
    }

    #[test]
    fn official_career_totals_win() {
        let snap = parse_career(&landing(), "8471214", StatType::Goals).unwrap();
        assert_eq!(snap.total, 895);
        assert_eq!(snap.recent_samples, vec![1, 0, 2, 0, 1]);
        assert!((snap.season_average.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(snap.seasons, vec!["20222023".to_string(), "20232024".to_string()]);
        assert_eq!(snap.team_records.last().unwrap().tag, "WSH");
        assert!(snap.image_ref.unwrap().ends_with("8471214.png"));
    }

    #[test]
    fn falls_back_to_summing_nhl_regular_seasons() {
        let mut v = landing();
        v.as_object_mut().unwrap().remove("careerTotals");
        let snap = parse_career(&v, "8471214", StatType::Goals).unwrap();
        // Playoffs (gameType 3) and KHL rows are excluded.
        assert_eq!(snap.total, 73);
    }

    #[test]
    fn missing_totals_is_an_error() {
        assert!(parse_career(&json!({ "playerId": 1 }), "1", StatType::Goals).is_err());
    }

    #[test]
    fn negative_total_is_rejected() {
        let mut v = landing();
        v["careerTotals"]["regularSeason"]["goals"] = json!(-5);
        assert!(parse_career(&v, "8471214", StatType::Goals).is_err());

        v.as_object_mut().unwrap().remove("careerTotals");
        v["seasonTotals"][0]["goals"] = json!(-100);
        assert!(parse_career(&v, "8471214", StatType::Goals).is_err());
    }

    #[test]
    fn team_record_is_the_current_abbreviation_only() {
        let snap = parse_career(&landing(), "8471214", StatType::Goals).unwrap();
        assert_eq!(snap.team_records, vec![TeamRecord::new(None, "WSH")]);

        let mut v = landing();
        v.as_object_mut().unwrap().remove("currentTeamAbbrev");
        let snap = parse_career(&v, "8471214", StatType::Goals).unwrap();
        let resolver = crate::league::League::Nhl.team_resolver(true);
        assert_eq!(resolver.resolve(&snap.team_records), Some("NHL".to_string()));
    }

    #[test]
    fn rebounds_are_rejected() {
        assert!(parse_career(&landing(), "8471214", StatType::Rebounds).is_err());
    }

    #[test]
    fn missing_headshot_uses_cdn_template() {
        let mut v = landing();
        v.as_object_mut().unwrap().remove("headshot");
        let snap = parse_career(&v, "8471214", StatType::Goals).unwrap();
        assert_eq!(
            snap.image_ref.as_deref(),
            Some("https://assets.nhle.com/mktg/gs/players/headshots/8471214.png")
        );
    }

    #[test]
    fn game_log_is_sorted_oldest_first() {
        let v = json!({ "gameLog": [
            { "gameDate": "2024-04-18", "goals": 1, "assists": 0, "points": 1 },
            { "gameDate": "2024-04-16", "goals": 0, "assists": 2, "points": 2 }
        ]});
        let series = parse_game_log(&v).unwrap();
        assert_eq!(series[0].period, "2024-04-16");
        assert_eq!(series[0].value(StatType::Assists), 2);
        assert_eq!(series[1].value(StatType::Goals), 1);
        assert!(parse_game_log(&json!({})).is_err());
    }

    #[test]
    fn roster_collects_all_groups() {
        let v = json!({
            "forwards": [{
                "id": 8478402,
                "firstName": { "default": "Connor" },
                "lastName": { "default": "McDavid" }
            }],
            "defensemen": [{
                "id": 8477934,
                "firstName": { "default": "Leon" },
                "lastName": { "default": "Draisaitl" }
            }],
            "goalies": []
        });
        let entities = parse_roster(&v).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0], Entity::new("8478402", "Connor McDavid"));
        assert!(parse_roster(&json!({ "message": "not found" })).is_err());
    }

    #[test]
    fn urls() {
        assert_eq!(career_url("8471214"), "https://api-web.nhle.com/v1/player/8471214/landing");
        assert_eq!(
            game_log_url("8471214", "20232024"),
            "https://api-web.nhle.com/v1/player/8471214/game-log/20232024/2"
        );
        assert_eq!(TEAM_ABBREVIATIONS.len(), 32);
    }
}
