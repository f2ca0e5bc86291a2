//! NBA stats API (`stats.nba.com`). Tabular payloads: each result set is a
//! header list plus positional rows, so columns are located by header name.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::analysis::per_game;
use crate::league::{CareerSnapshot, TeamRecord};
use crate::types::{Entity, SeriesPoint, StatType};

pub const API_BASE: &str = "https://stats.nba.com/stats";
pub const HEADSHOT_CDN: &str = "https://cdn.nba.com/headshots/nba/latest/1040x760";

/// Aggregate row emitted for a season split across teams.
const AGGREGATE_TEAM: &str = "TOT";

fn stat_key(stat: StatType) -> Result<&'static str, String> {
    match stat {
        StatType::Points => Ok("PTS"),
        StatType::Assists => Ok("AST"),
        StatType::Rebounds => Ok("REB"),
        StatType::Goals => Err("goals are not tracked by the NBA API".to_string()),
    }
}

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/124.0 Safari/537.36"
);

/// stats.nba.com rejects requests that do not look like the nba.com site.
pub fn headers() -> Vec<(String, String)> {
    [
        ("User-Agent", USER_AGENT),
        ("Accept", "application/json, text/plain, */*"),
        ("Referer", "https://www.nba.com/"),
        ("Origin", "https://www.nba.com"),
        ("x-nba-stats-origin", "stats"),
        ("x-nba-stats-token", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn career_url(entity_id: &str) -> String {
    format!("{API_BASE}/playercareerstats?LeagueID=00&PerMode=Totals&PlayerID={entity_id}")
}

pub fn game_log_url(entity_id: &str, season: &str) -> String {
    format!(
        "{API_BASE}/playergamelog?PlayerID={entity_id}&Season={season}\
         &SeasonType=Regular%20Season"
    )
}

pub fn player_index_url(season: &str) -> String {
    format!("{API_BASE}/commonallplayers?IsOnlyCurrentSeason=1&LeagueID=00&Season={season}")
}

pub fn image_ref(entity_id: &str) -> String {
    format!("{HEADSHOT_CDN}/{entity_id}.png")
}

// ---------------------------------------------------------------------------
// Result sets
// ---------------------------------------------------------------------------

struct ResultSet<'a> {
    headers: Vec<&'a str>,
    rows: Vec<&'a [Value]>,
}

impl<'a> ResultSet<'a> {
    fn col(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn int(row: &[Value], col: usize) -> i64 {
        row.get(col)
            .and_then(|x| {
                x.as_i64()
                    .or_else(|| x.as_f64().map(|f| f.round() as i64))
            })
            .unwrap_or(0)
    }

    fn str(row: &'a [Value], col: usize) -> &'a str {
        row.get(col).and_then(|x| x.as_str()).unwrap_or("")
    }
}

fn parse_set(set: &Value) -> Option<ResultSet<'_>> {
    let headers = set
        .get("headers")?
        .as_array()?
        .iter()
        .map(|h| h.as_str().unwrap_or(""))
        .collect();
    let rows = set
        .get("rowSet")?
        .as_array()?
        .iter()
        .filter_map(|r| r.as_array().map(|a| a.as_slice()))
        .collect();
    Some(ResultSet { headers, rows })
}

/// Result set by name, or the first one when `fallback_first` is set.
fn result_set<'a>(v: &'a Value, name: &str, fallback_first: bool) -> Option<ResultSet<'a>> {
    let sets = v.get("resultSets")?.as_array()?;
    let named = sets
        .iter()
        .find(|s| s.get("name").and_then(|n| n.as_str()) == Some(name));
    match named {
        Some(s) => parse_set(s),
        None if fallback_first => sets.first().and_then(parse_set),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse a `playercareerstats` payload.
///
/// The career total comes from `CareerTotalsRegularSeason` when present,
/// otherwise from summing per-season rows while skipping `TOT` aggregates so
/// traded seasons are not counted twice.
pub fn parse_career(
    v: &Value,
    entity_id: &str,
    stat: StatType,
) -> Result<CareerSnapshot, String> {
    let key = stat_key(stat)?;

    let seasons = result_set(v, "SeasonTotalsRegularSeason", true)
        .ok_or_else(|| "missing SeasonTotalsRegularSeason".to_string())?;
    let stat_col = seasons.col(key).ok_or_else(|| format!("missing {key} column"))?;
    let season_col = seasons.col("SEASON_ID");
    let team_col = seasons.col("TEAM_ABBREVIATION");
    let team_id_col = seasons.col("TEAM_ID");
    let gp_col = seasons.col("GP");

    let is_aggregate = |row: &[Value]| -> bool {
        team_col.is_some_and(|c| ResultSet::str(row, c) == AGGREGATE_TEAM)
            || team_id_col.is_some_and(|c| row.get(c).and_then(|x| x.as_i64()) == Some(0))
    };

    let official = result_set(v, "CareerTotalsRegularSeason", false).and_then(|career| {
        let col = career.col(key)?;
        career.rows.first().map(|row| ResultSet::int(row, col))
    });
    let total = official.unwrap_or_else(|| {
        seasons
            .rows
            .iter()
            .copied()
            .filter(|r| !is_aggregate(*r))
            .map(|r| ResultSet::int(r, stat_col))
            .sum()
    });
    if total < 0 {
        return Err(format!("negative career {key} total: {total}"));
    }

    // Latest season: the aggregate row if the season was split, else the sum of its rows.
    let season_of = |row: &[Value]| -> String {
        season_col.map(|c| ResultSet::str(row, c).to_string()).unwrap_or_default()
    };
    let latest = seasons.rows.last().copied().map(|r| season_of(r));
    let season_average = latest.and_then(|latest| {
        let rows: Vec<&[Value]> = seasons
            .rows
            .iter()
            .copied()
            .filter(|r| season_of(*r) == latest)
            .collect();
        let gp = gp_col?;
        let (value, games) = match rows.iter().copied().find(|r| is_aggregate(*r)) {
            Some(agg) => (ResultSet::int(agg, stat_col), ResultSet::int(agg, gp)),
            None => rows.iter().fold((0, 0), |(v, g), r| {
                (v + ResultSet::int(r, stat_col), g + ResultSet::int(r, gp))
            }),
        };
        per_game(value, games)
    });

    let team_records = match team_col {
        Some(tc) => seasons
            .rows
            .iter()
            .map(|r| {
                let id = team_id_col.and_then(|c| r.get(c)).and_then(|x| x.as_i64());
                TeamRecord::new(id, ResultSet::str(r, tc))
            })
            .collect(),
        None => Vec::new(),
    };

    let season_ids: BTreeSet<String> = seasons
        .rows
        .iter()
        .map(|r| season_of(*r))
        .filter(|s| !s.is_empty())
        .collect();

    Ok(CareerSnapshot {
        total,
        season_average,
        recent_samples: Vec::new(),
        team_records,
        image_ref: Some(image_ref(entity_id)),
        seasons: season_ids.into_iter().collect(),
    })
}

/// Parse a `playergamelog` payload. Upstream lists games newest first.
pub fn parse_game_log(v: &Value) -> Result<Vec<SeriesPoint>, String> {
    let log = result_set(v, "PlayerGameLog", true)
        .ok_or_else(|| "missing PlayerGameLog".to_string())?;
    let date = log
        .col("GAME_DATE")
        .ok_or_else(|| "missing GAME_DATE column".to_string())?;
    let cols: Vec<(StatType, usize)> = [
        (StatType::Points, "PTS"),
        (StatType::Assists, "AST"),
        (StatType::Rebounds, "REB"),
    ]
    .into_iter()
    .filter_map(|(stat, name)| log.col(name).map(|c| (stat, c)))
    .collect();

    Ok(log
        .rows
        .iter()
        .rev()
        .map(|row| SeriesPoint {
            period: ResultSet::str(row, date).to_string(),
            values: cols
                .iter()
                .map(|&(stat, c)| (stat, ResultSet::int(row, c)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect())
}

/// Parse `commonallplayers` into active entities.
pub fn parse_player_index(v: &Value) -> Result<Vec<Entity>, String> {
    let set = result_set(v, "CommonAllPlayers", true)
        .ok_or_else(|| "missing CommonAllPlayers".to_string())?;
    let id = set
        .col("PERSON_ID")
        .ok_or_else(|| "missing PERSON_ID column".to_string())?;
    let name = set
        .col("DISPLAY_FIRST_LAST")
        .ok_or_else(|| "missing DISPLAY_FIRST_LAST column".to_string())?;
    let status = set.col("ROSTERSTATUS");

    Ok(set
        .rows
        .iter()
        .filter(|r| status.map_or(true, |c| ResultSet::int(r, c) == 1))
        .map(|r| {
            Entity::new(
                ResultSet::int(r, id).to_string(),
                ResultSet::str(r, name),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SEASON_HEADERS: &[&str] = &[
        "PLAYER_ID",
        "SEASON_ID",
        "TEAM_ID",
        "TEAM_ABBREVIATION",
        "GP",
        "AST",
        "PTS",
    ];

    fn career(with_totals: bool) -> Value {
        let mut sets = vec![json!({
            "name": "SeasonTotalsRegularSeason",
            "headers": SEASON_HEADERS,
            "rowSet": [
                [2544, "2022-23", 1610612747, "LAL", 55, 375, 1590],
                [2544, "2023-24", 1610612747, "LAL", 30, 200, 750],
                [2544, "2023-24", 1610612744, "GSW", 40, 300, 1000],
                [2544, "2023-24", 0, "TOT", 70, 500, 1750]
            ]
        })];
        if with_totals {
            sets.push(json!({
                "name": "CareerTotalsRegularSeason",
                "headers": ["PLAYER_ID", "GP", "AST", "PTS"],
                "rowSet": [[2544, 125, 875, 3340]]
            }));
        }
        json!({ "resultSets": sets })
    }

    #[test]
    fn career_totals_result_set_wins() {
        let snap = parse_career(&career(true), "2544", StatType::Points).unwrap();
        assert_eq!(snap.total, 3340);
    }

    #[test]
    fn summing_skips_aggregate_rows() {
        let snap = parse_career(&career(false), "2544", StatType::Points).unwrap();
        assert_eq!(snap.total, 1590 + 750 + 1000);
    }

    #[test]
    fn season_average_uses_aggregate_for_split_season() {
        let snap = parse_career(&career(false), "2544", StatType::Points).unwrap();
        assert!((snap.season_average.unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(snap.seasons, vec!["2022-23".to_string(), "2023-24".to_string()]);
    }

    #[test]
    fn team_records_end_with_placeholder_for_traded_player() {
        let snap = parse_career(&career(false), "2544", StatType::Points).unwrap();
        let last = snap.team_records.last().unwrap();
        assert_eq!(last.tag, "TOT");
        assert_eq!(last.id, Some(0));
        let resolved = crate::league::TeamResolver::default().resolve(&snap.team_records);
        assert_eq!(resolved, Some("GSW".to_string()));
    }

    #[test]
    fn missing_stat_column_is_an_error() {
        let v = json!({ "resultSets": [{
            "name": "SeasonTotalsRegularSeason",
            "headers": ["SEASON_ID"],
            "rowSet": []
        }]});
        assert!(parse_career(&v, "1", StatType::Points).is_err());
        assert!(parse_career(&json!({}), "1", StatType::Points).is_err());
        assert!(parse_career(&career(true), "1", StatType::Goals).is_err());
    }

    #[test]
    fn game_log_is_reversed_to_oldest_first() {
        let v = json!({ "resultSets": [ {
            "name": "PlayerGameLog",
            "headers": ["Game_ID", "GAME_DATE", "PTS", "AST", "REB"],
            "rowSet": [
                ["0022300002", "OCT 26, 2023", 21, 8, 8],
                ["0022300001", "OCT 24, 2023", 30, 5, 7]
            ]
        } ] });
        let series = parse_game_log(&v).unwrap();
        assert_eq!(series[0].period, "OCT 24, 2023");
        assert_eq!(series[0].value(StatType::Points), 30);
        assert_eq!(series[1].value(StatType::Rebounds), 8);
    }

    #[test]
    fn player_index_keeps_active_only() {
        let v = json!({ "resultSets": [ {
            "name": "CommonAllPlayers",
            "headers": ["PERSON_ID", "DISPLAY_FIRST_LAST", "ROSTERSTATUS"],
            "rowSet": [ [2544, "LeBron James", 1], [76003, "Kareem Abdul-Jabbar", 0] ]
        } ] });
        let players = parse_player_index(&v).unwrap();
        assert_eq!(players, vec![Entity::new("2544", "LeBron James")]);
    }

    #[test]
    fn negative_total_is_rejected() {
        let v = json!({ "resultSets": [{
            "name": "SeasonTotalsRegularSeason",
            "headers": SEASON_HEADERS,
            "rowSet": [[2544, "2023-24", 1610612747, "LAL", 10, 5, -20]]
        }]});
        let err = parse_career(&v, "2544", StatType::Points).unwrap_err();
        assert!(err.contains("negative"), "{err}");
    }
}
