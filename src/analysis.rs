//! Pure math over a verdict's context: pace projections and historical
//! milestone lift. No I/O.

use crate::types::{LiftSummary, SeriesPoint, StatType};

/// Projections at or beyond this many games are not reported.
pub const PACE_HORIZON_GAMES: u32 = 100;

/// Games needed to cover `needed` at `per_game`, rounded up.
pub fn games_to_milestone(needed: i64, per_game: f64) -> Option<u32> {
    if needed <= 0 || !per_game.is_finite() || per_game <= 0.0 {
        return None;
    }
    let games = (needed as f64 / per_game).ceil();
    if games >= PACE_HORIZON_GAMES as f64 {
        return None;
    }
    Some(games as u32)
}

pub fn per_game(total: i64, games_played: i64) -> Option<f64> {
    if games_played <= 0 || total < 0 {
        return None;
    }
    Some(total as f64 / games_played as f64)
}

pub fn mean(samples: &[i64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<i64>() as f64 / samples.len() as f64)
}

/// Compare output in games entered within `approach` of a milestone against
/// the career average.
///
/// The career total entering a game is the sum of all earlier games; a game
/// counts as a milestone game when `entering % step >= step - approach`.
pub fn milestone_lift(
    series: &[SeriesPoint],
    stat: StatType,
    step: i64,
    approach: i64,
) -> Option<LiftSummary> {
    if series.is_empty() || step <= 0 {
        return None;
    }
    let threshold = (step - approach).max(0);

    let mut entering = 0i64;
    let mut total = 0i64;
    let mut milestone_sum = 0i64;
    let mut milestone_games = 0usize;

    for point in series {
        let v = point.value(stat);
        if entering % step >= threshold {
            milestone_sum += v;
            milestone_games += 1;
        }
        entering += v;
        total += v;
    }

    let career_average = total as f64 / series.len() as f64;
    let milestone_average = if milestone_games > 0 {
        milestone_sum as f64 / milestone_games as f64
    } else {
        0.0
    };
    let pct_diff = if milestone_games > 0 && career_average > 0.0 {
        (milestone_average - career_average) / career_average * 100.0
    } else {
        0.0
    };

    Some(LiftSummary {
        milestone_games,
        total_games: series.len(),
        milestone_average,
        career_average,
        pct_diff,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn goals(values: &[i64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                period: format!("g{i}"),
                values: BTreeMap::from([(StatType::Goals, *v)]),
            })
            .collect()
    }

    #[test]
    fn projection_rounds_up() {
        assert_eq!(games_to_milestone(10, 0.4), Some(25));
        assert_eq!(games_to_milestone(250, 25.0), Some(10));
        assert_eq!(games_to_milestone(251, 25.0), Some(11));
    }

    #[test]
    fn projection_absent_for_zero_pace_or_far_horizon() {
        assert_eq!(games_to_milestone(10, 0.0), None);
        assert_eq!(games_to_milestone(100, 1.0), None);
        assert_eq!(games_to_milestone(99, 1.0), Some(99));
    }

    #[test]
    fn per_game_and_mean() {
        assert_eq!(per_game(30, 60), Some(0.5));
        assert_eq!(per_game(30, 0), None);
        assert_eq!(mean(&[1, 2, 3]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn lift_counts_games_entered_near_a_milestone() {
        // step 5, approach 2: games entered at 3 or 4 (mod 5) are milestone games.
        // entering: 0,1,2,3,4,6,8
        let series = goals(&[1, 1, 1, 1, 2, 2, 0]);
        let lift = milestone_lift(&series, StatType::Goals, 5, 2).unwrap();
        assert_eq!(lift.total_games, 7);
        assert_eq!(lift.milestone_games, 3); // entered at 3, 4, 8
        assert!((lift.milestone_average - 1.0).abs() < 1e-9);
        assert!((lift.career_average - 8.0 / 7.0).abs() < 1e-9);
        assert!(lift.pct_diff < 0.0);
    }

    #[test]
    fn lift_without_milestone_games_is_zero() {
        let series = goals(&[0, 0, 0]);
        let lift = milestone_lift(&series, StatType::Goals, 100, 2).unwrap();
        assert_eq!(lift.milestone_games, 0);
        assert_eq!(lift.pct_diff, 0.0);
    }

    #[test]
    fn lift_needs_history() {
        assert!(milestone_lift(&[], StatType::Goals, 100, 2).is_none());
        assert!(milestone_lift(&goals(&[1]), StatType::Goals, 0, 2).is_none());
    }
}
