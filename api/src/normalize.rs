use crate::sportradar::{ScheduleGame, ScheduleResponse};
use crate::{RegionName, RegionResult, RegionResults};
use chrono::{DateTime, Utc};
use log::{debug, warn};

const FIRST_FOUR_SEQUENCE: u32 = 1;
const FIRST_ROUND_SEQUENCE: u32 = 2;
const FINAL_FOUR_SEQUENCE: u32 = 6;
const CHAMPIONSHIP_SEQUENCE: u32 = 7;

/// Matches per region at a regional round (1..=4): 8, 4, 2, 1.
pub fn matches_per_region(round: u8) -> usize {
    match round {
        1 => 8,
        2 => 4,
        3 => 2,
        _ => 1,
    }
}

/// Results for all four regions at regional round `round` (1..=4).
///
/// The feed tags that round's segment with `sequence == round + 1`. A missing
/// segment or bracket leaves the corresponding region empty.
pub fn regions_for_round(schedule: &ScheduleResponse, round: u8) -> RegionResults {
    let sequence = u32::from(round) + 1;
    let mut results = RegionResults::default();

    let Some(segment) = schedule.segment(sequence) else {
        warn!("schedule has no segment with sequence {sequence}");
        return results;
    };

    for bracketed in &segment.bracketed {
        if !RegionName::ALL.iter().any(|r| r.feed_name() == bracketed.bracket.name) {
            debug!("ignoring bracket {:?} in sequence {sequence}", bracketed.bracket.name);
        }
    }

    for region in RegionName::ALL {
        match segment.bracket(region.feed_name()) {
            Some(bracketed) => results.set(
                region,
                index_by_game_number(&bracketed.games, matches_per_region(round)),
            ),
            None => warn!("sequence {sequence} has no {} bracket", region.feed_name()),
        }
    }
    results
}

/// The four play-in games, concatenated bracket by bracket.
///
/// Slots whose team code is blank are dropped together with their score.
pub fn first_four(schedule: &ScheduleResponse) -> RegionResult {
    let Some(segment) = schedule.segment(FIRST_FOUR_SEQUENCE) else {
        warn!("schedule has no First Four segment");
        return RegionResult::default();
    };

    let mut combined = RegionResult::default();
    for bracketed in &segment.bracketed {
        let paired = sort_and_pair(bracketed.games.iter());
        for (team, score) in paired.teams.into_iter().zip(paired.scores) {
            if !team.is_empty() {
                combined.teams.push(team);
                combined.scores.push(score);
            }
        }
    }
    combined
}

/// Both national semifinals, ordered by game number.
pub fn final_four(schedule: &ScheduleResponse) -> RegionResult {
    match schedule.segment(FINAL_FOUR_SEQUENCE) {
        Some(segment) => sort_and_pair(segment.games_iter()),
        None => {
            warn!("schedule has no Final Four segment");
            RegionResult::default()
        }
    }
}

/// The championship game as a single pair.
pub fn championship(schedule: &ScheduleResponse) -> RegionResult {
    match schedule.segment(CHAMPIONSHIP_SEQUENCE) {
        Some(segment) => {
            let mut result = sort_and_pair(segment.games_iter());
            result.teams.truncate(2);
            result.scores.truncate(2);
            result
        }
        None => {
            warn!("schedule has no Championship segment");
            RegionResult::default()
        }
    }
}

/// Earliest scheduled tip-off of the first full round, if any is known.
pub fn first_round_start(schedule: &ScheduleResponse) -> Option<DateTime<Utc>> {
    schedule
        .segment(FIRST_ROUND_SEQUENCE)?
        .games_iter()
        .filter_map(|g| g.scheduled.as_deref())
        .filter_map(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .min()
}

/// Place each game at slot `game_number - 1` of a `matches`-sized slate.
/// Used for the regional rounds, which are uniform.
///
/// Games with a missing or out-of-range number are skipped and leave their
/// slot blank. No games at all gives an empty result.
pub fn index_by_game_number(games: &[ScheduleGame], matches: usize) -> RegionResult {
    if games.is_empty() {
        return RegionResult::default();
    }

    let mut result = RegionResult::with_matches(matches);
    for game in games {
        let slot = match game.game_number() {
            Some(n) if n >= 1 && (n as usize) <= matches => (n as usize - 1) * 2,
            other => {
                warn!("game {} has unusable game number {other:?}", game.id);
                continue;
            }
        };
        let (home_points, away_points) = game.final_points();
        result.teams[slot] = game.home_alias().to_owned();
        result.teams[slot + 1] = game.away_alias().to_owned();
        result.scores[slot] = home_points;
        result.scores[slot + 1] = away_points;
    }
    result
}

/// Sort games by game number (unnumbered games last, stable) and pair them.
/// Used for the First Four and the national rounds, which are irregular.
pub fn sort_and_pair<'a>(games: impl Iterator<Item = &'a ScheduleGame>) -> RegionResult {
    let mut ordered: Vec<&ScheduleGame> = games.collect();
    ordered.sort_by_key(|g| g.game_number().unwrap_or(u32::MAX));

    let mut result = RegionResult::default();
    for game in ordered {
        let (home_points, away_points) = game.final_points();
        result.teams.push(game.home_alias().to_owned());
        result.teams.push(game.away_alias().to_owned());
        result.scores.push(home_points);
        result.scores.push(away_points);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sportradar::{BracketInfo, BracketedGames, ScheduleRound, ScheduleTeam};
    use chrono::TimeZone;

    fn game(number: u32, home: &str, away: &str, points: (u64, u64), status: &str) -> ScheduleGame {
        ScheduleGame {
            id: format!("game-{number}"),
            status: status.into(),
            title: Some(format!("NCAA Tournament: Regional - Game {number}")),
            scheduled: None,
            home_points: Some(points.0),
            away_points: Some(points.1),
            home: Some(ScheduleTeam { alias: Some(home.into()), ..Default::default() }),
            away: Some(ScheduleTeam { alias: Some(away.into()), ..Default::default() }),
        }
    }

    fn bracket(name: &str, games: Vec<ScheduleGame>) -> BracketedGames {
        BracketedGames {
            bracket: BracketInfo { id: None, name: name.into() },
            games,
        }
    }

    #[test]
    fn title_game_number_is_parsed() {
        let g = game(12, "A", "B", (0, 0), "scheduled");
        assert_eq!(g.game_number(), Some(12));

        let untitled = ScheduleGame { title: None, ..Default::default() };
        assert_eq!(untitled.game_number(), None);

        let odd = ScheduleGame { title: Some("Exhibition".into()), ..Default::default() };
        assert_eq!(odd.game_number(), None);
    }

    #[test]
    fn indexed_strategy_ignores_feed_order() {
        // Feed lists game 2 before game 1.
        let games = vec![
            game(2, "KU", "SDSU", (81, 60), "closed"),
            game(1, "DUKE", "UNC", (70, 65), "closed"),
        ];
        let result = index_by_game_number(&games, 2);
        assert_eq!(result.teams, vec!["DUKE", "UNC", "KU", "SDSU"]);
        assert_eq!(result.scores, vec![70, 65, 81, 60]);
    }

    #[test]
    fn indexed_strategy_leaves_unknown_slots_blank() {
        let games = vec![game(3, "DUKE", "UNC", (70, 65), "closed"), game(9, "X", "Y", (1, 0), "closed")];
        let result = index_by_game_number(&games, 4);
        assert_eq!(result.teams.len(), 8);
        assert_eq!(result.teams[4], "DUKE");
        assert!(result.teams[0].is_empty());
        assert!(!result.is_complete());
    }

    #[test]
    fn unplayed_games_score_zero() {
        let games = vec![game(1, "DUKE", "UNC", (40, 38), "inprogress")];
        let result = index_by_game_number(&games, 1);
        assert_eq!(result.scores, vec![0, 0]);
    }

    #[test]
    fn no_games_gives_empty_result() {
        assert!(index_by_game_number(&[], 8).is_empty());
    }

    #[test]
    fn regions_are_routed_by_bracket_name() {
        let schedule = ScheduleResponse {
            rounds: vec![ScheduleRound {
                sequence: 5,
                bracketed: vec![
                    bracket("East Regional", vec![game(1, "EA", "EB", (60, 50), "closed")]),
                    bracket("South Regional", vec![game(1, "SA", "SB", (50, 60), "closed")]),
                    bracket("Mystery Regional", vec![game(1, "MA", "MB", (1, 2), "closed")]),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let results = regions_for_round(&schedule, 4);
        assert_eq!(results.get(RegionName::South).teams, vec!["SA", "SB"]);
        assert_eq!(results.get(RegionName::East).teams, vec!["EA", "EB"]);
        assert!(results.get(RegionName::West).is_empty());
        assert!(results.any_empty());
    }

    #[test]
    fn missing_round_segment_yields_empty_regions() {
        let results = regions_for_round(&ScheduleResponse::default(), 1);
        assert!(RegionName::ALL.iter().all(|r| results.get(*r).is_empty()));
    }

    #[test]
    fn first_four_sorts_within_brackets_and_drops_blank_teams() {
        let schedule = ScheduleResponse {
            rounds: vec![ScheduleRound {
                sequence: 1,
                bracketed: vec![
                    bracket(
                        "South Regional",
                        vec![
                            game(2, "NAVY", "ALST", (0, 0), "scheduled"),
                            game(1, "SFPA", "AMER", (68, 70), "closed"),
                        ],
                    ),
                    bracket("West Regional", vec![game(1, "", "", (0, 0), "scheduled")]),
                    bracket("East Regional", vec![game(1, "TEX", "XAV", (80, 86), "closed")]),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let result = first_four(&schedule);
        assert_eq!(result.teams, vec!["SFPA", "AMER", "NAVY", "ALST", "TEX", "XAV"]);
        assert_eq!(result.scores, vec![68, 70, 0, 0, 80, 86]);
    }

    #[test]
    fn final_four_orders_semifinals_by_game_number() {
        let schedule = ScheduleResponse {
            rounds: vec![ScheduleRound {
                sequence: 6,
                games: vec![
                    game(2, "FLA", "AUB", (79, 73), "closed"),
                    game(1, "DUKE", "HOU", (67, 70), "closed"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = final_four(&schedule);
        assert_eq!(result.teams, vec!["DUKE", "HOU", "FLA", "AUB"]);
        assert_eq!(result.scores, vec![67, 70, 79, 73]);
    }

    #[test]
    fn championship_is_a_single_pair() {
        let schedule = ScheduleResponse {
            rounds: vec![ScheduleRound {
                sequence: 7,
                games: vec![game(1, "FLA", "HOU", (65, 63), "closed")],
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = championship(&schedule);
        assert_eq!(result.teams, vec!["FLA", "HOU"]);
        assert_eq!(result.scores, vec![65, 63]);
        assert!(championship(&ScheduleResponse::default()).is_empty());
    }

    #[test]
    fn first_round_start_is_earliest_tipoff() {
        let mut early = game(1, "A", "B", (0, 0), "scheduled");
        early.scheduled = Some("2025-03-20T16:15:00+00:00".into());
        let mut late = game(2, "C", "D", (0, 0), "scheduled");
        late.scheduled = Some("2025-03-21T23:00:00Z".into());
        let mut garbage = game(3, "E", "F", (0, 0), "scheduled");
        garbage.scheduled = Some("soon".into());

        let schedule = ScheduleResponse {
            rounds: vec![ScheduleRound {
                sequence: 2,
                bracketed: vec![
                    bracket("West Regional", vec![late, garbage]),
                    bracket("South Regional", vec![early]),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(
            first_round_start(&schedule),
            Some(Utc.with_ymd_and_hms(2025, 3, 20, 16, 15, 0).unwrap())
        );
        assert_eq!(first_round_start(&ScheduleResponse::default()), None);
    }
}
