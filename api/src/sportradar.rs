/// Wire types for the Sportradar-style tournament schedule document.
/// One document per season: an ordered list of round segments, each tagged
/// with an integer `sequence` (1 = First Four ... 7 = Championship).
use serde::Deserialize;

#[derive(Deserialize, Default, Debug, Clone)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rounds: Vec<ScheduleRound>,
}

impl ScheduleResponse {
    /// The round segment whose `sequence` equals `sequence`, if the feed has it.
    pub fn segment(&self, sequence: u32) -> Option<&ScheduleRound> {
        self.rounds.iter().find(|r| r.sequence == sequence)
    }
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct ScheduleRound {
    pub sequence: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Regional rounds nest their games per bracket.
    #[serde(default)]
    pub bracketed: Vec<BracketedGames>,
    /// National rounds (Final Four, Championship) list games directly.
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

impl ScheduleRound {
    pub fn bracket(&self, name: &str) -> Option<&BracketedGames> {
        self.bracketed.iter().find(|b| b.bracket.name == name)
    }

    /// Every game in the segment, flat games first, then bracketed ones.
    pub fn games_iter(&self) -> impl Iterator<Item = &ScheduleGame> {
        self.games
            .iter()
            .chain(self.bracketed.iter().flat_map(|b| b.games.iter()))
    }
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct BracketedGames {
    pub bracket: BracketInfo,
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct BracketInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String, // "South Regional", "West Regional", ...
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct ScheduleGame {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String, // "scheduled" | "inprogress" | "closed" | ...
    /// e.g. "Men's Basketball Championship: South Regional - Game 3"
    #[serde(default)]
    pub title: Option<String>,
    /// ISO 8601 tip-off time.
    #[serde(default)]
    pub scheduled: Option<String>,
    #[serde(default)]
    pub home_points: Option<u64>,
    #[serde(default)]
    pub away_points: Option<u64>,
    #[serde(default)]
    pub home: Option<ScheduleTeam>,
    #[serde(default)]
    pub away: Option<ScheduleTeam>,
}

impl ScheduleGame {
    pub fn is_closed(&self) -> bool {
        self.status == "closed"
    }

    /// Game number embedded in the title after " - Game ".
    pub fn game_number(&self) -> Option<u32> {
        let title = self.title.as_deref()?;
        let (_, tail) = title.split_once(" - Game ")?;
        let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    pub fn home_alias(&self) -> &str {
        self.home.as_ref().and_then(|t| t.alias.as_deref()).unwrap_or("")
    }

    pub fn away_alias(&self) -> &str {
        self.away.as_ref().and_then(|t| t.alias.as_deref()).unwrap_or("")
    }

    /// (home, away) points; games that are not closed count as 0-0.
    pub fn final_points(&self) -> (u64, u64) {
        if self.is_closed() {
            (self.home_points.unwrap_or(0), self.away_points.unwrap_or(0))
        } else {
            (0, 0)
        }
    }
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct ScheduleTeam {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>, // "DUKE"
}
