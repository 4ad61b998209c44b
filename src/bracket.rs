use ncaa_api::RegionName;
use serde::Serialize;

pub type TeamId = String;

// ---------------------------------------------------------------------------
// Ledger-side tournament model
// ---------------------------------------------------------------------------

/// Tournament stage as stored on the ledger. Ordered from earliest to latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Round {
    FirstFour,    // play-in games
    First,        // round of 64
    Second,       // round of 32
    Sweet16,
    Elite8,       // regional final
    FinalFour,    // national semifinals
    Championship,
}

impl Round {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Round::FirstFour,
            1 => Round::First,
            2 => Round::Second,
            3 => Round::Sweet16,
            4 => Round::Elite8,
            5 => Round::FinalFour,
            6 => Round::Championship,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            Round::FirstFour => 0,
            Round::First => 1,
            Round::Second => 2,
            Round::Sweet16 => 3,
            Round::Elite8 => 4,
            Round::FinalFour => 5,
            Round::Championship => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Round::FirstFour => "First Four",
            Round::First => "1st Round",
            Round::Second => "2nd Round",
            Round::Sweet16 => "Sweet 16",
            Round::Elite8 => "Elite Eight",
            Round::FinalFour => "Final Four",
            Round::Championship => "Championship",
        }
    }

    /// Rounds played inside the four regions.
    pub fn is_regional(self) -> bool {
        matches!(self, Round::First | Round::Second | Round::Sweet16 | Round::Elite8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Created,
    BetsOpen,
    InProgress,
    Finished,
}

impl Status {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Status::Created,
            1 => Status::BetsOpen,
            2 => Status::InProgress,
            3 => Status::Finished,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            Status::Created => 0,
            Status::BetsOpen => 1,
            Status::InProgress => 2,
            Status::Finished => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub round: Round,
    pub status: Status,
}

/// One game as recorded on the ledger. `winner` is written at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Match {
    pub home: TeamId,
    pub away: TeamId,
    pub home_score: u64,
    pub away_score: u64,
    pub winner: Option<TeamId>,
}

impl Match {
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Region {
    /// The 16 seeds in bracket order.
    pub teams: Vec<TeamId>,
    pub round1: Vec<Match>,
    pub round2: Vec<Match>,
    pub round3: Vec<Match>,
    pub round4: Match,
    pub winner: Option<TeamId>,
}

impl Region {
    pub fn matches(&self, round: Round) -> &[Match] {
        match round {
            Round::First => &self.round1,
            Round::Second => &self.round2,
            Round::Sweet16 => &self.round3,
            Round::Elite8 => std::slice::from_ref(&self.round4),
            _ => &[],
        }
    }

    pub fn pending(&self, round: Round) -> usize {
        self.matches(round).iter().filter(|m| !m.is_decided()).count()
    }
}

/// The four regions in fixed order (South, West, Midwest, East).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionSet {
    pub south: Region,
    pub west: Region,
    pub midwest: Region,
    pub east: Region,
}

impl RegionSet {
    pub fn get(&self, name: RegionName) -> &Region {
        match name {
            RegionName::South => &self.south,
            RegionName::West => &self.west,
            RegionName::Midwest => &self.midwest,
            RegionName::East => &self.east,
        }
    }

    pub fn get_mut(&mut self, name: RegionName) -> &mut Region {
        match name {
            RegionName::South => &mut self.south,
            RegionName::West => &mut self.west,
            RegionName::Midwest => &mut self.midwest,
            RegionName::East => &mut self.east,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirstFour {
    pub matches: Vec<Match>,
}

impl FirstFour {
    pub fn all_decided(&self) -> bool {
        self.matches.iter().all(Match::is_decided)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalFour {
    pub semifinals: Vec<Match>,
    pub final_match: Match,
    pub champion: Option<TeamId>,
}

/// Ledger name for a region argument ("SOUTH", ...).
pub fn ledger_region_name(region: RegionName) -> &'static str {
    match region {
        RegionName::South => "SOUTH",
        RegionName::West => "WEST",
        RegionName::Midwest => "MIDWEST",
        RegionName::East => "EAST",
    }
}
