pub mod client;
pub mod normalize;
pub mod sportradar;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Domain types, independent of the feed's wire format
// ---------------------------------------------------------------------------

/// One of the four regional sub-brackets, in the fixed processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegionName {
    South,
    West,
    Midwest,
    East,
}

impl RegionName {
    pub const ALL: [RegionName; 4] = [
        RegionName::South,
        RegionName::West,
        RegionName::Midwest,
        RegionName::East,
    ];

    pub fn index(self) -> usize {
        match self {
            RegionName::South => 0,
            RegionName::West => 1,
            RegionName::Midwest => 2,
            RegionName::East => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegionName::South => "South",
            RegionName::West => "West",
            RegionName::Midwest => "Midwest",
            RegionName::East => "East",
        }
    }

    /// Bracket name as it appears in the schedule feed.
    pub fn feed_name(self) -> &'static str {
        match self {
            RegionName::South => "South Regional",
            RegionName::West => "West Regional",
            RegionName::Midwest => "Midwest Regional",
            RegionName::East => "East Regional",
        }
    }
}

/// Paired team codes and scores for one bracket segment:
/// `teams = [h0, a0, h1, a1, ...]`, `scores = [hs0, as0, ...]`.
///
/// Slot `2i`/`2i+1` always belongs to bracket position `i`, whatever order
/// the feed listed the games in. An empty result means the feed had nothing
/// for this segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionResult {
    pub teams: Vec<String>,
    pub scores: Vec<u64>,
}

impl RegionResult {
    /// A result with `matches` blank slots, filled in by game number.
    pub fn with_matches(matches: usize) -> Self {
        Self {
            teams: vec![String::new(); matches * 2],
            scores: vec![0; matches * 2],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.teams.len() / 2
    }

    /// Every slot carries a team code.
    pub fn is_complete(&self) -> bool {
        !self.teams.is_empty()
            && self.teams.len() == self.scores.len()
            && self.teams.iter().all(|t| !t.trim().is_empty())
    }
}

/// External results for all four regions at one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionResults {
    regions: [RegionResult; 4],
}

impl RegionResults {
    pub fn get(&self, name: RegionName) -> &RegionResult {
        &self.regions[name.index()]
    }

    pub fn set(&mut self, name: RegionName, result: RegionResult) {
        self.regions[name.index()] = result;
    }

    pub fn any_empty(&self) -> bool {
        self.regions.iter().any(RegionResult::is_empty)
    }
}
