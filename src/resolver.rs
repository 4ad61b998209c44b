use crate::bracket::TeamId;

/// Winner of one pair: the strictly higher score, or `None` on a tie.
///
/// 0-0 (not played yet) and genuine ties look the same: no winner yet.
pub fn resolve_pair<'a>(home: &'a str, away: &'a str, home_score: u64, away_score: u64) -> Option<&'a str> {
    match home_score.cmp(&away_score) {
        std::cmp::Ordering::Greater => Some(home),
        std::cmp::Ordering::Less => Some(away),
        std::cmp::Ordering::Equal => None,
    }
}

/// One winner per `[h, a]` pair of `teams`/`scores`.
pub fn resolve_winners(teams: &[TeamId], scores: &[u64]) -> Vec<Option<TeamId>> {
    teams
        .chunks(2)
        .zip(scores.chunks(2))
        .map(|(pair, points)| match (pair, points) {
            ([home, away], [hs, aws]) => resolve_pair(home, away, *hs, *aws).map(str::to_owned),
            _ => None,
        })
        .collect()
}

/// Paired teams and scores with their resolved winners, ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slate {
    pub teams: Vec<TeamId>,
    pub scores: Vec<u64>,
    pub winners: Vec<Option<TeamId>>,
}

impl Slate {
    pub fn resolve(teams: Vec<TeamId>, scores: Vec<u64>) -> Self {
        let winners = resolve_winners(&teams, &scores);
        Self { teams, scores, winners }
    }

    /// Winners as the ledger expects them: empty string for "no winner".
    pub fn wire_winners(&self) -> Vec<String> {
        self.winners.iter().map(|w| w.clone().unwrap_or_default()).collect()
    }

    pub fn decided(&self) -> usize {
        self.winners.iter().filter(|w| w.is_some()).count()
    }
}
