use crate::bracket::{TeamId, ledger_region_name};
use crate::ledger::abi::{self, Token};
use crate::resolver::Slate;
use ncaa_api::RegionName;

/// Budget margin (percent of simulated gas) for most writes.
pub const DEFAULT_BUDGET_MARGIN: u64 = 120;
/// Budget margin for First Four, regional-final and championship writes.
pub const WIDE_BUDGET_MARGIN: u64 = 130;

/// A single ledger write. Every write is simulated before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    CreateTournament {
        season: u16,
        first_four: Vec<TeamId>,
        /// Seeds per region, South/West/Midwest/East.
        regions: [Vec<TeamId>; 4],
    },
    FirstFourWinners {
        season: u16,
        slate: Slate,
    },
    /// Rounds 1-3 inside a region.
    RoundWinners {
        season: u16,
        round: u8,
        region: RegionName,
        slate: Slate,
    },
    /// The regional final (round 4) is a single match.
    Round4Winner {
        season: u16,
        region: RegionName,
        slate: Slate,
    },
    FinalFourWinners {
        season: u16,
        slate: Slate,
    },
    Champion {
        season: u16,
        slate: Slate,
    },
    AdvanceRound {
        season: u16,
    },
    CloseBets {
        season: u16,
    },
}

impl WriteCall {
    pub fn name(&self) -> &'static str {
        match self {
            WriteCall::CreateTournament { .. } => "createMarchMadness",
            WriteCall::FirstFourWinners { .. } => "determineFirstFourWinners",
            WriteCall::RoundWinners { round: 1, .. } => "determineRound1Winners",
            WriteCall::RoundWinners { round: 2, .. } => "determineRound2Winners",
            WriteCall::RoundWinners { .. } => "determineRound3Winners",
            WriteCall::Round4Winner { .. } => "determineRound4Winners",
            WriteCall::FinalFourWinners { .. } => "determineFinalFourWinners",
            WriteCall::Champion { .. } => "determineChampion",
            WriteCall::AdvanceRound { .. } => "advanceRound",
            WriteCall::CloseBets { .. } => "closeBets",
        }
    }

    pub fn signature(&self) -> &'static str {
        match self {
            WriteCall::CreateTournament { .. } => {
                "createMarchMadness(uint256,string[8],string[16],string[16],string[16],string[16])"
            }
            WriteCall::FirstFourWinners { .. } => {
                "determineFirstFourWinners(uint256,string[8],uint256[8],string[4])"
            }
            WriteCall::RoundWinners { round: 1, .. } => {
                "determineRound1Winners(uint256,string,string[16],uint256[16],string[8])"
            }
            WriteCall::RoundWinners { round: 2, .. } => {
                "determineRound2Winners(uint256,string,string[8],uint256[8],string[4])"
            }
            WriteCall::RoundWinners { .. } => {
                "determineRound3Winners(uint256,string,string[4],uint256[4],string[2])"
            }
            WriteCall::Round4Winner { .. } => {
                "determineRound4Winners(uint256,string,string,string,uint256,uint256,string)"
            }
            WriteCall::FinalFourWinners { .. } => {
                "determineFinalFourWinners(uint256,string[4],uint256[4],string[2])"
            }
            WriteCall::Champion { .. } => {
                "determineChampion(uint256,string,string,uint256,uint256,string)"
            }
            WriteCall::AdvanceRound { .. } => "advanceRound(uint256)",
            WriteCall::CloseBets { .. } => "closeBets(uint256)",
        }
    }

    pub fn season(&self) -> u16 {
        match self {
            WriteCall::CreateTournament { season, .. }
            | WriteCall::FirstFourWinners { season, .. }
            | WriteCall::RoundWinners { season, .. }
            | WriteCall::Round4Winner { season, .. }
            | WriteCall::FinalFourWinners { season, .. }
            | WriteCall::Champion { season, .. }
            | WriteCall::AdvanceRound { season }
            | WriteCall::CloseBets { season } => *season,
        }
    }

    /// Percent of the simulated gas to use as the gas limit.
    pub fn budget_margin(&self) -> u64 {
        match self {
            WriteCall::FirstFourWinners { .. }
            | WriteCall::Round4Winner { .. }
            | WriteCall::Champion { .. } => WIDE_BUDGET_MARGIN,
            _ => DEFAULT_BUDGET_MARGIN,
        }
    }

    /// Selector plus ABI-encoded arguments.
    pub fn calldata(&self) -> Vec<u8> {
        let season = Token::Uint(u128::from(self.season()));
        let args = match self {
            WriteCall::CreateTournament { first_four, regions, .. } => {
                let mut args = vec![season, Token::strings(first_four)];
                args.extend(regions.iter().map(|seeds| Token::strings(seeds)));
                args
            }
            WriteCall::FirstFourWinners { slate, .. } | WriteCall::FinalFourWinners { slate, .. } => {
                let mut args = vec![season];
                args.extend(slate_tokens(slate));
                args
            }
            WriteCall::RoundWinners { region, slate, .. } => {
                let mut args = vec![season, Token::String(ledger_region_name(*region).into())];
                args.extend(slate_tokens(slate));
                args
            }
            WriteCall::Round4Winner { region, slate, .. } => {
                let mut args = vec![season, Token::String(ledger_region_name(*region).into())];
                args.extend(single_match_tokens(slate));
                args
            }
            WriteCall::Champion { slate, .. } => {
                let mut args = vec![season];
                args.extend(single_match_tokens(slate));
                args
            }
            WriteCall::AdvanceRound { .. } | WriteCall::CloseBets { .. } => vec![season],
        };
        abi::encode_call(self.signature(), &args)
    }
}

/// `(string[N] teams, uint256[N] scores, string[N/2] winners)`
fn slate_tokens(slate: &Slate) -> [Token; 3] {
    [
        Token::strings(&slate.teams),
        Token::uints(&slate.scores),
        Token::strings(&slate.wire_winners()),
    ]
}

/// `(string home, string away, uint256 homeScore, uint256 awayScore, string winner)`
fn single_match_tokens(slate: &Slate) -> Vec<Token> {
    let team = |i: usize| Token::String(slate.teams.get(i).cloned().unwrap_or_default());
    let score = |i: usize| Token::Uint(u128::from(slate.scores.get(i).copied().unwrap_or(0)));
    let winner = slate.wire_winners().into_iter().next().unwrap_or_default();
    vec![team(0), team(1), score(0), score(1), Token::String(winner)]
}
