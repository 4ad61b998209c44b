use crate::bracket::{FinalFour, FirstFour, GameState, Match, Region, RegionSet, Round, Status, TeamId};
use crate::gas::WriteCost;
use crate::ledger::calls::WriteCall;
use crate::ledger::records;
use crate::ledger::{Ledger, LedgerError, Receipt, TxHash};
use crate::resolver::Slate;
use async_trait::async_trait;
use ncaa_api::RegionName;
use std::sync::Mutex;

pub const SIMULATED_GAS: u64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTournament {
    pub state: GameState,
    pub first_four: FirstFour,
    pub regions: RegionSet,
    pub final_four: FinalFour,
}

impl MemoryTournament {
    /// A fresh tournament as `createMarchMadness` leaves it.
    pub fn created(first_four: Vec<TeamId>, regions: [Vec<TeamId>; 4]) -> Self {
        let mut set = RegionSet::default();
        for (name, seeds) in RegionName::ALL.into_iter().zip(regions) {
            *set.get_mut(name) = Region {
                round1: pair_up(&seeds),
                round2: vec![Match::default(); 4],
                round3: vec![Match::default(); 2],
                teams: seeds,
                ..Default::default()
            };
        }
        Self {
            state: GameState { round: Round::FirstFour, status: Status::BetsOpen },
            first_four: FirstFour { matches: pair_up(&first_four) },
            regions: set,
            final_four: FinalFour {
                semifinals: vec![Match::default(); 2],
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tournament: Option<MemoryTournament>,
    estimated: Vec<WriteCall>,
    submitted: Vec<(WriteCall, WriteCost)>,
    fail_reads: bool,
    fail_estimates: bool,
    fail_submissions: bool,
}

/// In-memory bracket contract. Serves state through the record encoding and
/// applies writes with the contract's rules.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_tournament(tournament: MemoryTournament) -> Self {
        let ledger = Self::default();
        ledger.lock().tournament = Some(tournament);
        ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory ledger poisoned")
    }

    pub fn tournament(&self) -> Option<MemoryTournament> {
        self.lock().tournament.clone()
    }

    pub fn estimated(&self) -> Vec<WriteCall> {
        self.lock().estimated.clone()
    }

    pub fn submitted(&self) -> Vec<WriteCall> {
        self.lock().submitted.iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn costs(&self) -> Vec<WriteCost> {
        self.lock().submitted.iter().map(|(_, cost)| *cost).collect()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_estimates(&self, fail: bool) {
        self.lock().fail_estimates = fail;
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.lock().fail_submissions = fail;
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryTournament) -> T) -> Result<T, LedgerError> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(LedgerError::Rpc { method: "eth_call", code: -32000, message: "node unavailable".into() });
        }
        inner.tournament.as_ref().map(f).ok_or_else(|| LedgerError::Rpc {
            method: "eth_call",
            code: 3,
            message: "execution reverted: no tournament".into(),
        })
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn tournament_exists(&self, _season: u16) -> Result<bool, LedgerError> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(LedgerError::Rpc { method: "eth_call", code: -32000, message: "node unavailable".into() });
        }
        Ok(inner.tournament.is_some())
    }

    async fn game_status(&self, _season: u16) -> Result<Vec<u8>, LedgerError> {
        self.read(|t| records::encode_game_state(t.state))
    }

    async fn all_regions_data(&self, _season: u16) -> Result<Vec<Vec<u8>>, LedgerError> {
        self.read(|t| {
            RegionName::ALL
                .iter()
                .map(|name| records::encode_region(t.regions.get(*name)))
                .collect()
        })
    }

    async fn first_four_data(&self, _season: u16) -> Result<Vec<Vec<u8>>, LedgerError> {
        self.read(|t| t.first_four.matches.iter().map(records::encode_match).collect())
    }

    async fn final_four_data(&self, _season: u16) -> Result<Vec<u8>, LedgerError> {
        self.read(|t| records::encode_final_four(&t.final_four))
    }

    async fn estimate(&self, call: &WriteCall) -> Result<u64, LedgerError> {
        let mut inner = self.lock();
        inner.estimated.push(call.clone());
        if inner.fail_estimates {
            return Err(rejected(call, "estimation disabled"));
        }
        // Dry-run against a copy so a rejected write leaves no trace.
        let mut scratch = inner.tournament.clone();
        apply(&mut scratch, call).map_err(|reason| rejected(call, reason))?;
        Ok(SIMULATED_GAS)
    }

    async fn submit(&self, call: &WriteCall, cost: WriteCost) -> Result<TxHash, LedgerError> {
        let mut inner = self.lock();
        if inner.fail_submissions {
            return Err(LedgerError::SubmissionRejected { call: call.name(), reason: "nonce too low".into() });
        }
        apply(&mut inner.tournament, call)
            .map_err(|reason| LedgerError::SubmissionRejected { call: call.name(), reason: reason.into() })?;
        inner.submitted.push((call.clone(), cost));
        Ok(format!("0x{:064x}", inner.submitted.len()))
    }

    async fn confirm(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        let block_number = self.lock().submitted.len() as u64;
        Ok(Receipt { tx_hash: tx_hash.clone(), block_number, gas_used: SIMULATED_GAS })
    }
}

fn rejected(call: &WriteCall, reason: &str) -> LedgerError {
    LedgerError::SimulationRejected { call: call.name(), reason: reason.into() }
}

// ---------------------------------------------------------------------------
// Contract rules
// ---------------------------------------------------------------------------

fn apply(slot: &mut Option<MemoryTournament>, call: &WriteCall) -> Result<(), &'static str> {
    if let WriteCall::CreateTournament { first_four, regions, .. } = call {
        if slot.is_some() {
            return Err("tournament already exists");
        }
        *slot = Some(MemoryTournament::created(first_four.clone(), regions.clone()));
        return Ok(());
    }

    let t = slot.as_mut().ok_or("no tournament")?;
    let GameState { round, status } = t.state;

    match call {
        WriteCall::CreateTournament { .. } => unreachable!("handled above"),
        WriteCall::FirstFourWinners { slate, .. } => {
            require(round == Round::FirstFour && status == Status::BetsOpen, "not in first four")?;
            let decided = record(&mut t.first_four.matches, slate);
            for winner in decided {
                seat_play_in_winner(&mut t.regions, winner);
            }
        }
        WriteCall::CloseBets { .. } => {
            require(round == Round::FirstFour && status == Status::BetsOpen, "bets are not open")?;
            require(t.first_four.all_decided(), "first four not finished")?;
            t.state = GameState { round: Round::First, status: Status::InProgress };
        }
        WriteCall::RoundWinners { round: n, region, slate, .. } => {
            require(status == Status::InProgress && round.code() == *n && round.is_regional(), "wrong round")?;
            let region = t.regions.get_mut(*region);
            let matches = match round {
                Round::First => &mut region.round1,
                Round::Second => &mut region.round2,
                _ => &mut region.round3,
            };
            record(matches, slate);
        }
        WriteCall::Round4Winner { region, slate, .. } => {
            require(status == Status::InProgress && round == Round::Elite8, "wrong round")?;
            record(std::slice::from_mut(&mut t.regions.get_mut(*region).round4), slate);
        }
        WriteCall::AdvanceRound { .. } => advance(t)?,
        WriteCall::FinalFourWinners { slate, .. } => {
            require(round == Round::FinalFour, "wrong round")?;
            record(&mut t.final_four.semifinals, slate);
            if t.final_four.semifinals.iter().all(Match::is_decided) {
                t.final_four.final_match = pair_winners(&t.final_four.semifinals).remove(0);
                t.state.round = Round::Championship;
            }
        }
        WriteCall::Champion { slate, .. } => {
            require(round == Round::Championship && status == Status::InProgress, "wrong round")?;
            record(std::slice::from_mut(&mut t.final_four.final_match), slate);
            if let Some(champion) = t.final_four.final_match.winner.clone() {
                t.final_four.champion = Some(champion);
                t.state.status = Status::Finished;
            }
        }
    }
    Ok(())
}

fn require(condition: bool, reason: &'static str) -> Result<(), &'static str> {
    if condition { Ok(()) } else { Err(reason) }
}

/// Write winners into undecided matches; returns the newly decided winners.
fn record(matches: &mut [Match], slate: &Slate) -> Vec<TeamId> {
    let mut decided = Vec::new();
    for (i, m) in matches.iter_mut().enumerate() {
        let Some(Some(winner)) = slate.winners.get(i) else {
            continue;
        };
        if m.is_decided() {
            continue;
        }
        if m.home.is_empty() {
            m.home = slate.teams.get(2 * i).cloned().unwrap_or_default();
        }
        if m.away.is_empty() {
            m.away = slate.teams.get(2 * i + 1).cloned().unwrap_or_default();
        }
        m.home_score = slate.scores.get(2 * i).copied().unwrap_or(0);
        m.away_score = slate.scores.get(2 * i + 1).copied().unwrap_or(0);
        m.winner = Some(winner.clone());
        decided.push(winner.clone());
    }
    decided
}

/// Play-in winners fill the first blank seed, South to East.
fn seat_play_in_winner(regions: &mut RegionSet, winner: TeamId) {
    for name in RegionName::ALL {
        let region = regions.get_mut(name);
        if let Some(slot) = region.teams.iter().position(String::is_empty) {
            region.teams[slot] = winner.clone();
            let m = &mut region.round1[slot / 2];
            if slot % 2 == 0 {
                m.home = winner;
            } else {
                m.away = winner;
            }
            return;
        }
    }
}

fn advance(t: &mut MemoryTournament) -> Result<(), &'static str> {
    let round = t.state.round;
    require(t.state.status == Status::InProgress, "not in progress")?;
    require(round.is_regional(), "cannot advance from this round")?;
    require(
        RegionName::ALL.iter().all(|name| t.regions.get(*name).pending(round) == 0),
        "round not finished",
    )?;

    for name in RegionName::ALL {
        let region = t.regions.get_mut(name);
        match round {
            Round::First => region.round2 = pair_winners(&region.round1),
            Round::Second => region.round3 = pair_winners(&region.round2),
            Round::Sweet16 => region.round4 = pair_winners(&region.round3).remove(0),
            _ => region.winner = region.round4.winner.clone(),
        }
    }
    if round == Round::Elite8 {
        let r = &t.regions;
        t.final_four.semifinals = vec![
            between(&r.south.winner, &r.west.winner),
            between(&r.midwest.winner, &r.east.winner),
        ];
    }
    t.state.round = Round::from_code(round.code() + 1).ok_or("no next round")?;
    Ok(())
}

fn pair_up(teams: &[TeamId]) -> Vec<Match> {
    teams
        .chunks(2)
        .map(|pair| Match {
            home: pair.first().cloned().unwrap_or_default(),
            away: pair.get(1).cloned().unwrap_or_default(),
            ..Default::default()
        })
        .collect()
}

fn pair_winners(matches: &[Match]) -> Vec<Match> {
    matches.chunks(2).map(|pair| between(&pair[0].winner, &pair[1].winner)).collect()
}

fn between(home: &Option<TeamId>, away: &Option<TeamId>) -> Match {
    Match {
        home: home.clone().unwrap_or_default(),
        away: away.clone().unwrap_or_default(),
        ..Default::default()
    }
}
