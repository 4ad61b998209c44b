use crate::bracket::{FinalFour, FirstFour, Match, RegionSet, Round, Status};
use crate::gas::{self, GasPriceSource, WriteCost};
use crate::ledger::calls::WriteCall;
use crate::ledger::records::SEEDS_PER_REGION;
use crate::ledger::{Ledger, LedgerError, Receipt};
use crate::reader::{ReadError, Snapshot, read_snapshot};
use crate::resolver::Slate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use ncaa_api::client::{ApiError, ApiResult, NcaaApi};
use ncaa_api::normalize;
use ncaa_api::sportradar::ScheduleResponse;
use ncaa_api::{RegionName, RegionResult};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Regional winner writes allowed per tick.
pub const MAX_REGION_WRITES: usize = 2;

const PLAY_IN_TEAMS: usize = 8;

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn schedule(&self) -> ApiResult<ScheduleResponse>;
}

#[async_trait]
impl ScheduleSource for NcaaApi {
    async fn schedule(&self) -> ApiResult<ScheduleResponse> {
        self.fetch_schedule().await
    }
}

#[derive(Debug, Error)]
pub enum TickError {
    #[error("ledger read failed: {0}")]
    Read(#[from] ReadError),
    #[error("results feed request failed: {0}")]
    Feed(#[from] ApiError),
    #[error("results not ready: {0}")]
    NotReady(String),
    #[error("{segment} game {game}: ledger has {ledger}, feed has {feed}")]
    TeamMismatch {
        segment: String,
        game: usize,
        ledger: String,
        feed: String,
    },
    #[error("estimation failed: {0}")]
    Estimation(#[source] LedgerError),
    #[error("submission failed: {0}")]
    Submission(#[source] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Created,
    Wrote { writes: usize },
    Advanced,
    Idle { reason: String },
    Complete,
}

impl TickOutcome {
    fn idle(reason: impl Into<String>) -> Self {
        TickOutcome::Idle { reason: reason.into() }
    }
}

pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    feed: Arc<dyn ScheduleSource>,
    gas: Arc<dyn GasPriceSource>,
    season: u16,
    // Held across read -> decide -> write.
    flight: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        feed: Arc<dyn ScheduleSource>,
        gas: Arc<dyn GasPriceSource>,
        season: u16,
    ) -> Self {
        Self { ledger, feed, gas, season, flight: Mutex::new(()) }
    }

    pub fn season(&self) -> u16 {
        self.season
    }

    pub async fn tick(&self) -> Result<TickOutcome, TickError> {
        self.tick_at(Utc::now()).await
    }

    /// One reconciliation pass as of `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickOutcome, TickError> {
        let _flight = self.flight.lock().await;

        let Some(snapshot) = read_snapshot(self.ledger.as_ref(), self.season).await? else {
            info!("no tournament for season {}, creating it", self.season);
            return self.create().await;
        };

        let round = snapshot.state.round;
        let status = snapshot.state.status;
        info!(
            "season {}: {} (round {}, status {})",
            self.season,
            round.label(),
            round.code(),
            status.code()
        );

        if is_complete(&snapshot) {
            self.report(&snapshot);
            return Ok(TickOutcome::Complete);
        }

        match (round, status) {
            (Round::FirstFour, Status::BetsOpen) => {
                let first_four = snapshot.first_four.unwrap_or_default();
                self.first_four(&first_four, now).await
            }
            (r, Status::InProgress) if r.is_regional() => {
                let regions = snapshot.regions.unwrap_or_default();
                self.regional(r, &regions).await
            }
            (Round::FinalFour, _) => {
                let final_four = snapshot.final_four.unwrap_or_default();
                self.semifinals(&final_four).await
            }
            (Round::Championship, Status::InProgress) => {
                let final_four = snapshot.final_four.unwrap_or_default();
                self.championship(&final_four).await
            }
            _ => Ok(TickOutcome::idle(format!("nothing to do at {} / {status:?}", round.label()))),
        }
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    async fn create(&self) -> Result<TickOutcome, TickError> {
        let schedule = self.feed.schedule().await?;
        let round1 = normalize::regions_for_round(&schedule, Round::First.code());
        let play_in = normalize::first_four(&schedule);

        if round1.any_empty() {
            return Err(TickError::NotReady("first round brackets are not published".into()));
        }
        if play_in.teams.len() != PLAY_IN_TEAMS {
            return Err(TickError::NotReady(format!(
                "First Four has {} of {PLAY_IN_TEAMS} teams",
                play_in.teams.len()
            )));
        }

        let mut regions: [Vec<String>; 4] = Default::default();
        for name in RegionName::ALL {
            let seeds: Vec<String> = round1.get(name).teams.iter().map(|t| t.trim().to_owned()).collect();
            if seeds.len() != SEEDS_PER_REGION {
                return Err(TickError::NotReady(format!(
                    "{} has {} of {SEEDS_PER_REGION} seeds",
                    name.label(),
                    seeds.len()
                )));
            }
            regions[name.index()] = seeds;
        }

        let first_four = play_in.teams.iter().map(|t| t.trim().to_owned()).collect();
        self.send(WriteCall::CreateTournament { season: self.season, first_four, regions })
            .await?;
        Ok(TickOutcome::Created)
    }

    async fn first_four(&self, first_four: &FirstFour, now: DateTime<Utc>) -> Result<TickOutcome, TickError> {
        let schedule = self.feed.schedule().await?;

        if !first_four.all_decided() {
            let slate = canonicalize("First Four", &normalize::first_four(&schedule), &first_four.matches)?;
            self.send(WriteCall::FirstFourWinners { season: self.season, slate }).await?;
            return Ok(TickOutcome::Wrote { writes: 1 });
        }

        match normalize::first_round_start(&schedule) {
            Some(start) if start <= now => {
                info!("first round started at {start}, closing bets");
                self.send(WriteCall::CloseBets { season: self.season }).await?;
                Ok(TickOutcome::Wrote { writes: 1 })
            }
            Some(start) => Ok(TickOutcome::idle(format!("bets close at {start}"))),
            None => Ok(TickOutcome::idle("first round start time unknown")),
        }
    }

    async fn regional(&self, round: Round, regions: &RegionSet) -> Result<TickOutcome, TickError> {
        let pending: Vec<RegionName> = RegionName::ALL
            .into_iter()
            .filter(|name| regions.get(*name).pending(round) > 0)
            .collect();

        if pending.is_empty() {
            info!("every region finished {}, advancing", round.label());
            self.send(WriteCall::AdvanceRound { season: self.season }).await?;
            return Ok(TickOutcome::Advanced);
        }

        let schedule = self.feed.schedule().await?;
        let feed = normalize::regions_for_round(&schedule, round.code());

        let mut writes = 0;
        for name in pending {
            let ledger_matches = regions.get(name).matches(round);
            let segment = format!("{} {}", name.label(), round.label());
            let slate = canonicalize(&segment, feed.get(name), ledger_matches)?;
            info!("{segment}: {} of {} games decided", slate.decided(), ledger_matches.len());

            let call = if round == Round::Elite8 {
                WriteCall::Round4Winner { season: self.season, region: name, slate }
            } else {
                WriteCall::RoundWinners { season: self.season, round: round.code(), region: name, slate }
            };
            self.send(call).await?;
            writes += 1;
            if writes == MAX_REGION_WRITES {
                break;
            }
        }

        Ok(TickOutcome::Wrote { writes })
    }

    async fn semifinals(&self, final_four: &FinalFour) -> Result<TickOutcome, TickError> {
        if final_four.semifinals.iter().all(Match::is_decided) {
            return Ok(TickOutcome::idle("semifinals recorded, waiting for the final"));
        }

        let schedule = self.feed.schedule().await?;
        let slate = canonicalize("Final Four", &normalize::final_four(&schedule), &final_four.semifinals)?;
        self.send(WriteCall::FinalFourWinners { season: self.season, slate }).await?;
        Ok(TickOutcome::Wrote { writes: 1 })
    }

    async fn championship(&self, final_four: &FinalFour) -> Result<TickOutcome, TickError> {
        let final_match = std::slice::from_ref(&final_four.final_match);
        let schedule = self.feed.schedule().await?;
        let slate = canonicalize("Championship", &normalize::championship(&schedule), final_match)?;
        self.send(WriteCall::Champion { season: self.season, slate }).await?;
        Ok(TickOutcome::Wrote { writes: 1 })
    }

    fn report(&self, snapshot: &Snapshot) {
        #[derive(Serialize)]
        struct FinalReport<'a> {
            season: u16,
            regions: Option<&'a RegionSet>,
            final_four: Option<&'a FinalFour>,
        }

        let champion = snapshot
            .final_four
            .as_ref()
            .and_then(|f| f.champion.as_deref())
            .unwrap_or("unknown");
        info!("tournament {} is over, champion {champion}", self.season);

        let report = FinalReport {
            season: self.season,
            regions: snapshot.regions.as_ref(),
            final_four: snapshot.final_four.as_ref(),
        };
        match serde_json::to_string(&report) {
            Ok(json) => info!("{json}"),
            Err(e) => warn!("could not serialize final bracket: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Price, simulate, submit and wait for one write.
    async fn send(&self, call: WriteCall) -> Result<Receipt, TickError> {
        let gas_price = gas::unit_price(self.gas.as_ref()).await;
        let estimated = self.ledger.estimate(&call).await.map_err(TickError::Estimation)?;
        let gas_limit = gas::escalate_budget(estimated, call.budget_margin());
        info!(
            "{}: estimated gas {estimated}, adjusted gas limit {gas_limit}, gas price {gas_price}",
            call.name()
        );

        let cost = WriteCost { gas_price, gas_limit };
        let tx_hash = self.ledger.submit(&call, cost).await.map_err(TickError::Submission)?;
        info!("{} submitted: {tx_hash}", call.name());

        let receipt = self.ledger.confirm(&tx_hash).await.map_err(TickError::Submission)?;
        info!(
            "{} confirmed in block {}, {} gas used",
            call.name(),
            receipt.block_number,
            receipt.gas_used
        );
        Ok(receipt)
    }
}

fn is_complete(snapshot: &Snapshot) -> bool {
    snapshot.state.status == Status::Finished
        || (snapshot.state.round == Round::Championship
            && snapshot.final_four.as_ref().is_some_and(|f| f.champion.is_some()))
}

/// Line the feed's pairs up with the ledger's matches and resolve winners.
///
/// Codes are trimmed and compared case-insensitively with the ledger's
/// non-empty home/away; a pair listed the other way round is flipped. The
/// ledger's spelling is what gets written.
fn canonicalize(segment: &str, feed: &RegionResult, ledger: &[Match]) -> Result<Slate, TickError> {
    if feed.match_count() != ledger.len() || !feed.is_complete() {
        return Err(TickError::NotReady(format!(
            "{segment}: feed has {} of {} games",
            feed.teams.iter().filter(|t| !t.trim().is_empty()).count() / 2,
            ledger.len()
        )));
    }

    let fits = |stored: &str, code: &str| stored.is_empty() || stored.eq_ignore_ascii_case(code);
    let spelled = |stored: &str, code: &str| (if stored.is_empty() { code } else { stored }).to_owned();

    let mut teams = Vec::with_capacity(feed.teams.len());
    let mut scores = Vec::with_capacity(feed.scores.len());
    for (game, m) in ledger.iter().enumerate() {
        let (home, away) = (feed.teams[2 * game].trim(), feed.teams[2 * game + 1].trim());
        let (home_score, away_score) = (feed.scores[2 * game], feed.scores[2 * game + 1]);

        if fits(&m.home, home) && fits(&m.away, away) {
            teams.extend([spelled(&m.home, home), spelled(&m.away, away)]);
            scores.extend([home_score, away_score]);
        } else if fits(&m.home, away) && fits(&m.away, home) {
            teams.extend([spelled(&m.home, away), spelled(&m.away, home)]);
            scores.extend([away_score, home_score]);
        } else {
            return Err(TickError::TeamMismatch {
                segment: segment.to_owned(),
                game: game + 1,
                ledger: format!("{} v {}", m.home, m.away),
                feed: format!("{home} v {away}"),
            });
        }
    }
    Ok(Slate::resolve(teams, scores))
}
