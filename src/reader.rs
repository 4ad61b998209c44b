use crate::bracket::{FinalFour, FirstFour, GameState, RegionSet, Round};
use crate::ledger::records::{self, RecordError};
use crate::ledger::{Ledger, LedgerError};
use log::debug;
use ncaa_api::RegionName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Decoded ledger state for one season. Parts that are not relevant at the
/// current round are not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: GameState,
    /// Present at round 0.
    pub first_four: Option<FirstFour>,
    /// Present from round 1 on.
    pub regions: Option<RegionSet>,
    /// Present from round 5 on.
    pub final_four: Option<FinalFour>,
}

/// Read and decode the tournament for `season`, or `None` if it was never
/// created. Any failure discards everything read so far.
pub async fn read_snapshot(ledger: &dyn Ledger, season: u16) -> Result<Option<Snapshot>, ReadError> {
    if !ledger.tournament_exists(season).await? {
        return Ok(None);
    }

    let state = records::decode_game_state(&ledger.game_status(season).await?)?;
    debug!("season {season}: round {:?}, status {:?}", state.round, state.status);

    let first_four = if state.round == Round::FirstFour {
        Some(records::decode_first_four(&ledger.first_four_data(season).await?)?)
    } else {
        None
    };

    let regions = if state.round >= Round::First {
        Some(decode_regions(&ledger.all_regions_data(season).await?)?)
    } else {
        None
    };

    let final_four = if state.round >= Round::FinalFour {
        Some(records::decode_final_four(&ledger.final_four_data(season).await?)?)
    } else {
        None
    };

    Ok(Some(Snapshot { state, first_four, regions, final_four }))
}

/// Region records arrive South, West, Midwest, East.
pub fn decode_regions(data: &[Vec<u8>]) -> Result<RegionSet, RecordError> {
    if data.len() != RegionName::ALL.len() {
        return Err(RecordError::Count {
            record: "region",
            expected: RegionName::ALL.len(),
            found: data.len(),
        });
    }

    let mut regions = RegionSet::default();
    for (name, record) in RegionName::ALL.into_iter().zip(data) {
        *regions.get_mut(name) = records::decode_region(record)?;
    }
    Ok(regions)
}
