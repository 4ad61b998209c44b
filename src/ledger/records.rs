use crate::bracket::{FinalFour, FirstFour, GameState, Match, Region, Round, Status, TeamId};
use crate::ledger::abi::{self, AbiError, Kind, Token};
use thiserror::Error;

pub const SEEDS_PER_REGION: usize = 16;
pub const FIRST_FOUR_MATCHES: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("{record} record: {source}")]
    Abi {
        record: &'static str,
        #[source]
        source: AbiError,
    },
    #[error("unknown round code {0}")]
    Round(u128),
    #[error("unknown status code {0}")]
    Status(u128),
    #[error("score {0} out of range")]
    Score(u128),
    #[error("expected {expected} {record} records, got {found}")]
    Count {
        record: &'static str,
        expected: usize,
        found: usize,
    },
}

fn abi_err(record: &'static str) -> impl Fn(AbiError) -> RecordError {
    move |source| RecordError::Abi { record, source }
}

fn match_kinds() -> [Kind; 5] {
    [Kind::String, Kind::String, Kind::Uint, Kind::Uint, Kind::String]
}

fn region_kinds() -> [Kind; 6] {
    [
        Kind::array(Kind::String, SEEDS_PER_REGION),
        Kind::array(Kind::Bytes, 8),
        Kind::array(Kind::Bytes, 4),
        Kind::array(Kind::Bytes, 2),
        Kind::Bytes,
        Kind::String,
    ]
}

fn final_four_kinds() -> [Kind; 3] {
    [Kind::array(Kind::Bytes, 2), Kind::Bytes, Kind::String]
}

fn winner(raw: String) -> Option<TeamId> {
    if raw.is_empty() { None } else { Some(raw) }
}

fn score(raw: u128) -> Result<u64, RecordError> {
    u64::try_from(raw).map_err(|_| RecordError::Score(raw))
}

pub fn decode_game_state(data: &[u8]) -> Result<GameState, RecordError> {
    let err = abi_err("status");
    let mut fields = abi::decode(&[Kind::Uint, Kind::Uint], data).map_err(&err)?.into_iter();
    let round_code = next(&mut fields, "status")?.into_uint().map_err(&err)?;
    let status_code = next(&mut fields, "status")?.into_uint().map_err(&err)?;

    let round = u8::try_from(round_code)
        .ok()
        .and_then(Round::from_code)
        .ok_or(RecordError::Round(round_code))?;
    let status = u8::try_from(status_code)
        .ok()
        .and_then(Status::from_code)
        .ok_or(RecordError::Status(status_code))?;
    Ok(GameState { round, status })
}

/// `(string home, string away, uint256 homeScore, uint256 awayScore, string winner)`.
/// An empty `winner` means no winner yet.
pub fn decode_match(data: &[u8]) -> Result<Match, RecordError> {
    let err = abi_err("match");
    let mut fields = abi::decode(&match_kinds(), data).map_err(&err)?.into_iter();
    Ok(Match {
        home: next(&mut fields, "match")?.into_string().map_err(&err)?,
        away: next(&mut fields, "match")?.into_string().map_err(&err)?,
        home_score: score(next(&mut fields, "match")?.into_uint().map_err(&err)?)?,
        away_score: score(next(&mut fields, "match")?.into_uint().map_err(&err)?)?,
        winner: winner(next(&mut fields, "match")?.into_string().map_err(&err)?),
    })
}

/// `(string[16] teams, bytes[8] round1, bytes[4] round2, bytes[2] round3, bytes round4, string winner)`,
/// each `bytes` being a match record.
pub fn decode_region(data: &[u8]) -> Result<Region, RecordError> {
    let err = abi_err("region");
    let mut fields = abi::decode(&region_kinds(), data).map_err(&err)?.into_iter();

    let teams = next(&mut fields, "region")?
        .into_array()
        .map_err(&err)?
        .into_iter()
        .map(Token::into_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(&err)?;
    let round1 = decode_match_array(next(&mut fields, "region")?)?;
    let round2 = decode_match_array(next(&mut fields, "region")?)?;
    let round3 = decode_match_array(next(&mut fields, "region")?)?;
    let round4 = decode_match(&next(&mut fields, "region")?.into_bytes().map_err(&err)?)?;
    let region_winner = winner(next(&mut fields, "region")?.into_string().map_err(&err)?);

    Ok(Region { teams, round1, round2, round3, round4, winner: region_winner })
}

pub fn decode_first_four(records: &[Vec<u8>]) -> Result<FirstFour, RecordError> {
    if records.len() != FIRST_FOUR_MATCHES {
        return Err(RecordError::Count {
            record: "first four match",
            expected: FIRST_FOUR_MATCHES,
            found: records.len(),
        });
    }
    let matches = records.iter().map(|r| decode_match(r)).collect::<Result<Vec<_>, _>>()?;
    Ok(FirstFour { matches })
}

/// `(bytes[2] semifinals, bytes final, string champion)`.
pub fn decode_final_four(data: &[u8]) -> Result<FinalFour, RecordError> {
    let err = abi_err("final four");
    let mut fields = abi::decode(&final_four_kinds(), data).map_err(&err)?.into_iter();
    Ok(FinalFour {
        semifinals: decode_match_array(next(&mut fields, "final four")?)?,
        final_match: decode_match(&next(&mut fields, "final four")?.into_bytes().map_err(&err)?)?,
        champion: winner(next(&mut fields, "final four")?.into_string().map_err(&err)?),
    })
}

fn decode_match_array(token: Token) -> Result<Vec<Match>, RecordError> {
    let err = abi_err("match array");
    token
        .into_array()
        .map_err(&err)?
        .into_iter()
        .map(|t| t.into_bytes().map_err(&err).and_then(|b| decode_match(&b)))
        .collect()
}

fn next(fields: &mut impl Iterator<Item = Token>, record: &'static str) -> Result<Token, RecordError> {
    fields
        .next()
        .ok_or(RecordError::Abi { record, source: AbiError::Truncated { at: 0, wanted: 32 } })
}

// ---------------------------------------------------------------------------
// Encoding (mirrors the contract side; used by the in-memory ledger)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub fn encode_game_state(state: GameState) -> Vec<u8> {
    abi::encode(&[
        Token::Uint(u128::from(state.round.code())),
        Token::Uint(u128::from(state.status.code())),
    ])
}

#[cfg(test)]
pub fn encode_match(m: &Match) -> Vec<u8> {
    abi::encode(&[
        Token::String(m.home.clone()),
        Token::String(m.away.clone()),
        Token::Uint(u128::from(m.home_score)),
        Token::Uint(u128::from(m.away_score)),
        Token::String(m.winner.clone().unwrap_or_default()),
    ])
}

#[cfg(test)]
fn match_array(matches: &[Match]) -> Token {
    Token::FixedArray(matches.iter().map(|m| Token::Bytes(encode_match(m))).collect())
}

#[cfg(test)]
pub fn encode_region(region: &Region) -> Vec<u8> {
    abi::encode(&[
        Token::strings(&region.teams),
        match_array(&region.round1),
        match_array(&region.round2),
        match_array(&region.round3),
        Token::Bytes(encode_match(&region.round4)),
        Token::String(region.winner.clone().unwrap_or_default()),
    ])
}

#[cfg(test)]
pub fn encode_final_four(final_four: &FinalFour) -> Vec<u8> {
    abi::encode(&[
        match_array(&final_four.semifinals),
        Token::Bytes(encode_match(&final_four.final_match)),
        Token::String(final_four.champion.clone().unwrap_or_default()),
    ])
}
