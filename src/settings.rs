use chrono::{DateTime, Datelike, Utc};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TICK_SECS: u64 = 300;
const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the keeper needs, read once at start-up.
#[derive(Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub private_key: String,
    pub contract: String,
    pub results_url: String,
    pub gas_oracle_url: String,
    pub gas_oracle_key: String,
    pub season: u16,
    pub chain_id: Option<u64>,
    pub tick_interval: Duration,
    pub confirm_timeout: Duration,
    pub log_filter: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract", &self.contract)
            .field("season", &self.season)
            .field("chain_id", &self.chain_id)
            .field("tick_interval", &self.tick_interval)
            .field("confirm_timeout", &self.confirm_timeout)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok(), Utc::now())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, now: DateTime<Utc>) -> Result<Self, SettingsError> {
        let var = |name: &'static str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(SettingsError::Missing(name));

        let season = match var("KEEPER_SEASON") {
            Some(raw) => parse("KEEPER_SEASON", raw)?,
            None => season_tournament_year(now),
        };
        let chain_id = var("KEEPER_CHAIN_ID").map(|raw| parse("KEEPER_CHAIN_ID", raw)).transpose()?;
        let tick_secs = var("KEEPER_TICK_SECS")
            .map(|raw| parse("KEEPER_TICK_SECS", raw))
            .transpose()?
            .unwrap_or(DEFAULT_TICK_SECS);
        let confirm_secs = var("KEEPER_CONFIRM_TIMEOUT_SECS")
            .map(|raw| parse("KEEPER_CONFIRM_TIMEOUT_SECS", raw))
            .transpose()?
            .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_SECS);
        if tick_secs == 0 {
            return Err(SettingsError::Invalid { name: "KEEPER_TICK_SECS", value: "0".into() });
        }

        Ok(Self {
            rpc_url: required("KEEPER_RPC_URL")?,
            private_key: required("KEEPER_PRIVATE_KEY")?,
            contract: required("KEEPER_CONTRACT")?,
            results_url: required("KEEPER_RESULTS_URL")?,
            gas_oracle_url: required("KEEPER_GAS_ORACLE_URL")?,
            gas_oracle_key: var("KEEPER_GAS_ORACLE_KEY").unwrap_or_default(),
            season,
            chain_id,
            tick_interval: Duration::from_secs(tick_secs),
            confirm_timeout: Duration::from_secs(confirm_secs),
            log_filter: var("KEEPER_LOG"),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, SettingsError> {
    raw.parse().map_err(|_| SettingsError::Invalid { name, value: raw })
}

/// The tournament year for the season in progress. In Nov/Dec the season
/// already belongs to next year's tournament.
fn season_tournament_year(now: DateTime<Utc>) -> u16 {
    let year = if now.month() >= 11 { now.year() + 1 } else { now.year() };
    u16::try_from(year).unwrap_or(u16::MAX)
}
