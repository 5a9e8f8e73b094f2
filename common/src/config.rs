//! Server settings, read from the environment (and `.env` if present).

use crate::DEFAULT_PORT;
use crate::error::ProgressError;
use chrono::Weekday;
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

pub const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub address: IpAddr,
    pub port: u16,
    pub pool_size: u32,
    /// Start of the reporting week for the ranking and the summary.
    pub period_anchor: Weekday,
    /// Start of the reporting week for the legacy staff rankings list.
    pub staff_rankings_anchor: Weekday,
}

impl Settings {
    /// Load `.env` and read settings from the process environment.
    ///
    /// # Errors
    /// Returns a validation error if `DATABASE_URL` is unset or a value does not parse.
    pub fn from_env() -> Result<Self, ProgressError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, applying defaults for anything unset.
    ///
    /// # Errors
    /// Returns a validation error if `DATABASE_URL` is unset or a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProgressError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ProgressError::validation("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            address: parse_or(&lookup, "ADDRESS", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            period_anchor: parse_or(&lookup, "REPORT_PERIOD_ANCHOR", Weekday::Fri)?,
            staff_rankings_anchor: parse_or(&lookup, "STAFF_RANKINGS_ANCHOR", Weekday::Thu)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ProgressError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ProgressError::validation(format!("{key}={raw:?} is not valid"))),
    }
}
