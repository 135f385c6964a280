use std::{fmt::Display, str::FromStr};

use thiserror::Error;

pub const MIN_COUNT: u32 = 10;
pub const MAX_COUNT: u32 = 100;
pub const DEFAULT_COUNT: u32 = 20;

/// Trailing time range over which play counts are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    SevenDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
    Overall,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown period '{0}'")]
pub struct UnknownPeriod(pub String);

impl Period {
    /// In the order they are offered in the selector
    pub const ALL: [Period; 6] = [
        Period::SevenDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::TwelveMonths,
        Period::Overall,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::SevenDays => "7 Dias",
            Period::OneMonth => "1 Mês",
            Period::ThreeMonths => "3 Meses",
            Period::SixMonths => "6 Meses",
            Period::TwelveMonths => "12 Meses",
            Period::Overall => "Geral",
        }
    }

    /// Period identifier understood by the Last.fm API
    pub fn api_name(&self) -> &'static str {
        match self {
            Period::SevenDays => "7day",
            Period::OneMonth => "1month",
            Period::ThreeMonths => "3month",
            Period::SixMonths => "6month",
            Period::TwelveMonths => "12month",
            Period::Overall => "overall",
        }
    }
}

impl FromStr for Period {
    type Err = UnknownPeriod;

    /// Accepts either the display label or the API identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s) || p.api_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One palette request. Built per user action and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub identity: String,
    pub period: Period,
    count: u32,
}

impl Query {
    /// `count` is clamped into `[MIN_COUNT, MAX_COUNT]`, identity is kept as is.
    pub fn new(identity: impl Into<String>, period: Period, count: u32) -> Self {
        Self {
            identity: identity.into(),
            period,
            count: clamp_count(count),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

pub fn clamp_count(count: u32) -> u32 {
    count.clamp(MIN_COUNT, MAX_COUNT)
}
