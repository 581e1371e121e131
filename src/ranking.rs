use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::collections::quicksort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Alphabetical by site label.
    #[default]
    Default,
    /// Most Active reservations first.
    Bookings,
    /// Highest usage revenue first.
    Revenue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortMode(pub String);

impl fmt::Display for UnknownSortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort mode {:?} (expected default, bookings or revenue)", self.0)
    }
}

impl std::error::Error for UnknownSortMode {}

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "name" => Ok(SortMode::Default),
            "bookings" => Ok(SortMode::Bookings),
            "revenue" => Ok(SortMode::Revenue),
            _ => Err(UnknownSortMode(s.to_string())),
        }
    }
}

/// Order every site that appears in either map.
///
/// Sites missing from a map count as zero. Descending modes break ties
/// alphabetically so the result is deterministic.
pub fn rank_sites(
    mode: SortMode,
    counts: &BTreeMap<String, u64>,
    revenue: &BTreeMap<String, Decimal>,
) -> Vec<String> {
    let sites: BTreeSet<&String> = counts.keys().chain(revenue.keys()).collect();
    let mut ranked: Vec<String> = sites.into_iter().cloned().collect();

    match mode {
        SortMode::Default => quicksort::sort(&mut ranked),
        SortMode::Bookings => {
            let count = |site: &String| counts.get(site).copied().unwrap_or(0);
            quicksort::sort_by(&mut ranked, |a, b| count(b).cmp(&count(a)).then_with(|| a.cmp(b)));
        }
        SortMode::Revenue => {
            let earned = |site: &String| revenue.get(site).copied().unwrap_or(Decimal::ZERO);
            quicksort::sort_by(&mut ranked, |a, b| earned(b).cmp(&earned(a)).then_with(|| a.cmp(b)));
        }
    }
    ranked
}
