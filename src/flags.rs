//! Reliability/outlier classification of a (feature, statistic, year) triple.

use crate::models::Feature;

/// Filing-rate statistic id.
pub const FILING_RATE: &str = "efr";
/// Eviction-rate statistic id.
pub const EVICTION_RATE: &str = "er";
/// State FIPS code whose filing rates get the jurisdiction-specific note.
pub const MARYLAND_FIPS: &str = "24";

const LOW_FLAG_STATS: [&str; 2] = [EVICTION_RATE, FILING_RATE];

/// Exactly one of these holds for any triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    None,
    Low,
    High,
    Maryland,
}

impl Flag {
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Flag::None)
    }
}

pub fn is_maryland_filing(feature: &Feature, stat: &str) -> bool {
    stat == FILING_RATE && feature.state_fips() == MARYLAND_FIPS
}

pub fn is_high_flag(feature: &Feature, stat: &str, year_suffix: &str) -> bool {
    feature.has_high_marker(&format!("{stat}-{year_suffix}")) && !is_maryland_filing(feature, stat)
}

pub fn is_low_flag(feature: &Feature, stat: &str, year_suffix: &str) -> bool {
    LOW_FLAG_STATS.contains(&stat)
        && feature.has_low_marker(year_suffix)
        && !is_high_flag(feature, stat, year_suffix)
        && !is_maryland_filing(feature, stat)
}

/// Classify a triple. Maryland takes precedence over high, high over low.
pub fn classify(feature: &Feature, stat: &str, year_suffix: &str) -> Flag {
    if is_maryland_filing(feature, stat) {
        Flag::Maryland
    } else if is_high_flag(feature, stat, year_suffix) {
        Flag::High
    } else if is_low_flag(feature, stat, year_suffix) {
        Flag::Low
    } else {
        Flag::None
    }
}
