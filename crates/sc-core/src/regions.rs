//! Closed set of eligible region codes and their timezone labels.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationFailure;

/// Display timezone label derived from a region.
/// 地区对应的时区标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeZoneLabel {
    Eastern,
    Central,
    Mountain,
    Pacific,
    Alaska,
    Hawaii,
}

impl TimeZoneLabel {
    pub const ALL: [TimeZoneLabel; 6] = [
        TimeZoneLabel::Eastern,
        TimeZoneLabel::Central,
        TimeZoneLabel::Mountain,
        TimeZoneLabel::Pacific,
        TimeZoneLabel::Alaska,
        TimeZoneLabel::Hawaii,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeZoneLabel::Eastern => "Eastern",
            TimeZoneLabel::Central => "Central",
            TimeZoneLabel::Mountain => "Mountain",
            TimeZoneLabel::Pacific => "Pacific",
            TimeZoneLabel::Alaska => "Alaska",
            TimeZoneLabel::Hawaii => "Hawaii",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tz| tz.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for TimeZoneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Primary timezone per jurisdiction. States split across zones use the zone
// covering the majority of the population.
const REGION_TABLE: [(&str, TimeZoneLabel); 51] = [
    ("AK", TimeZoneLabel::Alaska),
    ("AL", TimeZoneLabel::Central),
    ("AR", TimeZoneLabel::Central),
    ("AZ", TimeZoneLabel::Mountain),
    ("CA", TimeZoneLabel::Pacific),
    ("CO", TimeZoneLabel::Mountain),
    ("CT", TimeZoneLabel::Eastern),
    ("DC", TimeZoneLabel::Eastern),
    ("DE", TimeZoneLabel::Eastern),
    ("FL", TimeZoneLabel::Eastern),
    ("GA", TimeZoneLabel::Eastern),
    ("HI", TimeZoneLabel::Hawaii),
    ("IA", TimeZoneLabel::Central),
    ("ID", TimeZoneLabel::Mountain),
    ("IL", TimeZoneLabel::Central),
    ("IN", TimeZoneLabel::Eastern),
    ("KS", TimeZoneLabel::Central),
    ("KY", TimeZoneLabel::Eastern),
    ("LA", TimeZoneLabel::Central),
    ("MA", TimeZoneLabel::Eastern),
    ("MD", TimeZoneLabel::Eastern),
    ("ME", TimeZoneLabel::Eastern),
    ("MI", TimeZoneLabel::Eastern),
    ("MN", TimeZoneLabel::Central),
    ("MO", TimeZoneLabel::Central),
    ("MS", TimeZoneLabel::Central),
    ("MT", TimeZoneLabel::Mountain),
    ("NC", TimeZoneLabel::Eastern),
    ("ND", TimeZoneLabel::Central),
    ("NE", TimeZoneLabel::Central),
    ("NH", TimeZoneLabel::Eastern),
    ("NJ", TimeZoneLabel::Eastern),
    ("NM", TimeZoneLabel::Mountain),
    ("NV", TimeZoneLabel::Pacific),
    ("NY", TimeZoneLabel::Eastern),
    ("OH", TimeZoneLabel::Eastern),
    ("OK", TimeZoneLabel::Central),
    ("OR", TimeZoneLabel::Pacific),
    ("PA", TimeZoneLabel::Eastern),
    ("RI", TimeZoneLabel::Eastern),
    ("SC", TimeZoneLabel::Eastern),
    ("SD", TimeZoneLabel::Central),
    ("TN", TimeZoneLabel::Central),
    ("TX", TimeZoneLabel::Central),
    ("UT", TimeZoneLabel::Mountain),
    ("VA", TimeZoneLabel::Eastern),
    ("VT", TimeZoneLabel::Eastern),
    ("WA", TimeZoneLabel::Pacific),
    ("WI", TimeZoneLabel::Central),
    ("WV", TimeZoneLabel::Eastern),
    ("WY", TimeZoneLabel::Mountain),
];

/// A member of the closed region set. Only constructible from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(&'static str);

impl RegionCode {
    /// Looks up a code (case-insensitive). Unknown codes are rejected.
    pub fn parse(code: &str) -> Result<Self, ValidationFailure> {
        let wanted = code.trim();
        REGION_TABLE
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(wanted))
            .map(|(c, _)| RegionCode(c))
            .ok_or_else(|| ValidationFailure::UnknownRegion(code.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }

    pub fn timezone(self) -> TimeZoneLabel {
        REGION_TABLE
            .iter()
            .find(|(c, _)| *c == self.0)
            .map(|(_, tz)| *tz)
            // Unreachable: codes only come from the table.
            .unwrap_or(TimeZoneLabel::Eastern)
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = ValidationFailure;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RegionCode::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(code: RegionCode) -> Self {
        code.0.to_string()
    }
}

/// Every region in the closed set.
pub fn all_regions() -> BTreeSet<RegionCode> {
    REGION_TABLE.iter().map(|(c, _)| RegionCode(c)).collect()
}

/// Regions whose primary timezone is `tz`.
pub fn regions_in(tz: TimeZoneLabel) -> BTreeSet<RegionCode> {
    REGION_TABLE
        .iter()
        .filter(|(_, zone)| *zone == tz)
        .map(|(c, _)| RegionCode(c))
        .collect()
}

/// Deduplicated timezone labels covered by `regions`.
pub fn derive_timezones(regions: &BTreeSet<RegionCode>) -> BTreeSet<TimeZoneLabel> {
    regions.iter().map(|r| r.timezone()).collect()
}

/// Parses a list of codes, failing on the first unknown entry.
pub fn parse_regions<I, S>(codes: I) -> Result<BTreeSet<RegionCode>, ValidationFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| RegionCode::parse(c.as_ref()))
        .collect()
}
