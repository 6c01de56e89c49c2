//! Wire representation of contest rules as stored by the backend.
//!
//! Unknown fields are kept in `extra` so a read-modify-write never drops data
//! written by another tool.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{PrizeStructure, WinnerRule};
use crate::wire_dates::lenient_date;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestRulesPayload {
    #[serde(default)]
    pub age_min: u32,
    #[serde(default)]
    pub age_max: u32,
    #[serde(default)]
    pub eligible_states: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_end_date: Option<NaiveDate>,
    #[serde(default = "one")]
    pub max_entries_per_person: i64,
    #[serde(default = "one")]
    pub total_winners: i64,
    #[serde(default)]
    pub winner_rules: Vec<WinnerRule>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub flight_start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub flight_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub prize_structure: PrizeStructure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_product_keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_products: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn one() -> i64 {
    1
}

impl ContestRulesPayload {
    /// Keyword used for receipt OCR matching.
    ///
    /// Falls back to the first entry of the legacy `required_products` list.
    pub fn product_keyword(&self) -> Option<&str> {
        self.receipt_product_keyword
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.required_products
                    .iter()
                    .map(String::as_str)
                    .find(|k| !k.trim().is_empty())
            })
    }
}
