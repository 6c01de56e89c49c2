//! In-memory contest rules draft.
//!
//! Every mutator takes `&self` and returns a new draft, so a caller holding
//! a previous version never observes a partial edit.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::ContestRulesPayload;
use crate::ids::WinnerRuleId;
use crate::regions::{self, RegionCode, TimeZoneLabel};
use crate::selection::FlightWindow;

const DEFAULT_AGE_MIN: u32 = 18;
const DEFAULT_AGE_MAX: u32 = 120;

/// Recurrence a winner rule draws over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinnerPeriod {
    Hour,
    Day,
    Week,
    Month,
    Year,
    /// One draw per eligible region.
    State,
}

impl WinnerPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(WinnerPeriod::Hour),
            "day" => Some(WinnerPeriod::Day),
            "week" => Some(WinnerPeriod::Week),
            "month" => Some(WinnerPeriod::Month),
            "year" => Some(WinnerPeriod::Year),
            "state" => Some(WinnerPeriod::State),
            _ => None,
        }
    }
}

/// One winner-selection sub-rule: `count` winners per `period`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRule {
    #[serde(default = "WinnerRuleId::generate")]
    pub id: WinnerRuleId,
    pub count: i64,
    pub period: WinnerPeriod,
}

impl WinnerRule {
    fn fresh() -> Self {
        Self {
            id: WinnerRuleId::generate(),
            count: 1,
            period: WinnerPeriod::Day,
        }
    }
}

/// A date range whose bounds may be unset while editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// `end > start` whenever both are set.
    pub fn is_ordered(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end > start,
            _ => true,
        }
    }
}

impl From<FlightWindow> for DateRange {
    fn from(window: FlightWindow) -> Self {
        Self {
            start: Some(window.start),
            end: Some(window.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrizeStructure {
    #[serde(default)]
    pub grand_prize: String,
    #[serde(default)]
    pub runner_ups: Vec<String>,
}

/// Reasons a draft cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesValidationError {
    #[error("entry window end {end} must be after start {start}")]
    InvalidEntryWindow { start: NaiveDate, end: NaiveDate },

    #[error("at least one winner rule is required")]
    NoWinnerRules,

    #[error("winner rule {id} has a negative count ({count})")]
    NegativeWinnerCount { id: WinnerRuleId, count: i64 },

    #[error("minimum age {min} is greater than maximum age {max}")]
    InvalidAgeRange { min: u32, max: u32 },

    #[error("max entries per person must be at least 1 (got {0})")]
    InvalidMaxEntries(i64),

    #[error("total winners must be at least 1 (got {0})")]
    InvalidTotalWinners(i64),
}

/// Mutable contest rules draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ContestRulesDraft {
    age_min: u32,
    age_max: u32,
    eligible_states: BTreeSet<RegionCode>,
    entry_window: DateRange,
    max_entries_per_person: i64,
    total_winners: i64,
    winner_rules: Vec<WinnerRule>,
    flight_window: DateRange,
    prize_structure: PrizeStructure,
    receipt_product_keyword: Option<String>,
    required_products: Vec<String>,
    extra: Map<String, Value>,
}

impl ContestRulesDraft {
    /// Template used when a project has no saved rules yet.
    ///
    /// Entry window and flight window both start out as the project's flight window.
    pub fn default_template(flight: Option<FlightWindow>) -> Self {
        let window = flight.map(DateRange::from).unwrap_or_default();
        Self {
            age_min: DEFAULT_AGE_MIN,
            age_max: DEFAULT_AGE_MAX,
            eligible_states: regions::all_regions(),
            entry_window: window,
            max_entries_per_person: 1,
            total_winners: 1,
            winner_rules: vec![WinnerRule::fresh()],
            flight_window: window,
            prize_structure: PrizeStructure::default(),
            receipt_product_keyword: None,
            required_products: Vec::new(),
            extra: Map::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn age_min(&self) -> u32 {
        self.age_min
    }

    pub fn age_max(&self) -> u32 {
        self.age_max
    }

    pub fn eligible_states(&self) -> &BTreeSet<RegionCode> {
        &self.eligible_states
    }

    pub fn entry_window(&self) -> DateRange {
        self.entry_window
    }

    pub fn max_entries_per_person(&self) -> i64 {
        self.max_entries_per_person
    }

    pub fn total_winners(&self) -> i64 {
        self.total_winners
    }

    pub fn winner_rules(&self) -> &[WinnerRule] {
        &self.winner_rules
    }

    pub fn flight_window(&self) -> DateRange {
        self.flight_window
    }

    pub fn prize_structure(&self) -> &PrizeStructure {
        &self.prize_structure
    }

    /// Derived, never stored.
    pub fn timezones(&self) -> BTreeSet<TimeZoneLabel> {
        regions::derive_timezones(&self.eligible_states)
    }

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

    // ---------------------------------------------------------------------
    // Field replacements
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn with_age_range(&self, min: u32, max: u32) -> Self {
        Self {
            age_min: min,
            age_max: max,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_entry_window(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            entry_window: DateRange::new(start, end),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_max_entries_per_person(&self, max: i64) -> Self {
        Self {
            max_entries_per_person: max,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_total_winners(&self, total: i64) -> Self {
        Self {
            total_winners: total,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_flight_window(&self, window: DateRange) -> Self {
        Self {
            flight_window: window,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_prize_structure(&self, prizes: PrizeStructure) -> Self {
        Self {
            prize_structure: prizes,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_product_keyword(&self, keyword: Option<String>) -> Self {
        Self {
            receipt_product_keyword: keyword,
            ..self.clone()
        }
    }

    // ---------------------------------------------------------------------
    // Regions
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn with_regions(&self, regions: BTreeSet<RegionCode>) -> Self {
        Self {
            eligible_states: regions,
            ..self.clone()
        }
    }

    /// Flips membership of a single region.
    #[must_use]
    pub fn toggle_region(&self, code: RegionCode) -> Self {
        let mut regions = self.eligible_states.clone();
        if !regions.remove(&code) {
            regions.insert(code);
        }
        self.with_regions(regions)
    }

    #[must_use]
    pub fn select_all_regions(&self) -> Self {
        self.with_regions(regions::all_regions())
    }

    #[must_use]
    pub fn deselect_all_regions(&self) -> Self {
        self.with_regions(BTreeSet::new())
    }

    /// Adds every region of `tz`; never removes anything.
    #[must_use]
    pub fn select_timezone(&self, tz: TimeZoneLabel) -> Self {
        let mut regions = self.eligible_states.clone();
        regions.extend(regions::regions_in(tz));
        self.with_regions(regions)
    }

    // ---------------------------------------------------------------------
    // Winner rules
    // ---------------------------------------------------------------------

    /// Appends a `{count: 1, period: day}` row with a fresh id.
    #[must_use]
    pub fn add_winner_rule(&self) -> Self {
        let mut rules = self.winner_rules.clone();
        rules.push(WinnerRule::fresh());
        Self {
            winner_rules: rules,
            ..self.clone()
        }
    }

    /// Removes the row with `id`. No-op when it is the last row.
    #[must_use]
    pub fn remove_winner_rule(&self, id: &WinnerRuleId) -> Self {
        if self.winner_rules.len() <= 1 {
            return self.clone();
        }
        let rules = self
            .winner_rules
            .iter()
            .filter(|r| &r.id != id)
            .cloned()
            .collect();
        Self {
            winner_rules: rules,
            ..self.clone()
        }
    }

    /// Replaces the row with `id`; unknown ids leave the draft unchanged.
    #[must_use]
    pub fn update_winner_rule(&self, id: &WinnerRuleId, count: i64, period: WinnerPeriod) -> Self {
        let rules = self
            .winner_rules
            .iter()
            .map(|r| {
                if &r.id == id {
                    WinnerRule {
                        id: r.id.clone(),
                        count,
                        period,
                    }
                } else {
                    r.clone()
                }
            })
            .collect();
        Self {
            winner_rules: rules,
            ..self.clone()
        }
    }

    /// Replaces the whole list; an empty list is kept as-is and rejected at submit.
    #[must_use]
    pub fn with_winner_rules(&self, rules: Vec<WinnerRule>) -> Self {
        Self {
            winner_rules: rules,
            ..self.clone()
        }
    }

    // ---------------------------------------------------------------------
    // Validation & submission
    // ---------------------------------------------------------------------

    pub fn validate(&self) -> Result<(), RulesValidationError> {
        if let (Some(start), Some(end)) = (self.entry_window.start, self.entry_window.end) {
            if end <= start {
                return Err(RulesValidationError::InvalidEntryWindow { start, end });
            }
        }
        if self.winner_rules.is_empty() {
            return Err(RulesValidationError::NoWinnerRules);
        }
        if let Some(rule) = self.winner_rules.iter().find(|r| r.count < 0) {
            return Err(RulesValidationError::NegativeWinnerCount {
                id: rule.id.clone(),
                count: rule.count,
            });
        }
        if self.age_min > self.age_max {
            return Err(RulesValidationError::InvalidAgeRange {
                min: self.age_min,
                max: self.age_max,
            });
        }
        if self.max_entries_per_person < 1 {
            return Err(RulesValidationError::InvalidMaxEntries(
                self.max_entries_per_person,
            ));
        }
        if self.total_winners < 1 {
            return Err(RulesValidationError::InvalidTotalWinners(self.total_winners));
        }
        Ok(())
    }

    /// Builds the payload sent to the backend.
    ///
    /// The flight window comes from the selection context when it has one;
    /// the draft's own copy is only used when the context has none.
    pub fn to_submission(&self, context_flight: Option<FlightWindow>) -> ContestRulesPayload {
        let flight = context_flight
            .map(DateRange::from)
            .unwrap_or(self.flight_window);
        ContestRulesPayload {
            age_min: self.age_min,
            age_max: self.age_max,
            eligible_states: self
                .eligible_states
                .iter()
                .map(|r| r.as_str().to_string())
                .collect(),
            entry_start_date: self.entry_window.start,
            entry_end_date: self.entry_window.end,
            max_entries_per_person: self.max_entries_per_person,
            total_winners: self.total_winners,
            winner_rules: self.winner_rules.clone(),
            flight_start_date: flight.start,
            flight_end_date: flight.end,
            prize_structure: self.prize_structure.clone(),
            receipt_product_keyword: self.receipt_product_keyword.clone(),
            required_products: self.required_products.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl From<ContestRulesPayload> for ContestRulesDraft {
    /// Unknown region codes in remote data are dropped.
    fn from(payload: ContestRulesPayload) -> Self {
        let mut eligible_states = BTreeSet::new();
        for code in &payload.eligible_states {
            match RegionCode::parse(code) {
                Ok(region) => {
                    eligible_states.insert(region);
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(code = %code, "dropping unknown region code from saved rules");
                }
            }
        }
        Self {
            age_min: payload.age_min,
            age_max: payload.age_max,
            eligible_states,
            entry_window: DateRange::new(payload.entry_start_date, payload.entry_end_date),
            max_entries_per_person: payload.max_entries_per_person,
            total_winners: payload.total_winners,
            winner_rules: payload.winner_rules,
            flight_window: DateRange::new(payload.flight_start_date, payload.flight_end_date),
            prize_structure: payload.prize_structure,
            receipt_product_keyword: payload.receipt_product_keyword,
            required_products: payload.required_products,
            extra: payload.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::parse_regions;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn december() -> FlightWindow {
        FlightWindow::new(date(2024, 12, 1), date(2024, 12, 31)).unwrap()
    }

    #[test]
    fn template_is_prefilled_with_flight_window() {
        let draft = ContestRulesDraft::default_template(Some(december()));
        assert_eq!(draft.entry_window().start, Some(date(2024, 12, 1)));
        assert_eq!(draft.entry_window().end, Some(date(2024, 12, 31)));
        assert_eq!(draft.flight_window(), DateRange::from(december()));
        assert_eq!(draft.winner_rules().len(), 1);
        assert_eq!(draft.winner_rules()[0].count, 1);
        assert_eq!(draft.winner_rules()[0].period, WinnerPeriod::Day);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn entry_window_end_not_after_start_is_rejected() {
        let draft = ContestRulesDraft::default_template(None)
            .with_entry_window(Some(date(2024, 12, 10)), Some(date(2024, 12, 10)));
        assert_eq!(
            draft.validate(),
            Err(RulesValidationError::InvalidEntryWindow {
                start: date(2024, 12, 10),
                end: date(2024, 12, 10),
            })
        );
    }

    #[test]
    fn half_open_entry_window_is_accepted() {
        let draft =
            ContestRulesDraft::default_template(None).with_entry_window(Some(date(2024, 1, 1)), None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn mutators_leave_the_original_untouched() {
        let original = ContestRulesDraft::default_template(None);
        let edited = original.with_total_winners(10).deselect_all_regions();
        assert_eq!(original.total_winners(), 1);
        assert_eq!(original.eligible_states().len(), 51);
        assert_eq!(edited.total_winners(), 10);
        assert!(edited.eligible_states().is_empty());
    }

    #[test]
    fn select_all_is_idempotent() {
        let draft = ContestRulesDraft::default_template(None).deselect_all_regions();
        let once = draft.select_all_regions();
        let twice = once.select_all_regions();
        assert_eq!(once.eligible_states(), twice.eligible_states());
        assert_eq!(once.eligible_states(), &regions::all_regions());
    }

    #[test]
    fn toggle_flips_membership() {
        let ca = RegionCode::parse("CA").unwrap();
        let draft = ContestRulesDraft::default_template(None).deselect_all_regions();
        let on = draft.toggle_region(ca);
        assert!(on.eligible_states().contains(&ca));
        let off = on.toggle_region(ca);
        assert!(!off.eligible_states().contains(&ca));
    }

    #[test]
    fn select_timezone_unions_instead_of_replacing() {
        let draft = ContestRulesDraft::default_template(None)
            .with_regions(parse_regions(["NY"]).unwrap())
            .select_timezone(TimeZoneLabel::Pacific);
        let states = draft.eligible_states();
        assert!(states.contains(&RegionCode::parse("NY").unwrap()));
        assert!(states.contains(&RegionCode::parse("CA").unwrap()));
        assert!(states.contains(&RegionCode::parse("WA").unwrap()));
        assert_eq!(states.len(), 1 + regions::regions_in(TimeZoneLabel::Pacific).len());
    }

    #[test]
    fn last_winner_rule_cannot_be_removed() {
        let draft = ContestRulesDraft::default_template(None);
        let only = draft.winner_rules()[0].id.clone();
        let after = draft.remove_winner_rule(&only);
        assert_eq!(after.winner_rules().len(), 1);
    }

    #[test]
    fn add_update_remove_winner_rules_by_id() {
        let draft = ContestRulesDraft::default_template(None).add_winner_rule();
        assert_eq!(draft.winner_rules().len(), 2);
        let first = draft.winner_rules()[0].id.clone();
        let second = draft.winner_rules()[1].id.clone();
        assert_ne!(first, second);

        let updated = draft.update_winner_rule(&second, 3, WinnerPeriod::Week);
        assert_eq!(updated.winner_rules()[1].count, 3);
        assert_eq!(updated.winner_rules()[1].period, WinnerPeriod::Week);
        assert_eq!(updated.winner_rules()[0], draft.winner_rules()[0]);

        let removed = updated.remove_winner_rule(&first);
        assert_eq!(removed.winner_rules().len(), 1);
        assert_eq!(removed.winner_rules()[0].id, second);
    }

    #[test]
    fn negative_count_and_empty_rules_are_rejected() {
        let draft = ContestRulesDraft::default_template(None);
        let id = draft.winner_rules()[0].id.clone();
        let negative = draft.update_winner_rule(&id, -1, WinnerPeriod::Day);
        assert!(matches!(
            negative.validate(),
            Err(RulesValidationError::NegativeWinnerCount { count: -1, .. })
        ));

        let empty = draft.with_winner_rules(Vec::new());
        assert_eq!(empty.validate(), Err(RulesValidationError::NoWinnerRules));
    }

    #[test]
    fn submission_takes_flight_window_from_context() {
        let stale = DateRange::new(Some(date(2023, 1, 1)), Some(date(2023, 2, 1)));
        let draft = ContestRulesDraft::default_template(None).with_flight_window(stale);
        let payload = draft.to_submission(Some(december()));
        assert_eq!(payload.flight_start_date, Some(date(2024, 12, 1)));
        assert_eq!(payload.flight_end_date, Some(date(2024, 12, 31)));

        let fallback = draft.to_submission(None);
        assert_eq!(fallback.flight_start_date, Some(date(2023, 1, 1)));
    }

    #[test]
    fn payload_round_trip_preserves_rules_and_regions() {
        let draft = ContestRulesDraft::default_template(Some(december()))
            .with_regions(parse_regions(["CA", "NY"]).unwrap())
            .with_total_winners(10)
            .add_winner_rule();
        let payload = draft.to_submission(Some(december()));
        let json = serde_json::to_value(&payload).unwrap();
        let echoed: ContestRulesPayload = serde_json::from_value(json).unwrap();
        let reloaded = ContestRulesDraft::from(echoed);

        assert_eq!(reloaded.eligible_states(), draft.eligible_states());
        assert_eq!(reloaded.winner_rules(), draft.winner_rules());
        assert_eq!(reloaded.total_winners(), draft.total_winners());
    }
}
