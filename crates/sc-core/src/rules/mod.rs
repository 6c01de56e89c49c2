//! Contest rules: editable draft, wire payload and workflow mode.

mod draft;
mod mode;
mod wire;

pub use draft::{
    ContestRulesDraft, DateRange, PrizeStructure, RulesValidationError, WinnerPeriod, WinnerRule,
};
pub use mode::{DraftOrigin, RulesMode};
pub use wire::ContestRulesPayload;
