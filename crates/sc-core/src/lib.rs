//! # sc-core
//!
//! Core domain models and business rules for the sweepstakes contest console.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Everything that talks to the backend goes through the traits in [`ports`].

// Public module exports
pub mod analytics;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod ids;
pub mod operation;
pub mod ports;
pub mod processing;
pub mod provisioning;
pub mod receipts;
pub mod regions;
pub mod rules;
pub mod selection;
pub mod winners;
pub mod wire_dates;

// Re-export commonly used types at the crate root
pub use config::ConsoleConfig;
pub use errors::{ConsoleError, ValidationFailure};
pub use ids::{ClientId, ProjectId, WinnerRuleId};
pub use processing::{ProcessingState, ProcessingStatus};
pub use regions::{RegionCode, TimeZoneLabel};
pub use rules::{ContestRulesDraft, RulesMode, WinnerPeriod, WinnerRule};
pub use selection::{FlightWindow, ProjectPair, SelectionContext, SelectionSnapshot};
