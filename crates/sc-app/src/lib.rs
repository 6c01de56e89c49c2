//! Sweepstakes Contest Console Orchestration Layer
//!
//! This crate contains the contest workflow use cases and the console facade
//! that owns the session state.

pub mod api;
pub mod console;
pub mod context;
pub mod usecases;

pub use api::ContestApi;
pub use console::ContestConsole;
pub use context::ConsoleContext;
