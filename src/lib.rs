//! Sweepstakes Contest Console
//!
//! 抽奖活动运营控制台

pub mod bootstrap;
pub mod cli;
pub mod commands;
