//! Data-processing status as observed from the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Backend processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProcessingState {
    /// Polling stops once this is true.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Completed | ProcessingState::Error)
    }
}

/// One observed snapshot. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    #[serde(alias = "status")]
    pub state: ProcessingState,
    #[serde(default)]
    pub eligible_contestants: u64,
    /// Breakdown counters (duplicates removed, age filtered, ...), when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_statistics: Option<BTreeMap<String, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `final` writes the validated entry set; `temp` produces a preview download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingType {
    Final,
    Temp,
}

impl ProcessingType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingType::Final => "final",
            ProcessingType::Temp => "temp",
        }
    }
}

/// Acknowledgement of a processing trigger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessingTrigger {
    #[serde(default)]
    pub message: Option<String>,
    /// Only returned for `temp` processing.
    #[serde(default)]
    pub download_url: Option<String>,
}
