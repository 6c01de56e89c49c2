//! Winner records and the winner-selection gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processing::{ProcessingState, ProcessingStatus};

/// A selected winner. Rank order is authoritative from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub rank: u32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub zip: String,
    pub selection_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnersExport {
    pub download_url: String,
}

/// Winner selection is allowed only for a full selection whose processing
/// completed with at least one eligible contestant.
pub fn can_select_winners(has_full_selection: bool, status: Option<&ProcessingStatus>) -> bool {
    has_full_selection
        && status.is_some_and(|s| {
            s.state == ProcessingState::Completed && s.eligible_contestants > 0
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: ProcessingState, eligible: u64) -> ProcessingStatus {
        ProcessingStatus {
            state,
            eligible_contestants: eligible,
            filter_statistics: None,
            message: None,
        }
    }

    #[test]
    fn gate_truth_table() {
        let states = [
            ProcessingState::Pending,
            ProcessingState::Processing,
            ProcessingState::Completed,
            ProcessingState::Error,
        ];
        for full in [false, true] {
            assert!(!can_select_winners(full, None), "null status must close the gate");
            for state in states {
                for eligible in [0u64, 5] {
                    let s = status(state, eligible);
                    let expected =
                        full && state == ProcessingState::Completed && eligible > 0;
                    assert_eq!(
                        can_select_winners(full, Some(&s)),
                        expected,
                        "full={full} state={state:?} eligible={eligible}"
                    );
                }
            }
        }
    }
}
