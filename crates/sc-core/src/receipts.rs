//! Receipt batch upload: summary model, archive validation and the per-upload
//! state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationFailure;
use crate::ids::ProjectId;
use crate::wire_dates::lenient_timestamp;

/// Summary written by the receipt pipeline after a batch is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptBatchSummary {
    pub total_receipts: u64,
    pub confirmed: u64,
    pub unconfirmed: u64,
    pub errors: u64,
    pub confirmation_rate: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub processing_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub keyword_used: String,
    #[serde(default)]
    pub csv_location: Option<String>,
}

/// Logical key of the latest summary for a project.
pub fn summary_object_key(project: &ProjectId) -> String {
    format!("{}/receipts/results/summary_latest.json", project.as_str())
}

/// Only `.zip` archives are accepted (case-insensitive).
pub fn validate_archive_name(file_name: &str) -> Result<(), ValidationFailure> {
    let is_zip = std::path::Path::new(file_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip {
        Ok(())
    } else {
        Err(ValidationFailure::InvalidArchiveExtension {
            file_name: file_name.to_string(),
        })
    }
}

/// Why the last upload ended without a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUploadFailure {
    /// Rejected locally before any remote call.
    Rejected(String),
    /// Presign or transfer failed.
    UploadFailed(String),
    /// The summary never appeared within the attempt budget.
    TimedOut { attempts: u32 },
    /// Fetching the summary failed.
    PollFailed(String),
    /// The selection changed while waiting.
    Cancelled,
}

/// Upload state.
///
/// 上传状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUploadState {
    Idle {
        summary: Option<ReceiptBatchSummary>,
        failure: Option<ReceiptUploadFailure>,
    },
    Uploading {
        file_name: String,
    },
    Processing {
        file_name: String,
        started_at: DateTime<Utc>,
    },
}

impl Default for ReceiptUploadState {
    fn default() -> Self {
        ReceiptUploadState::Idle {
            summary: None,
            failure: None,
        }
    }
}

impl ReceiptUploadState {
    pub fn is_busy(&self) -> bool {
        !matches!(self, ReceiptUploadState::Idle { .. })
    }
}

/// Events that drive an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUploadEvent {
    FileChosen { file_name: String },
    UploadSucceeded { started_at: DateTime<Utc> },
    UploadFailed { reason: String },
    SummaryFound { summary: ReceiptBatchSummary },
    PollTimedOut { attempts: u32 },
    PollFailed { reason: String },
    Cancelled,
}

/// Side-effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUploadAction {
    RequestUpload { file_name: String },
    StartSummaryPoll { started_at: DateTime<Utc> },
}

/// Pure upload state machine: no side effects.
pub struct ReceiptUploadStateMachine;

impl ReceiptUploadStateMachine {
    pub fn transition(
        state: ReceiptUploadState,
        event: ReceiptUploadEvent,
    ) -> (ReceiptUploadState, Vec<ReceiptUploadAction>) {
        match (state, event) {
            (ReceiptUploadState::Idle { summary, .. }, ReceiptUploadEvent::FileChosen { file_name }) => {
                match validate_archive_name(&file_name) {
                    Ok(()) => (
                        ReceiptUploadState::Uploading {
                            file_name: file_name.clone(),
                        },
                        vec![ReceiptUploadAction::RequestUpload { file_name }],
                    ),
                    Err(err) => (
                        ReceiptUploadState::Idle {
                            summary,
                            failure: Some(ReceiptUploadFailure::Rejected(err.to_string())),
                        },
                        Vec::new(),
                    ),
                }
            }
            (
                ReceiptUploadState::Uploading { file_name },
                ReceiptUploadEvent::UploadSucceeded { started_at },
            ) => (
                ReceiptUploadState::Processing {
                    file_name,
                    started_at,
                },
                vec![ReceiptUploadAction::StartSummaryPoll { started_at }],
            ),
            (ReceiptUploadState::Uploading { .. }, ReceiptUploadEvent::UploadFailed { reason }) => (
                ReceiptUploadState::Idle {
                    summary: None,
                    failure: Some(ReceiptUploadFailure::UploadFailed(reason)),
                },
                Vec::new(),
            ),
            (ReceiptUploadState::Processing { .. }, ReceiptUploadEvent::SummaryFound { summary }) => (
                ReceiptUploadState::Idle {
                    summary: Some(summary),
                    failure: None,
                },
                Vec::new(),
            ),
            (ReceiptUploadState::Processing { .. }, ReceiptUploadEvent::PollTimedOut { attempts }) => (
                ReceiptUploadState::Idle {
                    summary: None,
                    failure: Some(ReceiptUploadFailure::TimedOut { attempts }),
                },
                Vec::new(),
            ),
            (ReceiptUploadState::Processing { .. }, ReceiptUploadEvent::PollFailed { reason }) => (
                ReceiptUploadState::Idle {
                    summary: None,
                    failure: Some(ReceiptUploadFailure::PollFailed(reason)),
                },
                Vec::new(),
            ),
            (
                ReceiptUploadState::Uploading { .. } | ReceiptUploadState::Processing { .. },
                ReceiptUploadEvent::Cancelled,
            ) => (
                ReceiptUploadState::Idle {
                    summary: None,
                    failure: Some(ReceiptUploadFailure::Cancelled),
                },
                Vec::new(),
            ),
            (state, _event) => (state, Vec::new()),
        }
    }
}
