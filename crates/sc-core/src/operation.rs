//! Per-operation status tracking.
//!
//! Every remote operation records its lifecycle here instead of sharing a
//! single global loading flag.

use std::collections::BTreeMap;
use std::fmt;

/// Identifies a console operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationId {
    HealthCheck,
    LoadClients,
    LoadProjects,
    ReconcileRules,
    SaveRules,
    DeleteRules,
    TriggerProcessing,
    PollProcessing,
    SelectWinners,
    LoadWinners,
    ExportWinners,
    LoadValidatedFiles,
    SaveKeyword,
    UploadReceipts,
    Provision,
    LoadAnalytics,
    RefreshAnalytics,
}

impl OperationId {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationId::HealthCheck => "health_check",
            OperationId::LoadClients => "load_clients",
            OperationId::LoadProjects => "load_projects",
            OperationId::ReconcileRules => "reconcile_rules",
            OperationId::SaveRules => "save_rules",
            OperationId::DeleteRules => "delete_rules",
            OperationId::TriggerProcessing => "trigger_processing",
            OperationId::PollProcessing => "poll_processing",
            OperationId::SelectWinners => "select_winners",
            OperationId::LoadWinners => "load_winners",
            OperationId::ExportWinners => "export_winners",
            OperationId::LoadValidatedFiles => "load_validated_files",
            OperationId::SaveKeyword => "save_keyword",
            OperationId::UploadReceipts => "upload_receipts",
            OperationId::Provision => "provision",
            OperationId::LoadAnalytics => "load_analytics",
            OperationId::RefreshAnalytics => "refresh_analytics",
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Running,
    Done,
    Failed(String),
}

impl OperationState {
    pub fn is_running(&self) -> bool {
        matches!(self, OperationState::Running)
    }
}

/// Operation id → last known state. Missing entries read as `Idle`.
#[derive(Debug, Clone, Default)]
pub struct OperationStatusMap {
    states: BTreeMap<OperationId, OperationState>,
}

impl OperationStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: OperationId) -> OperationState {
        self.states.get(&id).cloned().unwrap_or_default()
    }

    pub fn start(&mut self, id: OperationId) {
        self.states.insert(id, OperationState::Running);
    }

    pub fn finish(&mut self, id: OperationId) {
        self.states.insert(id, OperationState::Done);
    }

    pub fn fail(&mut self, id: OperationId, reason: impl Into<String>) {
        self.states.insert(id, OperationState::Failed(reason.into()));
    }

    /// Back to idle (e.g. a dropped stale response).
    pub fn reset(&mut self, id: OperationId) {
        self.states.remove(&id);
    }

    pub fn any_running(&self) -> bool {
        self.states.values().any(OperationState::is_running)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationId, &OperationState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_tracked_independently() {
        let mut ops = OperationStatusMap::new();
        ops.start(OperationId::SaveRules);
        ops.start(OperationId::PollProcessing);
        ops.fail(OperationId::SaveRules, "500");

        assert_eq!(
            ops.get(OperationId::SaveRules),
            OperationState::Failed("500".into())
        );
        assert_eq!(ops.get(OperationId::PollProcessing), OperationState::Running);
        assert_eq!(ops.get(OperationId::LoadWinners), OperationState::Idle);
        assert!(ops.any_running());

        ops.finish(OperationId::PollProcessing);
        assert!(!ops.any_running());
    }
}
