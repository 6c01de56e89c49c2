//! Provisioning state machine.
//!
//! Pure transition function for the create client/project flow.

use super::ValidatedProvisioning;
use crate::ids::{ClientId, ProjectId};
use crate::selection::{FlightWindow, ProjectPair};

/// What the backend created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedProject {
    pub client: ClientId,
    pub project: ProjectId,
    pub flight: FlightWindow,
    pub created_client: bool,
}

impl ProvisionedProject {
    pub fn pair(&self) -> ProjectPair {
        ProjectPair::new(self.client.clone(), self.project.clone())
    }
}

/// Provisioning flow state.
///
/// 创建流程状态。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProvisioningState {
    #[default]
    Idle,
    Creating {
        request: ValidatedProvisioning,
    },
    Success {
        record: ProvisionedProject,
    },
    Error {
        message: String,
    },
}

impl ProvisioningState {
    pub fn is_creating(&self) -> bool {
        matches!(self, ProvisioningState::Creating { .. })
    }
}

/// Events that drive provisioning.
///
/// 驱动创建流程的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningEvent {
    Submit { request: ValidatedProvisioning },
    RemoteSucceeded { record: ProvisionedProject },
    RemoteFailed { message: String },
    CloseDelayElapsed,
    Dismiss,
}

/// Side-effects produced by transitions.
///
/// 状态迁移产生的副作用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningAction {
    CreateRemote { request: ValidatedProvisioning },
    /// Optimistic catalog merge, selection switch and rules reconcile.
    MergeAndSelect { record: ProvisionedProject },
    ScheduleClose,
}

pub struct ProvisioningStateMachine;

impl ProvisioningStateMachine {
    pub fn transition(
        state: ProvisioningState,
        event: ProvisioningEvent,
    ) -> (ProvisioningState, Vec<ProvisioningAction>) {
        match (state, event) {
            (
                ProvisioningState::Idle | ProvisioningState::Error { .. },
                ProvisioningEvent::Submit { request },
            ) => (
                ProvisioningState::Creating {
                    request: request.clone(),
                },
                vec![ProvisioningAction::CreateRemote { request }],
            ),
            (ProvisioningState::Creating { .. }, ProvisioningEvent::RemoteSucceeded { record }) => (
                ProvisioningState::Success {
                    record: record.clone(),
                },
                vec![
                    ProvisioningAction::MergeAndSelect { record },
                    ProvisioningAction::ScheduleClose,
                ],
            ),
            (ProvisioningState::Creating { .. }, ProvisioningEvent::RemoteFailed { message }) => (
                ProvisioningState::Error { message },
                vec![ProvisioningAction::ScheduleClose],
            ),
            (
                ProvisioningState::Success { .. } | ProvisioningState::Error { .. },
                ProvisioningEvent::CloseDelayElapsed | ProvisioningEvent::Dismiss,
            ) => (ProvisioningState::Idle, Vec::new()),
            (state, _) => (state, Vec::new()),
        }
    }
}
