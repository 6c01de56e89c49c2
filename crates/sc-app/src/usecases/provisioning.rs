//! Provisioning sequencer.
//!
//! Drives the provisioning state machine and performs its side effects.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, Instrument};

use sc_core::catalog::{ClientBucket, ProjectEntry};
use sc_core::operation::OperationId;
use sc_core::ports::ClockPort;
use sc_core::provisioning::{
    ProvisionedProject, ProvisioningAction, ProvisioningEvent, ProvisioningRequest,
    ProvisioningState, ProvisioningStateMachine,
};
use sc_core::{ConsoleError, ValidationFailure};

use crate::api::ContestApi;
use crate::context::ConsoleContext;
use crate::usecases::rules::RulesReconciler;

pub struct ProvisioningSequencer {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
    reconciler: Arc<RulesReconciler>,
    clock: Arc<dyn ClockPort>,
    close_delay: Duration,
    /// Serializes dispatch calls so a transition and its actions run as a unit.
    dispatch_lock: Mutex<()>,
}

impl ProvisioningSequencer {
    pub fn new(
        api: Arc<ContestApi>,
        ctx: Arc<ConsoleContext>,
        reconciler: Arc<RulesReconciler>,
        clock: Arc<dyn ClockPort>,
        close_delay: Duration,
    ) -> Self {
        Self {
            api,
            ctx,
            reconciler,
            clock,
            close_delay,
            dispatch_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> ProvisioningState {
        self.ctx.provisioning.lock().await.clone()
    }

    /// Validates and submits a provisioning request.
    ///
    /// Invalid input never leaves `idle`. A remote failure leaves the catalog
    /// and the selection untouched.
    pub async fn submit(
        &self,
        request: ProvisioningRequest,
    ) -> Result<ProvisionedProject, ConsoleError> {
        let validated = request.validate()?;
        let _dispatch_guard = self.dispatch_lock.lock().await;
        if self.state().await.is_creating() {
            return Err(ValidationFailure::ProvisioningBusy.into());
        }

        let span = info_span!(
            "usecase.provisioning.submit",
            client = %validated.client,
            project = %validated.project
        );
        self.ctx
            .track(OperationId::Provision, async {
                let mut pending = vec![ProvisioningEvent::Submit { request: validated }];
                let mut result = Err(ConsoleError::Validation(ValidationFailure::ProvisioningBusy));

                while let Some(event) = pending.pop() {
                    let from = self.state().await;
                    let (next, actions) = ProvisioningStateMachine::transition(from.clone(), event);
                    info!(from = ?from, to = ?next, "provisioning state transition");
                    *self.ctx.provisioning.lock().await = next;

                    for action in actions {
                        debug!(?action, "provisioning executing action");
                        match action {
                            ProvisioningAction::CreateRemote { request } => {
                                match self.api.create_client(&request).await {
                                    Ok(()) => pending.push(ProvisioningEvent::RemoteSucceeded {
                                        record: ProvisionedProject {
                                            client: request.client.clone(),
                                            project: request.project.clone(),
                                            flight: request.flight,
                                            created_client: request.creates_client,
                                        },
                                    }),
                                    Err(err) => {
                                        error!(error = %err, "provisioning failed");
                                        pending.push(ProvisioningEvent::RemoteFailed {
                                            message: err.to_string(),
                                        });
                                        result = Err(err);
                                    }
                                }
                            }
                            ProvisioningAction::MergeAndSelect { record } => {
                                self.merge_and_select(&record).await;
                                result = Ok(record);
                            }
                            ProvisioningAction::ScheduleClose => self.schedule_close().await,
                        }
                    }
                }
                result
            })
            .instrument(span)
            .await
    }

    /// Returns to idle from `success` or `error` without waiting.
    pub async fn dismiss(&self) -> ProvisioningState {
        let _dispatch_guard = self.dispatch_lock.lock().await;
        let mut state = self.ctx.provisioning.lock().await;
        let (next, _) = ProvisioningStateMachine::transition(state.clone(), ProvisioningEvent::Dismiss);
        *state = next.clone();
        next
    }

    async fn merge_and_select(&self, record: &ProvisionedProject) {
        let now = self.clock.now();
        self.ctx.catalog.lock().await.merge_optimistic(
            ClientBucket::optimistic(record.client.clone(), now),
            ProjectEntry::optimistic(record.project.clone(), record.flight, now),
        );
        let pair = record.pair();
        let flight = Some(record.flight);
        let snapshot = self
            .ctx
            .change_selection(|s| Ok::<_, ConsoleError>(s.replace(pair, flight, now)))
            .await;
        if let Ok(snapshot) = snapshot {
            info!(generation = snapshot.generation, "switched to provisioned project");
        }
        let outcome = self.reconciler.reconcile().await;
        debug!(?outcome, "provisioned project reconciled");
    }

    /// Resets to idle after the close delay, unless the state moved on.
    async fn schedule_close(&self) {
        let expected = self.state().await;
        let ctx = self.ctx.clone();
        let delay = self.close_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = ctx.provisioning.lock().await;
            if *state == expected {
                let (next, _) = ProvisioningStateMachine::transition(
                    state.clone(),
                    ProvisioningEvent::CloseDelayElapsed,
                );
                *state = next;
            }
        });
    }
}
