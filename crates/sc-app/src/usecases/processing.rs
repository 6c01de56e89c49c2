//! Data processing: trigger, status refresh and the status poller.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use sc_core::operation::OperationId;
use sc_core::processing::{ProcessingTrigger, ProcessingType};
use sc_core::{ConsoleError, ProcessingStatus, SelectionSnapshot, ValidationFailure};

use crate::api::ContestApi;
use crate::context::ConsoleContext;
use crate::usecases::poller::{JobPoller, PollEvent, PollOutcome, PollPolicy};

pub type ProcessingPollOutcome = PollOutcome<Option<ProcessingStatus>, ConsoleError>;

pub struct ProcessingMonitor {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
    interval: Duration,
}

impl ProcessingMonitor {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>, interval: Duration) -> Self {
        Self { api, ctx, interval }
    }

    pub async fn trigger(&self, kind: ProcessingType) -> Result<ProcessingTrigger, ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let span = info_span!("usecase.processing.trigger", pair = %pair, kind = kind.as_str());
        self.ctx
            .track(OperationId::TriggerProcessing, async {
                let trigger = self.api.trigger_processing(&pair, kind).await?;
                info!(download_url = ?trigger.download_url, "processing triggered");
                if let Some(_selection) = self.ctx.guard_current(&snapshot).await {
                    self.ctx.processing.lock().await.last_trigger = Some(trigger.clone());
                }
                Ok(trigger)
            })
            .instrument(span)
            .await
    }

    /// Fetches the current status once and stores it.
    pub async fn refresh_status(&self) -> Result<Option<ProcessingStatus>, ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let status = self.api.processing_status(&pair).await?;
        if !commit_status(&self.ctx, &snapshot, status.clone()).await {
            return Err(ConsoleError::Stale);
        }
        Ok(status)
    }

    /// Starts the status poller for the current selection.
    ///
    /// The poller has no attempt cap and is cancelled by the next selection
    /// change. Each tick is stored only while the selection is unchanged.
    pub async fn watch(&self) -> Result<JoinHandle<ProcessingPollOutcome>, ConsoleError> {
        let (snapshot, scope) = self.ctx.snapshot_with_scope().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let api = self.api.clone();
        let ctx = self.ctx.clone();
        let span = info_span!("usecase.processing.watch", pair = %pair);
        let (poll_task, mut events) = JobPoller::new(PollPolicy::unbounded(self.interval), scope)
            .spawn(
                move || {
                    let api = api.clone();
                    let pair = pair.clone();
                    async move { api.processing_status(&pair).await }
                },
                |status: &Option<ProcessingStatus>| {
                    status.as_ref().is_some_and(|s| s.state.is_terminal())
                },
            );
        ctx.operations.lock().await.start(OperationId::PollProcessing);

        let handle = tokio::spawn(
            async move {
                let mut finished = None;
                while let Some(event) = events.recv().await {
                    match event {
                        PollEvent::Tick {
                            attempt,
                            value: status,
                        } => {
                            info!(attempt, state = ?status.as_ref().map(|s| s.state), "processing status");
                            commit_status(&ctx, &snapshot, status).await;
                        }
                        PollEvent::Finished(outcome) => {
                            finished = Some(outcome);
                            break;
                        }
                    }
                }
                let outcome = match finished {
                    Some(outcome) => outcome,
                    None => {
                        if let Err(err) = poll_task.await {
                            warn!(error = %err, "processing status poller aborted");
                        }
                        PollOutcome::Cancelled
                    }
                };

                let mut ops = ctx.operations.lock().await;
                match &outcome {
                    PollOutcome::Done(_) => ops.finish(OperationId::PollProcessing),
                    PollOutcome::Cancelled => ops.reset(OperationId::PollProcessing),
                    PollOutcome::Failed(err) => {
                        warn!(error = %err, "processing status poll failed");
                        ops.fail(OperationId::PollProcessing, err.to_string());
                    }
                    PollOutcome::TimedOut { attempts } => ops.fail(
                        OperationId::PollProcessing,
                        format!("gave up after {attempts} attempts"),
                    ),
                }
                drop(ops);
                outcome
            }
            .instrument(span),
        );
        Ok(handle)
    }
}

/// Stores `status` if `snapshot` is still the live selection.
pub(crate) async fn commit_status(
    ctx: &ConsoleContext,
    snapshot: &SelectionSnapshot,
    status: Option<ProcessingStatus>,
) -> bool {
    let Some(_selection) = ctx.guard_current(snapshot).await else {
        return false;
    };
    ctx.processing.lock().await.status = status;
    true
}
