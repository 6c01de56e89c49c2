//! Receipt keyword and receipt batch upload.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use sc_core::config::PollingConfig;
use sc_core::operation::OperationId;
use sc_core::ports::{ClockPort, UploadPort};
use sc_core::receipts::{
    validate_archive_name, ReceiptBatchSummary, ReceiptUploadAction, ReceiptUploadEvent,
    ReceiptUploadState, ReceiptUploadStateMachine,
};
use sc_core::{ConsoleError, RulesMode, SelectionSnapshot, ValidationFailure};

use crate::api::{ContestApi, UploadChannel};
use crate::context::ConsoleContext;
use crate::usecases::poller::{JobPoller, PollOutcome, PollPolicy};

/// Receipt Keyword/Upload Coordinator.
pub struct ReceiptCoordinator {
    api: Arc<ContestApi>,
    uploader: Arc<dyn UploadPort>,
    clock: Arc<dyn ClockPort>,
    ctx: Arc<ConsoleContext>,
    polling: PollingConfig,
}

impl ReceiptCoordinator {
    pub fn new(
        api: Arc<ContestApi>,
        uploader: Arc<dyn UploadPort>,
        clock: Arc<dyn ClockPort>,
        ctx: Arc<ConsoleContext>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            api,
            uploader,
            clock,
            ctx,
            polling,
        }
    }

    /// Keyword of the rules on display.
    pub async fn keyword(&self) -> Option<String> {
        self.ctx
            .rules
            .lock()
            .await
            .current_rules()
            .and_then(|rules| rules.product_keyword())
            .map(str::to_string)
    }

    pub async fn upload_state(&self) -> ReceiptUploadState {
        self.ctx.receipts.lock().await.upload.clone()
    }

    /// Persists `keyword` into the saved rules.
    ///
    /// The backend copy is read, patched and written back; the live draft is
    /// never submitted. Locally only the keyword field of the displayed rules
    /// changes.
    pub async fn save_keyword(&self, keyword: &str) -> Result<String, ConsoleError> {
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() {
            return Err(ValidationFailure::EmptyKeyword.into());
        }
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let span = info_span!("usecase.receipts.save_keyword", pair = %pair);
        self.ctx
            .track(OperationId::SaveKeyword, async {
                let mut remote = self
                    .api
                    .get_rules(&pair)
                    .await?
                    .ok_or(ValidationFailure::KeywordRequiresRules)?;
                remote.receipt_product_keyword = Some(keyword.clone());
                self.api.update_rules(&pair, &remote).await?;
                info!(keyword = %keyword, "receipt keyword saved");

                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                let mut mode = self.ctx.rules.lock().await;
                match &mut *mode {
                    RulesMode::Saved { rules, .. } => {
                        *rules = rules.with_product_keyword(Some(keyword.clone()));
                    }
                    RulesMode::Editing { draft, .. } => {
                        *draft = draft.with_product_keyword(Some(keyword.clone()));
                    }
                    _ => {}
                }
                Ok(keyword.clone())
            })
            .instrument(span)
            .await
    }

    /// Uploads a receipt archive and waits for its processing summary.
    ///
    /// Non-zip files are rejected before any remote call. The summary present
    /// before the upload is the baseline; the poll waits for a newer one. The
    /// poll is bounded and is cancelled by a selection change.
    pub async fn upload(
        &self,
        channel: UploadChannel,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ReceiptBatchSummary, ConsoleError> {
        let (snapshot, scope) = self.ctx.snapshot_with_scope().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        if self.upload_state().await.is_busy() {
            return Err(ValidationFailure::UploadInProgress.into());
        }
        let chosen = ReceiptUploadEvent::FileChosen {
            file_name: file_name.to_string(),
        };
        if let Err(err) = validate_archive_name(file_name) {
            self.dispatch(&snapshot, chosen).await;
            return Err(err.into());
        }
        match self.dispatch(&snapshot, chosen).await {
            Some(actions) if !actions.is_empty() => {}
            Some(_) => return Err(ValidationFailure::UploadInProgress.into()),
            None => return Err(ConsoleError::Stale),
        }

        let span = info_span!("usecase.receipts.upload", pair = %pair, file = file_name);
        self.ctx
            .track(OperationId::UploadReceipts, async {
                let transfer = async {
                    // Backend timestamps are only compared with each other.
                    let baseline = self
                        .api
                        .receipt_summary(&pair)
                        .await?
                        .map(|s| s.processing_timestamp);
                    debug!(?baseline, "previous receipt summary");
                    let target = self.api.presign(channel, &pair, file_name).await?;
                    debug!(key = ?target.object_key(), "presigned upload target issued");
                    self.uploader
                        .upload(&target, file_name, bytes)
                        .await
                        .map_err(ConsoleError::from)?;
                    Ok::<_, ConsoleError>(baseline)
                };
                let baseline = match transfer.await {
                    Ok(baseline) => baseline,
                    Err(err) => {
                        warn!(error = %err, "receipt upload failed");
                        self.dispatch(
                            &snapshot,
                            ReceiptUploadEvent::UploadFailed {
                                reason: err.to_string(),
                            },
                        )
                        .await;
                        return Err(err);
                    }
                };

                let started_at = self.clock.now();
                info!(%started_at, "receipt archive uploaded, waiting for summary");
                self.dispatch(&snapshot, ReceiptUploadEvent::UploadSucceeded { started_at })
                    .await;

                let poller = JobPoller::new(
                    PollPolicy::bounded(
                        self.polling.receipt_interval,
                        self.polling.receipt_max_attempts,
                    ),
                    scope,
                );
                let outcome = poller
                    .run(
                        || {
                            let api = self.api.clone();
                            let pair = pair.clone();
                            async move {
                                api.receipt_summary(&pair).await.map(|summary| {
                                    summary.filter(|s| {
                                        baseline.map_or(true, |seen| s.processing_timestamp > seen)
                                    })
                                })
                            }
                        },
                        Option::is_some,
                        |attempt, found| async move {
                            debug!(attempt, found = found.is_some(), "receipt summary poll");
                        },
                    )
                    .await;

                match outcome {
                    PollOutcome::Done(Some(summary)) => {
                        info!(
                            total = summary.total_receipts,
                            confirmed = summary.confirmed,
                            rate = %summary.confirmation_rate,
                            "receipt summary ready"
                        );
                        self.dispatch(
                            &snapshot,
                            ReceiptUploadEvent::SummaryFound {
                                summary: summary.clone(),
                            },
                        )
                        .await;
                        Ok(summary)
                    }
                    PollOutcome::TimedOut { attempts } => self.timed_out(&snapshot, attempts).await,
                    PollOutcome::Done(None) => {
                        self.timed_out(&snapshot, self.polling.receipt_max_attempts)
                            .await
                    }
                    PollOutcome::Failed(err) => {
                        warn!(error = %err, "receipt summary poll failed");
                        self.dispatch(
                            &snapshot,
                            ReceiptUploadEvent::PollFailed {
                                reason: err.to_string(),
                            },
                        )
                        .await;
                        Err(err)
                    }
                    PollOutcome::Cancelled => {
                        info!("receipt summary poll cancelled by selection change");
                        self.dispatch(&snapshot, ReceiptUploadEvent::Cancelled).await;
                        Err(ConsoleError::Cancelled)
                    }
                }
            })
            .instrument(span)
            .await
    }

    async fn timed_out(
        &self,
        snapshot: &SelectionSnapshot,
        attempts: u32,
    ) -> Result<ReceiptBatchSummary, ConsoleError> {
        warn!(attempts, "receipt summary did not appear in time");
        self.dispatch(snapshot, ReceiptUploadEvent::PollTimedOut { attempts })
            .await;
        Err(ConsoleError::Timeout {
            operation: OperationId::UploadReceipts,
            attempts,
        })
    }

    /// Applies `event` to the upload state while `snapshot` is live.
    async fn dispatch(
        &self,
        snapshot: &SelectionSnapshot,
        event: ReceiptUploadEvent,
    ) -> Option<Vec<ReceiptUploadAction>> {
        let _selection = self.ctx.guard_current(snapshot).await?;
        let mut receipts = self.ctx.receipts.lock().await;
        let (next, actions) = ReceiptUploadStateMachine::transition(receipts.upload.clone(), event);
        receipts.upload = next;
        Some(actions)
    }
}
