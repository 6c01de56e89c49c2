//! Per-project data: processing status, winners and validated files.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use sc_core::analytics::ValidatedFile;
use sc_core::operation::OperationId;
use sc_core::winners::{WinnerRecord, WinnersExport};
use sc_core::{ConsoleError, ProcessingStatus, ProjectPair, SelectionSnapshot, ValidationFailure};

use crate::api::ContestApi;
use crate::context::ConsoleContext;
use crate::usecases::processing::commit_status;

/// What a full reload brought back. Failed parts are `None`.
#[derive(Debug, Clone, Default)]
pub struct ProjectDataReload {
    pub status: Option<Option<ProcessingStatus>>,
    pub winners: Option<Vec<WinnerRecord>>,
    pub validated_files: Option<Vec<ValidatedFile>>,
}

pub struct ProjectDataLoader {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
}

impl ProjectDataLoader {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>) -> Self {
        Self { api, ctx }
    }

    async fn selected(&self) -> Result<(SelectionSnapshot, ProjectPair), ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;
        Ok((snapshot, pair))
    }

    pub async fn load_winners(&self) -> Result<Vec<WinnerRecord>, ConsoleError> {
        let (snapshot, pair) = self.selected().await?;
        self.ctx
            .track(OperationId::LoadWinners, async {
                let winners = self.api.winners(&pair).await?;
                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                self.ctx.project_data.lock().await.winners = winners.clone();
                Ok(winners)
            })
            .await
    }

    pub async fn load_validated_files(&self) -> Result<Vec<ValidatedFile>, ConsoleError> {
        let (snapshot, pair) = self.selected().await?;
        self.ctx
            .track(OperationId::LoadValidatedFiles, async {
                let files = self.api.validated_files(&pair).await?;
                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                self.ctx.project_data.lock().await.validated_files = files.clone();
                Ok(files)
            })
            .await
    }

    pub async fn export_winners(&self) -> Result<WinnersExport, ConsoleError> {
        let (_, pair) = self.selected().await?;
        self.ctx
            .track(OperationId::ExportWinners, self.api.export_winners(&pair))
            .await
    }

    /// Reloads status, winners and validated files concurrently.
    ///
    /// Each part is stored independently; one failing part does not discard
    /// the others.
    pub async fn reload_all(&self) -> Result<ProjectDataReload, ConsoleError> {
        let (snapshot, pair) = self.selected().await?;
        let span = info_span!("usecase.project_data.reload", pair = %pair);

        async {
            let (status, winners, files) = futures::join!(
                self.api.processing_status(&pair),
                self.load_winners(),
                self.load_validated_files(),
            );

            let status = match status {
                Ok(status) => {
                    if !commit_status(&self.ctx, &snapshot, status.clone()).await {
                        return Err(ConsoleError::Stale);
                    }
                    Some(status)
                }
                Err(err) => {
                    warn!(error = %err, "status reload failed");
                    None
                }
            };
            let winners = winners
                .map_err(|err| warn!(error = %err, "winner reload failed"))
                .ok();
            let validated_files = files
                .map_err(|err| warn!(error = %err, "validated file reload failed"))
                .ok();
            info!(
                winners = winners.as_ref().map(Vec::len),
                files = validated_files.as_ref().map(Vec::len),
                "project data reloaded"
            );

            Ok(ProjectDataReload {
                status,
                winners,
                validated_files,
            })
        }
        .instrument(span)
        .await
    }
}
