use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use sc_core::operation::OperationId;
use sc_core::winners::can_select_winners;
use sc_core::{ConsoleError, ValidationFailure};

use crate::api::ContestApi;
use crate::context::ConsoleContext;
use crate::usecases::project_data::{ProjectDataLoader, ProjectDataReload};

/// Winner Selection Gate.
///
/// Selection is only issued when processing completed with at least one
/// eligible contestant; afterwards the project data is reloaded from the
/// backend instead of patched locally.
pub struct WinnerSelection {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
    loader: Arc<ProjectDataLoader>,
}

impl WinnerSelection {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>, loader: Arc<ProjectDataLoader>) -> Self {
        Self { api, ctx, loader }
    }

    pub async fn can_select(&self) -> bool {
        let selection = self.ctx.selection.lock().await;
        let processing = self.ctx.processing.lock().await;
        can_select_winners(
            selection.context.has_full_selection(),
            processing.status.as_ref(),
        )
    }

    pub async fn select(&self, count: u32) -> Result<ProjectDataReload, ConsoleError> {
        if count == 0 {
            return Err(ValidationFailure::InvalidWinnerCount.into());
        }
        if !self.can_select().await {
            return Err(ValidationFailure::WinnerGateClosed.into());
        }
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let span = info_span!("usecase.winners.select", pair = %pair, count);
        self.ctx
            .track(OperationId::SelectWinners, async {
                self.api.select_winners(&pair, count).await?;
                info!("winner selection accepted");
                Ok(())
            })
            .instrument(span)
            .await?;

        self.loader.reload_all().await
    }
}
