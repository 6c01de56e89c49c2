use std::sync::Arc;

use tracing::info;

use sc_core::analytics::{HealthStatus, ScanAnalytics};
use sc_core::operation::OperationId;
use sc_core::{ConsoleError, ValidationFailure};

use crate::api::ContestApi;
use crate::context::ConsoleContext;

/// Scan analytics for the selected project and the system health probe.
pub struct AnalyticsService {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
}

impl AnalyticsService {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>) -> Self {
        Self { api, ctx }
    }

    pub async fn health(&self) -> Result<HealthStatus, ConsoleError> {
        self.ctx
            .track(OperationId::HealthCheck, self.api.health())
            .await
    }

    pub async fn load(&self) -> Result<Option<ScanAnalytics>, ConsoleError> {
        self.fetch(false).await
    }

    /// Asks the backend to recompute analytics, then stores the result.
    pub async fn refresh(&self) -> Result<Option<ScanAnalytics>, ConsoleError> {
        self.fetch(true).await
    }

    async fn fetch(&self, force: bool) -> Result<Option<ScanAnalytics>, ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;
        let operation = if force {
            OperationId::RefreshAnalytics
        } else {
            OperationId::LoadAnalytics
        };

        self.ctx
            .track(operation, async {
                let analytics = if force {
                    Some(self.api.refresh_analytics(&pair).await?)
                } else {
                    self.api.analytics(&pair).await?
                };
                info!(pair = %pair, force, found = analytics.is_some(), "analytics loaded");
                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                self.ctx.project_data.lock().await.analytics = analytics.clone();
                Ok(analytics)
            })
            .await
    }
}
