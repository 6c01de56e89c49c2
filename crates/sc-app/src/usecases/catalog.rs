use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use sc_core::catalog::{ClientBucket, ProjectEntry};
use sc_core::operation::OperationId;
use sc_core::{ClientId, ConsoleError};

use crate::api::ContestApi;
use crate::context::ConsoleContext;

/// Loads the client and project lists into the catalog slice.
pub struct CatalogService {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
}

impl CatalogService {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>) -> Self {
        Self { api, ctx }
    }

    pub async fn load_clients(&self) -> Result<Vec<ClientBucket>, ConsoleError> {
        let span = info_span!("usecase.catalog.load_clients");
        self.ctx
            .track(OperationId::LoadClients, async {
                let remote = self.api.list_clients().await?;
                info!(count = remote.len(), "client list loaded");
                let mut catalog = self.ctx.catalog.lock().await;
                catalog.apply_client_refresh(remote);
                Ok(catalog.clients().to_vec())
            })
            .instrument(span)
            .await
    }

    /// Loads the projects of `client`. The result is only applied while
    /// `client` is still the selected client.
    pub async fn load_projects(&self, client: &ClientId) -> Result<Vec<ProjectEntry>, ConsoleError> {
        let span = info_span!("usecase.catalog.load_projects", client = %client);
        self.ctx
            .track(OperationId::LoadProjects, async {
                let remote = self.api.list_projects(client).await?;
                info!(count = remote.len(), "project list loaded");
                self.apply_projects(client, remote).await
            })
            .instrument(span)
            .await
    }

    /// Applies a (possibly empty) project list for the selected client.
    pub(crate) async fn apply_projects(
        &self,
        client: &ClientId,
        remote: Vec<ProjectEntry>,
    ) -> Result<Vec<ProjectEntry>, ConsoleError> {
        let selection = self.ctx.selection.lock().await;
        if selection.context.client() != Some(client) {
            return Err(ConsoleError::Stale);
        }
        let mut catalog = self.ctx.catalog.lock().await;
        catalog.apply_project_refresh(client, remote);
        Ok(catalog.projects().to_vec())
    }
}
