//! Client/project selection changes.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{info, warn};

use sc_core::catalog::ProjectEntry;
use sc_core::ports::ClockPort;
use sc_core::{ClientId, ConsoleError, ProjectId, SelectionSnapshot};

use crate::context::ConsoleContext;
use crate::usecases::catalog::CatalogService;
use crate::usecases::rules::{ReconcileOutcome, RulesReconciler};

pub struct SelectionService {
    ctx: Arc<ConsoleContext>,
    catalog: Arc<CatalogService>,
    reconciler: Arc<RulesReconciler>,
    clock: Arc<dyn ClockPort>,
}

impl SelectionService {
    pub fn new(
        ctx: Arc<ConsoleContext>,
        catalog: Arc<CatalogService>,
        reconciler: Arc<RulesReconciler>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            ctx,
            catalog,
            reconciler,
            clock,
        }
    }

    /// Selects a client and loads its projects.
    ///
    /// A failed project listing degrades to an empty list.
    pub async fn select_client(&self, client: ClientId) -> Result<Vec<ProjectEntry>, ConsoleError> {
        let snapshot = self
            .ctx
            .change_selection(|s| Ok::<_, ConsoleError>(s.select_client(client.clone())))
            .await?;
        info!(client = %client, generation = snapshot.generation, "client selected");

        match self.catalog.load_projects(&client).await {
            Ok(projects) => Ok(projects),
            Err(ConsoleError::Stale) => Err(ConsoleError::Stale),
            Err(err) => {
                warn!(client = %client, error = %err, "project list unavailable");
                self.catalog.apply_projects(&client, Vec::new()).await
            }
        }
    }

    /// Selects a project under the current client and reconciles its rules.
    pub async fn select_project(&self, project: ProjectId) -> Result<ReconcileOutcome, ConsoleError> {
        let flight = self
            .ctx
            .catalog
            .lock()
            .await
            .find_project(&project)
            .and_then(ProjectEntry::flight);
        let now = self.clock.now();
        let snapshot = self
            .ctx
            .change_selection(|s| s.select_project(project.clone(), flight, now))
            .await?;
        info!(
            project = %project,
            generation = snapshot.generation,
            flight = ?snapshot.flight,
            "project selected"
        );
        Ok(self.reconciler.reconcile().await)
    }

    pub async fn clear(&self) -> SelectionSnapshot {
        match self
            .ctx
            .change_selection(|s| Ok::<_, Infallible>(s.clear()))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(never) => match never {},
        }
    }
}
