//! Console facade.
//!
//! Owns the session state and exposes every workflow operation. Front ends
//! (the command line, tests) talk to this type only.

use std::sync::Arc;

use tokio::task::JoinHandle;

use sc_core::analytics::{HealthStatus, ScanAnalytics, ValidatedFile};
use sc_core::catalog::{ClientBucket, ProjectEntry};
use sc_core::operation::OperationStatusMap;
use sc_core::ports::{ClockPort, GatewayPort, UploadPort};
use sc_core::processing::{ProcessingTrigger, ProcessingType};
use sc_core::provisioning::{ProvisionedProject, ProvisioningRequest, ProvisioningState};
use sc_core::receipts::{ReceiptBatchSummary, ReceiptUploadState};
use sc_core::winners::{WinnerRecord, WinnersExport};
use sc_core::{
    ClientId, ConsoleConfig, ConsoleError, ContestRulesDraft, ProcessingStatus, ProjectId,
    RulesMode, SelectionSnapshot,
};

use crate::api::{ContestApi, UploadChannel};
use crate::context::ConsoleContext;
use crate::usecases::processing::ProcessingPollOutcome;
use crate::usecases::{
    AnalyticsService, CatalogService, ProcessingMonitor, ProjectDataLoader, ProjectDataReload,
    ProvisioningSequencer, ReceiptCoordinator, ReconcileOutcome, RulesEditor, RulesReconciler,
    SelectionService, WinnerSelection,
};

/// Contest Workflow Orchestrator facade.
///
/// 比赛工作流编排器门面
pub struct ContestConsole {
    config: ConsoleConfig,
    ctx: Arc<ConsoleContext>,
    catalog: Arc<CatalogService>,
    selection: SelectionService,
    reconciler: Arc<RulesReconciler>,
    rules: RulesEditor,
    processing: ProcessingMonitor,
    project_data: Arc<ProjectDataLoader>,
    winners: WinnerSelection,
    receipts: ReceiptCoordinator,
    provisioning: ProvisioningSequencer,
    analytics: AnalyticsService,
}

impl ContestConsole {
    pub fn new(
        config: ConsoleConfig,
        gateway: Arc<dyn GatewayPort>,
        uploader: Arc<dyn UploadPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let ctx = Arc::new(ConsoleContext::new());
        let api = Arc::new(ContestApi::new(gateway));

        let catalog = Arc::new(CatalogService::new(api.clone(), ctx.clone()));
        let reconciler = Arc::new(RulesReconciler::new(api.clone(), ctx.clone()));
        let project_data = Arc::new(ProjectDataLoader::new(api.clone(), ctx.clone()));

        Self {
            selection: SelectionService::new(
                ctx.clone(),
                catalog.clone(),
                reconciler.clone(),
                clock.clone(),
            ),
            rules: RulesEditor::new(api.clone(), ctx.clone(), reconciler.clone()),
            processing: ProcessingMonitor::new(
                api.clone(),
                ctx.clone(),
                config.polling.processing_interval,
            ),
            winners: WinnerSelection::new(api.clone(), ctx.clone(), project_data.clone()),
            receipts: ReceiptCoordinator::new(
                api.clone(),
                uploader,
                clock.clone(),
                ctx.clone(),
                config.polling,
            ),
            provisioning: ProvisioningSequencer::new(
                api.clone(),
                ctx.clone(),
                reconciler.clone(),
                clock,
                config.polling.provisioning_close_delay,
            ),
            analytics: AnalyticsService::new(api, ctx.clone()),
            config,
            ctx,
            catalog,
            reconciler,
            project_data,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    // ---- catalog & selection ----

    pub async fn load_clients(&self) -> Result<Vec<ClientBucket>, ConsoleError> {
        self.catalog.load_clients().await
    }

    pub async fn select_client(&self, client: ClientId) -> Result<Vec<ProjectEntry>, ConsoleError> {
        self.selection.select_client(client).await
    }

    pub async fn select_project(&self, project: ProjectId) -> Result<ReconcileOutcome, ConsoleError> {
        self.selection.select_project(project).await
    }

    pub async fn clear_selection(&self) -> SelectionSnapshot {
        self.selection.clear().await
    }

    pub async fn selection(&self) -> SelectionSnapshot {
        self.ctx.snapshot().await
    }

    pub async fn clients(&self) -> Vec<ClientBucket> {
        self.ctx.catalog.lock().await.clients().to_vec()
    }

    pub async fn projects(&self) -> Vec<ProjectEntry> {
        self.ctx.catalog.lock().await.projects().to_vec()
    }

    // ---- rules ----

    pub async fn reconcile_rules(&self) -> ReconcileOutcome {
        self.reconciler.reconcile().await
    }

    pub async fn rules_mode(&self) -> RulesMode {
        self.rules.mode().await
    }

    pub async fn edit_rules(
        &self,
        change: impl FnOnce(&ContestRulesDraft) -> ContestRulesDraft,
    ) -> Result<ContestRulesDraft, ConsoleError> {
        self.rules.edit(change).await
    }

    pub async fn begin_edit(&self) -> Result<ContestRulesDraft, ConsoleError> {
        self.rules.begin_edit().await
    }

    pub async fn discard_edits(&self) -> ReconcileOutcome {
        self.rules.discard_edits().await
    }

    pub async fn submit_rules(&self) -> Result<ContestRulesDraft, ConsoleError> {
        self.rules.submit().await
    }

    pub async fn delete_rules(&self) -> Result<(), ConsoleError> {
        self.rules.delete().await
    }

    // ---- processing ----

    pub async fn trigger_processing(
        &self,
        kind: ProcessingType,
    ) -> Result<ProcessingTrigger, ConsoleError> {
        self.processing.trigger(kind).await
    }

    pub async fn refresh_status(&self) -> Result<Option<ProcessingStatus>, ConsoleError> {
        self.processing.refresh_status().await
    }

    pub async fn watch_processing(&self) -> Result<JoinHandle<ProcessingPollOutcome>, ConsoleError> {
        self.processing.watch().await
    }

    pub async fn processing_status(&self) -> Option<ProcessingStatus> {
        self.ctx.processing.lock().await.status.clone()
    }

    // ---- winners & project data ----

    pub async fn can_select_winners(&self) -> bool {
        self.winners.can_select().await
    }

    pub async fn select_winners(&self, count: u32) -> Result<ProjectDataReload, ConsoleError> {
        self.winners.select(count).await
    }

    pub async fn load_winners(&self) -> Result<Vec<WinnerRecord>, ConsoleError> {
        self.project_data.load_winners().await
    }

    pub async fn export_winners(&self) -> Result<WinnersExport, ConsoleError> {
        self.project_data.export_winners().await
    }

    pub async fn load_validated_files(&self) -> Result<Vec<ValidatedFile>, ConsoleError> {
        self.project_data.load_validated_files().await
    }

    pub async fn reload_project_data(&self) -> Result<ProjectDataReload, ConsoleError> {
        self.project_data.reload_all().await
    }

    pub async fn winners(&self) -> Vec<WinnerRecord> {
        self.ctx.project_data.lock().await.winners.clone()
    }

    // ---- receipts ----

    pub async fn receipt_keyword(&self) -> Option<String> {
        self.receipts.keyword().await
    }

    pub async fn save_receipt_keyword(&self, keyword: &str) -> Result<String, ConsoleError> {
        self.receipts.save_keyword(keyword).await
    }

    pub async fn upload_receipts(
        &self,
        channel: UploadChannel,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ReceiptBatchSummary, ConsoleError> {
        self.receipts.upload(channel, file_name, bytes).await
    }

    pub async fn receipt_upload_state(&self) -> ReceiptUploadState {
        self.receipts.upload_state().await
    }

    // ---- provisioning ----

    pub async fn provision(
        &self,
        request: ProvisioningRequest,
    ) -> Result<ProvisionedProject, ConsoleError> {
        self.provisioning.submit(request).await
    }

    pub async fn dismiss_provisioning(&self) -> ProvisioningState {
        self.provisioning.dismiss().await
    }

    pub async fn provisioning_state(&self) -> ProvisioningState {
        self.provisioning.state().await
    }

    // ---- analytics & health ----

    pub async fn health(&self) -> Result<HealthStatus, ConsoleError> {
        self.analytics.health().await
    }

    pub async fn analytics(&self) -> Result<Option<ScanAnalytics>, ConsoleError> {
        self.analytics.load().await
    }

    pub async fn refresh_analytics(&self) -> Result<Option<ScanAnalytics>, ConsoleError> {
        self.analytics.refresh().await
    }

    pub async fn operations(&self) -> OperationStatusMap {
        self.ctx.operations.lock().await.clone()
    }
}
