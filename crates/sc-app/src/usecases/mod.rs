//! Contest workflow use cases
//!
//! Selection change
//!         ↓
//! RulesReconciler  → saved display | RulesEditor
//!         ↓
//! ProcessingMonitor (JobPoller) → WinnerSelection → ProjectDataLoader
//!
//! ReceiptCoordinator and ProvisioningSequencer run independently once a
//! project is selected.

pub mod analytics;
pub mod catalog;
pub mod poller;
pub mod processing;
pub mod project_data;
pub mod provisioning;
pub mod receipts;
pub mod rules;
pub mod selection;
pub mod winners;

pub use analytics::AnalyticsService;
pub use catalog::CatalogService;
pub use poller::{JobPoller, PollEvent, PollOutcome, PollPolicy};
pub use processing::ProcessingMonitor;
pub use project_data::{ProjectDataLoader, ProjectDataReload};
pub use provisioning::ProvisioningSequencer;
pub use receipts::ReceiptCoordinator;
pub use rules::{ReconcileOutcome, RulesEditor, RulesReconciler};
pub use selection::SelectionService;
pub use winners::WinnerSelection;
