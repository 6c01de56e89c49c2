//! Rules workflow: reconciliation against the backend and draft editing.

mod editor;
mod reconciler;

pub use editor::RulesEditor;
pub use reconciler::{ReconcileOutcome, RulesReconciler};
