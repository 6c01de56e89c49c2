use std::future::Future;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sc_core::analytics::{ScanAnalytics, ValidatedFile};
use sc_core::catalog::Catalog;
use sc_core::operation::{OperationId, OperationStatusMap};
use sc_core::processing::ProcessingTrigger;
use sc_core::provisioning::ProvisioningState;
use sc_core::receipts::ReceiptUploadState;
use sc_core::winners::WinnerRecord;
use sc_core::{ConsoleError, ProcessingStatus, RulesMode, SelectionContext, SelectionSnapshot};

/// Selection plus the cancellation scope of everything started for it.
#[derive(Debug)]
pub struct SelectionSlice {
    pub context: SelectionContext,
    /// Cancelled whenever the selection changes.
    pub scope: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingSlice {
    pub status: Option<ProcessingStatus>,
    pub last_trigger: Option<ProcessingTrigger>,
}

/// Per-project caches invalidated on every selection change.
#[derive(Debug, Clone, Default)]
pub struct ProjectData {
    pub winners: Vec<WinnerRecord>,
    pub validated_files: Vec<ValidatedFile>,
    pub analytics: Option<ScanAnalytics>,
}

#[derive(Debug, Clone, Default)]
pub struct ReceiptSlice {
    pub upload: ReceiptUploadState,
}

/// Session state, partitioned into independently locked slices.
///
/// ## Lock Ordering
/// `selection` first, then any one of the dependent slices. `operations` is
/// only ever taken on its own. No guard is held across a remote call.
///
/// 会话状态，按切片分别加锁
#[derive(Debug)]
pub struct ConsoleContext {
    pub selection: Mutex<SelectionSlice>,
    pub catalog: Mutex<Catalog>,
    pub rules: Mutex<RulesMode>,
    pub processing: Mutex<ProcessingSlice>,
    pub project_data: Mutex<ProjectData>,
    pub receipts: Mutex<ReceiptSlice>,
    pub provisioning: Mutex<ProvisioningState>,
    pub operations: Mutex<OperationStatusMap>,
}

impl Default for ConsoleContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleContext {
    pub fn new() -> Self {
        Self {
            selection: Mutex::new(SelectionSlice {
                context: SelectionContext::new(),
                scope: CancellationToken::new(),
            }),
            catalog: Mutex::new(Catalog::new()),
            rules: Mutex::new(RulesMode::Unselected),
            processing: Mutex::new(ProcessingSlice::default()),
            project_data: Mutex::new(ProjectData::default()),
            receipts: Mutex::new(ReceiptSlice::default()),
            provisioning: Mutex::new(ProvisioningState::Idle),
            operations: Mutex::new(OperationStatusMap::new()),
        }
    }

    pub async fn snapshot(&self) -> SelectionSnapshot {
        self.selection.lock().await.context.snapshot()
    }

    /// Snapshot together with a child token of the current selection scope.
    pub async fn snapshot_with_scope(&self) -> (SelectionSnapshot, CancellationToken) {
        let guard = self.selection.lock().await;
        (guard.context.snapshot(), guard.scope.child_token())
    }

    /// Returns the selection guard only while `snapshot` is still live.
    ///
    /// Callers write dependent slices while holding the returned guard, so a
    /// concurrent selection change cannot interleave with the write.
    pub async fn guard_current(
        &self,
        snapshot: &SelectionSnapshot,
    ) -> Option<MutexGuard<'_, SelectionSlice>> {
        let guard = self.selection.lock().await;
        if guard.context.is_current(snapshot) {
            Some(guard)
        } else {
            debug!(
                captured = snapshot.generation,
                live = guard.context.generation(),
                "dropping result for a previous selection"
            );
            None
        }
    }

    /// Applies a selection change atomically.
    ///
    /// On success the previous scope is cancelled, a new one installed and
    /// every dependent slice reset before the selection guard is released.
    pub async fn change_selection<E>(
        &self,
        change: impl FnOnce(&mut SelectionContext) -> Result<SelectionSnapshot, E>,
    ) -> Result<SelectionSnapshot, E> {
        let mut guard = self.selection.lock().await;
        let snapshot = change(&mut guard.context)?;
        guard.scope.cancel();
        guard.scope = CancellationToken::new();

        *self.rules.lock().await = match snapshot.pair.clone() {
            Some(pair) => RulesMode::Reconciling { pair },
            None => RulesMode::Unselected,
        };
        *self.processing.lock().await = ProcessingSlice::default();
        *self.project_data.lock().await = ProjectData::default();
        *self.receipts.lock().await = ReceiptSlice::default();
        drop(guard);
        Ok(snapshot)
    }

    /// Records the lifecycle of `operation` in the status map.
    pub async fn track<T, F>(&self, operation: OperationId, work: F) -> Result<T, ConsoleError>
    where
        F: Future<Output = Result<T, ConsoleError>>,
    {
        self.operations.lock().await.start(operation);
        let result = work.await;
        let mut ops = self.operations.lock().await;
        match &result {
            Ok(_) => ops.finish(operation),
            Err(ConsoleError::Stale | ConsoleError::Cancelled) => ops.reset(operation),
            Err(err) => ops.fail(operation, err.to_string()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::operation::OperationState;
    use sc_core::ValidationFailure;

    #[tokio::test]
    async fn change_selection_cancels_previous_scope() {
        let ctx = ConsoleContext::new();
        ctx.change_selection(|s| Ok::<_, ValidationFailure>(s.select_client("acme".into())))
            .await
            .unwrap();
        let (before, token) = ctx.snapshot_with_scope().await;

        ctx.change_selection(|s| Ok::<_, ValidationFailure>(s.select_client("globex".into())))
            .await
            .unwrap();

        assert!(token.is_cancelled());
        assert!(ctx.guard_current(&before).await.is_none());
    }

    #[tokio::test]
    async fn failed_change_keeps_scope_alive() {
        let ctx = ConsoleContext::new();
        let (_, token) = ctx.snapshot_with_scope().await;
        let result = ctx
            .change_selection(|s| s.select_project("0007".into(), None, chrono::Utc::now()))
            .await;
        assert_eq!(result, Err(ValidationFailure::NoClientSelected));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn track_records_failure_and_ignores_stale() {
        let ctx = ConsoleContext::new();
        let _ = ctx
            .track(OperationId::SaveRules, async {
                Err::<(), _>(ConsoleError::Validation(ValidationFailure::NotEditing))
            })
            .await;
        let _ = ctx
            .track(OperationId::ReconcileRules, async {
                Err::<(), _>(ConsoleError::Stale)
            })
            .await;

        let ops = ctx.operations.lock().await;
        assert!(matches!(
            ops.get(OperationId::SaveRules),
            OperationState::Failed(_)
        ));
        assert_eq!(ops.get(OperationId::ReconcileRules), OperationState::Idle);
    }
}
