use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use sc_core::operation::OperationId;
use sc_core::rules::DraftOrigin;
use sc_core::{ConsoleError, ContestRulesDraft, RulesMode, ValidationFailure};

use super::{ReconcileOutcome, RulesReconciler};
use crate::api::ContestApi;
use crate::context::ConsoleContext;

/// Edits, submits and deletes contest rules for the selected project.
pub struct RulesEditor {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
    reconciler: Arc<RulesReconciler>,
}

impl RulesEditor {
    pub fn new(
        api: Arc<ContestApi>,
        ctx: Arc<ConsoleContext>,
        reconciler: Arc<RulesReconciler>,
    ) -> Self {
        Self {
            api,
            ctx,
            reconciler,
        }
    }

    pub async fn mode(&self) -> RulesMode {
        self.ctx.rules.lock().await.clone()
    }

    /// Replaces the draft with `change(draft)`. Only valid while editing.
    pub async fn edit(
        &self,
        change: impl FnOnce(&ContestRulesDraft) -> ContestRulesDraft,
    ) -> Result<ContestRulesDraft, ConsoleError> {
        let mut rules = self.ctx.rules.lock().await;
        match &mut *rules {
            RulesMode::Editing { draft, .. } => {
                *draft = change(draft);
                Ok(draft.clone())
            }
            _ => Err(ValidationFailure::NotEditing.into()),
        }
    }

    /// Re-opens saved rules for editing.
    pub async fn begin_edit(&self) -> Result<ContestRulesDraft, ConsoleError> {
        let mut mode = self.ctx.rules.lock().await;
        let (pair, saved) = match &*mode {
            RulesMode::Saved { pair, rules } => (pair.clone(), rules.clone()),
            RulesMode::Editing { draft, .. } => return Ok(draft.clone()),
            RulesMode::Unselected => return Err(ValidationFailure::NoProjectSelected.into()),
            RulesMode::Reconciling { .. } => return Err(ValidationFailure::NotEditing.into()),
        };
        *mode = RulesMode::Editing {
            pair,
            draft: saved.clone(),
            origin: DraftOrigin::SavedRules,
            warning: None,
        };
        Ok(saved)
    }

    /// Drops local edits by asking the backend again.
    pub async fn discard_edits(&self) -> ReconcileOutcome {
        self.reconciler.reconcile().await
    }

    /// Validates and saves the draft.
    ///
    /// Creation is attempted first; when the backend reports the rules
    /// already exist the same payload is sent as an update. On failure the
    /// draft stays in edit mode untouched.
    pub async fn submit(&self) -> Result<ContestRulesDraft, ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let span = info_span!("usecase.rules.submit", pair = %pair);
        self.ctx
            .track(OperationId::SaveRules, async {
                let draft = match &*self.ctx.rules.lock().await {
                    RulesMode::Editing {
                        pair: editing,
                        draft,
                        ..
                    } if *editing == pair => draft.clone(),
                    _ => return Err(ValidationFailure::NotEditing.into()),
                };
                draft.validate()?;

                let payload = draft.to_submission(snapshot.flight);
                match self.api.create_rules(&pair, &payload).await {
                    Ok(()) => info!("rules created"),
                    Err(ConsoleError::Remote(err)) if err.is_already_exists() => {
                        info!("rules already exist, updating instead");
                        self.api.update_rules(&pair, &payload).await?;
                    }
                    Err(err) => return Err(err),
                }

                let saved = ContestRulesDraft::from(payload);
                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                *self.ctx.rules.lock().await = RulesMode::Saved {
                    pair: pair.clone(),
                    rules: saved.clone(),
                };
                Ok(saved)
            })
            .instrument(span)
            .await
    }

    /// Deletes the saved rules and returns to editing a fresh template.
    pub async fn delete(&self) -> Result<(), ConsoleError> {
        let snapshot = self.ctx.snapshot().await;
        let pair = snapshot
            .pair
            .clone()
            .ok_or(ValidationFailure::NoProjectSelected)?;

        let span = info_span!("usecase.rules.delete", pair = %pair);
        self.ctx
            .track(OperationId::DeleteRules, async {
                self.api.delete_rules(&pair).await?;
                info!("rules deleted");
                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                *self.ctx.rules.lock().await = RulesMode::Editing {
                    pair: pair.clone(),
                    draft: ContestRulesDraft::default_template(snapshot.flight),
                    origin: DraftOrigin::Template,
                    warning: None,
                };
                Ok(())
            })
            .instrument(span)
            .await
    }
}
