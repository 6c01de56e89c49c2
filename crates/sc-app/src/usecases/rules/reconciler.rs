use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use sc_core::operation::OperationId;
use sc_core::rules::DraftOrigin;
use sc_core::{ConsoleError, ContestRulesDraft, RulesMode};

use crate::api::ContestApi;
use crate::context::ConsoleContext;

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No full selection; nothing to reconcile.
    Unselected,
    /// Saved rules exist and are displayed read-only.
    Saved,
    /// Editing a fresh template. `warning` is set when the lookup failed for
    /// a reason other than "no rules yet".
    Editing { warning: Option<String> },
    /// The selection changed while the lookup was in flight.
    Stale,
}

/// Decides between saved and editing mode for the selected project.
pub struct RulesReconciler {
    api: Arc<ContestApi>,
    ctx: Arc<ConsoleContext>,
}

impl RulesReconciler {
    pub fn new(api: Arc<ContestApi>, ctx: Arc<ConsoleContext>) -> Self {
        Self { api, ctx }
    }

    pub async fn reconcile(&self) -> ReconcileOutcome {
        let snapshot = self.ctx.snapshot().await;
        let Some(pair) = snapshot.pair.clone() else {
            return ReconcileOutcome::Unselected;
        };

        let span = info_span!(
            "usecase.rules.reconcile",
            pair = %pair,
            generation = snapshot.generation
        );
        let result = self
            .ctx
            .track(OperationId::ReconcileRules, async {
                match self.ctx.guard_current(&snapshot).await {
                    Some(_selection) => {
                        *self.ctx.rules.lock().await = RulesMode::Reconciling { pair: pair.clone() };
                    }
                    None => return Err(ConsoleError::Stale),
                }

                let fetched = self.api.get_rules(&pair).await;

                let Some(_selection) = self.ctx.guard_current(&snapshot).await else {
                    return Err(ConsoleError::Stale);
                };
                let (mode, outcome) = match fetched {
                    Ok(Some(payload)) => {
                        info!("saved rules found");
                        (
                            RulesMode::Saved {
                                pair: pair.clone(),
                                rules: ContestRulesDraft::from(payload),
                            },
                            ReconcileOutcome::Saved,
                        )
                    }
                    Ok(None) => {
                        info!("no saved rules, starting from template");
                        (
                            RulesMode::Editing {
                                pair: pair.clone(),
                                draft: ContestRulesDraft::default_template(snapshot.flight),
                                origin: DraftOrigin::Template,
                                warning: None,
                            },
                            ReconcileOutcome::Editing { warning: None },
                        )
                    }
                    Err(err) => {
                        warn!(error = %err, "rules lookup failed, falling back to template");
                        let warning = format!("Could not load saved rules: {err}");
                        (
                            RulesMode::Editing {
                                pair: pair.clone(),
                                draft: ContestRulesDraft::default_template(snapshot.flight),
                                origin: DraftOrigin::Template,
                                warning: Some(warning.clone()),
                            },
                            ReconcileOutcome::Editing {
                                warning: Some(warning),
                            },
                        )
                    }
                };
                *self.ctx.rules.lock().await = mode;
                Ok(outcome)
            })
            .instrument(span)
            .await;

        result.unwrap_or(ReconcileOutcome::Stale)
    }
}
