use super::ContestRulesDraft;
use crate::selection::ProjectPair;

/// Where an editable draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    /// No saved rules existed; the draft is the default template.
    Template,
    /// Saved rules re-opened for editing.
    SavedRules,
}

/// Which face of the rules workflow is showing.
///
/// 规则工作流当前所处的模式
#[derive(Debug, Clone, PartialEq)]
pub enum RulesMode {
    /// No project selected.
    Unselected,
    /// Waiting for the backend to say whether rules exist.
    Reconciling { pair: ProjectPair },
    /// Rules exist remotely; read-only display.
    Saved {
        pair: ProjectPair,
        rules: ContestRulesDraft,
    },
    /// A draft is being edited.
    Editing {
        pair: ProjectPair,
        draft: ContestRulesDraft,
        origin: DraftOrigin,
        /// Non-fatal warning (e.g. rules could not be loaded).
        warning: Option<String>,
    },
}

impl RulesMode {
    pub fn pair(&self) -> Option<&ProjectPair> {
        match self {
            RulesMode::Unselected => None,
            RulesMode::Reconciling { pair }
            | RulesMode::Saved { pair, .. }
            | RulesMode::Editing { pair, .. } => Some(pair),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, RulesMode::Saved { .. })
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, RulesMode::Editing { .. })
    }

    /// The draft being shown, whichever mode it is in.
    pub fn current_rules(&self) -> Option<&ContestRulesDraft> {
        match self {
            RulesMode::Saved { rules, .. } => Some(rules),
            RulesMode::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn saved_rules(&self) -> Option<&ContestRulesDraft> {
        match self {
            RulesMode::Saved { rules, .. } => Some(rules),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            RulesMode::Editing { warning, .. } => warning.as_deref(),
            _ => None,
        }
    }
}
