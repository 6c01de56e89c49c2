//! ID type wrappers for type safety.

mod id_macro;

use serde::{Deserialize, Serialize};

use id_macro::impl_id;

/// Client identifier. Doubles as the storage bucket name of the client.
/// 客户标识（同时也是存储桶名称）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

/// Project handle inside a client bucket (numeric string such as `0007`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

/// Opaque token identifying one winner-selection sub-rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinnerRuleId(String);

impl_id!(ClientId, ProjectId, WinnerRuleId);

impl WinnerRuleId {
    /// Generates a fresh, unique rule id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
