//! Scan analytics, validated files and system health.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scan analytics for a project. Metric names are owned by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanAnalytics {
    #[serde(default, alias = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl ScanAnalytics {
    /// Integer metric, if present and numeric.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.metrics.get(name).and_then(Value::as_u64)
    }
}

/// A validated entry file produced by processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedFile {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(default, alias = "Size")]
    pub size: Option<u64>,
    #[serde(default, alias = "LastModified")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy")
    }
}
