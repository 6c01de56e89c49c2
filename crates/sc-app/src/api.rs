//! Typed backend API over the gateway port.
//!
//! Builds every request path and decodes responses. A 404 on a read that may
//! legitimately have no data yet is folded into `None` or an empty list.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use sc_core::analytics::{HealthStatus, ScanAnalytics, ValidatedFile};
use sc_core::catalog::{ClientBucket, ProjectEntry, Provenance};
use sc_core::ports::{GatewayError, GatewayPort, GatewayRequest, PresignedUpload};
use sc_core::processing::{ProcessingTrigger, ProcessingType};
use sc_core::provisioning::ValidatedProvisioning;
use sc_core::receipts::{summary_object_key, ReceiptBatchSummary};
use sc_core::rules::ContestRulesPayload;
use sc_core::winners::{WinnerRecord, WinnersExport};
use sc_core::{ClientId, ConsoleError, ProcessingStatus, ProjectPair};

/// Which presign endpoint hands out the upload target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadChannel {
    Standard,
    Partner,
}

impl UploadChannel {
    fn path(self) -> &'static str {
        match self {
            UploadChannel::Standard => "/presign",
            UploadChannel::Partner => "/presign/partner",
        }
    }
}

pub struct ContestApi {
    gateway: Arc<dyn GatewayPort>,
}

impl ContestApi {
    pub fn new(gateway: Arc<dyn GatewayPort>) -> Self {
        Self { gateway }
    }

    pub async fn health(&self) -> Result<HealthStatus, ConsoleError> {
        let value = self.gateway.call(GatewayRequest::get("/health")).await?;
        decode(value)
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientBucket>, ConsoleError> {
        let value = self.gateway.call(GatewayRequest::get("/buckets/list")).await?;
        list_field(value, &["buckets", "clients"])?
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(ClientBucket {
                    name: ClientId::new(name),
                    created_at: None,
                    provenance: Provenance::Remote,
                }),
                other => decode(other),
            })
            .collect()
    }

    /// Projects of `client`. Falls back to `/projects` when the bucket route
    /// is not deployed.
    pub async fn list_projects(&self, client: &ClientId) -> Result<Vec<ProjectEntry>, ConsoleError> {
        let primary = format!("/buckets/{}/projects", client);
        let value = match self.gateway.call(GatewayRequest::get(primary)).await {
            Ok(value) => value,
            Err(err) if err.is_not_found() => {
                debug!(client = %client, "bucket project route missing, using /projects");
                let fallback = format!("/projects?bucket_name={}", client);
                self.gateway.call(GatewayRequest::get(fallback)).await?
            }
            Err(err) => return Err(err.into()),
        };
        list_field(value, &["projects"])?
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(ProjectEntry {
                    name: name.into(),
                    flight_start_date: None,
                    flight_end_date: None,
                    created_at: None,
                    provenance: Provenance::Remote,
                }),
                other => decode(other),
            })
            .collect()
    }

    pub async fn get_rules(
        &self,
        pair: &ProjectPair,
    ) -> Result<Option<ContestRulesPayload>, ConsoleError> {
        let request = GatewayRequest::get(rules_path(pair));
        match optional(self.gateway.call(request).await)? {
            Some(value) => {
                let rules = match value {
                    Value::Object(mut map) if map.get("rules").is_some_and(Value::is_object) => {
                        map.remove("rules").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                decode(rules).map(Some)
            }
            None => Ok(None),
        }
    }

    pub async fn create_rules(
        &self,
        pair: &ProjectPair,
        rules: &ContestRulesPayload,
    ) -> Result<(), ConsoleError> {
        let body = encode(rules)?;
        self.gateway
            .call(GatewayRequest::post(rules_path(pair), body))
            .await?;
        Ok(())
    }

    pub async fn update_rules(
        &self,
        pair: &ProjectPair,
        rules: &ContestRulesPayload,
    ) -> Result<(), ConsoleError> {
        let body = encode(rules)?;
        self.gateway
            .call(GatewayRequest::put(rules_path(pair), Some(body)))
            .await?;
        Ok(())
    }

    /// Deleting rules that do not exist is not an error.
    pub async fn delete_rules(&self, pair: &ProjectPair) -> Result<(), ConsoleError> {
        optional(
            self.gateway
                .call(GatewayRequest::delete(rules_path(pair)))
                .await,
        )?;
        Ok(())
    }

    pub async fn create_client(&self, request: &ValidatedProvisioning) -> Result<(), ConsoleError> {
        let body = json!({
            "bucket_name": request.client,
            "project_data": {
                "project_name": request.project,
                "flight_start_date": request.flight.start,
                "flight_end_date": request.flight.end,
            },
        });
        self.gateway
            .call(GatewayRequest::post("/clients/create", body))
            .await?;
        Ok(())
    }

    pub async fn presign(
        &self,
        channel: UploadChannel,
        pair: &ProjectPair,
        file_name: &str,
    ) -> Result<PresignedUpload, ConsoleError> {
        let body = json!({
            "bucket_name": pair.client,
            "project_name": pair.project,
            "file_name": file_name,
            "content_type": "application/zip",
            "upload_type": "receipts",
        });
        let value = self
            .gateway
            .call(GatewayRequest::post(channel.path(), body))
            .await?;
        decode_presigned(value)
    }

    pub async fn trigger_processing(
        &self,
        pair: &ProjectPair,
        kind: ProcessingType,
    ) -> Result<ProcessingTrigger, ConsoleError> {
        let body = json!({
            "bucket_name": pair.client,
            "project_name": pair.project,
            "processing_type": kind.as_str(),
        });
        let value = self
            .gateway
            .call(GatewayRequest::post("/data/process", body))
            .await?;
        if value.is_null() {
            return Ok(ProcessingTrigger::default());
        }
        decode(value)
    }

    pub async fn processing_status(
        &self,
        pair: &ProjectPair,
    ) -> Result<Option<ProcessingStatus>, ConsoleError> {
        let path = format!("/data/status/{}/{}", pair.client, pair.project);
        match optional(self.gateway.call(GatewayRequest::get(path)).await)? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(value).map(Some),
        }
    }

    pub async fn select_winners(&self, pair: &ProjectPair, count: u32) -> Result<(), ConsoleError> {
        let body = json!({
            "bucket_name": pair.client,
            "project_name": pair.project,
            "number_of_winners": count,
        });
        self.gateway
            .call(GatewayRequest::post("/winners/select", body))
            .await?;
        Ok(())
    }

    pub async fn winners(&self, pair: &ProjectPair) -> Result<Vec<WinnerRecord>, ConsoleError> {
        let path = format!("/winners/{}/{}", pair.client, pair.project);
        match optional(self.gateway.call(GatewayRequest::get(path)).await)? {
            Some(value) => list_field(value, &["winners"])?
                .into_iter()
                .map(decode)
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    pub async fn export_winners(&self, pair: &ProjectPair) -> Result<WinnersExport, ConsoleError> {
        let path = format!("/winners/export/{}/{}", pair.client, pair.project);
        let value = self.gateway.call(GatewayRequest::get(path)).await?;
        decode(value)
    }

    pub async fn validated_files(
        &self,
        pair: &ProjectPair,
    ) -> Result<Vec<ValidatedFile>, ConsoleError> {
        let path = format!("/data/files/{}/{}", pair.client, pair.project);
        match optional(self.gateway.call(GatewayRequest::get(path)).await)? {
            Some(value) => list_field(value, &["files", "validated_files"])?
                .into_iter()
                .map(decode)
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    pub async fn receipt_summary(
        &self,
        pair: &ProjectPair,
    ) -> Result<Option<ReceiptBatchSummary>, ConsoleError> {
        let path = format!(
            "/receipts/summary/{}/{}?key={}",
            pair.client,
            pair.project,
            summary_object_key(&pair.project)
        );
        match optional(self.gateway.call(GatewayRequest::get(path)).await)? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(value).map(Some),
        }
    }

    pub async fn analytics(&self, pair: &ProjectPair) -> Result<Option<ScanAnalytics>, ConsoleError> {
        let path = analytics_path(pair);
        match optional(self.gateway.call(GatewayRequest::get(path)).await)? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(value).map(Some),
        }
    }

    pub async fn refresh_analytics(&self, pair: &ProjectPair) -> Result<ScanAnalytics, ConsoleError> {
        let value = self
            .gateway
            .call(GatewayRequest::put(analytics_path(pair), None))
            .await?;
        if value.is_null() {
            return Ok(ScanAnalytics::default());
        }
        decode(value)
    }
}

fn rules_path(pair: &ProjectPair) -> String {
    format!("/contest-rules/{}/{}", pair.client, pair.project)
}

fn analytics_path(pair: &ProjectPair) -> String {
    format!("/analytics/{}/{}", pair.client, pair.project)
}

/// 404 becomes `None`; every other failure is kept.
fn optional(result: Result<Value, GatewayError>) -> Result<Option<Value>, ConsoleError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ConsoleError> {
    serde_json::from_value(value)
        .map_err(|e| ConsoleError::Remote(GatewayError::Decode(e.to_string())))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ConsoleError> {
    serde_json::to_value(value)
        .map_err(|e| ConsoleError::Remote(GatewayError::Decode(e.to_string())))
}

/// Accepts a bare array or an object wrapping the array under one of `keys`.
fn list_field(value: Value, keys: &[&str]) -> Result<Vec<Value>, ConsoleError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => {
            for key in keys {
                match map.remove(*key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    _ => {}
                }
            }
            Err(ConsoleError::Remote(GatewayError::Decode(format!(
                "expected a list under one of {:?}",
                keys
            ))))
        }
        other => Err(ConsoleError::Remote(GatewayError::Decode(format!(
            "expected a list, got {}",
            other
        )))),
    }
}

fn decode_presigned(value: Value) -> Result<PresignedUpload, ConsoleError> {
    let upload_url = value
        .get("upload_url")
        .and_then(Value::as_str)
        .ok_or_else(|| ConsoleError::Remote(GatewayError::Decode("missing upload_url".into())))?
        .to_string();

    if let Some(fields) = value.get("fields").and_then(Value::as_object) {
        let fields = fields
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect::<BTreeMap<_, _>>();
        return Ok(PresignedUpload::Form { upload_url, fields });
    }

    let file_key = value
        .get("file_key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(PresignedUpload::Put {
        upload_url,
        file_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::*;
    use sc_core::ports::HttpMethod;

    mock! {
        Gateway {}

        #[async_trait]
        impl GatewayPort for Gateway {
            async fn call(&self, request: GatewayRequest) -> Result<Value, GatewayError>;
        }
    }

    fn not_found() -> GatewayError {
        GatewayError::Status {
            status: 404,
            message: "Not Found".into(),
        }
    }

    fn pair() -> ProjectPair {
        ProjectPair::new("acme", "0007")
    }

    #[tokio::test]
    async fn missing_rules_are_none() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_call()
            .with(eq(GatewayRequest::get("/contest-rules/acme/0007")))
            .times(1)
            .returning(|_| Err(not_found()));

        let api = ContestApi::new(Arc::new(gateway));
        assert_eq!(api.get_rules(&pair()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rules_are_unwrapped_from_envelope() {
        let mut gateway = MockGateway::new();
        gateway.expect_call().returning(|_| {
            Ok(json!({
                "rules": {
                    "age_min": 21,
                    "age_max": 99,
                    "eligible_states": ["CA"],
                    "winner_rules": [{"id": "r1", "count": 2, "period": "week"}]
                }
            }))
        });

        let api = ContestApi::new(Arc::new(gateway));
        let rules = api.get_rules(&pair()).await.unwrap().unwrap();
        assert_eq!(rules.age_min, 21);
        assert_eq!(rules.winner_rules.len(), 1);
    }

    #[tokio::test]
    async fn server_error_on_rules_is_surfaced() {
        let mut gateway = MockGateway::new();
        gateway.expect_call().returning(|_| {
            Err(GatewayError::Status {
                status: 500,
                message: "boom".into(),
            })
        });

        let api = ContestApi::new(Arc::new(gateway));
        assert!(matches!(
            api.get_rules(&pair()).await,
            Err(ConsoleError::Remote(GatewayError::Status { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn project_listing_falls_back_to_projects_route() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_call()
            .withf(|r| r.path == "/buckets/acme/projects")
            .times(1)
            .returning(|_| Err(not_found()));
        gateway
            .expect_call()
            .withf(|r| r.path == "/projects?bucket_name=acme" && r.method == HttpMethod::Get)
            .times(1)
            .returning(|_| {
                Ok(json!({"projects": [
                    {"name": "0007", "flight_start_date": "2024-12-01", "flight_end_date": "2024-12-31"},
                    "0008"
                ]}))
            });

        let api = ContestApi::new(Arc::new(gateway));
        let projects = api.list_projects(&"acme".into()).await.unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].flight().is_some());
        assert_eq!(projects[1].name.as_str(), "0008");
    }

    #[tokio::test]
    async fn presign_decodes_both_target_shapes() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_call()
            .withf(|r| r.path == "/presign")
            .returning(|_| Ok(json!({"upload_url": "https://s3/put", "file_key": "0007/receipts/a.zip"})));
        gateway
            .expect_call()
            .withf(|r| r.path == "/presign/partner")
            .returning(|_| {
                Ok(json!({"upload_url": "https://s3/form", "fields": {"key": "0007/partner/a.zip", "policy": "p"}}))
            });

        let api = ContestApi::new(Arc::new(gateway));
        let put = api
            .presign(UploadChannel::Standard, &pair(), "a.zip")
            .await
            .unwrap();
        assert_eq!(put.object_key(), Some("0007/receipts/a.zip"));

        let form = api
            .presign(UploadChannel::Partner, &pair(), "a.zip")
            .await
            .unwrap();
        assert!(matches!(form, PresignedUpload::Form { .. }));
        assert_eq!(form.object_key(), Some("0007/partner/a.zip"));
    }

    #[tokio::test]
    async fn select_winners_sends_expected_body() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_call()
            .with(eq(GatewayRequest::post(
                "/winners/select",
                json!({"bucket_name": "acme", "project_name": "0007", "number_of_winners": 5}),
            )))
            .times(1)
            .returning(|_| Ok(json!({"message": "ok"})));

        let api = ContestApi::new(Arc::new(gateway));
        api.select_winners(&pair(), 5).await.unwrap();
    }

    #[tokio::test]
    async fn receipt_summary_uses_latest_summary_key() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_call()
            .withf(|r| {
                r.path == "/receipts/summary/acme/0007?key=0007/receipts/results/summary_latest.json"
            })
            .returning(|_| Err(not_found()));

        let api = ContestApi::new(Arc::new(gateway));
        assert_eq!(api.receipt_summary(&pair()).await.unwrap(), None);
    }
}
