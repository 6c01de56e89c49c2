//! Provisioning of new clients/projects through the console.

mod support;

use std::time::Duration;

use serde_json::json;

use sc_core::catalog::Provenance;
use sc_core::operation::{OperationId, OperationState};
use sc_core::ports::HttpMethod;
use sc_core::provisioning::{
    ClientTarget, ProvisioningRequest, ProvisioningState, ProvisioningValidationError,
};
use sc_core::rules::{DraftOrigin, RulesMode};
use sc_core::{ClientId, ConsoleError, ProjectId, ProjectPair, ValidationFailure};

use support::{date, harness};

fn new_client(name: &str, project: &str) -> ProvisioningRequest {
    ProvisioningRequest {
        client: ClientTarget::New {
            name: name.to_string(),
        },
        project: project.to_string(),
        flight_start: Some(date(2025, 3, 1)),
        flight_end: Some(date(2025, 3, 31)),
    }
}

// ---------------------------------------------------------------------------
// Validation gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_client_name_is_rejected_without_network() {
    let h = harness();

    let err = h
        .console
        .provision(new_client("Acme_123", "0042"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConsoleError::Validation(ValidationFailure::Provisioning(
            ProvisioningValidationError::InvalidClientName(_)
        ))
    ));
    assert!(h.gateway.calls().is_empty());
    assert_eq!(h.console.provisioning_state().await, ProvisioningState::Idle);
}

#[tokio::test]
async fn missing_flight_dates_are_rejected() {
    let h = harness();
    let mut request = new_client("newco", "0042");
    request.flight_end = None;

    let err = h.console.provision(request).await.unwrap_err();

    assert!(matches!(
        err,
        ConsoleError::Validation(ValidationFailure::Provisioning(
            ProvisioningValidationError::MissingFlightDates
        ))
    ));
    assert!(h.gateway.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn success_merges_catalog_switches_selection_and_reconciles() {
    let h = harness();
    h.gateway
        .ok(HttpMethod::Post, "/clients/create", json!({"message": "created"}));

    let record = h
        .console
        .provision(new_client("  NewCo ", "0042"))
        .await
        .expect("provision");
    assert_eq!(record.pair(), ProjectPair::new("newco", "0042"));
    assert!(record.created_client);

    let create = h.gateway.calls_to(HttpMethod::Post, "/clients/create");
    assert_eq!(create.len(), 1);
    let body = create[0].body.clone().unwrap();
    assert_eq!(body["bucket_name"], "newco");
    assert_eq!(body["project_data"]["project_name"], "0042");
    assert_eq!(body["project_data"]["flight_start_date"], "2025-03-01");

    let selection = h.console.selection().await;
    assert_eq!(selection.pair, Some(ProjectPair::new("newco", "0042")));
    assert_eq!(selection.flight.unwrap().end, date(2025, 3, 31));

    let clients = h.console.clients().await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].provenance, Provenance::Optimistic);

    match h.console.rules_mode().await {
        RulesMode::Editing { draft, origin, .. } => {
            assert_eq!(origin, DraftOrigin::Template);
            assert_eq!(draft.entry_window().start, Some(date(2025, 3, 1)));
        }
        other => panic!("expected template, got {other:?}"),
    }
    assert!(matches!(
        h.console.provisioning_state().await,
        ProvisioningState::Success { .. }
    ));
    assert_eq!(
        h.console.operations().await.get(OperationId::Provision),
        OperationState::Done
    );

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(h.console.provisioning_state().await, ProvisioningState::Idle);
}

#[tokio::test]
async fn later_refresh_does_not_duplicate_optimistic_entries() {
    let h = harness();
    h.gateway
        .ok(HttpMethod::Post, "/clients/create", json!({"message": "created"}));
    h.gateway.ok(
        HttpMethod::Get,
        "/buckets/list",
        json!({"buckets": [{"name": "acme"}, {"name": "newco"}]}),
    );
    h.gateway.ok(
        HttpMethod::Get,
        "/buckets/newco/projects",
        json!({"projects": [{"name": "0042", "flight_start_date": "2025-03-01", "flight_end_date": "2025-03-31"}]}),
    );

    h.console
        .provision(new_client("newco", "0042"))
        .await
        .unwrap();
    h.console.load_clients().await.unwrap();

    let clients = h.console.clients().await;
    assert_eq!(clients.len(), 2);
    let newco: Vec<_> = clients
        .iter()
        .filter(|c| c.name == ClientId::from("newco"))
        .collect();
    assert_eq!(newco.len(), 1);
    assert_eq!(newco[0].provenance, Provenance::Remote);

    let projects = h
        .console
        .select_client(ClientId::from("newco"))
        .await
        .unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, ProjectId::from("0042"));
}

// ---------------------------------------------------------------------------
// Failure path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn remote_failure_leaves_catalog_and_selection_untouched() {
    let h = harness();
    h.gateway
        .fail(HttpMethod::Post, "/clients/create", 500, "bucket quota exceeded");
    let before = h.console.selection().await;

    let err = h
        .console
        .provision(new_client("newco", "0042"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Remote(_)));
    assert!(h.console.clients().await.is_empty());
    assert_eq!(h.console.selection().await, before);
    match h.console.provisioning_state().await {
        ProvisioningState::Error { message } => {
            assert!(message.contains("bucket quota exceeded"), "{message}")
        }
        other => panic!("expected error state, got {other:?}"),
    }
    assert!(matches!(
        h.console.operations().await.get(OperationId::Provision),
        OperationState::Failed(_)
    ));

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(h.console.provisioning_state().await, ProvisioningState::Idle);
}

#[tokio::test]
async fn dismiss_returns_to_idle_immediately() {
    let h = harness();
    h.gateway
        .fail(HttpMethod::Post, "/clients/create", 400, "bad request");
    let _ = h.console.provision(new_client("newco", "0042")).await;

    assert_eq!(
        h.console.dismiss_provisioning().await,
        ProvisioningState::Idle
    );
}
