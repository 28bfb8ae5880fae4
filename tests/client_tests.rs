//! End-to-end tests: the HTTP gateway and the composer against a live server
//! on an ephemeral port.

use std::sync::Arc;

use bug_reporter::config::CorsConfig;
use bug_reporter::db::Database;
use bug_reporter::server::{build_router, AppState};
use bug_reporter::{
    BugError, BugGateway, BugReporter, CreateBugRequest, HttpGateway, LocalGateway, Metadata,
    MetadataValue, Priority, ReporterConfig, ReporterOptions, Status,
};
use tokio::net::TcpListener;

/// Test helper: serve a fresh in-memory store, return its collection URL
async fn spawn_server() -> String {
    let db = Database::open_in_memory().expect("in-memory database");
    let app = build_router(AppState::new(LocalGateway::new(db)), &CorsConfig::default())
        .expect("router");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });

    format!("http://{}/api/bugs", addr)
}

fn reporter_for(endpoint: &str, options: ReporterOptions) -> BugReporter {
    let config = ReporterConfig::default().with_options(&ReporterOptions {
        api_endpoint: Some(endpoint.to_string()),
        ..options
    });
    BugReporter::new(config)
}

// =============================================================================
// HttpGateway
// =============================================================================

#[tokio::test]
async fn test_gateway_crud_round_trip() {
    let gateway = HttpGateway::new(spawn_server().await);

    let mut request = CreateBugRequest::new("Crash on save");
    request.description = Some("Steps".to_string());
    request.metadata = Some(Metadata::from([(
        "browser".to_string(),
        MetadataValue::from("Chrome"),
    )]));
    let created = gateway.create(request).await.unwrap();
    assert_eq!(created.status, Status::Open);
    assert_eq!(created.priority, Priority::Medium);

    assert_eq!(gateway.get(created.id).await.unwrap(), created);

    let updated = gateway
        .update_status(created.id, Status::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, Status::InProgress);

    let updated = gateway
        .update_priority(created.id, Priority::Critical)
        .await
        .unwrap();
    assert_eq!(updated.priority, Priority::Critical);

    let updated = gateway
        .update_metadata(
            created.id,
            Metadata::from([("userId".to_string(), MetadataValue::Integer(7))]),
        )
        .await
        .unwrap();
    let metadata = updated.metadata.unwrap();
    assert_eq!(metadata["browser"], MetadataValue::from("Chrome"));
    assert_eq!(metadata["userId"], MetadataValue::Integer(7));

    gateway.delete(created.id).await.unwrap();
    assert!(gateway.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gateway_maps_not_found() {
    let gateway = HttpGateway::new(spawn_server().await);

    assert!(matches!(
        gateway.get(42).await,
        Err(BugError::NotFound { id: 42 })
    ));
    assert!(matches!(
        gateway.update_status(42, Status::Closed).await,
        Err(BugError::NotFound { id: 42 })
    ));
    assert!(matches!(
        gateway.delete(42).await,
        Err(BugError::NotFound { id: 42 })
    ));
}

#[tokio::test]
async fn test_gateway_maps_validation() {
    let gateway = HttpGateway::new(spawn_server().await);

    let err = gateway.create(CreateBugRequest::new("  ")).await.unwrap_err();

    match err {
        BugError::Validation { message, .. } => assert_eq!(message, "Title is required"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Composer scenarios
// =============================================================================

#[tokio::test]
async fn test_scenario_minimal_submission() {
    let endpoint = spawn_server().await;
    let mut form = reporter_for(&endpoint, ReporterOptions::default());
    form.set_title("Test Bug");

    let bug = form.submit().await.unwrap();

    let listed = HttpGateway::new(&endpoint).list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, bug.id);
    assert_eq!(listed[0].title, "Test Bug");
    assert_eq!(listed[0].status, Status::Open);
    assert_eq!(listed[0].priority, Priority::Medium);
    assert!(listed[0].metadata.is_none());
}

#[tokio::test]
async fn test_scenario_metadata_fields() {
    let endpoint = spawn_server().await;
    let mut form = reporter_for(
        &endpoint,
        ReporterOptions {
            show_metadata_fields: Some(true),
            ..Default::default()
        },
    );
    form.set_title("With metadata");
    form.push_metadata("browser", "Chrome");

    let bug = form.submit().await.unwrap();

    let stored = HttpGateway::new(&endpoint).get(bug.id).await.unwrap();
    assert_eq!(
        stored.metadata,
        Some(Metadata::from([(
            "browser".to_string(),
            MetadataValue::from("Chrome"),
        )]))
    );
}

#[tokio::test]
async fn test_scenario_delete_nonexistent() {
    let endpoint = spawn_server().await;
    let gateway = HttpGateway::new(&endpoint);
    gateway.create(CreateBugRequest::new("Keep me")).await.unwrap();
    let before = gateway.list().await.unwrap();

    let err = gateway.delete(99999).await.unwrap_err();

    assert!(matches!(err, BugError::NotFound { id: 99999 }));
    assert_eq!(gateway.list().await.unwrap(), before);
}

#[tokio::test]
async fn test_context_reaches_store() {
    let endpoint = spawn_server().await;
    let context = || -> anyhow::Result<Metadata> {
        Ok(Metadata::from([
            ("userId".to_string(), MetadataValue::Integer(12345)),
            ("sourcePage".to_string(), MetadataValue::from("/dashboard")),
        ]))
    };
    let mut form = reporter_for(&endpoint, ReporterOptions::default()).with_context(Arc::new(context));
    form.set_title("Context");
    form.set_priority(Priority::High);

    let bug = form.submit().await.unwrap();

    let stored = HttpGateway::new(&endpoint).get(bug.id).await.unwrap();
    assert_eq!(stored.priority, Priority::High);
    let metadata = stored.metadata.unwrap();
    assert_eq!(metadata["userId"], MetadataValue::Integer(12345));
    assert_eq!(metadata["sourcePage"], MetadataValue::from("/dashboard"));
}

#[tokio::test]
async fn test_unreachable_store_keeps_form() {
    // Port 1 is reserved and nothing listens there
    let mut form = reporter_for("http://127.0.0.1:1/api/bugs", ReporterOptions::default());
    form.set_title("Offline");

    let err = form.submit().await.unwrap_err();

    assert!(matches!(err, BugError::Transport(_)));
    assert_eq!(form.title(), "Offline");
    assert!(form.error().is_some());
}
