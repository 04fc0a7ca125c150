use super::common::*;
use crate::applications::application_router;
use crate::identity::{CALLER_ID_HEADER, CALLER_ROLE_HEADER};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(
    method: &str,
    uri: &str,
    caller: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header(CALLER_ID_HEADER, id)
            .header(CALLER_ROLE_HEADER, role);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn submit(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/applications",
            Some(("9876543212", "user")),
            Some(serde_json::to_value(draft()).unwrap()),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    payload["application"]["id"]
        .as_str()
        .expect("id in receipt")
        .to_string()
}

#[tokio::test]
async fn submit_route_returns_receipt_in_registry_shape() {
    let router = application_router(build_service(None));

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/applications",
            Some(("9876543212", "user")),
            Some(json!({
                "country": "Japan",
                "type": "Tourist Visa",
                "applicantName": "Jane Roe",
                "amount": 9000,
            })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let application = &payload["application"];
    assert_eq!(application["status"], "pending");
    assert_eq!(application["userId"], "9876543212");
    assert_eq!(application["steps"][0]["status"], "completed");
    assert_eq!(application["steps"][1]["status"], "current");
    assert_eq!(payload["remote"]["state"], "disabled");
}

#[tokio::test]
async fn invalid_drafts_are_unprocessable() {
    let router = application_router(build_service(None));

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/applications",
            Some(("9876543212", "user")),
            Some(json!({ "country": "Japan", "type": "Tourist Visa", "amount": 10 })),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn lifecycle_routes_map_errors_to_statuses() {
    let router = application_router(build_service(None));
    let id = submit(&router).await;
    let staff = Some(("AGENT001", "agent"));

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/status"),
            staff,
            Some(json!({ "status": "approved" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/status"),
            staff,
            Some(json!({ "status": "processing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/advance"),
            staff,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["steps"][1]["status"], "completed");

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/advance"),
            staff,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(request(
            "GET",
            "/api/v1/applications/NOPE000000",
            staff,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_patch_is_a_conflict() {
    let router = application_router(build_service(None));
    let id = submit(&router).await;
    let staff = Some(("AGENT001", "agent"));
    let uri = format!("/api/v1/applications/{id}");

    let response = router
        .clone()
        .oneshot(request(
            "PATCH",
            &uri,
            staff,
            Some(json!({ "amount": 16000, "expectedRevision": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["revision"], 1);

    let response = router
        .oneshot(request(
            "PATCH",
            &uri,
            staff,
            Some(json!({ "amount": 1, "expectedRevision": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stale_lifecycle_bodies_are_conflicts() {
    let router = application_router(build_service(None));
    let id = submit(&router).await;
    let admin = Some(("ADMIN001", "admin"));

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/agent"),
            admin,
            Some(json!({ "agentId": "AGENT001", "expectedRevision": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["revision"], 1);

    let stale_calls = [
        ("agent", json!({ "agentId": "AGENT002", "expectedRevision": 0 })),
        ("status", json!({ "status": "processing", "expectedRevision": 0 })),
        ("advance", json!({ "expectedRevision": 0 })),
        (
            "reopen",
            json!({ "status": "rejected", "reason": "duplicate", "expectedRevision": 0 }),
        ),
    ];
    for (action, body) in stale_calls {
        let response = router
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/v1/applications/{id}/{action}"),
                admin,
                Some(body),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT, "{action}");
    }

    let response = router
        .oneshot(request(
            "POST",
            &format!("/api/v1/applications/{id}/advance"),
            admin,
            Some(json!({ "expectedRevision": 1 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["revision"], 2);
}

#[tokio::test]
async fn reopen_route_is_admin_only() {
    let router = application_router(build_service(None));
    let id = submit(&router).await;
    let uri = format!("/api/v1/applications/{id}/reopen");
    let body = json!({ "status": "processing", "reason": "document re-check" });

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &uri,
            Some(("AGENT001", "agent")),
            Some(body.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .clone()
        .oneshot(request("POST", &uri, Some(("ADMIN001", "admin")), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["override"]["actorId"], "ADMIN001");
    assert_eq!(payload["override"]["from"], "pending");

    let response = router
        .oneshot(request(
            "GET",
            "/api/v1/admin/overrides",
            Some(("ADMIN001", "admin")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(read_json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tracking_route_projects_public_fields() {
    let router = application_router(build_service(None));
    let id = submit(&router).await;

    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/tracking/{}", id.to_lowercase()),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], id.as_str());
    assert_eq!(payload["applicantName"], "John Doe");
    assert!(payload.get("agentId").is_none());

    let response = router
        .oneshot(request(
            "GET",
            &format!("/api/v1/tracking/{id}"),
            Some(("5550001111", "user")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registry_delete_route_reports_the_remote_outcome() {
    let registry = std::sync::Arc::new(RecordingRegistry::default());
    let router = application_router(build_service(Some(registry.clone())));
    let id = submit(&router).await;
    let uri = format!("/api/v1/registry/applications/{id}");

    let response = router
        .clone()
        .oneshot(request("DELETE", &uri, Some(("AGENT001", "agent")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(request("DELETE", &uri, Some(("ADMIN001", "admin")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json_body(response).await["remote"]["state"],
        "acknowledged"
    );
    assert_eq!(registry.deleted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn registry_route_without_registry_is_not_found() {
    let router = application_router(build_service(None));

    let response = router
        .oneshot(request(
            "GET",
            "/api/v1/registry/applications",
            Some(("ADMIN001", "admin")),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
