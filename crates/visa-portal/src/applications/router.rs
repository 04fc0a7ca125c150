use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationDraft, ApplicationId, ApplicationPatch, ApplicationStatus};
use super::service::{ApplicationService, RemoteSync};
use super::store::{ApplicationSnapshot, ApplicationStoreError};
use crate::identity::Caller;
use crate::persistence::SnapshotRepository;
use crate::tracking::TrackingLookup;

/// Router builder exposing intake, back office lifecycle operations, and public tracking.
pub fn application_router<S>(service: Arc<ApplicationService<S>>) -> Router
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_handler::<S>).post(submit_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<S>).patch(update_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/agent",
            post(assign_agent_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(set_status_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/advance",
            post(advance_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/reopen",
            post(reopen_handler::<S>),
        )
        .route("/api/v1/admin/overrides", get(overrides_handler::<S>))
        .route("/api/v1/registry/applications", get(registry_handler::<S>))
        .route(
            "/api/v1/registry/applications/:application_id",
            delete(purge_remote_handler::<S>),
        )
        .route("/api/v1/tracking/:application_id", get(tracking_handler::<S>))
        .with_state(service)
}

// Every mutation body may carry `expectedRevision`; a mismatch answers 409.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignAgentRequest {
    pub(crate) agent_id: String,
    #[serde(default)]
    pub(crate) expected_revision: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusRequest {
    pub(crate) status: ApplicationStatus,
    #[serde(default)]
    pub(crate) expected_revision: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdvanceRequest {
    #[serde(default)]
    pub(crate) expected_revision: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReopenRequest {
    pub(crate) status: ApplicationStatus,
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) expected_revision: Option<u64>,
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Json(draft): Json<ApplicationDraft>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.submit(&caller, draft).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.list(&caller) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.get(&caller, &ApplicationId::parse(&application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(patch): Json<ApplicationPatch>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.update(&caller, &ApplicationId::parse(&application_id), patch) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn assign_agent_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<AssignAgentRequest>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = ApplicationId::parse(&application_id);
    match service.assign_agent(&caller, &id, &request.agent_id, request.expected_revision) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn set_status_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = ApplicationId::parse(&application_id);
    match service
        .set_status(&caller, &id, request.status, request.expected_revision)
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn advance_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    request: Option<Json<AdvanceRequest>>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let request = request.map(|Json(request)| request).unwrap_or_default();
    let id = ApplicationId::parse(&application_id);
    match service.advance_step(&caller, &id, request.expected_revision) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn reopen_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<ReopenRequest>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = ApplicationId::parse(&application_id);
    match service
        .reopen(
            &caller,
            &id,
            request.status,
            &request.reason,
            request.expected_revision,
        )
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn overrides_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.overrides(&caller) {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(error) => store_error(error),
    }
}

pub(crate) async fn registry_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.registry_listing(&caller).await {
        // Stale data is still served with 200; 503 only when there is nothing to show.
        Ok(Some(listing)) if listing.stale && listing.applications.is_empty() => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(listing)).into_response()
        }
        Ok(Some(listing)) => (StatusCode::OK, Json(listing)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "no application registry is configured" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => store_error(error),
    }
}

pub(crate) async fn purge_remote_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = ApplicationId::parse(&application_id);
    match service.purge_remote(&caller, &id).await {
        Ok(Some(RemoteSync::Failed(detail))) => {
            let payload = json!({ "remote": RemoteSync::Failed(detail) });
            (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
        }
        Ok(Some(remote)) => (StatusCode::OK, Json(json!({ "remote": remote }))).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "no application registry is configured" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => store_error(error),
    }
}

pub(crate) async fn tracking_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: SnapshotRepository<ApplicationSnapshot> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.track(&caller, &application_id) {
        TrackingLookup::Found(tracked) => (StatusCode::OK, Json(tracked)).into_response(),
        TrackingLookup::NotFound => {
            let payload = json!({ "error": "no application matches this tracking number" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}

fn store_error(error: ApplicationStoreError) -> Response {
    let status = match &error {
        ApplicationStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        ApplicationStoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationStoreError::Lifecycle(_) | ApplicationStoreError::StaleRevision { .. } => {
            StatusCode::CONFLICT
        }
        ApplicationStoreError::Unauthorized => StatusCode::FORBIDDEN,
        ApplicationStoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
