use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Attraction, CountryDraft, CountryId, CountryPatch, Faq, TimelineStep, VisaTypeDraft,
    VisaTypePatch,
};
use super::filter::{FacetValue, FilterCriteria};
use super::service::{CatalogService, CatalogServiceError};
use super::store::{CatalogError, CatalogSnapshot};
use crate::identity::Caller;
use crate::persistence::SnapshotRepository;

/// Router builder exposing catalog browsing, filter state, and admin maintenance.
pub fn catalog_router<C, F>(service: Arc<CatalogService<C, F>>) -> Router
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    Router::new()
        .route("/api/v1/countries", get(browse_handler::<C, F>))
        .route("/api/v1/countries/search", post(search_handler::<C, F>))
        .route("/api/v1/countries/:country_id", get(country_handler::<C, F>))
        // One criteria set per portal instance, shared by every visitor. Use
        // `/api/v1/countries/search` to filter without touching it.
        .route(
            "/api/v1/filters",
            get(criteria_handler::<C, F>).delete(clear_filters_handler::<C, F>),
        )
        .route("/api/v1/filters/toggle", post(toggle_filter_handler::<C, F>))
        .route("/api/v1/filters/remove", post(remove_filter_handler::<C, F>))
        .route("/api/v1/filters/search", post(set_search_handler::<C, F>))
        .route("/api/v1/filters/price", post(set_price_handler::<C, F>))
        .route(
            "/api/v1/admin/countries",
            post(create_country_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id",
            patch(update_country_handler::<C, F>).delete(delete_country_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/toggle",
            post(toggle_country_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/visa-types",
            post(add_visa_type_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/visa-types/:visa_type_id",
            patch(update_visa_type_handler::<C, F>).delete(delete_visa_type_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/faqs",
            put(replace_faqs_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/attractions",
            put(replace_attractions_handler::<C, F>),
        )
        .route(
            "/api/v1/admin/countries/:country_id/timeline",
            put(replace_timeline_handler::<C, F>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchRequest {
    pub(crate) search: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceRequest {
    pub(crate) min: i64,
    pub(crate) max: i64,
}

pub(crate) async fn browse_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let countries = service.browse();
    (StatusCode::OK, Json(countries)).into_response()
}

pub(crate) async fn search_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Json(criteria): Json<FilterCriteria>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let countries = service.search(&criteria);
    (StatusCode::OK, Json(countries)).into_response()
}

pub(crate) async fn country_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Path(country_id): Path<String>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    match service.country(&CountryId(country_id)) {
        Some(country) if country.is_active => (StatusCode::OK, Json(country)).into_response(),
        _ => not_found(),
    }
}

pub(crate) async fn criteria_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    (StatusCode::OK, Json(service.criteria())).into_response()
}

pub(crate) async fn toggle_filter_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Json(value): Json<FacetValue>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    criteria_response(service.toggle_filter(value))
}

pub(crate) async fn remove_filter_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Json(value): Json<FacetValue>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    criteria_response(service.remove_filter(&value))
}

pub(crate) async fn set_search_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Json(request): Json<SearchRequest>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    criteria_response(service.set_search(request.search))
}

pub(crate) async fn set_price_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    Json(request): Json<PriceRequest>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    criteria_response(service.set_price_range(request.min, request.max))
}

pub(crate) async fn clear_filters_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    criteria_response(service.clear_filters())
}

pub(crate) async fn create_country_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Json(draft): Json<CountryDraft>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.create_country(&caller, draft) {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn update_country_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
    Json(patch): Json<CountryPatch>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = CountryId(country_id);
    let updated = service.update_country(&caller, &id, patch);
    country_response(&service, &id, updated)
}

pub(crate) async fn toggle_country_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.toggle_country(&caller, &CountryId(country_id)) {
        Ok(Some(active)) => {
            (StatusCode::OK, Json(json!({ "isActive": active }))).into_response()
        }
        Ok(None) => not_found(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn delete_country_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.delete_country(&caller, &CountryId(country_id)) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn add_visa_type_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
    Json(draft): Json<VisaTypeDraft>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.add_visa_type(&caller, &CountryId(country_id), draft) {
        Ok(Some(id)) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Ok(None) => not_found(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn update_visa_type_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path((country_id, visa_type_id)): Path<(String, String)>,
    Json(patch): Json<VisaTypePatch>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = CountryId(country_id);
    let updated = service.update_visa_type(&caller, &id, &visa_type_id, patch);
    country_response(&service, &id, updated)
}

pub(crate) async fn delete_visa_type_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path((country_id, visa_type_id)): Path<(String, String)>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    match service.delete_visa_type(&caller, &CountryId(country_id), &visa_type_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn replace_faqs_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
    Json(faqs): Json<Vec<Faq>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = CountryId(country_id);
    let replaced = service.replace_faqs(&caller, &id, faqs);
    country_response(&service, &id, replaced)
}

pub(crate) async fn replace_attractions_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
    Json(attractions): Json<Vec<Attraction>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = CountryId(country_id);
    let replaced = service.replace_attractions(&caller, &id, attractions);
    country_response(&service, &id, replaced)
}

pub(crate) async fn replace_timeline_handler<C, F>(
    State(service): State<Arc<CatalogService<C, F>>>,
    headers: HeaderMap,
    Path(country_id): Path<String>,
    Json(timeline): Json<Vec<TimelineStep>>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot> + 'static,
    F: SnapshotRepository<FilterCriteria> + 'static,
{
    let caller = Caller::from_headers(&headers);
    let id = CountryId(country_id);
    let replaced = service.replace_timeline(&caller, &id, timeline);
    country_response(&service, &id, replaced)
}

/// The country as stored after an admin edit, including inactive ones.
fn country_response<C, F>(
    service: &CatalogService<C, F>,
    id: &CountryId,
    result: Result<bool, CatalogServiceError>,
) -> Response
where
    C: SnapshotRepository<CatalogSnapshot>,
    F: SnapshotRepository<FilterCriteria>,
{
    match result {
        Ok(true) => match service.country(id) {
            Some(country) => (StatusCode::OK, Json(country)).into_response(),
            None => not_found(),
        },
        Ok(false) => not_found(),
        Err(error) => service_error(error),
    }
}

fn criteria_response(result: Result<FilterCriteria, CatalogError>) -> Response {
    match result {
        Ok(criteria) => (StatusCode::OK, Json(criteria)).into_response(),
        Err(error) => catalog_error(error),
    }
}

fn service_error(error: CatalogServiceError) -> Response {
    match error {
        CatalogServiceError::Unauthorized => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::FORBIDDEN, Json(payload)).into_response()
        }
        CatalogServiceError::Catalog(error) => catalog_error(error),
    }
}

fn catalog_error(error: CatalogError) -> Response {
    let status = match error {
        CatalogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn not_found() -> Response {
    let payload = json!({ "error": "country not found" });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
