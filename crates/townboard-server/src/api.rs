use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use townboard_shared::constants::VISIBILITY_WINDOWS;
use townboard_shared::{RatingTarget, RecordId, TableKind};
use townboard_store::{Listing, Member, Rating, ShowcaseItem, TableReport, Ticket, Transition, Vendor};

use crate::auth::{Moderator, ModeratorSession};
use crate::config::ServerConfig;
use crate::directory::{
    Directory, NewListing, NewMember, NewRating, NewShowcase, NewTicket, NewVendor, Queue, Rated,
    RatingSummary,
};
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub moderator: Arc<Moderator>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let public = Router::new()
        .route("/members", post(register_member))
        .route("/listings", get(list_listings).post(submit_listing))
        .route("/vendors", get(list_vendors).post(submit_vendor))
        .route("/showcase", get(list_showcase).post(submit_showcase))
        .route("/ratings", post(submit_rating))
        .route("/ratings/{kind}/{id}", get(rating_summary))
        .route("/tickets", post(submit_ticket))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let admin = Router::new()
        .route("/admin/status", get(admin_status))
        .route("/admin/queue/{kind}", get(admin_queue))
        .route("/admin/records/{kind}/{id}/approve", post(admin_approve))
        .route("/admin/records/{kind}/{id}/reject", post(admin_reject))
        .route("/admin/records/{kind}/{id}/extend", post(admin_extend))
        .route("/admin/tickets", get(admin_tickets))
        .route("/admin/tickets/{id}/close", post(admin_close_ticket))
        .route("/admin/showcase", post(admin_post_showcase))
        .route("/admin/listings/on-behalf", post(admin_listing_on_behalf))
        .route("/admin/vendors/on-behalf", post(admin_vendor_on_behalf));

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .merge(public)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Plumbing ───

/// Run a directory call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ServerError>
where
    F: FnOnce(&Directory) -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    let directory = state.directory.clone();
    tokio::task::spawn_blocking(move || f(&directory))
        .await
        .map_err(|e| ServerError::Internal(format!("Directory task failed: {e}")))?
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

fn session(headers: &HeaderMap, state: &AppState) -> Result<ModeratorSession, ServerError> {
    state.moderator.authenticate(headers)
}

// ─── Public ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    logo_url: Option<String>,
    banner_url: Option<String>,
    visibility_windows: &'static [u32],
    moderation_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        logo_url: state.config.logo_url.clone(),
        banner_url: state.config.banner_url.clone(),
        visibility_windows: &VISIBILITY_WINDOWS,
        moderation_enabled: state.moderator.is_enabled(),
    })
}

async fn register_member(
    State(state): State<AppState>,
    payload: Result<Json<NewMember>, JsonRejection>,
) -> Result<(StatusCode, Json<Member>), ServerError> {
    let payload = body(payload)?;
    let member = blocking(&state, move |dir| dir.register_member(payload)).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Rated<Listing>>>, ServerError> {
    let rows = blocking(&state, move |dir| Ok(dir.public_listings(query.q.as_deref()))).await?;
    Ok(Json(rows))
}

async fn submit_listing(
    State(state): State<AppState>,
    payload: Result<Json<NewListing>, JsonRejection>,
) -> Result<(StatusCode, Json<Listing>), ServerError> {
    let payload = body(payload)?;
    let listing = blocking(&state, move |dir| dir.submit_listing(payload)).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Rated<Vendor>>>, ServerError> {
    let rows = blocking(&state, move |dir| Ok(dir.public_vendors(query.q.as_deref()))).await?;
    Ok(Json(rows))
}

async fn submit_vendor(
    State(state): State<AppState>,
    payload: Result<Json<NewVendor>, JsonRejection>,
) -> Result<(StatusCode, Json<Vendor>), ServerError> {
    let payload = body(payload)?;
    let vendor = blocking(&state, move |dir| dir.submit_vendor(payload)).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

async fn list_showcase(State(state): State<AppState>) -> Result<Json<Vec<ShowcaseItem>>, ServerError> {
    let rows = blocking(&state, |dir| Ok(dir.public_showcase())).await?;
    Ok(Json(rows))
}

async fn submit_showcase(
    State(state): State<AppState>,
    payload: Result<Json<NewShowcase>, JsonRejection>,
) -> Result<(StatusCode, Json<ShowcaseItem>), ServerError> {
    let payload = body(payload)?;
    let item = blocking(&state, move |dir| dir.submit_showcase(payload)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn submit_rating(
    State(state): State<AppState>,
    payload: Result<Json<NewRating>, JsonRejection>,
) -> Result<(StatusCode, Json<Rating>), ServerError> {
    let payload = body(payload)?;
    let rating = blocking(&state, move |dir| dir.rate(payload)).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

#[derive(Serialize)]
struct RatingSummaryResponse {
    target_kind: RatingTarget,
    target_id: RecordId,
    summary: Option<RatingSummary>,
}

async fn rating_summary(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<RatingSummaryResponse>, ServerError> {
    let target: RatingTarget = kind.parse()?;
    let id = RecordId::from(id);
    let lookup = id.clone();
    let summary = blocking(&state, move |dir| dir.rating_summary(target, &lookup)).await?;
    Ok(Json(RatingSummaryResponse {
        target_kind: target,
        target_id: id,
        summary,
    }))
}

async fn submit_ticket(
    State(state): State<AppState>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), ServerError> {
    let payload = body(payload)?;
    let ticket = blocking(&state, move |dir| dir.submit_ticket(payload)).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

// ─── Moderator ───

#[derive(Serialize)]
struct AdminStatusResponse {
    name: String,
    moderator: String,
    uptime_secs: u64,
    cache_ttl_secs: u64,
    tables: Vec<TableReport>,
}

#[derive(Deserialize)]
struct ExtendRequest {
    days: i64,
}

#[derive(Serialize)]
struct ExtendResponse {
    id: RecordId,
    expires_on: chrono::NaiveDate,
}

async fn admin_status(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AdminStatusResponse>, ServerError> {
    let session = session(&headers, &state)?;
    let moderator = session.username().to_string();
    let tables = blocking(&state, move |dir| dir.table_report(&session)).await?;

    Ok(Json(AdminStatusResponse {
        name: state.config.instance_name.clone(),
        moderator,
        uptime_secs: state.started_at.elapsed().as_secs(),
        cache_ttl_secs: state.config.cache_ttl.as_secs(),
        tables,
    }))
}

async fn admin_queue(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Queue>, ServerError> {
    let session = session(&headers, &state)?;
    let kind: TableKind = kind.parse()?;
    let queue = blocking(&state, move |dir| dir.pending_queue(&session, kind)).await?;
    debug!(%kind, waiting = queue.len(), "Moderation queue read");
    Ok(Json(queue))
}

async fn admin_approve(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Transition>, ServerError> {
    let session = session(&headers, &state)?;
    let kind: TableKind = kind.parse()?;
    let id = RecordId::from(id);
    let transition = blocking(&state, move |dir| dir.approve(&session, kind, &id)).await?;
    Ok(Json(transition))
}

async fn admin_reject(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Transition>, ServerError> {
    let session = session(&headers, &state)?;
    let kind: TableKind = kind.parse()?;
    let id = RecordId::from(id);
    let transition = blocking(&state, move |dir| dir.reject(&session, kind, &id)).await?;
    Ok(Json(transition))
}

async fn admin_extend(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    payload: Result<Json<ExtendRequest>, JsonRejection>,
) -> Result<Json<ExtendResponse>, ServerError> {
    let session = session(&headers, &state)?;
    let kind: TableKind = kind.parse()?;
    let req = body(payload)?;
    let id = RecordId::from(id);
    let target = id.clone();
    let expires_on =
        blocking(&state, move |dir| dir.extend(&session, kind, &target, req.days)).await?;
    Ok(Json(ExtendResponse { id, expires_on }))
}

async fn admin_tickets(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Ticket>>, ServerError> {
    let session = session(&headers, &state)?;
    let tickets = blocking(&state, move |dir| dir.list_tickets(&session)).await?;
    Ok(Json(tickets))
}

async fn admin_close_ticket(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = session(&headers, &state)?;
    let id = RecordId::from(id);
    let target = id.clone();
    blocking(&state, move |dir| dir.close_ticket(&session, &target)).await?;
    Ok(Json(serde_json::json!({ "id": id, "closed": true })))
}

async fn admin_post_showcase(
    headers: HeaderMap,
    State(state): State<AppState>,
    payload: Result<Json<NewShowcase>, JsonRejection>,
) -> Result<(StatusCode, Json<ShowcaseItem>), ServerError> {
    let session = session(&headers, &state)?;
    let payload = body(payload)?;
    let item = blocking(&state, move |dir| dir.post_showcase(&session, payload)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn admin_listing_on_behalf(
    headers: HeaderMap,
    State(state): State<AppState>,
    payload: Result<Json<NewListing>, JsonRejection>,
) -> Result<(StatusCode, Json<Listing>), ServerError> {
    let session = session(&headers, &state)?;
    let payload = body(payload)?;
    let listing =
        blocking(&state, move |dir| dir.submit_listing_on_behalf(&session, payload)).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn admin_vendor_on_behalf(
    headers: HeaderMap,
    State(state): State<AppState>,
    payload: Result<Json<NewVendor>, JsonRejection>,
) -> Result<(StatusCode, Json<Vendor>), ServerError> {
    let session = session(&headers, &state)?;
    let payload = body(payload)?;
    let vendor =
        blocking(&state, move |dir| dir.submit_vendor_on_behalf(&session, payload)).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
