use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock;
use crate::models::{ActiveClient, Client, ClientData, Level, NewReport, Report, Space, SpacePatch, Ticket};
use crate::registry::{paginate, to_whatsapp_phone, OccupancyStats, Page, RegistryError};
use crate::reports::{self, Backup, ReportsClient, ReportsError};
use crate::service::ParkingService;
use crate::whatsapp::WhatsAppLinks;

/// Path the reports list page uses to reach this API.
const API_BASE_PATH: &str = "/api";

pub struct AppState {
    pub service: Arc<ParkingService>,
    pub reports: Arc<ReportsClient>,
    /// Offset used for timestamps printed in reports and messages
    pub display_offset: FixedOffset,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn success(message: impl Into<String>) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: message.into(),
    })
}

fn registry_error(err: RegistryError) -> ApiError {
    let status = match &err {
        RegistryError::SpaceNotFound(_)
        | RegistryError::LevelNotFound(_)
        | RegistryError::DestinationNotFound(_)
        | RegistryError::SpaceNotOccupied(_) => StatusCode::NOT_FOUND,
        RegistryError::KeyExists(_)
        | RegistryError::KeyExistsAtDestination(_)
        | RegistryError::NameExistsAtDestination(_) => StatusCode::CONFLICT,
        RegistryError::Ticket(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, err.to_string())
}

fn reports_error(err: ReportsError) -> ApiError {
    match err {
        ReportsError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        other => {
            tracing::error!("Report backend request failed: {}", other);
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("Error al comunicarse con el servidor de reportes: {other}"),
            )
        }
    }
}

/// A space together with its occupant, as shown on the level grid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceView {
    #[serde(flatten)]
    pub space: Space,
    pub client: Option<Client>,
    pub search_hit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket: Ticket,
    /// Payload to encode in the QR image
    pub qr_text: String,
    pub caption: String,
}

impl TicketResponse {
    fn new(ticket: Ticket) -> Result<Self, ApiError> {
        let qr_text = ticket
            .to_json()
            .map_err(|e| registry_error(RegistryError::Ticket(e.to_string())))?;
        Ok(Self {
            caption: ticket.caption(),
            qr_text,
            ticket,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupyResponse {
    pub client: Client,
    pub ticket: TicketResponse,
    pub whatsapp: WhatsAppLinks,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: Option<Client>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    5
}

#[derive(Deserialize)]
pub struct CountRequest {
    pub count: usize,
}

#[derive(Deserialize)]
pub struct RenameLevelRequest {
    pub label: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSpaceRequest {
    /// New key; the current key is kept when absent
    #[serde(default)]
    pub key: Option<String>,
    #[serde(flatten)]
    pub patch: SpacePatch,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub subsuelo_id: String,
}

#[derive(Deserialize)]
pub struct HoldRequest {
    pub hold: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub name: String,
    pub phone: String,
    pub space_key: String,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Deserialize)]
pub struct ResetQuery {
    /// Drop levels and spaces too, not only the occupancy
    #[serde(default)]
    pub all: bool,
}

pub async fn health_check() -> Json<SuccessResponse> {
    success("OK")
}

// Levels

pub async fn list_levels(State(state): State<Arc<AppState>>) -> Json<Vec<Level>> {
    Json(state.service.read(|r| r.levels().to_vec()).await)
}

pub async fn create_level(State(state): State<Arc<AppState>>) -> ApiResult<(StatusCode, Json<Level>)> {
    let level = state.service.add_level().await.map_err(registry_error)?;
    Ok((StatusCode::CREATED, Json(level)))
}

pub async fn rename_level(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RenameLevelRequest>,
) -> ApiResult<Json<Level>> {
    state
        .service
        .mutate(|r| {
            r.rename_level(&id, &payload.label)?;
            r.level(&id)
                .cloned()
                .ok_or_else(|| RegistryError::LevelNotFound(id.clone()))
        })
        .await
        .map(Json)
        .map_err(registry_error)
}

pub async fn delete_level(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    state.service.delete_level(&id).await.map_err(registry_error)?;
    Ok(success(format!("Subsuelo {id} eliminado")))
}

pub async fn list_level_spaces(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SpaceView>>> {
    state
        .service
        .read(|r| {
            if r.level(&id).is_none() {
                return Err(RegistryError::LevelNotFound(id.clone()));
            }
            Ok(r.level_spaces(&id)
                .into_iter()
                .map(|space| SpaceView {
                    client: r.client_for_space(&space.key).cloned(),
                    search_hit: r.is_search_hit(space, &query.q),
                    space: space.clone(),
                })
                .collect::<Vec<_>>())
        })
        .await
        .map(Json)
        .map_err(registry_error)
}

pub async fn add_level_spaces(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CountRequest>,
) -> ApiResult<(StatusCode, Json<Vec<String>>)> {
    let keys = state
        .service
        .add_spaces(&id, payload.count)
        .await
        .map_err(registry_error)?;
    Ok((StatusCode::CREATED, Json(keys)))
}

pub async fn delete_level_spaces(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CountRequest>,
) -> ApiResult<Json<Vec<String>>> {
    state
        .service
        .delete_spaces(&id, query.count)
        .await
        .map(Json)
        .map_err(registry_error)
}

// Spaces

pub async fn get_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<SpaceView>> {
    state
        .service
        .read(|r| {
            let space = r
                .space(&key)
                .ok_or_else(|| RegistryError::SpaceNotFound(key.clone()))?;
            Ok(SpaceView {
                client: r.client_for_space(&key).cloned(),
                search_hit: false,
                space: space.clone(),
            })
        })
        .await
        .map(Json)
        .map_err(registry_error)
}

pub async fn edit_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<EditSpaceRequest>,
) -> ApiResult<Json<Space>> {
    let new_key = payload.key.unwrap_or_else(|| key.clone());
    state
        .service
        .edit_space(&key, &new_key, payload.patch)
        .await
        .map(Json)
        .map_err(registry_error)
}

pub async fn delete_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    state.service.delete_space(&key).await.map_err(registry_error)?;
    Ok(success(format!("Espacio {key} eliminado")))
}

pub async fn occupy_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<ClientData>,
) -> ApiResult<(StatusCode, Json<OccupyResponse>)> {
    let client = state
        .service
        .occupy(&key, payload)
        .await
        .map_err(registry_error)?;

    let (ticket, whatsapp) = state
        .service
        .read(|r| {
            let ticket = r.ticket(&key)?;
            let space = r
                .space(&key)
                .ok_or_else(|| RegistryError::SpaceNotFound(key.clone()))?;
            let label = r
                .level(&space.subsuelo_id)
                .map(|l| l.label.clone())
                .unwrap_or_else(|| space.subsuelo_id.clone());
            Ok((ticket, WhatsAppLinks::new(&client, space, &label, state.display_offset)))
        })
        .await
        .map_err(registry_error)?;

    Ok((
        StatusCode::CREATED,
        Json(OccupyResponse {
            client,
            ticket: TicketResponse::new(ticket)?,
            whatsapp,
        }),
    ))
}

pub async fn release_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<ReleaseResponse>> {
    let released = state
        .service
        .mutate(|r| {
            if r.space(&key).is_none() {
                return Err(RegistryError::SpaceNotFound(key.clone()));
            }
            Ok(r.release(&key))
        })
        .await
        .map_err(registry_error)?;
    Ok(Json(ReleaseResponse { released }))
}

pub async fn transfer_space(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<TransferRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .service
        .transfer_space(&key, &payload.subsuelo_id)
        .await
        .map_err(registry_error)?;
    Ok(success(format!("Espacio {key} transferido a {}", payload.subsuelo_id)))
}

pub async fn set_hold(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<HoldRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    state
        .service
        .set_hold(&key, payload.hold)
        .await
        .map_err(registry_error)?;
    let message = if payload.hold {
        format!("Espacio {key} reservado")
    } else {
        format!("Espacio {key} liberado de reserva")
    };
    Ok(success(message))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<TicketResponse>> {
    let ticket = state.service.ticket(&key).await.map_err(registry_error)?;
    Ok(Json(TicketResponse::new(ticket)?))
}

pub async fn get_whatsapp(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<WhatsAppLinks>> {
    state
        .service
        .read(|r| {
            let client = r.occupant(&key)?;
            let space = r
                .space(&key)
                .ok_or_else(|| RegistryError::SpaceNotFound(key.clone()))?;
            let label = r
                .level(&space.subsuelo_id)
                .map(|l| l.label.as_str())
                .unwrap_or(&space.subsuelo_id);
            Ok(WhatsAppLinks::new(client, space, label, state.display_offset))
        })
        .await
        .map(Json)
        .map_err(registry_error)
}

pub async fn preview_ticket(Json(payload): Json<PreviewRequest>) -> ApiResult<Json<TicketResponse>> {
    let phone_intl = to_whatsapp_phone(&payload.phone).map_err(registry_error)?;
    let ticket = Ticket::preview(&payload.name, &phone_intl, &payload.space_key, clock::now_millis());
    Ok(Json(TicketResponse::new(ticket)?))
}

// Clients and stats

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientsQuery>,
) -> Json<Page<ActiveClient>> {
    let now = clock::now_millis();
    let clients = state.service.read(|r| r.filter_clients(&query.q, now)).await;
    Json(paginate(clients, query.page, query.page_size))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Json<OccupancyStats> {
    if query.fresh {
        Json(state.service.refresh_stats().await)
    } else {
        Json(state.service.stats().await)
    }
}

pub async fn export_backup(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();
    let backup = state.service.read(|r| Backup::from_registry(r, now)).await;
    let disposition = format!("attachment; filename=\"{}\"", reports::backup_file_name(now));
    ([(header::CONTENT_DISPOSITION, disposition)], Json(backup))
}

pub async fn live_report_html(State(state): State<Arc<AppState>>) -> Html<String> {
    let stats = state.service.refresh_stats().await;
    Html(reports::render_live_report(&stats, Utc::now(), state.display_offset))
}

pub async fn live_report_text(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = Utc::now();
    let stats = state.service.refresh_stats().await;
    let body = reports::render_text_report(&stats, now, state.display_offset);
    let disposition = format!("attachment; filename=\"{}\"", reports::report_file_name(now, "txt"));
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResetQuery>,
) -> Json<SuccessResponse> {
    if query.all {
        state.service.clear_all().await;
        success("Todos los datos fueron eliminados")
    } else {
        state.service.reset_occupancy().await;
        success("Todos los espacios fueron liberados")
    }
}

// Stored reports

pub async fn list_reports(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Report>>> {
    state.reports.list().await.map(Json).map_err(reports_error)
}

/// Snapshot the current stats and store them on the report backend.
pub async fn save_report(State(state): State<Arc<AppState>>) -> ApiResult<(StatusCode, Json<Report>)> {
    let stats = state.service.refresh_stats().await;
    let body = NewReport::from_stats(&stats, Utc::now()).map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("No se pudo armar el reporte: {e}"),
        )
    })?;
    let report = state.reports.create(&body).await.map_err(reports_error)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Report>> {
    state.reports.get(id).await.map(Json).map_err(reports_error)
}

pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    state.reports.delete(id).await.map_err(reports_error)?;
    Ok(success(format!("Reporte {id} eliminado")))
}

pub async fn report_detail_html(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Html<String>> {
    let report = state.reports.get(id).await.map_err(reports_error)?;
    Ok(Html(reports::render_report_detail(
        &report,
        clock::now_millis(),
        state.display_offset,
    )))
}

pub async fn reports_list_page() -> Html<String> {
    Html(reports::render_reports_list(API_BASE_PATH))
}
