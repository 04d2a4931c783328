use axum::{
    routing::{get, post, put},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{
    add_level_spaces, create_level, delete_level, delete_level_spaces, delete_report, delete_space, edit_space,
    export_backup, get_report, get_space, get_stats, get_ticket, get_whatsapp, health_check, list_clients,
    list_level_spaces, list_levels, list_reports, live_report_html, live_report_text, occupy_space, preview_ticket,
    release_space, rename_level, report_detail_html, reports_list_page, reset, save_report, set_hold,
    transfer_space, AppState,
};

pub fn create_api_router(state: Arc<AppState>, static_dir: Option<String>) -> Router {
    let api_routes = Router::new()
        .route("/levels", get(list_levels).post(create_level))
        .route("/levels/{id}", put(rename_level).delete(delete_level))
        .route(
            "/levels/{id}/spaces",
            get(list_level_spaces)
                .post(add_level_spaces)
                .delete(delete_level_spaces),
        )
        .route("/spaces/{key}", get(get_space).put(edit_space).delete(delete_space))
        .route("/spaces/{key}/occupy", post(occupy_space))
        .route("/spaces/{key}/release", post(release_space))
        .route("/spaces/{key}/transfer", post(transfer_space))
        .route("/spaces/{key}/hold", put(set_hold))
        .route("/spaces/{key}/ticket", get(get_ticket))
        .route("/spaces/{key}/whatsapp", get(get_whatsapp))
        .route("/ticket/preview", post(preview_ticket))
        .route("/clients", get(list_clients))
        .route("/stats", get(get_stats))
        .route("/export", get(export_backup))
        .route("/report.html", get(live_report_html))
        .route("/report.txt", get(live_report_text))
        .route("/reset", post(reset))
        .route("/reports", get(list_reports).post(save_report))
        .route("/reports.html", get(reports_list_page))
        .route("/reports/{id}", get(get_report).delete(delete_report))
        .route("/reports/{id}/html", get(report_detail_html))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes);

    // Single page frontend: unknown paths fall back to index.html
    if let Some(dir) = static_dir {
        let index = Path::new(&dir).join("index.html");
        router = router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}
