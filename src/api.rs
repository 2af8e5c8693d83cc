// REST API over the loaded dataset (feature "server").
// bin/server.rs owns the runtime and the listener; this module only builds the router.

use crate::aggregate::select_commune;
use crate::dataset::Dataset;
use crate::presenter::{DashboardView, NO_DATA_MESSAGE};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared application state
#[derive(Clone, Copy)]
pub struct AppState {
    pub dataset: &'static Dataset,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn fail(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    rows: usize,
    communes: usize,
    loaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check with dataset size
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = state.dataset;
    Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        version: crate::VERSION,
        rows: dataset.len(),
        communes: dataset.communes().len(),
        loaded_at: dataset.loaded_at(),
        source: dataset.source().map(|p| p.display().to_string()),
    }))
}

/// GET /api/communes - Distinct communes in first-seen order
async fn list_communes(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.dataset.communes().to_vec()))
}

/// GET /api/trends/:commune - Dashboard view for one commune
async fn get_trends(
    State(state): State<AppState>,
    Path(commune): Path<String>,
) -> impl IntoResponse {
    let selection = select_commune(state.dataset, &commune);
    let view = DashboardView::from_selection(&selection);

    if view.is_no_data() {
        warn!(commune = view.commune(), "trends requested for unknown commune");
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail(view, NO_DATA_MESSAGE)),
        );
    }

    (StatusCode::OK, Json(ApiResponse::ok(view)))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/communes", get(list_communes))
        .route("/trends/:commune", get(get_trends))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Transaction;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> AppState {
        let dataset = Dataset::from_records(vec![
            Transaction::new("Paris", "Appartement", 2020, 9000.0),
            Transaction::new("Paris", "Appartement", 2021, 9500.0),
            Transaction::new("Saint-Étienne", "Maison", 2021, 1700.0),
            Transaction::new("Saint-Étienne", "Maison", 2022, 1800.0),
        ]);
        AppState {
            dataset: Box::leak(Box::new(dataset)),
        }
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = create_router(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "OK");
        assert_eq!(body["data"]["rows"], 4);
        assert_eq!(body["data"]["communes"], 2);
    }

    #[tokio::test]
    async fn test_communes_in_first_seen_order() {
        let (status, body) = get_json("/api/communes").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!(["Paris", "Saint-Étienne"]));
    }

    #[tokio::test]
    async fn test_trends_for_known_commune() {
        let (status, body) = get_json("/api/trends/Paris").await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["status"], "report");
        assert_eq!(data["panels"][0]["metric"]["value"], "9,500€/m²");
        assert_eq!(data["panels"][0]["metric"]["delta"], "5.56% depuis 12 mois");
        assert_eq!(data["panels"][0]["chart"]["x_ticks"], serde_json::json!([2020, 2021]));
        assert_eq!(data["panels"][1]["metric"]["value"], "N/A");
    }

    #[tokio::test]
    async fn test_trends_for_accented_commune() {
        let uri = format!("/api/trends/{}", urlencoding::encode("Saint-Étienne"));

        let (status, body) = get_json(&uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["commune"], "Saint-Étienne");
        assert_eq!(body["data"]["panels"][1]["metric"]["value"], "1,800€/m²");
    }

    #[tokio::test]
    async fn test_unknown_commune_is_404_with_message() {
        let (status, body) = get_json("/api/trends/Atlantis").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], NO_DATA_MESSAGE);
        assert_eq!(body["data"]["status"], "no_data");
    }

    #[tokio::test]
    async fn test_index_page_served() {
        let response = create_router(state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/api/communes"));
    }
}
