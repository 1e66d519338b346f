use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use finpick_core::domain::analytics::{AnalyticsReport, RedirectContext, ReportMode};
use finpick_core::domain::contract::SimulateRequest;
use finpick_core::domain::product::ProductType;
use finpick_core::domain::quality::QualitySnapshot;
use finpick_core::domain::recommendation::{RecommendationRun, RunSummary};
use finpick_core::error::ServiceError;
use finpick_core::service::RecommendationService;

/// `service` is `None` when the database is configured but could not be reached.
#[derive(Clone)]
pub struct AppState {
    pub service: Option<RecommendationService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/recommendations/simulate", post(simulate))
        .route("/recommendations/history", get(history))
        .route("/recommendations/quality/latest", get(latest_quality))
        .route("/recommendations/:run_id", get(get_run))
        .route("/recommendations/:run_id/analytics", get(get_analytics))
        .route("/recommendations/:run_id/redirect", post(redirect))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unavailable,
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "database unavailable".to_string(),
            ),
            Self::Service(ServiceError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("not found: {what}"))
            }
            Self::Service(ServiceError::Validation(err)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Service(ServiceError::UpstreamUnavailable(err)) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %format!("{err:#}"), "upstream failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream unavailable".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn service(state: &AppState) -> Result<&RecommendationService, ApiError> {
    state.service.as_ref().ok_or(ApiError::Unavailable)
}

fn parse_run_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("invalid run id: {raw}")))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn simulate(
    State(state): State<AppState>,
    body: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<RecommendationRun> {
    let svc = service(&state)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(svc.simulate(request).await?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Vec<RunSummary>> {
    let svc = service(&state)?;
    Ok(Json(svc.recent_runs(q.limit).await?))
}

async fn latest_quality(State(state): State<AppState>) -> ApiResult<QualitySnapshot> {
    let svc = service(&state)?;
    Ok(Json(svc.latest_quality().await?))
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<RecommendationRun> {
    let svc = service(&state)?;
    let run_id = parse_run_id(&run_id)?;
    Ok(Json(svc.get_run(run_id).await?))
}

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    #[serde(default, alias = "includeUnclicked")]
    include_unclicked: bool,
}

async fn get_analytics(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Query(q): Query<AnalyticsQuery>,
) -> ApiResult<AnalyticsReport> {
    let svc = service(&state)?;
    let run_id = parse_run_id(&run_id)?;
    let mode = if q.include_unclicked {
        ReportMode::IncludeUnclicked
    } else {
        ReportMode::ClickedOnly
    };
    Ok(Json(svc.get_analytics(run_id, mode).await?))
}

#[derive(Debug, Deserialize)]
struct RedirectRequest {
    #[serde(alias = "productType")]
    product_type: String,
    #[serde(alias = "productId")]
    product_id: String,
}

#[derive(Debug, Serialize)]
struct RedirectResponse {
    url: String,
}

fn header_value(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address from the first `X-Forwarded-For` entry, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}

async fn redirect(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<RedirectRequest>, JsonRejection>,
) -> ApiResult<RedirectResponse> {
    let svc = service(&state)?;
    let run_id = parse_run_id(&run_id)?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let product_type = ProductType::parse(&req.product_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown product type: {}", req.product_type)))?;
    let product_id = req.product_id.trim();
    if product_id.is_empty() {
        return Err(ApiError::BadRequest("product_id is required".to_string()));
    }

    let context = RedirectContext {
        user_agent: header_value(&headers, header::USER_AGENT),
        ip_address: client_ip(&headers),
        referrer: header_value(&headers, header::REFERER),
    };
    let url = svc
        .record_redirect(run_id, product_type, product_id, context)
        .await?;
    Ok(Json(RedirectResponse { url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::Request;
    use finpick_core::catalog::seed;
    use finpick_core::service::ServiceOptions;
    use finpick_core::storage::{MemoryStore, RedirectLog};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt as _;

    const BODY_LIMIT: usize = 1024 * 1024;

    fn app_with_store() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_catalog(seed::catalog()));
        let service = RecommendationService::new(store.clone(), ServiceOptions::default());
        (
            router(AppState {
                service: Some(service),
            }),
            store,
        )
    }

    fn app() -> Router {
        app_with_store().0
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.expect("oneshot");
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
            .await
            .expect("read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn post_json(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("build POST")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("build GET")
    }

    fn profile() -> Value {
        json!({
            "age": "29",
            "income": "3,000",
            "monthlySpend": 120,
            "accountPriority": "savings",
            "cardPriority": "cashback",
            "salaryTransfer": "yes",
            "travelLevel": "none",
            "cardCategories": ["online", "grocery"]
        })
    }

    async fn simulate_run(app: &Router) -> Value {
        let (status, run) = send(app, post_json("/recommendations/simulate", profile())).await;
        assert_eq!(status, StatusCode::OK, "simulate failed: {run}");
        run
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = app().oneshot(get("/healthz")).await.expect("oneshot");
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("body");
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn simulate_then_fetch_run() {
        let app = app();
        let run = simulate_run(&app).await;
        let run_id = run["run_id"].as_str().expect("run_id");
        assert!(run["accounts"].as_array().is_some_and(|a| !a.is_empty()));
        assert!(run["bundles"].as_array().is_some_and(|b| b.len() <= 3));

        let (status, fetched) = send(&app, get(&format!("/recommendations/{run_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["run_id"], run["run_id"]);
    }

    #[tokio::test]
    async fn out_of_range_age_is_bad_request() {
        let mut payload = profile();
        payload["age"] = json!(15);
        let (status, body) = send(&app(), post_json("/recommendations/simulate", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("age")));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/recommendations/simulate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("build");
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn unknown_run_is_404_and_bad_id_is_400() {
        let app = app();
        let (status, body) = send(&app, get(&format!("/recommendations/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("error").is_some());

        let (status, _) = send(&app, get("/recommendations/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn redirect_records_context_and_shows_in_analytics() {
        let (app, store) = app_with_store();
        let run = simulate_run(&app).await;
        let run_id = run["run_id"].as_str().expect("run_id").to_string();
        let card_id = run["cards"][0]["product_id"].as_str().expect("card id").to_string();

        let req = Request::builder()
            .method("POST")
            .uri(format!("/recommendations/{run_id}/redirect"))
            .header("content-type", "application/json")
            .header("user-agent", "finpick-test")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("referer", "https://finpick.example/result")
            .body(Body::from(
                json!({ "productType": "card", "productId": card_id }).to_string(),
            ))
            .expect("build redirect");
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK, "redirect failed: {body}");
        assert!(body["url"].as_str().is_some_and(|u| u.starts_with("http")));

        let events = store
            .list_for(Uuid::parse_str(&run_id).expect("uuid"))
            .await
            .expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(events[0].user_agent.as_deref(), Some("finpick-test"));
        assert_eq!(
            events[0].referrer.as_deref(),
            Some("https://finpick.example/result")
        );

        let (status, report) = send(
            &app,
            get(&format!("/recommendations/{run_id}/analytics?include_unclicked=true")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["total_redirects"], 1);
        assert_eq!(report["top_clicked_products"][0]["product_id"], json!(card_id));
        assert!(report["top_clicked_products"].as_array().is_some_and(|a| a.len() > 1));
    }

    #[tokio::test]
    async fn redirect_to_product_outside_run_is_404() {
        let app = app();
        let run = simulate_run(&app).await;
        let run_id = run["run_id"].as_str().expect("run_id");

        let (status, _) = send(
            &app,
            post_json(
                &format!("/recommendations/{run_id}/redirect"),
                json!({ "product_type": "CARD", "product_id": "missing" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            post_json(
                &format!("/recommendations/{run_id}/redirect"),
                json!({ "product_type": "loan", "product_id": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_lists_recent_runs() {
        let app = app();
        simulate_run(&app).await;
        simulate_run(&app).await;

        let (status, body) = send(&app, get("/recommendations/history?limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let (_, body) = send(&app, get("/recommendations/history")).await;
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[0]["redirect_count"], 0);
    }

    #[tokio::test]
    async fn quality_latest_serves_placeholder() {
        let (status, body) = send(&app(), get("/recommendations/quality/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trigger_source"], "none");
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn degraded_mode_returns_503() {
        let app = router(AppState { service: None });
        let (status, body) = send(&app, post_json("/recommendations/simulate", profile())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("error").is_some());

        let resp = app.oneshot(get("/healthz")).await.expect("oneshot");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
