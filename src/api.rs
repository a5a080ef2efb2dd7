use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    app_state::AppState,
    difficulty::estimate_difficulty,
    error::ResearchError,
    models::{BatchOutcome, Competition, KeywordResult, SimilarWebData},
};

const MAX_BATCH_KEYWORDS: usize = 100;
const SERVICE_NAME: &str = "Keyword Research Tool";

type ApiError = (StatusCode, Json<serde_json::Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Payloads y Respuestas de la API ---

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ResearchPayload {
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default = "default_true")]
    include_related: bool,
    domain: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchPayload {
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    include_related: bool,
}

#[derive(Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    keyword: String,
    max_results: Option<usize>,
}

#[derive(Deserialize)]
pub struct DomainQuery {
    #[serde(default)]
    domain: String,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    keyword: String,
    suggestions: Vec<String>,
}

#[derive(Serialize)]
pub struct QuestionsResponse {
    keyword: String,
    questions: Vec<String>,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    keyword: String,
    difficulty: u8,
    competition: Competition,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api", get(index_handler))
        .route("/api/keyword/research", post(research_handler))
        .route("/api/keyword/batch", post(batch_handler))
        .route("/api/keyword/suggestions", get(suggestions_handler))
        .route("/api/keyword/questions", get(questions_handler))
        .route("/api/keyword/difficulty", get(difficulty_handler))
        .route("/api/similarweb/domain", get(similarweb_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

#[axum::debug_handler]
async fn index_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "integrations": {
            "similarweb": state.researcher.similarweb_enabled(),
            "ai_insights": state.researcher.ai_insights_enabled()
        },
        "endpoints": {
            "POST /api/keyword/research": "Investiga una keyword",
            "POST /api/keyword/batch": "Investiga varias keywords (máx. 100)",
            "GET /api/keyword/suggestions": "Sugerencias de autocompletado",
            "GET /api/keyword/questions": "Preguntas relacionadas",
            "GET /api/keyword/difficulty": "Dificultad estimada",
            "GET /api/similarweb/domain": "Datos de tráfico de un dominio",
            "GET /health": "Health check"
        }
    }))
}

#[axum::debug_handler]
async fn research_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResearchPayload>, JsonRejection>,
) -> ApiResult<KeywordResult> {
    let Json(payload) = payload.map_err(reject_json)?;
    state
        .researcher
        .research_keyword(
            payload.keyword.as_deref().unwrap_or_default(),
            payload.include_related,
            payload.domain.as_deref(),
        )
        .await
        .map(Json)
        .map_err(into_api_error)
}

#[axum::debug_handler]
async fn batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchPayload>, JsonRejection>,
) -> ApiResult<Vec<BatchOutcome>> {
    let Json(payload) = payload.map_err(reject_json)?;
    let keywords = payload
        .keywords
        .ok_or_else(|| bad_request("Falta el parámetro keywords".to_string()))?;
    if keywords.len() > MAX_BATCH_KEYWORDS {
        return Err(bad_request(format!(
            "Máximo {MAX_BATCH_KEYWORDS} keywords por petición"
        )));
    }

    let outcomes = state
        .researcher
        .batch_research(&keywords, payload.include_related)
        .await;
    Ok(Json(outcomes))
}

#[axum::debug_handler]
async fn suggestions_handler(
    State(state): State<AppState>,
    Query(params): Query<KeywordQuery>,
) -> ApiResult<SuggestionsResponse> {
    let max_results = params
        .max_results
        .unwrap_or(state.researcher.config().max_results);

    let suggestions = degrade(
        state
            .researcher
            .fetch_suggestions(&params.keyword, max_results)
            .await,
    )?;

    Ok(Json(SuggestionsResponse {
        keyword: params.keyword.trim().to_string(),
        suggestions,
    }))
}

#[axum::debug_handler]
async fn questions_handler(
    State(state): State<AppState>,
    Query(params): Query<KeywordQuery>,
) -> ApiResult<QuestionsResponse> {
    let max_results = params
        .max_results
        .unwrap_or(state.researcher.config().max_results);

    let questions = degrade(
        state
            .researcher
            .fetch_questions(&params.keyword, max_results)
            .await,
    )?;

    Ok(Json(QuestionsResponse {
        keyword: params.keyword.trim().to_string(),
        questions,
    }))
}

#[axum::debug_handler]
async fn difficulty_handler(Query(params): Query<KeywordQuery>) -> ApiResult<DifficultyResponse> {
    let keyword = params.keyword.trim();
    if keyword.is_empty() {
        return Err(bad_request("Falta el parámetro keyword".to_string()));
    }

    let (difficulty, competition) = estimate_difficulty(keyword);
    Ok(Json(DifficultyResponse {
        keyword: keyword.to_string(),
        difficulty,
        competition,
    }))
}

#[axum::debug_handler]
async fn similarweb_handler(
    State(state): State<AppState>,
    Query(params): Query<DomainQuery>,
) -> ApiResult<SimilarWebData> {
    state
        .researcher
        .domain_data(&params.domain)
        .await
        .map(Json)
        .map_err(into_api_error)
}

// --- Utilidades ---

/// Los fallos del autocompletado se sirven como lista vacía; sólo la
/// entrada no válida llega al cliente como error.
fn degrade(result: Result<Vec<String>, ResearchError>) -> Result<Vec<String>, ApiError> {
    match result {
        Ok(items) => Ok(items),
        Err(ResearchError::InvalidInput(msg)) => Err(bad_request(msg)),
        Err(e) => {
            warn!("Autocompletado no disponible: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Cuerpo ausente, mal formado o con tipos incorrectos: 400 con el mismo
/// formato `{"error": ...}` que el resto de errores.
fn reject_json(rejection: JsonRejection) -> ApiError {
    bad_request(rejection.body_text())
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn into_api_error(err: ResearchError) -> ApiError {
    let status = match &err {
        ResearchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ResearchError::Disabled(_) => StatusCode::SERVICE_UNAVAILABLE,
        ResearchError::UpstreamUnavailable { .. } | ResearchError::SuggestionFetchFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    if status != StatusCode::BAD_REQUEST {
        error!("Error atendiendo la petición: {}", err);
    }
    (status, Json(json!({ "error": err.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ResearchConfig};
    use crate::research::KeywordResearcher;
    use crate::suggestions::tests::FakeSource;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(source: FakeSource) -> Router {
        let research = ResearchConfig {
            autocomplete_delay: Duration::ZERO,
            batch_delay: Duration::ZERO,
            ..ResearchConfig::default()
        };
        let config = AppConfig {
            server_addr: "127.0.0.1:0".to_string(),
            frontend_dir: "frontend".to_string(),
            research: research.clone(),
        };
        let researcher = KeywordResearcher::new(research, Arc::new(source), None, None);
        create_router(AppState::new(config, researcher))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(app(FakeSource::new()), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn research_without_related() {
        let payload = json!({"keyword": "digital marketing", "include_related": false});
        let (status, body) = send(
            app(FakeSource::new()),
            post_json("/api/keyword/research", payload),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keyword"], "digital marketing");
        let difficulty = body["difficulty"].as_u64().unwrap();
        assert!(difficulty <= 100);
        assert!(["Low", "Medium", "High"].contains(&body["competition"].as_str().unwrap()));
        assert_eq!(body["trend"], "Stable");
        assert_eq!(body["related_keywords"], json!([]));
        assert_eq!(body["questions"], json!([]));
        assert!(body["similarweb_data"].is_null());
    }

    #[tokio::test]
    async fn research_rejects_empty_keyword() {
        let (status, body) = send(
            app(FakeSource::new()),
            post_json("/api/keyword/research", json!({"keyword": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn research_rejects_missing_or_malformed_body() {
        for payload in [json!({}), json!({"keyword": null}), json!({"keyword": 42})] {
            let (status, body) = send(
                app(FakeSource::new()),
                post_json("/api/keyword/research", payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }

        let request = Request::builder()
            .method("POST")
            .uri("/api/keyword/research")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(FakeSource::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn research_includes_related_by_default() {
        let source = FakeSource::new().on("seo", &["seo tools"]);
        let (status, body) = send(
            app(source),
            post_json("/api/keyword/research", json!({"keyword": "seo"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["related_keywords"], json!(["seo tools"]));
    }

    #[tokio::test]
    async fn batch_keeps_order_and_marks_failures() {
        let payload = json!({"keywords": ["seo", "", "software"]});
        let (status, body) = send(
            app(FakeSource::new()),
            post_json("/api/keyword/batch", payload),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["keyword"], "seo");
        assert!(entries[1]["error"].is_string());
        assert_eq!(entries[2]["keyword"], "software");
        assert_eq!(entries[2]["competition"], "High");
    }

    #[tokio::test]
    async fn batch_requires_keyword_list() {
        for payload in [json!({}), json!({"keywords": null}), json!({"keywords": "seo"})] {
            let (status, body) = send(
                app(FakeSource::new()),
                post_json("/api/keyword/batch", payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn batch_rejects_more_than_limit() {
        let keywords: Vec<String> = (0..=MAX_BATCH_KEYWORDS).map(|i| format!("kw {i}")).collect();
        let (status, _) = send(
            app(FakeSource::new()),
            post_json("/api/keyword/batch", json!({ "keywords": keywords })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn suggestions_endpoint() {
        let source = FakeSource::new().on("seo", &["seo tools", "SEO TOOLS", "seo jobs", "seo course"]);
        let (status, body) = send(
            app(source),
            get_req("/api/keyword/suggestions?keyword=seo&max_results=2"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"keyword": "seo", "suggestions": ["seo tools", "seo jobs"]}));
    }

    #[tokio::test]
    async fn suggestions_degrade_when_offline() {
        let (status, body) = send(
            app(FakeSource::offline()),
            get_req("/api/keyword/suggestions?keyword=seo"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"], json!([]));
    }

    #[tokio::test]
    async fn suggestions_require_keyword() {
        let (status, _) = send(app(FakeSource::new()), get_req("/api/keyword/suggestions")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn suggestions_echo_trimmed_keyword() {
        let source = FakeSource::new().on("seo", &["seo tools"]);
        let (status, body) = send(
            app(source),
            get_req("/api/keyword/suggestions?keyword=%20seo%20&max_results=1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"keyword": "seo", "suggestions": ["seo tools"]}));

        let (_, body) = send(
            app(FakeSource::new()),
            get_req("/api/keyword/questions?keyword=%20seo%20"),
        )
        .await;
        assert_eq!(body["keyword"], "seo");
    }

    #[tokio::test]
    async fn questions_endpoint() {
        let source = FakeSource::new().on("how to seo", &["how to seo my website"]);
        let (status, body) = send(app(source), get_req("/api/keyword/questions?keyword=seo")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"], json!(["how to seo my website"]));
    }

    #[tokio::test]
    async fn difficulty_endpoint() {
        let (status, body) = send(
            app(FakeSource::new()),
            get_req("/api/keyword/difficulty?keyword=software"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"keyword": "software", "difficulty": 85, "competition": "High"})
        );
    }

    #[tokio::test]
    async fn index_lists_integrations() {
        let (status, body) = send(app(FakeSource::new()), get_req("/api")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["integrations"]["similarweb"], false);
        assert!(body["endpoints"]["GET /health"].is_string());
    }

    #[tokio::test]
    async fn similarweb_unavailable_without_adapter() {
        let (status, _) = send(
            app(FakeSource::new()),
            get_req("/api/similarweb/domain?domain=example.com"),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn similarweb_requires_domain_before_adapter_check() {
        let (status, body) = send(app(FakeSource::new()), get_req("/api/similarweb/domain")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
