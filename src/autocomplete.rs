//! Cliente del endpoint público de autocompletado de Google y throttle
//! de cliente para respetar su límite de peticiones.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{ResearchError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fuente de completados para un prefijo. Abstrae la red para poder usar
/// fakes deterministas en los tests.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<String>>;
}

pub struct GoogleAutocomplete {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleAutocomplete {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn request(&self, query: &str) -> std::result::Result<Value, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .query(&[("client", "firefox"), ("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl SuggestionSource for GoogleAutocomplete {
    async fn lookup(&self, query: &str) -> Result<Vec<String>> {
        debug!(query, "Consultando autocompletado");

        // Un único reintento ante errores transitorios (conexión o timeout).
        let body = match self.request(query).await {
            Ok(body) => body,
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!(query, error = %e, "Error transitorio en autocompletado, reintentando");
                self.request(query).await?
            }
            Err(e) => return Err(e.into()),
        };

        parse_suggestions(&body)
    }
}

/// El endpoint responde `[consulta, [sugerencia, ...], ...]`.
pub fn parse_suggestions(body: &Value) -> Result<Vec<String>> {
    let list = body
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| ResearchError::upstream("autocomplete", "respuesta con formato inesperado"))?;

    Ok(list
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// Garantiza un intervalo mínimo entre llamadas salientes consecutivas.
/// Se comparte entre todas las búsquedas de un mismo investigador.
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    /// Levanta `router` en un puerto local libre y devuelve su URL base.
    pub(crate) async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Ruta de autocompletado que cuenta las peticiones recibidas.
    fn counting_route<F, Fut, R>(hits: Arc<AtomicUsize>, respond: F) -> Router
    where
        F: Fn(usize) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = R> + Send + 'static,
        R: axum::response::IntoResponse + 'static,
    {
        Router::new().route(
            "/complete/search",
            get(move || {
                let attempt = hits.fetch_add(1, Ordering::SeqCst);
                respond(attempt)
            }),
        )
    }

    #[test]
    fn parses_firefox_client_payload() {
        let body = json!(["seo", ["seo tools", "seo meaning", 42, "seo course"], [], {}]);
        let parsed = assert_ok!(parse_suggestions(&body));
        assert_eq!(parsed, vec!["seo tools", "seo meaning", "seo course"]);
    }

    #[test]
    fn rejects_unexpected_payload() {
        assert_err!(parse_suggestions(&json!({"suggestions": []})));
        assert_err!(parse_suggestions(&json!(["seo"])));
    }

    #[tokio::test]
    async fn google_client_reads_endpoint_payload() {
        let router = Router::new().route(
            "/complete/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let q = params.get("q").cloned().unwrap_or_default();
                let client = params.get("client").cloned().unwrap_or_default();
                Json(json!([q, [format!("{q} tools"), format!("{q} {client}")]]))
            }),
        );
        let base = spawn_server(router).await;
        let source =
            GoogleAutocomplete::new(&format!("{base}/complete/search"), Duration::from_secs(2)).unwrap();

        let found = assert_ok!(source.lookup("seo course").await);
        assert_eq!(found, vec!["seo course tools", "seo course firefox"]);
    }

    #[tokio::test]
    async fn error_status_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_route(hits.clone(), |_| async { StatusCode::SERVICE_UNAVAILABLE });
        let base = spawn_server(router).await;
        let source =
            GoogleAutocomplete::new(&format!("{base}/complete/search"), Duration::from_secs(2)).unwrap();

        let err = assert_err!(source.lookup("seo").await);
        assert!(matches!(err, ResearchError::UpstreamUnavailable { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_is_retried_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_route(hits.clone(), |attempt| async move {
            if attempt == 0 {
                sleep(Duration::from_millis(800)).await;
            }
            Json(json!(["seo", ["seo tools"]]))
        });
        let base = spawn_server(router).await;
        let source = GoogleAutocomplete::new(
            &format!("{base}/complete/search"),
            Duration::from_millis(200),
        )
        .unwrap();

        let found = assert_ok!(source.lookup("seo").await);
        assert_eq!(found, vec!["seo tools"]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_timeout_gives_up_after_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_route(hits.clone(), |_| async {
            sleep(Duration::from_millis(800)).await;
            Json(json!(["seo", []]))
        });
        let base = spawn_server(router).await;
        let source = GoogleAutocomplete::new(
            &format!("{base}/complete/search"),
            Duration::from_millis(150),
        )
        .unwrap();

        let err = assert_err!(source.lookup("seo").await);
        assert!(matches!(err, ResearchError::UpstreamUnavailable { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source =
            GoogleAutocomplete::new(&format!("http://{addr}/complete/search"), Duration::from_secs(1))
                .unwrap();
        let err = assert_err!(source.lookup("seo").await);
        assert!(matches!(err, ResearchError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn throttle_spaces_consecutive_calls() {
        let throttle = Throttle::new(Duration::from_millis(60));
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn first_call_is_not_delayed() {
        let throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
