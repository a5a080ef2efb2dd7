//! Integración con la API REST de SimilarWeb (tráfico, ranking y canales
//! de un dominio). Es un paso directo: no se calcula nada localmente.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Months, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ResearchError, Result};
use crate::models::SimilarWebData;

const TOP_COUNTRIES_LIMIT: usize = 5;

/// Proveedor de datos de tráfico para un dominio.
#[async_trait]
pub trait TrafficProvider: Send + Sync {
    async fn domain_data(&self, domain: &str) -> Result<SimilarWebData>;
}

pub struct SimilarWebClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- Formas de respuesta de cada endpoint ---

#[derive(Debug, Deserialize)]
struct RankResponse {
    similar_rank: RankValue,
}

#[derive(Debug, Deserialize)]
struct RankValue {
    rank: u64,
}

#[derive(Debug, Deserialize)]
struct VisitsResponse {
    visits: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct UniqueVisitorsResponse {
    unique_visitors: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct BounceRateResponse {
    bounce_rate: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct PagesPerVisitResponse {
    pages_per_visit: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct VisitDurationResponse {
    average_visit_duration: Vec<Point>,
}

/// Punto mensual de una serie: `{ "date": "...", "<métrica>": valor }`.
#[derive(Debug, Deserialize)]
struct Point {
    #[serde(flatten)]
    values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    channels: Vec<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CountriesResponse {
    records: Vec<CountryRecord>,
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    country: String,
    #[serde(default)]
    share: f64,
}

/// Canales que se exponen: (clave en la respuesta, nombre publicado).
const CHANNELS: &[(&str, &str)] = &[
    ("organic_search", "organic_search"),
    ("paid_search", "paid_search"),
    ("direct", "direct"),
    ("referrals", "referrals"),
    ("social", "social"),
    ("mail", "email"),
    ("display_ads", "display_ads"),
];

impl SimilarWebClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Petición a SimilarWeb");

        let resp = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ResearchError::upstream(
                "similarweb",
                format!("status {}: {}", status.as_u16(), body),
            ));
        }

        Ok(resp.json().await?)
    }

    /// Rango de fechas: los últimos tres meses en formato `YYYY-MM`.
    fn date_range() -> (String, String) {
        let end = Utc::now().date_naive();
        let start = end.checked_sub_months(Months::new(3)).unwrap_or(end);
        (start.format("%Y-%m").to_string(), end.format("%Y-%m").to_string())
    }

    fn series_query(granularity: bool, main_domain_only: bool) -> Vec<(&'static str, String)> {
        let (start_date, end_date) = Self::date_range();
        let mut query = vec![
            ("country", "world".to_string()),
            ("start_date", start_date),
            ("end_date", end_date),
            ("main_domain_only", main_domain_only.to_string()),
        ];
        if granularity {
            query.push(("granularity", "monthly".to_string()));
        }
        query
    }
}

#[async_trait]
impl TrafficProvider for SimilarWebClient {
    /// Lanza las consultas de cada métrica en paralelo. Una métrica que
    /// falla queda vacía; sólo si fallan todas se devuelve error.
    async fn domain_data(&self, domain: &str) -> Result<SimilarWebData> {
        let domain = normalize_domain(domain)?;
        info!(domain = %domain, "Consultando SimilarWeb");

        let site = format!("/v1/website/{domain}");
        let rank_path = format!("/v1/similar-rank/{domain}/rank");
        let visits_path = format!("{site}/total-traffic-and-engagement/visits");
        let unique_path = format!("{site}/unique-visitors/total");
        let bounce_path = format!("{site}/total-traffic-and-engagement/bounce-rate");
        let pages_path = format!("{site}/total-traffic-and-engagement/pages-per-visit");
        let duration_path = format!("{site}/total-traffic-and-engagement/average-visit-duration");
        let channels_path = format!("{site}/traffic-sources/overview-share");
        let countries_path = format!("{site}/geo/traffic-by-country");

        let engagement = Self::series_query(true, false);
        let audience = Self::series_query(false, false);
        let countries_query = {
            let (start_date, end_date) = Self::date_range();
            vec![
                ("start_date", start_date),
                ("end_date", end_date),
                ("main_domain_only", "true".to_string()),
                ("limit", TOP_COUNTRIES_LIMIT.to_string()),
            ]
        };

        let (rank, visits, unique, bounce, pages, duration, channels, countries) = tokio::join!(
            self.get::<RankResponse>(&rank_path, &[]),
            self.get::<VisitsResponse>(&visits_path, &engagement),
            self.get::<UniqueVisitorsResponse>(&unique_path, &audience),
            self.get::<BounceRateResponse>(&bounce_path, &engagement),
            self.get::<PagesPerVisitResponse>(&pages_path, &engagement),
            self.get::<VisitDurationResponse>(&duration_path, &engagement),
            self.get::<ChannelsResponse>(&channels_path, &engagement),
            self.get::<CountriesResponse>(&countries_path, &countries_query),
        );

        let mut data = SimilarWebData::new(domain.clone());
        let mut failures = Vec::new();

        match rank {
            Ok(r) => data.global_rank = Some(r.similar_rank.rank),
            Err(e) => failures.push(("global_rank", e)),
        }
        match visits {
            Ok(r) => data.total_visits = latest(&r.visits, "visits").map(|v| v.round() as u64),
            Err(e) => failures.push(("total_visits", e)),
        }
        match unique {
            Ok(r) => {
                data.unique_visitors =
                    latest(&r.unique_visitors, "unique_visitors").map(|v| v.round() as u64)
            }
            Err(e) => failures.push(("unique_visitors", e)),
        }
        match bounce {
            Ok(r) => data.bounce_rate = latest(&r.bounce_rate, "bounce_rate"),
            Err(e) => failures.push(("bounce_rate", e)),
        }
        match pages {
            Ok(r) => data.pages_per_visit = latest(&r.pages_per_visit, "pages_per_visit"),
            Err(e) => failures.push(("pages_per_visit", e)),
        }
        match duration {
            Ok(r) => {
                data.avg_visit_duration =
                    latest(&r.average_visit_duration, "average_visit_duration")
            }
            Err(e) => failures.push(("avg_visit_duration", e)),
        }
        match channels {
            Ok(r) => data.traffic_sources = channel_shares(&r.channels),
            Err(e) => failures.push(("traffic_sources", e)),
        }
        match countries {
            Ok(r) => data.top_countries = country_shares(r.records),
            Err(e) => failures.push(("top_countries", e)),
        }

        const METRICS: usize = 8;
        if failures.len() == METRICS {
            let last = failures.pop().map(|(_, e)| e.to_string()).unwrap_or_default();
            return Err(ResearchError::upstream(
                "similarweb",
                format!("ninguna métrica disponible para {domain}: {last}"),
            ));
        }
        for (metric, e) in &failures {
            warn!(domain = %domain, metric, error = %e, "Métrica de SimilarWeb no disponible");
        }

        Ok(data)
    }
}

/// Último valor numérico de una serie mensual.
fn latest(points: &[Point], key: &str) -> Option<f64> {
    points.last()?.values.get(key)?.as_f64()
}

fn channel_shares(channels: &[BTreeMap<String, serde_json::Value>]) -> BTreeMap<String, f64> {
    let Some(latest) = channels.last() else {
        return BTreeMap::new();
    };
    CHANNELS
        .iter()
        .map(|(source_key, name)| {
            let share = latest.get(*source_key).and_then(|v| v.as_f64()).unwrap_or(0.0);
            (name.to_string(), share)
        })
        .collect()
}

fn country_shares(records: Vec<CountryRecord>) -> BTreeMap<String, f64> {
    records
        .into_iter()
        .take(TOP_COUNTRIES_LIMIT)
        .map(|r| (r.country, r.share))
        .collect()
}

/// Acepta tanto `example.com` como una URL completa y devuelve el host.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResearchError::InvalidInput("el dominio está vacío".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ResearchError::InvalidInput(format!("dominio no válido '{trimmed}': {e}")))?;
    url.host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| ResearchError::InvalidInput(format!("dominio sin host: '{trimmed}'")))
}
