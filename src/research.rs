//! Investigación de keywords: compone autocompletado, dificultad,
//! SimilarWeb e insights del LLM en un único `KeywordResult`.
//!
//! Flujo:
//!   1. Validación de la keyword y cálculo local de dificultad/competencia/tendencia.
//!   2. En paralelo: keywords relacionadas + preguntas, y datos de tráfico del dominio.
//!   3. Insights del LLM con el contexto ya reunido.
//!
//! Cualquier fallo externo degrada su campo (lista vacía o `None`) y se
//! registra; nunca aborta la investigación.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::autocomplete::{GoogleAutocomplete, SuggestionSource};
use crate::config::ResearchConfig;
use crate::difficulty::{estimate_difficulty, trend_indicator};
use crate::error::{ResearchError, Result};
use crate::llm::{InsightContext, InsightEngine, RigTextGenerator, TextGenerator};
use crate::models::{BatchOutcome, KeywordResult, SimilarWebData};
use crate::similarweb::{normalize_domain, SimilarWebClient, TrafficProvider};
use crate::suggestions::SuggestionFetcher;

pub struct KeywordResearcher {
    config: ResearchConfig,
    fetcher: SuggestionFetcher,
    traffic: Option<Arc<dyn TrafficProvider>>,
    insights: Option<InsightEngine>,
}

impl KeywordResearcher {
    /// Construye el investigador con adaptadores explícitos (útil en tests).
    pub fn new(
        config: ResearchConfig,
        source: Arc<dyn SuggestionSource>,
        traffic: Option<Arc<dyn TrafficProvider>>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self {
            fetcher: SuggestionFetcher::new(source, config.autocomplete_delay),
            traffic,
            insights: generator.map(InsightEngine::new),
            config,
        }
    }

    /// Construye el investigador con los clientes reales según la configuración.
    pub fn from_config(config: ResearchConfig) -> Result<Self> {
        let source: Arc<dyn SuggestionSource> = Arc::new(GoogleAutocomplete::new(
            &config.autocomplete_url,
            config.autocomplete_timeout,
        )?);

        let traffic: Option<Arc<dyn TrafficProvider>> =
            match (config.similarweb_enabled, &config.similarweb_api_key) {
                (true, Some(key)) => Some(Arc::new(SimilarWebClient::new(
                    &config.similarweb_base_url,
                    key,
                    config.similarweb_timeout,
                )?)),
                _ => None,
            };

        let generator: Option<Arc<dyn TextGenerator>> = if config.ai_insights_enabled {
            Some(Arc::new(RigTextGenerator::from_config(&config)))
        } else {
            None
        };

        info!(
            similarweb = traffic.is_some(),
            ai_insights = generator.is_some(),
            "Investigador de keywords inicializado"
        );

        Ok(Self::new(config, source, traffic, generator))
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn similarweb_enabled(&self) -> bool {
        self.traffic.is_some()
    }

    pub fn ai_insights_enabled(&self) -> bool {
        self.insights.is_some()
    }

    pub async fn fetch_suggestions(&self, keyword: &str, max_results: usize) -> Result<Vec<String>> {
        self.fetcher.fetch_suggestions(keyword, max_results).await
    }

    pub async fn fetch_questions(&self, keyword: &str, max_results: usize) -> Result<Vec<String>> {
        self.fetcher.fetch_questions(keyword, max_results).await
    }

    /// Datos de tráfico de un dominio, sin degradar el error.
    pub async fn domain_data(&self, domain: &str) -> Result<SimilarWebData> {
        let domain = normalize_domain(domain)?;
        let traffic = self
            .traffic
            .as_ref()
            .ok_or(ResearchError::Disabled("similarweb"))?;
        traffic.domain_data(&domain).await
    }

    /// Investiga una keyword. Sólo falla con `InvalidInput`.
    pub async fn research_keyword(
        &self,
        keyword: &str,
        include_related: bool,
        domain: Option<&str>,
    ) -> Result<KeywordResult> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ResearchError::InvalidInput("la keyword está vacía".to_string()));
        }
        info!(keyword, include_related, domain, "Investigando keyword");

        let (difficulty, competition) = estimate_difficulty(keyword);
        let trend = trend_indicator(keyword);

        let domain = domain.map(str::trim).filter(|d| !d.is_empty());
        let ((related_keywords, questions), similarweb_data) = tokio::join!(
            self.related(keyword, include_related),
            self.traffic_for(keyword, domain),
        );

        let ai_insights = match &self.insights {
            Some(engine) => {
                engine
                    .generate_insights(InsightContext {
                        keyword,
                        difficulty,
                        competition,
                        related_keywords: &related_keywords,
                        similarweb_data: similarweb_data.as_ref(),
                    })
                    .await
            }
            None => None,
        };

        Ok(KeywordResult {
            keyword: keyword.to_string(),
            difficulty,
            competition,
            trend,
            related_keywords,
            questions,
            similarweb_data,
            ai_insights,
        })
    }

    async fn related(&self, keyword: &str, include_related: bool) -> (Vec<String>, Vec<String>) {
        if !include_related {
            return (Vec::new(), Vec::new());
        }
        let max_results = self.config.max_results;

        let suggestions = self
            .fetch_suggestions(keyword, max_results)
            .await
            .unwrap_or_else(|e| {
                warn!(keyword, error = %e, "Sin keywords relacionadas");
                Vec::new()
            });
        let questions = self
            .fetch_questions(keyword, max_results)
            .await
            .unwrap_or_else(|e| {
                warn!(keyword, error = %e, "Sin preguntas relacionadas");
                Vec::new()
            });

        (suggestions, questions)
    }

    async fn traffic_for(&self, keyword: &str, domain: Option<&str>) -> Option<SimilarWebData> {
        let (traffic, domain) = match (&self.traffic, domain) {
            (Some(traffic), Some(domain)) => (traffic, domain),
            (None, Some(domain)) => {
                info!(keyword, domain, "SimilarWeb desactivado, se ignora el dominio");
                return None;
            }
            _ => return None,
        };

        match traffic.domain_data(domain).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(keyword, domain, error = %e, "Error obteniendo datos de SimilarWeb");
                None
            }
        }
    }

    /// Investiga varias keywords en orden, con una pausa entre elementos.
    /// Un elemento que falla queda marcado en línea y no detiene el lote.
    pub async fn batch_research(&self, keywords: &[String], include_related: bool) -> Vec<BatchOutcome> {
        let total = keywords.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, keyword) in keywords.iter().enumerate() {
            info!("Procesando {}/{}: {}", index + 1, total, keyword);

            let outcome = match self.research_keyword(keyword, include_related, None).await {
                Ok(result) => BatchOutcome::Done(result),
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "Elemento del lote fallido");
                    BatchOutcome::Failed {
                        keyword: keyword.clone(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);

            if index + 1 < total && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }
        }

        outcomes
    }
}
