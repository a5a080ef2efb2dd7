//! Keywords relacionadas y preguntas ("People Also Ask") a partir del
//! autocompletado.
//!
//! Ambas operaciones comparten el mismo `Throttle`, así que nunca se
//! lanzan dos búsquedas seguidas por debajo del intervalo configurado.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::autocomplete::{SuggestionSource, Throttle};
use crate::error::{ResearchError, Result};

/// Plantillas interrogativas; cada una forma `"{plantilla} {keyword}"`.
pub const QUESTION_TEMPLATES: &[&str] = &[
    "what is",
    "how to",
    "why",
    "when to",
    "where to",
    "can you",
    "should you",
    "will",
];

/// Completados que se aceptan como máximo por plantilla.
const QUESTIONS_PER_TEMPLATE: usize = 2;

pub struct SuggestionFetcher {
    source: Arc<dyn SuggestionSource>,
    throttle: Throttle,
}

impl SuggestionFetcher {
    pub fn new(source: Arc<dyn SuggestionSource>, min_delay: Duration) -> Self {
        Self {
            source,
            throttle: Throttle::new(min_delay),
        }
    }

    async fn lookup(&self, query: &str) -> Result<Vec<String>> {
        self.throttle.wait().await;
        self.source.lookup(query).await
    }

    /// Sugerencias para la keyword y sus variantes `"{keyword} a".."{keyword} z"`,
    /// sin duplicados (ignorando mayúsculas) y en orden de aparición.
    pub async fn fetch_suggestions(&self, keyword: &str, max_results: usize) -> Result<Vec<String>> {
        let keyword = validate(keyword, max_results)?;
        let mut collected = Deduper::new(max_results);

        let base = self
            .lookup(keyword)
            .await
            .map_err(|e| ResearchError::SuggestionFetchFailed(e.to_string()))?;
        collected.extend(base);

        for letter in 'a'..='z' {
            if collected.is_full() {
                break;
            }
            let variant = format!("{keyword} {letter}");
            match self.lookup(&variant).await {
                Ok(found) => collected.extend(found),
                Err(e) => {
                    warn!(keyword, variant = %variant, error = %e, "Fallo en una variante, se detiene la expansión");
                    break;
                }
            }
        }

        debug!(keyword, count = collected.len(), "Sugerencias obtenidas");
        Ok(collected.into_vec())
    }

    /// Preguntas formadas con `QUESTION_TEMPLATES`. Una plantilla que falla
    /// se omite; sólo es un error que fallen todas.
    pub async fn fetch_questions(&self, keyword: &str, max_results: usize) -> Result<Vec<String>> {
        let keyword = validate(keyword, max_results)?;
        let mut collected = Deduper::new(max_results);
        let mut failures = 0;
        let mut last_error = None;

        for template in QUESTION_TEMPLATES {
            if collected.is_full() {
                break;
            }
            let phrase = format!("{template} {keyword}");
            match self.lookup(&phrase).await {
                Ok(found) => collected.extend(found.into_iter().take(QUESTIONS_PER_TEMPLATE)),
                Err(e) => {
                    warn!(keyword, template, error = %e, "Plantilla de pregunta omitida");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == QUESTION_TEMPLATES.len() {
            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(ResearchError::SuggestionFetchFailed(reason));
        }

        Ok(collected.into_vec())
    }
}

fn validate(keyword: &str, max_results: usize) -> Result<&str> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(ResearchError::InvalidInput("la keyword está vacía".to_string()));
    }
    if max_results == 0 {
        return Err(ResearchError::InvalidInput(
            "max_results debe ser mayor que 0".to_string(),
        ));
    }
    Ok(keyword)
}

/// Acumulador con deduplicación sin distinguir mayúsculas y tope de tamaño.
struct Deduper {
    seen: HashSet<String>,
    items: Vec<String>,
    limit: usize,
}

impl Deduper {
    fn new(limit: usize) -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
            limit,
        }
    }

    fn extend(&mut self, candidates: impl IntoIterator<Item = String>) {
        for candidate in candidates {
            if self.is_full() {
                return;
            }
            let trimmed = candidate.trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.seen.insert(trimmed.to_lowercase()) {
                self.items.push(trimmed.to_string());
            }
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}
