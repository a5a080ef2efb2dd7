//! Modelos de dominio (resultado de investigación de una keyword y sus
//! enriquecimientos externos).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nivel de competencia derivado de la puntuación de dificultad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Competition {
    Low,
    Medium,
    High,
}

impl Competition {
    /// Umbrales fijos: <40 Low, 40–69 Medium, ≥70 High.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=39 => Competition::Low,
            40..=69 => Competition::Medium,
            _ => Competition::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Stable,
    Declining,
    Unknown,
}

/// Datos de tráfico de un dominio tal y como los devuelve SimilarWeb.
/// Cada métrica puede faltar si su llamada individual falló.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarWebData {
    pub domain: String,
    pub global_rank: Option<u64>,
    pub total_visits: Option<u64>,
    pub unique_visitors: Option<u64>,
    pub bounce_rate: Option<f64>,
    pub pages_per_visit: Option<f64>,
    pub avg_visit_duration: Option<f64>,
    /// canal → fracción (no tienen por qué sumar 1).
    pub traffic_sources: BTreeMap<String, f64>,
    /// país → fracción.
    pub top_countries: BTreeMap<String, f64>,
}

impl SimilarWebData {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }
}

/// Insights generados por el LLM. Un campo sólo aparece si su prompt tuvo éxito.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiInsights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_recommendations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ideas: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitive_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monetization_opportunities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending_topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<String>,
}

impl AiInsights {
    pub fn is_empty(&self) -> bool {
        *self == AiInsights::default()
    }
}

/// Resultado completo de investigar una keyword. Se crea por petición y no se persiste.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordResult {
    pub keyword: String,
    pub difficulty: u8,
    pub competition: Competition,
    pub trend: Trend,
    pub related_keywords: Vec<String>,
    pub questions: Vec<String>,
    pub similarweb_data: Option<SimilarWebData>,
    pub ai_insights: Option<AiInsights>,
}

/// Entrada de un lote: o el resultado completo o un marcador de error en línea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Done(KeywordResult),
    Failed { keyword: String, error: String },
}

impl BatchOutcome {
    pub fn keyword(&self) -> &str {
        match self {
            BatchOutcome::Done(result) => &result.keyword,
            BatchOutcome::Failed { keyword, .. } => keyword,
        }
    }
}
