//! Errores del núcleo de investigación de keywords.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Debug, Error)]
pub enum ResearchError {
    /// Entrada rechazada antes de hacer cualquier llamada de red.
    #[error("Entrada no válida: {0}")]
    InvalidInput(String),

    /// El autocompletado no devolvió nada utilizable.
    #[error("No se pudieron obtener sugerencias: {0}")]
    SuggestionFetchFailed(String),

    #[error("Servicio externo no disponible ({service}): {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("Integración desactivada: {0}")]
    Disabled(&'static str),
}

impl ResearchError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        ResearchError::UpstreamUnavailable {
            service,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ResearchError {
    fn from(err: reqwest::Error) -> Self {
        ResearchError::upstream("http", err.to_string())
    }
}

impl From<serde_json::Error> for ResearchError {
    fn from(err: serde_json::Error) -> Self {
        ResearchError::upstream("json", err.to_string())
    }
}
