//! Carga y gestión de configuración de la aplicación (servidor, autocompletado,
//! SimilarWeb y LLM).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

pub const DEFAULT_AUTOCOMPLETE_URL: &str = "http://suggestqueries.google.com/complete/search";
pub const DEFAULT_SIMILARWEB_URL: &str = "https://api.similarweb.com";

/// Parámetros del investigador de keywords. Se pasa explícitamente al
/// construirlo; no hay estado global.
#[derive(Clone, Debug)]
pub struct ResearchConfig {
    pub autocomplete_url: String,
    pub autocomplete_delay: Duration,
    pub autocomplete_timeout: Duration,
    pub batch_delay: Duration,
    pub max_results: usize,

    pub similarweb_enabled: bool,
    pub similarweb_api_key: Option<String>,
    pub similarweb_base_url: String,
    pub similarweb_timeout: Duration,

    pub ai_insights_enabled: bool,
    pub llm_chat_model: String,
    pub llm_timeout: Duration,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            autocomplete_url: DEFAULT_AUTOCOMPLETE_URL.to_string(),
            autocomplete_delay: Duration::from_millis(200),
            autocomplete_timeout: Duration::from_secs(10),
            batch_delay: Duration::from_millis(500),
            max_results: 10,
            similarweb_enabled: false,
            similarweb_api_key: None,
            similarweb_base_url: DEFAULT_SIMILARWEB_URL.to_string(),
            similarweb_timeout: Duration::from_secs(15),
            ai_insights_enabled: false,
            llm_chat_model: "gpt-4.1-mini".to_string(),
            llm_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub frontend_dir: String,
    pub research: ResearchConfig,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo de una función arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ResearchConfig::default();

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string());
        let frontend_dir = lookup("FRONTEND_DIR").unwrap_or_else(|| "frontend".to_string());

        let autocomplete_url =
            lookup("AUTOCOMPLETE_URL").unwrap_or(defaults.autocomplete_url);
        let autocomplete_delay = Duration::from_millis(parse_or(
            &lookup,
            "AUTOCOMPLETE_DELAY_MS",
            defaults.autocomplete_delay.as_millis() as u64,
        )?);
        let autocomplete_timeout = Duration::from_secs(parse_or(
            &lookup,
            "AUTOCOMPLETE_TIMEOUT_SECS",
            defaults.autocomplete_timeout.as_secs(),
        )?);
        let batch_delay = Duration::from_millis(parse_or(
            &lookup,
            "BATCH_DELAY_MS",
            defaults.batch_delay.as_millis() as u64,
        )?);
        let max_results: usize = parse_or(&lookup, "MAX_RESULTS", defaults.max_results)?;
        if max_results == 0 {
            return Err(anyhow!("MAX_RESULTS debe ser mayor que 0"));
        }

        let similarweb_api_key = lookup("SIMILARWEB_API_KEY").filter(|k| !k.trim().is_empty());
        let mut similarweb_enabled = parse_or(&lookup, "ENABLE_SIMILARWEB", false)?;
        if similarweb_enabled && similarweb_api_key.is_none() {
            warn!("ENABLE_SIMILARWEB activo pero falta SIMILARWEB_API_KEY; SimilarWeb queda desactivado");
            similarweb_enabled = false;
        }
        let similarweb_base_url =
            lookup("SIMILARWEB_BASE_URL").unwrap_or(defaults.similarweb_base_url);

        let mut ai_insights_enabled = parse_or(&lookup, "ENABLE_AI_INSIGHTS", false)?;
        if ai_insights_enabled && lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()).is_none() {
            warn!("ENABLE_AI_INSIGHTS activo pero falta OPENAI_API_KEY; los insights quedan desactivados");
            ai_insights_enabled = false;
        }
        let llm_chat_model = lookup("LLM_CHAT_MODEL").unwrap_or(defaults.llm_chat_model);
        let llm_timeout = Duration::from_secs(parse_or(
            &lookup,
            "LLM_TIMEOUT_SECS",
            defaults.llm_timeout.as_secs(),
        )?);

        Ok(Self {
            server_addr,
            frontend_dir,
            research: ResearchConfig {
                autocomplete_url,
                autocomplete_delay,
                autocomplete_timeout,
                batch_delay,
                max_results,
                similarweb_enabled,
                similarweb_api_key,
                similarweb_base_url,
                similarweb_timeout: defaults.similarweb_timeout,
                ai_insights_enabled,
                llm_chat_model,
                llm_timeout,
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow!("Valor no válido para {key} ('{raw}'): {e}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.server_addr, "127.0.0.1:5000");
        assert_eq!(cfg.frontend_dir, "frontend");
        assert_eq!(cfg.research.autocomplete_url, DEFAULT_AUTOCOMPLETE_URL);
        assert_eq!(cfg.research.autocomplete_delay, Duration::from_millis(200));
        assert_eq!(cfg.research.batch_delay, Duration::from_millis(500));
        assert_eq!(cfg.research.max_results, 10);
        assert!(!cfg.research.similarweb_enabled);
        assert!(!cfg.research.ai_insights_enabled);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = load(&[
            ("SERVER_ADDR", "0.0.0.0:8080"),
            ("AUTOCOMPLETE_DELAY_MS", "350"),
            ("BATCH_DELAY_MS", "0"),
            ("MAX_RESULTS", "25"),
            ("ENABLE_SIMILARWEB", "TRUE"),
            ("SIMILARWEB_API_KEY", "sw-key"),
            ("ENABLE_AI_INSIGHTS", "true"),
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_CHAT_MODEL", "gpt-4o-mini"),
        ])
        .unwrap();
        assert_eq!(cfg.server_addr, "0.0.0.0:8080");
        assert_eq!(cfg.research.autocomplete_delay, Duration::from_millis(350));
        assert_eq!(cfg.research.batch_delay, Duration::ZERO);
        assert_eq!(cfg.research.max_results, 25);
        assert!(cfg.research.similarweb_enabled);
        assert_eq!(cfg.research.similarweb_api_key.as_deref(), Some("sw-key"));
        assert!(cfg.research.ai_insights_enabled);
        assert_eq!(cfg.research.llm_chat_model, "gpt-4o-mini");
    }

    #[test]
    fn integrations_without_keys_stay_disabled() {
        let cfg = load(&[("ENABLE_SIMILARWEB", "true"), ("ENABLE_AI_INSIGHTS", "true")]).unwrap();
        assert!(!cfg.research.similarweb_enabled);
        assert!(!cfg.research.ai_insights_enabled);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(load(&[("AUTOCOMPLETE_DELAY_MS", "soon")]).is_err());
        assert!(load(&[("MAX_RESULTS", "0")]).is_err());
        assert!(load(&[("ENABLE_SIMILARWEB", "maybe")]).is_err());
    }
}
