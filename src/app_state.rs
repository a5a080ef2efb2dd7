use std::sync::Arc;

use crate::{config::AppConfig, research::KeywordResearcher};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub researcher: Arc<KeywordResearcher>,
}

impl AppState {
    pub fn new(config: AppConfig, researcher: KeywordResearcher) -> Self {
        Self {
            config,
            researcher: Arc::new(researcher),
        }
    }
}
