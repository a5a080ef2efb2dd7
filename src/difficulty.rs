//! Estimación heurística de dificultad y competencia a partir del texto de
//! la keyword. Funciones puras: sin E/S y deterministas.

use crate::models::{Competition, Trend};

const SINGLE_WORD_BASE: i32 = 70;
const TWO_WORD_BASE: i32 = 50;
const LONG_TAIL_BASE: i32 = 30;

const COMMERCIAL_BONUS: i32 = 15;
const INFORMATIONAL_PENALTY: i32 = 15;

/// Marcadores de intención comercial (suben la dificultad).
const COMMERCIAL_MARKERS: &[&str] = &[
    "buy", "best", "top", "review", "price", "cheap", "software", "tool",
];

/// Marcadores long-tail / informacionales (bajan la dificultad).
const INFORMATIONAL_MARKERS: &[&str] = &["how to", "what is", "why", "guide", "tutorial", "tips"];

/// Devuelve la puntuación 0..=100 y la etiqueta de competencia asociada.
pub fn estimate_difficulty(keyword: &str) -> (u8, Competition) {
    let normalized = keyword.to_lowercase();

    let mut score = match normalized.split_whitespace().count() {
        0 | 1 => SINGLE_WORD_BASE,
        2 => TWO_WORD_BASE,
        _ => LONG_TAIL_BASE,
    };

    if COMMERCIAL_MARKERS.iter().any(|m| normalized.contains(m)) {
        score += COMMERCIAL_BONUS;
    }
    if INFORMATIONAL_MARKERS.iter().any(|m| normalized.contains(m)) {
        score -= INFORMATIONAL_PENALTY;
    }

    let score = score.clamp(0, 100) as u8;
    (score, Competition::from_score(score))
}

/// No hay fuente real de tendencias: siempre `Stable`.
pub fn trend_indicator(_keyword: &str) -> Trend {
    Trend::Stable
}
