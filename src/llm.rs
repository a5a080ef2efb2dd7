//! Abstracción sobre Rig para generar los insights de una keyword con un LLM.
//! De momento se implementa OpenAI (o cualquier API compatible vía
//! `OPENAI_BASE_URL`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rig::completion::Prompt;
use tracing::{debug, warn};

use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::models::{AiInsights, SimilarWebData};

/// Parámetros de una petición de texto al LLM.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: &'static str,
    pub prompt: String,
    pub max_tokens: u64,
    pub temperature: f64,
}

/// Proveedor de generación de texto. Los tests lo sustituyen por un fake.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &TextRequest) -> Result<String>;
}

/// Generador basado en el cliente OpenAI de Rig.
#[derive(Debug, Clone)]
pub struct RigTextGenerator {
    pub chat_model: String,
    pub timeout: Duration,
}

impl RigTextGenerator {
    pub fn from_config(cfg: &ResearchConfig) -> Self {
        Self {
            chat_model: cfg.llm_chat_model.clone(),
            timeout: cfg.llm_timeout,
        }
    }
}

#[async_trait]
impl TextGenerator for RigTextGenerator {
    async fn generate(&self, request: &TextRequest) -> Result<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let client = openai::Client::from_env();

        let model_name = if self.chat_model.is_empty() {
            "gpt-4.1-mini"
        } else {
            self.chat_model.as_str()
        };

        let agent = client
            .agent(model_name)
            .preamble(request.system)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build();

        let answer = tokio::time::timeout(self.timeout, agent.prompt(request.prompt.as_str()))
            .await
            .map_err(|_| ResearchError::upstream("llm", "tiempo de espera agotado"))?
            .map_err(|e| ResearchError::upstream("llm", e.to_string()))?;

        Ok(answer.trim().to_string())
    }
}

// ---------------------------------------------------------------------
// CATEGORÍAS DE INSIGHTS
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Text,
    List(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    ContentStrategy,
    SeoRecommendations,
    ContentIdeas,
    TargetAudience,
    CompetitiveAnalysis,
    Monetization,
    TrendingTopics,
    RiskAssessment,
}

struct PromptProfile {
    system: &'static str,
    instruction: &'static str,
    max_tokens: u64,
    temperature: f64,
    shape: Shape,
}

impl Category {
    const ALL: [Category; 8] = [
        Category::ContentStrategy,
        Category::SeoRecommendations,
        Category::ContentIdeas,
        Category::TargetAudience,
        Category::CompetitiveAnalysis,
        Category::Monetization,
        Category::TrendingTopics,
        Category::RiskAssessment,
    ];

    fn profile(self) -> PromptProfile {
        match self {
            Category::ContentStrategy => PromptProfile {
                system: "You are an expert SEO and content strategist. Provide concise, actionable content strategies.",
                instruction: "Provide a comprehensive content strategy for this keyword in 2-3 sentences.",
                max_tokens: 200,
                temperature: 0.7,
                shape: Shape::Text,
            },
            Category::SeoRecommendations => PromptProfile {
                system: "You are an expert SEO consultant. Provide specific, actionable SEO recommendations.",
                instruction: "Provide 5 specific SEO recommendations for ranking for this keyword. Return as a JSON array of strings.",
                max_tokens: 300,
                temperature: 0.7,
                shape: Shape::List(5),
            },
            Category::ContentIdeas => PromptProfile {
                system: "You are a creative content strategist. Generate engaging, specific content ideas.",
                instruction: "Generate 5 specific content ideas (blog posts, videos, guides) for this keyword. Return as a JSON array of strings.",
                max_tokens: 300,
                temperature: 0.8,
                shape: Shape::List(5),
            },
            Category::TargetAudience => PromptProfile {
                system: "You are a marketing analyst specializing in audience research.",
                instruction: "Describe the target audience for this keyword in 2-3 sentences (demographics, pain points, goals).",
                max_tokens: 200,
                temperature: 0.7,
                shape: Shape::Text,
            },
            Category::CompetitiveAnalysis => PromptProfile {
                system: "You are a competitive intelligence analyst.",
                instruction: "Provide a competitive analysis for this keyword in 2-3 sentences.",
                max_tokens: 200,
                temperature: 0.7,
                shape: Shape::Text,
            },
            Category::Monetization => PromptProfile {
                system: "You are a business strategist specializing in digital monetization.",
                instruction: "Identify 3-4 monetization opportunities for content targeting this keyword. Return as a JSON array of strings.",
                max_tokens: 250,
                temperature: 0.7,
                shape: Shape::List(4),
            },
            Category::TrendingTopics => PromptProfile {
                system: "You are a trend analyst tracking digital marketing and content trends.",
                instruction: "Identify 3-4 current trends related to this keyword. Return as a JSON array of strings.",
                max_tokens: 250,
                temperature: 0.7,
                shape: Shape::List(4),
            },
            Category::RiskAssessment => PromptProfile {
                system: "You are a risk analyst specializing in SEO and content marketing.",
                instruction: "Identify potential risks or challenges for targeting this keyword in 2-3 sentences.",
                max_tokens: 200,
                temperature: 0.7,
                shape: Shape::Text,
            },
        }
    }
}

enum Answer {
    Text(String),
    List(Vec<String>),
}

/// Datos ya calculados que se pasan como contexto a cada prompt.
#[derive(Debug, Clone, Copy)]
pub struct InsightContext<'a> {
    pub keyword: &'a str,
    pub difficulty: u8,
    pub competition: crate::models::Competition,
    pub related_keywords: &'a [String],
    pub similarweb_data: Option<&'a SimilarWebData>,
}

impl InsightContext<'_> {
    fn render(&self) -> String {
        let mut context = format!(
            "Keyword: {}\nDifficulty: {}/100\nCompetition: {:?}\n",
            self.keyword, self.difficulty, self.competition
        );
        if !self.related_keywords.is_empty() {
            let related: Vec<&str> = self
                .related_keywords
                .iter()
                .take(10)
                .map(String::as_str)
                .collect();
            context.push_str(&format!("Related Keywords: {}\n", related.join(", ")));
        }
        if let Some(sw) = self.similarweb_data {
            context.push_str("Domain Traffic Data Available: Yes\n");
            if let Some(rank) = sw.global_rank {
                context.push_str(&format!("Global Rank: {rank}\n"));
            }
            if let Some(visits) = sw.total_visits {
                context.push_str(&format!("Monthly Visits: {visits}\n"));
            }
        }
        context
    }
}

/// Genera `AiInsights` lanzando un prompt independiente por categoría.
#[derive(Clone)]
pub struct InsightEngine {
    generator: Arc<dyn TextGenerator>,
}

impl InsightEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Devuelve `None` si no ha prosperado ningún prompt.
    pub async fn generate_insights(&self, ctx: InsightContext<'_>) -> Option<AiInsights> {
        let context = ctx.render();

        // El análisis competitivo sólo tiene sentido con datos de tráfico.
        let categories: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| *c != Category::CompetitiveAnalysis || ctx.similarweb_data.is_some())
            .collect();

        let answers = join_all(
            categories
                .iter()
                .map(|category| self.ask(*category, &context)),
        )
        .await;

        let mut insights = AiInsights::default();
        for (category, answer) in categories.into_iter().zip(answers) {
            match answer {
                Ok(answer) => apply(&mut insights, category, answer),
                Err(e) => warn!(keyword = ctx.keyword, ?category, error = %e, "Insight omitido"),
            }
        }

        if insights.is_empty() {
            None
        } else {
            Some(insights)
        }
    }

    async fn ask(&self, category: Category, context: &str) -> Result<Answer> {
        let profile = category.profile();
        let request = TextRequest {
            system: profile.system,
            prompt: format!("{context}\n{}", profile.instruction),
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };

        let raw = self.generator.generate(&request).await?;
        debug!(?category, len = raw.len(), "Respuesta del LLM recibida");

        match profile.shape {
            Shape::Text if raw.trim().is_empty() => {
                Err(ResearchError::upstream("llm", "respuesta vacía"))
            }
            Shape::Text => Ok(Answer::Text(raw.trim().to_string())),
            Shape::List(limit) => {
                let items = parse_list(&raw, limit);
                if items.is_empty() {
                    Err(ResearchError::upstream("llm", "lista vacía"))
                } else {
                    Ok(Answer::List(items))
                }
            }
        }
    }
}

fn apply(insights: &mut AiInsights, category: Category, answer: Answer) {
    match (category, answer) {
        (Category::ContentStrategy, Answer::Text(t)) => insights.content_strategy = Some(t),
        (Category::TargetAudience, Answer::Text(t)) => insights.target_audience = Some(t),
        (Category::CompetitiveAnalysis, Answer::Text(t)) => insights.competitive_analysis = Some(t),
        (Category::RiskAssessment, Answer::Text(t)) => insights.risk_assessment = Some(t),
        (Category::SeoRecommendations, Answer::List(l)) => insights.seo_recommendations = Some(l),
        (Category::ContentIdeas, Answer::List(l)) => insights.content_ideas = Some(l),
        (Category::Monetization, Answer::List(l)) => insights.monetization_opportunities = Some(l),
        (Category::TrendingTopics, Answer::List(l)) => insights.trending_topics = Some(l),
        _ => {}
    }
}

/// Interpreta una lista devuelta por el LLM: primero como array JSON
/// (quitando vallas ```json), si no, línea a línea sin viñetas ni numeración.
pub fn parse_list(response: &str, limit: usize) -> Vec<String> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(items) = serde_json::from_str::<Vec<String>>(cleaned) {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(limit)
            .collect();
    }

    cleaned
        .lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty() && *line != "[" && *line != "]")
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim().trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line.trim()
}
