// Módulos de la aplicación
mod api;
mod app_state;
mod autocomplete;
mod cli;
mod config;
mod difficulty;
mod error;
mod llm;
mod models;
mod research;
mod similarweb;
mod suggestions;

use crate::app_state::AppState;
use crate::cli::{Cli, Mode};
use crate::research::KeywordResearcher;
use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging (a stderr: stdout queda para el JSON)
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Argumentos y configuración
    let args = Cli::parse();
    let mode = args.mode()?;
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Investigador con los clientes reales
    let researcher = KeywordResearcher::from_config(cfg.research.clone())
        .context("Error inicializando el investigador de keywords")?;

    match mode {
        Mode::Serve { open } => serve(AppState::new(cfg, researcher), open).await,
        Mode::Single { keyword } => {
            cli::run_single(
                &researcher,
                &keyword,
                args.related,
                args.domain.as_deref(),
                args.output.as_deref(),
            )
            .await
        }
        Mode::Batch { file } => {
            cli::run_batch(&researcher, &file, args.related, args.output.as_deref()).await
        }
    }
}

async fn serve(app_state: AppState, open_browser: bool) -> Result<()> {
    // Router de la API y servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new(&app_state.config.frontend_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    let server_url = format!("http://{}", server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    if open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
