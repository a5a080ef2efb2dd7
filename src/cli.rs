//! Interfaz de línea de comandos: una keyword, un lote desde fichero o el
//! servidor web.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::BatchOutcome;
use crate::research::KeywordResearcher;

#[derive(Parser, Debug)]
#[command(
    name = "keyword-research",
    version,
    about = "Investigación de keywords: sugerencias, preguntas, dificultad e insights"
)]
pub struct Cli {
    /// Keyword a investigar
    pub keyword: Option<String>,

    /// Incluir keywords relacionadas y preguntas
    #[arg(long)]
    pub related: bool,

    /// Dominio para consultar datos de SimilarWeb
    #[arg(long)]
    pub domain: Option<String>,

    /// Fichero JSON de salida (por defecto, stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fichero con una keyword por línea
    #[arg(long)]
    pub batch: Option<PathBuf>,

    /// Arrancar el servidor web (API + interfaz)
    #[arg(long)]
    pub serve: bool,

    /// Abrir la interfaz en el navegador al arrancar el servidor
    #[arg(long)]
    pub open: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    Serve { open: bool },
    Single { keyword: String },
    Batch { file: PathBuf },
}

impl Cli {
    /// Resuelve el modo de ejecución a partir de los argumentos.
    pub fn mode(&self) -> Result<Mode> {
        match (&self.keyword, &self.batch, self.serve) {
            (None, None, true) => Ok(Mode::Serve { open: self.open }),
            (Some(keyword), None, false) => Ok(Mode::Single {
                keyword: keyword.clone(),
            }),
            (None, Some(file), false) => Ok(Mode::Batch { file: file.clone() }),
            (None, None, false) => bail!("Hay que indicar una keyword, --batch <fichero> o --serve"),
            _ => bail!("La keyword, --batch y --serve son excluyentes"),
        }
    }
}

pub async fn run_single(
    researcher: &KeywordResearcher,
    keyword: &str,
    related: bool,
    domain: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let result = researcher.research_keyword(keyword, related, domain).await?;
    write_output(&result, output)
}

pub async fn run_batch(
    researcher: &KeywordResearcher,
    file: &Path,
    related: bool,
    output: Option<&Path>,
) -> Result<()> {
    let keywords = read_keywords(file)?;
    info!("Lote de {} keywords leído de {}", keywords.len(), file.display());

    let outcomes = researcher.batch_research(&keywords, related).await;
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Failed { .. }))
        .map(BatchOutcome::keyword)
        .collect();
    if !failed.is_empty() {
        warn!("{} keywords del lote con error: {:?}", failed.len(), failed);
    }

    write_output(&outcomes, output)
}

/// Una keyword por línea; se ignoran las líneas en blanco.
pub fn read_keywords(file: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("No se pudo leer el fichero de lote {}", file.display()))?;

    let keywords: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        return Err(anyhow!("El fichero de lote {} no contiene keywords", file.display()));
    }
    Ok(keywords)
}

pub fn write_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("No se pudo escribir {}", path.display()))?;
            info!("Resultados exportados a {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
