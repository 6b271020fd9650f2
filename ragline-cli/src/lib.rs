//! Command-line front end for the ragline pipeline.
//!
//! Backends are chosen by registry name (`--provider`, `--store`) and built
//! through [`ragline::RagOrchestrator::from_registries`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use ragline::{
    BackendSelection, BackendSpec, CallContext, Parameters, ProviderRegistry, RagConfig,
    RagOrchestrator, StoreRegistry,
};
use ragline_telemetry::LogFormat;
use serde_json::{Value, json};
use tracing::info;

/// Retrieval-augmented generation over a vector store
#[derive(Parser, Debug)]
#[command(name = "ragline", version, about, long_about = None)]
pub struct Cli {
    /// Embedding model
    #[arg(long, global = true, default_value = "text-embedding-3-small")]
    pub embed: String,

    /// Generation model
    #[arg(long, global = true, default_value = "gpt-4o-mini")]
    pub model: String,

    /// Postgres connection string for the pgvector store
    #[arg(long, global = true, env = "RAGLINE_DSN", hide_env_values = true)]
    pub dsn: Option<String>,

    /// Vector store backend
    #[arg(long, global = true, default_value = "pgvector")]
    pub store: String,

    /// Embedding and generation provider
    #[arg(long, global = true, default_value = "openai")]
    pub provider: String,

    /// Per-command timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, hide = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", hide = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed a file's contents and store it as one document
    Ingest {
        file: PathBuf,
    },

    /// Print the documents nearest to a query
    Search {
        query: String,
    },

    /// Answer a question from the stored documents
    Ask {
        query: String,

        /// Ingest this file before answering
        #[arg(long)]
        ingest: Option<PathBuf>,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Print a stored document as JSON
    Show {
        id: String,
    },

    /// Delete a stored document
    Delete {
        id: String,
    },
}

impl Cli {
    /// Registry selection for the chosen backends.
    ///
    /// The `openai` provider requires `OPENAI_API_KEY` and `OPENAI_BASE_URL`;
    /// the `pgvector` store requires `--dsn`.
    pub fn selection(&self) -> Result<BackendSelection> {
        let (embedding, generation) = match self.provider.as_str() {
            "openai" => {
                let api_key = self
                    .api_key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set"))?;
                let base_url = self
                    .base_url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| anyhow!("OPENAI_BASE_URL must be set"))?;
                let options = |model: &str| {
                    json!({ "api_key": api_key, "base_url": base_url, "model": model })
                };
                (options(&self.embed), options(&self.model))
            }
            _ => (Value::Null, Value::Null),
        };

        let store = match self.store.as_str() {
            "pgvector" => {
                let dsn = self.dsn.as_deref().ok_or_else(|| anyhow!("--dsn is required for pgvector"))?;
                json!({ "dsn": dsn })
            }
            _ => Value::Null,
        };

        Ok(BackendSelection {
            embedding: BackendSpec::new(&self.provider, embedding),
            generation: Some(BackendSpec::new(&self.provider, generation)),
            store: BackendSpec::new(&self.store, store),
        })
    }

    fn context(&self) -> CallContext {
        CallContext::new().with_timeout(Duration::from_secs(self.timeout))
    }
}

/// Parameters for `ask`, starting from the defaults.
pub fn ask_parameters(max_tokens: Option<u32>, temperature: Option<f32>) -> Result<Parameters> {
    let mut parameters = Parameters::default();
    if let Some(max_tokens) = max_tokens {
        parameters.max_tokens = max_tokens;
    }
    if let Some(temperature) = temperature {
        parameters.temperature = temperature;
    }
    parameters.validate()?;
    Ok(parameters)
}

async fn read_document(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(text)
}

/// Run one command, writing its output to `out`.
pub async fn run(cli: Cli, out: &mut (dyn Write + Send)) -> Result<()> {
    let selection = cli.selection()?;
    let ctx = cli.context();

    let rag = ctx
        .run(RagOrchestrator::from_registries(
            &ProviderRegistry::with_defaults(),
            &StoreRegistry::with_defaults(),
            selection,
            RagConfig::default(),
        ))
        .await
        .context("failed to set up backends")?;
    info!(provider = %cli.provider, store = %cli.store, "backends ready");

    let result = execute(&rag, &ctx, cli.command, out).await;
    rag.close().await;
    result
}

async fn execute(
    rag: &RagOrchestrator,
    ctx: &CallContext,
    command: Command,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    match command {
        Command::Ingest { file } => {
            let text = read_document(&file).await?;
            let id = rag.ingest(ctx, &text).await?;
            writeln!(out, "{id}")?;
        }
        Command::Search { query } => {
            for doc in rag.retrieve(ctx, &query).await? {
                writeln!(
                    out,
                    "{:.4}\t{}\t{}",
                    doc.distance.unwrap_or_default(),
                    doc.id,
                    doc.content().unwrap_or_default()
                )?;
            }
        }
        Command::Ask { query, ingest, max_tokens, temperature } => {
            let parameters = ask_parameters(max_tokens, temperature)?;
            if let Some(file) = ingest {
                let text = read_document(&file).await?;
                rag.ingest(ctx, &text).await?;
            }
            let answer = rag.answer(ctx, &query, Some(parameters)).await?;
            writeln!(out, "{}", answer.text)?;
        }
        Command::Show { id } => {
            let doc = rag.find_by_id(ctx, &id).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
        Command::Delete { id } => {
            rag.delete(ctx, &id).await?;
            writeln!(out, "deleted {id}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ragline").chain(args.iter().copied())).unwrap()
    }

    fn temp_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_select_openai_and_pgvector() {
        let cli = parse(&["search", "q"]);
        assert_eq!(cli.provider, "openai");
        assert_eq!(cli.store, "pgvector");
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn openai_selection_carries_env_settings() {
        let cli = parse(&[
            "--api-key",
            "sk-test",
            "--base-url",
            "http://localhost:8080",
            "--dsn",
            "postgres://localhost/rag",
            "--embed",
            "embed-model",
            "ask",
            "why?",
        ]);
        let selection = cli.selection().unwrap();
        assert_eq!(selection.embedding.name, "openai");
        assert_eq!(selection.embedding.options["model"], "embed-model");
        assert_eq!(selection.generation.unwrap().options["model"], "gpt-4o-mini");
        assert_eq!(selection.store.options["dsn"], "postgres://localhost/rag");
    }

    #[test]
    fn openai_without_api_key_is_fatal() {
        if std::env::var_os("OPENAI_API_KEY").is_some() {
            return;
        }
        let cli = parse(&["--base-url", "http://localhost", "--dsn", "postgres://x", "show", "id"]);
        let err = cli.selection().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn pgvector_without_dsn_is_fatal() {
        if std::env::var_os("RAGLINE_DSN").is_some() {
            return;
        }
        let cli = parse(&["--provider", "mock", "show", "id"]);
        assert!(cli.selection().unwrap_err().to_string().contains("--dsn"));
    }

    #[test]
    fn ask_parameters_are_validated() {
        let params = ask_parameters(Some(64), Some(0.2)).unwrap();
        assert_eq!(params.max_tokens, 64);
        assert!(ask_parameters(None, Some(5.0)).is_err());
    }

    #[tokio::test]
    async fn ask_with_ingest_answers_from_the_file() {
        let file = temp_file("Indonesia declared independence on 17 August 1945.");
        let cli = parse(&[
            "--provider",
            "mock",
            "--store",
            "memory",
            "ask",
            "When is Indonesia's independence day?",
            "--ingest",
            file.path().to_str().unwrap(),
        ]);

        let mut out = Vec::new();
        run(cli, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("Context: Indonesia declared independence"));
        assert!(printed.contains("Query: When is Indonesia's independence day?"));
    }

    #[tokio::test]
    async fn blank_file_is_rejected() {
        let file = temp_file("  \n");
        let cli = parse(&[
            "--provider",
            "mock",
            "--store",
            "memory",
            "ingest",
            file.path().to_str().unwrap(),
        ]);
        let err = run(cli, &mut Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[tokio::test]
    async fn show_unknown_id_fails() {
        let cli = parse(&["--provider", "mock", "--store", "memory", "show", "missing"]);
        let err = run(cli, &mut Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn unknown_store_is_reported() {
        let cli = parse(&["--provider", "mock", "--store", "chroma", "search", "q"]);
        let err = run(cli, &mut Vec::new()).await.unwrap_err();
        assert!(format!("{err:#}").contains("chroma"));
    }
}
