use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use glossary_qa::core::config::{AppPaths, ConfigService};
use glossary_qa::core::logging;
use glossary_qa::rag::{self, EmbeddingStore, RagPipeline};
use glossary_qa::server;
use glossary_qa::state::{build_provider, load_tokenizer, AppState};

const USAGE: &str = "usage: glossary-qa [serve | ingest [records.csv] [embeddings.csv] | ask <question...>]";

#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    Ingest {
        records: Option<PathBuf>,
        store: Option<PathBuf>,
    },
    Ask(String),
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        None | Some("serve") => Ok(Command::Serve),
        Some("ingest") => {
            if args.len() > 3 {
                anyhow::bail!("{}", USAGE);
            }
            Ok(Command::Ingest {
                records: args.get(1).map(PathBuf::from),
                store: args.get(2).map(PathBuf::from),
            })
        }
        Some("ask") => {
            let question = args[1..].join(" ");
            if question.trim().is_empty() {
                anyhow::bail!("{}", USAGE);
            }
            Ok(Command::Ask(question))
        }
        Some(other) => anyhow::bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    match command {
        Command::Serve => serve(paths).await,
        Command::Ingest { records, store } => ingest(paths, records, store).await,
        Command::Ask(question) => ask(paths, &question).await,
    }
}

async fn serve(paths: Arc<AppPaths>) -> anyhow::Result<()> {
    let state = AppState::initialize(paths).await?;

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Serving {} glossary chunks on {}",
        state.pipeline.store().len(),
        addr
    );

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn ingest(
    paths: Arc<AppPaths>,
    records: Option<PathBuf>,
    store: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = ConfigService::new(paths.clone()).load_app_config()?;
    let tokenizer = load_tokenizer(&config, &paths)?;
    let provider = build_provider(&config)?;

    let records_path = records.unwrap_or_else(|| paths.records_path.clone());
    let store_path = store.unwrap_or_else(|| paths.store_path.clone());

    let store = rag::ingest(
        &config.pipeline,
        tokenizer.as_ref(),
        provider.as_ref(),
        &records_path,
        &store_path,
    )
    .await
    .with_context(|| format!("Failed to ingest {}", records_path.display()))?;

    tracing::info!(
        "Wrote {} embeddings to {}",
        store.len(),
        store_path.display()
    );
    Ok(())
}

async fn ask(paths: Arc<AppPaths>, question: &str) -> anyhow::Result<()> {
    let config = ConfigService::new(paths.clone()).load_app_config()?;
    let tokenizer = load_tokenizer(&config, &paths)?;
    let provider = build_provider(&config)?;
    let store = EmbeddingStore::load(&paths.store_path, config.pipeline.vector_dimension)
        .with_context(|| format!("Failed to load {}", paths.store_path.display()))?;

    let pipeline = RagPipeline::new(
        config.pipeline,
        config.completion.clone(),
        tokenizer,
        provider,
        Arc::new(store),
    )?;

    let answer = pipeline.answer(question).await?;
    println!("{}", answer);
    Ok(())
}
