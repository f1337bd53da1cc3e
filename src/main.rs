//! lexsearch - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lexsearch::{
    build::IndexBuilder,
    chat::{render_search_results, render_trace, run_chat},
    cli::{Args, Commands},
    config::Config,
    embedding::load_embedder,
    generation::build_generator,
    index::{ArtifactPaths, IndexArtifact},
    rag::AnswerPipeline,
    retrieval::Retriever,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    match &args.command {
        Commands::Clean => {
            let files = IndexBuilder::new(config).clean_documents()?;
            println!("{} Cleaned {} file(s)", "✓".green(), files);
        }
        Commands::Chunk { .. } => {
            let records = IndexBuilder::new(config).chunk_documents()?;
            println!("{} Wrote {} chunk(s)", "✓".green(), records.len());
        }
        Commands::Index => {
            let embedder = load_embedder(&config.embedding).context("Failed to load embedder")?;
            let builder = IndexBuilder::new(config).with_progress(args.verbosity().show_progress());
            let report = builder.build_index(embedder.as_ref())?;
            print_report(&report);
        }
        Commands::Build { .. } => {
            let embedder = load_embedder(&config.embedding).context("Failed to load embedder")?;
            let builder = IndexBuilder::new(config).with_progress(args.verbosity().show_progress());
            let report = builder.run(embedder.as_ref())?;
            print_report(&report);
        }
        Commands::Search { query } => {
            let retriever = load_retriever(&config)?;
            let results = retriever.retrieve(query, config.retrieval.top_k)?;
            print!("{}", render_search_results(query, &results));
        }
        Commands::Ask { question, json } => {
            let pipeline = load_pipeline(&config)?;
            let trace = pipeline.answer_with_trace(question).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&trace.answer)?);
            } else {
                println!("{}", render_trace(&trace));
            }
        }
        Commands::Chat => {
            let pipeline = load_pipeline(&config)?;
            let history = dirs::home_dir().map(|home| home.join(".lexsearch").join("history"));
            run_chat(&pipeline, history).await?;
        }
        Commands::Serve { .. } => {
            let pipeline = Arc::new(load_pipeline(&config)?);
            server::serve(pipeline, &config.server.bind).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.verbosity().filter_directive()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load the embedder and the artifact; any failure is fatal
fn load_retriever(config: &Config) -> Result<Retriever> {
    let paths = ArtifactPaths::in_dir(&config.chunks_dir());
    let artifact = IndexArtifact::load(&paths)
        .with_context(|| format!("Failed to load index from {}", config.chunks_dir().display()))?;
    let embedder = load_embedder(&config.embedding).context("Failed to load embedder")?;
    info!(model = embedder.model_id(), "Embedder ready");

    Retriever::new(embedder, Arc::new(artifact)).context("Index does not match the configured embedder")
}

fn load_pipeline(config: &Config) -> Result<AnswerPipeline> {
    let retriever = load_retriever(config)?;
    let generator = build_generator(&config.generation, config.api_key())
        .context("Failed to configure generation provider")?;
    info!(
        provider = %config.generation.provider,
        model = %config.generation.model,
        "Generator ready"
    );
    Ok(AnswerPipeline::new(retriever, generator, config))
}

fn print_report(report: &lexsearch::build::BuildReport) {
    println!(
        "{} Indexed {} vector(s) of dimension {} with {} in {}ms",
        "✓".green(),
        report.vectors,
        report.dimension,
        report.model_id.cyan(),
        report.elapsed_ms
    );
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let source = args
        .config
        .clone()
        .or_else(|| Config::default_path().filter(|p| p.exists()));

    match source {
        Some(path) => println!("{} {}", "Configuration file:".bold(), path.display()),
        None => println!("{}", "Configuration: built-in defaults".bold()),
    }
    println!();
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    Ok(())
}
