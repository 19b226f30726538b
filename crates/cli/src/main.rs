//! quill CLI — the main entry point.
//!
//! Commands:
//! - `query`    — One-off question to a configured model
//! - `terminal` — Question with piped terminal output as context
//! - `session`  — Create, list, delete, and run named sessions
//! - `run-file` — Run an arbitrary markdown file as a session
//! - `search`   — Semantic search over past interactions
//! - `models`   — Show the model registry

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quill",
    about = "quill — a personal command-line LLM assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a one-off question
    Query {
        /// The question text
        query: String,

        /// Model registry key (defaults to the configured default)
        #[arg(short, long)]
        model: Option<String>,

        /// Named system prompt
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Ask a question with piped stdin as terminal context
    Terminal {
        /// The question text
        query: String,

        /// Model registry key
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage named sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Run a markdown file as an ad hoc session
    RunFile {
        /// Path to the markdown file
        path: String,
    },

    /// Search past interactions by semantic similarity
    Search {
        /// The search text
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(long, default_value_t = 0.3)]
        min_similarity: f32,

        /// Show full responses instead of previews
        #[arg(short, long)]
        detailed: bool,
    },

    /// List configured models
    Models,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Create a new session
    Create {
        name: String,

        /// Model registry key for this session
        #[arg(short, long)]
        model: Option<String>,

        /// Named system prompt for this session
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// List all sessions
    Ls,

    /// Delete a session and its cached context
    Delete { name: String },

    /// Answer the pending query in a session
    Run { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Query {
            query,
            model,
            prompt,
        } => commands::query::run(&query, model.as_deref(), prompt.as_deref()).await?,
        Commands::Terminal { query, model } => {
            commands::query::terminal(&query, model.as_deref()).await?
        }
        Commands::Session { command } => match command {
            SessionCommands::Create {
                name,
                model,
                prompt,
            } => commands::session::create(&name, model.as_deref(), prompt.as_deref()).await?,
            SessionCommands::Ls => commands::session::ls().await?,
            SessionCommands::Delete { name } => commands::session::delete(&name).await?,
            SessionCommands::Run { name } => commands::session::run(&name).await?,
        },
        Commands::RunFile { path } => commands::run_file::run(&path).await?,
        Commands::Search {
            query,
            limit,
            min_similarity,
            detailed,
        } => commands::search::run(&query, limit, min_similarity, detailed).await?,
        Commands::Models => commands::models::run().await?,
    }

    Ok(())
}
