// ABOUTME: Entry point for the docsmith binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and dispatches to the chat REPL or listings.

mod chat;
mod config;
mod discovery;

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;

use docsmith_agent::{ChatGateway, ExpertDeps, OpenRouterGateway};
use docsmith_core::catalog::{PackageCatalog, PackageRecord};
use docsmith_store::{OpenAiEmbedder, SupabaseClient};

use chat::{ChatSession, Command, default_enabled, parse_command};
use config::DocsmithConfig;
use discovery::{local_packages, normalize_name};

const WELCOME: &str =
    "Hello! I'm an AI-powered coding assistant dedicated to your project. Ask me anything!";

#[derive(Debug, Parser)]
#[command(
    name = "docsmith",
    version,
    about = "Ask-an-expert agent over indexed package documentation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive chat with the documentation agent
    Chat {
        /// Comma-separated experts to enable, overriding project detection
        #[arg(long, value_delimiter = ',')]
        packages: Option<Vec<String>>,

        /// Model to use instead of OPENROUTER_MODEL
        #[arg(long)]
        model: Option<String>,

        /// Print answers whole instead of streaming tokens
        #[arg(long)]
        no_stream: bool,
    },
    /// List catalog packages, marking those detected in the project
    Packages,
    /// List OpenRouter models that support tool calling
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the conversation on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docsmith=info,docsmith_agent=info,docsmith_store=info"
                    .parse()
                    .unwrap()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Chat {
            packages,
            model,
            no_stream,
        } => run_chat(packages, model, no_stream).await,
        Commands::Packages => run_packages().await,
        Commands::Models => run_models().await,
    }
}

async fn run_chat(
    packages: Option<Vec<String>>,
    model: Option<String>,
    no_stream: bool,
) -> anyhow::Result<()> {
    let config = DocsmithConfig::from_env()?;
    let streaming = config.streaming && !no_stream;

    let mut gateway = OpenRouterGateway::from_env()?;
    if let Some(model) = model {
        gateway = gateway.with_model(model);
    }
    println!(
        "docsmith using {} via {}",
        gateway.model_name(),
        gateway.provider_name()
    );

    let supabase = Arc::new(SupabaseClient::from_env()?);
    let embedder = Arc::new(OpenAiEmbedder::from_env()?);

    let catalog = supabase.list_packages().await;
    let enabled = match packages {
        Some(names) => names.iter().map(|name| normalize_name(name)).collect(),
        None => default_enabled(&catalog, &local_packages(&config.project_root)),
    };

    let deps = ExpertDeps {
        gateway: Arc::new(gateway),
        store: supabase,
        embedder,
        step_budget: config.step_budget,
    };
    let mut session = ChatSession::new(deps, catalog, enabled, config.project_root.clone());

    let session_id = ulid::Ulid::new();
    tracing::info!(
        %session_id,
        experts = session.enabled().len(),
        project_root = %config.project_root.display(),
        "chat session started"
    );

    if session.enabled().is_empty() {
        println!("No package experts enabled. Use /use <name,...> to enable some.");
    } else {
        println!("Experts: {}", session.enabled().join(", "));
    }
    println!("{WELCOME}");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Command::Quit => break,
            Command::Empty => {}
            Command::ListPackages => print_catalog(session.catalog(), session.enabled()),
            Command::Use(names) => {
                session.set_enabled(names);
                if session.enabled().is_empty() {
                    println!("No experts enabled.");
                } else {
                    println!("Experts: {}", session.enabled().join(", "));
                }
            }
            Command::Unknown(input) => {
                println!("Unknown command: {input} (try /packages, /use, /quit)");
            }
            Command::Ask(question) => {
                let result = if streaming {
                    let sink = |token: &str| {
                        print!("{token}");
                        let _ = std::io::stdout().flush();
                    };
                    let result = session.ask_streaming(question, &sink).await;
                    println!();
                    result
                } else {
                    session.ask(question).await.inspect(|answer| {
                        println!("{answer}");
                    })
                };
                match result {
                    Ok(_) => tracing::debug!(%session_id, "turn complete"),
                    Err(error) => eprintln!("Error: {error}"),
                }
            }
        }
    }
    Ok(())
}

fn print_catalog(catalog: &[PackageRecord], enabled: &[String]) {
    if catalog.is_empty() {
        println!("No packages in the catalog.");
        return;
    }
    for record in catalog {
        let marker = if enabled.contains(&record.package_name) {
            "*"
        } else {
            " "
        };
        println!("{} {}  {}", marker, record.package_name, record.description);
    }
    println!("\n* currently enabled");
}

async fn run_packages() -> anyhow::Result<()> {
    let config = DocsmithConfig::from_env()?;
    let supabase = SupabaseClient::from_env()?;

    let catalog = supabase.list_packages().await;
    if catalog.is_empty() {
        println!("No packages in the catalog.");
        return Ok(());
    }

    let local = local_packages(&config.project_root);
    for record in &catalog {
        let marker = if local.contains(&record.package_name) {
            "*"
        } else {
            " "
        };
        println!("{} {}  {}", marker, record.package_name, record.description);
    }
    println!("\n* detected in this project");
    Ok(())
}

async fn run_models() -> anyhow::Result<()> {
    let gateway = OpenRouterGateway::from_env()?;
    let models = gateway.list_tool_models().await?;
    if models.is_empty() {
        println!("No tool-capable models reported.");
        return Ok(());
    }
    for model in &models {
        println!("{}  {}", model.id, model.name);
    }
    Ok(())
}
