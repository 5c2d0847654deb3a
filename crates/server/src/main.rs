use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use babelfish::chat::ChatSession;
use babelfish::clients::openrouter::OpenRouterClient;
use babelfish::config::Config;
use babelfish::routes::{self, WebState};
use babelfish_mcp::{McpServer, ToolRouter};
use chess_analysis::analyzer::explain;
use chess_analysis::{ChessAnalyzer, StockfishEngine};
use chess_core::STARTING_FEN;

const DEMO_DEPTH: u32 = 15;

#[derive(Parser)]
#[command(name = "babelfish", version, about = "Speak to your chess engine")]
struct Cli {
    /// Run the MCP server on stdin/stdout
    #[arg(long)]
    mcp: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse the starting position to check the Stockfish setup
    Demo,
    /// Run the MCP server on stdin/stdout
    Mcp,
    /// Serve the web interface
    Web {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// OpenRouter model
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive chat in the terminal
    Chat {
        #[arg(long)]
        model: Option<String>,
        /// OpenRouter API key (defaults to OPENROUTER_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Call one tool with JSON arguments and print the result
    Tool {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn start_router(config: &Config) -> anyhow::Result<ToolRouter<StockfishEngine>> {
    let path = &config.engine.stockfish_path;
    let engine = StockfishEngine::new(&config.engine)
        .await
        .with_context(|| format!("failed to start Stockfish at '{path}'"))?;
    Ok(ToolRouter::new(Arc::new(ChessAnalyzer::new(engine))))
}

fn print_install_hints() {
    println!("Make sure Stockfish is installed on your system");
    println!("Ubuntu/Debian: sudo apt install stockfish");
    println!("macOS: brew install stockfish");
    println!("Or point STOCKFISH_PATH at the binary.");
}

async fn demo(config: &Config) -> ExitCode {
    println!("🐟 Babelfish Chess Analyzer Demo");
    println!("================================");
    println!("\nAnalyzing starting position:");
    println!("FEN: {STARTING_FEN}");

    let result = async {
        let router = start_router(config).await?;
        let analyzer = router.analyzer();
        let analysis = analyzer.analyze_position(STARTING_FEN, DEMO_DEPTH).await?;
        analyzer.shutdown().await;
        anyhow::Ok(analysis)
    }
    .await;

    match result {
        Ok(analysis) => {
            println!(
                "Best move: {}",
                analysis.best_move.as_deref().unwrap_or("(none)")
            );
            println!("Evaluation: {}", analysis.evaluation);
            println!("Explanation: {}", explain(&analysis));
            println!("\n✅ Demo completed successfully!");
            println!("\nTo use Babelfish as an MCP server, run:");
            println!("  babelfish --mcp");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error: {e:#}");
            print_install_hints();
            println!("\n❌ Demo failed. Please check Stockfish installation.");
            ExitCode::FAILURE
        }
    }
}

async fn run_mcp(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting Babelfish MCP server");
    let router = start_router(config).await?;
    McpServer::new(router)
        .serve_stdio()
        .await
        .context("MCP server I/O failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn run_web(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    model: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(model) = model {
        config.model = model;
    }

    let model = match &config.api_key {
        Some(key) => Some(Arc::new(OpenRouterClient::new(key.clone(), &config.base_url)?)),
        None => {
            tracing::warn!("OPENROUTER_API_KEY not set; /analyze will report an error until it is");
            None
        }
    };

    let router = start_router(&config).await?;
    let state = WebState {
        router: router.clone(),
        model,
        model_name: config.model.clone(),
    };
    let app = routes::app(state);

    let addr = format!("{}:{}", config.host, config.port);
    println!("🐟 Babelfish Chess Analysis Web Interface");
    println!("🔑 Using API key: {}", config.masked_key());
    println!("🤖 Using model: {}", config.model);
    println!("📍 URL: http://{addr}");
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    router.analyzer().shutdown().await;
    Ok(())
}

async fn run_chat(
    config: Config,
    model: Option<String>,
    api_key: Option<String>,
) -> anyhow::Result<ExitCode> {
    let Some(api_key) = api_key.or(config.api_key.clone()) else {
        eprintln!("Error: OpenRouter API key required.");
        eprintln!("Set OPENROUTER_API_KEY environment variable or use --api-key");
        return Ok(ExitCode::FAILURE);
    };
    let model = model.unwrap_or_else(|| config.model.clone());

    let client = OpenRouterClient::new(api_key, &config.base_url)?;
    let router = start_router(&config).await?;
    let mut session = ChatSession::new(router.clone(), client, &model);
    session.run().await?;
    router.analyzer().shutdown().await;
    Ok(ExitCode::SUCCESS)
}

async fn run_tool(config: &Config, name: &str, args: &str) -> anyhow::Result<ExitCode> {
    let args: serde_json::Value =
        serde_json::from_str(args).context("tool arguments must be a JSON object")?;
    let router = start_router(config).await?;
    let output = router.call(name, args).await;
    router.analyzer().shutdown().await;

    println!("{}", output.text);
    Ok(if output.is_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = match (cli.mcp, cli.command) {
        (true, _) => Command::Mcp,
        (false, Some(command)) => command,
        (false, None) => Command::Demo,
    };

    let default_filter = match command {
        Command::Mcp | Command::Web { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_filter);

    let config = Config::from_env();

    match command {
        Command::Demo => Ok(demo(&config).await),
        Command::Mcp => {
            run_mcp(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Web { host, port, model } => {
            run_web(config, host, port, model).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Chat { model, api_key } => run_chat(config, model, api_key).await,
        Command::Tool { name, args } => run_tool(&config, &name, &args).await,
    }
}
