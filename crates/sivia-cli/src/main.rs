mod engine;
mod gemini;
mod http;
mod mcp;
mod retriever;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use sivia_core::{EngineConfig, FaqTable, KnowledgeBase};
use sivia_store::DataDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::engine::CognitiveEngine;

const TERMINAL_SESSION: &str = "terminal";
const EXIT_WORDS: &[&str] = &["salir", "exit", "quit"];

#[derive(Parser)]
#[command(name = "sivia", about = "SIVIA assistant: HTTP API, MCP server and terminal chat")]
struct Cli {
    /// Data directory (default: $SIVIA_DATA_DIR or ~/.sivia)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Directory of static files served next to the API
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Start MCP server on stdio transport
    Mcp,

    /// Interactive chat in the terminal
    Chat,

    /// Ask a single question and print the reply
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Session id, to continue a conversation
        #[arg(long, default_value = TERMINAL_SESSION)]
        session: String,
    },

    /// Answer from the static FAQ table only
    Faq {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Inspect or edit the knowledge base
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },
}

#[derive(Subcommand)]
enum KnowledgeAction {
    /// List all entries
    List,
    /// Print one entry
    Get { key: String },
    /// Add or replace an entry
    Set { key: String, answer: String },
    /// Write the built-in entries to disk
    Init {
        /// Overwrite an existing knowledge file
        #[arg(long)]
        force: bool,
    },
}

fn open_data_dir(cli: &Cli) -> Result<DataDir> {
    DataDir::open(cli.data_dir.as_deref()).context("failed to open data directory")
}

fn load_config(dir: &DataDir) -> Result<EngineConfig> {
    dir.load_config()
        .with_context(|| format!("failed to load {}", dir.config_path().display()))
}

/// Config, knowledge file ensured on disk, engine.
fn start_engine(dir: &DataDir) -> Result<(EngineConfig, Arc<CognitiveEngine>)> {
    let config = load_config(dir)?;
    let kb = dir
        .knowledge()
        .load_or_init()
        .context("failed to initialize knowledge base")?;
    tracing::info!(entries = kb.len(), "knowledge base ready");
    let engine = CognitiveEngine::from_config(&config).context("failed to build engine")?;
    tracing::info!(mode = engine.mode().as_str(), "engine initialized");
    Ok((config, Arc::new(engine)))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => cmd_serve(&cli, *host, *port, static_dir.as_deref()).await,
        Commands::Mcp => cmd_mcp(&cli).await,
        Commands::Chat => cmd_chat(&cli).await,
        Commands::Ask { text, session } => cmd_ask(&cli, &text.join(" "), session).await,
        Commands::Faq { text } => {
            println!("{}", FaqTable::builtin().reply(&text.join(" ")));
            Ok(())
        }
        Commands::Knowledge { action } => cmd_knowledge(&cli, action),
    }
}

async fn cmd_serve(
    cli: &Cli,
    host: Option<IpAddr>,
    port: Option<u16>,
    static_dir: Option<&Path>,
) -> Result<()> {
    let dir = open_data_dir(cli)?;
    let (config, engine) = start_engine(&dir)?;

    let host: IpAddr = match host {
        Some(h) => h,
        None => config
            .server
            .host
            .parse()
            .with_context(|| format!("invalid server.host '{}'", config.server.host))?,
    };
    let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));
    let static_dir = static_dir
        .map(PathBuf::from)
        .or_else(|| config.server.static_dir.as_ref().map(PathBuf::from));
    if let Some(path) = &static_dir
        && !path.is_dir()
    {
        bail!("static directory {} does not exist", path.display());
    }

    let state = http::AppState {
        engine,
        knowledge: dir.knowledge(),
    };
    eprintln!("SIVIA listening on http://{addr}");
    http::serve(state, addr, static_dir.as_deref()).await
}

async fn cmd_mcp(cli: &Cli) -> Result<()> {
    let dir = open_data_dir(cli)?;
    let (_, engine) = start_engine(&dir)?;
    tracing::info!("starting MCP server");

    let server = mcp::SiviaServer::new(engine, dir.knowledge());
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

async fn cmd_chat(cli: &Cli) -> Result<()> {
    let dir = open_data_dir(cli)?;
    let (_, engine) = start_engine(&dir)?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(
            "SIVIA lista. Escribe tu pregunta y presiona Enter. Escribe 'salir' para terminar.\n\n"
                .as_bytes(),
        )
        .await?;

    loop {
        stdout.write_all("Tú: ".as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            stdout.write_all("¡Hasta luego!\n".as_bytes()).await?;
            break;
        }
        let out = match engine.respond_in_session(TERMINAL_SESSION, input).await {
            Ok(reply) => format!("SIVIA:\n{}\n\n", reply.text),
            Err(e) => format!("Error: {e}\n\n"),
        };
        stdout.write_all(out.as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn cmd_ask(cli: &Cli, text: &str, session: &str) -> Result<()> {
    let dir = open_data_dir(cli)?;
    let (_, engine) = start_engine(&dir)?;
    let reply = engine
        .respond_in_session(session, text.trim())
        .await
        .context("no reply")?;
    println!("{}", reply.text);
    Ok(())
}

fn cmd_knowledge(cli: &Cli, action: &KnowledgeAction) -> Result<()> {
    let dir = open_data_dir(cli)?;
    let file = dir.knowledge();

    match action {
        KnowledgeAction::List => {
            let kb = file.load().context("failed to load knowledge base")?;
            for (key, answer) in kb.iter() {
                let first_line = answer.lines().next().unwrap_or_default();
                println!("{key:<20} {first_line}");
            }
        }
        KnowledgeAction::Get { key } => {
            let kb = file.load().context("failed to load knowledge base")?;
            match kb.get(key) {
                Some(answer) => println!("{answer}"),
                None => bail!("no entry named '{key}'"),
            }
        }
        KnowledgeAction::Set { key, answer } => {
            if key.trim().is_empty() {
                bail!("key must not be empty");
            }
            let mut kb = file.load().context("failed to load knowledge base")?;
            let replaced = kb.insert(key.trim(), answer).is_some();
            file.save(&kb).context("failed to save knowledge base")?;
            println!(
                "{} '{}' ({} entries)",
                if replaced { "updated" } else { "added" },
                key.trim(),
                kb.len()
            );
        }
        KnowledgeAction::Init { force } => {
            if file.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    file.path().display()
                );
            }
            let kb = KnowledgeBase::builtin();
            file.save(&kb).context("failed to save knowledge base")?;
            println!("wrote {} entries to {}", kb.len(), file.path().display());
        }
    }
    Ok(())
}
