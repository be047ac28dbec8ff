use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use apihub::config::ServerConfig;
use apihub::server::{AppState, create_router};
use apihub::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "apihub")]
#[command(about = "Account and authorization server for API management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file. Flags given on the command line take precedence.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Lifetime of issued tokens, in seconds
        #[arg(long)]
        token_ttl: Option<i64>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the data directory and database schema
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Delete every expired access token
    ReapTokens {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn db_path(data_dir: &Path) -> PathBuf {
    ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    }
    .db_path()
}

fn open_existing(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let db_path = db_path(data_dir);
    if !db_path.exists() {
        bail!("Server not initialized. Run 'apihub admin init' first to create the database.");
    }
    Ok(SqliteStore::new(&db_path)?)
}

fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;

    let db_path = db_path(data_dir);
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());
    Ok(())
}

fn run_reap_tokens(data_dir: &Path) -> anyhow::Result<()> {
    let store = open_existing(data_dir)?;
    store.initialize()?;

    let removed = store.delete_expired_tokens(Utc::now())?;
    store.close()?;

    println!("Removed {removed} expired token(s)");
    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    token_ttl: Option<i64>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => ServerConfig::from_file(&path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(token_ttl) = token_ttl {
        config.token_ttl_seconds = token_ttl;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("apihub=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(&data_dir)?,
            AdminCommands::ReapTokens { data_dir } => run_reap_tokens(&data_dir)?,
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            token_ttl,
        } => {
            let config = load_config(config, host, port, data_dir, token_ttl)?;

            let store = open_existing(&config.data_dir)?;
            store.initialize()?;

            let state = Arc::new(AppState::new(Arc::new(store), config.token_ttl_seconds));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
