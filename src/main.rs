use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memolink::config::ServerConfig;
use memolink::mail;
use memolink::server::{AppState, create_router};
use memolink::store::{SqliteStore, Store};
use memolink::types::PREMIUM_MEMORY_LIMIT;

const SECRET_FILE: &str = ".jwt_secret";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "memolink")]
#[command(about = "Backend for a memory graph of nodes, images and links", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory (database and signing secret)
    Init {
        /// Data directory for the database and uploaded images
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Start the server
    Serve {
        /// TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and uploaded images
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Move an account to the premium plan
    Premium {
        /// Email of the account
        #[arg(long)]
        email: String,

        /// Data directory for the database and uploaded images
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir.join("images"))?;

    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let secret_file = data_dir.join(SECRET_FILE);
    if secret_file.exists() {
        println!("Already initialized. Signing secret at {}", secret_file.display());
        return Ok(());
    }

    fs::write(&secret_file, generate_secret())?;
    #[cfg(unix)]
    set_restrictive_permissions(&secret_file);

    println!("Initialized memolink in {}", data_dir.display());
    println!("Signing secret written to {}", secret_file.display());
    Ok(())
}

/// Configured secret first, then the one written by `init`, then a random
/// secret that dies with the process.
fn resolve_secret(config: &ServerConfig) -> anyhow::Result<String> {
    if let Some(secret) = config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
        return Ok(secret.to_string());
    }

    let secret_file = config.data_dir.join(SECRET_FILE);
    if secret_file.exists() {
        let secret = fs::read_to_string(&secret_file)
            .with_context(|| format!("reading {}", secret_file.display()))?;
        return Ok(secret.trim().to_string());
    }

    warn!("No JWT secret configured, using a random one; tokens will not survive a restart");
    Ok(generate_secret())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    if !config.db_path().exists() {
        bail!("Server not initialized. Run 'memolink init' first to create the database.");
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let secret = resolve_secret(&config)?;
    let mailer = mail::from_config(
        &config.mail,
        config.upstream_timeout(),
        config.reset_token_ttl(),
    )?;
    let addr = config.socket_addr()?;

    let state = Arc::new(AppState::new(
        Arc::new(store),
        config,
        mailer,
        secret.as_bytes(),
    ));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_premium(email: &str, data_dir: &Path) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    if !config.db_path().exists() {
        bail!("Server not initialized. Run 'memolink init' first to create the database.");
    }

    let store = SqliteStore::new(config.db_path())?;
    let Some(user) = store.get_user_by_email(email)? else {
        bail!("No account with email '{email}'");
    };

    store.set_user_plan(&user.id, true, PREMIUM_MEMORY_LIMIT)?;
    println!("{email} is now premium");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("memolink=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => run_init(&data_dir)?,
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_serve(config, host, port, data_dir).await?,
        Commands::Premium { email, data_dir } => run_premium(&email, &data_dir)?,
    }

    Ok(())
}
