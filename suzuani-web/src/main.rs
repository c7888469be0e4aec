//! suzuani-web - SuzuAni catalog service
//!
//! Anime, manga and music catalog with accounts, likes, comments and an
//! administrative JSON surface. Zero-config startup: the root folder,
//! database, upload tree and mail spool are created on first run.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use suzuani_common::config::{secret_key_override, RootFolderInitializer, RootFolderResolver, TomlConfig};
use suzuani_common::db::{ensure_admin_user, get_setting_i64, init_database, load_secret_key};
use suzuani_common::mail::SpoolMailer;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use suzuani_web::db::sessions;
use suzuani_web::session::unix_now;
use suzuani_web::uploads::UploadStore;
use suzuani_web::{build_router, AppState};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: i64 = 10 * 1024 * 1024;

/// Command-line arguments for suzuani-web
#[derive(Parser, Debug)]
#[command(name = "suzuani-web")]
#[command(about = "SuzuAni anime, manga and music catalog service")]
#[command(version)]
struct Args {
    /// Root folder holding the database, uploads and mail spool
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "SUZUANI_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SUZUANI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = TomlConfig::load_or_default();
    let config = &loaded.config;

    // RUST_LOG wins over the TOML level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting SuzuAni (suzuani-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.log();

    let root_folder = RootFolderResolver::new("suzuani-web")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if !ensure_admin_user(&pool, &config.admin).await? {
        info!("Administrator account '{}' present", config.admin.username);
    }

    let secret_key = match secret_key_override(config) {
        Some(key) => {
            info!("Using secret key from environment/config");
            key
        }
        None => load_secret_key(&pool).await?,
    };

    let max_upload = get_setting_i64(&pool, "http_max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES).await?;
    let max_upload = usize::try_from(max_upload).unwrap_or_else(|_| {
        warn!("Invalid http_max_upload_bytes {}, using default", max_upload);
        DEFAULT_MAX_UPLOAD_BYTES as usize
    });
    let uploads = UploadStore::new(initializer.static_path(), max_upload);
    uploads.ensure_folders()?;

    let spool_dir = config
        .mail
        .spool_dir
        .clone()
        .unwrap_or_else(|| initializer.mail_spool_path());
    info!("Outgoing mail spooled to {}", spool_dir.display());
    let mailer = Arc::new(SpoolMailer::new(spool_dir));

    let purged = sessions::purge_expired(&pool, unix_now()).await?;
    if purged > 0 {
        info!("Purged {} expired session(s)", purged);
    }

    let state = AppState::new(pool, secret_key, mailer, config.mail.clone(), uploads);
    let app = build_router(state);

    let bind = args
        .bind
        .or(config.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("suzuani-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
