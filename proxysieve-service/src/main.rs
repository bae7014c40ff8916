//! proxysieve
//!
//! Aggregates proxy connection descriptors from upstream lists, keeps the
//! allow-listed ones, probes them on a fast cadence and serves the best
//! per endpoint over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ps_cache::MemoryCache;
use ps_engine::prelude::*;
use ps_engine::SchedulerHandle;
use ps_http::prelude::*;
use ps_source::{DescriptorSource, FileSource, UrlSource};

mod config;

use config::{ServiceConfig, SourceConfig, SourceMode};

#[derive(Parser, Debug)]
#[command(name = "proxysieve")]
#[command(about = "Aggregate, probe and serve proxy connection descriptors")]
struct Args {
    /// Config file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// Where to read descriptors and allow-lists from
    #[arg(long, value_enum)]
    source_mode: Option<SourceMode>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Disable compression
    #[arg(long)]
    no_compression: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_file = ps_core::config::load_environment();
    init_tracing(args.json_logs)?;
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path);
    }

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::load_default()?,
    }
    .with_env_overrides();

    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(mode) = args.source_mode {
        config.source.mode = mode;
    }
    if args.no_cors {
        config.cors = false;
    }
    if args.no_compression {
        config.compression = false;
    }
    config.validate()?;

    let source = build_source(&config.source)?;

    // No degraded mode: without both allow-lists nothing can be filtered
    let filter = AllowListFilter::from_source(source.as_ref())
        .await
        .context("Failed to load allow-lists")?;

    let cache = Arc::new(MemoryCache::new());
    let prober = Arc::new(TcpProber::new(config.probe_timeout(), config.score_policy));
    let updater = Arc::new(DescriptorUpdater::new(
        cache.clone(),
        Arc::new(filter),
        source,
        prober,
        config.updater_settings(),
    ));

    let shutdown = CancellationToken::new();

    let server = HttpServer::builder()
        .bind(config.bind.clone())
        .middleware(
            MiddlewareConfig::new()
                .cors(config.cors)
                .compression(config.compression)
                .timeout(config.request_timeout()),
        )
        .router(create_router(AppState::new(cache.clone())))
        .build()?
        .spawn(shutdown.clone())
        .await
        .context("Failed to start HTTP server")?;

    let scheduler = Scheduler::new(updater, config.scheduler_config()).spawn(shutdown.clone());

    tokio::spawn(shutdown_signal(shutdown.clone()));

    drain(server, scheduler, &shutdown, config.shutdown_grace()).await?;

    info!("Cache stats at shutdown: {:?}", cache.stats().await);
    info!("Shutdown complete");
    Ok(())
}

/// Wait for the server to stop, then stop the scheduler. Each side gets at
/// most `grace` once `shutdown` is cancelled.
async fn drain(
    server: ServerHandle,
    scheduler: SchedulerHandle,
    shutdown: &CancellationToken,
    grace: Duration,
) -> Result<()> {
    let served = server.wait(grace).await;
    // The server may also stop on its own
    shutdown.cancel();

    if !scheduler.shutdown(grace).await {
        warn!("Scheduler tasks were aborted after the grace period");
    }

    if !served.context("HTTP server failed")? {
        warn!("HTTP server was aborted after the grace period");
    }
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("proxysieve_service=info".parse()?)
        .add_directive("ps_engine=info".parse()?)
        .add_directive("ps_source=info".parse()?)
        .add_directive("ps_http=info".parse()?)
        .add_directive("tower_http=debug".parse()?);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn build_source(config: &SourceConfig) -> Result<Arc<dyn DescriptorSource>> {
    let source: Arc<dyn DescriptorSource> = match config.mode {
        SourceMode::Remote => {
            info!(
                "Using {} remote descriptor lists",
                config.descriptor_urls.len()
            );
            Arc::new(
                UrlSource::new(
                    config.descriptor_urls.clone(),
                    config.prefixes_url.clone(),
                    config.names_url.clone(),
                    config.fetch_timeout(),
                )
                .context("Failed to build HTTP client")?,
            )
        }
        SourceMode::Local => {
            info!(
                "Using {} local descriptor files",
                config.descriptor_files.len()
            );
            Arc::new(FileSource::new(
                config.descriptor_files.clone(),
                config.prefixes_file.clone(),
                config.names_file.clone(),
            ))
        }
    };
    Ok(source)
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
        _ = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
