use egauge_monitor::{
    api::{create_router, AppState},
    Config, PollScheduler, ProjectRegistry, SnapshotClient,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting egauge-monitor");

    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    let timezone = cfg.timezone()?;
    info!(
        path = %cfg_path,
        interval_secs = cfg.poll.interval_secs,
        threshold_w = cfg.alarm.threshold_w,
        timezone = %timezone,
        "Configuration loaded"
    );

    let registry = ProjectRegistry::new();
    for project in cfg.projects.iter().cloned() {
        let name = project.name.clone();
        registry
            .add(project)
            .map_err(|e| anyhow::anyhow!("invalid project '{}' in config: {}", name, e))?;
    }
    info!("registered {} project(s) from config", registry.len());

    let client = SnapshotClient::new(cfg.request_timeout(), timezone)?;
    let scheduler = Arc::new(PollScheduler::new(
        registry.clone(),
        Arc::new(client),
        cfg.scheduler_config(),
    ));

    let state = AppState::new(registry, &scheduler);
    let router = create_router(state);

    let poller = scheduler.clone();
    let poll_handle = tokio::spawn(async move {
        poller.run().await;
    });

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    info!("API server listening on {}", addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "API server error");
    }

    poll_handle.abort();

    info!("Application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
