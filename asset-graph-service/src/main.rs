use std::sync::Arc;

use asset_graph::graph::Neo4jAssetGraph;
use asset_graph::KnowledgeGraph;
use asset_graph_service::{router, AppState, ServiceConfig, ServiceInfo};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("asset_graph_service=info".parse()?)
                .add_directive("asset_graph=info".parse()?),
        )
        .json()
        .init();

    info!("asset-graph-service starting");

    // ── Config ────────────────────────────────────────────────────────────────
    let config = ServiceConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    // ── Graph ─────────────────────────────────────────────────────────────────
    // A missing or unreachable store leaves the service up but uninitialized.
    let graph = match &config.graph {
        Some(graph_config) => match Neo4jAssetGraph::from_config(graph_config).await {
            Ok(graph) => {
                info!(
                    neo4j_uri = %graph_config.neo4j_uri,
                    model = %graph_config.model_name,
                    group_id = %graph.default_group(),
                    "graph initialized"
                );
                Some(Arc::new(graph))
            }
            Err(e) => {
                error!(error = %e, "graph initialization failed");
                None
            }
        },
        None => {
            warn!(
                reason = config.graph_error.as_deref().unwrap_or("unknown"),
                "graph not configured"
            );
            None
        }
    };

    let state = AppState::new(graph.clone(), ServiceInfo::from_config(config.graph.as_ref()));
    let app = router(state);

    // ── Listen ────────────────────────────────────────────────────────────────
    info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(graph) = graph {
        if let Err(e) = graph.close().await {
            warn!(error = %e, "closing graph store");
        }
    }

    info!("server stopped");
    Ok(())
}

/// Graceful shutdown on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl-C, shutting down"); }
        _ = terminate => { info!("received SIGTERM, shutting down"); }
    }
}
