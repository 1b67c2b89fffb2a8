use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use inventory_engine as engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = engine::config::load_config().context("failed to load configuration")?;
    engine::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = engine::db::establish_connection_from_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        engine::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_sender, event_rx) =
        engine::events::EventSender::channel(cfg.event_channel_capacity);
    let event_loop = tokio::spawn(engine::events::process_events(event_rx));

    let inventory = engine::InventoryEngine::new(db_arc.clone(), event_sender, &cfg);
    let reaper = inventory.expiration_reaper().spawn();

    info!(
        interval_secs = cfg.reaper_interval_secs,
        batch_size = cfg.reaper_batch_size,
        "inventory-reaper running"
    );

    shutdown_signal().await;
    info!("Shutdown signal received; stopping expiration reaper");

    reaper.shutdown().await;

    // Dropping the last sender ends the event loop once it has drained.
    drop(inventory);
    if let Err(e) = event_loop.await {
        error!(error = %e, "Event loop task failed");
    }

    info!("inventory-reaper stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
