use std::env;

use anyhow::Result;
use split_notify_core::load_config;
use split_notify_core::tracing::{init_tracing_from_config, with_bootstrap_logging};
use split_notify_reminder::service::initialize;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::var("SPLIT_NOTIFY_CONFIG").ok();
    let app_config = with_bootstrap_logging(|| load_config(config_path.as_deref()));

    init_tracing_from_config(Some(&app_config.logging));

    let context = initialize(app_config).await?;

    info!(service = %context.config.service_name, "Starting reminder notifier");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    context.consumer.run_until(shutdown).await?;

    info!("Reminder notifier stopped");
    Ok(())
}
