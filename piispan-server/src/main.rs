use std::sync::Arc;

use anyhow::Result;
use piispan::runtime::PiiModel;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use piispan_server::{AppState, cli::CliArgs, config::ServerConfig, create_app};

#[tokio::main]
async fn main() -> Result<()> {
    // Values already in the environment take precedence over .env
    let _ = dotenvy::dotenv();

    let cli_args = CliArgs::parse();
    let server_config = ServerConfig::from_env(cli_args)?;

    let _log_guard = piispan::logging::init(&server_config.logging)?;

    info!("Starting PII span detection server v{}", piispan::VERSION);
    for warning in &server_config.warnings {
        warn!("{}", warning);
    }
    info!(
        model_dir = %server_config.runtime.model_dir.display(),
        device = server_config.configured_device(),
        aggregation_strategy = %server_config.runtime.aggregation_strategy,
        score_threshold = ?server_config.runtime.score_threshold,
        warmup = server_config.runtime.warmup,
        inference_concurrency = server_config.inference_concurrency,
        "Server configuration loaded"
    );

    let app_state = Arc::new(load_model(server_config.clone()).await);

    let app = create_app(app_state);

    let addr = server_config.bind_address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on {}", addr);
    info!("API documentation available at http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Build the model once on a blocking thread; a failure leaves the server not ready
async fn load_model(config: ServerConfig) -> AppState {
    let runtime = config.runtime.clone();
    let loaded = tokio::task::spawn_blocking(move || PiiModel::load(&runtime)).await;

    match loaded {
        Ok(Ok(model)) => {
            info!(
                device = model.device(),
                labels = model.labels().len(),
                "Model loaded"
            );
            AppState::ready(model, config)
        }
        Ok(Err(e)) => {
            error!(error = %e, "Model initialization failed; serving in not-ready state");
            AppState::not_ready(e.to_string(), config)
        }
        Err(e) => {
            error!(error = %e, "Model initialization task failed; serving in not-ready state");
            AppState::not_ready(format!("Model initialization task failed: {}", e), config)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
