use std::sync::Arc;

use dublinpad::api::{ApiState, api_routes};
use dublinpad::config::AppConfig;
use dublinpad::error::ConfigError;
use dublinpad::flows::Pipeline;
use dublinpad::llm::create_provider;

#[tokio::main]
async fn main() -> dublinpad::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvVar(key)) => {
            eprintln!("Error: {} not set", key);
            eprintln!("  export {}=...", key);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    eprintln!("🏠 DublinPad v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Image model: {}", config.image_model);
    eprintln!("   Flows API: http://0.0.0.0:{}/api/flows", config.port);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);

    let llm = create_provider(&config.llm);
    let pipeline = Arc::new(Pipeline::new(llm, config.pipeline_options())?);

    let app = api_routes(ApiState { pipeline });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
