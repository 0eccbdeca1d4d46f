use std::net::SocketAddr;
use std::sync::Arc;
use tailrisk::{api, config::Config, CsvDataSource, DataSource, StressRunner};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let datasource: Arc<dyn DataSource> = Arc::new(CsvDataSource::new(config.data_dir.clone()));
    let runner = Arc::new(StressRunner::new(datasource));

    tracing::info!(
        data_dir = %config.data_dir,
        weight_mode = %config.weight_mode,
        drivers = config.driver_count,
        "Stress engine configured"
    );

    let app = api::create_router(api::AppState::new(config, runner));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
