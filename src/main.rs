use socialize::config::Config;
use socialize::database::connect_and_migrate;
use socialize::{AppState, create_app};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialize=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;
    tracing::info!("Configuration loaded successfully");

    let addr = format!("{}:{}", config.host, config.port);

    // Create application state
    let state = match config.database_url.clone() {
        Some(database_url) => {
            let db = connect_and_migrate(&database_url).await?;
            AppState::postgres(db, config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            AppState::in_memory(config)
        }
    };

    // Create application
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
