use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod apply;
pub mod cache;
pub mod config;
pub mod probes;
pub mod resources;
pub mod runner;
pub mod state;
pub mod store;
pub mod vars;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gantry server...");

    let config = config::Config::from_env();
    config.validate().expect("Invalid configuration");

    tracing::info!(
        "Automation project root: {}",
        config.project_root.display()
    );

    let addr = config.bind_addr.clone();
    let state = state::AppState::new(config);

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
