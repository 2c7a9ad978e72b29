use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod model;
mod service;

use app::AppState;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    // Detector load failure is a deployment error: fail fast at startup
    let state = AppState::new(config).expect("Failed to initialize application state");

    let analysis = web::Data::from(state.analysis.clone());
    let knowledge = web::Data::from(state.knowledge.clone());
    let config = web::Data::new(state.config.clone());

    tracing::info!(addr = %bind_addr, "Starting SIR inspection AI service");

    HttpServer::new(move || {
        App::new()
            .app_data(analysis.clone())
            .app_data(knowledge.clone())
            .app_data(config.clone())
            .configure(api::analyze::configure)
            .configure(api::chat::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
