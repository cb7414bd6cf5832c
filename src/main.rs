use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use swipe_match::config::Settings;
use swipe_match::routes::{self, AppState};
use swipe_match::services::{ConnectionRegistry, MemoryStore, PostgresStore, RatingStore, UploadClient};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    init_logging();

    info!("Starting Swipe Match service...");

    let settings = Settings::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        io_error("Configuration error", e)
    })?;

    info!("Configuration loaded successfully");

    let store: Arc<dyn RatingStore> = match settings.database.url.as_deref() {
        Some(url) => {
            let postgres = PostgresStore::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                io_error("PostgreSQL connection error", e)
            })?;
            info!(
                "PostgreSQL store initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            Arc::new(postgres)
        }
        None => {
            warn!("No database url configured, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Arc::new(ConnectionRegistry::new(
        settings.live.send_timeout(),
        settings.live.channel_capacity,
    ));

    info!(
        "Connection registry initialized (send timeout: {:?}, capacity: {})",
        settings.live.send_timeout(),
        settings.live.channel_capacity
    );

    let uploads = Arc::new(
        UploadClient::new(settings.upload.endpoint.clone(), settings.upload.timeout())
            .map_err(|e| io_error("Upload client error", e))?,
    );

    info!("Upload client targeting {}", uploads.endpoint());

    let app_state = AppState::new(store, registry, uploads);

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
