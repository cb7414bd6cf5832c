// Route exports
pub mod live;
pub mod users;

use actix_web::{error, web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::core::{MatchEngine, Notifier};
use crate::models::ErrorResponse;
use crate::services::{ConnectionRegistry, RatingStore, UploadClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub notifier: Notifier,
    pub registry: Arc<ConnectionRegistry>,
    pub uploads: Arc<UploadClient>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RatingStore>,
        registry: Arc<ConnectionRegistry>,
        uploads: Arc<UploadClient>,
    ) -> Self {
        let engine = Arc::new(MatchEngine::new(store));
        let notifier = Notifier::new(engine.clone(), registry.clone());
        Self {
            engine,
            notifier,
            registry,
            uploads,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
        .app_data(web::PathConfig::default().error_handler(handle_path_error))
        .route("/ws", web::get().to(live::live_updates))
        .service(web::scope("/api/v1").configure(users::configure));
}

fn bad_request(error: &str, message: String) -> actix_web::Error {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    };
    error::InternalError::from_response(body.message.clone(), HttpResponse::BadRequest().json(body))
        .into()
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    bad_request("invalid_json", format!("Invalid JSON: {}", err))
}

/// Handle malformed path parameters (e.g. non-numeric user ids)
pub fn handle_path_error(err: error::PathError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Path error on {}: {}", req.path(), err);
    bad_request("invalid_path", format!("Invalid path: {}", err))
}
