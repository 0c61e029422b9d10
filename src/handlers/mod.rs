pub mod status;
pub mod upload;
pub mod webhook;

pub use status::*;
pub use upload::*;
pub use webhook::*;

use actix_web::web;

/// Register every route the service exposes.
///
/// ## Routes:
/// - `POST /upload`: start a transcription job
/// - `POST /webhook`: provider callback (always acknowledged)
/// - `GET /status/{request_id}`: poll a job
/// - `GET /health`, `GET /api/v1/health`, `GET /api/v1/metrics`: monitoring
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload_audio))
        .route("/webhook", web::post().to(provider_callback))
        .route("/status/{request_id}", web::get().to(job_status))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(crate::health::health_check))
                .route("/metrics", web::get().to(crate::health::detailed_metrics)),
        )
        .route("/health", web::get().to(crate::health::health_check));
}
