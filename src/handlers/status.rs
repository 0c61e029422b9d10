//! # Job Status Polling
//!
//! ## Endpoint: `GET /status/{request_id}`
//!
//! - `200` with `{"status": "processing" | "completed" | "failed", ...}` for tracked jobs
//! - `404` with `{"status": "unknown", ...}` for ids that were never registered
//!   or have already been reclaimed; clients should stop polling

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn job_status(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let request_id = path.into_inner();
    let view = state.status.query(&request_id);

    if view.is_unknown() {
        return HttpResponse::NotFound().json(json!({
            "status": "unknown",
            "request_id": request_id,
            "error": "Request ID not found"
        }));
    }

    HttpResponse::Ok().json(view)
}
