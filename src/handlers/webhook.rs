//! # Provider Webhook
//!
//! ## Endpoint: `POST /webhook`
//!
//! Deepgram posts the finished transcript (or an error body) here. This
//! endpoint answers `200 {"received": true}` no matter what happened while
//! processing the body: unknown request ids, unparseable JSON, oversized
//! bodies and duplicate deliveries are all logged and acknowledged. Any other
//! status would make the provider retry a delivery that can no longer change
//! anything.

use crate::jobs::{CallbackDisposition, CallbackOutcome, JobError};
use crate::provider::{parse_callback, ParsedCallback};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::{debug, error, warn};

const TOKEN_HEADER: &str = "dg-token";

pub async fn provider_callback(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: web::Payload,
) -> HttpResponse {
    if !req.headers().contains_key(TOKEN_HEADER) {
        warn!("Webhook received without {} header", TOKEN_HEADER);
    }

    let limit = state.config.upload.max_file_size_bytes;
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) if body.len() + chunk.len() <= limit => body.extend_from_slice(&chunk),
            Ok(_) => {
                error!(limit_bytes = limit, "Webhook body exceeds size limit, ignoring callback");
                return acknowledged();
            }
            Err(e) => {
                error!(error = %e, "Failed to read webhook body");
                return acknowledged();
            }
        }
    }

    match parse_callback(&body) {
        Ok(callback) => handle_callback(&state, callback),
        Err(e) => error!(error = %e, body_bytes = body.len(), "Could not parse webhook payload"),
    }

    acknowledged()
}

fn handle_callback(state: &AppState, callback: ParsedCallback) {
    let ParsedCallback { request_id, outcome } = callback;

    if let CallbackOutcome::Failure(detail) = &outcome {
        warn!(request_id = %request_id, error = %detail, "Provider reported transcription failure");
    }

    match state.jobs.apply_callback(&request_id, outcome) {
        Ok(CallbackDisposition::Applied(status)) => {
            debug!(request_id = %request_id, status = %status, "Webhook applied");
        }
        Ok(CallbackDisposition::AlreadyTerminal) => {
            debug!(request_id = %request_id, "Duplicate webhook delivery ignored");
        }
        Err(JobError::UnknownJob(request_id)) => {
            warn!(request_id = %request_id, "Received webhook for unknown request_id");
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Webhook could not be applied");
        }
    }
}

fn acknowledged() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "received": true }))
}
