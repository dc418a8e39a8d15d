use super::types::{
    CorrectionOutcome, CorrectionRequest, CorrectionResponse, ErrorResponse, MODEL_NOT_LOADED,
    ROOT_MESSAGE, RootResponse,
};
use crate::{Error, pipeline::CorrectionPipeline, worker::InferencePool};
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything a request needs, built once at startup. `pipeline` is `None`
/// when the model failed to load.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Option<Arc<CorrectionPipeline>>,
    pub pool: InferencePool,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// Accepts a text string and returns its grammatically corrected version.
#[utoipa::path(
    post,
    path = "/correct",
    request_body = CorrectionRequest,
    responses(
        (status = 200, description = "Corrected text", body = CorrectionResponse),
        (status = 500, description = "Inference failed", body = ErrorResponse),
        (status = 503, description = "Inference pool is shutting down", body = ErrorResponse),
        (status = 504, description = "Inference timed out", body = ErrorResponse)
    )
)]
pub async fn correct(
    State(state): State<AppState>,
    Json(request): Json<CorrectionRequest>,
) -> Result<Json<CorrectionOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let Some(pipeline) = state.pipeline.clone() else {
        warn!("Rejecting correction request: model is not loaded");
        return Ok(Json(CorrectionOutcome::Unavailable(ErrorResponse {
            error: MODEL_NOT_LOADED.to_string(),
        })));
    };

    let request_id = Uuid::new_v4();
    info!(
        "Received correction request {} ({} chars)",
        request_id,
        request.text.chars().count()
    );

    let text = request.text.clone();
    match state
        .pool
        .submit(move |cancel| pipeline.correct(&text, cancel))
        .await
    {
        Ok(corrected_text) => {
            info!("Completed correction request {}", request_id);
            Ok(Json(CorrectionOutcome::Corrected(CorrectionResponse {
                original_text: request.text,
                corrected_text,
            })))
        }
        Err(e) => {
            error!("Failed to correct request {}: {}", request_id, e);
            Err((
                status_for(&e),
                Json(ErrorResponse {
                    error: format!("Inference error: {}", e),
                }),
            ))
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Cancelled | Error::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
