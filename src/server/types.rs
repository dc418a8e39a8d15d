use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MODEL_NOT_LOADED: &str = "Model is not loaded.";

pub const ROOT_MESSAGE: &str =
    "Grammar Correction API is running. Go to /docs for documentation.";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CorrectionRequest {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CorrectionResponse {
    pub original_text: String,
    pub corrected_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// Body of a `200 OK` from `POST /correct`. Without a loaded model the body
/// carries an `error` field instead of the corrected text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CorrectionOutcome {
    Corrected(CorrectionResponse),
    Unavailable(ErrorResponse),
}
