use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use grammar_correction::{
    config::GenerationConfig,
    model::Seq2SeqModel,
    pipeline::{CorrectionPipeline, GrammarTokenizer},
    server::{self, handlers::AppState},
    worker::InferencePool,
};
use serde_json::Value;
use std::{str::FromStr, sync::Arc, time::Duration};
use tokenizers::Tokenizer;
use tower::ServiceExt; // for `oneshot`

pub const PAD_ID: u32 = 0;
pub const EOS_ID: u32 = 1;
pub const GO: u32 = 6;
pub const WENT: u32 = 7;
pub const WALK: u32 = 13;
pub const WALKS: u32 = 14;
pub const VOCAB_SIZE: usize = 16;

/// Ids of `grammar` and `:`.
pub const TASK_PREFIX_IDS: [u32; 2] = [3, 4];

/// Word-level tokenizer in the `tokenizer.json` format, appending `</s>` to
/// every sequence the way T5 tokenizers do.
pub const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [
        {"id": 0, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 1, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 2, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
    ],
    "normalizer": null,
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": {
        "type": "TemplateProcessing",
        "single": [{"Sequence": {"id": "A", "type_id": 0}}, {"SpecialToken": {"id": "</s>", "type_id": 0}}],
        "pair": [{"Sequence": {"id": "A", "type_id": 0}}, {"SpecialToken": {"id": "</s>", "type_id": 0}}, {"Sequence": {"id": "B", "type_id": 0}}, {"SpecialToken": {"id": "</s>", "type_id": 0}}],
        "special_tokens": {"</s>": {"id": "</s>", "ids": [1], "tokens": ["</s>"]}}
    },
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "<pad>": 0, "</s>": 1, "<unk>": 2, "grammar": 3, ":": 4,
            "He": 5, "go": 6, "went": 7, "to": 8, "school": 9, "yesterday": 10,
            ".": 11, "She": 12, "walk": 13, "walks": 14, "x": 15
        },
        "unk_token": "<unk>"
    }
}"#;

pub fn create_tokenizer(max_length: usize) -> GrammarTokenizer {
    let inner = Tokenizer::from_str(TOKENIZER_JSON).unwrap();
    GrammarTokenizer::new(inner, max_length, PAD_ID).unwrap()
}

pub fn create_pipeline(model: impl Seq2SeqModel + 'static) -> Arc<CorrectionPipeline> {
    let config = GenerationConfig::default();
    Arc::new(CorrectionPipeline::new(
        create_tokenizer(config.max_input_tokens),
        Box::new(model),
        &config,
    ))
}

pub fn create_app(pipeline: Option<Arc<CorrectionPipeline>>, timeout: Duration) -> Router {
    server::router(AppState {
        pipeline,
        pool: InferencePool::new(2, timeout),
    })
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Sends a request and returns the status with the body parsed as JSON
/// (`Value::Null` for non-JSON bodies).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
