use super::{T5Model, select_device};
use crate::{
    Result,
    config::{GenerationConfig, ModelConfig},
    pipeline::{CorrectionPipeline, GrammarTokenizer},
};
use std::sync::Arc;
use tracing::{error, info};

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Loads the tokenizer and model once at startup.
///
/// Failures are logged and yield `None`: the service keeps running without a
/// model and reports it as not loaded. The pipeline only exists when both the
/// tokenizer and the model loaded.
pub fn load_pipeline(
    model: &ModelConfig,
    generation: &GenerationConfig,
) -> Option<Arc<CorrectionPipeline>> {
    info!("Loading model and tokenizer...");
    match try_load(model, generation) {
        Ok(pipeline) => {
            info!(
                "Model and tokenizer loaded successfully on {}",
                pipeline.device_name()
            );
            Some(Arc::new(pipeline))
        }
        Err(e) => {
            error!("Error loading model: {}", e);
            None
        }
    }
}

fn try_load(model: &ModelConfig, generation: &GenerationConfig) -> Result<CorrectionPipeline> {
    let dir = model.resolve_dir()?;
    info!("Model directory: {}", dir.display());

    let device = select_device(model.device)?;
    let t5 = T5Model::load(&dir, &device)?;
    let tokenizer = GrammarTokenizer::from_file(
        dir.join(TOKENIZER_FILE),
        generation.max_input_tokens,
        t5.pad_token_id(),
    )?;

    Ok(CorrectionPipeline::new(tokenizer, Box::new(t5), generation))
}
