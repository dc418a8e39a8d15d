pub mod generation;
mod tokenizer;

pub use generation::{BeamSearchParams, beam_search};
pub use tokenizer::{EncodedInput, GrammarTokenizer};

use crate::{Result, config::GenerationConfig, model::Seq2SeqModel};
use candle_core::Tensor;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tokenizer and model loaded at startup. Immutable once built; every call
/// to [`CorrectionPipeline::correct`] works on its own fork of the model.
pub struct CorrectionPipeline {
    tokenizer: GrammarTokenizer,
    model: Box<dyn Seq2SeqModel>,
    task_prefix: String,
    params: BeamSearchParams,
}

impl CorrectionPipeline {
    pub fn new(
        tokenizer: GrammarTokenizer,
        model: Box<dyn Seq2SeqModel>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            tokenizer,
            model,
            task_prefix: config.task_prefix.clone(),
            params: BeamSearchParams::from(config),
        }
    }

    pub fn device_name(&self) -> &'static str {
        crate::model::device_name(self.model.device())
    }

    /// Prefixes the task instruction, encodes to a fixed width, runs beam
    /// search and decodes the best sequence. Blocks for the whole generation.
    pub fn correct(&self, text: &str, cancel: &CancellationToken) -> Result<String> {
        let prompt = format!("{}{}", self.task_prefix, text);
        let encoded = self.tokenizer.encode(&prompt)?;
        debug!(
            "Encoded prompt into {} real tokens of {}",
            encoded.real_len(),
            self.tokenizer.max_length()
        );

        let mut model = self.model.fork();
        let device = model.device().clone();
        let input_ids = Tensor::new(encoded.input_ids.as_slice(), &device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoded.attention_mask.as_slice(), &device)?.unsqueeze(0)?;

        let output = beam_search(
            model.as_mut(),
            &input_ids,
            &attention_mask,
            &self.params,
            cancel,
        )?;
        debug!("Generated {} tokens", output.len());

        self.tokenizer.decode(&output)
    }
}
