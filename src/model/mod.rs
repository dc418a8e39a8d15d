mod device;
mod loader;
mod t5;

pub use device::{device_name, select_device};
pub use loader::load_pipeline;
pub use t5::T5Model;

use crate::Result;
use candle_core::{Device, Tensor};

/// An encoder-decoder language model driven one decoding step at a time.
pub trait Seq2SeqModel: Send + Sync {
    /// Runs the encoder over `input_ids` of shape `(batch, seq_len)`.
    fn encode(&mut self, input_ids: &Tensor) -> Result<Tensor>;

    /// Returns the logits for the next token of every decoder sequence, shape
    /// `(batch, vocab_size)`.
    fn decode(&mut self, decoder_input_ids: &Tensor, encoder_output: &Tensor) -> Result<Tensor>;

    fn decoder_start_token_id(&self) -> u32;

    fn eos_token_id(&self) -> u32;

    fn device(&self) -> &Device;

    /// Creates an independent handle for a single generation run. Handles
    /// share weights with the original.
    fn fork(&self) -> Box<dyn Seq2SeqModel>;
}
