use candle_core::{DType, Device, Tensor};
use grammar_correction::{Result, model::Seq2SeqModel};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::test_utils::{EOS_ID, PAD_ID, TASK_PREFIX_IDS, VOCAB_SIZE};

/// Fake seq2seq model that "corrects" its input by copying the encoded
/// tokens (minus the task prefix and end marker) through a substitution
/// table.
///
/// While a decoder sequence follows that script, the next scripted token is
/// strongly preferred and EOS is ruled out until the script is complete.
/// Sequences that left the script get a flat distribution.
#[derive(Clone)]
pub struct RuleModel {
    substitutions: HashMap<u32, u32>,
    target: Vec<u32>,
    decode_delay: Option<Duration>,
    pub encoder_lengths: Arc<Mutex<Vec<usize>>>,
    pub decode_calls: Arc<Mutex<usize>>,
    device: Device,
}

impl RuleModel {
    pub fn new(substitutions: &[(u32, u32)]) -> Self {
        Self {
            substitutions: substitutions.iter().copied().collect(),
            target: Vec::new(),
            decode_delay: None,
            encoder_lengths: Arc::new(Mutex::new(Vec::new())),
            decode_calls: Arc::new(Mutex::new(0)),
            device: Device::Cpu,
        }
    }

    pub fn with_decode_delay(mut self, delay: Duration) -> Self {
        self.decode_delay = Some(delay);
        self
    }

    pub fn encoder_lengths(&self) -> Vec<usize> {
        self.encoder_lengths.lock().unwrap().clone()
    }

    pub fn decode_calls(&self) -> usize {
        *self.decode_calls.lock().unwrap()
    }

    fn next_logits(&self, generated: &[u32]) -> Vec<f32> {
        let on_script = generated.len() <= self.target.len()
            && generated == &self.target[..generated.len()];
        if !on_script {
            return vec![0.0; VOCAB_SIZE];
        }

        let next = self
            .target
            .get(generated.len())
            .copied()
            .unwrap_or(EOS_ID);
        let mut logits = vec![-10.0; VOCAB_SIZE];
        if next != EOS_ID {
            logits[EOS_ID as usize] = -1e4;
        }
        logits[next as usize] = 10.0;
        logits
    }
}

impl Seq2SeqModel for RuleModel {
    fn encode(&mut self, input_ids: &Tensor) -> Result<Tensor> {
        let row = input_ids.squeeze(0)?.to_vec1::<u32>()?;
        self.encoder_lengths.lock().unwrap().push(row.len());

        self.target = row
            .iter()
            .skip(TASK_PREFIX_IDS.len())
            .filter(|&&id| id != EOS_ID && id != PAD_ID)
            .map(|id| self.substitutions.get(id).copied().unwrap_or(*id))
            .collect();

        Ok(Tensor::zeros((1, row.len(), 4), DType::F32, &self.device)?)
    }

    fn decode(&mut self, decoder_input_ids: &Tensor, _encoder_output: &Tensor) -> Result<Tensor> {
        *self.decode_calls.lock().unwrap() += 1;
        if let Some(delay) = self.decode_delay {
            std::thread::sleep(delay);
        }

        let rows = decoder_input_ids.to_vec2::<u32>()?;
        let logits: Vec<f32> = rows
            .iter()
            .flat_map(|row| self.next_logits(&row[1..]))
            .collect();
        Ok(Tensor::from_vec(logits, (rows.len(), VOCAB_SIZE), &self.device)?)
    }

    fn decoder_start_token_id(&self) -> u32 {
        PAD_ID
    }

    fn eos_token_id(&self) -> u32 {
        EOS_ID
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn fork(&self) -> Box<dyn Seq2SeqModel> {
        Box::new(self.clone())
    }
}
