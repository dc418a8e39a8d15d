use super::Seq2SeqModel;
use crate::{Error, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const SAFETENSORS_INDEX_FILE: &str = "model.safetensors.index.json";
const PYTORCH_FILE: &str = "pytorch_model.bin";

/// T5 conditional-generation model loaded from a local checkpoint directory.
#[derive(Clone)]
pub struct T5Model {
    inner: t5::T5ForConditionalGeneration,
    device: Device,
    pad_token_id: u32,
    eos_token_id: u32,
    decoder_start_token_id: u32,
}

impl T5Model {
    pub fn load(dir: &Path, device: &Device) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::model(format!("failed to read {}: {}", config_path.display(), e))
        })?;
        let mut config: t5::Config = serde_json::from_str(&config_str)?;
        // Beams are re-batched every step, so the decoder recomputes full
        // sequences instead of keeping a per-sequence KV cache.
        config.use_cache = false;

        let vb = load_weights(dir, device)?;
        let inner = t5::T5ForConditionalGeneration::load(vb, &config)?;

        let pad_token_id = config.pad_token_id as u32;
        let decoder_start_token_id = config
            .decoder_start_token_id
            .map(|id| id as u32)
            .unwrap_or(pad_token_id);

        info!(
            "Loaded T5 model: d_model={}, layers={}, vocab={}",
            config.d_model, config.num_layers, config.vocab_size
        );

        Ok(Self {
            inner,
            device: device.clone(),
            pad_token_id,
            eos_token_id: config.eos_token_id as u32,
            decoder_start_token_id,
        })
    }

    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }
}

impl Seq2SeqModel for T5Model {
    fn encode(&mut self, input_ids: &Tensor) -> Result<Tensor> {
        Ok(self.inner.encode(input_ids)?)
    }

    fn decode(&mut self, decoder_input_ids: &Tensor, encoder_output: &Tensor) -> Result<Tensor> {
        Ok(self.inner.decode(decoder_input_ids, encoder_output)?)
    }

    fn decoder_start_token_id(&self) -> u32 {
        self.decoder_start_token_id
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn fork(&self) -> Box<dyn Seq2SeqModel> {
        Box::new(self.clone())
    }
}

/// Weights are looked up as a single safetensors file, then a sharded
/// safetensors index, then a PyTorch pickle.
fn load_weights(dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let single = dir.join(SAFETENSORS_FILE);
    if single.is_file() {
        debug!("Loading weights from {}", single.display());
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[single], DType::F32, device)? };
        return Ok(vb);
    }

    let index = dir.join(SAFETENSORS_INDEX_FILE);
    if index.is_file() {
        let shards = sharded_safetensors(dir, &index)?;
        debug!("Loading weights from {} shards", shards.len());
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&shards, DType::F32, device)? };
        return Ok(vb);
    }

    let pickle = dir.join(PYTORCH_FILE);
    if pickle.is_file() {
        debug!("Loading weights from {}", pickle.display());
        return Ok(VarBuilder::from_pth(&pickle, DType::F32, device)?);
    }

    Err(Error::model(format!(
        "no model weights found in {}",
        dir.display()
    )))
}

fn sharded_safetensors(dir: &Path, index: &Path) -> Result<Vec<PathBuf>> {
    let file = std::fs::File::open(index)?;
    let json: serde_json::Value = serde_json::from_reader(file)?;
    let weight_map = match json.get("weight_map") {
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => {
            return Err(Error::model(format!(
                "weight map in {} is not a map",
                index.display()
            )));
        }
        None => {
            return Err(Error::model(format!(
                "no weight map in {}",
                index.display()
            )));
        }
    };

    let shards: BTreeSet<&str> = weight_map.values().filter_map(|v| v.as_str()).collect();
    if shards.is_empty() {
        return Err(Error::model(format!(
            "weight map in {} lists no files",
            index.display()
        )));
    }
    Ok(shards.into_iter().map(|shard| dir.join(shard)).collect())
}
