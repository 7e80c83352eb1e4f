use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::gemma2::{Config, Model};
use tracing::info;

use super::{eos_from_config, weight_dtype, LanguageModel};
use crate::error::Result;

pub struct Gemma2Model {
    model: Model,
    vocab_size: usize,
    eos_token_id: u32,
}

impl Gemma2Model {
    pub fn load(config_path: &Path, weight_paths: &[PathBuf], device: &Device) -> Result<Self> {
        info!("Loading Gemma2 model configuration...");
        let config_str = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        let eos_token_id = eos_from_config(&serde_json::from_str(&config_str)?, 1);

        info!(
            "Gemma2 config: vocab_size={}, hidden_size={}, num_layers={}, num_heads={}",
            config.vocab_size,
            config.hidden_size,
            config.num_hidden_layers,
            config.num_attention_heads
        );

        let dtype = weight_dtype(device);
        info!("Loading model weights as {:?}...", dtype);
        // SAFETY: see MistralModel::load.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(weight_paths, dtype, device)? };

        let model = Model::new(false, &config, vb)?;

        info!("Gemma2 model loaded successfully");
        Ok(Self {
            model,
            vocab_size: config.vocab_size,
            eos_token_id,
        })
    }
}

impl LanguageModel for Gemma2Model {
    fn forward(&mut self, input_ids: &Tensor, position: usize) -> Result<Tensor> {
        Ok(self.model.forward(input_ids, position)?)
    }

    fn reset_cache(&mut self) {
        self.model.clear_kv_cache();
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }
}
