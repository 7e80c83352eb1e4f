use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::mistral::{Config, Model};
use tracing::info;

use super::{eos_from_config, weight_dtype, LanguageModel};
use crate::error::Result;

pub struct MistralModel {
    model: Model,
    config: Config,
    eos_token_id: u32,
}

impl MistralModel {
    pub fn load(config_path: &Path, weight_paths: &[PathBuf], device: &Device) -> Result<Self> {
        info!("Loading Mistral model configuration...");
        let config_str = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        let eos_token_id = eos_from_config(&serde_json::from_str(&config_str)?, 2);

        info!(
            "Model config: vocab_size={}, hidden_size={}, num_layers={}, num_heads={}",
            config.vocab_size,
            config.hidden_size,
            config.num_hidden_layers,
            config.num_attention_heads
        );

        let dtype = weight_dtype(device);
        info!("Loading model weights as {:?}...", dtype);
        // SAFETY: the weight files are hub cache entries that are not modified
        // while the process is running.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(weight_paths, dtype, device)? };

        let model = Model::new(&config, vb)?;

        info!("Mistral model loaded successfully");
        Ok(Self {
            model,
            config,
            eos_token_id,
        })
    }
}

impl LanguageModel for MistralModel {
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
        self.config.vocab_size
    }
}
