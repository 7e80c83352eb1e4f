mod gemma2;
mod loader;
mod mistral;

pub use gemma2::Gemma2Model;
pub use loader::{download_model, ModelFiles};
pub use mistral::MistralModel;

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use tracing::info;

use crate::error::{InferenceError, Result};

/// A causal language model that produces next-token logits.
pub trait LanguageModel: Send + Sync {
    /// Forward pass over `input_ids` starting at sequence offset `position`.
    fn forward(&mut self, input_ids: &Tensor, position: usize) -> Result<Tensor>;

    fn reset_cache(&mut self);

    fn eos_token_id(&self) -> u32;

    fn vocab_size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelArchitecture {
    Mistral,
    Gemma2,
}

impl ModelArchitecture {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("gemma2") {
            Some(Self::Gemma2)
        } else if name.contains("mistral") {
            Some(Self::Mistral)
        } else {
            None
        }
    }
}

/// Detect model architecture from config.json, checking `architectures`
/// before `model_type`.
pub fn detect_architecture(config_path: &Path) -> Result<ModelArchitecture> {
    let config_str = std::fs::read_to_string(config_path)?;
    let config: serde_json::Value = serde_json::from_str(&config_str)?;

    let from_architectures = config
        .get("architectures")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|arch| arch.as_str())
        .find_map(ModelArchitecture::from_name);

    if let Some(arch) = from_architectures {
        return Ok(arch);
    }

    let model_type = config.get("model_type").and_then(|v| v.as_str());
    model_type
        .and_then(ModelArchitecture::from_name)
        .ok_or_else(|| {
            InferenceError::UnsupportedArchitecture(
                model_type.unwrap_or("<missing model_type>").to_string(),
            )
        })
}

/// Reads `eos_token_id` from a raw config.json value. Some checkpoints list
/// several ids; the first one wins.
pub(crate) fn eos_from_config(config: &serde_json::Value, fallback: u32) -> u32 {
    config
        .get("eos_token_id")
        .and_then(|v| v.as_u64().or_else(|| v.as_array()?.first()?.as_u64()))
        .map(|id| id as u32)
        .unwrap_or(fallback)
}

pub(crate) fn weight_dtype(device: &Device) -> DType {
    if device.is_cuda() {
        DType::BF16
    } else {
        DType::F32
    }
}

/// Builds the model matching `files.config` on `device`.
pub fn load_language_model(files: &ModelFiles, device: &Device) -> Result<Box<dyn LanguageModel>> {
    let architecture = detect_architecture(&files.config)?;
    info!("Detected architecture: {:?}", architecture);

    let model: Box<dyn LanguageModel> = match architecture {
        ModelArchitecture::Mistral => {
            Box::new(MistralModel::load(&files.config, &files.weights, device)?)
        }
        ModelArchitecture::Gemma2 => {
            Box::new(Gemma2Model::load(&files.config, &files.weights, device)?)
        }
    };
    Ok(model)
}
