//! Process-wide model state: the tokenizer, the model and the device it runs
//! on, built once before the server starts listening.

use candle_core::Device;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Args, GenerationConfig};
use crate::device::{device_label, select_device};
use crate::error::Result;
use crate::generation::{GenerationOutput, TextGenerator};
use crate::model::{download_model, load_language_model, LanguageModel};
use crate::tokenizer::TokenizerWrapper;

pub struct ModelHost {
    // Only the KV cache changes under this lock, and it is cleared per call.
    model: Mutex<Box<dyn LanguageModel>>,
    tokenizer: TokenizerWrapper,
    device: Device,
    model_id: String,
    config: GenerationConfig,
}

impl ModelHost {
    pub fn new(
        model: Box<dyn LanguageModel>,
        tokenizer: TokenizerWrapper,
        device: Device,
        model_id: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            model_id: model_id.into(),
            config,
        }
    }

    /// Downloads (or reuses cached) model files and builds the host. Blocks
    /// for as long as the download and weight loading take.
    pub fn load(args: &Args) -> Result<Self> {
        let device = select_device(args.cpu)?;
        info!("Using device: {}", device_label(&device));

        let files = download_model(&args.model, &args.revision, args.hf_token.as_deref())?;
        let tokenizer = TokenizerWrapper::load(&files.tokenizer)?;
        let model = load_language_model(&files, &device)?;

        info!(
            "Model ready: {} (model vocab {}, tokenizer vocab {})",
            args.model,
            model.vocab_size(),
            tokenizer.vocab_size()
        );

        Ok(Self::new(
            model,
            tokenizer,
            device,
            args.model.clone(),
            GenerationConfig::from(args),
        ))
    }

    /// Runs one full generation for `prompt`. Waits for any generation already
    /// in progress. Must be called from a blocking context, never from inside
    /// an async task.
    pub fn generate(&self, prompt: &str) -> Result<GenerationOutput> {
        let mut model = self.model.blocking_lock();
        let mut generator = TextGenerator::new(model.as_mut(), &self.tokenizer, &self.device);
        generator.generate(prompt, &self.config)
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }
}
