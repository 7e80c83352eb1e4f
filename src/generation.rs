use std::time::Instant;

use candle_core::{Device, Tensor};
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::error::{InferenceError, Result};
use crate::model::LanguageModel;
use crate::sampling::{apply_repeat_penalty, Sampler};
use crate::tokenizer::TokenizerWrapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The model emitted an end-of-sequence token.
    Stop,
    /// `max_new_tokens` was reached.
    Length,
}

#[derive(Debug)]
pub struct GenerationOutput {
    pub text: String,
    /// Newly generated tokens only, without the prompt or the stop token.
    pub tokens: Vec<u32>,
    pub prompt_tokens: usize,
    pub finish_reason: FinishReason,
    pub tokens_per_second: f64,
    pub total_time_ms: u128,
}

pub struct TextGenerator<'a> {
    model: &'a mut dyn LanguageModel,
    tokenizer: &'a TokenizerWrapper,
    device: &'a Device,
}

impl<'a> TextGenerator<'a> {
    pub fn new(
        model: &'a mut dyn LanguageModel,
        tokenizer: &'a TokenizerWrapper,
        device: &'a Device,
    ) -> Self {
        Self {
            model,
            tokenizer,
            device,
        }
    }

    pub fn generate(&mut self, prompt: &str, config: &GenerationConfig) -> Result<GenerationOutput> {
        let start_time = Instant::now();

        // Previous requests leave their keys and values behind.
        self.model.reset_cache();

        let prompt_tokens = self.tokenizer.encode(prompt)?;
        let prompt_len = prompt_tokens.len();
        if prompt_tokens.is_empty() {
            return Err(InferenceError::Inference("Empty prompt".to_string()));
        }
        debug!("Prompt tokens: {}", prompt_len);

        let mut sampler = Sampler::from_config(config);
        let model_eos = self.model.eos_token_id();
        let tokenizer_eos = self.tokenizer.eos_token_id();
        let is_stop = |token: u32| token == model_eos || Some(token) == tokenizer_eos;

        let mut all_tokens = prompt_tokens;
        let mut finish_reason = FinishReason::Length;

        let input = Tensor::new(all_tokens.as_slice(), self.device)?.unsqueeze(0)?;
        let mut logits = self.model.forward(&input, 0)?;

        let generation_start = Instant::now();

        for step in 0..config.max_new_tokens {
            let logits_for_step =
                apply_repeat_penalty(&logits, config.repeat_penalty, &all_tokens)?;
            let next_token = sampler.sample(&logits_for_step)?;

            if is_stop(next_token) {
                debug!("Stop token {} generated at step {}", next_token, step);
                finish_reason = FinishReason::Stop;
                break;
            }
            all_tokens.push(next_token);

            // The last sampled token never needs a forward pass.
            if step + 1 == config.max_new_tokens {
                break;
            }
            let input = Tensor::new(&[next_token], self.device)?.unsqueeze(0)?;
            logits = self.model.forward(&input, prompt_len + step)?;
        }

        let generation_time = generation_start.elapsed();
        let generated = all_tokens.split_off(prompt_len);

        let tokens_per_second = if generation_time.as_secs_f64() > 0.0 {
            generated.len() as f64 / generation_time.as_secs_f64()
        } else {
            0.0
        };

        let text = if config.echo_prompt {
            all_tokens.extend_from_slice(&generated);
            self.tokenizer.decode(&all_tokens)?
        } else {
            self.tokenizer.decode(&generated)?
        };

        info!(
            "Generated {} tokens in {:?} ({:.2} tokens/sec, finish={:?})",
            generated.len(),
            generation_time,
            tokens_per_second,
            finish_reason
        );

        Ok(GenerationOutput {
            text,
            tokens: generated,
            prompt_tokens: prompt_len,
            finish_reason,
            tokens_per_second,
            total_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
