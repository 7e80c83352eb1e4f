use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};

pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const DEFAULT_MAX_NEW_TOKENS: usize = 512;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Question answering server backed by a local language model")]
pub struct Args {
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value = "main")]
    pub revision: String,

    #[arg(long, env)]
    pub hf_token: Option<String>,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    #[arg(long)]
    pub cpu: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    pub max_new_tokens: usize,

    /// Sample the next token instead of taking the most likely one. Temperature,
    /// top-k and top-p only apply when this is set.
    #[arg(long)]
    pub sample: bool,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,

    #[arg(long, default_value_t = 50)]
    pub top_k: usize,

    #[arg(long, default_value_t = 1.0)]
    pub top_p: f64,

    #[arg(long, default_value_t = 1.0)]
    pub repeat_penalty: f32,

    /// 0 seeds from entropy.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Return only the generated continuation, without the question echoed in front.
    #[arg(long)]
    pub strip_prompt: bool,

    /// Generations allowed in flight (running plus waiting) before requests get 503.
    #[arg(long, default_value_t = 4)]
    pub max_pending: usize,

    /// Generate for a single prompt, print the answer and exit.
    #[arg(short, long)]
    pub prompt: Option<String>,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.max_new_tokens == 0 {
            return Err(InferenceError::Config(
                "max_new_tokens must be at least 1".to_string(),
            ));
        }
        if self.max_pending == 0 {
            return Err(InferenceError::Config(
                "max_pending must be at least 1".to_string(),
            ));
        }
        if !(self.temperature >= 0.0) {
            return Err(InferenceError::Config(format!(
                "temperature must be non-negative, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(InferenceError::Config(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_new_tokens: usize,
    /// Off means greedy decoding.
    pub do_sample: bool,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub repeat_penalty: f32,
    pub seed: Option<u64>,
    /// Decode the prompt together with the continuation.
    pub echo_prompt: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            do_sample: false,
            temperature: DEFAULT_TEMPERATURE,
            top_p: 1.0,
            top_k: 50,
            repeat_penalty: 1.0,
            seed: None,
            echo_prompt: true,
        }
    }
}

impl From<&Args> for GenerationConfig {
    fn from(args: &Args) -> Self {
        Self {
            max_new_tokens: args.max_new_tokens,
            do_sample: args.sample,
            temperature: args.temperature,
            top_p: args.top_p,
            top_k: args.top_k,
            repeat_penalty: args.repeat_penalty,
            seed: if args.seed == 0 { None } else { Some(args.seed) },
            echo_prompt: !args.strip_prompt,
        }
    }
}
