#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use candle_core::{Device, Tensor};
use llm_ask_server::api::{create_router, AppState};
use llm_ask_server::config::GenerationConfig;
use llm_ask_server::host::ModelHost;
use llm_ask_server::model::LanguageModel;
use llm_ask_server::tokenizer::TokenizerWrapper;
use llm_ask_server::{InferenceError, Result};
use tower::ServiceExt; // for `oneshot`

pub const EOS: u32 = 1;
pub const THE: u32 = 7;
pub const ANSWER: u32 = 8;
pub const IS: u32 = 3;
pub const FOUR: u32 = 9;
pub const AGAIN: u32 = 10;
pub const VOCAB: usize = 11;

const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [
        {"id": 0, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 1, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
    ],
    "normalizer": null,
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "<unk>": 0, "</s>": 1, "What": 2, "is": 3, "2": 4, "+": 5, "?": 6,
            "The": 7, "answer": 8, "four": 9, "again": 10
        },
        "unk_token": "<unk>"
    }
}"#;

pub fn test_tokenizer() -> TokenizerWrapper {
    TokenizerWrapper::from_bytes(TOKENIZER_JSON).unwrap()
}

/// Strongly prefers one token per forward pass: `script[n]` on the n-th pass
/// since the last cache reset, then `filler` forever.
pub struct ScriptedModel {
    script: Vec<u32>,
    filler: u32,
    step: usize,
}

impl ScriptedModel {
    pub fn new(script: Vec<u32>, filler: u32) -> Self {
        Self {
            script,
            filler,
            step: 0,
        }
    }

    /// "The answer is four" followed by end-of-sequence.
    pub fn answering() -> Self {
        Self::new(vec![THE, ANSWER, IS, FOUR, EOS], EOS)
    }

    /// Never stops on its own.
    pub fn rambling() -> Self {
        Self::new(vec![], AGAIN)
    }
}

impl LanguageModel for ScriptedModel {
    fn forward(&mut self, _input_ids: &Tensor, _position: usize) -> Result<Tensor> {
        let target = self.script.get(self.step).copied().unwrap_or(self.filler);
        self.step += 1;
        let mut logits = vec![0f32; VOCAB];
        logits[target as usize] = 100.0;
        Ok(Tensor::from_vec(logits, (1, 1, VOCAB), &Device::Cpu)?)
    }

    fn reset_cache(&mut self) {
        self.step = 0;
    }

    fn eos_token_id(&self) -> u32 {
        EOS
    }

    fn vocab_size(&self) -> usize {
        VOCAB
    }
}

pub struct FailingModel;

impl LanguageModel for FailingModel {
    fn forward(&mut self, _input_ids: &Tensor, _position: usize) -> Result<Tensor> {
        Err(InferenceError::Inference("device lost".to_string()))
    }

    fn reset_cache(&mut self) {}

    fn eos_token_id(&self) -> u32 {
        EOS
    }

    fn vocab_size(&self) -> usize {
        VOCAB
    }
}

/// Panics on its first forward pass, then behaves like `ScriptedModel::answering`.
pub struct PanicOnceModel {
    panicked: bool,
    inner: ScriptedModel,
}

impl PanicOnceModel {
    pub fn new() -> Self {
        Self {
            panicked: false,
            inner: ScriptedModel::answering(),
        }
    }
}

impl LanguageModel for PanicOnceModel {
    fn forward(&mut self, input_ids: &Tensor, position: usize) -> Result<Tensor> {
        if !self.panicked {
            self.panicked = true;
            panic!("simulated kernel crash");
        }
        self.inner.forward(input_ids, position)
    }

    fn reset_cache(&mut self) {
        self.inner.reset_cache();
    }

    fn eos_token_id(&self) -> u32 {
        EOS
    }

    fn vocab_size(&self) -> usize {
        VOCAB
    }
}

pub fn host_with(model: impl LanguageModel + 'static, config: GenerationConfig) -> ModelHost {
    ModelHost::new(
        Box::new(model),
        test_tokenizer(),
        Device::Cpu,
        "test/scripted",
        config,
    )
}

pub fn app_with(model: impl LanguageModel + 'static, max_pending: usize) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        host_with(model, GenerationConfig::default()),
        max_pending,
    ));
    (create_router(state.clone()), state)
}

pub async fn post_ask(app: &Router, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method("POST").uri("/api/ask");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
