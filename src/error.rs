use thiserror::Error;

/// Failures while loading the model or answering a question with it.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Invalid command-line settings, caught before anything is loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hub error: {0}")]
    Hub(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Unsupported model architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
