pub mod api;
pub mod config;
pub mod device;
pub mod error;
pub mod generation;
pub mod host;
pub mod model;
pub mod sampling;
pub mod tokenizer;

pub use error::{InferenceError, Result};
