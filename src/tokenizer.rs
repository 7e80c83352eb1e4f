use std::path::Path;

use tokenizers::Tokenizer;
use tracing::info;

use crate::error::{InferenceError, Result};

pub struct TokenizerWrapper {
    tokenizer: Tokenizer,
}

impl TokenizerWrapper {
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading tokenizer from {:?}", path);
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        info!("Tokenizer loaded with {} tokens", tokenizer.get_vocab_size(true));
        Ok(Self { tokenizer })
    }

    /// Builds a tokenizer from an in-memory `tokenizer.json` document.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let tokenizer = Tokenizer::from_bytes(bytes)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;
        Ok(Self { tokenizer })
    }

    /// Encodes with the tokenizer's own post-processing, so BOS is added when
    /// the model expects it.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        Ok(encoding.get_ids().to_vec())
    }

    /// Decodes with special tokens skipped.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.tokenizer
            .token_to_id("</s>")
            .or_else(|| self.tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| self.tokenizer.token_to_id("<eos>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            "vocab": {"<unk>": 0, "</s>": 1, "hello": 2, "world": 3},
            "unk_token": "<unk>"
        }
    }"#;

    #[test]
    fn encodes_and_decodes_words() {
        let tokenizer = TokenizerWrapper::from_bytes(TOKENIZER_JSON).unwrap();
        assert_eq!(tokenizer.encode("hello world").unwrap(), vec![2, 3]);
        assert_eq!(tokenizer.encode("hello mars").unwrap(), vec![2, 0]);
        assert_eq!(tokenizer.vocab_size(), 4);
    }

    #[test]
    fn decode_skips_special_tokens() {
        let tokenizer = TokenizerWrapper::from_bytes(TOKENIZER_JSON).unwrap();
        assert_eq!(tokenizer.decode(&[2, 3, 1]).unwrap(), "hello world");
        assert_eq!(tokenizer.eos_token_id(), Some(1));
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(matches!(
            TokenizerWrapper::from_bytes("{not json"),
            Err(InferenceError::Tokenizer(_))
        ));
    }
}
