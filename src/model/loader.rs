use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use tracing::info;

use crate::error::{InferenceError, Result};

pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: Vec<PathBuf>,
}

/// Fetch config, tokenizer and weights from the HuggingFace Hub (or the local
/// hub cache when already present).
pub fn download_model(model_id: &str, revision: &str, token: Option<&str>) -> Result<ModelFiles> {
    info!("Fetching model: {} (revision: {})", model_id, revision);

    let api = match token {
        Some(t) => ApiBuilder::new()
            .with_token(Some(t.to_string()))
            .build()
            .map_err(|e| InferenceError::Hub(e.to_string()))?,
        None => Api::new().map_err(|e| InferenceError::Hub(e.to_string()))?,
    };

    let repo = api.repo(Repo::with_revision(
        model_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let config = repo
        .get("config.json")
        .map_err(|e| InferenceError::Hub(format!("Failed to download config.json: {}", e)))?;

    let tokenizer = repo
        .get("tokenizer.json")
        .map_err(|e| InferenceError::Hub(format!("Failed to download tokenizer.json: {}", e)))?;

    let weights = download_weights(&repo)?;

    info!(
        "Model files ready: config={:?}, tokenizer={:?}, weights={} files",
        config,
        tokenizer,
        weights.len()
    );

    Ok(ModelFiles {
        config,
        tokenizer,
        weights,
    })
}

fn download_weights(repo: &ApiRepo) -> Result<Vec<PathBuf>> {
    if let Ok(path) = repo.get("model.safetensors") {
        return Ok(vec![path]);
    }

    if let Ok(index) = repo.get("model.safetensors.index.json") {
        let shards = shard_names(&index)?;
        info!("Downloading {} weight shards", shards.len());
        return shards
            .iter()
            .map(|name| {
                repo.get(name)
                    .map_err(|e| InferenceError::Hub(format!("Failed to download {}: {}", name, e)))
            })
            .collect();
    }

    Err(InferenceError::Hub(
        "Could not find safetensors weights (tried model.safetensors and model.safetensors.index.json)"
            .to_string(),
    ))
}

/// Distinct shard file names referenced by a safetensors index, in order.
pub(crate) fn shard_names(index_path: &Path) -> Result<Vec<String>> {
    let index: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(index_path)?)?;
    let weight_map = index
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| InferenceError::ModelLoad("weight_map missing from safetensors index".to_string()))?;

    let shards: BTreeSet<String> = weight_map
        .values()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    if shards.is_empty() {
        return Err(InferenceError::ModelLoad(
            "safetensors index lists no shards".to_string(),
        ));
    }
    Ok(shards.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn shard_names_are_deduplicated_and_sorted() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"metadata": {{}}, "weight_map": {{
                "lm_head.weight": "model-00003-of-00003.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00003.safetensors",
                "model.layers.0.mlp.up_proj.weight": "model-00001-of-00003.safetensors",
                "model.layers.31.mlp.up_proj.weight": "model-00002-of-00003.safetensors"
            }}}}"#
        )
        .unwrap();

        assert_eq!(
            shard_names(file.path()).unwrap(),
            vec![
                "model-00001-of-00003.safetensors",
                "model-00002-of-00003.safetensors",
                "model-00003-of-00003.safetensors",
            ]
        );
    }

    #[test]
    fn index_without_weight_map_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"metadata": {{}}}}"#).unwrap();
        assert!(matches!(
            shard_names(file.path()),
            Err(InferenceError::ModelLoad(_))
        ));
    }
}
