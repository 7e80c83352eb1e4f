use candle_core::{DType, Tensor};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::GenerationConfig;
use crate::error::{InferenceError, Result};

pub struct Sampler {
    do_sample: bool,
    temperature: f64,
    top_p: f64,
    top_k: usize,
    rng: StdRng,
}

impl Sampler {
    pub fn new(
        do_sample: bool,
        temperature: f64,
        top_p: f64,
        top_k: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            do_sample,
            temperature,
            top_p,
            top_k,
            rng,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(
            config.do_sample,
            config.temperature,
            config.top_p,
            config.top_k,
            config.seed,
        )
    }

    pub fn sample(&mut self, logits: &Tensor) -> Result<u32> {
        let logits = get_last_logits(logits)?.to_dtype(DType::F32)?;
        let logits_vec: Vec<f32> = logits.to_vec1()?;

        if logits_vec.is_empty() {
            return Err(InferenceError::Inference("Empty logits".to_string()));
        }

        if !self.do_sample || self.temperature == 0.0 {
            let (idx, _) = logits_vec
                .iter()
                .copied()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .ok_or_else(|| InferenceError::Inference("Empty logits".to_string()))?;
            return Ok(idx as u32);
        }

        let temperature = self.temperature as f32;
        let mut indexed: Vec<(usize, f32)> = logits_vec
            .iter()
            .map(|l| l / temperature)
            .enumerate()
            .collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        if self.top_k > 0 && self.top_k < indexed.len() {
            indexed.truncate(self.top_k);
        }

        let max_logit = indexed[0].1;
        let mut probs: Vec<(usize, f32)> = indexed
            .iter()
            .map(|(i, l)| (*i, (l - max_logit).exp()))
            .collect();
        normalize(&mut probs);

        if self.top_p < 1.0 {
            let top_p = self.top_p as f32;
            let mut cumsum = 0.0f32;
            let cutoff = probs
                .iter()
                .position(|(_, p)| {
                    cumsum += p;
                    cumsum > top_p
                })
                .map(|idx| idx + 1)
                .unwrap_or(probs.len());
            probs.truncate(cutoff.max(1));
            normalize(&mut probs);
        }

        let r: f32 = self.rng.gen();
        let mut cumsum = 0.0;
        for (idx, prob) in probs.iter() {
            cumsum += prob;
            if r < cumsum {
                return Ok(*idx as u32);
            }
        }

        Ok(probs.last().map(|(i, _)| *i as u32).unwrap_or(0))
    }
}

fn normalize(probs: &mut [(usize, f32)]) {
    let sum: f32 = probs.iter().map(|(_, p)| p).sum();
    if sum > 0.0 {
        for (_, p) in probs.iter_mut() {
            *p /= sum;
        }
    }
}

/// Reduces model output of shape `(vocab)`, `(seq, vocab)` or
/// `(batch, seq, vocab)` to the logits of the final position.
pub fn get_last_logits(logits: &Tensor) -> Result<Tensor> {
    let dims = logits.dims();
    match dims.len() {
        1 => Ok(logits.clone()),
        2 => Ok(logits.get(dims[0] - 1)?),
        3 => Ok(logits.get(0)?.get(dims[1] - 1)?),
        _ => Err(InferenceError::Inference(format!(
            "Unexpected logits shape {:?}",
            dims
        ))),
    }
}

pub fn apply_repeat_penalty(
    logits: &Tensor,
    repeat_penalty: f32,
    context: &[u32],
) -> Result<Tensor> {
    if repeat_penalty == 1.0 || context.is_empty() {
        return Ok(logits.clone());
    }

    let last_logits = get_last_logits(logits)?;
    let mut logits_vec: Vec<f32> = last_logits.to_dtype(DType::F32)?.to_vec1()?;

    for &token_id in context {
        if let Some(score) = logits_vec.get_mut(token_id as usize) {
            *score = if *score > 0.0 {
                *score / repeat_penalty
            } else {
                *score * repeat_penalty
            };
        }
    }

    let vocab_size = logits_vec.len();
    Ok(Tensor::from_vec(logits_vec, (vocab_size,), logits.device())?)
}
