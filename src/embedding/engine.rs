//! Local embedding engine backed by intfloat/e5-base-v2 via Candle
//!
//! Mean-pools the BERT token states under the attention mask and
//! L2-normalizes the result, matching the sentence-transformers output
//! for the same model. Model files are fetched from the HuggingFace Hub
//! on first use and cached locally.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use crate::embedding::Embedder;
use crate::errors::{RagError, Result};

const MODEL_ID: &str = "intfloat/e5-base-v2";
const EMBEDDING_DIM: usize = 768;

/// Embedding engine running the model in-process on CPU
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalEmbedder {
    /// Create the engine, downloading model files on first use
    pub fn new() -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new()
            .map_err(|e| RagError::Embedding(format!("HuggingFace API init failed: {}", e)))?;
        let repo = api.repo(Repo::new(MODEL_ID.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| RagError::Embedding(format!("model config download failed: {}", e)))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| RagError::Embedding(format!("tokenizer download failed: {}", e)))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| RagError::Embedding(format!("weights download failed: {}", e)))?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_contents)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::Embedding(format!("tokenizer load failed: {}", e)))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(format!("tokenization failed: {}", e)))?;

        let batch_size = texts.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Pad token ids and attention masks to a rectangular batch
        let mut flat_ids = vec![0u32; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];
        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            flat_ids[row * max_len..row * max_len + ids.len()].copy_from_slice(ids);
            flat_mask[row * max_len..row * max_len + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;

        Ok(normalized.to_vec2::<f32>()?)
    }

    /// Mean pooling over the sequence dimension under the attention mask
    fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask = attention_mask
            .unsqueeze(2)?
            .expand(hidden.shape())?
            .to_dtype(hidden.dtype())?;

        let summed = (hidden * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(summed.broadcast_div(&counts)?)
    }

    /// Normalize each row to unit length
    fn l2_normalize(embeddings: &Tensor) -> Result<Tensor> {
        let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
        Ok(embeddings.broadcast_div(&norms)?)
    }
}

impl Embedder for LocalEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.encode(texts)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_single_text() {
        let engine = LocalEmbedder::new().expect("failed to create engine");
        let vectors = engine
            .embed(&["knee surgery coverage".to_string()])
            .expect("failed to embed");
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), EMBEDDING_DIM);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embeddings_are_normalized() {
        let engine = LocalEmbedder::new().expect("failed to create engine");
        let vectors = engine
            .embed(&["waiting period".to_string()])
            .expect("failed to embed");
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_empty_batch_short_circuits() {
        let engine = LocalEmbedder::new().expect("failed to create engine");
        let vectors = engine.embed(&[]).expect("failed to embed empty batch");
        assert!(vectors.is_empty());
    }
}
