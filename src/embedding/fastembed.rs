//! FastEmbed-based embedder.
//!
//! With the `fastembed-embeddings` feature this runs all-MiniLM-L6-v2 through
//! ONNX. Without it, texts are embedded as hashed bags of lowercase words, which
//! captures lexical overlap but not meaning.

use super::{DEFAULT_DIMENSIONS, Embedder};
use crate::{Error, Result};

// ============================================================================
// Native FastEmbed Implementation (with feature)
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
mod native {
    use super::{DEFAULT_DIMENSIONS, Embedder, Error, Result};
    use std::sync::{Mutex, OnceLock};
    use std::time::Instant;

    /// Lazily loaded model shared by every embedder instance.
    static EMBEDDING_MODEL: OnceLock<Mutex<::fastembed::TextEmbedding>> = OnceLock::new();

    /// `FastEmbed` embedder using all-MiniLM-L6-v2.
    ///
    /// The model is downloaded and loaded on the first embed call.
    pub struct FastEmbedEmbedder;

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new `FastEmbed` embedder.
        #[must_use]
        pub const fn new() -> Self {
            Self
        }

        fn model() -> Result<&'static Mutex<::fastembed::TextEmbedding>> {
            if let Some(model) = EMBEDDING_MODEL.get() {
                return Ok(model);
            }

            tracing::info!("Loading embedding model (first use)...");
            let start = Instant::now();

            let options =
                ::fastembed::InitOptions::new(::fastembed::EmbeddingModel::AllMiniLML6V2)
                    .with_show_download_progress(false);
            let model = ::fastembed::TextEmbedding::try_new(options)
                .map_err(|e| Error::operation("load_embedding_model", e))?;

            tracing::info!(
                elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                model = "all-MiniLM-L6-v2",
                "Embedding model loaded"
            );

            // Another thread may have won the race; either model is fine.
            let _ = EMBEDDING_MODEL.set(Mutex::new(model));
            EMBEDDING_MODEL
                .get()
                .ok_or_else(|| Error::operation("load_embedding_model", "model unavailable"))
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            Self::DEFAULT_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_batch(&[text])?
                .into_iter()
                .next()
                .ok_or_else(|| Error::operation("embed", "no embedding returned from model"))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            if texts.iter().any(|t| t.trim().is_empty()) {
                return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
            }

            let owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
            let mut model = Self::model()?
                .lock()
                .map_err(|e| Error::operation("embed_batch", e))?;
            model
                .embed(owned, None)
                .map_err(|e| Error::operation("embed_batch", e))
        }
    }
}

// ============================================================================
// Fallback Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "fastembed-embeddings"))]
mod fallback {
    use super::{DEFAULT_DIMENSIONS, Embedder, Error, Result};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Upper bound on words hashed per text.
    const MAX_WORDS: usize = 5000;

    /// Hashed bag-of-words embedder.
    ///
    /// Each lowercase alphanumeric token is hashed into one dimension with a
    /// hash-derived sign; the vector is L2-normalized. Texts sharing words land
    /// close together under L2 distance.
    pub struct FastEmbedEmbedder {
        dimensions: usize,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new embedder.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                dimensions: Self::DEFAULT_DIMENSIONS,
            }
        }

        /// Creates an embedder with custom dimensions.
        #[must_use]
        pub const fn with_dimensions(dimensions: usize) -> Self {
            Self { dimensions }
        }

        fn pseudo_embed(&self, text: &str) -> Vec<f32> {
            let mut embedding = vec![0.0f32; self.dimensions];

            let tokens = text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .take(MAX_WORDS);
            for token in tokens {
                let mut hasher = DefaultHasher::new();
                token.to_lowercase().hash(&mut hasher);
                let hash = hasher.finish();
                let idx = (hash % self.dimensions as u64) as usize;
                let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
                embedding[idx] += sign;
            }

            let norm_sq: f32 = embedding.iter().map(|x| x * x).sum();
            if norm_sq > 0.0 {
                let inv_norm = norm_sq.sqrt().recip();
                for v in &mut embedding {
                    *v *= inv_norm;
                }
            }
            embedding
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.dimensions == 0 {
                return Err(Error::operation("embed", "embedder has zero dimensions"));
            }
            if text.trim().is_empty() {
                return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
            }
            Ok(self.pseudo_embed(text))
        }
    }
}

#[cfg(feature = "fastembed-embeddings")]
pub use native::FastEmbedEmbedder;

#[cfg(not(feature = "fastembed-embeddings"))]
pub use fallback::FastEmbedEmbedder;
