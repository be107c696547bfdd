//! Inference engine
//!
//! The engine owns the loaded vectorizer and classifier for the lifetime of
//! the process. Handles are immutable after loading, so `predict` can be
//! called concurrently without locking.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use common::error::{Error, Result};
use common::types::Sentiment;
use common::utils::format_duration;

use crate::classifier::{self, Classifier};
use crate::preprocessing::{Preprocessor, TextNormalizer};
use crate::vectorizer::{BagOfWordsVectorizer, Vectorizer};

/// Shared handle to a loaded engine
pub type EngineHandle = Arc<InferenceEngine>;

/// Sentiment inference engine
pub struct InferenceEngine {
    /// Text normalization
    preprocessor: Arc<dyn Preprocessor>,

    /// Feature extraction
    vectorizer: Arc<dyn Vectorizer>,

    /// Trained classifier
    classifier: Arc<dyn Classifier>,
}

impl InferenceEngine {
    /// Assembles an engine from its collaborators.
    ///
    /// Fails if the classifier does not accept the vectorizer's features.
    pub fn new(
        preprocessor: Arc<dyn Preprocessor>,
        vectorizer: Arc<dyn Vectorizer>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self> {
        if vectorizer.dimension() != classifier.n_features() {
            return Err(Error::artifact_load(
                "model",
                format!(
                    "model expects {} features but the vectorizer produces {}",
                    classifier.n_features(),
                    vectorizer.dimension()
                ),
            ));
        }

        Ok(Self {
            preprocessor,
            vectorizer,
            classifier,
        })
    }

    /// Loads the model and vectorizer artifacts
    pub fn load(model_path: &Path, vectorizer_path: &Path) -> Result<Self> {
        let start = Instant::now();

        info!("Loading model from {}", model_path.display());
        let classifier: Arc<dyn Classifier> = Arc::from(classifier::load(model_path)?);
        info!("Model loaded successfully ({} features)", classifier.n_features());

        info!("Loading vectorizer from {}", vectorizer_path.display());
        let vectorizer = Arc::new(BagOfWordsVectorizer::load(vectorizer_path)?);
        info!("Vectorizer loaded successfully ({} terms)", vectorizer.dimension());

        let engine = Self::new(Arc::new(TextNormalizer::new()), vectorizer, classifier).map_err(|e| match e {
            Error::ArtifactLoad { reason, .. } => Error::artifact_load(model_path.display(), reason),
            other => other,
        })?;

        info!("Inference engine ready in {}", format_duration(start.elapsed()));

        Ok(engine)
    }

    /// Predicts the sentiment of `text`.
    ///
    /// Performs no I/O and is deterministic for a given set of artifacts.
    pub fn predict(&self, text: &str) -> Result<Sentiment> {
        let normalized = self
            .preprocessor
            .preprocess(text)
            .map_err(|e| Error::inference("preprocess", e))?;

        let features = self
            .vectorizer
            .transform(&normalized)
            .map_err(|e| Error::inference("vectorize", e))?;

        let label = self
            .classifier
            .predict(&features)
            .map_err(|e| Error::inference("classify", e))?;

        let sentiment = Sentiment::from_label(label);
        debug!(label, %sentiment, "Classified review");

        Ok(sentiment)
    }
}
