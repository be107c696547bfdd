//! Sentiment inference for the model service
//!
//! This crate loads the serialized vectorizer and classifier artifacts and
//! runs the preprocess → vectorize → classify pipeline behind
//! [`InferenceEngine::predict`].

pub mod artifact;
pub mod preprocessing;
pub mod vectorizer;
pub mod classifier;
pub mod engine;

// Re-export commonly used types
pub use classifier::{Classifier, ClassifierArtifact};
pub use engine::{EngineHandle, InferenceEngine};
pub use preprocessing::{Preprocessor, TextNormalizer};
pub use vectorizer::{BagOfWordsVectorizer, Vectorizer, VectorizerArtifact};
