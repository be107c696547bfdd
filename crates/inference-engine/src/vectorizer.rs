//! Bag-of-words vectorizers
//!
//! This module turns normalized text into fixed-size feature vectors using a
//! vocabulary fitted offline. Both raw term counts and TF-IDF weighting are
//! supported.

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};

use crate::artifact;

/// Longest n-gram an artifact may ask for
pub const MAX_NGRAM: usize = 10;

/// Turns normalized text into a feature vector
pub trait Vectorizer: Send + Sync {
    /// Length of every produced feature vector
    fn dimension(&self) -> usize;

    /// Transforms normalized text into features
    fn transform(&self, text: &str) -> Result<Array1<f64>>;
}

/// Vector normalization applied after weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// Serialized vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorizerArtifact {
    /// Raw term counts
    Count {
        vocabulary: HashMap<String, usize>,
        #[serde(default = "default_ngram_range")]
        ngram_range: (usize, usize),
        #[serde(default)]
        binary: bool,
    },

    /// Term frequencies scaled by inverse document frequency
    Tfidf {
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        #[serde(default = "default_ngram_range")]
        ngram_range: (usize, usize),
        #[serde(default)]
        binary: bool,
        #[serde(default)]
        sublinear_tf: bool,
        #[serde(default = "default_norm")]
        norm: Option<Norm>,
    },
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

#[derive(Debug, Clone)]
enum Weighting {
    Count,
    Tfidf { idf: Array1<f64>, sublinear_tf: bool },
}

/// Vocabulary-based vectorizer
#[derive(Debug, Clone)]
pub struct BagOfWordsVectorizer {
    /// Term to feature index
    vocabulary: HashMap<String, usize>,

    /// Smallest and largest n-gram length
    ngram_range: (usize, usize),

    /// Clamp counts to one
    binary: bool,

    weighting: Weighting,

    norm: Option<Norm>,
}

impl BagOfWordsVectorizer {
    /// Loads a vectorizer artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let artifact: VectorizerArtifact = artifact::read_json(path)?;
        Self::from_artifact(artifact).map_err(|reason| Error::artifact_load(path.display(), reason))
    }

    /// Builds a vectorizer from a decoded artifact, checking its shape
    pub fn from_artifact(artifact: VectorizerArtifact) -> std::result::Result<Self, String> {
        let (vocabulary, ngram_range, binary, weighting, norm) = match artifact {
            VectorizerArtifact::Count { vocabulary, ngram_range, binary } => {
                (vocabulary, ngram_range, binary, Weighting::Count, None)
            }
            VectorizerArtifact::Tfidf { vocabulary, idf, ngram_range, binary, sublinear_tf, norm } => {
                if idf.len() != vocabulary.len() {
                    return Err(format!(
                        "idf has {} entries but the vocabulary has {} terms",
                        idf.len(),
                        vocabulary.len()
                    ));
                }
                if idf.iter().any(|w| !w.is_finite()) {
                    return Err("idf contains non-finite weights".to_string());
                }
                let weighting = Weighting::Tfidf {
                    idf: Array1::from(idf),
                    sublinear_tf,
                };
                (vocabulary, ngram_range, binary, weighting, norm)
            }
        };

        if vocabulary.is_empty() {
            return Err("vocabulary is empty".to_string());
        }

        // Indices must cover 0..len exactly once
        let mut seen = vec![false; vocabulary.len()];
        for (term, &index) in &vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => return Err(format!("feature index {} is assigned twice", index)),
                None => return Err(format!("term '{}' has out-of-range index {}", term, index)),
            }
        }

        let (min_n, max_n) = ngram_range;
        if min_n == 0 || min_n > max_n || max_n > MAX_NGRAM {
            return Err(format!(
                "invalid ngram_range ({}, {}): expected 1 <= min <= max <= {}",
                min_n, max_n, MAX_NGRAM
            ));
        }

        Ok(Self {
            vocabulary,
            ngram_range,
            binary,
            weighting,
            norm,
        })
    }

    fn count_terms(&self, text: &str, counts: &mut Array1<f64>) {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let (min_n, max_n) = self.ngram_range;

        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&term) {
                    counts[index] += 1.0;
                }
            }
        }
    }
}

impl Vectorizer for BagOfWordsVectorizer {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn transform(&self, text: &str) -> Result<Array1<f64>> {
        let mut features = Array1::<f64>::zeros(self.dimension());
        self.count_terms(text, &mut features);

        if self.binary {
            features.mapv_inplace(|c| if c > 0.0 { 1.0 } else { 0.0 });
        }

        if let Weighting::Tfidf { idf, sublinear_tf } = &self.weighting {
            if *sublinear_tf {
                features.mapv_inplace(|tf| if tf > 0.0 { 1.0 + tf.ln() } else { 0.0 });
            }
            features *= idf;
        }

        let length = match self.norm {
            Some(Norm::L1) => features.iter().map(|v| v.abs()).sum::<f64>(),
            Some(Norm::L2) => features.dot(&features).sqrt(),
            None => 0.0,
        };
        if length > 0.0 {
            features /= length;
        }

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary(terms: &[&str]) -> HashMap<String, usize> {
        terms.iter().enumerate().map(|(i, t)| (t.to_string(), i)).collect()
    }

    #[test]
    fn test_count_vectorizer() {
        let vectorizer = BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Count {
            vocabulary: vocabulary(&["good", "bad", "food"]),
            ngram_range: (1, 1),
            binary: false,
        })
        .unwrap();

        let features = vectorizer.transform("good food good unknown").unwrap();
        assert_eq!(features.to_vec(), vec![2.0, 0.0, 1.0]);
        assert_eq!(vectorizer.transform("").unwrap().to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_binary_and_bigrams() {
        let vectorizer = BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Count {
            vocabulary: vocabulary(&["not", "good", "not good"]),
            ngram_range: (1, 2),
            binary: true,
        })
        .unwrap();

        let features = vectorizer.transform("not good not good").unwrap();
        assert_eq!(features.to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tfidf_is_l2_normalized() {
        let vectorizer = BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Tfidf {
            vocabulary: vocabulary(&["great", "service"]),
            idf: vec![3.0, 4.0],
            ngram_range: (1, 1),
            binary: false,
            sublinear_tf: false,
            norm: Some(Norm::L2),
        })
        .unwrap();

        let features = vectorizer.transform("great service").unwrap();
        assert!((features[0] - 0.6).abs() < 1e-12);
        assert!((features[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_shape_errors() {
        let duplicate: HashMap<String, usize> =
            [("a".to_string(), 0), ("b".to_string(), 0)].into_iter().collect();
        assert!(BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Count {
            vocabulary: duplicate,
            ngram_range: (1, 1),
            binary: false,
        })
        .is_err());

        let out_of_range: HashMap<String, usize> = [("a".to_string(), 3)].into_iter().collect();
        assert!(BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Count {
            vocabulary: out_of_range,
            ngram_range: (1, 1),
            binary: false,
        })
        .is_err());

        let err = BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Tfidf {
            vocabulary: vocabulary(&["a", "b"]),
            idf: vec![1.0],
            ngram_range: (1, 1),
            binary: false,
            sublinear_tf: false,
            norm: None,
        })
        .unwrap_err();
        assert!(err.contains("idf"));
    }

    #[test]
    fn test_artifact_defaults() {
        let artifact: VectorizerArtifact =
            serde_json::from_str(r#"{"type": "tfidf", "vocabulary": {"x": 0}, "idf": [1.5]}"#).unwrap();

        match artifact {
            VectorizerArtifact::Tfidf { ngram_range, norm, binary, .. } => {
                assert_eq!(ngram_range, (1, 1));
                assert_eq!(norm, Some(Norm::L2));
                assert!(!binary);
            }
            other => panic!("unexpected artifact: {:?}", other),
        }
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorizer.json");
        std::fs::write(&path, r#"{"type": "count", "vocabulary": {}}"#).unwrap();

        let err = BagOfWordsVectorizer::load(&path).unwrap_err();
        assert!(err.to_string().contains("vocabulary is empty"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_ngram_range_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorizer.json");
        std::fs::write(
            &path,
            r#"{"type": "count", "vocabulary": {"good": 0}, "ngram_range": [1, 1000000]}"#,
        )
        .unwrap();

        let err = BagOfWordsVectorizer::load(&path).unwrap_err();
        assert_eq!(err.kind(), common::error::ErrorKind::ArtifactLoad);
        assert!(err.to_string().contains("ngram_range"));

        let widest = BagOfWordsVectorizer::from_artifact(VectorizerArtifact::Count {
            vocabulary: vocabulary(&["good"]),
            ngram_range: (1, MAX_NGRAM),
            binary: false,
        });
        assert!(widest.is_ok());
    }
}
