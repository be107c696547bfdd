//! Pre-trained classifiers
//!
//! This module provides the classifiers that can be served: a linear
//! (logistic regression) model, multinomial naive Bayes and Gaussian naive
//! Bayes. Each one is decoded from a JSON artifact, checked for internal
//! consistency, and never changes after loading.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use common::error::{Error, Result};

use crate::artifact;

/// Predicts a raw class label from a feature vector
pub trait Classifier: Send + Sync {
    /// Number of features the classifier expects
    fn n_features(&self) -> usize;

    /// Predicts the class label of `features`
    fn predict(&self, features: &Array1<f64>) -> Result<i64>;
}

/// Serialized classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    /// Binary linear model: positive decision value selects `classes[1]`
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_binary_classes")]
        classes: Vec<i64>,
    },

    /// Multinomial naive Bayes
    MultinomialNb {
        classes: Vec<i64>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },

    /// Gaussian naive Bayes
    GaussianNb {
        classes: Vec<i64>,
        class_prior: Vec<f64>,
        theta: Vec<Vec<f64>>,
        var: Vec<Vec<f64>>,
    },
}

fn default_binary_classes() -> Vec<i64> {
    vec![0, 1]
}

/// Loads a classifier artifact from disk
pub fn load(path: &Path) -> Result<Box<dyn Classifier>> {
    let artifact: ClassifierArtifact = artifact::read_json(path)?;
    from_artifact(artifact).map_err(|reason| Error::artifact_load(path.display(), reason))
}

/// Builds a classifier from a decoded artifact, checking its shape
pub fn from_artifact(artifact: ClassifierArtifact) -> std::result::Result<Box<dyn Classifier>, String> {
    match artifact {
        ClassifierArtifact::LogisticRegression { coef, intercept, classes } => {
            Ok(Box::new(LinearClassifier::new(coef, intercept, classes)?))
        }
        ClassifierArtifact::MultinomialNb { classes, class_log_prior, feature_log_prob } => {
            Ok(Box::new(MultinomialNaiveBayes::new(classes, class_log_prior, feature_log_prob)?))
        }
        ClassifierArtifact::GaussianNb { classes, class_prior, theta, var } => {
            Ok(Box::new(GaussianNaiveBayes::new(classes, class_prior, theta, var)?))
        }
    }
}

/// Binary linear classifier
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    coef: Array1<f64>,
    intercept: f64,
    classes: [i64; 2],
}

impl LinearClassifier {
    pub fn new(coef: Vec<f64>, intercept: f64, classes: Vec<i64>) -> std::result::Result<Self, String> {
        if coef.is_empty() {
            return Err("coef is empty".to_string());
        }
        if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".to_string());
        }
        let classes: [i64; 2] = classes
            .try_into()
            .map_err(|c: Vec<i64>| format!("expected 2 classes, got {}", c.len()))?;

        Ok(Self {
            coef: Array1::from(coef),
            intercept,
            classes,
        })
    }

    /// Signed distance of `features` to the decision boundary
    pub fn decision_function(&self, features: &Array1<f64>) -> Result<f64> {
        check_len(features, self.coef.len())?;
        Ok(self.coef.dot(features) + self.intercept)
    }
}

impl Classifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, features: &Array1<f64>) -> Result<i64> {
        let score = self.decision_function(features)?;
        if !score.is_finite() {
            return Err(Error::Internal(format!("non-finite decision value {}", score)));
        }
        Ok(if score > 0.0 { self.classes[1] } else { self.classes[0] })
    }
}

/// Multinomial naive Bayes classifier
#[derive(Debug, Clone)]
pub struct MultinomialNaiveBayes {
    classes: Vec<i64>,
    class_log_prior: Array1<f64>,
    /// One row per class
    feature_log_prob: Array2<f64>,
}

impl MultinomialNaiveBayes {
    pub fn new(
        classes: Vec<i64>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    ) -> std::result::Result<Self, String> {
        check_classes(&classes, class_log_prior.len(), "class_log_prior")?;
        let feature_log_prob = to_matrix(feature_log_prob, classes.len(), "feature_log_prob")?;

        Ok(Self {
            classes,
            class_log_prior: Array1::from(class_log_prior),
            feature_log_prob,
        })
    }
}

impl Classifier for MultinomialNaiveBayes {
    fn n_features(&self) -> usize {
        self.feature_log_prob.ncols()
    }

    fn predict(&self, features: &Array1<f64>) -> Result<i64> {
        check_len(features, self.n_features())?;
        let joint = self.feature_log_prob.dot(features) + &self.class_log_prior;
        argmax(&joint).map(|i| self.classes[i])
    }
}

/// Gaussian naive Bayes classifier
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    classes: Vec<i64>,
    log_prior: Array1<f64>,
    theta: Array2<f64>,
    var: Array2<f64>,
    /// `-0.5 * sum(ln(2π var))` per class
    log_norm: Array1<f64>,
}

impl GaussianNaiveBayes {
    pub fn new(
        classes: Vec<i64>,
        class_prior: Vec<f64>,
        theta: Vec<Vec<f64>>,
        var: Vec<Vec<f64>>,
    ) -> std::result::Result<Self, String> {
        check_classes(&classes, class_prior.len(), "class_prior")?;
        if class_prior.iter().any(|p| !(*p > 0.0)) {
            return Err("class priors must be positive".to_string());
        }
        let theta = to_matrix(theta, classes.len(), "theta")?;
        let var = to_matrix(var, classes.len(), "var")?;
        if theta.dim() != var.dim() {
            return Err(format!("theta is {:?} but var is {:?}", theta.dim(), var.dim()));
        }
        if var.iter().any(|v| !(*v > 0.0)) {
            return Err("variances must be positive".to_string());
        }

        let log_norm = var
            .mapv(|v| (2.0 * std::f64::consts::PI * v).ln())
            .sum_axis(ndarray::Axis(1))
            * -0.5;

        Ok(Self {
            classes,
            log_prior: Array1::from(class_prior).mapv(f64::ln),
            theta,
            var,
            log_norm,
        })
    }
}

impl Classifier for GaussianNaiveBayes {
    fn n_features(&self) -> usize {
        self.theta.ncols()
    }

    fn predict(&self, features: &Array1<f64>) -> Result<i64> {
        check_len(features, self.n_features())?;

        let joint: Array1<f64> = (0..self.classes.len())
            .map(|i| {
                let diff = features - &self.theta.row(i);
                let mahalanobis = (&diff * &diff / &self.var.row(i)).sum();
                self.log_prior[i] + self.log_norm[i] - 0.5 * mahalanobis
            })
            .collect();

        argmax(&joint).map(|i| self.classes[i])
    }
}

fn check_len(features: &Array1<f64>, expected: usize) -> Result<()> {
    if features.len() != expected {
        return Err(Error::Internal(format!(
            "expected {} features, got {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

fn check_classes(classes: &[i64], priors: usize, field: &str) -> std::result::Result<(), String> {
    if classes.len() < 2 {
        return Err(format!("expected at least 2 classes, got {}", classes.len()));
    }
    if priors != classes.len() {
        return Err(format!("{} has {} entries for {} classes", field, priors, classes.len()));
    }
    Ok(())
}

fn to_matrix(rows: Vec<Vec<f64>>, n_rows: usize, field: &str) -> std::result::Result<Array2<f64>, String> {
    if rows.len() != n_rows {
        return Err(format!("{} has {} rows for {} classes", field, rows.len(), n_rows));
    }
    let n_cols = rows.first().map_or(0, Vec::len);
    if n_cols == 0 {
        return Err(format!("{} has no features", field));
    }
    if rows.iter().any(|row| row.len() != n_cols) {
        return Err(format!("{} rows have different lengths", field));
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", field));
    }
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| format!("{}: {}", field, e))
}

/// Index of the first maximum
fn argmax(scores: &Array1<f64>) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(Error::Internal(format!("non-finite class score {}", score)));
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
        .ok_or_else(|| Error::Internal("no class scores".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_classifier() {
        let model = LinearClassifier::new(vec![2.0, -3.0], -0.5, vec![0, 1]).unwrap();

        assert_eq!(model.predict(&array![1.0, 0.0]).unwrap(), 1);
        assert_eq!(model.predict(&array![0.0, 1.0]).unwrap(), 0);
        // A zero decision value is not positive
        assert_eq!(model.predict(&array![0.25, 0.0]).unwrap(), 0);
        assert!(model.predict(&array![1.0]).is_err());
    }

    #[test]
    fn test_multinomial_nb() {
        let model = MultinomialNaiveBayes::new(
            vec![0, 1],
            vec![0.5f64.ln(), 0.5f64.ln()],
            vec![vec![0.8f64.ln(), 0.2f64.ln()], vec![0.1f64.ln(), 0.9f64.ln()]],
        )
        .unwrap();

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.predict(&array![3.0, 0.0]).unwrap(), 0);
        assert_eq!(model.predict(&array![0.0, 2.0]).unwrap(), 1);
    }

    #[test]
    fn test_gaussian_nb() {
        let model = GaussianNaiveBayes::new(
            vec![0, 1],
            vec![0.5, 0.5],
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            vec![vec![0.1, 0.1], vec![0.1, 0.1]],
        )
        .unwrap();

        assert_eq!(model.predict(&array![0.1, 0.0]).unwrap(), 0);
        assert_eq!(model.predict(&array![0.9, 1.2]).unwrap(), 1);
    }

    #[test]
    fn test_shape_validation() {
        assert!(LinearClassifier::new(vec![], 0.0, vec![0, 1]).is_err());
        assert!(LinearClassifier::new(vec![1.0], 0.0, vec![0, 1, 2]).is_err());
        assert!(MultinomialNaiveBayes::new(vec![0, 1], vec![0.0], vec![vec![0.0], vec![0.0]]).is_err());
        assert!(GaussianNaiveBayes::new(
            vec![0, 1],
            vec![0.5, 0.5],
            vec![vec![0.0], vec![1.0]],
            vec![vec![0.1], vec![0.0]],
        )
        .is_err());
    }

    #[test]
    fn test_artifact_decoding() {
        let artifact: ClassifierArtifact =
            serde_json::from_str(r#"{"type": "logistic_regression", "coef": [1.0, -1.0], "intercept": 0.1}"#)
                .unwrap();
        let model = from_artifact(artifact).unwrap();

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.predict(&array![0.0, 0.0]).unwrap(), 1);

        let unknown = serde_json::from_str::<ClassifierArtifact>(r#"{"type": "random_forest"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&array![1.0, 3.0, 3.0]).unwrap(), 1);
        assert!(argmax(&array![1.0, f64::NAN]).is_err());
    }
}
