//! Request body validation for `/predict`

use serde_json::Value;

use common::error::{Error, Result};
use common::types::PredictionRequest;

pub const MISSING_REVIEW: &str = "Missing 'review' field";
pub const EMPTY_REVIEW: &str = "'review' field cannot be empty";
pub const NOT_AN_OBJECT: &str = "Request body must be a JSON object";
pub const REVIEW_NOT_A_STRING: &str = "'review' must be a string";

/// Extracts the review text from a raw request body.
///
/// The returned text is the review as sent; whitespace is only trimmed for
/// the emptiness check.
pub fn extract_review(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body).map_err(|_| Error::Validation(NOT_AN_OBJECT.to_string()))?;

    if !value.is_object() {
        return Err(Error::Validation(NOT_AN_OBJECT.to_string()));
    }

    let request: PredictionRequest =
        serde_json::from_value(value).map_err(|_| Error::Validation(REVIEW_NOT_A_STRING.to_string()))?;

    match request.review {
        None => Err(Error::Validation(MISSING_REVIEW.to_string())),
        Some(review) if review.trim().is_empty() => Err(Error::Validation(EMPTY_REVIEW.to_string())),
        Some(review) => Ok(review),
    }
}
