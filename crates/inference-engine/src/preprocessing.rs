//! Text preprocessing
//!
//! Reviews are normalized before vectorization: everything but ASCII letters
//! becomes whitespace, the text is lowercased, and English stop words are
//! removed. Negations are kept since they flip sentiment.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use common::error::Result;

/// Pure text normalization step
pub trait Preprocessor: Send + Sync {
    /// Returns the normalized form of `text`
    fn preprocess(&self, text: &str) -> Result<String>;
}

const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just",
    "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn",
    "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn",
    "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

static STOP_WORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Default preprocessor used by the service.
///
/// Keeps ASCII letters, lowercases and drops English stop words except
/// negations. It does not stem, so vocabularies fitted on stemmed text
/// (e.g. Porter stems such as `amaz`) need a [`Preprocessor`] that stems
/// the same way.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    /// Creates a new text normalizer
    pub fn new() -> Self {
        Self
    }

    /// Normalizes `text`. Never fails.
    pub fn normalize(&self, text: &str) -> String {
        let letters: String = text
            .chars()
            .map(|c| if c.is_ascii_alphabetic() { c.to_ascii_lowercase() } else { ' ' })
            .collect();

        letters
            .split_whitespace()
            .filter(|word| !STOP_WORD_SET.contains(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Preprocessor for TextNormalizer {
    fn preprocess(&self, text: &str) -> Result<String> {
        Ok(self.normalize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let normalizer = TextNormalizer::new();

        assert_eq!(
            normalizer.normalize("The food was amazing and the service was great!"),
            "food amazing service great"
        );
        assert_eq!(normalizer.normalize("Crust is NOT good."), "crust not good");
        assert_eq!(normalizer.normalize("Wouldn't go back... 0/10"), "go back");
        assert_eq!(normalizer.normalize("   "), "");
    }

    #[test]
    fn test_non_ascii_letters_are_separators() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("café au lait"), "caf au lait");
    }

    #[test]
    fn test_negations_are_kept() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("no, nor not"), "no nor not");
    }
}
