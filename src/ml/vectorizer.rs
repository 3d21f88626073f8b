use crate::error::{AppError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Vectorizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Maximum n-gram length (1 = unigrams only)
    pub ngram_max: usize,

    /// Minimum number of documents a term must appear in
    pub min_doc_freq: usize,

    /// Maximum vocabulary size
    pub max_features: usize,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            ngram_max: 2,
            min_doc_freq: 2,
            max_features: 5000,
        }
    }
}

/// TF-IDF text vectorizer.
///
/// Builds a document-frequency-filtered n-gram vocabulary over a training
/// corpus and maps texts to L2-normalized TF-IDF vectors. Vocabulary order is
/// deterministic for a fixed corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Configuration
    config: TfidfConfig,

    /// Vocabulary mapping (term -> index)
    vocabulary: HashMap<String, usize>,

    /// Inverse document frequency, indexed by vocabulary index
    idf_values: Vec<f64>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl TfidfVectorizer {
    /// Create a new vectorizer
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: HashMap::new(),
            idf_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Lowercase alphanumeric tokenization
    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    /// Extract n-gram terms from a text
    fn extract_terms(&self, text: &str) -> Vec<String> {
        let tokens = Self::tokenize(text);
        let mut terms = Vec::new();

        for n in 1..=self.config.ngram_max {
            if tokens.len() < n {
                break;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }

        terms
    }

    /// Fit the vocabulary and IDF values on a corpus
    pub fn fit(&mut self, corpus: &[String]) -> Result<()> {
        let mut term_doc_freq: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let unique_terms: HashSet<String> = self.extract_terms(text).into_iter().collect();
            for term in unique_terms {
                *term_doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Filter by document frequency, then keep the most frequent terms.
        // Ties break on the term itself so the vocabulary is deterministic.
        let mut vocab_list: Vec<(String, usize)> = term_doc_freq
            .into_iter()
            .filter(|(_, freq)| *freq >= self.config.min_doc_freq)
            .collect();
        vocab_list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        vocab_list.truncate(self.config.max_features);

        if vocab_list.is_empty() {
            return Err(AppError::Model(
                "Vocabulary is empty after document-frequency filtering".to_string(),
            ));
        }

        let n_docs = corpus.len() as f64;
        self.idf_values = vocab_list
            .iter()
            .map(|(_, doc_freq)| (n_docs / (1.0 + *doc_freq as f64)).ln() + 1.0)
            .collect();

        self.vocabulary = vocab_list
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();

        self.is_fitted = true;
        tracing::debug!(
            vocabulary_size = self.vocabulary.len(),
            n_docs = corpus.len(),
            "Fitted TF-IDF vectorizer"
        );

        Ok(())
    }

    /// Transform a text into an L2-normalized TF-IDF vector
    pub fn transform(&self, text: &str) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(AppError::Model(
                "TfidfVectorizer must be fitted before transform".to_string(),
            ));
        }

        let mut features = Array1::zeros(self.vocabulary.len());
        for term in self.extract_terms(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                features[idx] += self.idf_values[idx];
            }
        }

        let norm = features.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            features.mapv_inplace(|v| v / norm);
        }

        Ok(features)
    }

    /// Transform a corpus into a feature matrix
    pub fn transform_batch(&self, corpus: &[String]) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((corpus.len(), self.vocabulary.len()));
        for (i, text) in corpus.iter().enumerate() {
            let row = self.transform(text)?;
            matrix.row_mut(i).assign(&row);
        }
        Ok(matrix)
    }

    /// Number of vocabulary features
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether the vectorizer has been fitted
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Moodle login fails again".to_string(),
            "Moodle login is broken".to_string(),
            "payment failed on the fee portal".to_string(),
            "payment declined on the fee portal".to_string(),
        ]
    }

    fn config() -> TfidfConfig {
        TfidfConfig {
            ngram_max: 2,
            min_doc_freq: 2,
            max_features: 100,
        }
    }

    #[test]
    fn test_fit_builds_shared_vocabulary() {
        let mut vectorizer = TfidfVectorizer::new(config());
        vectorizer.fit(&corpus()).unwrap();

        assert!(vectorizer.is_fitted());
        // "moodle", "login", "moodle login", "payment", "fee", "portal", ...
        assert!(vectorizer.n_features() >= 5);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let vectorizer = TfidfVectorizer::new(config());
        assert!(vectorizer.transform("anything").is_err());
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let mut vectorizer = TfidfVectorizer::new(config());
        vectorizer.fit(&corpus()).unwrap();

        let vector = vectorizer.transform("moodle login fails").unwrap();
        let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_produce_zero_vector() {
        let mut vectorizer = TfidfVectorizer::new(config());
        vectorizer.fit(&corpus()).unwrap();

        let vector = vectorizer.transform("zzz qqq").unwrap();
        assert!(vector.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_min_doc_freq_filters_rare_terms() {
        let mut vectorizer = TfidfVectorizer::new(config());
        vectorizer.fit(&corpus()).unwrap();

        // "fails" appears in one document only
        let vector = vectorizer.transform("fails").unwrap();
        assert!(vector.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_deterministic_vocabulary() {
        let mut a = TfidfVectorizer::new(config());
        let mut b = TfidfVectorizer::new(config());
        a.fit(&corpus()).unwrap();
        b.fit(&corpus()).unwrap();

        let va = a.transform("moodle login payment portal").unwrap();
        let vb = b.transform("moodle login payment portal").unwrap();
        assert_eq!(va, vb);
    }

    #[test]
    fn test_empty_vocabulary_is_an_error() {
        let mut vectorizer = TfidfVectorizer::new(TfidfConfig {
            ngram_max: 1,
            min_doc_freq: 5,
            max_features: 100,
        });
        let result = vectorizer.fit(&["one text".to_string()]);
        assert!(result.is_err());
    }
}
