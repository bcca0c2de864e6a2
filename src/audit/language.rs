//! Language classifier adapter
//!
//! The engine ships no language model. A classifier is anything that
//! implements [`LanguageClassifier`]; it is loaded once, wrapped in an `Arc`
//! and shared by every worker. The adapter only normalizes and ranks the
//! classifier's guesses, all decisions live in the rule engine.
//!
//! Classifiers may be nondeterministic (sampling, model updates). Reports
//! are only reproducible when the classifier is.

use crate::audit::text::{clean_text, TextNode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One language guess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub language: String,
    pub confidence: f64,
}

impl Detection {
    pub fn new(language: &str, confidence: f64) -> Self {
        Self {
            language: language.to_string(),
            confidence,
        }
    }
}

/// Core trait for language detection backends
pub trait LanguageClassifier: Send + Sync {
    /// Guess the language of `text`. Order of the returned guesses does not
    /// matter; the adapter ranks them.
    fn classify(&self, text: &str) -> Result<Vec<Detection>>;

    /// Classify several texts in one call. Backends with batched inference
    /// should override this.
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Vec<Detection>>> {
        texts.iter().map(|t| self.classify(t)).collect()
    }
}

/// Wrap a closure as a classifier
pub struct FnClassifier<F>(pub F);

impl<F> LanguageClassifier for FnClassifier<F>
where
    F: Fn(&str) -> Result<Vec<Detection>> + Send + Sync,
{
    fn classify(&self, text: &str) -> Result<Vec<Detection>> {
        (self.0)(text)
    }
}

/// Replays classifier output recorded earlier, keyed by cleaned text.
///
/// Unknown texts yield no detections.
#[derive(Debug, Clone, Default)]
pub struct RecordedClassifier {
    recordings: HashMap<String, Vec<Detection>>,
}

impl RecordedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, text: &str, detections: Vec<Detection>) -> Self {
        self.recordings.insert(clean_text(text), detections);
        self
    }

    /// Parse a JSON object mapping text to detections
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<Detection>> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .fold(Self::new(), |acc, (text, dets)| acc.record(&text, dets)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

impl LanguageClassifier for RecordedClassifier {
    fn classify(&self, text: &str) -> Result<Vec<Detection>> {
        Ok(self
            .recordings
            .get(&clean_text(text))
            .cloned()
            .unwrap_or_default())
    }
}

/// Lowercased primary subtag: `en-US` and `EN_gb` both become `en`
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Maps text nodes to ranked language guesses
#[derive(Clone)]
pub struct ClassifierAdapter {
    classifier: Arc<dyn LanguageClassifier>,
    languages: Option<Vec<String>>,
}

impl ClassifierAdapter {
    pub fn new(classifier: Arc<dyn LanguageClassifier>) -> Self {
        Self {
            classifier,
            languages: None,
        }
    }

    /// Only keep guesses for these languages
    pub fn with_languages(mut self, languages: &[String]) -> Self {
        self.languages = Some(languages.iter().map(|l| primary_subtag(l)).collect());
        self
    }

    pub fn detect(&self, node: &TextNode) -> Result<Vec<Detection>> {
        let raw = self.classifier.classify(&node.text)?;
        Ok(self.rank(raw))
    }

    pub fn detect_batch(&self, nodes: &[TextNode]) -> Result<Vec<Vec<Detection>>> {
        let texts: Vec<&str> = nodes.iter().map(|n| n.text.as_str()).collect();
        let raw = self.classifier.classify_batch(&texts)?;
        if raw.len() != nodes.len() {
            return Err(Error::ClassifierUnavailable(format!(
                "batch returned {} results for {} texts",
                raw.len(),
                nodes.len()
            )));
        }
        Ok(raw.into_iter().map(|r| self.rank(r)).collect())
    }

    /// Normalize codes, clamp confidences, merge duplicates (max wins) and
    /// sort by confidence descending, then code ascending.
    fn rank(&self, raw: Vec<Detection>) -> Vec<Detection> {
        let mut best: HashMap<String, f64> = HashMap::new();
        for d in raw {
            let code = primary_subtag(&d.language);
            if code.is_empty() {
                continue;
            }
            if let Some(allowed) = &self.languages {
                if !allowed.contains(&code) {
                    continue;
                }
            }
            let conf = if d.confidence.is_nan() { 0.0 } else { d.confidence.clamp(0.0, 1.0) };
            let entry = best.entry(code).or_insert(conf);
            if conf > *entry {
                *entry = conf;
            }
        }
        let mut ranked: Vec<Detection> = best
            .into_iter()
            .map(|(language, confidence)| Detection { language, confidence })
            .collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.language.cmp(&b.language))
        });
        ranked
    }
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("languages", &self.languages)
            .finish_non_exhaustive()
    }
}
