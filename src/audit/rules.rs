//! Compliance rules for the language branch (WCAG 3.1.1 / 3.1.2)

use crate::audit::language::{primary_subtag, Detection};
use crate::audit::text::TextNode;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageVerdict {
    Pass,
    Warning,
    Error,
    /// Nothing in scope declares a language
    MissingDeclaration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageFinding {
    pub text_node_id: String,
    pub dom_path: String,
    pub criterion: &'static str,
    pub declared_language: Option<String>,
    pub detected_languages: Vec<Detection>,
    pub verdict: LanguageVerdict,
}

/// Thresholds for judging a ranked list against a declaration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageRules {
    /// Top guess at or above this confirms the declaration
    pub high_confidence: f64,
    /// Top guess at or above this (inclusive), with the declaration absent,
    /// is a mismatch
    pub reliable_mismatch: f64,
}

impl Default for LanguageRules {
    fn default() -> Self {
        Self {
            high_confidence: 0.8,
            reliable_mismatch: 0.5,
        }
    }
}

impl LanguageRules {
    /// `detections` must already be ranked (see `ClassifierAdapter`).
    pub fn judge(&self, declared: Option<&str>, detections: &[Detection]) -> LanguageVerdict {
        let Some(declared) = declared else {
            return LanguageVerdict::MissingDeclaration;
        };
        let Some(top) = detections.first() else {
            return LanguageVerdict::Warning;
        };
        let declared = primary_subtag(declared);
        let top_matches = primary_subtag(&top.language) == declared;

        if top_matches && top.confidence >= self.high_confidence {
            return LanguageVerdict::Pass;
        }
        if top.confidence < self.reliable_mismatch {
            return LanguageVerdict::Warning;
        }
        let listed = detections.iter().any(|d| primary_subtag(&d.language) == declared);
        if listed {
            LanguageVerdict::Warning
        } else {
            LanguageVerdict::Error
        }
    }

    pub fn evaluate(&self, node: &TextNode, detections: Vec<Detection>) -> LanguageFinding {
        let verdict = self.judge(node.declared_language.as_deref(), &detections);
        LanguageFinding {
            text_node_id: node.id.clone(),
            dom_path: node.dom_path.clone(),
            criterion: node.criterion(),
            declared_language: node.declared_language.clone(),
            detected_languages: detections,
            verdict,
        }
    }
}
