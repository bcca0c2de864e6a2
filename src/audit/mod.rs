//! Analysis pipeline
//!
//! Contrast branch: geometry -> color profile -> contrast verdict.
//! Language branch: text nodes -> classifier -> language verdict.
//! Both branches meet in the [`Aggregator`](crate::report::Aggregator).
//!
//! Every element and text node is evaluated independently, so both
//! branches fan out over a scoped worker pool and collect results in input
//! order. Nothing here performs I/O except whatever the injected classifier
//! does.

pub mod color;
pub mod contrast;
pub mod geometry;
pub mod language;
pub mod rules;
pub mod text;

use crate::error::GeometryError;
use crate::page::{ElementGeometry, RenderedPage};
use crate::report::{aggregate, NoteKind, Report, ReportNote};
use crate::{AuditConfig, Result};
use color::{ColorProfiler, SampleRegion};
use contrast::{ContrastEvaluator, ContrastFinding};
use language::{ClassifierAdapter, Detection, LanguageClassifier};
use rules::{LanguageFinding, LanguageRules};
use std::sync::Arc;
use text::{TextNode, TextNodeExtractor};

/// Configured analysis engine. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct Auditor {
    config: AuditConfig,
    adapter: Option<ClassifierAdapter>,
}

impl Auditor {
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, adapter: None })
    }

    /// Inject the shared classifier handle
    pub fn with_classifier(mut self, classifier: Arc<dyn LanguageClassifier>) -> Self {
        let mut adapter = ClassifierAdapter::new(classifier);
        if let Some(langs) = &self.config.languages {
            adapter = adapter.with_languages(langs);
        }
        self.adapter = Some(adapter);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run both branches over one page.
    pub fn analyze(&self, page: &RenderedPage) -> Report {
        let mut notes = Vec::new();

        let contrast = self.contrast_branch(page, &mut notes);
        let language = self.language_branch(page, &mut notes);
        log::debug!(
            "analyzed {}: {} contrast finding(s), {} language finding(s), {} note(s)",
            page.url,
            contrast.len(),
            language.len(),
            notes.len()
        );

        aggregate(&page.url, contrast, language, notes)
    }

    fn contrast_branch(&self, page: &RenderedPage, notes: &mut Vec<ReportNote>) -> Vec<ContrastFinding> {
        let profiler = ColorProfiler::new(self.config.quantization_buckets, self.config.min_coverage);
        let evaluator = ContrastEvaluator::new(self.config.min_component_contrast);
        let margin = self.config.background_margin;

        let results = par_map(&page.elements, self.config.workers, |el| {
            evaluate_element(page, el, &profiler, &evaluator, margin)
        });

        let mut findings = Vec::with_capacity(results.len());
        for res in results {
            match res {
                Ok(f) => findings.push(f),
                Err(e) => {
                    log::warn!("skipping element: {}", e);
                    notes.push(ReportNote::new(NoteKind::ElementSkipped, Some(e.element_id()), e.to_string()));
                }
            }
        }
        findings
    }

    fn language_branch(&self, page: &RenderedPage, notes: &mut Vec<ReportNote>) -> Vec<LanguageFinding> {
        let extractor = TextNodeExtractor {
            min_chars: self.config.min_text_chars,
            min_words: self.config.min_words,
            min_attribute_words: self.config.min_attribute_words,
            check_attributes: self.config.check_hidden_attributes,
        };
        let extraction = extractor.extract(&page.dom);
        for s in &extraction.skipped {
            notes.push(ReportNote::new(
                NoteKind::TextSkipped,
                Some(&s.dom_path),
                format!("not classified: {}", s.reason),
            ));
        }

        let Some(adapter) = &self.adapter else {
            log::warn!("no language classifier configured, language checks omitted");
            notes.push(ReportNote::new(
                NoteKind::ClassifierUnavailable,
                None,
                "language checks omitted: no classifier configured",
            ));
            return Vec::new();
        };

        let detections = match self.detect_all(adapter, &extraction.nodes) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("language checks omitted: {}", e);
                notes.push(ReportNote::new(
                    NoteKind::ClassifierUnavailable,
                    None,
                    format!("language checks omitted: {}", e),
                ));
                return Vec::new();
            }
        };

        let rules = LanguageRules {
            high_confidence: self.config.high_confidence,
            reliable_mismatch: self.config.reliable_mismatch,
        };
        extraction
            .nodes
            .iter()
            .zip(detections)
            .map(|(node, dets)| rules.evaluate(node, dets))
            .collect()
    }

    fn detect_all(&self, adapter: &ClassifierAdapter, nodes: &[TextNode]) -> Result<Vec<Vec<Detection>>> {
        let workers = self.config.workers;
        match self.config.classifier_batch_size {
            0 => par_map(nodes, workers, |n| adapter.detect(n)).into_iter().collect(),
            size => {
                let chunks: Vec<&[TextNode]> = nodes.chunks(size).collect();
                let batches: Result<Vec<Vec<Vec<Detection>>>> =
                    par_map(&chunks, workers, |c| adapter.detect_batch(c)).into_iter().collect();
                Ok(batches?.into_iter().flatten().collect())
            }
        }
    }
}

fn evaluate_element(
    page: &RenderedPage,
    el: &ElementGeometry,
    profiler: &ColorProfiler,
    evaluator: &ContrastEvaluator,
    margin: u32,
) -> std::result::Result<ContrastFinding, GeometryError> {
    let shot = page
        .screenshot(el.screenshot_ref)
        .ok_or_else(|| GeometryError::MissingScreenshot {
            id: el.id.clone(),
            state: el.screenshot_ref,
        })?;
    let region = geometry::extract_region(el, shot, margin)?;
    let fg = profiler
        .profile(&region.element_pixels(shot), SampleRegion::Element)
        .ok_or_else(|| GeometryError::EmptyRegion { id: el.id.clone(), region: "element" })?;
    let bg = profiler
        .profile(&region.background_pixels(shot), SampleRegion::Background)
        .ok_or_else(|| GeometryError::EmptyRegion { id: el.id.clone(), region: "background" })?;
    Ok(evaluator.evaluate(&el.id, el.kind, el.screenshot_ref, fg, bg))
}

/// Order-preserving parallel map over scoped threads
fn par_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if workers <= 1 || items.len() <= 1 {
        return items.iter().map(f).collect();
    }
    let chunk = (items.len() + workers - 1) / workers;
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .map(|c| s.spawn(move || c.iter().map(f).collect::<Vec<R>>()))
            .collect();
        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(v) => v,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Analyze with default thresholds and the given classifier
pub fn analyze(page: &RenderedPage, classifier: Arc<dyn LanguageClassifier>) -> Report {
    Auditor {
        config: AuditConfig::default(),
        adapter: None,
    }
    .with_classifier(classifier)
    .analyze(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn par_map_preserves_order() {
        let items: Vec<u32> = (0..103).collect();
        let out = par_map(&items, 4, |x| x * 2);
        assert_eq!(out, items.iter().map(|x| x * 2).collect::<Vec<_>>());
        assert_eq!(par_map(&items, 1, |x| *x), items);
        assert!(par_map(&[] as &[u32], 8, |x| *x).is_empty());
    }
}
