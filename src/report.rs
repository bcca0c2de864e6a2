//! Report aggregation and output
//!
//! The aggregator is the only owner of a report while it is being built.
//! Findings are appended once and never changed; callers get read-only
//! access. Output is deterministic: the same findings always serialize to
//! the same bytes and therefore the same digest.

use crate::audit::contrast::{ContrastFinding, ContrastVerdict};
use crate::audit::rules::{LanguageFinding, LanguageVerdict};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write as _;

/// One entry of the flat finding list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    Contrast(ContrastFinding),
    Language(LanguageFinding),
}

impl Finding {
    /// Deduplication key: `element@state` or the text node id
    pub fn key(&self) -> String {
        match self {
            Finding::Contrast(c) => format!("{}@{}", c.element_id, c.state),
            Finding::Language(l) => l.text_node_id.clone(),
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            Finding::Contrast(c) => match c.verdict {
                ContrastVerdict::Pass => "pass",
                ContrastVerdict::Warning => "warning",
                ContrastVerdict::Fail => "fail",
            },
            Finding::Language(l) => match l.verdict {
                LanguageVerdict::Pass => "pass",
                LanguageVerdict::Warning => "warning",
                LanguageVerdict::Error => "error",
                LanguageVerdict::MissingDeclaration => "missing_declaration",
            },
        }
    }

    /// A hard failure: contrast `fail` or language `error`
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Finding::Contrast(ContrastFinding { verdict: ContrastVerdict::Fail, .. })
                | Finding::Language(LanguageFinding { verdict: LanguageVerdict::Error, .. })
        )
    }

    pub fn criterion(&self) -> &'static str {
        match self {
            Finding::Contrast(c) => c.criterion,
            Finding::Language(l) => l.criterion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Element geometry was unusable
    ElementSkipped,
    /// Text too short to classify
    TextSkipped,
    /// Language branch omitted
    ClassifierUnavailable,
    /// A later finding with an already reported key was dropped
    DuplicateFinding,
}

/// Annotation for anything that was skipped or degraded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportNote {
    pub kind: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl ReportNote {
    pub fn new(kind: NoteKind, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.map(str::to_string),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub pass: usize,
    pub warning: usize,
    pub fail: usize,
    pub error: usize,
    pub missing_declaration: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    url: String,
    summary: Summary,
    findings: Vec<Finding>,
    notes: Vec<ReportNote>,
}

impl Report {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn notes(&self) -> &[ReportNote] {
        &self.notes
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn contrast_findings(&self) -> impl Iterator<Item = &ContrastFinding> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Contrast(c) => Some(c),
            Finding::Language(_) => None,
        })
    }

    pub fn language_findings(&self) -> impl Iterator<Item = &LanguageFinding> {
        self.findings.iter().filter_map(|f| match f {
            Finding::Language(l) => Some(l),
            Finding::Contrast(_) => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.findings.iter().any(Finding::is_failure)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON encoding, hex encoded
    pub fn digest(&self) -> crate::Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== rfaudit WCAG report: {} ===", self.url);
        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} finding(s): {} pass, {} warning, {} fail, {} error, {} missing declaration\n",
            self.findings.len(),
            s.pass,
            s.warning,
            s.fail,
            s.error,
            s.missing_declaration
        );
        for f in &self.findings {
            match f {
                Finding::Contrast(c) => {
                    let _ = writeln!(
                        out,
                        "[{}] WCAG {} {} `{}` ({}): {} on {} = {:.2}:1 (needs {:.1}:1)",
                        f.verdict().to_uppercase(),
                        c.criterion,
                        c.kind.as_str(),
                        c.element_id,
                        c.state,
                        c.foreground.rgb,
                        c.background.rgb,
                        c.ratio,
                        c.required_ratio
                    );
                }
                Finding::Language(l) => {
                    let detected = l
                        .detected_languages
                        .iter()
                        .map(|d| format!("{} {:.2}", d.language, d.confidence))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let _ = writeln!(
                        out,
                        "[{}] WCAG {} {}: declared {}, detected [{}]",
                        f.verdict().to_uppercase(),
                        l.criterion,
                        l.dom_path,
                        l.declared_language.as_deref().unwrap_or("none"),
                        detected
                    );
                }
            }
        }
        if !self.notes.is_empty() {
            let _ = writeln!(out, "\nNotes:");
            for n in &self.notes {
                match &n.subject {
                    Some(subject) => {
                        let _ = writeln!(out, "  - {}: {}", subject, n.message);
                    }
                    None => {
                        let _ = writeln!(out, "  - {}", n.message);
                    }
                }
            }
        }
        out
    }
}

/// Builds a report in arrival order, dropping repeated keys
#[derive(Debug)]
pub struct Aggregator {
    url: String,
    findings: Vec<Finding>,
    notes: Vec<ReportNote>,
    seen: HashSet<String>,
}

impl Aggregator {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            findings: Vec::new(),
            notes: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        let key = finding.key();
        if self.seen.insert(key.clone()) {
            self.findings.push(finding);
        } else {
            self.notes.push(ReportNote::new(
                NoteKind::DuplicateFinding,
                Some(&key),
                "duplicate finding dropped, first occurrence kept",
            ));
        }
    }

    pub fn note(&mut self, note: ReportNote) {
        self.notes.push(note);
    }

    pub fn finish(self) -> Report {
        let mut summary = Summary::default();
        for f in &self.findings {
            let slot = match f {
                Finding::Contrast(c) => match c.verdict {
                    ContrastVerdict::Pass => &mut summary.pass,
                    ContrastVerdict::Warning => &mut summary.warning,
                    ContrastVerdict::Fail => &mut summary.fail,
                },
                Finding::Language(l) => match l.verdict {
                    LanguageVerdict::Pass => &mut summary.pass,
                    LanguageVerdict::Warning => &mut summary.warning,
                    LanguageVerdict::Error => &mut summary.error,
                    LanguageVerdict::MissingDeclaration => &mut summary.missing_declaration,
                },
            };
            *slot += 1;
        }
        Report {
            url: self.url,
            summary,
            findings: self.findings,
            notes: self.notes,
        }
    }
}

/// Contrast findings first (element order), then language findings
/// (document order). No other transformation.
pub fn aggregate(
    url: &str,
    contrast: Vec<ContrastFinding>,
    language: Vec<LanguageFinding>,
    notes: Vec<ReportNote>,
) -> Report {
    let mut agg = Aggregator::new(url);
    for c in contrast {
        agg.push(Finding::Contrast(c));
    }
    for l in language {
        agg.push(Finding::Language(l));
    }
    for n in notes {
        agg.note(n);
    }
    agg.finish()
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

pub fn render(report: &Report, format: OutputFormat) -> crate::Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => report.to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::color::{ColorSample, SampleRegion};
    use crate::audit::language::Detection;
    use crate::page::{ElementKind, RenderState, Rgb};

    fn contrast(id: &str, state: RenderState, verdict: ContrastVerdict) -> ContrastFinding {
        let sample = |rgb| ColorSample {
            rgb,
            region: SampleRegion::Element,
            coverage: 1.0,
            low_confidence: false,
        };
        ContrastFinding {
            element_id: id.into(),
            kind: ElementKind::Submit,
            state,
            criterion: "1.4.11",
            foreground: sample(Rgb::WHITE),
            background: sample(Rgb::BLACK),
            ratio: 21.0,
            required_ratio: 3.0,
            verdict,
        }
    }

    fn language(id: &str, verdict: LanguageVerdict) -> LanguageFinding {
        LanguageFinding {
            text_node_id: id.into(),
            dom_path: "/html[1]".into(),
            criterion: "3.1.1",
            declared_language: Some("en".into()),
            detected_languages: vec![Detection::new("fr", 0.9)],
            verdict,
        }
    }

    #[test]
    fn contrast_comes_before_language() {
        let r = aggregate(
            "https://example.com",
            vec![contrast("a", RenderState::Default, ContrastVerdict::Pass)],
            vec![language("page", LanguageVerdict::Error)],
            vec![],
        );
        assert!(matches!(r.findings()[0], Finding::Contrast(_)));
        assert!(matches!(r.findings()[1], Finding::Language(_)));
        assert!(r.has_failures());
        assert_eq!(r.summary().error, 1);
        assert_eq!(r.summary().pass, 1);
    }

    #[test]
    fn summary_counts_every_verdict_kind() {
        let r = aggregate(
            "u",
            vec![
                contrast("a", RenderState::Default, ContrastVerdict::Pass),
                contrast("b", RenderState::Default, ContrastVerdict::Warning),
                contrast("c", RenderState::Default, ContrastVerdict::Fail),
            ],
            vec![
                language("t1", LanguageVerdict::Pass),
                language("t2", LanguageVerdict::Warning),
                language("t3", LanguageVerdict::Error),
                language("t4", LanguageVerdict::MissingDeclaration),
            ],
            vec![],
        );
        let s = r.summary();
        assert_eq!(s.pass, 2);
        assert_eq!(s.warning, 2);
        assert_eq!(s.fail, 1);
        assert_eq!(s.error, 1);
        assert_eq!(s.missing_declaration, 1);
    }

    #[test]
    fn duplicates_are_dropped_with_a_note() {
        let r = aggregate(
            "u",
            vec![
                contrast("a", RenderState::Default, ContrastVerdict::Pass),
                contrast("a", RenderState::Focused, ContrastVerdict::Fail),
                contrast("a", RenderState::Default, ContrastVerdict::Fail),
            ],
            vec![],
            vec![],
        );
        assert_eq!(r.findings().len(), 2);
        assert_eq!(r.notes().len(), 1);
        assert_eq!(r.notes()[0].kind, NoteKind::DuplicateFinding);
        assert_eq!(r.notes()[0].subject.as_deref(), Some("a@default"));
    }

    #[test]
    fn json_is_tagged_by_kind() {
        let r = aggregate(
            "u",
            vec![contrast("a", RenderState::Default, ContrastVerdict::Pass)],
            vec![language("page", LanguageVerdict::MissingDeclaration)],
            vec![],
        );
        let v: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(v["findings"][0]["kind"], "contrast");
        assert_eq!(v["findings"][0]["verdict"], "pass");
        assert_eq!(v["findings"][1]["kind"], "language");
        assert_eq!(v["findings"][1]["verdict"], "missing_declaration");
        assert_eq!(v["summary"]["missing_declaration"], 1);
    }

    #[test]
    fn digest_is_stable() {
        let build = || {
            aggregate(
                "u",
                vec![contrast("a", RenderState::Default, ContrastVerdict::Fail)],
                vec![language("t", LanguageVerdict::Warning)],
                vec![ReportNote::new(NoteKind::TextSkipped, Some("/html[1]"), "too short")],
            )
        };
        assert_eq!(build().digest().unwrap(), build().digest().unwrap());
        assert_eq!(build().digest().unwrap().len(), 64);
    }

    #[test]
    fn text_output_lists_findings_and_notes() {
        let r = aggregate(
            "u",
            vec![contrast("btn", RenderState::Default, ContrastVerdict::Fail)],
            vec![],
            vec![ReportNote::new(NoteKind::ClassifierUnavailable, None, "no classifier")],
        );
        let text = r.to_text();
        assert!(text.contains("[FAIL] WCAG 1.4.11 submit `btn`"));
        assert!(text.contains("no classifier"));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
    }
}
