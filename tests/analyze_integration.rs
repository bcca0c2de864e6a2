//! End-to-end tests for the analysis pipeline

use rfaudit::audit::contrast::ContrastVerdict;
use rfaudit::audit::language::{Detection, FnClassifier, LanguageClassifier, RecordedClassifier};
use rfaudit::audit::rules::LanguageVerdict;
use rfaudit::report::NoteKind;
use rfaudit::{AuditConfig, Auditor, BoundingBox, DomNode, ElementGeometry, ElementKind, Error};
use rfaudit::{RenderState, RenderedPage, Report, Rgb, Screenshot};
use std::sync::Arc;

const EN: &str = "The quick brown fox jumps over the lazy dog";
const FR: &str = "Le renard brun rapide saute par dessus le chien";
const NL: &str = "Een foto van de zee";

fn button_box() -> BoundingBox {
    BoundingBox::new(20, 20, 40, 16)
}

/// 100x60 capture with a solid component on a solid background
fn solid_page(fg: Rgb, bg: Rgb, kind: ElementKind) -> RenderedPage {
    let mut shot = Screenshot::filled(100, 60, bg);
    shot.fill_rect(20, 20, 40, 16, fg);
    RenderedPage::new("https://example.com/", DomNode::element("html"))
        .with_screenshot(RenderState::Default, shot)
        .with_element(ElementGeometry::new("el", kind, button_box()))
}

fn auditor() -> Auditor {
    Auditor::new(AuditConfig::default())
        .unwrap()
        .with_classifier(Arc::new(RecordedClassifier::new()))
}

fn english_page() -> RenderedPage {
    let dom = DomNode::element("html")
        .attr("lang", "en")
        .child(DomNode::element("body").child(DomNode::element("p").child(DomNode::text(EN))));
    RenderedPage::new("https://example.com/", dom)
}

fn language_verdicts(report: &Report) -> Vec<LanguageVerdict> {
    report.language_findings().map(|l| l.verdict).collect()
}

#[test]
fn white_on_black_input_passes() {
    let report = auditor().analyze(&solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input));
    let findings: Vec<_> = report.contrast_findings().collect();
    assert_eq!(findings.len(), 1);
    let f = findings[0];
    assert!((f.ratio - 21.0).abs() < 1e-9);
    assert_eq!(f.required_ratio, 3.0);
    assert_eq!(f.verdict, ContrastVerdict::Pass);
    assert_eq!(f.criterion, "1.4.11");
}

#[test]
fn grey_on_grey_submit_fails() {
    let report = auditor().analyze(&solid_page(
        Rgb::from_hex("#777777").unwrap(),
        Rgb::from_hex("#888888").unwrap(),
        ElementKind::Submit,
    ));
    let f = report.contrast_findings().next().unwrap();
    // (L(#888888) + 0.05) / (L(#777777) + 0.05) = 1.26325...
    assert!((f.ratio - 1.2633).abs() < 1e-3, "ratio was {}", f.ratio);
    assert_eq!(f.verdict, ContrastVerdict::Fail);
    assert!(report.has_failures());
    assert_eq!(report.summary().fail, 1);
}

#[test]
fn empty_box_is_skipped_and_others_still_analyzed() {
    let page = solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input)
        .with_element(ElementGeometry::new("zero", ElementKind::Submit, BoundingBox::new(5, 5, 0, 10)));
    let report = auditor().analyze(&page);

    let ids: Vec<_> = report.contrast_findings().map(|f| f.element_id.as_str()).collect();
    assert_eq!(ids, vec!["el"]);
    let note = report
        .notes()
        .iter()
        .find(|n| n.kind == NoteKind::ElementSkipped)
        .expect("skip note");
    assert_eq!(note.subject.as_deref(), Some("zero"));
}

#[test]
fn missing_focused_screenshot_is_skipped() {
    let page = solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input)
        .with_element(ElementGeometry::new("el", ElementKind::Input, button_box()).in_state(RenderState::Focused));
    let report = auditor().analyze(&page);
    assert_eq!(report.contrast_findings().count(), 1);
    assert!(report.notes().iter().any(|n| n.kind == NoteKind::ElementSkipped));
}

#[test]
fn coverage_boundary_downgrades_to_warning() {
    // Vertical black/white stripes: the background splits exactly 50/50.
    let mut shot = Screenshot::filled(100, 60, Rgb::WHITE);
    for x in (0..100).step_by(2) {
        shot.fill_rect(x, 0, 1, 60, Rgb::BLACK);
    }
    shot.fill_rect(20, 20, 40, 16, Rgb::WHITE);
    let page = RenderedPage::new("https://example.com/", DomNode::element("html"))
        .with_screenshot(RenderState::Default, shot)
        .with_element(ElementGeometry::new("el", ElementKind::Submit, button_box()));

    let at = AuditConfig {
        min_coverage: 0.5,
        ..Default::default()
    };
    let report = Auditor::new(at).unwrap().analyze(&page);
    let f = report.contrast_findings().next().unwrap();
    assert_eq!(f.background.coverage, 0.5);
    assert!(f.background.low_confidence);
    assert_eq!(f.verdict, ContrastVerdict::Warning);

    let above = AuditConfig {
        min_coverage: 0.45,
        ..Default::default()
    };
    let report = Auditor::new(above).unwrap().analyze(&page);
    let f = report.contrast_findings().next().unwrap();
    assert!(!f.background.low_confidence);
    assert_eq!(f.background.rgb, Rgb::BLACK);
    assert_eq!(f.verdict, ContrastVerdict::Pass);
}

#[test]
fn duplicate_elements_are_reported_once() {
    let page = solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input)
        .with_element(ElementGeometry::new("el", ElementKind::Input, button_box()));
    let report = auditor().analyze(&page);
    assert_eq!(report.contrast_findings().count(), 1);
    assert!(report
        .notes()
        .iter()
        .any(|n| n.kind == NoteKind::DuplicateFinding && n.subject.as_deref() == Some("el@default")));
}

#[test]
fn confident_declared_language_passes() {
    let classifier = RecordedClassifier::new().record(EN, vec![Detection::new("en", 0.95)]);
    let report = Auditor::new(AuditConfig::default())
        .unwrap()
        .with_classifier(Arc::new(classifier))
        .analyze(&english_page());

    assert_eq!(language_verdicts(&report), vec![LanguageVerdict::Pass, LanguageVerdict::Pass]);
    let criteria: Vec<_> = report.language_findings().map(|l| l.criterion).collect();
    assert_eq!(criteria, vec!["3.1.1", "3.1.2"]);
}

#[test]
fn reliable_mismatch_is_an_error() {
    let classifier = RecordedClassifier::new().record(EN, vec![Detection::new("fr", 0.9)]);
    let report = rfaudit::analyze(&english_page(), Arc::new(classifier));
    assert_eq!(language_verdicts(&report), vec![LanguageVerdict::Error, LanguageVerdict::Error]);
    assert!(report.has_failures());
}

#[test]
fn unsure_mismatch_is_a_warning() {
    let classifier = RecordedClassifier::new().record(EN, vec![Detection::new("fr", 0.4)]);
    let report = rfaudit::analyze(&english_page(), Arc::new(classifier));
    assert_eq!(language_verdicts(&report), vec![LanguageVerdict::Warning, LanguageVerdict::Warning]);
    assert!(!report.has_failures());
}

#[test]
fn parts_and_attributes_use_their_own_declarations() {
    let dom = DomNode::element("html").attr("lang", "en").child(
        DomNode::element("body")
            .child(DomNode::element("p").child(DomNode::text(EN)))
            .child(DomNode::element("p").attr("lang", "fr").child(DomNode::text(FR)))
            .child(DomNode::element("img").attr("alt", NL)),
    );
    let page = RenderedPage::new("https://example.com/", dom);
    let classifier = RecordedClassifier::new()
        .record(EN, vec![Detection::new("en", 0.95)])
        .record(FR, vec![Detection::new("fr-FR", 0.92)])
        .record(NL, vec![Detection::new("nl", 0.85), Detection::new("de", 0.1)]);
    let report = rfaudit::analyze(&page, Arc::new(classifier));

    let rows: Vec<_> = report
        .language_findings()
        .map(|l| (l.dom_path.as_str(), l.declared_language.as_deref(), l.verdict))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("/html[1]", Some("en"), LanguageVerdict::Pass),
            ("/html[1]/body[1]/p[1]/text()[1]", Some("en"), LanguageVerdict::Pass),
            ("/html[1]/body[1]/p[2]/text()[1]", Some("fr"), LanguageVerdict::Pass),
            ("/html[1]/body[1]/img[1]/@alt", Some("en"), LanguageVerdict::Error),
        ]
    );
}

#[test]
fn missing_declaration_is_reported() {
    let dom = DomNode::element("html").child(DomNode::element("body").child(DomNode::text(EN)));
    let classifier = RecordedClassifier::new().record(EN, vec![Detection::new("en", 0.99)]);
    let report = rfaudit::analyze(&RenderedPage::new("https://example.com/", dom), Arc::new(classifier));
    assert!(language_verdicts(&report)
        .iter()
        .all(|v| *v == LanguageVerdict::MissingDeclaration));
    assert_eq!(report.summary().missing_declaration, 2);
    assert!(!report.has_failures());
}

#[test]
fn classifier_failure_keeps_contrast_findings() {
    let broken = FnClassifier(|_: &str| -> rfaudit::Result<Vec<Detection>> {
        Err(Error::ClassifierUnavailable("model not loaded".to_string()))
    });
    let mut page = solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input);
    page.dom = english_page().dom;

    let report = Auditor::new(AuditConfig::default())
        .unwrap()
        .with_classifier(Arc::new(broken))
        .analyze(&page);
    assert_eq!(report.contrast_findings().count(), 1);
    assert_eq!(report.language_findings().count(), 0);
    let note = report
        .notes()
        .iter()
        .find(|n| n.kind == NoteKind::ClassifierUnavailable)
        .unwrap();
    assert!(note.message.contains("model not loaded"));
}

#[test]
fn no_classifier_omits_language_branch() {
    let report = Auditor::new(AuditConfig::default()).unwrap().analyze(&english_page());
    assert_eq!(report.findings().len(), 0);
    assert!(report.notes().iter().any(|n| n.kind == NoteKind::ClassifierUnavailable));
}

#[test]
fn batched_classification_matches_per_node() {
    let classifier: Arc<dyn LanguageClassifier> =
        Arc::new(RecordedClassifier::new().record(EN, vec![Detection::new("en", 0.95)]));
    let per_node = Auditor::new(AuditConfig::default())
        .unwrap()
        .with_classifier(Arc::clone(&classifier))
        .analyze(&english_page());
    let batched = Auditor::new(AuditConfig {
        classifier_batch_size: 1,
        ..Default::default()
    })
    .unwrap()
    .with_classifier(classifier)
    .analyze(&english_page());
    assert_eq!(per_node, batched);
}

#[test]
fn analysis_is_idempotent() {
    let mut page = solid_page(Rgb(0x1a, 0x73, 0xe8), Rgb::WHITE, ElementKind::Submit);
    page.dom = english_page().dom;
    let classifier = Arc::new(RecordedClassifier::new().record(EN, vec![Detection::new("en", 0.95)]));
    let auditor = Auditor::new(AuditConfig::default()).unwrap().with_classifier(classifier);

    let first = auditor.analyze(&page);
    let second = auditor.analyze(&page);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert_eq!(first.digest().unwrap().len(), 64);
}

#[test]
fn json_report_is_a_flat_tagged_list() {
    let mut page = solid_page(Rgb::WHITE, Rgb::BLACK, ElementKind::Input);
    page.dom = english_page().dom;
    let classifier = Arc::new(RecordedClassifier::new().record(EN, vec![Detection::new("en", 0.95)]));
    let report = rfaudit::analyze(&page, classifier);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let kinds: Vec<_> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["contrast", "language", "language"]);
    assert_eq!(json["findings"][0]["verdict"], "pass");
    assert_eq!(json["findings"][0]["element_kind"], "input");
}
