//! Text node extraction for the language checks (WCAG 3.1.1 / 3.1.2)
//!
//! Walks the DOM text tree in document order and produces:
//! - one page-level node joining every run that inherits the root `lang`
//!   (3.1.1, Language of Page),
//! - one node per leaf text run (3.1.2, Language of Parts),
//! - one node per element whose short inline runs only reach the minimum
//!   length together (`<p>Welcome <em>chez nous</em> ...</p>`),
//! - one node per hidden attribute value (`alt`, `aria-label`, `title`,
//!   `value`) long enough to classify.
//!
//! Runs that are too short for a reliable guess are reported as skipped.

use crate::dom::DomNode;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const WCAG_LANGUAGE_OF_PAGE: &str = "3.1.1";
pub const WCAG_LANGUAGE_OF_PARTS: &str = "3.1.2";

const HIDDEN_ATTRIBUTES: [&str; 4] = ["alt", "aria-label", "title", "value"];
const NON_CONTENT: [&str; 5] = ["head", "script", "style", "noscript", "template"];

/// Where a text node's content came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Page,
    Text,
    /// Short inline runs of one element joined together
    Element,
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    pub id: String,
    /// Cleaned content handed to the classifier
    pub text: String,
    pub declared_language: Option<String>,
    pub dom_path: String,
    pub source: TextSource,
}

impl TextNode {
    pub fn criterion(&self) -> &'static str {
        match self.source {
            TextSource::Page => WCAG_LANGUAGE_OF_PAGE,
            _ => WCAG_LANGUAGE_OF_PARTS,
        }
    }
}

/// A run that was seen but not evaluated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedText {
    pub dom_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub nodes: Vec<TextNode>,
    pub skipped: Vec<SkippedText>,
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(https?://|www)[-_.?&~;+=/#0-9A-Za-z]+").expect("valid regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[-_.0-9A-Za-z]{1,64}@[-_0-9A-Za-z]+[-_.0-9A-Za-z]*").expect("valid regex")
    })
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[^\d\W]+\b").expect("valid regex"))
}

/// Strip URLs and email addresses, keep only word tokens
pub fn clean_text(text: &str) -> String {
    let text = url_regex().replace_all(text, "");
    let text = email_regex().replace_all(&text, "");
    word_regex()
        .find_iter(&text)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn count_words(text: &str) -> usize {
    clean_text(text).split_whitespace().count()
}

#[derive(Debug, Clone)]
pub struct TextNodeExtractor {
    pub min_chars: usize,
    pub min_words: usize,
    pub min_attribute_words: usize,
    pub check_attributes: bool,
}

impl Default for TextNodeExtractor {
    fn default() -> Self {
        Self {
            min_chars: 20,
            min_words: 5,
            min_attribute_words: 3,
            check_attributes: true,
        }
    }
}

struct Walk {
    out: Extraction,
    page_parts: Vec<String>,
    next_id: usize,
    root_path: String,
}

impl TextNodeExtractor {
    pub fn extract(&self, root: &DomNode) -> Extraction {
        let root_lang = declared_lang(root).flatten();
        let root_path = match root.tag() {
            Some(tag) => format!("/{}[1]", tag),
            None => String::new(),
        };
        let mut walk = Walk {
            out: Extraction::default(),
            page_parts: Vec::new(),
            next_id: 1,
            root_path: root_path.clone(),
        };
        self.walk(root, &root_path, root_lang.as_deref(), true, &mut walk);

        let page_text = clean_text(&walk.page_parts.join(" "));
        let page_path = if root_path.is_empty() { "/".to_string() } else { root_path };
        let page = match self.too_short(&page_text, self.min_words, self.min_chars) {
            Some(reason) => {
                walk.out.skipped.insert(0, SkippedText { dom_path: page_path, reason });
                None
            }
            None => Some(TextNode {
                id: "page".to_string(),
                text: page_text,
                declared_language: root_lang,
                dom_path: page_path,
                source: TextSource::Page,
            }),
        };
        if let Some(page) = page {
            walk.out.nodes.insert(0, page);
        }
        walk.out
    }

    fn too_short(&self, cleaned: &str, min_words: usize, min_chars: usize) -> Option<String> {
        let chars = cleaned.chars().count();
        let words = cleaned.split_whitespace().count();
        if words < min_words {
            Some(format!("{} word(s), at least {} needed", words, min_words))
        } else if chars < min_chars {
            Some(format!("{} character(s), at least {} needed", chars, min_chars))
        } else {
            None
        }
    }

    fn walk(&self, node: &DomNode, path: &str, lang: Option<&str>, root_scope: bool, w: &mut Walk) -> Fragment {
        if self.check_attributes {
            for name in HIDDEN_ATTRIBUTES {
                let Some(value) = node.get_attr(name) else { continue };
                if value.trim().is_empty() {
                    continue;
                }
                let attr_path = format!("{}/@{}", path, name);
                let cleaned = clean_text(value);
                match self.too_short(&cleaned, self.min_attribute_words, 0) {
                    Some(reason) => w.out.skipped.push(SkippedText { dom_path: attr_path, reason }),
                    None => w.push(cleaned, lang, attr_path, TextSource::Attribute(name.to_string())),
                }
            }
        }

        let mut fragment = Fragment::default();
        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        let mut text_count = 0usize;
        for child in node.children() {
            match child {
                DomNode::Text { text } => {
                    text_count += 1;
                    if text.trim().is_empty() {
                        continue;
                    }
                    let text_path = format!("{}/text()[{}]", path, text_count);
                    if root_scope {
                        w.page_parts.push(text.trim().to_string());
                    }
                    let cleaned = clean_text(text);
                    match self.too_short(&cleaned, self.min_words, self.min_chars) {
                        Some(reason) => {
                            w.out.skipped.push(SkippedText { dom_path: text_path, reason });
                            fragment.add(&cleaned, 1);
                        }
                        None => w.push(cleaned, lang, text_path, TextSource::Text),
                    }
                }
                DomNode::Element { tag, .. } => {
                    let n = tag_counts.entry(tag.as_str()).or_insert(0);
                    *n += 1;
                    if NON_CONTENT.contains(&tag.as_str()) {
                        continue;
                    }
                    let child_path = format!("{}/{}[{}]", path, tag, n);
                    match declared_lang(child) {
                        Some(own) => {
                            self.walk(child, &child_path, own.as_deref(), false, w);
                        }
                        None => {
                            let inner = self.walk(child, &child_path, lang, root_scope, w);
                            if count_words(&inner.text) < self.min_words {
                                fragment.add(&inner.text, inner.pieces);
                            }
                        }
                    }
                }
            }
        }

        // Inline fragments (`Welcome <em>chez nous</em> ...`) are judged together
        // on the element that holds them. The root is covered by the page node.
        if fragment.pieces > 1
            && path != w.root_path
            && self.too_short(&fragment.text, self.min_words, self.min_chars).is_none()
        {
            w.push(fragment.text.clone(), lang, path.to_string(), TextSource::Element);
        }
        fragment
    }
}

/// Short text collected under one element, in document order
#[derive(Debug, Default)]
struct Fragment {
    text: String,
    pieces: usize,
}

impl Fragment {
    fn add(&mut self, cleaned: &str, pieces: usize) {
        if cleaned.is_empty() || pieces == 0 {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(cleaned);
        self.pieces += pieces;
    }
}

impl Walk {
    fn push(&mut self, text: String, lang: Option<&str>, dom_path: String, source: TextSource) {
        let id = format!("text-{}", self.next_id);
        self.next_id += 1;
        self.out.nodes.push(TextNode {
            id,
            text,
            declared_language: lang.map(str::to_string),
            dom_path,
            source,
        });
    }
}

/// `Some(Some(code))` when the element declares a language, `Some(None)`
/// when it declares an empty one (which resets inheritance), `None` when it
/// says nothing.
fn declared_lang(node: &DomNode) -> Option<Option<String>> {
    let raw = node.get_attr("lang").or_else(|| node.get_attr("xml:lang"))?;
    let raw = raw.trim();
    if raw.len() < 2 {
        Some(None)
    } else {
        Some(Some(raw.to_string()))
    }
}
