//! Disable client-side math rendering in documents that were rendered ahead
//! of time.
//!
//! The rewrite is streamed through `lol_html`; no document tree is built.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str, text};
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_SCRIPT_MARKERS: &[&str] = &["katex", "auto-render"];
pub const DEFAULT_RENDER_FUNCTIONS: &[&str] = &["renderMathInElement"];

/// Counts of what a neutralization pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NeutralizeReport {
    /// External `<script>` elements removed because their `src` matched a marker.
    pub scripts_removed: usize,
    /// `onload` handlers removed because they invoked a render function.
    pub handlers_removed: usize,
    /// Inline calls to a render function turned into `void` expressions.
    pub calls_voided: usize,
}

impl NeutralizeReport {
    pub fn is_empty(&self) -> bool {
        self.scripts_removed == 0 && self.handlers_removed == 0 && self.calls_voided == 0
    }

    pub fn absorb(&mut self, other: NeutralizeReport) {
        self.scripts_removed = self.scripts_removed.saturating_add(other.scripts_removed);
        self.handlers_removed = self.handlers_removed.saturating_add(other.handlers_removed);
        self.calls_voided = self.calls_voided.saturating_add(other.calls_voided);
    }
}

#[derive(Debug, Error)]
pub enum NeutralizeError {
    #[error("failed to rewrite client scripts: {message}")]
    Rewrite { message: String },
}

/// Removes or disables the scripts that would render math in the browser.
#[derive(Debug, Clone)]
pub struct ClientNeutralizer {
    script_markers: Vec<String>,
    render_functions: Vec<String>,
}

impl Default for ClientNeutralizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_SCRIPT_MARKERS.iter().map(|s| s.to_string()),
            DEFAULT_RENDER_FUNCTIONS.iter().map(|s| s.to_string()),
        )
    }
}

impl From<&crate::config::ClientSettings> for ClientNeutralizer {
    fn from(settings: &crate::config::ClientSettings) -> Self {
        Self::new(
            settings.script_markers.iter().cloned(),
            settings.render_functions.iter().cloned(),
        )
    }
}

impl ClientNeutralizer {
    pub fn new(
        script_markers: impl IntoIterator<Item = String>,
        render_functions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            script_markers: script_markers
                .into_iter()
                .map(|marker| marker.trim().to_ascii_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect(),
            render_functions: render_functions
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    pub fn neutralize(&self, html: &str) -> Result<(String, NeutralizeReport), NeutralizeError> {
        let this = Rc::new(self.clone());
        let report = Rc::new(RefCell::new(NeutralizeReport::default()));
        let script_body = Rc::new(RefCell::new(String::new()));

        let rewritten = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("script[src]", {
                        let this = Rc::clone(&this);
                        let report = Rc::clone(&report);
                        move |el| {
                            if let Some(src) = el.get_attribute("src")
                                && this.matches_marker(&src)
                            {
                                el.remove();
                                let mut report = report.borrow_mut();
                                report.scripts_removed = report.scripts_removed.saturating_add(1);
                            }
                            Ok(())
                        }
                    }),
                    element!("*[onload]", {
                        let this = Rc::clone(&this);
                        let report = Rc::clone(&report);
                        move |el| {
                            if let Some(handler) = el.get_attribute("onload")
                                && this.mentions_render_function(&handler)
                            {
                                el.remove_attribute("onload");
                                let mut report = report.borrow_mut();
                                report.handlers_removed = report.handlers_removed.saturating_add(1);
                            }
                            Ok(())
                        }
                    }),
                    text!("script", {
                        let this = Rc::clone(&this);
                        let report = Rc::clone(&report);
                        let script_body = Rc::clone(&script_body);
                        move |chunk| {
                            let mut body = script_body.borrow_mut();
                            body.push_str(chunk.as_str());
                            if !chunk.last_in_text_node() {
                                chunk.remove();
                                return Ok(());
                            }

                            let (voided, count) = this.void_calls(&body);
                            chunk.replace(&voided, ContentType::Html);
                            body.clear();
                            if count > 0 {
                                let mut report = report.borrow_mut();
                                report.calls_voided = report.calls_voided.saturating_add(count);
                            }
                            Ok(())
                        }
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| NeutralizeError::Rewrite {
            message: err.to_string(),
        })?;

        let report = *report.borrow();
        Ok((rewritten, report))
    }

    fn matches_marker(&self, src: &str) -> bool {
        let src = src.to_ascii_lowercase();
        self.script_markers
            .iter()
            .any(|marker| src.contains(marker.as_str()))
    }

    fn mentions_render_function(&self, code: &str) -> bool {
        self.render_functions
            .iter()
            .any(|name| find_call(code, name, 0).is_some())
    }

    /// Rewrite `name(` to `void (` for every configured render function.
    ///
    /// Member calls such as `window.name(` are left alone since replacing
    /// the callee there would not parse.
    fn void_calls(&self, code: &str) -> (String, usize) {
        let mut current = code.to_string();
        let mut count = 0;

        for name in &self.render_functions {
            let mut output = String::with_capacity(current.len());
            let mut cursor = 0;
            while let Some((start, open_paren)) = find_call(&current, name, cursor) {
                output.push_str(&current[cursor..start]);
                output.push_str("void ");
                cursor = open_paren;
                count += 1;
            }
            output.push_str(&current[cursor..]);
            current = output;
        }

        (current, count)
    }
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Locate the next bare call to `name` at or after `from`, returning the
/// offset of the name and of its opening parenthesis.
fn find_call(code: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = code.as_bytes();
    let mut search = from;

    while let Some(offset) = code.get(search..)?.find(name) {
        let start = search + offset;
        let after = start + name.len();
        search = after;

        let preceded_ok = start
            .checked_sub(1)
            .map(|i| !is_identifier_byte(bytes[i]) && bytes[i] != b'.')
            .unwrap_or(true);
        if !preceded_ok {
            continue;
        }
        if bytes.get(after).is_some_and(|&b| is_identifier_byte(b)) {
            continue;
        }

        let paren = after + code[after..].len() - code[after..].trim_start().len();
        if bytes.get(paren) == Some(&b'(') {
            return Some((start, paren));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTO_RENDER_HEAD: &str = r#"<head>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/katex.min.css">
<script defer src="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/katex.min.js"></script>
<script defer src="https://cdn.jsdelivr.net/npm/katex@0.16.9/dist/contrib/auto-render.min.js"
    onload="renderMathInElement(document.body);"></script>
<script src="/js/site.js"></script>
</head>"#;

    #[test]
    fn katex_scripts_are_removed_but_stylesheet_stays() {
        let (html, report) = ClientNeutralizer::default()
            .neutralize(AUTO_RENDER_HEAD)
            .expect("rewrite");

        assert!(html.contains("katex.min.css"));
        assert!(!html.contains("katex.min.js"));
        assert!(!html.contains("auto-render"));
        assert!(html.contains("/js/site.js"));
        assert_eq!(report.scripts_removed, 2);
    }

    #[test]
    fn onload_handler_is_dropped_from_kept_elements() {
        let input = r#"<body onload="renderMathInElement(document.body)"><p>x</p></body>"#;
        let (html, report) = ClientNeutralizer::default()
            .neutralize(input)
            .expect("rewrite");

        assert_eq!(html, "<body><p>x</p></body>");
        assert_eq!(report.handlers_removed, 1);
    }

    #[test]
    fn unrelated_onload_is_kept() {
        let input = r#"<img src="a.png" onload="fadeIn(this)">"#;
        let (html, report) = ClientNeutralizer::default()
            .neutralize(input)
            .expect("rewrite");

        assert_eq!(html, input);
        assert!(report.is_empty());
    }

    #[test]
    fn inline_calls_become_void_expressions() {
        let input = "<script>document.addEventListener(\"DOMContentLoaded\", function () {\n  renderMathInElement(document.body, { throwOnError: false });\n});</script>";
        let (html, report) = ClientNeutralizer::default()
            .neutralize(input)
            .expect("rewrite");

        assert!(html.contains("void (document.body, { throwOnError: false });"));
        assert!(!html.contains("renderMathInElement("));
        assert_eq!(report.calls_voided, 1);
    }

    #[test]
    fn member_calls_and_longer_identifiers_are_untouched() {
        let neutralizer = ClientNeutralizer::default();
        let code = "window.renderMathInElement(x); renderMathInElementLater(y);";
        let (voided, count) = neutralizer.void_calls(code);
        assert_eq!(voided, code);
        assert_eq!(count, 0);
    }

    #[test]
    fn call_with_space_before_paren_is_voided() {
        let neutralizer = ClientNeutralizer::default();
        let (voided, count) = neutralizer.void_calls("renderMathInElement (el)");
        assert_eq!(voided, "void (el)");
        assert_eq!(count, 1);
    }

    #[test]
    fn document_without_scripts_is_unchanged() {
        let input = "<p>\\[x\\] and $y$</p>";
        let (html, report) = ClientNeutralizer::default()
            .neutralize(input)
            .expect("rewrite");
        assert_eq!(html, input);
        assert!(report.is_empty());
    }

    #[test]
    fn custom_markers_are_case_insensitive() {
        let neutralizer = ClientNeutralizer::new(
            ["MathJax".to_string()],
            ["typesetMath".to_string()],
        );
        let input = r#"<script src="/vendor/mathjax/tex-chtml.js"></script><p>ok</p>"#;
        let (html, report) = neutralizer.neutralize(input).expect("rewrite");
        assert_eq!(html, "<p>ok</p>");
        assert_eq!(report.scripts_removed, 1);
    }
}
