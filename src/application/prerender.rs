//! Document-level pipeline: disable client rendering, then substitute math.
//!
//! Math is only looked for outside `<script>` and `<style>` elements. Their
//! contents are code, where `$` and `\[` are ordinary characters.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::{
    client::{ClientNeutralizer, NeutralizeError, NeutralizeReport},
    render::{RenderTally, Typesetter, substitute},
};

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Error)]
pub enum PrerenderError {
    #[error(transparent)]
    Neutralize(#[from] NeutralizeError),
}

/// Result of pre-rendering one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerenderOutput {
    #[serde(skip)]
    pub html: String,
    pub tally: RenderTally,
    pub client: NeutralizeReport,
}

pub struct Prerenderer<T: Typesetter> {
    typesetter: T,
    neutralizer: Option<ClientNeutralizer>,
}

impl<T: Typesetter> Prerenderer<T> {
    pub fn new(typesetter: T, neutralizer: Option<ClientNeutralizer>) -> Self {
        Self {
            typesetter,
            neutralizer,
        }
    }

    /// Pre-render a whole document.
    ///
    /// Client scripts are neutralized first. Script and style elements are
    /// then copied through unchanged and the text between them is
    /// substituted.
    pub fn prerender(&self, document: &str) -> Result<PrerenderOutput, PrerenderError> {
        let (neutralized, client) = match self.neutralizer.as_ref() {
            Some(neutralizer) => neutralizer.neutralize(document)?,
            None => (document.to_string(), NeutralizeReport::default()),
        };

        if !client.is_empty() {
            debug!(
                target = "application::prerender",
                scripts_removed = client.scripts_removed,
                handlers_removed = client.handlers_removed,
                calls_voided = client.calls_voided,
                "client-side math rendering disabled"
            );
        }

        let mut html = String::with_capacity(neutralized.len());
        let mut tally = RenderTally::default();
        let mut cursor = 0;
        for (start, end) in raw_text_regions(&neutralized) {
            self.substitute_into(&neutralized[cursor..start], &mut html, &mut tally);
            html.push_str(&neutralized[start..end]);
            cursor = end;
        }
        self.substitute_into(&neutralized[cursor..], &mut html, &mut tally);

        Ok(PrerenderOutput {
            html,
            tally,
            client,
        })
    }

    fn substitute_into(&self, segment: &str, html: &mut String, tally: &mut RenderTally) {
        if segment.is_empty() {
            return;
        }
        let substitution = substitute(segment, &self.typesetter);
        html.push_str(&substitution.text);
        tally.absorb(substitution.tally);
    }
}

/// Byte ranges of `<script>` and `<style>` elements, tags included.
///
/// An element without a closing tag runs to the end of the document.
fn raw_text_regions(html: &str) -> Vec<(usize, usize)> {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut regions = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find('<') {
        let start = cursor + offset;
        cursor = start + 1;

        let Some(name) = RAW_TEXT_ELEMENTS.iter().find(|name| {
            lower[start + 1..].starts_with(**name)
                && matches!(
                    bytes.get(start + 1 + name.len()),
                    Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
                )
        }) else {
            continue;
        };

        let closing = format!("</{name}");
        let end = match lower[start..].find(&closing) {
            Some(relative) => {
                let close_start = start + relative;
                lower[close_start..]
                    .find('>')
                    .map_or(lower.len(), |gt| close_start + gt + 1)
            }
            None => lower.len(),
        };
        regions.push((start, end));
        cursor = end;
    }

    regions
}
