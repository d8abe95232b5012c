//! Linear delimiter scanners.
//!
//! Both scanners walk the input once, left to right, and yield spans that do
//! not overlap. Neither builds a markup tree; they see the document as plain
//! text.

use super::types::{MathMode, MathSpan};

const DISPLAY_OPEN: &str = "\\[";
const DISPLAY_CLOSE: &str = "\\]";

/// Iterator over `\[ … \]` spans.
///
/// A span ends at the first `\]` after its opening delimiter, so display
/// spans never nest. An opening `\[` without a closing `\]` ends the scan.
pub struct DisplaySpans<'t> {
    text: &'t str,
    cursor: usize,
}

impl<'t> DisplaySpans<'t> {
    pub fn new(text: &'t str) -> Self {
        Self { text, cursor: 0 }
    }
}

impl<'t> Iterator for DisplaySpans<'t> {
    type Item = MathSpan<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.text.get(self.cursor..)?;
        let start = self.cursor + rest.find(DISPLAY_OPEN)?;
        let interior_start = start + DISPLAY_OPEN.len();
        let Some(offset) = self.text[interior_start..].find(DISPLAY_CLOSE) else {
            self.cursor = self.text.len();
            return None;
        };
        let interior_end = interior_start + offset;
        let end = interior_end + DISPLAY_CLOSE.len();
        self.cursor = end;

        Some(MathSpan {
            mode: MathMode::Display,
            start,
            end,
            source: &self.text[start..end],
            interior: &self.text[interior_start..interior_end],
        })
    }
}

/// How a single `$` participates in inline delimiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dollar {
    /// May open or close an inline span.
    Plain,
    /// Immediately preceded by a backslash.
    Escaped,
    /// Immediately followed by another `$`.
    Doubled,
}

fn classify(bytes: &[u8], index: usize) -> Dollar {
    let previous = index.checked_sub(1).map(|i| bytes[i]);
    let next = bytes.get(index + 1).copied();

    if next == Some(b'$') {
        Dollar::Doubled
    } else if previous == Some(b'\\') {
        Dollar::Escaped
    } else {
        Dollar::Plain
    }
}

/// Iterator over `$ … $` spans.
///
/// Only plain dollars delimit. The interior of a span never contains a `$`:
/// an opening dollar pairs with the nearest following `$`, and if that one is
/// escaped or doubled the opener is abandoned and scanning resumes after it.
pub struct InlineSpans<'t> {
    text: &'t str,
    cursor: usize,
}

impl<'t> InlineSpans<'t> {
    pub fn new(text: &'t str) -> Self {
        Self { text, cursor: 0 }
    }

    fn next_dollar(&mut self) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let found = bytes
            .get(self.cursor..)?
            .iter()
            .position(|&byte| byte == b'$')?;
        let index = self.cursor + found;
        self.cursor = index + 1;
        Some(index)
    }
}

impl<'t> Iterator for InlineSpans<'t> {
    type Item = MathSpan<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        let mut open: Option<usize> = None;

        while let Some(index) = self.next_dollar() {
            let kind = classify(bytes, index);
            match (open, kind) {
                (None, Dollar::Plain) => open = Some(index),
                (None, _) => {}
                (Some(start), Dollar::Plain) => {
                    let end = index + 1;
                    return Some(MathSpan {
                        mode: MathMode::Inline,
                        start,
                        end,
                        source: &self.text[start..end],
                        interior: &self.text[start + 1..index],
                    });
                }
                (Some(_), _) => open = None,
            }
        }

        None
    }
}
