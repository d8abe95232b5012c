use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Delimiter convention a math span was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MathMode {
    /// Block-level math written as `\[ … \]`.
    Display,
    /// Math embedded in running text, written as `$ … $`.
    Inline,
}

impl MathMode {
    pub fn opening(self) -> &'static str {
        match self {
            MathMode::Display => "\\[",
            MathMode::Inline => "$",
        }
    }

    pub fn closing(self) -> &'static str {
        match self {
            MathMode::Display => "\\]",
            MathMode::Inline => "$",
        }
    }

    /// Re-wrap an expression in the delimiters it was written with.
    pub fn wrap(self, expression: &str) -> String {
        let opening = self.opening();
        let closing = self.closing();
        let mut wrapped =
            String::with_capacity(opening.len() + expression.len() + closing.len());
        wrapped.push_str(opening);
        wrapped.push_str(expression);
        wrapped.push_str(closing);
        wrapped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MathMode::Display => "display",
            MathMode::Inline => "inline",
        }
    }
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delimiter-bound span located by one of the scanners.
///
/// `start..end` covers the delimiters as well as the interior, as byte
/// offsets into the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathSpan<'t> {
    pub mode: MathMode,
    pub start: usize,
    pub end: usize,
    /// Full span text including delimiters.
    pub source: &'t str,
    /// Raw text between the delimiters, untrimmed.
    pub interior: &'t str,
}

impl<'t> MathSpan<'t> {
    /// Expression text handed to the typesetter.
    pub fn expression(&self) -> &'t str {
        self.interior.trim()
    }
}

/// Success and failure totals for one substitution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl RenderTally {
    pub fn total(&self) -> usize {
        self.succeeded.saturating_add(self.failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn absorb(&mut self, other: RenderTally) {
        self.succeeded = self.succeeded.saturating_add(other.succeeded);
        self.failed = self.failed.saturating_add(other.failed);
    }
}

/// Text produced by a substitution run together with its tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub tally: RenderTally,
}

/// Failure reported by a typesetting collaborator for one expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypesetError {
    pub message: String,
}

impl TypesetError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External function that turns math notation into presentational markup.
///
/// Implementations must not panic on malformed input; failures are returned
/// as [`TypesetError`] and handled by the caller.
pub trait Typesetter {
    fn typeset(&self, expression: &str, mode: MathMode) -> Result<String, TypesetError>;
}

impl<F> Typesetter for F
where
    F: Fn(&str, MathMode) -> Result<String, TypesetError>,
{
    fn typeset(&self, expression: &str, mode: MathMode) -> Result<String, TypesetError> {
        self(expression, mode)
    }
}
