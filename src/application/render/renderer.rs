use metrics::counter;
use tracing::warn;

use super::types::{MathMode, MathSpan, RenderTally, Typesetter};

pub(crate) const RENDER_TOTAL_METRIC: &str = "texbake_math_render_total";

/// Wraps a [`Typesetter`] and keeps the success/failure tally for one run.
///
/// Rendering never fails from the caller's point of view: when the
/// typesetter rejects an expression, the original notation is returned so
/// the document keeps its pre-render appearance.
pub struct ExpressionRenderer<'a, T: Typesetter + ?Sized> {
    typesetter: &'a T,
    tally: RenderTally,
}

impl<'a, T: Typesetter + ?Sized> ExpressionRenderer<'a, T> {
    pub fn new(typesetter: &'a T) -> Self {
        Self {
            typesetter,
            tally: RenderTally::default(),
        }
    }

    /// Render an already-trimmed expression. On failure the expression comes
    /// back wrapped in the delimiters of `mode`.
    pub fn render(&mut self, expression: &str, mode: MathMode) -> String {
        self.render_or_else(expression, mode, || mode.wrap(expression))
    }

    /// Render a scanned span. On failure the span's source text is returned
    /// unchanged, whitespace included.
    pub fn render_span(&mut self, span: &MathSpan<'_>) -> String {
        self.render_or_else(span.expression(), span.mode, || span.source.to_owned())
    }

    pub fn tally(&self) -> RenderTally {
        self.tally
    }

    pub fn into_tally(self) -> RenderTally {
        self.tally
    }

    fn render_or_else(
        &mut self,
        expression: &str,
        mode: MathMode,
        fallback: impl FnOnce() -> String,
    ) -> String {
        match self.typesetter.typeset(expression, mode) {
            Ok(html) => {
                self.tally.succeeded = self.tally.succeeded.saturating_add(1);
                counter!(RENDER_TOTAL_METRIC, "mode" => mode.as_str(), "outcome" => "rendered")
                    .increment(1);
                html
            }
            Err(err) => {
                self.tally.failed = self.tally.failed.saturating_add(1);
                counter!(RENDER_TOTAL_METRIC, "mode" => mode.as_str(), "outcome" => "failed")
                    .increment(1);
                warn!(
                    target = "application::render::math",
                    %mode,
                    expression,
                    error = %err,
                    "math rendering failed; keeping original notation"
                );
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::scan::DisplaySpans;
    use crate::application::render::types::TypesetError;

    fn bracket(expression: &str, mode: MathMode) -> Result<String, TypesetError> {
        Ok(format!("<{mode}>{expression}</{mode}>"))
    }

    fn reject(expression: &str, _mode: MathMode) -> Result<String, TypesetError> {
        Err(TypesetError::new(format!("cannot parse `{expression}`")))
    }

    #[test]
    fn success_returns_markup_and_counts() {
        let mut renderer = ExpressionRenderer::new(&bracket);
        assert_eq!(renderer.render("x", MathMode::Inline), "<inline>x</inline>");
        assert_eq!(
            renderer.render("y", MathMode::Display),
            "<display>y</display>"
        );
        assert_eq!(
            renderer.tally(),
            RenderTally {
                succeeded: 2,
                failed: 0
            }
        );
    }

    #[test]
    fn failure_rewraps_in_source_delimiters() {
        let mut renderer = ExpressionRenderer::new(&reject);
        assert_eq!(renderer.render("\\frac{", MathMode::Display), "\\[\\frac{\\]");
        assert_eq!(renderer.render("\\frac{", MathMode::Inline), "$\\frac{$");
        assert_eq!(
            renderer.into_tally(),
            RenderTally {
                succeeded: 0,
                failed: 2
            }
        );
    }

    #[test]
    fn span_failure_keeps_untrimmed_source() {
        let text = "\\[  \\oops  \\]";
        let span = DisplaySpans::new(text).next().expect("span");
        let mut renderer = ExpressionRenderer::new(&reject);
        assert_eq!(renderer.render_span(&span), text);
        assert_eq!(renderer.tally().failed, 1);
    }

    #[test]
    fn span_success_passes_trimmed_expression() {
        let span = DisplaySpans::new("\\[  x^2  \\]").next().expect("span");
        let mut renderer = ExpressionRenderer::new(&bracket);
        assert_eq!(renderer.render_span(&span), "<display>x^2</display>");
    }
}
