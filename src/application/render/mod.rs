//! Math rendering: delimiter scanning, the expression renderer, and the
//! two-pass substitution engine.
//!
//! The engine is pure with respect to its input: it takes document text and
//! a typesetter, and returns new text plus the success/failure tally for
//! that call. Nothing is kept between calls.

mod engine;
mod renderer;
mod scan;
mod typeset;
mod types;

pub use engine::substitute;
pub use renderer::ExpressionRenderer;
pub use scan::{DisplaySpans, InlineSpans};
pub use typeset::{KatexConfigError, KatexOptions, KatexTypesetter, MarkupOutput};
pub use types::{MathMode, MathSpan, RenderTally, Substitution, TypesetError, Typesetter};

pub(crate) use renderer::RENDER_TOTAL_METRIC;
