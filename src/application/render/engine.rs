//! Two-pass math substitution.
//!
//! Display spans are replaced first. The inline pass then runs over the text
//! left between display spans only, so markup produced by the first pass (or
//! the notation it kept after a failure) is never scanned again.

use tracing::debug;

use super::renderer::ExpressionRenderer;
use super::scan::{DisplaySpans, InlineSpans};
use super::types::{Substitution, Typesetter};

enum Piece<'t> {
    Source(&'t str),
    Rendered(String),
}

/// Replace every `\[ … \]` and `$ … $` span in `text` with the output of
/// `typesetter`.
///
/// Text outside of matched spans is copied verbatim and in order. Individual
/// rendering failures are absorbed by the renderer; this function itself
/// cannot fail.
pub fn substitute<T: Typesetter + ?Sized>(text: &str, typesetter: &T) -> Substitution {
    let mut renderer = ExpressionRenderer::new(typesetter);

    let pieces = display_pass(text, &mut renderer);

    let mut output = String::with_capacity(text.len());
    for piece in pieces {
        match piece {
            Piece::Source(segment) => inline_pass(segment, &mut renderer, &mut output),
            Piece::Rendered(html) => output.push_str(&html),
        }
    }

    let tally = renderer.into_tally();
    debug!(
        target = "application::render::engine",
        succeeded = tally.succeeded,
        failed = tally.failed,
        "math substitution finished"
    );

    Substitution {
        text: output,
        tally,
    }
}

fn display_pass<'t, T: Typesetter + ?Sized>(
    text: &'t str,
    renderer: &mut ExpressionRenderer<'_, T>,
) -> Vec<Piece<'t>> {
    let mut pieces = Vec::new();
    let mut cursor = 0;

    for span in DisplaySpans::new(text) {
        if span.start > cursor {
            pieces.push(Piece::Source(&text[cursor..span.start]));
        }
        pieces.push(Piece::Rendered(renderer.render_span(&span)));
        cursor = span.end;
    }

    if cursor < text.len() {
        pieces.push(Piece::Source(&text[cursor..]));
    }

    pieces
}

fn inline_pass<T: Typesetter + ?Sized>(
    segment: &str,
    renderer: &mut ExpressionRenderer<'_, T>,
    output: &mut String,
) {
    let mut cursor = 0;

    for span in InlineSpans::new(segment) {
        output.push_str(&segment[cursor..span.start]);
        output.push_str(&renderer.render_span(&span));
        cursor = span.end;
    }

    output.push_str(&segment[cursor..]);
}
