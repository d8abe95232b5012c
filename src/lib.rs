//! Pre-renders LaTeX math in HTML documents.
//!
//! Display math (`\[...\]`) and inline math (`$...$`) are replaced with
//! typeset markup. Anything the typesetter rejects stays in the document as
//! its original notation.

pub mod application;
pub mod config;
pub mod infra;
