//! Application services layer.

pub mod batch;
pub mod client;
pub mod error;
pub mod prerender;
pub mod render;
