use thiserror::Error;

use crate::{
    application::{prerender::PrerenderError, render::KatexConfigError},
    config::LoadError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Katex(#[from] KatexConfigError),
    #[error("failed to prerender `{path}`: {source}")]
    Prerender {
        path: String,
        #[source]
        source: PrerenderError,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn prerender(path: impl Into<String>, source: PrerenderError) -> Self {
        Self::Prerender {
            path: path.into(),
            source,
        }
    }
}
