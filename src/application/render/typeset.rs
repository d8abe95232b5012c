use std::{collections::BTreeMap, str::FromStr};

use katex::{Opts, OptsBuilder, OutputType};
use thiserror::Error;

use super::types::{MathMode, TypesetError, Typesetter};

/// Markup flavour KaTeX should emit. Vector-graphic output is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupOutput {
    #[default]
    Html,
    HtmlAndMathml,
    Mathml,
}

impl MarkupOutput {
    fn output_type(self) -> OutputType {
        match self {
            MarkupOutput::Html => OutputType::Html,
            MarkupOutput::HtmlAndMathml => OutputType::HtmlAndMathml,
            MarkupOutput::Mathml => OutputType::Mathml,
        }
    }
}

impl FromStr for MarkupOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "html" => Ok(MarkupOutput::Html),
            "html_and_mathml" | "htmlandmathml" => Ok(MarkupOutput::HtmlAndMathml),
            "mathml" => Ok(MarkupOutput::Mathml),
            other => Err(format!(
                "unknown output `{other}`, expected html, html_and_mathml or mathml"
            )),
        }
    }
}

/// KaTeX options shared by display and inline rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct KatexOptions {
    pub output: MarkupOutput,
    pub throw_on_error: bool,
    pub trust: bool,
    pub leqno: bool,
    pub fleqn: bool,
    pub error_color: Option<String>,
    pub macros: BTreeMap<String, String>,
}

impl Default for KatexOptions {
    fn default() -> Self {
        Self {
            output: MarkupOutput::Html,
            throw_on_error: false,
            trust: true,
            leqno: false,
            fleqn: false,
            error_color: None,
            macros: BTreeMap::new(),
        }
    }
}

impl From<&crate::config::KatexSettings> for KatexOptions {
    fn from(settings: &crate::config::KatexSettings) -> Self {
        Self {
            output: settings.output,
            throw_on_error: settings.throw_on_error,
            trust: settings.trust,
            leqno: settings.leqno,
            fleqn: settings.fleqn,
            error_color: settings.error_color.clone(),
            macros: settings.macros.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum KatexConfigError {
    #[error("failed to build KaTeX options: {0}")]
    Options(String),
}

/// [`Typesetter`] backed by the embedded KaTeX engine.
pub struct KatexTypesetter {
    display: Opts,
    inline: Opts,
}

impl KatexTypesetter {
    pub fn new(options: &KatexOptions) -> Result<Self, KatexConfigError> {
        Ok(Self {
            display: build_opts(options, true)?,
            inline: build_opts(options, false)?,
        })
    }

    fn opts(&self, mode: MathMode) -> &Opts {
        match mode {
            MathMode::Display => &self.display,
            MathMode::Inline => &self.inline,
        }
    }
}

impl Typesetter for KatexTypesetter {
    fn typeset(&self, expression: &str, mode: MathMode) -> Result<String, TypesetError> {
        katex::render_with_opts(expression, self.opts(mode))
            .map_err(|err| TypesetError::new(format!("KaTeX rendering failed: {err}")))
    }
}

fn build_opts(options: &KatexOptions, display_mode: bool) -> Result<Opts, KatexConfigError> {
    let mut builder = OptsBuilder::default();
    builder.display_mode(display_mode);
    builder.output_type(options.output.output_type());
    builder.throw_on_error(options.throw_on_error);
    builder.trust(options.trust);
    builder.leqno(options.leqno);
    builder.fleqn(options.fleqn);
    if let Some(color) = options.error_color.as_ref() {
        builder.error_color(color.clone());
    }

    let mut opts = builder
        .build()
        .map_err(|err| KatexConfigError::Options(err.to_string()))?;

    for (name, expansion) in &options.macros {
        opts.add_macro(name.clone(), expansion.clone());
    }

    Ok(opts)
}
