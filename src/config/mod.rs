//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{collections::BTreeMap, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::client::{DEFAULT_RENDER_FUNCTIONS, DEFAULT_SCRIPT_MARKERS};
use crate::application::render::MarkupOutput;
use crate::infra::documents::DEFAULT_EXTENSIONS;

pub use cli::{CheckArgs, CliArgs, Command, RenderArgs, RunOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "texbake";
const ENV_PREFIX: &str = "TEXBAKE";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub katex: KatexSettings,
    pub client: ClientSettings,
    pub documents: DocumentSettings,
    pub run: RunSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct KatexSettings {
    pub output: MarkupOutput,
    pub throw_on_error: bool,
    pub trust: bool,
    pub leqno: bool,
    pub fleqn: bool,
    pub error_color: Option<String>,
    /// Macro name (with leading backslash) → expansion.
    pub macros: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub enabled: bool,
    pub script_markers: Vec<String>,
    pub render_functions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub fail_on_error: bool,
    pub json_summary: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("client.script_markers")
            .with_list_parse_key("client.render_functions")
            .with_list_parse_key("documents.extensions"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_run_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    katex: RawKatexSettings,
    client: RawClientSettings,
    documents: RawDocumentSettings,
    run: RawRunSettings,
}

impl RawSettings {
    fn apply_run_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(trust) = overrides.katex_trust {
            self.katex.trust = Some(trust);
        }
        if let Some(throw_on_error) = overrides.katex_throw_on_error {
            self.katex.throw_on_error = Some(throw_on_error);
        }
        if let Some(output) = overrides.katex_output.as_ref() {
            self.katex.output = Some(output.clone());
        }
        if overrides.keep_client_scripts {
            self.client.enabled = Some(false);
        }
        if let Some(fail) = overrides.fail_on_error {
            self.run.fail_on_error = Some(fail);
        }
        if overrides.json {
            self.run.json_summary = Some(true);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            katex,
            client,
            documents,
            run,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            katex: build_katex_settings(katex)?,
            client: build_client_settings(client)?,
            documents: build_document_settings(documents)?,
            run: build_run_settings(run),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_katex_settings(katex: RawKatexSettings) -> Result<KatexSettings, LoadError> {
    let output = match katex.output {
        Some(value) => MarkupOutput::from_str(&value)
            .map_err(|reason| LoadError::invalid("katex.output", reason))?,
        None => MarkupOutput::Html,
    };

    let error_color = match katex.error_color {
        Some(color) => {
            let trimmed = color.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid(
                    "katex.error_color",
                    "color must not be empty",
                ));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let mut macros = BTreeMap::new();
    for RawMacro { name, expansion } in katex.macros {
        let name = name.trim();
        let bare = name.trim_start_matches('\\');
        if bare.is_empty() {
            return Err(LoadError::invalid(
                "katex.macros",
                "macro name must not be empty",
            ));
        }
        if bare.contains(char::is_whitespace) {
            return Err(LoadError::invalid(
                "katex.macros",
                format!("macro name `{name}` must not contain whitespace"),
            ));
        }
        macros.insert(format!("\\{bare}"), expansion);
    }

    Ok(KatexSettings {
        output,
        throw_on_error: katex.throw_on_error.unwrap_or(false),
        trust: katex.trust.unwrap_or(true),
        leqno: katex.leqno.unwrap_or(false),
        fleqn: katex.fleqn.unwrap_or(false),
        error_color,
        macros,
    })
}

fn build_client_settings(client: RawClientSettings) -> Result<ClientSettings, LoadError> {
    let enabled = client.enabled.unwrap_or(true);
    let script_markers = non_empty_entries(
        client
            .script_markers
            .unwrap_or_else(|| DEFAULT_SCRIPT_MARKERS.iter().map(|s| s.to_string()).collect()),
    );
    let render_functions = non_empty_entries(
        client
            .render_functions
            .unwrap_or_else(|| DEFAULT_RENDER_FUNCTIONS.iter().map(|s| s.to_string()).collect()),
    );

    if enabled && script_markers.is_empty() && render_functions.is_empty() {
        return Err(LoadError::invalid(
            "client",
            "script_markers and render_functions must not both be empty while enabled",
        ));
    }

    Ok(ClientSettings {
        enabled,
        script_markers,
        render_functions,
    })
}

fn build_document_settings(documents: RawDocumentSettings) -> Result<DocumentSettings, LoadError> {
    let extensions: Vec<String> = documents
        .extensions
        .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
        .into_iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect();

    if extensions.is_empty() {
        return Err(LoadError::invalid(
            "documents.extensions",
            "at least one extension is required",
        ));
    }

    Ok(DocumentSettings { extensions })
}

fn build_run_settings(run: RawRunSettings) -> RunSettings {
    RunSettings {
        fail_on_error: run.fail_on_error.unwrap_or(false),
        json_summary: run.json_summary.unwrap_or(false),
    }
}

fn non_empty_entries(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawKatexSettings {
    output: Option<String>,
    throw_on_error: Option<bool>,
    trust: Option<bool>,
    leqno: Option<bool>,
    fleqn: Option<bool>,
    error_color: Option<String>,
    macros: Vec<RawMacro>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMacro {
    name: String,
    expansion: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClientSettings {
    enabled: Option<bool>,
    script_markers: Option<Vec<String>>,
    render_functions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDocumentSettings {
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRunSettings {
    fail_on_error: Option<bool>,
    json_summary: Option<bool>,
}

#[cfg(test)]
mod tests;
