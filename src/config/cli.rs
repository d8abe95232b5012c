use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the texbake binary.
#[derive(Debug, Parser)]
#[command(
    name = "texbake",
    version,
    about = "Pre-render LaTeX math in HTML documents with KaTeX"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TEXBAKE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Replace math in documents with rendered markup and write the result.
    Render(RenderArgs),
    /// Render math without writing anything and report the outcome.
    Check(CheckArgs),
}

impl Command {
    pub fn overrides(&self) -> &RunOverrides {
        match self {
            Command::Render(args) => &args.overrides,
            Command::Check(args) => &args.overrides,
        }
    }

    pub fn inputs(&self) -> &[PathBuf] {
        match self {
            Command::Render(args) => &args.inputs,
            Command::Check(args) => &args.inputs,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,

    /// Documents or directories to process. Directories are searched recursively.
    #[arg(value_name = "INPUT", required = true, value_hint = ValueHint::AnyPath)]
    pub inputs: Vec<PathBuf>,

    /// Write the result to this file instead of rewriting the input in place.
    /// Only valid with a single input file.
    #[arg(
        long,
        short = 'o',
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        conflicts_with = "out_dir"
    )]
    pub output: Option<PathBuf>,

    /// Write results under this directory, mirroring each input's layout.
    #[arg(long = "out-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,

    /// Documents or directories to check. Directories are searched recursively.
    #[arg(value_name = "INPUT", required = true, value_hint = ValueHint::AnyPath)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RunOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Allow KaTeX commands such as \href and \includegraphics.
    #[arg(
        long = "katex-trust",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub katex_trust: Option<bool>,

    /// Make KaTeX reject invalid input instead of rendering an error marker.
    #[arg(
        long = "katex-throw-on-error",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub katex_throw_on_error: Option<bool>,

    /// KaTeX output markup (html|html_and_mathml|mathml).
    #[arg(long = "katex-output", value_name = "FORMAT")]
    pub katex_output: Option<String>,

    /// Leave client-side math rendering scripts untouched.
    #[arg(long = "keep-client-scripts", action = clap::ArgAction::SetTrue)]
    pub keep_client_scripts: bool,

    /// Exit with a failure status when any expression fails to render.
    /// Takes an optional value as `--fail-on-error=false`.
    #[arg(
        long = "fail-on-error",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub fail_on_error: Option<bool>,

    /// Print a JSON summary of the run to stdout.
    #[arg(long = "json", action = clap::ArgAction::SetTrue)]
    pub json: bool,
}
