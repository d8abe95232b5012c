use std::process;

use texbake::{
    application::{
        batch::{OutputTarget, RunSummary, run_batch},
        client::ClientNeutralizer,
        error::AppError,
        prerender::Prerenderer,
        render::{KatexOptions, KatexTypesetter},
    },
    config,
    infra::{documents::discover_documents, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, warn};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    match run() {
        Ok(RunStatus::Clean) => {}
        Ok(RunStatus::Failed) => process::exit(1),
        Err(error) => {
            report_application_error(&error);
            process::exit(1);
        }
    }
}

enum RunStatus {
    Clean,
    Failed,
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<RunStatus, AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let typesetter = KatexTypesetter::new(&KatexOptions::from(&settings.katex))?;
    let neutralizer = settings
        .client
        .enabled
        .then(|| ClientNeutralizer::from(&settings.client));
    let prerenderer = Prerenderer::new(typesetter, neutralizer);

    let target = output_target(&cli_args.command);
    let documents = discover_documents(cli_args.command.inputs(), &settings.documents.extensions)?;
    let summary = run_batch(&prerenderer, &documents, &target)?;

    print_summary(&summary, settings.run.json_summary)?;

    if settings.run.fail_on_error && summary.tally.has_failures() {
        warn!(
            failed = summary.tally.failed,
            "expressions failed to render and fail_on_error is set"
        );
        return Ok(RunStatus::Failed);
    }

    Ok(RunStatus::Clean)
}

fn output_target(command: &config::Command) -> OutputTarget {
    match command {
        config::Command::Render(args) => match (&args.output, &args.out_dir) {
            (Some(file), _) => OutputTarget::File(file.clone()),
            (None, Some(dir)) => OutputTarget::Directory(dir.clone()),
            (None, None) => OutputTarget::InPlace,
        },
        config::Command::Check(_) => OutputTarget::Discard,
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<(), AppError> {
    if json {
        let rendered = serde_json::to_string_pretty(summary)
            .map_err(|err| AppError::unexpected(format!("failed to encode summary: {err}")))?;
        println!("{rendered}");
        return Ok(());
    }

    for report in summary.reports.iter().filter(|r| r.tally.has_failures()) {
        println!(
            "{}: {} expression(s) kept as source",
            report.path, report.tally.failed
        );
    }
    println!(
        "{} document(s), {} changed: {} rendered, {} failed",
        summary.documents, summary.changed, summary.tally.succeeded, summary.tally.failed
    );
    Ok(())
}
