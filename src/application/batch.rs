//! Runs the prerenderer over a set of documents and writes the results.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use metrics::counter;
use serde::Serialize;
use tracing::info;

use crate::{
    application::{
        client::NeutralizeReport,
        error::AppError,
        prerender::Prerenderer,
        render::{RenderTally, Typesetter},
    },
    infra::documents::{DocumentPath, read_document, write_document},
};

pub(crate) const DOCUMENTS_TOTAL_METRIC: &str = "texbake_documents_total";

/// Where rendered documents end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Rewrite each source file. Unchanged documents are left alone.
    InPlace,
    /// Write the single processed document to this path.
    File(PathBuf),
    /// Mirror every document under this directory by its relative path.
    Directory(PathBuf),
    /// Render only; nothing is written.
    Discard,
}

impl OutputTarget {
    fn destination(&self, document: &DocumentPath) -> Option<PathBuf> {
        match self {
            OutputTarget::InPlace => Some(document.source.clone()),
            OutputTarget::File(path) => Some(path.clone()),
            OutputTarget::Directory(root) => Some(root.join(&document.relative)),
            OutputTarget::Discard => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
    pub changed: bool,
    pub tally: RenderTally,
    pub client: NeutralizeReport,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub changed: usize,
    pub tally: RenderTally,
    pub client: NeutralizeReport,
    pub reports: Vec<DocumentReport>,
}

impl RunSummary {
    fn record(&mut self, report: DocumentReport) {
        self.documents += 1;
        if report.changed {
            self.changed += 1;
        }
        self.tally.absorb(report.tally);
        self.client.absorb(report.client);
        self.reports.push(report);
    }
}

/// Pre-render every document and deliver it to `target`.
///
/// The first document that cannot be read, rewritten or written aborts the
/// run. Expressions that fail to render are not errors here; they are
/// counted in the summary.
pub fn run_batch<T: Typesetter>(
    prerenderer: &Prerenderer<T>,
    documents: &[DocumentPath],
    target: &OutputTarget,
) -> Result<RunSummary, AppError> {
    if documents.is_empty() {
        return Err(AppError::validation("no documents matched the given inputs"));
    }
    if matches!(target, OutputTarget::File(_)) && documents.len() != 1 {
        return Err(AppError::validation(format!(
            "--output expects exactly one document, found {}",
            documents.len()
        )));
    }

    reject_shared_destinations(documents, target)?;

    let mut summary = RunSummary::default();
    for document in documents {
        let report = process_document(prerenderer, document, target)?;
        summary.record(report);
    }

    info!(
        target = "application::batch",
        documents = summary.documents,
        changed = summary.changed,
        succeeded = summary.tally.succeeded,
        failed = summary.tally.failed,
        "batch finished"
    );

    Ok(summary)
}

/// Two documents mirrored to the same path would silently overwrite each
/// other.
fn reject_shared_destinations(
    documents: &[DocumentPath],
    target: &OutputTarget,
) -> Result<(), AppError> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for document in documents {
        let Some(destination) = target.destination(document) else {
            continue;
        };
        if let Some(first) = claimed.insert(destination.clone(), &document.source) {
            return Err(AppError::validation(format!(
                "`{}` and `{}` would both be written to `{}`",
                first.display(),
                document.source.display(),
                destination.display()
            )));
        }
    }
    Ok(())
}

fn process_document<T: Typesetter>(
    prerenderer: &Prerenderer<T>,
    document: &DocumentPath,
    target: &OutputTarget,
) -> Result<DocumentReport, AppError> {
    let source = read_document(&document.source)?;
    let output = prerenderer
        .prerender(&source)
        .map_err(|err| AppError::prerender(display_path(&document.source), err))?;
    let changed = output.html != source;

    let destination = match target {
        OutputTarget::InPlace if !changed => None,
        _ => target.destination(document),
    };
    if let Some(path) = destination.as_ref() {
        write_document(path, &output.html)?;
    }

    let outcome = if output.tally.has_failures() {
        "degraded"
    } else {
        "clean"
    };
    counter!(DOCUMENTS_TOTAL_METRIC, "outcome" => outcome).increment(1);

    info!(
        target = "application::batch",
        path = %document.source.display(),
        written_to = destination.as_deref().map(|path| path.display().to_string()),
        changed,
        succeeded = output.tally.succeeded,
        failed = output.tally.failed,
        "document processed"
    );

    Ok(DocumentReport {
        path: display_path(&document.source),
        written_to: destination.as_deref().map(display_path),
        changed,
        tally: output.tally,
        client: output.client,
    })
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
