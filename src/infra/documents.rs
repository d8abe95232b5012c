//! Reading, writing and discovering documents on disk.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use super::error::InfraError;

pub const DEFAULT_EXTENSIONS: &[&str] = &["html", "htm"];

/// A document found on disk, with its path relative to the input it was
/// discovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub source: PathBuf,
    pub relative: PathBuf,
}

pub fn read_document(path: &Path) -> Result<String, InfraError> {
    fs::read_to_string(path).map_err(|err| InfraError::io(path, err))
}

/// Write `text` to `path`, creating parent directories as needed.
///
/// The content is written to a temporary file next to the destination and
/// then persisted over it, so readers never observe a partial document. An
/// existing destination keeps its permissions.
pub fn write_document(path: &Path, text: &str) -> Result<(), InfraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|err| InfraError::io(&parent, err))?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".texbake-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Same mode as a plain `File::create`, before the umask.
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut file = builder
        .tempfile_in(&parent)
        .map_err(|err| InfraError::io(&parent, err))?;

    match fs::metadata(path) {
        Ok(existing) => file
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|err| InfraError::io(file.path(), err))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(InfraError::io(path, err)),
    }
    file.write_all(text.as_bytes())
        .map_err(|err| InfraError::io(file.path(), err))?;
    file.persist(path)
        .map_err(|err| InfraError::io(path, err.error))?;
    Ok(())
}

/// Expand the given inputs into a sorted, de-duplicated list of documents.
///
/// Files are taken as given, whatever their extension. Directories are
/// walked recursively and only files whose extension matches one of
/// `extensions` (case-insensitively) are kept.
pub fn discover_documents(
    inputs: &[PathBuf],
    extensions: &[String],
) -> Result<Vec<DocumentPath>, InfraError> {
    let mut documents = Vec::new();

    for input in inputs {
        let metadata = fs::metadata(input).map_err(|err| InfraError::io(input, err))?;
        if metadata.is_file() {
            let relative = input
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| input.clone());
            documents.push(DocumentPath {
                source: input.clone(),
                relative,
            });
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.map_err(|err| InfraError::walk(input, err.to_string()))?;
            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(input)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            found.push(DocumentPath {
                source: entry.into_path(),
                relative,
            });
        }
        found.sort_by(|a, b| a.source.cmp(&b.source));
        documents.extend(found);
    }

    let mut seen = std::collections::HashSet::new();
    documents.retain(|doc| seen.insert(doc.source.clone()));
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(ext))
        })
}
