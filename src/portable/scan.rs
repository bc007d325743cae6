use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::error::SyncError;

/// What happens to a file when building the portable library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Copy,
    Transcode,
}

/// A source tree split into files to mirror and files to transcode, both
/// relative to the scanned root and sorted by path bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub copy: Vec<PathBuf>,
    pub transcode: Vec<PathBuf>,
}

/// Classify a file name by its extension.
///
/// The extension is looked up exactly as found on disk; names without one
/// (including dotfiles such as `.nomedia`) are always copied.
pub fn classify(path: &Path, transcode_extensions: &BTreeSet<String>) -> FileKind {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) if transcode_extensions.contains(ext) => FileKind::Transcode,
        _ => FileKind::Copy,
    }
}

fn is_excluded(entry: &DirEntry, excluded_dirs: &BTreeSet<String>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excluded_dirs.contains(name))
}

/// Walk `root`, pruning excluded directory names before descending into
/// them, and classify every file found.
///
/// Any unreadable directory aborts the scan.
pub fn scan_tree(
    root: &Path,
    transcode_extensions: &BTreeSet<String>,
    excluded_dirs: &BTreeSet<String>,
) -> Result<ScanResult, SyncError> {
    log::debug!("Scanning {}", root.display());

    let mut result = ScanResult::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let excluded = is_excluded(entry, excluded_dirs);
            if excluded {
                log::debug!("Excluding directory {}", entry.path().display());
            }
            !excluded
        });

    for entry in walker {
        let entry = entry.map_err(|source| SyncError::Scan {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if file_type.is_symlink() {
            // links to directories are neither followed nor listed
            if entry.path().is_dir() {
                log::debug!("Skipping directory symlink {}", entry.path().display());
                continue;
            }
        } else if !file_type.is_file() {
            log::warn!("Skipping special file {}", entry.path().display());
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_path_buf();
        match classify(&relative, transcode_extensions) {
            FileKind::Copy => result.copy.push(relative),
            FileKind::Transcode => result.transcode.push(relative),
        }
    }

    result.copy.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    result
        .transcode
        .sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    log::debug!(
        "Scan found {} files to copy and {} to transcode",
        result.copy.len(),
        result.transcode.len()
    );
    Ok(result)
}
