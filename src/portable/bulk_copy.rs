use std::ffi::OsString;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::SyncError;
use crate::ports::command::{CommandInvocation, CommandRunner, Verbosity};

/// Directory argument for rsync: a trailing slash means "contents of".
fn dir_arg(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    if !arg.as_bytes().ends_with(b"/") {
        arg.push("/");
    }
    arg
}

/// Mirror `files` (relative to `source`) into `destination` with a single
/// rsync run. Returns the number of files handed over.
pub fn copy_files<R: CommandRunner>(
    runner: &R,
    verbosity: Verbosity,
    source: &Path,
    destination: &Path,
    files: &[PathBuf],
) -> Result<usize, SyncError> {
    if files.is_empty() {
        log::debug!("Nothing to copy");
        return Ok(0);
    }

    let mut list = NamedTempFile::new().map_err(SyncError::FileList)?;
    for file in files {
        list.write_all(file.as_os_str().as_bytes())
            .map_err(SyncError::FileList)?;
        list.write_all(b"\0").map_err(SyncError::FileList)?;
    }
    list.flush().map_err(SyncError::FileList)?;

    let mut files_from = OsString::from("--files-from=");
    files_from.push(list.path());

    let mut invocation = CommandInvocation::new("rsync").args(["-a", "--from0"]);
    invocation = match verbosity.level() {
        2 => invocation.arg("--info=progress2"),
        level if level >= 3 => invocation.arg("-P"),
        _ => invocation,
    };
    let invocation = invocation
        .arg(files_from)
        .arg(dir_arg(source))
        .arg(dir_arg(destination))
        .current_dir(source)
        .show_output_at(2);

    let output = runner
        .run(&invocation)
        .map_err(SyncError::BatchCopyLaunch)?;

    if !output.success() {
        return Err(SyncError::BatchCopy {
            file_count: files.len(),
            code: output.code,
        });
    }

    Ok(files.len())
}
