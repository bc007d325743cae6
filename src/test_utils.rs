use std::cell::RefCell;
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::ports::command::{CommandError, CommandInvocation, CommandOutput, CommandRunner};

const FAKE_HEADER: &str = "FAKE-OGG";

/// Create `root/relative` with `contents`, making parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// Stand-in for rsync, ffmpeg and ffprobe that works on real files.
///
/// "Transcoded" files are a text header holding the metadata fields followed
/// by the source bytes, so ffprobe can read tags back and reruns produce
/// byte-identical output.
#[derive(Default)]
pub struct FakeMediaTools {
    invocations: RefCell<Vec<CommandInvocation>>,
}

impl FakeMediaTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `program` was run.
    pub fn count(&self, program: &str) -> usize {
        self.invocations
            .borrow()
            .iter()
            .filter(|inv| inv.program == program)
            .count()
    }

    /// Put an artifact on disk as if an earlier run had produced it.
    pub fn write_artifact(&self, path: &Path, tag_name: &str, value: &str) {
        Self::write_media(path, &[(tag_name, value)], b"earlier encode");
    }

    /// An artifact ffprobe can parse but which carries no tags.
    pub fn write_untagged_artifact(&self, path: &Path) {
        Self::write_media(path, &[], b"manual encode");
    }

    fn write_media(path: &Path, tags: &[(&str, &str)], payload: &[u8]) {
        let mut contents = format!("{FAKE_HEADER}\n");
        for (name, value) in tags {
            contents.push_str(&format!("{name}={value}\n"));
        }
        contents.push('\n');
        let mut bytes = contents.into_bytes();
        bytes.extend_from_slice(payload);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn value_after<'a>(args: &'a [OsString], flag: &str) -> Option<&'a OsString> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
    }

    fn rsync(&self, inv: &CommandInvocation) -> CommandOutput {
        let list = inv
            .args
            .iter()
            .find_map(|a| a.to_str()?.strip_prefix("--files-from=").map(PathBuf::from));
        let (Some(list), [.., source, destination]) = (list, inv.args.as_slice()) else {
            return CommandOutput::exited(1);
        };
        let Ok(list) = std::fs::read(list) else {
            return CommandOutput::exited(3);
        };

        for entry in list.split(|b| *b == 0).filter(|e| !e.is_empty()) {
            let relative = Path::new(std::ffi::OsStr::from_bytes(entry));
            let from = Path::new(source).join(relative);
            let to = Path::new(destination).join(relative);
            if let Some(parent) = to.parent()
                && std::fs::create_dir_all(parent).is_err()
            {
                return CommandOutput::exited(11);
            }
            if std::fs::copy(&from, &to).is_err() {
                return CommandOutput::exited(23);
            }
        }
        CommandOutput::exited(0)
    }

    fn ffmpeg(&self, inv: &CommandInvocation) -> CommandOutput {
        let (Some(input), Some(metadata), Some(output)) = (
            Self::value_after(&inv.args, "-i"),
            Self::value_after(&inv.args, "-metadata").and_then(|m| m.to_str()),
            inv.args.last(),
        ) else {
            return CommandOutput::exited(1);
        };
        let output = Path::new(output);
        if output.exists() {
            // -n: never overwrite
            return CommandOutput::exited(1);
        }
        let Some((name, value)) = metadata.split_once('=') else {
            return CommandOutput::exited(1);
        };
        let Ok(payload) = std::fs::read(input) else {
            return CommandOutput::exited(1);
        };
        Self::write_media(output, &[(name, value)], &payload);
        CommandOutput::exited(0)
    }

    fn ffprobe(&self, inv: &CommandInvocation) -> CommandOutput {
        let (Some(entries), Some(path)) = (
            Self::value_after(&inv.args, "-show_entries").and_then(|e| e.to_str()),
            inv.args.last(),
        ) else {
            return CommandOutput::exited(1);
        };
        let Some(tag_name) = entries
            .strip_prefix("format_tags=")
            .and_then(|rest| rest.split(':').next())
        else {
            return CommandOutput::exited(1);
        };
        let Ok(bytes) = std::fs::read(path) else {
            return CommandOutput::exited(1);
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut lines = text.lines();
        if lines.next() != Some(FAKE_HEADER) {
            return CommandOutput::exited(1);
        }
        let value = lines
            .take_while(|l| !l.is_empty())
            .find_map(|l| l.strip_prefix(tag_name)?.strip_prefix('='))
            .map(|v| format!("{v}\n"))
            .unwrap_or_default();
        CommandOutput::with_stdout(0, value)
    }
}

impl CommandRunner for FakeMediaTools {
    fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(invocation.clone());
        Ok(match invocation.program.as_str() {
            "rsync" => self.rsync(invocation),
            "ffmpeg" => self.ffmpeg(invocation),
            "ffprobe" => self.ffprobe(invocation),
            other => panic!("unexpected program {other}"),
        })
    }
}
