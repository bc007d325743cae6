use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;

use super::error::{ConflictReason, SyncError};
use crate::file_hash::ContentDigest;
use crate::ports::command::{CommandInvocation, CommandRunner};

/// What an artifact's embedded source digest says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactTag {
    /// No artifact on disk.
    Absent,
    Present(ContentDigest),
    /// The artifact exists but its tag cannot be recovered.
    Unreadable(ConflictReason),
}

/// Reads and writes the source digest that each transcoded file carries as
/// a metadata field.
pub struct ArtifactTagStore<'a, R: CommandRunner> {
    runner: &'a R,
    tag_name: &'a str,
}

impl<'a, R: CommandRunner> ArtifactTagStore<'a, R> {
    pub fn new(runner: &'a R, tag_name: &'a str) -> Self {
        Self { runner, tag_name }
    }

    /// Transcoder arguments that embed `digest` in the produced file.
    pub fn embed_args(&self, digest: &ContentDigest) -> [OsString; 2] {
        [
            "-metadata".into(),
            format!("{}={}", self.tag_name, digest).into(),
        ]
    }

    pub fn read_tag(&self, artifact: &Path) -> Result<ArtifactTag, SyncError> {
        match std::fs::symlink_metadata(artifact) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ArtifactTag::Absent),
            Err(source) => {
                return Err(SyncError::ArtifactLookup {
                    path: artifact.to_path_buf(),
                    source,
                });
            }
        }

        let entries = format!(
            "format_tags={tag}:stream_tags={tag}",
            tag = self.tag_name
        );
        let invocation = CommandInvocation::new("ffprobe")
            .args(["-v", "error", "-show_entries"])
            .arg(entries)
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(artifact)
            .capture_output();

        let output =
            self.runner
                .run(&invocation)
                .map_err(|source| SyncError::ProbeLaunch {
                    artifact: artifact.to_path_buf(),
                    source,
                })?;

        if !output.success() {
            return Ok(ArtifactTag::Unreadable(ConflictReason::ProbeFailed {
                code: output.code,
            }));
        }

        let Some(value) = output.stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Ok(ArtifactTag::Unreadable(ConflictReason::TagMissing {
                tag_name: self.tag_name.to_string(),
            }));
        };

        Ok(match ContentDigest::from_hex(value) {
            Some(digest) => ArtifactTag::Present(digest),
            None => ArtifactTag::Unreadable(ConflictReason::TagMalformed {
                tag_name: self.tag_name.to_string(),
                value: value.to_string(),
            }),
        })
    }
}
