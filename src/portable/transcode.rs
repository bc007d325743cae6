use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::instrument;

use super::artifact_tag::{ArtifactTag, ArtifactTagStore};
use super::error::{ConflictReason, SyncError};
use crate::config::TranscodeSettings;
use crate::file_hash::compute_sha256;
use crate::ports::command::{CommandInvocation, CommandRunner};

/// Result of gating one transcode candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// An artifact tagged with the current source digest already exists.
    Skipped,
    /// A fresh artifact was produced.
    Transcoded,
}

/// Where the artifact for `relative` lives under `portable_root`.
pub fn artifact_path(portable_root: &Path, relative: &Path, target_extension: &str) -> PathBuf {
    portable_root.join(relative).with_extension(target_extension)
}

/// Refuse to hand ffmpeg a target that already exists.
pub fn ensure_output_absent(output: &Path) -> Result<(), SyncError> {
    match std::fs::symlink_metadata(output) {
        Ok(_) => Err(SyncError::OutputExists {
            path: output.to_path_buf(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SyncError::ArtifactLookup {
            path: output.to_path_buf(),
            source,
        }),
    }
}

/// Decides, per source file, whether to skip, transcode, or stop because
/// an existing artifact cannot be shown to match the source.
pub struct TranscodeGate<'a, R: CommandRunner> {
    runner: &'a R,
    settings: &'a TranscodeSettings,
    tags: ArtifactTagStore<'a, R>,
}

impl<'a, R: CommandRunner> TranscodeGate<'a, R> {
    pub fn new(runner: &'a R, settings: &'a TranscodeSettings) -> Self {
        Self {
            runner,
            settings,
            tags: ArtifactTagStore::new(runner, &settings.tag_name),
        }
    }

    #[instrument(skip(self, music_root, portable_root))]
    pub fn process(
        &self,
        music_root: &Path,
        portable_root: &Path,
        relative: &Path,
    ) -> Result<GateOutcome, SyncError> {
        let input = music_root.join(relative);
        let output = artifact_path(portable_root, relative, &self.settings.target_extension);

        let source_digest = compute_sha256(&input)?;

        match self.tags.read_tag(&output)? {
            ArtifactTag::Present(tag) if tag == source_digest => {
                log::debug!("Up to date: {}", output.display());
                return Ok(GateOutcome::Skipped);
            }
            ArtifactTag::Present(tag) => {
                return Err(SyncError::ArtifactConflict {
                    artifact: output,
                    source_path: input,
                    reason: ConflictReason::DigestMismatch {
                        expected: source_digest,
                        found: tag,
                    },
                });
            }
            ArtifactTag::Unreadable(reason) => {
                return Err(SyncError::ArtifactConflict {
                    artifact: output,
                    source_path: input,
                    reason,
                });
            }
            ArtifactTag::Absent => {}
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // the artifact may have appeared since the tag lookup
        ensure_output_absent(&output)?;

        let invocation = CommandInvocation::new("ffmpeg")
            .args(["-nostdin", "-n", "-i"])
            .arg(&input)
            .args(["-vn", "-sn", "-dn", "-map_metadata", "0", "-c:a"])
            .arg(&self.settings.codec)
            .arg("-q:a")
            .arg(&self.settings.quality)
            .args(self.tags.embed_args(&source_digest))
            .arg(&output)
            .show_output_at(3);

        let result = self
            .runner
            .run(&invocation)
            .map_err(|source| SyncError::TranscodeLaunch {
                input: input.clone(),
                source,
            })?;

        if !result.success() {
            return Err(SyncError::Transcode {
                input,
                code: result.code,
            });
        }

        Ok(GateOutcome::Transcoded)
    }
}
