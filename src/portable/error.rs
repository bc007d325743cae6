use std::path::PathBuf;

use crate::file_hash::{ContentDigest, HashError};
use crate::ports::command::{CommandError, describe_exit};

/// Why an existing artifact cannot be proven to match its source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("artifact was made from {found}, source is now {expected}")]
    DigestMismatch {
        expected: ContentDigest,
        found: ContentDigest,
    },

    #[error("artifact has no `{tag_name}` tag")]
    TagMissing { tag_name: String },

    #[error("artifact tag `{tag_name}` is not a digest: {value:?}")]
    TagMalformed { tag_name: String, value: String },

    #[error("probing the artifact failed ({})", describe_exit(.code))]
    ProbeFailed { code: Option<i32> },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to scan {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to write the rsync file list")]
    FileList(#[source] std::io::Error),

    #[error("rsync failed copying {file_count} files ({})", describe_exit(.code))]
    BatchCopy { file_count: usize, code: Option<i32> },

    #[error("could not run rsync")]
    BatchCopyLaunch(#[source] CommandError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("could not check whether {path} exists")]
    ArtifactLookup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read the tag of {artifact}")]
    ProbeLaunch {
        artifact: PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("conflicting artifact {artifact} for {source_path}: {reason}")]
    ArtifactConflict {
        artifact: PathBuf,
        source_path: PathBuf,
        reason: ConflictReason,
    },

    #[error("couldn't create directory structure for {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcode output already exists: {path}")]
    OutputExists { path: PathBuf },

    #[error("ffmpeg failed converting {input} ({})", describe_exit(.code))]
    Transcode { input: PathBuf, code: Option<i32> },

    #[error("could not run ffmpeg for {input}")]
    TranscodeLaunch {
        input: PathBuf,
        #[source]
        source: CommandError,
    },
}

impl SyncError {
    pub const EXIT_BATCH_COPY: u8 = 1;
    pub const EXIT_FILESYSTEM: u8 = 2;
    pub const EXIT_TRANSCODE: u8 = 3;

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::FileList(_)
            | SyncError::BatchCopy { .. }
            | SyncError::BatchCopyLaunch(_) => Self::EXIT_BATCH_COPY,
            SyncError::Scan { .. }
            | SyncError::Hash(_)
            | SyncError::ArtifactLookup { .. }
            | SyncError::CreateDir { .. }
            | SyncError::OutputExists { .. } => Self::EXIT_FILESYSTEM,
            SyncError::ProbeLaunch { .. }
            | SyncError::ArtifactConflict { .. }
            | SyncError::Transcode { .. }
            | SyncError::TranscodeLaunch { .. } => Self::EXIT_TRANSCODE,
        }
    }
}
