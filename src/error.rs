use crate::config::ConfigError;
use crate::portable::SyncError;
use crate::services::playlist::PlaylistError;

/// Failures that end a command, each with its own process exit code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Playlist(#[from] PlaylistError),
}

impl AppError {
    pub const EXIT_CONFIG: u8 = 4;

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => Self::EXIT_CONFIG,
            AppError::Sync(e) => e.exit_code(),
            AppError::Playlist(_) => SyncError::EXIT_FILESYSTEM,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        let config = AppError::from(ConfigError::MissingRoot {
            name: "music",
            path: PathBuf::from("/nope"),
        });
        let copy = AppError::from(SyncError::BatchCopy {
            file_count: 1,
            code: Some(23),
        });
        let filesystem = AppError::from(SyncError::OutputExists {
            path: PathBuf::from("/portable/b.ogg"),
        });
        let transcode = AppError::from(SyncError::Transcode {
            input: PathBuf::from("/music/b.flac"),
            code: Some(1),
        });

        assert_eq!(copy.exit_code(), 1);
        assert_eq!(filesystem.exit_code(), 2);
        assert_eq!(transcode.exit_code(), 3);
        assert_eq!(config.exit_code(), 4);
    }

    #[test]
    fn test_error_chain_renders_on_one_line() {
        let err = AppError::from(SyncError::Hash(crate::file_hash::HashError {
            path: PathBuf::from("/music/b.flac"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }));

        let rendered = format!("{:#}", color_eyre::Report::new(err));
        assert_eq!(rendered, "failed to hash /music/b.flac: denied");
    }
}
