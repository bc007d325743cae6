//! Building the portable library: a mirror of the music library where
//! selected formats are transcoded and excluded directories are left out.
//!
//! Every run rescans the source tree. Copies are handed to rsync in one
//! batch, then each transcode candidate goes through the [`TranscodeGate`],
//! which uses the source digest embedded in existing artifacts to skip work
//! that is already done. Any failure stops the run; rerunning afterwards is
//! always safe.

mod artifact_tag;
mod bulk_copy;
mod error;
mod scan;
mod transcode;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

pub use error::SyncError;

use bulk_copy::copy_files;
use scan::scan_tree;
use transcode::{GateOutcome, TranscodeGate};

use crate::config::{LibraryRoot, TranscodeSettings};
use crate::ports::command::{CommandRunner, Verbosity};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub copied: usize,
    pub transcoded: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Everything one portable library run needs, fixed for its duration.
pub struct PortableSync<'a, R: CommandRunner> {
    pub runner: &'a R,
    pub verbosity: Verbosity,
    pub music: &'a LibraryRoot,
    pub portable: &'a LibraryRoot,
    pub transcode_extensions: &'a BTreeSet<String>,
    pub excluded_dirs: &'a BTreeSet<String>,
    pub transcode: &'a TranscodeSettings,
}

impl<R: CommandRunner> PortableSync<'_, R> {
    pub fn run(&self) -> Result<SyncSummary, SyncError> {
        let started = Instant::now();
        let music = self.music.path();
        let portable = self.portable.path();
        log::info!(
            "generating portable library {} from {}...",
            portable.display(),
            music.display()
        );

        log::info!("finding files to copy...");
        let scan = scan_tree(music, self.transcode_extensions, self.excluded_dirs)?;

        log::info!(
            "copying {} files & tracks not requiring conversion...",
            scan.copy.len()
        );
        let copied = copy_files(self.runner, self.verbosity, music, portable, &scan.copy)?;

        let gate = TranscodeGate::new(self.runner, self.transcode);
        let total = scan.transcode.len();
        let mut summary = SyncSummary {
            copied,
            ..Default::default()
        };

        for (index, track) in scan.transcode.iter().enumerate() {
            log::info!("converting track ({}/{}): {}", index + 1, total, track.display());
            match gate.process(music, portable, track)? {
                GateOutcome::Transcoded => summary.transcoded += 1,
                GateOutcome::Skipped => {
                    log::debug!("already converted: {}", track.display());
                    summary.skipped += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        log::info!(
            "portable library generated: {} copied, {} transcoded, {} already up to date ({})",
            summary.copied,
            summary.transcoded,
            summary.skipped,
            humantime::format_duration(Duration::from_secs(summary.elapsed.as_secs()))
        );
        Ok(summary)
    }
}
