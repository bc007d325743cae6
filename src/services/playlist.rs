use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("failed to list playlists in {path}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read playlist {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write playlist {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not check whether {path} exists")]
    Lookup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory of playlist files, one track path per line, relative to the
/// music library. Lines starting with `#` are comments.
pub struct PlaylistStore {
    root: PathBuf,
}

impl PlaylistStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Every playlist file by name, in name order, with its lines.
    pub fn list(&self) -> Result<BTreeMap<String, Vec<String>>, PlaylistError> {
        let list_err = |source| PlaylistError::List {
            path: self.root.clone(),
            source,
        };

        let mut playlists = BTreeMap::new();
        for entry in std::fs::read_dir(&self.root).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let contents = std::fs::read_to_string(&path)
                .map_err(|source| PlaylistError::Read { path, source })?;
            playlists.insert(name, contents.lines().map(str::to_string).collect());
        }
        Ok(playlists)
    }

    /// Replace a playlist's contents, one newline-terminated line per entry.
    pub fn save(&self, name: &str, lines: &[String]) -> Result<(), PlaylistError> {
        let path = self.root.join(name);
        let mut contents = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }
        std::fs::write(&path, contents).map_err(|source| PlaylistError::Write { path, source })
    }
}

/// Remove repeated lines, keeping the first occurrence of each.
pub fn dedup_lines(lines: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|line| seen.insert(line.as_str()))
        .cloned()
        .collect()
}

/// Deduplicate every playlist, rewriting only those that changed.
/// Returns the names of the edited playlists.
pub fn dedup_playlists(store: &PlaylistStore) -> Result<Vec<String>, PlaylistError> {
    log::info!("deduplicating all playlists...");

    let mut edited = Vec::new();
    for (name, lines) in store.list()? {
        let deduped = dedup_lines(&lines);
        if deduped != lines {
            store.save(&name, &deduped)?;
            log::info!(
                "playlist dedup: edited {} ({} duplicate lines removed)",
                name,
                lines.len() - deduped.len()
            );
            edited.push(name);
        }
    }

    if edited.is_empty() {
        log::info!("no edits made");
    } else {
        log::warn!("one or more playlists were edited to remove duplicate tracks");
    }
    Ok(edited)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTrack {
    pub playlist: String,
    pub track: PathBuf,
}

/// Report every playlist entry that does not exist under `music_root`.
pub fn check_playlists(
    store: &PlaylistStore,
    music_root: &Path,
) -> Result<Vec<MissingTrack>, PlaylistError> {
    log::info!("checking for non-existing playlist tracks...");

    let mut missing = Vec::new();
    for (name, lines) in store.list()? {
        for line in lines.iter().filter(|l| !l.starts_with('#')) {
            let track = music_root.join(line);
            let exists = match std::fs::metadata(&track) {
                Ok(_) => true,
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                    false
                }
                Err(source) => return Err(PlaylistError::Lookup { path: track, source }),
            };
            if !exists {
                log::info!(
                    "playlist '{}' contained non-existing track '{}'",
                    name,
                    track.display()
                );
                missing.push(MissingTrack {
                    playlist: name.clone(),
                    track,
                });
            }
        }
    }

    if missing.is_empty() {
        log::info!("all playlists contain only valid filepaths");
    } else {
        log::warn!("one or many playlists contained non-existing tracks");
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_file;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_lines_keeps_first_occurrence() {
        assert_eq!(
            dedup_lines(&lines(&["b.ogg", "a.ogg", "b.ogg", "c.ogg", "a.ogg"])),
            lines(&["b.ogg", "a.ogg", "c.ogg"])
        );
    }

    #[test]
    fn test_list_reads_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "road trip.m3u", b"# mix\na.ogg\nb.ogg\n");
        write_file(dir.path(), "nested/ignored.m3u", b"x.ogg\n");

        let playlists = PlaylistStore::new(dir.path()).list().unwrap();

        assert_eq!(playlists.len(), 1);
        assert_eq!(
            playlists["road trip.m3u"],
            lines(&["# mix", "a.ogg", "b.ogg"])
        );
    }

    #[test]
    fn test_dedup_rewrites_only_changed_playlists() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "dupes", b"a.ogg\nb.ogg\na.ogg\n");
        let clean = write_file(dir.path(), "clean", b"a.ogg\nb.ogg");
        let store = PlaylistStore::new(dir.path());

        let edited = dedup_playlists(&store).unwrap();

        assert_eq!(edited, vec!["dupes".to_string()]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("dupes")).unwrap(),
            "a.ogg\nb.ogg\n"
        );
        // untouched, so still without a trailing newline
        assert_eq!(std::fs::read_to_string(clean).unwrap(), "a.ogg\nb.ogg");
    }

    #[test]
    fn test_check_reports_missing_tracks_and_ignores_comments() {
        let music = tempfile::tempdir().unwrap();
        let playlists = tempfile::tempdir().unwrap();
        write_file(music.path(), "Artist/one.ogg", b"1");
        write_file(
            playlists.path(),
            "mix",
            b"#EXTM3U\nArtist/one.ogg\nArtist/two.ogg\n# Artist/commented.ogg\n",
        );

        let missing = check_playlists(&PlaylistStore::new(playlists.path()), music.path()).unwrap();

        assert_eq!(
            missing,
            vec![MissingTrack {
                playlist: "mix".to_string(),
                track: music.path().join("Artist/two.ogg"),
            }]
        );
    }

    #[test]
    fn test_check_all_valid() {
        let music = tempfile::tempdir().unwrap();
        let playlists = tempfile::tempdir().unwrap();
        write_file(music.path(), "one.ogg", b"1");
        write_file(playlists.path(), "mix", b"one.ogg\n");

        let missing = check_playlists(&PlaylistStore::new(playlists.path()), music.path()).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_missing_playlist_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaylistStore::new(&dir.path().join("gone"));
        assert!(matches!(store.list(), Err(PlaylistError::List { .. })));
    }
}
