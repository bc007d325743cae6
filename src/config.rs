use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory could be determined for this platform")]
    NoConfigDir,

    #[error("failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config file: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize default config")]
    Serialize(#[from] toml::ser::Error),

    #[error("config value `{field}` must not be empty")]
    EmptyValue { field: &'static str },

    #[error("{name} directory does not exist: {path}")]
    MissingRoot { name: &'static str, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_music")]
    music: String,
    #[serde(default = "default_portable")]
    portable: String,
    #[serde(default = "default_playlists")]
    playlists: String,
    /// Extensions (without the dot, case as found on disk) that get transcoded
    #[serde(default = "default_transcode_extensions")]
    transcode_extensions: BTreeSet<String>,
    /// Directory names that are never descended into when building the
    /// portable library
    #[serde(default = "default_excluded_dirs")]
    excluded_dirs: BTreeSet<String>,
    #[serde(default)]
    transcode: TranscodeSettings,
}

/// How transcoded artifacts are produced and tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeSettings {
    pub target_extension: String,
    pub codec: String,
    pub quality: String,
    /// Metadata field holding the source digest inside each artifact
    pub tag_name: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            target_extension: "ogg".to_string(),
            codec: "libvorbis".to_string(),
            quality: "5".to_string(),
            tag_name: "TUNEKEEP_SOURCE_SHA256".to_string(),
        }
    }
}

fn default_music() -> String {
    "~/media/music".to_string()
}

fn default_portable() -> String {
    "~/media/music-etc/music-portable".to_string()
}

fn default_playlists() -> String {
    "~/media/music-etc/playlists".to_string()
}

fn default_transcode_extensions() -> BTreeSet<String> {
    BTreeSet::from(["flac".to_string()])
}

fn default_excluded_dirs() -> BTreeSet<String> {
    BTreeSet::from(["etc".to_string()])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music: default_music(),
            portable: default_portable(),
            playlists: default_playlists(),
            transcode_extensions: default_transcode_extensions(),
            excluded_dirs: default_excluded_dirs(),
            transcode: TranscodeSettings::default(),
        }
    }
}

/// An existing directory the library tools operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRoot {
    path: PathBuf,
}

impl LibraryRoot {
    /// Validate that `path` is an existing directory. `name` only labels the
    /// error.
    pub fn existing(name: &'static str, path: PathBuf) -> Result<Self, ConfigError> {
        if path.is_dir() {
            log::debug!("Using {} directory {}", name, path.display());
            Ok(Self { path })
        } else {
            Err(ConfigError::MissingRoot { name, path })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("tunekeep").join("config.toml"))
    }

    /// Load config from the default location, falling back to the built-in
    /// defaults when no file exists there yet.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            log::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Write the default config to the default location unless a file is
    /// already there. Returns the path and whether it was written.
    pub fn create_default() -> Result<(PathBuf, bool), ConfigError> {
        let config_path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        let created = Self::default().write_if_absent(&config_path)?;
        Ok((config_path, created))
    }

    fn write_if_absent(&self, path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(write_err)?;
        Ok(true)
    }

    /// Check values that have no sensible empty form.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("music", self.music.as_str()),
            ("portable", self.portable.as_str()),
            ("playlists", self.playlists.as_str()),
            ("transcode.target_extension", self.transcode.target_extension.as_str()),
            ("transcode.codec", self.transcode.codec.as_str()),
            ("transcode.quality", self.transcode.quality.as_str()),
            ("transcode.tag_name", self.transcode.tag_name.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue { field });
            }
        }
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    /// Get expanded music library path
    pub fn music_path(&self) -> PathBuf {
        self.expand_path(&self.music)
    }

    /// Get expanded portable library path
    pub fn portable_path(&self) -> PathBuf {
        self.expand_path(&self.portable)
    }

    /// Get expanded playlists path
    pub fn playlists_path(&self) -> PathBuf {
        self.expand_path(&self.playlists)
    }

    pub fn music_root(&self) -> Result<LibraryRoot, ConfigError> {
        LibraryRoot::existing("music", self.music_path())
    }

    pub fn portable_root(&self) -> Result<LibraryRoot, ConfigError> {
        LibraryRoot::existing("portable", self.portable_path())
    }

    pub fn playlists_root(&self) -> Result<LibraryRoot, ConfigError> {
        LibraryRoot::existing("playlists", self.playlists_path())
    }

    pub fn transcode_extensions(&self) -> &BTreeSet<String> {
        &self.transcode_extensions
    }

    pub fn excluded_dirs(&self) -> &BTreeSet<String> {
        &self.excluded_dirs
    }

    pub fn transcode(&self) -> &TranscodeSettings {
        &self.transcode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.transcode_extensions().contains("flac"));
        assert!(config.excluded_dirs().contains("etc"));
        assert_eq!(config.transcode().target_extension, "ogg");
    }

    #[test]
    fn test_partial_file_overrides() {
        let config = Config::from_toml(
            r#"
music = "/srv/music"
transcode_extensions = ["flac", "wav"]

[transcode]
quality = "3"
"#,
        )
        .unwrap();

        assert_eq!(config.music_path(), PathBuf::from("/srv/music"));
        assert_eq!(config.transcode_extensions().len(), 2);
        assert_eq!(config.transcode().quality, "3");
        assert_eq!(config.transcode().codec, "libvorbis");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_toml("musik = \"/typo\"").is_err());
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "music = [").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_validate_rejects_empty_tag_name() {
        let config = Config::from_toml("[transcode]\ntag_name = \"\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyValue {
                field: "transcode.tag_name"
            })
        ));
    }

    #[test]
    fn test_expand_home() {
        let config = Config::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.music_path(), home.join("media/music"));
        }
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LibraryRoot::existing("music", dir.path().to_path_buf()).is_ok());

        let missing = dir.path().join("nope");
        let err = LibraryRoot::existing("portable", missing).unwrap_err();
        assert!(err.to_string().starts_with("portable directory does not exist"));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Config::default().write_if_absent(&path).unwrap());
        assert!(!Config::default().write_if_absent(&path).unwrap());
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }
}
