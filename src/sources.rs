//! Track discovery: resolves a job prefix to the ordered list of audio files
//! uploaded under it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::audio::decode::{extension_of, normalize_extension};
use crate::error::{MixtapeError, Result};

/// Resolves a job prefix to its input tracks.
pub trait TrackSource: Send + Sync + 'static {
    /// Ordered track paths for `prefix`. An empty list is a valid answer;
    /// callers decide whether it is an error.
    fn list_tracks(&self, prefix: &str) -> Result<Vec<PathBuf>>;

    /// Where the tracks for `prefix` live, for error messages.
    fn location(&self, prefix: &str) -> PathBuf;
}

/// Tracks stored as files in `<root>/<prefix>/`.
#[derive(Debug, Clone)]
pub struct DirectoryTrackSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryTrackSource {
    /// Tracks live in `root/<prefix>`; only files with one of `extensions` count.
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let mut extensions: Vec<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
        extensions.sort();
        extensions.dedup();
        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_allowed(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        !ext.is_empty() && self.extensions.iter().any(|allowed| *allowed == ext)
    }
}

impl TrackSource for DirectoryTrackSource {
    /// Allow-listed files sorted by file name, so the same upload folder
    /// always yields the same mix order.
    fn list_tracks(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        validate_prefix(prefix)?;
        let folder = self.location(prefix);
        if !folder.is_dir() {
            return Err(MixtapeError::MissingFolder(folder));
        }

        let mut tracks = Vec::new();
        for entry in fs::read_dir(&folder)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.is_allowed(&path) {
                tracks.push(path);
            }
        }
        tracks.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        debug!(folder = %folder.display(), count = tracks.len(), "discovered tracks");
        Ok(tracks)
    }

    fn location(&self, prefix: &str) -> PathBuf {
        self.root.join(prefix)
    }
}

/// A prefix names one folder directly under the upload root.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Err(MixtapeError::InvalidRequest("job prefix must not be empty".into()));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
        return Err(MixtapeError::InvalidRequest(format!(
            "job prefix `{prefix}` must be a single folder name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_exts() -> Vec<String> {
        ["mp3", "wav", "flac"].iter().map(|s| s.to_string()).collect()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn lists_allowed_files_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("set1");
        fs::create_dir(&folder).unwrap();
        for name in ["c.mp3", "a.WAV", "b.flac", "cover.png", "notes.txt", "10.mp3", "2.mp3"] {
            touch(&folder, name);
        }
        fs::create_dir(folder.join("z.mp3")).unwrap();

        let source = DirectoryTrackSource::new(root.path(), &default_exts());
        let names: Vec<String> = source
            .list_tracks("set1")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10.mp3", "2.mp3", "a.WAV", "b.flac", "c.mp3"]);
    }

    #[test]
    fn empty_folder_yields_empty_list() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("empty")).unwrap();
        touch(&root.path().join("empty"), "readme.md");

        let source = DirectoryTrackSource::new(root.path(), &default_exts());
        assert!(source.list_tracks("empty").unwrap().is_empty());
    }

    #[test]
    fn missing_folder_is_an_input_error() {
        let root = tempfile::tempdir().unwrap();
        let source = DirectoryTrackSource::new(root.path(), &default_exts());
        let err = source.list_tracks("nope").unwrap_err();
        assert!(matches!(err, MixtapeError::MissingFolder(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }

    #[test]
    fn extensions_are_normalized() {
        let source = DirectoryTrackSource::new("uploads", &[".MP3".to_string(), "mp3".to_string()]);
        assert_eq!(source.extensions, vec!["mp3"]);
        assert!(source.is_allowed(Path::new("x.Mp3")));
        assert!(!source.is_allowed(Path::new("mp3")));
    }

    #[test]
    fn prefixes_cannot_escape_the_root() {
        assert!(validate_prefix("mix-2024").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("..").is_err());
        assert!(validate_prefix("../etc").is_err());
        assert!(validate_prefix("a/b").is_err());
    }
}
