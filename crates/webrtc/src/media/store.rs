//! Managed video asset directory and the shared "selected video" cell

use crate::{Error, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Filename extensions recognized as video assets
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "ivf", "mkv", "mov", "mp4"];

/// The managed directory of stored video files
#[derive(Debug, Clone)]
pub struct VideoStore {
    root: PathBuf,
}

impl VideoStore {
    /// Create a store over `root`. The directory is not touched until
    /// [`VideoStore::ensure_exists`] is called.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the managed directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the managed directory if it does not exist
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// List recognized video filenames, lexicographically sorted
    ///
    /// A missing or unreadable directory lists as empty rather than erroring;
    /// asset listing must never take a session down.
    pub fn list(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.root.display(), error = %e, "cannot list video directory");
                return Vec::new();
            }
        };

        let mut videos: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                Path::new(name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        videos.sort();
        videos
    }

    /// Resolve a plain filename to a path inside the managed directory
    ///
    /// Rejects names carrying path separators or parent components, and
    /// errors (naming the file) if the asset does not exist.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || Path::new(name).file_name() != Some(std::ffi::OsStr::new(name)) {
            return Err(Error::InvalidVideoName(name.to_string()));
        }

        let path = self.root.join(name);
        if !path.is_file() {
            return Err(Error::VideoNotFound(name.to_string()));
        }

        Ok(path)
    }
}

/// Shared "currently selected video" cell
///
/// Written only on the negotiation scheduler thread (a "start stream" step),
/// read from dispatch tasks and subsequent offers. An explicit cell passed by
/// reference rather than process-global state, so independent registries can
/// run in parallel under test.
#[derive(Debug, Clone, Default)]
pub struct SelectedVideo {
    inner: Arc<RwLock<Option<PathBuf>>>,
}

impl SelectedVideo {
    /// Empty cell; no video selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a video path for subsequent offers
    pub fn set(&self, path: PathBuf) {
        debug!(path = %path.display(), "selected video path");
        *self.inner.write() = Some(path);
    }

    /// Currently selected path, if any
    pub fn get(&self) -> Option<PathBuf> {
        self.inner.read().clone()
    }

    /// Clear the selection
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp4"), b"x").unwrap();
        fs::write(dir.path().join("a.avi"), b"x").unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let store = VideoStore::new(dir.path());
        assert_eq!(store.list(), vec!["a.avi".to_string(), "b.mp4".to_string()]);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(dir.path().join("nope"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_list_is_case_insensitive_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CLIP.MP4"), b"x").unwrap();

        let store = VideoStore::new(dir.path());
        assert_eq!(store.list(), vec!["CLIP.MP4".to_string()]);
    }

    #[test]
    fn test_resolve_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip.ivf"), b"x").unwrap();

        let store = VideoStore::new(dir.path());
        let path = store.resolve("clip.ivf").unwrap();
        assert_eq!(path, dir.path().join("clip.ivf"));
    }

    #[test]
    fn test_resolve_missing_file_names_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(dir.path());

        let err = store.resolve("ghost.mp4").unwrap_err();
        assert!(err.to_string().contains("ghost.mp4"));
    }

    #[test]
    fn test_resolve_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(dir.path());

        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("sub/clip.mp4").is_err());
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_ensure_exists_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(dir.path().join("videos"));
        store.ensure_exists().unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_selected_video_cell() {
        let selected = SelectedVideo::new();
        assert!(selected.get().is_none());

        selected.set(PathBuf::from("/tmp/a.ivf"));
        assert_eq!(selected.get(), Some(PathBuf::from("/tmp/a.ivf")));

        selected.clear();
        assert!(selected.get().is_none());
    }
}
