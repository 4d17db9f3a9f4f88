//! File-change watching for shader sources
//!
//! The manager only needs one primitive: "drain everything that changed
//! since I last asked, without blocking". [`FileWatcher`] captures that, and
//! [`MtimeWatcher`] implements it by polling modification times, which needs
//! no platform notification API and coalesces rapid edits for free.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

/// Identifier of one watched path within a [`FileWatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(usize);

impl WatchId {
    /// Wraps a watcher-assigned identifier.
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// The watcher-assigned identifier.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// One observed modification of a watched path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Which watch fired.
    pub watch: WatchId,
}

/// A path could not be registered for watching.
#[derive(Debug, Error)]
#[error("failed to watch `{path}`: {source}")]
pub struct WatchError {
    /// The path that failed to register.
    pub path: PathBuf,
    /// Underlying I/O failure.
    #[source]
    pub source: io::Error,
}

/// Non-blocking file-change notification.
pub trait FileWatcher {
    /// Registers `path` for modification watching. Fails if the path cannot
    /// be observed right now (missing file, permissions).
    fn watch(&mut self, path: &Path) -> Result<WatchId, WatchError>;

    /// Appends every change pending since the previous poll to `events`.
    ///
    /// Must not block: a poll with nothing pending appends nothing and
    /// returns immediately.
    fn poll(&mut self, events: &mut Vec<ChangeEvent>);
}

struct WatchedPath {
    path: PathBuf,
    modified: Option<SystemTime>,
}

/// [`FileWatcher`] backed by modification-time polling.
///
/// Each registered path remembers the mtime it was last seen with; a poll
/// reports one event per path whose mtime moved forward, no matter how many
/// writes happened in between. Paths that are momentarily unreadable (an
/// editor mid-rewrite, for instance) are skipped until the next poll.
#[derive(Default)]
pub struct MtimeWatcher {
    paths: Vec<WatchedPath>,
}

impl MtimeWatcher {
    /// Creates a watcher with no registered paths.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileWatcher for MtimeWatcher {
    fn watch(&mut self, path: &Path) -> Result<WatchId, WatchError> {
        let metadata = fs::metadata(path).map_err(|source| WatchError {
            path: path.to_path_buf(),
            source,
        })?;
        let id = WatchId::new(self.paths.len());
        self.paths.push(WatchedPath {
            path: path.to_path_buf(),
            modified: metadata.modified().ok(),
        });
        Ok(id)
    }

    fn poll(&mut self, events: &mut Vec<ChangeEvent>) {
        for (index, watched) in self.paths.iter_mut().enumerate() {
            let Ok(metadata) = fs::metadata(&watched.path) else {
                continue;
            };
            let Ok(current) = metadata.modified() else {
                continue;
            };
            match watched.modified {
                Some(cached) if current > cached => {
                    watched.modified = Some(current);
                    events.push(ChangeEvent {
                        watch: WatchId::new(index),
                    });
                }
                Some(_) => {}
                // First time the filesystem reports a timestamp: record it
                // without treating it as an edit.
                None => watched.modified = Some(current),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    fn touch(path: &Path, contents: &str) {
        // A short pause keeps the new mtime strictly ahead of the cached one
        // even on filesystems with coarse timestamp granularity.
        thread::sleep(Duration::from_millis(50));
        let mut file = File::create(path).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[test]
    fn no_event_without_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.glsl");
        File::create(&path).unwrap();

        let mut watcher = MtimeWatcher::new();
        watcher.watch(&path).unwrap();

        let mut events = Vec::new();
        watcher.poll(&mut events);
        watcher.poll(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn one_event_per_poll_after_a_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.glsl");
        File::create(&path).unwrap();

        let mut watcher = MtimeWatcher::new();
        let id = watcher.watch(&path).unwrap();

        touch(&path, "edited");
        touch(&path, "edited again");

        let mut events = Vec::new();
        watcher.poll(&mut events);
        assert_eq!(events, vec![ChangeEvent { watch: id }]);

        // Both writes coalesced; nothing further is pending.
        events.clear();
        watcher.poll(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn watching_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = MtimeWatcher::new();
        let err = watcher.watch(&dir.path().join("nope.glsl")).unwrap_err();
        assert_eq!(err.path, dir.path().join("nope.glsl"));
    }

    #[test]
    fn watches_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.glsl");
        let b = dir.path().join("b.glsl");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        let mut watcher = MtimeWatcher::new();
        watcher.watch(&a).unwrap();
        let id_b = watcher.watch(&b).unwrap();

        touch(&b, "edited");

        let mut events = Vec::new();
        watcher.poll(&mut events);
        assert_eq!(events, vec![ChangeEvent { watch: id_b }]);
    }
}
