// Storage walk
//
// Depth-first listing of the storage roots. Every directory listing announces
// how many entries it holds and every entry is marked explored once handled,
// so the pass is complete exactly when the two totals meet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::media::{is_video_file, video_from_metadata};
use crate::constants::{HIDDEN_PREFIX, RESERVED_DIR_NAMES};
use crate::db::videos::VideoRecord;

/// Per-pass bookkeeping.
#[derive(Debug, Default)]
pub struct ExplorationState {
    total_counts: Vec<usize>,
    explored: HashSet<PathBuf>,
    duplicates: usize,
    finished: bool,
}

impl ExplorationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announce(&mut self, count: usize) {
        self.total_counts.push(count);
    }

    /// Returns false when the path was already explored; the extra
    /// announcement is then retracted.
    pub fn mark_explored(&mut self, path: &Path) -> bool {
        let inserted = self.explored.insert(path.to_path_buf());
        if !inserted {
            self.duplicates += 1;
        }
        inserted
    }

    pub fn is_explored(&self, path: &Path) -> bool {
        self.explored.contains(path)
    }

    pub fn announced(&self) -> usize {
        self.total_counts
            .iter()
            .sum::<usize>()
            .saturating_sub(self.duplicates)
    }

    pub fn is_complete(&self) -> bool {
        self.announced() == self.explored.len()
    }

    /// True the first time the pass is seen complete, false afterwards.
    pub fn take_finish(&mut self) -> bool {
        if !self.finished && self.is_complete() {
            self.finished = true;
            return true;
        }
        false
    }

    pub fn explored_paths(&self) -> &HashSet<PathBuf> {
        &self.explored
    }
}

/// Receives walk results as they are found.
pub trait WalkSink {
    fn video(&mut self, video: VideoRecord);
    fn finished(&mut self);
}

/// Hidden entries and platform folders are never descended into.
pub fn is_skipped_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX) || RESERVED_DIR_NAMES.contains(&name)
}

/// Walk every root. Roots must already be canonical.
pub fn walk_roots(roots: &[PathBuf], state: &mut ExplorationState, sink: &mut dyn WalkSink) {
    // Announce all roots up front so completion waits for the last one
    for _ in roots {
        state.announce(1);
    }

    let mut walk = Walk { state, sink };
    for root in roots {
        walk.root(root);
    }

    // No roots at all still completes the pass
    walk.check_finished();
}

struct Walk<'a> {
    state: &'a mut ExplorationState,
    sink: &'a mut dyn WalkSink,
}

impl Walk<'_> {
    fn root(&mut self, root: &Path) {
        if !self.state.is_explored(root) {
            if root.is_dir() {
                self.directory(root);
            } else if is_video_file(root) {
                self.file(root);
            }
        }
        self.mark(root);
    }

    fn directory(&mut self, dir: &Path) {
        let entries = list_directory(dir);
        self.state.announce(entries.len());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            let file_type = entry.file_type();

            if is_skipped_name(&name) {
                // Not descended
            } else if file_type.is_dir() {
                if !self.state.is_explored(path) {
                    self.directory(path);
                }
            } else if file_type.is_file() {
                if is_video_file(path) {
                    self.file(path);
                }
            } else {
                log::debug!("Skipping non-regular entry {}", path.display());
            }

            self.mark(path);
        }
    }

    fn file(&mut self, path: &Path) {
        match std::fs::metadata(path) {
            Ok(metadata) => self.sink.video(video_from_metadata(path, &metadata)),
            Err(e) => log::warn!("Failed to stat {}: {}", path.display(), e),
        }
    }

    fn mark(&mut self, path: &Path) {
        self.state.mark_explored(path);
        self.check_finished();
    }

    fn check_finished(&mut self) {
        if self.state.take_finish() {
            self.sink.finished();
        }
    }
}

/// Direct children of `dir`, sorted by file name. Unreadable directories
/// yield nothing; unreadable entries are dropped.
fn list_directory(dir: &Path) -> Vec<DirEntry> {
    let mut entries = Vec::new();

    for result in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        match result {
            Ok(entry) => entries.push(entry),
            Err(e) if e.depth() == 0 => {
                log::warn!("Failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
            Err(e) => log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        videos: Vec<String>,
        finished: usize,
        // Number of videos seen when the completion fired
        finished_after: Option<usize>,
    }

    impl WalkSink for Collect {
        fn video(&mut self, video: VideoRecord) {
            self.videos.push(video.name);
        }

        fn finished(&mut self) {
            self.finished += 1;
            self.finished_after = Some(self.videos.len());
        }
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"data").unwrap();
    }

    fn canonical(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().canonicalize().unwrap()
    }

    #[test]
    fn test_walk_finds_videos_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(&dir);
        touch(&root.join("a.mp4"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/deeper/b.MOV"));
        touch(&root.join(".hidden/c.mp4"));
        touch(&root.join("Android/data/d.mp4"));
        touch(&root.join(".e.mp4"));

        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[root.clone()], &mut state, &mut sink);

        assert_eq!(sink.videos, vec!["a.mp4", "b.MOV"]);
        assert_eq!(sink.finished, 1);
        assert_eq!(sink.finished_after, Some(2));
        assert!(state.is_complete());
        assert!(state.is_explored(&root.join(".hidden")));
        assert!(!state.is_explored(&root.join(".hidden/c.mp4")));
        assert!(state.is_explored(&root.join("sub/deeper/b.MOV")));
    }

    #[test]
    fn test_completion_fires_once_after_last_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&canonical(&first).join("one.mp4"));
        touch(&canonical(&second).join("x/two.mp4"));
        touch(&canonical(&second).join("x/three.mp4"));

        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[canonical(&first), canonical(&second)], &mut state, &mut sink);

        assert_eq!(sink.finished, 1);
        assert_eq!(sink.finished_after, Some(3));
    }

    #[test]
    fn test_overlapping_roots_complete() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(&dir);
        touch(&root.join("inner/a.mp4"));

        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[root.clone(), root.join("inner"), root.clone()], &mut state, &mut sink);

        assert_eq!(sink.videos, vec!["a.mp4"]);
        assert_eq!(sink.finished, 1);
        assert!(state.is_complete());
    }

    #[test]
    fn test_no_roots_completes() {
        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[], &mut state, &mut sink);
        assert_eq!(sink.finished, 1);
    }

    #[test]
    fn test_empty_and_missing_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(&dir);

        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[root.clone(), root.join("gone")], &mut state, &mut sink);

        assert!(sink.videos.is_empty());
        assert_eq!(sink.finished, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical(&dir);
        touch(&root.join("real/a.mp4"));
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let mut state = ExplorationState::new();
        let mut sink = Collect::default();
        walk_roots(&[root.clone()], &mut state, &mut sink);

        assert_eq!(sink.videos, vec!["a.mp4"]);
        assert!(state.is_explored(&root.join("link")));
        assert!(!state.is_explored(&root.join("link/a.mp4")));
    }

    #[test]
    fn test_state_duplicates() {
        let mut state = ExplorationState::new();
        state.announce(2);
        assert!(state.mark_explored(Path::new("/a")));
        assert!(!state.take_finish());
        assert!(!state.mark_explored(Path::new("/a")));
        assert!(state.take_finish());
        assert!(!state.take_finish());
    }
}
