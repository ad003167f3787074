// Explorer module
//
// Keeps the video table in step with what is actually on disk. A pass walks
// the storage roots, upserts new and changed files, queues thumbnails, prunes
// rows whose files are gone and replaces the in-memory cache.

pub mod media;
pub mod walk;


use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::constants::INSERT_CHUNK_SIZE;
use crate::db::query::SelectOptions;
use crate::db::videos::VideoRecord;
use crate::error::Result;
use crate::jobs::TaskExecutor;
use crate::preview::{delete_thumbnail, ThumbnailGenerator};
use crate::store::MetadataStore;
use media::{file_url, stat_video};
use walk::{walk_roots, ExplorationState, WalkSink};

/// A folder to index, e.g. internal storage or an SD card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    pub label: String,
    pub path: PathBuf,
}

impl StorageRoot {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub discovered: usize,
    pub inserted: usize,
    pub refreshed: usize,
    pub thumbnails_queued: usize,
    pub removed: usize,
    pub roots_skipped: usize,
    /// Rows whose upsert failed; retried on the next pass.
    pub failed: usize,
}

pub type FinishedCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct CacheState {
    videos: Vec<VideoRecord>,
    loaded: bool,
    pass_active: bool,
    /// Thumbnails finished while a pass was running, keyed by video path.
    generated: HashMap<String, (String, String)>,
}

type SharedCache = Arc<RwLock<CacheState>>;

fn read_cache(cache: &SharedCache) -> RwLockReadGuard<'_, CacheState> {
    cache.read().unwrap_or_else(|e| e.into_inner())
}

fn write_cache(cache: &SharedCache) -> RwLockWriteGuard<'_, CacheState> {
    cache.write().unwrap_or_else(|e| e.into_inner())
}

pub struct Reconciler {
    store: Arc<dyn MetadataStore>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    executor: TaskExecutor,
    roots: Vec<StorageRoot>,
    cache: SharedCache,
    pass_lock: Mutex<()>,
    on_finished: Option<FinishedCallback>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        executor: TaskExecutor,
        roots: Vec<StorageRoot>,
    ) -> Self {
        Self {
            store,
            thumbnails,
            executor,
            roots,
            cache: Arc::new(RwLock::new(CacheState::default())),
            pass_lock: Mutex::new(()),
            on_finished: None,
        }
    }

    /// Called once per pass when the last entry has been explored.
    pub fn with_finished_callback(mut self, callback: FinishedCallback) -> Self {
        self.on_finished = Some(callback);
        self
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Load every stored row, most recently modified first.
    pub fn load_cached(&self) -> Result<usize> {
        let videos = self.store.fetch(&SelectOptions::recent_first())?;
        let count = videos.len();

        let mut cache = write_cache(&self.cache);
        cache.videos = videos;
        cache.loaded = true;
        Ok(count)
    }

    pub fn cached(&self) -> Vec<VideoRecord> {
        read_cache(&self.cache).videos.clone()
    }

    /// Case-insensitive substring match on name or path.
    pub fn search(&self, keywords: &str) -> Vec<VideoRecord> {
        let needle = keywords.trim().to_lowercase();
        let cache = read_cache(&self.cache);
        if needle.is_empty() {
            return cache.videos.clone();
        }
        cache
            .videos
            .iter()
            .filter(|v| v.name.to_lowercase().contains(&needle) || v.path.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Run one reconciliation pass.
    pub fn explore(&self) -> Result<ReconcileReport> {
        let _pass = self.pass_lock.lock().unwrap_or_else(|e| e.into_inner());
        let _worker = self.executor.begin_pass();

        if !read_cache(&self.cache).loaded {
            self.load_cached()?;
        }

        let cached: HashMap<String, VideoRecord> = {
            let mut cache = write_cache(&self.cache);
            cache.pass_active = true;
            cache.generated.clear();
            cache.videos.iter().map(|v| (v.path.clone(), v.clone())).collect()
        };

        let mut report = ReconcileReport::default();
        let mut roots = Vec::new();
        for root in &self.roots {
            match root.path.canonicalize() {
                Ok(path) => roots.push(path),
                Err(e) => {
                    log::warn!("Skipping storage root {} ({}): {}", root.label, root.path.display(), e);
                    report.roots_skipped += 1;
                }
            }
        }

        log::info!("Exploring {} storage root(s)", roots.len());

        let mut state = ExplorationState::new();
        let mut sink = PassSink {
            reconciler: self,
            cached: &cached,
            discovered: Vec::new(),
            pending: Vec::new(),
            report,
        };
        walk_roots(&roots, &mut state, &mut sink);
        sink.flush();

        let PassSink { mut discovered, mut report, .. } = sink;
        report.discovered = discovered.len();

        let orphans: Vec<&VideoRecord> = cached
            .values()
            .filter(|v| !state.is_explored(Path::new(&v.path)))
            .collect();
        if !orphans.is_empty() {
            let paths: Vec<String> = orphans.iter().map(|v| v.path.clone()).collect();
            match self.store.delete(&paths) {
                Ok(removed) => {
                    report.removed = removed;
                    for orphan in &orphans {
                        if let Some(thumb) = &orphan.thumbnail_path {
                            delete_thumbnail(thumb);
                        }
                    }
                }
                Err(e) => log::error!("Failed to prune {} missing video(s): {}", paths.len(), e),
            }
        }

        // Stable, so equal mtimes keep walk order
        discovered.sort_by(|a, b| b.mtime.cmp(&a.mtime));

        {
            let mut cache = write_cache(&self.cache);
            for video in &mut discovered {
                if let Some((path, url)) = cache.generated.get(&video.path) {
                    video.thumbnail_path = Some(path.clone());
                    video.thumbnail_url = Some(url.clone());
                }
            }
            cache.videos = discovered;
            cache.pass_active = false;
            cache.generated.clear();
        }

        log::info!(
            "Exploration done: {} found, {} new, {} refreshed, {} removed",
            report.discovered,
            report.inserted,
            report.refreshed,
            report.removed
        );
        if report.failed > 0 {
            log::warn!("{} video(s) could not be stored and will be retried", report.failed);
        }
        Ok(report)
    }

    /// Store a freshly recorded video and put it first in the cache.
    ///
    /// The row is keyed by the file's canonical path, the same form a pass
    /// derives from its canonicalized roots. Returns the stored record.
    pub fn add_recorded(&self, video: VideoRecord) -> Result<VideoRecord> {
        let video = match Path::new(&video.path).canonicalize() {
            Ok(canonical) if canonical.as_path() != Path::new(&video.path) => stat_video(&canonical)?,
            _ => video,
        };

        let _pass = self.pass_lock.lock().unwrap_or_else(|e| e.into_inner());

        self.store.insert(std::slice::from_ref(&video))?;
        {
            let mut cache = write_cache(&self.cache);
            cache.videos.retain(|v| v.path != video.path);
            cache.videos.insert(0, video.clone());
        }
        self.queue_thumbnail(video.path.clone());
        Ok(video)
    }

    /// Delete a video's row, its file and its thumbnail.
    /// Returns false when neither a row nor a file existed.
    pub fn delete_video(&self, path: &str) -> Result<bool> {
        let _pass = self.pass_lock.lock().unwrap_or_else(|e| e.into_inner());

        let record = self.store.get(path)?;
        let file_removed = match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let rows_removed = self.store.delete(&[path.to_string()])?;
        if let Some(thumb) = record.as_ref().and_then(|r| r.thumbnail_path.as_deref()) {
            delete_thumbnail(thumb);
        }

        write_cache(&self.cache).videos.retain(|v| v.path != path);

        log::info!("Deleted video {}", path);
        Ok(file_removed || rows_removed > 0)
    }

    fn queue_thumbnail(&self, video_path: String) {
        let store = Arc::clone(&self.store);
        let generator = Arc::clone(&self.thumbnails);
        let cache = Arc::clone(&self.cache);

        self.executor.push(Box::new(move || -> anyhow::Result<()> {
            let thumb = generator.create_thumbnail(Path::new(&video_path))?;
            let thumb_path = thumb.to_string_lossy().to_string();
            let thumb_url = file_url(&thumb);

            if !store.set_thumbnail(&video_path, &thumb_path, &thumb_url)? {
                // Row went away while the frame was being extracted
                delete_thumbnail(&thumb_path);
                return Ok(());
            }

            let mut cache = write_cache(&cache);
            if let Some(video) = cache.videos.iter_mut().find(|v| v.path == video_path) {
                video.thumbnail_path = Some(thumb_path.clone());
                video.thumbnail_url = Some(thumb_url.clone());
            }
            if cache.pass_active {
                cache.generated.insert(video_path, (thumb_path, thumb_url));
            }
            Ok(())
        }));
    }
}

/// Collects one pass's results and writes new rows in chunks.
struct PassSink<'a> {
    reconciler: &'a Reconciler,
    cached: &'a HashMap<String, VideoRecord>,
    discovered: Vec<VideoRecord>,
    pending: Vec<PendingRow>,
    report: ReconcileReport,
}

/// A row waiting for the next chunked upsert.
struct PendingRow {
    video: VideoRecord,
    needs_thumbnail: bool,
    /// False when the row refreshes a cached one.
    new: bool,
}

impl PassSink<'_> {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        let rows: Vec<VideoRecord> = batch.iter().map(|row| row.video.clone()).collect();

        if let Err(e) = self.reconciler.store.insert(&rows) {
            log::error!("Failed to store {} video(s): {}", rows.len(), e);
            self.report.failed += rows.len();
            self.forget(&rows);
            return;
        }

        for row in batch {
            if row.new {
                self.report.inserted += 1;
            } else {
                self.report.refreshed += 1;
            }
            if row.needs_thumbnail {
                self.reconciler.queue_thumbnail(row.video.path);
                self.report.thumbnails_queued += 1;
            }
        }
    }

    /// Roll rows that were not written back to what the store still holds,
    /// so the next pass sees them as new or changed again.
    fn forget(&mut self, rows: &[VideoRecord]) {
        let failed: HashSet<&str> = rows.iter().map(|v| v.path.as_str()).collect();
        let cached = self.cached;
        self.discovered.retain_mut(|video| {
            if !failed.contains(video.path.as_str()) {
                return true;
            }
            match cached.get(&video.path) {
                Some(stored) => {
                    *video = stored.clone();
                    true
                }
                None => false,
            }
        });
    }
}

impl WalkSink for PassSink<'_> {
    fn video(&mut self, mut video: VideoRecord) {
        match self.cached.get(&video.path) {
            None => self.pending.push(PendingRow {
                video: video.clone(),
                needs_thumbnail: true,
                new: true,
            }),
            Some(cached) => {
                video.thumbnail_path = cached.thumbnail_path.clone();
                video.thumbnail_url = cached.thumbnail_url.clone();
                let needs_thumbnail = !cached.has_thumbnail();

                if !cached.is_same_file(&video) {
                    self.pending.push(PendingRow {
                        video: video.clone(),
                        needs_thumbnail,
                        new: false,
                    });
                } else if needs_thumbnail {
                    self.reconciler.queue_thumbnail(video.path.clone());
                    self.report.thumbnails_queued += 1;
                }
            }
        }

        self.discovered.push(video);
        if self.pending.len() >= INSERT_CHUNK_SIZE {
            self.flush();
        }
    }

    fn finished(&mut self) {
        log::debug!("All storage entries explored");
        if let Some(callback) = &self.reconciler.on_finished {
            callback();
        }
    }
}
