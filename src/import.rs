//! Cancellable, bounded-concurrency metadata import.
//!
//! [`ImportPipeline`] populates the [`TrackLibrary`] from candidate paths.
//! At most one job runs at a time: starting a new one cancels and joins its
//! predecessor. Candidates are canonicalized, deduplicated and filtered
//! against the library before a pool of worker threads extracts metadata.
//! Cancellation is cooperative: workers check the flag before extracting
//! and again before contributing their upsert, so a cancelled job leaves
//! only whole records behind.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::library::{TrackLibrary, canonicalize_path, path_key};
use crate::metadata::{TagReader, track_from_path};

/// How an import job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub cancelled: bool,
    /// Tracks actually upserted into the library by this job.
    pub imported: usize,
}

struct ImportJob {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the single in-flight import job, if any.
pub struct ImportPipeline {
    library: Arc<TrackLibrary>,
    reader: Arc<dyn TagReader>,
    max_workers: Option<usize>,
    job: Mutex<Option<ImportJob>>,
}

impl ImportPipeline {
    pub fn new(
        library: Arc<TrackLibrary>,
        reader: Arc<dyn TagReader>,
        max_workers: Option<usize>,
    ) -> Self {
        Self {
            library,
            reader,
            max_workers,
            job: Mutex::new(None),
        }
    }

    fn worker_count(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    /// Start importing `paths` in the background, superseding any job still
    /// in flight. `on_done` fires exactly once when the job finishes
    /// without being cancelled.
    pub fn start(&self, paths: Vec<PathBuf>, on_done: impl FnOnce(ImportOutcome) + Send + 'static) {
        let cancel = Arc::new(AtomicBool::new(false));
        let library = self.library.clone();
        let reader = self.reader.clone();
        let workers = self.worker_count();

        let mut slot = self.job.lock().unwrap();
        if let Some(previous) = slot.take() {
            previous.cancel.store(true, Ordering::Relaxed);
            let _ = previous.handle.join();
        }

        let job_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            let outcome = run_import(&library, reader.as_ref(), paths, &job_cancel, workers);
            if outcome.cancelled {
                debug!("import cancelled after {} tracks", outcome.imported);
            } else {
                debug!("import finished, added {} tracks", outcome.imported);
                on_done(outcome);
            }
        });

        *slot = Some(ImportJob { cancel, handle });
    }

    /// Cancel the current job, if any. Partial progress is kept.
    pub fn cancel(&self) {
        let mut slot = self.job.lock().unwrap();
        if let Some(job) = slot.take() {
            debug!("import cancelled by caller");
            job.cancel.store(true, Ordering::Relaxed);
            let _ = job.handle.join();
        }
    }

    /// Import `paths` on the calling thread (same worker pool), used by
    /// state restore where completion ordering matters. Supersedes any
    /// background job first.
    pub fn run_blocking(&self, paths: Vec<PathBuf>) -> ImportOutcome {
        self.cancel();
        let cancel = AtomicBool::new(false);
        run_import(
            &self.library,
            self.reader.as_ref(),
            paths,
            &cancel,
            self.worker_count(),
        )
    }

    /// Cancel and join the current job on teardown.
    pub fn shutdown(&self) {
        self.cancel();
    }
}

impl Drop for ImportPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_import(
    library: &TrackLibrary,
    reader: &dyn TagReader,
    paths: Vec<PathBuf>,
    cancel: &AtomicBool,
    workers: usize,
) -> ImportOutcome {
    // Canonicalize, drop duplicates, drop paths the library already knows.
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending: VecDeque<PathBuf> = VecDeque::new();
    for path in paths {
        if path.as_os_str().is_empty() {
            continue;
        }
        let canonical = canonicalize_path(&path);
        if seen.insert(path_key(&canonical)) && !library.contains(&canonical) {
            pending.push_back(canonical);
        }
    }

    debug!("import starting: {} candidate paths", pending.len());

    let imported = AtomicUsize::new(0);
    if !pending.is_empty() {
        let workers = workers.min(pending.len()).max(1);
        let queue = Mutex::new(pending);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let Some(path) = queue.lock().unwrap().pop_front() else {
                            break;
                        };
                        let track = track_from_path(reader, &path);
                        // A cancelled worker stops contributing; the upsert
                        // itself is atomic per track.
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        library.upsert(track);
                        imported.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
    }

    let outcome = ImportOutcome {
        cancelled: cancel.load(Ordering::Relaxed),
        imported: imported.into_inner(),
    };
    if outcome.cancelled && outcome.imported > 0 {
        warn!("keeping {} tracks from a cancelled import", outcome.imported);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::metadata::{LoftyReader, TrackTags};
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Reader that sleeps per file so cancellation can land mid-batch.
    struct SlowReader {
        delay: Duration,
        reads: AtomicUsize,
    }

    impl SlowReader {
        fn new(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                reads: AtomicUsize::new(0),
            })
        }
    }

    impl TagReader for SlowReader {
        fn read_tags(&self, _path: &Path) -> Result<TrackTags> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            std::thread::sleep(self.delay);
            Ok(TrackTags {
                title: Some("Slow".into()),
                ..TrackTags::default()
            })
        }
    }

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/music/{i}.mp3"))).collect()
    }

    #[test]
    fn run_blocking_dedupes_and_skips_known_paths() {
        let library = Arc::new(TrackLibrary::new());
        library.upsert(crate::library::testing::track("/music/0.mp3", "Existing"));
        let pipeline = ImportPipeline::new(library.clone(), SlowReader::new(0), Some(2));

        let mut input = paths(3);
        input.push(PathBuf::from("/music/1.MP3")); // duplicate, different case
        input.push(PathBuf::from("")); // blank, ignored
        let outcome = pipeline.run_blocking(input);

        assert!(!outcome.cancelled);
        assert_eq!(outcome.imported, 2); // 1.mp3 and 2.mp3
        assert_eq!(library.len(), 3);
        // the pre-existing record was not overwritten
        assert_eq!(
            library.get(Path::new("/music/0.mp3")).unwrap().title,
            "Existing"
        );
    }

    #[test]
    fn background_job_reports_completion_once() {
        let library = Arc::new(TrackLibrary::new());
        let pipeline = ImportPipeline::new(library.clone(), SlowReader::new(1), Some(4));

        let (tx, rx) = mpsc::channel();
        pipeline.start(paths(8), move |outcome| tx.send(outcome).unwrap());

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.imported, 8);
        assert_eq!(library.len(), 8);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn cancel_keeps_partial_progress_and_suppresses_completion() {
        let library = Arc::new(TrackLibrary::new());
        let reader = SlowReader::new(20);
        let pipeline = ImportPipeline::new(library.clone(), reader.clone(), Some(1));

        let (tx, rx) = mpsc::channel();
        pipeline.start(paths(50), move |outcome| tx.send(outcome).unwrap());
        std::thread::sleep(Duration::from_millis(60));
        pipeline.cancel();

        // completion hook never fires for a cancelled job
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(library.len() < 50);
        // whatever landed before the cancel is a whole record
        for track in library.snapshot() {
            assert_eq!(track.title, "Slow");
        }
    }

    #[test]
    fn superseding_job_stops_the_previous_one_first() {
        let library = Arc::new(TrackLibrary::new());
        let reader = SlowReader::new(10);
        let pipeline = ImportPipeline::new(library.clone(), reader.clone(), Some(1));

        pipeline.start(paths(100), |_| {});
        std::thread::sleep(Duration::from_millis(30));

        let (tx, rx) = mpsc::channel();
        let batch_b: Vec<PathBuf> = (0..3)
            .map(|i| PathBuf::from(format!("/other/{i}.mp3")))
            .collect();
        pipeline.start(batch_b, move |outcome| tx.send(outcome).unwrap());

        // start() joined job A before spawning B, so A's contribution is
        // frozen from here on.
        let after_supersede = library
            .paths()
            .iter()
            .filter(|p| p.starts_with("/music"))
            .count();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.imported, 3);
        let final_a = library
            .paths()
            .iter()
            .filter(|p| p.starts_with("/music"))
            .count();
        assert_eq!(after_supersede, final_a);
        assert!(final_a < 100);
    }

    #[test]
    fn broken_files_degrade_to_fallback_records() {
        let dir = tempdir().unwrap();
        let good_name = dir.path().join("My Song.mp3");
        fs::write(&good_name, b"not really audio").unwrap();

        let library = Arc::new(TrackLibrary::new());
        let pipeline = ImportPipeline::new(library.clone(), Arc::new(LoftyReader), None);
        let outcome = pipeline.run_blocking(vec![good_name.clone()]);

        assert_eq!(outcome.imported, 1);
        let track = library.get(&good_name).unwrap();
        assert_eq!(track.title, "My Song");
        assert_eq!(track.artist, crate::metadata::UNKNOWN_ARTIST);
    }
}
