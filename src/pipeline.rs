//! Pipeline coordinator
//!
//! Enumerates candidate files, feeds them to a fixed pool of worker threads
//! and drains results in completion order. Only the coordinator talks to the
//! sink, and every file is owned by exactly one worker, so a record path is
//! never written concurrently.

use crate::builder::{ChunkBuilder, TopLevelPolicy};
use crate::cache::IncrementalCache;
use crate::chunk::Chunk;
use crate::ignore::discover_files;
use crate::sink::{self, CacheRecord, ChunkSink};
use crate::status::{StatusBoard, StatusReporter, WorkerId};
use crate::ui::Monitor;
use crate::worker::{panic_message, CollaboratorFactory, Collaborators, FileOutcome, FileResult, WorkerContext};
use crate::{Error, Result};
use crossbeam::channel::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Worker count when none is configured
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    /// Ignore the cache and reprocess everything
    pub force: bool,
    pub provenance: bool,
    pub top_level: TopLevelPolicy,
    /// Show the live monitor
    pub monitor: bool,
    /// Candidate extensions; empty accepts every file
    pub extensions: Vec<String>,
    /// Extra gitignore-style patterns
    pub excludes: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            force: false,
            provenance: true,
            top_level: TopLevelPolicy::default(),
            monitor: false,
            extensions: vec!["java".to_string()],
            excludes: Vec::new(),
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub processed: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub errored: usize,
    /// Chunks persisted, children included
    pub chunks_written: usize,
    pub elapsed: Duration,
    /// The run was stopped before every file was dispatched
    pub interrupted: bool,
    /// `(file, reason)` for every failed file
    pub errors: Vec<(String, String)>,
}

impl RunSummary {
    /// Completed, but with per-file errors
    pub fn has_errors(&self) -> bool {
        self.errored > 0
    }

    fn record_error(&mut self, file_path: &str, reason: impl Into<String>) {
        self.errored += 1;
        self.errors.push((file_path.to_string(), reason.into()));
    }
}

pub struct Pipeline {
    root: PathBuf,
    sink: Arc<dyn ChunkSink>,
    options: PipelineOptions,
    stop: Arc<AtomicBool>,
    factory: CollaboratorFactory,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, sink: Arc<dyn ChunkSink>, options: PipelineOptions) -> Self {
        let provenance = options.provenance;
        Self {
            root: root.into(),
            sink,
            options,
            stop: Arc::new(AtomicBool::new(false)),
            factory: Arc::new(move || Collaborators::standard(provenance)),
        }
    }

    /// Replace the per-worker collaborator factory
    pub fn with_collaborators(mut self, factory: CollaboratorFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Share an externally owned stop flag
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Setting this flag stops dispatch; in-flight files still complete
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run the pipeline to completion.
    ///
    /// Only configuration problems (unreadable root, unwritable destination)
    /// are returned as errors; per-file failures are counted in the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        self.validate()?;

        let files = discover_files(&self.root, &self.options.extensions, &self.options.excludes);
        let workers = self.options.workers.max(1);
        tracing::info!(
            "Chunking {} files under {} with {} workers",
            files.len(),
            self.root.display(),
            workers
        );

        let mut summary = RunSummary {
            discovered: files.len(),
            ..Default::default()
        };

        let board = StatusBoard::start(workers);
        let monitor = self
            .options
            .monitor
            .then(|| Monitor::start(files.len(), workers, board.viewer()));
        let cache = IncrementalCache::new(self.sink.clone()).with_force(self.options.force);
        let builder = ChunkBuilder::new(self.options.top_level);

        let (job_tx, job_rx) = channel::bounded::<PathBuf>(workers);
        let (result_tx, result_rx) = channel::unbounded::<(WorkerId, FileResult)>();

        let interrupted = thread::scope(|scope| {
            let stop = &self.stop;
            let feeder = scope.spawn(move || {
                for path in files {
                    if stop.load(Ordering::SeqCst) {
                        return true;
                    }
                    if job_tx.send(path).is_err() {
                        break;
                    }
                }
                false
            });

            for index in 0..workers {
                let worker = WorkerId(index);
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let reporter = board.reporter(worker);
                let builder = builder.clone();
                let cache = cache.clone();

                let spawned = thread::Builder::new()
                    .name(worker.to_string())
                    .spawn_scoped(scope, move || self.work(worker, jobs, results, reporter, builder, cache));
                if let Err(e) = spawned {
                    tracing::error!("Failed to start {}: {}", worker, e);
                }
            }
            drop(job_rx);
            drop(result_tx);

            let reporters: Vec<StatusReporter> = (0..workers).map(|i| board.reporter(WorkerId(i))).collect();
            for (worker, result) in result_rx {
                let file_path = result.file_path.clone();
                self.consume(&mut summary, result);
                reporters[worker.0].release(&file_path);
                if let Some(monitor) = &monitor {
                    monitor.advance();
                }
            }

            feeder.join().unwrap_or(false)
        });

        if let Some(monitor) = monitor {
            monitor.finish();
        }

        summary.interrupted = interrupted;
        summary.elapsed = started.elapsed();
        tracing::info!(
            "Run finished in {:?}: {} processed, {} skipped, {} errored",
            summary.elapsed,
            summary.processed,
            summary.skipped,
            summary.errored
        );
        Ok(summary)
    }

    fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::Config(format!("{} is not a directory", self.root.display())));
        }
        std::fs::read_dir(&self.root)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", self.root.display(), e)))?;
        sink::ensure_writable(self.sink.destination())
    }

    /// Worker thread body; a panic rebuilds the context and fails only that file
    fn work(
        &self,
        worker: WorkerId,
        jobs: Receiver<PathBuf>,
        results: Sender<(WorkerId, FileResult)>,
        reporter: StatusReporter,
        builder: ChunkBuilder,
        cache: IncrementalCache,
    ) {
        let new_context = || {
            WorkerContext::new(
                self.root.clone(),
                &self.factory,
                builder.clone(),
                cache.clone(),
                Some(reporter.clone()),
            )
        };
        let mut context = new_context();

        for path in jobs {
            let file_path = context.relative_path(&path);
            let result = match panic::catch_unwind(AssertUnwindSafe(|| context.process_file(&path))) {
                Ok(result) => result,
                Err(payload) => {
                    let reason = format!("worker panicked: {}", panic_message(payload.as_ref()));
                    tracing::error!("{} failed on {}: {}", worker, file_path, reason);
                    reporter.error(&file_path, reason.as_str());
                    context = new_context();
                    FileResult::failed(file_path, reason)
                }
            };

            if results.send((worker, result)).is_err() {
                break;
            }
        }
    }

    fn consume(&self, summary: &mut RunSummary, result: FileResult) {
        match result.outcome {
            FileOutcome::Processed => {
                let record = CacheRecord {
                    source_checksum: result.checksum.unwrap_or_default(),
                    file_path: result.file_path,
                    chunks: result.chunks,
                };
                match self.sink.write(&record) {
                    Ok(()) => {
                        summary.processed += 1;
                        summary.chunks_written += record.chunks.iter().map(Chunk::tree_len).sum::<usize>();
                    }
                    Err(e) => {
                        tracing::warn!("Failed to write chunks for {}: {}", record.file_path, e);
                        summary.record_error(&record.file_path, e.to_string());
                    }
                }
            }
            FileOutcome::Cached => summary.skipped += 1,
            FileOutcome::Unsupported => summary.unsupported += 1,
            FileOutcome::Failed(reason) => summary.record_error(&result.file_path, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{JavaParser, ParserRegistry, StructuralParser};
    use crate::chunk::ParsedResult;
    use crate::deps;
    use crate::sink::JsonSink;
    use crate::worker::stable_metadata;

    enum Sabotage {
        Fail,
        Panic,
    }

    /// Java parser that breaks on one file name
    struct SabotagedParser {
        inner: JavaParser,
        target: &'static str,
        sabotage: Sabotage,
    }

    impl StructuralParser for SabotagedParser {
        fn language_name(&self) -> &str { "java" }
        fn file_extensions(&self) -> &[&str] { &["java"] }
        fn parse(&mut self, source: &[u8], file_path: &str) -> Result<ParsedResult> {
            if file_path.ends_with(self.target) {
                match self.sabotage {
                    Sabotage::Fail => return Err(Error::Parse("synthetic failure".into())),
                    Sabotage::Panic => panic!("synthetic panic"),
                }
            }
            self.inner.parse(source, file_path)
        }
    }

    fn sabotaged(target: &'static str, sabotage: fn() -> Sabotage) -> CollaboratorFactory {
        Arc::new(move || {
            let mut parsers = ParserRegistry::new();
            parsers.register(SabotagedParser {
                inner: JavaParser::new()?,
                target,
                sabotage: sabotage(),
            });
            Ok(Collaborators::new(parsers, deps::default_resolvers()))
        })
    }

    /// Java parser that raises the run's stop flag while parsing one file
    struct StoppingParser {
        inner: JavaParser,
        target: &'static str,
        stop: Arc<AtomicBool>,
    }

    impl StructuralParser for StoppingParser {
        fn language_name(&self) -> &str { "java" }
        fn file_extensions(&self) -> &[&str] { &["java"] }
        fn parse(&mut self, source: &[u8], file_path: &str) -> Result<ParsedResult> {
            if file_path.ends_with(self.target) {
                self.stop.store(true, Ordering::SeqCst);
            }
            self.inner.parse(source, file_path)
        }
    }

    /// Sink that refuses one file
    struct RefusingSink {
        inner: JsonSink,
        refuse: &'static str,
    }

    impl ChunkSink for RefusingSink {
        fn format_name(&self) -> &str { "refusing" }
        fn destination(&self) -> &Path { self.inner.destination() }
        fn record_path(&self, file_path: &str) -> PathBuf { self.inner.record_path(file_path) }
        fn write(&self, record: &CacheRecord) -> Result<()> {
            if record.file_path == self.refuse {
                return Err(Error::Sink("disk full".into()));
            }
            self.inner.write(record)
        }
        fn read_checksum(&self, file_path: &str) -> Result<Option<String>> {
            self.inner.read_checksum(file_path)
        }
    }

    fn options(workers: usize) -> PipelineOptions {
        PipelineOptions {
            workers,
            provenance: false,
            ..Default::default()
        }
    }

    fn write_sources(root: &Path) {
        write_classes(root, &["A", "B", "C"]);
    }

    fn write_classes(root: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(
                root.join(format!("{}.java", name)),
                format!("class {} {{\n  void run() {{}}\n}}\n", name),
            )
            .unwrap();
        }
    }

    #[test]
    fn test_run_writes_records() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let sink = Arc::new(JsonSink::new(out.path()));
        let summary = Pipeline::new(src.path(), sink.clone(), options(2)).run().unwrap();

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.chunks_written, 6);
        assert!(!summary.has_errors());
        assert!(!summary.interrupted);

        let record = sink.read_record("B.java").unwrap();
        assert_eq!(record.chunks[0].id, "B.java::B");
        assert_eq!(record.chunks[0].children[0].id, "B.java::B::run");
    }

    #[test]
    fn test_isolation_under_failure() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let sink = Arc::new(JsonSink::new(out.path()));
        let summary = Pipeline::new(src.path(), sink.clone(), options(2))
            .with_collaborators(sabotaged("B.java", || Sabotage::Fail))
            .run()
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].0, "B.java");
        assert!(summary.errors[0].1.contains("synthetic failure"));
        assert!(summary.has_errors());
        assert!(!summary.interrupted);

        assert!(sink.record_path("A.java").is_file());
        assert!(!sink.record_path("B.java").exists());
        assert!(sink.record_path("C.java").is_file());
    }

    #[test]
    fn test_panic_is_isolated() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let sink = Arc::new(JsonSink::new(out.path()));
        let summary = Pipeline::new(src.path(), sink.clone(), options(1))
            .with_collaborators(sabotaged("B.java", || Sabotage::Panic))
            .run()
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errored, 1);
        assert!(summary.errors[0].1.contains("synthetic panic"));
        assert!(sink.record_path("C.java").is_file());
    }

    #[test]
    fn test_rerun_skips_unchanged_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());
        let sink = Arc::new(JsonSink::new(out.path()));

        let first = Pipeline::new(src.path(), sink.clone(), options(2)).run().unwrap();
        assert_eq!(first.processed, 3);

        let second = Pipeline::new(src.path(), sink.clone(), options(2)).run().unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 3);

        let file = src.path().join("A.java");
        let mut bytes = std::fs::read(&file).unwrap();
        bytes.push(b'\n');
        std::fs::write(&file, &bytes).unwrap();

        let third = Pipeline::new(src.path(), sink.clone(), options(2)).run().unwrap();
        assert_eq!(third.processed, 1);
        assert_eq!(third.skipped, 2);
        assert_eq!(
            sink.read_checksum("A.java").unwrap(),
            Some(crate::cache::checksum(&bytes))
        );
    }

    #[test]
    fn test_force_reprocesses_everything() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());
        let sink = Arc::new(JsonSink::new(out.path()));

        Pipeline::new(src.path(), sink.clone(), options(2)).run().unwrap();
        let forced = PipelineOptions { force: true, ..options(2) };
        let summary = Pipeline::new(src.path(), sink, forced).run().unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_unsupported_is_not_an_error() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("A.java"), "class A {}").unwrap();
        std::fs::write(src.path().join("notes.md"), "# notes").unwrap();

        let all_files = PipelineOptions { extensions: Vec::new(), ..options(2) };
        let summary = Pipeline::new(src.path(), Arc::new(JsonSink::new(out.path())), all_files)
            .run()
            .unwrap();

        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.unsupported, 1);
        assert_eq!(summary.errored, 0);
    }

    #[test]
    fn test_sink_failure_is_counted() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let sink = Arc::new(RefusingSink {
            inner: JsonSink::new(out.path()),
            refuse: "A.java",
        });
        let summary = Pipeline::new(src.path(), sink, options(2)).run().unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.errors[0].0, "A.java");
        assert!(summary.errors[0].1.contains("disk full"));
    }

    #[test]
    fn test_stop_flag_prevents_dispatch() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let pipeline = Pipeline::new(src.path(), Arc::new(JsonSink::new(out.path())), options(2));
        pipeline.stop_flag().store(true, Ordering::SeqCst);
        let summary = pipeline.run().unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.processed, 0);
    }

    #[test]
    fn test_stop_during_run_finishes_in_flight_files() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_classes(src.path(), &["A", "B", "C", "D", "E"]);

        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let factory: CollaboratorFactory = Arc::new(move || {
            let mut parsers = ParserRegistry::new();
            parsers.register(StoppingParser {
                inner: JavaParser::new()?,
                target: "B.java",
                stop: flag.clone(),
            });
            Ok(Collaborators::new(parsers, deps::default_resolvers()))
        });

        let sink = Arc::new(JsonSink::new(out.path()));
        let summary = Pipeline::new(src.path(), sink.clone(), options(1))
            .with_collaborators(factory)
            .with_stop_flag(stop)
            .run()
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.discovered, 5);
        assert!(sink.record_path("A.java").is_file());
        assert!(sink.record_path("B.java").is_file());
        // E is only offered after C has been taken, which is after the flag went up
        assert!(!sink.record_path("E.java").exists());

        let written = ["A", "B", "C", "D", "E"]
            .iter()
            .filter(|name| sink.record_path(&format!("{}.java", name)).is_file())
            .count();
        assert_eq!(summary.processed + summary.skipped + summary.errored, written);
        assert_eq!(summary.processed, written);

        let leftovers: Vec<_> = std::fs::read_dir(out.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_panicking_factory_does_not_abort_run() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_sources(src.path());

        let tripped = Arc::new(AtomicBool::new(false));
        let factory: CollaboratorFactory = Arc::new(move || {
            if !tripped.swap(true, Ordering::SeqCst) {
                panic!("grammar exploded");
            }
            Collaborators::standard(false)
        });

        let summary = Pipeline::new(src.path(), Arc::new(JsonSink::new(out.path())), options(2))
            .with_collaborators(factory)
            .run()
            .unwrap();

        assert_eq!(summary.processed + summary.errored, 3);
        assert!(summary.errors.iter().all(|(_, reason)| reason.contains("grammar exploded")));
    }

    #[test]
    fn test_degraded_worker_still_counts_unsupported() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("A.java"), "class A {}").unwrap();
        std::fs::write(src.path().join("notes.md"), "# notes").unwrap();

        let factory: CollaboratorFactory = Arc::new(|| Err(Error::Adapter("grammar missing".into())));
        let all_files = PipelineOptions { extensions: Vec::new(), ..options(1) };
        let summary = Pipeline::new(src.path(), Arc::new(JsonSink::new(out.path())), all_files)
            .with_collaborators(factory)
            .run()
            .unwrap();

        assert_eq!(summary.unsupported, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.errors[0].0, "A.java");
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new("/definitely/not/here", Arc::new(JsonSink::new(out.path())), options(1));
        assert!(matches!(pipeline.run(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unwritable_destination_is_config_error() {
        let src = tempfile::tempdir().unwrap();
        write_sources(src.path());
        let blocker = src.path().join("A.java");

        let pipeline = Pipeline::new(src.path(), Arc::new(JsonSink::new(blocker.join("out"))), options(1));
        assert!(matches!(pipeline.run(), Err(Error::Config(_))));
    }

    #[test]
    fn test_output_independent_of_worker_count() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("pkg")).unwrap();
        write_sources(src.path());
        std::fs::write(
            src.path().join("pkg/D.java"),
            "package pkg;\nimport java.util.List;\nclass D { List<String> a() { return null; } void a(int x) {} }\n",
        )
        .unwrap();

        let serial_out = tempfile::tempdir().unwrap();
        let parallel_out = tempfile::tempdir().unwrap();
        let serial = Arc::new(JsonSink::new(serial_out.path()));
        let parallel = Arc::new(JsonSink::new(parallel_out.path()));

        Pipeline::new(src.path(), serial.clone(), options(1)).run().unwrap();
        Pipeline::new(src.path(), parallel.clone(), options(4)).run().unwrap();

        let strip = |mut chunks: Vec<Chunk>| {
            for chunk in &mut chunks {
                chunk.metadata = stable_metadata(&chunk.metadata);
            }
            chunks
        };
        for file in ["A.java", "B.java", "C.java", "pkg/D.java"] {
            let a = serial.read_record(file).unwrap();
            let b = parallel.read_record(file).unwrap();
            assert_eq!(a.source_checksum, b.source_checksum);
            assert_eq!(strip(a.chunks), strip(b.chunks));
        }
    }
}
