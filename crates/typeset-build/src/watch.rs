//! Continuous mode - automatic rebuild on file changes
//!
//! `Idle -> Watching -> (Triggered -> Rebuilding -> Watching)* -> Stopped`
//!
//! The loop blocks on a single channel that carries both filesystem events and
//! the stop signal, so a stop request wakes it immediately. Rebuilds run on the
//! loop thread, one at a time; changes that arrive during a rebuild are queued
//! in the channel and evaluated once it finishes.

use crate::config::BuildConfig;
use crate::error::WatchError;
use crate::orchestrator::Orchestrator;
use crate::related::WatchSet;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Settle window after the first change of a burst
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Watch mode configuration
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Quiet period required before a burst of changes triggers a rebuild
    pub debounce: Duration,
    /// Build once before waiting for the first change
    pub initial_build: bool,
    /// Pass compiler output through instead of classifying it
    pub force_verbose: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            initial_build: true,
            force_verbose: true,
        }
    }
}

/// Why the loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Stop was requested
    Cancelled,
    /// A watched directory disappeared
    RegistrationLost,
}

pub(crate) enum Signal {
    Event(notify::Result<Event>),
    Stop,
}

/// Trailing-edge debounce over a burst of change events
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_event: Option<Instant>,
    pending: BTreeSet<PathBuf>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_event: None,
            pending: BTreeSet::new(),
        }
    }

    /// Record a content change
    pub fn record(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path);
        self.last_event = Some(now);
    }

    /// Record a metadata-only change; it only extends a burst already in progress
    pub fn absorb(&mut self, now: Instant) {
        if self.is_pending() {
            self.last_event = Some(now);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// When the pending burst settles, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.last_event.map(|last| last + self.window)
    }

    /// Changed paths of a settled burst, resetting the pending flag
    pub fn take_ready(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_event = None;
                Some(std::mem::take(&mut self.pending).into_iter().collect())
            }
            _ => None,
        }
    }
}

/// Requests the watch loop to stop; clone freely across threads
#[derive(Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    tx: Sender<Signal>,
}

impl StopHandle {
    /// Stop the loop; a blocked wait wakes immediately
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Signal::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether a watch registration is currently held
    pub fn is_watching(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub(crate) trait Registration {
    fn is_valid(&self) -> bool;
}

/// Live watch registration; dropping it unwatches every directory
pub struct WatchSession {
    watcher: RecommendedWatcher,
    dirs: Vec<PathBuf>,
    active: Arc<AtomicBool>,
}

impl WatchSession {
    fn open(
        dirs: &[PathBuf],
        tx: Sender<Signal>,
        active: Arc<AtomicBool>,
    ) -> Result<Self, WatchError> {
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(Signal::Event(res));
        })
        .map_err(WatchError::Create)?;

        let mut registered: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                for done in &registered {
                    let _ = watcher.unwatch(done);
                }
                return Err(WatchError::setup(dir, e));
            }
            debug!(dir = %dir.display(), "registered watch");
            registered.push(dir.clone());
        }

        active.store(true, Ordering::SeqCst);
        Ok(Self {
            watcher,
            dirs: registered,
            active,
        })
    }

    /// Registered directories
    pub fn watched(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl Registration for WatchSession {
    fn is_valid(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.dirs.iter().all(|dir| dir.is_dir())
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        for dir in &self.dirs {
            if let Err(e) = self.watcher.unwatch(dir) {
                debug!(dir = %dir.display(), error = %e, "unwatch failed");
            }
        }
        self.active.store(false, Ordering::SeqCst);
        debug!("watch session closed");
    }
}

/// Rebuilds a document whenever its sources change
pub struct ContinuousWatcher {
    config: BuildConfig,
    options: WatchOptions,
    orchestrator: Orchestrator,
    rx: Receiver<Signal>,
    stop: StopHandle,
}

impl ContinuousWatcher {
    pub fn new(config: BuildConfig, orchestrator: Orchestrator) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            options: WatchOptions::default(),
            orchestrator,
            rx,
            stop: StopHandle {
                stopped: Arc::new(AtomicBool::new(false)),
                active: Arc::new(AtomicBool::new(false)),
                tx,
            },
        }
    }

    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the loop on a dedicated worker thread
    pub fn spawn(
        self,
    ) -> std::io::Result<(StopHandle, JoinHandle<Result<WatchOutcome, WatchError>>)> {
        let handle = self.stop_handle();
        let worker = thread::Builder::new()
            .name("typeset-watch".to_string())
            .spawn(move || self.run())?;
        Ok((handle, worker))
    }

    /// Run the loop on the calling thread until stopped or failed
    ///
    /// Failures are reported to the sink before they are returned.
    pub fn run(self) -> Result<WatchOutcome, WatchError> {
        let result = self.watch();
        match &result {
            Ok(outcome) => info!(?outcome, "watch stopped"),
            Err(e) => self.orchestrator.reporter().watch_failed(e),
        }
        result
    }

    fn watch(&self) -> Result<WatchOutcome, WatchError> {
        if self.stop.is_stopped() {
            return Ok(WatchOutcome::Cancelled);
        }

        let watch_set = WatchSet::resolve(&self.config)?;
        let session = WatchSession::open(
            watch_set.dirs(),
            self.stop.tx.clone(),
            self.stop.active.clone(),
        )?;
        self.orchestrator.reporter().watching(session.watched());

        let build_config = if self.options.force_verbose {
            self.config.with_verbose(true)
        } else {
            self.config.clone()
        };

        if self.options.initial_build {
            self.rebuild(&build_config);
        }

        event_loop(
            &self.rx,
            &self.stop.stopped,
            &|path| watch_set.is_relevant(path),
            &session,
            self.options.debounce,
            |paths| {
                self.orchestrator.reporter().change_detected(paths);
                self.rebuild(&build_config);
            },
        )
    }

    fn rebuild(&self, config: &BuildConfig) {
        if let Err(e) = self.orchestrator.build(config) {
            self.orchestrator.reporter().build_failed(&e);
        }
    }
}

/// Wait for changes, debounce them, and trigger rebuilds until stopped
pub(crate) fn event_loop<F>(
    rx: &Receiver<Signal>,
    stopped: &AtomicBool,
    is_relevant: &dyn Fn(&Path) -> bool,
    registration: &dyn Registration,
    window: Duration,
    mut on_trigger: F,
) -> Result<WatchOutcome, WatchError>
where
    F: FnMut(&[PathBuf]),
{
    let mut debouncer = Debouncer::new(window);

    loop {
        if stopped.load(Ordering::SeqCst) {
            return Ok(WatchOutcome::Cancelled);
        }

        let signal = match debouncer.deadline() {
            None => Some(rx.recv().map_err(|_| WatchError::ChannelClosed)?),
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(signal) => Some(signal),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
                }
            }
        };

        match signal {
            Some(Signal::Stop) => return Ok(WatchOutcome::Cancelled),
            Some(Signal::Event(Err(e))) => return Err(WatchError::Receive(e)),
            Some(Signal::Event(Ok(event))) => {
                let now = Instant::now();
                match classify(&event) {
                    Change::Content => {
                        for path in event.paths.into_iter().filter(|p| is_relevant(p)) {
                            debouncer.record(path, now);
                        }
                    }
                    Change::Metadata => debouncer.absorb(now),
                    Change::Ignored => {}
                }
            }
            None => {}
        }

        if stopped.load(Ordering::SeqCst) {
            return Ok(WatchOutcome::Cancelled);
        }

        if let Some(paths) = debouncer.take_ready(Instant::now()) {
            if !registration.is_valid() {
                return Ok(WatchOutcome::RegistrationLost);
            }
            on_trigger(&paths);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Content,
    Metadata,
    Ignored,
}

fn classify(event: &Event) -> Change {
    // overflow: the backend dropped events and asks for a rescan
    if event.need_rescan() {
        return Change::Ignored;
    }

    match event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => Change::Metadata,
        EventKind::Modify(_) | EventKind::Create(_) => Change::Content,
        EventKind::Access(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => {
            Change::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, Flag, MetadataKind};

    struct Valid(bool);

    impl Registration for Valid {
        fn is_valid(&self) -> bool {
            self.0
        }
    }

    fn modify(path: &str) -> Signal {
        Signal::Event(Ok(Event::new(EventKind::Modify(ModifyKind::Data(
            DataChange::Content,
        )))
        .add_path(PathBuf::from(path))))
    }

    fn metadata(path: &str) -> Signal {
        Signal::Event(Ok(Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime,
        )))
        .add_path(PathBuf::from(path))))
    }

    #[test]
    fn test_debouncer_coalesces_within_window() {
        let window = Duration::from_millis(200);
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(window);

        debouncer.record(PathBuf::from("/d/main.tex"), t0);
        debouncer.record(PathBuf::from("/d/main.tex"), t0 + Duration::from_millis(50));

        assert!(debouncer.take_ready(t0 + Duration::from_millis(100)).is_none());
        let ready = debouncer.take_ready(t0 + Duration::from_millis(250)).unwrap();
        assert_eq!(ready, vec![PathBuf::from("/d/main.tex")]);
        assert!(debouncer.take_ready(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_debouncer_separate_bursts() {
        let window = Duration::from_millis(200);
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(window);
        let mut triggers = 0;

        debouncer.record(PathBuf::from("/d/main.tex"), t0);
        if debouncer.take_ready(t0 + Duration::from_millis(200)).is_some() {
            triggers += 1;
        }
        debouncer.record(PathBuf::from("/d/main.tex"), t0 + Duration::from_millis(500));
        if debouncer.take_ready(t0 + Duration::from_millis(700)).is_some() {
            triggers += 1;
        }

        assert_eq!(triggers, 2);
    }

    #[test]
    fn test_debouncer_metadata_alone_does_not_trigger() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.absorb(t0);
        assert!(!debouncer.is_pending());
        assert!(debouncer.take_ready(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_debouncer_metadata_extends_burst() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.record(PathBuf::from("/d/a.tex"), t0);
        debouncer.absorb(t0 + Duration::from_millis(80));
        assert!(debouncer.take_ready(t0 + Duration::from_millis(120)).is_none());
        assert!(debouncer.take_ready(t0 + Duration::from_millis(180)).is_some());
    }

    #[test]
    fn test_classify() {
        let rescan = Event::new(EventKind::Modify(ModifyKind::Any)).set_flag(Flag::Rescan);
        assert_eq!(classify(&rescan), Change::Ignored);
        assert_eq!(
            classify(&Event::new(EventKind::Create(CreateKind::File))),
            Change::Content
        );
        assert_eq!(
            classify(&Event::new(EventKind::Access(AccessKind::Any))),
            Change::Ignored
        );
        assert_eq!(
            classify(&Event::new(EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Any
            )))),
            Change::Metadata
        );
    }

    #[test]
    fn test_event_loop_coalesces_save_burst() {
        let (tx, rx) = mpsc::channel();
        let stopped = AtomicBool::new(false);
        let mut triggers = Vec::new();

        tx.send(modify("/d/main.tex")).unwrap();
        tx.send(metadata("/d/main.tex")).unwrap();
        tx.send(modify("/d/main.tex")).unwrap();

        let outcome = event_loop(
            &rx,
            &stopped,
            &|_| true,
            &Valid(true),
            Duration::from_millis(50),
            |paths| {
                triggers.push(paths.to_vec());
                let _ = tx.send(Signal::Stop);
            },
        )
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert_eq!(triggers, vec![vec![PathBuf::from("/d/main.tex")]]);
    }

    #[test]
    fn test_event_loop_two_triggers_for_spaced_changes() {
        let (tx, rx) = mpsc::channel();
        let stopped = AtomicBool::new(false);
        let mut triggers = 0;

        tx.send(modify("/d/main.tex")).unwrap();

        let outcome = event_loop(
            &rx,
            &stopped,
            &|_| true,
            &Valid(true),
            Duration::from_millis(30),
            |_| {
                triggers += 1;
                if triggers == 1 {
                    thread::sleep(Duration::from_millis(100));
                    let _ = tx.send(modify("/d/main.tex"));
                } else {
                    let _ = tx.send(Signal::Stop);
                }
            },
        )
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert_eq!(triggers, 2);
    }

    #[test]
    fn test_event_loop_ignores_irrelevant_paths() {
        let (tx, rx) = mpsc::channel();
        let stopped = AtomicBool::new(false);
        let mut triggers = 0;

        tx.send(modify("/d/main.aux")).unwrap();
        tx.send(Signal::Stop).unwrap();

        event_loop(
            &rx,
            &stopped,
            &|p| p.extension().is_some_and(|e| e == "tex"),
            &Valid(true),
            Duration::from_millis(10),
            |_| triggers += 1,
        )
        .unwrap();

        assert_eq!(triggers, 0);
    }

    #[test]
    fn test_event_loop_registration_lost() {
        let (tx, rx) = mpsc::channel();
        let stopped = AtomicBool::new(false);
        tx.send(modify("/d/main.tex")).unwrap();

        let outcome = event_loop(
            &rx,
            &stopped,
            &|_| true,
            &Valid(false),
            Duration::from_millis(10),
            |_| panic!("must not rebuild without a valid registration"),
        )
        .unwrap();

        assert_eq!(outcome, WatchOutcome::RegistrationLost);
    }

    #[test]
    fn test_event_loop_surfaces_watch_errors() {
        let (tx, rx) = mpsc::channel();
        let stopped = AtomicBool::new(false);
        tx.send(Signal::Event(Err(notify::Error::generic("inotify limit"))))
            .unwrap();

        let err = event_loop(
            &rx,
            &stopped,
            &|_| true,
            &Valid(true),
            Duration::from_millis(10),
            |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, WatchError::Receive(_)));
    }

    #[test]
    fn test_event_loop_stop_while_blocked() {
        let (tx, rx) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = StopHandle {
            stopped: stopped.clone(),
            active: Arc::new(AtomicBool::new(true)),
            tx,
        };

        let worker = thread::spawn(move || {
            event_loop(
                &rx,
                &stopped,
                &|_| true,
                &Valid(true),
                Duration::from_millis(100),
                |_| {},
            )
        });

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        handle.stop();
        let outcome = worker.join().unwrap().unwrap();

        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
