//! Non-blocking vision engine.
//!
//! `VisionEngine::submit_frame` is called from the capture callback and never waits:
//! it applies the frame-interval throttle, claims the single in-flight slot with a
//! compare-exchange and hands the frame to the worker thread through a capacity-1
//! channel. The worker runs a `FrameAnalyzer` pass, publishes the result into a
//! latest-value slot if it changed, and releases the slot.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use crate::analyzer::{EngineSettings, FrameAnalyzer};
use crate::detect::{DetectionResult, SharedClassifier, VisionBackend};
use crate::frame::Frame;

/// What happened to a submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not an Nth frame.
    Skipped,
    /// A pass was already in flight.
    DroppedBusy,
    /// Handed to the worker.
    Accepted,
    /// The engine has been stopped.
    Stopped,
}

#[derive(Default)]
struct EngineStats {
    received: AtomicU64,
    skipped: AtomicU64,
    dropped_busy: AtomicU64,
    processed: AtomicU64,
    published: AtomicU64,
}

/// Point-in-time copy of the engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatsSnapshot {
    pub received: u64,
    pub skipped: u64,
    pub dropped_busy: u64,
    pub processed: u64,
    pub published: u64,
}

impl EngineStats {
    fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }
}

struct SlotState {
    result: DetectionResult,
    version: u64,
}

/// Single-slot latest-value broadcast.
///
/// Holds only the most recently published result. Readers either take the current
/// value or block until the version moves past one they have already seen.
pub struct ResultSlot {
    state: Mutex<SlotState>,
    changed: Condvar,
}

impl ResultSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                result: DetectionResult::empty(),
                version: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Store `result` and wake waiters, unless it equals the current value.
    fn publish_if_changed(&self, result: DetectionResult) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.result == result {
            return false;
        }
        state.result = result;
        state.version += 1;
        drop(state);
        self.changed.notify_all();
        true
    }

    fn latest(&self) -> (u64, DetectionResult) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.version, state.result.clone())
    }

    fn wait_for_update(&self, seen_version: u64, timeout: Duration) -> Option<(u64, DetectionResult)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| s.version == seen_version)
            .unwrap_or_else(PoisonError::into_inner);
        if state.version == seen_version {
            return None;
        }
        Some((state.version, state.result.clone()))
    }
}

/// Read handle on the engine's published results. Cheap to clone; outlives the
/// engine.
#[derive(Clone)]
pub struct ResultWatcher {
    slot: Arc<ResultSlot>,
}

impl ResultWatcher {
    /// Most recently published result (empty before the first publication).
    pub fn latest(&self) -> DetectionResult {
        self.slot.latest().1
    }

    /// Version of the latest result; starts at 0 and grows by one per publication.
    pub fn version(&self) -> u64 {
        self.slot.latest().0
    }

    /// Block until a result newer than `seen_version` is published, or `timeout`
    /// elapses.
    pub fn wait_for_update(
        &self,
        seen_version: u64,
        timeout: Duration,
    ) -> Option<(u64, DetectionResult)> {
        self.slot.wait_for_update(seen_version, timeout)
    }
}

/// Owns the inference worker thread.
pub struct VisionEngine {
    frame_interval: u64,
    frame_counter: AtomicU64,
    busy: Arc<AtomicBool>,
    sender: Option<SyncSender<Frame>>,
    slot: Arc<ResultSlot>,
    stats: Arc<EngineStats>,
    join: Option<JoinHandle<()>>,
}

impl VisionEngine {
    /// Warm up the backend and start the worker thread.
    pub fn spawn(
        settings: EngineSettings,
        backend: Box<dyn VisionBackend>,
        classifier: Option<SharedClassifier>,
    ) -> Result<Self> {
        if settings.frame_interval == 0 {
            bail!("frame_interval must be at least 1");
        }
        let frame_interval = u64::from(settings.frame_interval);

        let mut analyzer = FrameAnalyzer::new(backend, classifier, settings);
        analyzer
            .warm_up()
            .with_context(|| format!("failed to warm up backend {}", analyzer.backend_name()))?;
        log::info!(
            "vision engine starting: backend={}, frame_interval={}",
            analyzer.backend_name(),
            frame_interval
        );

        let (sender, receiver) = mpsc::sync_channel::<Frame>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(ResultSlot::new());
        let stats = Arc::new(EngineStats::default());

        let worker_busy = busy.clone();
        let worker_slot = slot.clone();
        let worker_stats = stats.clone();
        let join = thread::Builder::new()
            .name("vision-engine".to_string())
            .spawn(move || run_worker(analyzer, receiver, worker_busy, worker_slot, worker_stats))
            .context("failed to spawn vision engine thread")?;

        Ok(Self {
            frame_interval,
            frame_counter: AtomicU64::new(0),
            busy,
            sender: Some(sender),
            slot,
            stats,
            join: Some(join),
        })
    }

    /// Offer a frame to the engine. Never blocks.
    pub fn submit_frame(&self, frame: Frame) -> SubmitOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let index = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        if index % self.frame_interval != 0 {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Skipped;
        }

        let Some(sender) = self.sender.as_ref() else {
            return SubmitOutcome::Stopped;
        };

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.dropped_busy.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::DroppedBusy;
        }

        match sender.try_send(frame) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                self.stats.dropped_busy.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::DroppedBusy
            }
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                SubmitOutcome::Stopped
            }
        }
    }

    pub fn subscribe(&self) -> ResultWatcher {
        ResultWatcher {
            slot: self.slot.clone(),
        }
    }

    pub fn latest_result(&self) -> DetectionResult {
        self.slot.latest().1
    }

    /// True while a pass is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the frame channel and wait for the in-flight pass to finish.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.sender.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("vision engine thread panicked"))?;
            log::info!("vision engine stopped: {:?}", self.stats.snapshot());
        }
        Ok(())
    }
}

impl Drop for VisionEngine {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("{}", err);
        }
    }
}

fn run_worker(
    mut analyzer: FrameAnalyzer,
    receiver: Receiver<Frame>,
    busy: Arc<AtomicBool>,
    slot: Arc<ResultSlot>,
    stats: Arc<EngineStats>,
) {
    for frame in receiver {
        let sequence = frame.sequence;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&frame.view())));
        drop(frame);

        match outcome {
            Ok(result) => {
                if slot.publish_if_changed(result) {
                    stats.published.fetch_add(1, Ordering::Relaxed);
                    log::debug!("published detection result for frame {}", sequence);
                }
            }
            Err(_) => log::error!("analysis pass panicked on frame {}", sequence),
        }

        stats.processed.fetch_add(1, Ordering::Relaxed);
        busy.store(false, Ordering::Release);
    }
}
