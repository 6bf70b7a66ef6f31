//! Background pose sampling.
//!
//! Spawns a thread that owns the `PoseSource`, pushes samples into a bounded
//! channel, and tracks the last-ok timestamp so the consumer can detect
//! tracking loss. When the consumer falls behind, the oldest queued sample is
//! dropped to make room for the newest.
//!
//! Each `Sampler` spawns exactly one thread, shut down and joined on drop.
use crossbeam_channel as xch;
use sideline_traits::{Clock, PoseSample, PoseSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct Sampler<C: Clock> {
    rx: xch::Receiver<PoseSample>,
    last_ok: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    clock: C,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

struct Worker<S, C> {
    source: S,
    clock: C,
    epoch: Instant,
    timeout: Duration,
    period: Option<Duration>,
    tx: xch::Sender<PoseSample>,
    /// Producer-side handle used to evict the oldest sample when full.
    evict: xch::Receiver<PoseSample>,
    last_ok: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl<S: PoseSource, C: Clock> Worker<S, C> {
    fn run(mut self) {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::debug!("pose sampler received shutdown signal");
                break;
            }

            match self.source.read(self.timeout) {
                Ok(sample) => {
                    if !self.push(sample) {
                        tracing::debug!("pose sampler consumer disconnected, exiting thread");
                        break;
                    }
                    let now = self.clock.ms_since(self.epoch);
                    // 0 is reserved for "never"
                    self.last_ok.store(now.max(1), Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::trace!(error = %e, "pose read failed");
                }
            }

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            if let Some(period) = self.period {
                self.clock.sleep(period);
            }
        }
        tracing::trace!("pose sampler thread exiting cleanly");
    }

    /// Returns `false` once the consumer is gone.
    fn push(&self, sample: PoseSample) -> bool {
        let mut pending = sample;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return true,
                Err(xch::TrySendError::Disconnected(_)) => return false,
                Err(xch::TrySendError::Full(back)) => {
                    pending = back;
                    if self.evict.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }
}

impl<C: Clock + Clone + Send + Sync + 'static> Sampler<C> {
    /// Paced sampler: reads at `hz` samples per second.
    pub fn spawn<S: PoseSource + Send + 'static>(
        source: S,
        hz: u32,
        timeout: Duration,
        capacity: usize,
        clock: C,
    ) -> Self {
        let period = Duration::from_micros(crate::util::period_us(hz));
        Self::start(source, Some(period), timeout, capacity, clock)
    }

    /// Event-driven sampler: relies on the source blocking until data is ready.
    pub fn spawn_event<S: PoseSource + Send + 'static>(
        source: S,
        timeout: Duration,
        capacity: usize,
        clock: C,
    ) -> Self {
        Self::start(source, None, timeout, capacity, clock)
    }

    fn start<S: PoseSource + Send + 'static>(
        source: S,
        period: Option<Duration>,
        timeout: Duration,
        capacity: usize,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let last_ok = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));
        let epoch = clock.now();

        let worker = Worker {
            source,
            clock: clock.clone(),
            epoch,
            timeout,
            period,
            tx,
            evict: rx.clone(),
            last_ok: last_ok.clone(),
            dropped: dropped.clone(),
            shutdown: shutdown.clone(),
        };
        let join_handle = std::thread::spawn(move || worker.run());

        Self {
            rx,
            last_ok,
            dropped,
            clock,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl<C: Clock> Sampler<C> {
    /// All samples queued since the last drain, oldest first.
    pub fn drain(&self) -> Vec<PoseSample> {
        self.rx.try_iter().collect()
    }

    pub fn latest(&self) -> Option<PoseSample> {
        self.rx.try_iter().last()
    }

    /// Samples discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Milliseconds since the last good read, measured with the sampler's clock.
    pub fn stalled_ms(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }
}

impl<C: Clock> Drop for Sampler<C> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits after its current read returns (bounded by the
        // read timeout) or immediately if it is between reads.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("pose sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "pose sampler thread panicked during shutdown");
                }
            }
        }
    }
}
