//! Threaded session runtime.
//!
//! One worker thread owns the `SessionDriver` and a pose `Sampler`. Speech,
//! taps and lifecycle requests arrive over a channel; the worker interleaves
//! them with pose samples and timer ticks, so every module and the
//! orchestrator only ever see one caller.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use sideline_traits::PoseSource;
use uuid::Uuid;

use crate::config::SamplerCfg;
use crate::driver::{DriverEvent, SessionDriver};
use crate::error::{AssessError, Result};
use crate::modules::SharedClock;
use crate::sampler::Sampler;
use crate::session::{Session, SessionKind};
use crate::timer::CancelToken;
use crate::voice::{DispatchOutcome, TranscriptEvent, VoiceCommand};

/// How pose sampling should be orchestrated
#[derive(Debug, Clone, Copy)]
pub enum SamplingMode {
    /// Event-driven: the source blocks until a pose is ready
    Event,
    /// Rate-paced sampling at given Hz
    Paced(u32),
}

/// Requests into the worker.
#[derive(Debug, Clone)]
pub enum Inbound {
    Transcript(TranscriptEvent),
    Manual(VoiceCommand),
    Gesture(bool),
    Focus(bool),
    Resume,
    RetrySkipped,
    Shutdown,
}

/// What the worker reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Driver(DriverEvent),
    Dispatch(DispatchOutcome),
    Error(AssessError),
}

pub struct SessionRuntime {
    session_id: Uuid,
    tx: xch::Sender<Inbound>,
    events: xch::Receiver<RuntimeEvent>,
    cancel: CancelToken,
    join_handle: Option<JoinHandle<Option<Session>>>,
}

struct Worker<C: sideline_traits::Clock> {
    driver: SessionDriver,
    sampler: Sampler<C>,
    rx: xch::Receiver<Inbound>,
    out: xch::Sender<RuntimeEvent>,
    cancel: CancelToken,
    tick: Duration,
    stall_ms: u64,
}

impl<C: sideline_traits::Clock> Worker<C> {
    fn emit(&self, event: RuntimeEvent) {
        if self.out.send(event).is_err() {
            tracing::trace!("runtime event consumer gone");
        }
    }

    fn report(&self, result: std::result::Result<(), AssessError>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "session request rejected");
            self.emit(RuntimeEvent::Error(e));
        }
    }

    fn handle(&mut self, msg: Inbound) {
        match msg {
            Inbound::Transcript(event) => match self.driver.on_transcript(event) {
                Ok(outcomes) => {
                    for o in outcomes {
                        self.emit(RuntimeEvent::Dispatch(o));
                    }
                }
                Err(e) => self.report(Err(e)),
            },
            Inbound::Manual(command) => match self.driver.on_manual(command) {
                Ok(o) => self.emit(RuntimeEvent::Dispatch(o)),
                Err(e) => self.report(Err(e)),
            },
            Inbound::Gesture(active) => self.driver.set_gesture_active(active),
            Inbound::Focus(focused) => self.driver.on_focus(focused),
            Inbound::Resume => {
                let r = self.driver.resume();
                self.report(r);
            }
            Inbound::RetrySkipped => {
                let r = self.driver.retry_skipped().map(|_| ());
                self.report(r);
            }
            // handled by the loop
            Inbound::Shutdown => {}
        }
    }

    fn run(mut self) -> Option<Session> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("session runtime cancelled");
                let r = self.driver.cancel();
                self.report(r);
                self.flush();
                break;
            }

            match self.rx.recv_timeout(self.tick) {
                Ok(Inbound::Shutdown) | Err(xch::RecvTimeoutError::Disconnected) => {
                    tracing::debug!("session runtime shutting down");
                    break;
                }
                Ok(msg) => self.handle(msg),
                Err(xch::RecvTimeoutError::Timeout) => {}
            }

            for sample in self.sampler.drain() {
                self.driver.on_pose(&sample);
            }
            self.driver
                .on_tracking(self.sampler.stalled_ms() < self.stall_ms);
            let r = self.driver.tick();
            self.report(r);
            self.flush();

            if self.driver.is_finished() {
                tracing::info!("session finished; runtime exiting");
                break;
            }
        }
        let dropped = self.sampler.dropped();
        if dropped > 0 {
            tracing::info!(dropped, "pose samples dropped under backpressure");
        }
        self.driver.session().cloned()
    }

    fn flush(&mut self) {
        for event in self.driver.drain_events() {
            self.emit(RuntimeEvent::Driver(event));
        }
    }
}

impl SessionRuntime {
    /// Start (or resume) a session of `kind` and hand the driver to a worker
    /// thread together with a sampler over `source`.
    pub fn spawn<S: PoseSource + Send + 'static>(
        mut driver: SessionDriver,
        kind: SessionKind,
        source: S,
        mode: SamplingMode,
        sampler_cfg: SamplerCfg,
        tick: Duration,
    ) -> Result<Self> {
        let session_id = driver.start(kind)?;
        let clock: SharedClock = driver.clock();
        let timeout = Duration::from_millis(sampler_cfg.read_timeout_ms);
        let sampler = match mode {
            SamplingMode::Event => {
                Sampler::spawn_event(source, timeout, sampler_cfg.queue_capacity, clock)
            }
            SamplingMode::Paced(hz) => {
                Sampler::spawn(source, hz, timeout, sampler_cfg.queue_capacity, clock)
            }
        };

        let (tx, rx) = xch::unbounded();
        let (out, events) = xch::unbounded();
        let cancel = CancelToken::new();
        let mut worker = Worker {
            driver,
            sampler,
            rx,
            out,
            cancel: cancel.clone(),
            tick: tick.max(Duration::from_millis(1)),
            stall_ms: sampler_cfg.stall_ms,
        };
        // events from `start` predate the thread
        worker.flush();
        let join_handle = std::thread::spawn(move || worker.run());

        Ok(Self {
            session_id,
            tx,
            events,
            cancel,
            join_handle: Some(join_handle),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Sender for other input threads (recognizer, stdin, UI).
    pub fn sender(&self) -> xch::Sender<Inbound> {
        self.tx.clone()
    }

    pub fn events(&self) -> &xch::Receiver<RuntimeEvent> {
        &self.events
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn send(&self, msg: Inbound) -> bool {
        self.tx.send(msg).is_ok()
    }

    /// Whether the worker has stopped (session finished, cancelled or shut down).
    pub fn is_finished(&self) -> bool {
        self.join_handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the worker and return the final session state.
    pub fn finish(mut self) -> Option<Session> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Session> {
        let handle = self.join_handle.take()?;
        let _ = self.tx.send(Inbound::Shutdown);
        match handle.join() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(?e, "session runtime thread panicked");
                None
            }
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
