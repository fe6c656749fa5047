//! Monitoring engine and the sampling loop that drives it.
//!
//! [`Engine`] is the facade the CLI (or any other front end) talks to. It owns
//! the [`Tracker`], the capture source and at most one [`MonitoringSession`].
//! A session groups everything that only exists while monitoring is active:
//! the region, the open stream and the tick counter. Dropping the session is
//! what stops monitoring.
//!
//! # Driving the engine
//!
//! The engine is plain `&mut self` state. [`spawn_monitor`] moves it into a
//! single tokio task ([`run_monitor`]) that selects between a command channel
//! and a 30 second sampling interval. Every mutation happens inside that task,
//! so appending an outcome and scoring the ensemble can never interleave with
//! another dispatch.
//!
//! ```text
//! MonitorHandle ──EngineCommand──► run_monitor ──► Engine
//!                                      ▲
//!                  interval (30 s) ────┘  only while a session exists
//! ```
//!
//! A capture read in flight never holds up a command. The read is abandoned,
//! the command is served, and the cycle reads again only if the session is
//! still active. A frame that was being read when `Stop` arrived is never
//! classified, and the interval is dropped together with the session so no
//! later tick can fire.

use crate::capture::{CaptureSource, CaptureStream};
use crate::clock::{Clock, TokioClock};
use crate::config::{Sensitivity, DEFAULT_CAPTURE_TIMEOUT_MS, SAMPLING_INTERVAL_MS};
use crate::ensemble::PredictionMethod;
use crate::error::{Result, TwotoneError};
use crate::history::{Outcome, OutcomeEntry};
use crate::tracker::{Dispatch, Tracker, TrackerSnapshot};
use crate::vision::{CaptureRegion, ClassificationSample, RegionClassifier};
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capacity of the command channel between handles and the engine task.
const COMMAND_BUFFER: usize = 32;

// =============================================================================
// Events
// =============================================================================

/// Notifications emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A monitoring session began.
    Started {
        session_id: Uuid,
        region: CaptureRegion,
        sensitivity: Sensitivity,
    },
    /// A sampling cycle classified a frame.
    Tick {
        session_id: Uuid,
        tick: u64,
        sample: ClassificationSample,
        detected: Option<Outcome>,
    },
    /// An outcome, manual or detected, was appended.
    Recorded(OutcomeEntry),
    /// An outcome was dropped by the debounce guard.
    Debounced { outcome: Outcome, since_last_ms: i64 },
    /// A sampling cycle could not read or classify its frame.
    FrameFailed {
        session_id: Uuid,
        tick: u64,
        message: String,
    },
    /// The session ended and its stream was released.
    Stopped { session_id: Uuid, ticks: u64 },
}

/// What a single sampling cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// No session is active.
    Inactive,
    /// Classified, but neither half passed the decision rule.
    NoDetection(ClassificationSample),
    /// Classified and forwarded to the tracker.
    Detected {
        sample: ClassificationSample,
        outcome: Outcome,
        dispatch: Dispatch,
    },
    /// The frame could not be read in time or at all. Monitoring continues.
    FrameFailed(String),
}

// =============================================================================
// Session
// =============================================================================

/// State that exists only while monitoring is active.
///
/// Created by [`Engine::start_monitoring`] and destroyed by
/// [`Engine::stop_monitoring`]. Holding a session implies holding a region
/// and an open stream.
pub struct MonitoringSession {
    id: Uuid,
    region: CaptureRegion,
    stream: Box<dyn CaptureStream>,
    started_at: DateTime<Utc>,
    ticks: u64,
}

impl MonitoringSession {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn region(&self) -> CaptureRegion {
        self.region
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Sampling cycles run so far, failed ones included.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl std::fmt::Debug for MonitoringSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringSession")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("started_at", &self.started_at)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Tracker plus capture plumbing.
pub struct Engine {
    tracker: Tracker,
    source: Box<dyn CaptureSource>,
    clock: Arc<dyn Clock>,
    classifier: RegionClassifier,
    sensitivity: Sensitivity,
    capture_timeout: Duration,
    session: Option<MonitoringSession>,
    events: Option<mpsc::UnboundedSender<MonitorEvent>>,
}

impl Engine {
    /// Creates an idle engine reading frames from `source`.
    ///
    /// Timestamps come from a [`TokioClock`] anchored now.
    pub fn new(source: impl CaptureSource + 'static) -> Self {
        Self {
            tracker: Tracker::new(),
            source: Box::new(source),
            clock: Arc::new(TokioClock::new()),
            classifier: RegionClassifier::new(),
            sensitivity: Sensitivity::default(),
            capture_timeout: Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS),
            session: None,
            events: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound on a single capture read. A read that takes longer counts as a
    /// frame failure for that tick.
    #[must_use]
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Sends every [`MonitorEvent`] to `events`. A closed receiver is ignored.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    // -------------------------------------------------------------------------
    // Outcomes
    // -------------------------------------------------------------------------

    /// Records a manually entered outcome, subject to the debounce guard.
    pub fn add_outcome(&mut self, result: Outcome) -> Dispatch {
        self.dispatch(result)
    }

    /// Empties the history and zeroes every method's counters.
    ///
    /// Monitoring, if active, keeps running.
    pub fn clear_all(&mut self) {
        self.tracker.clear();
    }

    #[must_use]
    pub fn history(&self) -> &[OutcomeEntry] {
        self.tracker.history()
    }

    #[must_use]
    pub fn methods(&self) -> &[PredictionMethod] {
        self.tracker.methods()
    }

    #[must_use]
    pub fn best_method_name(&self) -> &'static str {
        self.tracker.best_method_name()
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.tracker.snapshot()
    }

    // -------------------------------------------------------------------------
    // Monitoring
    // -------------------------------------------------------------------------

    /// Opens the capture stream and begins a session over `region`.
    ///
    /// Nothing changes when this fails.
    ///
    /// # Errors
    ///
    /// - [`TwotoneError::MonitoringActive`] if a session is already running
    /// - [`TwotoneError::InvalidRegion`] if the region is 50 pixels or smaller on a side
    /// - [`TwotoneError::CaptureUnavailable`] if the stream cannot be opened
    pub async fn start_monitoring(
        &mut self,
        region: CaptureRegion,
        sensitivity: Sensitivity,
    ) -> Result<Uuid> {
        if let Some(session) = &self.session {
            return Err(TwotoneError::MonitoringActive {
                session_id: session.id.to_string(),
            });
        }
        region.validate()?;

        let stream = match self.source.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Capture stream unavailable");
                return Err(e);
            }
        };

        let session = MonitoringSession {
            id: Uuid::new_v4(),
            region,
            stream,
            started_at: self.clock.now(),
            ticks: 0,
        };
        let session_id = session.id;
        self.sensitivity = sensitivity;
        self.session = Some(session);

        info!(%session_id, %region, %sensitivity, "Monitoring started");
        self.emit(MonitorEvent::Started {
            session_id,
            region,
            sensitivity,
        });
        Ok(session_id)
    }

    /// Ends the session and releases its stream.
    ///
    /// Returns false if monitoring was not active.
    pub fn stop_monitoring(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        session.stream.release();

        info!(session_id = %session.id, ticks = session.ticks, "Monitoring stopped");
        self.emit(MonitorEvent::Stopped {
            session_id: session.id,
            ticks: session.ticks,
        });
        true
    }

    /// Changes the detection threshold. Applies from the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`TwotoneError::InvalidSensitivity`] for values outside 10..=50
    /// or off the 5-point step. The current value is kept.
    pub fn set_sensitivity(&mut self, value: u32) -> Result<Sensitivity> {
        let sensitivity = Sensitivity::new(value)?;
        self.sensitivity = sensitivity;
        info!(%sensitivity, "Sensitivity changed");
        Ok(sensitivity)
    }

    #[must_use]
    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&MonitoringSession> {
        self.session.as_ref()
    }

    /// Runs one capture, classify and decide cycle.
    ///
    /// A failed or timed out read only affects this cycle.
    pub async fn sample(&mut self) -> SampleOutcome {
        match self.sample_or(std::future::pending::<Infallible>()).await {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Like [`Engine::sample`], but abandons the capture read as soon as
    /// `interrupt` completes and hands back its output.
    ///
    /// An abandoned read leaves no trace: the tick counter is unchanged and
    /// nothing is classified or recorded.
    pub async fn sample_or<T>(
        &mut self,
        interrupt: impl Future<Output = T>,
    ) -> std::result::Result<SampleOutcome, T> {
        let Some(session) = self.session.as_mut() else {
            return Ok(SampleOutcome::Inactive);
        };
        let (session_id, tick, region) = (session.id, session.ticks + 1, session.region);

        let read = tokio::time::timeout(self.capture_timeout, session.stream.read_region(region));
        let read = tokio::select! {
            biased;

            value = interrupt => {
                debug!(%session_id, tick, "Capture read abandoned");
                return Err(value);
            }
            read = read => read,
        };
        session.ticks = tick;

        let raster = match read {
            Ok(Ok(raster)) => raster,
            Ok(Err(e)) => return Ok(self.frame_failed(session_id, tick, &e)),
            Err(_) => {
                let e = TwotoneError::frame(format!(
                    "capture timed out after {}ms",
                    self.capture_timeout.as_millis()
                ));
                return Ok(self.frame_failed(session_id, tick, &e));
            }
        };

        let sample = self.classifier.classify(&raster);
        let detected = sample.decide(self.sensitivity);
        debug!(
            %session_id,
            tick,
            left = sample.left_blue,
            right = sample.right_purple,
            detected = ?detected,
            "Region sampled"
        );
        self.emit(MonitorEvent::Tick {
            session_id,
            tick,
            sample,
            detected,
        });

        Ok(match detected {
            Some(outcome) => SampleOutcome::Detected {
                sample,
                outcome,
                dispatch: self.dispatch(outcome),
            },
            None => SampleOutcome::NoDetection(sample),
        })
    }

    fn frame_failed(&mut self, session_id: Uuid, tick: u64, error: &TwotoneError) -> SampleOutcome {
        if error.is_transient() {
            warn!(%session_id, tick, %error, "Frame skipped");
        } else {
            error!(%session_id, tick, %error, "Frame skipped, capture stream unhealthy");
        }
        let message = error.to_string();
        self.emit(MonitorEvent::FrameFailed {
            session_id,
            tick,
            message: message.clone(),
        });
        SampleOutcome::FrameFailed(message)
    }

    /// The one path into the tracker, shared by manual and detected outcomes.
    fn dispatch(&mut self, result: Outcome) -> Dispatch {
        let dispatch = self.tracker.dispatch(result, self.clock.now());
        match &dispatch {
            Dispatch::Recorded(entry) => self.emit(MonitorEvent::Recorded(entry.clone())),
            Dispatch::Debounced { since_last_ms } => self.emit(MonitorEvent::Debounced {
                outcome: result,
                since_last_ms: *since_last_ms,
            }),
        }
        dispatch
    }

    fn emit(&self, event: MonitorEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

// =============================================================================
// Engine task
// =============================================================================

/// Requests handled by [`run_monitor`].
#[derive(Debug)]
pub enum EngineCommand {
    AddOutcome {
        result: Outcome,
        reply: oneshot::Sender<Dispatch>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Start {
        region: CaptureRegion,
        sensitivity: Sensitivity,
        reply: oneshot::Sender<Result<Uuid>>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    SetSensitivity {
        value: u32,
        reply: oneshot::Sender<Result<Sensitivity>>,
    },
    Snapshot {
        reply: oneshot::Sender<TrackerSnapshot>,
    },
    Shutdown,
}

/// Cloneable front end to an engine running in its own task.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl MonitorHandle {
    pub async fn add_outcome(&self, result: Outcome) -> Result<Dispatch> {
        self.request(|reply| EngineCommand::AddOutcome { result, reply })
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Clear { reply }).await
    }

    pub async fn start(&self, region: CaptureRegion, sensitivity: Sensitivity) -> Result<Uuid> {
        self.request(|reply| EngineCommand::Start {
            region,
            sensitivity,
            reply,
        })
        .await?
    }

    /// Returns false if monitoring was not active.
    pub async fn stop(&self) -> Result<bool> {
        self.request(|reply| EngineCommand::Stop { reply }).await
    }

    pub async fn set_sensitivity(&self, value: u32) -> Result<Sensitivity> {
        self.request(|reply| EngineCommand::SetSensitivity { value, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<TrackerSnapshot> {
        self.request(|reply| EngineCommand::Snapshot { reply }).await
    }

    /// Asks the engine task to stop monitoring and exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| TwotoneError::EngineStopped)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| TwotoneError::EngineStopped)?;
        response.await.map_err(|_| TwotoneError::EngineStopped)
    }
}

/// Moves `engine` into its own task.
///
/// The task ends on [`MonitorHandle::shutdown`] or once every handle is
/// dropped, and hands the engine back through the join handle.
pub fn spawn_monitor(engine: Engine) -> (MonitorHandle, JoinHandle<Engine>) {
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run_monitor(engine, receiver));
    (MonitorHandle { commands }, task)
}

/// The engine loop. Commands take priority over a tick that is due at the
/// same moment.
pub async fn run_monitor(mut engine: Engine, mut commands: mpsc::Receiver<EngineCommand>) -> Engine {
    let mut ticker: Option<(Uuid, Interval)> = None;

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(EngineCommand::Shutdown) | None => break,
                Some(command) => handle_command(&mut engine, command).await,
            },
            _ = next_tick(&mut ticker) => {
                if !run_tick(&mut engine, &mut commands).await {
                    break;
                }
            }
        }

        // the interval lives exactly as long as the session it samples
        let active = engine.session().map(MonitoringSession::id);
        if ticker.as_ref().map(|(id, _)| *id) != active {
            ticker = active.map(|id| (id, sampling_interval()));
        }
    }

    engine.stop_monitoring();
    debug!("Engine task exiting");
    engine
}

/// One sampling cycle. Commands that arrive during the capture read are
/// served at once: the read is abandoned and, unless the command ended the
/// session, started again. Returns false when the task should exit.
async fn run_tick(engine: &mut Engine, commands: &mut mpsc::Receiver<EngineCommand>) -> bool {
    loop {
        match engine.sample_or(commands.recv()).await {
            Ok(_) => return true,
            Err(Some(EngineCommand::Shutdown) | None) => return false,
            Err(Some(command)) => {
                handle_command(engine, command).await;
                if !engine.is_monitoring() {
                    return true;
                }
            }
        }
    }
}

async fn handle_command(engine: &mut Engine, command: EngineCommand) {
    // a dropped reply receiver only means the caller stopped waiting
    match command {
        EngineCommand::AddOutcome { result, reply } => {
            let _ = reply.send(engine.add_outcome(result));
        }
        EngineCommand::Clear { reply } => {
            engine.clear_all();
            let _ = reply.send(());
        }
        EngineCommand::Start {
            region,
            sensitivity,
            reply,
        } => {
            let _ = reply.send(engine.start_monitoring(region, sensitivity).await);
        }
        EngineCommand::Stop { reply } => {
            let _ = reply.send(engine.stop_monitoring());
        }
        EngineCommand::SetSensitivity { value, reply } => {
            let _ = reply.send(engine.set_sensitivity(value));
        }
        EngineCommand::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        EngineCommand::Shutdown => {}
    }
}

/// First tick one full period after monitoring starts.
fn sampling_interval() -> Interval {
    let period = Duration::from_millis(SAMPLING_INTERVAL_MS);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<(Uuid, Interval)>) {
    match ticker {
        Some((_, interval)) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
