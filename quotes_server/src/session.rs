//! Streaming sessions: one emission loop per subscribed stream.
//!
//! `StreamingEngine::begin_stream` binds a session thread to an ACTIVE subscription and
//! hands the caller a `QuoteStream`, the receiving end of a rendezvous channel. The
//! session loop:
//!
//! 1. re-checks the subscription in the registry and stops once it is no longer ACTIVE;
//! 2. draws a random quote and hands it over, blocking until the consumer takes it;
//! 3. waits for the emission interval, woken early by a stop signal.
//!
//! Every emission waits for the consumer, so a slow consumer throttles production. A
//! hand-off not taken within the ack timeout, or a dropped `QuoteStream`, means the
//! consumer is gone: the session cancels the subscription itself and exits.
//!
//! After the registry confirmed a cancel, the only quote that can still reach the
//! consumer is one already waiting in step 2; the next pass through step 1 ends the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, select};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use quotes_common::net::{ACK_TIMEOUT_MS, EMISSION_INTERVAL_MS};
use quotes_common::{
    ClientId, Quote, QuoteError, QuoteProvider, Result, SubscriptionId, SubscriptionState,
};
use strum_macros::Display;

use crate::model::registry::SubscriptionRegistry;

const SHARD_COUNT: usize = 16;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a session: `RUNNING -> STOPPING -> STOPPED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Running,
    Stopping,
    Stopped,
}

/// Timing knobs for every session started by an engine.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Pause between two emissions.
    pub interval: Duration,
    /// How long an emission may wait for the consumer before the client is reclaimed.
    pub ack_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(EMISSION_INTERVAL_MS),
            ack_timeout: Duration::from_millis(ACK_TIMEOUT_MS),
        }
    }
}

/// Why a session left RUNNING.
#[derive(Debug)]
enum StopReason {
    /// The registry no longer reports the subscription ACTIVE.
    Inactive,
    /// The gateway signalled a confirmed cancel.
    Signalled,
    /// The `QuoteStream` was dropped.
    ConsumerGone,
    /// The consumer did not take an emission in time.
    AckTimeout,
    /// The quote source failed.
    SourceFailed(QuoteError),
}

/// State shared between a session thread and the engine's bookkeeping.
#[derive(Debug)]
struct SessionShared {
    state: AtomicU8,
    emitted: AtomicU64,
    last_emitted: Mutex<Option<DateTime<Utc>>>,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            emitted: AtomicU64::new(0),
            last_emitted: Mutex::new(None),
        }
    }

    fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => SessionState::Running,
            STOPPING => SessionState::Stopping,
            _ => SessionState::Stopped,
        }
    }

    fn begin_stopping(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire);
    }

    fn record_emission(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        *self.last_emitted.lock() = Some(Utc::now());
    }
}

struct SessionHandle {
    client_id: ClientId,
    stop_tx: Sender<()>,
    shared: Arc<SessionShared>,
}

/// Diagnostic snapshot of a live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub subscription_id: SubscriptionId,
    pub state: SessionState,
    pub emitted: u64,
    pub last_emitted: Option<DateTime<Utc>>,
}

/// Lazy, infinite, non-restartable sequence of quotes for one subscription.
///
/// It ends once the session stops (cancel or disconnect). Dropping it tells the session
/// its consumer is gone.
pub struct QuoteStream {
    subscription_id: SubscriptionId,
    rx: Receiver<Quote>,
}

impl QuoteStream {
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Block for the next quote; `None` once the session has stopped.
    pub fn recv(&self) -> Option<Quote> {
        self.rx.recv().ok()
    }

    /// Wait at most `timeout` for the next quote.
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<Quote, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl Iterator for QuoteStream {
    type Item = Quote;

    fn next(&mut self) -> Option<Quote> {
        self.recv()
    }
}

type SessionShard = Mutex<HashMap<SubscriptionId, SessionHandle>>;

/// Starts sessions and keeps the binding from subscription id to live session.
///
/// Bindings are sharded by subscription id the same way the registry is.
pub struct StreamingEngine {
    provider: Arc<dyn QuoteProvider>,
    registry: Arc<SubscriptionRegistry>,
    sessions: Vec<SessionShard>,
    config: StreamConfig,
}

impl StreamingEngine {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        registry: Arc<SubscriptionRegistry>,
        config: StreamConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            registry,
            sessions: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            config,
        })
    }

    /// Start streaming for `id`.
    ///
    /// Fails with `InvalidSubscription` unless the subscription is ACTIVE, and with
    /// `StreamAlreadyRunning` if a session is already bound to it. No session is created
    /// on failure.
    pub fn begin_stream(self: &Arc<Self>, id: SubscriptionId) -> Result<QuoteStream> {
        let subscription = match self.registry.lookup(id) {
            Some(subscription) if subscription.state == SubscriptionState::Active => subscription,
            _ => {
                debug!("Refusing stream for inactive subscription {}", id);
                return Err(QuoteError::InvalidSubscription(id));
            }
        };

        let (out_tx, out_rx) = bounded::<Quote>(0);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::new(SessionShared::new());
        {
            let mut sessions = self.shard(id).lock();
            if sessions.contains_key(&id) {
                return Err(QuoteError::StreamAlreadyRunning(id));
            }
            sessions.insert(
                id,
                SessionHandle {
                    client_id: subscription.client_id.clone(),
                    stop_tx,
                    shared: Arc::clone(&shared),
                },
            );
        }

        let session = StreamingSession {
            id,
            provider: Arc::clone(&self.provider),
            registry: Arc::clone(&self.registry),
            out: out_tx,
            stop: stop_rx,
            shared: Arc::clone(&shared),
            config: self.config.clone(),
        };
        let engine = Arc::clone(self);
        let binding = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name(format!("session-{}", id))
            .spawn(move || {
                session.run();
                engine.release(id, &binding);
            });

        if let Err(e) = spawned {
            self.release(id, &shared);
            return Err(QuoteError::Io(e));
        }

        info!(
            "Streaming session started for {} (client {})",
            id, subscription.client_id
        );
        Ok(QuoteStream {
            subscription_id: id,
            rx: out_rx,
        })
    }

    /// Ask the session bound to `id` to stop. Returns `false` when no session is bound.
    ///
    /// Does not wait for the session to finish.
    pub fn signal_stop(&self, id: SubscriptionId) -> bool {
        let sessions = self.shard(id).lock();
        match sessions.get(&id) {
            Some(handle) => {
                handle.shared.begin_stopping();
                let _ = handle.stop_tx.try_send(());
                true
            }
            None => false,
        }
    }

    pub fn session_info(&self, id: SubscriptionId) -> Option<SessionInfo> {
        self.shard(id).lock().get(&id).map(|handle| SessionInfo {
            subscription_id: id,
            state: handle.shared.state(),
            emitted: handle.shared.emitted.load(Ordering::Relaxed),
            last_emitted: *handle.shared.last_emitted.lock(),
        })
    }

    /// Number of sessions not yet released.
    pub fn live_sessions(&self) -> usize {
        self.sessions.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Whether `client_id` has a session still handing quotes over.
    ///
    /// A RUNNING session proves its consumer takes emissions: one that stops taking them
    /// is reclaimed after the ack timeout.
    pub fn is_streaming_to(&self, client_id: &ClientId) -> bool {
        self.sessions.iter().any(|shard| {
            shard.lock().values().any(|handle| {
                &handle.client_id == client_id
                    && handle.shared.state() == SessionState::Running
            })
        })
    }

    fn shard(&self, id: SubscriptionId) -> &SessionShard {
        &self.sessions[(id.seq() % SHARD_COUNT as u64) as usize]
    }

    fn release(&self, id: SubscriptionId, shared: &Arc<SessionShared>) {
        let mut sessions = self.shard(id).lock();
        if sessions
            .get(&id)
            .is_some_and(|handle| Arc::ptr_eq(&handle.shared, shared))
        {
            sessions.remove(&id);
        }
    }
}

/// The emission loop bound to one subscription.
struct StreamingSession {
    id: SubscriptionId,
    provider: Arc<dyn QuoteProvider>,
    registry: Arc<SubscriptionRegistry>,
    out: Sender<Quote>,
    stop: Receiver<()>,
    shared: Arc<SessionShared>,
    config: StreamConfig,
}

impl StreamingSession {
    fn run(self) {
        let reason = self.emit_loop();
        self.shared.begin_stopping();

        match reason {
            StopReason::Inactive => {
                info!("Session {} stopping: subscription no longer active", self.id)
            }
            StopReason::Signalled => info!("Session {} stopping: cancel signalled", self.id),
            StopReason::ConsumerGone => self.reclaim("consumer disconnected"),
            StopReason::AckTimeout => self.reclaim(&format!(
                "emission not taken within {:?}",
                self.config.ack_timeout
            )),
            StopReason::SourceFailed(e) => {
                error!("Session {} quote source failed: {}", self.id, e);
                self.reclaim("quote source failed");
            }
        }

        self.shared.state.store(STOPPED, Ordering::Release);
        info!(
            "Session {} stopped after {} emissions",
            self.id,
            self.shared.emitted.load(Ordering::Relaxed)
        );
    }

    /// Treat the consumer as disconnected and cancel on its behalf.
    fn reclaim(&self, cause: &str) {
        let outcome = self.registry.request_cancel(self.id);
        warn!(
            "Reclaiming subscription {}: {} (cancel {})",
            self.id, cause, outcome
        );
    }

    fn emit_loop(&self) -> StopReason {
        loop {
            if !self.registry.is_active(self.id) {
                return StopReason::Inactive;
            }

            let quote = match self.provider.random_quote() {
                Ok(quote) => quote,
                Err(e) => return StopReason::SourceFailed(e),
            };
            let quote_id = quote.id;

            select! {
                send(self.out, quote) -> sent => match sent {
                    Ok(()) => {
                        self.shared.record_emission();
                        debug!("Session {} emitted quote {}", self.id, quote_id);
                    }
                    Err(_) => return StopReason::ConsumerGone,
                },
                recv(self.stop) -> _ => return StopReason::Signalled,
                default(self.config.ack_timeout) => return StopReason::AckTimeout,
            }

            select! {
                recv(self.stop) -> _ => return StopReason::Signalled,
                default(self.config.interval) => {}
            }
        }
    }
}
