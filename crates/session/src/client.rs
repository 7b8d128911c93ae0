use crate::protocol::{Credentials, RequestResult};
use crate::reconciler::{AvatarSink, StateReconciler};
use crate::status::ConnectionStatus;
use crate::transport::{SessionTransport, TransportError};
use gridview_common::config::SessionConfig;
use std::time::Duration;

/// Fixed-period poll timer. Runs until stopped; a late frame does not cause
/// a burst of catch-up polls.
#[derive(Debug, Clone)]
pub struct SessionPoller {
    interval: Duration,
    elapsed: Duration,
    active: bool,
}

impl SessionPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            active: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start polling. The first poll is due immediately.
    pub fn start(&mut self) {
        self.active = true;
        self.elapsed = self.interval;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Advance by `dt`. Returns true when a poll is due.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed -= self.interval;
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
        }
        true
    }
}

/// Drives a [`SessionTransport`] from the frame loop and feeds everything it
/// returns through the [`StateReconciler`].
pub struct SessionClient<T: SessionTransport> {
    transport: T,
    reconciler: StateReconciler,
    poller: SessionPoller,
}

impl<T: SessionTransport> SessionClient<T> {
    pub fn new(transport: T, config: &SessionConfig) -> Self {
        Self {
            transport,
            reconciler: StateReconciler::new(config.region_span, config.chat_history),
            poller: SessionPoller::new(Duration::from_millis(config.poll_interval_ms)),
        }
    }

    pub fn reconciler(&self) -> &StateReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut StateReconciler {
        &mut self.reconciler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Collapse a request outcome: a transport error and a rejected result
    /// both count as failure.
    fn settle(
        &mut self,
        request: &str,
        outcome: Result<RequestResult, TransportError>,
    ) -> Option<RequestResult> {
        match outcome {
            Ok(result) if result.success => Some(result),
            Ok(result) => {
                let reason = result.message.as_deref().unwrap_or("rejected by grid");
                self.reconciler.request_failed(request, reason);
                None
            }
            Err(e) => {
                self.reconciler.request_failed(request, &e.to_string());
                None
            }
        }
    }

    /// Ask the grid to start a session and begin polling.
    pub fn start(&mut self) -> bool {
        let outcome = self.transport.start();
        if self.settle("start", outcome).is_none() {
            return false;
        }
        tracing::info!("session started");
        self.poller.start();
        true
    }

    pub fn login(&mut self, credentials: &Credentials) -> bool {
        let _span = tracing::info_span!("login", user = %credentials.full_name()).entered();
        let outcome = self.transport.login(credentials);
        let Some(result) = self.settle("login", outcome) else {
            return false;
        };
        if let Some(user) = result.user {
            tracing::info!(id = %user.id, "logged in as {}", user.name);
        }
        if !self.poller.is_active() {
            self.poller.start();
        }
        true
    }

    pub fn logout(&mut self) -> bool {
        let outcome = self.transport.logout();
        self.settle("logout", outcome).is_some()
    }

    /// One frame of session work: drain push events, then poll if due.
    pub fn update(&mut self, dt: f32, avatar: &mut dyn AvatarSink) {
        let dt = Duration::from_secs_f32(dt.max(0.0));
        self.transport.advance(dt);

        while let Some(event) = self.transport.poll_push() {
            self.reconciler.apply_push(event, avatar);
        }

        if self.poller.tick(dt) {
            self.poll(avatar);
        }
    }

    /// Fetch and apply a snapshot and the event queue now.
    ///
    /// A failed fetch shows `error` but keeps the poller running; only a
    /// snapshot reporting a terminal status stops it.
    pub fn poll(&mut self, avatar: &mut dyn AvatarSink) {
        let _span = tracing::debug_span!("poll").entered();
        let terminal = match self.transport.fetch_snapshot() {
            Ok(snapshot) => {
                let terminal = snapshot
                    .status
                    .as_deref()
                    .map(ConnectionStatus::parse)
                    .is_some_and(|s| s.is_terminal());
                self.reconciler.apply_snapshot(snapshot, avatar);
                terminal
            }
            Err(e) => {
                self.reconciler.request_failed("poll", &e.to_string());
                false
            }
        };
        match self.transport.fetch_events() {
            Ok(events) => self.reconciler.apply_events(events),
            Err(e) => self.reconciler.request_failed("event poll", &e.to_string()),
        }
        if terminal {
            tracing::info!(status = self.reconciler.status().as_wire(), "polling stopped");
            self.poller.stop();
        }
    }
}
