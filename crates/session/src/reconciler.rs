//! Merges pushed events, polled snapshots and the polled event queue into a
//! single [`SessionView`].

use crate::protocol::{LogLevel, PushEvent, QueuedEvent, SessionSnapshot, UserInfo};
use crate::status::{ConnectionStatus, StatusMachine};
use glam::Vec3;
use gridview_common::{Observers, Subscription, wire_to_scene};
use std::collections::VecDeque;

/// Receives avatar placements decided by the reconciler.
pub trait AvatarSink {
    /// `position` is already in scene space.
    fn place_avatar(&mut self, position: Vec3);
}

/// A user-facing log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: String,
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub from: String,
    pub message: String,
}

/// Minimap marker in percent of the region span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapMarker {
    pub x: f32,
    pub y: f32,
}

impl MinimapMarker {
    pub fn from_wire(position: [f32; 3], region_span: f32) -> Self {
        Self {
            x: position[0] / region_span * 100.0,
            y: position[1] / region_span * 100.0,
        }
    }
}

/// What the UI renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub logged_in: bool,
    pub user: Option<UserInfo>,
    pub region: Option<String>,
    /// Wire axes.
    pub position: Option<[f32; 3]>,
    pub minimap: Option<MinimapMarker>,
    pub chat: VecDeque<ChatLine>,
}

pub struct StateReconciler {
    status: StatusMachine,
    view: SessionView,
    region_span: f32,
    chat_capacity: usize,
    /// Last position reported by the grid, to tell a server move from a
    /// repeated report of where the avatar already was placed.
    last_server_position: Option<[f32; 3]>,
    /// Text from a login/logout event, shown instead of the status label
    /// until the status next changes.
    status_note: Option<String>,
    log_observers: Observers<LogEntry>,
    status_observers: Observers<ConnectionStatus>,
}

impl StateReconciler {
    pub fn new(region_span: f32, chat_capacity: usize) -> Self {
        Self {
            status: StatusMachine::new(),
            view: SessionView::default(),
            region_span,
            chat_capacity,
            last_server_position: None,
            status_note: None,
            log_observers: Observers::new(),
            status_observers: Observers::new(),
        }
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.status.current()
    }

    pub fn status_label(&self) -> &str {
        self.status_note
            .as_deref()
            .unwrap_or_else(|| self.status.current().label())
    }

    /// The grid has ended the session. A failed request alone never does.
    pub fn session_ended(&self) -> bool {
        self.status.has_ended()
    }

    pub fn on_log(&mut self, listener: impl FnMut(&LogEntry) + 'static) -> Subscription {
        self.log_observers.subscribe(listener)
    }

    pub fn on_status(&mut self, listener: impl FnMut(&ConnectionStatus) + 'static) -> Subscription {
        self.status_observers.subscribe(listener)
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);
        match level {
            LogLevel::Error => tracing::error!(target: "grid", "{}", entry.message),
            LogLevel::Warning => tracing::warn!(target: "grid", "{}", entry.message),
            LogLevel::Debug => tracing::debug!(target: "grid", "{}", entry.message),
            LogLevel::Info => tracing::info!(target: "grid", "{}", entry.message),
        }
        self.log_observers.emit(&entry);
    }

    /// Apply a server-reported status.
    pub fn apply_status(&mut self, status: ConnectionStatus) -> bool {
        let changed = self.status.apply(status);
        if changed {
            self.status_note = None;
            let current = self.status.current().clone();
            self.status_observers.emit(&current);
        }
        changed
    }

    /// A request failed or was rejected: status `error` and one log line.
    /// The next status from the grid replaces the error.
    pub fn request_failed(&mut self, request: &str, reason: &str) {
        self.log(LogLevel::Error, format!("{request} failed: {reason}"));
        if self.status.fail() {
            self.status_note = None;
            let current = self.status.current().clone();
            self.status_observers.emit(&current);
        }
    }

    fn set_server_position(&mut self, position: [f32; 3], avatar: &mut dyn AvatarSink) {
        self.view.position = Some(position);
        self.view.minimap = Some(MinimapMarker::from_wire(position, self.region_span));
        if self.last_server_position != Some(position) {
            avatar.place_avatar(wire_to_scene(position));
            self.last_server_position = Some(position);
        }
    }

    // --- Push channel ---

    pub fn apply_push(&mut self, event: PushEvent, avatar: &mut dyn AvatarSink) {
        match event {
            PushEvent::ChatMessage { from, message } => {
                self.log(LogLevel::Info, format!("[{from}] {message}"));
                if self.chat_capacity > 0 {
                    if self.view.chat.len() == self.chat_capacity {
                        self.view.chat.pop_front();
                    }
                    self.view.chat.push_back(ChatLine { from, message });
                }
            }
            PushEvent::StatusUpdate { status } => {
                self.apply_status(ConnectionStatus::parse(&status));
            }
            PushEvent::Teleport { region, position } => {
                self.apply_teleport(region, position, avatar);
            }
        }
    }

    /// Idempotent: re-applying the same region and position leaves the view
    /// unchanged. Each delivery still logs one line.
    pub fn apply_teleport(
        &mut self,
        region: String,
        position: Option<[f32; 3]>,
        avatar: &mut dyn AvatarSink,
    ) {
        let _span = tracing::info_span!("teleport", region = %region).entered();
        let message = match position {
            Some([x, y, z]) => format!("Teleported to {region} ({x}, {y}, {z})"),
            None => format!("Teleported to {region}"),
        };
        self.view.region = Some(region);
        if let Some(position) = position {
            // Always move on teleport, even if the last report matched.
            self.last_server_position = None;
            self.set_server_position(position, avatar);
        }
        self.log(LogLevel::Info, message);
    }

    // --- Polled snapshot ---

    /// Replace the session summary with `snapshot`. The avatar only moves if
    /// the snapshot carries a position the grid has not reported before.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot, avatar: &mut dyn AvatarSink) {
        if let Some(status) = snapshot.status.as_deref() {
            self.apply_status(ConnectionStatus::parse(status));
        }
        self.view.logged_in = snapshot.logged_in;
        self.view.user = snapshot.user;
        self.view.region = snapshot.current_region;
        if let Some(position) = snapshot.position {
            self.set_server_position(position, avatar);
        }
    }

    // --- Polled event queue ---

    /// Apply queued events in order. Chat and teleport already arrive on the
    /// push channel and are skipped here.
    pub fn apply_events(&mut self, events: Vec<QueuedEvent>) {
        for event in events {
            match event {
                QueuedEvent::Log { message, level } => self.log(level, message),
                QueuedEvent::Chat { .. } | QueuedEvent::Teleport { .. } => {}
                // Text only: the status itself arrives from the grid.
                QueuedEvent::Login { message } | QueuedEvent::Logout { message } => {
                    self.status_note = Some(message.clone());
                    self.log(LogLevel::Info, message);
                }
                QueuedEvent::Unknown => tracing::debug!("skipping unknown queued event"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Placements(Vec<Vec3>);

    impl AvatarSink for Placements {
        fn place_avatar(&mut self, position: Vec3) {
            self.0.push(position);
        }
    }

    fn reconciler() -> (StateReconciler, Rc<RefCell<Vec<LogEntry>>>) {
        let mut r = StateReconciler::new(256.0, 3);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        r.on_log(move |e| sink.borrow_mut().push(e.clone()));
        (r, log)
    }

    fn teleport() -> PushEvent {
        PushEvent::Teleport {
            region: "Kitely Plaza".into(),
            position: Some([128.0, 64.0, 30.0]),
        }
    }

    #[test]
    fn teleport_updates_view_and_avatar() {
        let (mut r, log) = reconciler();
        let mut avatar = Placements::default();
        r.apply_push(teleport(), &mut avatar);

        let view = r.view();
        assert_eq!(view.region.as_deref(), Some("Kitely Plaza"));
        assert_eq!(view.position, Some([128.0, 64.0, 30.0]));
        assert_eq!(view.minimap, Some(MinimapMarker { x: 50.0, y: 25.0 }));
        assert_eq!(avatar.0, vec![Vec3::new(128.0, 30.0, 64.0)]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn duplicate_teleport_is_idempotent() {
        let (mut r, log) = reconciler();
        let mut avatar = Placements::default();
        r.apply_push(teleport(), &mut avatar);
        let first = r.view().clone();
        r.apply_push(teleport(), &mut avatar);
        assert_eq!(r.view(), &first);
        assert_eq!(avatar.0[0], avatar.0[avatar.0.len() - 1]);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn snapshot_replaces_summary() {
        let (mut r, _) = reconciler();
        let mut avatar = Placements::default();
        r.apply_snapshot(
            SessionSnapshot {
                status: Some("in_world".into()),
                logged_in: true,
                user: Some(UserInfo {
                    name: "Test User".into(),
                    id: "u1".into(),
                }),
                current_region: Some("Plaza".into()),
                position: None,
            },
            &mut avatar,
        );
        assert_eq!(r.status(), &ConnectionStatus::InWorld);
        assert!(r.view().logged_in);

        r.apply_snapshot(
            SessionSnapshot {
                logged_in: false,
                ..SessionSnapshot::default()
            },
            &mut avatar,
        );
        assert!(!r.view().logged_in);
        assert_eq!(r.view().user, None);
        assert_eq!(r.view().region, None);
        assert_eq!(r.status(), &ConnectionStatus::InWorld);
        assert!(avatar.0.is_empty());
    }

    #[test]
    fn snapshot_moves_avatar_only_on_new_position() {
        let (mut r, _) = reconciler();
        let mut avatar = Placements::default();
        let snap = SessionSnapshot {
            position: Some([10.0, 20.0, 5.0]),
            ..SessionSnapshot::default()
        };
        r.apply_snapshot(snap.clone(), &mut avatar);
        r.apply_snapshot(snap, &mut avatar);
        assert_eq!(avatar.0, vec![Vec3::new(10.0, 5.0, 20.0)]);

        r.apply_snapshot(
            SessionSnapshot {
                position: Some([11.0, 20.0, 5.0]),
                ..SessionSnapshot::default()
            },
            &mut avatar,
        );
        assert_eq!(avatar.0.len(), 2);
    }

    #[test]
    fn teleport_after_matching_snapshot_still_places() {
        let (mut r, _) = reconciler();
        let mut avatar = Placements::default();
        r.apply_snapshot(
            SessionSnapshot {
                position: Some([128.0, 64.0, 30.0]),
                ..SessionSnapshot::default()
            },
            &mut avatar,
        );
        r.apply_push(teleport(), &mut avatar);
        assert_eq!(avatar.0.len(), 2);
    }

    #[test]
    fn event_queue_in_order_with_push_kinds_skipped() {
        let (mut r, log) = reconciler();
        r.apply_events(vec![
            QueuedEvent::Log {
                message: "one".into(),
                level: LogLevel::Info,
            },
            QueuedEvent::Chat {
                message: "[System] hi".into(),
            },
            QueuedEvent::Teleport {
                message: "Kitely Plaza".into(),
            },
            QueuedEvent::Login {
                message: "Login successful".into(),
            },
            QueuedEvent::Unknown,
            QueuedEvent::Logout {
                message: "Logged out".into(),
            },
        ]);
        let messages: Vec<String> = log.borrow().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, ["one", "Login successful", "Logged out"]);
        assert_eq!(r.status(), &ConnectionStatus::Idle);
        assert_eq!(r.status_label(), "Logged out");
    }

    #[test]
    fn login_marker_sets_text_until_next_status() {
        let (mut r, _) = reconciler();
        r.apply_status(ConnectionStatus::InWorld);
        r.apply_events(vec![QueuedEvent::Login {
            message: "Login successful for user: Test User".into(),
        }]);
        assert_eq!(r.status(), &ConnectionStatus::InWorld);
        assert_eq!(r.status_label(), "Login successful for user: Test User");

        r.apply_status(ConnectionStatus::LoggingOut);
        assert_eq!(r.status_label(), "Logging out…");
    }

    #[test]
    fn logout_marker_does_not_end_the_session() {
        let (mut r, _) = reconciler();
        r.apply_status(ConnectionStatus::InWorld);
        r.apply_events(vec![QueuedEvent::Logout {
            message: "Disconnected from grid".into(),
        }]);
        assert_eq!(r.status(), &ConnectionStatus::InWorld);
        assert!(!r.session_ended());
    }

    #[test]
    fn chat_history_is_bounded() {
        let (mut r, _) = reconciler();
        let mut avatar = Placements::default();
        for i in 0..5 {
            r.apply_push(
                PushEvent::ChatMessage {
                    from: "System".into(),
                    message: format!("m{i}"),
                },
                &mut avatar,
            );
        }
        let chat: Vec<&str> = r.view().chat.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(chat, ["m2", "m3", "m4"]);
    }

    #[test]
    fn failure_sets_error_and_logs_once() {
        let (mut r, log) = reconciler();
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let sink = statuses.clone();
        r.on_status(move |s| sink.borrow_mut().push(s.clone()));

        r.apply_status(ConnectionStatus::LoggingIn);
        r.request_failed("login", "Password must be at least 4 characters long");
        assert_eq!(r.status(), &ConnectionStatus::Error);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].level, LogLevel::Error);
        assert_eq!(
            *statuses.borrow(),
            vec![ConnectionStatus::LoggingIn, ConnectionStatus::Error]
        );
        assert!(!r.session_ended());
    }

    #[test]
    fn next_snapshot_status_clears_a_failure() {
        let (mut r, _) = reconciler();
        let mut avatar = Placements::default();
        r.apply_status(ConnectionStatus::InWorld);
        r.request_failed("poll", "grid unavailable");
        assert_eq!(r.status_label(), "Error");
        r.apply_snapshot(
            SessionSnapshot {
                status: Some("in_world".into()),
                ..SessionSnapshot::default()
            },
            &mut avatar,
        );
        assert_eq!(r.status(), &ConnectionStatus::InWorld);
        assert!(!r.session_ended());
    }
}
