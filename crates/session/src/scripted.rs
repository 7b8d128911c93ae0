//! In-process grid that plays back the demo session timeline.
//!
//! Used by the desktop app when no real grid is configured, by the CLI demo
//! command and by tests.

use crate::protocol::{
    Credentials, LogLevel, PushEvent, QueuedEvent, RequestResult, SessionSnapshot, UserInfo,
};
use crate::transport::{SessionTransport, TransportError};
use std::collections::VecDeque;
use std::time::Duration;

pub const WELCOME_REGION: &str = "Kitely Plaza";
pub const WELCOME_POSITION: [f32; 3] = [128.0, 128.0, 30.0];
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Status(&'static str),
    Log(&'static str),
    LoginDemoUser,
    Chat {
        from: &'static str,
        message: &'static str,
    },
    Teleport,
    /// Pushed only; never stored on the snapshot.
    Progress(&'static str),
    Disconnect,
}

/// `(delay after previous step in ms, step)`.
const TIMELINE: &[(u64, Step)] = &[
    (100, Step::Log("Starting KitelyView Web Demo")),
    (100, Step::Status("initializing")),
    (200, Step::Log("Simulating login to Kitely grid...")),
    (0, Step::Status("logging_in")),
    (500, Step::LoginDemoUser),
    (0, Step::Status("logged_in")),
    (300, Step::Status("in_world")),
    (
        100,
        Step::Chat {
            from: "System",
            message: "Welcome to Kitely Plaza!",
        },
    ),
    (300, Step::Teleport),
    (
        300,
        Step::Chat {
            from: "Test User",
            message: "Hello, Kitely World!",
        },
    ),
    (0, Step::Progress("running_simulation_1")),
    (1000, Step::Progress("running_simulation_2")),
    (1000, Step::Progress("running_simulation_3")),
    (1000, Step::Status("logging_out")),
    (300, Step::Disconnect),
];

/// A grid session that follows a fixed timeline.
#[derive(Debug)]
pub struct ScriptedGrid {
    reachable: bool,
    clock: Duration,
    next_step_at: Duration,
    cursor: Option<usize>,
    state: SessionSnapshot,
    events: VecDeque<QueuedEvent>,
    push: VecDeque<PushEvent>,
}

impl Default for ScriptedGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGrid {
    pub fn new() -> Self {
        Self {
            reachable: true,
            clock: Duration::ZERO,
            next_step_at: Duration::ZERO,
            cursor: None,
            state: SessionSnapshot {
                status: Some("idle".into()),
                ..SessionSnapshot::default()
            },
            events: VecDeque::new(),
            push: VecDeque::new(),
        }
    }

    /// Make every request fail as if the grid were down.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Queue an arbitrary push event.
    pub fn inject_push(&mut self, event: PushEvent) {
        self.push.push_back(event);
    }

    pub fn inject_event(&mut self, event: QueuedEvent) {
        self.events.push_back(event);
    }

    /// True while timeline steps remain.
    pub fn is_running(&self) -> bool {
        self.cursor.is_some_and(|c| c < TIMELINE.len())
    }

    /// Total playback length of the timeline.
    pub fn timeline_length() -> Duration {
        Duration::from_millis(TIMELINE.iter().map(|(d, _)| d).sum())
    }

    fn check_reachable(&self) -> Result<(), TransportError> {
        if self.reachable {
            Ok(())
        } else {
            Err(TransportError::Unavailable("grid unreachable".into()))
        }
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.events.push_back(QueuedEvent::Log {
            message: message.into(),
            level,
        });
    }

    fn set_status(&mut self, status: &str) {
        self.state.status = Some(status.into());
        self.push.push_back(PushEvent::StatusUpdate {
            status: status.into(),
        });
    }

    fn run_step(&mut self, step: &Step) {
        match step {
            Step::Status(status) => self.set_status(status),
            Step::Log(message) => self.log(LogLevel::Info, *message),
            Step::LoginDemoUser => {
                self.state.logged_in = true;
                self.state.user = Some(UserInfo {
                    name: "Test User".into(),
                    id: "user-test-user".into(),
                });
                self.events.push_back(QueuedEvent::Login {
                    message: "Login successful for user: Test User".into(),
                });
            }
            Step::Chat { from, message } => {
                self.push.push_back(PushEvent::ChatMessage {
                    from: (*from).into(),
                    message: (*message).into(),
                });
                self.events.push_back(QueuedEvent::Chat {
                    message: format!("[{from}] {message}"),
                });
            }
            Step::Teleport => {
                self.state.current_region = Some(WELCOME_REGION.into());
                self.state.position = Some(WELCOME_POSITION);
                self.push.push_back(PushEvent::Teleport {
                    region: WELCOME_REGION.into(),
                    position: Some(WELCOME_POSITION),
                });
                self.events.push_back(QueuedEvent::Teleport {
                    message: WELCOME_REGION.into(),
                });
            }
            Step::Progress(status) => self.push.push_back(PushEvent::StatusUpdate {
                status: (*status).into(),
            }),
            Step::Disconnect => {
                self.events.push_back(QueuedEvent::Logout {
                    message: "Disconnected from grid".into(),
                });
                self.state.logged_in = false;
                self.set_status("completed");
                self.log(LogLevel::Info, "KitelyView Web Demo completed");
            }
        }
    }
}

impl SessionTransport for ScriptedGrid {
    fn start(&mut self) -> Result<RequestResult, TransportError> {
        self.check_reachable()?;
        self.state = SessionSnapshot {
            status: Some("starting".into()),
            ..SessionSnapshot::default()
        };
        self.events.clear();
        self.push.clear();
        self.cursor = Some(0);
        self.next_step_at = self.clock + Duration::from_millis(TIMELINE[0].0);
        Ok(RequestResult::ok())
    }

    fn login(&mut self, credentials: &Credentials) -> Result<RequestResult, TransportError> {
        self.check_reachable()?;
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Ok(RequestResult::rejected(
                "Password must be at least 4 characters long",
            ));
        }
        let name = credentials.full_name();
        let user = UserInfo {
            id: format!(
                "user-{}-{}",
                credentials.first_name.to_lowercase(),
                credentials.last_name.to_lowercase()
            ),
            name: name.clone(),
        };
        self.events.push_back(QueuedEvent::Login {
            message: format!("Login successful for {name}"),
        });
        self.state.logged_in = true;
        self.state.user = Some(user.clone());
        self.set_status("logged_in");
        Ok(RequestResult {
            success: true,
            message: None,
            user: Some(user),
        })
    }

    fn logout(&mut self) -> Result<RequestResult, TransportError> {
        self.check_reachable()?;
        self.events.push_back(QueuedEvent::Logout {
            message: "Logged out".into(),
        });
        self.state.logged_in = false;
        self.state.user = None;
        self.cursor = None;
        self.set_status("completed");
        Ok(RequestResult::ok())
    }

    fn fetch_snapshot(&mut self) -> Result<SessionSnapshot, TransportError> {
        self.check_reachable()?;
        Ok(self.state.clone())
    }

    fn fetch_events(&mut self) -> Result<Vec<QueuedEvent>, TransportError> {
        self.check_reachable()?;
        Ok(self.events.drain(..).collect())
    }

    fn poll_push(&mut self) -> Option<PushEvent> {
        if !self.reachable {
            return None;
        }
        self.push.pop_front()
    }

    fn advance(&mut self, elapsed: Duration) {
        self.clock += elapsed;
        while let Some(index) = self.cursor.filter(|c| *c < TIMELINE.len()) {
            if self.clock < self.next_step_at {
                break;
            }
            let step = &TIMELINE[index].1;
            self.run_step(step);
            let next = index + 1;
            self.cursor = Some(next);
            if let Some((delay, _)) = TIMELINE.get(next) {
                self.next_step_at += Duration::from_millis(*delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_statuses(grid: &mut ScriptedGrid) -> Vec<String> {
        std::iter::from_fn(|| grid.poll_push())
            .filter_map(|e| match e {
                PushEvent::StatusUpdate { status } => Some(status),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn timeline_plays_in_order() {
        let mut grid = ScriptedGrid::new();
        grid.start().unwrap();
        grid.advance(ScriptedGrid::timeline_length());
        assert!(!grid.is_running());
        assert_eq!(
            drain_statuses(&mut grid),
            [
                "initializing",
                "logging_in",
                "logged_in",
                "in_world",
                "running_simulation_1",
                "running_simulation_2",
                "running_simulation_3",
                "logging_out",
                "completed"
            ]
        );
        let snap = grid.fetch_snapshot().unwrap();
        assert_eq!(snap.status.as_deref(), Some("completed"));
        assert_eq!(snap.current_region.as_deref(), Some(WELCOME_REGION));
        assert!(!snap.logged_in);
    }

    #[test]
    fn nothing_happens_before_start() {
        let mut grid = ScriptedGrid::new();
        grid.advance(Duration::from_secs(60));
        assert!(grid.poll_push().is_none());
        assert_eq!(grid.fetch_snapshot().unwrap().status.as_deref(), Some("idle"));
    }

    #[test]
    fn steps_wait_for_their_time() {
        let mut grid = ScriptedGrid::new();
        grid.start().unwrap();
        grid.advance(Duration::from_millis(150));
        assert!(drain_statuses(&mut grid).is_empty());
        grid.advance(Duration::from_millis(50));
        assert_eq!(drain_statuses(&mut grid), ["initializing"]);
    }

    #[test]
    fn short_password_is_rejected() {
        let mut grid = ScriptedGrid::new();
        let result = grid.login(&Credentials::new("Test", "User", "abc")).unwrap();
        assert!(!result.success);
        assert!(result.message.unwrap().contains("at least 4"));

        let result = grid.login(&Credentials::new("Test", "User", "abcd")).unwrap();
        assert!(result.success);
        assert_eq!(result.user.unwrap().id, "user-test-user");
    }

    #[test]
    fn logout_completes() {
        let mut grid = ScriptedGrid::new();
        grid.login(&Credentials::new("Test", "User", "secret")).unwrap();
        grid.logout().unwrap();
        let snap = grid.fetch_snapshot().unwrap();
        assert_eq!(snap.status.as_deref(), Some("completed"));
        assert!(snap.user.is_none());
        let events = grid.fetch_events().unwrap();
        assert!(matches!(events.last(), Some(QueuedEvent::Logout { .. })));
        assert!(grid.fetch_events().unwrap().is_empty());
    }

    #[test]
    fn unreachable_grid_fails_requests() {
        let mut grid = ScriptedGrid::new();
        grid.set_reachable(false);
        assert!(matches!(grid.start(), Err(TransportError::Unavailable(_))));
        assert!(grid.fetch_snapshot().is_err());
    }
}
