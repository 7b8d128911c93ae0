use std::fmt;

/// Connection status as reported by the grid.
///
/// `Idle` is initial. `Completed` and `Error` end a session; a new session
/// re-enters through `Idle` or `Starting`. Status strings the viewer does not
/// know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Starting,
    Initializing,
    LoggingIn,
    LoggedIn,
    InWorld,
    LoggingOut,
    Completed,
    Error,
    Other(String),
}

impl ConnectionStatus {
    /// Parse a server status string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "idle" => Self::Idle,
            "starting" => Self::Starting,
            "initializing" => Self::Initializing,
            "logging_in" => Self::LoggingIn,
            "logged_in" => Self::LoggedIn,
            "in_world" => Self::InWorld,
            "logging_out" => Self::LoggingOut,
            "completed" => Self::Completed,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire spelling.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Initializing => "initializing",
            Self::LoggingIn => "logging_in",
            Self::LoggedIn => "logged_in",
            Self::InWorld => "in_world",
            Self::LoggingOut => "logging_out",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(raw) => raw,
        }
    }

    /// User-facing label.
    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting…",
            Self::Initializing => "Initializing…",
            Self::LoggingIn => "Logging in…",
            Self::LoggedIn => "Logged in",
            Self::InWorld => "In World",
            Self::LoggingOut => "Logging out…",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Statuses that open a new session.
    pub fn begins_session(&self) -> bool {
        matches!(self, Self::Idle | Self::Starting)
    }

}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Holds the current status and enforces the session boundaries.
///
/// An `Error` set by [`StatusMachine::fail`] does not end the session: the
/// next status reported by the grid replaces it. An `Error` reported by the
/// grid itself does.
#[derive(Debug, Clone, Default)]
pub struct StatusMachine {
    current: ConnectionStatus,
    failed: bool,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ConnectionStatus {
        &self.current
    }

    /// True while the current `Error` comes from a failed request rather
    /// than from the grid.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// The grid has ended the session.
    pub fn has_ended(&self) -> bool {
        self.current.is_terminal() && !self.failed
    }

    /// Apply a server-reported status. Returns true if the status changed.
    ///
    /// Once the session has ended only a status that begins a new session is
    /// accepted.
    pub fn apply(&mut self, next: ConnectionStatus) -> bool {
        if next == self.current {
            self.failed = false;
            return false;
        }
        if self.has_ended() && !next.begins_session() {
            tracing::debug!(
                current = self.current.as_wire(),
                ignored = next.as_wire(),
                "session ended, ignoring status"
            );
            return false;
        }
        if let ConnectionStatus::Other(raw) = &next {
            tracing::warn!(status = %raw, "unrecognized connection status");
        }
        tracing::info!(from = self.current.as_wire(), to = next.as_wire(), "status");
        self.current = next;
        self.failed = false;
        true
    }

    /// A request failed. Shows `Error` until the grid reports a status,
    /// unless the session already ended.
    pub fn fail(&mut self) -> bool {
        if self.current.is_terminal() {
            return false;
        }
        self.current = ConnectionStatus::Error;
        self.failed = true;
        true
    }
}
