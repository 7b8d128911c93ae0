//! Grid session state.
//!
//! # Invariants
//! - Status transitions come from the grid; the only local transition is a
//!   failed request moving the session to `error`.
//! - Each polled snapshot replaces the displayed summary; it is never merged
//!   with an older one.
//! - Queued events are applied once, in order.
//! - Polling stops once a snapshot reports a terminal status.

mod client;
mod protocol;
mod reconciler;
mod scripted;
mod status;
mod transport;

pub use client::{SessionClient, SessionPoller};
pub use protocol::{
    Credentials, LogLevel, PushEvent, QueuedEvent, RequestResult, SessionSnapshot, UserInfo,
    WireMessage, decode_events, decode_line, decode_push, decode_snapshot,
};
pub use reconciler::{AvatarSink, ChatLine, LogEntry, MinimapMarker, SessionView, StateReconciler};
pub use scripted::{MIN_PASSWORD_LEN, ScriptedGrid, WELCOME_POSITION, WELCOME_REGION};
pub use status::{ConnectionStatus, StatusMachine};
pub use transport::{SessionTransport, TransportError};
