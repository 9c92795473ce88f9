//! Core chat-sync contract shared between the session runtime and its frontends.
//!
//! This crate defines the wire data model, the `ChatApi` seam, the session lifecycle,
//! the session state reducer, and the view-side helpers (scroll preservation, typing
//! suppression). It performs no I/O.

/// Backend API trait implemented by transport crates.
pub mod api;
/// Command queue and event fan-out.
pub mod channel;
/// Pagination cursor query encoding.
pub mod cursor;
/// Request and session error types.
pub mod error;
/// Error-body normalization for non-2xx responses.
pub mod normalization;
/// Cursor-paginated list buffer.
pub mod paging;
/// Scroll-position preservation controller.
pub mod scroll;
/// Session state reducer and snapshots.
pub mod session;
/// Session lifecycle state machine.
pub mod state_machine;
/// Typing-suppression gate.
pub mod typing;
/// Data model and protocol types (commands, events, snapshots).
pub mod types;

pub use api::ChatApi;
pub use channel::{CommandQueue, EventStream, SessionChannelError, SessionEvents};
pub use cursor::encode_cursor;
pub use error::{RequestError, RequestErrorKind, SessionError};
pub use normalization::normalize_error_response;
pub use paging::{LoadMode, PagedList};
pub use scroll::{NEAR_BOTTOM_THRESHOLD, ScrollAdjustment, ScrollController, ScrollGeometry};
pub use session::{FetchRequest, FetchTicket, SessionState};
pub use state_machine::{SessionStateMachine, command_action};
pub use typing::TypingGate;
pub use types::{
    ConversationId, ConversationSummary, ConversationView, Cursor, Identified, LastMessage,
    Message, MessageId, MessageView, Page, Scope, ScopeStatus, SessionCommand, SessionEvent,
    SessionPhase, SessionSnapshot, SyncConfig, User, UserId,
};
