//! HTTP backend runtime for minichat.
//!
//! [`HttpChatApi`] talks to the JSON API, [`ChatSession`] runs the synchronization
//! flows on top of any [`minichat_core::ChatApi`], and [`spawn_runtime`] wraps a session
//! in a command loop driven over channels.

mod client;
mod poller;
mod runtime;
mod session;

pub use client::{HttpChatApi, USER_ID_HEADER};
pub use runtime::{SessionRuntimeHandle, spawn_runtime};
pub use session::ChatSession;
