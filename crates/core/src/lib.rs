//! Session-bootstrapped client for a web-only notebook service.
//!
//! The service exposes no official API; this crate cooperates with a real
//! browser to obtain an authenticated session, derives the per-session
//! security tokens needed for its private RPC surface, and tracks
//! long-running jobs through a poll-until-terminal protocol.
//!
//! Flow: [`SessionAcquirer`] captures cookies into a [`CookieStore`] (once,
//! or on re-auth); an [`RpcClient`] loads them, lazily bootstraps its
//! [`session::SessionContext`] on first use, and issues operations.

pub mod auth;
pub mod browser;
pub mod cookies;
pub mod error;
pub mod rpc;
pub mod session;
pub mod store;
pub mod tasks;
pub mod types;

pub use auth::SessionAcquirer;
pub use cookies::{CookieSet, ENTRY_URL, FixReport, REQUIRED_COOKIES, TARGET_HOST, fix_cookies};
pub use error::{Error, Result};
pub use rpc::RpcClient;
pub use store::{CookieStore, SessionRecord};
pub use tasks::{AsyncTask, TaskKind, TaskStatus, wait_for_completion};
pub use types::{MindMap, Notebook, ResearchDepth, SourceKind, SourceRef, StudioArtifact};
