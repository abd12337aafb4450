use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for session acquisition and RPC calls.
///
/// Messages never contain cookie values or security tokens; diagnostics are
/// limited to cookie names, lengths, and upstream status codes.
#[derive(Debug, Error)]
pub enum Error {
	/// No saved session record exists; an interactive login is required.
	#[error("not authenticated: no saved session (run `nbk auth login`)")]
	NotAuthenticated,

	/// The interactive login did not complete within the wait deadline.
	#[error("authentication timed out after {secs}s waiting for login to complete")]
	AuthenticationTimeout { secs: u64 },

	/// The saved session was rejected by the remote service.
	///
	/// Detected via a redirect to an identity-provider origin or a missing
	/// anti-forgery token on the entry page. Requires a fresh login.
	#[error("session expired: {reason}")]
	SessionExpired { reason: String },

	#[error("notebook not found: {notebook}")]
	NotFound { notebook: String },

	/// A synchronous call exceeded its client-side wait.
	#[error("remote call timed out")]
	RemoteTimeout,

	/// Poll was called with no outstanding task on the notebook.
	#[error("no active research task for notebook {notebook}")]
	NoActiveTask { notebook: String },

	#[error("at least one source id is required")]
	EmptySourceSet,

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("invalid url: {input}")]
	InvalidUrl { input: String },

	/// Catch-all for upstream failures, carrying the status and a truncated
	/// response body for diagnostics.
	#[error("remote service error (status {status}): {body}")]
	RemoteService { status: u16, body: String },

	/// Browser launch or DevTools protocol failure.
	#[error("browser error: {0}")]
	Browser(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Http(#[from] reqwest::Error),
}
