//! Session bootstrap: turn a saved cookie set into usable security tokens.
//!
//! One GET against the entry page, carrying the cookies, yields the
//! anti-forgery token and session identifier embedded in the page. If the
//! request bounces to an identity-provider origin the session is dead and
//! nothing is extracted.

use tracing::{debug, warn};

use crate::cookies::{ENTRY_URL, TARGET_HOST};
use crate::error::{Error, Result};

/// Markers the entry page embeds. Opaque values owned by the service.
const CSRF_MARKER: &str = "\"SNlM0e\":\"";
const SESSION_ID_MARKER: &str = "\"FdrFJe\":\"";

/// Per-session security tokens derived at bootstrap.
#[derive(Debug, Clone)]
pub struct SessionTokens {
	/// Anti-forgery token required on every state-changing call.
	pub csrf_token: String,
	/// Session identifier; some operations work without it.
	pub session_id: Option<String>,
}

/// Bootstrap state owned by one client instance.
///
/// Tokens are only ever set together; a failed bootstrap leaves the context
/// uninitialized.
#[derive(Debug, Default)]
pub struct SessionContext {
	tokens: Option<SessionTokens>,
}

impl SessionContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn initialized(&self) -> bool {
		self.tokens.is_some()
	}

	pub fn tokens(&self) -> Option<&SessionTokens> {
		self.tokens.as_ref()
	}

	/// Fetch the entry page and extract tokens. Idempotent: once
	/// initialized, further calls are no-ops.
	pub async fn bootstrap(&mut self, http: &reqwest::Client, cookie_header: &str) -> Result<()> {
		if self.initialized() {
			return Ok(());
		}

		let response = http
			.get(ENTRY_URL)
			.header(reqwest::header::COOKIE, cookie_header)
			.send()
			.await?;

		let final_host = response.url().host_str().map(str::to_string);
		let body = response.text().await?;

		let tokens = extract_tokens(final_host.as_deref(), &body)?;
		debug!(
			target = "nbk",
			csrf_len = tokens.csrf_token.len(),
			has_session_id = tokens.session_id.is_some(),
			"session bootstrapped"
		);
		self.tokens = Some(tokens);
		Ok(())
	}
}

/// Pure extraction step, fail-closed.
///
/// A final host other than the target means the entry fetch was redirected
/// to an identity provider; tokens must never be read off such a page.
fn extract_tokens(final_host: Option<&str>, body: &str) -> Result<SessionTokens> {
	if final_host != Some(TARGET_HOST) {
		return Err(Error::SessionExpired {
			reason: format!(
				"entry page redirected away from {TARGET_HOST} (landed on {})",
				final_host.unwrap_or("<unknown>")
			),
		});
	}

	let Some(csrf_token) = scan_marker(body, CSRF_MARKER) else {
		return Err(Error::SessionExpired {
			reason: "anti-forgery token not present on entry page".into(),
		});
	};

	let session_id = scan_marker(body, SESSION_ID_MARKER);
	if session_id.is_none() {
		// Tolerated: some operations do not need the session id.
		warn!(target = "nbk", "session id marker not found on entry page");
	}

	Ok(SessionTokens { csrf_token, session_id })
}

fn scan_marker(body: &str, marker: &str) -> Option<String> {
	let start = body.find(marker)? + marker.len();
	let end = body[start..].find('"')?;
	let value = &body[start..start + end];
	(!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	const PAGE: &str = r#"<script>window.WIZ_global_data = {"SNlM0e":"AFabc123:456","FdrFJe":"-912345"};</script>"#;

	#[test]
	fn extracts_both_tokens() {
		let tokens = extract_tokens(Some(TARGET_HOST), PAGE).unwrap();
		assert_eq!(tokens.csrf_token, "AFabc123:456");
		assert_eq!(tokens.session_id.as_deref(), Some("-912345"));
	}

	#[test]
	fn identity_provider_redirect_fails_closed() {
		// Even a body containing valid markers must not be trusted when the
		// request resolved off-target.
		let err = extract_tokens(Some("accounts.google.com"), PAGE).unwrap_err();
		assert!(matches!(err, Error::SessionExpired { .. }));
	}

	#[test]
	fn missing_csrf_token_is_fatal() {
		let body = r#"{"FdrFJe":"-912345"}"#;
		let err = extract_tokens(Some(TARGET_HOST), body).unwrap_err();
		assert!(matches!(err, Error::SessionExpired { .. }));
	}

	#[test]
	fn missing_session_id_is_tolerated() {
		let body = r#"{"SNlM0e":"AFabc123"}"#;
		let tokens = extract_tokens(Some(TARGET_HOST), body).unwrap();
		assert_eq!(tokens.csrf_token, "AFabc123");
		assert!(tokens.session_id.is_none());
	}

	#[test]
	fn tokens_are_set_together_or_not_at_all() {
		let mut ctx = SessionContext::new();
		assert!(!ctx.initialized());
		assert!(ctx.tokens().is_none());

		// Simulate a failed bootstrap: the context must stay untouched.
		let result = extract_tokens(Some("accounts.google.com"), PAGE);
		assert!(result.is_err());
		assert!(ctx.tokens().is_none());

		ctx.tokens = extract_tokens(Some(TARGET_HOST), PAGE).ok();
		let tokens = ctx.tokens().unwrap();
		assert!(!tokens.csrf_token.is_empty());
		assert!(tokens.session_id.is_some());
	}

	#[test]
	fn empty_marker_value_is_treated_as_absent() {
		let body = r#"{"SNlM0e":""}"#;
		let err = extract_tokens(Some(TARGET_HOST), body).unwrap_err();
		assert!(matches!(err, Error::SessionExpired { .. }));
	}
}
