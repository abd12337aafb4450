//! Interactive session acquisition.
//!
//! Opens a headed browser on the service entry page, waits for the user to
//! finish logging in, then extracts a domain-scoped cookie set and persists
//! it. Login completion is detected by racing several independent signals —
//! the remote UI is not under our control, so any single signal may fail to
//! fire; the first one that does wins.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::browser::{Browser, default_profile_dir};
use crate::cookies::{CookieSet, ENTRY_URL, REQUIRED_COOKIES, TARGET_HOST};
use crate::error::{Error, Result};
use crate::store::CookieStore;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// DOM marker for the authenticated application shell.
const APP_SHELL_PROBE: &str =
	r#"!!document.querySelector('project-list, [aria-label="Create new notebook"]')"#;

/// DOM marker for the signed-in account chip.
const ACCOUNT_CHIP_PROBE: &str =
	r#"!!document.querySelector('a[aria-label*="Account"], img[class*="gb_"]')"#;

/// Which login-completion signal fired first. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSignal {
	AuthenticatedPath,
	AppShellMarker,
	AccountMarker,
	SessionCookie,
}

impl fmt::Display for LoginSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::AuthenticatedPath => "authenticated path",
			Self::AppShellMarker => "app shell marker",
			Self::AccountMarker => "account marker",
			Self::SessionCookie => "session cookie",
		};
		f.write_str(name)
	}
}

/// Drives one interactive login and hands the resulting cookie set to the
/// store. Not retried automatically; a failure here needs a fresh run.
pub struct SessionAcquirer {
	store: CookieStore,
	entry_url: String,
	timeout: Duration,
}

impl SessionAcquirer {
	pub fn new(store: CookieStore) -> Self {
		Self {
			store,
			entry_url: ENTRY_URL.to_string(),
			timeout: DEFAULT_LOGIN_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Run the interactive login.
	///
	/// `status` receives human-readable progress lines; the wait can span
	/// minutes and the caller needs liveness feedback throughout.
	pub async fn acquire(&self, status: &mut dyn FnMut(&str)) -> Result<CookieSet> {
		status("launching browser...");
		let browser = Browser::launch(true, &default_profile_dir()).await?;
		browser.cdp.navigate(&self.entry_url).await?;

		status(&format!(
			"browser opened at {} — complete the login in the browser window",
			self.entry_url
		));

		let signal = match self.wait_for_login(&browser, status).await {
			Ok(signal) => signal,
			Err(err) => {
				browser.close().await;
				return Err(err);
			}
		};
		info!(target = "nbk", %signal, "login detected");
		status(&format!("login detected ({signal}), reading cookies..."));

		// Re-read the jar scoped to the target origin. The login flow visits
		// identity-provider origins whose cookie names collide with ours;
		// scoping by URL keeps those out.
		let jar = browser.cdp.cookies_for(&[&self.entry_url]).await?;
		browser.close().await;

		let set = CookieSet::from_browser(jar, TARGET_HOST);
		if set.is_empty() {
			return Err(Error::SessionExpired {
				reason: "no cookies for the target domain after login".into(),
			});
		}

		let missing = set.missing_required();
		if !missing.is_empty() {
			// Soft warning only: the session may still work and is validated
			// for real during bootstrap.
			warn!(target = "nbk", ?missing, "required session cookies missing");
			status(&format!("warning: missing expected cookies: {}", missing.join(", ")));
		}

		self.store.save(&set.header())?;
		status(&format!(
			"session saved ({} cookies) to {}",
			set.len(),
			self.store.path().display()
		));

		Ok(set)
	}

	/// Poll all completion signals each tick until one fires or the
	/// deadline passes. First signal wins.
	async fn wait_for_login(
		&self,
		browser: &Browser,
		status: &mut dyn FnMut(&str),
	) -> Result<LoginSignal> {
		let start = Instant::now();
		let mut last_report = Instant::now();

		loop {
			if start.elapsed() > self.timeout {
				return Err(Error::AuthenticationTimeout {
					secs: self.timeout.as_secs(),
				});
			}

			if let Some(signal) = self.check_signals(browser).await {
				return Ok(signal);
			}

			// Keep the caller informed during a multi-minute wait.
			if last_report.elapsed() > Duration::from_secs(30) {
				let remaining = self.timeout.saturating_sub(start.elapsed());
				status(&format!(
					"still waiting for login ({}s remaining)...",
					remaining.as_secs()
				));
				last_report = Instant::now();
			}

			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}

	/// One pass over all completion signals. Probe failures are treated as
	/// "not yet": mid-navigation the page context routinely goes away.
	async fn check_signals(&self, browser: &Browser) -> Option<LoginSignal> {
		let href = browser.cdp.location().await.ok()?;
		let on_target = on_target_origin(&href);

		if on_target && is_authenticated_path(&href) {
			return Some(LoginSignal::AuthenticatedPath);
		}

		if on_target {
			if let Ok(serde_json::Value::Bool(true)) = browser.cdp.evaluate(APP_SHELL_PROBE).await {
				return Some(LoginSignal::AppShellMarker);
			}
			if let Ok(serde_json::Value::Bool(true)) =
				browser.cdp.evaluate(ACCOUNT_CHIP_PROBE).await
			{
				return Some(LoginSignal::AccountMarker);
			}
			if let Ok(jar) = browser.cdp.cookies_for(&[&self.entry_url]).await {
				let set = CookieSet::from_browser(jar, TARGET_HOST);
				if REQUIRED_COOKIES.iter().any(|name| set.names().contains(name)) {
					return Some(LoginSignal::SessionCookie);
				}
			}
		}

		None
	}
}

fn on_target_origin(href: &str) -> bool {
	url::Url::parse(href)
		.ok()
		.and_then(|u| u.host_str().map(|h| h == TARGET_HOST))
		.unwrap_or(false)
}

/// A path that only the authenticated application serves.
fn is_authenticated_path(href: &str) -> bool {
	url::Url::parse(href)
		.map(|u| u.path().starts_with("/notebook"))
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn target_origin_detection() {
		assert!(on_target_origin("https://notebooklm.google.com/"));
		assert!(on_target_origin("https://notebooklm.google.com/notebook/abc"));
		assert!(!on_target_origin("https://accounts.google.com/signin"));
		assert!(!on_target_origin("not a url"));
	}

	#[test]
	fn authenticated_path_detection() {
		assert!(is_authenticated_path("https://notebooklm.google.com/notebook/abc123"));
		assert!(!is_authenticated_path("https://notebooklm.google.com/"));
		assert!(!is_authenticated_path("https://notebooklm.google.com/welcome"));
	}
}
