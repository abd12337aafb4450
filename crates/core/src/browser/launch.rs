//! Chrome process lifecycle for the interactive login flow.
//!
//! Launches a Chromium-family browser with remote debugging on a free local
//! port, waits for the DevTools endpoint to come up, and connects to the
//! first page target.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::cdp::CdpConnection;
use crate::error::{Error, Result};

const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// A launched browser with a live DevTools connection to its page target.
pub struct Browser {
	process: Child,
	pub cdp: CdpConnection,
	debug_port: u16,
}

impl Browser {
	/// Launch a browser. `headed` must be true for interactive login.
	pub async fn launch(headed: bool, user_data_dir: &Path) -> Result<Self> {
		let binary = find_chrome().ok_or_else(|| {
			Error::Browser("no Chrome or Chromium binary found on this system".into())
		})?;

		std::fs::create_dir_all(user_data_dir)?;
		let debug_port = free_port().await?;
		let args = chrome_args(debug_port, user_data_dir, headed);

		info!(
			target = "nbk",
			browser = %binary,
			port = debug_port,
			headed,
			"launching browser"
		);

		let process = Command::new(&binary)
			.args(&args)
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::Browser(format!("failed to launch {binary}: {e}")))?;

		wait_for_devtools(debug_port).await?;
		let ws_url = page_ws_url(debug_port).await?;
		let cdp = CdpConnection::connect(&ws_url).await?;

		debug!(target = "nbk", ws_url = %ws_url, "devtools connection established");

		Ok(Self { process, cdp, debug_port })
	}

	pub fn debug_port(&self) -> u16 {
		self.debug_port
	}

	/// Graceful close, then kill if the process lingers.
	pub async fn close(mut self) {
		self.cdp.close_browser().await;
		let _ = self.process.kill().await;
	}
}

impl Drop for Browser {
	fn drop(&mut self) {
		let _ = self.process.start_kill();
	}
}

/// Default profile directory for login sessions, isolated from the user's
/// day-to-day browser profile.
pub fn default_profile_dir() -> PathBuf {
	dirs::cache_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join("nbk")
		.join("browser-profile")
}

fn find_chrome() -> Option<String> {
	let candidates: &[&str] = if cfg!(target_os = "macos") {
		&[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
		]
	} else if cfg!(target_os = "linux") {
		&[
			"google-chrome",
			"google-chrome-stable",
			"chromium",
			"chromium-browser",
		]
	} else {
		&[
			r"C:\Program Files\Google\Chrome\Application\chrome.exe",
			r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
		]
	};

	for candidate in candidates {
		if Path::new(candidate).exists() {
			return Some(candidate.to_string());
		}
		if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok() {
			return Some(candidate.to_string());
		}
	}
	None
}

fn chrome_args(port: u16, user_data_dir: &Path, headed: bool) -> Vec<String> {
	let mut args = vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", user_data_dir.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
		"--disable-background-networking".to_string(),
		"--disable-extensions".to_string(),
		"--disable-sync".to_string(),
		"--password-store=basic".to_string(),
	];
	if !headed {
		args.push("--headless=new".to_string());
	}
	args.push("--window-size=1280,800".to_string());
	args.push("about:blank".to_string());
	args
}

async fn free_port() -> Result<u16> {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
		.await
		.map_err(|e| Error::Browser(format!("failed to pick a debug port: {e}")))?;
	let port = listener
		.local_addr()
		.map_err(|e| Error::Browser(format!("failed to read local addr: {e}")))?
		.port();
	drop(listener);
	Ok(port)
}

/// Poll `/json/version` until the DevTools HTTP endpoint answers.
async fn wait_for_devtools(port: u16) -> Result<()> {
	let url = format!("http://127.0.0.1:{port}/json/version");
	let start = Instant::now();

	loop {
		if start.elapsed() > READY_TIMEOUT {
			return Err(Error::Browser(format!(
				"devtools endpoint not ready after {}s on port {port}",
				READY_TIMEOUT.as_secs()
			)));
		}
		if let Ok(resp) = reqwest::get(&url).await {
			if resp.status().is_success() {
				return Ok(());
			}
		}
		tokio::time::sleep(Duration::from_millis(200)).await;
	}
}

/// Resolve the first page target's WebSocket URL via `/json/list`.
/// The page target can lag the browser endpoint, so retry briefly.
async fn page_ws_url(port: u16) -> Result<String> {
	let url = format!("http://127.0.0.1:{port}/json/list");

	for attempt in 0..10 {
		if attempt > 0 {
			tokio::time::sleep(Duration::from_millis(300)).await;
		}

		let Ok(resp) = reqwest::get(&url).await else {
			continue;
		};
		let Ok(targets) = resp.json::<Vec<Value>>().await else {
			continue;
		};

		for target in &targets {
			if target.get("type").and_then(Value::as_str) == Some("page") {
				if let Some(ws) = target.get("webSocketDebuggerUrl").and_then(Value::as_str) {
					return Ok(ws.to_string());
				}
			}
		}
	}

	Err(Error::Browser("no page target found after retries".into()))
}
