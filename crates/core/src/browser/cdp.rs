//! Minimal Chrome DevTools Protocol client over WebSocket.
//!
//! Only what the login flow needs: id-correlated command/response round
//! trips against a single page target. Events are not consumed; login
//! progress is observed by polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::cookies::BrowserCookie;
use crate::error::{Error, Result};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Connection to one page target's DevTools WebSocket.
pub struct CdpConnection {
	outgoing: mpsc::Sender<String>,
	pending: PendingMap,
	next_id: AtomicU64,
	reader: tokio::task::JoinHandle<()>,
	writer: tokio::task::JoinHandle<()>,
}

impl CdpConnection {
	pub async fn connect(ws_url: &str) -> Result<Self> {
		let (stream, _) = connect_async(ws_url)
			.await
			.map_err(|e| Error::Browser(format!("devtools connect failed: {e}")))?;
		let (mut sink, mut source) = stream.split();

		let (outgoing, mut outgoing_rx) = mpsc::channel::<String>(64);
		let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
		let pending_reader = pending.clone();

		let writer = tokio::spawn(async move {
			while let Some(msg) = outgoing_rx.recv().await {
				if let Err(e) = sink.send(Message::Text(msg.into())).await {
					warn!(target = "nbk", "devtools write failed: {e}");
					break;
				}
			}
		});

		let reader = tokio::spawn(async move {
			while let Some(frame) = source.next().await {
				match frame {
					Ok(Message::Text(text)) => {
						let Ok(msg) = serde_json::from_str::<Value>(&text) else {
							continue;
						};
						if let Some(id) = msg.get("id").and_then(Value::as_u64) {
							if let Some(tx) = pending_reader.lock().await.remove(&id) {
								let _ = tx.send(msg);
							}
						}
						// Events carry no id and are intentionally dropped.
					}
					Ok(Message::Close(_)) => {
						debug!(target = "nbk", "devtools socket closed by browser");
						break;
					}
					Err(e) => {
						warn!(target = "nbk", "devtools read failed: {e}");
						break;
					}
					_ => {}
				}
			}
		});

		Ok(Self {
			outgoing,
			pending,
			next_id: AtomicU64::new(1),
			reader,
			writer,
		})
	}

	/// Send a command and wait for its correlated response.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().await.insert(id, tx);

		let msg = json!({ "id": id, "method": method, "params": params });
		self.outgoing
			.send(msg.to_string())
			.await
			.map_err(|_| Error::Browser("devtools connection lost".into()))?;

		match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
			Ok(Ok(response)) => {
				if let Some(err) = response.get("error") {
					return Err(Error::Browser(format!("{method} failed: {err}")));
				}
				Ok(response.get("result").cloned().unwrap_or(Value::Null))
			}
			Ok(Err(_)) => Err(Error::Browser("devtools response channel closed".into())),
			Err(_) => {
				self.pending.lock().await.remove(&id);
				Err(Error::Browser(format!(
					"{method} timed out after {}s",
					COMMAND_TIMEOUT.as_secs()
				)))
			}
		}
	}

	pub async fn navigate(&self, url: &str) -> Result<()> {
		self.send("Page.navigate", json!({ "url": url })).await?;
		Ok(())
	}

	/// Evaluate an expression in the page, returning its value.
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let result = self
			.send(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
				}),
			)
			.await?;
		Ok(result
			.pointer("/result/value")
			.cloned()
			.unwrap_or(Value::Null))
	}

	/// Current page URL, as the page itself sees it.
	pub async fn location(&self) -> Result<String> {
		match self.evaluate("window.location.href").await? {
			Value::String(href) => Ok(href),
			other => Err(Error::Browser(format!("unexpected location result: {other}"))),
		}
	}

	/// Cookies the browser would attach to the given URLs.
	///
	/// URL scoping is done by the browser, so identity-provider cookies that
	/// do not apply to the target origin are already excluded here.
	pub async fn cookies_for(&self, urls: &[&str]) -> Result<Vec<BrowserCookie>> {
		let result = self.send("Network.getCookies", json!({ "urls": urls })).await?;
		let cookies = result
			.get("cookies")
			.and_then(Value::as_array)
			.cloned()
			.unwrap_or_default();

		Ok(cookies
			.iter()
			.filter_map(|c| {
				Some(BrowserCookie {
					name: c.get("name")?.as_str()?.to_string(),
					value: c.get("value")?.as_str()?.to_string(),
					domain: c.get("domain")?.as_str()?.to_string(),
				})
			})
			.collect())
	}

	/// Ask the browser to shut down gracefully.
	pub async fn close_browser(&self) {
		if let Err(e) = self.send("Browser.close", json!({})).await {
			debug!(target = "nbk", "browser close failed (may already be gone): {e}");
		}
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.reader.abort();
		self.writer.abort();
	}
}
