//! Authenticated operations against the service's private batch-RPC surface.
//!
//! Every call rides one shared `reqwest::Client`, the saved cookie header,
//! and the tokens derived at bootstrap. Bootstrap is lazy: the first
//! operation triggers it, so callers have no ordering requirement.
//!
//! The wire format is owned by the service and versioned without notice;
//! request building and response decoding live behind [`RpcClient::invoke`]
//! and decoding failures surface as `RemoteService` errors rather than
//! guesses.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::SessionContext;
use crate::store::CookieStore;
use crate::tasks::{AsyncTask, TaskKind, TaskStatus};
use crate::types::{MindMap, Notebook, ResearchDepth, SourceKind, SourceRef, StudioArtifact};

const RPC_ENDPOINT: &str = "https://notebooklm.google.com/_/LabsTailwindUi/data/batchexecute";
const ANTI_JSON_PREFIX: &str = ")]}'";
const CALL_TIMEOUT: Duration = Duration::from_secs(60);
const BODY_SNIPPET: usize = 512;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
	(KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Opaque per-operation RPC ids, owned by the service.
mod rpc_id {
	pub const LIST_NOTEBOOKS: &str = "wXbhsf";
	pub const CREATE_NOTEBOOK: &str = "CCqFvf";
	pub const DELETE_NOTEBOOK: &str = "WWINqb";
	pub const ADD_SOURCE: &str = "izAoDd";
	pub const QUERY: &str = "LBPxmb";
	pub const START_RESEARCH: &str = "QXvudf";
	pub const POLL_RESEARCH: &str = "e3bVqe";
	pub const STUDIO_STATUS: &str = "gArtLc";
	pub const MIND_MAP: &str = "yyryJe";
}

/// Stateful client over one authenticated session.
///
/// One client instance per session; concurrent clients over a shared cookie
/// set are not a supported configuration.
pub struct RpcClient {
	http: reqwest::Client,
	cookie_header: String,
	session: SessionContext,
	/// Most recent outstanding research task per notebook id. One concurrent
	/// research task per notebook is modeled.
	active_research: HashMap<String, AsyncTask>,
	reqid: u32,
}

impl RpcClient {
	pub fn new(cookie_header: impl Into<String>) -> Result<Self> {
		let http = reqwest::Client::builder()
			.user_agent(USER_AGENT)
			.timeout(CALL_TIMEOUT)
			.build()?;

		Ok(Self {
			http,
			cookie_header: cookie_header.into(),
			session: SessionContext::new(),
			active_research: HashMap::new(),
			reqid: 1,
		})
	}

	/// Build a client from the saved session record.
	pub fn from_store(store: &CookieStore) -> Result<Self> {
		Self::new(store.load()?)
	}

	/// Lazy bootstrap: idempotent, called by every operation.
	async fn ensure_ready(&mut self) -> Result<()> {
		self.session.bootstrap(&self.http, &self.cookie_header).await
	}

	/// One round trip through the batch-RPC envelope.
	async fn invoke(&mut self, rpc: &str, params: Value) -> Result<Value> {
		self.ensure_ready().await?;
		let tokens = self
			.session
			.tokens()
			.ok_or_else(|| Error::SessionExpired {
				reason: "bootstrap completed without tokens".into(),
			})?;
		let csrf = tokens.csrf_token.clone();
		let session_id = tokens.session_id.clone();

		self.reqid = self.reqid.wrapping_add(100_000);
		let mut query: Vec<(&str, String)> = vec![
			("rpcids", rpc.to_string()),
			("_reqid", self.reqid.to_string()),
			("rt", "c".to_string()),
		];
		if let Some(sid) = &session_id {
			query.push(("f.sid", sid.clone()));
		}

		let envelope = json!([[[rpc, params.to_string(), Value::Null, "generic"]]]);
		let form = [("f.req", envelope.to_string()), ("at", csrf)];

		debug!(target = "nbk", rpc, reqid = self.reqid, "rpc call");

		let response = self
			.http
			.post(RPC_ENDPOINT)
			.query(&query)
			.header(reqwest::header::COOKIE, self.cookie_header.as_str())
			.header(reqwest::header::ORIGIN, "https://notebooklm.google.com")
			.header(reqwest::header::REFERER, "https://notebooklm.google.com/")
			.form(&form)
			.send()
			.await
			.map_err(|err| {
				if err.is_timeout() {
					Error::RemoteTimeout
				} else {
					Error::Http(err)
				}
			})?;

		let status = response.status();
		let body = response.text().await?;

		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			return Err(Error::SessionExpired {
				reason: format!("rpc call rejected with status {}", status.as_u16()),
			});
		}
		if !status.is_success() {
			return Err(Error::RemoteService {
				status: status.as_u16(),
				body: snippet(&body),
			});
		}

		decode_envelope(&body, rpc)
	}

	/// List notebooks in the order the service returns them. The sort key is
	/// not under our control and must not be re-sorted locally.
	pub async fn list_notebooks(&mut self) -> Result<Vec<Notebook>> {
		let payload = self.invoke(rpc_id::LIST_NOTEBOOKS, json!([null, 1])).await?;
		Ok(parse_notebook_list(&payload))
	}

	/// Create a notebook, returning its service-assigned id.
	pub async fn create_notebook(&mut self, title: Option<&str>) -> Result<String> {
		let title = match title {
			Some(t) => t.to_string(),
			None => format!("Notebook {}", chrono::Utc::now().format("%Y-%m-%d %H:%M")),
		};
		let payload = self
			.invoke(rpc_id::CREATE_NOTEBOOK, json!([title, Value::Null]))
			.await?;
		let id = string_at(&payload, "/0").ok_or_else(|| unexpected_shape("create notebook"))?;
		info!(target = "nbk", notebook = %id, "notebook created");
		Ok(id)
	}

	pub async fn delete_notebook(&mut self, notebook_id: &str) -> Result<()> {
		if notebook_id.is_empty() {
			return Err(Error::InvalidInput("notebook id must not be empty".into()));
		}
		match self.invoke(rpc_id::DELETE_NOTEBOOK, json!([[notebook_id]])).await {
			Ok(_) => {
				info!(target = "nbk", notebook = %notebook_id, "notebook deleted");
				Ok(())
			}
			Err(Error::RemoteService { status: 404, .. }) => Err(Error::NotFound {
				notebook: notebook_id.to_string(),
			}),
			Err(err) => Err(err),
		}
	}

	/// Attach pasted text as a new source, returning the source id.
	pub async fn add_text_source(
		&mut self,
		notebook_id: &str,
		name: &str,
		body: &str,
	) -> Result<String> {
		if body.is_empty() {
			return Err(Error::InvalidInput("source body must not be empty".into()));
		}
		let params = json!([[[Value::Null, [body, name], Value::Null, 2]], notebook_id]);
		let payload = self.invoke(rpc_id::ADD_SOURCE, params).await?;
		string_at(&payload, "/0/0").ok_or_else(|| unexpected_shape("add text source"))
	}

	/// Attach a URL source. The URL is validated syntactically before any
	/// network traffic; fetch failures on the service side (paywalled or
	/// unreachable pages) are surfaced verbatim and not retried.
	pub async fn add_url_source(&mut self, notebook_id: &str, url: &str) -> Result<String> {
		let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl {
			input: url.to_string(),
		})?;
		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(Error::InvalidUrl {
				input: url.to_string(),
			});
		}

		let params = json!([[[Value::Null, Value::Null, [url], Value::Null, 1]], notebook_id]);
		let payload = self.invoke(rpc_id::ADD_SOURCE, params).await?;
		string_at(&payload, "/0/0").ok_or_else(|| unexpected_shape("add url source"))
	}

	/// Ask a question against a notebook's sources. An empty notebook is
	/// allowed; the answer may be degenerate.
	pub async fn query(&mut self, notebook_id: &str, question: &str) -> Result<Value> {
		let params = json!([question, [], notebook_id]);
		let payload = self.invoke(rpc_id::QUERY, params).await?;
		// Prefer the plain-text answer when the payload carries one.
		if let Some(answer) = string_at(&payload, "/0/0") {
			return Ok(Value::String(answer));
		}
		Ok(payload)
	}

	/// Start a research job. At most one research task per notebook is
	/// tracked; starting a new one replaces the old snapshot.
	pub async fn start_research(
		&mut self,
		notebook_id: &str,
		topic: &str,
		source_scope: &[String],
		depth: ResearchDepth,
	) -> Result<AsyncTask> {
		let params = json!([topic, source_scope, depth.as_str(), notebook_id]);
		let payload = self.invoke(rpc_id::START_RESEARCH, params).await?;

		let task_id =
			string_at(&payload, "/0").ok_or_else(|| unexpected_shape("start research"))?;
		let mut task = AsyncTask::started(task_id, TaskKind::Research);
		if let Some(code) = payload.pointer("/1").and_then(Value::as_i64) {
			task.status = TaskStatus::from_remote_code(code);
		}

		info!(target = "nbk", notebook = %notebook_id, task = %task.task_id, depth = depth.as_str(), "research started");
		self.active_research.insert(notebook_id.to_string(), task.clone());
		Ok(task)
	}

	/// Snapshot of the outstanding research task on a notebook. Never
	/// blocks; transitions come only from the poll response. Once a terminal
	/// status is observed the task is dropped from local tracking.
	pub async fn poll_research(&mut self, notebook_id: &str) -> Result<AsyncTask> {
		let task_id = match self.active_research.get(notebook_id) {
			Some(task) => task.task_id.clone(),
			None => {
				return Err(Error::NoActiveTask {
					notebook: notebook_id.to_string(),
				});
			}
		};

		let payload = self
			.invoke(rpc_id::POLL_RESEARCH, json!([notebook_id, task_id]))
			.await?;
		let task = research_snapshot(&payload, &task_id);

		if task.status.is_terminal() {
			self.active_research.remove(notebook_id);
		} else {
			self.active_research.insert(notebook_id.to_string(), task.clone());
		}
		Ok(task)
	}

	/// Status records for studio artifact generation on a notebook.
	/// May be empty; never blocks.
	pub async fn poll_studio_status(&mut self, notebook_id: &str) -> Result<Vec<StudioArtifact>> {
		let payload = self.invoke(rpc_id::STUDIO_STATUS, json!([notebook_id])).await?;
		Ok(parse_studio_artifacts(&payload))
	}

	/// Generate a mind map over the given sources (all from one notebook).
	pub async fn generate_mind_map(&mut self, source_ids: &[String]) -> Result<MindMap> {
		if source_ids.is_empty() {
			return Err(Error::EmptySourceSet);
		}
		let payload = self.invoke(rpc_id::MIND_MAP, json!([source_ids])).await?;
		Ok(MindMap {
			source_ids: source_ids.to_vec(),
			graph: payload,
		})
	}
}

/// Decode the service's batch-RPC response envelope.
///
/// The body opens with an anti-JSON prefix line, followed by chunks that mix
/// byte-length lines with JSON arrays. The frame of interest is
/// `["wrb.fr", <rpc id>, <payload as a JSON string>, ...]`.
fn decode_envelope(body: &str, rpc: &str) -> Result<Value> {
	let body = body.strip_prefix(ANTI_JSON_PREFIX).unwrap_or(body);

	for line in body.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		let Ok(chunk) = serde_json::from_str::<Value>(line) else {
			continue;
		};
		let Some(frames) = chunk.as_array() else {
			continue;
		};
		for frame in frames {
			let Some(parts) = frame.as_array() else {
				continue;
			};
			if parts.first().and_then(Value::as_str) != Some("wrb.fr") {
				continue;
			}
			if parts.get(1).and_then(Value::as_str) != Some(rpc) {
				continue;
			}
			return match parts.get(2) {
				Some(Value::String(inner)) => Ok(serde_json::from_str(inner)?),
				Some(Value::Null) | None => Ok(Value::Null),
				Some(other) => Ok(other.clone()),
			};
		}
	}

	Err(Error::RemoteService {
		status: 200,
		body: format!("no frame for rpc {rpc} in response ({} bytes)", body.len()),
	})
}

fn parse_notebook_list(payload: &Value) -> Vec<Notebook> {
	payload
		.pointer("/0")
		.and_then(Value::as_array)
		.map(|entries| entries.iter().filter_map(parse_notebook).collect())
		.unwrap_or_default()
}

fn parse_notebook(entry: &Value) -> Option<Notebook> {
	let id = entry.get(0)?.as_str()?.to_string();
	let title = entry
		.get(1)
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_string();
	let sources: Vec<SourceRef> = entry
		.get(2)
		.and_then(Value::as_array)
		.map(|list| list.iter().filter_map(parse_source).collect())
		.unwrap_or_default();
	let modified_at = entry.get(3).and_then(Value::as_str).map(str::to_string);
	let is_owned = entry
		.pointer("/4/0")
		.and_then(Value::as_bool)
		.unwrap_or(true);
	let is_shared = entry
		.pointer("/4/1")
		.and_then(Value::as_bool)
		.unwrap_or(false);

	Some(Notebook {
		id,
		title,
		source_count: sources.len(),
		is_owned,
		is_shared,
		modified_at,
		sources,
	})
}

fn parse_source(entry: &Value) -> Option<SourceRef> {
	let id = entry.get(0)?.as_str()?.to_string();
	let kind = match entry.get(1).and_then(Value::as_i64) {
		Some(2) => SourceKind::PastedText,
		Some(1) => SourceKind::Url,
		_ => SourceKind::Other,
	};
	let title = entry.get(2).and_then(Value::as_str).map(str::to_string);
	Some(SourceRef { id, kind, title })
}

/// Snapshot a research task purely from the poll payload: `[<status code>,
/// <result?>]`. No local inference; an unreadable code stays non-terminal.
fn research_snapshot(payload: &Value, task_id: &str) -> AsyncTask {
	let status = payload
		.pointer("/0")
		.and_then(Value::as_i64)
		.map(TaskStatus::from_remote_code)
		.unwrap_or(TaskStatus::Running);
	let result = match status {
		TaskStatus::Completed => payload.get(1).filter(|v| !v.is_null()).cloned(),
		_ => None,
	};

	AsyncTask {
		task_id: task_id.to_string(),
		kind: TaskKind::Research,
		status,
		result,
	}
}

fn parse_studio_artifacts(payload: &Value) -> Vec<StudioArtifact> {
	payload
		.pointer("/0")
		.and_then(Value::as_array)
		.map(|entries| {
			entries
				.iter()
				.filter_map(|entry| {
					let artifact_id = entry.get(0)?.as_str()?.to_string();
					let title = entry.get(1).and_then(Value::as_str).map(str::to_string);
					let status = entry
						.get(2)
						.and_then(Value::as_i64)
						.map(TaskStatus::from_remote_code)
						.unwrap_or(TaskStatus::Running);
					Some(StudioArtifact { artifact_id, title, status })
				})
				.collect()
		})
		.unwrap_or_default()
}

fn string_at(payload: &Value, pointer: &str) -> Option<String> {
	payload.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn unexpected_shape(operation: &str) -> Error {
	Error::RemoteService {
		status: 200,
		body: format!("{operation}: response payload did not match expectations"),
	}
}

fn snippet(body: &str) -> String {
	let mut end = body.len().min(BODY_SNIPPET);
	while !body.is_char_boundary(end) {
		end -= 1;
	}
	body[..end].to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn envelope(rpc: &str, inner: &Value) -> String {
		let frame = json!([["wrb.fr", rpc, inner.to_string(), Value::Null]]);
		format!(")]}}'\n\n123\n{frame}\n")
	}

	#[test]
	fn decode_envelope_extracts_the_matching_frame() {
		let inner = json!([["nb-1", "First"]]);
		let body = envelope(rpc_id::LIST_NOTEBOOKS, &inner);

		let payload = decode_envelope(&body, rpc_id::LIST_NOTEBOOKS).unwrap();
		assert_eq!(payload, inner);
	}

	#[test]
	fn decode_envelope_rejects_mismatched_rpc() {
		let body = envelope(rpc_id::LIST_NOTEBOOKS, &json!([]));
		let err = decode_envelope(&body, rpc_id::QUERY).unwrap_err();
		assert!(matches!(err, Error::RemoteService { status: 200, .. }));
	}

	#[test]
	fn decode_envelope_handles_null_payload() {
		let frame = json!([["wrb.fr", rpc_id::DELETE_NOTEBOOK, Value::Null]]);
		let body = format!(")]}}'\n{frame}");
		let payload = decode_envelope(&body, rpc_id::DELETE_NOTEBOOK).unwrap();
		assert!(payload.is_null());
	}

	#[test]
	fn notebook_list_preserves_service_order() {
		let payload = json!([[
			["nb-2", "Second", [], "2026-02-01T00:00:00Z", [true, false]],
			["nb-1", "First", [["src-1", 2, "notes"]], "2026-01-01T00:00:00Z", [true, true]],
		]]);

		let notebooks = parse_notebook_list(&payload);
		assert_eq!(notebooks.len(), 2);
		// Service order, not id or title order.
		assert_eq!(notebooks[0].id, "nb-2");
		assert_eq!(notebooks[1].id, "nb-1");
		assert_eq!(notebooks[1].source_count, 1);
		assert_eq!(notebooks[1].sources[0].kind, SourceKind::PastedText);
		assert!(notebooks[1].is_shared);
	}

	#[test]
	fn created_notebook_appears_in_subsequent_listing() {
		let create_payload =
			decode_envelope(&envelope(rpc_id::CREATE_NOTEBOOK, &json!(["nb-123"])), rpc_id::CREATE_NOTEBOOK)
				.unwrap();
		let created_id = string_at(&create_payload, "/0").unwrap();

		let list_payload = json!([[["nb-123", "Test", [], Value::Null, [true, false]]]]);
		let notebooks = parse_notebook_list(&list_payload);

		let found = notebooks.iter().find(|n| n.id == created_id).unwrap();
		assert_eq!(found.title, "Test");
	}

	#[test]
	fn research_snapshot_is_never_completed_without_result_code() {
		let task = research_snapshot(&json!([2]), "task-1");
		assert_eq!(task.status, TaskStatus::Running);
		assert!(task.result.is_none());

		let pending = research_snapshot(&json!([1]), "task-1");
		assert_eq!(pending.status, TaskStatus::Pending);
		assert!(pending.result.is_none());
	}

	#[test]
	fn research_snapshot_carries_result_only_when_completed() {
		let done = research_snapshot(&json!([3, {"report": "findings"}]), "task-1");
		assert_eq!(done.status, TaskStatus::Completed);
		assert_eq!(done.result.unwrap()["report"], "findings");

		let failed = research_snapshot(&json!([4, {"report": "partial"}]), "task-1");
		assert_eq!(failed.status, TaskStatus::Failed);
		assert!(failed.result.is_none());
	}

	#[test]
	fn repeated_snapshots_of_the_same_payload_agree() {
		let payload = json!([2]);
		let first = research_snapshot(&payload, "task-1");
		let second = research_snapshot(&payload, "task-1");
		assert_eq!(first.status, second.status);
	}

	#[test]
	fn studio_artifacts_parse_including_empty() {
		let artifacts = parse_studio_artifacts(&json!([[
			["art-1", "Overview audio", 2],
			["art-2", Value::Null, 3],
		]]));
		assert_eq!(artifacts.len(), 2);
		assert_eq!(artifacts[0].status, TaskStatus::Running);
		assert_eq!(artifacts[1].status, TaskStatus::Completed);
		assert!(artifacts[1].title.is_none());

		assert!(parse_studio_artifacts(&json!([[]])).is_empty());
	}

	#[tokio::test]
	async fn invalid_url_fails_before_any_network_call() {
		let mut client = RpcClient::new("SID=test").unwrap();
		let err = client.add_url_source("nb-1", "not-a-url").await.unwrap_err();
		assert!(matches!(err, Error::InvalidUrl { .. }));

		let err = client.add_url_source("nb-1", "ftp://example.com/x").await.unwrap_err();
		assert!(matches!(err, Error::InvalidUrl { .. }));
	}

	#[tokio::test]
	async fn empty_text_body_is_rejected_locally() {
		let mut client = RpcClient::new("SID=test").unwrap();
		let err = client.add_text_source("nb-1", "notes", "").await.unwrap_err();
		assert!(matches!(err, Error::InvalidInput(_)));
	}

	#[tokio::test]
	async fn mind_map_requires_sources() {
		let mut client = RpcClient::new("SID=test").unwrap();
		let err = client.generate_mind_map(&[]).await.unwrap_err();
		assert!(matches!(err, Error::EmptySourceSet));
	}

	#[tokio::test]
	async fn poll_without_outstanding_task_is_no_active_task() {
		let mut client = RpcClient::new("SID=test").unwrap();
		let err = client.poll_research("nb-1").await.unwrap_err();
		assert!(matches!(err, Error::NoActiveTask { .. }));
	}

	#[test]
	fn snippet_truncates_on_char_boundaries() {
		let long = "é".repeat(BODY_SNIPPET);
		let cut = snippet(&long);
		assert!(cut.len() <= BODY_SNIPPET);
		assert!(long.starts_with(&cut));
	}
}
