//! Asynchronous task tracking and the shared polling discipline.
//!
//! Every status transition is learned from a poll response; nothing here
//! infers completion from elapsed time. A single poll returns the current
//! snapshot and never blocks — "wait until done" is a caller-side loop with
//! its own interval and deadline, because deep research can legitimately
//! outlive any single reasonable client-side timeout.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// What kind of server-side job a task tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
	Research,
	StudioArtifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
	Pending,
	Running,
	Completed,
	Failed,
}

impl TaskStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}

	/// Map the service's numeric job-state code onto the local state machine.
	/// Unknown codes are treated as still running rather than guessed at.
	pub fn from_remote_code(code: i64) -> Self {
		match code {
			0 | 1 => Self::Pending,
			2 => Self::Running,
			3 => Self::Completed,
			4 => Self::Failed,
			_ => Self::Running,
		}
	}
}

/// Snapshot of one server-tracked job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncTask {
	pub task_id: String,
	pub kind: TaskKind,
	pub status: TaskStatus,
	/// Kind-dependent payload, present once the task completes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
}

impl AsyncTask {
	pub fn started(task_id: String, kind: TaskKind) -> Self {
		Self {
			task_id,
			kind,
			status: TaskStatus::Pending,
			result: None,
		}
	}
}

/// Caller-side bounded wait over repeated polls.
///
/// Polls via `poll` every `interval` until the task reports a terminal
/// status or `deadline` elapses, in which case the last snapshot is
/// abandoned and `RemoteTimeout` is returned. Giving up here does not
/// cancel the server-side work.
pub async fn wait_for_completion<F, Fut>(
	mut poll: F,
	interval: Duration,
	deadline: Duration,
) -> Result<AsyncTask>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<AsyncTask>>,
{
	let start = tokio::time::Instant::now();

	loop {
		let snapshot = poll().await?;
		if snapshot.status.is_terminal() {
			return Ok(snapshot);
		}
		if start.elapsed() + interval > deadline {
			return Err(Error::RemoteTimeout);
		}
		tokio::time::sleep(interval).await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[test]
	fn terminal_states() {
		assert!(!TaskStatus::Pending.is_terminal());
		assert!(!TaskStatus::Running.is_terminal());
		assert!(TaskStatus::Completed.is_terminal());
		assert!(TaskStatus::Failed.is_terminal());
	}

	#[test]
	fn remote_codes_map_onto_state_machine() {
		assert_eq!(TaskStatus::from_remote_code(1), TaskStatus::Pending);
		assert_eq!(TaskStatus::from_remote_code(2), TaskStatus::Running);
		assert_eq!(TaskStatus::from_remote_code(3), TaskStatus::Completed);
		assert_eq!(TaskStatus::from_remote_code(4), TaskStatus::Failed);
		// Unknown codes stay non-terminal.
		assert_eq!(TaskStatus::from_remote_code(99), TaskStatus::Running);
	}

	fn scripted_poll(
		statuses: &'static [TaskStatus],
	) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<AsyncTask>>>> {
		let calls = Arc::new(AtomicUsize::new(0));
		move || {
			let calls = calls.clone();
			Box::pin(async move {
				let i = calls.fetch_add(1, Ordering::SeqCst).min(statuses.len() - 1);
				Ok(AsyncTask {
					task_id: "t1".into(),
					kind: TaskKind::Research,
					status: statuses[i],
					result: None,
				})
			})
		}
	}

	#[tokio::test]
	async fn wait_returns_on_terminal_status() {
		let poll = scripted_poll(&[TaskStatus::Pending, TaskStatus::Running, TaskStatus::Completed]);
		let task = wait_for_completion(poll, Duration::ZERO, Duration::from_secs(5))
			.await
			.unwrap();
		assert_eq!(task.status, TaskStatus::Completed);
	}

	#[tokio::test]
	async fn wait_times_out_without_progress() {
		let poll = scripted_poll(&[TaskStatus::Running]);
		let err = wait_for_completion(poll, Duration::from_millis(1), Duration::from_millis(3))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::RemoteTimeout));
	}

	#[tokio::test]
	async fn repeated_polls_without_progress_return_the_same_status() {
		let mut poll = scripted_poll(&[TaskStatus::Running]);
		for _ in 0..3 {
			let snapshot = poll().await.unwrap();
			assert_eq!(snapshot.status, TaskStatus::Running);
		}
	}
}
