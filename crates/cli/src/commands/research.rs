use std::time::{Duration, Instant};

use anyhow::Result;
use nbk::RpcClient;

use super::print_json;
use crate::cli::ResearchCommand;

pub async fn run(cmd: ResearchCommand, mut client: RpcClient) -> Result<()> {
	match cmd {
		ResearchCommand::Start { notebook, topic, depth, sources } => {
			let task = client.start_research(&notebook, &topic, &sources, depth).await?;
			print_json(&task)
		}
		ResearchCommand::Poll { notebook } => {
			let task = client.poll_research(&notebook).await?;
			print_json(&task)
		}
		ResearchCommand::Wait { notebook, interval, timeout } => {
			wait(&mut client, &notebook, interval, timeout).await
		}
	}
}

/// Caller-side bounded wait. Giving up stops the polling only; the
/// server-side job keeps running and can be polled again later.
async fn wait(client: &mut RpcClient, notebook: &str, interval: u64, timeout: u64) -> Result<()> {
	let interval = Duration::from_secs(interval);
	let deadline = Duration::from_secs(timeout);
	let start = Instant::now();

	loop {
		let task = client.poll_research(notebook).await?;
		if task.status.is_terminal() {
			return print_json(&task);
		}

		eprintln!(
			"task {} still {:?} ({}s elapsed)",
			task.task_id,
			task.status,
			start.elapsed().as_secs()
		);

		if start.elapsed() + interval > deadline {
			return Err(nbk::Error::RemoteTimeout.into());
		}
		tokio::time::sleep(interval).await;
	}
}
