use anyhow::Result;
use nbk::RpcClient;

use super::print_json;
use crate::cli::StudioCommand;

pub async fn run(cmd: StudioCommand, mut client: RpcClient) -> Result<()> {
	match cmd {
		StudioCommand::Status { notebook } => {
			let artifacts = client.poll_studio_status(&notebook).await?;
			print_json(&artifacts)
		}
	}
}
