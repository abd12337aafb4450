use anyhow::Result;
use nbk::RpcClient;

use super::print_json;

pub async fn run(mut client: RpcClient, sources: &[String]) -> Result<()> {
	let map = client.generate_mind_map(sources).await?;
	print_json(&map)
}
