use anyhow::Result;
use nbk::RpcClient;
use serde_json::Value;

use super::print_json;

pub async fn run(mut client: RpcClient, notebook: &str, question: &str) -> Result<()> {
	let answer = client.query(notebook, question).await?;
	match answer {
		Value::String(text) => {
			println!("{text}");
			Ok(())
		}
		structured => print_json(&structured),
	}
}
