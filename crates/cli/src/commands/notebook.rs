use anyhow::Result;
use nbk::RpcClient;

use super::print_json;
use crate::cli::NotebookCommand;

pub async fn run(cmd: NotebookCommand, mut client: RpcClient) -> Result<()> {
	match cmd {
		NotebookCommand::List => {
			let notebooks = client.list_notebooks().await?;
			print_json(&notebooks)
		}
		NotebookCommand::Create { title } => {
			let id = client.create_notebook(title.as_deref()).await?;
			println!("{id}");
			Ok(())
		}
		NotebookCommand::Delete { notebook } => {
			client.delete_notebook(&notebook).await?;
			println!("Deleted notebook {notebook}");
			Ok(())
		}
	}
}
