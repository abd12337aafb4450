use anyhow::{Context, Result, bail};
use nbk::RpcClient;

use crate::cli::SourceCommand;

pub async fn run(cmd: SourceCommand, mut client: RpcClient) -> Result<()> {
	match cmd {
		SourceCommand::AddText { notebook, name, text, file } => {
			let body = match (text, file) {
				(Some(text), None) => text,
				(None, Some(path)) => std::fs::read_to_string(&path)
					.with_context(|| format!("reading {}", path.display()))?,
				_ => bail!("provide exactly one of --text or --file"),
			};

			let id = client.add_text_source(&notebook, &name, &body).await?;
			println!("{id}");
			Ok(())
		}
		SourceCommand::AddUrl { notebook, url } => {
			let id = client.add_url_source(&notebook, &url).await?;
			println!("{id}");
			Ok(())
		}
	}
}
