//! One async function per subcommand; dispatch owns no state beyond the
//! store location resolved from global flags.

mod auth;
mod mindmap;
mod notebook;
mod query;
mod research;
mod source;
mod studio;

use anyhow::Result;
use nbk::{CookieStore, RpcClient};

use crate::cli::{Cli, Command};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let store = match &cli.session_file {
		Some(path) => CookieStore::at(path.clone()),
		None => CookieStore::new(),
	};

	match cli.command {
		Command::Auth(cmd) => auth::run(cmd, &store).await,
		Command::Notebook(cmd) => notebook::run(cmd, client(&store)?).await,
		Command::Source(cmd) => source::run(cmd, client(&store)?).await,
		Command::Query { notebook, question } => {
			query::run(client(&store)?, &notebook, &question).await
		}
		Command::Research(cmd) => research::run(cmd, client(&store)?).await,
		Command::Studio(cmd) => studio::run(cmd, client(&store)?).await,
		Command::Mindmap { sources } => mindmap::run(client(&store)?, &sources).await,
	}
}

fn client(store: &CookieStore) -> Result<RpcClient> {
	Ok(RpcClient::from_store(store)?)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
