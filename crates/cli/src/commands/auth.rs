use std::time::Duration;

use anyhow::Result;
use nbk::{CookieStore, SessionAcquirer, fix_cookies};
use tracing::info;

use super::print_json;
use crate::cli::AuthCommand;

pub async fn run(cmd: AuthCommand, store: &CookieStore) -> Result<()> {
	match cmd {
		AuthCommand::Login { timeout } => login(store, timeout).await,
		AuthCommand::Show => show(store),
		AuthCommand::Fix => fix(store),
		AuthCommand::Clear => clear(store),
	}
}

async fn login(store: &CookieStore, timeout_secs: u64) -> Result<()> {
	let acquirer = SessionAcquirer::new(store.clone())
		.with_timeout(Duration::from_secs(timeout_secs));

	let set = acquirer.acquire(&mut |line| eprintln!("{line}")).await?;
	info!(target = "nbk", cookies = set.len(), "interactive login complete");

	println!("Logged in. {} cookies captured: {}", set.len(), set.names().join(", "));
	Ok(())
}

fn show(store: &CookieStore) -> Result<()> {
	print_json(&store.info()?)
}

fn fix(store: &CookieStore) -> Result<()> {
	let raw = store.load()?;
	let (fixed, report) = fix_cookies(&raw);
	store.save(&fixed)?;

	println!("Cookies repaired. Before={} After={}", report.before, report.after);
	Ok(())
}

fn clear(store: &CookieStore) -> Result<()> {
	store.clear()?;
	println!("Saved session deleted ({})", store.path().display());
	Ok(())
}
