//! Durable storage for the serialized session record.
//!
//! A single JSON file at a fixed per-user location holds the cookie string
//! and its update timestamp. Writes go through a temp file and an atomic
//! rename so a partial record is never observable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cookies::CookieSet;
use crate::error::{Error, Result};

/// Persisted session record: `{ "cookies": "...", "updatedAt": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub cookies: String,
	pub updated_at: String,
}

/// Redacted view of a stored session for inspection commands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
	pub path: PathBuf,
	pub updated_at: String,
	pub cookie_names: Vec<String>,
}

/// Loads and saves the on-disk session record. No network access.
#[derive(Debug, Clone)]
pub struct CookieStore {
	path: PathBuf,
}

impl CookieStore {
	/// Store at the default per-user location (`~/.config/nbk/session.json`).
	pub fn new() -> Self {
		let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
		Self {
			path: base.join("nbk").join("session.json"),
		}
	}

	/// Store at an explicit path. Used by tests and the `--session-file` flag.
	pub fn at(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Write a fresh record, replacing any previous one wholesale.
	pub fn save(&self, cookies: &str) -> Result<()> {
		let record = SessionRecord {
			cookies: cookies.to_string(),
			updated_at: chrono::Utc::now().to_rfc3339(),
		};

		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}

		// Write-then-rename keeps the record valid JSON at all times.
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, serde_json::to_vec_pretty(&record)?)?;
		fs::rename(&tmp, &self.path)?;

		debug!(target = "nbk", path = %self.path.display(), "session record saved");
		Ok(())
	}

	/// Load the saved cookie string.
	pub fn load(&self) -> Result<String> {
		Ok(self.record()?.cookies)
	}

	/// Load the full record, failing with `NotAuthenticated` if none exists.
	pub fn record(&self) -> Result<SessionRecord> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				return Err(Error::NotAuthenticated);
			}
			Err(err) => return Err(err.into()),
		};
		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Redacted summary of the stored session: names and timestamp only.
	pub fn info(&self) -> Result<SessionInfo> {
		let record = self.record()?;
		let names = CookieSet::from_header(&record.cookies)
			.names()
			.into_iter()
			.map(str::to_string)
			.collect();
		Ok(SessionInfo {
			path: self.path.clone(),
			updated_at: record.updated_at,
			cookie_names: names,
		})
	}

	/// Delete the saved session, if any.
	pub fn clear(&self) -> Result<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

impl Default for CookieStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn save_then_load_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("session.json"));

		let cookies = "SID=a; HSID=b; SSID=c; APISID=d; SAPISID=e";
		store.save(cookies).unwrap();

		assert_eq!(store.load().unwrap(), cookies);
	}

	#[test]
	fn load_without_record_is_not_authenticated() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("session.json"));

		assert!(matches!(store.load(), Err(Error::NotAuthenticated)));
	}

	#[test]
	fn deleting_the_record_makes_load_fail() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("session.json"));

		store.save("SID=a").unwrap();
		store.clear().unwrap();

		assert!(matches!(store.load(), Err(Error::NotAuthenticated)));
	}

	#[test]
	fn save_creates_parent_directories() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("deep/nested/session.json"));

		store.save("SID=a").unwrap();
		assert!(store.path().exists());
	}

	#[test]
	fn save_overwrites_prior_record() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("session.json"));

		store.save("SID=old").unwrap();
		store.save("SID=new").unwrap();

		assert_eq!(store.load().unwrap(), "SID=new");
	}

	#[test]
	fn record_is_valid_json_with_timestamp() {
		let dir = tempfile::tempdir().unwrap();
		let store = CookieStore::at(dir.path().join("session.json"));

		store.save("SID=a; HSID=b").unwrap();
		let record = store.record().unwrap();
		assert!(!record.updated_at.is_empty());

		let info = store.info().unwrap();
		assert_eq!(info.cookie_names, vec!["SID", "HSID"]);
	}
}
