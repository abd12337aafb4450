//! Cookie set construction and repair.
//!
//! Two dedup policies live here on purpose:
//!
//! * [`CookieSet`] ingestion uses last-occurrence-wins, matching how a browser
//!   jar overwrites a cookie on re-set. This is the policy for everything
//!   read out of a live browser.
//! * [`fix_cookies`] keeps its documented first-occurrence-wins contract for
//!   repairing an already-persisted cookie string.

use std::fmt;

/// Host the session is scoped to. Cookies from any other origin must never
/// enter a [`CookieSet`].
pub const TARGET_HOST: &str = "notebooklm.google.com";

/// Entry page used for login, bootstrap, and cookie scoping.
pub const ENTRY_URL: &str = "https://notebooklm.google.com/";

/// Session cookie names the remote service expects. Absence is a warning at
/// acquisition time; the session is only proven dead at bootstrap.
pub const REQUIRED_COOKIES: &[&str] = &["SID", "HSID", "SSID", "APISID", "SAPISID"];

/// One cookie as reported by the browser jar.
#[derive(Clone)]
pub struct BrowserCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
}

/// Deduplicated, domain-scoped cookie set in insertion order.
#[derive(Clone, Default)]
pub struct CookieSet {
	entries: Vec<(String, String)>,
}

impl CookieSet {
	/// Build a set from a browser jar, keeping only cookies whose domain
	/// applies to `target_host` and deduplicating by name (last value wins).
	///
	/// Domain filtering is the correctness-critical part: a login flow
	/// visits identity-provider origins whose cookie names collide with the
	/// target's own session cookies, and merging those in corrupts the
	/// session.
	pub fn from_browser<I>(cookies: I, target_host: &str) -> Self
	where
		I: IntoIterator<Item = BrowserCookie>,
	{
		let mut set = Self::default();
		for cookie in cookies {
			if domain_matches(&cookie.domain, target_host) {
				set.insert(cookie.name, cookie.value);
			}
		}
		set
	}

	/// Parse a persisted `name=value; name=value` header string.
	/// Last occurrence wins, consistent with [`CookieSet::from_browser`].
	pub fn from_header(header: &str) -> Self {
		let mut set = Self::default();
		for pair in header.split(';') {
			let pair = pair.trim();
			if let Some((name, value)) = pair.split_once('=') {
				set.insert(name.to_string(), value.to_string());
			}
		}
		set
	}

	fn insert(&mut self, name: String, value: String) {
		match self.entries.iter_mut().find(|(n, _)| *n == name) {
			Some(entry) => entry.1 = value,
			None => self.entries.push((name, value)),
		}
	}

	/// Required cookie names not present in this set.
	pub fn missing_required(&self) -> Vec<&'static str> {
		REQUIRED_COOKIES
			.iter()
			.copied()
			.filter(|required| !self.entries.iter().any(|(n, _)| n == required))
			.collect()
	}

	/// Render as a `Cookie:` header value.
	pub fn header(&self) -> String {
		self.entries
			.iter()
			.map(|(n, v)| format!("{n}={v}"))
			.collect::<Vec<_>>()
			.join("; ")
	}

	pub fn names(&self) -> Vec<&str> {
		self.entries.iter().map(|(n, _)| n.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Values are secrets; only names and value lengths appear in diagnostics.
impl fmt::Debug for CookieSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for (name, value) in &self.entries {
			map.entry(&name, &format_args!("<{} bytes>", value.len()));
		}
		map.finish()
	}
}

/// Whether a jar cookie domain applies to the target host.
///
/// Accepts the exact host and parent-domain cookies (`.google.com` applies to
/// `notebooklm.google.com`); rejects sibling and unrelated origins.
fn domain_matches(cookie_domain: &str, target_host: &str) -> bool {
	let domain = cookie_domain.trim_start_matches('.');
	target_host == domain || target_host.ends_with(&format!(".{domain}"))
}

/// Counts reported by [`fix_cookies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixReport {
	/// Pair count in the input string.
	pub before: usize,
	/// Pair count after deduplication.
	pub after: usize,
}

/// Repair a persisted cookie string by dropping repeated names.
///
/// First occurrence wins; this utility's contract predates the browser-jar
/// last-wins policy used during acquisition and is kept as documented.
pub fn fix_cookies(raw: &str) -> (String, FixReport) {
	let mut seen: Vec<&str> = Vec::new();
	let mut kept: Vec<String> = Vec::new();
	let mut before = 0;

	for pair in raw.split(';') {
		let pair = pair.trim();
		let Some((name, _)) = pair.split_once('=') else {
			continue;
		};
		before += 1;
		if !seen.contains(&name) {
			seen.push(name);
			kept.push(pair.to_string());
		}
	}

	let after = kept.len();
	(kept.join("; "), FixReport { before, after })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cookie(name: &str, value: &str, domain: &str) -> BrowserCookie {
		BrowserCookie {
			name: name.to_string(),
			value: value.to_string(),
			domain: domain.to_string(),
		}
	}

	#[test]
	fn dedup_keeps_last_occurrence() {
		let set = CookieSet::from_browser(
			vec![
				cookie("SID", "old", TARGET_HOST),
				cookie("HSID", "h", TARGET_HOST),
				cookie("SID", "new", TARGET_HOST),
			],
			TARGET_HOST,
		);

		assert_eq!(set.len(), 2);
		assert_eq!(set.header(), "SID=new; HSID=h");
	}

	#[test]
	fn foreign_domains_are_excluded() {
		let set = CookieSet::from_browser(
			vec![
				cookie("SID", "real", ".google.com"),
				cookie("SID", "imposter", "idp.example.com"),
				cookie("session", "x", "accounts.example.org"),
			],
			TARGET_HOST,
		);

		assert_eq!(set.names(), vec!["SID"]);
		assert_eq!(set.header(), "SID=real");
	}

	#[test]
	fn parent_domain_cookies_apply() {
		assert!(domain_matches(".google.com", TARGET_HOST));
		assert!(domain_matches("notebooklm.google.com", TARGET_HOST));
		assert!(!domain_matches("accounts.example.com", TARGET_HOST));
		// Sibling host, same parent spelled as a host domain.
		assert!(!domain_matches("mail.google.com", TARGET_HOST));
	}

	#[test]
	fn missing_required_reports_absent_names() {
		let set = CookieSet::from_header("SID=a; HSID=b");
		assert_eq!(set.missing_required(), vec!["SSID", "APISID", "SAPISID"]);

		let full = CookieSet::from_header("SID=a; HSID=b; SSID=c; APISID=d; SAPISID=e");
		assert!(full.missing_required().is_empty());
	}

	#[test]
	fn fix_cookies_keeps_first_occurrence() {
		let (fixed, report) = fix_cookies("SID=1; SID=2; HSID=x");
		assert_eq!(fixed, "SID=1; HSID=x");
		assert_eq!(report, FixReport { before: 3, after: 2 });
	}

	#[test]
	fn fix_cookies_ignores_malformed_pairs() {
		let (fixed, report) = fix_cookies("SID=1; garbage; HSID=x;");
		assert_eq!(fixed, "SID=1; HSID=x");
		assert_eq!(report, FixReport { before: 2, after: 2 });
	}

	#[test]
	fn debug_output_redacts_values() {
		let set = CookieSet::from_header("SID=supersecret");
		let rendered = format!("{set:?}");
		assert!(rendered.contains("SID"));
		assert!(!rendered.contains("supersecret"));
	}
}
