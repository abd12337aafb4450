//! Read-only projections of remote service state.
//!
//! These are snapshots parsed out of RPC responses; nothing here is cached
//! beyond the call that produced it.

use serde::Serialize;
use serde_json::Value;

/// One notebook as listed by the service. Order of `sources` and of listing
/// results is service-defined and preserved verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
	pub id: String,
	pub title: String,
	pub source_count: usize,
	pub is_owned: bool,
	pub is_shared: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub modified_at: Option<String>,
	pub sources: Vec<SourceRef>,
}

/// A source attached to a notebook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
	pub id: String,
	pub kind: SourceKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
	PastedText,
	Url,
	Other,
}

/// Research depth accepted by `start_research`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchDepth {
	Fast,
	Deep,
}

impl ResearchDepth {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fast => "fast",
			Self::Deep => "deep",
		}
	}
}

impl std::str::FromStr for ResearchDepth {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"fast" => Ok(Self::Fast),
			"deep" => Ok(Self::Deep),
			other => Err(format!("unknown research depth '{other}' (expected fast or deep)")),
		}
	}
}

/// Status record for one studio artifact generation job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioArtifact {
	pub artifact_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	pub status: crate::tasks::TaskStatus,
}

/// Mind-map graph payload. The node structure is owned by the service and
/// carried through opaquely.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMap {
	pub source_ids: Vec<String>,
	pub graph: Value,
}
