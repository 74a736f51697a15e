use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_CANDIDATE_K: u32 = 10;
pub const DEFAULT_TOP_N: u32 = 3;
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.1;
pub const DEFAULT_CHUNK_CHARS: u32 = 1_000;
pub const DEFAULT_OVERLAP_CHARS: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub ingest: Ingest,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
	#[serde(default = "default_transport")]
	pub transport: String,
	#[serde(default)]
	pub mcp_bind: String,
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Stage sizes and the acceptance threshold of the two-stage pipeline.
#[derive(Debug, Deserialize)]
pub struct Retrieval {
	/// Over-fetch size for the nearest-neighbor query.
	#[serde(default = "default_candidate_k")]
	pub candidate_k: u32,
	/// Maximum number of reranked entries returned.
	#[serde(default = "default_top_n")]
	pub top_n: u32,
	/// Entries with a relevance score strictly below this are dropped.
	#[serde(default = "default_min_relevance")]
	pub min_relevance: f32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			candidate_k: DEFAULT_CANDIDATE_K,
			top_n: DEFAULT_TOP_N,
			min_relevance: DEFAULT_MIN_RELEVANCE,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Ingest {
	#[serde(default = "default_data_dir")]
	pub data_dir: PathBuf,
	#[serde(default = "default_extensions")]
	pub extensions: Vec<String>,
	#[serde(default = "default_chunk_chars")]
	pub chunk_chars: u32,
	#[serde(default = "default_overlap_chars")]
	pub overlap_chars: u32,
	#[serde(default = "default_embed_batch_size")]
	pub embed_batch_size: u32,
}
impl Default for Ingest {
	fn default() -> Self {
		Self {
			data_dir: default_data_dir(),
			extensions: default_extensions(),
			chunk_chars: DEFAULT_CHUNK_CHARS,
			overlap_chars: DEFAULT_OVERLAP_CHARS,
			embed_batch_size: default_embed_batch_size(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	#[serde(default = "default_auth_mode")]
	pub auth_mode: String,
	pub bearer_token: Option<String>,
}
impl Default for Security {
	fn default() -> Self {
		Self { auth_mode: default_auth_mode(), bearer_token: None }
	}
}

fn default_transport() -> String {
	"stdio".to_string()
}

fn default_request_timeout_ms() -> u64 {
	30_000
}

fn default_candidate_k() -> u32 {
	DEFAULT_CANDIDATE_K
}

fn default_top_n() -> u32 {
	DEFAULT_TOP_N
}

fn default_min_relevance() -> f32 {
	DEFAULT_MIN_RELEVANCE
}

fn default_data_dir() -> PathBuf {
	PathBuf::from("data")
}

fn default_extensions() -> Vec<String> {
	vec!["txt".to_string(), "md".to_string(), "pdf".to_string()]
}

fn default_chunk_chars() -> u32 {
	DEFAULT_CHUNK_CHARS
}

fn default_overlap_chars() -> u32 {
	DEFAULT_OVERLAP_CHARS
}

fn default_embed_batch_size() -> u32 {
	32
}

fn default_auth_mode() -> String {
	"off".to_string()
}
