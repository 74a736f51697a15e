use serde::Serialize;
use serde_json::{Map, Value};

use crate::{RelevanceScore, SimilarityScore};

pub const SOURCE_FILE_KEY: &str = "source_file";
pub const CHUNK_ID_KEY: &str = "chunk_id";
/// Label rendered when a chunk carries no `source_file`.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Chunk metadata with the keys the pipeline reads promoted to fields.
///
/// Every other key survives untouched in `extra`. A promoted key whose value has the wrong
/// shape is also kept in `extra` instead of failing the whole chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChunkMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source_file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chunk_id: Option<i64>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl ChunkMetadata {
	pub fn new(source_file: impl Into<String>, chunk_id: i64) -> Self {
		Self { source_file: Some(source_file.into()), chunk_id: Some(chunk_id), extra: Map::new() }
	}

	pub fn from_map(mut map: Map<String, Value>) -> Self {
		let source_file = match map.remove(SOURCE_FILE_KEY) {
			Some(Value::String(name)) => Some(name),
			Some(Value::Null) | None => None,
			Some(other) => {
				map.insert(SOURCE_FILE_KEY.to_string(), other);

				None
			},
		};
		let chunk_id = match map.remove(CHUNK_ID_KEY) {
			Some(Value::Number(number)) if number.as_i64().is_some() => number.as_i64(),
			Some(Value::Null) | None => None,
			Some(other) => {
				map.insert(CHUNK_ID_KEY.to_string(), other);

				None
			},
		};

		Self { source_file, chunk_id, extra: map }
	}

	pub fn into_map(self) -> Map<String, Value> {
		let mut map = self.extra;

		if let Some(source_file) = self.source_file {
			map.insert(SOURCE_FILE_KEY.to_string(), Value::String(source_file));
		}
		if let Some(chunk_id) = self.chunk_id {
			map.insert(CHUNK_ID_KEY.to_string(), Value::from(chunk_id));
		}

		map
	}

	pub fn source_label(&self) -> &str {
		self.source_file.as_deref().unwrap_or(UNKNOWN_SOURCE)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentChunk {
	pub text: String,
	pub metadata: ChunkMetadata,
}

/// Position of a candidate in the stage-1 result list; carried through reranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CandidateId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
	pub id: CandidateId,
	pub chunk: DocumentChunk,
	pub similarity: SimilarityScore,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedResult {
	pub id: CandidateId,
	pub chunk: DocumentChunk,
	pub relevance: RelevanceScore,
}
