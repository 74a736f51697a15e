pub const DENSE_VECTOR_NAME: &str = "dense";

use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		DeletePointsBuilder, Distance, FieldType, Filter, PointStruct, Query, QueryPointsBuilder, UpsertPointsBuilder,
		Vector, VectorParamsBuilder, VectorsConfigBuilder,
	},
};
use uuid::Uuid;

use crate::{Error, Result, payload};
use nota_domain::{DocumentChunk, SimilarityScore, chunk::SOURCE_FILE_KEY};

/// A chunk returned by a nearest-neighbor query, in index order.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
	pub chunk: DocumentChunk,
	pub similarity: SimilarityScore,
}

/// A chunk ready to be written to the index.
#[derive(Clone, Debug)]
pub struct ChunkPoint {
	pub id: Uuid,
	pub vector: Vec<f32>,
	pub chunk: DocumentChunk,
}

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &nota_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its `source_file` keyword index when missing.
	///
	/// Returns `true` when the collection was created by this call.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(false);
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;
		self.client
			.create_field_index(
				CreateFieldIndexCollectionBuilder::new(
					self.collection.clone(),
					SOURCE_FILE_KEY,
					FieldType::Keyword,
				)
				.wait(true),
			)
			.await?;

		tracing::info!(collection = %self.collection, "Created Qdrant collection.");

		Ok(true)
	}

	pub async fn reset_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			self.client.delete_collection(self.collection.clone()).await?;

			tracing::info!(collection = %self.collection, "Dropped Qdrant collection.");
		}

		self.ensure_collection().await?;

		Ok(())
	}

	/// Nearest-neighbor query over the dense vector.
	///
	/// `source_file` restricts the search to points whose `source_file` payload equals it
	/// exactly.
	pub async fn search(
		&self,
		vector: Vec<f32>,
		limit: u32,
		source_file: Option<&str>,
	) -> Result<Vec<ScoredChunk>> {
		self.check_dim(&vector)?;

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(limit as u64);

		if let Some(filter) = source_file_filter(source_file) {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;
		let mut out = Vec::with_capacity(response.result.len());

		for point in response.result {
			let score = point.score;
			let Some(chunk) = payload::chunk_from_payload(point.payload) else {
				tracing::warn!(point_id = ?point.id, "Qdrant point is missing text payload.");

				continue;
			};

			out.push(ScoredChunk { chunk, similarity: SimilarityScore::new(score) });
		}

		Ok(out)
	}

	pub async fn upsert_chunks(&self, points: Vec<ChunkPoint>) -> Result<usize> {
		if points.is_empty() {
			return Ok(0);
		}

		let mut structs = Vec::with_capacity(points.len());

		for point in points {
			self.check_dim(&point.vector)?;

			let mut vector_map = HashMap::new();

			vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(point.vector));

			let payload = Payload::from(payload::chunk_to_payload(&point.chunk));

			structs.push(PointStruct::new(point.id.to_string(), vector_map, payload));
		}

		let count = structs.len();
		let upsert = UpsertPointsBuilder::new(self.collection.clone(), structs).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(count)
	}

	/// Removes every point whose `source_file` payload equals `source_file`.
	pub async fn delete_source_file(&self, source_file: &str) -> Result<()> {
		let Some(filter) = source_file_filter(Some(source_file)) else { return Ok(()) };

		self.client
			.delete_points(
				DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true),
			)
			.await?;

		tracing::debug!(
			collection = %self.collection,
			source_file,
			"Deleted points for source file."
		);

		Ok(())
	}

	pub async fn count(&self) -> Result<u64> {
		let response =
			self.client.count(CountPointsBuilder::new(self.collection.clone()).exact(true)).await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}

	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector dimension {} does not match collection dimension {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		Ok(())
	}
}

/// Point id derived from the file and the chunk's position within it.
///
/// Independent of the run-wide `chunk_id`, so other files changing never moves these ids.
pub fn chunk_point_id(source_file: &str, position: usize) -> Uuid {
	let name = format!("{source_file}:{position}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub fn source_file_filter(source_file: Option<&str>) -> Option<Filter> {
	source_file.map(|name| Filter::must([Condition::matches(SOURCE_FILE_KEY, name.to_string())]))
}
