pub mod ingest;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use ingest::{DocumentChunks, IngestReport, IngestRequest, SourceDocument};
pub use search::{
	BELOW_THRESHOLD_MESSAGE, FindNotesRequest, NO_CANDIDATES_MESSAGE, SearchOutcome,
};

use std::{future::Future, pin::Pin, sync::Arc};

use nota_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use nota_providers::{LazyClient, embedding, rerank, rerank::RerankScore};
use nota_storage::qdrant::{ChunkPoint, QdrantStore, ScoredChunk};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Scores documents against a query.
///
/// Each returned score names the position of its document in `docs`. Providers may reorder
/// or omit documents.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<RerankScore>>>;
}

/// Nearest-neighbor storage for embedded chunks.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Returns up to `limit` chunks in descending similarity order, restricted to chunks whose
	/// `source_file` equals `source_file` when one is given.
	fn query<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u32,
		source_file: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<ScoredChunk>>>;

	fn upsert<'a>(&'a self, points: Vec<ChunkPoint>) -> BoxFuture<'a, Result<usize>>;

	/// Makes the index ready for writes, dropping existing content when `reset` is set.
	fn prepare<'a>(&'a self, reset: bool) -> BoxFuture<'a, Result<()>>;

	/// Removes every chunk whose `source_file` equals `source_file`.
	fn delete_source<'a>(&'a self, source_file: &'a str) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}

pub struct NotaService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}

/// HTTP-backed providers. Each client is built on its first request.
struct HttpProviders {
	embedding_client: LazyClient,
	rerank_client: LazyClient,
}

impl EmbeddingProvider for HttpProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(&self.embedding_client, cfg, texts).await?) })
	}
}

impl RerankProvider for HttpProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<RerankScore>>> {
		Box::pin(async move { Ok(rerank::rerank(&self.rerank_client, cfg, query, docs).await?) })
	}
}

impl VectorIndex for QdrantStore {
	fn query<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u32,
		source_file: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<ScoredChunk>>> {
		Box::pin(async move { Ok(self.search(vector, limit, source_file).await?) })
	}

	fn upsert<'a>(&'a self, points: Vec<ChunkPoint>) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move { Ok(self.upsert_chunks(points).await?) })
	}

	fn prepare<'a>(&'a self, reset: bool) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if reset {
				self.reset_collection().await?;
			} else {
				self.ensure_collection().await?;
			}

			Ok(())
		})
	}

	fn delete_source<'a>(&'a self, source_file: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.delete_source_file(source_file).await?) })
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, rerank: Arc<dyn RerankProvider>) -> Self {
		Self { embedding, rerank }
	}

	pub fn http(cfg: &nota_config::Providers) -> Self {
		let provider = Arc::new(HttpProviders {
			embedding_client: LazyClient::new(cfg.embedding.timeout_ms),
			rerank_client: LazyClient::new(cfg.rerank.timeout_ms),
		});

		Self { embedding: provider.clone(), rerank: provider }
	}
}

impl NotaService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		let providers = Providers::http(&cfg.providers);

		Self { cfg, index: Arc::new(qdrant), providers }
	}

	pub fn with_parts(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		Self { cfg, index, providers }
	}

	pub(crate) async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&text.to_string()))
			.await?;
		let vector = embeddings.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		self.check_dim(&vector)?;

		Ok(vector)
	}

	pub(crate) fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(())
	}
}
