use crate::{NotaService, Result};
use nota_domain::{Candidate, CandidateId, Query};

impl NotaService {
	/// Stage one: over-fetches `retrieval.candidate_k` chunks by vector similarity.
	///
	/// Candidates keep the index's order and are numbered by position.
	pub async fn retrieve(&self, query: &Query) -> Result<Vec<Candidate>> {
		let vector = self.embed_single(query.text()).await?;
		let hits = self
			.index
			.query(vector, self.cfg.retrieval.candidate_k, query.source_file())
			.await?;
		let mut candidates = Vec::with_capacity(hits.len());

		for hit in hits {
			if let Some(filter) = query.source_file()
				&& hit.chunk.metadata.source_file.as_deref() != Some(filter)
			{
				tracing::warn!(
					source_file = filter,
					hit_source_file = hit.chunk.metadata.source_file.as_deref(),
					"Index returned a chunk outside the source filter."
				);

				continue;
			}

			candidates.push(Candidate {
				id: CandidateId(candidates.len()),
				chunk: hit.chunk,
				similarity: hit.similarity,
			});
		}

		tracing::debug!(candidate_count = candidates.len(), "Retrieved candidates.");

		Ok(candidates)
	}
}
