use crate::{Error, NotaService, Result, search::policy};
use nota_domain::{Candidate, RankedResult, RelevanceScore};

impl NotaService {
	/// Stage two: rescores candidates with the reranker and orders them by relevance.
	///
	/// Candidates the reranker does not score are left out. The similarity score of each
	/// candidate is discarded here and never reaches the ranked output.
	pub async fn rerank(
		&self,
		query_text: &str,
		candidates: Vec<Candidate>,
	) -> Result<Vec<RankedResult>> {
		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let docs: Vec<String> =
			candidates.iter().map(|candidate| candidate.chunk.text.clone()).collect();
		let scores =
			self.providers.rerank.rerank(&self.cfg.providers.rerank, query_text, &docs).await?;
		let candidate_count = candidates.len();
		let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
		let mut ranked = Vec::with_capacity(scores.len());

		for score in scores {
			let candidate = slots.get_mut(score.index).and_then(Option::take).ok_or_else(|| {
				Error::Provider {
					message: format!(
						"Reranker returned an unknown or repeated candidate index {}.",
						score.index
					),
				}
			})?;

			ranked.push(RankedResult {
				id: candidate.id,
				chunk: candidate.chunk,
				relevance: RelevanceScore::new(score.score),
			});
		}

		if ranked.len() < candidate_count {
			tracing::debug!(
				candidate_count,
				scored = ranked.len(),
				"Reranker dropped candidates; they are excluded."
			);
		}

		policy::sort_by_relevance(&mut ranked);

		Ok(ranked)
	}
}
