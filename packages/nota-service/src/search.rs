mod format;
mod policy;
mod rerank;
mod retrieval;

pub use format::format_results;
pub use policy::{select, sort_by_relevance};

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{NotaService, Result};
use nota_domain::{Query, RankedResult};

pub const NO_CANDIDATES_MESSAGE: &str = "No relevant notes found for this query.";
pub const BELOW_THRESHOLD_MESSAGE: &str =
	"Found some notes, but none were relevant enough to this query.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindNotesRequest {
	pub query: String,
	#[serde(default)]
	pub source_file: Option<String>,
}

/// Result of one pass through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
	/// The index returned nothing; the reranker was not consulted.
	NoCandidates,
	/// Candidates existed but every top entry scored below the acceptance threshold.
	BelowThreshold { candidate_count: usize },
	/// At most `retrieval.top_n` results, descending by relevance.
	Accepted(Vec<RankedResult>),
}
impl SearchOutcome {
	/// Classifies reranked candidates: no candidates, none accepted, or the accepted top
	/// entries. `ranked` may be in any order.
	pub fn decide(
		candidate_count: usize,
		ranked: Vec<RankedResult>,
		top_n: usize,
		min_relevance: f32,
	) -> Self {
		if candidate_count == 0 {
			return Self::NoCandidates;
		}

		let selected = select(ranked, top_n, min_relevance);

		if selected.is_empty() {
			return Self::BelowThreshold { candidate_count };
		}

		Self::Accepted(selected)
	}

	pub fn results(&self) -> &[RankedResult] {
		match self {
			Self::Accepted(results) => results,
			Self::NoCandidates | Self::BelowThreshold { .. } => &[],
		}
	}

	pub fn render(&self) -> String {
		match self {
			Self::NoCandidates => NO_CANDIDATES_MESSAGE.to_string(),
			Self::BelowThreshold { .. } => BELOW_THRESHOLD_MESSAGE.to_string(),
			Self::Accepted(results) => format_results(results),
		}
	}
}

impl NotaService {
	/// Tool entry point: runs the pipeline and renders the outcome as reader-facing text.
	pub async fn find_relevant_notes(&self, req: FindNotesRequest) -> Result<String> {
		Ok(self.search(req).await?.render())
	}

	pub async fn search(&self, req: FindNotesRequest) -> Result<SearchOutcome> {
		let query = Query::new(&req.query, req.source_file.as_deref())?;
		let started = Instant::now();
		let candidates = self.retrieve(&query).await?;

		if candidates.is_empty() {
			tracing::info!(
				source_file = query.source_file(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"No candidates found."
			);

			return Ok(SearchOutcome::NoCandidates);
		}

		let candidate_count = candidates.len();
		let ranked = self.rerank(query.text(), candidates).await?;
		let outcome = SearchOutcome::decide(
			candidate_count,
			ranked,
			self.cfg.retrieval.top_n as usize,
			self.cfg.retrieval.min_relevance,
		);

		tracing::info!(
			source_file = query.source_file(),
			candidate_count,
			accepted = outcome.results().len(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Search finished."
		);

		Ok(outcome)
	}
}
