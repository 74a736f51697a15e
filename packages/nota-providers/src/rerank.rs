use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, LazyClient, Result};

/// Score for the document at `index` in the request batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RerankScore {
	pub index: usize,
	pub score: f32,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
	model: &'a str,
	query: &'a str,
	documents: &'a [String],
}

/// Cohere and Jina name the list `results`; some local servers use `data`.
#[derive(Deserialize)]
struct RerankResponse {
	#[serde(alias = "data")]
	results: Vec<RerankItem>,
}

#[derive(Deserialize)]
struct RerankItem {
	index: usize,
	#[serde(alias = "score")]
	relevance_score: f32,
}

/// Scores `docs` against `query`.
///
/// Documents the provider leaves out of its response are absent from the result; no score is
/// invented for them.
pub async fn rerank(
	client: &LazyClient,
	cfg: &nota_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<RerankScore>> {
	if docs.is_empty() {
		return Ok(Vec::new());
	}

	let request = RerankRequest { model: &cfg.model, query, documents: docs };
	let response = client
		.get()
		.await?
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&request)
		.send()
		.await?
		.error_for_status()?;
	let body = response.bytes().await?;
	let scores = check_indices(serde_json::from_slice(&body)?, docs.len())?;

	tracing::debug!(documents = docs.len(), scored = scores.len(), "Rerank request finished.");

	Ok(scores)
}

fn check_indices(response: RerankResponse, doc_count: usize) -> Result<Vec<RerankScore>> {
	let mut seen = HashSet::with_capacity(response.results.len());
	let mut scores = Vec::with_capacity(response.results.len());

	for RerankItem { index, relevance_score } in response.results {
		if index >= doc_count {
			return Err(Error::InvalidResponse {
				message: format!(
					"Rerank result index {index} is out of range for {doc_count} documents."
				),
			});
		}
		if !seen.insert(index) {
			return Err(Error::InvalidResponse {
				message: format!("Rerank result index {index} is duplicated."),
			});
		}

		scores.push(RerankScore { index, score: relevance_score });
	}

	Ok(scores)
}
