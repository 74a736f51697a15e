use serde::{Deserialize, Serialize};

use crate::{Error, LazyClient, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
	model: &'a str,
	input: &'a [String],
	dimensions: u32,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds `texts` in one request. Vectors come back in input order.
pub async fn embed(
	client: &LazyClient,
	cfg: &nota_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let request = EmbeddingRequest { model: &cfg.model, input: texts, dimensions: cfg.dimensions };
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

	tracing::debug!(inputs = texts.len(), "Embedding request finished.");

	order_embeddings(serde_json::from_slice(&body)?, texts.len())
}

/// Places each vector at its reported `index`, falling back to response position.
fn order_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
	if response.data.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider returned {} vectors for {expected} inputs.",
				response.data.len()
			),
		});
	}

	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (position, item) in response.data.into_iter().enumerate() {
		let index = item.index.unwrap_or(position);
		let slot = slots.get_mut(index).ok_or_else(|| Error::InvalidResponse {
			message: format!("Embedding index {index} is out of range."),
		})?;

		if slot.replace(item.embedding).is_some() {
			return Err(Error::InvalidResponse {
				message: format!("Embedding index {index} is duplicated."),
			});
		}
	}

	// Every slot is filled: the count matched and no index repeated.
	Ok(slots.into_iter().flatten().collect())
}
