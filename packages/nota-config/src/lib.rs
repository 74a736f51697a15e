mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, DEFAULT_CANDIDATE_K, DEFAULT_CHUNK_CHARS, DEFAULT_MIN_RELEVANCE, DEFAULT_OVERLAP_CHARS,
	DEFAULT_TOP_N, EmbeddingProviderConfig, Ingest, ProviderConfig, Providers, Qdrant, Retrieval,
	Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let transport = cfg.service.transport.as_str();

	if !matches!(transport, "stdio" | "http") {
		return Err(Error::Validation {
			message: "service.transport must be one of stdio or http.".to_string(),
		});
	}
	if transport == "http" && cfg.service.mcp_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.mcp_bind must be non-empty when service.transport=http.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("rerank", cfg.providers.rerank.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	if cfg.retrieval.top_n == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.candidate_k < cfg.retrieval.top_n {
		return Err(Error::Validation {
			message: "retrieval.candidate_k must be greater than or equal to retrieval.top_n."
				.to_string(),
		});
	}
	if !cfg.retrieval.min_relevance.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.min_relevance must be a finite number.".to_string(),
		});
	}
	if cfg.ingest.chunk_chars == 0 {
		return Err(Error::Validation {
			message: "ingest.chunk_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.overlap_chars >= cfg.ingest.chunk_chars {
		return Err(Error::Validation {
			message: "ingest.overlap_chars must be less than ingest.chunk_chars.".to_string(),
		});
	}
	if cfg.ingest.embed_batch_size == 0 {
		return Err(Error::Validation {
			message: "ingest.embed_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.extensions.is_empty() {
		return Err(Error::Validation {
			message: "ingest.extensions must be non-empty.".to_string(),
		});
	}

	match cfg.security.auth_mode.as_str() {
		"off" => {},
		"static_keys" =>
			if cfg.security.bearer_token.is_none() {
				return Err(Error::Validation {
					message: "security.bearer_token is required when security.auth_mode=static_keys."
						.to_string(),
				});
			},
		_ => {
			return Err(Error::Validation {
				message: "security.auth_mode must be one of off or static_keys.".to_string(),
			});
		},
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.transport = cfg.service.transport.trim().to_ascii_lowercase();
	cfg.security.auth_mode = cfg.security.auth_mode.trim().to_ascii_lowercase();

	if cfg.security.bearer_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false) {
		cfg.security.bearer_token = None;
	}

	for extension in &mut cfg.ingest.extensions {
		*extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
	}

	cfg.ingest.extensions.retain(|extension| !extension.is_empty());
}
