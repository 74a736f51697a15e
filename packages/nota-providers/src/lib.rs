pub mod embedding;
pub mod rerank;

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

/// An HTTP client that is built on first use and then shared.
///
/// Concurrent first callers race on a single initialization; exactly one client is built.
#[derive(Debug)]
pub struct LazyClient {
	timeout: Duration,
	client: OnceCell<Client>,
}
impl LazyClient {
	pub fn new(timeout_ms: u64) -> Self {
		Self { timeout: Duration::from_millis(timeout_ms), client: OnceCell::new() }
	}

	pub async fn get(&self) -> Result<&Client> {
		self.client
			.get_or_try_init(|| async {
				tracing::debug!(
					timeout_ms = self.timeout.as_millis() as u64,
					"Building provider HTTP client."
				);

				Client::builder().timeout(self.timeout).build().map_err(Error::from)
			})
			.await
	}

	pub fn is_initialized(&self) -> bool {
		self.client.initialized()
	}
}

/// Builds request headers. An empty `api_key` sends no `Authorization` header, which suits
/// local model servers.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let api_key = api_key.trim();

	if !api_key.is_empty() {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
