pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Ingest error: {message}")]
	Ingest { message: String },
}
impl From<nota_domain::Error> for Error {
	fn from(err: nota_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<nota_providers::Error> for Error {
	fn from(err: nota_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<nota_storage::Error> for Error {
	fn from(err: nota_storage::Error) -> Self {
		match err {
			nota_storage::Error::InvalidArgument(message) => Self::Index { message },
			nota_storage::Error::Qdrant(inner) => Self::Index { message: inner.to_string() },
		}
	}
}
