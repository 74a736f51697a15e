pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{field} must be non-empty.")]
	Empty { field: &'static str },
}
