use crate::{Error, Result};

/// A validated retrieval request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
	text: String,
	source_file: Option<String>,
}
impl Query {
	/// Trims both inputs. Blank query text or a blank source file filter is rejected.
	pub fn new(text: &str, source_file: Option<&str>) -> Result<Self> {
		let text = text.trim();

		if text.is_empty() {
			return Err(Error::Empty { field: "query" });
		}

		let source_file = match source_file.map(str::trim) {
			Some("") => return Err(Error::Empty { field: "source_file" }),
			Some(name) => Some(name.to_string()),
			None => None,
		};

		Ok(Self { text: text.to_string(), source_file })
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn source_file(&self) -> Option<&str> {
		self.source_file.as_deref()
	}
}
