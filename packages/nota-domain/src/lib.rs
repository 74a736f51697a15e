pub mod chunk;
pub mod query;
pub mod score;

mod error;

pub use chunk::{Candidate, CandidateId, ChunkMetadata, DocumentChunk, RankedResult};
pub use error::{Error, Result};
pub use query::Query;
pub use score::{RelevanceScore, SimilarityScore};
