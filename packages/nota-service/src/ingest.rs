//! Note ingestion: load text and PDF files, split them into chunks, embed and index them.

use std::{
	fs,
	path::{Path, PathBuf},
};

use lopdf::Document;
use serde::Serialize;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use walkdir::WalkDir;

use crate::{Error, NotaService, Result};
use nota_chunking::ChunkingConfig;
use nota_domain::{ChunkMetadata, DocumentChunk};
use nota_storage::qdrant::{self, ChunkPoint};

pub const INGESTED_AT_KEY: &str = "ingested_at";

const PDF_EXTENSION: &str = "pdf";

#[derive(Clone, Debug)]
pub struct IngestRequest {
	pub data_dir: PathBuf,
	/// Drop and recreate the index before writing.
	pub reset: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
	pub documents: usize,
	pub chunks: usize,
	/// Files that matched an extension but yielded no readable text.
	pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
	/// Base file name; stored as the `source_file` metadata value.
	pub source_file: String,
	pub text: String,
}

/// The chunks of one file, in file order. A chunk's position here is what its point id is
/// derived from.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentChunks {
	pub source_file: String,
	pub chunks: Vec<DocumentChunk>,
}

impl NotaService {
	/// Indexes every matching file under `req.data_dir`.
	///
	/// Each file's previous points are deleted before its chunks are written, so a file that
	/// shrank or moved in the run order leaves nothing stale behind.
	pub async fn ingest(&self, req: IngestRequest) -> Result<IngestReport> {
		let (documents, skipped) = load_documents(&req.data_dir, &self.cfg.ingest.extensions);
		let ingested_at = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
			Error::Ingest { message: format!("Failed to format ingestion time: {err}.") }
		})?;
		let chunked = chunk_documents(
			&documents,
			&ChunkingConfig {
				chunk_chars: self.cfg.ingest.chunk_chars as usize,
				overlap_chars: self.cfg.ingest.overlap_chars as usize,
			},
			&ingested_at,
		);

		self.index.prepare(req.reset).await?;

		let batch_size = (self.cfg.ingest.embed_batch_size as usize).max(1);
		let mut written = 0_usize;

		for document in &chunked {
			if !req.reset {
				self.index.delete_source(&document.source_file).await?;
			}

			for (batch_index, batch) in document.chunks.chunks(batch_size).enumerate() {
				let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
				let vectors =
					self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

				if vectors.len() != batch.len() {
					return Err(Error::Provider {
						message: "Embedding provider returned a mismatched vector count."
							.to_string(),
					});
				}

				let offset = batch_index * batch_size;
				let mut points = Vec::with_capacity(batch.len());

				for (position, (chunk, vector)) in batch.iter().zip(vectors).enumerate() {
					self.check_dim(&vector)?;

					points.push(ChunkPoint {
						id: qdrant::chunk_point_id(&document.source_file, offset + position),
						vector,
						chunk: chunk.clone(),
					});
				}

				written += self.index.upsert(points).await?;
			}

			tracing::debug!(
				source_file = %document.source_file,
				chunks = document.chunks.len(),
				"Indexed document."
			);
		}

		let report = IngestReport { documents: documents.len(), chunks: written, skipped };

		tracing::info!(
			data_dir = %req.data_dir.display(),
			documents = report.documents,
			chunks = report.chunks,
			skipped = report.skipped,
			reset = req.reset,
			"Ingestion finished."
		);

		Ok(report)
	}
}

/// Loads every file under `data_dir` whose extension is listed, in path order.
///
/// Returns the documents and the number of matching files that yielded no text. A missing
/// directory yields no documents.
pub fn load_documents(data_dir: &Path, extensions: &[String]) -> (Vec<SourceDocument>, usize) {
	if !data_dir.is_dir() {
		tracing::warn!(
			data_dir = %data_dir.display(),
			"Data directory not found; nothing to ingest."
		);

		return (Vec::new(), 0);
	}

	let mut documents = Vec::new();
	let mut skipped = 0_usize;

	for entry in WalkDir::new(data_dir).sort_by_file_name() {
		let entry = match entry {
			Ok(entry) => entry,
			Err(err) => {
				tracing::warn!(error = %err, "Failed to walk data directory entry.");

				continue;
			},
		};

		if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
			continue;
		}

		let Some(source_file) = entry.file_name().to_str().map(str::to_string) else {
			skipped += 1;

			continue;
		};

		match read_document(entry.path()) {
			Ok(text) => documents.push(SourceDocument { source_file, text }),
			Err(err) => {
				tracing::warn!(
					path = %entry.path().display(),
					error = %err,
					"Skipping unreadable file."
				);

				skipped += 1;
			},
		}
	}

	(documents, skipped)
}

/// Reads a file as text. PDFs go through page-wise text extraction, everything else is UTF-8.
pub fn read_document(path: &Path) -> Result<String> {
	let is_pdf = path
		.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION));

	if is_pdf {
		return extract_pdf_text(path);
	}

	fs::read_to_string(path).map_err(|err| Error::Ingest {
		message: format!("Failed to read {}: {err}.", path.display()),
	})
}

/// Splits documents into chunks.
///
/// `chunk_id` runs across the whole batch starting at zero and is metadata only.
pub fn chunk_documents(
	documents: &[SourceDocument],
	cfg: &ChunkingConfig,
	ingested_at: &str,
) -> Vec<DocumentChunks> {
	let mut next_id = 0_i64;

	documents
		.iter()
		.map(|document| {
			let chunks = nota_chunking::split_text(&document.text, cfg)
				.into_iter()
				.map(|piece| {
					let mut metadata = ChunkMetadata::new(document.source_file.clone(), next_id);

					metadata
						.extra
						.insert(INGESTED_AT_KEY.to_string(), Value::String(ingested_at.to_string()));

					next_id += 1;

					DocumentChunk { text: piece.text, metadata }
				})
				.collect();

			DocumentChunks { source_file: document.source_file.clone(), chunks }
		})
		.collect()
}

fn extract_pdf_text(path: &Path) -> Result<String> {
	let document = Document::load(path).map_err(|err| Error::Ingest {
		message: format!("Failed to load PDF {}: {err}.", path.display()),
	})?;
	let mut pages = Vec::new();

	// `get_pages` is keyed by page number, so iteration is in page order.
	for page_number in document.get_pages().into_keys() {
		match document.extract_text(&[page_number]) {
			Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
			Ok(_) => {},
			Err(err) => tracing::warn!(
				path = %path.display(),
				page_number,
				error = %err,
				"Skipping PDF page without extractable text."
			),
		}
	}

	if pages.is_empty() {
		return Err(Error::Ingest {
			message: format!("PDF {} has no extractable text.", path.display()),
		});
	}

	Ok(pages.join("\n\n"))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
		.unwrap_or(false)
}
