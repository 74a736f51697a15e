use std::{collections::HashSet, env, fs, path::PathBuf, sync::Arc};

use lopdf::{
	Document, Object, Stream,
	content::{Content, Operation},
	dictionary,
};

use super::{HashEmbedding, MemoryIndex, TableRerank, build_service};
use nota_service::{FindNotesRequest, IngestReport, IngestRequest, ingest};

struct TempDir {
	path: PathBuf,
}
impl TempDir {
	fn new() -> Self {
		let path = env::temp_dir().join(format!("nota_ingest_{}", uuid::Uuid::new_v4().simple()));

		fs::create_dir_all(&path).expect("Failed to create temp dir.");

		Self { path }
	}
}
impl Drop for TempDir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.path);
	}
}

/// Writes a PDF with one page per entry of `pages`, each showing its text in Courier.
fn write_pdf(dir: &TempDir, relative: &str, pages: &[&str]) {
	let mut doc = Document::with_version("1.5");
	let pages_id = doc.new_object_id();
	let font_id = doc.add_object(dictionary! {
		"Type" => "Font",
		"Subtype" => "Type1",
		"BaseFont" => "Courier",
		"Encoding" => "WinAnsiEncoding",
	});
	let resources_id = doc.add_object(dictionary! {
		"Font" => dictionary! { "F1" => font_id },
	});
	let mut kids: Vec<Object> = Vec::new();

	for text in pages {
		let content = Content {
			operations: vec![
				Operation::new("BT", vec![]),
				Operation::new("Tf", vec!["F1".into(), 12.into()]),
				Operation::new("Td", vec![72.into(), 720.into()]),
				Operation::new("Tj", vec![Object::string_literal(*text)]),
				Operation::new("ET", vec![]),
			],
		};
		let content_id = doc.add_object(Stream::new(
			dictionary! {},
			content.encode().expect("Failed to encode page content."),
		));
		let page_id = doc.add_object(dictionary! {
			"Type" => "Page",
			"Parent" => pages_id,
			"Contents" => content_id,
			"Resources" => resources_id,
			"MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
		});

		kids.push(page_id.into());
	}

	doc.objects.insert(
		pages_id,
		Object::Dictionary(dictionary! {
			"Type" => "Pages",
			"Kids" => kids,
			"Count" => pages.len() as i64,
		}),
	);

	let catalog_id = doc.add_object(dictionary! {
		"Type" => "Catalog",
		"Pages" => pages_id,
	});

	doc.trailer.set("Root", catalog_id);
	doc.save(dir.path.join(relative)).expect("Failed to write PDF fixture.");
}

fn write(dir: &TempDir, relative: &str, contents: &[u8]) {
	let path = dir.path.join(relative);

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).expect("Failed to create parent dir.");
	}

	fs::write(path, contents).expect("Failed to write fixture.");
}

#[test]
fn loads_matching_files_recursively_in_path_order() {
	let dir = TempDir::new();

	write(&dir, "b.md", b"second");
	write(&dir, "a.txt", b"first");
	write(&dir, "nested/c.TXT", b"third");
	write(&dir, "skip.pdf", b"%PDF");
	write(&dir, "bad.txt", &[0xff, 0xfe, 0x00]);

	let extensions = vec!["txt".to_string(), "md".to_string()];
	let (documents, skipped) = ingest::load_documents(&dir.path, &extensions);
	let names: Vec<&str> = documents.iter().map(|doc| doc.source_file.as_str()).collect();

	assert_eq!(names, vec!["a.txt", "b.md", "c.TXT"]);
	assert_eq!(skipped, 1);
}

#[test]
fn missing_data_dir_loads_nothing() {
	let dir = TempDir::new();
	let (documents, skipped) =
		ingest::load_documents(&dir.path.join("absent"), &["txt".to_string()]);

	assert!(documents.is_empty());
	assert_eq!(skipped, 0);
}

#[tokio::test]
async fn ingested_notes_are_searchable() {
	let dir = TempDir::new();

	write(&dir, "notes.txt", b"Project deadlines: the beta ships on Friday.");
	write(&dir, "journal.md", b"Went for a long walk by the river.");

	let index = Arc::new(MemoryIndex::default());
	let rerank = Arc::new(TableRerank::new(
		&[("Project deadlines: the beta ships on Friday.", 0.82)],
		0.01,
	));
	let service = build_service(index.clone(), Arc::new(HashEmbedding::new()), rerank);
	let report = service
		.ingest(IngestRequest { data_dir: dir.path.clone(), reset: false })
		.await
		.expect("Ingest failed.");

	assert_eq!(report, IngestReport { documents: 2, chunks: 2, skipped: 0 });
	assert_eq!(index.len(), 2);
	assert_eq!(*index.prepared.lock().expect("Index lock poisoned."), vec![false]);

	let output = service
		.find_relevant_notes(FindNotesRequest {
			query: "project deadlines".to_string(),
			source_file: None,
		})
		.await
		.expect("Search failed.");

	assert!(output.contains("Source: notes.txt"), "{output}");
	assert!(!output.contains("journal.md"), "{output}");
}

#[tokio::test]
async fn reingesting_overwrites_points_and_reset_clears_stale_ones() {
	let dir = TempDir::new();

	write(&dir, "notes.txt", b"Alpha.");

	let index = Arc::new(MemoryIndex::with_chunks(&[("old.txt", "Stale note.")]));
	let service = build_service(
		index.clone(),
		Arc::new(HashEmbedding::new()),
		Arc::new(TableRerank::new(&[], 0.5)),
	);
	let req = IngestRequest { data_dir: dir.path.clone(), reset: false };

	service.ingest(req.clone()).await.expect("Ingest failed.");
	service.ingest(req).await.expect("Ingest failed.");

	assert_eq!(index.len(), 2);

	service
		.ingest(IngestRequest { data_dir: dir.path.clone(), reset: true })
		.await
		.expect("Ingest failed.");

	assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn long_notes_are_embedded_in_batches() {
	let dir = TempDir::new();
	let paragraph = "word ".repeat(150);
	let body = vec![paragraph; 40].join("\n\n");

	write(&dir, "long.md", body.as_bytes());

	let embedding = Arc::new(HashEmbedding::new());
	let index = Arc::new(MemoryIndex::default());
	let service =
		build_service(index.clone(), embedding.clone(), Arc::new(TableRerank::new(&[], 0.5)));
	let report = service
		.ingest(IngestRequest { data_dir: dir.path.clone(), reset: false })
		.await
		.expect("Ingest failed.");
	let batches = embedding.calls.load(std::sync::atomic::Ordering::SeqCst);

	assert!(report.chunks > 32, "{report:?}");
	assert_eq!(index.len(), report.chunks);
	assert_eq!(batches, report.chunks.div_ceil(32));
}

#[test]
fn pdf_pages_are_loaded_in_order_and_broken_pdfs_are_skipped() {
	let dir = TempDir::new();

	write_pdf(&dir, "handbook.pdf", &["Expenses are due monthly.", "Travel needs approval."]);
	write(&dir, "broken.pdf", b"%PDF-1.5 truncated");

	let extensions = vec!["txt".to_string(), "md".to_string(), "pdf".to_string()];
	let (documents, skipped) = ingest::load_documents(&dir.path, &extensions);

	assert_eq!(skipped, 1);
	assert_eq!(documents.len(), 1);
	assert_eq!(documents[0].source_file, "handbook.pdf");

	let text = &documents[0].text;
	let expenses = text.find("Expenses").expect("First page text missing.");
	let travel = text.find("Travel").expect("Second page text missing.");

	assert!(expenses < travel, "{text}");
}

#[tokio::test]
async fn ingested_pdf_is_searchable_by_source_file() {
	let dir = TempDir::new();

	write_pdf(&dir, "handbook.pdf", &["Expenses are due monthly."]);
	write(&dir, "notes.txt", b"Expenses for the offsite are still open.");

	let index = Arc::new(MemoryIndex::default());
	let service = build_service(
		index.clone(),
		Arc::new(HashEmbedding::new()),
		Arc::new(TableRerank::new(&[], 0.6)),
	);
	let report = service
		.ingest(IngestRequest { data_dir: dir.path.clone(), reset: false })
		.await
		.expect("Ingest failed.");

	assert_eq!(report, IngestReport { documents: 2, chunks: 2, skipped: 0 });

	let output = service
		.find_relevant_notes(FindNotesRequest {
			query: "expenses".to_string(),
			source_file: Some("handbook.pdf".to_string()),
		})
		.await
		.expect("Search failed.");

	assert!(output.contains("Source: handbook.pdf"), "{output}");
	assert!(output.contains("Expenses"), "{output}");
	assert!(!output.contains("notes.txt"), "{output}");
}

#[tokio::test]
async fn adding_a_file_between_runs_leaves_no_duplicates() {
	let dir = TempDir::new();

	write(&dir, "a.txt", b"Alpha release notes.");
	write(&dir, "c.txt", b"Gamma retrospective.");

	let index = Arc::new(MemoryIndex::default());
	let service = build_service(
		index.clone(),
		Arc::new(HashEmbedding::new()),
		Arc::new(TableRerank::new(&[], 0.6)),
	);
	let req = IngestRequest { data_dir: dir.path.clone(), reset: false };

	service.ingest(req.clone()).await.expect("Ingest failed.");
	write(&dir, "b.txt", b"Beta planning.");
	service.ingest(req).await.expect("Ingest failed.");

	let texts = index.texts();
	let distinct: HashSet<&String> = texts.iter().collect();

	assert_eq!(index.len(), 3);
	assert_eq!(distinct.len(), texts.len(), "{texts:?}");

	let output = service
		.find_relevant_notes(FindNotesRequest {
			query: "gamma retrospective".to_string(),
			source_file: None,
		})
		.await
		.expect("Search failed.");

	assert_eq!(output.matches("Gamma retrospective.").count(), 1, "{output}");
}

#[tokio::test]
async fn shrinking_a_file_removes_its_trailing_chunks() {
	let dir = TempDir::new();
	let paragraph = "word ".repeat(150);

	write(&dir, "long.md", vec![paragraph; 6].join("\n\n").as_bytes());

	let index = Arc::new(MemoryIndex::default());
	let service = build_service(
		index.clone(),
		Arc::new(HashEmbedding::new()),
		Arc::new(TableRerank::new(&[], 0.6)),
	);
	let req = IngestRequest { data_dir: dir.path.clone(), reset: false };
	let first = service.ingest(req.clone()).await.expect("Ingest failed.");

	write(&dir, "long.md", b"Short now.");

	let second = service.ingest(req).await.expect("Ingest failed.");

	assert!(first.chunks > 1, "{first:?}");
	assert_eq!(second.chunks, 1);
	assert_eq!(index.texts(), vec!["Short now.".to_string()]);
}
