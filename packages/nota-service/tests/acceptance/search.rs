use std::sync::{Arc, atomic::Ordering};

use super::{
	FailingEmbedding, FailingIndex, FailingRerank, HashEmbedding, MemoryIndex, ScriptedRerank,
	TableRerank, UnfilteredIndex, build_service, build_service_with,
};
use nota_providers::rerank::RerankScore;
use nota_service::{
	BELOW_THRESHOLD_MESSAGE, Error, FindNotesRequest, NO_CANDIDATES_MESSAGE, SearchOutcome,
};

fn request(query: &str, source_file: Option<&str>) -> FindNotesRequest {
	FindNotesRequest { query: query.to_string(), source_file: source_file.map(str::to_string) }
}

const MIXED_CORPUS: [(&str, &str); 6] = [
	("notes.txt", "Project deadlines: the beta ships on Friday."),
	("notes.txt", "Grocery list: eggs, milk and coffee."),
	("journal.md", "Deadline anxiety kept me up last night."),
	("journal.md", "Went for a long walk by the river."),
	("plans.md", "Q3 roadmap with milestones and deadlines."),
	("plans.md", "Office move is scheduled for next month."),
];

#[tokio::test]
async fn relevant_note_is_reported_with_source_and_score() {
	let index = Arc::new(MemoryIndex::with_chunks(&[(
		"notes.txt",
		"Project deadlines: the beta ships on Friday.",
	)]));
	let rerank =
		Arc::new(TableRerank::new(&[("Project deadlines: the beta ships on Friday.", 0.82)], 0.0));
	let service = build_service(index, Arc::new(HashEmbedding::new()), rerank);
	let output = service
		.find_relevant_notes(request("project deadlines", None))
		.await
		.expect("Search failed.");

	assert!(output.contains("Source: notes.txt"), "{output}");
	assert!(output.contains("Relevance: 0.820"), "{output}");
	assert!(output.contains("the beta ships on Friday."), "{output}");
}

#[tokio::test]
async fn empty_corpus_skips_the_reranker() {
	let rerank = Arc::new(TableRerank::new(&[], 0.9));
	let service = build_service(
		Arc::new(MemoryIndex::default()),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);
	let output = service
		.find_relevant_notes(request("project deadlines", None))
		.await
		.expect("Search failed.");

	assert_eq!(output, NO_CANDIDATES_MESSAGE);
	assert_eq!(rerank.count(), 0);
}

#[tokio::test]
async fn low_scores_everywhere_yield_the_below_threshold_message() {
	let chunks: Vec<(&str, String)> =
		(0..10).map(|i| ("notes.txt", format!("Unrelated chunk number {i}."))).collect();
	let borrowed: Vec<(&str, &str)> =
		chunks.iter().map(|(source, text)| (*source, text.as_str())).collect();
	let rerank = Arc::new(TableRerank::new(&[], 0.05));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&borrowed)),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);
	let outcome = service.search(request("project deadlines", None)).await.expect("Search failed.");

	assert_eq!(outcome, SearchOutcome::BelowThreshold { candidate_count: 10 });
	assert_eq!(outcome.render(), BELOW_THRESHOLD_MESSAGE);
	assert_eq!(rerank.count(), 1);
}

#[tokio::test]
async fn filter_matching_nothing_behaves_like_an_empty_corpus() {
	let rerank = Arc::new(TableRerank::new(&[], 0.9));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);
	let output = service
		.find_relevant_notes(request("project deadlines", Some("other.pdf")))
		.await
		.expect("Search failed.");

	assert_eq!(output, NO_CANDIDATES_MESSAGE);
	assert_eq!(rerank.count(), 0);
}

#[tokio::test]
async fn filter_restricts_every_reranked_candidate() {
	let rerank = Arc::new(TableRerank::new(&[], 0.5));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);
	let outcome = service
		.search(request("deadlines", Some("journal.md")))
		.await
		.expect("Search failed.");
	let seen = rerank.seen.lock().expect("Rerank log lock poisoned.").clone();

	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].len(), 2);
	assert!(seen[0].iter().all(|text| text == MIXED_CORPUS[2].1 || text == MIXED_CORPUS[3].1));
	assert!(
		outcome
			.results()
			.iter()
			.all(|result| result.chunk.metadata.source_file.as_deref() == Some("journal.md"))
	);
}

#[tokio::test]
async fn accepted_results_are_bounded_sorted_and_above_threshold() {
	let rerank = Arc::new(TableRerank::new(
		&[
			(MIXED_CORPUS[0].1, 0.91),
			(MIXED_CORPUS[1].1, 0.02),
			(MIXED_CORPUS[2].1, 0.44),
			(MIXED_CORPUS[3].1, 0.1),
			(MIXED_CORPUS[4].1, 0.67),
			(MIXED_CORPUS[5].1, 0.3),
		],
		0.0,
	));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank,
	);
	let outcome = service.search(request("deadlines", None)).await.expect("Search failed.");
	let scores: Vec<f32> =
		outcome.results().iter().map(|result| result.relevance.value()).collect();

	assert_eq!(scores, vec![0.91, 0.67, 0.44]);

	let output = outcome.render();

	assert!(output.starts_with("[1] Relevance: 0.910 | Source: notes.txt"), "{output}");
	assert_eq!(output.matches("\n\n---\n\n").count(), 2);
}

#[tokio::test]
async fn fewer_passing_entries_are_not_padded() {
	let rerank = Arc::new(TableRerank::new(&[(MIXED_CORPUS[4].1, 0.5)], 0.01));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank,
	);
	let outcome = service.search(request("roadmap", None)).await.expect("Search failed.");

	assert_eq!(outcome.results().len(), 1);
	assert_eq!(outcome.results()[0].chunk.text, MIXED_CORPUS[4].1);
}

#[tokio::test]
async fn repeated_queries_render_identically() {
	let rerank = Arc::new(TableRerank::new(&[], 0.4));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank,
	);
	let first =
		service.find_relevant_notes(request("deadlines", None)).await.expect("Search failed.");
	let second =
		service.find_relevant_notes(request("deadlines", None)).await.expect("Search failed.");

	assert_eq!(first, second);
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_downstream_call() {
	let index = Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS));
	let embedding = Arc::new(HashEmbedding::new());
	let rerank = Arc::new(TableRerank::new(&[], 0.9));
	let service = build_service(index.clone(), embedding.clone(), rerank.clone());
	let err = service.search(request("   ", None)).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
	assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
	assert_eq!(index.queries.load(Ordering::SeqCst), 0);
	assert_eq!(rerank.count(), 0);
}

#[tokio::test]
async fn blank_source_filter_is_rejected() {
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		Arc::new(TableRerank::new(&[], 0.9)),
	);
	let err = service.search(request("deadlines", Some(" "))).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "{err:?}");
}

#[tokio::test]
async fn reranker_failure_propagates() {
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		Arc::new(FailingRerank),
	);
	let err = service.search(request("deadlines", None)).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Provider { .. }), "{err:?}");
}

#[tokio::test]
async fn candidates_dropped_by_the_reranker_are_excluded() {
	let rerank = Arc::new(ScriptedRerank {
		scores: vec![RerankScore { index: 1, score: 0.7 }, RerankScore { index: 0, score: 0.2 }],
	});
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank,
	);
	let outcome = service.search(request("deadlines", None)).await.expect("Search failed.");
	let ids: Vec<usize> = outcome.results().iter().map(|result| result.id.0).collect();

	assert_eq!(ids, vec![1, 0]);
}

#[tokio::test]
async fn unknown_candidate_index_from_the_reranker_is_an_error() {
	let rerank = Arc::new(ScriptedRerank { scores: vec![RerankScore { index: 42, score: 0.9 }] });
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS)),
		Arc::new(HashEmbedding::new()),
		rerank,
	);
	let err = service.search(request("deadlines", None)).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Provider { .. }), "{err:?}");
}

#[tokio::test]
async fn over_fetch_is_bounded_by_candidate_k() {
	let chunks: Vec<(&str, String)> =
		(0..25).map(|i| ("notes.txt", format!("Meeting note {i} about deadlines."))).collect();
	let borrowed: Vec<(&str, &str)> =
		chunks.iter().map(|(source, text)| (*source, text.as_str())).collect();
	let rerank = Arc::new(TableRerank::new(&[], 0.5));
	let service = build_service(
		Arc::new(MemoryIndex::with_chunks(&borrowed)),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);

	service.search(request("deadlines", None)).await.expect("Search failed.");

	let seen = rerank.seen.lock().expect("Rerank log lock poisoned.").clone();

	assert_eq!(seen[0].len(), 10);
}

#[tokio::test]
async fn chunks_outside_the_filter_are_dropped_even_if_the_index_returns_them() {
	let rerank = Arc::new(TableRerank::new(&[], 0.5));
	let service = build_service_with(
		Arc::new(UnfilteredIndex { inner: MemoryIndex::with_chunks(&MIXED_CORPUS) }),
		Arc::new(HashEmbedding::new()),
		rerank.clone(),
	);
	let outcome = service
		.search(request("deadlines", Some("plans.md")))
		.await
		.expect("Search failed.");
	let seen = rerank.seen.lock().expect("Rerank log lock poisoned.").clone();

	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].len(), 2);
	assert!(seen[0].iter().all(|text| text == MIXED_CORPUS[4].1 || text == MIXED_CORPUS[5].1));
	assert!(
		outcome
			.results()
			.iter()
			.all(|result| result.chunk.metadata.source_file.as_deref() == Some("plans.md"))
	);
}

#[tokio::test]
async fn embedding_failure_propagates_before_reranking() {
	let index = Arc::new(MemoryIndex::with_chunks(&MIXED_CORPUS));
	let rerank = Arc::new(TableRerank::new(&[], 0.9));
	let service = build_service_with(index.clone(), Arc::new(FailingEmbedding), rerank.clone());
	let err = service.search(request("deadlines", None)).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Provider { .. }), "{err:?}");
	assert_eq!(index.queries.load(Ordering::SeqCst), 0);
	assert_eq!(rerank.count(), 0);
}

#[tokio::test]
async fn index_failure_propagates_before_reranking() {
	let rerank = Arc::new(TableRerank::new(&[], 0.9));
	let service =
		build_service_with(Arc::new(FailingIndex), Arc::new(HashEmbedding::new()), rerank.clone());
	let err = service.search(request("deadlines", None)).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Index { .. }), "{err:?}");
	assert_eq!(rerank.count(), 0);
}
