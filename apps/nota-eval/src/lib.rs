//! Runs both retrieval stages for one query and reports what each stage produced and how long
//! it took.

use std::{path::PathBuf, time::Instant};

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use nota_config::Config;
use nota_domain::{Candidate, Query, RankedResult};
use nota_service::{NotaService, SearchOutcome};
use nota_storage::qdrant::QdrantStore;

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Parser)]
#[command(
	version = nota_cli::VERSION,
	rename_all = "kebab",
	styles = nota_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", default_value = nota_cli::DEFAULT_CONFIG_PATH)]
	pub config: PathBuf,
	#[arg(long, short = 'q', value_name = "TEXT")]
	pub query: String,
	#[arg(long, value_name = "NAME")]
	pub source_file: Option<String>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	query: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	source_file: Option<String>,
	settings: EvalSettings,
	timings: StageTimings,
	candidates: Vec<Preview>,
	reranked: Vec<Preview>,
	accepted_count: usize,
	answer: String,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	candidate_k: u32,
	top_n: u32,
	min_relevance: f32,
}

#[derive(Debug, Default, Serialize)]
struct StageTimings {
	retrieve_ms: f64,
	rerank_ms: f64,
	total_ms: f64,
}

#[derive(Debug, Serialize, PartialEq)]
struct Preview {
	id: usize,
	score: f32,
	source_file: String,
	preview: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nota_config::load(&args.config)?;

	init_tracing(&config);

	let settings = EvalSettings {
		config_path: args.config.display().to_string(),
		candidate_k: config.retrieval.candidate_k,
		top_n: config.retrieval.top_n,
		min_relevance: config.retrieval.min_relevance,
	};
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let service = NotaService::new(config, qdrant);
	let query = Query::new(&args.query, args.source_file.as_deref())?;
	let output = evaluate(&service, &query, settings).await?;

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn evaluate(
	service: &NotaService,
	query: &Query,
	settings: EvalSettings,
) -> color_eyre::Result<EvalOutput> {
	let mut timings = StageTimings::default();
	let started = Instant::now();
	let candidates = service.retrieve(query).await?;

	timings.retrieve_ms = elapsed_ms(started);

	let candidate_previews = candidates.iter().map(candidate_preview).collect();
	let candidate_count = candidates.len();
	let ranked = if candidates.is_empty() {
		Vec::new()
	} else {
		let rerank_started = Instant::now();
		let ranked = service.rerank(query.text(), candidates).await?;

		timings.rerank_ms = elapsed_ms(rerank_started);

		ranked
	};
	let reranked = ranked.iter().map(ranked_preview).collect();
	let outcome = SearchOutcome::decide(
		candidate_count,
		ranked,
		settings.top_n as usize,
		settings.min_relevance,
	);

	timings.total_ms = elapsed_ms(started);

	Ok(EvalOutput {
		query: query.text().to_string(),
		source_file: query.source_file().map(str::to_string),
		settings,
		timings,
		candidates: candidate_previews,
		reranked,
		accepted_count: outcome.results().len(),
		answer: outcome.render(),
	})
}

fn elapsed_ms(started: Instant) -> f64 {
	started.elapsed().as_secs_f64() * 1_000.0
}

fn candidate_preview(candidate: &Candidate) -> Preview {
	Preview {
		id: candidate.id.0,
		score: candidate.similarity.value(),
		source_file: candidate.chunk.metadata.source_label().to_string(),
		preview: preview(&candidate.chunk.text),
	}
}

fn ranked_preview(result: &RankedResult) -> Preview {
	Preview {
		id: result.id.0,
		score: result.relevance.value(),
		source_file: result.chunk.metadata.source_label().to_string(),
		preview: preview(&result.chunk.text),
	}
}

fn preview(text: &str) -> String {
	let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");

	match flat.char_indices().nth(PREVIEW_CHARS) {
		Some((cut, _)) => format!("{}...", &flat[..cut]),
		None => flat,
	}
}
