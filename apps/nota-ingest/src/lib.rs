use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nota_service::{IngestRequest, NotaService};
use nota_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(
	version = nota_cli::VERSION,
	rename_all = "kebab",
	styles = nota_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", default_value = nota_cli::DEFAULT_CONFIG_PATH)]
	pub config: PathBuf,
	/// Overrides `ingest.data_dir`.
	#[arg(long, short = 'd', value_name = "DIR")]
	pub data_dir: Option<PathBuf>,
	/// Drops and recreates the collection before indexing.
	#[arg(long)]
	pub reset: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nota_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let data_dir = args.data_dir.unwrap_or_else(|| config.ingest.data_dir.clone());
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let service = NotaService::new(config, qdrant);
	let report = service.ingest(IngestRequest { data_dir, reset: args.reset }).await?;

	println!(
		"Ingested {} chunks from {} documents ({} skipped).",
		report.chunks, report.documents, report.skipped
	);

	Ok(())
}
