use clap::Parser;

use nota_ingest::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	nota_ingest::run(args).await
}
