use clap::Parser;

use nota_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	nota_eval::run(args).await
}
