use clap::Parser;

use nota_mcp::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	nota_mcp::run(args).await
}
