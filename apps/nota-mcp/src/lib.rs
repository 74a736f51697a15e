pub mod server;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use nota_config::{Config, Security};
use nota_service::NotaService;
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
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum McpAuthState {
	Off,
	StaticKeys { bearer_token: String },
}

pub async fn run(args: Args) -> Result<()> {
	let config = nota_config::load(&args.config)?;

	init_tracing(&config);

	let request_timeout = Duration::from_millis(config.service.request_timeout_ms);

	if config.service.transport == "http" {
		let auth_state = build_auth_state(&config.security, &config.service.mcp_bind)?;
		let bind_addr = config.service.mcp_bind.clone();
		let service = build_service(config)?;

		server::serve_http(&bind_addr, auth_state, service, request_timeout).await
	} else {
		let service = build_service(config)?;

		server::serve_stdio(service, request_timeout).await
	}
}

fn build_service(config: Config) -> Result<Arc<NotaService>> {
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	Ok(Arc::new(NotaService::new(config, qdrant)))
}

/// Logs go to stderr; stdout carries the stdio transport.
fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn build_auth_state(security: &Security, mcp_bind: &str) -> Result<McpAuthState> {
	match security.auth_mode.trim() {
		"off" => {
			enforce_loopback_for_off_mode(mcp_bind)?;

			Ok(McpAuthState::Off)
		},
		"static_keys" => {
			let bearer_token = security.bearer_token.clone().ok_or_else(|| {
				eyre::eyre!("security.bearer_token is required when security.auth_mode=static_keys.")
			})?;

			Ok(McpAuthState::StaticKeys { bearer_token })
		},
		other => Err(eyre::eyre!(
			"security.auth_mode must be one of off or static_keys for nota-mcp, got {other}."
		)),
	}
}

fn enforce_loopback_for_off_mode(mcp_bind: &str) -> Result<()> {
	let bind_addr: SocketAddr = mcp_bind.parse().map_err(|err| {
		eyre::eyre!(
			"service.mcp_bind must be a valid socket address when security.auth_mode=off: {err}"
		)
	})?;

	if !bind_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.mcp_bind must be a loopback address when security.auth_mode=off."
		));
	}

	Ok(())
}
