use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
	Router,
	body::Body,
	extract::State,
	http::{HeaderMap, Request, StatusCode},
	middleware::{self, Next},
	response::{IntoResponse, Response},
};
use color_eyre::Result;
use rmcp::{
	ErrorData, ServerHandler, ServiceExt,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, Content, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::McpAuthState;
use nota_service::{Error, FindNotesRequest, NotaService};

const HEADER_AUTHORIZATION: &str = "Authorization";

#[derive(Clone)]
struct NotaMcp {
	service: Arc<NotaService>,
	request_timeout: Duration,
	tool_router: ToolRouter<Self>,
}
impl NotaMcp {
	fn new(service: Arc<NotaService>, request_timeout: Duration) -> Self {
		Self { service, request_timeout, tool_router: Self::tool_router() }
	}
}

#[rmcp::tool_router]
impl NotaMcp {
	#[rmcp::tool(
		name = "find_relevant_notes",
		description = "Search personal notes and return only passages judged relevant to the query, with their source file and relevance score.",
		input_schema = find_relevant_notes_schema()
	)]
	async fn find_relevant_notes(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let query = take_required_string(&mut params, "query")?;
		let source_file = take_optional_string(&mut params, "source_file")?;
		let req = FindNotesRequest { query, source_file };
		let text = tokio::time::timeout(self.request_timeout, self.service.find_relevant_notes(req))
			.await
			.map_err(|_| {
				tracing::warn!(
					timeout_ms = self.request_timeout.as_millis() as u64,
					"Tool call timed out."
				);

				ErrorData::internal_error("Request timed out.", None)
			})?
			.map_err(map_service_error)?;

		Ok(CallToolResult::success(vec![Content::text(text)]))
	}
}

#[rmcp::tool_handler]
impl ServerHandler for NotaMcp {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"Answers questions from personal notes, returning only passages relevant enough to cite."
					.to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

pub async fn serve_stdio(service: Arc<NotaService>, request_timeout: Duration) -> Result<()> {
	tracing::info!("Serving MCP over stdio.");

	let running = NotaMcp::new(service, request_timeout).serve(rmcp::transport::stdio()).await?;
	let reason = running.waiting().await?;

	tracing::info!(?reason, "MCP session ended.");

	Ok(())
}

pub async fn serve_http(
	bind_addr: &str,
	auth_state: McpAuthState,
	service: Arc<NotaService>,
	request_timeout: Duration,
) -> Result<()> {
	let bind_addr: SocketAddr = bind_addr.parse()?;
	let session_manager: Arc<LocalSessionManager> = Default::default();
	let mcp_service = StreamableHttpService::new(
		move || Ok(NotaMcp::new(service.clone(), request_timeout)),
		session_manager,
		StreamableHttpServerConfig::default(),
	);
	let router = Router::new()
		.fallback_service(mcp_service)
		.layer(middleware::from_fn_with_state(auth_state, mcp_auth_middleware));
	let listener = TcpListener::bind(bind_addr).await?;

	tracing::info!(%bind_addr, "Serving MCP over streamable HTTP.");

	axum::serve(listener, router).await?;

	Ok(())
}

async fn mcp_auth_middleware(
	State(auth_state): State<McpAuthState>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if !is_authorized(req.headers(), &auth_state) {
		return (StatusCode::UNAUTHORIZED, "Missing or invalid bearer token.").into_response();
	}

	next.run(req).await
}

fn is_authorized(headers: &HeaderMap, auth_state: &McpAuthState) -> bool {
	match auth_state {
		McpAuthState::Off => true,
		McpAuthState::StaticKeys { bearer_token } =>
			read_bearer_token(headers).is_some_and(|token| token == bearer_token),
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(HEADER_AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn map_service_error(err: Error) -> ErrorData {
	match err {
		Error::InvalidRequest { message } => ErrorData::invalid_params(message, None),
		other => {
			tracing::error!(error = %other, "Tool call failed.");

			ErrorData::internal_error(other.to_string(), None)
		},
	}
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;

	match value {
		Value::String(text) => Ok(text),
		_ => Err(ErrorData::invalid_params(format!("{key} must be a string."), None)),
	}
}

/// A missing key and an explicit `null` both mean "not provided".
fn take_optional_string(params: &mut JsonObject, key: &str) -> Result<Option<String>, ErrorData> {
	match params.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(text)) => Ok(Some(text)),
		Some(_) =>
			Err(ErrorData::invalid_params(format!("{key} must be a string or null."), None)),
	}
}

fn find_relevant_notes_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["query"],
		"properties": {
			"query": { "type": "string", "description": "Question or topic to look up." },
			"source_file": {
				"type": ["string", "null"],
				"description": "Restrict the search to chunks from this file name."
			}
		}
	}))
}
