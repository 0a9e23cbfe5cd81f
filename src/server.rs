//! MCP server over stdio.
//!
//! [`TesseraServer`] adapts the transport-free dispatcher to rmcp's [`ServerHandler`]:
//! `list_tools` serves the sorted catalog, `call_tool` goes through
//! [`dispatch::call_tool`] so alias resolution and error mapping behave exactly as
//! they do for in-process callers.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServiceExt};
use serde_json::{json, Value};

use crate::config::TesseraConfig;
use crate::db::SqliteStore;
use crate::dispatch;
use crate::engine::{EngineContext, EngineSettings};
use crate::tools;

#[derive(Clone)]
pub struct TesseraServer {
    ctx: Arc<EngineContext>,
}

impl TesseraServer {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }
}

impl ServerHandler for TesseraServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tessera stores work-context frames for coding agents. Use frame_create to \
                 capture where you are, frame_search or frame_list to pick work back up, and \
                 help for the full tool list."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = tools::catalog()
            .into_iter()
            .map(|t| Tool::new(t.name, t.description, Arc::new(t.input_schema)))
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let args = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        match dispatch::call_tool(&self.ctx, &request.name, args).await {
            Ok(output) => {
                let mut content: Vec<Content> = output
                    .content
                    .into_iter()
                    .map(|c| Content::text(c.text))
                    .collect();
                if let Some(data) = output.data {
                    content.push(Content::json(data)?);
                }
                Ok(CallToolResult::success(content))
            }
            Err(error) => {
                let body = json!({ "error": error }).to_string();
                Ok(CallToolResult::error(vec![Content::text(body)]))
            }
        }
    }
}

/// Open the store, load the policy and build the engine for `config`.
pub fn build_engine(config: &TesseraConfig) -> Result<Arc<EngineContext>> {
    let db_path = config.resolved_db_path();
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!(db = %db_path.display(), "frame store ready");

    let settings = EngineSettings::from_config(config);
    let ctx = EngineContext::load(settings, store.clone(), store)
        .context("tool registry is inconsistent")?;
    Ok(Arc::new(ctx))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: TesseraConfig) -> Result<()> {
    tracing::info!("starting Tessera MCP server on stdio");

    let ctx = build_engine(&config)?;
    let server = TesseraServer::new(Arc::clone(&ctx))
        .serve(rmcp::transport::stdio())
        .await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;

    if let Err(e) = ctx.store.close() {
        tracing::warn!(error = %e, "failed to close frame store cleanly");
    }
    tracing::info!("MCP server shut down");
    Ok(())
}
