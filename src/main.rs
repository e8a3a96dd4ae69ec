use anyhow::{Context, Result};
use axum::Router;
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService},
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use compliance_assistant::ComplianceAssistant;
use compliance_assistant::chat;
use compliance_assistant::config::Config;
use compliance_assistant::service::ComplianceAssistantService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing to stderr for MCP compatibility
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());
    let assistant = ComplianceAssistant::new(Arc::clone(&config))?;
    let service = assistant.mcp_service();

    // Choose transport: stdio (default) or http
    let transport = std::env::var("CA_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
    match transport.as_str() {
        "http" | "streamable_http" => {
            let bind: SocketAddr = config.http.bind.parse().with_context(|| {
                format!(
                    "Invalid CA_HTTP_BIND '{}' (expected host:port)",
                    config.http.bind
                )
            })?;
            let path = config.http.mcp_path.clone();

            let svc_factory_service = service.clone();
            let session_manager: rmcp::transport::streamable_http_server::session::local::LocalSessionManager = Default::default();
            let http_service: StreamableHttpService<ComplianceAssistantService, _> =
                StreamableHttpService::new(
                    move || Ok(svc_factory_service.clone()),
                    Arc::new(session_manager),
                    StreamableHttpServerConfig {
                        stateful_mode: true,
                        sse_keep_alive: Some(Duration::from_secs(15)),
                    },
                );

            // MCP at the configured path, chat and health alongside it
            let router = Router::new()
                .nest_service(path.as_str(), http_service)
                .merge(chat::router(assistant.chat_state()));

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(%bind, path = %path, "Starting Streamable HTTP MCP server");

            axum::serve(listener, router).await?;
            Ok(())
        }
        _ => {
            tracing::info!("main: Service created, starting server on stdio transport");
            let server = service.serve(stdio()).await?;
            tracing::info!("main: Server started, waiting for connection to close");
            server.waiting().await?;
            tracing::info!("main: Server connection closed");
            eprintln!("Server shutting down");
            Ok(())
        }
    }
}
