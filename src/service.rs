use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ComplianceError;
use crate::tools::supplier_search::{SupplierSearchHandler, SupplierSearchParams};

/// MCP server exposing the supplier search tool
#[derive(Clone)]
pub struct ComplianceAssistantService {
    tool_router: ToolRouter<Self>,
    supplier_search: Arc<SupplierSearchHandler>,
    config: Arc<Config>,
}

impl ComplianceAssistantService {
    pub fn new(config: Arc<Config>, supplier_search: Arc<SupplierSearchHandler>) -> Self {
        tracing::info!(
            "Service::new() - Initializing {} v{}",
            config.server.name,
            config.server.version
        );
        Self {
            tool_router: Self::tool_router(),
            supplier_search,
            config,
        }
    }
}

/// Caller mistakes become invalid_params, everything else is internal
pub fn to_error_data(e: &ComplianceError) -> ErrorData {
    if e.is_client_error() {
        tracing::warn!("supplierSearch rejected: {}", e);
        ErrorData::invalid_params(e.to_string(), None)
    } else {
        tracing::error!("supplierSearch error: {}", e);
        ErrorData::internal_error(format!("Error searching suppliers: {e}"), None)
    }
}

#[tool_router]
impl ComplianceAssistantService {
    #[tool(
        name = "supplierSearch",
        description = "Search the supplier risk database. Pass the user's request as `query`; it is interpreted into filters (risk score range, location, industry, risk categories, compliance status, keywords, sorting, limit). Any structured parameter you pass explicitly overrides the interpreted value."
    )]
    pub async fn supplier_search(
        &self,
        params: Parameters<SupplierSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("supplier_search", %request_id);

        async move {
            tracing::info!("supplierSearch called with query '{}'", params.0.query);
            match self.supplier_search.supplier_search(params.0).await {
                Ok(response) => {
                    let content = Content::json(response).map_err(|e| {
                        ErrorData::internal_error(
                            format!("Failed to create JSON content: {e}"),
                            None,
                        )
                    })?;
                    Ok(CallToolResult::success(vec![content]))
                }
                Err(e) => Err(to_error_data(&e)),
            }
        }
        .instrument(span)
        .await
    }
}

#[tool_handler]
impl ServerHandler for ComplianceAssistantService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Compliance assistant MCP server. Use supplierSearch to find suppliers by risk, location, industry, and compliance status.".into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::QueryInterpreter;
    use crate::models::SearchParams;
    use crate::store::SupplierStore;
    use async_trait::async_trait;
    use rmcp::model::ErrorCode;

    struct NoFilters;

    #[async_trait]
    impl QueryInterpreter for NoFilters {
        async fn interpret(&self, _query: &str) -> crate::error::Result<SearchParams> {
            Ok(SearchParams::default())
        }
    }

    struct Broken;

    #[async_trait]
    impl QueryInterpreter for Broken {
        async fn interpret(&self, _query: &str) -> crate::error::Result<SearchParams> {
            Err(ComplianceError::Upstream("503 Service Unavailable".to_string()))
        }
    }

    fn service(interpreter: Arc<dyn QueryInterpreter>) -> ComplianceAssistantService {
        let handler = SupplierSearchHandler::new(Arc::new(SupplierStore::builtin()), interpreter);
        ComplianceAssistantService::new(Arc::new(Config::default()), Arc::new(handler))
    }

    #[tokio::test]
    async fn test_tool_success_is_not_an_error_result() {
        let result = service(Arc::new(NoFilters))
            .supplier_search(Parameters(SupplierSearchParams {
                query: "all suppliers".to_string(),
                ..Default::default()
            }))
            .await
            .expect("tool call should succeed");
        assert_ne!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_validation_failure_maps_to_invalid_params() {
        let err = service(Arc::new(NoFilters))
            .supplier_search(Parameters(SupplierSearchParams {
                query: "anything".to_string(),
                min_risk_score: Some(7.0),
                max_risk_score: Some(3.0),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("minRiskScore"));
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_internal_error() {
        let err = service(Arc::new(Broken))
            .supplier_search(Parameters(SupplierSearchParams {
                query: "suppliers in Asia".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_server_info_uses_configured_identity() {
        let info = service(Arc::new(NoFilters)).get_info();
        let cfg = Config::default();
        assert_eq!(info.server_info.name, cfg.server.name);
        assert!(info.capabilities.tools.is_some());
    }
}
