pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod intent;
pub mod models;
pub mod render;
pub mod retry;
pub mod search;
pub mod service;
pub mod store;
pub mod tools;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use crate::chat::ChatState;
use crate::config::Config;
use crate::error::Result;
use crate::intent::{GroqInterpreter, QueryInterpreter};
use crate::service::ComplianceAssistantService;
use crate::store::SupplierStore;
use crate::tools::supplier_search::{
    SupplierSearchHandler, SupplierSearchParams, SupplierSearchResponse,
};
use crate::transport::{GroqTransport, Transport};

/// Wires the store, completion transport and interpreter together
pub struct ComplianceAssistant {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    handler: Arc<SupplierSearchHandler>,
}

impl ComplianceAssistant {
    pub fn new(cfg: Arc<Config>) -> Result<Self> {
        let store = Arc::new(SupplierStore::load(&cfg)?);
        let transport: Arc<dyn Transport> = Arc::new(GroqTransport::from_config(&cfg)?);
        Ok(Self::with_parts(cfg, store, transport))
    }

    pub fn with_parts(
        cfg: Arc<Config>,
        store: Arc<SupplierStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let interpreter: Arc<dyn QueryInterpreter> = Arc::new(GroqInterpreter::from_config(
            Arc::clone(&transport),
            &cfg,
        ));
        let handler = Arc::new(SupplierSearchHandler::new(store, interpreter));
        Self {
            config: cfg,
            transport,
            handler,
        }
    }

    pub async fn supplier_search(
        &self,
        params: SupplierSearchParams,
    ) -> Result<SupplierSearchResponse> {
        self.handler.supplier_search(params).await
    }

    /// The MCP server sharing this assistant's handler
    pub fn mcp_service(&self) -> ComplianceAssistantService {
        ComplianceAssistantService::new(Arc::clone(&self.config), Arc::clone(&self.handler))
    }

    pub fn chat_state(&self) -> ChatState {
        ChatState::from_config(Arc::clone(&self.transport), &self.config)
    }
}
