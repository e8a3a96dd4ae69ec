use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::extract::extract_params;
use crate::models::{ChatMessage, ComplianceStatus, GroqRequest, SearchParams};
use crate::transport::Transport;

/// Turns a natural-language request into (partial) search filters
#[async_trait]
pub trait QueryInterpreter: Send + Sync {
    async fn interpret(&self, query: &str) -> Result<SearchParams>;
}

pub struct GroqInterpreter {
    tx: Arc<dyn Transport>,
    model: String,
    temperature: f32,
    max_tokens: i32,
    timeout: Duration,
}

impl GroqInterpreter {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self {
            tx,
            model,
            temperature: 0.0,
            max_tokens: 512,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(tx: Arc<dyn Transport>, cfg: &Config) -> Self {
        Self {
            tx,
            model: cfg.groq.intent_model.clone(),
            temperature: cfg.interpreter.temperature,
            max_tokens: cfg.interpreter.max_tokens,
            timeout: cfg.interpret_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fixed instruction prompt with the user's query embedded at the end
pub fn build_prompt(query: &str) -> String {
    let statuses = ComplianceStatus::ALL
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You convert requests about a supplier risk database into search filters.
Return ONLY a JSON object. Include a field only if you are confident the request asks for it.

Allowed fields:
- "minRiskScore": number from 0 to 10, lowest acceptable risk score
- "maxRiskScore": number from 0 to 10, highest acceptable risk score
- "location": string, a country or region
- "industry": string, an industry sector
- "riskCategory": array of strings, e.g. ["Data Security", "Environmental", "Labor Practices"]
- "complianceStatus": array with values from [{statuses}]
- "query": string, keywords to find in a supplier's name or description
- "sortBy": "riskScore" or "name"
- "sortOrder": "asc" or "desc"
- "limit": positive integer, the maximum number of suppliers to return

If the request implies no risk bounds, omit both; missing bounds mean the full range 0 to 10.
"High risk" without a number means minRiskScore 7. "Low risk" without a number means maxRiskScore 3.
"Compliance issues" means complianceStatus ["Non-Compliant", "Under Review"].
If nothing applies, return {{}}.

Examples:
Request: "Show me high-risk suppliers, risk score above 5"
Output: {{"minRiskScore": 5}}

Request: "List suppliers in Asia with compliance issues"
Output: {{"location": "Asia", "complianceStatus": ["Non-Compliant", "Under Review"]}}

Request: "Top 3 riskiest mining suppliers"
Output: {{"industry": "Mining", "sortBy": "riskScore", "sortOrder": "desc", "limit": 3}}

Request: "{query}"
Output:"#
    )
}

#[async_trait]
impl QueryInterpreter for GroqInterpreter {
    async fn interpret(&self, query: &str) -> Result<SearchParams> {
        if query.trim().is_empty() {
            tracing::info!("Empty query - no natural-language filters to interpret");
            return Ok(SearchParams::default());
        }

        tracing::info!("Interpreting supplier query with Groq: {}", query);

        let request = GroqRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(query),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: Some(serde_json::json!({"type": "json_object"})),
        };

        let response = match tokio::time::timeout(self.timeout, self.tx.chat(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Query interpretation timed out after {}ms - continuing without natural-language filters",
                    self.timeout.as_millis()
                );
                return Ok(SearchParams::default());
            }
        };

        let raw = response.first_content().unwrap_or_default();
        tracing::debug!("Raw interpretation completion: {}", raw);

        match extract_params(raw) {
            Ok(extraction) => {
                if !extraction.dropped.is_empty() {
                    tracing::warn!(
                        "Dropped unusable interpreted fields: {}",
                        extraction.dropped.join(", ")
                    );
                }
                Ok(extraction.params)
            }
            Err(e) => {
                tracing::warn!(
                    "Query interpretation failed ({}) - continuing without natural-language filters. Raw: {}",
                    e,
                    raw
                );
                Ok(SearchParams::default())
            }
        }
    }
}
