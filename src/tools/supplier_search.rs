use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::intent::QueryInterpreter;
use crate::models::{
    ComplianceStatus, SearchParams, SortBy, SortOrder, SupplierResult, deserialize_flexible_f64,
    deserialize_flexible_u32, deserialize_one_or_many,
};
use crate::search::search;
use crate::store::SupplierStore;
use crate::validation::InputValidator;

pub const TOOL_NAME: &str = "supplierSearch";
pub const TOOL_ROLE: &str = "tool";

/// Parameters for the supplierSearch tool
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSearchParams {
    #[schemars(
        description = "The user's request in natural language, e.g. 'technology suppliers in Asia with risk above 7'"
    )]
    pub query: String,

    #[schemars(description = "Minimum risk score (0-10), inclusive", range(min = 0, max = 10))]
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub min_risk_score: Option<f64>,

    #[schemars(description = "Maximum risk score (0-10), inclusive", range(min = 0, max = 10))]
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub max_risk_score: Option<f64>,

    #[schemars(description = "Filter suppliers by location (country or region), partial match")]
    #[serde(default)]
    pub location: Option<String>,

    #[schemars(description = "Filter suppliers by industry sector, partial match")]
    #[serde(default)]
    pub industry: Option<String>,

    #[schemars(
        description = "Risk categories to match, e.g. ['Data Security', 'Environmental']; a supplier matches if any category matches"
    )]
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub risk_category: Vec<String>,

    #[schemars(description = "Compliance statuses to include: 'Compliant', 'Non-Compliant', 'Under Review'")]
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub compliance_status: Vec<ComplianceStatus>,

    #[schemars(description = "Keywords matched against supplier name or description")]
    #[serde(default)]
    pub search_text: Option<String>,

    #[schemars(description = "Sort field: 'riskScore' or 'name'")]
    #[serde(default)]
    pub sort_by: Option<SortBy>,

    #[schemars(description = "Sort direction: 'asc' (default) or 'desc'")]
    #[serde(default)]
    pub sort_order: Option<SortOrder>,

    #[schemars(description = "Maximum number of suppliers to return", range(min = 1))]
    #[serde(default, deserialize_with = "deserialize_flexible_u32")]
    pub limit: Option<u32>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl SupplierSearchParams {
    /// The structured filters the caller supplied explicitly. Blank strings
    /// count as not supplied.
    pub fn explicit_filters(&self) -> SearchParams {
        SearchParams {
            min_risk_score: self.min_risk_score,
            max_risk_score: self.max_risk_score,
            location: non_blank(&self.location),
            industry: non_blank(&self.industry),
            risk_category: self
                .risk_category
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            compliance_status: self.compliance_status.clone(),
            query: non_blank(&self.search_text),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            limit: self.limit,
        }
    }
}

/// Envelope returned to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSearchResponse {
    pub role: String,
    pub name: String,
    pub query: String,
    pub filters_used: SearchParams,
    pub suppliers: Vec<SupplierResult>,
    pub count: usize,
}

/// Validates, interprets, merges and searches
pub struct SupplierSearchHandler {
    store: Arc<SupplierStore>,
    interpreter: Arc<dyn QueryInterpreter>,
    validator: InputValidator,
}

impl SupplierSearchHandler {
    pub fn new(store: Arc<SupplierStore>, interpreter: Arc<dyn QueryInterpreter>) -> Self {
        Self {
            store,
            interpreter,
            validator: InputValidator::new(),
        }
    }

    pub async fn supplier_search(
        &self,
        params: SupplierSearchParams,
    ) -> Result<SupplierSearchResponse> {
        let explicit = params.explicit_filters();
        if let Err(e) = self.validator.validate_search_params(&explicit) {
            warn!("Rejected supplierSearch parameters: {}", e);
            return Err(e);
        }

        let interpreted = self.interpreter.interpret(&params.query).await?;
        let effective = explicit.merge_over(interpreted);

        let result = search(&self.store, &effective);
        info!(
            count = result.count,
            "supplierSearch returned {} suppliers for query '{}'",
            result.count,
            params.query
        );

        Ok(SupplierSearchResponse {
            role: TOOL_ROLE.to_string(),
            name: TOOL_NAME.to_string(),
            query: params.query,
            filters_used: result.filters_used,
            suppliers: result.suppliers,
            count: result.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComplianceError;
    use crate::intent::GroqInterpreter;
    use crate::models::{ChatMessage, Choice, GroqResponse, Supplier};
    use crate::transport::MockTransport;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Interpreter that always returns the same params and counts calls
    struct FixedInterpreter {
        params: SearchParams,
        calls: AtomicUsize,
    }

    impl FixedInterpreter {
        fn new(params: SearchParams) -> Arc<Self> {
            Arc::new(Self {
                params,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryInterpreter for FixedInterpreter {
        async fn interpret(&self, _query: &str) -> Result<SearchParams> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.params.clone())
        }
    }

    fn supplier(id: &str, score: f64, industry: &str, location: &str) -> Supplier {
        Supplier {
            id: id.to_string(),
            name: format!("Supplier {id}"),
            risk_score: score,
            risk_categories: vec!["Data Security".to_string()],
            location: location.to_string(),
            industry: industry.to_string(),
            last_audit_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            compliance_status: ComplianceStatus::UnderReview,
            description: "supplier".to_string(),
        }
    }

    fn store() -> Arc<SupplierStore> {
        Arc::new(
            SupplierStore::from_suppliers(vec![
                supplier("hi", 8.0, "Technology", "Germany"),
                supplier("lo", 4.0, "Technology", "Japan, Asia"),
                supplier("eu", 6.0, "Chemicals", "France, Europe"),
            ])
            .unwrap(),
        )
    }

    fn completion(content: &str) -> GroqResponse {
        GroqResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: content.to_string(),
                },
            }],
        }
    }

    fn ids(response: &SupplierSearchResponse) -> Vec<&str> {
        response.suppliers.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_natural_language_scenario_filters_by_model_output() {
        let mut transport = MockTransport::new();
        transport
            .expect_chat()
            .times(1)
            .returning(|_| Ok(completion(r#"{"industry": "technology", "minRiskScore": 7}"#)));
        let interpreter = GroqInterpreter::new(Arc::new(transport), "m".to_string());
        let handler = SupplierSearchHandler::new(store(), Arc::new(interpreter));

        let response = handler
            .supplier_search(SupplierSearchParams {
                query: "high-risk suppliers in technology above score 7".to_string(),
                ..Default::default()
            })
            .await
            .expect("search should succeed");

        assert_eq!(ids(&response), vec!["hi"]);
        assert_eq!(response.count, 1);
        assert_eq!(response.role, "tool");
        assert_eq!(response.name, "supplierSearch");
        assert_eq!(response.query, "high-risk suppliers in technology above score 7");
        assert_eq!(response.filters_used.min_risk_score, Some(7.0));
    }

    #[tokio::test]
    async fn test_empty_query_returns_whole_store_in_order() {
        let interpreter = FixedInterpreter::new(SearchParams::default());
        let handler = SupplierSearchHandler::new(store(), interpreter);

        let response = handler
            .supplier_search(SupplierSearchParams::default())
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["hi", "lo", "eu"]);
        assert!(response.filters_used.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_parameters_override_interpreted_ones() {
        let interpreter = FixedInterpreter::new(SearchParams {
            location: Some("Asia".to_string()),
            ..Default::default()
        });
        let handler = SupplierSearchHandler::new(store(), interpreter);

        let response = handler
            .supplier_search(SupplierSearchParams {
                query: "suppliers in asia".to_string(),
                location: Some("Europe".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.filters_used.location.as_deref(), Some("Europe"));
        assert_eq!(ids(&response), vec!["eu"]);
    }

    #[tokio::test]
    async fn test_garbage_completion_matches_explicit_only_search() {
        let mut transport = MockTransport::new();
        transport
            .expect_chat()
            .returning(|_| Ok(completion("<<not json at all>>")));
        let handler = SupplierSearchHandler::new(
            store(),
            Arc::new(GroqInterpreter::new(Arc::new(transport), "m".to_string())),
        );

        let params = SupplierSearchParams {
            query: "whatever".to_string(),
            max_risk_score: Some(6.0),
            ..Default::default()
        };
        let response = handler.supplier_search(params.clone()).await.unwrap();

        let explicit_only = search(&store(), &params.explicit_filters());
        assert_eq!(response.suppliers, explicit_only.suppliers);
        assert_eq!(ids(&response), vec!["lo", "eu"]);
    }

    #[tokio::test]
    async fn test_inverted_range_fails_before_interpretation() {
        let mut transport = MockTransport::new();
        transport.expect_chat().times(0);
        let handler = SupplierSearchHandler::new(
            store(),
            Arc::new(GroqInterpreter::new(Arc::new(transport), "m".to_string())),
        );

        let err = handler
            .supplier_search(SupplierSearchParams {
                query: "anything".to_string(),
                min_risk_score: Some(7.0),
                max_risk_score: Some(3.0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_a_tool_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_chat()
            .returning(|_| Err(ComplianceError::Upstream("connection refused".to_string())));
        let handler = SupplierSearchHandler::new(
            store(),
            Arc::new(GroqInterpreter::new(Arc::new(transport), "m".to_string())),
        );

        let err = handler
            .supplier_search(SupplierSearchParams {
                query: "suppliers in Asia".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_zero_limit_is_rejected() {
        let interpreter = FixedInterpreter::new(SearchParams::default());
        let handler = SupplierSearchHandler::new(store(), interpreter.clone());
        let err = handler
            .supplier_search(SupplierSearchParams {
                query: String::new(),
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(interpreter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_params_deserialize_from_loose_client_json() {
        let params: SupplierSearchParams = serde_json::from_value(json!({
            "query": "risky vendors",
            "minRiskScore": "5",
            "riskCategory": "Environmental",
            "complianceStatus": "Non-Compliant",
            "searchText": "  ",
            "sortBy": "name",
            "limit": 2
        }))
        .unwrap();

        let explicit = params.explicit_filters();
        assert_eq!(explicit.min_risk_score, Some(5.0));
        assert_eq!(explicit.risk_category, vec!["Environmental".to_string()]);
        assert_eq!(explicit.compliance_status, vec![ComplianceStatus::NonCompliant]);
        assert!(explicit.query.is_none());
        assert_eq!(explicit.sort_by, Some(SortBy::Name));
        assert_eq!(explicit.limit, Some(2));
    }

    #[test]
    fn test_params_reject_unknown_compliance_status() {
        let result = serde_json::from_value::<SupplierSearchParams>(json!({
            "query": "x",
            "complianceStatus": ["Pending"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_requires_only_query() {
        let schema = serde_json::to_value(schemars::schema_for!(SupplierSearchParams)).unwrap();
        assert_eq!(schema["required"], json!(["query"]));
        assert!(schema["properties"].get("minRiskScore").is_some());
        assert!(schema["properties"].get("complianceStatus").is_some());
    }

    #[test]
    fn test_response_serializes_tool_envelope() {
        let response = SupplierSearchResponse {
            role: TOOL_ROLE.to_string(),
            name: TOOL_NAME.to_string(),
            query: "q".to_string(),
            filters_used: SearchParams::default(),
            suppliers: vec![],
            count: 0,
        };
        let value = serde_json::to_value(response).unwrap();
        for key in ["role", "name", "query", "filtersUsed", "suppliers", "count"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
