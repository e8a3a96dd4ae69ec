use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flexible float deserializer to handle number or string inputs from different MCP clients
pub(crate) fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleNumber {
        Number(f64),
        String(String),
    }

    match Option::<FlexibleNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlexibleNumber::Number(n)) => Ok(Some(n)),
        Some(FlexibleNumber::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Flexible unsigned integer deserializer; accepts int, integral float, or numeric string
pub(crate) fn deserialize_flexible_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(u64),
        Float(f64),
        String(String),
    }

    let value = match Option::<FlexibleInt>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(v) => v,
    };
    let float = match value {
        FlexibleInt::Int(i) => {
            return u32::try_from(i).map(Some).map_err(serde::de::Error::custom);
        }
        FlexibleInt::Float(f) => f,
        FlexibleInt::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom)?,
    };
    if float < 0.0 || float.fract() != 0.0 || float > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {float}"
        )));
    }
    Ok(Some(float as u32))
}

/// Accepts either a single value or an array of values; null becomes an empty list
pub(crate) fn deserialize_one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Audit outcome recorded against a supplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub enum ComplianceStatus {
    #[serde(rename = "Compliant")]
    Compliant,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    #[serde(rename = "Under Review")]
    UnderReview,
}

impl ComplianceStatus {
    pub const ALL: [ComplianceStatus; 3] = [
        ComplianceStatus::Compliant,
        ComplianceStatus::NonCompliant,
        ComplianceStatus::UnderReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::NonCompliant => "Non-Compliant",
            ComplianceStatus::UnderReview => "Under Review",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    /// Lenient parse used for model output: ignores case, spaces, dashes and underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "compliant" => Ok(ComplianceStatus::Compliant),
            "noncompliant" => Ok(ComplianceStatus::NonCompliant),
            "underreview" => Ok(ComplianceStatus::UnderReview),
            _ => Err(format!(
                "Invalid compliance status '{s}'. Valid values: Compliant, Non-Compliant, Under Review"
            )),
        }
    }
}

/// Authoritative supplier record held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub risk_score: f64,
    pub risk_categories: Vec<String>,
    pub location: String,
    pub industry: String,
    pub last_audit_date: chrono::NaiveDate,
    pub compliance_status: ComplianceStatus,
    pub description: String,
}

/// Display-safe projection of a supplier. Audit date, compliance status and
/// description never leave the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierResult {
    pub id: String,
    pub name: String,
    pub risk_score: f64,
    pub risk_categories: Vec<String>,
    pub location: String,
    pub industry: String,
}

impl From<&Supplier> for SupplierResult {
    fn from(s: &Supplier) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            risk_score: s.risk_score,
            risk_categories: s.risk_categories.clone(),
            location: s.location.clone(),
            industry: s.industry.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum SortBy {
    #[serde(rename = "riskScore")]
    RiskScore,
    #[serde(rename = "name")]
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Structured filter set. Every field is optional; an absent field (or an
/// empty set) applies no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_category: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_status: Vec<ComplianceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchParams {
    pub fn is_empty(&self) -> bool {
        *self == SearchParams::default()
    }

    /// Field-by-field merge where `self` wins and `fallback` only fills the gaps.
    pub fn merge_over(self, fallback: SearchParams) -> SearchParams {
        SearchParams {
            min_risk_score: self.min_risk_score.or(fallback.min_risk_score),
            max_risk_score: self.max_risk_score.or(fallback.max_risk_score),
            location: self.location.or(fallback.location),
            industry: self.industry.or(fallback.industry),
            risk_category: if self.risk_category.is_empty() {
                fallback.risk_category
            } else {
                self.risk_category
            },
            compliance_status: if self.compliance_status.is_empty() {
                fallback.compliance_status
            } else {
                self.compliance_status
            },
            query: self.query.or(fallback.query),
            sort_by: self.sort_by.or(fallback.sort_by),
            sort_order: self.sort_order.or(fallback.sort_order),
            limit: self.limit.or(fallback.limit),
        }
    }
}

/// Output of a search: the projected suppliers plus the filters that produced them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub suppliers: Vec<SupplierResult>,
    pub count: usize,
    pub filters_used: SearchParams,
}

// Groq chat message format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// Groq API request format
#[derive(Debug, Serialize, Clone)]
pub struct GroqRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

// Groq API response format
#[derive(Debug, Deserialize)]
pub struct GroqResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

impl GroqResponse {
    /// Text of the first choice, if the service returned any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
