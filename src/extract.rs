//! Best-effort structured extraction from raw completion text.
//!
//! The completion service is asked for a JSON object but may wrap it in code
//! fences, surround it with prose, or use JavaScript-style quoting. Everything
//! here either yields a well-formed [`SearchParams`] or an [`ExtractError`];
//! nothing panics on hostile input.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::models::{ComplianceStatus, SearchParams, SortBy, SortOrder};
use crate::store::{MAX_RISK_SCORE, MIN_RISK_SCORE};

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*\n").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,;:!?])").expect("valid regex"));
static UNQUOTED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("valid regex")
});
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    #[error("completion was empty")]
    Empty,

    #[error("completion is not valid JSON: {0}")]
    NotJson(String),

    #[error("completion JSON is not an object")]
    NotObject,
}

/// Normalize completion text: NFKC, join hyphenated line breaks, turn
/// newlines and tabs into spaces, collapse whitespace, drop spaces before
/// punctuation, trim.
pub fn cleanup_text(text: &str) -> String {
    let text: String = text.nfkc().collect();
    let text = HYPHEN_BREAK.replace_all(&text, "");
    let text = text.replace(['\n', '\r', '\t'], " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Strip a single surrounding Markdown code fence, with or without a
/// language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let s = text.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest.trim_start();
    // language tag such as ```json
    let tag_len = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let (tag, body) = rest.split_at(tag_len);
    if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphabetic()) {
        body.trim()
    } else {
        rest.trim()
    }
}

/// Parse completion text into a JSON object, repairing common model quirks
/// when strict parsing fails.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let cleaned = cleanup_text(text);
    let body = strip_code_fence(&cleaned);
    if body.is_empty() {
        return Err(ExtractError::Empty);
    }

    // prose around the object: keep the outermost braces
    let candidate = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(v) => v,
        Err(strict_err) => serde_json::from_str::<Value>(&repair_json(candidate))
            .map_err(|_| ExtractError::NotJson(strict_err.to_string()))?,
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractError::NotObject),
    }
}

/// Rewrite single-quoted strings, unquoted keys and trailing commas into
/// strict JSON.
fn repair_json(text: &str) -> String {
    let requoted = requote_single_quotes(text);
    if serde_json::from_str::<Value>(&requoted).is_ok() {
        return requoted;
    }
    map_outside_strings(&requoted, |segment| {
        let keyed = UNQUOTED_KEY.replace_all(segment, r#"$1"$2":"#);
        TRAILING_COMMA.replace_all(&keyed, "$1").into_owned()
    })
}

/// Apply `f` to the text between double-quoted string literals, copying the
/// literals through untouched.
fn map_outside_strings(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                out.push_str(&text[start..=i]);
                start = i + 1;
                in_string = false;
            }
        } else if c == '"' {
            out.push_str(&f(&text[start..i]));
            start = i;
            in_string = true;
        }
    }

    if in_string {
        out.push_str(&text[start..]);
    } else {
        out.push_str(&f(&text[start..]));
    }
    out
}

fn requote_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_double || in_single => {
                let next = chars.next();
                match (in_single, next) {
                    (true, Some('\'')) => out.push('\''),
                    (_, Some(n)) => {
                        out.push('\\');
                        out.push(n);
                    }
                    (_, None) => out.push('\\'),
                }
            }
            '"' if in_single => out.push_str("\\\""),
            '"' => {
                in_double = !in_double;
                out.push('"');
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Fold a key so `minRiskScore`, `min_risk_score` and `MinRiskScore` agree
fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Extracted params plus a note for every field that was present but unusable
#[derive(Debug, Default, PartialEq)]
pub struct Extraction {
    pub params: SearchParams,
    pub dropped: Vec<String>,
}

/// Map a JSON object onto [`SearchParams`], keeping only well-formed fields.
pub fn params_from_object(obj: &Map<String, Value>) -> Extraction {
    let mut out = Extraction::default();

    for (key, value) in obj {
        if value.is_null() {
            continue;
        }
        let p = &mut out.params;
        let ok = match fold_key(key).as_str() {
            "minriskscore" => set(&mut p.min_risk_score, risk_score(value)),
            "maxriskscore" => set(&mut p.max_risk_score, risk_score(value)),
            "location" => set(&mut p.location, text(value)),
            "industry" => set(&mut p.industry, text(value)),
            "query" => set(&mut p.query, text(value)),
            "riskcategory" | "riskcategories" => {
                p.risk_category = string_list(value);
                !p.risk_category.is_empty()
            }
            "compliancestatus" => {
                p.compliance_status = statuses(value);
                !p.compliance_status.is_empty()
            }
            "sortby" => set(&mut p.sort_by, sort_by(value)),
            "sortorder" => set(&mut p.sort_order, sort_order(value)),
            "limit" => set(&mut p.limit, limit(value)),
            _ => {
                tracing::debug!("Ignoring unknown interpreted field '{}'", key);
                true
            }
        };
        if !ok {
            out.dropped.push(format!("{key}={value}"));
        }
    }

    if let (Some(min), Some(max)) = (out.params.min_risk_score, out.params.max_risk_score) {
        if min > max {
            out.dropped.push(format!("risk range {min}>{max}"));
            out.params.min_risk_score = None;
            out.params.max_risk_score = None;
        }
    }

    out
}

/// Full pipeline from raw completion text to params.
pub fn extract_params(raw: &str) -> Result<Extraction, ExtractError> {
    let obj = parse_json_object(raw)?;
    Ok(params_from_object(&obj))
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    let ok = value.is_some();
    *slot = value;
    ok
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn risk_score(value: &Value) -> Option<f64> {
    number(value).filter(|n| n.is_finite() && (MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(n))
}

fn limit(value: &Value) -> Option<u32> {
    number(value)
        .filter(|n| *n >= 1.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(other).into_iter().collect(),
    }
}

fn statuses(value: &Value) -> Vec<ComplianceStatus> {
    let mut out = Vec::new();
    for raw in string_list(value) {
        if let Ok(status) = raw.parse::<ComplianceStatus>() {
            if !out.contains(&status) {
                out.push(status);
            }
        }
    }
    out
}

fn sort_by(value: &Value) -> Option<SortBy> {
    match fold_key(value.as_str()?).as_str() {
        "riskscore" | "risk" | "score" => Some(SortBy::RiskScore),
        "name" => Some(SortBy::Name),
        _ => None,
    }
}

fn sort_order(value: &Value) -> Option<SortOrder> {
    match fold_key(value.as_str()?).as_str() {
        "asc" | "ascending" => Some(SortOrder::Asc),
        "desc" | "descending" => Some(SortOrder::Desc),
        _ => None,
    }
}
