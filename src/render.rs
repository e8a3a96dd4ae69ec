use colored::{ColoredString, Colorize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    High,
    Medium,
    Low,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            RiskBand::High
        } else if score >= 5.0 {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::High => "high",
            RiskBand::Medium => "medium",
            RiskBand::Low => "low",
        }
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            RiskBand::High => text.red().bold(),
            RiskBand::Medium => text.yellow(),
            RiskBand::Low => text.green(),
        }
    }
}

fn str_field<'a>(supplier: &'a Value, key: &str) -> &'a str {
    supplier.get(key).and_then(Value::as_str).unwrap_or("-")
}

fn render_card(supplier: &Value) -> String {
    let name = str_field(supplier, "name");
    let badge = match supplier.get("riskScore").and_then(Value::as_f64) {
        Some(score) => {
            let band = RiskBand::from_score(score);
            format!(
                "{} ({})",
                band.paint(&format!("Risk: {score}/10")),
                band.label()
            )
        }
        None => "Risk: unknown".dimmed().to_string(),
    };
    let categories = supplier
        .get("riskCategories")
        .and_then(Value::as_array)
        .map(|cats| {
            cats.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}  {}\n    Location: {}\n    Industry: {}\n    Categories: {}",
        name.bold(),
        badge,
        str_field(supplier, "location"),
        str_field(supplier, "industry"),
        categories
    )
}

/// Human-readable rendering of a tool result for terminals.
pub fn render_tool_output(output: &Value) -> String {
    let suppliers = output.get("suppliers").and_then(Value::as_array);
    let count = output.get("count").and_then(Value::as_u64);

    match (suppliers, count) {
        (Some(suppliers), Some(count)) => {
            let mut out = format!("Found {count} supplier(s):");
            for supplier in suppliers {
                out.push_str("\n\n");
                out.push_str(&render_card(supplier));
            }
            out
        }
        _ => match output {
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(RiskBand::from_score(9.1), RiskBand::High);
        assert_eq!(RiskBand::from_score(8.0), RiskBand::High);
        assert_eq!(RiskBand::from_score(7.9), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(5.0), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(4.9), RiskBand::Low);
        assert_eq!(RiskBand::from_score(0.0), RiskBand::Low);
    }

    #[test]
    fn test_renders_supplier_cards() {
        plain();
        let output = json!({
            "role": "tool",
            "name": "supplierSearch",
            "count": 2,
            "suppliers": [
                {
                    "id": "SUP001",
                    "name": "TechCore Components",
                    "riskScore": 8.2,
                    "riskCategories": ["Data Security", "Geopolitical"],
                    "location": "Germany",
                    "industry": "Technology"
                },
                {
                    "id": "SUP002",
                    "name": "GreenLeaf Farms",
                    "riskScore": 3.0,
                    "riskCategories": [],
                    "location": "Brazil",
                    "industry": "Agriculture"
                }
            ]
        });

        let text = render_tool_output(&output);
        assert!(text.starts_with("Found 2 supplier(s):"));
        assert!(text.contains("TechCore Components"));
        assert!(text.contains("Risk: 8.2/10 (high)"));
        assert!(text.contains("Categories: Data Security, Geopolitical"));
        assert!(text.contains("Risk: 3/10 (low)"));
        assert!(text.contains("Location: Brazil"));
        assert!(text.contains("Categories: -"));
    }

    #[test]
    fn test_empty_result_renders_header_only() {
        plain();
        let text = render_tool_output(&json!({"suppliers": [], "count": 0}));
        assert_eq!(text, "Found 0 supplier(s):");
    }

    #[test]
    fn test_other_values_fall_back_to_text() {
        assert_eq!(render_tool_output(&json!("just text")), "just text");
        let rendered = render_tool_output(&json!({"answer": 42}));
        assert!(rendered.contains("\"answer\": 42"));
    }
}
