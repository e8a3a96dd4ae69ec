use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use compliance_assistant::ComplianceAssistant;
use compliance_assistant::config::Config;
use compliance_assistant::render::render_tool_output;
use compliance_assistant::tools::supplier_search::SupplierSearchParams;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("Usage: ask <natural language query>");
        eprintln!("Example: ask technology suppliers in Asia with risk above 7");
        std::process::exit(2);
    }

    let config = Arc::new(Config::load());
    let assistant = ComplianceAssistant::new(config)?;

    let params = SupplierSearchParams {
        query,
        ..Default::default()
    };
    match assistant.supplier_search(params).await {
        Ok(response) => {
            let value = serde_json::to_value(&response)?;
            println!("{}", render_tool_output(&value));
            Ok(())
        }
        Err(e) if e.is_client_error() => {
            eprintln!("{} {}", "Invalid request:".yellow().bold(), e);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("{} {}", "Search failed:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
