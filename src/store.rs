use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{ComplianceError, Result};
use crate::models::{ComplianceStatus, Supplier};

pub const MIN_RISK_SCORE: f64 = 0.0;
pub const MAX_RISK_SCORE: f64 = 10.0;

/// Read-only supplier collection, populated once at startup.
///
/// There is no mutation API; share it behind an `Arc` and hand out borrows.
#[derive(Debug, Clone)]
pub struct SupplierStore {
    suppliers: Vec<Supplier>,
}

// Supplier files may be a bare list or wrapped in a `suppliers:` key
#[derive(Deserialize)]
#[serde(untagged)]
enum SupplierFile {
    List(Vec<Supplier>),
    Wrapped { suppliers: Vec<Supplier> },
}

impl SupplierStore {
    /// Build a store, rejecting records that break the data model invariants.
    pub fn from_suppliers(suppliers: Vec<Supplier>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(suppliers.len());
        for supplier in &suppliers {
            if supplier.id.trim().is_empty() {
                return Err(ComplianceError::Data(format!(
                    "supplier '{}' has an empty id",
                    supplier.name
                )));
            }
            if !supplier.risk_score.is_finite()
                || !(MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&supplier.risk_score)
            {
                return Err(ComplianceError::Data(format!(
                    "supplier '{}' has risk score {} outside {MIN_RISK_SCORE}-{MAX_RISK_SCORE}",
                    supplier.id, supplier.risk_score
                )));
            }
            if !seen.insert(supplier.id.as_str()) {
                return Err(ComplianceError::Data(format!(
                    "duplicate supplier id '{}'",
                    supplier.id
                )));
            }
        }
        Ok(Self { suppliers })
    }

    /// Load suppliers from a YAML or JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ComplianceError::Data(format!("failed to read {}: {e}", path.display()))
        })?;
        // YAML is a superset of JSON, so one parser covers both
        let parsed: SupplierFile = serde_yaml::from_str(&contents).map_err(|e| {
            ComplianceError::Data(format!("failed to parse {}: {e}", path.display()))
        })?;
        let suppliers = match parsed {
            SupplierFile::List(list) => list,
            SupplierFile::Wrapped { suppliers } => suppliers,
        };
        let store = Self::from_suppliers(suppliers)?;
        tracing::info!(
            "Loaded {} suppliers from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Use the configured supplier file when present, else the bundled dataset.
    pub fn load(config: &Config) -> Result<Self> {
        match config.data.supplier_file.as_deref() {
            Some(path) if !path.trim().is_empty() => Self::from_path(path),
            _ => {
                tracing::info!("No supplier file configured - using built-in dataset");
                Ok(Self::builtin())
            }
        }
    }

    pub fn all(&self) -> &[Supplier] {
        &self.suppliers
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| s.id == id)
    }

    /// Bundled demonstration dataset.
    pub fn builtin() -> Self {
        Self {
            suppliers: builtin_suppliers(),
        }
    }
}

fn supplier(
    id: &str,
    name: &str,
    risk_score: f64,
    risk_categories: &[&str],
    location: &str,
    industry: &str,
    (y, m, d): (i32, u32, u32),
    compliance_status: ComplianceStatus,
    description: &str,
) -> Supplier {
    Supplier {
        id: id.to_string(),
        name: name.to_string(),
        risk_score,
        risk_categories: risk_categories.iter().map(|c| c.to_string()).collect(),
        location: location.to_string(),
        industry: industry.to_string(),
        last_audit_date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
        compliance_status,
        description: description.to_string(),
    }
}

fn builtin_suppliers() -> Vec<Supplier> {
    use ComplianceStatus::*;
    vec![
        supplier(
            "SUP001",
            "TechCore Components",
            8.2,
            &["Data Security", "Supply Chain Disruption"],
            "Germany",
            "Technology",
            (2024, 3, 14),
            UnderReview,
            "Semiconductor and embedded controller supplier with a recent data breach under investigation.",
        ),
        supplier(
            "SUP002",
            "GreenLeaf Textiles",
            6.5,
            &["Labor Practices", "Environmental"],
            "Bangladesh, South Asia",
            "Textiles",
            (2023, 11, 2),
            NonCompliant,
            "Garment manufacturer flagged for overtime violations and wastewater discharge.",
        ),
        supplier(
            "SUP003",
            "Nordic Steel Works",
            2.1,
            &["Financial"],
            "Sweden",
            "Manufacturing",
            (2024, 6, 20),
            Compliant,
            "Long-standing structural steel partner with clean audit history.",
        ),
        supplier(
            "SUP004",
            "Shenzhen Circuit Co",
            7.4,
            &["Data Security", "Geopolitical"],
            "China, Asia",
            "Technology",
            (2024, 1, 9),
            UnderReview,
            "Printed circuit board assembler subject to export control review.",
        ),
        supplier(
            "SUP005",
            "Andes Mining Group",
            9.1,
            &["Environmental", "Labor Practices", "Geopolitical"],
            "Peru, South America",
            "Mining",
            (2023, 8, 30),
            NonCompliant,
            "Copper and lithium extraction with unresolved tailings dam and community disputes.",
        ),
        supplier(
            "SUP006",
            "Maple Logistics",
            3.3,
            &["Supply Chain Disruption"],
            "Canada, North America",
            "Logistics",
            (2024, 4, 11),
            Compliant,
            "Cross-border freight forwarder with redundant routing capacity.",
        ),
        supplier(
            "SUP007",
            "Rhine Chemicals AG",
            5.8,
            &["Environmental", "Regulatory"],
            "Germany",
            "Chemicals",
            (2024, 2, 27),
            Compliant,
            "Specialty solvents producer completing REACH re-registration.",
        ),
        supplier(
            "SUP008",
            "Pacific Cloud Services",
            4.0,
            &["Data Security", "Financial"],
            "Singapore, Asia",
            "Technology",
            (2024, 5, 6),
            Compliant,
            "Managed hosting provider for regional data centers.",
        ),
        supplier(
            "SUP009",
            "Sahara Agro Exports",
            6.9,
            &["Labor Practices", "Financial"],
            "Morocco, Africa",
            "Agriculture",
            (2023, 10, 18),
            UnderReview,
            "Citrus and olive oil exporter with seasonal workforce concerns.",
        ),
        supplier(
            "SUP010",
            "Alpine Precision Parts",
            1.5,
            &["Supply Chain Disruption"],
            "Switzerland, Europe",
            "Manufacturing",
            (2024, 7, 1),
            Compliant,
            "CNC machined components supplier with dual-sourced raw materials.",
        ),
        supplier(
            "SUP011",
            "Mekong Electronics",
            7.9,
            &["Labor Practices", "Data Security"],
            "Vietnam, Asia",
            "Technology",
            (2023, 12, 12),
            NonCompliant,
            "Consumer electronics assembler with failed firmware signing controls.",
        ),
        supplier(
            "SUP012",
            "Iberia Pharma Supplies",
            4.7,
            &["Regulatory", "Quality"],
            "Spain, Europe",
            "Pharmaceuticals",
            (2024, 3, 3),
            UnderReview,
            "Active ingredient distributor awaiting GMP certificate renewal.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample(id: &str, score: f64) -> Supplier {
        supplier(
            id,
            "Sample",
            score,
            &["Financial"],
            "France",
            "Retail",
            (2024, 1, 1),
            ComplianceStatus::Compliant,
            "sample",
        )
    }

    #[test]
    fn test_builtin_dataset_satisfies_invariants() {
        let builtin = SupplierStore::builtin();
        assert!(!builtin.is_empty());
        let validated = SupplierStore::from_suppliers(builtin.all().to_vec())
            .expect("built-in data should pass validation");
        assert_eq!(validated.len(), builtin.len());
        assert_eq!(validated.get("SUP003").map(|s| s.name.as_str()), Some("Nordic Steel Works"));
        assert!(validated.get("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = SupplierStore::from_suppliers(vec![sample("a", 1.0), sample("a", 2.0)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate supplier id 'a'"));
    }

    #[test]
    fn test_rejects_out_of_range_scores() {
        assert!(SupplierStore::from_suppliers(vec![sample("a", 10.5)]).is_err());
        assert!(SupplierStore::from_suppliers(vec![sample("a", -0.1)]).is_err());
        assert!(SupplierStore::from_suppliers(vec![sample("a", f64::NAN)]).is_err());
        assert!(SupplierStore::from_suppliers(vec![sample("a", 0.0), sample("b", 10.0)]).is_ok());
    }

    #[test]
    fn test_from_path_reads_wrapped_yaml() {
        let path = std::env::temp_dir().join(format!("suppliers-{}.yaml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"suppliers:
  - id: X1
    name: Harbor Foods
    riskScore: 5
    riskCategories: [Quality]
    location: Chile
    industry: Food
    lastAuditDate: 2024-02-01
    complianceStatus: Under Review
    description: Seafood processor"#
        )
        .unwrap();

        let store = SupplierStore::from_path(&path).expect("yaml should load");
        fs::remove_file(&path).ok();

        assert_eq!(store.len(), 1);
        let s = store.get("X1").unwrap();
        assert_eq!(s.risk_score, 5.0);
        assert_eq!(s.compliance_status, ComplianceStatus::UnderReview);
    }

    #[test]
    fn test_from_path_reads_json_list() {
        let path = std::env::temp_dir().join(format!("suppliers-{}.json", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"[{"id":"J1","name":"Delta Plastics","riskScore":3.5,"riskCategories":[],
                "location":"Mexico","industry":"Plastics","lastAuditDate":"2023-09-09",
                "complianceStatus":"Compliant","description":"Injection molding"}]"#,
        )
        .unwrap();

        let store = SupplierStore::from_path(&path).expect("json should load");
        fs::remove_file(&path).ok();
        assert_eq!(store.all()[0].name, "Delta Plastics");
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let mut config = Config::default();
        config.data.supplier_file = None;
        let store = SupplierStore::load(&config).unwrap();
        assert_eq!(store.len(), SupplierStore::builtin().len());
    }
}
