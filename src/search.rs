use std::cmp::Ordering;
use tracing::debug;

use crate::models::{SearchParams, SearchResult, SortBy, SortOrder, Supplier, SupplierResult};
use crate::store::SupplierStore;

/// Apply filters, sort and limit to the store and project the survivors.
///
/// Pure and deterministic for a given store. Params are trusted as-is: a
/// min bound above the max bound just yields nothing.
pub fn search(store: &SupplierStore, params: &SearchParams) -> SearchResult {
    let filter = Filter::new(params);
    let mut matched: Vec<&Supplier> = store.all().iter().filter(|s| filter.matches(s)).collect();

    if let Some(sort_by) = params.sort_by {
        let order = params.sort_order.unwrap_or_default();
        // sort_by is stable, so ties keep store order in both directions
        matched.sort_by(|a, b| {
            let ord = compare(a, b, sort_by);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    if let Some(limit) = params.limit {
        matched.truncate(limit as usize);
    }

    let suppliers: Vec<SupplierResult> = matched.into_iter().map(SupplierResult::from).collect();
    debug!(
        "Supplier search matched {} of {} suppliers",
        suppliers.len(),
        store.len()
    );

    SearchResult {
        count: suppliers.len(),
        suppliers,
        filters_used: params.clone(),
    }
}

fn compare(a: &Supplier, b: &Supplier, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::RiskScore => a.risk_score.total_cmp(&b.risk_score),
        SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}

/// Params with string needles lowercased once up front
struct Filter<'a> {
    params: &'a SearchParams,
    location: Option<String>,
    industry: Option<String>,
    categories: Vec<String>,
    query: Option<String>,
}

impl<'a> Filter<'a> {
    fn new(params: &'a SearchParams) -> Self {
        let lower = |s: &Option<String>| s.as_ref().map(|v| v.to_lowercase());
        Self {
            params,
            location: lower(&params.location),
            industry: lower(&params.industry),
            categories: params.risk_category.iter().map(|c| c.to_lowercase()).collect(),
            query: lower(&params.query),
        }
    }

    fn matches(&self, s: &Supplier) -> bool {
        if let Some(min) = self.params.min_risk_score {
            if s.risk_score < min {
                return false;
            }
        }
        if let Some(max) = self.params.max_risk_score {
            if s.risk_score > max {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !s.location.to_lowercase().contains(location) {
                return false;
            }
        }
        if let Some(industry) = &self.industry {
            if !s.industry.to_lowercase().contains(industry) {
                return false;
            }
        }
        if !self.categories.is_empty() {
            let hit = s.risk_categories.iter().any(|category| {
                let category = category.to_lowercase();
                self.categories.iter().any(|needle| category.contains(needle))
            });
            if !hit {
                return false;
            }
        }
        if !self.params.compliance_status.is_empty()
            && !self.params.compliance_status.contains(&s.compliance_status)
        {
            return false;
        }
        if let Some(query) = &self.query {
            if !s.name.to_lowercase().contains(query)
                && !s.description.to_lowercase().contains(query)
            {
                return false;
            }
        }
        true
    }
}
