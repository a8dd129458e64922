//! Bundled story content.

use crate::catalog::{CatalogOptions, RuleCatalog};
use crate::error::CatalogError;

/// Murder at the railroad station: everyday life, the crime, the investigation
/// and its resolution.
pub const MYSTERY_RULES: &str = include_str!("../content/mystery_rules.txt");

/// The bundled rules with default options.
pub fn mystery_catalog() -> Result<RuleCatalog, CatalogError> {
    mystery_catalog_with(&CatalogOptions::default())
}

pub fn mystery_catalog_with(options: &CatalogOptions) -> Result<RuleCatalog, CatalogError> {
    RuleCatalog::parse_with(MYSTERY_RULES, options)
}
