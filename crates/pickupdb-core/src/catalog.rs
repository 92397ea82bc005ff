use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One tour product in the catalog snapshot.
///
/// The snapshot is the offline view of the catalog used by bulk sync and by
/// the filter surfaces; `code` is the upstream product code and the unique
/// key everywhere in this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl CatalogProduct {
    /// Concatenated free text scanned by the keyword heuristic: name,
    /// category, description, space-joined.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = self.name.clone();
        if let Some(category) = &self.category {
            text.push(' ');
            text.push_str(category);
        }
        if let Some(description) = &self.description {
            text.push(' ');
            text.push_str(description);
        }
        text
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<CatalogProduct>,
}

/// Load and validate the catalog snapshot from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_codes = HashSet::new();

    for product in &catalog.products {
        if product.code.trim().is_empty() {
            return Err(ConfigError::Validation(
                "product code must be non-empty".to_string(),
            ));
        }

        if product.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "product '{}' has an empty name",
                product.code
            )));
        }

        let lower_code = product.code.to_lowercase();
        if !seen_codes.insert(lower_code) {
            return Err(ConfigError::Validation(format!(
                "duplicate product code: '{}'",
                product.code
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str, name: &str) -> CatalogProduct {
        CatalogProduct {
            code: code.to_string(),
            name: name.to_string(),
            category: None,
            description: None,
        }
    }

    #[test]
    fn search_text_joins_present_fields() {
        let mut p = product("PTAM01", "Winery Day Trip");
        p.category = Some("Day Tours".to_string());
        p.description = Some("Visit Mount Tamborine wineries".to_string());
        assert_eq!(
            p.search_text(),
            "Winery Day Trip Day Tours Visit Mount Tamborine wineries"
        );
    }

    #[test]
    fn search_text_skips_missing_fields() {
        let p = product("PX", "City Lights Tour");
        assert_eq!(p.search_text(), "City Lights Tour");
    }

    #[test]
    fn validate_rejects_empty_code() {
        let catalog = CatalogFile {
            products: vec![product("  ", "Something")],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let catalog = CatalogFile {
            products: vec![product("P1", " ")],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("empty name"));
    }

    #[test]
    fn validate_rejects_duplicate_codes_case_insensitively() {
        let catalog = CatalogFile {
            products: vec![product("PBNE01", "Morning Tour"), product("pbne01", "Evening Tour")],
        };
        let err = validate_catalog(&catalog).unwrap_err();
        assert!(err.to_string().contains("duplicate product code"));
    }

    #[test]
    fn validate_accepts_distinct_products() {
        let catalog = CatalogFile {
            products: vec![product("PBNE01", "Morning Tour"), product("PGC02", "Coast Tour")],
        };
        assert!(validate_catalog(&catalog).is_ok());
    }

    #[test]
    fn load_catalog_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("catalog.yaml");
        assert!(
            path.exists(),
            "catalog.yaml missing at {path:?}; required for this test"
        );
        let result = load_catalog(&path);
        assert!(result.is_ok(), "failed to load catalog.yaml: {result:?}");
        let catalog = result.unwrap();
        assert!(!catalog.products.is_empty());
    }
}
