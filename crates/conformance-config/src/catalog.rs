// crates/conformance-config/src/catalog.rs
// ============================================================================
// Module: Type Catalog Files
// Description: TOML type catalog parsing and loading.
// Purpose: Let a run exercise the type system of a real TUT.
// Dependencies: conformance-core, serde, toml
// ============================================================================

//! ## Overview
//! A catalog file lists type descriptors as `[[types]]` tables:
//!
//! ```toml
//! [[types]]
//! id = "type-asset"
//! name = "Asset"
//! category = "entity"
//!
//! [[types]]
//! id = "type-link"
//! name = "AssetLink"
//! category = "relationship"
//! ends = { end_one = "type-asset", end_two = "type-asset" }
//! ```
//!
//! Parsed descriptors go through [`StaticTypeCatalog::new`], so duplicate
//! ids, dangling supertypes, and malformed relationship ends are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use conformance_core::TypeDescriptor;
use conformance_core::runtime::StaticTypeCatalog;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ConfigError;
use crate::config::validate_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum catalog file size in bytes.
const MAX_CATALOG_FILE_SIZE: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Catalog File
// ============================================================================

/// On-disk catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Type descriptors in any order.
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

/// Parses catalog TOML into a validated catalog.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] when the descriptors are inconsistent.
pub fn parse_type_catalog(content: &str) -> Result<StaticTypeCatalog, ConfigError> {
    let file: CatalogFile =
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    if file.types.is_empty() {
        return Err(ConfigError::Invalid("type catalog lists no types".to_string()));
    }
    StaticTypeCatalog::new(file.types)
        .map_err(|err| ConfigError::Invalid(format!("type catalog: {err}")))
}

/// Loads and validates a catalog file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable, oversized, not
/// UTF-8, or invalid.
pub fn load_type_catalog(path: &Path) -> Result<StaticTypeCatalog, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CATALOG_FILE_SIZE {
        return Err(ConfigError::Invalid("type catalog exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("type catalog must be utf-8".to_string()))?;
    parse_type_catalog(content)
}
