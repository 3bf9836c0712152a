//! Cache import resolution
//!
//! Two option encodings feed the same list: structured JSON entries under
//! `cache-imports`, then plain registry refs under the legacy `cache-from`.
//! Entries present in both are kept twice.

use crate::frontend::options::{BuildOptions, KEY_CACHE_FROM, KEY_CACHE_IMPORTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub const REGISTRY_CACHE_TYPE: &str = "registry";
pub const REF_ATTR: &str = "ref";

#[derive(Debug, Error)]
pub enum CacheParseError {
    #[error("failed to parse {key} ({input:?}): {source}")]
    Json {
        key: &'static str,
        input: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheImportEntry {
    #[serde(rename = "Type", alias = "type")]
    pub cache_type: String,
    #[serde(rename = "Attrs", alias = "attrs", default)]
    pub attrs: BTreeMap<String, String>,
}

impl CacheImportEntry {
    pub fn registry(reference: impl Into<String>) -> Self {
        Self {
            cache_type: REGISTRY_CACHE_TYPE.to_string(),
            attrs: BTreeMap::from([(REF_ATTR.to_string(), reference.into())]),
        }
    }
}

pub fn resolve_cache_imports(opts: &BuildOptions) -> Result<Vec<CacheImportEntry>, CacheParseError> {
    let mut imports = Vec::new();

    if let Some(raw) = opts.get(KEY_CACHE_IMPORTS).filter(|s| !s.is_empty()) {
        let structured: Vec<CacheImportEntry> =
            serde_json::from_str(raw).map_err(|source| CacheParseError::Json {
                key: KEY_CACHE_IMPORTS,
                input: raw.to_string(),
                source,
            })?;
        imports.extend(structured);
    }

    if let Some(raw) = opts.get(KEY_CACHE_FROM).filter(|s| !s.is_empty()) {
        imports.extend(
            raw.split(',')
                .map(str::trim)
                .filter(|reference| !reference.is_empty())
                .map(CacheImportEntry::registry),
        );
    }

    debug!(count = imports.len(), "Resolved cache imports");
    Ok(imports)
}
