//! Validator configuration.
//!
//! The external type table is assembled from the built-in core table (unless
//! disabled), then any files listed in `SIGCAT_EXTERNAL_TYPES`, then files
//! passed explicitly. Later sources win when they disagree on an arity.

use crate::catalog::ExternalTypeTable;
use crate::split_list;
use anyhow::Result;
use std::env;
use std::path::PathBuf;
use tracing::debug;

pub const EXTERNAL_TYPES_ENV: &str = "SIGCAT_EXTERNAL_TYPES";

#[derive(Clone, Debug)]
pub struct ValidatorOptions {
    pub external: ExternalTypeTable,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            external: ExternalTypeTable::core(),
        }
    }
}

impl ValidatorOptions {
    pub fn new(external: ExternalTypeTable) -> Self {
        Self { external }
    }

    /// Build options from the core table, the environment and `paths`.
    pub fn from_sources(paths: &[PathBuf], include_core: bool) -> Result<Self> {
        let mut external = if include_core {
            ExternalTypeTable::core()
        } else {
            ExternalTypeTable::empty()
        };

        let mut sources = external_table_paths_from_env();
        sources.extend(paths.iter().cloned());
        for path in &sources {
            let table = ExternalTypeTable::load(path)?;
            debug!(path = %path.display(), entries = table.len(), "loaded external type table");
            external.merge(table);
        }

        Ok(Self { external })
    }
}

/// Paths listed in `SIGCAT_EXTERNAL_TYPES` (comma- or whitespace-separated).
pub fn external_table_paths_from_env() -> Vec<PathBuf> {
    env::var(EXTERNAL_TYPES_ENV)
        .map(|value| split_list(&value).into_iter().map(PathBuf::from).collect())
        .unwrap_or_default()
}
