//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Page size used when a page is requested without one (default: 20).
    pub default_per_page: u32,

    /// Upper bound for a requested page size (default: 500).
    pub max_per_page: u32,

    /// Page assumed when only a page size is requested (default: 0).
    pub default_page: u32,

    /// Foreign-key field linking a detail row to its master (default: masterId).
    pub master_key: String,

    /// Field under which detail rows are attached to a master (default: expandedKey).
    pub expanded_key: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 500,
            default_page: 0,
            master_key: "masterId".to_string(),
            expanded_key: "expandedKey".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_per_page = env::var("TABLEDATA_DEFAULT_PER_PAGE")
            .unwrap_or_else(|_| defaults.default_per_page.to_string())
            .parse()
            .context("TABLEDATA_DEFAULT_PER_PAGE must be a valid u32")?;

        let max_per_page = env::var("TABLEDATA_MAX_PER_PAGE")
            .unwrap_or_else(|_| defaults.max_per_page.to_string())
            .parse()
            .context("TABLEDATA_MAX_PER_PAGE must be a valid u32")?;

        let default_page = env::var("TABLEDATA_DEFAULT_PAGE")
            .unwrap_or_else(|_| defaults.default_page.to_string())
            .parse()
            .context("TABLEDATA_DEFAULT_PAGE must be a valid u32")?;

        let master_key = env::var("TABLEDATA_MASTER_KEY").unwrap_or(defaults.master_key);
        let expanded_key = env::var("TABLEDATA_EXPANDED_KEY").unwrap_or(defaults.expanded_key);

        Ok(Self {
            default_per_page,
            max_per_page,
            default_page,
            master_key,
            expanded_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_params() {
        let config = LoaderConfig::default();
        assert_eq!(config.default_per_page, 20);
        assert_eq!(config.max_per_page, 500);
        assert_eq!(config.default_page, 0);
        assert_eq!(config.master_key, "masterId");
        assert_eq!(config.expanded_key, "expandedKey");
    }
}
