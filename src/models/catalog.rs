//! Check catalog: rules grouping checks and their parameters.
//!
//! The catalog decides which checks are reported and which Rego templates
//! are copied into a policy set. It can be written as TOML, YAML, or JSON:
//!
//! ```toml
//! [[rules]]
//! id = "branch-protection"
//! parameters = [{ id = "main_branch_min_approvals", value = "1" }]
//! checks = [{ id = "branch_protection" }]
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
/// Root catalog document.
pub struct Catalog {
    #[serde(default)]
    pub rules: Vec<RuleSet>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// A rule with its parameters and the checks that implement it.
pub struct RuleSet {
    pub id: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Parameter {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Check {
    pub id: String,
}

impl Catalog {
    /// Load a catalog, choosing the format from the file extension
    /// (`.toml`, `.yaml`/`.yml`, anything else is read as JSON).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let file = path.to_string_lossy().to_string();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let catalog: Catalog = match ext.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| Error::Catalog {
                file: file.clone(),
                message: e.to_string(),
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| Error::Catalog {
                file: file.clone(),
                message: e.to_string(),
            })?,
            _ => serde_json::from_str(&content).map_err(|e| Error::Catalog {
                file: file.clone(),
                message: e.to_string(),
            })?,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check ids become file names, so only a conservative character set
    /// is accepted.
    pub fn validate(&self) -> Result<()> {
        let re = Regex::new(r"^[A-Za-z0-9._-]+$").map_err(|e| Error::config(e.to_string()))?;
        let bad: Vec<String> = self
            .checks()
            .filter(|(_, c)| !re.is_match(&c.id) || c.id == "." || c.id == "..")
            .map(|(rule, c)| format!("invalid check id {:?} in rule {}", c.id, rule.id))
            .collect();
        if bad.is_empty() {
            Ok(())
        } else {
            Err(Error::config(bad.join("\n")))
        }
    }

    /// All `(rule, check)` pairs in catalog order.
    pub fn checks(&self) -> impl Iterator<Item = (&RuleSet, &Check)> {
        self.rules
            .iter()
            .flat_map(|rule| rule.checks.iter().map(move |check| (rule, check)))
    }
}
