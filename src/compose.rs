//! Policy set generation and bundling.
//!
//! `generate_policy_set` copies the Rego template of every catalog check into
//! the output directory and writes the merged rule parameters to `data.json`.
//! `bundle` hands the output directory to the external `opa build` command.

use crate::error::{Error, Result};
use crate::models::catalog::Catalog;
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Extension of policy templates.
pub const TEMPLATE_EXT: &str = "rego";
/// Parameter file written next to the copied templates.
pub const DATA_FILE: &str = "data.json";

pub struct Composer {
    templates: PathBuf,
    output: PathBuf,
}

/// Files written by `generate_policy_set`.
#[derive(Debug)]
pub struct GenerateReport {
    pub copied: Vec<PathBuf>,
    pub data_file: PathBuf,
}

impl Composer {
    pub fn new(templates: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            templates: templates.into(),
            output: output.into(),
        }
    }

    /// Copy in-scope check templates and write the parameter file.
    ///
    /// Parameters from later rules override earlier ones with the same id.
    pub fn generate_policy_set(&self, catalog: &Catalog) -> Result<GenerateReport> {
        fs::create_dir_all(&self.output).map_err(|e| Error::io(&self.output, e))?;

        let mut parameters = Map::new();
        let mut copied = Vec::new();
        for rule in &catalog.rules {
            for prm in &rule.parameters {
                parameters.insert(prm.id.clone(), Json::String(prm.value.clone()));
            }
            for check in &rule.checks {
                let file = format!("{}.{}", check.id, TEMPLATE_EXT);
                let src = self.templates.join(&file);
                let dst = self.output.join(&file);
                fs::copy(&src, &dst).map_err(|e| Error::io(&src, e))?;
                copied.push(dst);
            }
        }

        let data_file = self.output.join(DATA_FILE);
        let data = serde_json::to_string_pretty(&Json::Object(parameters)).map_err(|source| {
            Error::Parse {
                file: DATA_FILE.to_string(),
                source,
            }
        })?;
        fs::write(&data_file, data).map_err(|e| Error::io(&data_file, e))?;
        info!(
            output = %self.output.display(),
            policies = copied.len(),
            "generated policy set"
        );
        Ok(GenerateReport { copied, data_file })
    }

    /// Build an OPA bundle from the output directory with `opa build`.
    pub fn bundle(&self, bundle: &Path, revision: Option<&str>) -> Result<()> {
        let mut cmd = Command::new("opa");
        cmd.arg("build")
            .arg("--bundle")
            .arg(&self.output)
            .arg("--output")
            .arg(bundle);
        if let Some(rev) = revision.filter(|r| !r.is_empty()) {
            cmd.arg("--revision").arg(rev);
        }
        info!(bundle = %bundle.display(), "creating policy bundle");
        let out = cmd
            .output()
            .map_err(|e| Error::Bundle(format!("failed to run opa: {}", e)))?;
        if !out.status.success() {
            return Err(Error::Bundle(format!(
                "opa build exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}
