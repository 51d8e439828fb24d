//! Result index built from a directory of decision documents.
//!
//! Every `*.json` file below the root is parsed and normalized. Results are
//! keyed by the `policy_id` embedded in the decision, falling back to the
//! file name without its extension. Loading is all-or-nothing: the first
//! unreadable or unparseable file aborts the load and no index is returned.

use crate::error::{Error, Result};
use crate::models::NormalizedResult;
use crate::normalize::normalize;
use rayon::prelude::*;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of decision documents.
pub const RESULT_EXT: &str = "json";

#[derive(Debug, Default)]
/// In-memory mapping from policy/check id to its normalized results.
pub struct ResultIndex {
    policy_index: HashMap<String, Vec<NormalizedResult>>,
}

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `dir` recursively and index every decision document found.
    pub fn load_from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let meta = fs::metadata(dir).map_err(|e| Error::io(dir, e))?;
        if !meta.is_dir() {
            return Err(Error::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::Other, "results path is not a directory"),
            ));
        }

        let files = discover(dir)?;
        // Parse in parallel; the ordered collect keeps walk order for the merge.
        let loaded: Vec<(String, Vec<NormalizedResult>)> = files
            .par_iter()
            .map(|path| -> Result<(String, Vec<NormalizedResult>)> {
                let doc = read_decision_file(path)?;
                Ok((file_policy_id(path), normalize(&doc)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut index = Self::new();
        for ((fallback, results), path) in loaded.into_iter().zip(&files) {
            debug!(
                file = %relative(dir, path),
                results = results.len(),
                "loaded decision document"
            );
            index.insert(&fallback, results);
        }
        info!(
            root = %dir.display(),
            files = files.len(),
            policies = index.len(),
            "indexed policy results"
        );
        Ok(index)
    }

    fn insert(&mut self, fallback: &str, results: Vec<NormalizedResult>) {
        for result in results {
            let key = match result.policy_id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => fallback.to_string(),
            };
            self.policy_index.entry(key).or_default().push(result);
        }
    }

    /// Results recorded for `policy_id`, empty when unknown.
    pub fn results_by_policy_id(&self, policy_id: &str) -> &[NormalizedResult] {
        self.policy_index
            .get(policy_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Indexed ids, sorted.
    pub fn policy_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.policy_index.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.policy_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policy_index.is_empty()
    }
}

/// Read a decision document and require a JSON object at the top level.
pub(crate) fn read_decision_file(path: &Path) -> Result<Json> {
    let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let doc: Json = serde_json::from_str(&data).map_err(|source| Error::Parse {
        file: file.clone(),
        source,
    })?;
    if !doc.is_object() {
        return Err(Error::Shape { file });
    }
    Ok(doc)
}

/// All regular `*.json` files below `dir`, in walk order.
fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        RESULT_EXT
    );
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn file_policy_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn relative(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}
