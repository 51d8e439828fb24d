//! Shared data models: normalized decisions, the check catalog, and the
//! observation records produced for reporting.

pub mod catalog;
pub mod observation;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Canonical decision extracted from any supported document shape.
pub struct NormalizedResult {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_resource_name: Option<String>,
    /// Document keys not captured by any other field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Json>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Original document, kept for diagnostics only.
    #[serde(skip)]
    pub raw: Arc<Json>,
}

impl NormalizedResult {
    /// Error message when the document reported one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}
