//! Decision normalizer: raw OPA output to `NormalizedResult` records.
//!
//! Producers emit decisions in several shapes. `normalize` detects the shape
//! once and then runs every decision value through the same extraction:
//! - Result set: `{"result": [{"expressions": [{"value": {...}}]}]}` or the
//!   bare `[...]` array. Each expression value that is an object becomes one
//!   result.
//! - Decision: a flat object such as `{"allow": true, "violation": [...]}`,
//!   or the data API response `{"result": {...}}`. Exactly one result.
//! - Empty: `null`, `{}`, scalars and a `result` key holding neither an
//!   array nor a non-empty object. No results.
//!
//! Unrecognized fragments are skipped rather than reported. The module does
//! no I/O and no logging.

use crate::models::NormalizedResult;
use serde_json::{Map, Value as Json};
use std::sync::Arc;

pub const REASON_DEFAULT: &str = "No decision or explicitly denied by policy.";
pub const REASON_ALLOWED: &str = "Policy allowed access.";
pub const REASON_DENIED: &str = "Policy explicitly denied access.";
pub const REASON_VIOLATIONS: &str = "Policy denied due to violations.";

/// Keys read into dedicated fields; everything else lands in `metadata`.
const CONSUMED_KEYS: &[&str] = &[
    "allowed",
    "allow",
    "violation",
    "error",
    "policyId",
    "policy_id",
    "evaluation_resource_id",
    "evaluation_resource_type",
    "evaluation_resource_name",
];

/// Document layout detected at the top of `normalize`.
enum DecisionShape<'a> {
    ResultSet(&'a [Json]),
    Decision(&'a Map<String, Json>),
    Empty,
}

impl<'a> DecisionShape<'a> {
    fn detect(doc: &'a Json) -> Self {
        match doc {
            Json::Array(entries) => DecisionShape::ResultSet(entries),
            Json::Object(map) if map.is_empty() => DecisionShape::Empty,
            Json::Object(map) => match map.get("result") {
                Some(Json::Array(entries)) => DecisionShape::ResultSet(entries),
                Some(Json::Object(inner)) if inner.is_empty() => DecisionShape::Empty,
                Some(Json::Object(inner)) => DecisionShape::Decision(inner),
                Some(_) => DecisionShape::Empty,
                None => DecisionShape::Decision(map),
            },
            _ => DecisionShape::Empty,
        }
    }
}

/// Normalize a decision document of any supported shape.
///
/// Returns results in document order. An empty vector means the document
/// carried no decision.
pub fn normalize(doc: &Json) -> Vec<NormalizedResult> {
    let raw = Arc::new(doc.clone());
    match DecisionShape::detect(doc) {
        DecisionShape::ResultSet(entries) => entries
            .iter()
            .filter_map(|entry| entry.get("expressions")?.as_array())
            .flatten()
            .filter_map(|expr| expr.get("value")?.as_object())
            .map(|value| normalize_value(value, &raw))
            .collect(),
        DecisionShape::Decision(value) => vec![normalize_value(value, &raw)],
        DecisionShape::Empty => Vec::new(),
    }
}

fn normalize_value(value: &Map<String, Json>, raw: &Arc<Json>) -> NormalizedResult {
    let mut allowed = false;
    let mut reason = REASON_DEFAULT.to_string();

    let decision = value
        .get("allowed")
        .and_then(Json::as_bool)
        .or_else(|| value.get("allow").and_then(Json::as_bool));
    if let Some(decision) = decision {
        allowed = decision;
        reason = (if decision { REASON_ALLOWED } else { REASON_DENIED }).to_string();
    }

    let violations = value.get("violation").map(collect_violations).unwrap_or_default();
    if !violations.is_empty() {
        allowed = false;
        if !reason.contains("violation") {
            reason = REASON_VIOLATIONS.to_string();
        }
    }

    // Applied after violations so the error message wins. Any string denies,
    // but only a non-empty one is kept as the error.
    let error = string_field(value, "error");
    if let Some(msg) = error.as_deref() {
        allowed = false;
        reason = format!("Policy reported an error: {}", msg);
    }
    let error = error.filter(|e| !e.is_empty());

    if allowed && violations.is_empty() && reason == REASON_DEFAULT {
        reason = REASON_ALLOWED.to_string();
    }

    let metadata: Map<String, Json> = value
        .iter()
        .filter(|(k, _)| !CONSUMED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    NormalizedResult {
        allowed,
        policy_id: string_field(value, "policyId")
            .or_else(|| string_field(value, "policy_id"))
            .filter(|id| !id.is_empty()),
        reason,
        violations,
        evaluated_resource_id: string_field(value, "evaluation_resource_id"),
        evaluated_resource_type: string_field(value, "evaluation_resource_type"),
        evaluated_resource_name: string_field(value, "evaluation_resource_name"),
        metadata: if metadata.is_empty() {
            None
        } else {
            Some(metadata)
        },
        error,
        raw: Arc::clone(raw),
    }
}

/// Violations come either as a list of messages or as a set encoded as an
/// object whose keys are the messages.
fn collect_violations(v: &Json) -> Vec<String> {
    match v {
        Json::Array(items) => items
            .iter()
            .map(|item| match item {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Json::Object(set) => set.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn string_field(value: &Map<String, Json>, key: &str) -> Option<String> {
    value.get(key).and_then(Json::as_str).map(str::to_string)
}
