//! Observation mapper: normalized results to per-check observations.
//!
//! For every check in the catalog the mapper asks a `ResultSource` for the
//! check's results, turns each result into a `Subject`, and groups them into
//! one `Observation`. Sources are either the prebuilt `ResultIndex` or a
//! `DirectReader` that opens `{check_id}.json` on demand. The first source
//! failure aborts the whole report.

use crate::error::{Error, Result};
use crate::loader::{read_decision_file, ResultIndex, RESULT_EXT};
use crate::models::catalog::{Catalog, Check, RuleSet};
use crate::models::observation::{Observation, PvpResult, Subject, Verdict, METHOD_AUTOMATED};
use crate::models::NormalizedResult;
use crate::normalize::normalize;
use chrono::Utc;
use std::borrow::Cow;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// How a normalized result becomes a pass/fail/error verdict.
pub enum VerdictPolicy {
    /// Error wins, then an allowed decision without violations passes.
    #[default]
    Corrected,
    /// Legacy rule: pass only when allowed, violation-free, and carrying an
    /// error message. Plain allowed decisions fail.
    Literal,
}

impl VerdictPolicy {
    pub fn verdict(&self, result: &NormalizedResult) -> Verdict {
        let has_error = result.error_message().is_some();
        match self {
            VerdictPolicy::Corrected => {
                if has_error {
                    Verdict::Error
                } else if result.allowed && result.violations.is_empty() {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            }
            VerdictPolicy::Literal => {
                if result.violations.is_empty() && result.allowed && has_error {
                    Verdict::Pass
                } else if has_error {
                    Verdict::Error
                } else {
                    Verdict::Fail
                }
            }
        }
    }
}

impl FromStr for VerdictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corrected" => Ok(VerdictPolicy::Corrected),
            "literal" => Ok(VerdictPolicy::Literal),
            other => Err(Error::config(format!(
                "unknown verdict policy {:?} (expected corrected|literal)",
                other
            ))),
        }
    }
}

/// Supplies the normalized results recorded for a check.
pub trait ResultSource {
    fn results_for(&self, check_id: &str) -> Result<Cow<'_, [NormalizedResult]>>;
}

impl ResultSource for ResultIndex {
    fn results_for(&self, check_id: &str) -> Result<Cow<'_, [NormalizedResult]>> {
        Ok(Cow::Borrowed(self.results_by_policy_id(check_id)))
    }
}

/// Reads `{dir}/{check_id}.json` for each requested check. Every result in
/// the file belongs to the check, regardless of any embedded policy id.
#[derive(Debug, Clone)]
pub struct DirectReader {
    dir: PathBuf,
}

impl DirectReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResultSource for DirectReader {
    fn results_for(&self, check_id: &str) -> Result<Cow<'_, [NormalizedResult]>> {
        let path = self.dir.join(format!("{}.{}", check_id, RESULT_EXT));
        let doc = read_decision_file(&path)?;
        Ok(Cow::Owned(normalize(&doc)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ObservationMapper {
    pub verdict: VerdictPolicy,
    /// Emit observations for checks without results.
    pub emit_empty: bool,
}

impl Default for ObservationMapper {
    fn default() -> Self {
        Self {
            verdict: VerdictPolicy::default(),
            emit_empty: true,
        }
    }
}

impl ObservationMapper {
    pub fn new(verdict: VerdictPolicy, emit_empty: bool) -> Self {
        Self {
            verdict,
            emit_empty,
        }
    }

    /// Build one observation per catalog check, in catalog order.
    pub fn get_results(&self, catalog: &Catalog, source: &dyn ResultSource) -> Result<PvpResult> {
        let mut observations = Vec::new();
        for (rule, check) in catalog.checks() {
            let results = source.results_for(&check.id)?;
            debug!(check = %check.id, results = results.len(), "mapping check results");
            if results.is_empty() && !self.emit_empty {
                continue;
            }
            observations.push(self.observe(rule, check, &results));
        }
        Ok(PvpResult {
            observations_by_check: observations,
        })
    }

    pub fn observe(&self, rule: &RuleSet, check: &Check, results: &[NormalizedResult]) -> Observation {
        Observation {
            title: rule.id.clone(),
            check_id: check.id.clone(),
            description: format!("Observation of check {}", check.id),
            methods: vec![METHOD_AUTOMATED.to_string()],
            // Mapping time, not evaluation time; decisions carry no timestamp.
            collected: Utc::now(),
            subjects: results.iter().map(|r| self.to_subject(r)).collect(),
        }
    }

    pub fn to_subject(&self, result: &NormalizedResult) -> Subject {
        Subject {
            title: result.evaluated_resource_name.clone().unwrap_or_default(),
            resource_id: result.evaluated_resource_id.clone().unwrap_or_default(),
            kind: result.evaluated_resource_type.clone().unwrap_or_default(),
            result: self.verdict.verdict(result),
            evaluated_on: Utc::now(),
            reason: subject_reason(result),
        }
    }
}

/// Result reason followed by the violation list, one message per line.
pub fn subject_reason(result: &NormalizedResult) -> String {
    if result.violations.is_empty() {
        return result.reason.clone();
    }
    let mut reason = format!("{}\nViolations:", result.reason);
    for violation in &result.violations {
        reason.push('\n');
        reason.push_str(violation);
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Parameter;
    use crate::normalize::REASON_VIOLATIONS;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    const VIOLATION: &str = "Branch protection for 'main' requires pull request reviews but has less than the configured minimum of 1 required approving reviews.";

    fn one(doc: serde_json::Value) -> NormalizedResult {
        normalize(&doc).remove(0)
    }

    fn catalog(checks: &[&str]) -> Catalog {
        Catalog {
            rules: vec![RuleSet {
                id: "rule-1".into(),
                parameters: vec![Parameter {
                    id: "p".into(),
                    value: "1".into(),
                }],
                checks: checks.iter().map(|id| Check { id: id.to_string() }).collect(),
            }],
        }
    }

    #[test]
    fn test_results_to_subject_with_violations() {
        let result = one(json!({
            "result": [{"expressions": [{"value": {
                "allow": false,
                "evaluation_resource_id": "github.com/example/demo@main",
                "evaluation_resource_type": "resource",
                "evaluation_resource_name": "github.com/example/demo@main",
                "policy_id": "my-policy",
                "violation": {VIOLATION: true}
            }}]}]
        }));
        let subject = ObservationMapper::default().to_subject(&result);
        assert_eq!(subject.kind, "resource");
        assert_eq!(subject.title, "github.com/example/demo@main");
        assert_eq!(subject.resource_id, "github.com/example/demo@main");
        assert_eq!(subject.result, Verdict::Fail);
        assert_eq!(
            subject.reason,
            format!("{}\nViolations:\n{}", REASON_VIOLATIONS, VIOLATION)
        );
    }

    #[test]
    fn test_allowed_verdict_corrected_passes() {
        let result = one(json!({"allowed": true}));
        assert_eq!(result.reason, "Policy allowed access.");
        assert_eq!(VerdictPolicy::Corrected.verdict(&result), Verdict::Pass);
        assert_eq!(ObservationMapper::default().to_subject(&result).reason, result.reason);
    }

    #[test]
    fn test_allowed_verdict_literal_fails() {
        let result = one(json!({"allowed": true}));
        assert_eq!(VerdictPolicy::Literal.verdict(&result), Verdict::Fail);
    }

    #[test]
    fn test_error_verdicts() {
        let result = one(json!({"allowed": true, "error": "eval failed"}));
        assert_eq!(VerdictPolicy::Corrected.verdict(&result), Verdict::Error);
        // normalization denies on error, so the literal pass branch is unreachable here
        assert_eq!(VerdictPolicy::Literal.verdict(&result), Verdict::Error);

        let mut forged = result.clone();
        forged.allowed = true;
        assert_eq!(VerdictPolicy::Literal.verdict(&forged), Verdict::Pass);
        assert_eq!(VerdictPolicy::Corrected.verdict(&forged), Verdict::Error);
    }

    #[test]
    fn test_denied_without_error_fails() {
        let result = one(json!({"allow": false}));
        assert_eq!(VerdictPolicy::Corrected.verdict(&result), Verdict::Fail);
        assert_eq!(VerdictPolicy::Literal.verdict(&result), Verdict::Fail);
    }

    #[test]
    fn test_empty_error_string_fails() {
        let result = one(json!({"allowed": true, "error": ""}));
        assert_eq!(VerdictPolicy::Corrected.verdict(&result), Verdict::Fail);
        assert_eq!(VerdictPolicy::Literal.verdict(&result), Verdict::Fail);
    }

    #[test]
    fn test_verdict_policy_from_str() {
        assert_eq!("Literal".parse::<VerdictPolicy>().unwrap(), VerdictPolicy::Literal);
        assert_eq!(" corrected ".parse::<VerdictPolicy>().unwrap(), VerdictPolicy::Corrected);
        assert!("strict".parse::<VerdictPolicy>().is_err());
    }

    #[test]
    fn test_get_results_from_index() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("check-a.json"),
            r#"{"result":[{"expressions":[{"value":{"allow":true,"evaluation_resource_name":"repo"}}]}]}"#,
        )
        .unwrap();
        let index = ResultIndex::load_from_directory(dir.path()).unwrap();

        let res = ObservationMapper::default()
            .get_results(&catalog(&["check-a", "check-b"]), &index)
            .unwrap();
        assert_eq!(res.observations_by_check.len(), 2);
        let first = &res.observations_by_check[0];
        assert_eq!(first.title, "rule-1");
        assert_eq!(first.check_id, "check-a");
        assert_eq!(first.description, "Observation of check check-a");
        assert_eq!(first.methods, vec!["TEST-AUTOMATED"]);
        assert_eq!(first.subjects.len(), 1);
        assert_eq!(first.subjects[0].result, Verdict::Pass);
        assert!(res.observations_by_check[1].subjects.is_empty());

        let omitted = ObservationMapper::new(VerdictPolicy::Corrected, false)
            .get_results(&catalog(&["check-a", "check-b"]), &index)
            .unwrap();
        assert_eq!(omitted.observations_by_check.len(), 1);
    }

    #[test]
    fn test_get_results_direct_reader() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("check-a.json"),
            r#"{"allowed":false,"policy_id":"elsewhere","violation":["v1","v2"]}"#,
        )
        .unwrap();

        let res = ObservationMapper::default()
            .get_results(&catalog(&["check-a"]), &DirectReader::new(dir.path()))
            .unwrap();
        let subject = &res.observations_by_check[0].subjects[0];
        assert_eq!(subject.result, Verdict::Fail);
        assert!(subject.reason.ends_with("Violations:\nv1\nv2"));
        assert_eq!(res.summary().fail, 1);
    }

    #[test]
    fn test_direct_reader_missing_file_aborts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("check-a.json"), r#"{"allowed":true}"#).unwrap();
        let err = ObservationMapper::default()
            .get_results(&catalog(&["check-a", "check-b"]), &DirectReader::new(dir.path()))
            .unwrap_err();
        match err {
            Error::Io { path, .. } => assert!(path.ends_with("check-b.json")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_direct_reader_parse_error_names_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("check-a.json"), "nope").unwrap();
        let err = DirectReader::new(dir.path()).results_for("check-a").unwrap_err();
        assert!(err.to_string().contains("check-a.json"));
    }
}
