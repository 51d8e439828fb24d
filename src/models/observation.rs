//! Reporting records handed to the compliance layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Method tag attached to every observation.
pub const METHOD_AUTOMATED: &str = "TEST-AUTOMATED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Outcome recorded for one evaluated resource.
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// One evaluated resource within an observation.
pub struct Subject {
    pub title: String,
    pub resource_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub result: Verdict,
    pub evaluated_on: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// All subjects evaluated for a single check.
pub struct Observation {
    pub title: String,
    pub check_id: String,
    pub description: String,
    pub methods: Vec<String>,
    pub collected: DateTime<Utc>,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
/// Observations for every reported check.
pub struct PvpResult {
    pub observations_by_check: Vec<Observation>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
/// Verdict counts used by printers.
pub struct Summary {
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    pub observations: usize,
}

impl PvpResult {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            observations: self.observations_by_check.len(),
            ..Summary::default()
        };
        for subject in self.subjects() {
            match subject.result {
                Verdict::Pass => summary.pass += 1,
                Verdict::Fail => summary.fail += 1,
                Verdict::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Every subject across all observations, in report order.
    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.observations_by_check
            .iter()
            .flat_map(|o| o.subjects.iter())
    }
}
