//! Output rendering for observation reports and normalized results.
//!
//! Supports `human` (default) and `json` outputs. The JSON report keeps the
//! reporting schema shape and adds a top-level summary.

use crate::compose::GenerateReport;
use crate::models::observation::{PvpResult, Verdict};
use crate::models::NormalizedResult;
use crate::utils::use_colors;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

/// Print an observation report in the requested format.
pub fn print_results(res: &PvpResult, output: &str) {
    match output {
        "json" => println!("{}", to_pretty(&compose_results_json(res))),
        _ => {
            let color = use_colors(output);
            for obs in &res.observations_by_check {
                let header = format!("{} ❲{}❳", obs.check_id, obs.title);
                if color {
                    println!("{}", header.bold());
                } else {
                    println!("{}", header);
                }
                if obs.subjects.is_empty() {
                    println!("  (no results)");
                }
                for s in &obs.subjects {
                    let tag = format!("⟦{}⟧", s.result.as_str());
                    let tag = if color {
                        match s.result {
                            Verdict::Pass => tag.green().bold().to_string(),
                            Verdict::Fail => tag.red().bold().to_string(),
                            Verdict::Error => tag.yellow().bold().to_string(),
                        }
                    } else {
                        tag
                    };
                    let name = if s.title.is_empty() { "-" } else { s.title.as_str() };
                    // first reason line inline, violations indented below
                    let mut lines = s.reason.lines();
                    println!("  {} {} — {}", tag, name, lines.next().unwrap_or_default());
                    for line in lines {
                        println!("      {}", line);
                    }
                }
            }
            let sm = res.summary();
            let summary = format!(
                "— Summary — pass={} fail={} error={} observations={}",
                sm.pass, sm.fail, sm.error, sm.observations
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Print the results normalized from one decision document.
pub fn print_normalized(results: &[NormalizedResult], output: &str) {
    match output {
        "json" => println!("{}", to_pretty(&compose_normalized_json(results))),
        _ => {
            let color = use_colors(output);
            if results.is_empty() {
                println!("no decision found");
            }
            for r in results {
                let state = if r.allowed { "allowed" } else { "denied" };
                let state = if !color {
                    state.to_string()
                } else if r.allowed {
                    state.green().bold().to_string()
                } else {
                    state.red().bold().to_string()
                };
                println!(
                    "{} policy={} resource={} — {}",
                    state,
                    r.policy_id.as_deref().unwrap_or("-"),
                    r.evaluated_resource_id.as_deref().unwrap_or("-"),
                    r.reason
                );
                for v in &r.violations {
                    println!("    • {}", v);
                }
            }
        }
    }
}

/// Print the files written by policy set generation.
pub fn print_generate(report: &GenerateReport, root: &Path, output: &str) {
    let rel = |p: &Path| {
        pathdiff::diff_paths(p, root)
            .unwrap_or_else(|| p.to_path_buf())
            .to_string_lossy()
            .to_string()
    };
    match output {
        "json" => {
            let out = json!({
                "copied": report.copied.iter().map(|p| rel(p)).collect::<Vec<_>>(),
                "data": rel(&report.data_file),
            });
            println!("{}", to_pretty(&out));
        }
        _ => {
            let color = use_colors(output);
            for p in report.copied.iter().chain(std::iter::once(&report.data_file)) {
                if color {
                    println!("{} {}", "📥 wrote:".green().bold(), rel(p));
                } else {
                    println!("📥 wrote: {}", rel(p));
                }
            }
        }
    }
}

fn to_pretty(v: &JsonVal) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

/// Compose the report JSON object (pure) for testing/snapshot purposes.
pub fn compose_results_json(res: &PvpResult) -> JsonVal {
    let mut out = serde_json::to_value(res).unwrap_or_else(|_| json!({}));
    if let JsonVal::Object(map) = &mut out {
        map.insert("summary".into(), json!(res.summary()));
    }
    out
}

/// Compose the normalized results JSON (pure); raw documents are omitted.
pub fn compose_normalized_json(results: &[NormalizedResult]) -> JsonVal {
    json!({ "results": results, "count": results.len() })
}
