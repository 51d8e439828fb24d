//! Configuration discovery and effective settings resolution.
//!
//! opa-pvp reads `opa-pvp.toml|yaml|yml` from the working root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `verdict`: `corrected`
//! - `emit-empty`: true
//! - `source`: `index`
//! - all paths unset
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{Error, Result};
use crate::observe::VerdictPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILES: [&str; 3] = ["opa-pvp.toml", "opa-pvp.yaml", "opa-pvp.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
/// Root configuration loaded from `opa-pvp.toml|yaml`.
pub struct PvpConfig {
    pub policy_templates: Option<String>,
    pub policy_output: Option<String>,
    pub policy_results: Option<String>,
    pub bundle: Option<String>,
    pub bundle_revision: Option<String>,
    pub catalog: Option<String>,
    pub output: Option<String>,
    pub verdict: Option<String>,
    pub emit_empty: Option<bool>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Where the mapper looks up check results.
pub enum SourceMode {
    /// Walk the results directory once and look checks up by id.
    #[default]
    Index,
    /// Open `{check}.json` for every check.
    Direct,
}

impl FromStr for SourceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" => Ok(SourceMode::Index),
            "direct" => Ok(SourceMode::Direct),
            other => Err(Error::config(format!(
                "unknown results source {:?} (expected index|direct)",
                other
            ))),
        }
    }
}

/// CLI-provided values; `None` defers to the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub root: Option<String>,
    pub policy_templates: Option<String>,
    pub policy_output: Option<String>,
    pub policy_results: Option<String>,
    pub bundle: Option<String>,
    pub bundle_revision: Option<String>,
    pub catalog: Option<String>,
    pub output: Option<String>,
    pub verdict: Option<String>,
    pub emit_empty: Option<bool>,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
/// Relative paths are resolved against `root`.
pub struct Effective {
    pub root: PathBuf,
    pub policy_templates: Option<PathBuf>,
    pub policy_output: Option<PathBuf>,
    pub policy_results: Option<PathBuf>,
    pub bundle: Option<PathBuf>,
    pub bundle_revision: Option<String>,
    pub catalog: Option<PathBuf>,
    pub output: String,
    pub verdict: VerdictPolicy,
    pub emit_empty: bool,
    pub source: SourceMode,
    pub config_found: bool,
}

/// Walk upward from `start` to detect the working root.
///
/// Stops when an `opa-pvp.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `PvpConfig` from `opa-pvp.toml` or `opa-pvp.yaml|yml` if present.
///
/// A present but malformed file is an error rather than silently ignored.
pub fn load_config(root: &Path) -> Result<Option<PvpConfig>> {
    let toml_path = root.join(CONFIG_FILES[0]);
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).map_err(|e| Error::io(&toml_path, e))?;
        let cfg: PvpConfig = toml::from_str(&s)
            .map_err(|e| Error::config(format!("{}: {}", toml_path.display(), e)))?;
        return Ok(Some(cfg));
    }
    for yml in &CONFIG_FILES[1..] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).map_err(|e| Error::io(&p, e))?;
            let cfg: PvpConfig = serde_yaml::from_str(&s)
                .map_err(|e| Error::config(format!("{}: {}", p.display(), e)))?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &CliOverrides) -> Result<Effective> {
    let start = PathBuf::from(cli.root.as_deref().unwrap_or("."));
    let root = detect_root(&start);
    let loaded = load_config(&root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let path = |cli_val: &Option<String>, cfg_val: Option<String>| {
        cli_val
            .clone()
            .or(cfg_val)
            .filter(|s| !s.is_empty())
            .map(|s| root.join(s))
    };

    let verdict = match cli.verdict.clone().or(cfg.verdict) {
        Some(v) => v.parse()?,
        None => VerdictPolicy::default(),
    };
    let source = match cli.source.clone().or(cfg.source) {
        Some(s) => s.parse()?,
        None => SourceMode::default(),
    };

    Ok(Effective {
        policy_templates: path(&cli.policy_templates, cfg.policy_templates),
        policy_output: path(&cli.policy_output, cfg.policy_output),
        policy_results: path(&cli.policy_results, cfg.policy_results),
        bundle: path(&cli.bundle, cfg.bundle),
        bundle_revision: cli.bundle_revision.clone().or(cfg.bundle_revision),
        catalog: path(&cli.catalog, cfg.catalog),
        output: cli
            .output
            .clone()
            .or(cfg.output)
            .unwrap_or_else(|| "human".to_string()),
        verdict,
        emit_empty: cli.emit_empty.or(cfg.emit_empty).unwrap_or(true),
        source,
        config_found,
        root,
    })
}

impl Effective {
    /// Stat every configured directory and report all failures at once.
    pub fn validate(&self) -> Result<()> {
        let errs: Vec<String> = [
            &self.policy_output,
            &self.policy_results,
            &self.policy_templates,
        ]
        .into_iter()
        .flatten()
        .filter_map(|p| {
            fs::metadata(p)
                .err()
                .map(|e| format!("path {:?}: {}", p.display().to_string(), e))
        })
        .collect();
        if errs.is_empty() {
            Ok(())
        } else {
            Err(Error::config(errs.join("\n")))
        }
    }

    /// Return a required path or a config error naming the missing key.
    pub fn require<'a>(&self, value: &'a Option<PathBuf>, key: &str) -> Result<&'a Path> {
        value
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is not configured", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn at(root: &Path) -> CliOverrides {
        // Pin root detection to the temp dir.
        fs::create_dir_all(root.join(".git")).unwrap();
        CliOverrides {
            root: root.to_str().map(str::to_string),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("opa-pvp.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
policy-results = "results"
catalog = "catalog.toml"
output = "json"
verdict = "literal"
emit-empty = false
source = "direct"
    "#
        )
        .unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.policy_results, Some(root.join("results")));
        assert_eq!(eff.catalog, Some(root.join("catalog.toml")));
        assert_eq!(eff.output, "json");
        assert_eq!(eff.verdict, VerdictPolicy::Literal);
        assert!(!eff.emit_empty);
        assert_eq!(eff.source, SourceMode::Direct);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("opa-pvp.yaml"),
            "policy-templates: templates\npolicy-output: out\n",
        )
        .unwrap();

        let eff = resolve_effective(&at(root)).unwrap();
        assert_eq!(eff.policy_templates, Some(root.join("templates")));
        assert_eq!(eff.output, "human");
        assert_eq!(eff.verdict, VerdictPolicy::Corrected);
        assert!(eff.emit_empty);
        assert_eq!(eff.source, SourceMode::Index);
        assert!(eff.bundle.is_none());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("opa-pvp.toml"),
            "output = \"json\"\nverdict = \"literal\"\nemit-empty = true\n",
        )
        .unwrap();

        let cli = CliOverrides {
            output: Some("human".into()),
            verdict: Some("corrected".into()),
            emit_empty: Some(false),
            ..at(root)
        };
        let eff = resolve_effective(&cli).unwrap();
        assert_eq!(eff.output, "human");
        assert_eq!(eff.verdict, VerdictPolicy::Corrected);
        assert!(!eff.emit_empty);
    }

    #[test]
    fn test_no_config_file() {
        let dir = tempdir().unwrap();
        let eff = resolve_effective(&at(dir.path())).unwrap();
        assert!(!eff.config_found);
        assert!(eff.catalog.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("opa-pvp.toml"), "verdict = \"maybe\"\n").unwrap();
        assert!(resolve_effective(&at(dir.path())).is_err());

        fs::write(dir.path().join("opa-pvp.toml"), "emit-empty = \"yes\"\n").unwrap();
        assert!(resolve_effective(&at(dir.path())).is_err());
    }

    #[test]
    fn test_validate_joins_missing_paths() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("templates")).unwrap();
        let cli = CliOverrides {
            policy_templates: Some("templates".into()),
            policy_output: Some("missing-out".into()),
            policy_results: Some("missing-results".into()),
            ..at(root)
        };
        let eff = resolve_effective(&cli).unwrap();
        let msg = eff.validate().unwrap_err().to_string();
        assert!(msg.contains("missing-out"));
        assert!(msg.contains("missing-results"));
        assert!(!msg.contains("templates\""));
    }

    #[test]
    fn test_require_names_key() {
        let dir = tempdir().unwrap();
        let eff = resolve_effective(&at(dir.path())).unwrap();
        let err = eff.require(&eff.catalog, "catalog").unwrap_err();
        assert!(err.to_string().contains("catalog is not configured"));
    }
}
