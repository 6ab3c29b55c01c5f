//! Collaborator predicates consulted by the gates
//!
//! Banned-pattern screening is a pure text check. Quality checks run
//! configured commands and report concrete failure output so the next
//! implementation pass knows what to fix.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orca_core::{BannedPatternConfig, OrcaError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Max bytes kept from each of stdout and stderr of a failed check
const OUTPUT_LIMIT: usize = 4000;

/// Result of screening a plan or diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralizationReport {
    pub violations: Vec<String>,
}

impl GeneralizationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Banned-pattern predicate; any violation forces a rejection
pub trait GeneralizationCheck: Send + Sync {
    fn check_generalization(&self, diff_or_plan: &str) -> GeneralizationReport;
}

/// Banned patterns compiled from configuration
pub struct RegexBannedPatterns {
    patterns: Vec<(String, Regex)>,
}

impl RegexBannedPatterns {
    pub fn from_config(patterns: &[BannedPatternConfig]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|re| (p.name.clone(), re))
                    .map_err(|e| {
                        OrcaError::Config(format!("invalid banned pattern {}: {}", p.name, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl GeneralizationCheck for RegexBannedPatterns {
    fn check_generalization(&self, diff_or_plan: &str) -> GeneralizationReport {
        let mut violations = Vec::new();
        for (idx, line) in diff_or_plan.lines().enumerate() {
            for (name, re) in &self.patterns {
                if re.is_match(line) {
                    violations.push(format!("{} at line {}: {}", name, idx + 1, line.trim()));
                }
            }
        }
        GeneralizationReport { violations }
    }
}

/// Result of the static checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub passed: bool,
    pub errors: Vec<String>,
}

impl QualityReport {
    pub fn passing() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
        }
    }

    pub fn failing(errors: Vec<String>) -> Self {
        Self {
            passed: false,
            errors,
        }
    }
}

/// Static-check predicate run after implementation and before Gate 2
#[async_trait]
pub trait QualityChecks: Send + Sync {
    async fn run_quality_checks(&self) -> QualityReport;
}

/// Runs configured commands in a working directory
pub struct CommandQualityChecks {
    workdir: PathBuf,
    commands: Vec<String>,
}

impl CommandQualityChecks {
    pub fn new(workdir: impl Into<PathBuf>, commands: Vec<String>) -> Self {
        Self {
            workdir: workdir.into(),
            commands,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &s[..end])
}

/// Run one command, returning an error description on failure
async fn run_command(workdir: &Path, command: &str) -> Option<String> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    let args: Vec<&str> = parts.collect();

    tracing::debug!(command, "running quality check");
    let output = tokio::process::Command::new(program)
        .args(&args)
        .current_dir(workdir)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => None,
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Some(format!(
                "{} failed:\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
                command,
                truncate(stdout.trim(), OUTPUT_LIMIT),
                truncate(stderr.trim(), OUTPUT_LIMIT)
            ))
        }
        Err(e) => Some(format!("Failed to run {}: {}", program, e)),
    }
}

#[async_trait]
impl QualityChecks for CommandQualityChecks {
    async fn run_quality_checks(&self) -> QualityReport {
        tracing::info!(workdir = %self.workdir.display(), "running quality checks");

        let mut errors = Vec::new();
        for command in &self.commands {
            if let Some(error) = run_command(&self.workdir, command).await {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            QualityReport::passing()
        } else {
            QualityReport::failing(errors)
        }
    }
}

/// Replays queued reports, then passes
pub struct ScriptedQualityChecks {
    reports: Mutex<VecDeque<QualityReport>>,
}

impl ScriptedQualityChecks {
    pub fn new(reports: impl IntoIterator<Item = QualityReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into_iter().collect()),
        }
    }

    pub fn always_pass() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl QualityChecks for ScriptedQualityChecks {
    async fn run_quality_checks(&self) -> QualityReport {
        self.reports
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(QualityReport::passing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banned_patterns_flag_lines() {
        let checks = RegexBannedPatterns::from_config(&[
            BannedPatternConfig::new("ts-ignore", "@ts-ignore"),
            BannedPatternConfig::new("focused-test", r"\.only\("),
        ])
        .unwrap();

        let diff = "+ const x = 1;\n+ // @ts-ignore\n+ it.only('works', () => {})\n";
        let report = checks.check_generalization(diff);
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations[0].starts_with("ts-ignore at line 2"));
        assert!(checks.check_generalization("+ const y = 2;").is_clean());
    }

    #[test]
    fn test_default_patterns_compile() {
        let config = orca_core::OrcaConfig::default();
        let checks = RegexBannedPatterns::from_config(&config.banned_patterns).unwrap();
        assert_eq!(checks.len(), config.banned_patterns.len());
        assert!(!checks
            .check_generalization("let v = data as any;")
            .is_clean());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = RegexBannedPatterns::from_config(&[BannedPatternConfig::new("bad", "(")]);
        assert!(matches!(result, Err(OrcaError::Config(_))));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        let cut = truncate("ééééé", 3);
        assert!(cut.ends_with("...[truncated]"));
    }

    #[tokio::test]
    async fn test_scripted_checks_then_pass() {
        let checks = ScriptedQualityChecks::new(vec![QualityReport::failing(vec![
            "clippy: unused variable".to_string(),
        ])]);
        assert!(!checks.run_quality_checks().await.passed);
        assert!(checks.run_quality_checks().await.passed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_checks_collect_failures() {
        let dir = std::env::temp_dir();
        let checks = CommandQualityChecks::new(
            dir,
            vec!["true".to_string(), "false".to_string()],
        );
        let report = checks.run_quality_checks().await;
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("false failed"));
    }
}
