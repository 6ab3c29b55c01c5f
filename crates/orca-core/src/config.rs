//! Configuration management for Orca
//!
//! Repository-level settings live in `.orca/config.toml`: workflow bounds,
//! the Gate 1 skip policy, the shell-command policy handed to workers, the
//! static checks run before Gate 2, and the banned patterns that reject
//! plans and implementations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{OrcaError, Result, Tier};

/// Repository-level Orca configuration
///
/// Loaded from `.orca/config.toml` in the repo root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrcaConfig {
    /// Workflow bounds and policies
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Shell commands workers may report running
    #[serde(default)]
    pub shell: ShellConfig,

    /// Static checks run after implementation
    #[serde(default)]
    pub quality: QualityConfig,

    /// Patterns that reject a plan or implementation outright
    #[serde(default = "default_banned_patterns")]
    pub banned_patterns: Vec<BannedPatternConfig>,
}

/// When Gate 1 may be bypassed for `Simple` tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate1SkipPolicy {
    /// Gate 1 always runs
    Never,
    /// Skip only when the caller marked a `Simple` request trivial
    #[default]
    CallerMandated,
    /// Skip every `Simple` request
    Discretionary,
}

impl Gate1SkipPolicy {
    /// Whether Gate 1 is bypassed; never above `Simple`
    pub fn permits_skip(&self, tier: Tier, trivial: bool) -> bool {
        if tier != Tier::Simple {
            return false;
        }
        match self {
            Self::Never => false,
            Self::CallerMandated => trivial,
            Self::Discretionary => true,
        }
    }
}

impl std::fmt::Display for Gate1SkipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::CallerMandated => write!(f, "caller_mandated"),
            Self::Discretionary => write!(f, "discretionary"),
        }
    }
}

impl std::str::FromStr for Gate1SkipPolicy {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "caller_mandated" => Ok(Self::CallerMandated),
            "discretionary" => Ok(Self::Discretionary),
            _ => Err(OrcaError::Config(format!("unknown gate1_skip policy: {}", s))),
        }
    }
}

/// Workflow bounds handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Implementation passes allowed before escalation
    #[serde(default = "default_max_review_iterations")]
    pub max_review_iterations: u32,

    /// Rejections per gate before escalation
    #[serde(default = "default_max_gate_attempts")]
    pub max_gate_attempts: u32,

    /// Retries after the first attempt on transport failure
    #[serde(default = "default_max_transport_retries")]
    pub max_transport_retries: u32,

    /// Per-invocation ceiling
    #[serde(default = "default_invocation_timeout_secs")]
    pub invocation_timeout_secs: u64,

    #[serde(default)]
    pub gate1_skip: Gate1SkipPolicy,
}

impl WorkflowConfig {
    pub fn with_max_review_iterations(mut self, n: u32) -> Self {
        self.max_review_iterations = n;
        self
    }

    pub fn with_max_gate_attempts(mut self, n: u32) -> Self {
        self.max_gate_attempts = n;
        self
    }

    pub fn with_max_transport_retries(mut self, n: u32) -> Self {
        self.max_transport_retries = n;
        self
    }

    pub fn with_invocation_timeout_secs(mut self, secs: u64) -> Self {
        self.invocation_timeout_secs = secs;
        self
    }

    pub fn with_gate1_skip(mut self, policy: Gate1SkipPolicy) -> Self {
        self.gate1_skip = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_review_iterations == 0 {
            return Err(OrcaError::Config(
                "max_review_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_gate_attempts == 0 {
            return Err(OrcaError::Config(
                "max_gate_attempts must be at least 1".to_string(),
            ));
        }
        if self.invocation_timeout_secs == 0 {
            return Err(OrcaError::Config(
                "invocation_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shell policy applied to commands a worker reports running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Base commands always allowed
    #[serde(default = "default_passthrough")]
    pub passthrough: Vec<String>,

    /// Base commands never allowed
    #[serde(default = "default_denied_commands")]
    pub denied_commands: Vec<String>,

    /// Substrings that deny a command anywhere in it
    #[serde(default = "default_forbidden_patterns")]
    pub forbidden_patterns: Vec<String>,
}

/// Static checks run between implementation and Gate 2
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_quality_commands")]
    pub commands: Vec<String>,
}

/// A named regex that must not appear in plans or diffs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedPatternConfig {
    pub name: String,
    pub pattern: String,
}

impl BannedPatternConfig {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

// Default value providers
fn default_max_review_iterations() -> u32 {
    3
}

fn default_max_gate_attempts() -> u32 {
    3
}

fn default_max_transport_retries() -> u32 {
    1
}

fn default_invocation_timeout_secs() -> u64 {
    600
}

fn default_passthrough() -> Vec<String> {
    vec!["git".to_string(), "gh".to_string()]
}

fn default_denied_commands() -> Vec<String> {
    vec![
        "cd".to_string(),
        "npm".to_string(),
        "node".to_string(),
        "cat".to_string(),
    ]
}

fn default_forbidden_patterns() -> Vec<String> {
    vec![
        "npm run dev".to_string(),
        "pnpm dev".to_string(),
        "yarn dev".to_string(),
        "bun dev".to_string(),
    ]
}

fn default_quality_commands() -> Vec<String> {
    vec![
        "cargo check".to_string(),
        "cargo clippy -- -D warnings".to_string(),
    ]
}

fn default_banned_patterns() -> Vec<BannedPatternConfig> {
    vec![
        BannedPatternConfig::new("ts-ignore", r"@ts-ignore"),
        BannedPatternConfig::new("eslint-disable", r"eslint-disable"),
        BannedPatternConfig::new("todo-marker", r"\b(TODO|FIXME)\b"),
        BannedPatternConfig::new("focused-test", r"\.only\("),
        BannedPatternConfig::new("skipped-test", r"\.skip\("),
        BannedPatternConfig::new("ignored-test", r"#\[ignore\]"),
        BannedPatternConfig::new("unimplemented", r"unimplemented!"),
        BannedPatternConfig::new("any-cast", r"\bas any\b"),
    ]
}

impl OrcaConfig {
    /// Load configuration from `.orca/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".orca/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| OrcaError::Config(format!("Failed to parse config file: {}", e)))?;
            config.workflow.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.orca/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<()> {
        let config_dir = repo_root.join(".orca");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| OrcaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        tracing::info!(path = %config_path.display(), "wrote default config");
        Ok(())
    }
}

impl Default for OrcaConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            shell: ShellConfig::default(),
            quality: QualityConfig::default(),
            banned_patterns: default_banned_patterns(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_review_iterations: default_max_review_iterations(),
            max_gate_attempts: default_max_gate_attempts(),
            max_transport_retries: default_max_transport_retries(),
            invocation_timeout_secs: default_invocation_timeout_secs(),
            gate1_skip: Gate1SkipPolicy::default(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            passthrough: default_passthrough(),
            denied_commands: default_denied_commands(),
            forbidden_patterns: default_forbidden_patterns(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            commands: default_quality_commands(),
        }
    }
}
