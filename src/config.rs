use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::{CompileError, Severity};

pub const CONFIG_FILE_NAME: &str = "javelin.toml";

/// Source compliance level. Only the ordering matters to the compiler: an
/// empty block body is flow-analyzed only above 1.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
pub enum ComplianceLevel {
    #[serde(rename = "1.3")]
    Jdk1_3,
    #[serde(rename = "1.4")]
    Jdk1_4,
    #[default]
    #[serde(rename = "1.5")]
    Jdk1_5,
    #[serde(rename = "1.6")]
    Jdk1_6,
    #[serde(rename = "1.7")]
    Jdk1_7,
    #[serde(rename = "1.8")]
    Jdk1_8,
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplianceLevel::Jdk1_3 => "1.3",
            ComplianceLevel::Jdk1_4 => "1.4",
            ComplianceLevel::Jdk1_5 => "1.5",
            ComplianceLevel::Jdk1_6 => "1.6",
            ComplianceLevel::Jdk1_7 => "1.7",
            ComplianceLevel::Jdk1_8 => "1.8",
        };
        f.write_str(s)
    }
}

/// How loudly an optional diagnostic is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    #[default]
    Info,
    Warning,
}

impl ReportLevel {
    pub fn severity(self) -> Severity {
        match self {
            ReportLevel::Info => Severity::Info,
            ReportLevel::Warning => Severity::Warning,
        }
    }
}

/// Options that change what the compiler reports or emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub compliance: ComplianceLevel,
    /// Give every user local a slot even when it is never read.
    pub preserve_unused_locals: bool,
    pub autoboxing: ReportLevel,
    pub null_analysis: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            compliance: ComplianceLevel::default(),
            preserve_unused_locals: false,
            autoboxing: ReportLevel::default(),
            null_analysis: true,
        }
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    compiler: TomlCompiler,
    #[serde(default)]
    diagnostics: TomlDiagnostics,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TomlCompiler {
    compliance: Option<ComplianceLevel>,
    preserve_unused_locals: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TomlDiagnostics {
    autoboxing: Option<ReportLevel>,
    null_analysis: Option<bool>,
}

impl CompilerOptions {
    /// Parse options from TOML text. `path` is only used for error messages.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, CompileError> {
        let raw: TomlConfig = toml::from_str(text)
            .map_err(|e| CompileError::config(e.message().to_string(), path.to_path_buf()))?;
        let defaults = Self::default();
        Ok(Self {
            compliance: raw.compiler.compliance.unwrap_or(defaults.compliance),
            preserve_unused_locals: raw
                .compiler
                .preserve_unused_locals
                .unwrap_or(defaults.preserve_unused_locals),
            autoboxing: raw.diagnostics.autoboxing.unwrap_or(defaults.autoboxing),
            null_analysis: raw.diagnostics.null_analysis.unwrap_or(defaults.null_analysis),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CompileError::config(format!("cannot read config: {e}"), path.to_path_buf()))?;
        Self::from_toml_str(&text, path)
    }

    /// Look for `javelin.toml` next to `input`. Defaults when absent.
    pub fn discover(input: &Path) -> Result<Self, CompileError> {
        match config_path_for(input) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading compiler options");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn config_path_for(input: &Path) -> Option<PathBuf> {
    let dir = input.parent()?;
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}
