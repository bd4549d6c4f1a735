use crate::span::Span;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Anything that can be reported and compiled past is a
/// [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Type error: {msg}")]
    Type { msg: String, span: Span },

    #[error("Codegen error: {msg}")]
    Codegen { msg: String },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("Input error: {msg}")]
    Input { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn type_err(msg: impl Into<String>, span: Span) -> Self {
        Self::Type { msg: msg.into(), span }
    }

    pub fn codegen(msg: impl Into<String>) -> Self {
        Self::Codegen { msg: msg.into() }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn input(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Input { msg: msg.into(), path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Non-fatal problem categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Problem {
    TypeMismatch,
    InvalidCollectionType,
    Autoboxing,
    UnreachableCode,
    UninitializedLocal,
    FinalReassignment,
    NullReference,
    PotentialNullReference,
    UndefinedName,
    UnknownType,
    DuplicateLocal,
    InvalidJump,
}

impl Problem {
    pub fn code(&self) -> &'static str {
        match self {
            Problem::TypeMismatch => "type-mismatch",
            Problem::InvalidCollectionType => "invalid-collection",
            Problem::Autoboxing => "autoboxing",
            Problem::UnreachableCode => "unreachable",
            Problem::UninitializedLocal => "uninitialized",
            Problem::FinalReassignment => "final-reassignment",
            Problem::NullReference => "null-reference",
            Problem::PotentialNullReference => "potential-null",
            Problem::UndefinedName => "undefined-name",
            Problem::UnknownType => "unknown-type",
            Problem::DuplicateLocal => "duplicate-local",
            Problem::InvalidJump => "invalid-jump",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub problem: Problem,
    pub severity: Severity,
    pub msg: String,
    pub span: Span,
}

/// Reporter for non-fatal problems, owned by the method being compiled.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, problem: Problem, severity: Severity, msg: impl Into<String>, span: Span) {
        let msg = msg.into();
        tracing::debug!(problem = problem.code(), %severity, %msg, "diagnostic");
        self.items.push(Diagnostic { problem, severity, msg, span });
    }

    pub fn error(&mut self, problem: Problem, msg: impl Into<String>, span: Span) {
        self.report(problem, Severity::Error, msg, span);
    }

    pub fn warning(&mut self, problem: Problem, msg: impl Into<String>, span: Span) {
        self.report(problem, Severity::Warning, msg, span);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, problem: Problem) -> usize {
        self.items.iter().filter(|d| d.problem == problem).count()
    }

    pub fn of(&self, problem: Problem) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.problem == problem)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Render a diagnostic. With source text available the report is drawn by
/// ariadne; otherwise a single `severity[code]: message` line is produced.
pub fn render_diagnostic(source: Option<&str>, filename: &str, diag: &Diagnostic) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let Some(source) = source.filter(|s| diag.span.end <= s.len()) else {
        return format!(
            "{}[{}]: {} ({}:{}..{})\n",
            diag.severity,
            diag.problem.code(),
            diag.msg,
            filename,
            diag.span.start,
            diag.span.end
        );
    };
    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    };
    let mut out = Vec::new();
    let written = Report::build(kind, (), diag.span.start)
        .with_config(Config::default().with_color(false))
        .with_code(diag.problem.code())
        .with_message(&diag.msg)
        .with_label(Label::new(diag.span.start..diag.span.end).with_message(&diag.msg))
        .finish()
        .write(Source::from(source), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("{}: {}\n", diag.severity, diag.msg),
    }
}

/// Render a fatal error with ariadne for nice terminal output.
pub fn render_error(source: Option<&str>, filename: &str, err: &CompileError) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    match err {
        CompileError::Type { msg, span } => {
            if let Some(source) = source.filter(|s| span.end <= s.len()) {
                let mut out = Vec::new();
                let written = Report::build(ReportKind::Error, (), span.start)
                    .with_config(Config::default().with_color(false))
                    .with_message("type error")
                    .with_label(Label::new(span.start..span.end).with_message(msg))
                    .finish()
                    .write(Source::from(source), &mut out);
                if written.is_ok() {
                    return String::from_utf8_lossy(&out).into_owned();
                }
            }
            format!("error[type]: {msg} ({filename}:{}..{})\n", span.start, span.end)
        }
        CompileError::Codegen { msg } => format!("error[codegen]: {msg}\n"),
        CompileError::Config { msg, path } => {
            format!("error[config]: {msg}\n  --> {}\n", path.display())
        }
        CompileError::Input { msg, path } => {
            format!("error[input]: {msg}\n  --> {}\n", path.display())
        }
    }
}
