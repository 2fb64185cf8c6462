//! Cohort error types

use crate::{COH0100, ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The study definition cannot be used
    Error,
    /// Suspicious but usable
    Warning,
    /// Informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message with location and context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    /// Variable the diagnostic is about, if any
    pub variable: Option<String>,
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            variable: None,
            location: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the span (converts to location using provided source)
    pub fn with_span(mut self, span: Span, source: &str) -> Self {
        self.location = Some(SourceLocation::from_span(span, source));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with terminal colours
    #[cfg(feature = "colored")]
    pub fn render(&self) -> String {
        use colored::Colorize;

        let level = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };
        let mut out = format!("{level}[{}]: {}", self.code, self.message);
        if let Some(var) = &self.variable {
            out.push_str(&format!("\n  {} {}", "-->".blue(), var.cyan()));
        }
        if let Some(help) = self.help.as_deref().or(self.code.info().help) {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(var) = &self.variable {
            write!(f, " (in {var})")?;
        }
        if let Some(loc) = &self.location {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}

/// Main cohort error type
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// Anchor or population expression could not be parsed
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        expression: String,
        location: Option<SourceLocation>,
    },

    /// Precondition violated by a caller
    #[error("{code}: {message}")]
    InvalidArgument { code: ErrorCode, message: String },

    /// Study definition is inconsistent (references, codelists, expectations)
    #[error("{code}: {message}")]
    Definition {
        code: ErrorCode,
        message: String,
        variable: Option<String>,
        context: Option<String>,
    },

    /// Reference resolver failure
    #[error("{code}: {message}")]
    Resolution {
        code: ErrorCode,
        message: String,
        variable: Option<String>,
    },

    /// Configuration or I/O problem
    #[error("{code}: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// Multiple errors collected
    #[error("Multiple errors: {}", .0.len())]
    Multiple(Vec<CohortError>),
}

impl CohortError {
    pub fn parse(code: ErrorCode, message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            location: None,
        }
    }

    /// Create a parse error pointing at `span` inside `expression`
    pub fn parse_at(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
        span: Span,
    ) -> Self {
        let expression = expression.into();
        let location = SourceLocation::from_span(span, &expression);
        Self::Parse {
            code,
            message: message.into(),
            expression,
            location: Some(location),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            code: COH0100,
            message: message.into(),
        }
    }

    pub fn definition(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Definition {
            code,
            message: message.into(),
            variable: None,
            context: None,
        }
    }

    pub fn resolution(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Resolution {
            code,
            message: message.into(),
            variable: None,
        }
    }

    pub fn config(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attach the variable name the error concerns
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Self::Definition { variable, .. } | Self::Resolution { variable, .. } => {
                *variable = Some(name.into());
            }
            _ => {}
        }
        self
    }

    /// Attach free-form context
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        match &mut self {
            Self::Definition { context, .. } | Self::Config { context, .. } => {
                *context = Some(ctx.into());
            }
            _ => {}
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. }
            | Self::InvalidArgument { code, .. }
            | Self::Definition { code, .. }
            | Self::Resolution { code, .. }
            | Self::Config { code, .. } => *code,
            Self::Multiple(errors) => errors
                .first()
                .map(|e| e.code())
                .unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Get the location if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Flatten into one diagnostic per underlying error
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.to_diagnostics()).collect(),
            Self::Parse {
                code,
                message,
                expression,
                location,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(loc) = location {
                    diag = diag
                        .with_location(loc.clone())
                        .with_help(loc.caret(expression));
                }
                vec![diag]
            }
            Self::InvalidArgument { code, message } => vec![Diagnostic::error(*code, message.clone())],
            Self::Definition {
                code,
                message,
                variable,
                context,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(var) = variable {
                    diag = diag.with_variable(var.clone());
                }
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                }
                vec![diag]
            }
            Self::Resolution {
                code,
                message,
                variable,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(var) = variable {
                    diag = diag.with_variable(var.clone());
                }
                vec![diag]
            }
            Self::Config {
                code,
                message,
                context,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                }
                vec![diag]
            }
        }
    }
}
