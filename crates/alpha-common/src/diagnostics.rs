//! Diagnostics and the accumulated compile result.
//!
//! Errors carry a short code (`P###` parse/resolution, `C###` semantic,
//! `X###` internal), a message, and the source location of the offending
//! element. Diagnostics accumulate into a [`CompileResult`]; individual
//! compiler operations report success as `bool` and attach details here.

use crate::id::Id;
use crate::source::SourceLocation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub location: SourceLocation,
    /// Path of the source file the failing module was loaded from, when known.
    pub file: String,
    /// Id of the failing module element, when known.
    pub module_id: Option<Id>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>, location: SourceLocation) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            location,
            file: String::new(),
            module_id: None,
        }
    }

    pub fn warning(
        code: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            location,
            file: String::new(),
            module_id: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn in_module(mut self, module_id: Id) -> Self {
        self.module_id = Some(module_id);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.is_empty() {
            write!(f, "[{}] {} ({})", self.code, self.message, self.location)
        } else {
            write!(
                f,
                "[{}] {} ({}:{})",
                self.code, self.message, self.file, self.location
            )
        }
    }
}

/// The session's accumulated outcome.
///
/// Phases short-circuit on structural failures but accumulate
/// non-structural ones (e.g. type mismatches) before returning, so a
/// single run can report more than one error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompileResult {
    diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) {
        self.push(Diagnostic::error(code, message, location));
    }

    pub fn warning(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) {
        self.push(Diagnostic::warning(code, message, location));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True iff at least one error-severity diagnostic has been recorded.
    pub fn is_failed(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_not_failed() {
        let result = CompileResult::new();
        assert!(!result.is_failed());
    }

    #[test]
    fn warnings_do_not_fail_the_result() {
        let mut result = CompileResult::new();
        result.warning("C100", "unused identifier: x", SourceLocation::default());
        assert!(!result.is_failed());
        result.error("C051", "type mismatch", SourceLocation::default());
        assert!(result.is_failed());
        assert!(result.has_code("C051"));
    }

    #[test]
    fn diagnostics_serialize_to_json() {
        let diagnostic = Diagnostic::error("P004", "unable to resolve identifier: y", SourceLocation::default())
            .in_file("main.alpha");
        let json = serde_json::to_string(&diagnostic).unwrap();
        assert!(json.contains("\"P004\""));
        assert!(json.contains("main.alpha"));
    }
}
