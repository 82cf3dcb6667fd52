//! Diagnostics channel shared by every pipeline stage.
//!
//! Recoverable problems (malformed source, unresolved references, unsupported
//! constructs) are reported as [`Diagnostic`] entries through a
//! [`DiagnosticSink`]; the pipeline keeps scanning so one run surfaces as many
//! of them as possible. Model shapes the generator cannot emit are fatal and
//! travel as [`CompileError`] instead.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_UNTERMINATED_EXPRESSION: &str = "Z-ERR-SOURCE-001";
pub const ERR_EMPTY_EXPRESSION: &str = "Z-ERR-SOURCE-002";
pub const ERR_SCRIPT_BLOCK: &str = "Z-ERR-SOURCE-003";
pub const ERR_BLOCK_STRUCTURE: &str = "Z-ERR-SOURCE-004";
pub const ERR_SCRIPT_SYNTAX: &str = "Z-ERR-SOURCE-005";
pub const ERR_SEMANTIC: &str = "Z-ERR-SOURCE-006";
pub const ERR_UNRESOLVED_IDENTIFIER: &str = "Z-ERR-SCOPE-001";
pub const ERR_UNRESOLVED_COMPONENT: &str = "Z-ERR-SCOPE-002";
pub const ERR_UNSUPPORTED_BLOCK: &str = "Z-ERR-UNSUPPORTED-001";
pub const ERR_UNSUPPORTED_DIRECTIVE: &str = "Z-ERR-UNSUPPORTED-002";
pub const ERR_UNSUPPORTED_MODIFIER: &str = "Z-ERR-UNSUPPORTED-003";
pub const ERR_UNSUPPORTED_DECLARATION: &str = "Z-ERR-UNSUPPORTED-004";
pub const ERR_UNSUPPORTED_SLOT: &str = "Z-ERR-UNSUPPORTED-005";
pub const ERR_INSTANCE_ESCAPE: &str = "Z-ERR-UNSUPPORTED-006";
pub const ERR_CONSTANT_ASSIGNMENT: &str = "Z-ERR-UNSUPPORTED-007";
pub const ERR_INTERNAL: &str = "Z-ERR-INTERNAL-001";
pub const ERR_OPTIONS: &str = "Z-ERR-OPTIONS-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_UNTERMINATED_EXPRESSION | ERR_EMPTY_EXPRESSION => {
            "Every `{` in markup opens exactly one non-empty expression."
        }
        ERR_SCRIPT_BLOCK => "A component has at most one instance script, and it is closed.",
        ERR_BLOCK_STRUCTURE => {
            "Control blocks open and close within the same parent element, in order."
        }
        ERR_SCRIPT_SYNTAX | ERR_SEMANTIC => "The program unit is valid TypeScript.",
        ERR_UNRESOLVED_IDENTIFIER => {
            "Every identifier in markup resolves to a declaration, an import, or a known global."
        }
        ERR_UNRESOLVED_COMPONENT => "Component tags refer to an imported component.",
        ERR_UNSUPPORTED_BLOCK => "Only {#if}/{:else if}/{:else}/{/if} control blocks exist.",
        ERR_UNSUPPORTED_DIRECTIVE => "Only `on:` directives are recognized on elements.",
        ERR_UNSUPPORTED_MODIFIER => "Event modifiers form a closed, consistent set.",
        ERR_UNSUPPORTED_DECLARATION => {
            "Top-level declarations bind plain identifiers the compiler can track."
        }
        ERR_UNSUPPORTED_SLOT => "Slot names are unique per component instantiation.",
        ERR_INSTANCE_ESCAPE => "Component state is only reached through the instance receiver.",
        ERR_CONSTANT_ASSIGNMENT => "Constant bindings and functions are never reassigned.",
        ERR_INTERNAL => "The generator only receives models it can emit.",
        ERR_OPTIONS => "Compile options are well-formed JSON of the documented shape.",
        _ => "Unknown guarantee.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPANS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte range into the original component source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
}

impl SourceSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn at(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }
}

/// Maps byte offsets to 1-based line/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    MalformedSource,
    UnresolvedReference,
    UnsupportedConstruct,
    InternalInvariant,
}

impl DiagnosticKind {
    /// Whether the kind aborts the file outright instead of being batched.
    pub fn is_fatal(self) -> bool {
        matches!(self, DiagnosticKind::InternalInvariant)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub kind: DiagnosticKind,
    pub message: String,
    pub guarantee: String,
    pub span: Option<SourceSpan>,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, code: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.to_string(),
            kind,
            message: message.into(),
            guarantee: get_guarantee(code).to_string(),
            span: None,
            line: 0,
            column: 0,
            hints: vec![],
        }
    }

    pub fn malformed(code: &str, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticKind::MalformedSource, code, message).with_span(span)
    }

    pub fn unresolved(code: &str, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticKind::UnresolvedReference, code, message).with_span(span)
    }

    pub fn unsupported(code: &str, message: impl Into<String>, span: SourceSpan) -> Self {
        Self::new(DiagnosticKind::UnsupportedConstruct, code, message).with_span(span)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

/// Receiver for structured diagnostics. Implementations never format for a
/// terminal; that is left to whoever consumes the entries.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Ordered, append-only diagnostic list for one file.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Resolves every span to line/column against `source` and hands the
    /// entries over in report order.
    pub fn finish(self, source: &str) -> Vec<Diagnostic> {
        let index = LineIndex::new(source);
        self.entries
            .into_iter()
            .map(|mut d| {
                if let Some(span) = d.span {
                    let (line, column) = index.line_column(span.start);
                    d.line = line;
                    d.column = column;
                }
                d
            })
            .collect()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(code = %diagnostic.code, message = %diagnostic.message, "diagnostic");
        self.entries.push(diagnostic);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The generator reached a model shape it cannot emit.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("invalid compile options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompileError::Internal(message) => {
                Diagnostic::new(DiagnosticKind::InternalInvariant, ERR_INTERNAL, message.clone())
            }
            CompileError::InvalidOptions(e) => {
                Diagnostic::new(DiagnosticKind::MalformedSource, ERR_OPTIONS, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_column(0), (1, 1));
        assert_eq!(index.line_column(1), (1, 2));
        assert_eq!(index.line_column(3), (2, 1));
        assert_eq!(index.line_column(7), (4, 1));
    }

    #[test]
    fn test_diagnostics_keep_report_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(Diagnostic::unresolved(
            ERR_UNRESOLVED_IDENTIFIER,
            "first",
            SourceSpan::new(4, 5),
        ));
        diagnostics.report(Diagnostic::malformed(
            ERR_EMPTY_EXPRESSION,
            "second",
            SourceSpan::new(0, 1),
        ));
        let entries = diagnostics.finish("abc\ndef");
        assert_eq!(entries[0].message, "first");
        assert_eq!((entries[0].line, entries[0].column), (2, 1));
        assert_eq!(entries[1].message, "second");
        assert_eq!(entries[1].guarantee, get_guarantee(ERR_EMPTY_EXPRESSION));
    }

    #[test]
    fn test_only_internal_kind_is_fatal() {
        assert!(DiagnosticKind::InternalInvariant.is_fatal());
        assert!(!DiagnosticKind::MalformedSource.is_fatal());
        assert!(!DiagnosticKind::UnresolvedReference.is_fatal());
        assert!(!DiagnosticKind::UnsupportedConstruct.is_fatal());
    }
}
