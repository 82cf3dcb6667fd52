//! Expression rewriting.
//!
//! Script and markup code is copied verbatim from the source with a list of
//! span patches applied: references to component state become field
//! accesses on the receiver, and writes to tracked state are wrapped so they
//! invalidate their bits.

use std::cmp::Reverse;

use crate::diagnostics::{CompileError, SourceSpan};
use crate::model::{Code, ParentScope, ResolvedComponent};
use crate::naming::Names;

/// Object that owns the component fields at the point the code runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Component,
    Fragment,
}

impl Receiver {
    pub fn of(scope: ParentScope) -> Self {
        match scope {
            ParentScope::Component => Receiver::Component,
            ParentScope::Fragment(_) => Receiver::Fragment,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Receiver::Component => "this",
            Receiver::Fragment => "this.parent",
        }
    }
}

/// When the copied code runs. Writes made while the constructor runs happen
/// before anything reads the state, so they are not wrapped; writes deferred
/// into closures still are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Construction,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPatch {
    Replace { start: u32, end: u32, text: String },
    /// Prefix of a wrap around `start..end`.
    Open { start: u32, end: u32, text: String },
    /// Suffix of a wrap around `start..end`.
    Close { start: u32, end: u32, text: String },
    Insert { at: u32, text: String },
}

impl TextPatch {
    fn position(&self) -> u32 {
        match self {
            TextPatch::Replace { start, .. } | TextPatch::Open { start, .. } => *start,
            TextPatch::Close { end, .. } => *end,
            TextPatch::Insert { at, .. } => *at,
        }
    }

    /// Closes before inserts before opens before replacements. Among closes
    /// at one offset the inner wrap closes first; among opens the outer wrap
    /// opens first.
    fn sort_key(&self) -> (u32, u8, Reverse<u32>) {
        match self {
            TextPatch::Close { start, end, .. } => (*end, 0, Reverse(*start)),
            TextPatch::Insert { at, .. } => (*at, 1, Reverse(0)),
            TextPatch::Open { start, end, .. } => (*start, 2, Reverse(*end)),
            TextPatch::Replace { start, end, .. } => (*start, 3, Reverse(*end)),
        }
    }

    fn text(&self) -> &str {
        match self {
            TextPatch::Replace { text, .. }
            | TextPatch::Open { text, .. }
            | TextPatch::Close { text, .. }
            | TextPatch::Insert { text, .. } => text,
        }
    }
}

/// Copy `span` out of `source` with `patches` applied left to right.
/// Overlapping replacements are an internal error.
pub fn apply_patches(
    source: &str,
    span: SourceSpan,
    mut patches: Vec<TextPatch>,
) -> Result<String, CompileError> {
    patches.sort_by_key(TextPatch::sort_key);

    let slice = |from: u32, to: u32| {
        source.get(from as usize..to as usize).ok_or_else(|| {
            CompileError::internal(format!("patch range {}..{} is not valid source", from, to))
        })
    };

    let mut out = String::with_capacity(span.slice(source).len() + patches.len() * 16);
    let mut cursor = span.start;
    for patch in &patches {
        let at = patch.position();
        if at < cursor || at > span.end {
            return Err(CompileError::internal(format!(
                "overlapping patch at offset {} (copied up to {})",
                at, cursor
            )));
        }
        out.push_str(slice(cursor, at)?);
        out.push_str(patch.text());
        cursor = match patch {
            TextPatch::Replace { end, .. } => *end,
            _ => at,
        };
    }
    out.push_str(slice(cursor, span.end)?);
    Ok(out)
}

pub struct Rewriter<'a> {
    source: &'a str,
    component: &'a ResolvedComponent,
    names: &'a Names,
}

impl<'a> Rewriter<'a> {
    pub fn new(source: &'a str, component: &'a ResolvedComponent, names: &'a Names) -> Self {
        Self {
            source,
            component,
            names,
        }
    }

    pub fn rewrite(
        &self,
        code: &Code,
        receiver: Receiver,
        timing: Timing,
    ) -> Result<String, CompileError> {
        let recv = receiver.as_str();
        let mut patches = Vec::with_capacity(code.refs.len() + code.mutations.len() * 2);

        for r in &code.refs {
            let field = format!("{}.{}", recv, self.names.variable(r.var)?);
            let text = if r.shorthand {
                format!("{}: {}", self.component.variable(r.var)?.name, field)
            } else {
                field
            };
            patches.push(TextPatch::Replace {
                start: r.span.start,
                end: r.span.end,
                text,
            });
        }

        for mutation in &code.mutations {
            if timing == Timing::Construction && !mutation.deferred {
                continue;
            }
            let mask = self.component.mask_of(&mutation.targets);
            if mask.is_empty() {
                continue;
            }
            patches.push(TextPatch::Open {
                start: mutation.span.start,
                end: mutation.span.end,
                text: "(() => { const __v = (".to_string(),
            });
            patches.push(TextPatch::Close {
                start: mutation.span.start,
                end: mutation.span.end,
                text: format!(
                    "); {}.invalidate({}); return __v; }})()",
                    recv,
                    mask.to_literal(self.component.wide())
                ),
            });
        }

        for (at, text) in &code.inserts {
            patches.push(TextPatch::Insert {
                at: *at,
                text: text.clone(),
            });
        }

        let out = apply_patches(self.source, code.span, patches)?;
        tracing::trace!(span = ?code.span, out = %out, "code rewritten");
        Ok(out)
    }
}
