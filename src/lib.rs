//! # Zenith Reactive Compiler
//!
//! Compiles a `.zen` single-file component (script, markup, styles) into a
//! TypeScript module whose class updates the DOM through dirty bitmasks.
//!
//! ## Pipeline
//!
//! 1. **Prepare** (`parse`): split out `<script>` and `<style>`, normalize the
//!    markup with placeholders for every `{…}` and parse it into
//!    [`MarkupNode`]s.
//! 2. **Validate** (`validate`): reject directives, modifiers and slot forms
//!    that have no meaning.
//! 3. **Analyze** (`unit`): build one TypeScript program from the script plus
//!    every markup expression and run oxc over it.
//! 4. **Resolve** (`resolver`): classify variables, build update flows and
//!    sub-fragments, and hand out one bit per variable that something reads.
//! 5. **Generate** (`codegen`): emit the component class and a class per
//!    sub-fragment.
//!
//! Steps 1 to 4 collect diagnostics and keep going; generation only runs for
//! a file without any.

#[cfg(feature = "napi")]
use napi_derive::napi;

use serde::Serialize;
use std::collections::BTreeMap;

pub mod batch;
pub mod codegen;
pub mod diagnostics;
pub mod mask;
pub mod model;
pub mod naming;
pub mod options;
pub mod parse;
pub mod resolver;
pub mod rewrite;
pub mod scope;
pub mod unit;
pub mod validate;
pub mod visitor;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod safety_tests;

pub use diagnostics::{CompileError, Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics};
pub use mask::DirtyMask;
pub use model::ResolvedComponent;
pub use options::CompileOptions;
pub use validate::MarkupNode;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    /// The generated module; absent when any diagnostic was reported.
    pub code: Option<String>,
    pub component_name: String,
    pub styles: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Variable name → dirty bit.
    pub bits: BTreeMap<String, u32>,
    pub props: Vec<String>,
}

/// Run the model stages and return the model together with the diagnostics,
/// whether or not the model could be built.
pub fn resolve_source(
    source: &str,
    options: &CompileOptions,
) -> (Option<ResolvedComponent>, parse::PreparedSource, Diagnostics) {
    let mut diagnostics = Diagnostics::new();

    let prepared = parse::prepare(source, &mut diagnostics);
    tracing::debug!(
        nodes = prepared.markup.len(),
        expressions = prepared.expressions.len(),
        script = prepared.script.is_some(),
        "source prepared"
    );

    validate::validate_markup(&prepared.markup, &mut diagnostics);

    let component = unit::analyze(source, &prepared, &mut diagnostics).and_then(|analysis| {
        tracing::debug!(
            items = analysis.items.len(),
            imports = analysis.imports.len(),
            "script analyzed"
        );
        resolver::resolve_component(&prepared, &analysis, options, &mut diagnostics)
    });

    (component, prepared, diagnostics)
}

/// Compile one component.
///
/// Problems in the source come back as diagnostics on an `Ok` result with no
/// code; `Err` is reserved for internal failures and bad options.
#[tracing::instrument(skip_all, fields(file = %options.file_path))]
pub fn compile_component(
    source: &str,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    let (component, prepared, diagnostics) = resolve_source(source, options);

    let mut result = CompileResult {
        code: None,
        component_name: options.resolved_component_name(),
        styles: prepared.styles,
        diagnostics: vec![],
        bits: BTreeMap::new(),
        props: vec![],
    };

    if let Some(component) = component {
        result.bits = component.bits();
        result.props = component
            .props
            .iter()
            .filter_map(|p| component.variables.get(*p).map(|v| v.name.clone()))
            .collect();
        if !diagnostics.has_errors() {
            result.code = Some(codegen::generate_module(source, &component, options)?);
        }
    }

    if diagnostics.has_errors() {
        tracing::debug!(count = diagnostics.len(), "compile rejected");
    }
    result.diagnostics = diagnostics.finish(source);
    Ok(result)
}

/// Compile with options given as JSON, folding every failure into the
/// result's diagnostics.
pub fn compile_component_json(source: &str, options_json: &str) -> CompileResult {
    let options = match CompileOptions::from_json(options_json) {
        Ok(options) => options,
        Err(e) => return failed(CompileOptions::default().resolved_component_name(), &e),
    };
    match compile_component(source, &options) {
        Ok(result) => result,
        Err(e) => failed(options.resolved_component_name(), &e),
    }
}

fn failed(component_name: String, error: &CompileError) -> CompileResult {
    CompileResult {
        code: None,
        component_name,
        styles: vec![],
        diagnostics: vec![error.to_diagnostic()],
        bits: BTreeMap::new(),
        props: vec![],
    }
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_component_native(source: String, options_json: String) -> String {
    let result = compile_component_json(&source, &options_json);
    serde_json::to_string(&result).unwrap_or_else(|e| {
        format!(
            "{{\"code\":null,\"componentName\":\"\",\"styles\":[],\"diagnostics\":[{{\"code\":\"Z-ERR-INTERNAL-001\",\"message\":\"{}\"}}],\"bits\":{{}},\"props\":[]}}",
            e.to_string().replace('"', "'")
        )
    })
}
