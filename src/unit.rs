//! Preparation, part two: the program unit and its analysis.
//!
//! The unit is the component source with everything except the instance
//! script blanked, followed by an injected `__zen_template` function holding
//! every markup expression as `(expr);`. Script offsets are identical in the
//! unit and the original file; markup expressions are relocated and mapped
//! back through a relocation table.
//!
//! oxc parses the unit once. [`ScriptAnalysis`] is the owned summary the rest
//! of the pipeline works from, so no arena lifetime escapes this module.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, Expression, Function, ImportDeclarationSpecifier, Program,
    Statement, UnaryOperator, VariableDeclaration, VariableDeclarationKind,
};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, SourceType, Span};
use std::collections::HashMap;

use crate::diagnostics::{
    Diagnostic, DiagnosticSink, SourceSpan, ERR_SCRIPT_SYNTAX, ERR_SEMANTIC,
    ERR_UNSUPPORTED_DECLARATION,
};
use crate::parse::PreparedSource;
use crate::scope::{FreeReference, MutationSite, ReferenceCollector};

pub const TEMPLATE_FUNCTION: &str = "__zen_template";

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRAM UNIT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Relocation {
    unit_start: u32,
    original_start: u32,
    len: u32,
}

#[derive(Debug, Clone)]
pub struct ProgramUnit {
    pub text: String,
    template_start: u32,
    relocations: Vec<Relocation>,
}

impl ProgramUnit {
    pub fn build(source: &str, prepared: &PreparedSource) -> Self {
        let script = prepared.script.unwrap_or_default();
        let bytes: Vec<u8> = source
            .bytes()
            .enumerate()
            .map(|(i, b)| {
                let inside = (i as u32) >= script.start && (i as u32) < script.end;
                if inside || b == b'\n' {
                    b
                } else {
                    b' '
                }
            })
            .collect();
        let mut text = String::from_utf8_lossy(&bytes).into_owned();
        let template_start = text.len() as u32;

        text.push_str("\nfunction ");
        text.push_str(TEMPLATE_FUNCTION);
        text.push_str("() {\n");
        let mut relocations = Vec::with_capacity(prepared.expressions.len());
        for span in &prepared.expressions {
            text.push('(');
            relocations.push(Relocation {
                unit_start: text.len() as u32,
                original_start: span.start,
                len: span.end - span.start,
            });
            text.push_str(span.slice(source));
            text.push_str(");\n");
        }
        text.push_str("}\n");

        Self {
            text,
            template_start,
            relocations,
        }
    }

    /// Map a unit offset back to the original source. Offsets inside the
    /// injected glue clamp to the end of the preceding expression.
    pub fn to_original(&self, offset: u32) -> u32 {
        if offset < self.template_start {
            return offset;
        }
        let index = self
            .relocations
            .partition_point(|r| r.unit_start <= offset);
        match index.checked_sub(1).and_then(|i| self.relocations.get(i)) {
            Some(r) => r.original_start + (offset - r.unit_start).min(r.len),
            None => self.template_start,
        }
    }

    pub fn span_to_original(&self, span: SourceSpan) -> SourceSpan {
        SourceSpan::new(self.to_original(span.start), self.to_original(span.end))
    }

    fn expected_template_span(&self, index: usize) -> Option<Span> {
        self.relocations
            .get(index)
            .map(|r| Span::new(r.unit_start - 1, r.unit_start + r.len + 1))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYSIS
// ═══════════════════════════════════════════════════════════════════════════════

/// References and mutations of one analyzed code range, in original offsets.
#[derive(Debug, Clone, Default)]
pub struct CodeFacts {
    pub span: SourceSpan,
    pub refs: Vec<FreeReference>,
    pub mutations: Vec<MutationSite>,
    /// Text inserted at an original offset when the range is copied out.
    pub inserts: Vec<(u32, String)>,
}

impl CodeFacts {
    fn collect(unit: &ProgramUnit, span: SourceSpan, collector: ReferenceCollector) -> Self {
        let refs = collector
            .references
            .into_iter()
            .map(|mut r| {
                r.span = unit.span_to_original(r.span);
                r
            })
            .collect();
        let mutations = collector
            .mutations
            .into_iter()
            .map(|mut m| {
                m.span = unit.span_to_original(m.span);
                m
            })
            .collect();
        Self {
            span,
            refs,
            mutations,
            inserts: vec![],
        }
    }

    /// Free names the range reads when it is evaluated, excluding reads that
    /// only happen later inside nested functions when `eager_only` is set.
    pub fn reads(&self, eager_only: bool) -> impl Iterator<Item = &FreeReference> {
        self.refs
            .iter()
            .filter(move |r| r.reads() && !(eager_only && r.deferred))
    }

    /// Names assigned directly (`name = …`, `name++`), not through a member.
    pub fn plain_assignments(&self) -> impl Iterator<Item = &str> {
        self.mutations
            .iter()
            .flat_map(|m| m.targets.iter())
            .filter(|t| !t.member)
            .map(|t| t.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ImportInfo {
    pub span: SourceSpan,
    pub source: String,
    /// The module specifier literal, quotes excluded.
    pub source_span: SourceSpan,
    pub locals: Vec<String>,
    pub type_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Var,
    Const,
}

#[derive(Debug, Clone)]
pub struct VariableItem {
    pub name: String,
    pub statement: SourceSpan,
    pub kind: DeclKind,
    pub exported: bool,
    pub annotation: Option<String>,
    literal_type: Option<&'static str>,
    pub init: Option<CodeFacts>,
    pub init_is_function: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionItem {
    pub name: String,
    pub statement: SourceSpan,
    pub is_async: bool,
    /// Parameters through body; copying it with `inserts` applied yields the
    /// arrow form `(…) => { … }`.
    pub body: CodeFacts,
}

#[derive(Debug, Clone)]
pub enum ScriptItem {
    Variable(VariableItem),
    Function(FunctionItem),
    /// Body of a `$:` statement.
    Reactive(CodeFacts),
    /// Any other top-level statement; runs once at construction.
    Statement(CodeFacts),
}

/// Module-level declaration moved out of the component: types, interfaces,
/// enums, classes.
#[derive(Debug, Clone)]
pub struct HoistedItem {
    pub names: Vec<String>,
    pub facts: CodeFacts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSite {
    Variable(SourceSpan),
    Function(SourceSpan),
    Import(SourceSpan),
    Hoisted(SourceSpan),
}

/// What the model builder needs to know about names declared in the script.
pub trait SemanticAnalyzer {
    fn resolve(&self, name: &str) -> Option<DeclarationSite>;
    /// Declared annotation, else a type derived from a literal initializer,
    /// else `any`.
    fn type_display(&self, name: &str) -> String;
    fn is_property(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct ScriptAnalysis {
    pub imports: Vec<ImportInfo>,
    pub items: Vec<ScriptItem>,
    pub hoisted: Vec<HoistedItem>,
    /// Facts per markup expression, indexed by `ExprId`.
    pub template: Vec<CodeFacts>,
    declarations: HashMap<String, DeclarationSite>,
}

impl ScriptAnalysis {
    pub fn variables(&self) -> impl Iterator<Item = &VariableItem> {
        self.items.iter().filter_map(|item| match item {
            ScriptItem::Variable(v) => Some(v),
            _ => None,
        })
    }

    fn variable(&self, name: &str) -> Option<&VariableItem> {
        self.variables().find(|v| v.name == name)
    }
}

impl SemanticAnalyzer for ScriptAnalysis {
    fn resolve(&self, name: &str) -> Option<DeclarationSite> {
        self.declarations.get(name).copied()
    }

    fn type_display(&self, name: &str) -> String {
        match self.variable(name) {
            Some(v) => v
                .annotation
                .clone()
                .or_else(|| v.literal_type.map(str::to_string))
                .unwrap_or_else(|| "any".to_string()),
            None => "any".to_string(),
        }
    }

    fn is_property(&self, name: &str) -> bool {
        self.variable(name).is_some_and(|v| v.exported)
    }
}

/// Build the program unit, run oxc over it and summarize the result.
/// Returns `None` when the unit does not parse.
pub fn analyze(
    source: &str,
    prepared: &PreparedSource,
    sink: &mut dyn DiagnosticSink,
) -> Option<ScriptAnalysis> {
    let unit = ProgramUnit::build(source, prepared);
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &unit.text, SourceType::ts()).parse();

    if !ret.errors.is_empty() || ret.panicked {
        for error in &ret.errors {
            sink.report(Diagnostic::malformed(
                ERR_SCRIPT_SYNTAX,
                error.message.to_string(),
                error_span(
                    &unit,
                    error.labels.as_ref().and_then(|l| l.first()).map(|l| l.offset()),
                ),
            ));
        }
        return None;
    }

    let semantic = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&ret.program);
    for error in &semantic.errors {
        sink.report(Diagnostic::malformed(
            ERR_SEMANTIC,
            error.message.to_string(),
            error_span(
                &unit,
                error.labels.as_ref().and_then(|l| l.first()).map(|l| l.offset()),
            ),
        ));
    }

    let mut builder = AnalysisBuilder {
        unit: &unit,
        sink,
        analysis: ScriptAnalysis::default(),
    };
    builder.program(&ret.program, prepared.expressions.len())?;
    tracing::debug!(
        items = builder.analysis.items.len(),
        imports = builder.analysis.imports.len(),
        hoisted = builder.analysis.hoisted.len(),
        "script analyzed"
    );
    Some(builder.analysis)
}

fn error_span(unit: &ProgramUnit, offset: Option<usize>) -> SourceSpan {
    SourceSpan::at(unit.to_original(offset.unwrap_or(0) as u32))
}

struct AnalysisBuilder<'u, 'd> {
    unit: &'u ProgramUnit,
    sink: &'d mut dyn DiagnosticSink,
    analysis: ScriptAnalysis,
}

fn span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start, span.end)
}

impl AnalysisBuilder<'_, '_> {
    fn program(&mut self, program: &Program<'_>, expression_count: usize) -> Option<()> {
        let mut template = None;
        for stmt in &program.body {
            if let Statement::FunctionDeclaration(func) = stmt {
                if func.id.as_ref().is_some_and(|id| id.name == TEMPLATE_FUNCTION) {
                    template = Some(func);
                    continue;
                }
            }
            self.statement(stmt);
        }

        let body = template.and_then(|f| f.body.as_ref())?;
        if body.statements.len() != expression_count {
            self.report_expression_shape(SourceSpan::at(self.unit.template_start));
            return None;
        }
        for (index, stmt) in body.statements.iter().enumerate() {
            let expected = self.unit.expected_template_span(index);
            let facts = match stmt {
                Statement::ExpressionStatement(es) => match &es.expression {
                    Expression::ParenthesizedExpression(p) if Some(p.span) == expected => {
                        let original = self.unit.span_to_original(span(p.expression.span()));
                        Some(CodeFacts::collect(
                            self.unit,
                            original,
                            ReferenceCollector::for_expression(&p.expression),
                        ))
                    }
                    _ => None,
                },
                _ => None,
            };
            match facts {
                Some(facts) => {
                    for r in &facts.refs {
                        tracing::trace!(expression = index, name = %r.name, deferred = r.deferred, "reference");
                    }
                    self.analysis.template.push(facts);
                }
                None => {
                    let at = self.unit.span_to_original(span(stmt.span()));
                    self.report_expression_shape(at);
                    return None;
                }
            }
        }
        Some(())
    }

    fn report_expression_shape(&mut self, at: SourceSpan) {
        self.sink.report(Diagnostic::malformed(
            ERR_SCRIPT_SYNTAX,
            "Markup braces must contain exactly one expression.",
            at,
        ));
    }

    fn unsupported(&mut self, message: impl Into<String>, at: Span) {
        self.sink.report(Diagnostic::unsupported(
            ERR_UNSUPPORTED_DECLARATION,
            message,
            span(at),
        ));
    }

    fn declare(&mut self, name: &str, site: DeclarationSite) {
        self.analysis.declarations.insert(name.to_string(), site);
    }

    fn statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                let mut locals = Vec::new();
                for specifier in decl.specifiers.iter().flatten() {
                    let local = match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => &s.local,
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => &s.local,
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => &s.local,
                    };
                    locals.push(local.name.to_string());
                }
                let site = span(decl.span);
                for local in &locals {
                    self.declare(local, DeclarationSite::Import(site));
                }
                let literal = decl.source.span;
                self.analysis.imports.push(ImportInfo {
                    span: site,
                    source: decl.source.value.to_string(),
                    source_span: SourceSpan::new(literal.start + 1, literal.end.saturating_sub(1)),
                    locals,
                    type_only: decl.import_kind.is_type(),
                });
            }
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(Declaration::VariableDeclaration(var)) => {
                    self.variable_declaration(var, span(decl.span), true);
                }
                Some(
                    Declaration::TSTypeAliasDeclaration(_)
                    | Declaration::TSInterfaceDeclaration(_)
                    | Declaration::TSEnumDeclaration(_),
                ) => self.hoist_statement(stmt),
                _ => self.unsupported(
                    "Only `export let` and `export const` declare properties.",
                    decl.span,
                ),
            },
            Statement::ExportDefaultDeclaration(decl) => {
                self.unsupported("A component has no default export of its own.", decl.span)
            }
            Statement::ExportAllDeclaration(decl) => {
                self.unsupported("Re-exports are not supported in a component.", decl.span)
            }
            Statement::VariableDeclaration(var) => {
                self.variable_declaration(var, span(var.span), false)
            }
            Statement::FunctionDeclaration(func) => self.function(func),
            Statement::LabeledStatement(labeled) if labeled.label.name == "$" => {
                let collector = ReferenceCollector::for_statement(&labeled.body);
                let facts = CodeFacts::collect(self.unit, span(labeled.body.span()), collector);
                self.analysis.items.push(ScriptItem::Reactive(facts));
            }
            Statement::ClassDeclaration(_)
            | Statement::TSTypeAliasDeclaration(_)
            | Statement::TSInterfaceDeclaration(_)
            | Statement::TSEnumDeclaration(_)
            | Statement::TSModuleDeclaration(_) => self.hoist_statement(stmt),
            _ => {
                let collector = ReferenceCollector::for_statement(stmt);
                let facts = CodeFacts::collect(self.unit, span(stmt.span()), collector);
                self.analysis.items.push(ScriptItem::Statement(facts));
            }
        }
    }

    fn hoist_statement(&mut self, stmt: &Statement<'_>) {
        let names = hoisted_names(stmt);
        let site = span(stmt.span());
        for name in &names {
            self.declare(name, DeclarationSite::Hoisted(site));
        }
        let collector = ReferenceCollector::for_statement(stmt);
        let facts = CodeFacts::collect(self.unit, site, collector);
        self.analysis.hoisted.push(HoistedItem { names, facts });
    }

    fn variable_declaration(
        &mut self,
        var: &VariableDeclaration<'_>,
        statement: SourceSpan,
        exported: bool,
    ) {
        let kind = match var.kind {
            VariableDeclarationKind::Let => DeclKind::Let,
            VariableDeclarationKind::Var => DeclKind::Var,
            VariableDeclarationKind::Const => DeclKind::Const,
            _ => {
                self.unsupported("`using` declarations are not supported at the top level.", var.span);
                return;
            }
        };
        for declarator in &var.declarations {
            let BindingPattern::BindingIdentifier(id) = &declarator.id else {
                self.unsupported(
                    "Destructuring is not supported in top-level declarations.",
                    declarator.span,
                );
                continue;
            };
            let name = id.name.to_string();
            let head_end = declarator
                .init
                .as_ref()
                .map(|init| init.span().start)
                .unwrap_or(declarator.span.end);
            let head = span(Span::new(declarator.span.start, head_end)).slice(&self.unit.text);
            let init = declarator.init.as_ref().map(|init| {
                let collector = ReferenceCollector::for_expression(init);
                CodeFacts::collect(self.unit, span(init.span()), collector)
            });
            let init_is_function = matches!(
                declarator.init,
                Some(Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_))
            );
            self.declare(&name, DeclarationSite::Variable(statement));
            self.analysis.items.push(ScriptItem::Variable(VariableItem {
                annotation: annotation_of(head, &name),
                literal_type: declarator.init.as_ref().and_then(literal_type),
                name,
                statement,
                kind,
                exported,
                init,
                init_is_function,
            }));
        }
    }

    fn function(&mut self, func: &Function<'_>) {
        let Some(id) = &func.id else {
            return;
        };
        if func.generator {
            self.unsupported("Generator functions cannot be component methods.", func.span);
            return;
        }
        let Some(body) = &func.body else {
            // Overload signature; the implementation carries the body.
            return;
        };
        let start = func
            .type_parameters
            .as_ref()
            .map(|t| t.span.start)
            .unwrap_or(func.params.span.start);
        let mut facts = CodeFacts::collect(
            self.unit,
            SourceSpan::new(start, body.span.end),
            ReferenceCollector::for_function_body(func),
        );
        facts.inserts.push((body.span.start, "=> ".to_string()));
        let statement = span(func.span);
        self.declare(&id.name, DeclarationSite::Function(statement));
        self.analysis.items.push(ScriptItem::Function(FunctionItem {
            name: id.name.to_string(),
            statement,
            is_async: func.r#async,
            body: facts,
        }));
    }
}

fn hoisted_names(stmt: &Statement<'_>) -> Vec<String> {
    let declaration = match stmt {
        Statement::ExportNamedDeclaration(decl) => decl.declaration.as_ref(),
        _ => stmt.as_declaration(),
    };
    match declaration {
        Some(Declaration::ClassDeclaration(c)) => {
            c.id.iter().map(|id| id.name.to_string()).collect()
        }
        Some(Declaration::TSTypeAliasDeclaration(d)) => vec![d.id.name.to_string()],
        Some(Declaration::TSInterfaceDeclaration(d)) => vec![d.id.name.to_string()],
        Some(Declaration::TSEnumDeclaration(d)) => vec![d.id.name.to_string()],
        _ => vec![],
    }
}

/// `count: number = ` → `number`. The head is the declarator text before the
/// initializer.
fn annotation_of(head: &str, name: &str) -> Option<String> {
    let rest = head.trim().strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix('!').unwrap_or(rest).trim_start();
    let rest = rest.strip_prefix(':')?.trim();
    let rest = rest.strip_suffix('=').unwrap_or(rest).trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

fn literal_type(init: &Expression<'_>) -> Option<&'static str> {
    match init {
        Expression::NumericLiteral(_) => Some("number"),
        Expression::StringLiteral(_) | Expression::TemplateLiteral(_) => Some("string"),
        Expression::BooleanLiteral(_) => Some("boolean"),
        Expression::BigIntLiteral(_) => Some("bigint"),
        Expression::ArrayExpression(_) => Some("any[]"),
        Expression::UnaryExpression(u)
            if u.operator == UnaryOperator::UnaryNegation
                && matches!(u.argument, Expression::NumericLiteral(_)) =>
        {
            Some("number")
        }
        Expression::ParenthesizedExpression(p) => literal_type(&p.expression),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::parse::prepare;

    fn run(source: &str) -> (Option<ScriptAnalysis>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let prepared = prepare(source, &mut diagnostics);
        let analysis = analyze(source, &prepared, &mut diagnostics);
        (analysis, diagnostics)
    }

    #[test]
    fn test_unit_keeps_script_offsets() {
        let source = "<script>let a = 1;</script>\n<p>{a + 1}</p>";
        let mut diagnostics = Diagnostics::new();
        let prepared = prepare(source, &mut diagnostics);
        let unit = ProgramUnit::build(source, &prepared);
        let script = source.find("let a").unwrap();
        assert_eq!(&unit.text[script..script + 5], "let a");
        assert!(unit.text.contains("function __zen_template() {\n(a + 1);\n}"));

        let relocated = unit.text.find("(a + 1)").unwrap() as u32 + 1;
        assert_eq!(unit.to_original(relocated), source.find("a + 1").unwrap() as u32);
    }

    #[test]
    fn test_items_in_declaration_order() {
        let (analysis, diagnostics) = run(
            "<script>\nimport Badge from './Badge.zen';\nexport let step: number = 1;\nlet count = 0;\nfunction inc() { count += step; }\n$: console.log(count);\n</script>",
        );
        assert!(diagnostics.is_empty());
        let analysis = analysis.unwrap();
        assert_eq!(analysis.imports[0].source, "./Badge.zen");
        assert_eq!(analysis.imports[0].locals, vec!["Badge"]);
        assert!(matches!(&analysis.items[0], ScriptItem::Variable(v) if v.name == "step" && v.exported));
        assert!(matches!(&analysis.items[1], ScriptItem::Variable(v) if v.name == "count" && v.kind == DeclKind::Let));
        assert!(matches!(&analysis.items[2], ScriptItem::Function(f) if f.name == "inc"));
        assert!(matches!(&analysis.items[3], ScriptItem::Reactive(_)));
        assert!(analysis.is_property("step"));
        assert!(!analysis.is_property("count"));
        assert_eq!(analysis.type_display("step"), "number");
        assert_eq!(analysis.type_display("count"), "number");
        assert!(matches!(analysis.resolve("Badge"), Some(DeclarationSite::Import(_))));
    }

    #[test]
    fn test_template_facts_use_original_offsets() {
        let source = "<script>let count = 0;</script><button on:click={() => count++}>{count}</button>";
        let (analysis, diagnostics) = run(source);
        assert!(diagnostics.is_empty());
        let analysis = analysis.unwrap();
        assert_eq!(analysis.template.len(), 2);
        let handler = &analysis.template[0];
        assert_eq!(handler.span.slice(source), "() => count++");
        assert!(handler.refs[0].deferred);
        assert_eq!(handler.refs[0].span.slice(source), "count");
        assert_eq!(handler.mutations[0].span.slice(source), "count++");
        assert_eq!(analysis.template[1].refs[0].span.slice(source), "count");
    }

    #[test]
    fn test_syntax_errors_are_mapped_back() {
        let source = "<script>let a = 1;</script><p>{a +}</p>";
        let (analysis, diagnostics) = run(source);
        assert!(analysis.is_none());
        let entries = diagnostics.finish(source);
        assert!(!entries.is_empty());
        let span = entries[0].span.unwrap();
        assert!(span.start as usize >= source.find("<p>").unwrap());
    }

    #[test]
    fn test_multiple_expressions_in_braces_rejected() {
        let (analysis, diagnostics) = run("<p>{a) + (b}</p>");
        assert!(analysis.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unsupported_declarations() {
        let (_, diagnostics) =
            run("<script>let { a } = obj; export default 1; function* gen() {}</script>");
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_annotation_extraction() {
        assert_eq!(annotation_of("count: number = ", "count").as_deref(), Some("number"));
        assert_eq!(annotation_of("f: () => void = ", "f").as_deref(), Some("() => void"));
        assert_eq!(annotation_of("title!: string", "title").as_deref(), Some("string"));
        assert_eq!(annotation_of("x = ", "x"), None);
    }

    #[test]
    fn test_function_arrow_insert() {
        let source = "<script>async function load(id: string): Promise<void> { await fetch(id); }</script>";
        let (analysis, _) = run(source);
        let analysis = analysis.unwrap();
        let ScriptItem::Function(f) = &analysis.items[0] else {
            panic!("expected function");
        };
        assert!(f.is_async);
        assert_eq!(
            f.body.span.slice(source),
            "(id: string): Promise<void> { await fetch(id); }"
        );
        let (at, text) = &f.body.inserts[0];
        assert_eq!(&source[*at as usize..*at as usize + 1], "{");
        assert_eq!(text, "=> ");
    }
}
