//! Free-identifier and mutation collection over oxc ASTs.
//!
//! A [`ReferenceCollector`] is rooted at one script item or one markup
//! expression. It keeps a stack of local scopes and records every identifier
//! that is not bound inside the root: those are the names the resolver has to
//! match against component state, imports, hoisted declarations and globals.

use oxc_ast::ast::{
    ArrowFunctionExpression, AssignmentExpression, AssignmentOperator, AssignmentTarget,
    AssignmentTargetPropertyIdentifier, BindingIdentifier, BlockStatement, CatchClause, Class,
    Expression, ForInStatement, ForOfStatement, ForStatement, ForStatementInit, ForStatementLeft,
    FormalParameters, Function, FunctionBody, IdentifierReference, ObjectProperty,
    SimpleAssignmentTarget, Statement, SwitchStatement, TSType, TSTypeAnnotation,
    TSTypeParameterDeclaration, TSTypeParameterInstantiation, UpdateExpression,
    VariableDeclaration,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

use crate::diagnostics::SourceSpan;

lazy_static::lazy_static! {
    pub static ref ZENITH_GLOBALS: HashSet<&'static str> = [
        // Standard JS globals
        "Math", "console", "JSON", "Date", "String", "Number", "Boolean", "Array",
        "Object", "Promise", "Map", "Set", "WeakMap", "WeakSet", "Symbol", "BigInt",
        "RegExp", "Error", "TypeError", "RangeError", "Intl", "Reflect", "Proxy",
        "undefined", "NaN", "Infinity", "globalThis", "parseInt", "parseFloat",
        "isNaN", "isFinite", "encodeURIComponent", "decodeURIComponent",
        "encodeURI", "decodeURI", "structuredClone",
        // Browser environment
        "window", "document", "navigator", "location", "history", "localStorage",
        "sessionStorage", "fetch", "URL", "URLSearchParams", "FormData", "Event",
        "CustomEvent", "KeyboardEvent", "MouseEvent", "HTMLElement", "Element",
        "Node", "alert", "confirm", "prompt", "performance", "crypto",
        "setTimeout", "clearTimeout", "setInterval", "clearInterval",
        "requestAnimationFrame", "cancelAnimationFrame", "queueMicrotask",
    ]
    .into_iter()
    .collect();
}

pub fn is_global(name: &str, extra_globals: &[String]) -> bool {
    ZENITH_GLOBALS.contains(name) || extra_globals.iter().any(|g| g == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Plain `=` target.
    Write,
    /// Compound assignment or update.
    ReadWrite,
}

#[derive(Debug, Clone)]
pub struct FreeReference {
    pub name: String,
    pub span: SourceSpan,
    pub access: Access,
    /// Inside a function nested in the collection root; evaluated at call
    /// time, not when the root is evaluated.
    pub deferred: bool,
    /// `{ name }` object shorthand or its destructuring counterpart.
    pub shorthand: bool,
    /// Inside a non-arrow function nested in the root, where `this` is not
    /// the component instance.
    pub in_plain_function: bool,
}

impl FreeReference {
    pub fn reads(&self) -> bool {
        self.access != Access::Write
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTarget {
    pub name: String,
    /// `root.x = …` rather than `root = …`.
    pub member: bool,
}

/// An assignment or update expression whose target roots in a free name.
#[derive(Debug, Clone)]
pub struct MutationSite {
    pub span: SourceSpan,
    pub targets: Vec<MutationTarget>,
    pub deferred: bool,
}

pub struct ReferenceCollector {
    scope_stack: Vec<HashSet<String>>,
    function_depth: usize,
    plain_function_depth: usize,
    write_target: Option<Access>,
    pub references: Vec<FreeReference>,
    pub mutations: Vec<MutationSite>,
}

impl Default for ReferenceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceCollector {
    pub fn new() -> Self {
        Self {
            scope_stack: vec![HashSet::new()],
            function_depth: 0,
            plain_function_depth: 0,
            write_target: None,
            references: vec![],
            mutations: vec![],
        }
    }

    pub fn for_expression(expr: &Expression<'_>) -> Self {
        let mut collector = Self::new();
        collector.visit_expression(expr);
        collector
    }

    pub fn for_statement(stmt: &Statement<'_>) -> Self {
        let mut collector = Self::new();
        collector.visit_statement(stmt);
        collector
    }

    /// Collect a function's parameters and body as if the function itself
    /// were the root, so its own body is not considered deferred.
    pub fn for_function_body(func: &Function<'_>) -> Self {
        let mut collector = Self::new();
        collector.declare_params(&func.params);
        collector.visit_formal_parameters(&func.params);
        if let Some(body) = &func.body {
            collector.visit_function_body(body);
        }
        collector
    }

    fn push_scope(&mut self) {
        self.scope_stack.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn add_local(&mut self, name: String) {
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.insert(name);
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scope_stack.iter().rev().any(|s| s.contains(name))
    }

    fn declare_params(&mut self, params: &FormalParameters<'_>) {
        for name in BindingNames::of_params(params) {
            self.add_local(name);
        }
    }

    fn declare_statements(&mut self, statements: &[Statement<'_>]) {
        for name in declared_names(statements) {
            self.add_local(name);
        }
    }

    fn record(&mut self, ident: &IdentifierReference<'_>, access: Access, shorthand: bool) {
        if self.is_local(&ident.name) {
            return;
        }
        self.references.push(FreeReference {
            name: ident.name.to_string(),
            span: SourceSpan::new(ident.span.start, ident.span.end),
            access,
            deferred: self.function_depth > 0,
            shorthand,
            in_plain_function: self.plain_function_depth > 0,
        });
    }

    fn push_mutation(&mut self, span: Span, targets: Vec<MutationTarget>) {
        if !targets.is_empty() {
            self.mutations.push(MutationSite {
                span: SourceSpan::new(span.start, span.end),
                targets,
                deferred: self.function_depth > 0,
            });
        }
    }

    fn free_root(&self, expr: &Expression<'_>) -> Option<String> {
        expression_root(expr)
            .filter(|id| !self.is_local(&id.name))
            .map(|id| id.name.to_string())
    }

    fn simple_target(&self, target: &SimpleAssignmentTarget<'_>) -> Option<MutationTarget> {
        match target {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) if !self.is_local(&id.name) => {
                Some(MutationTarget {
                    name: id.name.to_string(),
                    member: false,
                })
            }
            SimpleAssignmentTarget::StaticMemberExpression(m) => self.member_target(&m.object),
            SimpleAssignmentTarget::ComputedMemberExpression(m) => self.member_target(&m.object),
            SimpleAssignmentTarget::PrivateFieldExpression(m) => self.member_target(&m.object),
            _ => None,
        }
    }

    fn member_target(&self, object: &Expression<'_>) -> Option<MutationTarget> {
        self.free_root(object).map(|name| MutationTarget { name, member: true })
    }
}

/// Leftmost identifier of a member chain: `a.b[c].d` → `a`.
pub fn expression_root<'e, 'a>(expr: &'e Expression<'a>) -> Option<&'e IdentifierReference<'a>> {
    match expr {
        Expression::Identifier(id) => Some(id),
        Expression::StaticMemberExpression(m) => expression_root(&m.object),
        Expression::ComputedMemberExpression(m) => expression_root(&m.object),
        Expression::PrivateFieldExpression(m) => expression_root(&m.object),
        Expression::ParenthesizedExpression(p) => expression_root(&p.expression),
        Expression::TSNonNullExpression(e) => expression_root(&e.expression),
        _ => None,
    }
}

impl<'a> Visit<'a> for ReferenceCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let access = self.write_target.unwrap_or(Access::Read);
        self.record(ident, access, false);
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                self.record(ident, Access::Read, true);
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_assignment_target_property_identifier(
        &mut self,
        prop: &AssignmentTargetPropertyIdentifier<'a>,
    ) {
        let access = self.write_target.unwrap_or(Access::Write);
        self.record(&prop.binding, access, true);
        if let Some(init) = &prop.init {
            let saved = self.write_target.take();
            self.visit_expression(init);
            self.write_target = saved;
        }
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        let access = if expr.operator == AssignmentOperator::Assign {
            Access::Write
        } else {
            Access::ReadWrite
        };
        let targets = match &expr.left {
            AssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.record(id, access, false);
                self.visit_expression(&expr.right);
                let targets = if self.is_local(&id.name) {
                    vec![]
                } else {
                    vec![MutationTarget {
                        name: id.name.to_string(),
                        member: false,
                    }]
                };
                self.push_mutation(expr.span, targets);
                return;
            }
            AssignmentTarget::StaticMemberExpression(m) => {
                self.member_target(&m.object).into_iter().collect()
            }
            AssignmentTarget::ComputedMemberExpression(m) => {
                self.member_target(&m.object).into_iter().collect()
            }
            AssignmentTarget::PrivateFieldExpression(m) => {
                self.member_target(&m.object).into_iter().collect()
            }
            AssignmentTarget::ArrayAssignmentTarget(_)
            | AssignmentTarget::ObjectAssignmentTarget(_) => {
                let start = self.references.len();
                let saved = self.write_target.replace(access);
                self.visit_assignment_target(&expr.left);
                self.write_target = saved;
                self.visit_expression(&expr.right);
                let targets = self.references[start..]
                    .iter()
                    .filter(|r| r.access != Access::Read)
                    .map(|r| MutationTarget {
                        name: r.name.clone(),
                        member: false,
                    })
                    .collect();
                self.push_mutation(expr.span, targets);
                return;
            }
            _ => vec![],
        };
        walk::walk_assignment_expression(self, expr);
        self.push_mutation(expr.span, targets);
    }

    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        let target = self.simple_target(&expr.argument);
        match &expr.argument {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.record(id, Access::ReadWrite, false);
            }
            _ => walk::walk_update_expression(self, expr),
        }
        self.push_mutation(expr.span, target.into_iter().collect());
    }

    fn visit_simple_assignment_target(&mut self, target: &SimpleAssignmentTarget<'a>) {
        // Inside a destructuring target only bare names are written; the
        // object of a member target is read.
        if matches!(target, SimpleAssignmentTarget::AssignmentTargetIdentifier(_)) {
            walk::walk_simple_assignment_target(self, target);
            return;
        }
        let saved = self.write_target.take();
        walk::walk_simple_assignment_target(self, target);
        self.write_target = saved;
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.function_depth += 1;
        self.plain_function_depth += 1;
        self.push_scope();
        if let Some(id) = &func.id {
            self.add_local(id.name.to_string());
        }
        self.declare_params(&func.params);
        walk::walk_function(self, func, flags);
        self.pop_scope();
        self.plain_function_depth -= 1;
        self.function_depth -= 1;
    }

    fn visit_arrow_function_expression(&mut self, func: &ArrowFunctionExpression<'a>) {
        self.function_depth += 1;
        self.push_scope();
        self.declare_params(&func.params);
        walk::walk_arrow_function_expression(self, func);
        self.pop_scope();
        self.function_depth -= 1;
    }

    fn visit_function_body(&mut self, body: &FunctionBody<'a>) {
        self.push_scope();
        self.declare_statements(&body.statements);
        for name in VarNames::of_statements(&body.statements) {
            self.add_local(name);
        }
        walk::walk_function_body(self, body);
        self.pop_scope();
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        self.push_scope();
        self.declare_statements(&block.body);
        walk::walk_block_statement(self, block);
        self.pop_scope();
    }

    fn visit_switch_statement(&mut self, stmt: &SwitchStatement<'a>) {
        self.visit_expression(&stmt.discriminant);
        // All cases share one block scope.
        self.push_scope();
        for case in &stmt.cases {
            self.declare_statements(&case.consequent);
        }
        for case in &stmt.cases {
            self.visit_switch_case(case);
        }
        self.pop_scope();
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        self.push_scope();
        if let Some(ForStatementInit::VariableDeclaration(decl)) = &stmt.init {
            for d in &decl.declarations {
                for name in BindingNames::of_pattern(&d.id) {
                    self.add_local(name);
                }
            }
        }
        walk::walk_for_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for d in &decl.declarations {
                for name in BindingNames::of_pattern(&d.id) {
                    self.add_local(name);
                }
            }
        }
        walk::walk_for_in_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
            for d in &decl.declarations {
                for name in BindingNames::of_pattern(&d.id) {
                    self.add_local(name);
                }
            }
        }
        walk::walk_for_of_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        self.push_scope();
        if let Some(param) = &clause.param {
            for name in BindingNames::of_pattern(&param.pattern) {
                self.add_local(name);
            }
        }
        walk::walk_catch_clause(self, clause);
        self.pop_scope();
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        self.push_scope();
        if let Some(id) = &class.id {
            self.add_local(id.name.to_string());
        }
        walk::walk_class(self, class);
        self.pop_scope();
    }

    // Types never reach runtime; names inside them are not references.
    fn visit_ts_type(&mut self, _ty: &TSType<'a>) {}

    fn visit_ts_type_annotation(&mut self, _annotation: &TSTypeAnnotation<'a>) {}

    fn visit_ts_type_parameter_declaration(&mut self, _decl: &TSTypeParameterDeclaration<'a>) {}

    fn visit_ts_type_parameter_instantiation(
        &mut self,
        _inst: &TSTypeParameterInstantiation<'a>,
    ) {
    }
}

/// Names bound by a pattern or parameter list, skipping default values.
#[derive(Default)]
pub struct BindingNames {
    pub names: Vec<String>,
}

impl BindingNames {
    pub fn of_pattern(pattern: &oxc_ast::ast::BindingPattern<'_>) -> Vec<String> {
        let mut collector = Self::default();
        collector.visit_binding_pattern(pattern);
        collector.names
    }

    pub fn of_params(params: &FormalParameters<'_>) -> Vec<String> {
        let mut collector = Self::default();
        collector.visit_formal_parameters(params);
        collector.names
    }
}

impl<'a> Visit<'a> for BindingNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.push(ident.name.to_string());
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}

    fn visit_ts_type_annotation(&mut self, _annotation: &TSTypeAnnotation<'a>) {}
}

/// `var` names declared anywhere in a function body, outside nested functions.
#[derive(Default)]
struct VarNames {
    names: Vec<String>,
}

impl VarNames {
    fn of_statements(statements: &[Statement<'_>]) -> Vec<String> {
        let mut collector = Self::default();
        for stmt in statements {
            collector.visit_statement(stmt);
        }
        collector.names
    }
}

impl<'a> Visit<'a> for VarNames {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.kind.is_var() {
            for d in &decl.declarations {
                self.names.extend(BindingNames::of_pattern(&d.id));
            }
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _func: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}
}

/// Names a statement list declares in its own scope.
pub fn declared_names(statements: &[Statement<'_>]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in statements {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for d in &decl.declarations {
                    names.extend(BindingNames::of_pattern(&d.id));
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    names.push(id.name.to_string());
                }
            }
            _ => {}
        }
    }
    names
}
