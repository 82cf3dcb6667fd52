//! Reactive model builder.
//!
//! Turns the prepared markup and the script analysis into a
//! [`ResolvedComponent`]: the variable registry, the node trees of the
//! component and of every sub-fragment, and the update flows with their
//! trigger masks. Bits are assigned last, once every reader is known.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::diagnostics::{
    Diagnostic, DiagnosticSink, ERR_CONSTANT_ASSIGNMENT, ERR_INSTANCE_ESCAPE,
    ERR_UNRESOLVED_COMPONENT, ERR_UNRESOLVED_IDENTIFIER, ERR_UNSUPPORTED_DECLARATION,
    ERR_UNSUPPORTED_MODIFIER,
};
use crate::model::{
    Action, AttributePart, AttributeTarget, AttributeValue, Code, FragmentBody, FragmentId,
    FragmentOrigin, Initializer, Modifier, ModuleImport, Mutation, NodeId, Param, ParentScope,
    ReactiveNode, ResolvedComponent, RunStatement, ScriptStep, SlotRef, SubFragment, UpdateFlow,
    VarId, VarKind, VarRole, Variable,
};
use crate::options::CompileOptions;
use crate::parse::PreparedSource;
use crate::scope::is_global;
use crate::unit::{
    CodeFacts, DeclKind, DeclarationSite, ScriptAnalysis, ScriptItem, SemanticAnalyzer,
};
use crate::validate::{
    AttributeIR, AttributePart as MarkupPart, AttributeValue as MarkupValue, ComponentNode,
    ElementNode, ExprId, IfBlockNode, MarkupNode, SlotNode,
};

/// Build the reactive model. Returns `None` if any problem was reported.
pub fn resolve_component(
    prepared: &PreparedSource,
    analysis: &ScriptAnalysis,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Option<ResolvedComponent> {
    let mut resolver = Resolver {
        analysis,
        options,
        sink,
        failed: false,
        variables: vec![],
        by_name: HashMap::new(),
        derived_deps: HashMap::new(),
        fragments: vec![],
        if_blocks: 0,
        slot_fragments: 0,
        outlets: 0,
    };

    resolver.register_variables();
    resolver.classify_mutability();
    resolver.convert_initializers();
    resolver.classify_derived();
    resolver.check_hoisted();
    let (statements, script_flows) = resolver.script_steps();

    let mut root = FragmentBody {
        flows: script_flows,
        ..FragmentBody::default()
    };
    root.roots = resolver.build_children(&prepared.markup, ParentScope::Component, &mut root);

    if resolver.failed {
        return None;
    }

    let width = resolver.assign_bits(&root);
    let mut component = ResolvedComponent {
        name: options.resolved_component_name(),
        props: resolver
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.role == VarRole::Prop)
            .map(|(id, _)| id)
            .collect(),
        variables: resolver.variables,
        imports: analysis
            .imports
            .iter()
            .map(|i| ModuleImport {
                span: i.span,
                source: i.source.clone(),
                source_span: i.source_span,
                type_only: i.type_only,
            })
            .collect(),
        hoisted: analysis.hoisted.iter().map(|h| h.facts.span).collect(),
        statements,
        root,
        fragments: resolver.fragments,
        width,
    };
    compute_triggers(&mut component);

    tracing::debug!(
        component = %component.name,
        variables = component.variables.len(),
        bits = component.width,
        fragments = component.fragments.len(),
        flows = component.flows().count(),
        "component resolved"
    );
    Some(component)
}

struct Resolver<'a> {
    analysis: &'a ScriptAnalysis,
    options: &'a CompileOptions,
    sink: &'a mut dyn DiagnosticSink,
    failed: bool,
    variables: Vec<Variable>,
    by_name: HashMap<String, VarId>,
    /// Direct eager reads of each derived variable's initializer.
    derived_deps: HashMap<VarId, Vec<VarId>>,
    fragments: Vec<SubFragment>,
    if_blocks: usize,
    slot_fragments: usize,
    outlets: usize,
}

impl Resolver<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.failed = true;
        self.sink.report(diagnostic);
    }

    // ───────────────────────────────────────────────────────────────────────
    // Script
    // ───────────────────────────────────────────────────────────────────────

    fn register_variables(&mut self) {
        for item in &self.analysis.items {
            let (name, declaration, kind) = match item {
                ScriptItem::Variable(v) => {
                    let kind = match v.kind {
                        DeclKind::Let => VarKind::Let,
                        DeclKind::Var => VarKind::Var,
                        DeclKind::Const => VarKind::Const,
                    };
                    (&v.name, v.statement, kind)
                }
                ScriptItem::Function(f) => (&f.name, f.statement, VarKind::Function),
                _ => continue,
            };
            if self.by_name.contains_key(name) {
                continue;
            }
            let id = self.variables.len();
            self.by_name.insert(name.clone(), id);
            self.variables.push(Variable {
                name: name.clone(),
                declaration,
                ty: self.analysis.type_display(name),
                kind,
                mutable: matches!(kind, VarKind::Let | VarKind::Var),
                role: if self.analysis.is_property(name) {
                    VarRole::Prop
                } else {
                    VarRole::Plain
                },
                bit: None,
                init: Initializer::None,
            });
        }
    }

    fn all_facts(&self) -> impl Iterator<Item = &CodeFacts> {
        let script = self.analysis.items.iter().flat_map(|item| match item {
            ScriptItem::Variable(v) => v.init.as_ref().into_iter().collect::<Vec<_>>(),
            ScriptItem::Function(f) => vec![&f.body],
            ScriptItem::Reactive(facts) | ScriptItem::Statement(facts) => vec![facts],
        });
        script.chain(self.analysis.template.iter())
    }

    /// `let`/`var` are mutable; so is any root of a member assignment.
    /// Plain assignments to constants, functions and imports are rejected.
    fn classify_mutability(&mut self) {
        let mut member_roots = HashSet::new();
        let mut invalid = Vec::new();
        for facts in self.all_facts() {
            for mutation in &facts.mutations {
                for target in &mutation.targets {
                    match self.by_name.get(&target.name) {
                        Some(&id) if target.member => {
                            member_roots.insert(id);
                        }
                        Some(&id) => {
                            if !self.variables[id].mutable {
                                invalid.push((target.name.clone(), mutation.span));
                            }
                        }
                        None => {
                            if !target.member
                                && matches!(
                                    self.analysis.resolve(&target.name),
                                    Some(DeclarationSite::Import(_))
                                )
                            {
                                invalid.push((target.name.clone(), mutation.span));
                            }
                        }
                    }
                }
            }
        }
        for id in member_roots {
            if !self.variables[id].is_function() {
                self.variables[id].mutable = true;
            }
        }
        for (name, span) in invalid {
            self.report(
                Diagnostic::unsupported(
                    ERR_CONSTANT_ASSIGNMENT,
                    format!("`{}` is a constant binding and cannot be reassigned.", name),
                    span,
                )
                .with_hint("Declare it with `let` to make it reactive state."),
            );
        }
    }

    fn convert_initializers(&mut self) {
        let analysis = self.analysis;
        for item in &analysis.items {
            match item {
                ScriptItem::Variable(v) => {
                    let Some(&id) = self.by_name.get(&v.name) else {
                        continue;
                    };
                    if let Some(facts) = &v.init {
                        let code = self.code(facts);
                        self.variables[id].init = Initializer::Expr(code);
                    }
                }
                ScriptItem::Function(f) => {
                    let Some(&id) = self.by_name.get(&f.name) else {
                        continue;
                    };
                    let code = self.code(&f.body);
                    self.variables[id].init = Initializer::Function {
                        code,
                        is_async: f.is_async,
                    };
                }
                _ => {}
            }
        }
    }

    /// A `const` whose initializer reads reactive state is derived. Repeats
    /// until stable so chains of derived constants settle in any order.
    fn classify_derived(&mut self) {
        let analysis = self.analysis;
        let candidates: Vec<(VarId, Vec<VarId>)> = analysis
            .variables()
            .filter(|v| v.kind == DeclKind::Const && !v.exported && !v.init_is_function)
            .filter_map(|v| {
                let id = *self.by_name.get(&v.name)?;
                let facts = v.init.as_ref()?;
                let reads = self.var_reads(facts, true);
                Some((id, reads))
            })
            .collect();

        loop {
            let mut changed = false;
            for (id, reads) in &candidates {
                if self.variables[*id].role == VarRole::DerivedReactive {
                    continue;
                }
                if reads.iter().any(|r| self.is_reactive(*r)) {
                    self.variables[*id].role = VarRole::DerivedReactive;
                    self.derived_deps.insert(*id, reads.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn is_reactive(&self, id: VarId) -> bool {
        let v = &self.variables[id];
        (v.mutable && !v.is_function()) || v.role == VarRole::DerivedReactive
    }

    /// Hoisted declarations live outside the instance and cannot see its
    /// state.
    fn check_hoisted(&mut self) {
        let analysis = self.analysis;
        for hoisted in &analysis.hoisted {
            for r in &hoisted.facts.refs {
                if self.by_name.contains_key(&r.name) {
                    self.report(Diagnostic::unsupported(
                        ERR_UNSUPPORTED_DECLARATION,
                        format!(
                            "Module-level declaration `{}` cannot use component state `{}`.",
                            hoisted.names.join(", "),
                            r.name
                        ),
                        r.span,
                    ));
                }
            }
        }
    }

    fn script_steps(&mut self) -> (Vec<ScriptStep>, Vec<UpdateFlow>) {
        let analysis = self.analysis;
        let mut steps = Vec::new();
        let mut flows = Vec::new();
        for item in &analysis.items {
            match item {
                ScriptItem::Variable(v) => {
                    let Some(&id) = self.by_name.get(&v.name) else {
                        continue;
                    };
                    steps.push(ScriptStep::Declare(id));
                    if let Some(deps) = self.derived_deps.get(&id) {
                        let mut reads = self.expand(deps.iter().copied());
                        reads.retain(|r| *r != id);
                        flows.push(flow(reads, Action::RunStatement(RunStatement::Derived(id))));
                    }
                }
                ScriptItem::Statement(facts) => {
                    let code = self.code(facts);
                    steps.push(ScriptStep::Execute(code));
                }
                ScriptItem::Reactive(facts) => {
                    let assigned: HashSet<VarId> = facts
                        .plain_assignments()
                        .filter_map(|name| self.by_name.get(name).copied())
                        .collect();
                    let direct = self.var_reads(facts, true);
                    let mut reads = self.expand(direct.into_iter());
                    reads.retain(|r| !assigned.contains(r));
                    let code = self.code(facts);
                    flows.push(flow(reads, Action::RunStatement(RunStatement::Reactive(code))));
                }
                ScriptItem::Function(_) => {}
            }
        }
        (steps, flows)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Code and dependencies
    // ───────────────────────────────────────────────────────────────────────

    fn var_reads(&self, facts: &CodeFacts, eager_only: bool) -> Vec<VarId> {
        facts
            .reads(eager_only)
            .filter_map(|r| self.by_name.get(&r.name).copied())
            .collect()
    }

    /// Close a read set over derived variables.
    fn expand(&self, direct: impl Iterator<Item = VarId>) -> Vec<VarId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<VarId> = direct.collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(deps) = self.derived_deps.get(&id) {
                stack.extend(deps.iter().copied());
            }
        }
        seen.into_iter().collect()
    }

    /// Resolve every reference of `facts`, reporting the ones that do not
    /// resolve or cannot be reached through the instance.
    fn code(&mut self, facts: &CodeFacts) -> Code {
        let mut refs = Vec::new();
        for r in &facts.refs {
            if let Some(&var) = self.by_name.get(&r.name) {
                if r.in_plain_function {
                    self.report(
                        Diagnostic::unsupported(
                            ERR_INSTANCE_ESCAPE,
                            format!("`{}` is used inside a nested `function`, where `this` is not the component.", r.name),
                            r.span,
                        )
                        .with_hint("Use an arrow function instead."),
                    );
                    continue;
                }
                refs.push(SlotRef {
                    span: r.span,
                    var,
                    shorthand: r.shorthand,
                });
            } else if self.analysis.resolve(&r.name).is_none()
                && !is_global(&r.name, &self.options.extra_globals)
            {
                self.report(
                    Diagnostic::unresolved(
                        ERR_UNRESOLVED_IDENTIFIER,
                        format!("Unknown identifier '{}'.", r.name),
                        r.span,
                    )
                    .with_hint("Declare it in the component script or import it."),
                );
            }
        }
        let mutations = facts
            .mutations
            .iter()
            .filter_map(|m| {
                let targets: Vec<VarId> = m
                    .targets
                    .iter()
                    .filter_map(|t| self.by_name.get(&t.name).copied())
                    .collect();
                (!targets.is_empty()).then(|| Mutation {
                    span: m.span,
                    targets,
                    deferred: m.deferred,
                })
            })
            .collect();
        Code {
            span: facts.span,
            refs,
            mutations,
            inserts: facts.inserts.clone(),
        }
    }

    fn template(&mut self, id: ExprId, eager_only: bool) -> Option<(Code, Vec<VarId>)> {
        let analysis = self.analysis;
        let facts = analysis.template.get(id)?;
        let reads = self.expand(self.var_reads(facts, eager_only).into_iter());
        Some((self.code(facts), reads))
    }

    fn attribute_value(&mut self, value: &MarkupValue) -> (AttributeValue, Vec<VarId>) {
        match value {
            MarkupValue::Static(text) => (AttributeValue::Static(text.clone()), vec![]),
            MarkupValue::Dynamic(id) => match self.template(*id, false) {
                Some((code, reads)) => (AttributeValue::Expr(code), reads),
                None => (AttributeValue::Static(String::new()), vec![]),
            },
            MarkupValue::Interpolated(parts) => {
                let mut out = Vec::new();
                let mut reads = BTreeSet::new();
                for part in parts {
                    match part {
                        MarkupPart::Text(text) => out.push(AttributePart::Text(text.clone())),
                        MarkupPart::Expression(id) => {
                            if let Some((code, r)) = self.template(*id, false) {
                                reads.extend(r);
                                out.push(AttributePart::Expr(code));
                            }
                        }
                    }
                }
                (AttributeValue::Interpolated(out), reads.into_iter().collect())
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Markup
    // ───────────────────────────────────────────────────────────────────────

    fn build_children(
        &mut self,
        nodes: &[MarkupNode],
        scope: ParentScope,
        body: &mut FragmentBody,
    ) -> Vec<NodeId> {
        nodes
            .iter()
            .filter_map(|node| self.build_node(node, scope, body))
            .collect()
    }

    fn build_node(
        &mut self,
        node: &MarkupNode,
        scope: ParentScope,
        body: &mut FragmentBody,
    ) -> Option<NodeId> {
        match node {
            MarkupNode::Text(text) => Some(push(
                body,
                ReactiveNode::ConstantText {
                    value: text.value.clone(),
                },
            )),
            MarkupNode::Expression(expr) => {
                let (code, reads) = self.template(expr.expression, false)?;
                let id = push(body, ReactiveNode::ReactiveText);
                body.flows.push(flow(reads, Action::SetText { node: id, value: code }));
                Some(id)
            }
            MarkupNode::Element(element) => Some(self.build_element(element, scope, body)),
            MarkupNode::Component(component) => self.build_component(component, scope, body),
            MarkupNode::If(block) => Some(self.build_if(block, scope, body)),
            MarkupNode::Slot(slot) => Some(self.build_outlet(slot, scope, body)),
        }
    }

    fn build_element(
        &mut self,
        element: &ElementNode,
        scope: ParentScope,
        body: &mut FragmentBody,
    ) -> NodeId {
        let id = push(body, ReactiveNode::ReactiveText);
        let mut attributes = Vec::new();
        let mut events = Vec::new();

        for attribute in &element.attributes {
            if let Some(spec) = attribute.event_spec() {
                if let Some(action) = self.listen(id, spec, attribute) {
                    events.push(spec.split('|').next().unwrap_or(spec).to_string());
                    body.flows.push(action);
                }
                continue;
            }
            if attribute.directive_prefix().is_some() || attribute.name == "slot" {
                continue;
            }
            let (value, reads) = self.attribute_value(&attribute.value);
            attributes.push(attribute.name.clone());
            body.flows.push(flow(
                reads,
                Action::SetAttribute {
                    node: id,
                    target: AttributeTarget::Element,
                    name: attribute.name.clone(),
                    value,
                },
            ));
        }

        let children = self.build_children(&element.children, scope, body);
        body.nodes[id] = ReactiveNode::Element {
            tag: element.tag.clone(),
            host_type: host_element_type(&element.tag, element.svg),
            svg: element.svg,
            attributes,
            events,
            children,
        };
        id
    }

    fn listen(&mut self, node: NodeId, spec: &str, attribute: &AttributeIR) -> Option<UpdateFlow> {
        let MarkupValue::Dynamic(expr) = attribute.value else {
            return None;
        };
        let mut parts = spec.split('|');
        let event = parts.next().unwrap_or_default().to_string();
        let mut modifiers: Vec<Modifier> = Vec::new();
        for name in parts {
            match Modifier::parse(name) {
                Some(m) if !modifiers.contains(&m) => modifiers.push(m),
                Some(_) => {}
                None => self.report(
                    Diagnostic::unsupported(
                        ERR_UNSUPPORTED_MODIFIER,
                        format!("Unknown event modifier `{}`.", name),
                        attribute.location,
                    )
                    .with_hint("Known modifiers: once, preventDefault, stopPropagation, trusted, self, passive, nonpassive, capture."),
                ),
            }
        }
        if modifiers.contains(&Modifier::Passive) && modifiers.contains(&Modifier::NonPassive) {
            self.report(Diagnostic::unsupported(
                ERR_UNSUPPORTED_MODIFIER,
                "`passive` and `nonpassive` cannot be combined.",
                attribute.location,
            ));
        }
        let (handler, reads) = self.template(expr, true)?;
        Some(flow(
            reads,
            Action::Listen {
                node,
                event,
                handler,
                modifiers,
            },
        ))
    }

    fn build_component(
        &mut self,
        component: &ComponentNode,
        scope: ParentScope,
        body: &mut FragmentBody,
    ) -> Option<NodeId> {
        if !matches!(
            self.analysis.resolve(&component.name),
            Some(DeclarationSite::Import(_))
        ) {
            self.report(
                Diagnostic::unresolved(
                    ERR_UNRESOLVED_COMPONENT,
                    format!("Component <{}> is not imported.", component.name),
                    component.location,
                )
                .with_hint(format!(
                    "Add `import {} from \"./{}{}\";` to the script.",
                    component.name, component.name, self.options.component_extension
                )),
            );
            return None;
        }

        let id = push(body, ReactiveNode::ReactiveText);
        let mut params = Vec::new();
        for attribute in &component.attributes {
            if attribute.directive_prefix().is_some() || attribute.event_spec().is_some() {
                continue;
            }
            let (value, reads) = match &attribute.value {
                MarkupValue::Static(text) if text.is_empty() => (AttributeValue::True, vec![]),
                other => self.attribute_value(other),
            };
            let reactive = reads.iter().any(|r| self.is_reactive(*r));
            if reactive {
                body.flows.push(flow(
                    reads,
                    Action::SetAttribute {
                        node: id,
                        target: AttributeTarget::Property,
                        name: attribute.name.clone(),
                        value: value.clone(),
                    },
                ));
            }
            params.push(Param {
                name: attribute.name.clone(),
                value,
            });
        }

        let mut slots = Vec::new();
        for (name, children) in group_slots(&component.children) {
            let slot = self.slot_fragments;
            self.slot_fragments += 1;
            let fragment = self.fragment(scope, FragmentOrigin::Slot { slot, name: name.clone() }, &children);
            slots.push((name, fragment));
        }

        body.nodes[id] = ReactiveNode::SubComponent {
            name: component.name.clone(),
            params,
            slots,
        };
        Some(id)
    }

    fn build_if(&mut self, block: &IfBlockNode, scope: ParentScope, body: &mut FragmentBody) -> NodeId {
        let k = self.if_blocks;
        self.if_blocks += 1;
        let id = push(body, ReactiveNode::ReactiveText);

        let mut conditions = Vec::new();
        let mut reads = BTreeSet::new();
        for branch in &block.branches {
            if let Some((code, r)) = self.template(branch.condition, false) {
                reads.extend(r);
                conditions.push(code);
            }
        }
        body.flows.push(flow(reads.into_iter().collect(), Action::SelectBranch { node: id }));

        let branches = block
            .branches
            .iter()
            .enumerate()
            .map(|(index, branch)| {
                self.fragment(scope, FragmentOrigin::Branch { block: k, index }, &branch.children)
            })
            .collect();
        let otherwise = block
            .otherwise
            .as_ref()
            .map(|children| self.fragment(scope, FragmentOrigin::Otherwise { block: k }, children));

        body.nodes[id] = ReactiveNode::ReactiveIf {
            conditions,
            branches,
            otherwise,
        };
        id
    }

    fn build_outlet(&mut self, slot: &SlotNode, scope: ParentScope, body: &mut FragmentBody) -> NodeId {
        let outlet = self.outlets;
        self.outlets += 1;
        let id = push(body, ReactiveNode::ReactiveText);
        let fallback = (!slot.fallback.iter().all(is_blank))
            .then(|| self.fragment(scope, FragmentOrigin::Fallback { outlet }, &slot.fallback));
        body.nodes[id] = ReactiveNode::SlotOutlet {
            name: slot.name.clone().unwrap_or_else(|| "default".to_string()),
            fallback,
        };
        id
    }

    fn fragment(&mut self, enclosing: ParentScope, origin: FragmentOrigin, nodes: &[MarkupNode]) -> FragmentId {
        let id = self.fragments.len();
        self.fragments.push(SubFragment {
            id,
            enclosing,
            origin,
            body: FragmentBody::default(),
        });
        let mut body = FragmentBody::default();
        body.roots = self.build_children(nodes, ParentScope::Fragment(id), &mut body);
        self.fragments[id].body = body;
        id
    }

    // ───────────────────────────────────────────────────────────────────────
    // Bits
    // ───────────────────────────────────────────────────────────────────────

    /// Give a bit to every mutable variable some flow reads, in declaration
    /// order. Returns the number of bits used.
    fn assign_bits(&mut self, root: &FragmentBody) -> u32 {
        let mut read: HashSet<VarId> = HashSet::new();
        let bodies = std::iter::once(root).chain(self.fragments.iter().map(|f| &f.body));
        for body in bodies {
            for flow in &body.flows {
                read.extend(flow.reads.iter().copied());
            }
        }
        let mut next = 0;
        for (id, variable) in self.variables.iter_mut().enumerate() {
            if variable.mutable && !variable.is_function() && read.contains(&id) {
                variable.bit = Some(next);
                tracing::trace!(name = %variable.name, bit = next, "bit assigned");
                next += 1;
            }
        }
        next
    }
}

fn compute_triggers(component: &mut ResolvedComponent) {
    let masks: Vec<Vec<_>> = component
        .bodies()
        .map(|(_, body)| body.flows.iter().map(|f| component.mask_of(&f.reads)).collect())
        .collect();
    let bodies = std::iter::once(&mut component.root)
        .chain(component.fragments.iter_mut().map(|f| &mut f.body));
    for (body, masks) in bodies.zip(masks) {
        for (flow, mask) in body.flows.iter_mut().zip(masks) {
            flow.trigger = mask;
        }
    }
}

fn flow(reads: Vec<VarId>, action: Action) -> UpdateFlow {
    UpdateFlow {
        trigger: Default::default(),
        reads,
        action,
    }
}

/// Reserve a node slot; composite nodes are filled in once their children
/// have ids, which keeps ids in tree order.
fn push(body: &mut FragmentBody, node: ReactiveNode) -> NodeId {
    body.nodes.push(node);
    body.nodes.len() - 1
}

fn is_blank(node: &MarkupNode) -> bool {
    matches!(node, MarkupNode::Text(t) if t.value.trim().is_empty())
}

/// Split a component's children into slot bodies. Elements carrying a
/// static `slot="name"` form that slot (minus the attribute); everything else
/// is the default slot, trimmed of edge whitespace.
fn group_slots(children: &[MarkupNode]) -> Vec<(String, Vec<MarkupNode>)> {
    let mut groups: Vec<(String, Vec<MarkupNode>)> = Vec::new();
    let mut default = Vec::new();
    for child in children {
        if let MarkupNode::Element(element) = child {
            if let Some(AttributeIR {
                value: MarkupValue::Static(name),
                ..
            }) = element.attribute("slot")
            {
                let mut element = element.clone();
                element.attributes.retain(|a| a.name != "slot");
                groups.push((name.clone(), vec![MarkupNode::Element(element)]));
                continue;
            }
        }
        default.push(child.clone());
    }
    while default.first().is_some_and(is_blank) {
        default.remove(0);
    }
    while default.last().is_some_and(is_blank) {
        default.pop();
    }
    if !default.is_empty() {
        groups.insert(0, ("default".to_string(), default));
    }
    groups
}

/// DOM interface of a host element, for typed node fields.
pub fn host_element_type(tag: &str, svg: bool) -> Option<&'static str> {
    if svg {
        return Some(if tag == "svg" { "SVGSVGElement" } else { "SVGElement" });
    }
    Some(match tag {
        "a" => "HTMLAnchorElement",
        "button" => "HTMLButtonElement",
        "div" => "HTMLDivElement",
        "span" => "HTMLSpanElement",
        "p" => "HTMLParagraphElement",
        "input" => "HTMLInputElement",
        "textarea" => "HTMLTextAreaElement",
        "select" => "HTMLSelectElement",
        "option" => "HTMLOptionElement",
        "form" => "HTMLFormElement",
        "label" => "HTMLLabelElement",
        "img" => "HTMLImageElement",
        "ul" => "HTMLUListElement",
        "ol" => "HTMLOListElement",
        "li" => "HTMLLIElement",
        "table" => "HTMLTableElement",
        "tr" => "HTMLTableRowElement",
        "td" | "th" => "HTMLTableCellElement",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "HTMLHeadingElement",
        "canvas" => "HTMLCanvasElement",
        "video" => "HTMLVideoElement",
        "audio" => "HTMLAudioElement",
        "br" => "HTMLBRElement",
        "hr" => "HTMLHRElement",
        "pre" => "HTMLPreElement",
        "script" => "HTMLScriptElement",
        _ => return None,
    })
}

