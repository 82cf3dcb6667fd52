//! Codegen module for the reactive compiler
//!
//! Emits one TypeScript module per component: the component class, one class
//! per sub-fragment, and the imports they need from the runtime. Every piece
//! of user code is copied out of the source through [`Rewriter`].

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::diagnostics::CompileError;
use crate::model::{
    Action, AttributePart, AttributeTarget, AttributeValue, FragmentBody, Initializer, Modifier,
    NodeId, ParentScope, ReactiveNode, ResolvedComponent, RunStatement, ScriptStep, UpdateFlow,
    VarRole,
};
use crate::naming::{ClassNames, Names};
use crate::options::CompileOptions;
use crate::rewrite::{Receiver, Rewriter, Timing};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn generate_module(
    source: &str,
    component: &ResolvedComponent,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let names = Names::allocate(component);
    let mut generator = Generator {
        source,
        component,
        options,
        names: &names,
        runtime: BTreeSet::new(),
        runtime_types: BTreeSet::new(),
    };

    let mut body = String::new();
    if options.emit_types {
        body.push_str(&generator.props_interface()?);
        body.push('\n');
    }
    body.push_str(&generator.component_class()?);
    for fragment in &component.fragments {
        body.push('\n');
        body.push_str(&generator.fragment_class(fragment.id)?);
    }

    let mut module = generator.runtime_imports();
    module.push_str(&generator.user_imports()?);
    for span in &component.hoisted {
        module.push_str(span.slice(source));
        module.push('\n');
    }
    module.push('\n');
    module.push_str(&body);

    tracing::debug!(
        component = %component.name,
        bytes = module.len(),
        helpers = generator.runtime.len(),
        "module generated"
    );
    Ok(module)
}

struct Generator<'a> {
    source: &'a str,
    component: &'a ResolvedComponent,
    options: &'a CompileOptions,
    names: &'a Names,
    runtime: BTreeSet<&'static str>,
    runtime_types: BTreeSet<&'static str>,
}

/// Method names of one generated class.
struct Lifecycle {
    create: &'static str,
    mount: &'static str,
    destroy: &'static str,
}

const COMPONENT_LIFECYCLE: Lifecycle = Lifecycle {
    create: "createInternal",
    mount: "mountInternal",
    destroy: "remove",
};

const FRAGMENT_LIFECYCLE: Lifecycle = Lifecycle {
    create: "create",
    mount: "mount",
    destroy: "destroy",
};

impl Generator<'_> {
    // ───────────────────────────────────────────────────────────────────────
    // Module parts
    // ───────────────────────────────────────────────────────────────────────

    fn runtime_imports(&self) -> String {
        let module = escape_js_string(&self.options.runtime_module);
        let mut out = String::new();
        if !self.runtime.is_empty() {
            let helpers: Vec<&str> = self.runtime.iter().copied().collect();
            out.push_str(&format!(
                "import {{ {} }} from \"{}\";\n",
                helpers.join(", "),
                module
            ));
        }
        if self.options.emit_types && !self.runtime_types.is_empty() {
            let types: Vec<&str> = self.runtime_types.iter().copied().collect();
            out.push_str(&format!(
                "import type {{ {} }} from \"{}\";\n",
                types.join(", "),
                module
            ));
        }
        out
    }

    /// User imports, with component modules pointed at their compiled `.js`.
    fn user_imports(&self) -> Result<String, CompileError> {
        let mut out = String::new();
        for import in &self.component.imports {
            if import.type_only && !self.options.emit_types {
                continue;
            }
            let before = self
                .source
                .get(import.span.start as usize..import.source_span.start as usize);
            let after = self
                .source
                .get(import.source_span.end as usize..import.span.end as usize);
            let (Some(before), Some(after)) = (before, after) else {
                return Err(CompileError::internal(format!(
                    "import specifier outside its declaration: {:?}",
                    import.span
                )));
            };
            let specifier = match import.source.strip_suffix(&self.options.component_extension) {
                Some(stem) if !self.options.component_extension.is_empty() => format!("{}.js", stem),
                _ => import.source.clone(),
            };
            out.push_str(before);
            out.push_str(&specifier);
            out.push_str(after);
            out.push('\n');
        }
        Ok(out)
    }

    fn props_interface(&mut self) -> Result<String, CompileError> {
        let mut out = format!("export interface {}Props {{\n", self.component.name);
        for prop in &self.component.props {
            let variable = self.component.variable(*prop)?;
            self.runtime_types.insert("Wrapped");
            out.push_str(&format!(
                "  {}?: Wrapped<{}>;\n",
                js_key(&variable.name),
                variable.ty
            ));
        }
        out.push_str("}\n");
        Ok(out)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Component class
    // ───────────────────────────────────────────────────────────────────────

    fn component_class(&mut self) -> Result<String, CompileError> {
        let component = self.component;
        let name = &component.name;
        self.runtime.insert("Component");

        let mut out = format!("export default class {} extends Component {{\n", name);

        for (id, variable) in component.variables.iter().enumerate() {
            let field = self.names.variable(id)?;
            match &variable.init {
                Initializer::Function { code, is_async } => {
                    let text = self.rewriter().rewrite(code, Receiver::Component, Timing::Runtime)?;
                    let prefix = if *is_async { "async " } else { "" };
                    out.push_str(&format!("  {} = {}{};\n", field, prefix, text));
                }
                _ => out.push_str(&self.field(field, &variable.ty, false)),
            }
        }
        out.push_str(&self.body_fields(ParentScope::Component, &component.root)?);
        out.push('\n');

        out.push_str(&self.constructor()?);
        out.push('\n');
        out.push_str(&self.create_factory()?);
        out.push_str(&self.accessors()?);
        out.push('\n');
        out.push_str(&self.lifecycle(ParentScope::Component, &component.root, &COMPONENT_LIFECYCLE)?);
        out.push_str("}\n");
        Ok(out)
    }

    fn constructor(&mut self) -> Result<String, CompileError> {
        let component = self.component;
        let mut params = vec![self.param("slots", "Slots", false)];
        for (k, prop) in component.props.iter().enumerate() {
            let ty = format!("Wrapped<{}>", component.variable(*prop)?.ty);
            params.push(self.param(&format!("$p{}", k), &ty, true));
        }
        self.runtime_types.insert("Slots");

        let visibility = if self.options.emit_types { "private " } else { "" };
        let mut out = format!("  {}constructor({}) {{\n", visibility, params.join(", "));
        out.push_str("    super(slots);\n");

        for step in &component.statements {
            match step {
                ScriptStep::Declare(id) => {
                    let variable = component.variable(*id)?;
                    let field = self.names.variable(*id)?;
                    let init = match &variable.init {
                        Initializer::Expr(code) => Some(format!(
                            "({})",
                            self.rewriter().rewrite(code, Receiver::Component, Timing::Construction)?
                        )),
                        _ => None,
                    };
                    let value = if variable.role == VarRole::Prop {
                        let k = component.props.iter().position(|p| p == id).ok_or_else(|| {
                            CompileError::internal(format!("prop {} missing from props", variable.name))
                        })?;
                        let fallback = match init {
                            Some(init) => init,
                            None => {
                                self.runtime.insert("requiredProperty");
                                format!(
                                    "requiredProperty(\"{}\", \"{}\")",
                                    escape_js_string(&component.name),
                                    escape_js_string(&variable.name)
                                )
                            }
                        };
                        format!("$p{k} !== undefined ? $p{k}.value : {}", fallback, k = k)
                    } else {
                        init.unwrap_or_else(|| "undefined".to_string())
                    };
                    out.push_str(&format!("    this.{} = {};\n", field, value));
                }
                ScriptStep::Execute(code) => {
                    let text = self.rewriter().rewrite(code, Receiver::Component, Timing::Construction)?;
                    out.push_str(&format!("    {}\n", terminate(&text)));
                }
            }
        }
        out.push_str("  }\n");
        Ok(out)
    }

    fn create_factory(&mut self) -> Result<String, CompileError> {
        let component = self.component;
        let name = &component.name;
        let mut args = vec!["slots".to_string()];
        for prop in &component.props {
            let variable = component.variable(*prop)?;
            args.push(match js_key(&variable.name) {
                key if key.starts_with('"') => format!("props[{}]", key),
                key => format!("props.{}", key),
            });
        }
        let signature = if self.options.emit_types {
            format!(
                "static create(props: {name}Props = {{}}, slots: Slots = {{}}): {name}",
                name = name
            )
        } else {
            "static create(props = {}, slots = {})".to_string()
        };
        Ok(format!(
            "  {} {{\n    const component = new {}({});\n    component.createInternal();\n    return component;\n  }}\n",
            signature,
            name,
            args.join(", ")
        ))
    }

    /// A getter per prop and, for mutable props, a setter that compares
    /// against the prop's own slot.
    fn accessors(&mut self) -> Result<String, CompileError> {
        let component = self.component;
        let mut out = String::new();
        for prop in &component.props {
            let variable = component.variable(*prop)?;
            let field = self.names.variable(*prop)?;
            let ret = self.annotation(&variable.ty);
            out.push('\n');
            out.push_str(&format!(
                "  get {}(){} {{\n    return this.{};\n  }}\n",
                variable.name, ret, field
            ));
            if !variable.has_setter() {
                continue;
            }
            out.push_str(&format!(
                "  set {}(value{}) {{\n    if (this.{} === value) return;\n    this.{} = value;\n",
                variable.name, ret, field, field
            ));
            if let Some(bit) = variable.bit {
                let mask = crate::mask::DirtyMask::bit(bit).to_literal(component.wide());
                out.push_str(&format!("    this.invalidate({});\n", mask));
            }
            out.push_str("  }\n");
        }
        Ok(out)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Fragment classes
    // ───────────────────────────────────────────────────────────────────────

    fn fragment_class(&mut self, id: usize) -> Result<String, CompileError> {
        let component = self.component;
        let fragment = component.fragment(id)?;
        self.runtime.insert("Fragment");
        let scope = ParentScope::Fragment(id);

        let mut out = format!(
            "class {} extends Fragment {{\n",
            fragment.class_name(&component.name)
        );
        out.push_str(&self.field("parent", &component.name, false).replace("!:", ":"));
        out.push_str(&self.body_fields(scope, &fragment.body)?);
        out.push('\n');
        out.push_str(&format!(
            "  constructor({}) {{\n    super();\n    this.parent = parent;\n  }}\n\n",
            self.param("parent", &component.name, false)
        ));
        out.push_str(&self.lifecycle(scope, &fragment.body, &FRAGMENT_LIFECYCLE)?);
        out.push_str("}\n");
        Ok(out)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Shared body emission
    // ───────────────────────────────────────────────────────────────────────

    fn body_fields(&mut self, scope: ParentScope, body: &FragmentBody) -> Result<String, CompileError> {
        let names = self.names;
        let class = names.class(scope)?;
        let mut out = String::new();
        for (id, node) in body.nodes.iter().enumerate() {
            let field = class.node(id)?;
            match node {
                ReactiveNode::Element { host_type, .. } => {
                    out.push_str(&self.field(field, host_type.unwrap_or("HTMLElement"), false))
                }
                ReactiveNode::ReactiveText | ReactiveNode::ConstantText { .. } => {
                    out.push_str(&self.field(field, "Text", false))
                }
                ReactiveNode::SubComponent { name, slots, .. } => {
                    out.push_str(&self.field(field, name, false));
                    for (_, fragment) in slots {
                        let holder = class.slot_holder(*fragment)?;
                        let ty = self.component.fragment(*fragment)?.class_name(&self.component.name);
                        out.push_str(&self.field(holder, &ty, false));
                    }
                }
                ReactiveNode::ReactiveIf { .. } => out.push_str(&self.field(field, "IfBlock", false)),
                ReactiveNode::SlotOutlet { fallback, .. } => {
                    let (slot, fallback_field) = class.outlet(id)?;
                    out.push_str(&self.field(slot, "Fragment", true));
                    if let (Some(fragment), Some(fallback_field)) = (fallback, fallback_field) {
                        let ty = self.component.fragment(*fragment)?.class_name(&self.component.name);
                        out.push_str(&self.field(fallback_field, &ty, true));
                    }
                }
            }
        }
        for (index, flow) in body.flows.iter().enumerate() {
            if matches!(flow.action, Action::Listen { .. }) {
                self.runtime_types.insert("Subscription");
                out.push_str(&self.field(class.subscription(index)?, "Subscription", true));
            }
        }
        Ok(out)
    }

    fn lifecycle(
        &mut self,
        scope: ParentScope,
        body: &FragmentBody,
        methods: &Lifecycle,
    ) -> Result<String, CompileError> {
        let names = self.names;
        let class = names.class(scope)?;
        let recv = Receiver::of(scope);
        let mut out = String::new();

        // create
        out.push_str(&format!("  {}(){} {{\n", methods.create, self.annotation("void")));
        for id in 0..body.nodes.len() {
            for line in self.create_node(scope, class, body, id)? {
                out.push_str(&format!("    {}\n", line));
            }
        }
        for (index, flow) in body.flows.iter().enumerate() {
            if matches!(
                flow.action,
                Action::SetAttribute {
                    target: AttributeTarget::Property,
                    ..
                }
            ) {
                continue;
            }
            for line in self.flow_statement(recv, class, index, flow)? {
                out.push_str(&format!("    {}\n", line));
            }
        }
        out.push_str("  }\n\n");

        // mount
        out.push_str(&format!(
            "  {}({}, {}){} {{\n",
            methods.mount,
            self.param("target", "Node", false),
            self.param("anchor", "Node | null", false),
            self.annotation("void")
        ));
        let parents = body.parents();
        for (id, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                let target = format!("this.{}", class.node(*parent)?);
                out.push_str(&format!("    {}\n", self.mount_node(class, body, id, &target, None)?));
            }
        }
        for root in &body.roots {
            out.push_str(&format!(
                "    {}\n",
                self.mount_node(class, body, *root, "target", Some("anchor"))?
            ));
        }
        out.push_str("  }\n\n");

        // update
        let wide = self.component.wide();
        out.push_str(&format!(
            "  update({}){} {{\n",
            self.param("dirty", if wide { "bigint" } else { "number" }, false),
            self.annotation("void")
        ));
        for (index, flow) in body.flows.iter().enumerate() {
            if flow.is_one_off() {
                continue;
            }
            let zero = if wide { "0n" } else { "0" };
            out.push_str(&format!(
                "    if ((dirty & {}) !== {}) {{\n",
                flow.trigger.to_literal(wide),
                zero
            ));
            for line in self.flow_statement(recv, class, index, flow)? {
                out.push_str(&format!("      {}\n", line));
            }
            out.push_str("    }\n");
        }
        for (id, node) in body.nodes.iter().enumerate() {
            match node {
                ReactiveNode::ReactiveIf { .. } => {
                    out.push_str(&format!("    this.{}.update(dirty);\n", class.node(id)?))
                }
                ReactiveNode::SubComponent { slots, .. } => {
                    for (_, fragment) in slots {
                        out.push_str(&format!("    this.{}.update(dirty);\n", class.slot_holder(*fragment)?));
                    }
                }
                ReactiveNode::SlotOutlet { .. } => {
                    if let (_, Some(fallback)) = class.outlet(id)? {
                        out.push_str(&format!("    this.{}?.update(dirty);\n", fallback));
                    }
                }
                _ => {}
            }
        }
        out.push_str("  }\n\n");

        // destroy
        out.push_str(&format!("  {}(){} {{\n", methods.destroy, self.annotation("void")));
        for (index, flow) in body.flows.iter().enumerate() {
            if matches!(flow.action, Action::Listen { .. }) {
                out.push_str(&format!("    this.{}?.dispose();\n", class.subscription(index)?));
            }
        }
        for (id, node) in body.nodes.iter().enumerate() {
            match node {
                ReactiveNode::ReactiveIf { .. } => {
                    out.push_str(&format!("    this.{}.destroy();\n", class.node(id)?))
                }
                ReactiveNode::SubComponent { slots, .. } => {
                    out.push_str(&format!("    this.{}.remove();\n", class.node(id)?));
                    for (_, fragment) in slots {
                        out.push_str(&format!("    this.{}.destroy();\n", class.slot_holder(*fragment)?));
                    }
                }
                ReactiveNode::SlotOutlet { .. } => {
                    if let (_, Some(fallback)) = class.outlet(id)? {
                        out.push_str(&format!("    this.{}?.destroy();\n", fallback));
                    }
                }
                _ => {}
            }
        }
        for root in &body.roots {
            if body.node(*root)?.is_host() {
                out.push_str(&format!("    this.{}.remove();\n", class.node(*root)?));
            }
        }
        out.push_str("  }\n");
        Ok(out)
    }

    fn create_node(
        &mut self,
        scope: ParentScope,
        class: &ClassNames,
        body: &FragmentBody,
        id: NodeId,
    ) -> Result<Vec<String>, CompileError> {
        let component = self.component;
        let recv = Receiver::of(scope);
        let field = class.node(id)?;
        let lines = match body.node(id)? {
            ReactiveNode::Element { tag, svg, .. } => {
                let tag = escape_js_string(tag);
                if *svg {
                    vec![format!(
                        "this.{} = document.createElementNS(\"{}\", \"{}\");",
                        field, SVG_NAMESPACE, tag
                    )]
                } else {
                    vec![format!("this.{} = document.createElement(\"{}\");", field, tag)]
                }
            }
            ReactiveNode::ReactiveText => {
                vec![format!("this.{} = document.createTextNode(\"\");", field)]
            }
            ReactiveNode::ConstantText { value } => vec![format!(
                "this.{} = document.createTextNode(\"{}\");",
                field,
                escape_js_string(value)
            )],
            ReactiveNode::SubComponent { name, params, slots } => {
                let mut lines = Vec::new();
                let mut slot_entries = Vec::new();
                for (slot, fragment) in slots {
                    let holder = class.slot_holder(*fragment)?;
                    let class_name = component.fragment(*fragment)?.class_name(&component.name);
                    lines.push(format!("this.{} = new {}({});", holder, class_name, recv.as_str()));
                    lines.push(format!("this.{}.create();", holder));
                    slot_entries.push(format!("{}: this.{}", js_key(slot), holder));
                }
                let mut props = Vec::new();
                for param in params {
                    props.push(format!(
                        "{}: {{ value: {} }}",
                        js_key(&param.name),
                        self.value(&param.value, recv)?
                    ));
                }
                lines.push(format!(
                    "this.{} = {}.create({}, {});",
                    field,
                    name,
                    object_literal(&props),
                    object_literal(&slot_entries)
                ));
                lines
            }
            ReactiveNode::ReactiveIf {
                conditions,
                branches,
                otherwise,
            } => {
                if conditions.len() != branches.len() {
                    return Err(CompileError::internal(format!(
                        "if block {} has {} conditions for {} branches",
                        field,
                        conditions.len(),
                        branches.len()
                    )));
                }
                self.runtime.insert("IfBlock");
                let mut selector = String::new();
                for (index, condition) in conditions.iter().enumerate() {
                    let text = self.rewriter().rewrite(condition, recv, Timing::Runtime)?;
                    selector.push_str(&format!("({}) ? {} : ", text, index));
                }
                selector.push_str(&conditions.len().to_string());
                let factories = branches
                    .iter()
                    .map(|f| self.factory(*f, recv))
                    .collect::<Result<Vec<_>, _>>()?;
                let otherwise = match otherwise {
                    Some(f) => self.factory(*f, recv)?,
                    None => "null".to_string(),
                };
                vec![format!(
                    "this.{} = new IfBlock(() => {}, [{}], {});",
                    field,
                    selector,
                    factories.join(", "),
                    otherwise
                )]
            }
            ReactiveNode::SlotOutlet { name, fallback } => {
                let (slot, fallback_field) = class.outlet(id)?;
                let mut lines = vec![format!(
                    "this.{} = {}.slot(\"{}\");",
                    slot,
                    recv.as_str(),
                    escape_js_string(name)
                )];
                if let (Some(fragment), Some(fallback_field)) = (fallback, fallback_field) {
                    let class_name = component.fragment(*fragment)?.class_name(&component.name);
                    lines.push(format!(
                        "if (this.{} === undefined) {{ this.{} = new {}({}); this.{}.create(); }}",
                        slot,
                        fallback_field,
                        class_name,
                        recv.as_str(),
                        fallback_field
                    ));
                }
                lines
            }
        };
        Ok(lines)
    }

    fn mount_node(
        &self,
        class: &ClassNames,
        body: &FragmentBody,
        id: NodeId,
        target: &str,
        anchor: Option<&str>,
    ) -> Result<String, CompileError> {
        let field = class.node(id)?;
        let at = anchor.unwrap_or("null");
        Ok(match body.node(id)? {
            ReactiveNode::Element { .. }
            | ReactiveNode::ReactiveText
            | ReactiveNode::ConstantText { .. } => match anchor {
                Some(anchor) => format!("{}.insertBefore(this.{}, {});", target, field, anchor),
                None => format!("{}.appendChild(this.{});", target, field),
            },
            ReactiveNode::ReactiveIf { .. } => format!("this.{}.mount({}, {});", field, target, at),
            ReactiveNode::SubComponent { .. } => {
                format!("this.{}.mountInternal({}, {});", field, target, at)
            }
            ReactiveNode::SlotOutlet { .. } => match class.outlet(id)? {
                (slot, Some(fallback)) => format!(
                    "(this.{} ?? this.{})?.mount({}, {});",
                    slot, fallback, target, at
                ),
                (slot, None) => format!("this.{}?.mount({}, {});", slot, target, at),
            },
        })
    }

    fn flow_statement(
        &mut self,
        recv: Receiver,
        class: &ClassNames,
        index: usize,
        flow: &UpdateFlow,
    ) -> Result<Vec<String>, CompileError> {
        let component = self.component;
        let lines = match &flow.action {
            Action::SetAttribute {
                node,
                target: AttributeTarget::Element,
                name,
                value,
            } => {
                self.runtime.insert("attr");
                vec![format!(
                    "attr(this.{}, \"{}\", {});",
                    class.node(*node)?,
                    escape_js_string(name),
                    self.value(value, recv)?
                )]
            }
            Action::SetAttribute {
                node,
                target: AttributeTarget::Property,
                name,
                value,
            } => vec![format!(
                "this.{}{} = {};",
                class.node(*node)?,
                member(name),
                self.value(value, recv)?
            )],
            Action::SetText { node, value } => vec![format!(
                "this.{}.data = String({});",
                class.node(*node)?,
                self.rewriter().rewrite(value, recv, Timing::Runtime)?
            )],
            Action::Listen {
                node,
                event,
                handler,
                modifiers,
            } => {
                self.runtime.insert("listen");
                let subscription = class.subscription(index)?;
                let handler = self.rewriter().rewrite(handler, recv, Timing::Runtime)?;
                vec![
                    format!("this.{}?.dispose();", subscription),
                    format!(
                        "this.{} = listen(this.{}, \"{}\", {}{});",
                        subscription,
                        class.node(*node)?,
                        escape_js_string(event),
                        self.handler(&handler, modifiers),
                        listener_options(modifiers)
                    ),
                ]
            }
            Action::RunStatement(RunStatement::Derived(id)) => {
                let variable = component.variable(*id)?;
                let Initializer::Expr(code) = &variable.init else {
                    return Err(CompileError::internal(format!(
                        "derived variable {} has no initializer",
                        variable.name
                    )));
                };
                vec![format!(
                    "{}.{} = ({});",
                    recv.as_str(),
                    self.names.variable(*id)?,
                    self.rewriter().rewrite(code, recv, Timing::Runtime)?
                )]
            }
            Action::RunStatement(RunStatement::Reactive(code)) => {
                vec![terminate(&self.rewriter().rewrite(code, recv, Timing::Runtime)?)]
            }
            Action::SelectBranch { node } => vec![format!("this.{}.select();", class.node(*node)?)],
        };
        Ok(lines)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Helpers
    // ───────────────────────────────────────────────────────────────────────

    fn rewriter(&self) -> Rewriter<'_> {
        Rewriter::new(self.source, self.component, self.names)
    }

    fn factory(&self, fragment: usize, recv: Receiver) -> Result<String, CompileError> {
        let class_name = self.component.fragment(fragment)?.class_name(&self.component.name);
        Ok(format!("() => new {}({})", class_name, recv.as_str()))
    }

    fn value(&self, value: &AttributeValue, recv: Receiver) -> Result<String, CompileError> {
        Ok(match value {
            AttributeValue::Static(text) => format!("\"{}\"", escape_js_string(text)),
            AttributeValue::True => "true".to_string(),
            AttributeValue::Expr(code) => {
                format!("({})", self.rewriter().rewrite(code, recv, Timing::Runtime)?)
            }
            AttributeValue::Interpolated(parts) => {
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts {
                    pieces.push(match part {
                        AttributePart::Text(text) => format!("\"{}\"", escape_js_string(text)),
                        AttributePart::Expr(code) => format!(
                            "String({})",
                            self.rewriter().rewrite(code, recv, Timing::Runtime)?
                        ),
                    });
                }
                if pieces.is_empty() {
                    "\"\"".to_string()
                } else {
                    pieces.join(" + ")
                }
            }
        })
    }

    /// Modifiers that act on the event wrap the handler; the rest become
    /// listener options.
    fn handler(&self, handler: &str, modifiers: &[Modifier]) -> String {
        let mut checks = Vec::new();
        for modifier in modifiers {
            match modifier {
                Modifier::SelfOnly => checks.push("if (event.target !== event.currentTarget) return;"),
                Modifier::Trusted => checks.push("if (!event.isTrusted) return;"),
                Modifier::PreventDefault => checks.push("event.preventDefault();"),
                Modifier::StopPropagation => checks.push("event.stopPropagation();"),
                _ => {}
            }
        }
        if checks.is_empty() {
            return handler.to_string();
        }
        format!(
            "((handler) => ({}) => {{ {} handler(event); }})({})",
            self.param("event", "Event", false),
            checks.join(" "),
            handler
        )
    }

    fn field(&self, name: &str, ty: &str, optional: bool) -> String {
        match (self.options.emit_types, optional) {
            (true, true) => format!("  {}?: {};\n", name, ty),
            (true, false) => format!("  {}!: {};\n", name, ty),
            (false, _) => format!("  {};\n", name),
        }
    }

    fn param(&self, name: &str, ty: &str, optional: bool) -> String {
        if !self.options.emit_types {
            return name.to_string();
        }
        format!("{}{}: {}", name, if optional { "?" } else { "" }, ty)
    }

    fn annotation(&self, ty: &str) -> String {
        if self.options.emit_types {
            format!(": {}", ty)
        } else {
            String::new()
        }
    }
}

fn listener_options(modifiers: &[Modifier]) -> String {
    let mut options = Vec::new();
    for modifier in modifiers {
        match modifier {
            Modifier::Once => options.push("once: true"),
            Modifier::Capture => options.push("capture: true"),
            Modifier::Passive => options.push("passive: true"),
            Modifier::NonPassive => options.push("passive: false"),
            _ => {}
        }
    }
    if options.is_empty() {
        String::new()
    } else {
        format!(", {{ {} }}", options.join(", "))
    }
}

fn object_literal(entries: &[String]) -> String {
    if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

/// Object key for a name that may not be an identifier (`data-id`).
fn js_key(name: &str) -> String {
    if IDENTIFIER_RE.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", escape_js_string(name))
    }
}

fn member(name: &str) -> String {
    if IDENTIFIER_RE.is_match(name) {
        format!(".{}", name)
    } else {
        format!("[\"{}\"]", escape_js_string(name))
    }
}

/// Statements copied without their own terminator get one.
fn terminate(statement: &str) -> String {
    let trimmed = statement.trim_end();
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

/// Helper to escape strings for JS
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
