//! The reactive model handed from the resolver to the generator.
//!
//! Everything here is built once per file and read-only afterwards. Cross
//! references are plain indices (`VarId`, `NodeId`, `FragmentId`) into the
//! owning vectors; nothing is shared through `Rc`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::diagnostics::{CompileError, SourceSpan};
use crate::mask::{DirtyMask, NUMBER_MASK_BITS};

/// Index into `ResolvedComponent::variables`.
pub type VarId = usize;
/// Index into `FragmentBody::nodes` of the body that owns the node.
pub type NodeId = usize;
/// Index into `ResolvedComponent::fragments`.
pub type FragmentId = usize;

// ═══════════════════════════════════════════════════════════════════════════════
// VARIABLES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Let,
    Var,
    Const,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarRole {
    Plain,
    DerivedReactive,
    Prop,
}

#[derive(Debug, Clone)]
pub enum Initializer {
    None,
    Expr(Code),
    /// Parameters and body, copied out as an arrow function.
    Function { code: Code, is_async: bool },
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub declaration: SourceSpan,
    pub ty: String,
    pub kind: VarKind,
    pub mutable: bool,
    pub role: VarRole,
    pub bit: Option<u32>,
    pub init: Initializer,
}

impl Variable {
    /// Whether writes to this variable must flag a dirty bit.
    pub fn tracked(&self) -> bool {
        self.bit.is_some()
    }

    pub fn is_function(&self) -> bool {
        self.kind == VarKind::Function
    }

    /// Mutable props get a setter; read-only ones only a getter.
    pub fn has_setter(&self) -> bool {
        self.role == VarRole::Prop && self.mutable
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CODE
// ═══════════════════════════════════════════════════════════════════════════════

/// A verbatim source range plus what has to change when it is copied out.
#[derive(Debug, Clone, Default)]
pub struct Code {
    pub span: SourceSpan,
    pub refs: Vec<SlotRef>,
    pub mutations: Vec<Mutation>,
    pub inserts: Vec<(u32, String)>,
}

/// A reference to component state that is rewritten to its slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotRef {
    pub span: SourceSpan,
    pub var: VarId,
    pub shorthand: bool,
}

/// An assignment or update touching component state.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub span: SourceSpan,
    pub targets: Vec<VarId>,
    /// Runs later inside a nested function rather than when the code runs.
    pub deferred: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum AttributeValue {
    Static(String),
    /// Valueless attribute on a component: passed as `true`.
    True,
    Expr(Code),
    Interpolated(Vec<AttributePart>),
}

#[derive(Debug, Clone)]
pub enum AttributePart {
    Text(String),
    Expr(Code),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone)]
pub enum ReactiveNode {
    Element {
        tag: String,
        host_type: Option<&'static str>,
        svg: bool,
        attributes: Vec<String>,
        events: Vec<String>,
        children: Vec<NodeId>,
    },
    ReactiveText,
    ConstantText {
        value: String,
    },
    SubComponent {
        name: String,
        params: Vec<Param>,
        /// Slot name → fragment, in source order.
        slots: Vec<(String, FragmentId)>,
    },
    ReactiveIf {
        conditions: Vec<Code>,
        branches: Vec<FragmentId>,
        otherwise: Option<FragmentId>,
    },
    SlotOutlet {
        name: String,
        fallback: Option<FragmentId>,
    },
}

impl ReactiveNode {
    /// Host nodes are DOM nodes this body creates directly; the rest delegate
    /// mounting to a nested object.
    pub fn is_host(&self) -> bool {
        matches!(
            self,
            ReactiveNode::Element { .. } | ReactiveNode::ReactiveText | ReactiveNode::ConstantText { .. }
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FLOWS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    Element,
    /// A sub-component property, written through its setter.
    Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Once,
    PreventDefault,
    StopPropagation,
    Trusted,
    SelfOnly,
    Passive,
    NonPassive,
    Capture,
}

impl Modifier {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "once" => Modifier::Once,
            "preventdefault" => Modifier::PreventDefault,
            "stoppropagation" => Modifier::StopPropagation,
            "trusted" => Modifier::Trusted,
            "self" => Modifier::SelfOnly,
            "passive" => Modifier::Passive,
            "nonpassive" => Modifier::NonPassive,
            "capture" => Modifier::Capture,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Once => "once",
            Modifier::PreventDefault => "preventDefault",
            Modifier::StopPropagation => "stopPropagation",
            Modifier::Trusted => "trusted",
            Modifier::SelfOnly => "self",
            Modifier::Passive => "passive",
            Modifier::NonPassive => "nonpassive",
            Modifier::Capture => "capture",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunStatement {
    /// Recompute a derived variable from its initializer.
    Derived(VarId),
    /// A `$:` statement.
    Reactive(Code),
}

#[derive(Debug, Clone)]
pub enum Action {
    SetAttribute {
        node: NodeId,
        target: AttributeTarget,
        name: String,
        value: AttributeValue,
    },
    SetText {
        node: NodeId,
        value: Code,
    },
    Listen {
        node: NodeId,
        event: String,
        handler: Code,
        modifiers: Vec<Modifier>,
    },
    RunStatement(RunStatement),
    SelectBranch {
        node: NodeId,
    },
}

#[derive(Debug, Clone)]
pub struct UpdateFlow {
    pub trigger: DirtyMask,
    /// Every variable the action reads, derived variables expanded.
    pub reads: Vec<VarId>,
    pub action: Action,
}

impl UpdateFlow {
    /// Runs once at creation and never again.
    pub fn is_one_off(&self) -> bool {
        self.trigger.is_empty()
    }

    /// Whether `update(dirty)` re-runs this flow.
    pub fn fires(&self, dirty: &DirtyMask) -> bool {
        !self.is_one_off() && self.trigger.intersects(dirty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAGMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct FragmentBody {
    pub nodes: Vec<ReactiveNode>,
    pub roots: Vec<NodeId>,
    pub flows: Vec<UpdateFlow>,
}

impl FragmentBody {
    pub fn node(&self, id: NodeId) -> Result<&ReactiveNode, CompileError> {
        self.nodes
            .get(id)
            .ok_or_else(|| CompileError::internal(format!("dangling node reference n{}", id)))
    }

    /// Parent element of every non-root node.
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if let ReactiveNode::Element { children, .. } = node {
                for child in children {
                    if let Some(slot) = parents.get_mut(*child) {
                        *slot = Some(id);
                    }
                }
            }
        }
        parents
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    Component,
    Fragment(FragmentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOrigin {
    Branch { block: usize, index: usize },
    Otherwise { block: usize },
    Slot { slot: usize, name: String },
    Fallback { outlet: usize },
}

/// A nested node tree with its own lifecycle, owned by the component.
#[derive(Debug, Clone)]
pub struct SubFragment {
    pub id: FragmentId,
    pub enclosing: ParentScope,
    pub origin: FragmentOrigin,
    pub body: FragmentBody,
}

impl SubFragment {
    pub fn class_name(&self, component: &str) -> String {
        match &self.origin {
            FragmentOrigin::Branch { block, index } => {
                format!("{}$If{}$Branch{}", component, block, index)
            }
            FragmentOrigin::Otherwise { block } => format!("{}$If{}$Else", component, block),
            FragmentOrigin::Slot { slot, name } => {
                format!("{}$Slot{}${}", component, slot, sanitize_identifier(name))
            }
            FragmentOrigin::Fallback { outlet } => {
                format!("{}$Outlet{}$Fallback", component, outlet)
            }
        }
    }
}

fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ModuleImport {
    pub span: SourceSpan,
    pub source: String,
    pub source_span: SourceSpan,
    pub type_only: bool,
}

/// Constructor-time work, in declaration order.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Declare(VarId),
    Execute(Code),
}

#[derive(Debug, Clone)]
pub struct ResolvedComponent {
    pub name: String,
    pub variables: Vec<Variable>,
    pub imports: Vec<ModuleImport>,
    pub hoisted: Vec<SourceSpan>,
    pub statements: Vec<ScriptStep>,
    pub root: FragmentBody,
    pub fragments: Vec<SubFragment>,
    pub props: Vec<VarId>,
    /// Number of bits in use.
    pub width: u32,
}

impl ResolvedComponent {
    pub fn variable(&self, id: VarId) -> Result<&Variable, CompileError> {
        self.variables
            .get(id)
            .ok_or_else(|| CompileError::internal(format!("dangling variable reference {}", id)))
    }

    pub fn fragment(&self, id: FragmentId) -> Result<&SubFragment, CompileError> {
        self.fragments
            .get(id)
            .ok_or_else(|| CompileError::internal(format!("dangling fragment reference {}", id)))
    }

    pub fn variable_named(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Masks above 31 bits are emitted as `bigint`.
    pub fn wide(&self) -> bool {
        self.width > NUMBER_MASK_BITS
    }

    pub fn mask_of(&self, vars: &[VarId]) -> DirtyMask {
        vars.iter()
            .filter_map(|v| self.variables.get(*v).and_then(|v| v.bit))
            .collect()
    }

    pub fn bits(&self) -> BTreeMap<String, u32> {
        self.variables
            .iter()
            .filter_map(|v| v.bit.map(|b| (v.name.clone(), b)))
            .collect()
    }

    /// Every body with the scope its code runs in.
    pub fn bodies(&self) -> impl Iterator<Item = (ParentScope, &FragmentBody)> {
        std::iter::once((ParentScope::Component, &self.root)).chain(
            self.fragments
                .iter()
                .map(|f| (ParentScope::Fragment(f.id), &f.body)),
        )
    }

    pub fn flows(&self) -> impl Iterator<Item = &UpdateFlow> {
        self.bodies().flat_map(|(_, body)| body.flows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_parsing_is_case_insensitive() {
        assert_eq!(Modifier::parse("preventDefault"), Some(Modifier::PreventDefault));
        assert_eq!(Modifier::parse("preventdefault"), Some(Modifier::PreventDefault));
        assert_eq!(Modifier::parse("self"), Some(Modifier::SelfOnly));
        assert_eq!(Modifier::parse("debounce"), None);
        assert_eq!(Modifier::StopPropagation.as_str(), "stopPropagation");
    }

    #[test]
    fn test_one_off_flow_never_fires() {
        let flow = UpdateFlow {
            trigger: DirtyMask::empty(),
            reads: vec![],
            action: Action::SelectBranch { node: 0 },
        };
        assert!(flow.is_one_off());
        assert!(!flow.fires(&DirtyMask::bit(0)));
    }

    #[test]
    fn test_fragment_class_names() {
        let fragment = |origin| SubFragment {
            id: 0,
            enclosing: ParentScope::Component,
            origin,
            body: FragmentBody::default(),
        };
        assert_eq!(
            fragment(FragmentOrigin::Branch { block: 0, index: 1 }).class_name("Counter"),
            "Counter$If0$Branch1"
        );
        assert_eq!(
            fragment(FragmentOrigin::Otherwise { block: 2 }).class_name("Counter"),
            "Counter$If2$Else"
        );
        assert_eq!(
            fragment(FragmentOrigin::Slot { slot: 0, name: "side-bar".into() }).class_name("Card"),
            "Card$Slot0$side_bar"
        );
        assert_eq!(
            fragment(FragmentOrigin::Fallback { outlet: 1 }).class_name("Card"),
            "Card$Outlet1$Fallback"
        );
    }
}
