//! Markup IR and the structural validation pass that runs over it.
//!
//! The IR is what Preparation hands to the model builder: element and
//! component tags with their attributes, text, interpolations, folded
//! `{#if}` blocks and slot outlets. Expressions are referenced by index into
//! the prepared expression table; their text is never copied into the IR.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::diagnostics::{
    Diagnostic, DiagnosticSink, SourceSpan, ERR_UNSUPPORTED_DIRECTIVE, ERR_UNSUPPORTED_SLOT,
};
use crate::visitor::{walk_component, walk_element, MarkupVisitor};

/// Index into `PreparedSource::expressions`.
pub type ExprId = usize;

/// Attribute prefixes that are namespaces rather than directives.
const NAMESPACE_PREFIXES: &[&str] = &["xlink", "xml", "xmlns"];

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MarkupNode {
    Element(ElementNode),
    Component(ComponentNode),
    Text(TextNode),
    Expression(ExpressionNode),
    If(IfBlockNode),
    Slot(SlotNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    /// Parsed in the SVG namespace (inside `<svg>` or an SVG-only tag).
    #[serde(default)]
    pub svg: bool,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<MarkupNode>,
    pub location: SourceSpan,
}

impl ElementNode {
    pub fn attribute(&self, name: &str) -> Option<&AttributeIR> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub name: String,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<MarkupNode>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub expression: ExprId,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfBlockNode {
    pub branches: Vec<IfBranch>,
    pub otherwise: Option<Vec<MarkupNode>>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfBranch {
    pub condition: ExprId,
    pub children: Vec<MarkupNode>,
}

/// `<slot name="…">fallback</slot>` inside a component's own markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNode {
    pub name: Option<String>,
    pub fallback: Vec<MarkupNode>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    pub value: AttributeValue,
    pub location: SourceSpan,
}

impl AttributeIR {
    /// `on:click|once` → `Some("click|once")`.
    pub fn event_spec(&self) -> Option<&str> {
        self.name.strip_prefix("on:")
    }

    /// Prefix of a `prefix:name` directive that is not a namespace.
    pub fn directive_prefix(&self) -> Option<&str> {
        let (prefix, _) = self.name.split_once(':')?;
        if NAMESPACE_PREFIXES.contains(&prefix) {
            None
        } else {
            Some(prefix)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AttributeValue {
    Static(String),
    Dynamic(ExprId),
    Interpolated(Vec<AttributePart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AttributePart {
    Text(String),
    Expression(ExprId),
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Reports directive and slot misuse. Every problem is reported; nothing is
/// pruned from the IR, so the model builder still sees the full tree and can
/// batch its own diagnostics.
pub fn validate_markup(nodes: &[MarkupNode], sink: &mut dyn DiagnosticSink) {
    let mut validator = MarkupValidator {
        sink,
        component_depth: 0,
    };
    validator.visit_children(nodes);
}

struct MarkupValidator<'d> {
    sink: &'d mut dyn DiagnosticSink,
    component_depth: usize,
}

impl MarkupValidator<'_> {
    fn check_directive(&mut self, attribute: &AttributeIR, on_component: bool) {
        if attribute.event_spec().is_some() {
            if on_component {
                self.sink.report(
                    Diagnostic::unsupported(
                        ERR_UNSUPPORTED_DIRECTIVE,
                        format!("`{}` cannot be used on a component.", attribute.name),
                        attribute.location,
                    )
                    .with_hint("Pass a callback as a property instead."),
                );
            } else if !matches!(attribute.value, AttributeValue::Dynamic(_)) {
                self.sink.report(Diagnostic::unsupported(
                    ERR_UNSUPPORTED_DIRECTIVE,
                    format!("`{}` needs a handler expression: `{}={{handler}}`.", attribute.name, attribute.name),
                    attribute.location,
                ));
            }
        } else if let Some(prefix) = attribute.directive_prefix() {
            self.sink.report(Diagnostic::unsupported(
                ERR_UNSUPPORTED_DIRECTIVE,
                format!("Unknown directive `{}:` in `{}`.", prefix, attribute.name),
                attribute.location,
            ));
        }
    }

    fn check_slot_names(&mut self, component: &ComponentNode) {
        let mut seen = HashSet::new();
        let mut has_default = false;
        for child in &component.children {
            let slot = match child {
                MarkupNode::Element(el) => el.attribute("slot"),
                _ => None,
            };
            match slot {
                Some(AttributeIR {
                    value: AttributeValue::Static(name),
                    location,
                    ..
                }) => {
                    if !seen.insert(name.clone()) || (name == "default" && has_default) {
                        self.sink.report(Diagnostic::unsupported(
                            ERR_UNSUPPORTED_SLOT,
                            format!("Slot `{}` is filled more than once in <{}>.", name, component.name),
                            *location,
                        ));
                    }
                }
                Some(other) => self.sink.report(Diagnostic::unsupported(
                    ERR_UNSUPPORTED_SLOT,
                    "Slot names must be static text.",
                    other.location,
                )),
                None => {
                    if !is_blank(child) {
                        has_default = true;
                        if seen.contains("default") {
                            self.sink.report(Diagnostic::unsupported(
                                ERR_UNSUPPORTED_SLOT,
                                format!("Slot `default` is filled more than once in <{}>.", component.name),
                                component.location,
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn is_blank(node: &MarkupNode) -> bool {
    matches!(node, MarkupNode::Text(t) if t.value.trim().is_empty())
}

impl MarkupVisitor for MarkupValidator<'_> {
    fn visit_element(&mut self, element: &ElementNode) {
        for attribute in &element.attributes {
            self.check_directive(attribute, false);
        }
        // Only direct children of a component see a non-zero depth.
        if self.component_depth == 0 {
            if let Some(slot) = element.attribute("slot") {
                self.sink.report(Diagnostic::unsupported(
                    ERR_UNSUPPORTED_SLOT,
                    "`slot` is only valid on a direct child of a component.",
                    slot.location,
                ));
            }
        }
        let depth = std::mem::replace(&mut self.component_depth, 0);
        walk_element(self, element);
        self.component_depth = depth;
    }

    fn visit_component(&mut self, component: &ComponentNode) {
        for attribute in &component.attributes {
            self.check_directive(attribute, true);
        }
        self.check_slot_names(component);
        self.component_depth += 1;
        walk_component(self, component);
        self.component_depth -= 1;
    }

    fn visit_slot(&mut self, slot: &SlotNode) {
        let depth = std::mem::replace(&mut self.component_depth, 0);
        crate::visitor::walk_slot(self, slot);
        self.component_depth = depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticKind, Diagnostics};

    fn attr(name: &str, value: AttributeValue) -> AttributeIR {
        AttributeIR {
            name: name.to_string(),
            value,
            location: SourceSpan::at(0),
        }
    }

    fn element(tag: &str, attributes: Vec<AttributeIR>, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::Element(ElementNode {
            tag: tag.to_string(),
            svg: false,
            attributes,
            children,
            location: SourceSpan::at(0),
        })
    }

    fn run(nodes: &[MarkupNode]) -> Vec<Diagnostic> {
        let mut diagnostics = Diagnostics::new();
        validate_markup(nodes, &mut diagnostics);
        diagnostics.finish("")
    }

    #[test]
    fn test_unknown_directive_reported() {
        let nodes = vec![element(
            "input",
            vec![attr("bind:value", AttributeValue::Dynamic(0))],
            vec![],
        )];
        let diags = run(&nodes);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnsupportedConstruct);
        assert!(diags[0].message.contains("bind:"));
    }

    #[test]
    fn test_namespaced_attributes_are_not_directives() {
        let nodes = vec![element(
            "use",
            vec![attr("xlink:href", AttributeValue::Static("#icon".into()))],
            vec![],
        )];
        assert!(run(&nodes).is_empty());
    }

    #[test]
    fn test_event_needs_expression() {
        let nodes = vec![element(
            "button",
            vec![attr("on:click", AttributeValue::Static(String::new()))],
            vec![],
        )];
        assert_eq!(run(&nodes).len(), 1);
    }

    #[test]
    fn test_slot_attribute_placement() {
        let misplaced = vec![element(
            "div",
            vec![attr("slot", AttributeValue::Static("header".into()))],
            vec![],
        )];
        assert_eq!(run(&misplaced).len(), 1);

        let placed = vec![MarkupNode::Component(ComponentNode {
            name: "Card".into(),
            attributes: vec![],
            children: vec![element(
                "h1",
                vec![attr("slot", AttributeValue::Static("header".into()))],
                vec![],
            )],
            location: SourceSpan::at(0),
        })];
        assert!(run(&placed).is_empty());
    }

    #[test]
    fn test_duplicate_slot_names() {
        let nodes = vec![MarkupNode::Component(ComponentNode {
            name: "Card".into(),
            attributes: vec![],
            children: vec![
                element("h1", vec![attr("slot", AttributeValue::Static("header".into()))], vec![]),
                element("h2", vec![attr("slot", AttributeValue::Static("header".into()))], vec![]),
            ],
            location: SourceSpan::at(0),
        })];
        let diags = run(&nodes);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("header"));
    }

    #[test]
    fn test_events_on_components_rejected() {
        let nodes = vec![MarkupNode::Component(ComponentNode {
            name: "Card".into(),
            attributes: vec![attr("on:select", AttributeValue::Dynamic(0))],
            children: vec![],
            location: SourceSpan::at(0),
        })];
        assert_eq!(run(&nodes).len(), 1);
    }
}
