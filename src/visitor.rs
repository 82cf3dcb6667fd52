use crate::validate::{
    AttributeIR, ComponentNode, ElementNode, ExpressionNode, IfBlockNode, MarkupNode, SlotNode,
    TextNode,
};

/// The single traversal mechanism for the markup IR.
///
/// Rules:
/// 1. Traversal order is document order and fixed.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue traversal
///    unless pruning is intended.
pub trait MarkupVisitor {
    fn visit_children(&mut self, children: &[MarkupNode]) {
        walk_children(self, children);
    }

    fn visit_node(&mut self, node: &MarkupNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &ElementNode) {
        walk_element(self, element);
    }

    fn visit_component(&mut self, component: &ComponentNode) {
        walk_component(self, component);
    }

    fn visit_attribute(&mut self, _attribute: &AttributeIR) {}

    fn visit_text(&mut self, _text: &TextNode) {}

    fn visit_expression(&mut self, _expression: &ExpressionNode) {}

    fn visit_if_block(&mut self, block: &IfBlockNode) {
        walk_if_block(self, block);
    }

    fn visit_slot(&mut self, slot: &SlotNode) {
        walk_slot(self, slot);
    }
}

pub fn walk_children<V: MarkupVisitor + ?Sized>(visitor: &mut V, children: &[MarkupNode]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: MarkupVisitor + ?Sized>(visitor: &mut V, node: &MarkupNode) {
    match node {
        MarkupNode::Element(el) => visitor.visit_element(el),
        MarkupNode::Component(c) => visitor.visit_component(c),
        MarkupNode::Text(t) => visitor.visit_text(t),
        MarkupNode::Expression(e) => visitor.visit_expression(e),
        MarkupNode::If(b) => visitor.visit_if_block(b),
        MarkupNode::Slot(s) => visitor.visit_slot(s),
    }
}

pub fn walk_element<V: MarkupVisitor + ?Sized>(visitor: &mut V, element: &ElementNode) {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute);
    }
    visitor.visit_children(&element.children);
}

pub fn walk_component<V: MarkupVisitor + ?Sized>(visitor: &mut V, component: &ComponentNode) {
    for attribute in &component.attributes {
        visitor.visit_attribute(attribute);
    }
    visitor.visit_children(&component.children);
}

pub fn walk_if_block<V: MarkupVisitor + ?Sized>(visitor: &mut V, block: &IfBlockNode) {
    for branch in &block.branches {
        visitor.visit_children(&branch.children);
    }
    if let Some(otherwise) = &block.otherwise {
        visitor.visit_children(otherwise);
    }
}

pub fn walk_slot<V: MarkupVisitor + ?Sized>(visitor: &mut V, slot: &SlotNode) {
    visitor.visit_children(&slot.fallback);
}
