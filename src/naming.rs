//! Deterministic names for generated fields.
//!
//! Variables get `vN` (functions `fN`) in declaration order. Every class,
//! the component and each fragment, numbers its own nodes `nN` in tree order
//! and its remaining fields `mN`: slot holders and fallbacks in node order,
//! then event subscriptions in flow order.

use std::collections::HashMap;

use crate::diagnostics::CompileError;
use crate::model::{
    Action, FragmentBody, FragmentId, NodeId, ParentScope, ReactiveNode, ResolvedComponent, VarId,
};

#[derive(Debug, Default)]
struct Counter {
    next: HashMap<char, usize>,
}

impl Counter {
    fn next(&mut self, prefix: char) -> String {
        let n = self.next.entry(prefix).or_insert(0);
        let name = format!("{}{}", prefix, n);
        *n += 1;
        name
    }
}

/// Field names of one generated class.
#[derive(Debug, Default, Clone)]
pub struct ClassNames {
    pub nodes: Vec<String>,
    /// Holder of each slot fragment this class passes to a sub-component.
    pub slot_holders: HashMap<FragmentId, String>,
    /// Per slot outlet: the resolved slot, and the fallback if there is one.
    pub outlets: HashMap<NodeId, (String, Option<String>)>,
    /// Per `Listen` flow index.
    pub subscriptions: HashMap<usize, String>,
}

impl ClassNames {
    pub fn node(&self, id: NodeId) -> Result<&str, CompileError> {
        self.nodes
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| CompileError::internal(format!("unnamed node {}", id)))
    }

    pub fn subscription(&self, flow: usize) -> Result<&str, CompileError> {
        self.subscriptions
            .get(&flow)
            .map(String::as_str)
            .ok_or_else(|| CompileError::internal(format!("unnamed subscription for flow {}", flow)))
    }

    pub fn slot_holder(&self, fragment: FragmentId) -> Result<&str, CompileError> {
        self.slot_holders
            .get(&fragment)
            .map(String::as_str)
            .ok_or_else(|| CompileError::internal(format!("unnamed slot fragment {}", fragment)))
    }

    pub fn outlet(&self, node: NodeId) -> Result<(&str, Option<&str>), CompileError> {
        self.outlets
            .get(&node)
            .map(|(slot, fallback)| (slot.as_str(), fallback.as_deref()))
            .ok_or_else(|| CompileError::internal(format!("unnamed slot outlet {}", node)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct Names {
    variables: Vec<String>,
    component: ClassNames,
    fragments: Vec<ClassNames>,
}

impl Names {
    pub fn allocate(component: &ResolvedComponent) -> Self {
        let mut counter = Counter::default();
        let variables = component
            .variables
            .iter()
            .map(|v| counter.next(if v.is_function() { 'f' } else { 'v' }))
            .collect();
        Self {
            variables,
            component: name_class(&component.root),
            fragments: component.fragments.iter().map(|f| name_class(&f.body)).collect(),
        }
    }

    pub fn variable(&self, id: VarId) -> Result<&str, CompileError> {
        self.variables
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| CompileError::internal(format!("unnamed variable {}", id)))
    }

    pub fn class(&self, scope: ParentScope) -> Result<&ClassNames, CompileError> {
        match scope {
            ParentScope::Component => Ok(&self.component),
            ParentScope::Fragment(id) => self
                .fragments
                .get(id)
                .ok_or_else(|| CompileError::internal(format!("unnamed fragment {}", id))),
        }
    }
}

fn name_class(body: &FragmentBody) -> ClassNames {
    let mut counter = Counter::default();
    let mut names = ClassNames {
        nodes: body.nodes.iter().map(|_| counter.next('n')).collect(),
        ..ClassNames::default()
    };
    for (id, node) in body.nodes.iter().enumerate() {
        match node {
            ReactiveNode::SubComponent { slots, .. } => {
                for (_, fragment) in slots {
                    names.slot_holders.insert(*fragment, counter.next('m'));
                }
            }
            ReactiveNode::SlotOutlet { fallback, .. } => {
                let slot = counter.next('m');
                let fallback = fallback.map(|_| counter.next('m'));
                names.outlets.insert(id, (slot, fallback));
            }
            _ => {}
        }
    }
    for (index, flow) in body.flows.iter().enumerate() {
        if matches!(flow.action, Action::Listen { .. }) {
            names.subscriptions.insert(index, counter.next('m'));
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_per_prefix() {
        let mut counter = Counter::default();
        assert_eq!(counter.next('v'), "v0");
        assert_eq!(counter.next('f'), "f0");
        assert_eq!(counter.next('v'), "v1");
        assert_eq!(counter.next('m'), "m0");
    }

    #[test]
    fn test_class_names_follow_tree_then_flow_order() {
        let body = FragmentBody {
            nodes: vec![
                ReactiveNode::SlotOutlet {
                    name: "default".into(),
                    fallback: Some(0),
                },
                ReactiveNode::ReactiveText,
            ],
            roots: vec![0, 1],
            flows: vec![],
        };
        let names = name_class(&body);
        assert_eq!(names.nodes, vec!["n0", "n1"]);
        assert_eq!(names.outlet(0).ok(), Some(("m0", Some("m1"))));
        assert!(names.outlet(1).is_err());
    }
}
