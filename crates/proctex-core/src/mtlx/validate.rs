//! Structural validation of MaterialX documents

use super::{Document, Node, NodeGraph, Port, Source};
use std::fmt;

/// Problems found while validating a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, message: String) {
        self.errors.push(message);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid");
        }
        write!(f, "{}", self.errors.join("; "))
    }
}

/// Elements a port's connection may point at
struct Scope<'a> {
    doc: &'a Document,
    graph: Option<&'a NodeGraph>,
}

impl Scope<'_> {
    fn node(&self, name: &str) -> Option<&Node> {
        match self.graph {
            Some(graph) => graph.node(name),
            None => self.doc.node(name),
        }
    }

    fn check_port(&self, report: &mut ValidationReport, path: &str, port: &Port) {
        if port.port_type.is_empty() {
            report.push(format!("{path}: missing type"));
        }
        match port.source() {
            Source::Interface(name) => {
                let found = self.graph.is_some_and(|g| g.inputs.contains_key(name));
                if !found {
                    report.push(format!("{path}: interface input '{name}' not found"));
                }
            }
            Source::Node { name, output } => match self.node(name) {
                None => report.push(format!("{path}: node '{name}' not found")),
                Some(node) => {
                    if let Some(output) = output {
                        let declared = node.outputs.contains_key(output)
                            || self
                                .doc
                                .node_def_for(node)
                                .is_some_and(|def| def.outputs.contains_key(output));
                        if !declared {
                            report.push(format!(
                                "{path}: node '{name}' has no output '{output}'"
                            ));
                        }
                    }
                }
            },
            Source::NodeGraph { name, output } => match self.doc.node_graph(name) {
                None => report.push(format!("{path}: node graph '{name}' not found")),
                Some(graph) => {
                    if let Some(output) = output {
                        if !graph.outputs.contains_key(output) {
                            report.push(format!(
                                "{path}: node graph '{name}' has no output '{output}'"
                            ));
                        }
                    }
                }
            },
            Source::Value(_) | Source::Unset => {}
        }
    }

    fn check_node(&self, report: &mut ValidationReport, path: &str, node: &Node) {
        if node.node_type.is_empty() {
            report.push(format!("{path}: missing type"));
        }
        for input in node.inputs.values() {
            self.check_port(report, &format!("{path}/{}", input.name), input);
        }
    }
}

impl Document {
    /// Check that every connection resolves and every element is typed
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for graph in self.node_graphs.values() {
            let scope = Scope {
                doc: self,
                graph: Some(graph),
            };
            if graph.outputs.is_empty() {
                report.push(format!("{}: node graph has no outputs", graph.name));
            }
            for input in graph.inputs.values() {
                scope.check_port(&mut report, &graph.child_path(&input.name), input);
            }
            for node in graph.nodes.values() {
                scope.check_node(&mut report, &graph.child_path(&node.name), node);
            }
            for output in graph.outputs.values() {
                scope.check_port(&mut report, &graph.child_path(&output.name), output);
            }
        }

        let scope = Scope {
            doc: self,
            graph: None,
        };
        for node in self.nodes.values() {
            scope.check_node(&mut report, &node.name, node);
        }

        report
    }
}
