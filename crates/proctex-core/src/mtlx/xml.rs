//! MaterialX XML reading and writing
//!
//! Reading goes through a small generic element tree built with quick-xml,
//! then into the typed model. Writing builds the same tree from the model
//! and prints it.

// String writing is infallible, so .expect() is safe here
#![allow(clippy::expect_used)]

use super::{AttributeBag, Document, Node, NodeDef, NodeGraph, Port, attr};
use crate::{Error, Result};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write;
use std::path::Path;

/// Helper macro for writing to a String buffer.
/// String writing is infallible, so we use `expect()` with a clear message.
macro_rules! write_str {
    ($dst:expr, $($arg:tt)*) => {
        write!($dst, $($arg)*).expect("String write is infallible")
    };
}

const ROOT_TAG: &str = "materialx";
const NODEDEF_TAG: &str = "nodedef";
const NODEGRAPH_TAG: &str = "nodegraph";
const INPUT_TAG: &str = "input";
const OUTPUT_TAG: &str = "output";

/// Generic XML element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    fn push_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn take_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    fn take_name(&mut self) -> Result<String> {
        self.take_attribute(attr::NAME).ok_or_else(|| {
            Error::XmlStructure(format!("<{}> element without a name", self.tag))
        })
    }
}

// ============================================================================
// Reading
// ============================================================================

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(&tag);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| Error::XmlStructure(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value).into_owned();
        let value = unescape(&raw)
            .map_err(|e| Error::XmlStructure(e.to_string()))?
            .into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Parse XML text into an element tree
pub fn parse_tree(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::XmlStructure("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlStructure("unclosed element at end of input".into()));
    }
    root.ok_or_else(|| Error::XmlStructure("document has no root element".into()))
}

fn port_from_element(mut element: XmlElement) -> Result<Port> {
    let name = element.take_name()?;
    let port_type = element.take_attribute(attr::TYPE).unwrap_or_default();
    let value = element.take_attribute(attr::VALUE);
    Ok(Port {
        name,
        port_type,
        value,
        attributes: element.attributes,
    })
}

type Ports = IndexMap<String, Port>;

/// Split children into inputs and outputs, handing anything else back
fn take_ports(children: Vec<XmlElement>) -> Result<(Ports, Ports, Vec<XmlElement>)> {
    let mut inputs = IndexMap::new();
    let mut outputs = IndexMap::new();
    let mut rest = Vec::new();
    for child in children {
        match child.tag.as_str() {
            INPUT_TAG => {
                let port = port_from_element(child)?;
                inputs.insert(port.name.clone(), port);
            }
            OUTPUT_TAG => {
                let port = port_from_element(child)?;
                outputs.insert(port.name.clone(), port);
            }
            _ => rest.push(child),
        }
    }
    Ok((inputs, outputs, rest))
}

fn node_from_element(mut element: XmlElement) -> Result<Node> {
    let name = element.take_name()?;
    let node_type = element.take_attribute(attr::TYPE).unwrap_or_default();
    let (inputs, outputs, rest) = take_ports(std::mem::take(&mut element.children))?;
    for child in rest {
        tracing::debug!(node = %name, tag = %child.tag, "Ignoring unsupported node child");
    }
    Ok(Node {
        name,
        category: element.tag,
        node_type,
        attributes: element.attributes,
        inputs,
        outputs,
    })
}

fn node_def_from_element(mut element: XmlElement) -> Result<NodeDef> {
    let name = element.take_name()?;
    let node = element.take_attribute(attr::NODE).ok_or_else(|| {
        Error::XmlStructure(format!("nodedef {name} does not name a node category"))
    })?;
    let (inputs, outputs, _) = take_ports(std::mem::take(&mut element.children))?;
    Ok(NodeDef {
        name,
        node,
        attributes: element.attributes,
        inputs,
        outputs,
    })
}

fn node_graph_from_element(mut element: XmlElement) -> Result<NodeGraph> {
    let name = element.take_name()?;
    let (inputs, outputs, rest) = take_ports(std::mem::take(&mut element.children))?;
    let mut graph = NodeGraph {
        name,
        attributes: element.attributes,
        inputs,
        outputs,
        nodes: IndexMap::new(),
    };
    for child in rest {
        graph.add_node(node_from_element(child)?);
    }
    Ok(graph)
}

fn document_from_element(mut root: XmlElement) -> Result<Document> {
    if root.tag != ROOT_TAG {
        return Err(Error::XmlStructure(format!(
            "expected <{ROOT_TAG}> root, found <{}>",
            root.tag
        )));
    }

    let mut doc = Document::new();
    doc.attributes.extend(std::mem::take(&mut root.attributes));
    for child in root.children {
        match child.tag.as_str() {
            NODEDEF_TAG => doc.add_node_def(node_def_from_element(child)?),
            NODEGRAPH_TAG => doc.add_node_graph(node_graph_from_element(child)?),
            INPUT_TAG | OUTPUT_TAG => {
                tracing::warn!(tag = %child.tag, "Ignoring top-level port");
            }
            _ => doc.add_node(node_from_element(child)?),
        }
    }
    Ok(doc)
}

/// Read a MaterialX document from XML text
pub fn read_document(xml: &str) -> Result<Document> {
    document_from_element(parse_tree(xml)?)
}

/// Read a MaterialX document from a file
pub fn read_document_file(path: &Path) -> Result<Document> {
    let xml = std::fs::read_to_string(path)?;
    read_document(&xml)
}

/// Load the node definitions declared in a MaterialX file
pub fn load_library_file(path: &Path) -> Result<Vec<NodeDef>> {
    let doc = read_document_file(path)?;
    Ok(doc.node_defs.into_values().collect())
}

// ============================================================================
// Writing
// ============================================================================

fn push_bag(element: &mut XmlElement, bag: &AttributeBag) {
    for (name, value) in bag {
        element.push_attribute(name, value);
    }
}

fn port_element(tag: &str, port: &Port) -> XmlElement {
    let mut element = XmlElement::new(tag);
    element.push_attribute(attr::NAME, &port.name);
    element.push_attribute(attr::TYPE, &port.port_type);
    if let Some(value) = &port.value {
        element.push_attribute(attr::VALUE, value);
    }
    push_bag(&mut element, &port.attributes);
    element
}

fn push_ports(element: &mut XmlElement, inputs: &Ports, outputs: &Ports) {
    element
        .children
        .extend(inputs.values().map(|p| port_element(INPUT_TAG, p)));
    element
        .children
        .extend(outputs.values().map(|p| port_element(OUTPUT_TAG, p)));
}

fn node_element(node: &Node) -> XmlElement {
    let mut element = XmlElement::new(&node.category);
    element.push_attribute(attr::NAME, &node.name);
    element.push_attribute(attr::TYPE, &node.node_type);
    push_bag(&mut element, &node.attributes);
    push_ports(&mut element, &node.inputs, &node.outputs);
    element
}

fn node_def_element(def: &NodeDef) -> XmlElement {
    let mut element = XmlElement::new(NODEDEF_TAG);
    element.push_attribute(attr::NAME, &def.name);
    element.push_attribute(attr::NODE, &def.node);
    push_bag(&mut element, &def.attributes);
    push_ports(&mut element, &def.inputs, &def.outputs);
    element
}

fn node_graph_element(graph: &NodeGraph) -> XmlElement {
    let mut element = XmlElement::new(NODEGRAPH_TAG);
    element.push_attribute(attr::NAME, &graph.name);
    push_bag(&mut element, &graph.attributes);
    element
        .children
        .extend(graph.inputs.values().map(|p| port_element(INPUT_TAG, p)));
    element.children.extend(graph.nodes.values().map(node_element));
    element
        .children
        .extend(graph.outputs.values().map(|p| port_element(OUTPUT_TAG, p)));
    element
}

/// Build the element tree for a document, leaving out library definitions
pub fn document_tree(doc: &Document) -> XmlElement {
    let mut root = XmlElement::new(ROOT_TAG);
    push_bag(&mut root, &doc.attributes);
    root.children.extend(doc.node_defs.values().map(node_def_element));
    root.children
        .extend(doc.node_graphs.values().map(node_graph_element));
    root.children.extend(doc.nodes.values().map(node_element));
    root
}

fn write_element(out: &mut String, element: &XmlElement, depth: usize) {
    let indent = "  ".repeat(depth);
    write_str!(out, "{indent}<{}", element.tag);
    for (name, value) in &element.attributes {
        write_str!(out, " {}=\"{}\"", name, escape(value.as_str()));
    }
    if element.children.is_empty() {
        out.push_str(" />\n");
        return;
    }
    out.push_str(">\n");
    for child in &element.children {
        write_element(out, child, depth + 1);
    }
    write_str!(out, "{indent}</{}>\n", element.tag);
}

/// Serialize a document to MaterialX XML
pub fn write_document(doc: &Document) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n");
    write_element(&mut out, &document_tree(doc), 0);
    out
}

/// Write a document to a MaterialX file
pub fn write_document_file(doc: &Document, path: &Path) -> Result<()> {
    std::fs::write(path, write_document(doc))?;
    Ok(())
}
