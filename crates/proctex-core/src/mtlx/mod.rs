//! In-memory MaterialX document model
//!
//! A deliberately small slice of MaterialX: documents hold node definitions,
//! node graphs and top-level shader/material nodes. Every element keeps its
//! extra attributes as an ordered string bag so nothing is lost on a round
//! trip, and connections stay in the string attributes MaterialX uses
//! (`interfacename`, `nodename`, `nodegraph`, `output`).

pub mod equivalence;
pub mod library;
pub mod validate;
pub mod xml;

use crate::names;
use indexmap::IndexMap;

/// MaterialX version written to new documents
pub const MATERIALX_VERSION: &str = "1.39";

/// Type used by nodes and graphs with more than one output
pub const MULTI_OUTPUT_TYPE: &str = "multioutput";

/// Type of inputs that reference an image file
pub const FILENAME_TYPE: &str = "filename";

/// Type carried by shader nodes
pub const SURFACE_SHADER_TYPE: &str = "surfaceshader";

/// Type carried by material nodes
pub const MATERIAL_TYPE: &str = "material";

/// Category of the node that binds a shader to a material
pub const SURFACE_MATERIAL_CATEGORY: &str = "surfacematerial";

/// Attribute names with special meaning
pub mod attr {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const VALUE: &str = "value";
    pub const VERSION: &str = "version";
    pub const NODE: &str = "node";
    pub const NODEDEF: &str = "nodedef";
    pub const INTERFACE_NAME: &str = "interfacename";
    pub const NODE_NAME: &str = "nodename";
    pub const NODE_GRAPH: &str = "nodegraph";
    pub const OUTPUT: &str = "output";
    pub const DOC: &str = "doc";
    pub const COLORSPACE: &str = "colorspace";
}

/// Metadata attributes carried across the glTF boundary on graphs and ports
pub const PASSTHROUGH_ATTRIBUTES: &[&str] = &[
    "colorspace",
    "unit",
    "unittype",
    "uiname",
    "uifolder",
    "uimin",
    "uimax",
    "uisoftmin",
    "uisoftmax",
    "uistep",
    "uiadvanced",
    "doc",
];

/// Ordered string attributes of an element
pub type AttributeBag = IndexMap<String, String>;

/// Where a port gets its data from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    /// Connected to an input of the enclosing node graph
    Interface(&'a str),
    /// Connected to a sibling node, optionally to one of several outputs
    Node {
        name: &'a str,
        output: Option<&'a str>,
    },
    /// Connected to a node graph, optionally to one of several outputs
    NodeGraph {
        name: &'a str,
        output: Option<&'a str>,
    },
    /// Literal value string
    Value(&'a str),
    /// Neither connected nor valued
    Unset,
}

/// An input or output element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Port {
    pub name: String,
    pub port_type: String,
    pub value: Option<String>,
    pub attributes: AttributeBag,
}

impl Port {
    /// Create a port with a name and type
    pub fn new(name: impl Into<String>, port_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_type: port_type.into(),
            value: None,
            attributes: AttributeBag::new(),
        }
    }

    /// Set the value string
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an attribute, builder style
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Get a non-empty attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Resolve where this port's data comes from.
    ///
    /// Connections win over values: a port carrying both reports only the
    /// connection.
    pub fn source(&self) -> Source<'_> {
        let output = self.attribute(attr::OUTPUT);
        if let Some(name) = self.attribute(attr::INTERFACE_NAME) {
            Source::Interface(name)
        } else if let Some(name) = self.attribute(attr::NODE_NAME) {
            Source::Node { name, output }
        } else if let Some(name) = self.attribute(attr::NODE_GRAPH) {
            Source::NodeGraph { name, output }
        } else if let Some(value) = self.value.as_deref() {
            Source::Value(value)
        } else {
            Source::Unset
        }
    }
}

/// A node instance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub category: String,
    pub node_type: String,
    pub attributes: AttributeBag,
    pub inputs: IndexMap<String, Port>,
    pub outputs: IndexMap<String, Port>,
}

impl Node {
    /// Create a node of a category
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    /// Add an input, replacing any input of the same name
    pub fn add_input(&mut self, input: Port) {
        self.inputs.insert(input.name.clone(), input);
    }

    /// Add an output, replacing any output of the same name
    pub fn add_output(&mut self, output: Port) {
        self.outputs.insert(output.name.clone(), output);
    }

    /// Builder form of [`Node::add_input`]
    pub fn with_input(mut self, input: Port) -> Self {
        self.add_input(input);
        self
    }

    /// Builder form of [`Node::add_output`]
    pub fn with_output(mut self, output: Port) -> Self {
        self.add_output(output);
        self
    }

    /// Get an input by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    /// Get a non-empty attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Whether this node is a material node
    pub fn is_material(&self) -> bool {
        self.node_type == MATERIAL_TYPE
    }
}

/// A node graph with interface inputs, outputs and child nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeGraph {
    pub name: String,
    pub attributes: AttributeBag,
    pub inputs: IndexMap<String, Port>,
    pub outputs: IndexMap<String, Port>,
    pub nodes: IndexMap<String, Node>,
}

impl NodeGraph {
    /// Create an empty node graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_input(&mut self, input: Port) {
        self.inputs.insert(input.name.clone(), input);
    }

    pub fn add_output(&mut self, output: Port) {
        self.outputs.insert(output.name.clone(), output);
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.name.clone(), node);
    }

    /// Get a child node by name
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Tree path of a child element
    pub fn child_path(&self, child: &str) -> String {
        format!("{}/{}", self.name, child)
    }

    /// Whether any child (input, output or node) uses this name
    pub fn has_child(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
            || self.outputs.contains_key(name)
            || self.nodes.contains_key(name)
    }

    /// Type of the graph as seen from outside: the single output's type, or
    /// the multi-output type
    pub fn output_type(&self) -> Option<&str> {
        match self.outputs.len() {
            0 => None,
            1 => self.outputs.values().next().map(|o| o.port_type.as_str()),
            _ => Some(MULTI_OUTPUT_TYPE),
        }
    }
}

/// The signature of a node category
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeDef {
    pub name: String,
    /// Node category this definition applies to
    pub node: String,
    pub attributes: AttributeBag,
    pub inputs: IndexMap<String, Port>,
    pub outputs: IndexMap<String, Port>,
}

impl NodeDef {
    /// Type of a node instantiated from this definition
    pub fn output_type(&self) -> Option<&str> {
        match self.outputs.len() {
            0 => None,
            1 => self.outputs.values().next().map(|o| o.port_type.as_str()),
            _ => Some(MULTI_OUTPUT_TYPE),
        }
    }

    /// Whether a node instance can be described by this definition
    pub fn matches(&self, node: &Node) -> bool {
        if self.node != node.category || self.output_type() != Some(node.node_type.as_str()) {
            return false;
        }
        node.inputs.values().all(|input| {
            self.inputs
                .get(&input.name)
                .is_some_and(|declared| declared.port_type == input.port_type)
        })
    }
}

/// A MaterialX document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub attributes: AttributeBag,
    /// Definitions declared by the document itself
    pub node_defs: IndexMap<String, NodeDef>,
    pub node_graphs: IndexMap<String, NodeGraph>,
    /// Top-level nodes (shaders and materials)
    pub nodes: IndexMap<String, Node>,
    /// Imported definitions; used for lookups, never written or compared
    pub library: IndexMap<String, NodeDef>,
}

impl Default for Document {
    fn default() -> Self {
        let mut attributes = AttributeBag::new();
        attributes.insert(attr::VERSION.to_string(), MATERIALX_VERSION.to_string());
        Self {
            attributes,
            node_defs: IndexMap::new(),
            node_graphs: IndexMap::new(),
            nodes: IndexMap::new(),
            library: IndexMap::new(),
        }
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with definitions imported from a library
    pub fn with_library(library: &[NodeDef]) -> Self {
        let mut doc = Self::new();
        doc.import_library(library);
        doc
    }

    /// Import definitions for node definition lookups
    pub fn import_library(&mut self, library: &[NodeDef]) {
        for def in library {
            self.library.insert(def.name.clone(), def.clone());
        }
    }

    pub fn add_node_graph(&mut self, graph: NodeGraph) {
        self.node_graphs.insert(graph.name.clone(), graph);
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.name.clone(), node);
    }

    pub fn add_node_def(&mut self, def: NodeDef) {
        self.node_defs.insert(def.name.clone(), def);
    }

    pub fn node_graph(&self, name: &str) -> Option<&NodeGraph> {
        self.node_graphs.get(name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Find a definition by name, document first, then library
    pub fn node_def(&self, name: &str) -> Option<&NodeDef> {
        self.node_defs.get(name).or_else(|| self.library.get(name))
    }

    /// All definitions visible to this document
    pub fn all_node_defs(&self) -> impl Iterator<Item = &NodeDef> {
        self.node_defs.values().chain(self.library.values())
    }

    /// Resolve the definition describing a node.
    ///
    /// An explicit `nodedef` attribute is looked up by name; otherwise the
    /// first definition matching category, output type and input types wins.
    pub fn node_def_for(&self, node: &Node) -> Option<&NodeDef> {
        if let Some(name) = node.attribute(attr::NODEDEF) {
            return self.node_def(name);
        }
        self.all_node_defs().find(|def| def.matches(node))
    }

    /// Top-level material nodes
    pub fn material_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_material())
    }

    /// Whether a top-level element uses this name
    pub fn has_child(&self, name: &str) -> bool {
        self.node_graphs.contains_key(name)
            || self.nodes.contains_key(name)
            || self.node_defs.contains_key(name)
    }

    /// Turn a proposed name into one that is valid and unused at the top level
    pub fn create_valid_child_name(&self, name: &str) -> String {
        let mut candidate = names::create_valid_name(name);
        while self.has_child(&candidate) {
            candidate = names::increment_name(&candidate);
        }
        candidate
    }
}
