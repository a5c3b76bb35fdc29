//! Procedural graph descriptors to MaterialX node graphs

use super::reference::ReferenceIndex;
use super::types::json_to_value;
use crate::gltf::{
    AttributeBag, Connection, GRAPH_NODETYPE, GltfDocument, Literal, ProceduralGraph,
    ProceduralNode, ProceduralPort,
};
use crate::mtlx::{
    Document, MULTI_OUTPUT_TYPE, Node, NodeGraph, PASSTHROUGH_ATTRIBUTES, Port, attr,
};
use crate::names::{NameAllocator, create_valid_name, default_name};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, warn};

/// A graph rebuilt from a descriptor
#[derive(Debug, Clone)]
pub struct ImportedGraph {
    /// Name of the graph in the document
    pub name: String,
    /// Descriptor output key to (native name, type)
    pub outputs: IndexMap<String, (String, String)>,
}

impl ImportedGraph {
    /// Native output name for a descriptor output key
    pub fn output_name(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(|(name, _)| name.as_str())
    }

    /// Type of an output; without a key, the first output
    pub fn output_type(&self, key: Option<&str>) -> Option<&str> {
        let (_, value_type) = match key {
            Some(key) => self.outputs.get(key)?,
            None => self.outputs.values().next()?,
        };
        Some(value_type.as_str())
    }
}

/// Graphs rebuilt from a `procedurals` array, by descriptor position
#[derive(Debug, Clone, Default)]
pub struct ImportedGraphs {
    by_index: Vec<Option<ImportedGraph>>,
}

impl ImportedGraphs {
    pub fn get(&self, index: usize) -> Option<&ImportedGraph> {
        self.by_index.get(index).and_then(Option::as_ref)
    }

    /// The most recently created graph
    pub fn last(&self) -> Option<&ImportedGraph> {
        self.by_index.iter().rev().find_map(Option::as_ref)
    }

    pub(crate) fn push(&mut self, graph: Option<ImportedGraph>) {
        self.by_index.push(graph);
    }

    /// Number of graphs actually created
    pub fn created(&self) -> usize {
        self.by_index.iter().flatten().count()
    }
}

fn copy_attributes<'a>(
    bag: &'a AttributeBag,
    filter: impl Fn(&str) -> bool + 'a,
) -> impl Iterator<Item = (&'a str, String)> + 'a {
    bag.iter()
        .filter(move |(name, value)| !value.is_null() && filter(name.as_str()))
        .map(|(name, value)| (name.as_str(), value.to_attribute_string()))
}

/// Names for every element of one graph, assigned before anything is
/// resolved
struct Labels {
    graph: String,
    refs: ReferenceIndex,
    /// Per node position: descriptor output key to native output name
    node_outputs: Vec<IndexMap<String, String>>,
}

fn pre_label(doc: &Document, descriptor: &ProceduralGraph) -> Labels {
    let graph = doc.create_valid_child_name(
        descriptor
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&default_name(GRAPH_NODETYPE)),
    );

    let mut names = NameAllocator::new();
    let mut refs = ReferenceIndex::default();
    for key in descriptor.inputs.keys() {
        refs.inputs.register(names.allocate(key));
    }
    for key in descriptor.outputs.keys() {
        refs.outputs.register(names.allocate(key));
    }

    // Declared names are claimed before any generated one
    let mut node_names: Vec<Option<String>> = descriptor
        .nodes
        .iter()
        .map(|node| {
            node.name
                .as_deref()
                .filter(|name| !name.is_empty())
                .map(|name| names.allocate(name))
        })
        .collect();
    for (name, node) in node_names.iter_mut().zip(&descriptor.nodes) {
        if name.is_none() {
            *name = Some(names.allocate(&default_name(&node.nodetype)));
        }
    }
    for name in node_names.into_iter().flatten() {
        refs.nodes.register(name);
    }

    let node_outputs = descriptor
        .nodes
        .iter()
        .map(|node| {
            let mut ports = NameAllocator::new();
            node.outputs
                .keys()
                .map(|key| (key.clone(), ports.allocate(key)))
                .collect()
        })
        .collect();

    Labels {
        graph,
        refs,
        node_outputs,
    }
}

struct GraphImport<'a> {
    gltf: &'a GltfDocument,
    descriptor: &'a ProceduralGraph,
    labels: &'a Labels,
    path: String,
}

impl GraphImport<'_> {
    fn literal(&self, path: &str, literal: Literal<'_>, value_type: &str) -> Option<String> {
        match literal {
            Literal::Texture(texture) => {
                let uri = self.gltf.texture_uri(texture).map(str::to_string);
                if uri.is_none() {
                    error!("{path}: texture {texture} has no image uri");
                }
                uri
            }
            Literal::Value(value) => json_to_value(value, value_type),
        }
    }

    fn input_label(&self, key: &str) -> Option<&str> {
        let position = self.descriptor.inputs.get_index_of(key)?;
        self.labels.refs.inputs.identity(position)
    }

    /// Native name of a node output; keys the node does not declare are
    /// only made valid
    fn output_label(&self, node: usize, key: &str) -> String {
        self.labels
            .node_outputs
            .get(node)
            .and_then(|outputs| outputs.get(key))
            .cloned()
            .unwrap_or_else(|| create_valid_name(key))
    }

    /// Turn a descriptor connection into native connection attributes.
    ///
    /// Returns false when a reference points outside the graph.
    fn connect(&self, path: &str, connection: Connection<'_>, port: &mut Port) -> bool {
        match connection {
            Connection::ToGraphInput(key) => match self.input_label(key) {
                Some(label) => {
                    port.set_attribute(attr::INTERFACE_NAME, label);
                    true
                }
                None => {
                    error!("{path}: graph input '{key}' does not exist");
                    false
                }
            },
            Connection::ToNodeOutput { node, output } => {
                match self.labels.refs.nodes.identity(node) {
                    Some(label) => {
                        port.set_attribute(attr::NODE_NAME, label);
                        if let Some(output) = output {
                            port.set_attribute(attr::OUTPUT, self.output_label(node, output));
                        }
                        true
                    }
                    None => {
                        error!("{path}: node {node} is out of range");
                        false
                    }
                }
            }
            Connection::Literal(_) | Connection::None => false,
        }
    }

    fn graph_input(&self, position: usize, key: &str, desc: &ProceduralPort) -> Option<Port> {
        let path = format!("{}/{key}", self.path);
        let Some(value_type) = desc.value_type.as_deref() else {
            error!("{path}: input has no type");
            return None;
        };
        let label = self.labels.refs.inputs.identity(position)?;

        let mut port = Port::new(label, value_type);
        match desc.connection() {
            Connection::Literal(literal) => port.value = Some(self.literal(&path, literal, value_type)?),
            Connection::None => {
                error!("{path}: input has neither a value nor a texture");
                return None;
            }
            _ => {
                error!("{path}: graph inputs cannot be connected");
                return None;
            }
        }
        for (name, value) in copy_attributes(&desc.metadata, |_| true) {
            port.set_attribute(name, value);
        }
        Some(port)
    }

    fn node(&self, position: usize, desc: &ProceduralNode) -> Option<Node> {
        let label = self.labels.refs.nodes.identity(position)?;
        let path = format!("{}/{label}", self.path);

        let node_type = match desc.outputs.len() {
            0 => desc.value_type.clone(),
            1 => desc
                .outputs
                .values()
                .next()
                .and_then(|output| output.value_type.clone())
                .unwrap_or_else(|| desc.value_type.clone()),
            _ => MULTI_OUTPUT_TYPE.to_string(),
        };
        let mut node = Node::new(desc.nodetype.as_str(), label, node_type);
        for (name, value) in copy_attributes(&desc.attributes, |_| true) {
            node.attributes.insert(name.to_string(), value);
        }

        let output_labels = self.labels.node_outputs.get(position);
        let mut ports = NameAllocator::new();
        if desc.outputs.len() > 1 {
            for label in output_labels.into_iter().flat_map(IndexMap::values) {
                ports.reserve(label.as_str());
            }
        }

        for (key, input) in &desc.inputs {
            let input_path = format!("{path}/{key}");
            let Some(value_type) = input.value_type.as_deref() else {
                error!("{input_path}: input has no type");
                continue;
            };
            let mut port = Port::new(ports.allocate(key), value_type);
            let connected = match input.connection() {
                Connection::Literal(literal) => {
                    port.value = self.literal(&input_path, literal, value_type);
                    port.value.is_some()
                }
                Connection::None => {
                    warn!("{input_path}: input has neither a value nor a connection");
                    false
                }
                connection => self.connect(&input_path, connection, &mut port),
            };
            if !connected {
                continue;
            }
            for (name, value) in copy_attributes(&input.metadata, |_| true) {
                port.set_attribute(name, value);
            }
            node.add_input(port);
        }

        if desc.outputs.len() > 1 {
            for (key, output) in &desc.outputs {
                let value_type = output.value_type.as_deref().unwrap_or_default();
                let name = output_labels
                    .and_then(|labels| labels.get(key))
                    .cloned()
                    .unwrap_or_else(|| create_valid_name(key));
                node.add_output(Port::new(name, value_type));
            }
        }
        Some(node)
    }

    fn graph_output(&self, position: usize, key: &str, desc: &ProceduralPort) -> Option<Port> {
        let path = format!("{}/{key}", self.path);
        let Some(value_type) = desc.value_type.as_deref() else {
            error!("{path}: output has no type");
            return None;
        };
        let label = self.labels.refs.outputs.identity(position)?;

        let mut port = Port::new(label, value_type);
        match desc.connection() {
            Connection::None => warn!("{path}: output is not connected"),
            Connection::Literal(literal) => {
                port.value = self.literal(&path, literal, value_type);
            }
            connection => {
                self.connect(&path, connection, &mut port);
            }
        }
        for (name, value) in copy_attributes(&desc.metadata, |_| true) {
            port.set_attribute(name, value);
        }
        Some(port)
    }
}

/// Rebuild one descriptor into a node graph of `doc`.
///
/// Returns `None` when nothing usable could be built.
pub(crate) fn import_graph(
    gltf: &GltfDocument,
    doc: &mut Document,
    descriptor: &ProceduralGraph,
) -> Option<ImportedGraph> {
    let labels = pre_label(doc, descriptor);
    let import = GraphImport {
        gltf,
        descriptor,
        labels: &labels,
        path: labels.graph.clone(),
    };

    let mut graph = NodeGraph::new(labels.graph.as_str());
    for (name, value) in copy_attributes(&descriptor.attributes, |name| {
        PASSTHROUGH_ATTRIBUTES.contains(&name)
    }) {
        graph.attributes.insert(name.to_string(), value);
    }

    for (position, (key, input)) in descriptor.inputs.iter().enumerate() {
        if let Some(port) = import.graph_input(position, key, input) {
            graph.add_input(port);
        }
    }
    for (position, node) in descriptor.nodes.iter().enumerate() {
        if let Some(node) = import.node(position, node) {
            graph.add_node(node);
        }
    }

    let mut outputs = IndexMap::new();
    for (position, (key, output)) in descriptor.outputs.iter().enumerate() {
        if let Some(port) = import.graph_output(position, key, output) {
            outputs.insert(key.clone(), (port.name.clone(), port.port_type.clone()));
            graph.add_output(port);
        }
    }

    if graph.outputs.is_empty() {
        warn!("Skipping procedural '{}': it has no usable outputs", graph.name);
        return None;
    }

    debug!(
        "Imported node graph '{}' with {} nodes",
        graph.name,
        graph.nodes.len()
    );
    let name = graph.name.clone();
    doc.add_node_graph(graph);
    Some(ImportedGraph { name, outputs })
}

/// Rebuild every graph descriptor of a `procedurals` array.
///
/// Descriptors that fail to parse or are not graphs are skipped with a
/// warning; positions are kept so material lookups by index still line up.
pub(crate) fn import_graphs(
    gltf: &GltfDocument,
    doc: &mut Document,
    procedurals: &[Value],
) -> ImportedGraphs {
    let mut imported = ImportedGraphs::default();
    for (index, value) in procedurals.iter().enumerate() {
        let graph = match serde_json::from_value::<ProceduralGraph>(value.clone()) {
            Ok(descriptor) if descriptor.nodetype == GRAPH_NODETYPE => {
                import_graph(gltf, doc, &descriptor)
            }
            Ok(descriptor) => {
                warn!(
                    "Skipping procedural {index}: unsupported nodetype '{}'",
                    descriptor.nodetype
                );
                None
            }
            Err(err) => {
                warn!("Skipping procedural {index}: {err}");
                None
            }
        };
        imported.push(graph);
    }
    imported
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mtlx::Source;
    use serde_json::json;

    fn import(procedural: Value) -> (Document, ImportedGraphs) {
        let gltf = GltfDocument::default();
        let mut doc = Document::new();
        let imported = import_graphs(&gltf, &mut doc, &[procedural]);
        (doc, imported)
    }

    #[test]
    fn test_unnamed_elements_get_names() {
        let (doc, imported) = import(json!({
            "nodetype": "nodegraph",
            "type": "float",
            "inputs": { "scale": { "nodetype": "input", "type": "float", "value": 2.0 } },
            "nodes": [
                { "nodetype": "multiply", "type": "float",
                  "inputs": { "in1": { "type": "float", "input": "scale" },
                              "in2": { "type": "float", "node": 1 } },
                  "outputs": { "out": { "nodetype": "output", "type": "float" } } },
                { "name": "multiply1", "nodetype": "constant", "type": "float",
                  "inputs": { "value": { "type": "float", "value": 0.5 } } }
            ],
            "outputs": { "out": { "nodetype": "output", "type": "float", "node": 0 } }
        }));

        let graph = doc.node_graph("nodegraph1").expect("graph should be named");
        assert_eq!(imported.last().map(|g| g.name.as_str()), Some("nodegraph1"));

        // The declared name is claimed first, the generated one moves on
        let generated = graph.node("multiply2").expect("generated name");
        assert!(graph.node("multiply1").is_some());
        assert_eq!(
            generated.input("in1").map(Port::source),
            Some(Source::Interface("scale"))
        );
        assert_eq!(
            generated.input("in2").map(Port::source),
            Some(Source::Node {
                name: "multiply1",
                output: None
            })
        );
        assert_eq!(
            graph.outputs["out"].source(),
            Source::Node {
                name: "multiply2",
                output: None
            }
        );
        assert_eq!(graph.inputs["scale"].value.as_deref(), Some("2"));
    }

    #[test]
    fn test_multi_output_nodes() {
        let (doc, _) = import(json!({
            "name": "split",
            "nodetype": "nodegraph",
            "type": "multioutput",
            "inputs": { "color": { "type": "color3", "value": [1.0, 0.5, 0.0] } },
            "nodes": [
                { "name": "sep", "nodetype": "separate3", "type": "multioutput",
                  "inputs": { "in": { "type": "color3", "input": "color" } },
                  "outputs": { "outr": { "type": "float" }, "outg": { "type": "float" }, "outb": { "type": "float" } } }
            ],
            "outputs": {
                "r": { "type": "float", "node": 0, "output": "outr" },
                "g": { "type": "float", "node": 0, "output": "outg" }
            }
        }));

        let graph = doc.node_graph("split").expect("graph");
        let sep = graph.node("sep").expect("node");
        assert_eq!(sep.node_type, MULTI_OUTPUT_TYPE);
        assert_eq!(sep.outputs.len(), 3);
        assert_eq!(
            graph.outputs["g"].source(),
            Source::Node {
                name: "sep",
                output: Some("outg")
            }
        );
        assert_eq!(graph.inputs["color"].value.as_deref(), Some("1, 0.5, 0"));
    }

    #[test]
    fn test_bad_references_are_dropped() {
        let (doc, _) = import(json!({
            "name": "g",
            "nodetype": "nodegraph",
            "type": "float",
            "inputs": { "untyped": { "value": 1.0 }, "empty": { "type": "float" } },
            "nodes": [
                { "name": "n", "nodetype": "add", "type": "float",
                  "inputs": { "in1": { "type": "float", "node": 7 },
                              "in2": { "type": "float", "input": "nope" } } }
            ],
            "outputs": { "out": { "type": "float", "node": 0 } }
        }));

        let graph = doc.node_graph("g").expect("graph");
        assert!(graph.inputs.is_empty());
        assert!(graph.node("n").map(|n| n.inputs.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_non_graph_descriptors_are_skipped() {
        let gltf = GltfDocument::default();
        let mut doc = Document::new();
        let imported = import_graphs(
            &gltf,
            &mut doc,
            &[
                json!({ "nodetype": "image", "type": "color3" }),
                json!("not an object"),
                json!({ "name": "g", "nodetype": "nodegraph", "type": "float",
                        "outputs": { "out": { "type": "float" } } }),
            ],
        );
        assert!(imported.get(0).is_none());
        assert!(imported.get(1).is_none());
        assert_eq!(imported.get(2).map(|g| g.name.as_str()), Some("g"));
        assert_eq!(imported.created(), 1);
        assert_eq!(doc.node_graphs.len(), 1);
    }

    #[test]
    fn test_null_metadata_keeps_the_graph() {
        let (doc, imported) = import(json!({
            "name": "g",
            "nodetype": "nodegraph",
            "type": "float",
            "extras": null,
            "nodes": [
                { "name": "n", "nodetype": "constant", "type": "float", "extras": null,
                  "inputs": { "value": { "type": "float", "value": 1.0, "unit": null } } }
            ],
            "outputs": { "out": { "type": "float", "node": 0 } }
        }));

        assert_eq!(imported.created(), 1);
        let node = doc.node_graph("g").and_then(|g| g.node("n")).expect("node");
        assert!(node.attribute("extras").is_none());
        let value = node.input("value").expect("input");
        assert_eq!(value.value.as_deref(), Some("1"));
        assert!(value.attribute("unit").is_none());
    }

    #[test]
    fn test_colliding_names_with_huge_suffix() {
        let name = format!("n{}", u64::MAX);
        let (doc, imported) = import(json!({
            "name": "g",
            "nodetype": "nodegraph",
            "type": "float",
            "nodes": [
                { "name": name.as_str(), "nodetype": "constant", "type": "float",
                  "inputs": { "value": { "type": "float", "value": 1.0 } } },
                { "name": name.as_str(), "nodetype": "constant", "type": "float",
                  "inputs": { "value": { "type": "float", "value": 2.0 } } }
            ],
            "outputs": { "out": { "type": "float", "node": 1 } }
        }));

        assert_eq!(imported.created(), 1);
        let graph = doc.node_graph("g").expect("graph");
        assert_eq!(graph.nodes.len(), 2);
        let renamed = format!("{name}_2");
        assert!(graph.node(&renamed).is_some());
        assert_eq!(
            graph.outputs["out"].source(),
            Source::Node {
                name: renamed.as_str(),
                output: None
            }
        );
    }

    #[test]
    fn test_node_port_names_are_made_valid() {
        let (doc, _) = import(json!({
            "name": "g",
            "nodetype": "nodegraph",
            "type": "float",
            "nodes": [
                { "name": "sep", "nodetype": "separate3", "type": "multioutput",
                  "inputs": { "in put": { "type": "color3", "value": [1.0, 0.0, 0.0] } },
                  "outputs": { "out r": { "type": "float" }, "out g": { "type": "float" } } }
            ],
            "outputs": { "out": { "type": "float", "node": 0, "output": "out g" } }
        }));

        let graph = doc.node_graph("g").expect("graph");
        let sep = graph.node("sep").expect("node");
        assert!(sep.input("in_put").is_some());
        let outputs: Vec<&str> = sep.outputs.keys().map(String::as_str).collect();
        assert_eq!(outputs, ["out_r", "out_g"]);
        assert_eq!(
            graph.outputs["out"].source(),
            Source::Node {
                name: "sep",
                output: Some("out_g")
            }
        );
    }

    #[test]
    fn test_texture_inputs_resolve_to_uris() {
        let mut gltf = GltfDocument::default();
        let texture = gltf.add_image_texture("bricks.png");
        let mut doc = Document::new();
        import_graphs(
            &gltf,
            &mut doc,
            &[json!({
                "name": "g", "nodetype": "nodegraph", "type": "color3",
                "inputs": { "file": { "type": "filename", "texture": texture } },
                "nodes": [ { "name": "img", "nodetype": "image", "type": "color3",
                             "inputs": { "file": { "type": "filename", "input": "file" } } } ],
                "outputs": { "out": { "type": "color3", "node": 0 } }
            })],
        );
        let graph = doc.node_graph("g").expect("graph");
        assert_eq!(graph.inputs["file"].value.as_deref(), Some("bricks.png"));
    }
}
