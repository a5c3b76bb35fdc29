//! MaterialX node graph to procedural graph descriptor

use super::ExportContext;
use super::reference::ReferenceIndex;
use super::types::value_to_json;
use crate::gltf::{
    AttributeBag, AttributeValue, GRAPH_NODETYPE, INPUT_NODETYPE, OUTPUT_NODETYPE,
    ProceduralGraph, ProceduralNode, ProceduralPort,
};
use crate::mtlx::{
    Document, FILENAME_TYPE, MULTI_OUTPUT_TYPE, Node, NodeDef, NodeGraph, PASSTHROUGH_ATTRIBUTES,
    Port, Source, attr,
};
use indexmap::IndexMap;
use tracing::{debug, error, warn};

/// What callers need to know about a graph once it has been written
#[derive(Debug, Clone)]
pub struct ExportedGraph {
    /// Position in the `procedurals` array
    pub index: usize,
    /// Positions of the graph's nodes, inputs and outputs
    pub references: ReferenceIndex,
}

fn passthrough_metadata(attributes: &crate::mtlx::AttributeBag) -> AttributeBag {
    attributes
        .iter()
        .filter(|(name, value)| PASSTHROUGH_ATTRIBUTES.contains(&name.as_str()) && !value.is_empty())
        .map(|(name, value)| (name.clone(), AttributeValue::from(value.as_str())))
        .collect()
}

/// Fill the literal half of a port: a texture for file references, a JSON
/// value otherwise
fn write_literal(ctx: &mut ExportContext, port: &mut ProceduralPort, value_type: &str, value: &str) {
    if value_type == FILENAME_TYPE {
        port.texture = Some(ctx.gltf.add_image_texture(value));
    } else {
        port.value = Some(value_to_json(value, value_type));
    }
}

/// Resolve a connection to a graph input or sibling node, writing the
/// reference fields of `port`.
///
/// Returns false when the port names a target the graph does not hold.
fn write_connection(
    graph: &NodeGraph,
    refs: &ReferenceIndex,
    path: &str,
    source: Source<'_>,
    port: &mut ProceduralPort,
) -> bool {
    match source {
        Source::Interface(name) => {
            if refs.inputs.contains(&graph.child_path(name)) {
                port.input = Some(name.to_string());
                true
            } else {
                error!("{path}: interface input '{name}' cannot be resolved");
                false
            }
        }
        Source::Node { name, output } => match refs.nodes.position(&graph.child_path(name)) {
            Some(position) => {
                port.node = Some(position);
                port.output = output.map(str::to_string);
                true
            }
            None => {
                error!("{path}: node '{name}' cannot be resolved");
                false
            }
        },
        Source::NodeGraph { name, .. } => {
            error!("{path}: connection to node graph '{name}' inside a graph is not supported");
            false
        }
        Source::Value(_) | Source::Unset => false,
    }
}

fn export_input(ctx: &mut ExportContext, graph: &NodeGraph, input: &Port) -> Option<ProceduralPort> {
    let path = graph.child_path(&input.name);
    let Some(value) = input.value.as_deref() else {
        error!("{path}: graph input has no value");
        return None;
    };
    if input.attribute(attr::NODE_NAME).is_some() || input.attribute(attr::INTERFACE_NAME).is_some() {
        warn!("{path}: graph inputs cannot be connected, keeping the value only");
    }

    let mut port = ProceduralPort::new(INPUT_NODETYPE, &input.port_type);
    write_literal(ctx, &mut port, &input.port_type, value);
    port.metadata = passthrough_metadata(&input.attributes);
    Some(port)
}

fn export_output(graph: &NodeGraph, refs: &ReferenceIndex, output: &Port) -> ProceduralPort {
    let path = graph.child_path(&output.name);
    let mut port = ProceduralPort::new(OUTPUT_NODETYPE, &output.port_type);
    let source = output.source();
    if !write_connection(graph, refs, &path, source, &mut port) {
        if matches!(source, Source::Value(_) | Source::Unset) {
            error!("{path}: output is not connected");
        }
        if let Some(qualifier) = output.attribute(attr::OUTPUT) {
            debug!("{path}: dropping output qualifier '{qualifier}' of an unresolved connection");
        }
    }
    port.metadata = passthrough_metadata(&output.attributes);
    port
}

fn export_node(
    ctx: &mut ExportContext,
    graph: &NodeGraph,
    refs: &ReferenceIndex,
    node: &Node,
    def: &NodeDef,
) -> ProceduralNode {
    let mut inputs = IndexMap::new();
    for input in node.inputs.values() {
        let path = format!("{}/{}", graph.child_path(&node.name), input.name);
        let mut port = ProceduralPort::new(INPUT_NODETYPE, &input.port_type);
        match input.source() {
            Source::Value(value) => write_literal(ctx, &mut port, &input.port_type, value),
            Source::Unset => {
                warn!("{path}: input has neither a value nor a connection");
                continue;
            }
            source => {
                if !write_connection(graph, refs, &path, source, &mut port) {
                    continue;
                }
            }
        }
        port.metadata = passthrough_metadata(&input.attributes);
        inputs.insert(input.name.clone(), port);
    }

    let mut outputs = IndexMap::new();
    for output in node.outputs.values().chain(def.outputs.values()) {
        if !outputs.contains_key(&output.name) {
            outputs.insert(
                output.name.clone(),
                ProceduralPort::new(OUTPUT_NODETYPE, &output.port_type),
            );
        }
    }

    let value_type = match outputs.len() {
        0 | 1 => outputs
            .values()
            .next()
            .and_then(|output| output.value_type.clone())
            .unwrap_or_else(|| node.node_type.clone()),
        _ => MULTI_OUTPUT_TYPE.to_string(),
    };

    let mut attributes: AttributeBag = node
        .attributes
        .iter()
        .filter(|(name, _)| name.as_str() != attr::NODEDEF)
        .map(|(name, value)| (name.clone(), AttributeValue::from(value.as_str())))
        .collect();
    if ctx.options.write_nodedef_names {
        attributes.insert(attr::NODEDEF.to_string(), AttributeValue::from(def.name.as_str()));
    }

    ProceduralNode {
        name: Some(node.name.clone()),
        nodetype: node.category.clone(),
        value_type,
        inputs,
        outputs,
        attributes,
    }
}

/// Write one node graph as a procedural descriptor.
///
/// Returns `None` for graphs without outputs; nothing is written for them.
pub(crate) fn export_graph(
    ctx: &mut ExportContext,
    doc: &Document,
    graph: &NodeGraph,
) -> Option<ExportedGraph> {
    let Some(value_type) = graph.output_type() else {
        warn!("Skipping node graph '{}': it has no outputs", graph.name);
        return None;
    };
    let index = ctx.procedurals.len();
    debug!("Exporting node graph '{}' as procedural {index}", graph.name);

    // Nodes first, so outputs and inputs may point at nodes declared later
    let mut refs = ReferenceIndex::default();
    let mut nodes = Vec::with_capacity(graph.nodes.len());
    for node in graph.nodes.values() {
        match doc.node_def_for(node) {
            Some(def) => {
                refs.nodes.register(graph.child_path(&node.name));
                nodes.push((node, def));
            }
            None => error!(
                "{}: no definition for '{}' of type '{}', skipping node",
                graph.child_path(&node.name),
                node.category,
                node.node_type
            ),
        }
    }

    let mut inputs = IndexMap::new();
    for input in graph.inputs.values() {
        if let Some(port) = export_input(ctx, graph, input) {
            refs.inputs.register(graph.child_path(&input.name));
            inputs.insert(input.name.clone(), port);
        }
    }

    let mut outputs = IndexMap::new();
    for output in graph.outputs.values() {
        refs.outputs.register(graph.child_path(&output.name));
        outputs.insert(output.name.clone(), export_output(graph, &refs, output));
    }

    let nodes = nodes
        .into_iter()
        .map(|(node, def)| export_node(ctx, graph, &refs, node, def))
        .collect();

    let descriptor = ProceduralGraph {
        name: Some(graph.name.clone()),
        nodetype: GRAPH_NODETYPE.to_string(),
        value_type: value_type.to_string(),
        inputs,
        outputs,
        nodes,
        attributes: passthrough_metadata(&graph.attributes),
    };
    ctx.procedurals.push(descriptor);

    Some(ExportedGraph {
        index,
        references: refs,
    })
}
