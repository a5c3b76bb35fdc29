//! Integration tests for MaterialX to glTF export and glTF import

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use proctex_core::gltf::{PROCEDURALS_EXTENSION, UNLIT_EXTENSION};
use proctex_core::mtlx::{MATERIAL_TYPE, SURFACE_SHADER_TYPE, attr};
use proctex_core::prelude::*;
use serde_json::{Value, json};

fn library_document() -> Document {
    Document::with_library(&standard_library())
}

fn to_json(doc: &Document) -> Value {
    let text = Converter::default()
        .materialx_to_gltf_string(doc)
        .expect("Export should succeed");
    serde_json::from_str(&text).expect("Export should be valid JSON")
}

fn procedurals(gltf: &Value) -> &Vec<Value> {
    gltf["extensions"][PROCEDURALS_EXTENSION]["procedurals"]
        .as_array()
        .expect("procedurals array")
}

/// A graph named `name` whose single `out` output reads a constant
fn constant_graph(name: &str, value_type: &str, value: &str) -> NodeGraph {
    let mut graph = NodeGraph::new(name);
    graph.add_node(
        Node::new("constant", "c", value_type)
            .with_input(Port::new("value", value_type).with_value(value)),
    );
    graph.add_output(Port::new("out", value_type).with_attribute(attr::NODE_NAME, "c"));
    graph
}

fn add_pbr_material(doc: &mut Document, name: &str, channel: &str, channel_type: &str, graph: &str) {
    let shader = format!("SHD_{name}");
    doc.add_node(
        Node::new("gltf_pbr", shader.as_str(), SURFACE_SHADER_TYPE)
            .with_input(Port::new(channel, channel_type).with_attribute(attr::NODE_GRAPH, graph)),
    );
    doc.add_node(
        Node::new("surfacematerial", name, MATERIAL_TYPE).with_input(
            Port::new("surfaceshader", SURFACE_SHADER_TYPE)
                .with_attribute(attr::NODE_NAME, shader.as_str()),
        ),
    );
}

#[test]
fn multiply_graph_export() {
    let mut graph = NodeGraph::new("g");
    graph.add_node(
        Node::new("multiply", "mult", "float")
            .with_input(Port::new("in1", "float").with_value("2.0"))
            .with_input(Port::new("in2", "float").with_value("3.0")),
    );
    graph.add_output(Port::new("out", "float").with_attribute(attr::NODE_NAME, "mult"));
    let mut doc = library_document();
    doc.add_node_graph(graph);

    let gltf = to_json(&doc);
    let graph = &procedurals(&gltf)[0];
    assert_eq!(graph["type"], "float");
    assert_eq!(graph["nodetype"], "nodegraph");

    let node = &graph["nodes"][0];
    assert_eq!(node["nodetype"], "multiply");
    assert_eq!(node["inputs"]["in1"]["type"], "float");
    assert_relative_eq!(node["inputs"]["in1"]["value"].as_f64().unwrap(), 2.0);
    assert_relative_eq!(node["inputs"]["in2"]["value"].as_f64().unwrap(), 3.0);
    assert_eq!(graph["outputs"]["out"]["node"], 0);

    let used = gltf["extensionsUsed"].as_array().unwrap();
    assert!(used.contains(&json!(PROCEDURALS_EXTENSION)));
}

#[test]
fn multiple_outputs_use_the_multioutput_type() {
    let mut graph = NodeGraph::new("g");
    graph.add_node(
        Node::new("constant", "f", "float").with_input(Port::new("value", "float").with_value("1")),
    );
    graph.add_node(
        Node::new("constant", "c", "color3")
            .with_input(Port::new("value", "color3").with_value("1, 0, 0")),
    );
    graph.add_output(Port::new("scalar", "float").with_attribute(attr::NODE_NAME, "f"));
    graph.add_output(Port::new("color", "color3").with_attribute(attr::NODE_NAME, "c"));
    let mut doc = library_document();
    doc.add_node_graph(graph);
    doc.add_node_graph(constant_graph("single", "float", "0.5"));

    let gltf = to_json(&doc);
    let graphs = procedurals(&gltf);
    assert_eq!(graphs[0]["type"], "multioutput");
    assert_eq!(graphs[1]["type"], "float");
    assert_eq!(graphs[0]["nodes"][1]["type"], "color3");
}

#[test]
fn shared_graph_is_exported_once() {
    let mut doc = library_document();
    doc.add_node_graph(constant_graph("G1", "color3", "0.2, 0.4, 0.6"));
    add_pbr_material(&mut doc, "first", "base_color", "color3", "G1");
    add_pbr_material(&mut doc, "second", "base_color", "color3", "G1");

    let gltf = to_json(&doc);
    assert_eq!(procedurals(&gltf).len(), 1);

    let lookup = |material: usize| {
        gltf["materials"][material]["pbrMetallicRoughness"]["baseColorTexture"]["extensions"]
            [PROCEDURALS_EXTENSION]["index"]
            .clone()
    };
    assert_eq!(lookup(0), json!(0));
    assert_eq!(lookup(0), lookup(1));
}

#[test]
fn import_without_extensions_used_fails() {
    let json = json!({
        "asset": { "version": "2.0" },
        "extensions": { PROCEDURALS_EXTENSION: { "procedurals": [] } }
    });
    let result = Converter::default().gltf_string_to_materialx(&json.to_string(), &standard_library());
    match result {
        Err(Error::MissingExtension(name)) => assert_eq!(name, PROCEDURALS_EXTENSION),
        other => panic!("Expected a missing extension error, got {other:?}"),
    }
}

#[test]
fn fallback_texture_is_shared() {
    let mut doc = library_document();
    doc.add_node_graph(constant_graph("color", "color3", "1, 1, 1"));
    doc.add_node_graph(constant_graph("rough", "float", "0.3"));
    add_pbr_material(&mut doc, "first", "base_color", "color3", "color");
    add_pbr_material(&mut doc, "second", "roughness", "float", "rough");

    let gltf = to_json(&doc);
    assert_eq!(gltf["images"].as_array().unwrap().len(), 1);
    assert_eq!(gltf["textures"].as_array().unwrap().len(), 1);
    assert_eq!(gltf["images"][0]["uri"], "khr_texture_procedural_fallback.png");

    let first = &gltf["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"];
    let second = &gltf["materials"][1]["pbrMetallicRoughness"]["metallicRoughnessTexture"];
    assert_eq!(first["index"], 0);
    assert_eq!(second["index"], 0);
    assert_eq!(second["extensions"][PROCEDURALS_EXTENSION]["index"], 1);
}

#[test]
fn connection_beats_value_on_export() {
    let mut graph = NodeGraph::new("g");
    graph.add_input(Port::new("tint", "color3").with_value("1, 0, 0"));
    graph.add_node(
        Node::new("multiply", "m", "color3").with_input(
            Port::new("in1", "color3")
                .with_value("0, 1, 0")
                .with_attribute(attr::INTERFACE_NAME, "tint"),
        ),
    );
    graph.add_output(Port::new("out", "color3").with_attribute(attr::NODE_NAME, "m"));
    let mut doc = library_document();
    doc.add_node_graph(graph);

    let gltf = to_json(&doc);
    let input = &procedurals(&gltf)[0]["nodes"][0]["inputs"]["in1"];
    assert_eq!(input["input"], "tint");
    assert!(input.get("value").is_none());
}

#[test]
fn unlit_material_round_trip() {
    let mut doc = library_document();
    doc.add_node_graph(constant_graph("glow", "color3", "0, 1, 0"));
    doc.add_node(
        Node::new("surface_unlit", "SHD_neon", SURFACE_SHADER_TYPE).with_input(
            Port::new("emission_color", "color3").with_attribute(attr::NODE_GRAPH, "glow"),
        ),
    );
    doc.add_node(
        Node::new("surfacematerial", "neon", MATERIAL_TYPE).with_input(
            Port::new("surfaceshader", SURFACE_SHADER_TYPE)
                .with_attribute(attr::NODE_NAME, "SHD_neon"),
        ),
    );

    let converter = Converter::default();
    let gltf = converter.materialx_to_gltf(&doc).expect("export");
    assert!(gltf.uses_extension(UNLIT_EXTENSION));

    let back = converter
        .gltf_to_materialx(&gltf, &standard_library())
        .expect("import");
    let shader = back.node("SHD_neon").expect("shader");
    assert_eq!(shader.category, "surface_unlit");
    assert_eq!(
        shader.input("emission_color").map(Port::source),
        Some(Source::NodeGraph {
            name: "glow",
            output: None
        })
    );
    equivalent(&doc, &back, &EquivalenceOptions::default()).expect("documents should match");
}

#[test]
fn static_textures_are_not_bound() {
    let json = json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": [PROCEDURALS_EXTENSION],
        "extensions": { PROCEDURALS_EXTENSION: { "procedurals": [] } },
        "materials": [ { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } } ],
        "textures": [ { "source": 0 } ],
        "images": [ { "uri": "plain.png" } ]
    });
    let doc = Converter::default()
        .gltf_string_to_materialx(&json.to_string(), &standard_library())
        .expect("import");
    let shader = doc.node("SHD_material1").expect("shader");
    assert!(shader.inputs.is_empty());
    assert!(doc.node("material1").is_some_and(Node::is_material));
}
