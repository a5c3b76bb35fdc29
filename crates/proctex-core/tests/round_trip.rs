//! Round trips: MaterialX -> glTF -> MaterialX gives back an equivalent document

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use proctex_core::gltf::GltfDocument;
use proctex_core::prelude::*;

const MARBLE: &str = r#"<?xml version="1.0"?>
<materialx version="1.39">
  <nodegraph name="NG_marble" doc="Veined marble">
    <input name="base" type="color3" value="0.8, 0.8, 0.8" uiname="Base Color" />
    <input name="vein" type="color3" value="0.1, 0.1, 0.3" />
    <input name="scale" type="float" value="4.0" />
    <input name="pattern" type="filename" value="veins.png" colorspace="srgb_texture" />
    <texcoord name="uv" type="vector2" />
    <multiply name="scaled_uv" type="vector2">
      <input name="in1" type="vector2" nodename="uv" />
      <input name="in2" type="float" interfacename="scale" />
    </multiply>
    <noise2d name="noise" type="float">
      <input name="texcoord" type="vector2" nodename="scaled_uv" />
      <input name="amplitude" type="float" value="0.50" />
    </noise2d>
    <image name="veins" type="color3">
      <input name="file" type="filename" interfacename="pattern" />
      <input name="texcoord" type="vector2" nodename="scaled_uv" />
    </image>
    <mix name="blend" type="color3">
      <input name="fg" type="color3" nodename="veins" />
      <input name="bg" type="color3" interfacename="base" />
      <input name="mix" type="float" nodename="noise" />
    </mix>
    <separate3 name="channels" type="multioutput">
      <input name="in" type="color3" nodename="blend" />
      <output name="outr" type="float" />
      <output name="outg" type="float" />
      <output name="outb" type="float" />
    </separate3>
    <output name="color" type="color3" nodename="blend" />
    <output name="rough" type="float" nodename="channels" output="outg" />
  </nodegraph>
  <gltf_pbr name="SHD_marble" type="surfaceshader">
    <input name="base_color" type="color3" nodegraph="NG_marble" output="color" />
  </gltf_pbr>
  <surfacematerial name="marble" type="material">
    <input name="surfaceshader" type="surfaceshader" nodename="SHD_marble" />
  </surfacematerial>
</materialx>
"#;

fn read_with_library(xml: &str) -> Document {
    let mut doc = read_document(xml).expect("Document should parse");
    doc.import_library(&standard_library());
    doc
}

fn round_trip(doc: &Document) -> Document {
    let converter = Converter::default();
    let json = converter
        .materialx_to_gltf_string(doc)
        .expect("Export should succeed");
    converter
        .gltf_string_to_materialx(&json, &standard_library())
        .expect("Import should succeed")
}

#[test]
fn marble_round_trip() {
    let doc = read_with_library(MARBLE);
    let report = doc.validate();
    assert!(report.is_valid(), "{report}");

    let back = round_trip(&doc);
    assert!(back.validate().is_valid(), "{}", back.validate());
    equivalent(&doc, &back, &EquivalenceOptions::default()).expect("Round trip should be lossless");
}

#[test]
fn round_trip_survives_xml() {
    let doc = read_with_library(MARBLE);
    let back = round_trip(&doc);

    let written = write_document(&back);
    let reread = read_with_library(&written);
    equivalent(&back, &reread, &EquivalenceOptions::default()).expect("XML should round trip");
}

#[test]
fn exported_graph_is_stable() {
    let doc = read_with_library(MARBLE);
    let converter = Converter::default();
    let first = converter.materialx_to_gltf(&doc).expect("export");

    let back = converter
        .gltf_to_materialx(&first, &standard_library())
        .expect("import");
    let second = converter.materialx_to_gltf(&back).expect("export again");

    assert_eq!(first.procedurals(), second.procedurals());
    assert_eq!(first.materials, second.materials);
}

#[test]
fn material_binding_names_graph_output() {
    let doc = read_with_library(MARBLE);
    let gltf: GltfDocument = Converter::default().materialx_to_gltf(&doc).expect("export");

    let slot = gltf.materials[0]
        .slot("pbrMetallicRoughness", "baseColorTexture")
        .expect("base color slot");
    let lookup = &slot["extensions"]["KHR_texture_procedurals"];
    assert_eq!(lookup["index"], 0);
    assert_eq!(lookup["output"], "color");
}

#[test]
fn file_inputs_keep_their_uri() {
    let doc = read_with_library(MARBLE);
    let gltf = Converter::default().materialx_to_gltf(&doc).expect("export");
    assert!(
        gltf.images
            .iter()
            .any(|image| image.uri.as_deref() == Some("veins.png"))
    );

    let back = Converter::default()
        .gltf_to_materialx(&gltf, &standard_library())
        .expect("import");
    let graph = back.node_graph("NG_marble").expect("graph");
    let pattern = &graph.inputs["pattern"];
    assert_eq!(pattern.value.as_deref(), Some("veins.png"));
    assert_eq!(pattern.attribute("colorspace"), Some("srgb_texture"));
}

#[test]
fn value_differences_are_detected() {
    let doc = read_with_library(MARBLE);
    let changed = read_with_library(&MARBLE.replace("value=\"4.0\"", "value=\"5.0\""));
    assert!(equivalent(&doc, &changed, &EquivalenceOptions::default()).is_err());

    let options = EquivalenceOptions {
        compare_values: false,
        ..EquivalenceOptions::default()
    };
    assert!(equivalent(&doc, &changed, &options).is_ok());
}
