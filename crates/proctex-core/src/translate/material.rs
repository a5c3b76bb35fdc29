//! Material texture slots driven by procedural graphs
//!
//! Each supported shading model maps a fixed list of shader inputs onto glTF
//! material texture slots. On export, a shader input connected to a node
//! graph becomes a slot holding the fallback texture plus a lookup of the
//! graph; on import the lookup is turned back into a `nodegraph` connection.

use super::ExportContext;
use super::import::ImportedGraphs;
use crate::gltf::{GltfDocument, Material, ProceduralLookup, TextureInfo, UNLIT_EXTENSION};
use crate::mtlx::{
    Document, MATERIAL_TYPE, Node, Port, SURFACE_MATERIAL_CATEGORY, SURFACE_SHADER_TYPE, Source,
    attr,
};
use crate::names::default_name;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

/// Input of a material node that holds its surface shader
const SURFACE_SHADER_INPUT: &str = "surfaceshader";

/// One shader input and the glTF texture slot it lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBinding {
    pub shader_input: &'static str,
    pub slot: &'static str,
    /// Material property the slot is nested in; empty for top-level slots
    pub sub_block: &'static str,
}

const fn channel(
    shader_input: &'static str,
    slot: &'static str,
    sub_block: &'static str,
) -> ChannelBinding {
    ChannelBinding {
        shader_input,
        slot,
        sub_block,
    }
}

const PBR_SUB_BLOCK: &str = "pbrMetallicRoughness";

pub const PBR_CHANNELS: &[ChannelBinding] = &[
    channel("base_color", "baseColorTexture", PBR_SUB_BLOCK),
    channel("metallic", "metallicRoughnessTexture", PBR_SUB_BLOCK),
    channel("roughness", "metallicRoughnessTexture", PBR_SUB_BLOCK),
    channel("normal", "normalTexture", ""),
    channel("occlusion", "occlusionTexture", ""),
    channel("emissive", "emissiveTexture", ""),
];

pub const UNLIT_CHANNELS: &[ChannelBinding] =
    &[channel("emission_color", "baseColorTexture", PBR_SUB_BLOCK)];

/// Shading models with a channel table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingModel {
    Pbr,
    Unlit,
}

impl ShadingModel {
    /// Select a model from a shader node category
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "gltf_pbr" => Some(Self::Pbr),
            "surface_unlit" => Some(Self::Unlit),
            _ => None,
        }
    }

    /// Shader node category of this model
    pub fn category(self) -> &'static str {
        match self {
            Self::Pbr => "gltf_pbr",
            Self::Unlit => "surface_unlit",
        }
    }

    pub fn channels(self) -> &'static [ChannelBinding] {
        match self {
            Self::Pbr => PBR_CHANNELS,
            Self::Unlit => UNLIT_CHANNELS,
        }
    }
}

fn surface_shader<'a>(doc: &'a Document, material: &Node) -> Option<&'a Node> {
    let input = material.input(SURFACE_SHADER_INPUT)?;
    match input.source() {
        Source::Node { name, .. } => doc.node(name),
        _ => None,
    }
}

/// Write one material node, exporting the graphs its shader reads from.
///
/// Returns false when the material has no shader of a supported model.
pub(crate) fn export_material(ctx: &mut ExportContext, doc: &Document, material: &Node) -> bool {
    let Some(shader) = surface_shader(doc, material) else {
        warn!("Material '{}' has no surface shader", material.name);
        return false;
    };
    let Some(model) = ShadingModel::from_category(&shader.category) else {
        warn!(
            "Material '{}': unsupported shading model '{}'",
            material.name, shader.category
        );
        return false;
    };

    let mut gltf_material = Material {
        name: Some(material.name.clone()),
        ..Material::default()
    };

    for binding in model.channels() {
        let Some(input) = shader.input(binding.shader_input) else {
            continue;
        };
        let Source::NodeGraph { name, output } = input.source() else {
            debug!(
                "{}/{}: not connected to a node graph",
                shader.name, binding.shader_input
            );
            continue;
        };
        let Some(graph) = doc.node_graph(name) else {
            error!(
                "{}/{}: node graph '{name}' not found",
                shader.name, binding.shader_input
            );
            continue;
        };
        let Some((index, output_count)) = ctx
            .ensure_graph(doc, graph)
            .map(|exported| (exported.index, exported.references.outputs.len()))
        else {
            continue;
        };

        let lookup = ProceduralLookup {
            index,
            output: output.filter(|_| output_count > 1).map(str::to_string),
        };
        if output_count > 1 && lookup.output.is_none() {
            warn!(
                "{}/{}: node graph '{name}' has several outputs but none is selected",
                shader.name, binding.shader_input
            );
        }

        let uri = ctx.options.fallback_uri.clone();
        let fallback = ctx.fallback.ensure(&mut ctx.gltf, &uri);
        let info = TextureInfo::procedural(fallback, &lookup);
        match serde_json::to_value(&info) {
            Ok(value) => gltf_material.set_slot(binding.sub_block, binding.slot, value),
            Err(err) => error!("{}: cannot write {}: {err}", material.name, binding.slot),
        }
    }

    if model == ShadingModel::Unlit {
        gltf_material.set_extension(UNLIT_EXTENSION, json!({}));
        ctx.gltf.mark_extension_used(UNLIT_EXTENSION);
    }

    debug!("Exported material '{}'", material.name);
    ctx.gltf.materials.push(gltf_material);
    true
}

fn slot_lookup(material: &Material, binding: &ChannelBinding) -> Option<ProceduralLookup> {
    let value: &Value = material.slot(binding.sub_block, binding.slot)?;
    let info: TextureInfo = serde_json::from_value(value.clone()).ok()?;
    info.procedural_lookup()
}

/// Rebuild shader and material nodes for one glTF material
pub(crate) fn import_material(doc: &mut Document, material: &Material, graphs: &ImportedGraphs) {
    let model = if material.has_extension(UNLIT_EXTENSION) {
        ShadingModel::Unlit
    } else {
        ShadingModel::Pbr
    };

    let material_name = doc.create_valid_child_name(
        material
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&default_name(MATERIAL_TYPE)),
    );
    let shader_name = doc.create_valid_child_name(&format!("SHD_{material_name}"));
    let mut shader = Node::new(model.category(), shader_name.as_str(), SURFACE_SHADER_TYPE);

    for binding in model.channels() {
        let Some(lookup) = slot_lookup(material, binding) else {
            continue;
        };
        let Some(graph) = graphs.get(lookup.index) else {
            error!(
                "{material_name}/{}: procedural {} was not imported",
                binding.slot, lookup.index
            );
            continue;
        };
        let Some(value_type) = graph.output_type(lookup.output.as_deref()) else {
            error!(
                "{material_name}/{}: node graph '{}' has no output {:?}",
                binding.slot, graph.name, lookup.output
            );
            continue;
        };

        let mut input = Port::new(binding.shader_input, value_type)
            .with_attribute(attr::NODE_GRAPH, graph.name.as_str());
        if graph.outputs.len() > 1 {
            if let Some(output) = lookup.output.as_deref().and_then(|key| graph.output_name(key)) {
                input.set_attribute(attr::OUTPUT, output);
            }
        }
        shader.add_input(input);
    }

    let material_node = Node::new(SURFACE_MATERIAL_CATEGORY, material_name.as_str(), MATERIAL_TYPE)
        .with_input(
            Port::new(SURFACE_SHADER_INPUT, SURFACE_SHADER_TYPE)
                .with_attribute(attr::NODE_NAME, shader_name.as_str()),
        );
    debug!("Imported material '{material_name}' with {} bindings", shader.inputs.len());
    doc.add_node(shader);
    doc.add_node(material_node);
}

/// Rebuild every material of a glTF document
pub(crate) fn import_materials(gltf: &GltfDocument, doc: &mut Document, graphs: &ImportedGraphs) {
    for material in &gltf.materials {
        import_material(doc, material, graphs);
    }
}
