//! glTF wire format for procedural textures
//!
//! Only the parts of a glTF document the procedural extension touches are
//! typed: the asset block, extension lists, materials, textures and images.
//! Everything else rides along in `other` maps so imported documents keep
//! keys this crate does not understand.

mod fallback;

pub use fallback::FallbackRegistry;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extension carrying procedural graphs and texture slot lookups
pub const PROCEDURALS_EXTENSION: &str = "KHR_texture_procedurals";

/// Extension naming the MaterialX node set the graphs are written in
pub const MATERIALX_EXTENSION: &str = "EXT_texture_procedurals_mx_1_39";

/// Extension marking a material as unlit
pub const UNLIT_EXTENSION: &str = "KHR_materials_unlit";

/// `nodetype` of a procedural graph descriptor
pub const GRAPH_NODETYPE: &str = "nodegraph";

/// `nodetype` of input descriptors
pub const INPUT_NODETYPE: &str = "input";

/// `nodetype` of output descriptors
pub const OUTPUT_NODETYPE: &str = "output";

/// Name given to the fallback image
pub const FALLBACK_IMAGE_NAME: &str = "KHR_texture_procedural_fallback";

/// Image used for texture slots whose content is procedural
pub const DEFAULT_FALLBACK_URI: &str = "khr_texture_procedural_fallback.png";

/// glTF version written to the asset block
pub const GLTF_VERSION: &str = "2.0";

/// Extra key/value metadata preserved verbatim
pub type AttributeBag = IndexMap<String, AttributeValue>;

/// A small tagged JSON value for open-ended metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<AttributeValue>),
    Object(IndexMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Whether this is a JSON `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as a MaterialX attribute string; `null` renders empty
    pub fn to_attribute_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Number(number) => crate::translate::types::format_number(number),
            Self::String(value) => value.clone(),
            Self::Array(values) => values
                .iter()
                .map(Self::to_attribute_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Object(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Top-level glTF document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfDocument {
    #[serde(default)]
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<Texture>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

impl GltfDocument {
    /// Whether an extension is listed in `extensionsUsed`
    pub fn uses_extension(&self, name: &str) -> bool {
        self.extensions_used.iter().any(|used| used == name)
    }

    /// List an extension in `extensionsUsed` once
    pub fn mark_extension_used(&mut self, name: &str) {
        if !self.uses_extension(name) {
            self.extensions_used.push(name.to_string());
        }
    }

    /// Append a new image + texture pair for a file reference.
    ///
    /// Every call adds new entries; deduplication is left to callers.
    pub fn add_image_texture(&mut self, uri: &str) -> usize {
        self.images.push(Image {
            uri: Some(uri.to_string()),
            ..Image::default()
        });
        self.textures.push(Texture {
            source: Some(self.images.len() - 1),
            ..Texture::default()
        });
        self.textures.len() - 1
    }

    /// URI of the image behind a texture
    pub fn texture_uri(&self, texture: usize) -> Option<&str> {
        let source = self.textures.get(texture)?.source?;
        self.images.get(source)?.uri.as_deref()
    }

    /// The `procedurals` array of the procedural extension block
    pub fn procedurals(&self) -> Option<&Vec<Value>> {
        self.extensions
            .get(PROCEDURALS_EXTENSION)?
            .get("procedurals")?
            .as_array()
    }
}

/// The `asset` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: GLTF_VERSION.to_string(),
            generator: None,
            copyright: None,
            other: IndexMap::new(),
        }
    }
}

/// A material; texture slots are addressed by name through [`Material::slot`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Material {
    /// Read a texture slot, optionally nested under a sub-block such as
    /// `pbrMetallicRoughness`
    pub fn slot(&self, sub_block: &str, slot: &str) -> Option<&Value> {
        if sub_block.is_empty() {
            self.properties.get(slot)
        } else {
            self.properties.get(sub_block)?.get(slot)
        }
    }

    /// Write a texture slot, creating the sub-block when needed
    pub fn set_slot(&mut self, sub_block: &str, slot: &str, value: Value) {
        if sub_block.is_empty() {
            self.properties.insert(slot.to_string(), value);
            return;
        }
        let block = self
            .properties
            .entry(sub_block.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !block.is_object() {
            *block = Value::Object(Map::new());
        }
        if let Value::Object(block) = block {
            block.insert(slot.to_string(), value);
        }
    }

    /// Whether a material-level extension is present
    pub fn has_extension(&self, name: &str) -> bool {
        self.properties
            .get("extensions")
            .and_then(|extensions| extensions.get(name))
            .is_some()
    }

    /// Add a material-level extension block
    pub fn set_extension(&mut self, name: &str, value: Value) {
        let extensions = self
            .properties
            .entry("extensions".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(extensions) = extensions {
            extensions.insert(name.to_string(), value);
        }
    }
}

/// A texture slot reference (`textureInfo` in glTF)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Value>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

impl TextureInfo {
    /// A slot pointing at a fallback texture and a procedural graph
    pub fn procedural(fallback: usize, lookup: &ProceduralLookup) -> Self {
        let mut extensions = IndexMap::new();
        extensions.insert(
            PROCEDURALS_EXTENSION.to_string(),
            serde_json::to_value(lookup).unwrap_or(Value::Null),
        );
        Self {
            index: fallback,
            extensions,
            other: IndexMap::new(),
        }
    }

    /// The procedural graph this slot is driven by, if any
    pub fn procedural_lookup(&self) -> Option<ProceduralLookup> {
        let value = self.extensions.get(PROCEDURALS_EXTENSION)?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// `{index, output?}` lookup of a procedural graph output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceduralLookup {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// One procedural graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodetype: String,
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, ProceduralPort>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, ProceduralPort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ProceduralNode>,
    #[serde(flatten)]
    pub attributes: AttributeBag,
}

/// One operator node of a procedural graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodetype: String,
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, ProceduralPort>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, ProceduralPort>,
    #[serde(flatten)]
    pub attributes: AttributeBag,
}

/// An input or output of a graph or node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProceduralPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodetype: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(flatten)]
    pub metadata: AttributeBag,
}

/// Where a procedural port gets its data from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Connection<'a> {
    /// An input of the enclosing graph, by name
    ToGraphInput(&'a str),
    /// A node of the enclosing graph, by position, optionally one of its
    /// outputs
    ToNodeOutput { node: usize, output: Option<&'a str> },
    /// A literal value or file reference
    Literal(Literal<'a>),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Value(&'a Value),
    Texture(usize),
}

impl ProceduralPort {
    /// Create a port of a nodetype and type
    pub fn new(nodetype: &str, value_type: &str) -> Self {
        Self {
            nodetype: Some(nodetype.to_string()),
            value_type: Some(value_type.to_string()),
            ..Self::default()
        }
    }

    /// Decide the port's connection once: references beat literals, and a
    /// file reference beats an inline value
    pub fn connection(&self) -> Connection<'_> {
        if let Some(input) = self.input.as_deref() {
            Connection::ToGraphInput(input)
        } else if let Some(node) = self.node {
            Connection::ToNodeOutput {
                node,
                output: self.output.as_deref(),
            }
        } else if let Some(texture) = self.texture {
            Connection::Literal(Literal::Texture(texture))
        } else if let Some(value) = &self.value {
            Connection::Literal(Literal::Value(value))
        } else {
            Connection::None
        }
    }
}

/// Contents of the document-level procedural extension block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProceduralsExtension {
    pub procedurals: Vec<ProceduralGraph>,
}
