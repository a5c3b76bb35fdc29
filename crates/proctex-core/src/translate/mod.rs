//! Translation between MaterialX documents and glTF procedural textures
//!
//! Export walks material nodes first, writing every node graph their
//! shaders read from exactly once, then writes any remaining standalone
//! graphs. Import rebuilds every procedural graph before materials so
//! material lookups by index find their graphs.
//!
//! ```rust,ignore
//! use proctex_core::prelude::*;
//!
//! let doc = read_document_file(Path::new("marble.mtlx"))?;
//! let json = Converter::default().materialx_to_gltf_string(&doc)?;
//! ```

mod export;
mod import;
mod material;
mod reference;
pub mod types;

pub use export::ExportedGraph;
pub use import::{ImportedGraph, ImportedGraphs};
pub use material::{ChannelBinding, PBR_CHANNELS, ShadingModel, UNLIT_CHANNELS};
pub use reference::{Positions, ReferenceIndex};

use crate::gltf::{
    DEFAULT_FALLBACK_URI, FallbackRegistry, GltfDocument, MATERIALX_EXTENSION,
    PROCEDURALS_EXTENSION, ProceduralGraph, ProceduralsExtension,
};
use crate::mtlx::{Document, Node, NodeDef, NodeGraph, attr};
use crate::{Error, Result};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Options for MaterialX to glTF conversion
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Image shown by texture slots whose content is procedural
    pub fallback_uri: String,
    /// Write each node's resolved definition name as a `nodedef` attribute
    pub write_nodedef_names: bool,
    /// Written to `asset.generator`
    pub generator: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fallback_uri: DEFAULT_FALLBACK_URI.to_string(),
            write_nodedef_names: false,
            generator: format!("proctex {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Options for glTF to MaterialX conversion
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Record the glTF `asset` block as a `doc` attribute of the document
    pub add_asset_info: bool,
}

/// State shared by every graph and material of one export
#[derive(Debug)]
pub struct ExportContext {
    pub options: ExportOptions,
    pub gltf: GltfDocument,
    pub procedurals: Vec<ProceduralGraph>,
    pub fallback: FallbackRegistry,
    /// Graphs already written, by node graph name
    pub exported: IndexMap<String, ExportedGraph>,
}

impl ExportContext {
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            options: options.clone(),
            gltf: GltfDocument::default(),
            procedurals: Vec::new(),
            fallback: FallbackRegistry::new(),
            exported: IndexMap::new(),
        }
    }

    /// Export a graph unless it was exported before
    pub fn ensure_graph(&mut self, doc: &Document, graph: &NodeGraph) -> Option<&ExportedGraph> {
        if !self.exported.contains_key(&graph.name) {
            let exported = export::export_graph(self, doc, graph)?;
            self.exported.insert(graph.name.clone(), exported);
        } else {
            debug!("Reusing exported node graph '{}'", graph.name);
        }
        self.exported.get(&graph.name)
    }

    /// Export a material node and the graphs it reads from
    pub fn export_material(&mut self, doc: &Document, node: &Node) -> bool {
        material::export_material(self, doc, node)
    }

    /// Assemble the finished glTF document
    pub fn finish(self) -> Result<GltfDocument> {
        let mut gltf = self.gltf;
        gltf.asset.generator = Some(self.options.generator);
        gltf.mark_extension_used(PROCEDURALS_EXTENSION);
        gltf.mark_extension_used(MATERIALX_EXTENSION);
        let block = ProceduralsExtension {
            procedurals: self.procedurals,
        };
        gltf.extensions
            .insert(PROCEDURALS_EXTENSION.to_string(), serde_json::to_value(block)?);
        Ok(gltf)
    }
}

/// Converts whole documents in either direction
#[derive(Debug, Clone, Default)]
pub struct Converter {
    pub export: ExportOptions,
    pub import: ImportOptions,
}

impl Converter {
    pub fn new(export: ExportOptions, import: ImportOptions) -> Self {
        Self { export, import }
    }

    /// Convert a MaterialX document to glTF.
    ///
    /// Fails with [`Error::NothingToExport`] when no node graph could be
    /// written.
    pub fn materialx_to_gltf(&self, doc: &Document) -> Result<GltfDocument> {
        let mut ctx = ExportContext::new(&self.export);

        let mut materials = 0;
        for material in doc.material_nodes() {
            if ctx.export_material(doc, material) {
                materials += 1;
            }
        }
        for graph in doc.node_graphs.values() {
            ctx.ensure_graph(doc, graph);
        }

        if ctx.procedurals.is_empty() {
            return Err(Error::NothingToExport(
                "no node graph with outputs found".to_string(),
            ));
        }
        info!(
            "Exported {} procedurals and {materials} materials",
            ctx.procedurals.len()
        );
        ctx.finish()
    }

    /// Convert a MaterialX document to pretty-printed glTF JSON
    pub fn materialx_to_gltf_string(&self, doc: &Document) -> Result<String> {
        let gltf = self.materialx_to_gltf(doc)?;
        Ok(serde_json::to_string_pretty(&gltf)?)
    }

    /// Convert a glTF document to MaterialX.
    ///
    /// `library` supplies the definitions the produced document resolves
    /// its nodes against.
    pub fn gltf_to_materialx(&self, gltf: &GltfDocument, library: &[NodeDef]) -> Result<Document> {
        if !gltf.uses_extension(PROCEDURALS_EXTENSION) {
            return Err(Error::MissingExtension(PROCEDURALS_EXTENSION.to_string()));
        }
        let Some(procedurals) = gltf.procedurals() else {
            return Err(Error::MissingProcedurals(PROCEDURALS_EXTENSION.to_string()));
        };

        let mut doc = Document::with_library(library);
        if self.import.add_asset_info {
            doc.attributes
                .insert(attr::DOC.to_string(), serde_json::to_string(&gltf.asset)?);
        }

        let graphs = import::import_graphs(gltf, &mut doc, procedurals);
        material::import_materials(gltf, &mut doc, &graphs);
        info!(
            "Imported {} of {} procedurals and {} materials",
            graphs.created(),
            procedurals.len(),
            gltf.materials.len()
        );
        Ok(doc)
    }

    /// Parse glTF JSON and convert it to MaterialX
    pub fn gltf_string_to_materialx(&self, json: &str, library: &[NodeDef]) -> Result<Document> {
        let gltf: GltfDocument = serde_json::from_str(json)?;
        self.gltf_to_materialx(&gltf, library)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mtlx::library::standard_library;
    use crate::mtlx::Port;
    use serde_json::json;

    #[test]
    fn test_missing_extension() {
        let converter = Converter::default();
        let result = converter.gltf_string_to_materialx(r#"{ "asset": { "version": "2.0" } }"#, &[]);
        assert!(matches!(result, Err(Error::MissingExtension(_))));
    }

    #[test]
    fn test_missing_procedurals() {
        let converter = Converter::default();
        let json = json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": [PROCEDURALS_EXTENSION],
        });
        let result = converter.gltf_string_to_materialx(&json.to_string(), &[]);
        assert!(matches!(result, Err(Error::MissingProcedurals(_))));
    }

    #[test]
    fn test_nothing_to_export() {
        let converter = Converter::default();
        let result = converter.materialx_to_gltf(&Document::with_library(&standard_library()));
        assert!(matches!(result, Err(Error::NothingToExport(_))));
    }

    #[test]
    fn test_export_writes_extension_block() {
        let mut doc = Document::with_library(&standard_library());
        let mut graph = NodeGraph::new("g");
        graph.add_node(
            Node::new("constant", "c", "float").with_input(Port::new("value", "float").with_value("0.5")),
        );
        graph.add_output(Port::new("out", "float").with_attribute(attr::NODE_NAME, "c"));
        doc.add_node_graph(graph);

        let gltf = Converter::default().materialx_to_gltf(&doc).expect("export");
        assert_eq!(
            gltf.extensions_used,
            vec![PROCEDURALS_EXTENSION.to_string(), MATERIALX_EXTENSION.to_string()]
        );
        assert_eq!(gltf.procedurals().map(Vec::len), Some(1));
        assert!(gltf.asset.generator.is_some());
    }

    #[test]
    fn test_asset_info() {
        let converter = Converter::new(
            ExportOptions::default(),
            ImportOptions {
                add_asset_info: true,
            },
        );
        let json = json!({
            "asset": { "version": "2.0", "copyright": "me" },
            "extensionsUsed": [PROCEDURALS_EXTENSION],
            "extensions": { PROCEDURALS_EXTENSION: { "procedurals": [] } }
        });
        let doc = converter
            .gltf_string_to_materialx(&json.to_string(), &[])
            .expect("import");
        let info = doc.attributes.get(attr::DOC).expect("doc attribute");
        assert!(info.contains("copyright"));
    }
}
