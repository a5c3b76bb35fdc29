//! # Proctex Core
//!
//! Procedural texture graphs between MaterialX and glTF.
//!
//! MaterialX node graphs are written as `KHR_texture_procedurals`
//! descriptors, and glTF materials whose texture slots carry procedural
//! lookups are rebuilt as MaterialX shader and material nodes. The two
//! directions are inverses: importing an exported graph gives back an
//! equivalent graph.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use proctex_core::prelude::*;
//!
//! let doc = read_document_file(Path::new("marble.mtlx"))?;
//! let converter = Converter::default();
//!
//! // MaterialX -> glTF
//! let gltf = converter.materialx_to_gltf(&doc)?;
//!
//! // glTF -> MaterialX
//! let back = converter.gltf_to_materialx(&gltf, &standard_library())?;
//! equivalent(&doc, &back, &EquivalenceOptions::default())?;
//! ```
//!
//! ## Conventions
//!
//! - **Names**: MaterialX names are ASCII letters, digits and `_`; names
//!   arriving from glTF are made valid and unique on import
//! - **Values**: MaterialX value strings use `", "` separators; glTF carries
//!   numbers and arrays
//! - **Failures**: only document-level problems are errors; a bad input,
//!   output or node is logged and skipped

pub mod gltf;
pub mod mtlx;
pub mod names;
pub mod translate;

mod error;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Native documents
    pub use crate::mtlx::equivalence::{EquivalenceOptions, equivalent};
    pub use crate::mtlx::library::standard_library;
    pub use crate::mtlx::validate::ValidationReport;
    pub use crate::mtlx::xml::{
        load_library_file, read_document, read_document_file, write_document,
        write_document_file,
    };
    pub use crate::mtlx::{Document, Node, NodeDef, NodeGraph, Port, Source};

    // glTF
    pub use crate::gltf::GltfDocument;

    // Conversion
    pub use crate::translate::{Converter, ExportOptions, ImportOptions};

    // Error handling
    pub use crate::{Error, Result};
}
