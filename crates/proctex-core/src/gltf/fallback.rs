//! Placeholder image/texture pair for procedurally driven texture slots

use super::{FALLBACK_IMAGE_NAME, GltfDocument, Image, Texture};
use indexmap::IndexMap;
use tracing::debug;

/// Hands out one texture index per fallback URI for the lifetime of a
/// single export
#[derive(Debug, Default)]
pub struct FallbackRegistry {
    resolved: IndexMap<String, usize>,
}

impl FallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the texture showing `uri`, creating the image and texture
    /// entries the first time a URI is seen
    pub fn ensure(&mut self, gltf: &mut GltfDocument, uri: &str) -> usize {
        if let Some(&texture) = self.resolved.get(uri) {
            return texture;
        }

        let image = match gltf
            .images
            .iter()
            .position(|image| image.uri.as_deref() == Some(uri))
        {
            Some(image) => image,
            None => {
                gltf.images.push(Image {
                    name: Some(FALLBACK_IMAGE_NAME.to_string()),
                    uri: Some(uri.to_string()),
                    ..Image::default()
                });
                gltf.images.len() - 1
            }
        };

        let texture = match gltf
            .textures
            .iter()
            .position(|texture| texture.source == Some(image))
        {
            Some(texture) => texture,
            None => {
                gltf.textures.push(Texture {
                    source: Some(image),
                    ..Texture::default()
                });
                gltf.textures.len() - 1
            }
        };

        debug!("Fallback texture {texture} for {uri}");
        self.resolved.insert(uri.to_string(), texture);
        texture
    }

    /// Number of distinct fallback URIs registered
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
