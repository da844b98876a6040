//! Validation des images et couverture de remplacement
//!
//! Le moteur ne rend rien lui-même : il vérifie seulement que les octets
//! forment une image décodable avant de les remettre à l'appelant ou au cache.

use crate::error::DecodeError;
use crate::source::{CoverArtifact, Provenance};
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use once_cell::sync::Lazy;
use std::io::Cursor;

/// Dimensions du placeholder (proportions d'une jaquette de boîtier)
pub const PLACEHOLDER_WIDTH: u32 = 160;
pub const PLACEHOLDER_HEIGHT: u32 = 224;

/// Informations retournées par un décodage réussi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverInfo {
    pub width: u32,
    pub height: u32,
}

/// Collaborateur de décodage
///
/// Un échec de décodage est traité par le moteur comme un échec de
/// recherche (source distante) ou une absence (source locale).
pub trait CoverDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<CoverInfo, DecodeError>;
}

/// Décodeur par défaut basé sur la crate `image`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl CoverDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<CoverInfo, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError("empty payload".to_string()));
        }
        let img = image::load_from_memory(bytes).map_err(|e| DecodeError(e.to_string()))?;
        Ok(CoverInfo {
            width: img.width(),
            height: img.height(),
        })
    }
}

static PLACEHOLDER_PNG: Lazy<Bytes> = Lazy::new(|| {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, Rgba([96, 96, 96, 255]));

    let mut buffer = Vec::new();
    match DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png) {
        Ok(()) => Bytes::from(buffer),
        Err(e) => {
            tracing::warn!("Cannot encode placeholder cover: {}", e);
            Bytes::new()
        }
    }
});

/// Artefact de remplacement renvoyé quand aucune source n'aboutit
///
/// Toujours les mêmes octets, construits une seule fois par processus.
pub fn placeholder() -> CoverArtifact {
    CoverArtifact::new(PLACEHOLDER_PNG.clone(), Provenance::Placeholder)
        .with_dimensions(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT)
}
