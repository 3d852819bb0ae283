//! Splat layers: per-vertex paint-layer weights.
//!
//! A patch carries two RGBA8 splatmaps; each channel is one paint layer's
//! weight, for 8 layers total. Weights are stored as bytes (0..=255 mapping
//! to 0.0..=1.0). Layer 0 is the default ground layer and starts at full
//! weight everywhere.

/// Number of splatmap textures per patch.
pub const SPLATMAP_COUNT: usize = 2;
/// Paint layers per splatmap (one per RGBA channel).
pub const LAYERS_PER_SPLATMAP: usize = 4;
/// Total addressable paint layers.
pub const MAX_SPLAT_LAYERS: usize = SPLATMAP_COUNT * LAYERS_PER_SPLATMAP;

/// One splatmap sample: four layer weights packed as RGBA bytes.
pub type SplatSample = [u8; 4];

/// Default sample for the first splatmap: full weight on layer 0.
pub const DEFAULT_SPLAT_PRIMARY: SplatSample = [255, 0, 0, 0];
/// Default sample for the second splatmap: all layers empty.
pub const DEFAULT_SPLAT_SECONDARY: SplatSample = [0, 0, 0, 0];

/// Map a global layer index to its (splatmap, channel) slot.
/// Returns `None` for indices outside the 8 supported layers.
pub fn layer_slot(layer: usize) -> Option<(usize, usize)> {
    if layer >= MAX_SPLAT_LAYERS {
        return None;
    }
    Some((layer / LAYERS_PER_SPLATMAP, layer % LAYERS_PER_SPLATMAP))
}

/// Default sample for a given splatmap index.
pub fn default_sample(splatmap: usize) -> SplatSample {
    if splatmap == 0 {
        DEFAULT_SPLAT_PRIMARY
    } else {
        DEFAULT_SPLAT_SECONDARY
    }
}

/// Byte weight as a normalized float.
pub fn weight_to_float(byte: u8) -> f32 {
    byte as f32 / 255.0
}

/// Normalized float weight quantized back to a byte.
pub fn weight_to_byte(weight: f32) -> u8 {
    (weight.clamp(0.0, 1.0) * 255.0).round() as u8
}
