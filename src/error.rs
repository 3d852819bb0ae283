//! Error types for terrain editing operations.

use crate::bounds::SampleRect;

/// Errors raised by terrain data operations.
///
/// Recoverable kinds (`InvalidRegion`, `MissingAsset`) are local to one
/// patch: callers log them and keep processing the rest of a brush stroke.
/// `FormatMismatch` aborts an import before any mutation happens.
#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    /// Modification rectangle is out of heightmap bounds or has zero area.
    #[error("invalid modification region {rect:?} for heightmap of size {heightmap_size}")]
    InvalidRegion {
        rect: SampleRect,
        heightmap_size: usize,
    },

    /// Import image channel layout does not match the chosen decode algorithm.
    #[error("image format mismatch: {0}")]
    FormatMismatch(String),

    /// A heightmap or splatmap texture is absent where an operation expects it.
    #[error("missing {0} texture")]
    MissingAsset(&'static str),

    /// Patch quantization range collapsed. Clamping at the range source is
    /// supposed to make this unreachable; it exists so the codec never has
    /// to divide by zero silently.
    #[error("degenerate patch height range ({0})")]
    DegenerateRange(f32),
}
