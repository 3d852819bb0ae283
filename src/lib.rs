//! Chunked terrain editing engine.
//!
//! Maintains a tiled heightfield encoded into compact RGBA8 textures
//! (height + hole mask + normal), derives per-vertex normals and a collision
//! heightfield from it, and applies interactive sculpt/paint brushes that
//! mutate sub-regions incrementally. Rendering, physics and editor input are
//! external collaborators: they consume the descriptor types this crate
//! produces and feed brush applications back in.

pub mod bounds;
pub mod chunk;
pub mod collision;
pub mod editing;
pub mod error;
pub mod falloff;
pub mod heightmap_codec;
pub mod heightmap_io;
pub mod patch;
pub mod sculpt;
pub mod splat;
pub mod terrain;
pub mod undo;

pub use bounds::{Aabb, SampleRect};
pub use collision::CollisionHeightfield;
pub use editing::{apply_brush, apply_brush_recorded, BrushOperation, PatchEdit};
pub use error::TerrainError;
pub use falloff::FalloffModel;
pub use heightmap_io::{export_heightmap, import_patch_heightmap, import_terrain_heightmap, ImportAlgorithm};
pub use patch::{Patch, PatchCoord, PatchDescriptor, PatchInfo, UNITS_PER_VERTEX};
pub use sculpt::{BrushParams, NoiseBrushConfig};
pub use terrain::{TerrainGrid, TerrainNoiseConfig};
pub use undo::UndoHistory;
