//! Chunks: the fixed 4x4 sub-tiles of a patch.
//!
//! A chunk stores only its local height range (min + span) for bounds
//! computation; the height samples themselves live on the patch. The grid
//! type exposes bounds-checked accessors so callers never do raw
//! `y * 4 + x` index arithmetic.

use serde::{Deserialize, Serialize};

/// Chunks along one edge of a patch.
pub const CHUNKS_PER_EDGE: usize = 4;
/// Total chunks in a patch.
pub const CHUNKS_PER_PATCH: usize = CHUNKS_PER_EDGE * CHUNKS_PER_EDGE;

/// Local position of a chunk inside its patch's 4x4 grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: usize,
    pub z: usize,
}

impl ChunkPos {
    pub fn new(x: usize, z: usize) -> Self {
        debug_assert!(x < CHUNKS_PER_EDGE && z < CHUNKS_PER_EDGE);
        Self { x, z }
    }
}

/// One sub-tile of a patch, the unit of mesh/LOD generation and of the
/// per-chunk AABB used for brush intersection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub position: ChunkPos,
    /// Local minimum height (world units).
    pub offset: f32,
    /// Local height span (world units). Kept >= 1.0 so the chunk AABB never
    /// degenerates and the quantization range never collapses.
    pub height: f32,
}

impl Chunk {
    pub const MIN_HEIGHT_RANGE: f32 = 1.0;

    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            offset: 0.0,
            height: Self::MIN_HEIGHT_RANGE,
        }
    }

    /// Update the local height range from observed min/max samples.
    pub fn set_height_range(&mut self, min: f32, max: f32) {
        self.offset = min;
        self.height = (max - min).max(Self::MIN_HEIGHT_RANGE);
    }
}

/// The 4x4 chunk grid of a patch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkGrid {
    chunks: Vec<Chunk>,
}

impl ChunkGrid {
    pub fn new() -> Self {
        let mut chunks = Vec::with_capacity(CHUNKS_PER_PATCH);
        for z in 0..CHUNKS_PER_EDGE {
            for x in 0..CHUNKS_PER_EDGE {
                chunks.push(Chunk::new(ChunkPos::new(x, z)));
            }
        }
        Self { chunks }
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        if pos.x >= CHUNKS_PER_EDGE || pos.z >= CHUNKS_PER_EDGE {
            return None;
        }
        self.chunks.get(pos.z * CHUNKS_PER_EDGE + pos.x)
    }

    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        if pos.x >= CHUNKS_PER_EDGE || pos.z >= CHUNKS_PER_EDGE {
            return None;
        }
        self.chunks.get_mut(pos.z * CHUNKS_PER_EDGE + pos.x)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.iter_mut()
    }

    /// Iterate chunk positions in raster order (x fastest).
    pub fn positions() -> impl Iterator<Item = ChunkPos> {
        (0..CHUNKS_PER_EDGE)
            .flat_map(|z| (0..CHUNKS_PER_EDGE).map(move |x| ChunkPos::new(x, z)))
    }
}

impl Default for ChunkGrid {
    fn default() -> Self {
        Self::new()
    }
}
