//! Terrain grid: the set of patches making up one terrain.
//!
//! Patches are keyed by integer (x, z) coordinates with no implied adjacency
//! beyond coordinate arithmetic. Patches are only ever added or removed by
//! explicit grid (re)creation, never by sculpting. Cross-patch chunk
//! neighbors for LOD seam stitching are resolved by a pure lookup instead of
//! cached back-references, so recreating a patch can never leave a dangling
//! link.

use std::collections::HashMap;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use crate::bounds::Aabb;
use crate::chunk::{ChunkPos, CHUNKS_PER_EDGE};
use crate::patch::{Patch, PatchCoord, PatchInfo, UNITS_PER_VERTEX};

/// Parameters for seeding a new patch grid from coherent noise.
#[derive(Clone, Copy, Debug)]
pub struct TerrainNoiseConfig {
    pub seed: u32,
    pub octaves: usize,
    pub frequency: f64,
    pub amplitude: f32,
}

impl Default for TerrainNoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            frequency: 0.0002,
            amplitude: 500.0,
        }
    }
}

/// Identifies one chunk of one patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRef {
    pub patch: PatchCoord,
    pub chunk: ChunkPos,
}

/// Direction to a chunk's edge neighbor, in patch-local axes
/// (top = -z, bottom = +z).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborDirection {
    Left,
    Right,
    Top,
    Bottom,
}

/// The terrain: a set of patches sharing one chunk size and collision LOD.
#[derive(Debug)]
pub struct TerrainGrid {
    chunk_size: usize,
    collision_lod: u32,
    patches: HashMap<PatchCoord, Patch>,
}

impl TerrainGrid {
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size >= 2, "chunk size must be at least 2");
        Self {
            chunk_size,
            collision_lod: 0,
            patches: HashMap::new(),
        }
    }

    pub fn with_collision_lod(mut self, lod: u32) -> Self {
        self.collision_lod = lod;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn collision_lod(&self) -> u32 {
        self.collision_lod
    }

    pub fn patch_info(&self) -> PatchInfo {
        PatchInfo::new(self.chunk_size)
    }

    /// (Re)create a rectangle of flat patches. Existing patches are dropped.
    pub fn create_patch_grid(&mut self, origin: PatchCoord, count_x: usize, count_z: usize) {
        self.create_grid_inner(origin, count_x, count_z, None);
    }

    /// (Re)create a rectangle of patches seeded from deterministic fractal
    /// noise.
    pub fn create_patch_grid_with_noise(
        &mut self,
        origin: PatchCoord,
        count_x: usize,
        count_z: usize,
        noise: TerrainNoiseConfig,
    ) {
        self.create_grid_inner(origin, count_x, count_z, Some(noise));
    }

    fn create_grid_inner(
        &mut self,
        origin: PatchCoord,
        count_x: usize,
        count_z: usize,
        noise: Option<TerrainNoiseConfig>,
    ) {
        self.patches.clear();
        let chunk_size = self.chunk_size;
        let info = PatchInfo::new(chunk_size);
        let fbm = noise.map(|config| {
            (
                Fbm::<Perlin>::new(config.seed)
                    .set_octaves(config.octaves)
                    .set_frequency(config.frequency),
                config.amplitude,
            )
        });

        let coords: Vec<PatchCoord> = (0..count_z)
            .flat_map(|z| {
                (0..count_x)
                    .map(move |x| PatchCoord::new(origin.x + x as i32, origin.z + z as i32))
            })
            .collect();

        // Patch creation is the bulk path; per-edit work stays serial.
        let built: Vec<Patch> = coords
            .into_par_iter()
            .map(|coord| match &fbm {
                None => Patch::new(coord, chunk_size),
                Some((fbm, amplitude)) => {
                    let size = info.heightmap_size;
                    let world_x = coord.x as f64 * info.world_size() as f64;
                    let world_z = coord.z as f64 * info.world_size() as f64;
                    let heights = (0..size * size)
                        .map(|i| {
                            let x = world_x + (i % size) as f64 * UNITS_PER_VERTEX as f64;
                            let z = world_z + (i / size) as f64 * UNITS_PER_VERTEX as f64;
                            fbm.get([x, z]) as f32 * amplitude
                        })
                        .collect();
                    Patch::from_heights(coord, chunk_size, heights)
                }
            })
            .collect();

        for patch in built {
            self.patches.insert(patch.coord, patch);
        }
    }

    pub fn patch(&self, coord: PatchCoord) -> Option<&Patch> {
        self.patches.get(&coord)
    }

    pub fn patch_mut(&mut self, coord: PatchCoord) -> Option<&mut Patch> {
        self.patches.get_mut(&coord)
    }

    pub fn patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.values()
    }

    pub fn patches_mut(&mut self) -> impl Iterator<Item = &mut Patch> {
        self.patches.values_mut()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Patch coordinates in deterministic raster order.
    pub fn sorted_coords(&self) -> Vec<PatchCoord> {
        let mut coords: Vec<PatchCoord> = self.patches.keys().copied().collect();
        coords.sort_by_key(|c| (c.z, c.x));
        coords
    }

    /// Union of all patch bounds. None for an empty terrain.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for patch in self.patches.values() {
            let patch_bounds = patch.bounds();
            bounds = Some(match bounds {
                None => patch_bounds,
                Some(b) => b.merged(&patch_bounds),
            });
        }
        bounds
    }

    /// Resolve a chunk's edge neighbor, crossing patch boundaries when the
    /// chunk sits on the patch edge. Returns None when the neighboring patch
    /// does not exist.
    pub fn chunk_neighbor(
        &self,
        patch: PatchCoord,
        chunk: ChunkPos,
        direction: NeighborDirection,
    ) -> Option<ChunkRef> {
        let last = CHUNKS_PER_EDGE - 1;
        let (patch_delta, chunk_pos) = match direction {
            NeighborDirection::Left => {
                if chunk.x > 0 {
                    ((0, 0), ChunkPos::new(chunk.x - 1, chunk.z))
                } else {
                    ((-1, 0), ChunkPos::new(last, chunk.z))
                }
            }
            NeighborDirection::Right => {
                if chunk.x < last {
                    ((0, 0), ChunkPos::new(chunk.x + 1, chunk.z))
                } else {
                    ((1, 0), ChunkPos::new(0, chunk.z))
                }
            }
            NeighborDirection::Top => {
                if chunk.z > 0 {
                    ((0, 0), ChunkPos::new(chunk.x, chunk.z - 1))
                } else {
                    ((0, -1), ChunkPos::new(chunk.x, last))
                }
            }
            NeighborDirection::Bottom => {
                if chunk.z < last {
                    ((0, 0), ChunkPos::new(chunk.x, chunk.z + 1))
                } else {
                    ((0, 1), ChunkPos::new(chunk.x, 0))
                }
            }
        };
        let target = PatchCoord::new(patch.x + patch_delta.0, patch.z + patch_delta.1);
        self.patches.contains_key(&target).then_some(ChunkRef {
            patch: target,
            chunk: chunk_pos,
        })
    }
}
