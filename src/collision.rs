//! Collision heightfield extraction for the physics backend.
//!
//! Walks a patch's encoded heightmap texture chunk by chunk and decodes a
//! dense float heightfield at a requested mip level (0-2, each level halving
//! vertex density). Sampling is chunk-aligned so the reduced grid stays
//! consistent with the shared-vertex heightmap model. Partial re-cooks only
//! touch the LOD-scaled footprint of an edited rectangle.

use crate::bounds::SampleRect;
use crate::chunk::CHUNKS_PER_EDGE;
use crate::error::TerrainError;
use crate::heightmap_codec::{decode_height, is_hole_texel, read_texel};
use crate::patch::{Patch, PatchInfo};

/// Highest supported collision mip level.
pub const MAX_COLLISION_LOD: u32 = 2;

/// Dense heightfield descriptor handed to the physics backend.
///
/// Heights at hole samples are NOT zeroed; the per-sample `holes` mask is
/// exposed alongside so the backend can apply its own hole policy.
#[derive(Clone, Debug)]
pub struct CollisionHeightfield {
    pub lod: u32,
    /// Samples along one edge.
    pub size: usize,
    /// Row-major world-space heights, `size * size` entries.
    pub heights: Vec<f32>,
    /// Row-major hole flags (true = no collision surface), `size * size`.
    pub holes: Vec<bool>,
}

/// Per-chunk and total edge sizes of the collision grid at `lod`.
/// Returns `(chunk_cells, field_size)` where a chunk contributes
/// `chunk_cells + 1` samples per axis (borders shared).
fn collision_sizes(info: &PatchInfo, lod: u32) -> (usize, usize) {
    let chunk_cells = ((info.chunk_size + 1) >> lod) - 1;
    (chunk_cells, chunk_cells * CHUNKS_PER_EDGE + 1)
}

fn clamp_lod(info: &PatchInfo, lod: u32) -> u32 {
    let mut lod = lod.min(MAX_COLLISION_LOD);
    // Never reduce a chunk below a single cell.
    while lod > 0 && ((info.chunk_size + 1) >> lod) < 2 {
        lod -= 1;
    }
    lod
}

/// Decode one collision sample from the texture.
fn sample(
    texture: &[u8],
    info: &PatchInfo,
    chunk_x: usize,
    chunk_z: usize,
    x: usize,
    z: usize,
    lod: u32,
) -> (f32, bool) {
    let tx = chunk_x * info.vertex_count_edge + (x << lod);
    let tz = chunk_z * info.vertex_count_edge + (z << lod);
    let texel = read_texel(texture, info, tx, tz);
    let height = decode_height(texel[0], texel[1]) * info.patch_height + info.patch_offset;
    (height, is_hole_texel(texel[2], texel[3]))
}

/// Generate the full collision heightfield for a patch at `lod`.
pub fn generate(patch: &Patch, lod: u32) -> Result<CollisionHeightfield, TerrainError> {
    let texture = patch
        .heightmap
        .as_deref()
        .ok_or(TerrainError::MissingAsset("heightmap"))?;
    let info = &patch.info;
    let lod = clamp_lod(info, lod);
    let (chunk_cells, field_size) = collision_sizes(info, lod);

    let mut field = CollisionHeightfield {
        lod,
        size: field_size,
        heights: vec![0.0; field_size * field_size],
        holes: vec![false; field_size * field_size],
    };

    for chunk_z in 0..CHUNKS_PER_EDGE {
        for chunk_x in 0..CHUNKS_PER_EDGE {
            for z in 0..=chunk_cells {
                for x in 0..=chunk_cells {
                    let (height, hole) = sample(texture, info, chunk_x, chunk_z, x, z, lod);
                    let index =
                        (chunk_z * chunk_cells + z) * field_size + chunk_x * chunk_cells + x;
                    field.heights[index] = height;
                    field.holes[index] = hole;
                }
            }
        }
    }
    Ok(field)
}

/// Re-cook only the samples of `field` whose LOD-scaled footprint overlaps
/// the edited heightmap rectangle, skipping chunks entirely outside it.
pub fn modify(
    patch: &Patch,
    field: &mut CollisionHeightfield,
    rect: &SampleRect,
) -> Result<(), TerrainError> {
    let texture = patch
        .heightmap
        .as_deref()
        .ok_or(TerrainError::MissingAsset("heightmap"))?;
    let info = &patch.info;
    let rect = rect.clamped(info.heightmap_size);
    if rect.is_empty() {
        return Err(TerrainError::InvalidRegion {
            rect,
            heightmap_size: info.heightmap_size,
        });
    }
    let lod = field.lod;
    let (chunk_cells, field_size) = collision_sizes(info, lod);
    debug_assert_eq!(field.size, field_size);

    // Edited heightmap rect scaled into collision-grid coordinates,
    // widened to whole LOD cells.
    let footprint = SampleRect::new(
        rect.x >> lod,
        rect.z >> lod,
        ((rect.right() - 1) >> lod) - (rect.x >> lod) + 1,
        ((rect.bottom() - 1) >> lod) - (rect.z >> lod) + 1,
    )
    .clamped(field_size);

    for chunk_z in 0..CHUNKS_PER_EDGE {
        for chunk_x in 0..CHUNKS_PER_EDGE {
            let chunk_rect = SampleRect::new(
                (chunk_x * chunk_cells) as i32,
                (chunk_z * chunk_cells) as i32,
                chunk_cells as i32 + 1,
                chunk_cells as i32 + 1,
            );
            let overlap = chunk_rect.intersection(&footprint);
            if overlap.is_empty() {
                continue;
            }
            for (fx, fz) in overlap.iter() {
                let x = fx as usize - chunk_x * chunk_cells;
                let z = fz as usize - chunk_z * chunk_cells;
                let (height, hole) = sample(texture, info, chunk_x, chunk_z, x, z, lod);
                let index = fz as usize * field_size + fx as usize;
                field.heights[index] = height;
                field.holes[index] = hole;
            }
        }
    }
    Ok(())
}
