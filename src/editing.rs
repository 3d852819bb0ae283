//! The dirty-region editing pipeline.
//!
//! One brush application runs the same ordered stages every time: resolve
//! candidate patches and chunks by bounds intersection, derive the
//! patch-local sample rectangle (with its one-sample halo), run the selected
//! operation, recommit through the patch (re-range, re-encode, re-normal),
//! re-cook the collision footprint, and refresh derived bounds. Recoverable
//! errors skip one patch and never abort the rest of the stroke.

use log::{debug, warn};

use crate::bounds::{Aabb, SampleRect};
use crate::chunk::ChunkGrid;
use crate::collision;
use crate::error::TerrainError;
use crate::patch::{Patch, PatchCoord, UNITS_PER_VERTEX};
use crate::sculpt::{self, BrushApplication, BrushParams, NoiseBrushConfig};
use crate::terrain::TerrainGrid;
use crate::undo::{RegionSnapshot, StrokeSnapshot, UndoHistory};

/// The brush operation selected by the editor.
#[derive(Clone, Copy, Debug)]
pub enum BrushOperation {
    /// Raise/lower terrain (sign of strength).
    Sculpt,
    /// Pull terrain toward a target height.
    Flatten { target_height: f32 },
    /// Blend toward the neighborhood mean within the given sample radius.
    Smooth { filter_radius: i32 },
    /// Displace by coherent noise.
    Noise(NoiseBrushConfig),
    /// Carve or restore holes.
    Holes,
    /// Add weight to one of the 8 paint layers.
    Paint { layer: usize },
}

impl BrushOperation {
    /// Whether the operation mutates height samples (and therefore needs
    /// re-ranging, normal recompute and collision re-cook).
    pub fn affects_height(&self) -> bool {
        matches!(
            self,
            BrushOperation::Sculpt
                | BrushOperation::Flatten { .. }
                | BrushOperation::Smooth { .. }
                | BrushOperation::Noise(_)
        )
    }

    /// Operations with no meaningful inverse reject non-positive strength
    /// here, before any engine code runs.
    fn requires_positive_strength(&self) -> bool {
        matches!(
            self,
            BrushOperation::Flatten { .. } | BrushOperation::Smooth { .. }
        )
    }
}

/// Per-patch outcome of one brush application, the notification surface for
/// render/physics collaborators.
#[derive(Clone, Debug)]
pub struct PatchEdit {
    pub patch: PatchCoord,
    /// The committed sample rectangle (brush rect plus halo, clamped).
    pub rect: SampleRect,
    /// True when the edit re-quantized (and re-encoded) the whole patch.
    pub range_changed: bool,
    /// True when the collision heightfield was regenerated or re-cooked.
    pub collision_refreshed: bool,
}

/// Apply one brush tick at `hit` to every intersecting patch.
///
/// `strength` is pre-scaled by elapsed time and sign-flipped by the caller's
/// inverse modifier. Zero strength is a no-op, as is a hit that touches no
/// patch.
pub fn apply_brush(
    grid: &mut TerrainGrid,
    operation: BrushOperation,
    params: &BrushParams,
    hit: [f32; 3],
    strength: f32,
) -> Vec<PatchEdit> {
    if strength == 0.0 {
        return Vec::new();
    }
    if operation.requires_positive_strength() && strength < 0.0 {
        debug!("{operation:?} has no inverse mode, ignoring negative strength");
        return Vec::new();
    }

    let half = params.size * 0.5;
    let brush_bounds = Aabb::from_center_extents(hit, [half, f32::MAX * 0.25, half]);
    let collision_lod = grid.collision_lod();

    let mut edits = Vec::new();
    for coord in grid.sorted_coords() {
        let patch = grid.patch_mut(coord).expect("coord from sorted_coords");
        match apply_to_patch(patch, operation, params, hit, strength, &brush_bounds, collision_lod)
        {
            Ok(Some(edit)) => edits.push(edit),
            Ok(None) => {}
            Err(error) => {
                warn!("brush skipped patch ({}, {}): {error}", coord.x, coord.z);
            }
        }
    }
    edits
}

/// `apply_brush` with undo recording: the previous contents of every
/// rectangle the stroke will touch are captured first and pushed onto the
/// history when the stroke changes anything.
pub fn apply_brush_recorded(
    grid: &mut TerrainGrid,
    history: &mut UndoHistory,
    operation: BrushOperation,
    params: &BrushParams,
    hit: [f32; 3],
    strength: f32,
) -> Vec<PatchEdit> {
    let snapshot = capture_stroke(grid, operation, params, hit, strength);
    let edits = apply_brush(grid, operation, params, hit, strength);
    if !edits.is_empty() {
        history.record(snapshot);
    }
    edits
}

/// Pre-stroke capture of every rectangle `apply_brush` is about to modify,
/// using the same candidate resolution as the pipeline itself.
fn capture_stroke(
    grid: &mut TerrainGrid,
    operation: BrushOperation,
    params: &BrushParams,
    hit: [f32; 3],
    strength: f32,
) -> StrokeSnapshot {
    let mut snapshot = StrokeSnapshot::default();
    if strength == 0.0 || (operation.requires_positive_strength() && strength < 0.0) {
        return snapshot;
    }
    let half = params.size * 0.5;
    let brush_bounds = Aabb::from_center_extents(hit, [half, f32::MAX * 0.25, half]);

    for coord in grid.sorted_coords() {
        let rect = {
            let Some(patch) = grid.patch(coord) else {
                continue;
            };
            if !patch.bounds().intersects(&brush_bounds) {
                continue;
            }
            let touches_chunk = ChunkGrid::positions().any(|pos| {
                patch
                    .chunk_bounds(pos)
                    .is_some_and(|bounds| bounds.intersects(&brush_bounds))
            });
            if !touches_chunk {
                continue;
            }
            brush_rect(patch, &brush_bounds)
        };
        if rect.is_empty() {
            continue;
        }
        let captured = if operation.affects_height() {
            RegionSnapshot::capture_heights(grid, coord, rect)
        } else if matches!(operation, BrushOperation::Holes) {
            RegionSnapshot::capture_holes(grid, coord, rect)
        } else {
            RegionSnapshot::capture_splats(grid, coord, rect)
        };
        match captured {
            Ok(region) => snapshot.regions.push(region),
            Err(error) => warn!(
                "undo capture skipped patch ({}, {}): {error}",
                coord.x, coord.z
            ),
        }
    }
    snapshot
}

/// Stages 1-8 for a single patch. Returns Ok(None) when the brush does not
/// touch the patch.
fn apply_to_patch(
    patch: &mut Patch,
    operation: BrushOperation,
    params: &BrushParams,
    hit: [f32; 3],
    strength: f32,
    brush_bounds: &Aabb,
    collision_lod: u32,
) -> Result<Option<PatchEdit>, TerrainError> {
    // Stage 1: patch bounds, then the minimal chunk set.
    if !patch.bounds().intersects(brush_bounds) {
        return Ok(None);
    }
    let touches_chunk = ChunkGrid::positions().any(|pos| {
        patch
            .chunk_bounds(pos)
            .is_some_and(|bounds| bounds.intersects(brush_bounds))
    });
    if !touches_chunk {
        return Ok(None);
    }

    // Stage 2: world brush bounds to patch-local samples, plus the halo.
    let rect = brush_rect(patch, brush_bounds);
    if rect.is_empty() {
        return Err(TerrainError::InvalidRegion {
            rect,
            heightmap_size: patch.info.heightmap_size,
        });
    }

    let size = patch.info.heightmap_size;
    let app = BrushApplication {
        params,
        center: hit,
        strength,
        patch_origin: [patch.offset[0], patch.offset[2]],
    };

    // Stages 3-6: mutate into a replacement buffer, then recommit through
    // the patch (which re-ranges, re-encodes and re-normals as needed).
    let mut range_changed = false;
    match operation {
        BrushOperation::Sculpt => {
            let heights = patch.ensure_height_cache()?;
            let out = sculpt::sculpt(&app, heights, size, &rect);
            range_changed = patch.write_heights(&rect, &out)?;
        }
        BrushOperation::Flatten { target_height } => {
            let heights = patch.ensure_height_cache()?;
            let out = sculpt::flatten(&app, heights, size, &rect, target_height);
            range_changed = patch.write_heights(&rect, &out)?;
        }
        BrushOperation::Smooth { filter_radius } => {
            let heights = patch.ensure_height_cache()?;
            let out = sculpt::smooth(&app, heights, size, &rect, filter_radius);
            range_changed = patch.write_heights(&rect, &out)?;
        }
        BrushOperation::Noise(config) => {
            let heights = patch.ensure_height_cache()?;
            let out = sculpt::noise(&app, heights, size, &rect, config);
            range_changed = patch.write_heights(&rect, &out)?;
        }
        BrushOperation::Holes => {
            let out = sculpt::carve_holes(&app, &rect);
            patch.write_holes(&rect, &out)?;
        }
        BrushOperation::Paint { layer } => {
            let primary = patch.ensure_splat_cache(0)?.to_vec();
            let secondary = patch.ensure_splat_cache(1)?;
            let (out_primary, out_secondary) =
                sculpt::paint(&app, &primary, secondary, size, &rect, layer)
                    .ok_or(TerrainError::MissingAsset("paint layer"))?;
            patch.write_splat(0, &rect, &out_primary)?;
            patch.write_splat(1, &rect, &out_secondary)?;
        }
    }

    // Stage 7: collision footprint. Paint never changes geometry; holes do
    // (the hole mask rides along in the collision descriptor).
    let collision_refreshed = if matches!(operation, BrushOperation::Paint { .. }) {
        false
    } else {
        refresh_collision(patch, collision_lod, &rect)?;
        true
    };

    // Stage 8: chunk AABBs were refreshed during the height recommit;
    // patch/terrain bounds are derived lazily on demand.
    Ok(Some(PatchEdit {
        patch: patch.coord,
        rect,
        range_changed,
        collision_refreshed,
    }))
}

/// Stage 2: world brush bounds to a clamped patch-local rectangle expanded
/// by the one-sample normal halo.
fn brush_rect(patch: &Patch, brush_bounds: &Aabb) -> SampleRect {
    let size = patch.info.heightmap_size;
    let min_x = ((brush_bounds.min[0] - patch.offset[0]) / UNITS_PER_VERTEX).floor() as i32;
    let min_z = ((brush_bounds.min[2] - patch.offset[2]) / UNITS_PER_VERTEX).floor() as i32;
    let max_x = ((brush_bounds.max[0] - patch.offset[0]) / UNITS_PER_VERTEX).ceil() as i32;
    let max_z = ((brush_bounds.max[2] - patch.offset[2]) / UNITS_PER_VERTEX).ceil() as i32;
    SampleRect::new(min_x, min_z, max_x - min_x + 1, max_z - min_z + 1)
        .clamped(size)
        .expanded(1)
        .clamped(size)
}

/// Stage 7: re-cook the committed collision heightfield for `rect`, or
/// generate it from scratch when the patch has none yet.
pub fn refresh_collision(
    patch: &mut Patch,
    collision_lod: u32,
    rect: &SampleRect,
) -> Result<(), TerrainError> {
    match patch.collision.take() {
        Some(mut field) => {
            collision::modify(patch, &mut field, rect)?;
            patch.collision = Some(field);
        }
        None => {
            patch.collision = Some(collision::generate(patch, collision_lod)?);
        }
    }
    Ok(())
}
