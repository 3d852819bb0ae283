//! Undo/redo history for terrain edits.
//!
//! Each brush stroke records the previous contents of every rectangle it is
//! about to touch. Undo re-commits those buffers through the normal patch
//! write paths, so textures, normals, chunk ranges and collision stay
//! consistent; the state replaced by the undo is captured as the matching
//! redo entry. History depth is bounded; a new stroke clears the redo stack.

use crate::bounds::SampleRect;
use crate::editing;
use crate::error::TerrainError;
use crate::patch::PatchCoord;
use crate::splat::SplatSample;
use crate::terrain::TerrainGrid;

/// Previous contents of one edited rectangle in one patch.
#[derive(Clone, Debug)]
pub enum RegionSnapshot {
    Heights {
        patch: PatchCoord,
        rect: SampleRect,
        samples: Vec<f32>,
    },
    Holes {
        patch: PatchCoord,
        rect: SampleRect,
        mask: Vec<u8>,
    },
    Splats {
        patch: PatchCoord,
        rect: SampleRect,
        primary: Vec<SplatSample>,
        secondary: Vec<SplatSample>,
    },
}

impl RegionSnapshot {
    /// Capture the current height samples of `rect`.
    pub fn capture_heights(
        grid: &mut TerrainGrid,
        patch: PatchCoord,
        rect: SampleRect,
    ) -> Result<Self, TerrainError> {
        let target = grid
            .patch_mut(patch)
            .ok_or(TerrainError::MissingAsset("patch"))?;
        let size = target.info.heightmap_size;
        let heights = target.ensure_height_cache()?;
        let samples = rect
            .iter()
            .map(|(x, z)| heights[z as usize * size + x as usize])
            .collect();
        Ok(RegionSnapshot::Heights {
            patch,
            rect,
            samples,
        })
    }

    /// Capture the current hole mask of `rect`.
    pub fn capture_holes(
        grid: &mut TerrainGrid,
        patch: PatchCoord,
        rect: SampleRect,
    ) -> Result<Self, TerrainError> {
        let target = grid
            .patch_mut(patch)
            .ok_or(TerrainError::MissingAsset("patch"))?;
        let size = target.info.heightmap_size;
        let holes = target.ensure_hole_cache()?;
        let mask = rect
            .iter()
            .map(|(x, z)| holes[z as usize * size + x as usize])
            .collect();
        Ok(RegionSnapshot::Holes { patch, rect, mask })
    }

    /// Capture the current splat samples of `rect` from both splatmaps.
    pub fn capture_splats(
        grid: &mut TerrainGrid,
        patch: PatchCoord,
        rect: SampleRect,
    ) -> Result<Self, TerrainError> {
        let target = grid
            .patch_mut(patch)
            .ok_or(TerrainError::MissingAsset("patch"))?;
        let size = target.info.heightmap_size;
        let extract = |samples: &[SplatSample]| -> Vec<SplatSample> {
            rect.iter()
                .map(|(x, z)| samples[z as usize * size + x as usize])
                .collect()
        };
        let primary = extract(target.ensure_splat_cache(0)?);
        let secondary = extract(target.ensure_splat_cache(1)?);
        Ok(RegionSnapshot::Splats {
            patch,
            rect,
            primary,
            secondary,
        })
    }

    fn patch(&self) -> PatchCoord {
        match self {
            RegionSnapshot::Heights { patch, .. }
            | RegionSnapshot::Holes { patch, .. }
            | RegionSnapshot::Splats { patch, .. } => *patch,
        }
    }

    fn rect(&self) -> SampleRect {
        match self {
            RegionSnapshot::Heights { rect, .. }
            | RegionSnapshot::Holes { rect, .. }
            | RegionSnapshot::Splats { rect, .. } => *rect,
        }
    }

    /// Capture the current state of the same region, with the same kind.
    fn capture_counterpart(&self, grid: &mut TerrainGrid) -> Result<Self, TerrainError> {
        match self {
            RegionSnapshot::Heights { .. } => {
                Self::capture_heights(grid, self.patch(), self.rect())
            }
            RegionSnapshot::Holes { .. } => Self::capture_holes(grid, self.patch(), self.rect()),
            RegionSnapshot::Splats { .. } => Self::capture_splats(grid, self.patch(), self.rect()),
        }
    }

    /// Write the snapshot back through the normal commit paths.
    fn apply(&self, grid: &mut TerrainGrid) -> Result<(), TerrainError> {
        let collision_lod = grid.collision_lod();
        let patch = grid
            .patch_mut(self.patch())
            .ok_or(TerrainError::MissingAsset("patch"))?;
        match self {
            RegionSnapshot::Heights { rect, samples, .. } => {
                patch.write_heights(rect, samples)?;
                editing::refresh_collision(patch, collision_lod, rect)?;
            }
            RegionSnapshot::Holes { rect, mask, .. } => {
                patch.write_holes(rect, mask)?;
                editing::refresh_collision(patch, collision_lod, rect)?;
            }
            RegionSnapshot::Splats {
                rect,
                primary,
                secondary,
                ..
            } => {
                patch.write_splat(0, rect, primary)?;
                patch.write_splat(1, rect, secondary)?;
            }
        }
        Ok(())
    }
}

/// All regions captured before one brush stroke.
#[derive(Clone, Debug, Default)]
pub struct StrokeSnapshot {
    pub regions: Vec<RegionSnapshot>,
}

impl StrokeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Bounded undo/redo stacks of stroke snapshots.
pub struct UndoHistory {
    past: Vec<StrokeSnapshot>,
    future: Vec<StrokeSnapshot>,
    max_entries: usize,
}

impl UndoHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the pre-stroke snapshot. Clears the redo stack.
    pub fn record(&mut self, snapshot: StrokeSnapshot) {
        if snapshot.is_empty() {
            return;
        }
        self.future.clear();
        self.past.push(snapshot);
        while self.past.len() > self.max_entries {
            self.past.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Restore the most recent snapshot. Returns false when there is
    /// nothing to undo.
    pub fn undo(&mut self, grid: &mut TerrainGrid) -> Result<bool, TerrainError> {
        let Some(snapshot) = self.past.pop() else {
            return Ok(false);
        };
        let redo = Self::swap_in(grid, &snapshot)?;
        self.future.push(redo);
        Ok(true)
    }

    /// Re-apply the most recently undone stroke. Returns false when there
    /// is nothing to redo.
    pub fn redo(&mut self, grid: &mut TerrainGrid) -> Result<bool, TerrainError> {
        let Some(snapshot) = self.future.pop() else {
            return Ok(false);
        };
        let undo = Self::swap_in(grid, &snapshot)?;
        self.past.push(undo);
        Ok(true)
    }

    /// Capture the counterpart of every region, then apply the snapshot.
    fn swap_in(
        grid: &mut TerrainGrid,
        snapshot: &StrokeSnapshot,
    ) -> Result<StrokeSnapshot, TerrainError> {
        let mut counterpart = StrokeSnapshot::default();
        for region in &snapshot.regions {
            counterpart.regions.push(region.capture_counterpart(grid)?);
        }
        for region in &snapshot.regions {
            region.apply(grid)?;
        }
        Ok(counterpart)
    }
}
