//! Terrain patches: one tile of the terrain grid.
//!
//! A patch owns the encoded heightmap/splatmap textures, the 4x4 chunk grid
//! with per-chunk height ranges, the committed collision heightfield, and
//! decoded sample caches. The caches are an explicit two-state machine
//! (`Uncached`/`Cached`) and are only ever invalidated or refreshed by the
//! editing pipeline, never by ad hoc call sites.

use serde::{Deserialize, Serialize};

use crate::bounds::{Aabb, SampleRect};
use crate::chunk::{Chunk, ChunkGrid, ChunkPos, CHUNKS_PER_EDGE};
use crate::collision::CollisionHeightfield;
use crate::error::TerrainError;
use crate::heightmap_codec::{self, QUANTIZATION_ERROR};
use crate::splat::{self, SplatSample, SPLATMAP_COUNT};

/// World units between two adjacent height samples.
pub const UNITS_PER_VERTEX: f32 = 100.0;

/// Integer patch coordinates in the terrain grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchCoord {
    pub x: i32,
    pub z: i32,
}

impl PatchCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Immutable per-patch sizing plus the current quantization range.
///
/// The range maps a quantized 16-bit sample back to world height:
/// `height = normalized * patch_height + patch_offset`. It is recomputed
/// whenever an edit pushes a sample outside the current range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchInfo {
    /// Vertices per chunk edge minus one.
    pub chunk_size: usize,
    /// Vertices along one chunk edge.
    pub vertex_count_edge: usize,
    /// Vertices along one patch edge; adjacent chunks share border samples.
    pub heightmap_size: usize,
    /// Texels along one texture edge; chunks never share texels.
    pub texture_size: usize,
    /// World height mapped from normalized 0.
    pub patch_offset: f32,
    /// World span of the normalized range. Always >= 1.0.
    pub patch_height: f32,
}

impl PatchInfo {
    pub fn new(chunk_size: usize) -> Self {
        let vertex_count_edge = chunk_size + 1;
        Self {
            chunk_size,
            vertex_count_edge,
            heightmap_size: chunk_size * CHUNKS_PER_EDGE + 1,
            texture_size: vertex_count_edge * CHUNKS_PER_EDGE,
            patch_offset: 0.0,
            patch_height: 1.0,
        }
    }

    /// Total height samples in the patch.
    pub fn sample_count(&self) -> usize {
        self.heightmap_size * self.heightmap_size
    }

    /// Bytes in one RGBA8 texture of this patch.
    pub fn texture_bytes(&self) -> usize {
        self.texture_size * self.texture_size * 4
    }

    /// World-space edge length of the patch.
    pub fn world_size(&self) -> f32 {
        (self.heightmap_size - 1) as f32 * UNITS_PER_VERTEX
    }
}

/// Lazily rebuilt decoded-sample cache.
#[derive(Clone, Debug, Default)]
pub enum SampleCache<T> {
    #[default]
    Uncached,
    Cached(Vec<T>),
}

impl<T> SampleCache<T> {
    pub fn invalidate(&mut self) {
        *self = SampleCache::Uncached;
    }

    pub fn as_slice(&self) -> Option<&[T]> {
        match self {
            SampleCache::Uncached => None,
            SampleCache::Cached(data) => Some(data),
        }
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        match self {
            SampleCache::Uncached => None,
            SampleCache::Cached(data) => Some(data),
        }
    }
}

/// One terrain tile: 4x4 chunks, encoded textures, sample caches and the
/// committed collision heightfield.
#[derive(Debug)]
pub struct Patch {
    pub coord: PatchCoord,
    /// World-space translation, derived from `coord` and the patch size.
    pub offset: [f32; 3],
    pub info: PatchInfo,
    pub chunks: ChunkGrid,
    /// Encoded RGBA8 heightmap texture.
    pub heightmap: Option<Vec<u8>>,
    /// Encoded RGBA8 splatmaps, created on first paint.
    pub splatmaps: [Option<Vec<u8>>; SPLATMAP_COUNT],
    /// Collision heightfield committed by the last pipeline run.
    pub collision: Option<CollisionHeightfield>,
    cached_heights: SampleCache<f32>,
    cached_holes: SampleCache<u8>,
    cached_splats: [SampleCache<SplatSample>; SPLATMAP_COUNT],
}

impl Patch {
    /// Create a flat patch at height zero.
    pub fn new(coord: PatchCoord, chunk_size: usize) -> Self {
        let info = PatchInfo::new(chunk_size);
        let heights = vec![0.0f32; info.sample_count()];
        Self::from_heights(coord, chunk_size, heights)
    }

    /// Create a patch from a full set of world-space height samples.
    pub fn from_heights(coord: PatchCoord, chunk_size: usize, heights: Vec<f32>) -> Self {
        let info = PatchInfo::new(chunk_size);
        assert_eq!(heights.len(), info.sample_count());
        let mut patch = Self {
            coord,
            offset: [
                coord.x as f32 * info.world_size(),
                0.0,
                coord.z as f32 * info.world_size(),
            ],
            info,
            chunks: ChunkGrid::new(),
            heightmap: Some(vec![0u8; info.texture_bytes()]),
            splatmaps: [None, None],
            collision: None,
            cached_heights: SampleCache::Cached(heights),
            cached_holes: SampleCache::Cached(vec![1u8; info.sample_count()]),
            cached_splats: [SampleCache::Uncached, SampleCache::Uncached],
        };
        patch.recalculate_range();
        patch.encode_full();
        patch
    }

    /// Replace the entire heightmap (import path). Holes are preserved.
    pub fn update_height_map(&mut self, heights: Vec<f32>) -> Result<(), TerrainError> {
        if heights.len() != self.info.sample_count() {
            return Err(TerrainError::InvalidRegion {
                rect: SampleRect::new(0, 0, 0, 0),
                heightmap_size: self.info.heightmap_size,
            });
        }
        self.ensure_hole_cache()?;
        self.cached_heights = SampleCache::Cached(heights);
        self.recalculate_range();
        self.encode_full();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Caches
    // ------------------------------------------------------------------

    /// Decoded height samples, rebuilding the cache from the texture if
    /// needed.
    pub fn ensure_height_cache(&mut self) -> Result<&[f32], TerrainError> {
        if self.cached_heights.as_slice().is_none() {
            let texture = self
                .heightmap
                .as_deref()
                .ok_or(TerrainError::MissingAsset("heightmap"))?;
            let heights = heightmap_codec::decode_height_samples(texture, &self.info);
            self.cached_heights = SampleCache::Cached(heights);
        }
        Ok(self.cached_heights.as_slice().unwrap())
    }

    /// Decoded hole mask (1 = surface, 0 = hole).
    pub fn ensure_hole_cache(&mut self) -> Result<&[u8], TerrainError> {
        if self.cached_holes.as_slice().is_none() {
            let texture = self
                .heightmap
                .as_deref()
                .ok_or(TerrainError::MissingAsset("heightmap"))?;
            let holes = heightmap_codec::decode_hole_mask(texture, &self.info);
            self.cached_holes = SampleCache::Cached(holes);
        }
        Ok(self.cached_holes.as_slice().unwrap())
    }

    /// Decoded splat samples for one splatmap, allocating the default
    /// weights if the splatmap does not exist yet.
    pub fn ensure_splat_cache(&mut self, splatmap: usize) -> Result<&[SplatSample], TerrainError> {
        debug_assert!(splatmap < SPLATMAP_COUNT);
        if self.cached_splats[splatmap].as_slice().is_none() {
            let samples = match self.splatmaps[splatmap].as_deref() {
                Some(texture) => heightmap_codec::decode_splat_samples(texture, &self.info),
                None => vec![splat::default_sample(splatmap); self.info.sample_count()],
            };
            self.cached_splats[splatmap] = SampleCache::Cached(samples);
        }
        Ok(self.cached_splats[splatmap].as_slice().unwrap())
    }

    pub fn height_samples(&self) -> Option<&[f32]> {
        self.cached_heights.as_slice()
    }

    pub fn hole_mask(&self) -> Option<&[u8]> {
        self.cached_holes.as_slice()
    }

    // ------------------------------------------------------------------
    // Height range & bounds
    // ------------------------------------------------------------------

    /// Recompute per-chunk height ranges and the patch quantization range
    /// from the cached height samples. Returns true when the quantization
    /// range changed.
    pub fn recalculate_range(&mut self) -> bool {
        let heights = match self.cached_heights.as_slice() {
            Some(h) => h,
            None => return false,
        };
        let (offset, height) = calculate_height_range(&self.info, heights, &mut self.chunks);
        let changed = offset != self.info.patch_offset || height != self.info.patch_height;
        self.info.patch_offset = offset;
        self.info.patch_height = height;
        changed
    }

    /// World bounds of the whole patch.
    pub fn bounds(&self) -> Aabb {
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for chunk in self.chunks.iter() {
            min_y = min_y.min(chunk.offset);
            max_y = max_y.max(chunk.offset + chunk.height);
        }
        let size = self.info.world_size();
        Aabb::new(
            [self.offset[0], min_y, self.offset[2]],
            [self.offset[0] + size, max_y, self.offset[2] + size],
        )
    }

    /// World bounds of one chunk.
    pub fn chunk_bounds(&self, pos: ChunkPos) -> Option<Aabb> {
        let chunk = self.chunks.get(pos)?;
        let chunk_world = self.info.chunk_size as f32 * UNITS_PER_VERTEX;
        let x = self.offset[0] + pos.x as f32 * chunk_world;
        let z = self.offset[2] + pos.z as f32 * chunk_world;
        Some(Aabb::new(
            [x, chunk.offset, z],
            [
                x + chunk_world,
                chunk.offset + chunk.height,
                z + chunk_world,
            ],
        ))
    }

    // ------------------------------------------------------------------
    // Recommit paths
    // ------------------------------------------------------------------

    fn validate_rect(&self, rect: &SampleRect) -> Result<(), TerrainError> {
        let size = self.info.heightmap_size;
        if rect.is_empty() || *rect != rect.clamped(size) {
            return Err(TerrainError::InvalidRegion {
                rect: *rect,
                heightmap_size: size,
            });
        }
        Ok(())
    }

    /// Commit new height samples for `rect` (raster order, rect-sized
    /// buffer): splice into the cache, re-derive the quantization range if
    /// the edit moved the extremes, re-encode the touched texels (or the
    /// whole patch on range change) and recompute normals over the rect.
    ///
    /// Returns true when the quantization range changed (the whole patch was
    /// re-encoded).
    pub fn write_heights(
        &mut self,
        rect: &SampleRect,
        samples: &[f32],
    ) -> Result<bool, TerrainError> {
        self.validate_rect(rect)?;
        debug_assert_eq!(samples.len(), rect.area());
        self.ensure_height_cache()?;
        self.ensure_hole_cache()?;

        let size = self.info.heightmap_size;
        let mut edit_min = f32::MAX;
        let mut edit_max = f32::MIN;
        {
            let heights = self.cached_heights.as_mut_slice().unwrap();
            for (i, (x, z)) in rect.iter().enumerate() {
                let value = samples[i];
                heights[z as usize * size + x as usize] = value;
                edit_min = edit_min.min(value);
                edit_max = edit_max.max(value);
            }
        }

        let range_changed = if edit_min < self.info.patch_offset
            || edit_max > self.info.patch_offset + self.info.patch_height
        {
            self.recalculate_range();
            true
        } else {
            self.refresh_chunk_ranges(rect);
            false
        };

        let heights = self.cached_heights.as_slice().unwrap();
        let holes = self.cached_holes.as_slice().unwrap();
        let texture = self
            .heightmap
            .as_deref_mut()
            .ok_or(TerrainError::MissingAsset("heightmap"))?;
        let encode_rect = if range_changed {
            SampleRect::full(size)
        } else {
            *rect
        };
        heightmap_codec::write_height_region(texture, &self.info, heights, &encode_rect);
        heightmap_codec::write_normals_region(texture, &self.info, heights, holes, rect);
        Ok(range_changed)
    }

    /// Commit new hole-mask bytes for `rect`. Heights are untouched, so the
    /// quantization range never changes; only normals are re-encoded (hole
    /// vertices carry the sentinel in the B/A channels).
    pub fn write_holes(&mut self, rect: &SampleRect, mask: &[u8]) -> Result<(), TerrainError> {
        self.validate_rect(rect)?;
        debug_assert_eq!(mask.len(), rect.area());
        self.ensure_height_cache()?;
        self.ensure_hole_cache()?;

        let size = self.info.heightmap_size;
        {
            let holes = self.cached_holes.as_mut_slice().unwrap();
            for (i, (x, z)) in rect.iter().enumerate() {
                holes[z as usize * size + x as usize] = mask[i];
            }
        }

        let heights = self.cached_heights.as_slice().unwrap();
        let holes = self.cached_holes.as_slice().unwrap();
        let texture = self
            .heightmap
            .as_deref_mut()
            .ok_or(TerrainError::MissingAsset("heightmap"))?;
        heightmap_codec::write_normals_region(texture, &self.info, heights, holes, rect);
        Ok(())
    }

    /// Commit new splat samples for `rect` into one splatmap, allocating
    /// the splatmap if it does not exist yet.
    pub fn write_splat(
        &mut self,
        splatmap: usize,
        rect: &SampleRect,
        samples: &[SplatSample],
    ) -> Result<(), TerrainError> {
        debug_assert!(splatmap < SPLATMAP_COUNT);
        self.validate_rect(rect)?;
        debug_assert_eq!(samples.len(), rect.area());
        self.ensure_splat_cache(splatmap)?;

        let size = self.info.heightmap_size;
        {
            let cache = self.cached_splats[splatmap].as_mut_slice().unwrap();
            for (i, (x, z)) in rect.iter().enumerate() {
                cache[z as usize * size + x as usize] = samples[i];
            }
        }

        // First paint on a splatmap materializes the whole texture.
        let encode_rect = if self.splatmaps[splatmap].is_none() {
            self.splatmaps[splatmap] = Some(vec![0u8; self.info.texture_bytes()]);
            SampleRect::full(size)
        } else {
            *rect
        };
        let cache = self.cached_splats[splatmap].as_slice().unwrap();
        let texture = self.splatmaps[splatmap].as_deref_mut().unwrap();
        heightmap_codec::write_splat_region(texture, &self.info, cache, &encode_rect);
        Ok(())
    }

    /// Refresh the height ranges of every chunk overlapping `rect`.
    fn refresh_chunk_ranges(&mut self, rect: &SampleRect) {
        let heights = match self.cached_heights.as_slice() {
            Some(h) => h,
            None => return,
        };
        let info = self.info;
        for pos in ChunkGrid::positions() {
            let chunk_rect = SampleRect::new(
                (pos.x * info.chunk_size) as i32,
                (pos.z * info.chunk_size) as i32,
                info.vertex_count_edge as i32,
                info.vertex_count_edge as i32,
            );
            if chunk_rect.intersection(rect).is_empty() {
                continue;
            }
            let (min, max) = chunk_sample_range(&info, heights, pos);
            if let Some(chunk) = self.chunks.get_mut(pos) {
                chunk.set_height_range(min, max);
            }
        }
    }

    /// Re-encode the whole patch: heights and normals for every texel.
    fn encode_full(&mut self) {
        let size = self.info.heightmap_size;
        let (Some(heights), Some(holes), Some(texture)) = (
            self.cached_heights.as_slice(),
            self.cached_holes.as_slice(),
            self.heightmap.as_deref_mut(),
        ) else {
            return;
        };
        let full = SampleRect::full(size);
        heightmap_codec::write_height_region(texture, &self.info, heights, &full);
        heightmap_codec::write_normals_region(texture, &self.info, heights, holes, &full);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn to_descriptor(&self) -> Result<PatchDescriptor, TerrainError> {
        let heightmap = self
            .heightmap
            .clone()
            .ok_or(TerrainError::MissingAsset("heightmap"))?;
        Ok(PatchDescriptor {
            coord: self.coord,
            offset: self.offset,
            info: self.info,
            heightmap,
            splatmaps: self.splatmaps.clone(),
            chunks: self.chunks.iter().copied().collect(),
        })
    }

    pub fn from_descriptor(desc: PatchDescriptor) -> Result<Self, TerrainError> {
        if desc.heightmap.len() != desc.info.texture_bytes() {
            return Err(TerrainError::FormatMismatch(format!(
                "heightmap texture has {} bytes, expected {}",
                desc.heightmap.len(),
                desc.info.texture_bytes()
            )));
        }
        let mut chunks = ChunkGrid::new();
        for chunk in desc.chunks {
            if let Some(slot) = chunks.get_mut(chunk.position) {
                *slot = chunk;
            }
        }
        Ok(Self {
            coord: desc.coord,
            offset: desc.offset,
            info: desc.info,
            chunks,
            heightmap: Some(desc.heightmap),
            splatmaps: desc.splatmaps,
            collision: None,
            cached_heights: SampleCache::Uncached,
            cached_holes: SampleCache::Uncached,
            cached_splats: [SampleCache::Uncached, SampleCache::Uncached],
        })
    }
}

/// Serialized per-patch state, handed to the collaborator that owns
/// persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchDescriptor {
    pub coord: PatchCoord,
    pub offset: [f32; 3],
    pub info: PatchInfo,
    pub heightmap: Vec<u8>,
    pub splatmaps: [Option<Vec<u8>>; SPLATMAP_COUNT],
    pub chunks: Vec<Chunk>,
}

/// Min/max of one chunk's (chunk_size + 1)^2 samples.
fn chunk_sample_range(info: &PatchInfo, heights: &[f32], pos: ChunkPos) -> (f32, f32) {
    let size = info.heightmap_size;
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for z in 0..info.vertex_count_edge {
        for x in 0..info.vertex_count_edge {
            let h = heights[(pos.z * info.chunk_size + z) * size + pos.x * info.chunk_size + x];
            min = min.min(h);
            max = max.max(h);
        }
    }
    (min, max)
}

/// Scan every chunk's samples, store per-chunk ranges, and derive the patch
/// quantization range: extremes snapped outward to quantization-aligned
/// values, span clamped to at least 1.0 world unit.
pub fn calculate_height_range(
    info: &PatchInfo,
    heights: &[f32],
    chunks: &mut ChunkGrid,
) -> (f32, f32) {
    let mut patch_min = f32::MAX;
    let mut patch_max = f32::MIN;
    for pos in ChunkGrid::positions() {
        let (min, max) = chunk_sample_range(info, heights, pos);
        if let Some(chunk) = chunks.get_mut(pos) {
            chunk.set_height_range(min, max);
        }
        patch_min = patch_min.min(min);
        patch_max = patch_max.max(max);
    }
    let offset = heightmap_codec::align_height(patch_min - QUANTIZATION_ERROR);
    let height =
        heightmap_codec::align_height(patch_max - patch_min + 2.0 * QUANTIZATION_ERROR).max(1.0);
    (offset, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_info_sizes() {
        let info = PatchInfo::new(32);
        assert_eq!(info.vertex_count_edge, 33);
        assert_eq!(info.heightmap_size, 129);
        assert_eq!(info.texture_size, 132);
        assert_eq!(info.sample_count(), 129 * 129);
        assert_eq!(info.texture_bytes(), 132 * 132 * 4);
    }

    #[test]
    fn test_flat_patch_range() {
        let patch = Patch::new(PatchCoord::new(0, 0), 8);
        // Flat zero terrain: offset snaps just below zero, span clamps to 1.
        assert!(patch.info.patch_offset <= 0.0);
        assert!(patch.info.patch_offset > -0.001);
        assert_eq!(patch.info.patch_height, 1.0);
        for chunk in patch.chunks.iter() {
            assert_eq!(chunk.height, Chunk::MIN_HEIGHT_RANGE);
        }
    }

    #[test]
    fn test_constant_height_range_clamps_span() {
        let info = PatchInfo::new(32);
        let heights = vec![2500.0f32; info.sample_count()];
        let mut chunks = ChunkGrid::new();
        let (offset, height) = calculate_height_range(&info, &heights, &mut chunks);
        assert!((offset - 2500.0).abs() < 0.001);
        assert!(offset <= 2500.0);
        assert_eq!(height, 1.0);
    }

    #[test]
    fn test_range_bounds_every_sample() {
        let info = PatchInfo::new(8);
        let heights: Vec<f32> = (0..info.sample_count())
            .map(|i| -300.0 + (i % 113) as f32 * 7.5)
            .collect();
        let mut chunks = ChunkGrid::new();
        let (offset, height) = calculate_height_range(&info, &heights, &mut chunks);
        for &h in &heights {
            assert!(h >= offset, "{h} below offset {offset}");
            assert!(h <= offset + height, "{h} above {}", offset + height);
        }
    }

    #[test]
    fn test_patch_world_offset_from_coord() {
        let patch = Patch::new(PatchCoord::new(2, -1), 8);
        let size = patch.info.world_size();
        assert_eq!(patch.offset, [2.0 * size, 0.0, -size]);
    }

    #[test]
    fn test_write_heights_partial_keeps_range() {
        let mut patch = Patch::from_heights(
            PatchCoord::new(0, 0),
            8,
            (0..PatchInfo::new(8).sample_count())
                .map(|i| (i % 50) as f32)
                .collect(),
        );
        let before = patch.info;
        // New values inside the existing range: no re-quantization.
        let rect = SampleRect::new(4, 4, 3, 3);
        let samples = vec![20.0f32; rect.area()];
        let changed = patch.write_heights(&rect, &samples).unwrap();
        assert!(!changed);
        assert_eq!(patch.info.patch_offset, before.patch_offset);
        assert_eq!(patch.info.patch_height, before.patch_height);

        let size = patch.info.heightmap_size;
        let heights = patch.height_samples().unwrap();
        assert_eq!(heights[5 * size + 5], 20.0);
    }

    #[test]
    fn test_write_heights_growth_requantizes() {
        let mut patch = Patch::new(PatchCoord::new(0, 0), 8);
        let rect = SampleRect::new(0, 0, 2, 2);
        let samples = vec![500.0f32; rect.area()];
        let changed = patch.write_heights(&rect, &samples).unwrap();
        assert!(changed);
        let (offset, height) = (patch.info.patch_offset, patch.info.patch_height);
        assert!(offset + height >= 500.0);

        // Every sample still decodes inside the new range.
        let texture = patch.heightmap.clone().unwrap();
        let decoded = heightmap_codec::decode_height_samples(&texture, &patch.info);
        for &h in &decoded {
            assert!(h >= offset - 0.01 && h <= offset + height + 0.01);
        }
        let size = patch.info.heightmap_size;
        assert!((decoded[0] - 500.0).abs() < height / 65535.0 + 0.01);
        assert!(decoded[2 * size + 2].abs() < height / 65535.0 + 0.01);
    }

    #[test]
    fn test_write_heights_rejects_out_of_bounds_rect() {
        let mut patch = Patch::new(PatchCoord::new(0, 0), 8);
        let size = patch.info.heightmap_size as i32;
        let rect = SampleRect::new(size - 1, 0, 2, 1);
        let err = patch.write_heights(&rect, &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidRegion { .. }));

        let empty = SampleRect::new(3, 3, 0, 5);
        assert!(patch.write_heights(&empty, &[]).is_err());
    }

    #[test]
    fn test_write_holes_round_trip() {
        let mut patch = Patch::new(PatchCoord::new(0, 0), 8);
        let rect = SampleRect::new(2, 3, 2, 1);
        patch.write_holes(&rect, &[0, 1]).unwrap();

        let texture = patch.heightmap.clone().unwrap();
        let mask = heightmap_codec::decode_hole_mask(&texture, &patch.info);
        let size = patch.info.heightmap_size;
        assert_eq!(mask[3 * size + 2], 0);
        assert_eq!(mask[3 * size + 3], 1);
        assert_eq!(mask[0], 1);
    }

    #[test]
    fn test_splat_default_and_write() {
        let mut patch = Patch::new(PatchCoord::new(0, 0), 8);
        assert!(patch.splatmaps[0].is_none());
        let defaults = patch.ensure_splat_cache(0).unwrap();
        assert_eq!(defaults[0], [255, 0, 0, 0]);

        let rect = SampleRect::new(1, 1, 1, 1);
        patch.write_splat(0, &rect, &[[0, 255, 0, 0]]).unwrap();
        assert!(patch.splatmaps[0].is_some());
        let texture = patch.splatmaps[0].clone().unwrap();
        let samples = heightmap_codec::decode_splat_samples(&texture, &patch.info);
        let size = patch.info.heightmap_size;
        assert_eq!(samples[size + 1], [0, 255, 0, 0]);
        assert_eq!(samples[0], [255, 0, 0, 0]);
    }

    #[test]
    fn test_descriptor_round_trip() {
        let mut patch = Patch::new(PatchCoord::new(1, 2), 8);
        let rect = SampleRect::new(0, 0, 2, 2);
        patch.write_heights(&rect, &vec![80.0; 4]).unwrap();

        let desc = patch.to_descriptor().unwrap();
        let mut restored = Patch::from_descriptor(desc).unwrap();
        assert_eq!(restored.coord, patch.coord);
        assert_eq!(restored.info, patch.info);

        let original = patch.ensure_height_cache().unwrap().to_vec();
        let decoded = restored.ensure_height_cache().unwrap();
        for (a, b) in original.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= patch.info.patch_height / 65535.0 + 1e-3);
        }
    }

    #[test]
    fn test_cache_state_machine() {
        let mut cache: SampleCache<f32> = SampleCache::Uncached;
        assert!(cache.as_slice().is_none());
        cache = SampleCache::Cached(vec![1.0, 2.0]);
        assert_eq!(cache.as_slice().unwrap(), &[1.0, 2.0]);
        cache.invalidate();
        assert!(cache.as_slice().is_none());
    }
}
