//! Heightmap image import and export.
//!
//! Import decodes an image into world-space height samples for one patch
//! (or one image split across the whole grid) using one of four decode
//! algorithms; a channel-layout mismatch aborts before any mutation. Export
//! flattens the whole terrain into a single 16-bit raster, linearly rescaled
//! from the global min/max across every patch.

use image::{DynamicImage, ImageBuffer, Luma};
use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::editing;
use crate::error::TerrainError;
use crate::heightmap_codec;
use crate::patch::{Patch, PatchCoord};
use crate::terrain::TerrainGrid;

/// How image channels map to height values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportAlgorithm {
    /// 16-bit single channel: normalized red times the height scale.
    R16,
    /// 24-bit RGB: `-10000 + (R*65536 + G*256 + B) * 0.1`, divided by 50,
    /// then times the height scale.
    Rgb8Full,
    /// 16-bit packed into R (low) and G (high), normalized by 65535, times
    /// the height scale.
    Rgba8Half,
    /// Same packing as `Rgba8Half`; kept as a distinct selection so assets
    /// authored either way stay labeled.
    Rgba8Normal,
}

/// Validated pixel source for one import call.
enum PixelSource<'a> {
    Luma16(&'a ImageBuffer<Luma<u16>, Vec<u16>>),
    Rgb8(&'a image::RgbImage),
    Rgba8(&'a image::RgbaImage),
}

impl PixelSource<'_> {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            PixelSource::Luma16(img) => img.dimensions(),
            PixelSource::Rgb8(img) => img.dimensions(),
            PixelSource::Rgba8(img) => img.dimensions(),
        }
    }
}

/// Check the image layout against the chosen algorithm.
fn validate_source<'a>(
    image: &'a DynamicImage,
    algorithm: ImportAlgorithm,
) -> Result<PixelSource<'a>, TerrainError> {
    match (algorithm, image) {
        (ImportAlgorithm::R16, DynamicImage::ImageLuma16(img)) => Ok(PixelSource::Luma16(img)),
        (ImportAlgorithm::Rgb8Full, DynamicImage::ImageRgb8(img)) => Ok(PixelSource::Rgb8(img)),
        (ImportAlgorithm::Rgba8Half, DynamicImage::ImageRgba8(img))
        | (ImportAlgorithm::Rgba8Normal, DynamicImage::ImageRgba8(img)) => {
            Ok(PixelSource::Rgba8(img))
        }
        _ => Err(TerrainError::FormatMismatch(format!(
            "{algorithm:?} cannot decode a {} image",
            match image {
                DynamicImage::ImageLuma8(_) => "Luma8",
                DynamicImage::ImageLuma16(_) => "Luma16",
                DynamicImage::ImageRgb8(_) => "Rgb8",
                DynamicImage::ImageRgba8(_) => "Rgba8",
                DynamicImage::ImageRgb16(_) => "Rgb16",
                DynamicImage::ImageRgba16(_) => "Rgba16",
                _ => "unsupported",
            }
        ))),
    }
}

/// Decode the pixel at `(x, y)` into a world-space height.
fn decode_pixel(source: &PixelSource, x: u32, y: u32, height_scale: f32) -> f32 {
    match source {
        PixelSource::Luma16(img) => {
            let value = img.get_pixel(x, y).0[0];
            value as f32 / 65535.0 * height_scale
        }
        PixelSource::Rgb8(img) => {
            let [r, g, b] = img.get_pixel(x, y).0;
            let raw = r as u32 * 65536 + g as u32 * 256 + b as u32;
            (-10000.0 + raw as f32 * 0.1) / 50.0 * height_scale
        }
        PixelSource::Rgba8(img) => {
            let [r, g, ..] = img.get_pixel(x, y).0;
            let raw = r as u16 | ((g as u16) << 8);
            raw as f32 / 65535.0 * height_scale
        }
    }
}

/// Nearest source pixel for a destination grid coordinate.
fn nearest(src_len: u32, dst_len: usize, dst: usize) -> u32 {
    if dst_len <= 1 {
        return 0;
    }
    let t = dst as f32 / (dst_len - 1) as f32;
    (t * (src_len - 1) as f32).round() as u32
}

/// Import an image as the full heightmap of one patch, then regenerate its
/// collision heightfield. Images of a different resolution are resampled
/// with nearest filtering.
pub fn import_patch_heightmap(
    grid: &mut TerrainGrid,
    coord: PatchCoord,
    image: &DynamicImage,
    algorithm: ImportAlgorithm,
    height_scale: f32,
) -> Result<(), TerrainError> {
    let source = validate_source(image, algorithm)?;
    let collision_lod = grid.collision_lod();
    let patch = grid
        .patch_mut(coord)
        .ok_or(TerrainError::MissingAsset("patch"))?;

    let size = patch.info.heightmap_size;
    let (width, height) = source.dimensions();
    let mut heights = Vec::with_capacity(size * size);
    for z in 0..size {
        for x in 0..size {
            let sx = nearest(width, size, x);
            let sy = nearest(height, size, z);
            heights.push(decode_pixel(&source, sx, sy, height_scale));
        }
    }

    patch.update_height_map(heights)?;
    patch.collision = None;
    editing::refresh_collision(
        patch,
        collision_lod,
        &crate::bounds::SampleRect::full(size),
    )?;
    Ok(())
}

/// Import one image split across every patch of the grid: the image maps
/// onto the terrain's full sample grid (shared borders included) and each
/// patch decodes its own sub-region. Patches rebuild in parallel.
pub fn import_terrain_heightmap(
    grid: &mut TerrainGrid,
    image: &DynamicImage,
    algorithm: ImportAlgorithm,
    height_scale: f32,
) -> Result<(), TerrainError> {
    let source = validate_source(image, algorithm)?;
    let coords = grid.sorted_coords();
    if coords.is_empty() {
        return Ok(());
    }
    let min_x = coords.iter().map(|c| c.x).min().unwrap();
    let min_z = coords.iter().map(|c| c.z).min().unwrap();
    let max_x = coords.iter().map(|c| c.x).max().unwrap();
    let max_z = coords.iter().map(|c| c.z).max().unwrap();

    let info = grid.patch_info();
    let edge = info.heightmap_size - 1;
    let total_x = edge * (max_x - min_x + 1) as usize + 1;
    let total_z = edge * (max_z - min_z + 1) as usize + 1;
    let (width, height) = source.dimensions();
    let collision_lod = grid.collision_lod();

    let source = &source;
    grid.patches_mut()
        .par_bridge()
        .try_for_each(|patch: &mut Patch| -> Result<(), TerrainError> {
            let size = patch.info.heightmap_size;
            let base_x = (patch.coord.x - min_x) as usize * edge;
            let base_z = (patch.coord.z - min_z) as usize * edge;
            let mut heights = Vec::with_capacity(size * size);
            for z in 0..size {
                for x in 0..size {
                    let sx = nearest(width, total_x, base_x + x);
                    let sy = nearest(height, total_z, base_z + z);
                    heights.push(decode_pixel(source, sx, sy, height_scale));
                }
            }
            patch.update_height_map(heights)?;
            patch.collision = None;
            editing::refresh_collision(
                patch,
                collision_lod,
                &crate::bounds::SampleRect::full(size),
            )
        })
}

/// Export the whole terrain as one 16-bit single-channel raster.
///
/// Heights are linearly rescaled from the global `[min, max]` across every
/// patch (untouched flat patches included). Regions of the bounding
/// rectangle with no patch are written as zero.
pub fn export_heightmap(
    grid: &TerrainGrid,
) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>, TerrainError> {
    let coords = grid.sorted_coords();
    if coords.is_empty() {
        return Err(TerrainError::MissingAsset("heightmap"));
    }
    let min_x = coords.iter().map(|c| c.x).min().unwrap();
    let min_z = coords.iter().map(|c| c.z).min().unwrap();
    let max_x = coords.iter().map(|c| c.x).max().unwrap();
    let max_z = coords.iter().map(|c| c.z).max().unwrap();

    let info = grid.patch_info();
    let edge = info.heightmap_size - 1;
    let total_x = edge * (max_x - min_x + 1) as usize + 1;
    let total_z = edge * (max_z - min_z + 1) as usize + 1;

    // Decode every patch once and find the global range.
    let mut decoded = Vec::new();
    let mut global_min = f32::MAX;
    let mut global_max = f32::MIN;
    for coord in coords {
        let patch = grid.patch(coord).expect("coord from sorted_coords");
        let texture = patch
            .heightmap
            .as_deref()
            .ok_or(TerrainError::MissingAsset("heightmap"))?;
        let heights = heightmap_codec::decode_height_samples(texture, &patch.info);
        for &h in &heights {
            global_min = global_min.min(h);
            global_max = global_max.max(h);
        }
        decoded.push((coord, heights));
    }
    let range = global_max - global_min;

    let mut out = ImageBuffer::new(total_x as u32, total_z as u32);
    for (coord, heights) in decoded {
        let size = info.heightmap_size;
        let base_x = (coord.x - min_x) as usize * edge;
        let base_z = (coord.z - min_z) as usize * edge;
        for z in 0..size {
            for x in 0..size {
                let h = heights[z * size + x];
                let value = if range > 0.0 {
                    ((h - global_min) / range * 65535.0).round().clamp(0.0, 65535.0) as u16
                } else {
                    0
                };
                out.put_pixel((base_x + x) as u32, (base_z + z) as u32, Luma([value]));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::SampleRect;

    fn grid_with_patches(count_x: usize, count_z: usize) -> TerrainGrid {
        let mut grid = TerrainGrid::new(32);
        grid.create_patch_grid(PatchCoord::new(0, 0), count_x, count_z);
        grid
    }

    #[test]
    fn test_r16_import_scenario() {
        // Constant gray 0.5 at scale 5000 decodes to ~2500 everywhere and
        // clamps the patch range to one world unit of span.
        let mut grid = grid_with_patches(1, 1);
        let size = grid.patch_info().heightmap_size as u32;
        assert_eq!(size, 129);
        let image = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(size, size, Luma([32768])));

        import_patch_heightmap(
            &mut grid,
            PatchCoord::new(0, 0),
            &image,
            ImportAlgorithm::R16,
            5000.0,
        )
        .unwrap();

        let patch = grid.patch_mut(PatchCoord::new(0, 0)).unwrap();
        assert!((patch.info.patch_offset - 2500.0).abs() < 0.1);
        assert_eq!(patch.info.patch_height, 1.0);
        let heights = patch.ensure_height_cache().unwrap();
        for &h in heights {
            assert!((h - 2500.0).abs() < 0.5, "got {h}");
        }
        assert!(patch.collision.is_some());
    }

    #[test]
    fn test_format_mismatch_aborts_without_mutation() {
        let mut grid = grid_with_patches(1, 1);
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            4,
            4,
            image::Rgb([10, 20, 30]),
        ));
        let result = import_patch_heightmap(
            &mut grid,
            PatchCoord::new(0, 0),
            &image,
            ImportAlgorithm::R16,
            100.0,
        );
        assert!(matches!(result, Err(TerrainError::FormatMismatch(_))));

        // The patch is still flat.
        let patch = grid.patch_mut(PatchCoord::new(0, 0)).unwrap();
        let heights = patch.ensure_height_cache().unwrap();
        assert!(heights.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_rgb8_full_decode_formula() {
        // raw = 225000 -> (-10000 + 22500) / 50 = 250, times scale 2 = 500.
        let mut grid = grid_with_patches(1, 1);
        let size = grid.patch_info().heightmap_size as u32;
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            size,
            size,
            image::Rgb([3, 110, 232]),
        ));
        import_patch_heightmap(
            &mut grid,
            PatchCoord::new(0, 0),
            &image,
            ImportAlgorithm::Rgb8Full,
            2.0,
        )
        .unwrap();
        let patch = grid.patch_mut(PatchCoord::new(0, 0)).unwrap();
        let heights = patch.ensure_height_cache().unwrap();
        assert!((heights[0] - 500.0).abs() < 0.1, "got {}", heights[0]);
    }

    #[test]
    fn test_rgba8_packed_decode() {
        let mut grid = grid_with_patches(1, 1);
        let size = grid.patch_info().heightmap_size as u32;
        // R low byte, G high byte: 0x3039 = 12345.
        let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            size,
            size,
            image::Rgba([0x39, 0x30, 0, 255]),
        ));
        import_patch_heightmap(
            &mut grid,
            PatchCoord::new(0, 0),
            &image,
            ImportAlgorithm::Rgba8Normal,
            1000.0,
        )
        .unwrap();
        let patch = grid.patch_mut(PatchCoord::new(0, 0)).unwrap();
        let heights = patch.ensure_height_cache().unwrap();
        let expected = 12345.0 / 65535.0 * 1000.0;
        assert!((heights[0] - expected).abs() < 0.01);
    }

    #[test]
    fn test_export_rescales_globally() {
        let mut grid = grid_with_patches(2, 1);
        // Raise one corner of patch (1, 0); patch (0, 0) stays flat at zero.
        let rect = SampleRect::new(10, 10, 4, 4);
        let samples = vec![100.0f32; rect.area()];
        grid.patch_mut(PatchCoord::new(1, 0))
            .unwrap()
            .write_heights(&rect, &samples)
            .unwrap();

        let image = export_heightmap(&grid).unwrap();
        let edge = (grid.patch_info().heightmap_size - 1) as u32;
        assert_eq!(image.dimensions(), (edge * 2 + 1, edge + 1));

        // Flat patch exports at the bottom of the global range...
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        // ...and the raised samples at the top.
        let raised = image.get_pixel(edge + 10, 10).0[0];
        assert_eq!(raised, 65535);
    }

    #[test]
    fn test_terrain_wide_import_shares_borders() {
        let mut grid = TerrainGrid::new(8);
        grid.create_patch_grid(PatchCoord::new(0, 0), 2, 1);
        let info = grid.patch_info();
        let edge = info.heightmap_size - 1;
        let total_x = (edge * 2 + 1) as u32;
        let total_z = (edge + 1) as u32;

        // Horizontal gradient across the whole terrain.
        let image = DynamicImage::ImageLuma16(ImageBuffer::from_fn(total_x, total_z, |x, _| {
            Luma([(x * 65535 / (total_x - 1)) as u16])
        }));
        import_terrain_heightmap(&mut grid, &image, ImportAlgorithm::R16, 1000.0).unwrap();

        // The right edge of patch 0 equals the left edge of patch 1.
        let size = info.heightmap_size;
        let right_col = {
            let patch = grid.patch_mut(PatchCoord::new(0, 0)).unwrap();
            let heights = patch.ensure_height_cache().unwrap();
            heights[size - 1]
        };
        let patch = grid.patch_mut(PatchCoord::new(1, 0)).unwrap();
        let heights = patch.ensure_height_cache().unwrap();
        assert_eq!(heights[0], right_col);
        // Gradient rises left to right.
        assert!(heights[size - 1] > heights[0]);
    }
}
