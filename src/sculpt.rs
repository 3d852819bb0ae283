//! Brush operations for sculpting and painting.
//!
//! Every operation reads the patch's full cached samples, computes a
//! replacement buffer for just the affected rectangle, and leaves the commit
//! to the editing pipeline. Nothing here mutates authoritative state.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::bounds::SampleRect;
use crate::falloff::FalloffModel;
use crate::patch::UNITS_PER_VERTEX;
use crate::splat::{self, SplatSample};

/// World units added per unit strength at full falloff weight.
pub const SCULPT_STRENGTH_SCALE: f32 = 1000.0;

/// Weight * strength at or above which the holes brush carves a hole.
pub const HOLE_CARVE_THRESHOLD: f32 = 0.8;

/// Brush geometry shared by every operation.
#[derive(Clone, Copy, Debug)]
pub struct BrushParams {
    /// Brush diameter in world units.
    pub size: f32,
    /// Share of the radius occupied by the falloff band, in [0, 1].
    pub falloff_fraction: f32,
    pub falloff: FalloffModel,
}

impl Default for BrushParams {
    fn default() -> Self {
        Self {
            size: 4000.0,
            falloff_fraction: 0.5,
            falloff: FalloffModel::Smooth,
        }
    }
}

/// One brush application against one patch.
///
/// `strength` arrives pre-scaled by elapsed time and sign-flipped by the
/// caller's inverse modifier; the pipeline rejects values an operation
/// cannot take before building this context.
#[derive(Clone, Copy, Debug)]
pub struct BrushApplication<'a> {
    pub params: &'a BrushParams,
    /// World-space brush center (the editor's hit point).
    pub center: [f32; 3],
    pub strength: f32,
    /// World XZ of the patch's (0, 0) sample.
    pub patch_origin: [f32; 2],
}

impl BrushApplication<'_> {
    /// World XZ of a patch-local sample.
    fn sample_world(&self, x: i32, z: i32) -> [f32; 2] {
        [
            self.patch_origin[0] + x as f32 * UNITS_PER_VERTEX,
            self.patch_origin[1] + z as f32 * UNITS_PER_VERTEX,
        ]
    }

    /// Falloff weight at a patch-local sample.
    fn weight(&self, x: i32, z: i32) -> f32 {
        self.params.falloff.sample(
            self.params.falloff_fraction,
            self.params.size,
            [self.center[0], self.center[2]],
            self.sample_world(x, z),
        )
    }
}

/// Raise (or lower, with negative strength) the terrain under the brush.
pub fn sculpt(app: &BrushApplication, heights: &[f32], size: usize, rect: &SampleRect) -> Vec<f32> {
    let mut out = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let h = heights[z as usize * size + x as usize];
        let weight = app.weight(x, z);
        out.push(h + weight * app.strength * SCULPT_STRENGTH_SCALE);
    }
    out
}

/// Pull the terrain toward `target_height`. The blend factor is
/// weight * strength clamped to 1, so a strong enough stroke saturates and
/// repeated application with the same target becomes idempotent.
pub fn flatten(
    app: &BrushApplication,
    heights: &[f32],
    size: usize,
    rect: &SampleRect,
    target_height: f32,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let h = heights[z as usize * size + x as usize];
        let blend = (app.weight(x, z) * app.strength).clamp(0.0, 1.0);
        out.push(h + (target_height - h) * blend);
    }
    out
}

/// Blend each sample toward the mean of its square neighborhood. The window
/// is clamped to the patch bounds, never wrapping.
pub fn smooth(
    app: &BrushApplication,
    heights: &[f32],
    size: usize,
    rect: &SampleRect,
    filter_radius: i32,
) -> Vec<f32> {
    let radius = filter_radius.max(1);
    let limit = size as i32;
    let mut out = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let h = heights[z as usize * size + x as usize];
        let blend = (app.weight(x, z) * app.strength).clamp(0.0, 1.0);
        if blend <= 0.0 {
            out.push(h);
            continue;
        }
        let mut sum = 0.0f32;
        let mut count = 0.0f32;
        for nz in (z - radius).max(0)..=(z + radius).min(limit - 1) {
            for nx in (x - radius).max(0)..=(x + radius).min(limit - 1) {
                sum += heights[nz as usize * size + nx as usize];
                count += 1.0;
            }
        }
        out.push(h + (sum / count - h) * blend);
    }
    out
}

/// Parameters of the noise brush. The same seed/scale/amplitude always
/// displaces the same world position by the same amount.
#[derive(Clone, Copy, Debug)]
pub struct NoiseBrushConfig {
    pub seed: u32,
    /// Multiplier applied to world XZ before sampling the noise field.
    pub scale: f32,
    /// World-units displacement at noise value 1.
    pub amplitude: f32,
}

impl Default for NoiseBrushConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 0.001,
            amplitude: 100.0,
        }
    }
}

/// Displace the terrain by coherent 2-D noise sampled at each vertex's world
/// position.
pub fn noise(
    app: &BrushApplication,
    heights: &[f32],
    size: usize,
    rect: &SampleRect,
    config: NoiseBrushConfig,
) -> Vec<f32> {
    let fbm = Fbm::<Perlin>::new(config.seed).set_octaves(4);
    let mut out = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let h = heights[z as usize * size + x as usize];
        let weight = app.weight(x, z);
        if weight <= 0.0 {
            out.push(h);
            continue;
        }
        let world = app.sample_world(x, z);
        let value = fbm.get([
            (world[0] * config.scale) as f64,
            (world[1] * config.scale) as f64,
        ]) as f32;
        out.push(h + value * config.amplitude * weight);
    }
    out
}

/// Rewrite the hole mask under the brush: carve a hole where
/// weight * strength reaches the threshold, restore surface elsewhere in the
/// rectangle. The inverse modifier (negative strength) therefore restores.
pub fn carve_holes(app: &BrushApplication, rect: &SampleRect) -> Vec<u8> {
    let mut out = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let value = app.weight(x, z) * app.strength;
        out.push(if value < HOLE_CARVE_THRESHOLD { 1 } else { 0 });
    }
    out
}

/// Add weight to one of the 8 paint layers. A sample whose painted weight
/// saturates is reset to fully transparent across BOTH splatmaps before the
/// clamped value is written back, keeping one layer dominant.
///
/// Returns replacement rect buffers for (primary, secondary) splatmaps.
pub fn paint(
    app: &BrushApplication,
    primary: &[SplatSample],
    secondary: &[SplatSample],
    size: usize,
    rect: &SampleRect,
    layer: usize,
) -> Option<(Vec<SplatSample>, Vec<SplatSample>)> {
    let (splatmap, channel) = splat::layer_slot(layer)?;
    let mut out_primary = Vec::with_capacity(rect.area());
    let mut out_secondary = Vec::with_capacity(rect.area());
    for (x, z) in rect.iter() {
        let index = z as usize * size + x as usize;
        let mut samples = [primary[index], secondary[index]];
        let paint_amount = app.weight(x, z) * app.strength;
        if paint_amount != 0.0 {
            let current = splat::weight_to_float(samples[splatmap][channel]);
            let updated = (current + paint_amount).clamp(0.0, 1.0);
            if updated >= 1.0 {
                samples = [[0; 4], [0; 4]];
            }
            samples[splatmap][channel] = splat::weight_to_byte(updated);
        }
        out_primary.push(samples[0]);
        out_secondary.push(samples[1]);
    }
    Some((out_primary, out_secondary))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 33;

    fn flat_heights(value: f32) -> Vec<f32> {
        vec![value; SIZE * SIZE]
    }

    fn centered_app(params: &BrushParams, strength: f32) -> BrushApplication<'_> {
        // Brush centered on the middle sample of a patch at the origin.
        let mid = (SIZE / 2) as f32 * UNITS_PER_VERTEX;
        BrushApplication {
            params,
            center: [mid, 0.0, mid],
            strength,
            patch_origin: [0.0, 0.0],
        }
    }

    #[test]
    fn test_sculpt_raises_center_only() {
        let params = BrushParams {
            size: 800.0,
            falloff_fraction: 0.5,
            falloff: FalloffModel::Smooth,
        };
        let app = centered_app(&params, 0.1);
        let heights = flat_heights(10.0);
        let rect = SampleRect::full(SIZE);
        let out = sculpt(&app, &heights, SIZE, &rect);

        let mid = SIZE / 2;
        assert!((out[mid * SIZE + mid] - 110.0).abs() < 1e-3);
        // Corner is far outside the brush.
        assert_eq!(out[0], 10.0);
    }

    #[test]
    fn test_sculpt_negative_strength_lowers() {
        let params = BrushParams::default();
        let app = centered_app(&params, -0.05);
        let heights = flat_heights(0.0);
        let rect = SampleRect::new(14, 14, 5, 5);
        let out = sculpt(&app, &heights, SIZE, &rect);
        assert!(out.iter().all(|&h| h <= 0.0));
        assert!(out.iter().any(|&h| h < -1.0));
    }

    #[test]
    fn test_flatten_saturated_weight_is_idempotent() {
        let params = BrushParams {
            size: 100000.0,
            falloff_fraction: 0.1,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 1.0);
        let heights: Vec<f32> = (0..SIZE * SIZE).map(|i| (i % 40) as f32).collect();
        let rect = SampleRect::new(5, 5, 8, 8);

        let once = flatten(&app, &heights, SIZE, &rect, 75.0);
        assert!(once.iter().all(|&h| (h - 75.0).abs() < 1e-4));

        // Write the first pass back and flatten again: identical result.
        let mut applied = heights.clone();
        for (i, (x, z)) in rect.iter().enumerate() {
            applied[z as usize * SIZE + x as usize] = once[i];
        }
        let twice = flatten(&app, &applied, SIZE, &rect, 75.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_smooth_pulls_toward_neighborhood_mean() {
        let params = BrushParams {
            size: 100000.0,
            falloff_fraction: 0.1,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 1.0);
        let mut heights = flat_heights(0.0);
        let mid = SIZE / 2;
        heights[mid * SIZE + mid] = 90.0;

        let rect = SampleRect::new(mid as i32, mid as i32, 1, 1);
        let out = smooth(&app, &heights, SIZE, &rect, 1);
        // 3x3 window mean is 10; full blend lands exactly on it.
        assert!((out[0] - 10.0).abs() < 1e-4, "got {}", out[0]);
    }

    #[test]
    fn test_smooth_window_clamps_at_border() {
        let params = BrushParams {
            size: 100000.0,
            falloff_fraction: 0.1,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 1.0);
        let mut heights = flat_heights(0.0);
        heights[0] = 40.0;
        let rect = SampleRect::new(0, 0, 1, 1);
        let out = smooth(&app, &heights, SIZE, &rect, 1);
        // Corner window is 2x2: mean 10.
        assert!((out[0] - 10.0).abs() < 1e-4, "got {}", out[0]);
    }

    #[test]
    fn test_noise_is_deterministic() {
        let params = BrushParams::default();
        let app = centered_app(&params, 1.0);
        let heights = flat_heights(0.0);
        let rect = SampleRect::new(10, 10, 6, 6);
        let config = NoiseBrushConfig {
            seed: 42,
            scale: 0.01,
            amplitude: 50.0,
        };
        let a = noise(&app, &heights, SIZE, &rect, config);
        let b = noise(&app, &heights, SIZE, &rect, config);
        assert_eq!(a, b);
        assert!(a.iter().any(|&h| h != 0.0));
    }

    #[test]
    fn test_carve_holes_threshold() {
        let params = BrushParams {
            size: 800.0,
            falloff_fraction: 0.5,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 1.0);
        let rect = SampleRect::full(SIZE);
        let mask = carve_holes(&app, &rect);

        let mid = SIZE / 2;
        // Full weight at the center: carved.
        assert_eq!(mask[mid * SIZE + mid], 0);
        // Zero weight far away: surface.
        assert_eq!(mask[0], 1);

        // Inverse modifier restores everywhere.
        let restore = BrushApplication {
            strength: -1.0,
            ..centered_app(&params, -1.0)
        };
        let mask = carve_holes(&restore, &rect);
        assert!(mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn test_paint_accumulates_weight() {
        let params = BrushParams {
            size: 800.0,
            falloff_fraction: 0.5,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 0.25);
        let primary = vec![[255, 0, 0, 0]; SIZE * SIZE];
        let secondary = vec![[0u8; 4]; SIZE * SIZE];
        let mid = SIZE / 2;
        let rect = SampleRect::new(mid as i32, mid as i32, 1, 1);

        let (p, _s) = paint(&app, &primary, &secondary, SIZE, &rect, 1).unwrap();
        // Layer 1 gains a quarter weight; layer 0 is untouched (no reset).
        assert_eq!(p[0][0], 255);
        assert_eq!(p[0][1], splat::weight_to_byte(0.25));
    }

    #[test]
    fn test_paint_saturation_resets_other_layers() {
        let params = BrushParams {
            size: 800.0,
            falloff_fraction: 0.5,
            falloff: FalloffModel::Linear,
        };
        let app = centered_app(&params, 2.0);
        let mut primary = vec![[255, 0, 0, 0]; SIZE * SIZE];
        let mut secondary = vec![[0u8; 4]; SIZE * SIZE];
        let mid = SIZE / 2;
        primary[mid * SIZE + mid] = [120, 60, 0, 0];
        secondary[mid * SIZE + mid] = [30, 0, 0, 0];
        let rect = SampleRect::new(mid as i32, mid as i32, 1, 1);

        // Paint layer 5, which lives in the secondary splatmap.
        let (p, s) = paint(&app, &primary, &secondary, SIZE, &rect, 5).unwrap();
        assert_eq!(p[0], [0, 0, 0, 0]);
        assert_eq!(s[0], [0, 255, 0, 0]);
    }

    #[test]
    fn test_paint_rejects_bad_layer() {
        let params = BrushParams::default();
        let app = centered_app(&params, 1.0);
        let primary = vec![[0u8; 4]; SIZE * SIZE];
        let secondary = vec![[0u8; 4]; SIZE * SIZE];
        let rect = SampleRect::new(0, 0, 1, 1);
        assert!(paint(&app, &primary, &secondary, SIZE, &rect, 8).is_none());
    }
}
