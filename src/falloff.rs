//! Brush falloff models.
//!
//! Pure distance-to-weight functions shared by every brush operation.
//! Distance is planar (XZ only); the weight is 1.0 inside the brush radius,
//! 0.0 beyond radius + falloff, and shaped by the model in between.

/// How a brush's influence fades between its hard radius and its outer edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FalloffModel {
    /// Straight linear ramp.
    Linear,
    /// Cubic smoothstep applied to the linear ramp.
    #[default]
    Smooth,
    /// Sphere-like profile, steep near the outer edge.
    Spherical,
    /// Inverted sphere profile, steep near the inner radius.
    Tip,
}

impl FalloffModel {
    /// Weight at planar distance `d` for a brush with the given hard
    /// `radius` and `falloff` band width. Result is in `[0, 1]`.
    ///
    /// Spherical and Tip are intentionally only approximately continuous at
    /// the band edges; that matches their established shapes.
    pub fn weight_for_distance(&self, radius: f32, falloff: f32, d: f32) -> f32 {
        if d <= radius {
            return 1.0;
        }
        if falloff <= 0.0 || d >= radius + falloff {
            return 0.0;
        }
        match self {
            FalloffModel::Linear => 1.0 - (d - radius) / falloff,
            FalloffModel::Smooth => {
                let t = 1.0 - (d - radius) / falloff;
                t * t * (3.0 - 2.0 * t)
            }
            FalloffModel::Spherical => {
                let t = (d - radius) / falloff;
                (1.0 - t.sqrt()).max(0.0).sqrt()
            }
            FalloffModel::Tip => {
                let t = (falloff + radius - d) / falloff;
                1.0 - (1.0 - t.sqrt()).max(0.0).sqrt()
            }
        }
    }

    /// Weight at `position` for a brush of the given `diameter` centered at
    /// `center`, both in world XZ. `falloff_fraction` in `[0, 1]` splits the
    /// brush between hard radius and falloff band:
    /// `radius = diameter/2 * (1 - fraction)`, `falloff = diameter/2 * fraction`.
    pub fn sample(
        &self,
        falloff_fraction: f32,
        diameter: f32,
        center: [f32; 2],
        position: [f32; 2],
    ) -> f32 {
        let half = diameter * 0.5;
        let radius = half * (1.0 - falloff_fraction);
        let falloff = half * falloff_fraction;
        let dx = position[0] - center[0];
        let dz = position[1] - center[1];
        let d = (dx * dx + dz * dz).sqrt();
        self.weight_for_distance(radius, falloff, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: [FalloffModel; 4] = [
        FalloffModel::Linear,
        FalloffModel::Smooth,
        FalloffModel::Spherical,
        FalloffModel::Tip,
    ];

    #[test]
    fn test_weight_is_one_inside_radius() {
        for model in MODELS {
            assert_eq!(model.weight_for_distance(1000.0, 1000.0, 0.0), 1.0);
            assert_eq!(model.weight_for_distance(1000.0, 1000.0, 999.0), 1.0);
            assert_eq!(model.weight_for_distance(1000.0, 1000.0, 1000.0), 1.0);
        }
    }

    #[test]
    fn test_weight_is_zero_beyond_falloff() {
        for model in MODELS {
            assert_eq!(model.weight_for_distance(1000.0, 1000.0, 2000.0), 0.0);
            assert_eq!(model.weight_for_distance(1000.0, 1000.0, 5000.0), 0.0);
        }
    }

    #[test]
    fn test_weight_stays_in_unit_range() {
        for model in MODELS {
            for i in 0..=100 {
                let d = 1000.0 + 10.0 * i as f32;
                let w = model.weight_for_distance(1000.0, 1000.0, d);
                assert!((0.0..=1.0).contains(&w), "{model:?} at {d}: {w}");
            }
        }
    }

    #[test]
    fn test_smooth_midpoint_is_half() {
        // diameter 4000, fraction 0.5 -> radius 1000, falloff 1000.
        // Distance 1500 is the band midpoint; smoothstep(0.5) = 0.5.
        let model = FalloffModel::Smooth;
        let w = model.sample(0.5, 4000.0, [0.0, 0.0], [1500.0, 0.0]);
        assert!((w - 0.5).abs() < 1e-6, "got {w}");
        assert_eq!(model.sample(0.5, 4000.0, [0.0, 0.0], [1000.0, 0.0]), 1.0);
        assert_eq!(model.sample(0.5, 4000.0, [0.0, 0.0], [2000.0, 0.0]), 0.0);
    }

    #[test]
    fn test_smooth_is_monotonic_over_band() {
        let model = FalloffModel::Smooth;
        let mut prev = 1.0f32;
        for i in 0..=200 {
            let d = 1000.0 + 5.0 * i as f32;
            let w = model.weight_for_distance(1000.0, 1000.0, d);
            assert!(w <= prev + 1e-6, "not monotonic at {d}: {w} > {prev}");
            prev = w;
        }
    }

    #[test]
    fn test_zero_falloff_band_is_a_step() {
        for model in MODELS {
            assert_eq!(model.weight_for_distance(500.0, 0.0, 499.0), 1.0);
            assert_eq!(model.weight_for_distance(500.0, 0.0, 501.0), 0.0);
        }
    }

    #[test]
    fn test_sample_uses_planar_distance() {
        // Same XZ offset, the model never sees Y.
        let w_a = FalloffModel::Linear.sample(0.5, 2000.0, [10.0, 20.0], [310.0, 420.0]);
        let w_b = FalloffModel::Linear.sample(0.5, 2000.0, [0.0, 0.0], [300.0, 400.0]);
        assert!((w_a - w_b).abs() < 1e-6);
    }
}
