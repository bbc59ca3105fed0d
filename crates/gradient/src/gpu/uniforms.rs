//! Render-parameter snapshot and its GPU projection.
//!
//! [`UniformSnapshot`] is the authoritative host-structured set of render
//! parameters owned by the render context. Partial [`ParamUpdate`]s merge
//! into it field-by-field (last write wins); each frame packs the whole
//! snapshot into the std140 [`GradientParams`] block in one buffer write,
//! so every draw sees one self-consistent parameter set.

use bytemuck::{Pod, Zeroable};

use crate::config::{EngineConfig, WarpMode, MAX_POINTS};

/// Color emitted when no point carries any weight.
pub const NEUTRAL_FALLBACK: [f32; 3] = [0.96, 0.96, 0.96];

/// std140 uniform block consumed by the fragment stage.
///
/// Field order and padding must match the `GradientParams` block declared
/// in `shader.rs`; arrays are vec4-aligned per std140.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct GradientParams {
    pub resolution: [f32; 2],
    pub time: f32,
    pub seed: f32,
    pub colors: [[f32; 4]; MAX_POINTS],
    pub positions: [[f32; 4]; MAX_POINTS],
    pub point_count: i32,
    pub radius: f32,
    pub intensity: f32,
    pub warp_mode: i32,
    pub warp_amount: f32,
    pub warp_size: f32,
    pub grain_amount: f32,
    pub grain_size: f32,
}

unsafe impl Zeroable for GradientParams {}
unsafe impl Pod for GradientParams {}

/// Partial field map merged into the snapshot by `updateUniforms`.
///
/// Every field is optional; unset fields leave the current value alone.
/// Merging the same update twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamUpdate {
    pub colors: Option<Vec<[f32; 3]>>,
    pub positions: Option<Vec<[f32; 2]>>,
    pub radius: Option<f32>,
    pub intensity: Option<f32>,
    pub warp_mode: Option<WarpMode>,
    pub warp_amount: Option<f32>,
    pub warp_size: Option<f32>,
    pub seed: Option<f32>,
    pub grain_amount: Option<f32>,
    pub grain_size: Option<f32>,
}

impl ParamUpdate {
    /// Full update carrying every field of a resolved configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            colors: Some(config.points.iter().map(|point| point.color).collect()),
            positions: Some(config.points.iter().map(|point| [point.x, point.y]).collect()),
            radius: Some(config.radius),
            intensity: Some(config.intensity),
            warp_mode: Some(config.warp.mode),
            warp_amount: Some(config.warp.amount),
            warp_size: Some(config.warp.size),
            seed: Some(config.seed),
            grain_amount: Some(config.grain.amount),
            grain_size: Some(config.grain.size),
        }
    }
}

/// The current, complete set of render parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSnapshot {
    pub resolution: [f32; 2],
    pub colors: Vec<[f32; 3]>,
    pub positions: Vec<[f32; 2]>,
    pub radius: f32,
    pub intensity: f32,
    pub warp_mode: WarpMode,
    pub warp_amount: f32,
    pub warp_size: f32,
    pub seed: f32,
    pub grain_amount: f32,
    pub grain_size: f32,
}

impl Default for UniformSnapshot {
    fn default() -> Self {
        Self {
            resolution: [1.0, 1.0],
            colors: Vec::new(),
            positions: Vec::new(),
            radius: 0.6,
            intensity: 1.0,
            warp_mode: WarpMode::Off,
            warp_amount: 0.0,
            warp_size: 1.0,
            seed: 0.0,
            grain_amount: 0.0,
            grain_size: 1.0,
        }
    }
}

impl UniformSnapshot {
    /// Shallow-merges `update` into the snapshot, last write wins.
    pub fn apply(&mut self, update: &ParamUpdate) {
        if let Some(colors) = &update.colors {
            self.colors = colors.clone();
        }
        if let Some(positions) = &update.positions {
            self.positions = positions.clone();
        }
        if let Some(radius) = update.radius {
            self.radius = radius;
        }
        if let Some(intensity) = update.intensity {
            self.intensity = intensity;
        }
        if let Some(mode) = update.warp_mode {
            self.warp_mode = mode;
        }
        if let Some(amount) = update.warp_amount {
            self.warp_amount = amount;
        }
        if let Some(size) = update.warp_size {
            self.warp_size = size;
        }
        if let Some(seed) = update.seed {
            self.seed = seed;
        }
        if let Some(amount) = update.grain_amount {
            self.grain_amount = amount;
        }
        if let Some(size) = update.grain_size {
            self.grain_size = size;
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width as f32, height as f32];
    }

    /// Point slots the shader will blend.
    pub fn point_count(&self) -> usize {
        self.colors.len().min(self.positions.len()).min(MAX_POINTS)
    }

    /// Packs the snapshot into the std140 block for one frame.
    pub(crate) fn pack(&self, time: f32) -> GradientParams {
        let mut params = GradientParams::zeroed();
        params.resolution = self.resolution;
        params.time = time;
        params.seed = self.seed;
        let count = self.point_count();
        for index in 0..count {
            let [r, g, b] = self.colors[index];
            params.colors[index] = [r, g, b, 1.0];
            let [x, y] = self.positions[index];
            params.positions[index] = [x, y, 0.0, 0.0];
        }
        params.point_count = count as i32;
        params.radius = self.radius;
        params.intensity = self.intensity;
        params.warp_mode = self.warp_mode.index();
        params.warp_amount = self.warp_amount;
        params.warp_size = self.warp_size;
        params.grain_amount = self.grain_amount;
        params.grain_size = self.grain_size;
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{merge_with_defaults, GradientOptions};

    /// CPU mirror of the fragment stage's weighted blend, used to pin the
    /// numeric contract the shader implements.
    fn blend_reference(snapshot: &UniformSnapshot, uv: [f32; 2], aspect: f32) -> [f32; 3] {
        let mut accumulated = [0.0f32; 3];
        let mut total = 0.0f32;
        for index in 0..snapshot.point_count() {
            let [px, py] = snapshot.positions[index];
            let dx = (uv[0] - px) * aspect;
            let dy = uv[1] - py;
            let weight = (-(dx * dx + dy * dy) / (snapshot.radius * snapshot.radius))
                .exp()
                .powf(snapshot.intensity.max(0.001));
            for channel in 0..3 {
                accumulated[channel] += snapshot.colors[index][channel] * weight;
            }
            total += weight;
        }
        if total > 0.0 {
            accumulated.map(|value| value / total)
        } else {
            NEUTRAL_FALLBACK
        }
    }

    #[test]
    fn std140_block_is_432_bytes() {
        assert_eq!(std::mem::size_of::<GradientParams>(), 432);
        assert_eq!(std::mem::align_of::<GradientParams>(), 16);
    }

    #[test]
    fn merge_is_last_write_wins_per_field() {
        let mut snapshot = UniformSnapshot::default();
        snapshot.apply(&ParamUpdate {
            radius: Some(0.3),
            seed: Some(0.25),
            ..Default::default()
        });
        snapshot.apply(&ParamUpdate {
            radius: Some(0.9),
            ..Default::default()
        });
        assert_eq!(snapshot.radius, 0.9);
        assert_eq!(snapshot.seed, 0.25);
        assert_eq!(snapshot.intensity, 1.0);
    }

    #[test]
    fn repeated_merge_is_idempotent() {
        let update = ParamUpdate {
            colors: Some(vec![[1.0, 0.0, 0.0]]),
            positions: Some(vec![[0.5, 0.5]]),
            warp_amount: Some(0.4),
            ..Default::default()
        };
        let mut once = UniformSnapshot::default();
        once.apply(&update);
        let mut twice = once.clone();
        twice.apply(&update);
        assert_eq!(once, twice);
    }

    #[test]
    fn packed_point_count_is_min_of_slots_and_bound() {
        let mut snapshot = UniformSnapshot::default();
        snapshot.apply(&ParamUpdate {
            colors: Some(vec![[1.0, 0.0, 0.0]; 15]),
            positions: Some(vec![[0.5, 0.5]; 14]),
            ..Default::default()
        });
        assert_eq!(snapshot.point_count(), MAX_POINTS);
        assert_eq!(snapshot.pack(0.0).point_count, MAX_POINTS as i32);

        snapshot.apply(&ParamUpdate {
            colors: Some(vec![[1.0, 0.0, 0.0]; 3]),
            positions: Some(vec![[0.5, 0.5]; 2]),
            ..Default::default()
        });
        assert_eq!(snapshot.point_count(), 2);
    }

    #[test]
    fn packed_block_mirrors_snapshot_fields() {
        let mut snapshot = UniformSnapshot::default();
        snapshot.set_resolution(800, 600);
        snapshot.apply(&ParamUpdate {
            colors: Some(vec![[0.1, 0.2, 0.3]]),
            positions: Some(vec![[0.25, 0.75]]),
            warp_mode: Some(WarpMode::Swirl),
            warp_amount: Some(0.5),
            grain_size: Some(2.0),
            ..Default::default()
        });
        let params = snapshot.pack(3.5);
        assert_eq!(params.resolution, [800.0, 600.0]);
        assert_eq!(params.time, 3.5);
        assert_eq!(params.colors[0], [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(params.positions[0], [0.25, 0.75, 0.0, 0.0]);
        assert_eq!(params.warp_mode, 5);
        assert_eq!(params.grain_size, 2.0);
        // Unused slots stay zeroed.
        assert_eq!(params.colors[1], [0.0; 4]);
    }

    #[test]
    fn zero_points_blend_to_neutral_fallback() {
        for (radius, intensity) in [(0.1, 0.5), (0.6, 1.0), (5.0, 3.0)] {
            let snapshot = UniformSnapshot {
                radius,
                intensity,
                ..Default::default()
            };
            assert_eq!(blend_reference(&snapshot, [0.3, 0.8], 1.0), NEUTRAL_FALLBACK);
        }
    }

    #[test]
    fn single_point_with_huge_radius_dominates_everywhere() {
        let mut snapshot = UniformSnapshot::default();
        snapshot.apply(&ParamUpdate {
            colors: Some(vec![[0.2, 0.4, 0.9]]),
            positions: Some(vec![[0.1, 0.1]]),
            radius: Some(1000.0),
            ..Default::default()
        });
        for uv in [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]] {
            let blended = blend_reference(&snapshot, uv, 1.0);
            for channel in 0..3 {
                assert!((blended[channel] - snapshot.colors[0][channel]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn red_blue_diagonal_blends_toward_nearest_point() {
        let options: GradientOptions = serde_json::from_str(
            r##"{
                "points": [
                    {"color": "#ff0000", "x": 0.0, "y": 0.0},
                    {"color": "#0000ff", "x": 1.0, "y": 1.0}
                ],
                "radius": 0.6,
                "intensity": 1.0,
                "seed": 0.5
            }"##,
        )
        .unwrap();
        let config = merge_with_defaults(&options, &EngineConfig::with_seed(0.0));
        let mut snapshot = UniformSnapshot::default();
        snapshot.set_resolution(100, 100);
        snapshot.apply(&ParamUpdate::from_config(&config));

        // Pixel centers nearest the two corners of a 100x100 surface.
        let near_origin = blend_reference(&snapshot, [0.005, 0.005], 1.0);
        let near_far = blend_reference(&snapshot, [0.995, 0.995], 1.0);
        assert!(near_origin[0] > near_origin[2], "origin should lean red");
        assert!(near_far[2] > near_far[0], "far corner should lean blue");
    }

    #[test]
    fn fallback_constant_matches_shader_literal() {
        assert!(crate::shader::fragment_source().contains("vec3(0.96)"));
    }
}
