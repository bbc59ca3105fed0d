//! Configuration surface consumed from the embedding application.
//!
//! `GradientOptions` mirrors the JSON-shaped object produced by editor
//! UIs: every field optional, camelCase keys, unknown keys ignored.
//! `merge_with_defaults` folds such a partial object over an existing
//! [`EngineConfig`], producing the immutable aggregate the engine renders
//! from. Malformed values never fail the merge; they are dropped with a
//! warning and the previous value is retained.

use serde::Deserialize;
use tracing::warn;

use crate::color::parse_hex;

/// Compile-time shader array bound; `max_points` can never exceed this.
pub const MAX_POINTS: usize = 12;

/// One gradient control point as supplied by the collaborator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Point {
    /// `#RRGGBB` or `#RGB` color string.
    pub color: String,
    /// Horizontal position in `[0, 1]`, left to right.
    pub x: f32,
    /// Vertical position in `[0, 1]`, top to bottom.
    pub y: f32,
}

/// Coordinate distortion applied before gradient sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarpMode {
    /// Sampling coordinates pass through unmodified.
    #[default]
    Off,
    Wave,
    Simplex,
    Fractal,
    Ridged,
    Swirl,
    Radial,
}

impl WarpMode {
    /// Maps the wire integer (0-6) onto a mode.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(WarpMode::Off),
            1 => Some(WarpMode::Wave),
            2 => Some(WarpMode::Simplex),
            3 => Some(WarpMode::Fractal),
            4 => Some(WarpMode::Ridged),
            5 => Some(WarpMode::Swirl),
            6 => Some(WarpMode::Radial),
            _ => None,
        }
    }

    /// The integer the shader switches on.
    pub fn index(self) -> i32 {
        match self {
            WarpMode::Off => 0,
            WarpMode::Wave => 1,
            WarpMode::Simplex => 2,
            WarpMode::Fractal => 3,
            WarpMode::Ridged => 4,
            WarpMode::Swirl => 5,
            WarpMode::Radial => 6,
        }
    }
}

/// Partial warp settings from the options object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WarpOptions {
    pub mode: Option<u32>,
    pub amount: Option<f32>,
    pub size: Option<f32>,
}

/// Partial grain settings from the options object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GrainOptions {
    pub amount: Option<f32>,
    pub size: Option<f32>,
}

/// The configuration object collaborators hand to the engine.
///
/// Safe to rebuild and reapply at any rate; applying the same options
/// twice is a no-op merge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradientOptions {
    pub points: Option<Vec<Point>>,
    pub max_points: Option<u32>,
    pub radius: Option<f32>,
    pub intensity: Option<f32>,
    pub warp: Option<WarpOptions>,
    pub speed: Option<f32>,
    pub seed: Option<f32>,
    pub grain: Option<GrainOptions>,
}

/// A control point with its color already decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPoint {
    pub color: [f32; 3],
    pub x: f32,
    pub y: f32,
}

/// Resolved warp settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpSettings {
    pub mode: WarpMode,
    pub amount: f32,
    pub size: f32,
}

impl Default for WarpSettings {
    fn default() -> Self {
        Self {
            mode: WarpMode::Off,
            amount: 0.0,
            size: 1.0,
        }
    }
}

/// Resolved grain settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainSettings {
    pub amount: f32,
    pub size: f32,
}

impl Default for GrainSettings {
    fn default() -> Self {
        Self {
            amount: 0.0,
            size: 1.0,
        }
    }
}

/// The complete, immutable render configuration.
///
/// Built once at engine construction and replaced wholesale by every
/// accepted options message; nothing mutates it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub points: Vec<ResolvedPoint>,
    pub max_points: usize,
    pub radius: f32,
    pub intensity: f32,
    pub warp: WarpSettings,
    pub speed: f32,
    pub seed: f32,
    pub grain: GrainSettings,
}

impl EngineConfig {
    /// Baseline configuration with a freshly drawn random seed.
    pub fn new() -> Self {
        Self::with_seed(rand::random::<f32>())
    }

    /// Baseline configuration with a caller-chosen seed.
    pub fn with_seed(seed: f32) -> Self {
        Self {
            points: Vec::new(),
            max_points: MAX_POINTS,
            radius: 0.6,
            intensity: 1.0,
            warp: WarpSettings::default(),
            speed: 1.0,
            seed,
            grain: GrainSettings::default(),
        }
    }

    /// Points actually rendered: `min(points.len(), max_points)`.
    pub fn rendered_point_count(&self) -> usize {
        self.points.len().min(self.max_points)
    }
}

/// Folds a partial options object over `base`, yielding the next config.
///
/// Unset fields keep their previous value; set fields are sanitized
/// before acceptance. Invalid point colors drop that point, out-of-range
/// scalars fall back to the previous value, both with a logged warning.
pub fn merge_with_defaults(options: &GradientOptions, base: &EngineConfig) -> EngineConfig {
    let max_points = options
        .max_points
        .map(|requested| {
            let capped = (requested as usize).min(MAX_POINTS);
            if capped != requested as usize {
                warn!(requested, cap = MAX_POINTS, "maxPoints clamped to shader bound");
            }
            capped
        })
        .unwrap_or(base.max_points);

    let points = match &options.points {
        Some(raw) => resolve_points(raw, max_points),
        None => {
            let mut kept = base.points.clone();
            kept.truncate(max_points);
            kept
        }
    };

    let warp = options
        .warp
        .map(|partial| WarpSettings {
            mode: partial
                .mode
                .map(|index| {
                    WarpMode::from_index(index).unwrap_or_else(|| {
                        warn!(index, "unknown warp mode; keeping previous");
                        base.warp.mode
                    })
                })
                .unwrap_or(base.warp.mode),
            amount: sanitize(partial.amount, base.warp.amount, "warp.amount", 0.0, f32::MAX),
            size: sanitize(partial.size, base.warp.size, "warp.size", f32::MIN_POSITIVE, f32::MAX),
        })
        .unwrap_or(base.warp);

    let grain = options
        .grain
        .map(|partial| GrainSettings {
            amount: sanitize(partial.amount, base.grain.amount, "grain.amount", 0.0, f32::MAX),
            size: sanitize(partial.size, base.grain.size, "grain.size", f32::MIN_POSITIVE, f32::MAX),
        })
        .unwrap_or(base.grain);

    EngineConfig {
        points,
        max_points,
        radius: sanitize(options.radius, base.radius, "radius", f32::MIN_POSITIVE, f32::MAX),
        intensity: sanitize(options.intensity, base.intensity, "intensity", 0.0, f32::MAX),
        warp,
        speed: sanitize(options.speed, base.speed, "speed", 0.0, f32::MAX),
        seed: sanitize(options.seed, base.seed, "seed", f32::MIN, f32::MAX),
        grain,
    }
}

fn resolve_points(raw: &[Point], max_points: usize) -> Vec<ResolvedPoint> {
    let mut resolved = Vec::with_capacity(raw.len().min(max_points));
    for point in raw {
        if resolved.len() == max_points {
            warn!(
                supplied = raw.len(),
                max_points, "excess gradient points dropped"
            );
            break;
        }
        match parse_hex(&point.color) {
            Some(color) if point.x.is_finite() && point.y.is_finite() => {
                resolved.push(ResolvedPoint {
                    color,
                    x: point.x.clamp(0.0, 1.0),
                    y: point.y.clamp(0.0, 1.0),
                });
            }
            _ => warn!(color = %point.color, "invalid gradient point skipped"),
        }
    }
    resolved
}

fn sanitize(candidate: Option<f32>, previous: f32, field: &str, min: f32, max: f32) -> f32 {
    match candidate {
        Some(value) if value.is_finite() && value >= min && value <= max => value,
        Some(value) => {
            warn!(field, value, "out-of-range value ignored");
            previous
        }
        None => previous,
    }
}
