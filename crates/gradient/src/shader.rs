//! Embedded GLSL sources and shader-module compilation.
//!
//! The fragment stage is first-party GLSL compiled at surface
//! acquisition through wgpu's naga frontend. The uniform block layout
//! must match [`GradientParams`](crate::gpu::uniforms) in `gpu/uniforms.rs`;
//! block members are aliased through macros so the shader body reads
//! naturally.

use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

use crate::config::MAX_POINTS;

/// Compiles the static full-screen quad vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Compiles the supplied fragment source as Vulkan GLSL.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gradient fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Produces the gradient fragment shader with the point bound baked in.
///
/// The `init` command carries this text into the render context, so the
/// host side decides exactly which program the worker compiles.
pub fn fragment_source() -> String {
    FRAGMENT_TEMPLATE.replace("{{MAX_POINTS}}", &MAX_POINTS.to_string())
}

/// Minimal unit-quad vertex shader: two triangles, six vertices.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    // uv y grows downward so point coordinates match pointer space.
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const FRAGMENT_TEMPLATE: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

#define MAX_POINTS {{MAX_POINTS}}

layout(std140, set = 0, binding = 0) uniform GradientParams {
    vec2 _resolution;
    float _time;
    float _seed;
    vec4 _colors[MAX_POINTS];
    vec4 _positions[MAX_POINTS];
    int _point_count;
    float _radius;
    float _intensity;
    int _warp_mode;
    float _warp_amount;
    float _warp_size;
    float _grain_amount;
    float _grain_size;
} ubo;

#define u_resolution ubo._resolution
#define u_time ubo._time
#define u_seed ubo._seed
#define u_colors ubo._colors
#define u_positions ubo._positions
#define u_point_count ubo._point_count
#define u_radius ubo._radius
#define u_intensity ubo._intensity
#define u_warp_mode ubo._warp_mode
#define u_warp_amount ubo._warp_amount
#define u_warp_size ubo._warp_size
#define u_grain_amount ubo._grain_amount
#define u_grain_size ubo._grain_size

#define TAU 6.2831853
#define PI 3.14159265

// Lattice gradients for the noise field. The seed shifts every gradient
// together, so one scalar reseeds all stochastic warps and the grain.
vec2 hash2(vec2 cell) {
    vec2 p = vec2(dot(cell, vec2(127.1, 311.7)), dot(cell, vec2(269.5, 183.3)));
    return fract(sin(p + u_seed * 17.13) * 43758.5453) * 2.0 - 1.0;
}

// 2D gradient noise, continuous, roughly [-1, 1].
float gnoise(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);
    vec2 u = f * f * (3.0 - 2.0 * f);
    float a = dot(hash2(i), f);
    float b = dot(hash2(i + vec2(1.0, 0.0)), f - vec2(1.0, 0.0));
    float c = dot(hash2(i + vec2(0.0, 1.0)), f - vec2(0.0, 1.0));
    float d = dot(hash2(i + vec2(1.0, 1.0)), f - vec2(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

// Fractal sum: five octaves, halving amplitude, doubling frequency.
float fbm(vec2 p) {
    float sum = 0.0;
    float amplitude = 0.5;
    for (int octave = 0; octave < 5; ++octave) {
        sum += amplitude * gnoise(p);
        p *= 2.0;
        amplitude *= 0.5;
    }
    return sum;
}

// Displaces the sampling coordinate for the selected warp mode.
// Horizontal displacement is divided by the aspect ratio so the
// distortion stays visually isotropic on non-square surfaces.
vec2 warp_uv(vec2 uv, float aspect) {
    if (u_warp_mode == 0 || u_warp_amount <= 0.0) {
        return uv;
    }

    vec2 scaled = uv * u_warp_size;
    vec2 offset = vec2(0.0);

    if (u_warp_mode == 1) {
        // Orthogonal waves with a noise-broken phase; never exactly
        // periodic across seeds.
        float phase = gnoise(scaled + u_seed * 3.7) * PI;
        offset = vec2(
            sin(scaled.y * TAU + u_time + phase),
            cos(scaled.x * TAU + u_time - phase)) * 0.05;
    } else if (u_warp_mode == 2) {
        offset = vec2(
            gnoise(scaled + vec2(0.0, u_time * 0.1)),
            gnoise(scaled + vec2(5.2, 1.3) + vec2(u_time * 0.1, 0.0))) * 0.1;
    } else if (u_warp_mode == 3) {
        offset = vec2(
            fbm(scaled + vec2(0.0, u_time * 0.05)),
            fbm(scaled + vec2(7.7, 2.9) + vec2(u_time * 0.05, 0.0))) * 0.15;
    } else if (u_warp_mode == 4) {
        // Folded fractal sum produces sharp ridges.
        offset = vec2(
            1.0 - abs(fbm(scaled + vec2(0.0, u_time * 0.05))),
            1.0 - abs(fbm(scaled + vec2(4.1, 8.3) + vec2(u_time * 0.05, 0.0)))) * 0.2;
    } else if (u_warp_mode == 5) {
        // Rotate the centered coordinate by an angle proportional to
        // radius and time.
        vec2 centered = (uv - 0.5) * vec2(aspect, 1.0);
        float angle = length(centered) * u_warp_amount * 3.0 + u_time * 0.2;
        float s = sin(angle);
        float c = cos(angle);
        centered = mat2(c, -s, s, c) * centered;
        return centered / vec2(aspect, 1.0) + 0.5;
    } else {
        // Perturb the polar radius, then reconstruct Cartesian.
        vec2 centered = (uv - 0.5) * vec2(aspect, 1.0);
        float radius = length(centered);
        float theta = atan(centered.y, centered.x);
        radius += sin(radius * u_warp_size * 2.0 * TAU - u_time) * u_warp_amount * 0.05;
        centered = vec2(cos(theta), sin(theta)) * radius;
        return centered / vec2(aspect, 1.0) + 0.5;
    }

    offset.x /= aspect;
    return uv + offset * u_warp_amount;
}

void main() {
    float aspect = u_resolution.x / max(u_resolution.y, 1.0);
    vec2 uv = v_uv;
    vec2 centered = uv - 0.5;
    vec2 sample_uv = warp_uv(uv, aspect);

    vec3 accumulated = vec3(0.0);
    float total_weight = 0.0;
    for (int i = 0; i < MAX_POINTS; ++i) {
        if (i >= u_point_count) {
            break;
        }
        vec2 delta = sample_uv - u_positions[i].xy;
        delta.x *= aspect;
        float dist = length(delta);
        float weight = exp(-dist * dist / (u_radius * u_radius));
        weight = pow(weight, max(u_intensity, 0.001));
        accumulated += u_colors[i].rgb * weight;
        total_weight += weight;
    }

    // Neutral near-white when no point carries weight.
    vec3 color = total_weight > 0.0 ? accumulated / total_weight : vec3(0.96);

    // Radial vignette for depth.
    float falloff = length(centered * vec2(aspect, 1.0));
    color *= 1.0 - 0.15 * smoothstep(0.4, 1.1, falloff);

    // Centered hash grain over a size-scaled pixel lattice; can both
    // lighten and darken.
    if (u_grain_amount > 0.0) {
        vec2 cell = floor(gl_FragCoord.xy / max(u_grain_size, 1.0));
        float grain = fract(sin(dot(cell, vec2(12.9898, 78.233)) + u_seed * 101.0) * 43758.5453) - 0.5;
        color += grain * u_grain_amount;
    }

    out_color = vec4(color, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_source_bakes_point_bound() {
        let source = fragment_source();
        assert!(source.contains(&format!("#define MAX_POINTS {MAX_POINTS}")));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn fragment_source_declares_every_uniform() {
        let source = fragment_source();
        for name in [
            "_resolution",
            "_time",
            "_seed",
            "_colors",
            "_positions",
            "_point_count",
            "_radius",
            "_intensity",
            "_warp_mode",
            "_warp_amount",
            "_warp_size",
            "_grain_amount",
            "_grain_size",
        ] {
            assert!(source.contains(name), "missing uniform {name}");
        }
    }

    #[test]
    fn vertex_quad_has_six_vertices() {
        assert!(VERTEX_SHADER_GLSL.contains("positions[6]"));
    }
}
