//! Animated multi-point gradient engine.
//!
//! The crate renders a procedurally warped color gradient with a GPU
//! fragment pipeline, on a render thread of its own. The overall flow is:
//!
//! ```text
//!   host application
//!          │ GradientOptions
//!          ▼
//!   GradientEngine ──▶ Command channel ──▶ render thread ──▶ Executor
//!          ▲                                      │
//!          │◀── Ready / Error ◀────────────────────┘
//!          │                       UniformSnapshot ─▶ GPU UBO ─▶ quad draw
//! ```
//!
//! [`GradientEngine`] is the single point of contact: it merges
//! configuration objects, owns the animation clock, forwards resize
//! geometry, and reports `loading → playing ⇄ paused` to collaborators.
//! The render thread owns the wgpu surface and device; when the surface
//! handle cannot be acquired off-thread the engine transparently renders
//! on the host thread instead, processing the exact same command stream.

mod clock;
mod color;
mod config;
mod engine;
mod executor;
mod gpu;
mod protocol;
mod shader;
mod worker;

pub use color::parse_hex;
pub use config::{
    merge_with_defaults, EngineConfig, GradientOptions, GrainOptions, GrainSettings, Point,
    ResolvedPoint, WarpMode, WarpOptions, WarpSettings, MAX_POINTS,
};
pub use engine::{EngineError, GradientEngine, LifecycleState};
pub use gpu::uniforms::{ParamUpdate, UniformSnapshot, NEUTRAL_FALLBACK};
pub use protocol::{Command, Event, RenderTarget, WorkerError};
pub use shader::fragment_source;
