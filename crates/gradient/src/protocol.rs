//! Cross-context message protocol.
//!
//! One typed command channel runs host → render context, one
//! acknowledgement channel runs back. Both the worker thread and the
//! same-thread fallback consume exactly these variants, so the host
//! controller's logic is identical regardless of where rendering happens.
//! Delivery is FIFO; commands are fire-and-forget and never block the
//! host.

use std::fmt;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use thiserror::Error;

use crate::gpu::uniforms::ParamUpdate;

/// The surface the render context draws into.
///
/// `Send + Sync` is what makes the ownership handoff to the render
/// thread legal; the render context keeps the handle alive for as long
/// as its wgpu surface exists.
pub trait RenderTarget: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T> RenderTarget for T where T: HasWindowHandle + HasDisplayHandle + Send + Sync {}

/// Commands flowing host → render context.
pub enum Command {
    /// Acquire a GPU context from the surface, compile/link the program,
    /// build the quad pipeline. Answered by [`Event::Ready`] or
    /// [`Event::Error`].
    Init {
        target: Arc<dyn RenderTarget>,
        fragment_source: String,
        /// Display size; device pixels are `floor(dimension × scale)`.
        width: u32,
        height: u32,
        scale: f64,
    },
    /// Merge a partial field map into the uniform snapshot. No render.
    UpdateParams(ParamUpdate),
    /// Draw one frame at the given animation time (seconds).
    Render { time: f32 },
    /// Resize the backing buffer; `scale` is 1.0 when the caller already
    /// supplies device pixels.
    Resize { width: u32, height: u32, scale: f64 },
    /// Stop accepting renders and release GPU resources. Idempotent.
    Destroy,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Init { width, height, scale, .. } => f
                .debug_struct("Init")
                .field("width", width)
                .field("height", height)
                .field("scale", scale)
                .finish_non_exhaustive(),
            Command::UpdateParams(update) => f.debug_tuple("UpdateParams").field(update).finish(),
            Command::Render { time } => f.debug_struct("Render").field("time", time).finish(),
            Command::Resize { width, height, scale } => f
                .debug_struct("Resize")
                .field("width", width)
                .field("height", height)
                .field("scale", scale)
                .finish(),
            Command::Destroy => f.write_str("Destroy"),
        }
    }
}

/// Acknowledgements flowing render context → host.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Initialization succeeded; the context will render on request.
    Ready,
    /// Initialization failed; this context will never render.
    Error(WorkerError),
}

/// Why initialization failed, as reported over the ack channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    /// The surface could not be acquired inside the render context. The
    /// host silently retries on its own thread; never user-visible.
    #[error("surface handoff to render context failed: {0}")]
    SurfaceHandoff(String),
    /// Unrecoverable for this context: no adapter, device loss, shader
    /// compile/link failure. Carries the diagnostic verbatim.
    #[error("{0}")]
    Fatal(String),
}

/// Device-pixel extent of a display-sized rectangle.
pub(crate) fn scaled_extent(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        (width as f64 * scale).floor() as u32,
        (height as f64 * scale).floor() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_floors_fractional_device_pixels() {
        assert_eq!(scaled_extent(100, 100, 1.5), (150, 150));
        assert_eq!(scaled_extent(101, 47, 1.25), (126, 58));
        assert_eq!(scaled_extent(640, 480, 1.0), (640, 480));
    }

    #[test]
    fn zero_area_survives_scaling() {
        assert_eq!(scaled_extent(0, 100, 2.0), (0, 200));
        assert_eq!(scaled_extent(0, 0, 1.5), (0, 0));
    }
}
