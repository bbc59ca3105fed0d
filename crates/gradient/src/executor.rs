//! Command processor for the render context.
//!
//! One `Executor` instance lives wherever rendering happens: on the
//! render thread in the worker path, or on the host thread in the
//! fallback path. Both paths feed it the same [`Command`] stream, so the
//! behavior is identical and only the execution context differs.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, error, trace, warn};

use crate::gpu::context::GpuContext;
use crate::gpu::state::GpuState;
use crate::gpu::uniforms::UniformSnapshot;
use crate::protocol::{scaled_extent, Command, Event, RenderTarget, WorkerError};

/// Render-context state machine.
///
/// `Failed` is reached from `Uninitialized` on init failure and is
/// terminal; a fresh executor (and context) is required to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Uninitialized,
    Ready,
    Failed,
    Destroyed,
}

pub(crate) struct Executor {
    phase: Phase,
    // Declared before `target`: the surface must drop before the handle
    // it was created from.
    gpu: Option<GpuState>,
    target: Option<Arc<dyn RenderTarget>>,
    snapshot: UniformSnapshot,
    params_applied: bool,
    events: Sender<Event>,
}

impl Executor {
    pub(crate) fn new(events: Sender<Event>) -> Self {
        Self {
            phase: Phase::Uninitialized,
            gpu: None,
            target: None,
            snapshot: UniformSnapshot::default(),
            params_applied: false,
            events,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn handle(&mut self, command: Command) {
        match command {
            Command::Init {
                target,
                fragment_source,
                width,
                height,
                scale,
            } => self.init(target, &fragment_source, width, height, scale),
            Command::UpdateParams(update) => {
                if matches!(self.phase, Phase::Destroyed | Phase::Failed) {
                    return;
                }
                self.snapshot.apply(&update);
                self.params_applied = true;
            }
            Command::Render { time } => self.render(time),
            Command::Resize {
                width,
                height,
                scale,
            } => self.resize(width, height, scale),
            Command::Destroy => self.destroy(),
        }
    }

    fn init(
        &mut self,
        target: Arc<dyn RenderTarget>,
        fragment_source: &str,
        width: u32,
        height: u32,
        scale: f64,
    ) {
        if self.phase != Phase::Uninitialized {
            warn!(phase = ?self.phase, "init ignored outside uninitialized state");
            return;
        }

        let (pixel_width, pixel_height) = scaled_extent(width, height, scale);
        let context = match GpuContext::new(target.as_ref(), pixel_width, pixel_height) {
            Ok(context) => context,
            Err(err) => {
                if matches!(err, WorkerError::SurfaceHandoff(_)) {
                    debug!(%err, "surface handoff failed; host may retry inline");
                } else {
                    error!(%err, "GPU context unavailable");
                }
                self.fail(err);
                return;
            }
        };

        match GpuState::new(context, fragment_source) {
            Ok(gpu) => {
                let (width, height) = gpu.size();
                self.snapshot.set_resolution(width, height);
                self.gpu = Some(gpu);
                self.target = Some(target);
                self.phase = Phase::Ready;
                debug!(width, height, "render context ready");
                let _ = self.events.send(Event::Ready);
            }
            Err(err) => {
                error!(err = %format!("{err:#}"), "shader pipeline build failed");
                self.fail(WorkerError::Fatal(format!("{err:#}")));
            }
        }
    }

    fn fail(&mut self, error: WorkerError) {
        self.gpu = None;
        self.target = None;
        self.phase = Phase::Failed;
        let _ = self.events.send(Event::Error(error));
    }

    fn render(&mut self, time: f32) {
        if self.phase != Phase::Ready || !self.params_applied {
            trace!(phase = ?self.phase, "render skipped before ready state");
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let params = self.snapshot.pack(time);
        match gpu.render(&params) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfiguring at the current size restores the swapchain;
                // the next frame request redraws.
                let (width, height) = gpu.size();
                warn!(width, height, "surface lost; reconfiguring");
                gpu.resize(width, height);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface frame acquisition timed out; skipping frame");
            }
            Err(err) => {
                error!(%err, "unrecoverable surface error");
                self.fail(WorkerError::Fatal(err.to_string()));
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32, scale: f64) {
        if matches!(self.phase, Phase::Destroyed | Phase::Failed) {
            return;
        }
        let (pixel_width, pixel_height) = scaled_extent(width, height, scale);
        if pixel_width == 0 || pixel_height == 0 {
            debug!(width, height, scale, "ignoring zero-area resize");
            return;
        }
        if let Some(gpu) = self.gpu.as_mut() {
            if gpu.size() == (pixel_width, pixel_height) {
                return;
            }
            gpu.resize(pixel_width, pixel_height);
        }
        self.snapshot.set_resolution(pixel_width, pixel_height);
    }

    fn destroy(&mut self) {
        if self.phase == Phase::Destroyed {
            return;
        }
        self.gpu = None;
        self.target = None;
        self.phase = Phase::Destroyed;
        debug!("render context destroyed");
    }
}
