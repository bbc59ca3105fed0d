//! Host controller and lifecycle state machine.
//!
//! `GradientEngine` is the single point of contact for collaborators:
//! it owns the worker handle (or the inline fallback executor), merges
//! configuration, forwards resize geometry, and drives the animation
//! clock. All dispatch is fire-and-forget; acknowledgements are drained
//! on each tick and folded into the lifecycle state.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::FrameClock;
use crate::config::{merge_with_defaults, EngineConfig, GradientOptions};
use crate::executor::Executor;
use crate::gpu::uniforms::ParamUpdate;
use crate::protocol::{Command, Event, RenderTarget, WorkerError};
use crate::shader;
use crate::worker::WorkerHandle;

/// Engine state observable by collaborators.
///
/// `loading` holds until the first frame after a successful init;
/// teardown is implicit (the engine stops reporting anything).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a surface is already attached")]
    AlreadyAttached,
    #[error("engine has been torn down")]
    Destroyed,
}

enum RenderLink {
    Worker(WorkerHandle),
    Inline {
        executor: Executor,
        events: Receiver<Event>,
    },
}

struct AttachParams {
    target: Arc<dyn RenderTarget>,
    width: u32,
    height: u32,
    scale: f64,
}

pub struct GradientEngine {
    config: EngineConfig,
    clock: FrameClock,
    state: LifecycleState,
    destroyed: bool,
    ready: bool,
    link: Option<RenderLink>,
    // Retained so a failed surface handoff can be replayed inline.
    attach_params: Option<AttachParams>,
    geometry: Option<(u32, u32, f64)>,
    state_tx: Sender<LifecycleState>,
    state_rx: Receiver<LifecycleState>,
}

impl GradientEngine {
    pub fn new(options: &GradientOptions) -> Self {
        let config = merge_with_defaults(options, &EngineConfig::new());
        let mut clock = FrameClock::new();
        clock.set_speed(config.speed);
        let (state_tx, state_rx) = unbounded();
        Self {
            config,
            clock,
            state: LifecycleState::Loading,
            destroyed: false,
            ready: false,
            link: None,
            attach_params: None,
            geometry: None,
            state_tx,
            state_rx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Receiver of lifecycle transitions, in order. Single consumer.
    pub fn state_events(&self) -> Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    /// Caps the render rate; `None` renders on every tick.
    pub fn set_target_fps(&mut self, fps: Option<f32>) {
        self.clock.set_target_fps(fps);
    }

    /// Applies a configuration object.
    ///
    /// Safe to call at any rate; unset fields keep their value and
    /// repeated identical updates merge to the same snapshot.
    pub fn configure(&mut self, options: &GradientOptions) {
        if self.destroyed {
            return;
        }
        self.config = merge_with_defaults(options, &self.config);
        self.clock.set_speed(self.config.speed);
        let update = ParamUpdate::from_config(&self.config);
        self.dispatch(Command::UpdateParams(update));
    }

    /// Hands the drawing surface to the render context and starts the
    /// animation clock.
    ///
    /// The worker path is tried first; if the render thread cannot even
    /// be spawned the engine renders inline from the start. A handoff
    /// failure reported later by the worker also falls back inline, via
    /// [`tick`](Self::tick).
    pub fn attach(
        &mut self,
        target: Arc<dyn RenderTarget>,
        width: u32,
        height: u32,
        scale: f64,
    ) -> Result<(), EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        if self.link.is_some() {
            return Err(EngineError::AlreadyAttached);
        }

        self.attach_params = Some(AttachParams {
            target: target.clone(),
            width,
            height,
            scale,
        });
        self.geometry = Some((width, height, scale));

        match WorkerHandle::spawn() {
            Ok(worker) => {
                debug!("render worker spawned");
                self.link = Some(RenderLink::Worker(worker));
                self.send_init(target, width, height, scale);
            }
            Err(err) => {
                warn!(%err, "render thread unavailable; rendering on the host thread");
                self.init_inline();
            }
        }

        self.clock.resume(Instant::now());
        Ok(())
    }

    /// Forwards observed display geometry; device pixels are derived
    /// inside the render context. Repeated identical geometry is dropped.
    pub fn resize(&mut self, width: u32, height: u32, scale: f64) {
        if self.destroyed {
            return;
        }
        if self.geometry == Some((width, height, scale)) {
            return;
        }
        self.geometry = Some((width, height, scale));
        self.dispatch(Command::Resize {
            width,
            height,
            scale,
        });
    }

    /// Advances the animation and requests one frame when due.
    ///
    /// Call from the host's frame callback; returns the earliest instant
    /// worth scheduling the next call for (when an FPS cap is set).
    pub fn tick(&mut self, now: Instant) -> Option<Instant> {
        if self.destroyed {
            return None;
        }
        self.pump_events();

        if self.ready && self.clock.is_playing() && self.clock.ready_for_frame(now) {
            let time = self.clock.advance(now);
            self.dispatch(Command::Render { time });
            self.clock.mark_rendered(now);
            if self.state == LifecycleState::Loading {
                self.set_state(LifecycleState::Playing);
            }
        }

        self.clock.next_deadline()
    }

    /// Resumes animation after a `pause`.
    pub fn play(&mut self) {
        if self.destroyed || self.link.is_none() {
            return;
        }
        self.clock.resume(Instant::now());
        if self.state == LifecycleState::Paused {
            self.set_state(LifecycleState::Playing);
        }
    }

    /// Freezes the animation clock; the last frame stays on screen.
    pub fn pause(&mut self) {
        if self.destroyed {
            return;
        }
        self.clock.pause();
        if self.state == LifecycleState::Playing {
            self.set_state(LifecycleState::Paused);
        }
    }

    /// Stops the driver, destroys the render context, releases the
    /// worker. Safe before init completes and on repeat calls; no frame
    /// fires afterwards.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.clock.pause();
        match self.link.take() {
            Some(RenderLink::Worker(mut worker)) => worker.shutdown(),
            Some(RenderLink::Inline { mut executor, .. }) => executor.handle(Command::Destroy),
            None => {}
        }
        self.attach_params = None;
        debug!("engine torn down");
    }

    fn dispatch(&mut self, command: Command) {
        match &mut self.link {
            Some(RenderLink::Worker(worker)) => worker.send(command),
            Some(RenderLink::Inline { executor, .. }) => executor.handle(command),
            None => {}
        }
    }

    fn send_init(&mut self, target: Arc<dyn RenderTarget>, width: u32, height: u32, scale: f64) {
        self.dispatch(Command::Init {
            target,
            fragment_source: shader::fragment_source(),
            width,
            height,
            scale,
        });
        // Seed the snapshot before any frame can be requested.
        let update = ParamUpdate::from_config(&self.config);
        self.dispatch(Command::UpdateParams(update));
    }

    fn pump_events(&mut self) {
        let events: Vec<Event> = match &self.link {
            Some(RenderLink::Worker(worker)) => worker.drain_events(),
            Some(RenderLink::Inline { events, .. }) => events.try_iter().collect(),
            None => Vec::new(),
        };

        for event in events {
            match event {
                Event::Ready => {
                    debug!("render context ready");
                    self.ready = true;
                }
                Event::Error(WorkerError::SurfaceHandoff(reason)) => {
                    // Only the worker path falls back; a handoff failure
                    // on the host thread means the surface is unusable.
                    if matches!(self.link, Some(RenderLink::Worker(_))) {
                        info!(%reason, "falling back to same-thread rendering");
                        if let Some(RenderLink::Worker(mut worker)) = self.link.take() {
                            worker.shutdown();
                        }
                        self.init_inline();
                    } else {
                        error!(%reason, "surface unusable in any render context");
                        self.link = None;
                        self.ready = false;
                        self.clock.pause();
                        self.set_state(LifecycleState::Paused);
                    }
                }
                Event::Error(WorkerError::Fatal(message)) => {
                    error!(%message, "render context failed");
                    self.link = None;
                    self.ready = false;
                    self.clock.pause();
                    self.set_state(LifecycleState::Paused);
                }
            }
        }
    }

    fn init_inline(&mut self) {
        let Some(params) = self.attach_params.as_ref() else {
            return;
        };
        let (events_tx, events_rx) = unbounded();
        let mut executor = Executor::new(events_tx);
        executor.handle(Command::Init {
            target: params.target.clone(),
            fragment_source: shader::fragment_source(),
            width: params.width,
            height: params.height,
            scale: params.scale,
        });
        executor.handle(Command::UpdateParams(ParamUpdate::from_config(&self.config)));
        self.link = Some(RenderLink::Inline {
            executor,
            events: events_rx,
        });
        // Init ran synchronously; fold its acknowledgement in right away.
        self.pump_events();
    }

    fn set_state(&mut self, next: LifecycleState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "lifecycle transition");
            self.state = next;
            let _ = self.state_tx.send(next);
        }
    }
}

impl Drop for GradientEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Point, MAX_POINTS};
    use raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
    };

    /// A target that can never produce raw handles; init fails with a
    /// surface-handoff error in every execution context.
    struct HandleLess;

    impl HasWindowHandle for HandleLess {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl HasDisplayHandle for HandleLess {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    fn options_with_points(count: usize) -> GradientOptions {
        GradientOptions {
            points: Some(
                (0..count)
                    .map(|i| Point {
                        color: "#336699".into(),
                        x: i as f32 / count.max(1) as f32,
                        y: 0.5,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn starts_in_loading_state() {
        let engine = GradientEngine::new(&GradientOptions::default());
        assert_eq!(engine.state(), LifecycleState::Loading);
    }

    #[test]
    fn teardown_before_attach_is_safe_and_idempotent() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.teardown();
        engine.teardown();
        assert_eq!(engine.tick(Instant::now()), None);
        engine.configure(&options_with_points(2));
        engine.resize(640, 480, 1.0);
    }

    #[test]
    fn attach_after_teardown_is_rejected() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.teardown();
        let result = engine.attach(Arc::new(HandleLess), 100, 100, 1.0);
        assert!(matches!(result, Err(EngineError::Destroyed)));
    }

    #[test]
    fn double_attach_is_rejected() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.attach(Arc::new(HandleLess), 100, 100, 1.0).unwrap();
        let result = engine.attach(Arc::new(HandleLess), 100, 100, 1.0);
        assert!(matches!(result, Err(EngineError::AlreadyAttached)));
        engine.teardown();
    }

    #[test]
    fn unusable_surface_falls_back_then_lands_in_paused() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.configure(&options_with_points(2));
        engine.attach(Arc::new(HandleLess), 100, 100, 1.0).unwrap();

        // The worker reports a handoff failure, the engine retries on
        // this thread, fails again, and settles in paused.
        let deadline = Instant::now() + std::time::Duration::from_secs(10);
        while engine.state() != LifecycleState::Paused && Instant::now() < deadline {
            engine.tick(Instant::now());
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(engine.state(), LifecycleState::Paused);
        assert!(engine.link.is_none());

        // Nothing fires after teardown either.
        engine.teardown();
        assert_eq!(engine.tick(Instant::now()), None);
    }

    #[test]
    fn configure_caps_points_and_updates_speed() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.configure(&GradientOptions {
            speed: Some(2.5),
            ..options_with_points(MAX_POINTS + 5)
        });
        assert_eq!(engine.config.points.len(), MAX_POINTS);
        assert_eq!(engine.config.speed, 2.5);
    }

    #[test]
    fn repeated_configure_is_idempotent() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        let options = options_with_points(3);
        engine.configure(&options);
        let first = engine.config.clone();
        engine.configure(&options);
        assert_eq!(engine.config, first);
    }

    #[test]
    fn tick_without_ready_context_renders_nothing_and_stays_loading() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        engine.configure(&options_with_points(2));
        engine.tick(Instant::now());
        assert_eq!(engine.state(), LifecycleState::Loading);
    }

    #[test]
    fn resize_dedups_identical_geometry() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        let (events_tx, events_rx) = unbounded();
        engine.link = Some(RenderLink::Inline {
            executor: Executor::new(events_tx),
            events: events_rx,
        });

        engine.resize(120, 80, 1.5);
        engine.resize(120, 80, 1.5);
        assert_eq!(engine.geometry, Some((120, 80, 1.5)));
    }

    #[test]
    fn pause_and_play_toggle_state_once_playing() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        let (events_tx, events_rx) = unbounded();
        engine.link = Some(RenderLink::Inline {
            executor: Executor::new(events_tx),
            events: events_rx,
        });
        engine.state = LifecycleState::Playing;

        engine.pause();
        assert_eq!(engine.state(), LifecycleState::Paused);
        engine.play();
        assert_eq!(engine.state(), LifecycleState::Playing);

        let transitions: Vec<_> = engine.state_events().try_iter().collect();
        assert_eq!(
            transitions,
            vec![LifecycleState::Paused, LifecycleState::Playing]
        );
    }

    #[test]
    fn fatal_error_pauses_and_detaches() {
        let mut engine = GradientEngine::new(&GradientOptions::default());
        let (events_tx, events_rx) = unbounded();
        events_tx
            .send(Event::Error(WorkerError::Fatal("no adapter".into())))
            .unwrap();
        engine.link = Some(RenderLink::Inline {
            executor: Executor::new(events_tx),
            events: events_rx,
        });

        engine.tick(Instant::now());
        assert_eq!(engine.state(), LifecycleState::Paused);
        assert!(engine.link.is_none());
        assert!(!engine.ready);
    }
}
