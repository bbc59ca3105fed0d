use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use gradient::{GradientEngine, GradientOptions, GrainOptions, LifecycleState, RenderTarget, WarpOptions};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::Cli;
use crate::demo;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Resolves the gradient options: file if given, demo scatter otherwise,
/// with individual CLI flags layered on top.
fn build_options(args: &Cli) -> Result<GradientOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read options file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse options file {}", path.display()))?
        }
        None => demo::demo_options(args.points, args.seed),
    };

    if args.speed.is_some() {
        options.speed = args.speed;
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    if args.warp_mode.is_some() || args.warp_amount.is_some() || args.warp_size.is_some() {
        let mut warp = options.warp.unwrap_or_default();
        if args.warp_mode.is_some() {
            warp.mode = args.warp_mode;
        }
        if args.warp_amount.is_some() {
            warp.amount = args.warp_amount;
        }
        if args.warp_size.is_some() {
            warp.size = args.warp_size;
        }
        options.warp = Some(warp);
    }
    if args.grain.is_some() {
        let mut grain = options.grain.unwrap_or_default();
        grain.amount = args.grain;
        options.grain = Some(grain);
    }

    Ok(options)
}

pub fn run(args: Cli) -> Result<()> {
    let options = build_options(&args)?;
    let mut engine = GradientEngine::new(&options);
    engine.set_target_fps(args.fps);

    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = args.size;
    let window = WindowBuilder::new()
        .with_title("Meshpaper")
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let inner = window.inner_size();
    engine.attach(
        window.clone() as Arc<dyn RenderTarget>,
        inner.width.max(1),
        inner.height.max(1),
        1.0,
    )?;

    let states = engine.state_events();
    let mut next_deadline: Option<Instant> = None;

    event_loop
        .run(move |event, elwt| {
            for state in states.try_iter() {
                tracing::info!(?state, "engine state");
            }

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested => {
                            engine.teardown();
                            elwt.exit();
                        }
                        WindowEvent::Resized(size) => {
                            // Physical pixels straight from the window;
                            // no further scaling needed.
                            engine.resize(size.width, size.height, 1.0);
                            window.request_redraw();
                        }
                        WindowEvent::ScaleFactorChanged { .. } => {
                            let size = window.inner_size();
                            engine.resize(size.width, size.height, 1.0);
                        }
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => match logical_key {
                            Key::Named(NamedKey::Escape) => {
                                engine.teardown();
                                elwt.exit();
                            }
                            Key::Named(NamedKey::Space) => {
                                if engine.state() == LifecycleState::Playing {
                                    engine.pause();
                                } else {
                                    engine.play();
                                }
                            }
                            _ => {}
                        },
                        WindowEvent::RedrawRequested => {
                            next_deadline = engine.tick(Instant::now());
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => match next_deadline {
                    Some(deadline) => {
                        if Instant::now() >= deadline {
                            window.request_redraw();
                        }
                        elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                    }
                    None => {
                        window.request_redraw();
                        elwt.set_control_flow(ControlFlow::Poll);
                    }
                },
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))?;

    Ok(())
}
