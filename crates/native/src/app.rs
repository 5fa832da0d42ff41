//! Windowed front-end: winit event loop driving the orchestrator over wgpu.

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use gargantua_core::{
    FrameClock, FrameError, FrameInput, GestureInbox, GestureSmoother, Orchestrator, ProfileSet,
    UiControls, Viewport,
};

use crate::cli::Cli;
use crate::gpu::WgpuBackend;
use crate::input::PointerGesture;
use crate::keys::{command_for_key, Command};

const PIXELS_PER_WHEEL_LINE: f64 = 50.0;

pub fn run(cli: &Cli, profiles: ProfileSet) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title(&cli.mode))
            .with_inner_size(PhysicalSize::new(cli.width.max(1), cli.height.max(1)))
            .build(&event_loop)?,
    );
    let size = window.inner_size();
    let viewport = Viewport::new(size.width, size.height);

    let backend = pollster::block_on(WgpuBackend::new(Arc::clone(&window)))?;
    let mut orch = Orchestrator::new(backend, profiles, &cli.mode, viewport, cli.horizon.into())?;

    let inbox = GestureInbox::new();
    let mut gesture = GestureSmoother::new(inbox.clone());
    let mut pointer = PointerGesture::new();
    let mut controls = UiControls::default();
    let mut clock = FrameClock::new();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::Resized(size) => orch.resize(size.width, size.height),
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::CursorMoved { position, .. } => {
                inbox.publish(pointer.cursor_moved(position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => inbox.publish(pointer.cursor_left()),
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => inbox.publish(pointer.set_dragging(pressed)),
                    MouseButton::Right => inbox.publish(pointer.set_charging(pressed)),
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_WHEEL_LINE) as f32,
                };
                inbox.publish(pointer.wheel(lines));
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match command_for_key(code) {
                Some(Command::ToggleMode) => match orch.toggle_mode() {
                    Ok(mode) => {
                        // a slider override belongs to the mode it was made in
                        controls.bloom = None;
                        window.set_title(&title(&mode));
                    }
                    Err(e) => log::warn!("[mode] toggle failed: {}", e),
                },
                Some(Command::ToggleHorizon) => {
                    orch.set_horizon_policy(orch.horizon_policy().toggled());
                }
                Some(Command::Spin(d)) => controls.nudge_spin(d),
                Some(Command::Intensity(d)) => controls.nudge_intensity(d),
                Some(Command::Bloom(param, d)) => {
                    let b = controls.nudge_bloom(orch.profile().bloom, param, d);
                    log::info!(
                        "[bloom] strength {:.2} radius {:.2} threshold {:.2}",
                        b.strength,
                        b.radius,
                        b.threshold
                    );
                }
                Some(Command::Orbit { yaw, pitch }) => orch.orbit(yaw, pitch),
                Some(Command::Quit) => elwt.exit(),
                None => {}
            },
            _ => {}
        },
        Event::AboutToWait => {
            // the pointer holds its pose while idle, so republish every frame
            inbox.publish(pointer.current());
            let input = FrameInput {
                dt: clock.tick(),
                gesture: &mut gesture,
                controls: &controls,
            };
            match orch.render_frame(input) {
                Ok(report) => {
                    for (pass, reason) in &report.skipped {
                        log::debug!("[frame] {} skipped {:?}: {:?}", report.frame, pass, reason);
                    }
                    window.request_redraw();
                }
                Err(FrameError::SurfaceLost) => orch.backend_mut().reconfigure(),
                Err(FrameError::OutOfMemory) => {
                    log::error!("[frame] device out of memory");
                    elwt.exit();
                }
                Err(FrameError::SurfaceTimeout) => {}
                Err(e) => log::warn!("[frame] {}", e),
            }
        }
        Event::LoopExiting => {
            orch.teardown();
            log::info!(
                "[app] exit after {:.1}s; live targets {}, meshes {}",
                clock.wall_time(),
                orch.backend().live_targets(),
                orch.backend().live_meshes()
            );
        }
        _ => {}
    })?;
    Ok(())
}

fn title(mode: &str) -> String {
    format!("Gargantua [{mode}]")
}
