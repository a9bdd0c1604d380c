use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::time::FrameClock;

/// Output window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Open borderless fullscreen on the primary monitor.
    pub fullscreen: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "quadmap".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            fullscreen: false,
        }
    }
}

/// Requests an app can make from inside a frame.
///
/// Applied after `on_frame` returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Drives one output window and its GPU surface.
pub struct Runtime;

impl Runtime {
    /// Blocks until the window is closed or the app asks to exit.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = Host {
            config,
            gpu_init,
            app,
            output: None,
            exiting: false,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// The window plus everything whose lifetime is tied to it.
#[self_referencing]
struct Output {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct Host<A: CoreApp + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    output: Option<Output>,
    exiting: bool,
}

impl<A: CoreApp + 'static> Host<A> {
    fn open_output(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let cfg = &self.config;
        let mut attrs = Window::default_attributes()
            .with_title(cfg.title.clone())
            .with_inner_size(cfg.initial_size);
        if cfg.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let gpu_init = self.gpu_init.clone();

        let output = OutputTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        output.with_window(|w| {
            log::info!(
                "output window {:?} opened at {}x{} (scale {})",
                w.id(),
                w.inner_size().width,
                w.inner_size().height,
                w.scale_factor()
            );
            w.request_redraw();
        });
        self.output = Some(output);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if !self.exiting {
            log::info!("shutting down");
        }
        self.exiting = true;
        // Drop the surface before the window goes away.
        self.output = None;
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(output) = self.output.as_mut() {
            output.with_gpu_mut(|gpu| gpu.resize(size));
            output.with_window(|w| w.request_redraw());
        }
    }

    /// Runs one app frame. Returns false when the app asked to exit.
    fn redraw(&mut self, window_id: WindowId) -> bool {
        let Some(output) = self.output.as_mut() else {
            return true;
        };
        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();

        let control = output.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx { id: window_id, window: fields.window },
                gpu: fields.gpu,
                input: fields.input_state,
                input_frame: fields.input_frame,
                time,
                runtime: &mut runtime,
            };
            let control = app.on_frame(&mut ctx);

            // Per-frame deltas are consumed by exactly one frame.
            fields.input_frame.clear();
            control
        });

        control == AppControl::Continue && !runtime.exit_requested()
    }
}

impl<A: CoreApp + 'static> ApplicationHandler for Host<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.output.is_some() {
            return;
        }
        if let Err(e) = self.open_output(event_loop) {
            log::error!("failed to open output window: {e:#}");
            self.shutdown(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }

        // Video surfaces change every frame; presentation is paced by vsync.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(output) = self.output.as_ref() {
            output.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exiting {
            event_loop.exit();
            return;
        }

        let app = &mut self.app;
        let Some(output) = self.output.as_mut() else {
            return;
        };

        let control = output.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.window, fields.input_state, &event) {
                fields.input_state.apply_event(fields.input_frame, ev);
            }
            app.on_window_event(window_id, &event)
        });
        if control == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shutdown(event_loop),

            WindowEvent::Resized(size) => self.resize(size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.output.as_ref().map(|o| o.with_window(|w| w.inner_size()));
                if let Some(size) = size {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => {
                if !self.redraw(window_id) {
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }
}
