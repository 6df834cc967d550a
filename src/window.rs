/*
MIT License

Copyright (c) 2021, 2022, 2024, 2025 Vincent Hiribarren

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

use std::sync::Arc;

use log::{debug, error, info, warn};
use pollster::FutureExt;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::HasWindowHandle;
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::config::DemoConfig;
use crate::draw_context::{Dimensions, DrawContext};
use crate::error::InitError;
use crate::interaction::InteractionLoop;
use crate::platform::{PlatformEvent, PlatformInput};
use crate::render_loop::{QuadRenderer, Renderer};

/// The OS window the render context draws into.
pub struct PlatformSurface {
    window: Arc<Window>,
}

impl PlatformSurface {
    pub fn create(event_loop: &ActiveEventLoop, config: &DemoConfig) -> Result<Self, InitError> {
        let attributes = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(true);
        let window = event_loop
            .create_window(attributes)
            .map_err(|err| InitError::PlatformInit(err.to_string()))?;
        window
            .window_handle()
            .map_err(|err| InitError::NativeHandle(err.to_string()))?;
        info!("Created window \"{}\"", config.title);
        let surface = Self {
            window: Arc::new(window),
        };
        surface.enable_relative_mouse_mode();
        Ok(surface)
    }

    // Motion is then read from `DeviceEvent::MouseMotion`, which reports raw
    // deltas whatever the cursor position.
    fn enable_relative_mouse_mode(&self) {
        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(err) = grabbed {
            warn!("Could not grab the cursor: {err}");
        }
        self.window.set_cursor_visible(false);
    }

    #[must_use]
    pub fn native_window(&self) -> Arc<Window> {
        Arc::clone(&self.window)
    }

    /// Current inner size, or `fallback` while the platform still reports an
    /// empty window.
    #[must_use]
    pub fn dimensions_or(&self, fallback: Dimensions) -> Dimensions {
        let size = self.window.inner_size();
        let dimensions = Dimensions {
            width: size.width,
            height: size.height,
        };
        if dimensions.is_empty() {
            fallback
        } else {
            dimensions
        }
    }
}

struct Session {
    interaction: InteractionLoop,
    renderer: QuadRenderer,
    surface: PlatformSurface,
}

impl Session {
    fn create(event_loop: &ActiveEventLoop, config: &DemoConfig) -> Result<Self, InitError> {
        let surface = PlatformSurface::create(event_loop, config)?;
        let dimensions = surface.dimensions_or(config.initial_dimensions());
        let draw_context = DrawContext::new(Some(surface.native_window()), dimensions)
            .block_on()
            .map_err(InitError::render)?;
        let mut renderer = QuadRenderer::new(draw_context);
        let interaction = InteractionLoop::new(config, dimensions, renderer.homogeneous_depth());
        interaction.start(&mut renderer);
        Ok(Self {
            interaction,
            renderer,
            surface,
        })
    }

    /// GPU resources go first, the window last.
    fn shutdown(self) {
        let Self {
            interaction: _,
            renderer,
            surface,
        } = self;
        debug!("Releasing render context");
        drop(renderer);
        debug!("Destroying window");
        drop(surface);
    }
}

struct DemoApp {
    config: DemoConfig,
    input: PlatformInput,
    session: Option<Session>,
    failure: Option<anyhow::Error>,
}

impl DemoApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        match Session::create(event_loop, &self.config) {
            Ok(session) => {
                event_loop.set_control_flow(ControlFlow::Poll);
                self.session = Some(session);
            }
            Err(err) => self.fail(event_loop, err.into()),
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(event) = PlatformEvent::from_window_event(&event) {
            self.input.push(event);
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.accumulate_mouse_motion(dx, dy);
        }
    }

    // Reached once the pending OS events are all dispatched: one tick per batch.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = session
            .interaction
            .tick(&mut self.input, &mut session.renderer);
        let running = session.interaction.is_running();
        if let Err(err) = result {
            self.fail(event_loop, err);
        } else if !running {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.take() {
            session.shutdown();
        }
    }
}

pub(crate) fn run_event_loop(config: DemoConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().map_err(|err| InitError::PlatformInit(err.to_string()))?;
    let mut app = DemoApp {
        config,
        input: PlatformInput::default(),
        session: None,
        failure: None,
    };
    event_loop.run_app(&mut app)?;
    if let Some(session) = app.session.take() {
        session.shutdown();
    }
    app.failure.map_or(Ok(()), Err)
}
