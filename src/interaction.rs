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

use cgmath::{Deg, Matrix4};
use log::info;

use crate::Dimensions;
use crate::cameras::{CameraView, PerspectiveCameraConfig};
use crate::config::DemoConfig;
use crate::platform::{EventSource, Key, PlatformEvent};
use crate::render_loop::{RenderState, Renderer, ViewRect};

/// Per-tick camera update and resize handling.
///
/// The loop has two states, running and stopped, and a single transition
/// fired by [`PlatformEvent::Quit`]. The tick in which `Quit` is seen still
/// draws its frame.
pub struct InteractionLoop {
    running: bool,
    camera: CameraView,
    projection: PerspectiveCameraConfig,
    viewport: Dimensions,
    view: Matrix4<f32>,
    proj: Matrix4<f32>,
    move_speed: f32,
    mouse_sensitivity: f32,
    homogeneous_depth: bool,
    render_state: RenderState,
}

impl InteractionLoop {
    #[must_use]
    pub fn new(config: &DemoConfig, viewport: Dimensions, homogeneous_depth: bool) -> Self {
        let camera = CameraView {
            eye: config.initial_eye,
            center: config.initial_target,
            up: config.up,
        };
        let projection = PerspectiveCameraConfig {
            fovy: Deg(config.fov_y_deg),
            aspect: viewport.surface_ratio(),
            near: config.near,
            far: config.far,
        };
        Self {
            running: true,
            view: camera.calc_view_matrix(),
            proj: projection.calc_projection(homogeneous_depth),
            camera,
            projection,
            viewport,
            move_speed: config.move_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            homogeneous_depth,
            render_state: RenderState::default(),
        }
    }

    /// Pushes the startup view transform and viewport.
    pub fn start<R: Renderer>(&self, renderer: &mut R) {
        renderer.set_view_transform(self.view, self.proj);
        renderer.set_viewport(ViewRect::covering(self.viewport));
    }

    /// Runs one tick: drains `events`, applies the mouse delta, refreshes the
    /// view matrix and submits exactly one frame.
    pub fn tick<E, R>(&mut self, events: &mut E, renderer: &mut R) -> anyhow::Result<()>
    where
        E: EventSource,
        R: Renderer,
    {
        while let Some(event) = events.poll_event() {
            self.handle_event(event, renderer);
        }

        let (dx, dy) = events.relative_mouse_delta();
        self.camera
            .shift_center(dx * self.mouse_sensitivity, -dy * self.mouse_sensitivity);

        self.view = self.camera.calc_view_matrix();
        renderer.set_view_transform(self.view, self.proj);
        renderer.draw_frame(&self.render_state)
    }

    fn handle_event<R: Renderer>(&mut self, event: PlatformEvent, renderer: &mut R) {
        match event {
            PlatformEvent::Quit => {
                if self.running {
                    info!("Quit requested");
                }
                self.running = false;
            }
            PlatformEvent::Resized(dimensions) => self.resize(dimensions, renderer),
            PlatformEvent::KeyDown(key) => match key {
                Key::W => self.camera.move_z(-self.move_speed),
                Key::S => self.camera.move_z(self.move_speed),
                Key::A => self.camera.move_x(-self.move_speed),
                Key::D => self.camera.move_x(self.move_speed),
                Key::Other => {}
            },
        }
    }

    // Dimensions, framebuffer, viewport and projection change together so the
    // next draw never sees a stale aspect ratio.
    fn resize<R: Renderer>(&mut self, dimensions: Dimensions, renderer: &mut R) {
        info!("Resized to {}x{}", dimensions.width, dimensions.height);
        self.viewport = dimensions;
        renderer.reset_framebuffer(dimensions);
        renderer.set_viewport(ViewRect::covering(dimensions));
        self.projection.resize_screen(dimensions);
        self.proj = self.projection.calc_projection(self.homogeneous_depth);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn camera(&self) -> &CameraView {
        &self.camera
    }

    #[must_use]
    pub fn viewport(&self) -> Dimensions {
        self.viewport
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.projection.aspect
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.proj
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::platform::PlatformInput;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        ResetFramebuffer(Dimensions),
        SetViewport(ViewRect),
        SetViewTransform {
            view: Matrix4<f32>,
            proj: Matrix4<f32>,
        },
        Draw(RenderState),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<Call>,
    }

    impl RecordingRenderer {
        fn draw_count(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Draw(_)))
                .count()
        }
        fn last_view_transform(&self) -> Option<(Matrix4<f32>, Matrix4<f32>)> {
            self.calls.iter().rev().find_map(|call| match call {
                Call::SetViewTransform { view, proj } => Some((*view, *proj)),
                _ => None,
            })
        }
    }

    impl Renderer for RecordingRenderer {
        fn homogeneous_depth(&self) -> bool {
            false
        }
        fn reset_framebuffer(&mut self, dimensions: Dimensions) {
            self.calls.push(Call::ResetFramebuffer(dimensions));
        }
        fn set_viewport(&mut self, rect: ViewRect) {
            self.calls.push(Call::SetViewport(rect));
        }
        fn set_view_transform(&mut self, view: Matrix4<f32>, proj: Matrix4<f32>) {
            self.calls.push(Call::SetViewTransform { view, proj });
        }
        fn draw_frame(&mut self, state: &RenderState) -> anyhow::Result<()> {
            self.calls.push(Call::Draw(*state));
            Ok(())
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    fn setup() -> (InteractionLoop, PlatformInput, RecordingRenderer) {
        let mut renderer = RecordingRenderer::default();
        let config = DemoConfig::default();
        let interaction = InteractionLoop::new(
            &config,
            config.initial_dimensions(),
            renderer.homogeneous_depth(),
        );
        interaction.start(&mut renderer);
        renderer.calls.clear();
        (interaction, PlatformInput::default(), renderer)
    }

    #[test]
    fn forward_and_backward_keys_move_along_z() {
        let (mut interaction, mut input, mut renderer) = setup();
        for key in [Key::W, Key::W, Key::S, Key::W, Key::W] {
            input.push(PlatformEvent::KeyDown(key));
        }
        interaction.tick(&mut input, &mut renderer).unwrap();
        // 4 x w, 1 x s
        assert_close(interaction.camera().eye.z, 5.0 - 0.4 + 0.1);
        assert_close(interaction.camera().eye.x, 0.0);
        assert_close(interaction.camera().eye.y, 2.0);
    }

    #[test]
    fn strafe_keys_move_along_x() {
        let (mut interaction, mut input, mut renderer) = setup();
        input.push(PlatformEvent::KeyDown(Key::A));
        input.push(PlatformEvent::KeyDown(Key::D));
        input.push(PlatformEvent::KeyDown(Key::A));
        input.push(PlatformEvent::KeyDown(Key::Other));
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert_close(interaction.camera().eye.x, -0.1);
        assert_close(interaction.camera().eye.z, 5.0);
    }

    #[test]
    fn mouse_delta_moves_target_with_inverted_y() {
        let (mut interaction, mut input, mut renderer) = setup();
        input.accumulate_mouse_motion(30.0, 20.0);
        interaction.tick(&mut input, &mut renderer).unwrap();
        let center = interaction.camera().center;
        assert_close(center.x, 0.3);
        assert_close(center.y, -0.2);
        assert_close(center.z, 0.0);

        // The delta was consumed: a second tick with no motion is a no-op.
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert_eq!(interaction.camera().center, center);
    }

    #[test]
    fn idle_tick_keeps_camera_and_draws_once() {
        let (mut interaction, mut input, mut renderer) = setup();
        let before = *interaction.camera();
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert_eq!(*interaction.camera(), before);
        assert_eq!(renderer.draw_count(), 1);
        assert_eq!(
            renderer.calls,
            vec![
                Call::SetViewTransform {
                    view: before.calc_view_matrix(),
                    proj: interaction.projection_matrix(),
                },
                Call::Draw(RenderState::default()),
            ]
        );
    }

    #[test]
    fn resize_updates_framebuffer_viewport_and_projection_before_draw() {
        let (mut interaction, mut input, mut renderer) = setup();
        let dimensions = Dimensions {
            width: 640,
            height: 360,
        };
        input.push(PlatformEvent::Resized(dimensions));
        interaction.tick(&mut input, &mut renderer).unwrap();

        let expected_proj = PerspectiveCameraConfig {
            fovy: Deg(60.0),
            aspect: 640.0 / 360.0,
            near: 0.1,
            far: 100.0,
        }
        .calc_projection(false);

        assert_eq!(interaction.viewport(), dimensions);
        assert_close(interaction.aspect(), 640.0 / 360.0);
        assert_eq!(renderer.calls[0], Call::ResetFramebuffer(dimensions));
        assert_eq!(renderer.calls[1], Call::SetViewport(ViewRect::covering(dimensions)));
        let (_, proj) = renderer.last_view_transform().unwrap();
        assert_eq!(proj, expected_proj);
        assert!(matches!(renderer.calls.last(), Some(Call::Draw(_))));
    }

    #[test]
    fn projection_is_only_recomputed_on_resize() {
        let (mut interaction, mut input, mut renderer) = setup();
        let initial = interaction.projection_matrix();
        input.push(PlatformEvent::KeyDown(Key::W));
        input.accumulate_mouse_motion(5.0, 5.0);
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert_eq!(interaction.projection_matrix(), initial);
        assert_close(interaction.aspect(), 1280.0 / 720.0);
    }

    #[test]
    fn quit_still_draws_the_current_tick() {
        let (mut interaction, mut input, mut renderer) = setup();
        input.push(PlatformEvent::Quit);
        input.push(PlatformEvent::KeyDown(Key::D));
        assert!(interaction.is_running());
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert!(!interaction.is_running());
        assert_eq!(renderer.draw_count(), 1);
        // Events after Quit in the same batch are still applied.
        assert_close(interaction.camera().eye.x, 0.1);
    }

    #[test]
    fn start_pushes_initial_transform_and_viewport() {
        let mut renderer = RecordingRenderer::default();
        let config = DemoConfig::default();
        let interaction = InteractionLoop::new(&config, config.initial_dimensions(), false);
        interaction.start(&mut renderer);
        assert_eq!(renderer.calls.len(), 2);
        assert_eq!(
            renderer.calls[1],
            Call::SetViewport(ViewRect {
                x: 0,
                y: 0,
                width: 1280,
                height: 720
            })
        );
        assert_eq!(renderer.draw_count(), 0);
    }

    #[test]
    fn scripted_session() {
        let (mut interaction, mut input, mut renderer) = setup();

        input.push(PlatformEvent::KeyDown(Key::D));
        input.push(PlatformEvent::KeyDown(Key::D));
        interaction.tick(&mut input, &mut renderer).unwrap();
        let eye = interaction.camera().eye;
        assert_close(eye.x, 0.2);
        assert_close(eye.y, 2.0);
        assert_close(eye.z, 5.0);

        input.accumulate_mouse_motion(100.0, -50.0);
        interaction.tick(&mut input, &mut renderer).unwrap();
        let center = interaction.camera().center;
        assert_close(center.x, 1.0);
        assert_close(center.y, 0.5);
        assert_close(center.z, 0.0);

        input.push(PlatformEvent::Resized(Dimensions {
            width: 640,
            height: 360,
        }));
        interaction.tick(&mut input, &mut renderer).unwrap();
        assert!(renderer.calls.contains(&Call::SetViewport(ViewRect {
            x: 0,
            y: 0,
            width: 640,
            height: 360
        })));
        assert_close(interaction.aspect(), 640.0 / 360.0);
        assert_eq!(renderer.draw_count(), 3);
        assert_eq!(interaction.camera().up, DemoConfig::default().up);
        assert_ne!(interaction.camera().center, Point3::new(0.0, 0.0, 0.0));
    }
}
