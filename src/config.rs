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

use cgmath::{Point3, Vector3};

use crate::draw_context::Dimensions;

/// Startup values of the demo. Nothing is read from disk or environment.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// World units per `KeyDown` event.
    pub move_speed: f32,
    /// World units per pixel of relative mouse motion.
    pub mouse_sensitivity: f32,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub initial_eye: Point3<f32>,
    pub initial_target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl DemoConfig {
    #[must_use]
    pub fn initial_dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "wgpu + winit quad".to_string(),
            width: 1280,
            height: 720,
            move_speed: 0.1,
            mouse_sensitivity: 0.01,
            fov_y_deg: 60.0,
            near: 0.1,
            far: 100.0,
            initial_eye: Point3::new(0.0, 2.0, 5.0),
            initial_target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }
}
