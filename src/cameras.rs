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

use cgmath::{Deg, Matrix4, Point3, Vector3, vec3};
use std::sync::LazyLock;

use crate::Dimensions;

// cgmath produces OpenGL clip space (z in -w..w), wgpu expects z in 0..w.
static TO_WEBGPU_NDCS: LazyLock<Matrix4<f32>> = LazyLock::new(|| {
    Matrix4::from_translation(vec3(0., 0., 0.5)) * Matrix4::from_nonuniform_scale(1., 1., 0.5)
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub eye: Point3<f32>,
    pub center: Point3<f32>,
    pub up: Vector3<f32>,
}

impl CameraView {
    #[must_use]
    pub fn calc_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.center, self.up)
    }
    /// Translates the eye along the world X axis. The center stays put.
    pub fn move_x(&mut self, val: f32) {
        self.eye.x += val;
    }
    /// Translates the eye along the world Z axis. The center stays put.
    pub fn move_z(&mut self, val: f32) {
        self.eye.z += val;
    }
    /// Moves the look-at point itself, independently of the eye distance.
    pub fn shift_center(&mut self, dx: f32, dy: f32) {
        self.center.x += dx;
        self.center.y += dy;
    }
}

pub struct PerspectiveCameraConfig {
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCameraConfig {
    #[must_use]
    pub fn calc_projection(&self, homogeneous_depth: bool) -> Matrix4<f32> {
        let projection = cgmath::perspective(self.fovy, self.aspect, self.near, self.far);
        if homogeneous_depth {
            projection
        } else {
            *TO_WEBGPU_NDCS * projection
        }
    }
    pub fn resize_screen(&mut self, dimensions: Dimensions) {
        self.aspect = dimensions.surface_ratio();
    }
}

impl Default for PerspectiveCameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(60.0),
            aspect: 16. / 9.,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Transform, Vector4};

    fn view() -> CameraView {
        CameraView {
            eye: Point3::new(0.0, 2.0, 5.0),
            center: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    #[test]
    fn view_matrix_maps_center_in_front_of_eye() {
        let camera = view();
        let center_in_view = camera.calc_view_matrix().transform_point(camera.center);
        assert!(center_in_view.x.abs() < 1e-5);
        assert!(center_in_view.z < 0.0);
    }

    #[test]
    fn moves_only_touch_the_eye() {
        let mut camera = view();
        camera.move_x(0.5);
        camera.move_z(-0.25);
        assert_eq!(camera.eye, Point3::new(0.5, 2.0, 4.75));
        assert_eq!(camera.center, Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn shift_center_leaves_eye_and_z() {
        let mut camera = view();
        camera.shift_center(1.0, -2.0);
        assert_eq!(camera.center, Point3::new(1.0, -2.0, 0.0));
        assert_eq!(camera.eye, Point3::new(0.0, 2.0, 5.0));
    }

    #[test]
    fn resize_updates_aspect() {
        let mut projection = PerspectiveCameraConfig::default();
        projection.resize_screen(Dimensions {
            width: 640,
            height: 360,
        });
        assert!((projection.aspect - 640.0 / 360.0).abs() < 1e-6);
    }

    #[test]
    fn depth_convention_maps_near_plane() {
        let projection = PerspectiveCameraConfig::default();
        let near_point = Vector4::new(0.0, 0.0, -projection.near, 1.0);

        let gl = projection.calc_projection(true) * near_point;
        assert!((gl.z / gl.w + 1.0).abs() < 1e-4);

        let webgpu = projection.calc_projection(false) * near_point;
        assert!((webgpu.z / webgpu.w).abs() < 1e-4);
    }
}
