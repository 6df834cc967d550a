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

use bytemuck::{Pod, Zeroable};

use crate::draw_context::{DrawContext, IndexBuffer, IndexData, VertexBuffer};

/// Position plus a packed color, with bytes laid out as R, G, B, A in memory
/// (`0xAABBGGRR` when read as a little-endian `u32`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PosColorVertex {
    pub position: [f32; 3],
    pub abgr: u32,
}

impl PosColorVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Unorm8x4];

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[rustfmt::skip]
pub const QUAD_VERTICES: [PosColorVertex; 4] = [
    PosColorVertex { position: [-1.0, 0.0,  1.0], abgr: 0xff00_00ff }, // red
    PosColorVertex { position: [ 1.0, 0.0,  1.0], abgr: 0xff00_ff00 }, // green
    PosColorVertex { position: [-1.0, 0.0, -1.0], abgr: 0xffff_0000 }, // blue
    PosColorVertex { position: [ 1.0, 0.0, -1.0], abgr: 0xffff_ff00 }, // cyan
];

#[rustfmt::skip]
pub const QUAD_INDICES: [u16; 6] = [
    0, 1, 2,
    1, 3, 2,
];

/// The two GPU buffers of the quad. Created once, never written again.
pub struct QuadMesh {
    pub vertices: VertexBuffer,
    pub indices: IndexBuffer,
}

impl QuadMesh {
    pub fn new(context: &DrawContext) -> Self {
        Self {
            vertices: context.create_vertex_buffer(&QUAD_VERTICES),
            indices: context.create_index_buffer(&IndexData::U16(&QUAD_INDICES)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(size_of::<PosColorVertex>(), 16);
        let layout = PosColorVertex::layout();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn colors_are_stored_as_rgba_bytes() {
        let red: &[u8] = bytemuck::bytes_of(&QUAD_VERTICES[0].abgr);
        assert_eq!(red, u32::to_ne_bytes(0xff00_00ff));
        if cfg!(target_endian = "little") {
            assert_eq!(red, [0xff, 0x00, 0x00, 0xff]);
            let cyan: &[u8] = bytemuck::bytes_of(&QUAD_VERTICES[3].abgr);
            assert_eq!(cyan, [0x00, 0xff, 0xff, 0xff]);
        }
    }

    #[test]
    fn indices_cover_every_vertex() {
        assert!(QUAD_INDICES.iter().all(|&i| usize::from(i) < QUAD_VERTICES.len()));
        for vertex in 0..QUAD_VERTICES.len() {
            let vertex = u16::try_from(vertex).unwrap();
            assert!(QUAD_INDICES.contains(&vertex));
        }
    }

    #[test]
    fn triangles_face_up() {
        // Counter-clockwise seen from +Y, so back-face culling keeps them
        // for a camera above the plane.
        for triangle in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| QUAD_VERTICES[usize::from(triangle[i])].position);
            let ab = [b[0] - a[0], b[2] - a[2]];
            let ac = [c[0] - a[0], c[2] - a[2]];
            // y component of (b - a) x (c - a)
            let normal_y = ab[1] * ac[0] - ab[0] * ac[1];
            assert!(normal_y > 0.0);
        }
    }
}
