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

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, SquareMatrix};
use log::{debug, warn};
use web_time::{Duration, Instant};

use crate::Dimensions;
use crate::draw_context::{DrawContext, Uniform};
use crate::primitives::quad::{PosColorVertex, QuadMesh};

const QUAD_SHADER: &str = include_str!("shaders/quad.wgsl");

/// Fixed-function state applied to the single draw call of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub write_mask: wgpu::ColorWrites,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub front_face: wgpu::FrontFace,
    pub cull_mode: Option<wgpu::Face>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            write_mask: wgpu::ColorWrites::ALL,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRect {
    #[must_use]
    pub fn covering(dimensions: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dimensions.width,
            height: dimensions.height,
        }
    }
}

/// Operations the interaction loop drives on the GPU side.
pub trait Renderer {
    /// `true` when clip space depth spans -1..1, `false` for 0..1.
    fn homogeneous_depth(&self) -> bool;
    fn reset_framebuffer(&mut self, dimensions: Dimensions);
    fn set_viewport(&mut self, rect: ViewRect);
    fn set_view_transform(&mut self, view: Matrix4<f32>, proj: Matrix4<f32>);
    fn draw_frame(&mut self, state: &RenderState) -> anyhow::Result<()>;
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ViewTransformUniform {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
}

struct CachedPipeline {
    state: RenderState,
    pipeline: wgpu::RenderPipeline,
}

/// wgpu-backed [`Renderer`] drawing the static quad mesh.
pub struct QuadRenderer {
    pipeline: Option<CachedPipeline>,
    bind_group: wgpu::BindGroup,
    bind_group_layout: wgpu::BindGroupLayout,
    shader_module: wgpu::ShaderModule,
    view_transform: Uniform<ViewTransformUniform>,
    viewport: ViewRect,
    mesh: QuadMesh,
    frame_stats: FrameStats,
    // Dropped after every resource created from its device.
    draw_context: DrawContext,
}

impl QuadRenderer {
    pub const BIND_GROUP_INDEX_VIEW: u32 = 0;

    pub fn new(draw_context: DrawContext) -> Self {
        let shader_module = draw_context.create_shader_module(QUAD_SHADER);
        let mesh = QuadMesh::new(&draw_context);
        debug!(
            "Uploaded {} vertices and {} indices",
            mesh.vertices.vertex_count, mesh.indices.index_count
        );
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        let view_transform = Uniform::new(
            &draw_context,
            ViewTransformUniform {
                view: identity,
                proj: identity,
            },
        );
        let bind_group_layout =
            draw_context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("View Transform Layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });
        let bind_group = draw_context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("View Transform"),
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: view_transform.binding_resource(),
                }],
            });
        let viewport = ViewRect::covering(draw_context.surface_dimensions());
        Self {
            pipeline: None,
            bind_group,
            bind_group_layout,
            shader_module,
            view_transform,
            viewport,
            mesh,
            frame_stats: FrameStats::default(),
            draw_context,
        }
    }

    fn build_pipeline(&self, state: &RenderState) -> wgpu::RenderPipeline {
        let device = &self.draw_context.device;
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&self.bind_group_layout],
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Quad Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader_module,
                entry_point: Some("vs_main"),
                buffers: &[PosColorVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.draw_context.surface_config.format,
                    blend: None,
                    write_mask: state.write_mask,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: state.front_face,
                cull_mode: state.cull_mode,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DrawContext::DEPTH_FORMAT,
                depth_write_enabled: state.depth_write,
                depth_compare: state.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: self.draw_context.multisample_config.get_multisample_count(),
                ..Default::default()
            },
            multiview: None,
        })
    }

    fn ensure_pipeline(&mut self, state: &RenderState) {
        if self.pipeline.as_ref().is_some_and(|cached| cached.state == *state) {
            return;
        }
        debug!("Building quad pipeline for {state:?}");
        let pipeline = self.build_pipeline(state);
        self.pipeline = Some(CachedPipeline {
            state: *state,
            pipeline,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn clamped_viewport(&self) -> (f32, f32, f32, f32) {
        let Dimensions { width, height } = self.draw_context.surface_dimensions();
        let x = self.viewport.x.min(width);
        let y = self.viewport.y.min(height);
        let w = self.viewport.width.min(width - x);
        let h = self.viewport.height.min(height - y);
        (x as f32, y as f32, w as f32, h as f32)
    }
}

impl Renderer for QuadRenderer {
    fn homogeneous_depth(&self) -> bool {
        self.draw_context.homogeneous_depth()
    }

    fn reset_framebuffer(&mut self, dimensions: Dimensions) {
        self.draw_context.reset_framebuffer(dimensions);
    }

    fn set_viewport(&mut self, rect: ViewRect) {
        self.viewport = rect;
    }

    fn set_view_transform(&mut self, view: Matrix4<f32>, proj: Matrix4<f32>) {
        self.view_transform.write_uniform(ViewTransformUniform {
            view: view.into(),
            proj: proj.into(),
        });
    }

    fn draw_frame(&mut self, state: &RenderState) -> anyhow::Result<()> {
        self.ensure_pipeline(state);
        let pipeline = &self
            .pipeline
            .as_ref()
            .context("Pipeline should be built before drawing")?
            .pipeline;
        let (x, y, width, height) = self.clamped_viewport();
        let mesh = &self.mesh;
        let bind_group = &self.bind_group;
        let result = self.draw_context.render_scene(|render_pass| {
            render_pass.set_pipeline(pipeline);
            render_pass.set_viewport(x, y, width, height, 0.0, 1.0);
            render_pass.set_bind_group(Self::BIND_GROUP_INDEX_VIEW, bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertices.buffer.slice(..));
            render_pass.set_index_buffer(mesh.indices.buffer.slice(..), mesh.indices.format);
            render_pass.draw_indexed(0..mesh.indices.index_count, 0, 0..1);
        });
        match result {
            Ok(()) => {
                self.frame_stats.record_frame();
                Ok(())
            }
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                warn!("Surface needs to be reconfigured: {err}");
                self.draw_context.reconfigure();
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring the next surface texture, skipping frame");
                Ok(())
            }
            Err(err) => Err(err).context("Failed to acquire the next surface texture"),
        }
    }
}

/// Frame counter reported once per second.
pub struct FrameStats {
    pub init_start: Instant,
    window_start: Instant,
    frames_in_window: u32,
    pub total_frames: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            init_start: now,
            window_start: now,
            frames_in_window: 0,
            total_frames: 0,
        }
    }
}

impl FrameStats {
    const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn record_frame(&mut self) {
        self.total_frames += 1;
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Self::REPORT_INTERVAL {
            debug!(
                "{} frames in {:.2}s ({} total, up {:.1}s)",
                self.frames_in_window,
                elapsed.as_secs_f32(),
                self.total_frames,
                self.init_start.elapsed().as_secs_f32()
            );
            self.window_start = Instant::now();
            self.frames_in_window = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render_state_tests_depth_and_culls_back_faces() {
        let state = RenderState::default();
        assert!(state.depth_write);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
        assert_eq!(state.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(state.write_mask, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn view_rect_covers_dimensions() {
        let rect = ViewRect::covering(Dimensions {
            width: 640,
            height: 360,
        });
        assert_eq!(
            rect,
            ViewRect {
                x: 0,
                y: 0,
                width: 640,
                height: 360
            }
        );
    }

    #[test]
    fn frame_stats_count_frames() {
        let mut stats = FrameStats::default();
        stats.record_frame();
        stats.record_frame();
        assert_eq!(stats.total_frames, 2);
    }
}
