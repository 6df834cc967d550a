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

use std::rc::Rc;
use std::sync::Arc;

use anyhow::anyhow;
use bytemuck::NoUninit;
use log::{debug, warn};
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{SurfaceConfiguration, Texture};
use winit::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn surface_ratio(&self) -> f32 {
        if self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub enum IndexData<'a> {
    U32(&'a [u32]),
    U16(&'a [u16]),
}

impl IndexData<'_> {
    #[must_use]
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
        }
    }
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            IndexData::U32(data) => u32::try_from(data.len()).expect("Value should fit in u32"),
            IndexData::U16(data) => u32::try_from(data.len()).expect("Value should fit in u32"),
        }
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            IndexData::U32(data) => bytemuck::cast_slice(data),
            IndexData::U16(data) => bytemuck::cast_slice(data),
        }
    }
}

/// Immutable GPU vertex storage.
pub struct VertexBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) vertex_count: u32,
}

/// Immutable GPU index storage.
pub struct IndexBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) format: wgpu::IndexFormat,
    pub(crate) index_count: u32,
}

pub struct Uniform<T> {
    value: T,
    buffer: wgpu::Buffer,
    queue: Rc<wgpu::Queue>,
}

impl<T: NoUninit> Uniform<T> {
    pub fn new(context: &DrawContext, value: T) -> Self {
        let buffer = context.device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&value),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
        });
        let queue = Rc::clone(&context.queue);
        Self {
            value,
            buffer,
            queue,
        }
    }
    pub fn write_uniform(&mut self, data: T) {
        self.value = data;
        self.queue.write_buffer(
            &self.buffer,
            0 as wgpu::BufferAddress,
            bytemuck::bytes_of(&self.value),
        );
    }
    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

pub struct MultiSampleConfig {
    multisample_enabled: bool,
    multisample_count: u32,
}

impl MultiSampleConfig {
    #[must_use]
    pub fn get_multisample_count(&self) -> u32 {
        if self.multisample_enabled {
            self.multisample_count
        } else {
            1
        }
    }
}

trait DeviceLocalExt {
    fn create_depth_texture(
        &self,
        surface_config: &wgpu::SurfaceConfiguration,
        multisample_config: &MultiSampleConfig,
    ) -> wgpu::Texture;
    fn create_multisample_texture(
        &self,
        surface_config: &wgpu::SurfaceConfiguration,
        multisample_config: &MultiSampleConfig,
    ) -> Option<wgpu::Texture>;
}

impl DeviceLocalExt for wgpu::Device {
    fn create_depth_texture(
        &self,
        surface_config: &SurfaceConfiguration,
        multisample_config: &MultiSampleConfig,
    ) -> Texture {
        self.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: surface_config.width,
                height: surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: multisample_config.get_multisample_count(),
            dimension: wgpu::TextureDimension::D2,
            view_formats: &[],
            format: DrawContext::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        })
    }

    fn create_multisample_texture(
        &self,
        surface_config: &SurfaceConfiguration,
        multisample_config: &MultiSampleConfig,
    ) -> Option<Texture> {
        if multisample_config.multisample_enabled {
            Some(self.create_texture(&wgpu::TextureDescriptor {
                label: Some("Multisample Texture"),
                size: wgpu::Extent3d {
                    width: surface_config.width,
                    height: surface_config.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: multisample_config.get_multisample_count(),
                dimension: wgpu::TextureDimension::D2,
                format: surface_config.format,
                view_formats: &[],
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            }))
        } else {
            None
        }
    }
}

enum DrawTarget {
    Texture(wgpu::Texture),
    Surface(wgpu::Surface<'static>),
}

impl DrawTarget {
    fn new_texture_target(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::Texture(Self::create_texture(device, width, height))
    }
    fn configure(&mut self, device: &wgpu::Device, surface_config: &wgpu::SurfaceConfiguration) {
        match self {
            Self::Texture(texture) => {
                *texture =
                    Self::create_texture(device, surface_config.width, surface_config.height);
            }
            Self::Surface(surface) => {
                surface.configure(device, surface_config);
            }
        }
    }
    fn create_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Draw Target Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[wgpu::TextureFormat::Rgba8UnormSrgb],
        })
    }
}

/// Owns the wgpu device and the framebuffer it renders into, either a window
/// surface or an offscreen texture when no window is given.
pub struct DrawContext {
    multisample_texture: Option<wgpu::Texture>,
    draw_target: DrawTarget,
    clear_color: Option<wgpu::Color>,
    pub multisample_config: MultiSampleConfig,
    pub depth_texture: wgpu::Texture,
    pub queue: Rc<wgpu::Queue>,
    pub device: wgpu::Device,
    pub surface_config: wgpu::SurfaceConfiguration,
    // Declared last so the surface is released before the window it targets.
    pub window: Option<Arc<Window>>,
}

impl DrawContext {
    const DEFAULT_MULTISAMPLE_ENABLED: bool = true;
    const DEFAULT_MULTISAMPLE_COUNT: u32 = 4;
    const DEFAULT_CLEAR_COLOR: wgpu::Color = wgpu::Color {
        r: 0.0,
        g: 0.5,
        b: 0.5,
        a: 1.0,
    };
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub async fn new(window: Option<Arc<Window>>, dimensions: Dimensions) -> anyhow::Result<Self> {
        let Dimensions { width, height } = dimensions;
        let multisample_config = MultiSampleConfig {
            multisample_enabled: Self::DEFAULT_MULTISAMPLE_ENABLED,
            multisample_count: Self::DEFAULT_MULTISAMPLE_COUNT,
        };
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = window
            .as_ref()
            .map(|w| instance.create_surface(Arc::clone(w)))
            .transpose()?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: surface.as_ref(),
            })
            .await
            .ok_or_else(|| anyhow!("Could not create WebGPU adapter"))?;
        debug!("{:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device Descriptor"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;
        let mut draw_target = surface.map_or_else(
            || DrawTarget::new_texture_target(&device, width, height),
            DrawTarget::Surface,
        );
        let surface_format = if let DrawTarget::Surface(s) = &draw_target {
            let surface_caps = s.get_capabilities(&adapter);
            surface_caps
                .formats
                .iter()
                .find(|f| f.is_srgb())
                .or_else(|| surface_caps.formats.first())
                .copied()
                .ok_or_else(|| anyhow!("Surface is not compatible with the adapter"))?
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let surface_config = wgpu::SurfaceConfiguration {
            desired_maximum_frame_latency: 2,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            view_formats: vec![],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            present_mode: wgpu::PresentMode::Fifo,
        };
        draw_target.configure(&device, &surface_config);
        let depth_texture = device.create_depth_texture(&surface_config, &multisample_config);
        let multisample_texture =
            device.create_multisample_texture(&surface_config, &multisample_config);

        Ok(Self {
            window,
            multisample_config,
            multisample_texture,
            draw_target,
            device,
            queue: Rc::new(queue),
            surface_config,
            depth_texture,
            clear_color: Some(Self::DEFAULT_CLEAR_COLOR),
        })
    }

    /// wgpu clip space depth goes from 0 to 1, never -1 to 1.
    #[must_use]
    pub fn homogeneous_depth(&self) -> bool {
        false
    }

    pub fn create_shader_module(&self, wgsl_shader: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: None,
                source: wgpu::ShaderSource::Wgsl(wgsl_shader.into()),
            })
    }

    pub fn create_vertex_buffer<T: NoUninit>(&self, vertices: &[T]) -> VertexBuffer {
        let buffer = self.device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        VertexBuffer {
            buffer,
            vertex_count: u32::try_from(vertices.len()).expect("Value should fit in u32"),
        }
    }

    pub fn create_index_buffer(&self, index_data: &IndexData) -> IndexBuffer {
        let buffer = self.device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: index_data.data(),
            usage: wgpu::BufferUsages::INDEX,
        });
        IndexBuffer {
            buffer,
            format: index_data.format(),
            index_count: index_data.size(),
        }
    }

    /// Recreates every size-dependent attachment. Must run before drawing
    /// into a resized window.
    pub fn reset_framebuffer(&mut self, dimensions: Dimensions) {
        if dimensions.is_empty() {
            warn!("Ignoring framebuffer reset to an empty size {dimensions:?}");
            return;
        }
        self.surface_config.width = dimensions.width;
        self.surface_config.height = dimensions.height;
        self.reconfigure();
    }

    pub(crate) fn reconfigure(&mut self) {
        self.draw_target
            .configure(&self.device, &self.surface_config);
        self.depth_texture = self
            .device
            .create_depth_texture(&self.surface_config, &self.multisample_config);
        self.multisample_texture = self
            .device
            .create_multisample_texture(&self.surface_config, &self.multisample_config);
    }

    #[must_use]
    pub fn surface_dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.surface_config.width,
            height: self.surface_config.height,
        }
    }

    pub fn render_scene<C>(&self, callback: C) -> Result<(), wgpu::SurfaceError>
    where
        C: FnOnce(&mut wgpu::RenderPass<'_>),
    {
        let depth_texture_view = self
            .depth_texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (surface_texture, displayed_view) = match &self.draw_target {
            DrawTarget::Surface(surface) => {
                let surface_texture = surface.get_current_texture()?;
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (Some(surface_texture), view)
            }
            DrawTarget::Texture(texture) => (
                None,
                texture.create_view(&wgpu::TextureViewDescriptor::default()),
            ),
        };
        let multisample_view = self
            .multisample_texture
            .as_ref()
            .map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default()));
        let (pass_view, pass_resolve_target) = match &multisample_view {
            Some(multisample_view) => (multisample_view, Some(&displayed_view)),
            None => (&displayed_view, None),
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Command Encoder"),
            });
        let load_op = self
            .clear_color
            .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render pass"),
                timestamp_writes: None,
                occlusion_query_set: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: pass_view,
                    resolve_target: pass_resolve_target,
                    ops: wgpu::Operations {
                        load: load_op,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
            });
            callback(&mut render_pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(s) = surface_texture {
            if let Some(window) = &self.window {
                window.pre_present_notify();
            }
            s.present();
        }
        Ok(())
    }
}
