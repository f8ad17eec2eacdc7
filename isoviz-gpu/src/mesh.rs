//! Isosurface mesh rendering
//!
//! Opaque surfaces are drawn first with depth writes enabled. Translucent
//! surfaces follow with depth writes disabled and alpha blending, their
//! triangles sorted back to front for the current eye position.

use crate::GpuContext;
use bytemuck::{Pod, Zeroable};
use isoviz_core::{Error, Result, TriangleMesh};
use nalgebra::{Matrix4, Point3};
use std::sync::Arc;
use winit::window::Window;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex data for isosurface rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Linear RGB and opacity
    pub color: [f32; 4],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];

    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Camera and lighting uniform
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// ambient, diffuse, specular, specular power
    pub lighting: [f32; 4],
}

/// Mesh rendering configuration
#[derive(Debug, Clone)]
pub struct MeshRenderConfig {
    pub background_color: [f64; 4],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub specular_power: f32,
    pub enable_backface_culling: bool,
}

impl Default for MeshRenderConfig {
    fn default() -> Self {
        Self {
            background_color: [0.25, 0.25, 0.25, 1.0],
            ambient: 0.1,
            diffuse: 0.9,
            specular: 0.0,
            specular_power: 1.0,
            enable_backface_culling: false,
        }
    }
}

/// Triangle data ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl GpuMesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Convert a triangle mesh, coloring vertex `i` with `color(i)`
    pub fn from_triangle_mesh<F>(mesh: &TriangleMesh, color: F, opacity: f32) -> Self
    where
        F: Fn(usize) -> [f32; 3],
    {
        let vertices = mesh
            .vertices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let normal = mesh
                    .normals
                    .as_ref()
                    .and_then(|n| n.get(i))
                    .map(|n| [n.x, n.y, n.z])
                    .unwrap_or([0.0; 3]);
                let [r, g, b] = color(i);
                MeshVertex::new([p.x, p.y, p.z], normal, [r, g, b, opacity])
            })
            .collect();

        let indices = mesh
            .faces
            .iter()
            .flat_map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])
            .collect();

        Self::new(vertices, indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Check if any vertex is not fully opaque
    pub fn is_translucent(&self) -> bool {
        self.vertices.iter().any(|v| v.color[3] < 1.0)
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &GpuMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }
}

/// Reorder triangles so that the farthest from `eye` come first
pub fn sort_back_to_front(vertices: &[MeshVertex], indices: &mut [u32], eye: &Point3<f32>) {
    let mut triangles: Vec<(f32, [u32; 3])> = indices
        .chunks_exact(3)
        .map(|tri| {
            let mut centroid = [0.0f32; 3];
            for &i in tri {
                let p = vertices[i as usize].position;
                for k in 0..3 {
                    centroid[k] += p[k] / 3.0;
                }
            }
            let distance = (Point3::from(centroid) - eye).norm_squared();
            (distance, [tri[0], tri[1], tri[2]])
        })
        .collect();

    triangles.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (chunk, (_, tri)) in indices.chunks_exact_mut(3).zip(triangles) {
        chunk.copy_from_slice(&tri);
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

/// One frame being recorded; shared with overlays such as the UI
pub struct Frame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
    /// Submitted ahead of `encoder`
    pub commands: Vec<wgpu::CommandBuffer>,
}

/// Renderer for opaque and translucent isosurfaces
pub struct MeshRenderer {
    pub gpu_context: GpuContext,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub config: MeshRenderConfig,
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    opaque: Option<MeshBuffers>,
    translucent: Option<MeshBuffers>,
    translucent_mesh: GpuMesh,
    eye: Point3<f32>,
}

impl MeshRenderer {
    /// Create a renderer presenting to `window`
    pub async fn new(window: Arc<Window>, config: MeshRenderConfig) -> Result<Self> {
        let size = window.inner_size();
        let (gpu_context, surface) = GpuContext::for_window(window).await?;

        let caps = surface.get_capabilities(&gpu_context.adapter);
        // Colors and the UI are already in display space
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface has no supported formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu_context.device, &surface_config);
        log::debug!("Surface configured as {:?}", format);

        let camera_uniform = CameraUniform {
            view_proj: Matrix4::identity().into(),
            eye: [0.0, 0.0, 1.0, 1.0],
            lighting: [
                config.ambient,
                config.diffuse,
                config.specular,
                config.specular_power,
            ],
        };
        let camera_buffer = gpu_context.create_buffer_init(
            "Camera Buffer",
            &[camera_uniform],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let bind_group_layout = gpu_context.create_bind_group_layout(
            "mesh_bind_group_layout",
            &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        );
        let camera_bind_group = gpu_context.create_bind_group(
            "mesh_bind_group",
            &bind_group_layout,
            &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        );

        let shader =
            gpu_context.create_shader_module("Isosurface Shader", include_str!("shaders/mesh.wgsl"));
        let opaque_pipeline = Self::create_render_pipeline(
            &gpu_context.device,
            &bind_group_layout,
            &shader,
            format,
            &config,
            false,
        );
        let translucent_pipeline = Self::create_render_pipeline(
            &gpu_context.device,
            &bind_group_layout,
            &shader,
            format,
            &config,
            true,
        );

        let depth_view = Self::create_depth_view(&gpu_context.device, &surface_config);

        Ok(Self {
            gpu_context,
            surface,
            surface_config,
            config,
            opaque_pipeline,
            translucent_pipeline,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            depth_view,
            opaque: None,
            translucent: None,
            translucent_mesh: GpuMesh::default(),
            eye: Point3::origin(),
        })
    }

    fn create_render_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        config: &MeshRenderConfig,
        translucent: bool,
    ) -> wgpu::RenderPipeline {
        let label = if translucent { "Translucent" } else { "Opaque" };
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Mesh Pipeline Layout", label)),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Mesh Pipeline", label)),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: "vs_main",
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(if translucent {
                        wgpu::BlendState::ALPHA_BLENDING
                    } else {
                        wgpu::BlendState::REPLACE
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: if config.enable_backface_culling {
                    Some(wgpu::Face::Back)
                } else {
                    None
                },
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: !translucent,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    fn create_depth_view(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width: surface_config.width,
                    height: surface_config.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.gpu_context.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.gpu_context.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Surface size in physical pixels
    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Resize renderer
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface
                .configure(&self.gpu_context.device, &self.surface_config);
            self.depth_view = Self::create_depth_view(&self.gpu_context.device, &self.surface_config);
        }
    }

    /// Update camera matrices and eye position
    pub fn update_camera(&mut self, view: Matrix4<f32>, projection: Matrix4<f32>, eye: Point3<f32>) {
        self.camera_uniform.view_proj = (projection * view).into();
        self.camera_uniform.eye = [eye.x, eye.y, eye.z, 1.0];
        self.gpu_context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&self.camera_uniform),
        );

        if eye != self.eye {
            self.eye = eye;
            self.resort_translucent();
        }
    }

    /// Replace everything drawn with `meshes`
    pub fn set_meshes(&mut self, meshes: &[GpuMesh]) {
        let mut opaque = GpuMesh::default();
        let mut translucent = GpuMesh::default();
        for mesh in meshes {
            if mesh.is_translucent() {
                translucent.append(mesh);
            } else {
                opaque.append(mesh);
            }
        }
        log::debug!(
            "Uploading {} opaque and {} translucent triangles",
            opaque.triangle_count(),
            translucent.triangle_count()
        );

        sort_back_to_front(&translucent.vertices, &mut translucent.indices, &self.eye);
        self.opaque = self.upload(&opaque, "Opaque");
        self.translucent = self.upload(&translucent, "Translucent");
        self.translucent_mesh = translucent;
    }

    fn upload(&self, mesh: &GpuMesh, label: &str) -> Option<MeshBuffers> {
        if mesh.is_empty() {
            return None;
        }
        Some(MeshBuffers {
            vertex: self.gpu_context.create_buffer_init(
                &format!("{} Vertex Buffer", label),
                &mesh.vertices,
                wgpu::BufferUsages::VERTEX,
            ),
            index: self.gpu_context.create_buffer_init(
                &format!("{} Index Buffer", label),
                &mesh.indices,
                wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            ),
            index_count: mesh.indices.len() as u32,
        })
    }

    fn resort_translucent(&mut self) {
        if let Some(buffers) = &self.translucent {
            let mesh = &mut self.translucent_mesh;
            sort_back_to_front(&mesh.vertices, &mut mesh.indices, &self.eye);
            self.gpu_context
                .queue
                .write_buffer(&buffers.index, 0, bytemuck::cast_slice(&mesh.indices));
        }
    }

    /// Acquire the next surface texture.
    ///
    /// Returns `None` when the surface had to be reconfigured and the frame
    /// should be skipped.
    pub fn begin_frame(&mut self) -> Result<Option<Frame>> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::debug!("Surface outdated, reconfiguring");
                self.surface
                    .configure(&self.gpu_context.device, &self.surface_config);
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for surface texture");
                return Ok(None);
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {}", e))),
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .gpu_context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Mesh Render Encoder"),
            });

        Ok(Some(Frame {
            surface_texture,
            view,
            encoder,
            commands: Vec::new(),
        }))
    }

    /// Clear the frame and draw all uploaded surfaces
    pub fn draw_meshes(&self, frame: &mut Frame) {
        let [r, g, b, a] = self.config.background_color;
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        let passes = [
            (&self.opaque_pipeline, &self.opaque),
            (&self.translucent_pipeline, &self.translucent),
        ];
        for (pipeline, buffers) in passes {
            if let Some(buffers) = buffers {
                render_pass.set_pipeline(pipeline);
                render_pass.set_vertex_buffer(0, buffers.vertex.slice(..));
                render_pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..buffers.index_count, 0, 0..1);
            }
        }
    }

    /// Submit the recorded commands and present
    pub fn end_frame(&self, frame: Frame) {
        let Frame {
            surface_texture,
            encoder,
            mut commands,
            ..
        } = frame;
        commands.push(encoder.finish());
        self.gpu_context.queue.submit(commands);
        surface_texture.present();
    }

    /// Draw the surfaces alone, without overlays
    pub fn render(&mut self) -> Result<()> {
        if let Some(mut frame) = self.begin_frame()? {
            self.draw_meshes(&mut frame);
            self.end_frame(frame);
        }
        Ok(())
    }
}
