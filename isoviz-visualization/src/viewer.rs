//! Interactive isosurface viewer
//!
//! A winit window with the surfaces rendered by [`MeshRenderer`] and an egui
//! overlay holding the sliders and the scalar bar. Slider changes are applied
//! to the [`SceneState`] in the frame that observed them, and the affected
//! pipelines are re-run before that frame is drawn.

use crate::{Camera, Control, SceneState, SliderSpec};
use isoviz_core::{Error, Result};
use isoviz_gpu::{Frame, MeshRenderConfig, MeshRenderer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::Key,
    window::{Window, WindowBuilder},
};

/// Degrees of rotation per dragged pixel
const ROTATE_SPEED: f32 = 0.4;
/// Zoom factor per wheel notch
const ZOOM_STEP: f32 = 1.1;

/// Window and camera setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background: [f32; 3],
    pub panel_width: f32,
    /// Camera elevation applied after fitting the data, in degrees
    pub elevation: f32,
    pub zoom: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "isoviz".to_string(),
            width: 800,
            height: 600,
            background: [0.25, 0.25, 0.25],
            panel_width: 240.0,
            elevation: 270.0,
            zoom: 1.0,
        }
    }
}

impl ViewerConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Camera fitted to `bounds` and turned by the configured elevation
    pub fn initial_camera(&self, bounds: &(isoviz_core::Point3f, isoviz_core::Point3f)) -> Camera {
        let mut camera = Camera {
            aspect_ratio: self.width as f32 / self.height.max(1) as f32,
            ..Camera::default()
        };
        camera.fit_bounds(&bounds.0, &bounds.1);
        camera.elevation(self.elevation);
        camera.zoom(self.zoom);
        camera.set_home();
        camera
    }
}

#[derive(Debug, Default)]
struct DragState {
    left: bool,
    pan: bool,
    last: Option<PhysicalPosition<f64>>,
}

/// Interactive viewer for a [`SceneState`]
pub struct InteractiveViewer {
    scene: SceneState,
    config: ViewerConfig,
}

impl InteractiveViewer {
    pub fn new(scene: SceneState, config: ViewerConfig) -> Self {
        Self { scene, config }
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Open the window and block until it is closed
    pub fn run(mut self) -> Result<()> {
        self.scene.update()?;

        let event_loop = EventLoop::new()
            .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.config.title.clone())
                .with_inner_size(LogicalSize::new(
                    self.config.width as f64,
                    self.config.height as f64,
                ))
                .build(&event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let mut state = ViewerState::new(window, self.scene, self.config)?;
        log::info!("Viewer ready; drag to rotate, right-drag to pan, wheel to zoom, 'r' to reset");

        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Wait);
                if let Event::WindowEvent { event, window_id } = event {
                    if window_id == state.window.id() {
                        state.handle_window_event(event, elwt);
                    }
                }
            })
            .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))
    }
}

struct ViewerState {
    window: Arc<Window>,
    renderer: MeshRenderer,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    scene: SceneState,
    camera: Camera,
    config: ViewerConfig,
    drag: DragState,
}

impl ViewerState {
    fn new(window: Arc<Window>, scene: SceneState, config: ViewerConfig) -> Result<Self> {
        let [r, g, b] = config.background;
        let render_config = MeshRenderConfig {
            background_color: [r as f64, g as f64, b as f64, 1.0],
            ..Default::default()
        };
        let mut renderer = pollster::block_on(MeshRenderer::new(window.clone(), render_config))?;
        renderer.set_meshes(&scene.gpu_meshes());

        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(renderer.device(), renderer.surface_format(), None, 1);

        let (width, height) = renderer.size();
        let mut camera = config.initial_camera(&scene.bounds());
        camera.aspect_ratio = width as f32 / height.max(1) as f32;

        Ok(Self {
            window,
            renderer,
            egui_ctx,
            egui_state,
            egui_renderer,
            scene,
            camera,
            config,
            drag: DragState::default(),
        })
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        let response = self.egui_state.on_window_event(&self.window, &event);
        if response.repaint {
            self.window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => {
                self.renderer.resize(size);
                if size.height > 0 {
                    self.camera.aspect_ratio = size.width as f32 / size.height as f32;
                }
                self.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    log::error!("Render error: {}", e);
                    elwt.exit();
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed && !response.consumed;
                match button {
                    MouseButton::Left => self.drag.left = pressed,
                    MouseButton::Right | MouseButton::Middle => self.drag.pan = pressed,
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.drag.last {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    if self.drag.left {
                        self.camera.orbit(-dx * ROTATE_SPEED, dy * ROTATE_SPEED);
                        self.window.request_redraw();
                    } else if self.drag.pan {
                        let scale = self.camera.world_per_pixel(self.renderer.size().1 as f32);
                        self.camera.pan(-dx * scale, dy * scale);
                        self.window.request_redraw();
                    }
                }
                self.drag.last = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } if !response.consumed => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.zoom(ZOOM_STEP.powf(notches));
                self.window.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } if !response.consumed => {
                if event.state == ElementState::Pressed {
                    if let Key::Character(c) = &event.logical_key {
                        if c.as_str().eq_ignore_ascii_case("r") {
                            self.camera.reset();
                            log::debug!("Camera reset");
                            self.window.request_redraw();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut changes: Vec<(Control, f32)> = Vec::new();
        let sliders = &self.scene.sliders;
        let scalar_bar = &self.scene.scalar_bar;
        let panel_width = self.config.panel_width;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            slider_panel(ctx, sliders, panel_width, &mut changes);
            if let Some(bar) = scalar_bar {
                bar.show(ctx);
            }
        });

        for (control, value) in changes {
            self.scene.apply(control, value);
        }
        if self.scene.update()? {
            self.renderer.set_meshes(&self.scene.gpu_meshes());
            self.window.request_redraw();
        }

        self.camera.reset_clipping_range();
        self.renderer.update_camera(
            self.camera.view_matrix(),
            self.camera.projection_matrix(),
            self.camera.position,
        );

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let (width, height) = self.renderer.size();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let Some(mut frame) = self.renderer.begin_frame()? else {
            self.window.request_redraw();
            return Ok(());
        };
        self.renderer.draw_meshes(&mut frame);
        self.draw_ui(&mut frame, &full_output.textures_delta, &paint_jobs, &screen);
        self.renderer.end_frame(frame);

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let repaint_now = full_output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|v| v.repaint_delay.is_zero());
        if repaint_now {
            self.window.request_redraw();
        }
        Ok(())
    }

    fn draw_ui(
        &mut self,
        frame: &mut Frame,
        textures: &egui::TexturesDelta,
        paint_jobs: &[egui::ClippedPrimitive],
        screen: &egui_wgpu::ScreenDescriptor,
    ) {
        let device = self.renderer.device();
        let queue = self.renderer.queue();
        for (id, delta) in &textures.set {
            self.egui_renderer.update_texture(device, queue, *id, delta);
        }
        frame.commands = self.egui_renderer.update_buffers(
            device,
            queue,
            &mut frame.encoder,
            paint_jobs,
            screen,
        );

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.egui_renderer.render(&mut render_pass, paint_jobs, screen);
    }
}

/// Left panel with one labelled slider per control
fn slider_panel(
    ctx: &egui::Context,
    sliders: &[SliderSpec],
    width: f32,
    changes: &mut Vec<(Control, f32)>,
) {
    if sliders.is_empty() {
        return;
    }
    egui::SidePanel::left("sliders")
        .exact_width(width)
        .resizable(false)
        .show(ctx, |ui| {
            for spec in sliders {
                ui.add_space(6.0);
                ui.label(spec.title());
                let mut value = spec.value;
                let response = ui.add(
                    egui::Slider::new(&mut value, spec.min..=spec.max)
                        .show_value(false)
                        .smart_aim(false),
                );
                ui.label(egui::RichText::new(spec.label()).monospace());
                if response.changed() {
                    changes.push((spec.control, value));
                }
            }
        });
}
