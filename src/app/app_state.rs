//! Render state and the fixed two-pass frame pipeline.
//!
//! Pass 1 rasterizes the scene geometry into an off-screen depth map. Pass 2
//! draws a full-screen quad that samples the depth map and composes it onto
//! the screen. All GPU resources are created once here; per frame only
//! clear/invoke/execute/present run.

use std::sync::Arc;

use winit::window::Window;

use crate::math::mat::Mat4;
use crate::math::vec::Vec3;
use crate::math::deg_to_rad;
use crate::renderer::{
    ClearMask, Gpu, RenderTarget, ShaderLoader, ShaderProgram, UniformValue, VertexBuffer,
};

const DEPTH_MAP_SIZE: u32 = 1024;
const FIELD_OF_VIEW_DEGREES: f32 = 90.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

/// Combined projection-view matrix for the fixed camera at (0, 0, 4)
/// looking at the origin.
fn camera_matrix(aspect: f32) -> Mat4 {
    let projection = Mat4::perspective(deg_to_rad(FIELD_OF_VIEW_DEGREES), aspect, Z_NEAR, Z_FAR);
    let view = Mat4::look_at(
        Vec3::new(0.0, 0.0, 4.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    projection.multiply(&view)
}

/// Everything the per-frame pipeline needs, created once at startup.
pub struct AppState {
    screen: RenderTarget,
    depth_map: RenderTarget,
    write_depth: ShaderProgram,
    apply_texture: ShaderProgram,
    triangle: VertexBuffer,
    quad: VertexBuffer,
    camera: UniformValue,
    model: UniformValue,
}

impl AppState {
    /// Acquires the GPU, configures both render targets, compiles both
    /// shader programs, and uploads the scene geometry.
    pub async fn new(instance: &wgpu::Instance, window: Arc<Window>) -> Self {
        let surface = match instance.create_surface(window.clone()) {
            Ok(surface) => surface,
            Err(err) => {
                log::error!("failed to create a window surface: {err}");
                std::process::exit(1);
            }
        };
        let gpu = Gpu::new(instance, &surface).await;

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let screen = RenderTarget::screen(&gpu, surface, width, height);

        let mut depth_map = RenderTarget::offscreen(&gpu, DEPTH_MAP_SIZE, DEPTH_MAP_SIZE);
        depth_map.attach_depth_texture(wgpu::TextureFormat::Depth32Float);

        let loader = ShaderLoader::new();
        let write_depth = ShaderProgram::new(&gpu, &loader, "write_depth");
        let apply_texture = ShaderProgram::new(&gpu, &loader, "apply_texture");

        let triangle = VertexBuffer::new(
            &gpu.device,
            "triangle",
            &[
                // position                      color
                vec![vec![-1.0, -1.0, 0.0, 1.0], vec![1.0, 0.0, 0.0, 1.0]],
                vec![vec![-1.0, 1.0, 0.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]],
                vec![vec![1.0, -1.0, 0.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]],
            ],
        );

        let quad = VertexBuffer::new(
            &gpu.device,
            "fullscreen quad",
            &[
                // (x, y)              (u, v)
                vec![vec![-1.0, 1.0], vec![0.0, 1.0]],
                vec![vec![1.0, -1.0], vec![1.0, 0.0]],
                vec![vec![-1.0, -1.0], vec![0.0, 0.0]],
                vec![vec![-1.0, 1.0], vec![0.0, 1.0]],
                vec![vec![1.0, 1.0], vec![1.0, 1.0]],
                vec![vec![1.0, -1.0], vec![1.0, 0.0]],
            ],
        );

        let camera = UniformValue::from(camera_matrix(width as f32 / height as f32));
        let model = UniformValue::from(Mat4::identity());

        Self {
            screen,
            depth_map,
            write_depth,
            apply_texture,
            triangle,
            quad,
            camera,
            model,
        }
    }

    /// Renders one frame.
    ///
    /// Clears the depth map, draws the triangle into it with the camera and
    /// model uniforms, clears the screen, draws the full-screen quad
    /// sampling the depth map, and presents.
    pub fn render_frame(&mut self) {
        self.depth_map.clear(ClearMask::DEPTH);
        let depth_pass =
            self.write_depth
                .invoke(&self.triangle, &[&self.camera, &self.model], &[]);
        self.depth_map.execute(depth_pass);

        self.screen.clear(ClearMask::COLOR | ClearMask::DEPTH);
        if let Some(depth) = self.depth_map.depth_attachment() {
            let composite = self.apply_texture.invoke(&self.quad, &[], &[depth]);
            self.screen.execute(composite);
        }
        self.screen.present();
    }

    /// Tracks a window size change: reconfigures the screen target and
    /// recomputes the camera's aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.screen.resize(width, height);
        self.camera = UniformValue::from(camera_matrix(width as f32 / height as f32));
    }
}
