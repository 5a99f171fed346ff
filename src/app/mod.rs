//! Window lifecycle and the per-frame render pipeline.

pub mod app_state;
pub mod event_handler;

use std::sync::Arc;

use winit::window::Window;

use app_state::AppState;

/// Window dimensions, fixed at creation.
pub const WINDOW_WIDTH: u32 = 800;
/// Window dimensions, fixed at creation.
pub const WINDOW_HEIGHT: u32 = 600;

/// Top-level application driven by the winit event loop.
///
/// The window and render state are created lazily in `resumed`, the point
/// where winit guarantees a windowing context exists.
pub struct App {
    instance: wgpu::Instance,
    window: Option<Arc<Window>>,
    state: Option<AppState>,
}

impl App {
    pub fn new() -> Self {
        Self {
            instance: wgpu::Instance::new(&wgpu::InstanceDescriptor::default()),
            window: None,
            state: None,
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
