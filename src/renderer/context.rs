//! GPU device acquisition.

/// The adapter, device, and queue the whole renderer shares.
///
/// `Device` and `Queue` are internally reference-counted, so components
/// that outlive a borrow of `Gpu` keep their own clones.
pub struct Gpu {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    /// Requests an adapter compatible with `surface` and a device on it.
    ///
    /// No GPU available, or a device request failure, is fatal: nothing in
    /// the renderer can run without one.
    pub async fn new(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Self {
        let Some(adapter) = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
        else {
            log::error!("no compatible GPU adapter found");
            std::process::exit(1);
        };
        log::info!("using adapter: {}", adapter.get_info().name);

        let device_result = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("render device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await;
        let (device, queue) = match device_result {
            Ok(pair) => pair,
            Err(err) => {
                log::error!("failed to acquire a GPU device: {err}");
                std::process::exit(1);
            }
        };

        Self {
            adapter,
            device,
            queue,
        }
    }
}
