//! Render targets: the screen and off-screen framebuffers.
//!
//! A [`RenderTarget`] is either the on-screen target (the window surface
//! plus an implicit depth buffer, mirroring a double-buffered default
//! framebuffer) or an off-screen target configured with texture or
//! renderbuffer attachments. Targets consume [`DrawIntent`]s: `execute`
//! opens a render pass over the target's own attachments, encodes exactly
//! one draw, and submits - no bind state survives between operations.
//!
//! Completeness is checked before every `clear` and `execute`. An
//! incomplete target (an off-screen target with no attachments, or separate
//! depth and stencil textures, which one pass cannot bind together) is an
//! environment/programmer error and terminates the process before any GPU
//! work is encoded.

use crate::renderer::context::Gpu;
use crate::renderer::shader::DrawIntent;

/// Clear color for color attachments.
const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;
/// Cleared depth value (far plane).
const CLEAR_DEPTH: f32 = 1.0;

/// Selects which buffers [`RenderTarget::clear`] touches. Composable with `|`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClearMask(u32);

impl ClearMask {
    /// Clears no buffers.
    pub const NONE: ClearMask = ClearMask(0);
    /// Clears all color attachments to white.
    pub const COLOR: ClearMask = ClearMask(1);
    /// Clears the depth buffer to 1.0.
    pub const DEPTH: ClearMask = ClearMask(2);
    /// Clears the stencil buffer to 0.
    pub const STENCIL: ClearMask = ClearMask(4);

    /// True if every buffer in `other` is selected by `self`.
    pub fn contains(self, other: ClearMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ClearMask {
    type Output = ClearMask;

    fn bitor(self, rhs: ClearMask) -> ClearMask {
        ClearMask(self.0 | rhs.0)
    }
}

/// Pixel storage bound to a target's color/depth/stencil slot.
///
/// Texture attachments are sampleable and can be fed back into a shader
/// invocation as texture inputs; renderbuffer attachments are
/// render-attachment-only storage for targets never read back.
pub struct TextureAttachment {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    sampleable: bool,
}

impl TextureAttachment {
    fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sampleable: bool,
    ) -> Self {
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if sampleable {
            usage |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        // Sampling a combined depth-stencil texture requires a depth-only
        // view; render attachment views can cover all aspects.
        let aspect = if sampleable && format.has_depth_aspect() && format.has_stencil_aspect() {
            wgpu::TextureAspect::DepthOnly
        } else {
            wgpu::TextureAspect::All
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            aspect,
            ..Default::default()
        });
        Self {
            view,
            format,
            sampleable,
        }
    }

    /// The attachment's pixel format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(crate) fn is_depth(&self) -> bool {
        self.format.has_depth_aspect()
    }

    pub(crate) fn is_sampleable(&self) -> bool {
        self.sampleable
    }
}

struct ScreenTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth: TextureAttachment,
    /// Frame acquired lazily at the first clear/execute, presented by
    /// [`RenderTarget::present`].
    frame: Option<wgpu::SurfaceTexture>,
}

struct OffscreenTarget {
    width: u32,
    height: u32,
    color: Vec<TextureAttachment>,
    depth: Option<TextureAttachment>,
    stencil: Option<TextureAttachment>,
}

enum TargetKind {
    Screen(ScreenTarget),
    Offscreen(OffscreenTarget),
}

/// An off-screen target is drawable once it has at least one attachment.
/// Separate depth and stencil attachments cannot be bound in one render
/// pass; a combined depth-stencil attachment occupies the depth slot alone.
fn attachment_shape_is_drawable(colors: usize, has_depth: bool, has_stencil: bool) -> bool {
    (colors > 0 || has_depth || has_stencil) && !(has_depth && has_stencil)
}

/// A destination for draw intents: the screen or an off-screen framebuffer.
///
/// Created once per target; off-screen targets are configured with
/// `attach_*` calls before first use and immutable afterwards. Every GPU
/// resource a target allocates is owned by it and released on drop.
pub struct RenderTarget {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kind: TargetKind,
}

impl RenderTarget {
    /// The on-screen target: takes ownership of the window surface,
    /// configures it, and allocates the implicit depth buffer.
    ///
    /// The surface format is the first sRGB format the adapter offers (or
    /// the first format at all); present mode is vsync.
    pub fn screen(gpu: &Gpu, surface: wgpu::Surface<'static>, width: u32, height: u32) -> Self {
        let capabilities = surface.get_capabilities(&gpu.adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&gpu.device, &config);

        let depth = TextureAttachment::new(
            &gpu.device,
            "screen depth buffer",
            width,
            height,
            wgpu::TextureFormat::Depth24Plus,
            false,
        );

        Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            kind: TargetKind::Screen(ScreenTarget {
                surface,
                config,
                depth,
                frame: None,
            }),
        }
    }

    /// An off-screen target of the given dimensions, with no attachments.
    pub fn offscreen(gpu: &Gpu, width: u32, height: u32) -> Self {
        Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            kind: TargetKind::Offscreen(OffscreenTarget {
                width,
                height,
                color: Vec::new(),
                depth: None,
                stencil: None,
            }),
        }
    }

    fn offscreen_mut(&mut self, operation: &str) -> (&wgpu::Device, &mut OffscreenTarget) {
        match &mut self.kind {
            TargetKind::Offscreen(target) => (&self.device, target),
            TargetKind::Screen(_) => {
                log::error!("{operation}: the on-screen target has no configurable attachments");
                std::process::exit(1);
            }
        }
    }

    /// Appends a sampleable color texture attachment of the given format.
    pub fn attach_color_texture(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_color_texture");
        target.color.push(TextureAttachment::new(
            device,
            "color attachment",
            target.width,
            target.height,
            format,
            true,
        ));
    }

    /// Binds a sampleable depth texture of the given sized format.
    pub fn attach_depth_texture(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_depth_texture");
        target.depth = Some(TextureAttachment::new(
            device,
            "depth attachment",
            target.width,
            target.height,
            format,
            true,
        ));
    }

    /// Binds a sampleable stencil texture of the given sized format.
    pub fn attach_stencil_texture(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_stencil_texture");
        target.stencil = Some(TextureAttachment::new(
            device,
            "stencil attachment",
            target.width,
            target.height,
            format,
            true,
        ));
    }

    /// Appends a color renderbuffer (render-only storage, never sampled).
    pub fn attach_color_renderbuffer(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_color_renderbuffer");
        target.color.push(TextureAttachment::new(
            device,
            "color renderbuffer",
            target.width,
            target.height,
            format,
            false,
        ));
    }

    /// Binds a depth renderbuffer (render-only storage, never sampled).
    pub fn attach_depth_renderbuffer(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_depth_renderbuffer");
        target.depth = Some(TextureAttachment::new(
            device,
            "depth renderbuffer",
            target.width,
            target.height,
            format,
            false,
        ));
    }

    /// Binds a stencil renderbuffer (render-only storage, never sampled).
    pub fn attach_stencil_renderbuffer(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_stencil_renderbuffer");
        target.stencil = Some(TextureAttachment::new(
            device,
            "stencil renderbuffer",
            target.width,
            target.height,
            format,
            false,
        ));
    }

    /// Binds one combined depth-stencil renderbuffer (e.g.
    /// `Depth24PlusStencil8`); it fills both the depth and stencil roles.
    pub fn attach_depth_stencil_renderbuffer(&mut self, format: wgpu::TextureFormat) {
        let (device, target) = self.offscreen_mut("attach_depth_stencil_renderbuffer");
        target.depth = Some(TextureAttachment::new(
            device,
            "depth-stencil renderbuffer",
            target.width,
            target.height,
            format,
            false,
        ));
        target.stencil = None;
    }

    /// The i-th color attachment, if any. Always `None` for the screen.
    pub fn color_attachment(&self, index: usize) -> Option<&TextureAttachment> {
        match &self.kind {
            TargetKind::Offscreen(target) => target.color.get(index),
            TargetKind::Screen(_) => None,
        }
    }

    /// The depth attachment, if any. Always `None` for the screen (its
    /// depth buffer is implicit and never sampleable).
    pub fn depth_attachment(&self) -> Option<&TextureAttachment> {
        match &self.kind {
            TargetKind::Offscreen(target) => target.depth.as_ref(),
            TargetKind::Screen(_) => None,
        }
    }

    /// The stencil attachment, if any. Always `None` for the screen.
    pub fn stencil_attachment(&self) -> Option<&TextureAttachment> {
        match &self.kind {
            TargetKind::Offscreen(target) => target.stencil.as_ref(),
            TargetKind::Screen(_) => None,
        }
    }

    /// Whether the target's attachments form a drawable configuration.
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            TargetKind::Screen(_) => true,
            TargetKind::Offscreen(target) => attachment_shape_is_drawable(
                target.color.len(),
                target.depth.is_some(),
                target.stencil.is_some(),
            ),
        }
    }

    fn require_complete(&self, operation: &str) {
        if !self.is_complete() {
            log::error!("render target incomplete at {operation}");
            std::process::exit(1);
        }
    }

    fn acquire_screen_view(
        device: &wgpu::Device,
        screen: &mut ScreenTarget,
    ) -> Option<wgpu::TextureView> {
        if screen.frame.is_none() {
            match screen.surface.get_current_texture() {
                Ok(frame) => screen.frame = Some(frame),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::warn!("surface lost or outdated, reconfiguring");
                    screen.surface.configure(device, &screen.config);
                    return None;
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("timed out waiting for the next frame");
                    return None;
                }
                Err(err) => {
                    log::error!("failed to acquire the next frame: {err}");
                    std::process::exit(1);
                }
            }
        }
        screen
            .frame
            .as_ref()
            .map(|frame| frame.texture.create_view(&Default::default()))
    }

    /// Clears the buffers selected by `mask`.
    ///
    /// Verifies completeness first (fatal if incomplete), then encodes one
    /// render pass whose load operations clear the selected attachments.
    /// For the screen, a frame that cannot be acquired skips the clear.
    pub fn clear(&mut self, mask: ClearMask) {
        self.require_complete("clear");

        let screen_view;
        let color_views: Vec<&wgpu::TextureView>;
        let depth_stencil: Option<(&wgpu::TextureView, wgpu::TextureFormat)>;
        match &mut self.kind {
            TargetKind::Screen(screen) => {
                let Some(view) = Self::acquire_screen_view(&self.device, screen) else {
                    return;
                };
                screen_view = view;
                color_views = vec![&screen_view];
                depth_stencil = Some((screen.depth.view(), screen.depth.format()));
            }
            TargetKind::Offscreen(target) => {
                color_views = target.color.iter().map(|a| a.view()).collect();
                depth_stencil = target
                    .depth
                    .as_ref()
                    .or(target.stencil.as_ref())
                    .map(|a| (a.view(), a.format()));
            }
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if mask.contains(ClearMask::COLOR) {
                            wgpu::LoadOp::Clear(CLEAR_COLOR)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let depth_stencil_attachment =
            depth_stencil.map(|(view, format)| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: format.has_depth_aspect().then_some(wgpu::Operations {
                    load: if mask.contains(ClearMask::DEPTH) {
                        wgpu::LoadOp::Clear(CLEAR_DEPTH)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: format.has_stencil_aspect().then_some(wgpu::Operations {
                    load: if mask.contains(ClearMask::STENCIL) {
                        wgpu::LoadOp::Clear(0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
            });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Executes a draw intent against this target.
    ///
    /// Verifies completeness (fatal if incomplete, before any draw is
    /// encoded), opens a render pass over this target's attachments, sets
    /// the viewport to the target's dimensions for off-screen targets, and
    /// issues exactly one draw of the intent's vertex count from index 0.
    pub fn execute(&mut self, intent: DrawIntent<'_>) {
        self.require_complete("execute");

        let screen_view;
        let color_views: Vec<&wgpu::TextureView>;
        let color_formats: Vec<wgpu::TextureFormat>;
        let depth_stencil: Option<(&wgpu::TextureView, wgpu::TextureFormat)>;
        let viewport: Option<(u32, u32)>;
        match &mut self.kind {
            TargetKind::Screen(screen) => {
                let Some(view) = Self::acquire_screen_view(&self.device, screen) else {
                    return;
                };
                screen_view = view;
                color_views = vec![&screen_view];
                color_formats = vec![screen.config.format];
                depth_stencil = Some((screen.depth.view(), screen.depth.format()));
                // The screen's viewport tracks the window; leave it alone.
                viewport = None;
            }
            TargetKind::Offscreen(target) => {
                color_views = target.color.iter().map(|a| a.view()).collect();
                color_formats = target.color.iter().map(|a| a.format()).collect();
                depth_stencil = target
                    .depth
                    .as_ref()
                    .or(target.stencil.as_ref())
                    .map(|a| (a.view(), a.format()));
                viewport = Some((target.width, target.height));
            }
        }

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let depth_stencil_attachment =
            depth_stencil.map(|(view, format)| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: format.has_depth_aspect().then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: format.has_stencil_aspect().then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some((width, height)) = viewport {
                pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            }
            let depth_stencil_format = depth_stencil.map(|(_, format)| format);
            intent.encode(&mut pass, &color_formats, depth_stencil_format);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Presents the acquired frame (buffer swap). No-op for off-screen
    /// targets or when no frame was acquired this frame.
    pub fn present(&mut self) {
        if let TargetKind::Screen(screen) = &mut self.kind {
            if let Some(frame) = screen.frame.take() {
                frame.present();
            }
        }
    }

    /// Reconfigures the screen surface and depth buffer for a new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match &mut self.kind {
            TargetKind::Screen(screen) => {
                screen.config.width = width;
                screen.config.height = height;
                screen.surface.configure(&self.device, &screen.config);
                screen.depth = TextureAttachment::new(
                    &self.device,
                    "screen depth buffer",
                    width,
                    height,
                    wgpu::TextureFormat::Depth24Plus,
                    false,
                );
            }
            TargetKind::Offscreen(_) => {
                log::warn!("resize ignored: off-screen targets have fixed dimensions");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_mask_composes_with_bitor() {
        let mask = ClearMask::COLOR | ClearMask::DEPTH;
        assert!(mask.contains(ClearMask::COLOR));
        assert!(mask.contains(ClearMask::DEPTH));
        assert!(!mask.contains(ClearMask::STENCIL));
        assert!(mask.contains(ClearMask::NONE));
    }

    #[test]
    fn empty_offscreen_shape_is_not_drawable() {
        assert!(!attachment_shape_is_drawable(0, false, false));
    }

    #[test]
    fn single_attachment_shapes_are_drawable() {
        assert!(attachment_shape_is_drawable(1, false, false));
        assert!(attachment_shape_is_drawable(0, true, false));
        assert!(attachment_shape_is_drawable(0, false, true));
        assert!(attachment_shape_is_drawable(2, true, false));
    }

    #[test]
    fn separate_depth_and_stencil_are_not_drawable() {
        // One pass cannot bind two distinct depth/stencil resources; the
        // combined-format renderbuffer covers that configuration instead.
        assert!(!attachment_shape_is_drawable(0, true, true));
        assert!(!attachment_shape_is_drawable(1, true, true));
    }
}
